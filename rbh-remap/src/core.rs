//! Core module for mapping sequences back to canonical identifiers
//!
//! Candidates resolve in one step through the canonical table. References
//! take two: bounded or full header to the genome id it replaced, then that
//! genome id to its canonical identifier. Anything unresolved keeps its
//! header and is reported once.

use anyhow::{bail, Context, Result};
use config::{write_atomically, StageSummary, AGS, REMAPPED_CGS};
use log::info;
use rbhpack::{
    count_records, read_fasta, CanonicalId, CanonicalTable, FastaRecord, FastaWriter,
    GenomeRefMap, RgsHeader,
};

use std::path::Path;

use crate::cli::{AssembleArgs, CandidateArgs};

/// records after one remapping pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Remapped {
    pub records: Vec<FastaRecord>,
    pub resolved: usize,
    pub unresolved: Vec<String>,
}

/// short candidate id -> canonical id
pub fn resolve_candidate<'a>(header: &str, table: &'a CanonicalTable) -> Option<&'a CanonicalId> {
    table.resolve(header)
}

/// Reference header -> genome id it replaced -> canonical id
///
/// The header may be given in full or truncated form.
pub fn resolve_reference<'a>(
    header: &str,
    map: &GenomeRefMap,
    table: &'a CanonicalTable,
) -> Option<&'a CanonicalId> {
    let genome = map.resolve_reference(header)?;
    table.resolve(genome.as_str())
}

/// Rewrite headers through `resolve`, keeping the original header on a miss
pub fn remap_records<'a, F>(records: Vec<FastaRecord>, resolve: F) -> Remapped
where
    F: Fn(&str) -> Option<&'a CanonicalId>,
{
    let mut remapped = Remapped {
        records: Vec::with_capacity(records.len()),
        ..Default::default()
    };

    for record in records {
        match resolve(&record.header) {
            Some(canonical) => {
                remapped.resolved += 1;
                remapped
                    .records
                    .push(FastaRecord::new(canonical.as_str(), record.seq));
            }
            None => {
                remapped.unresolved.push(record.header.clone());
                remapped.records.push(record);
            }
        }
    }

    remapped
}

fn read_canonical(path: &Path, summary: &mut StageSummary) -> Result<CanonicalTable> {
    let (table, skipped) = CanonicalTable::read(path)?;
    if skipped > 0 {
        summary.warn(format!(
            "{} malformed rows skipped in {}",
            skipped,
            path.display()
        ));
    }
    if table.is_empty() {
        bail!("ERROR: no identifier mappings found in {}", path.display());
    }
    info!("INFO: canonical identifiers loaded: {}", table.len());

    Ok(table)
}

fn write_records(records: &[FastaRecord], path: &Path) -> Result<usize> {
    write_atomically(path, |w| {
        let mut writer = FastaWriter::new(w);
        for record in records {
            writer.write(record)?;
        }
        Ok(())
    })
    .with_context(|| format!("ERROR: failed to write {}", path.display()))?;

    Ok(count_records(path)?)
}

fn warn_unresolved(remapped: &Remapped, chain: &str, summary: &mut StageSummary) {
    for header in remapped.unresolved.iter() {
        summary.warn(format!(
            "{} identifier not found in mapping, kept as is: {}",
            chain, header
        ));
    }
}

pub fn remap_candidates(args: CandidateArgs) -> Result<StageSummary> {
    info!("INFO: Remapping candidate identifiers...");

    let mut summary = StageSummary::new("remap");
    let table = read_canonical(&args.canonical, &mut summary)?;

    let records = read_fasta(&args.fasta)?;
    summary.processed = records.len();

    let remapped = remap_records(records, |header| resolve_candidate(header, &table));
    warn_unresolved(&remapped, "candidate", &mut summary);
    if remapped.resolved == 0 {
        bail!(
            "ERROR: no sequences in {} could be remapped, identifiers and mapping do not match",
            args.fasta.display()
        );
    }

    write_records(&remapped.records, &args.outdir.join(REMAPPED_CGS))?;

    summary.kept = remapped.resolved;
    summary.log();

    Ok(summary)
}

/// Remap both chains and concatenate references then candidates
pub fn assemble(args: AssembleArgs) -> Result<StageSummary> {
    info!("INFO: Assembling homolog set...");

    let mut summary = StageSummary::new("assemble");
    let table = read_canonical(&args.canonical, &mut summary)?;
    let map = GenomeRefMap::read(&args.mapping)?;

    let references = read_fasta(&args.rgs)?;
    let candidates = read_fasta(&args.fasta)?;
    summary.processed = references.len() + candidates.len();

    // rgsN declares the reference count, rbh-species the candidate count
    let declared = references
        .first()
        .and_then(|r| RgsHeader::parse(&r.header))
        .map_or(references.len(), |h| h.count);
    let upstream = args.expected_candidates.unwrap_or(candidates.len());
    let expected = declared + upstream;

    let references = remap_records(references, |header| {
        resolve_reference(header, &map, &table)
    });
    warn_unresolved(&references, "reference", &mut summary);

    let candidates = remap_records(candidates, |header| resolve_candidate(header, &table));
    warn_unresolved(&candidates, "candidate", &mut summary);

    let resolved = references.resolved + candidates.resolved;
    if resolved == 0 {
        bail!("ERROR: no sequences could be remapped to canonical identifiers");
    }

    summary.note(format!(
        "references remapped: {} of {}",
        references.resolved,
        references.records.len()
    ));
    summary.note(format!(
        "candidates remapped: {} of {}",
        candidates.resolved,
        candidates.records.len()
    ));

    let mut records = references.records;
    records.extend(candidates.records);

    let written = write_records(&records, &args.outdir.join(AGS))?;
    if written != expected {
        summary.warn(format!(
            "anomaly: {} sequences written but upstream stages declared {} references + {} candidates",
            written, declared, upstream
        ));
    }

    summary.kept = resolved;
    summary.log();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, SubArgs};
    use rbhpack::{FullId, ShortId, TruncId};

    fn table() -> CanonicalTable {
        CanonicalTable::from_pairs([
            ("Homo_sapiens-7", "Metazoa_Chordata_Homo_sapiens-g_BRCA1-p_7"),
            ("Nvec-3", "Metazoa_Cnidaria_Nematostella_vectensis-g_x-p_3"),
        ])
    }

    fn mapping() -> GenomeRefMap {
        let mut map = GenomeRefMap::new();
        map.insert(
            ShortId::new("Homo_sapiens-7"),
            TruncId::new("rgs2-human-hgnc-BRCA1_001"),
            FullId::new("rgs2-human-hgnc-BRCA1-breast-cancer-type-1"),
        )
        .unwrap();
        map
    }

    #[test]
    fn test_absent_candidate_keeps_header_and_warns_once() {
        let records = vec![
            FastaRecord::new("Nvec-3", "MKV"),
            FastaRecord::new("Nvec-99", "LLP"),
        ];
        let t = table();
        let remapped = remap_records(records, |h| resolve_candidate(h, &t));

        assert_eq!(remapped.resolved, 1);
        assert_eq!(remapped.unresolved, vec!["Nvec-99".to_string()]);
        assert_eq!(remapped.records[1].header, "Nvec-99");
        assert_eq!(remapped.records[1].seq, "LLP");

        let mut summary = StageSummary::new("test");
        warn_unresolved(&remapped, "candidate", &mut summary);
        assert_eq!(summary.warned, 1);
    }

    #[test]
    fn test_reference_chain_accepts_full_and_truncated_headers() {
        let (map, t) = (mapping(), table());
        let canonical = "Metazoa_Chordata_Homo_sapiens-g_BRCA1-p_7";

        let full = resolve_reference("rgs2-human-hgnc-BRCA1-breast-cancer-type-1", &map, &t);
        assert_eq!(full.map(|c| c.as_str()), Some(canonical));

        let truncated = resolve_reference("rgs2-human-hgnc-BRCA1_001", &map, &t);
        assert_eq!(truncated.map(|c| c.as_str()), Some(canonical));

        assert!(resolve_reference("rgs2-human-hgnc-TP53", &map, &t).is_none());
    }

    fn fixture(dir: &Path) -> (String, String, String, String) {
        let rgs = dir.join("rgs.aa");
        std::fs::write(
            &rgs,
            ">rgs2-human-hgnc-BRCA1-breast-cancer-type-1\nMKV\n>rgs2-human-hgnc-TP53\nPPP\n",
        )
        .unwrap();
        let fasta = dir.join("cgs.aa");
        std::fs::write(&fasta, ">Nvec-3\nLLL\n").unwrap();
        let map = dir.join("map.tsv");
        mapping().write(&map).unwrap();
        let canonical = dir.join("canonical.tsv");
        std::fs::write(
            &canonical,
            "Homo_sapiens-7\tMetazoa_Chordata_Homo_sapiens-g_BRCA1-p_7\nNvec-3\tMetazoa_Cnidaria_Nematostella_vectensis-g_x-p_3\nbroken\n",
        )
        .unwrap();

        (
            rgs.display().to_string(),
            fasta.display().to_string(),
            map.display().to_string(),
            canonical.display().to_string(),
        )
    }

    #[test]
    fn test_assemble_concatenates_references_then_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let (rgs, fasta, map, canonical) = fixture(dir.path());

        let args = Args::from(vec![
            "assemble".into(),
            "--rgs".into(),
            rgs,
            "--fasta".into(),
            fasta,
            "--mapping".into(),
            map,
            "--canonical".into(),
            canonical,
            "--outdir".into(),
            dir.path().display().to_string(),
        ]);
        let SubArgs::Assemble { args } = args.command else {
            panic!("expected assemble subcommand");
        };

        let summary = assemble(args).unwrap();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.kept, 2);
        // malformed canonical row + unresolved TP53
        assert_eq!(summary.warned, 2);

        let records = read_fasta(dir.path().join(AGS)).unwrap();
        let headers: Vec<_> = records.iter().map(|r| r.header.as_str()).collect();
        assert_eq!(
            headers,
            vec![
                "Metazoa_Chordata_Homo_sapiens-g_BRCA1-p_7",
                "rgs2-human-hgnc-TP53",
                "Metazoa_Cnidaria_Nematostella_vectensis-g_x-p_3",
            ]
        );
    }

    #[test]
    fn test_assemble_flags_candidates_lost_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let (rgs, fasta, map, canonical) = fixture(dir.path());

        // rbh-species kept two candidates, the file handed over carries one
        let summary = crate::lib_rbh_remap(vec![
            "assemble".into(),
            "--rgs".into(),
            rgs,
            "--fasta".into(),
            fasta,
            "--mapping".into(),
            map,
            "--canonical".into(),
            canonical,
            "--expected-candidates".into(),
            "2".into(),
            "--outdir".into(),
            dir.path().display().to_string(),
        ])
        .unwrap();

        assert_eq!(summary.kept, 2);
        assert_eq!(summary.warned, 3);
        assert_eq!(read_fasta(dir.path().join(AGS)).unwrap().len(), 3);
    }

    #[test]
    fn test_assemble_flags_references_missing_from_set() {
        let dir = tempfile::tempdir().unwrap();
        let (_, fasta, map, canonical) = fixture(dir.path());
        let rgs = dir.path().join("rgs3.aa");
        std::fs::write(
            &rgs,
            ">rgs3-human-hgnc-BRCA1-breast-cancer-type-1\nMKV\n>rgs3-human-hgnc-TP53\nPPP\n",
        )
        .unwrap();

        let args = Args::from(vec![
            "assemble".into(),
            "--rgs".into(),
            rgs.display().to_string(),
            "--fasta".into(),
            fasta,
            "--mapping".into(),
            map,
            "--canonical".into(),
            canonical,
            "--outdir".into(),
            dir.path().display().to_string(),
        ]);
        let SubArgs::Assemble { args } = args.command else {
            panic!("expected assemble subcommand");
        };

        // malformed canonical row + 2 unresolved references + count anomaly
        assert_eq!(assemble(args).unwrap().warned, 4);
    }

    #[test]
    fn test_remap_candidates_with_nothing_resolved_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, _, canonical) = fixture(dir.path());
        let fasta = dir.path().join("unknown.aa");
        std::fs::write(&fasta, ">Xenu-1\nMKV\n").unwrap();
        let outdir = dir.path().join("out");

        let args = Args::from(vec![
            "candidates".into(),
            "--fasta".into(),
            fasta.display().to_string(),
            "--canonical".into(),
            canonical,
            "--outdir".into(),
            outdir.display().to_string(),
        ]);
        let SubArgs::Candidates { args } = args.command else {
            panic!("expected candidates subcommand");
        };

        assert!(remap_candidates(args).is_err());
        assert!(!outdir.join(REMAPPED_CGS).exists());
    }

    #[test]
    fn test_remap_candidates_writes_canonical_headers() {
        let dir = tempfile::tempdir().unwrap();
        let (_, fasta, _, canonical) = fixture(dir.path());

        let summary = crate::lib_rbh_remap(vec![
            "candidates".into(),
            "--fasta".into(),
            fasta,
            "--canonical".into(),
            canonical,
            "--outdir".into(),
            dir.path().display().to_string(),
        ])
        .unwrap();
        assert_eq!(summary.kept, 1);

        let records = read_fasta(dir.path().join(REMAPPED_CGS)).unwrap();
        assert_eq!(
            records[0].header,
            "Metazoa_Cnidaria_Nematostella_vectensis-g_x-p_3"
        );
    }
}
