//! Core module for writing modified genomes, one per model genome,
//! with every mapped genome sequence replaced by its reference sequence.

use anyhow::{bail, Context, Result};
use config::{
    expand_paths, get_progress_bar, parse_model_species, write_atomically, write_collection,
    ModelSpecies, StageSummary, DECOY_LIST, DECOY_SUFFIX,
};
use dashmap::{DashMap, DashSet};
use hashbrown::HashMap;
use log::info;
use rayon::prelude::*;
use rbhpack::{count_records, read_fasta, FastaReader, FastaWriter, GenomeRefMap};

use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use crate::cli::Args;

/// one modified genome and its counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoyGenome {
    pub source: PathBuf,
    pub path: PathBuf,
    pub total: usize,
    pub replaced: usize,
    pub swapped: Vec<String>,
    pub missing: Vec<String>,
}

/// Resolve genome inputs into FASTA paths
///
/// Files are taken as they are. A directory is searched for
/// `*<name>*.aa` per model species, trying the scientific name first.
pub fn discover_genomes(
    inputs: &[PathBuf],
    species: &[ModelSpecies],
    summary: &mut StageSummary,
) -> Result<Vec<PathBuf>> {
    let mut genomes = Vec::new();

    for input in expand_paths(inputs)? {
        if input.is_file() {
            genomes.push(input);
            continue;
        }

        if !input.is_dir() {
            summary.warn(format!("genome file not found (skipping): {}", input.display()));
            continue;
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&input)
            .with_context(|| format!("ERROR: cannot list {}", input.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "aa"))
            .collect();
        entries.sort();

        for sp in species {
            let found = sp.names().iter().find_map(|name| {
                entries
                    .iter()
                    .find(|path| {
                        path.file_name()
                            .is_some_and(|f| f.to_string_lossy().contains(name))
                    })
                    .cloned()
            });

            match found {
                Some(path) => genomes.push(path),
                None => summary.warn(format!(
                    "no genome for {} in {}",
                    sp,
                    input.display()
                )),
            }
        }
    }

    Ok(genomes)
}

/// `<outdir>/<genome file name>.aa-rgs`
pub fn decoy_path(genome: &Path, outdir: &Path) -> PathBuf {
    let name = genome
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "genome".to_string());

    outdir.join(format!("{}.{}", name, DECOY_SUFFIX))
}

/// Fail when two genomes would be written to the same decoy file
pub fn check_decoy_names(genomes: &[PathBuf], outdir: &Path) -> Result<()> {
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::with_capacity(genomes.len());

    for genome in genomes {
        let path = decoy_path(genome, outdir);
        if let Some(first) = claimed.get(&path) {
            bail!(
                "ERROR: {} and {} would both be written to {}, rename one of them",
                first.display(),
                genome.display(),
                path.display()
            );
        }
        claimed.insert(path, genome);
    }

    Ok(())
}

/// Write one modified genome next to the others in `outdir`
///
/// # Arguments
///
/// * `genome` - original genome FASTA
/// * `map` - genome id -> (bounded, full) reference headers
/// * `references` - full reference header -> residues
/// * `outdir` - output directory, the file is named `<genome>.aa-rgs`
///
/// # Returns
///
/// Counts for the written genome. A mapped id whose reference sequence is
/// absent keeps its original record and is listed in `missing`.
pub fn synthesize(
    genome: &Path,
    map: &GenomeRefMap,
    references: &HashMap<String, String>,
    outdir: &Path,
) -> Result<DecoyGenome> {
    let path = decoy_path(genome, outdir);

    let mut total = 0;
    let mut replaced = 0;
    let mut swapped = Vec::new();
    let mut missing = Vec::new();

    let reader = FastaReader::open(genome)?;
    write_atomically(&path, |w| {
        let mut writer = FastaWriter::new(w);

        for record in reader {
            let record = record.map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
            total += 1;

            match map.get(&record.header) {
                Some((truncated, full)) => match references.get(full.as_str()) {
                    Some(seq) => {
                        writer.write_record(truncated.as_str(), seq)?;
                        replaced += 1;
                        swapped.push(record.header);
                    }
                    None => {
                        missing.push(full.to_string());
                        writer.write(&record)?;
                    }
                },
                None => writer.write(&record)?,
            }
        }

        Ok(())
    })
    .with_context(|| format!("ERROR: failed to write {}", path.display()))?;

    let written = count_records(&path)?;
    if written != total {
        bail!(
            "ERROR: {} has {} records but its source {} has {}",
            path.display(),
            written,
            genome.display(),
            total
        );
    }

    Ok(DecoyGenome {
        source: genome.to_path_buf(),
        path,
        total,
        replaced,
        swapped,
        missing,
    })
}

pub fn synthesize_decoys(args: Args) -> Result<StageSummary> {
    info!("INFO: Creating modified genomes...");

    let mut summary = StageSummary::new("decoy");
    let species = parse_model_species(&args.species);

    let references: HashMap<String, String> = read_fasta(&args.rgs)?
        .into_iter()
        .map(|r| (r.header, r.seq))
        .collect();
    if references.is_empty() {
        bail!("ERROR: no reference sequences found in {}", args.rgs.display());
    }

    let map = GenomeRefMap::read(&args.mapping)?;
    if map.is_empty() {
        bail!("ERROR: no mappings found in {}", args.mapping.display());
    }

    let genomes = discover_genomes(&args.genomes, &species, &mut summary)?;
    if genomes.is_empty() {
        bail!("ERROR: no genome files found");
    }
    check_decoy_names(&genomes, &args.outdir)?;

    let counts: DashMap<PathBuf, (usize, usize)> = DashMap::new();
    let used: DashSet<String> = DashSet::new();

    let pb = get_progress_bar(genomes.len() as u64, "Swapping decoys...");
    let results: Vec<Result<DecoyGenome>> = genomes
        .par_iter()
        .map(|genome| {
            let decoy = synthesize(genome, &map, &references, &args.outdir);
            if let Ok(decoy) = &decoy {
                counts.insert(decoy.source.clone(), (decoy.total, decoy.replaced));
                decoy.swapped.iter().for_each(|id| {
                    used.insert(id.clone());
                });
            }
            pb.inc(1);
            decoy
        })
        .collect();
    pb.finish_and_clear();

    let mut outputs = Vec::with_capacity(results.len());
    for decoy in results {
        let decoy = decoy?;
        for full in decoy.missing.iter() {
            summary.warn(format!("reference sequence not found for {}", full));
        }
        info!(
            "INFO: {}: {} of {} sequences replaced",
            decoy.path.display(),
            decoy.replaced,
            decoy.total
        );
        outputs.push(decoy);
    }

    if used.len() < map.len() {
        summary.warn(format!(
            "{} mapped genome ids were not swapped into any genome database",
            map.len() - used.len()
        ));
    }

    write_collection(
        outputs.iter().map(|d| d.path.display().to_string()),
        args.outdir.join(DECOY_LIST),
    )?;

    summary.processed = counts.iter().map(|e| e.value().0).sum();
    summary.kept = counts.iter().map(|e| e.value().1).sum();
    summary.note(format!("{} modified genomes written", outputs.len()));
    summary.log();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbhpack::{FullId, ShortId, TruncId};

    fn mapping() -> GenomeRefMap {
        let mut map = GenomeRefMap::new();
        map.insert(
            ShortId::new("Homo_sapiens-2"),
            TruncId::new("rgs1-human-x-long_001"),
            FullId::new("rgs1-human-x-long-header"),
        )
        .unwrap();
        map
    }

    #[test]
    fn test_synthesize_keeps_shape_and_swaps_decoys() {
        let dir = tempfile::tempdir().unwrap();
        let genome = dir.path().join("Homo_sapiens.aa");
        std::fs::write(
            &genome,
            ">Homo_sapiens-1\nAAA\n>Homo_sapiens-2\nCCC\n>Homo_sapiens-3\nDDD\n",
        )
        .unwrap();

        let mut references = HashMap::new();
        references.insert("rgs1-human-x-long-header".to_string(), "MKV".to_string());

        let decoy = synthesize(&genome, &mapping(), &references, dir.path()).unwrap();
        assert_eq!(decoy.total, 3);
        assert_eq!(decoy.replaced, 1);
        assert!(decoy.path.display().to_string().ends_with("Homo_sapiens.aa.aa-rgs"));

        let records = read_fasta(&decoy.path).unwrap();
        let headers: Vec<_> = records.iter().map(|r| r.header.as_str()).collect();
        assert_eq!(
            headers,
            vec!["Homo_sapiens-1", "rgs1-human-x-long_001", "Homo_sapiens-3"]
        );
        assert_eq!(records[1].seq, "MKV");
    }

    #[test]
    fn test_missing_reference_keeps_original_record() {
        let dir = tempfile::tempdir().unwrap();
        let genome = dir.path().join("Homo_sapiens.aa");
        std::fs::write(&genome, ">Homo_sapiens-2\nCCC\n").unwrap();

        let decoy = synthesize(&genome, &mapping(), &HashMap::new(), dir.path()).unwrap();
        assert_eq!(decoy.replaced, 0);
        assert_eq!(decoy.missing, vec!["rgs1-human-x-long-header".to_string()]);
        assert_eq!(read_fasta(&decoy.path).unwrap()[0].seq, "CCC");
    }

    #[test]
    fn test_discover_genomes_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x-Homo_sapiens-proteome.aa"), ">a\nM\n").unwrap();
        std::fs::write(dir.path().join("x-Homo_sapiens-proteome.txt"), "").unwrap();

        let species = parse_model_species(&["human", "worm"]);
        let mut summary = StageSummary::new("test");
        let genomes =
            discover_genomes(&[dir.path().to_path_buf()], &species, &mut summary).unwrap();

        assert_eq!(genomes.len(), 1);
        assert!(genomes[0].ends_with("x-Homo_sapiens-proteome.aa"));
        assert_eq!(summary.warned, 1);
    }

    #[test]
    fn test_genomes_sharing_a_file_name_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let rgs = dir.path().join("rgs.aa");
        std::fs::write(&rgs, ">rgs1-human-x-long-header\nMKV\n").unwrap();
        let map = dir.path().join("map.tsv");
        mapping().write(&map).unwrap();

        let mut genomes = Vec::new();
        for release in ["v1", "v2"] {
            let sub = dir.path().join(release);
            std::fs::create_dir_all(&sub).unwrap();
            let genome = sub.join("Homo_sapiens.aa");
            std::fs::write(&genome, ">Homo_sapiens-2\nCCC\n").unwrap();
            genomes.push(genome);
        }
        let outdir = dir.path().join("out");
        assert!(check_decoy_names(&genomes, &outdir).is_err());
        assert!(check_decoy_names(&genomes[..1], &outdir).is_ok());

        let args = Args::from(vec![
            "--rgs".into(),
            rgs.display().to_string(),
            "--mapping".into(),
            map.display().to_string(),
            "--genomes".into(),
            format!("{},{}", genomes[0].display(), genomes[1].display()),
            "--outdir".into(),
            outdir.display().to_string(),
        ]);

        assert!(synthesize_decoys(args).is_err());
        assert!(!outdir.join("Homo_sapiens.aa.aa-rgs").exists());
    }

    #[test]
    fn test_synthesize_decoys_writes_list() {
        let dir = tempfile::tempdir().unwrap();
        let rgs = dir.path().join("rgs.aa");
        std::fs::write(&rgs, ">rgs1-human-x-long-header\nMKV\n").unwrap();
        let map = dir.path().join("map.tsv");
        mapping().write(&map).unwrap();
        let genome = dir.path().join("Homo_sapiens.aa");
        std::fs::write(&genome, ">Homo_sapiens-1\nAAA\n>Homo_sapiens-2\nCCC\n").unwrap();
        let outdir = dir.path().join("out");

        let args = Args::from(vec![
            "--rgs".into(),
            rgs.display().to_string(),
            "--mapping".into(),
            map.display().to_string(),
            "--genomes".into(),
            format!("{},{}", genome.display(), dir.path().join("missing.aa").display()),
            "--outdir".into(),
            outdir.display().to_string(),
        ]);

        let summary = synthesize_decoys(args).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.warned, 1);

        let list = std::fs::read_to_string(outdir.join(DECOY_LIST)).unwrap();
        assert_eq!(list.lines().count(), 1);
    }
}
