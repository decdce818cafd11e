//! Core module for pairing reference sequences with model genome sequences
//!
//! The reference set is validated and sorted before any report is read, so
//! the bounded headers written here match the ones the searches were run
//! with. Reports are parsed in parallel and consumed in the order given:
//! within each report the first row to claim a genome id or a reference wins,
//! every later claim is skipped and counted.

use anyhow::{bail, Result};
use config::{
    expand_paths, get_progress_bar, parse_model_species, MatchMode, ModelSpecies, StageSummary,
    GENOME_REF_MAP, TRUNCATED_RGS, TRUNCATION_TABLE,
};
use hashbrown::HashMap;
use log::{error, info};
use rbh_trunc::{write_truncated_fasta, TruncationTable};
use rbhpack::{
    par_read, read_fasta, validate_reference_set, Conflict, FastaRecord, FullId, GenomeRefMap,
    HitReport, RgsHeader, ShortId,
};

use std::path::{Path, PathBuf};

use crate::cli::Args;

/// Validated reference records, sorted by header, with their bounded headers
pub struct ReferenceSet {
    pub records: Vec<FastaRecord>,
    pub table: TruncationTable,
    parsed: HashMap<FullId, RgsHeader>,
    by_truncated: HashMap<String, FullId>,
}

impl ReferenceSet {
    pub fn from_records(
        records: Vec<FastaRecord>,
        max_length: usize,
        truncate_to: usize,
        summary: &mut StageSummary,
    ) -> Result<Self> {
        let headers: Vec<&str> = records.iter().map(|r| r.header.as_str()).collect();
        let issues = validate_reference_set(&headers);
        if !issues.is_empty() {
            for issue in issues.iter() {
                error!("ERROR: {}", issue);
            }
            bail!(
                "ERROR: reference set failed validation with {} issues, first: {}",
                issues.len(),
                issues[0]
            );
        }

        let mut parsed = HashMap::with_capacity(records.len());
        let mut valid = Vec::with_capacity(records.len());
        for record in records {
            if let Some(rgs) = RgsHeader::parse(&record.header) {
                parsed.insert(FullId::new(record.header.as_str()), rgs);
                valid.push(record);
            }
        }

        if valid.is_empty() {
            bail!("ERROR: reference set is empty");
        }
        valid.sort_unstable_by(|a, b| a.header.cmp(&b.header));

        let headers: Vec<&str> = valid.iter().map(|r| r.header.as_str()).collect();
        let table = TruncationTable::build(&headers, max_length, truncate_to)?;
        for full in table.recut() {
            summary.warn(format!("emergency re-cut for reference header {}", full));
        }

        let by_truncated = table
            .changed()
            .map(|(full, truncated)| (truncated.to_string(), full.clone()))
            .collect();

        Ok(Self {
            records: valid,
            table,
            parsed,
            by_truncated,
        })
    }

    /// full header and parsed fields of a report query, given in full or bounded form
    pub fn resolve_query(&self, query: &str) -> Option<(&FullId, &RgsHeader)> {
        if let Some(hit) = self.parsed.get_key_value(query) {
            return Some(hit);
        }

        let full = self.by_truncated.get(query)?;
        self.parsed.get_key_value(full.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// model species designated by a report's file name
pub fn report_species<'a>(path: &Path, species: &'a [ModelSpecies]) -> Option<&'a ModelSpecies> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    species.iter().find(|sp| sp.found_in(&name))
}

/// Greedy best-hit-first mapping
///
/// Reports are consumed in the given order and rows in file order. A row maps
/// `hit -> query` only when the query's species tag names the report's model
/// species and neither side has been consumed before.
pub fn build_mapping(
    reports: &[(&ModelSpecies, HitReport)],
    references: &ReferenceSet,
    summary: &mut StageSummary,
) -> GenomeRefMap {
    let mut map = GenomeRefMap::new();

    for (species, report) in reports {
        let before = map.len();
        let mut unknown = 0;
        let (mut genome_taken, mut reference_taken) = (0, 0);

        for row in report.rows() {
            let Some((full, rgs)) = references.resolve_query(&row.query) else {
                unknown += 1;
                continue;
            };

            if !species.matches_field(&rgs.species, MatchMode::Exact) {
                continue;
            }

            let Some(truncated) = references.table.get(full.as_str()) else {
                continue;
            };

            // consumed on either side -> first row already won
            match map.insert(
                ShortId::new(row.hit.as_str()),
                truncated.clone(),
                full.clone(),
            ) {
                Ok(()) => {}
                Err(Conflict::KeyTaken) => genome_taken += 1,
                Err(Conflict::ValueTaken) => reference_taken += 1,
            }
        }

        if unknown > 0 {
            summary.warn(format!(
                "{}: {} rows with a query outside the reference set",
                report.label, unknown
            ));
        }

        summary.note(format!(
            "{} [{}]: {} mappings, {} rows skipped on a taken genome id, {} on a taken reference",
            report.label,
            species,
            map.len() - before,
            genome_taken,
            reference_taken
        ));
    }

    map
}

pub fn map_references(args: Args) -> Result<StageSummary> {
    info!("INFO: Mapping reference sequences to model genomes...");

    let mut summary = StageSummary::new("map");
    let species = parse_model_species(&args.species);
    if species.is_empty() {
        bail!("ERROR: no model species provided");
    }

    let records = read_fasta(&args.rgs)?;
    summary.processed = records.len();
    let references =
        ReferenceSet::from_records(records, args.max_length, args.truncate_to, &mut summary)?;
    info!("INFO: valid reference sequences: {}", references.len());

    let mut available: Vec<(&ModelSpecies, PathBuf)> = Vec::new();
    for path in expand_paths(&args.reports)? {
        if !path.is_file() {
            summary.warn(format!(
                "report not found, contributing zero mappings: {}",
                path.display()
            ));
            continue;
        }

        match report_species(&path, &species) {
            Some(sp) => available.push((sp, path)),
            None => summary.warn(format!(
                "could not identify model species for {}",
                path.display()
            )),
        }
    }

    let paths: Vec<&PathBuf> = available.iter().map(|(_, path)| path).collect();
    let pb = get_progress_bar(paths.len() as u64, "Reading reports...");
    let parsed = par_read(&paths, |path| {
        let report = HitReport::from_path(path, args.validate_order);
        pb.inc(1);
        report
    });
    pb.finish_and_clear();

    let mut reports = Vec::with_capacity(parsed.len());
    for ((sp, _), report) in available.iter().zip(parsed) {
        reports.push((*sp, report?));
    }

    let map = build_mapping(&reports, &references, &mut summary);
    if map.is_empty() {
        bail!(
            "ERROR: no genome -> reference mappings were created from {} reports; cannot proceed",
            reports.len()
        );
    }

    map.write(args.outdir.join(GENOME_REF_MAP))?;
    write_truncated_fasta(
        &references.records,
        &references.table,
        args.outdir.join(TRUNCATED_RGS),
    )?;
    references.table.write(args.outdir.join(TRUNCATION_TABLE))?;

    summary.kept = map.len();
    summary.log();

    Ok(summary)
}
