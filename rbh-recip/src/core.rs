//! Core module for the reciprocal best-hit filter
//!
//! A candidate survives when its best hit against the modified genomes is a
//! model-species reference and the candidate itself is none of the
//! reference identifiers. Survivors are then pulled from the candidate
//! databases in parallel.

use anyhow::{bail, Result};
use config::{
    expand_paths, get_progress_bar, parse_model_species, write_atomically, write_collection,
    write_objs, MatchMode, ModelSpecies, StageSummary, KEEPERS, KEEPER_FASTA, MISSING_KEEPERS,
    REJECTS,
};
use dashmap::DashSet;
use hashbrown::HashSet;
use log::info;
use rayon::prelude::*;
use rbhpack::{
    species_field, FastaReader, FastaRecord, FastaWriter, GenomeRefMap, HitReport, PackError,
    RgsHeader,
};

use std::path::PathBuf;

use crate::cli::Args;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub keepers: Vec<String>,
    pub rejects: Vec<(String, String)>,
    pub circular: usize,
}

/// does the hit carry the species tag of a model organism?
pub fn is_model_hit(hit: &str, species: &[ModelSpecies], mode: MatchMode) -> bool {
    match species_field(hit) {
        Some(tag) => species.iter().any(|sp| sp.matches_field(&tag, mode)),
        None => false,
    }
}

/// Classify every query by its best hit
///
/// Keeper: best hit is a model-species decoy and the query is not a
/// reference sequence under any of its identifiers. Everything else goes
/// to the rejects log together with its hit.
pub fn classify(
    report: &HitReport,
    exclusions: &HashSet<String>,
    species: &[ModelSpecies],
    mode: MatchMode,
) -> Classification {
    let mut classification = Classification::default();

    for row in report.best_hits() {
        if !is_model_hit(&row.hit, species, mode) {
            classification
                .rejects
                .push((row.query.clone(), row.hit.clone()));
            continue;
        }

        if exclusions.contains(row.query.as_str()) || RgsHeader::is_reference(&row.query) {
            classification.circular += 1;
            classification
                .rejects
                .push((row.query.clone(), row.hit.clone()));
            continue;
        }

        classification.keepers.push(row.query.clone());
    }

    classification
}

/// Every identifier a reference sequence may carry in a report
///
/// Mapped references contribute their full, truncated and genome ids; the
/// reference FASTA files add every header, mapped or not.
pub fn reference_exclusions(
    map: &GenomeRefMap,
    references: &[PathBuf],
) -> Result<HashSet<String>> {
    let mut exclusions = map.reference_variants();

    for path in references {
        for record in FastaReader::open(path)? {
            exclusions.insert(record?.header);
        }
    }

    Ok(exclusions)
}

/// Pull keeper records out of the candidate databases
///
/// Databases are read in parallel; records come back in database order and
/// the first occurrence of a header wins.
pub fn extract_keepers(
    databases: &[PathBuf],
    keepers: &HashSet<String>,
    summary: &mut StageSummary,
) -> Result<(Vec<FastaRecord>, DashSet<String>)> {
    let available: Vec<&PathBuf> = databases
        .iter()
        .filter(|db| {
            let exists = db.is_file();
            if !exists {
                summary.warn(format!("database not found (skipping): {}", db.display()));
            }
            exists
        })
        .collect();

    let pb = get_progress_bar(available.len() as u64, "Extracting keepers...");
    let per_db: Vec<Result<Vec<FastaRecord>, PackError>> = available
        .par_iter()
        .map(|db| -> Result<Vec<FastaRecord>, PackError> {
            let mut records = Vec::new();
            for record in FastaReader::open(db)? {
                let record = record?;
                if keepers.contains(record.header.as_str()) {
                    records.push(record);
                }
            }
            pb.inc(1);
            Ok(records)
        })
        .collect();
    pb.finish_and_clear();

    let found = DashSet::new();
    let mut extracted = Vec::with_capacity(keepers.len());
    for records in per_db {
        for record in records? {
            if found.insert(record.header.clone()) {
                extracted.push(record);
            }
        }
    }

    Ok((extracted, found))
}

pub fn filter_reciprocal(args: Args) -> Result<StageSummary> {
    info!("INFO: Filtering reciprocal best fits...");

    let mut summary = StageSummary::new("recip");
    let species = parse_model_species(&args.species);
    if species.is_empty() {
        bail!("ERROR: no model species provided");
    }
    let mode = MatchMode::from_flag(args.substring);

    let map = GenomeRefMap::read(&args.mapping)?;
    let exclusions = reference_exclusions(&map, &args.references)?;
    info!("INFO: reference identifiers excluded from keepers: {}", exclusions.len());

    let report = HitReport::from_path(&args.report, args.validate_order)?;
    let classification = classify(&report, &exclusions, &species, mode);
    summary.processed = report.best_hits().len();

    if classification.circular > 0 {
        summary.note(format!(
            "{} reference queries hit a decoy and were rejected",
            classification.circular
        ));
    }
    if classification.keepers.is_empty() {
        bail!(
            "ERROR: no keeper sequences identified in {} ({} queries rejected)",
            args.report.display(),
            classification.rejects.len()
        );
    }

    let wanted: HashSet<String> = classification.keepers.iter().cloned().collect();
    let databases = expand_paths(&args.databases)?;
    let (records, found) = extract_keepers(&databases, &wanted, &mut summary)?;
    if records.is_empty() {
        bail!("ERROR: none of the {} keepers was found in the candidate databases", wanted.len());
    }

    let missing: DashSet<String> = wanted
        .iter()
        .filter(|id| !found.contains(id.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        summary.warn(format!(
            "{} keepers not found in any candidate database",
            missing.len()
        ));
        write_objs(&missing, args.outdir.join(MISSING_KEEPERS))?;
    }

    write_collection(classification.keepers.iter(), args.outdir.join(KEEPERS))?;
    write_collection(
        classification
            .rejects
            .iter()
            .map(|(query, hit)| format!("{}\t{}", query, hit)),
        args.outdir.join(REJECTS),
    )?;
    write_atomically(args.outdir.join(KEEPER_FASTA), |w| {
        let mut writer = FastaWriter::new(w);
        for record in records.iter() {
            writer.write(record)?;
        }
        Ok(())
    })?;

    summary.kept = records.len();
    summary.log();

    Ok(summary)
}
