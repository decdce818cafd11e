//! Whole-pipeline runner for rbhtools
//!
//! A TOML profile lists every input the stages need. Stages run in order,
//! each one reading what the previous one left in `outdir`, and their
//! summaries are merged into a single json descriptor at the end.
//!
//! The similarity searches themselves happen outside of rbhtools: run
//! `map` and `decoy` first, search the candidates against the modified
//! genomes, then run `recip`, `species` and `remap` on the result.

use anyhow::{bail, Context, Result};
use config::{
    write_summaries, StageSummary, GENOME_REF_MAP, KEEPER_FASTA, MAX_HEADER_LENGTH,
    SPECIES_FILTERED, SUBSTRING_MATCH, SUMMARY, TRUNCATED_RGS, TRUNCATE_TO, VALIDATE_ORDER,
};
use log::info;
use serde::{Deserialize, Serialize};

use rbh_decoy::lib_rbh_decoy;
use rbh_map::lib_rbh_map;
use rbh_recip::lib_rbh_recip;
use rbh_remap::lib_rbh_remap;
use rbh_species::lib_rbh_species;

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Map,
    Decoy,
    Recip,
    Species,
    Remap,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Map,
        Stage::Decoy,
        Stage::Recip,
        Stage::Species,
        Stage::Remap,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Map => "map",
            Stage::Decoy => "decoy",
            Stage::Recip => "recip",
            Stage::Species => "species",
            Stage::Remap => "remap",
        };
        write!(f, "{}", name)
    }
}

/// Pipeline profile
///
/// Paths are taken relative to the working directory.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PipelineConfig {
    /// reference gene set FASTA
    pub rgs: PathBuf,
    /// model species names, aliases are resolved by the stages
    pub species: Vec<String>,
    /// first-round reports, reference set vs model genomes
    #[serde(default)]
    pub reports: Vec<PathBuf>,
    /// model genome FASTA files or directories
    #[serde(default)]
    pub genomes: Vec<PathBuf>,
    /// second-round report, candidates vs modified genomes
    pub reciprocal_report: Option<PathBuf>,
    #[serde(default)]
    pub databases: Vec<PathBuf>,
    pub allow_list: Option<PathBuf>,
    #[serde(default)]
    pub keep: Vec<String>,
    /// short_id -> canonical_id table
    pub canonical: Option<PathBuf>,
    pub outdir: PathBuf,
    #[serde(default = "all_stages")]
    pub stages: Vec<Stage>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_truncate_to")]
    pub truncate_to: usize,
    #[serde(default = "default_substring")]
    pub substring: bool,
    #[serde(default = "default_validate_order")]
    pub validate_order: bool,
    #[serde(default = "num_cpus::get")]
    pub threads: usize,
}

fn all_stages() -> Vec<Stage> {
    Stage::ALL.to_vec()
}

fn default_max_length() -> usize {
    MAX_HEADER_LENGTH
}

fn default_truncate_to() -> usize {
    TRUNCATE_TO
}

fn default_substring() -> bool {
    SUBSTRING_MATCH
}

fn default_validate_order() -> bool {
    VALIDATE_ORDER
}

fn join<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn required<'a>(value: &'a Option<PathBuf>, key: &str, stage: Stage) -> Result<&'a PathBuf> {
    match value {
        Some(path) => Ok(path),
        None => bail!("ERROR: stage '{}' needs '{}' in the profile", stage, key),
    }
}

impl PipelineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("ERROR: cannot read profile {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("ERROR: invalid profile {}", path.display()))
    }

    /// command line handed to a stage
    pub fn stage_args(&self, stage: Stage) -> Result<Vec<String>> {
        if self.species.is_empty() && matches!(stage, Stage::Map | Stage::Recip) {
            bail!("ERROR: stage '{}' needs at least one model species", stage);
        }

        let outdir = path_arg(&self.outdir);
        let mapping = path_arg(&self.outdir.join(GENOME_REF_MAP));
        let species = self.species.join(",");

        let args = match stage {
            Stage::Map => {
                if self.reports.is_empty() {
                    bail!("ERROR: stage 'map' needs 'reports' in the profile");
                }
                vec![
                    "--rgs".to_string(),
                    path_arg(&self.rgs),
                    "--reports".to_string(),
                    join(&self.reports),
                    "--species".to_string(),
                    species,
                    "--max-length".to_string(),
                    self.max_length.to_string(),
                    "--truncate-to".to_string(),
                    self.truncate_to.to_string(),
                    format!("--validate-order={}", self.validate_order),
                    "--threads".to_string(),
                    self.threads.to_string(),
                    "--outdir".to_string(),
                    outdir,
                ]
            }
            Stage::Decoy => {
                if self.genomes.is_empty() {
                    bail!("ERROR: stage 'decoy' needs 'genomes' in the profile");
                }
                let mut args = vec![
                    "--rgs".to_string(),
                    path_arg(&self.rgs),
                    "--mapping".to_string(),
                    mapping,
                    "--genomes".to_string(),
                    join(&self.genomes),
                ];
                if !self.species.is_empty() {
                    args.extend(["--species".to_string(), species]);
                }
                args.extend([
                    "--threads".to_string(),
                    self.threads.to_string(),
                    "--outdir".to_string(),
                    outdir,
                ]);
                args
            }
            Stage::Recip => {
                let report = required(&self.reciprocal_report, "reciprocal_report", stage)?;
                if self.databases.is_empty() {
                    bail!("ERROR: stage 'recip' needs 'databases' in the profile");
                }
                vec![
                    "--report".to_string(),
                    path_arg(report),
                    "--mapping".to_string(),
                    mapping,
                    "--references".to_string(),
                    format!(
                        "{},{}",
                        path_arg(&self.rgs),
                        path_arg(&self.outdir.join(TRUNCATED_RGS))
                    ),
                    "--databases".to_string(),
                    join(&self.databases),
                    "--species".to_string(),
                    species,
                    format!("--substring={}", self.substring),
                    format!("--validate-order={}", self.validate_order),
                    "--threads".to_string(),
                    self.threads.to_string(),
                    "--outdir".to_string(),
                    outdir,
                ]
            }
            Stage::Species => {
                let mut args = vec![
                    "--fasta".to_string(),
                    path_arg(&self.outdir.join(KEEPER_FASTA)),
                ];
                if let Some(list) = &self.allow_list {
                    args.extend(["--allow-list".to_string(), path_arg(list)]);
                }
                if !self.keep.is_empty() {
                    args.extend(["--keep".to_string(), self.keep.join(",")]);
                }
                args.extend(["--outdir".to_string(), outdir]);
                args
            }
            Stage::Remap => {
                let canonical = required(&self.canonical, "canonical", stage)?;
                vec![
                    "assemble".to_string(),
                    "--rgs".to_string(),
                    path_arg(&self.rgs),
                    "--fasta".to_string(),
                    path_arg(&self.outdir.join(SPECIES_FILTERED)),
                    "--mapping".to_string(),
                    mapping,
                    "--canonical".to_string(),
                    path_arg(canonical),
                    "--outdir".to_string(),
                    outdir,
                ]
            }
        };

        Ok(args)
    }
}

fn run_stage(stage: Stage, args: Vec<String>) -> Result<StageSummary> {
    match stage {
        Stage::Map => lib_rbh_map(args),
        Stage::Decoy => lib_rbh_decoy(args),
        Stage::Recip => lib_rbh_recip(args),
        Stage::Species => lib_rbh_species(args),
        Stage::Remap => lib_rbh_remap(args),
    }
}

/// Run the selected stages in order
///
/// Summaries of the stages that finished are written to `<outdir>/rbh_summary.json`
/// even when a later stage fails.
pub fn run_pipeline(config: &PipelineConfig) -> Result<Vec<StageSummary>> {
    std::fs::create_dir_all(&config.outdir)
        .with_context(|| format!("ERROR: cannot create {}", config.outdir.display()))?;

    let summary_path = config.outdir.join(SUMMARY);
    let mut summaries: Vec<StageSummary> = Vec::with_capacity(config.stages.len());

    for stage in config.stages.iter().copied() {
        info!("INFO: running stage '{}'...", stage);

        let outcome = config
            .stage_args(stage)
            .map(|mut args| {
                if let (Stage::Remap, Some(species)) =
                    (stage, summaries.iter().find(|s| s.stage == "species"))
                {
                    args.push("--expected-candidates".to_string());
                    args.push(species.kept.to_string());
                }
                args
            })
            .and_then(|args| run_stage(stage, args));

        match outcome {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                write_summaries(&summaries, &summary_path)?;
                return Err(e.context(format!("ERROR: stage '{}' failed", stage)));
            }
        }
    }

    write_summaries(&summaries, &summary_path)?;
    info!("INFO: summary written to {}", summary_path.display());

    Ok(summaries)
}
