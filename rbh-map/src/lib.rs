//! Genome <-> reference mapping for rbhtools
//!
//! Reads the first-round reports (reference set searched against every model
//! genome) and keeps, greedily and best hit first, one genome sequence per
//! reference sequence and vice versa. Writes the mapping table, the
//! reference set under bounded headers and the truncation table.

pub mod cli;
pub mod core;

pub use crate::core::{build_mapping, map_references, report_species, ReferenceSet};

use config::StageSummary;

pub fn lib_rbh_map(args: Vec<String>) -> anyhow::Result<StageSummary> {
    let args = cli::Args::from(args);
    map_references(args)
}
