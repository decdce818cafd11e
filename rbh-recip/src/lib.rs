//! Reciprocal filter for rbhtools
//!
//! Candidates were searched against the modified genomes. A candidate is a
//! keeper when its best hit carries the species tag of a model organism,
//! i.e. it landed on a reference decoy, and the candidate itself is not one
//! of the reference sequences. Keepers are then pulled, full length, out of
//! the candidate databases.

pub mod cli;
pub mod core;

pub use crate::core::{classify, extract_keepers, filter_reciprocal, is_model_hit, Classification};

use config::StageSummary;

pub fn lib_rbh_recip(args: Vec<String>) -> anyhow::Result<StageSummary> {
    let args = cli::Args::from(args);
    filter_reciprocal(args)
}
