//! Modified-genome synthesis for rbhtools
//!
//! Every model genome is rewritten record by record: sequences whose id is a
//! mapped genome id are replaced by their reference counterpart under its
//! bounded header, everything else is copied as is. Output keeps the count
//! and order of the input.

pub mod cli;
pub mod core;

pub use crate::core::{discover_genomes, synthesize, synthesize_decoys, DecoyGenome};

use config::StageSummary;

pub fn lib_rbh_decoy(args: Vec<String>) -> anyhow::Result<StageSummary> {
    let args = cli::Args::from(args);
    synthesize_decoys(args)
}
