//! Species filter for rbhtools
//!
//! A keeper survives when any allow-listed fragment occurs in its header.
//! No mapping state is consulted.

pub mod cli;
pub mod core;

pub use crate::core::{filter_species, is_allowed, load_allow_list, AllowList};

use config::StageSummary;

pub fn lib_rbh_species(args: Vec<String>) -> anyhow::Result<StageSummary> {
    let args = cli::Args::from(args);
    filter_species(args)
}
