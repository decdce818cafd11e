//! Identifier truncation for rbhtools
//!
//! Search engines cap identifier length, so every header longer than the
//! ceiling is cut and suffixed with a per-prefix counter (`_001`, `_002`, ...).
//! The resulting mapping is total and injective and is persisted next to the
//! truncated FASTA so later stages can go back to the full header.

pub mod cli;
pub mod core;

pub use crate::core::{truncate_fasta, write_truncated_fasta, TruncationTable};

use config::StageSummary;

pub fn lib_rbh_trunc(args: Vec<String>) -> anyhow::Result<StageSummary> {
    let args = cli::Args::from(args);
    truncate_fasta(args)
}
