//! Identifier remapper for rbhtools
//!
//! Two chains end in canonical identifiers. Reference sequences go through
//! the genome -> reference mapping to the genome id they replaced, then
//! through the candidate -> canonical table. Candidates only need the
//! second hop. A missing link keeps the header as it was and is counted
//! as a warning.

pub mod cli;
pub mod core;

pub use crate::core::{
    assemble, remap_candidates, remap_records, resolve_candidate, resolve_reference, Remapped,
};

use config::StageSummary;

pub fn lib_rbh_remap(args: Vec<String>) -> anyhow::Result<StageSummary> {
    let args = cli::Args::from(args);
    match args.command {
        cli::SubArgs::Candidates { args } => remap_candidates(args),
        cli::SubArgs::Assemble { args } => assemble(args),
    }
}
