//! Record layer shared by every rbh-tool
//!
//! Holds the readers and writers for the three file kinds the pipeline
//! moves around (FASTA databases, tabular hit reports and tab-separated
//! mapping tables) plus the typed identifiers that keep full, truncated,
//! short and canonical headers from being mixed in the same set.

use std::fmt::Debug;
use std::path::Path;

use rayon::prelude::*;
use thiserror::Error;

pub mod fasta;
pub mod hits;
pub mod ident;
pub mod table;

pub use fasta::{count_records, read_fasta, FastaReader, FastaRecord, FastaWriter};
pub use hits::{HitReport, HitRow};
pub use ident::{
    species_field, validate_reference_set, Canonical, CanonicalId, Full, FullId, Id, RgsHeader,
    Short, ShortId, TruncId, Truncated,
};
pub use table::{Bijection, CanonicalTable, Conflict, GenomeRefMap};

/// structural errors raised while parsing records
#[derive(Debug, Error)]
pub enum PackError {
    #[error("ERROR: {path}:{line}: expected at least {min} tab-separated fields, found {found}")]
    MissingFields {
        path: String,
        line: usize,
        min: usize,
        found: usize,
    },
    #[error("ERROR: {path}:{line}: invalid score {value:?}")]
    InvalidScore {
        path: String,
        line: usize,
        value: String,
    },
    #[error("ERROR: {path}:{line}: hits for query {query} are not ordered best-first ({previous} -> {current})")]
    Unordered {
        path: String,
        line: usize,
        query: String,
        previous: f64,
        current: f64,
    },
    #[error("ERROR: {path}: sequence data found before the first header")]
    HeaderlessFasta { path: String },
    #[error("ERROR: {path}:{line}: {key:?} breaks the one-to-one mapping ({reason})")]
    NotBijective {
        path: String,
        line: usize,
        key: String,
        reason: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// read many files in parallel while keeping their input order
pub fn par_read<P, T, F>(files: &[P], read: F) -> Vec<Result<T, PackError>>
where
    P: AsRef<Path> + Debug + Sync + Send,
    T: Send,
    F: Fn(&Path) -> Result<T, PackError> + Sync + Send,
{
    files.par_iter().map(|path| read(path.as_ref())).collect()
}
