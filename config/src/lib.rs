//! Shared configuration for the rbhtools pipeline
//!
//! This crate holds the universal constants used by every rbh-tool
//! (identifier length ceilings, reference header layout, output file
//! names), the argument checker shared by all subcommands, atomic
//! writers and the per-stage summaries that are handed from one
//! component to the next.

pub mod fns;
pub mod mods;

pub use fns::*;
pub use mods::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const MIN_THREADS: usize = 1;
pub const MAX_HEADER_LENGTH: usize = 50; // search engine identifier ceiling
pub const TRUNCATE_TO: usize = 45;
pub const COUNTER_WIDTH: usize = 3; // _NNN
pub const FASTA_LINE_WIDTH: usize = 80;
pub const MIN_HIT_FIELDS: usize = 2;
pub const BITSCORE_FIELD: usize = 11; // 0-based, outfmt 6
pub const MIN_MAP_FIELDS: usize = 2;
pub const MAP_FIELDS: usize = 3;
pub const MIN_CANONICAL_FIELDS: usize = 2;

// reference set header layout: rgsN-species-source-identifier
pub const RGS_PREFIX: &str = "rgs";
pub const RGS_SEP: char = '-';
pub const RGS_MIN_FIELDS: usize = 4;

// file names
pub const TRUNCATION_TABLE: &str = "header_truncation_map.tsv";
pub const TRUNCATED_FASTA: &str = "truncated_headers.aa";
pub const GENOME_REF_MAP: &str = "map_rgs_to_genome_identifiers.tsv";
pub const TRUNCATED_RGS: &str = "rgs_truncated.aa";
pub const DECOY_SUFFIX: &str = "aa-rgs";
pub const DECOY_LIST: &str = "list_modified_genomes.txt";
pub const KEEPERS: &str = "rbf_keepers.txt";
pub const KEEPER_FASTA: &str = "rbf_sequences.aa";
pub const REJECTS: &str = "rbf_rejected.tsv";
pub const MISSING_KEEPERS: &str = "rbf_keepers_not_found.txt";
pub const SPECIES_FILTERED: &str = "cgs_filtered_by_species.aa";
pub const REMAPPED_CGS: &str = "cgs_remapped.aa";
pub const AGS: &str = "ags_homologs.aa";
pub const SUMMARY: &str = "rbh_summary.json";

// extensions
pub const FASTA_EXTENSIONS: [&str; 7] = ["aa", "fa", "fasta", "faa", "pep", "gz", "aa-rgs"];

// flags
pub const SUBSTRING_MATCH: bool = false;
pub const VALIDATE_ORDER: bool = true;
