use clap::{self, Parser};
use config::{ArgCheck, MAX_HEADER_LENGTH, TRUNCATE_TO};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Collision-free, length-bounded FASTA headers", long_about = None)]
pub struct Args {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Path to FASTA file whose headers should be bounded"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'l',
        long = "max-length",
        required = false,
        value_name = "VALUE",
        help = "Maximum header length accepted by the search engine",
        default_value_t = MAX_HEADER_LENGTH
    )]
    pub max_length: usize,

    #[arg(
        short = 'w',
        long = "truncate-to",
        required = false,
        value_name = "VALUE",
        help = "Number of leading characters kept before the _NNN counter",
        default_value_t = TRUNCATE_TO
    )]
    pub truncate_to: usize,

    #[arg(
        long = "outdir",
        short = 'o',
        required = false,
        value_name = "PATH",
        num_args = 1,
        help = "Path to output directory",
        default_value = "."
    )]
    pub outdir: PathBuf,
}

impl ArgCheck for Args {
    fn get_sequences(&self) -> Vec<&PathBuf> {
        vec![&self.fasta]
    }

    fn get_tables(&self) -> Vec<&PathBuf> {
        Vec::new()
    }
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}
