use clap::{Parser, Subcommand};
use config::ArgCheck;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Rewrite identifiers into canonical form and assemble the homolog set", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubArgs,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}

#[derive(Debug, Subcommand)]
pub enum SubArgs {
    #[command(name = "candidates")]
    Candidates {
        #[command(flatten)]
        args: CandidateArgs,
    },

    #[command(name = "assemble")]
    Assemble {
        #[command(flatten)]
        args: AssembleArgs,
    },
}

#[derive(Debug, Parser)]
pub struct CandidateArgs {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Candidate sequences with short identifiers"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'c',
        long = "canonical",
        required = true,
        value_name = "PATH",
        help = "Candidate -> canonical table [short_id\\tcanonical_id]"
    )]
    pub canonical: PathBuf,

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

impl ArgCheck for CandidateArgs {
    fn get_sequences(&self) -> Vec<&PathBuf> {
        vec![&self.fasta]
    }

    fn get_tables(&self) -> Vec<&PathBuf> {
        vec![&self.canonical]
    }
}

#[derive(Debug, Parser)]
pub struct AssembleArgs {
    #[arg(
        short = 'r',
        long = "rgs",
        required = true,
        value_name = "PATH",
        help = "Reference gene set FASTA"
    )]
    pub rgs: PathBuf,

    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Candidate sequences with short identifiers [rbh-species output]"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'm',
        long = "mapping",
        required = true,
        value_name = "PATH",
        help = "Path to genome -> reference mapping table [rbh-map output]"
    )]
    pub mapping: PathBuf,

    #[arg(
        short = 'c',
        long = "canonical",
        required = true,
        value_name = "PATH",
        help = "Candidate -> canonical table [short_id\\tcanonical_id]"
    )]
    pub canonical: PathBuf,

    #[arg(
        short = 'e',
        long = "expected-candidates",
        required = false,
        value_name = "COUNT",
        help = "Candidates kept by rbh-species, checked against the assembled set"
    )]
    pub expected_candidates: Option<usize>,

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

impl ArgCheck for AssembleArgs {
    fn get_sequences(&self) -> Vec<&PathBuf> {
        vec![&self.rgs, &self.fasta]
    }

    fn get_tables(&self) -> Vec<&PathBuf> {
        vec![&self.mapping, &self.canonical]
    }
}
