use clap::{self, Parser};
use config::ArgCheck;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Swap reference decoys into model genomes", long_about = None)]
pub struct Args {
    #[arg(
        short = 'r',
        long = "rgs",
        required = true,
        value_name = "PATH",
        help = "Path to reference gene set FASTA with full headers"
    )]
    pub rgs: PathBuf,

    #[arg(
        short = 'm',
        long = "mapping",
        required = true,
        value_name = "PATH",
        help = "Path to genome -> reference mapping table [rbh-map output]"
    )]
    pub mapping: PathBuf,

    #[arg(
        short = 'g',
        long = "genomes",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Model genome FASTA files, a file listing them or a directory to search"
    )]
    pub genomes: Vec<PathBuf>,

    #[arg(
        short = 's',
        long = "species",
        required = false,
        value_name = "NAMES",
        value_delimiter = ',',
        num_args = 1..,
        help = "Model species used to locate genomes inside directories"
    )]
    pub species: Vec<String>,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,

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
        vec![&self.rgs]
    }

    fn get_tables(&self) -> Vec<&PathBuf> {
        vec![&self.mapping]
    }
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}
