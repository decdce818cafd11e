use clap::{self, Parser};
use config::ArgCheck;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Subset keeper sequences by a species allow-list", long_about = None)]
pub struct Args {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Keeper sequences [rbh-recip output]"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'a',
        long = "allow-list",
        required = false,
        value_name = "PATH",
        help = "Newline-delimited species name fragments"
    )]
    pub allow_list: Option<PathBuf>,

    #[arg(
        short = 'k',
        long = "keep",
        required = false,
        value_name = "FRAGMENTS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Species name fragments given inline, merged with --allow-list"
    )]
    pub keep: Vec<String>,

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

    fn get_optional(&self) -> Vec<&PathBuf> {
        self.allow_list.iter().collect()
    }
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}
