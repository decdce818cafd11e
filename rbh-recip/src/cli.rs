use clap::{self, ArgAction, Parser};
use config::{
    validate, ArgCheck, CliError, FASTA_EXTENSIONS, SUBSTRING_MATCH, VALIDATE_ORDER,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Keep candidates whose best reciprocal hit is a model-species decoy", long_about = None)]
pub struct Args {
    #[arg(
        short = 'b',
        long = "report",
        required = true,
        value_name = "PATH",
        help = "Reciprocal hit report [candidates vs modified genomes]"
    )]
    pub report: PathBuf,

    #[arg(
        short = 'm',
        long = "mapping",
        required = true,
        value_name = "PATH",
        help = "Path to genome -> reference mapping table [rbh-map output]"
    )]
    pub mapping: PathBuf,

    #[arg(
        short = 'r',
        long = "references",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Reference set FASTA files, full and truncated [rbh-map output]"
    )]
    pub references: Vec<PathBuf>,

    #[arg(
        short = 'd',
        long = "databases",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Candidate (project) FASTA databases, or a file listing them"
    )]
    pub databases: Vec<PathBuf>,

    #[arg(
        short = 's',
        long = "species",
        required = true,
        value_name = "NAMES",
        value_delimiter = ',',
        num_args = 1..,
        help = "Model species names (e.g. human,fly,worm or \"human fly worm\")"
    )]
    pub species: Vec<String>,

    #[arg(
        long = "substring",
        required = false,
        value_name = "FLAG",
        help = "Match species by containment in the hit tag instead of equality",
        default_missing_value("true"),
        default_value_t = SUBSTRING_MATCH,
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub substring: bool,

    #[arg(
        long = "validate-order",
        required = false,
        value_name = "FLAG",
        help = "Reject reports whose bitscores increase within a query",
        default_missing_value("true"),
        default_value_t = VALIDATE_ORDER,
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub validate_order: bool,

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
    // INFO: missing databases are warnings, only an empty list is an error
    fn check_sequences(&self) -> Result<(), CliError> {
        if self.databases.is_empty() {
            let err = "No candidate databases provided".to_string();
            return Err(CliError::InvalidInput(err));
        }

        for reference in self.references.iter() {
            validate(reference, Some(&FASTA_EXTENSIONS))?;
        }

        Ok(())
    }

    fn get_sequences(&self) -> Vec<&PathBuf> {
        self.databases.iter().collect()
    }

    fn get_tables(&self) -> Vec<&PathBuf> {
        vec![&self.report, &self.mapping]
    }
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}
