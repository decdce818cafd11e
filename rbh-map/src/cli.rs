use clap::{self, ArgAction, Parser};
use config::{ArgCheck, MAX_HEADER_LENGTH, TRUNCATE_TO, VALIDATE_ORDER};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Map reference sequences to model-organism genome ids", long_about = None)]
pub struct Args {
    #[arg(
        short = 'r',
        long = "rgs",
        required = true,
        value_name = "PATH",
        help = "Path to reference gene set FASTA [rgsN-species-source-identifier headers]"
    )]
    pub rgs: PathBuf,

    #[arg(
        short = 'b',
        long = "reports",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "First-round hit reports, one per model genome, or a file listing them"
    )]
    pub reports: Vec<PathBuf>,

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
    fn get_sequences(&self) -> Vec<&PathBuf> {
        vec![&self.rgs]
    }

    // INFO: missing reports are tolerated, they contribute zero mappings
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
