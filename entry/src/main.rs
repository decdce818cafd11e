/// rbhtools: reciprocal best-hit homolog discovery
///
/// This is the entry point for the rbhtools CLI.
/// It is responsible for parsing the CLI arguments
/// and executing the appropriate subcommand [rbh-tool].
///
/// This wrapper offers 6 different subcommands:
/// - rbh-trunc
/// - rbh-map
/// - rbh-decoy
/// - rbh-recip
/// - rbh-species
/// - rbh-remap
///
/// Each subcommand handles one identifier transformation of the
/// pipeline: bounding header lengths, mapping reference sequences
/// to model genomes, swapping decoys into those genomes, filtering
/// reciprocal best fits, subsetting by species and finally mapping
/// everything back to canonical identifiers. Besides these, 'run'
/// chains all stages from a TOML profile. Two hidden crates are
/// shared by all of them: 'rbh-pack', the record layer, and 'config',
/// the universal constants for the rbhtools pipeline.
///
/// To get help on the subcommands, you can run:
///
/// ```shell
/// rbhtools rbh-map -- --help
/// ```
///
use clap::{Args, Parser, Subcommand};
use log::{error, info, Level};
use rbhtools::{run_pipeline, PipelineConfig};
use simple_logger::init_with_level;

use std::path::PathBuf;
use std::process::Command;

const ENTRY: &str = env!("CARGO_MANIFEST_DIR");
const RELEASES: &str = "target/release";

#[derive(Parser)]
#[command(name = "rbhtools")]
#[command(about = "rbhtools: reciprocal best-hit homolog discovery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "rbh-trunc")]
    Trunc(RbhArgs),
    #[command(name = "rbh-map")]
    Map(RbhArgs),
    #[command(name = "rbh-decoy")]
    Decoy(RbhArgs),
    #[command(name = "rbh-recip")]
    Recip(RbhArgs),
    #[command(name = "rbh-species")]
    Species(RbhArgs),
    #[command(name = "rbh-remap")]
    Remap(RbhArgs),
    #[command(name = "run")]
    Run(RunArgs),
}

#[derive(Args)]
struct RbhArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Args)]
struct RunArgs {
    #[arg(
        short = 'p',
        long = "profile",
        required = true,
        value_name = "PATH",
        help = "Pipeline profile [TOML]"
    )]
    profile: PathBuf,
}

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();
    let cli = Cli::parse();

    init();

    let (cmd, args) = match cli.command {
        Commands::Trunc(args) => ("rbh-trunc", args.args),
        Commands::Map(args) => ("rbh-map", args.args),
        Commands::Decoy(args) => ("rbh-decoy", args.args),
        Commands::Recip(args) => ("rbh-recip", args.args),
        Commands::Species(args) => ("rbh-species", args.args),
        Commands::Remap(args) => ("rbh-remap", args.args),
        Commands::Run(args) => {
            run(args.profile);
            info!("Elapsed time: {:?}", start.elapsed());
            return;
        }
    };

    let package = std::path::Path::new(ENTRY)
        .parent()
        .expect("ERROR: Could not get parent dir")
        .join(RELEASES)
        .join(cmd);

    let output = if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        Command::new(package)
            .arg("--help")
            .output()
            .expect("ERROR: Failed to execute process")
    } else {
        Command::new(package)
            .args(args)
            .output()
            .expect("ERROR: Failed to execute process")
    };

    check_output(output);
}

fn run(profile: PathBuf) {
    let config = PipelineConfig::from_path(&profile).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .unwrap();

    let summaries = run_pipeline(&config).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    for summary in summaries.iter() {
        summary.log();
    }
}

fn check_output(output: std::process::Output) {
    if output.status.success() {
        info!("{}", String::from_utf8_lossy(&output.stdout));
    } else {
        error!("{}", String::from_utf8_lossy(&output.stderr));
        std::process::exit(1);
    }
}

fn init() {
    let message = format!(
        r#"

        rbhtools: reciprocal best-hit homolog discovery

        this is the entry point for the rbhtools CLI
        and it is responsible for parsing the CLI arguments
        for each rbh-tool:

        - rbh-trunc
        - rbh-map
        - rbh-decoy
        - rbh-recip
        - rbh-species
        - rbh-remap

        or for running the whole pipeline from a profile:

            rbhtools run --profile <PATH>

        > version: {}

        * to get help on the subcommands, run:
            rbhtools <SUBCOMMAND> -- --help

        "#,
        env!("CARGO_PKG_VERSION")
    );

    println!("{}", message);
}
