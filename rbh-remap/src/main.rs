use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use rbh_remap::{
    cli::{Args, SubArgs},
    core::{assemble, remap_candidates},
};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();

    match args.command {
        SubArgs::Candidates { args } => {
            args.check().unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            remap_candidates(args).unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });
        }
        SubArgs::Assemble { args } => {
            args.check().unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            assemble(args).unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });
        }
    }

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
