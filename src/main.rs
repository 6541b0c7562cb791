mod args;
mod dash;

use clap::Parser;
use log::{debug, warn};

use crate::args::{Args, Command};
use crate::dash::DashResult;

fn run(args: &Args) -> DashResult<()> {
    match &args.command {
        Command::Prepare(a) => dash::run_prepare(a),
        Command::Population(a) => dash::run_population(a),
        Command::Query(a) => dash::run_query(a),
        Command::Catalog(a) => dash::run_catalog(a),
    }
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(s) = source {
            eprintln!("  caused by: {}", s);
            source = s.source();
        }
        std::process::exit(1);
    }
}
