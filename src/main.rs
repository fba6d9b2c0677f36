use log::{debug, info, warn};

use clap::Parser;
use snafu::ErrorCompat;

mod args;
mod digest;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    let res = digest::run(&args);
    match &res {
        Ok(report) if report.has_io_failures() => {
            warn!(
                "Completed, but {} input files could not be read",
                report.io_failures.len()
            );
        }
        Ok(_) => {
            info!("Completed");
        }
        Err(e) => {
            eprintln!("An error occured: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(e) {
                eprintln!("trace: {}", bt);
            }
        }
    }
    std::process::exit(digest::exit_code(&res));
}
