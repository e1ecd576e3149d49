//! The Pariksha command-line interface.
//!
//! One thin entrypoint: parse arguments, install the logging subscriber,
//! run discovery over the process-wide suite registry, print the summary,
//! and exit non-zero iff the aggregate run failed.

pub mod args;
pub mod output;

use crate::errors;
use crate::runner::registry::SuiteRegistry;
use crate::runner::{RunOptions, SuiteRunner};
use args::ParikshaArgs;
use clap::Parser;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// The main entry point for the CLI.
pub fn run() {
    let args = ParikshaArgs::parse();
    init_logging(args.verbose);

    let options = RunOptions {
        parallel: args.parallel,
        workers: args.workers,
        timeout: Duration::from_secs(args.timeout),
        isolate_modules: !args.no_isolation,
        tag_filter: args.tags.clone(),
        name_filter: args.filter.clone(),
        coverage: args.coverage,
    };

    let mut runner = SuiteRunner::new(SuiteRegistry::global(), options);
    match runner.run_discovered(&args.dir, args.pattern.as_deref()) {
        Ok(report) => {
            if args.json {
                output::print_json(&report);
            } else {
                output::print_summary(&report);
            }
            process::exit(if report.success { 0 } else { 1 });
        }
        Err(e) => {
            errors::print_error(e);
            // Distinct status so scripts can tell "tests failed" from
            // "the run never happened".
            process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pariksha=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pariksha=warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
