//! Defines the command-line arguments for the Pariksha runner.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::Parser;

/// The main CLI argument structure: one entrypoint, a directory, and the
/// run-shaping flags. Exit status is non-zero iff the aggregate run failed.
#[derive(Debug, Parser)]
#[command(
    name = "pariksha",
    version,
    about = "A behavior-driven test execution engine with scoped hooks, focus/tag filtering, and module-cache isolation."
)]
pub struct ParikshaArgs {
    /// Directory of registered test files to run.
    #[arg(default_value = "tests")]
    pub dir: String,

    /// Only run cases whose name matches this regex.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Only run files whose path matches this regex.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Only run cases carrying at least one of these tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Dispatch files to a worker pool instead of running sequentially.
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for parallel mode.
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Per-file timeout in seconds (parallel mode).
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Ask the host framework to collect coverage around the run.
    #[arg(long)]
    pub coverage: bool,

    /// Keep the module cache intact between files.
    #[arg(long)]
    pub no_isolation: bool,

    /// Print the aggregate report as JSON instead of the human summary.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,
}
