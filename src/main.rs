//! simarch-filter - copy a simulation archive, filtering its contents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use simarch::filter::{run_filter, FilterOptions};
use simarch::Error;

#[derive(Parser, Debug)]
#[command(name = "simarch-filter")]
#[command(version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("SIMARCH_BUILD_STAMP"),
    ")"
))]
#[command(about = "Copy a simulation archive, filtering the contents", long_about = None)]
struct Cli {
    /// Input archive(s) followed by the output archive. Only the first input
    /// is copied; extras are accepted but ignored.
    #[arg(required = true, num_args = 2.., value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Time in seconds to cut the start of the recording
    #[arg(long, value_name = "TIME")]
    start: Option<f64>,

    /// Time in seconds to cut the end of the recording
    #[arg(long, value_name = "TIME")]
    end: Option<f64>,

    /// Minimum time between preserved steps
    #[arg(long, value_name = "TIME")]
    interval: Option<f64>,

    /// Recompress datasets in the copy
    #[arg(long)]
    gzip: bool,

    /// Store floating point data in single precision
    #[arg(long)]
    single: bool,

    /// Comma-separated exact names of objects to exclude from the copy
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    exclude: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let mut cli = Cli::parse();

    // clap guarantees at least two paths; the last one is the output
    let output = match cli.paths.pop() {
        Some(p) => p,
        None => return ExitCode::FAILURE,
    };
    let inputs = cli.paths;
    if inputs.len() > 1 {
        warn!(
            "only {} is copied; {} additional input path(s) ignored",
            inputs[0].display(),
            inputs.len() - 1
        );
    }

    let opts = FilterOptions {
        start: cli.start,
        end: cli.end,
        interval: cli.interval,
        gzip: cli.gzip,
        single: cli.single,
        exclude: cli.exclude,
    };

    match run_filter(&inputs[0], &output, &opts) {
        Ok(stats) => {
            info!(
                "copied {} group(s), {} dataset(s), {} row(s); dropped {} row(s), {} node(s)",
                stats.groups,
                stats.datasets,
                stats.rows_copied,
                stats.rows_dropped,
                stats.nodes_excluded
            );
            ExitCode::SUCCESS
        }
        Err(Error::TargetExists(path)) => {
            eprintln!("Output archive \"{}\" already exists!", path.display());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("simarch-filter: {err}");
            ExitCode::FAILURE
        }
    }
}
