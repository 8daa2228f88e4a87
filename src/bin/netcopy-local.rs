//! netcopy-local - parallel copy between two local directories

use clap::{ArgAction, Parser};
use netcopy::core::{LocalCopier, LocalCopyConfig, DEFAULT_LOCAL_QUEUE, DEFAULT_LOCAL_WORKERS};
use netcopy::error::{NetCopyError, Result};
use netcopy::logging::init_logging;
use netcopy::progress::ProgressReporter;
use std::path::PathBuf;

/// Copy every regular file of SOURCE into DESTINATION using parallel workers
#[derive(Parser, Debug)]
#[command(name = "netcopy-local")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct LocalArgs {
    /// Source directory
    source: PathBuf,

    /// Destination directory
    destination: PathBuf,

    /// Number of copy workers
    #[arg(short = 'w', long, default_value_t = DEFAULT_LOCAL_WORKERS)]
    workers: usize,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() {
    let args = LocalArgs::parse();

    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: LocalArgs) -> Result<()> {
    if args.workers == 0 {
        return Err(NetCopyError::config("--workers must be at least 1"));
    }

    let config = LocalCopyConfig {
        source: args.source,
        destination: args.destination,
        workers: args.workers,
        queue_capacity: DEFAULT_LOCAL_QUEUE,
    };
    let progress = if args.quiet {
        ProgressReporter::disabled()
    } else {
        ProgressReporter::new()
    };

    let result = LocalCopier::new(config).with_progress(progress).execute()?;

    if !args.quiet {
        result.print_summary();
    }
    Ok(())
}
