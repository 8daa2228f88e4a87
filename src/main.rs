//! NetCopy CLI - resumable directory transfer over TCP

use clap::Parser;
use netcopy::config::{CliArgs, Mode, TransferConfig};
use netcopy::core::TransferPipeline;
use netcopy::error::{IoResultExt, Result};
use netcopy::fs::list_tree;
use netcopy::logging::init_logging;
use netcopy::network::TransferServer;
use netcopy::progress::ProgressReporter;
use std::path::PathBuf;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    match args.mode {
        Mode::Dir => cmd_dir(&args),
        Mode::Server => cmd_server(&TransferConfig::from_cli(&args)?, args.verbose > 0),
        Mode::Client => cmd_client(TransferConfig::from_cli(&args)?, args.verbose > 0),
    }
}

fn cmd_dir(args: &CliArgs) -> Result<()> {
    let root = args.dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let progress = if args.quiet {
        ProgressReporter::disabled()
    } else {
        ProgressReporter::new()
    };

    let summary = list_tree(&root, &progress);

    println!("=== {} ===", root.display());
    println!("Files:       {}", summary.files);
    println!("Directories: {}", summary.dirs);
    if summary.errors > 0 {
        println!("Errors:      {}", summary.errors);
    }
    Ok(())
}

fn cmd_server(config: &TransferConfig, verbose: bool) -> Result<()> {
    if verbose {
        print_config(config)?;
    }

    std::fs::create_dir_all(&config.root).with_path(&config.root)?;
    let server = TransferServer::bind(config)?;

    println!("Starting NetCopy server...");
    println!("Listening on: {}", config.listen_addr());
    println!("Writing to:   {}", config.root.display());
    println!("Press Ctrl+C to stop.");

    server.run()
}

fn cmd_client(config: TransferConfig, verbose: bool) -> Result<()> {
    if verbose {
        print_config(&config)?;
    }

    let format = config.output_format;
    let summary = TransferPipeline::new(config).run()?;
    summary.print(format)
}

fn print_config(config: &TransferConfig) -> Result<()> {
    eprintln!("=== Configuration ===");
    eprintln!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
