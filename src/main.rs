//! imscp - Export stored documents as IMS content packages

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use imscp::{ExportConfig, MemoryRepository, PackageResolver};

#[derive(Parser)]
#[command(name = "imscp")]
#[command(version, about = "Export stored documents as IMS content packages", long_about = None)]
#[command(after_help = "EXAMPLES:
    imscp --store store.json /imscp/ABC123              Publish ABC123
    imscp --store store.json -o course.zip /imscp/ABC123  Publish and save a copy")]
struct Cli {
    /// Virtual path to resolve (/imscp/<poolId>)
    #[arg(value_name = "PATH")]
    path: String,

    /// JSON store dump to load
    #[arg(short, long, value_name = "FILE")]
    store: PathBuf,

    /// Also write the published package to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Declare the IMS namespaces on the manifest root
    #[arg(long)]
    namespaces: bool,

    /// Deflate level (0-9)
    #[arg(long, value_name = "N")]
    compression_level: Option<u32>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let repo = MemoryRepository::load(&cli.store).map_err(|e| e.to_string())?;

    let mut config = ExportConfig::new().with_namespaces(cli.namespaces);
    if let Some(level) = cli.compression_level {
        config = config.with_compression_level(level);
    }

    let resolver = PackageResolver::new(repo.clone()).with_config(config);
    let package = resolver
        .resolve(&cli.path)
        .ok_or_else(|| format!("no content package at {}", cli.path))?;
    println!("{}", package.path);

    if let Some(ref output) = cli.output {
        let body = repo
            .body(package.content.path())
            .ok_or_else(|| format!("{} has no body", package.content.path()))?;
        let mut file = File::create(output).map_err(|e| e.to_string())?;
        io::copy(&mut body.as_slice(), &mut file).map_err(|e| e.to_string())?;
        info!(output = %output.display(), bytes = body.len(), "Saved package");
    }

    Ok(())
}
