//! FAAM WxRx - ARINC 708 capture decoder
//!
//! Reads raw weather radar bus captures and the size/time log written beside
//! them, and writes one timestamped radar dataset per flight.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wxrx::output::{JsonLinesWriter, ReferenceMetadata};
use wxrx::timeline::read_log;
use wxrx::{Config, Processor};

/// Decode ARINC 708 weather radar captures into a timestamped dataset
#[derive(Parser, Debug)]
#[command(name = "faam-wxrx", author, version, about, long_about = None)]
struct Options {
    /// Raw ARINC 708 capture files, processed in the order given
    #[arg(short = 't', long = "tmpfile", num_args = 1.., required = true)]
    captures: Vec<PathBuf>,

    /// Size/time log written by the capture computer
    #[arg(short = 'l', long = "logfile")]
    log: PathBuf,

    /// Reference dataset (JSON global attributes with flight_number and flight_date)
    #[arg(short = 'c', long = "corefile")]
    reference: PathBuf,

    /// Output directory [env: WXRX_OUTPUT_DIR, default: .]
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Capture processing threads [env: WXRX_WORKERS, default: 1]
    #[arg(short = 'j', long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let options = Options::parse();

    // Initialize logging
    let default_level = if options.quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(options) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(options: Options) -> Result<()> {
    info!("===========================================");
    info!("   FAAM WxRx - ARINC 708 capture decoder");
    info!("===========================================");

    // Environment first, command line wins
    let mut config = Config::from_env();
    if let Some(dir) = options.output_dir {
        config.output_dir = dir;
    }
    if let Some(workers) = options.workers {
        config.workers = workers.max(1);
    }

    info!("Configuration:");
    info!("  Captures: {}", options.captures.len());
    info!("  Log file: {}", options.log.display());
    info!("  Reference: {}", options.reference.display());
    info!("  Output dir: {}", config.output_dir.display());
    info!("  Log preamble rows: {}", config.log_skip_rows);
    info!("  Workers: {}", config.workers);

    let rows = read_log(&options.log, config.log_skip_rows)
        .with_context(|| format!("Failed to read size/time log {}", options.log.display()))?;
    if rows.is_empty() {
        anyhow::bail!("Size/time log {} has no data rows", options.log.display());
    }
    info!("Loaded {} log rows", rows.len());

    let metadata = ReferenceMetadata::load(&options.reference)
        .with_context(|| format!("Failed to load reference dataset {}", options.reference.display()))?;
    info!(
        "Flight {} on {}",
        metadata.flight_number,
        metadata.flight_date.format("%Y-%m-%d")
    );

    let processor = Processor::new(&options.captures, &rows)?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;
    let mut writer = JsonLinesWriter::create(&config.output_dir, metadata)?;

    info!("===========================================");
    info!("  Processing {} captures...", processor.captures().len());
    info!("===========================================");

    let stats = match processor.run(&mut writer, config.workers) {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = writer.discard() {
                warn!("Failed to remove staged rows: {}", cleanup);
            }
            return Err(e);
        }
    };

    let summary = writer.finish()?;
    if !summary.overridden.is_empty() {
        info!("Reference attributes overridden: {}", summary.overridden.join(", "));
    }
    if !summary.removed.is_empty() {
        info!("Reference attributes removed: {}", summary.removed.join(", "));
    }

    info!("[Stats] {}", stats);
    info!("Done. {} rows written to {}", summary.rows, summary.path.display());
    Ok(())
}
