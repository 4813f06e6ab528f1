//! JASMES UVR fetcher.
//!
//! Downloads one month of daily UV products from the JASMES archive,
//! converts each file into a NetCDF dataset and merges the month once it is
//! complete.
//!
//! ```text
//! uvr-fetcher -y 2019 -m 11 -o /data/uvr -n 8
//! uvr-fetcher inspect MOD02SSH_A20191105Av1_v811_7200_3601_uvb__le.gz
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand, ValueEnum};
use grid_store::NetCdfStore;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::FmtSubscriber;
use uvr_format::filename::strip_compression;
use uvr_format::{decode, parse_filename, read_header};

use uvr_fetcher::download::decompress_gzip;
use uvr_fetcher::{FetchConfig, FetchSettings, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "uvr-fetcher")]
#[command(about = "Download and merge monthly JASMES UV radiation products")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Number of concurrent download workers
    #[arg(short = 'n', long, env = "UVR_WORKERS")]
    num_workers: Option<usize>,

    /// Year to retrieve (default: current year)
    #[arg(short, long)]
    year: Option<i32>,

    /// Month to retrieve, 1-12 (default: current month)
    #[arg(short, long)]
    month: Option<u32>,

    /// Remote URL above the YYYYMM directories; may contain glob segments
    #[arg(short, long, env = "UVR_BASE_URL")]
    base_url: Option<String>,

    /// Files to match inside each YYYYMM directory
    #[arg(long, env = "UVR_FILE_PATTERN")]
    file_pattern: Option<String>,

    /// Output root directory
    #[arg(short, long, env = "UVR_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Maximum queued jobs before enumeration waits for workers
    #[arg(long, env = "UVR_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// YAML settings file
    #[arg(short, long, env = "UVR_CONFIG")]
    config: Option<PathBuf>,

    /// Shortcut for --log-level debug
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Append logs to this file instead of stderr
    #[arg(short = 'l', long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a local product file and print its metadata and statistics
    Inspect {
        /// Product file, optionally gzip-compressed
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    if let Some(Command::Inspect { file }) = &args.command {
        return inspect(file);
    }

    let config = resolve_config(&args)?;
    config
        .validate(Local::now().date_naive())
        .context("Invalid run configuration")?;

    info!(
        year = config.year,
        month = config.month,
        base_url = %config.base_url,
        output = %config.output.display(),
        workers = config.workers,
        "Starting UVR fetcher"
    );

    let pipeline = Pipeline::from_config(config, Arc::new(NetCdfStore::new()))
        .context("Failed to set up remote source")?;
    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run aborted");
            return Err(e.into());
        }
    };

    info!(
        already_merged = summary.already_merged,
        listed = summary.listed,
        skipped_existing = summary.skipped_existing,
        skipped_invalid = summary.skipped_invalid,
        skipped_duplicate = summary.skipped_duplicate,
        enqueued = summary.enqueued,
        completed = summary.completed,
        failed = summary.failed,
        merged = summary.merged(),
        "Summary"
    );
    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = if args.debug {
        Level::DEBUG
    } else {
        match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let writer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(args.log_file.is_none())
        .with_writer(writer);

    match args.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

/// Defaults, then the settings file, then environment and flags.
fn resolve_config(args: &Args) -> Result<FetchConfig> {
    let today = Local::now().date_naive();
    let mut config = FetchConfig::new(
        args.year.unwrap_or(today.year()),
        args.month.unwrap_or(today.month()),
        ".",
    );

    if let Some(path) = &args.config {
        config = config.with_settings(&FetchSettings::load(path)?);
    }

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(pattern) = &args.file_pattern {
        config.file_pattern = pattern.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(workers) = args.num_workers {
        config.workers = workers;
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    Ok(config)
}

fn inspect(path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("No usable file name in {:?}", path))?;
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;

    let (name, compressed) = strip_compression(file_name);
    let raw = if compressed {
        decompress_gzip(&data).with_context(|| format!("Failed to decompress {:?}", path))?
    } else {
        data
    };

    let meta = parse_filename(name)?;
    let header = read_header(&meta, &raw)?;
    let grid = decode(&meta, &raw)?;
    let stats = grid.statistics();
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));

    println!("File:        {}", path.display());
    println!("Instrument:  {} ({})", meta.instrument.code(), meta.instrument.description());
    println!("Date:        {}", meta.start_date);
    println!("Average:     {} ({})", meta.average.code(), meta.average.description());
    println!("Variable:    {} ({}, {})", meta.variable.code(), grid.description(), grid.unit());
    println!("Encoding:    {}", meta.encoding.code());
    println!("Size:        {} x {}", meta.pixel_count, meta.line_count);
    println!("Origin:      lon {} lat {}", header.lon_min, header.lat_max);
    println!("Resolution:  {}", header.resolution);
    println!("Calibration: {} * raw + {}", header.slope, header.offset);
    if let Some(parameter) = &header.parameter {
        println!("Parameter:   {parameter}");
    }
    if let Some(output_name) = &header.output_name {
        println!("Source name: {output_name}");
    }
    println!("Valid cells: {} (masked {})", stats.valid, stats.masked);
    println!("Min / max:   {} / {}", fmt(stats.min), fmt(stats.max));
    println!("Mean:        {}", fmt(stats.mean));
    Ok(())
}
