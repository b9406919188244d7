//! CLI entry point for webmux
//!
//! Parses command line arguments, sets up the log destination, and starts
//! the daemon. Configuration precedence: config file, then environment
//! overrides, then flags.

use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;
use webmux::config::ConfigError;
use webmux::{Config, Daemon};

/// webmux - watch a directory and repackage finished video files as web-friendly MP4
#[derive(Parser, Debug)]
#[command(name = "webmux")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to watch for incoming video files
    watch_dir: PathBuf,

    /// Directory to write transcoded MP4 files into
    #[arg(long)]
    out_dir: PathBuf,

    /// Number of files that can be transcoding at once [default: 2]
    #[arg(long)]
    max_jobs: Option<u32>,

    /// Capacity of the job queue; the watcher blocks when it is full [default: 16]
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Log destination; standard output when omitted
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Optional TOML configuration file for tool paths and timeouts
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Assemble the effective configuration: file, then environment, then flags.
fn build_config(args: Args) -> Result<Config, ConfigError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => {
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    config.watch_dir = args.watch_dir;
    config.out_dir = args.out_dir;
    if let Some(max_jobs) = args.max_jobs {
        config.jobs.max_jobs = max_jobs;
    }
    if let Some(capacity) = args.queue_capacity {
        config.jobs.queue_capacity = capacity;
    }
    if args.log_file.is_some() {
        config.log_file = args.log_file;
    }

    Ok(config)
}

/// Install the tracing subscriber, writing to the log file when one is
/// configured and to stdout otherwise.
fn init_logging(log_file: Option<&Path>) -> Result<(), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("webmux: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(config.log_file.as_deref()) {
        eprintln!("webmux: failed to open log file: {}", e);
        return ExitCode::FAILURE;
    }

    let daemon = match Daemon::new(config) {
        Ok(daemon) => daemon,
        Err(e) => {
            // The log sink is up at this point; make the failure visible in
            // both places since startup errors are what operators hit first.
            error!(error = %e, "failed to start");
            eprintln!("webmux: failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = daemon.run().await {
        error!(error = %e, "daemon error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
