//! ptpair - allocate pseudoterminal pairs and report them
//!
//! Allocates one or more master/slave pairs, keeps them all open until every
//! allocation has been reported, then releases them. Useful for checking
//! that a host's devpts setup works.

use std::io;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ptpair::{AllocError, AllocatorConfig, ConfigError, PtyAllocator, PtyPair};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_DEVICE_UNAVAILABLE: u8 = 1;
const EXIT_CONTROL_REQUEST_FAILED: u8 = 2;
const EXIT_CONFIG: u8 = 3;

/// Allocate pseudoterminal pairs
#[derive(Parser, Debug)]
#[command(name = "ptpair", version, about)]
struct CliArgs {
    /// Path to a JSON config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Multiplexer device to open
    #[arg(long, value_name = "PATH")]
    multiplexer: Option<PathBuf>,

    /// Directory containing slave devices
    #[arg(long, value_name = "PATH")]
    slave_root: Option<PathBuf>,

    /// Number of pairs to allocate
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Print one JSON object per pair
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    tracing::info!(
        "Allocating {} pair(s) from {} under {}",
        args.count,
        config.multiplexer_path.display(),
        config.slave_root.display()
    );

    let allocator = PtyAllocator::with_config(config);
    let mut pairs: Vec<PtyPair> = Vec::with_capacity(args.count);

    for _ in 0..args.count {
        match allocator.allocate() {
            Ok(pair) => {
                report(&pair, args.json);
                pairs.push(pair);
            },
            Err(e) => {
                tracing::error!("Allocation failed: {}", e);
                return ExitCode::from(exit_code(&e));
            },
        }
    }

    tracing::info!("Allocated {} pair(s)", pairs.len());
    ExitCode::SUCCESS
}

/// CLI args > environment variables > config file > defaults
fn load_config(args: &CliArgs) -> Result<AllocatorConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => AllocatorConfig::load_from_file(path)?,
        None => AllocatorConfig::default(),
    };

    config.apply_env_vars();

    if let Some(path) = &args.multiplexer {
        config.multiplexer_path = path.clone();
    }
    if let Some(path) = &args.slave_root {
        config.slave_root = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn report(pair: &PtyPair, json: bool) {
    if json {
        let line = serde_json::json!({
            "unit": pair.unit_number().get(),
            "slave": pair.slave.path().display().to_string(),
            "master_fd": pair.master.as_raw_fd(),
            "slave_fd": pair.slave.as_raw_fd(),
        });
        println!("{line}");
    } else {
        println!("unit={} slave={}", pair.unit_number(), pair.slave.path().display());
    }
}

fn exit_code(err: &AllocError) -> u8 {
    match err {
        AllocError::DeviceUnavailable { .. } => EXIT_DEVICE_UNAVAILABLE,
        AllocError::ControlRequestFailed { .. } => EXIT_CONTROL_REQUEST_FAILED,
    }
}
