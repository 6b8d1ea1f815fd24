// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the RTL-SDR frequency scanner

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::signal;

use rtlsdr_scan::config::{self, Config};
use rtlsdr_scan::daemon::Daemon;
use rtlsdr_scan::spectrum::lock_spectrum;

/// Frequency scanner for RTL-SDR tuners
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start frequency in MHz
    #[arg(long)]
    start: Option<f64>,

    /// Stop frequency in MHz
    #[arg(long)]
    stop: Option<f64>,

    /// Number of sweeps over the band
    #[arg(long)]
    sweeps: Option<u32>,

    /// Tuner gain in dB
    #[arg(long)]
    gain: Option<f64>,

    /// Local RTL-SDR device index
    #[arg(long)]
    device_index: Option<u32>,

    /// rtl_tcp server host
    #[arg(long)]
    server: Option<String>,

    /// rtl_tcp server port
    #[arg(long)]
    port: Option<u16>,

    /// Use the simulated tuner
    #[arg(long)]
    simulate: bool,

    /// Run a calibration scan
    #[arg(long)]
    calibrate: bool,

    /// Average every sweep into one spectrum
    #[arg(long)]
    average: bool,

    /// Alert level in dB
    #[arg(long, allow_negative_numbers = true)]
    alert: Option<f64>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.start,
        args.stop,
        args.sweeps,
        args.gain,
        args.device_index,
        args.server.clone(),
        args.port,
        args.simulate,
        args.calibrate,
        args.average,
        args.alert,
    );
    config::validate_specific_rules(&config)?;

    let mut daemon = Daemon::new();
    let spectrum = daemon.spectrum();
    daemon.launch(&config).await?;

    let control = daemon.control();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, stopping scan");
                control.shutdown();
            }
            Err(err) => error!("Error waiting for shutdown signal: {}", err),
        }
    });

    let result = daemon.join().await;

    let store = lock_spectrum(&spectrum);
    for (timestamp, bucket) in store.iter() {
        let time = chrono::DateTime::from_timestamp(timestamp, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| timestamp.to_string());
        match store.peak(timestamp) {
            Some((frequency, level)) => info!(
                "{}: {} bins, peak {:.1} dB at {:.6} MHz",
                time,
                bucket.len(),
                level,
                frequency as f64 / 1e6
            ),
            None => info!("{}: no data", time),
        }
    }

    result
}
