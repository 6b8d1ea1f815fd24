// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, DeviceMode};

/// Output the embedded JSON schema to the console.
///
/// Called when the `--show-config-schema` flag is provided on the command
/// line.
///
/// ```bash
/// ./rtlsdr_scan --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Band**: the stop frequency is above the start frequency
/// - **Capture**: the FFT size is positive and no larger than a capture
/// - **Overlap**: the Welch overlap lies in `[0, 1)`
/// - **Bandwidth**: positive and no wider than the sample rate
/// - **Network tuner**: the rtl_tcp host is not empty
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let scan = &config.scan;
    if scan.stop <= scan.start {
        anyhow::bail!(
            "Stop frequency {} MHz must be above start frequency {} MHz",
            scan.stop,
            scan.start
        );
    }
    if scan.sweeps == 0 {
        anyhow::bail!("At least one sweep is required");
    }
    if scan.bandwidth <= 0.0 {
        anyhow::bail!("Bandwidth must be positive: {} MHz", scan.bandwidth);
    }
    if scan.offset < 0.0 {
        anyhow::bail!("Guard band offset cannot be negative: {} MHz", scan.offset);
    }

    let analysis = &config.analysis;
    if analysis.fft_size == 0 {
        anyhow::bail!("FFT size must be positive");
    }
    if analysis.fft_size > scan.samples {
        anyhow::bail!(
            "FFT size {} exceeds the {} samples of a capture",
            analysis.fft_size,
            scan.samples
        );
    }
    if !(0.0..1.0).contains(&analysis.overlap) {
        anyhow::bail!("Overlap must be in [0, 1): {}", analysis.overlap);
    }

    let device = &config.device;
    if device.sample_rate < scan.bandwidth {
        anyhow::bail!(
            "Sample rate {} MS/s is narrower than the {} MHz bandwidth",
            device.sample_rate,
            scan.bandwidth
        );
    }
    if device.mode == DeviceMode::Network && device.host.trim().is_empty() {
        anyhow::bail!("A host is required for the network tuner");
    }

    Ok(())
}
