// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the scanner
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `scan`: requested band, sweeps, capture size and guard band geometry
//! - `device`: tuner selection (local, network or simulated), gain and sample rate
//! - `analysis`: Welch parameters, calibration, averaging and alert level
//!
//! ## Usage
//!
//! ```no_run
//! use rtlsdr_scan::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(88.0),                   // Start (MHz)
//!     Some(90.0),                   // Stop (MHz)
//!     None,                         // Sweeps
//!     Some(30.0),                   // Gain (dB)
//!     None,                         // Local device index
//!     Some("10.0.0.2".to_string()), // rtl_tcp server
//!     None,                         // rtl_tcp port
//!     false,                        // Simulate
//!     false,                        // Calibrate
//!     false,                        // Average
//!     None,                         // Alert level
//! );
//!
//! let session = config.to_session();
//! println!("{} steps", session.step_count());
//! ```

pub mod analysis;
pub mod device;
pub mod scan;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use analysis::AnalysisConfig;
pub use device::{DeviceConfig, DeviceMode, SignalConfig, SimulationConfig};
pub use scan::ScanConfig;
pub use utils::{output_config_schema, validate_specific_rules};

use crate::scan::ScanSession;

/// Convert a frequency in MHz to whole hertz
pub fn mhz_to_hz(mhz: f64) -> u64 {
    (mhz * 1e6).round().max(0.0) as u64
}

/// Root configuration structure.
///
/// Each section falls back to its defaults when absent from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that are provided override the loaded values. `server`
    /// switches to the network tuner and `device_index` to a local one; the
    /// `simulate` flag wins over both.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_args(
        &mut self,
        start: Option<f64>,
        stop: Option<f64>,
        sweeps: Option<u32>,
        gain: Option<f64>,
        device_index: Option<u32>,
        server: Option<String>,
        port: Option<u16>,
        simulate: bool,
        calibrate: bool,
        average: bool,
        alert: Option<f64>,
    ) {
        if let Some(start) = start {
            debug!("Overriding start frequency from command line: {} MHz", start);
            self.scan.start = start;
        }
        if let Some(stop) = stop {
            debug!("Overriding stop frequency from command line: {} MHz", stop);
            self.scan.stop = stop;
        }
        if let Some(sweeps) = sweeps {
            debug!("Overriding sweeps from command line: {}", sweeps);
            self.scan.sweeps = sweeps;
        }
        if let Some(gain) = gain {
            debug!("Overriding gain from command line: {} dB", gain);
            self.device.gain = gain;
        }

        if let Some(index) = device_index {
            debug!("Using local device #{} from command line", index);
            self.device.mode = DeviceMode::Local;
            self.device.index = index;
        }
        if let Some(host) = server {
            debug!("Using rtl_tcp server {} from command line", host);
            self.device.mode = DeviceMode::Network;
            self.device.host = host;
        }
        if let Some(port) = port {
            debug!("Overriding rtl_tcp port from command line: {}", port);
            self.device.port = port;
        }
        if simulate {
            debug!("Using the simulated tuner");
            self.device.mode = DeviceMode::Simulated;
        }

        if calibrate {
            self.scan.calibrate = true;
        }
        if average {
            self.analysis.average = true;
        }
        if let Some(level) = alert {
            debug!("Overriding alert level from command line: {} dB", level);
            self.analysis.alert = Some(level);
        }
    }

    /// Freeze the configuration into the session of one scan run
    pub fn to_session(&self) -> ScanSession {
        ScanSession {
            start: mhz_to_hz(self.scan.start),
            stop: mhz_to_hz(self.scan.stop),
            samples: self.scan.samples,
            calibrate: self.scan.calibrate,
            device: self.device.selector(),
            lo_offset: (self.scan.lo_offset * 1e6).round() as i64,
            offset: mhz_to_hz(self.scan.offset),
            bandwidth: mhz_to_hz(self.scan.bandwidth),
            gain: self.device.gain,
            sample_rate: (self.device.sample_rate * 1e6).round() as u32,
            window: self.analysis.window,
            fft_size: self.analysis.fft_size,
            overlap: self.analysis.overlap,
            calibration_ppm: self.analysis.calibration,
            average: self.analysis.average,
            alert: self.analysis.alert,
        }
    }
}
