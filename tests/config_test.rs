// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rtlsdr_scan::acquisition::DeviceSelector;
use rtlsdr_scan::config::{self, Config, DeviceMode, ScanConfig};
use rtlsdr_scan::spectral::WindowFunction;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config {
        scan: ScanConfig {
            start: 144.0,
            stop: 146.0,
            sweeps: 4,
            ..ScanConfig::default()
        },
        ..Config::default()
    };
    config.device.mode = DeviceMode::Network;
    config.device.host = "192.168.1.20".to_string();
    config.analysis.window = WindowFunction::Blackman;
    config.analysis.alert = Some(-35.5);

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    // Loading a missing file writes and returns the defaults
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;
    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.scan.start, 87.0);
    assert_eq!(default_config.device.port, 1234);

    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
scan:
  start: 430.0
  stop: 440.0
analysis:
  window: Hamming
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.scan.start, 430.0);
    assert_eq!(config.scan.sweeps, 1);
    assert_eq!(config.analysis.window, WindowFunction::Hamming);
    assert_eq!(config.analysis.fft_size, 1024);
    assert_eq!(config.device.mode, DeviceMode::Local);
    Ok(())
}

#[test]
fn test_simulated_device_session() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
device:
  mode: simulated
  sample_rate: 1.0
  simulation:
    seed: 7
    noise: 0.02
    signals:
      - frequency: 100.3
        amplitude: 0.5
scan:
  start: 99.0
  stop: 101.0
  bandwidth: 0.5
"#,
    )?;

    let session = Config::from_file(&config_path)?.to_session();
    assert_eq!(session.sample_rate, 1_000_000);
    match session.device {
        DeviceSelector::Simulated {
            seed,
            noise,
            signals,
        } => {
            assert_eq!(seed, 7);
            assert_eq!(noise, 0.02);
            assert_eq!(signals.len(), 1);
            assert_eq!(signals[0].frequency, 100_300_000);
        }
        other => panic!("unexpected device {:?}", other),
    }
    Ok(())
}

#[test]
fn test_config_schema_output() -> Result<()> {
    config::output_config_schema()?;
    Ok(())
}
