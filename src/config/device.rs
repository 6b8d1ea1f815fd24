// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tuner configuration

use serde::{Deserialize, Serialize};

use crate::acquisition::{DeviceSelector, SimulatedSignal};

/// Which tuner variant drives the scan
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    #[default]
    Local,
    Network,
    Simulated,
}

/// Carrier injected by the simulated tuner
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SignalConfig {
    /// Carrier frequency in MHz
    pub frequency: f64,
    /// Peak amplitude relative to full scale
    pub amplitude: f32,
}

/// Settings of the simulated tuner
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u32,
    /// Standard deviation of the I and Q noise
    pub noise: f32,
    pub signals: Vec<SignalConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            noise: 0.01,
            signals: vec![
                SignalConfig {
                    frequency: 94.2,
                    amplitude: 0.3,
                },
                SignalConfig {
                    frequency: 101.1,
                    amplitude: 0.1,
                },
            ],
        }
    }
}

/// Tuner selection and acquisition parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub mode: DeviceMode,

    /// librtlsdr device index, for `local`
    pub index: u32,

    /// rtl_tcp server host, for `network`
    pub host: String,

    /// rtl_tcp server port, for `network`
    pub port: u16,

    /// Manual tuner gain in dB
    pub gain: f64,

    /// Sample rate in MS/s
    pub sample_rate: f64,

    pub simulation: SimulationConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Local,
            index: 0,
            host: "localhost".to_string(),
            port: 1234,
            gain: 20.0,
            sample_rate: 2.0,
            simulation: SimulationConfig::default(),
        }
    }
}

impl DeviceConfig {
    pub fn selector(&self) -> DeviceSelector {
        match self.mode {
            DeviceMode::Local => DeviceSelector::Local { index: self.index },
            DeviceMode::Network => DeviceSelector::Network {
                host: self.host.clone(),
                port: self.port,
            },
            DeviceMode::Simulated => DeviceSelector::Simulated {
                seed: self.simulation.seed,
                noise: self.simulation.noise,
                signals: self
                    .simulation
                    .signals
                    .iter()
                    .map(|s| SimulatedSignal {
                        frequency: super::mhz_to_hz(s.frequency),
                        amplitude: s.amplitude,
                    })
                    .collect(),
            },
        }
    }
}
