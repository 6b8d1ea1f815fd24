// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectral analysis and merge configuration

use serde::{Deserialize, Serialize};

use crate::spectral::WindowFunction;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Window applied to each Welch segment
    pub window: WindowFunction,

    /// Samples per FFT segment
    pub fft_size: usize,

    /// Fraction of each segment shared with the next, in [0, 1)
    pub overlap: f64,

    /// Frequency correction in ppm, as measured by a calibration run
    pub calibration: f64,

    /// Fold every sweep into a single running average
    pub average: bool,

    /// Level in dB above which merged bins raise an alert
    pub alert: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: WindowFunction::Hanning,
            fft_size: 1024,
            overlap: 0.5,
            calibration: 0.0,
            average: false,
            alert: None,
        }
    }
}
