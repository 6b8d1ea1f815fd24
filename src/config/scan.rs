// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scan band configuration
//!
//! Frequencies in this section are expressed in MHz, as users type them.

use serde::{Deserialize, Serialize};

/// Requested band and stepping parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Lower edge of the requested band in MHz
    pub start: f64,

    /// Upper edge of the requested band in MHz
    pub stop: f64,

    /// Number of consecutive passes over the band
    pub sweeps: u32,

    /// Complex samples captured at each step
    pub samples: usize,

    /// Gap in MHz between the step center and its guard bands.
    ///
    /// Keeps the DC spike and LO leakage at the center of every capture out
    /// of the assembled spectrum.
    pub offset: f64,

    /// Local oscillator offset in MHz added when tuning, for up or down converters
    pub lo_offset: f64,

    /// Usable receiver bandwidth in MHz. Steps are half of it.
    pub bandwidth: f64,

    /// Run as a calibration scan
    pub calibrate: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            start: 87.0,
            stop: 108.0,
            sweeps: 1,
            samples: 1 << 18,
            offset: 0.25,
            lo_offset: 0.0,
            bandwidth: 0.5,
            calibrate: false,
        }
    }
}
