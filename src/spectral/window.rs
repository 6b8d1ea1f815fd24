// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Window functions applied to each Welch segment

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Available window functions for spectral analysis.
///
/// All windows are symmetric. Names are parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum WindowFunction {
    Bartlett,
    Blackman,
    Hamming,
    #[default]
    Hanning,
    /// Rectangular window
    None,
}

impl WindowFunction {
    pub const ALL: [WindowFunction; 5] = [
        WindowFunction::Bartlett,
        WindowFunction::Blackman,
        WindowFunction::Hamming,
        WindowFunction::Hanning,
        WindowFunction::None,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::Bartlett => "bartlett",
            WindowFunction::Blackman => "blackman",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Hanning => "hanning",
            WindowFunction::None => "none",
        }
    }

    /// Compute `len` window coefficients
    pub fn coefficients(&self, len: usize) -> Vec<f32> {
        if len == 0 {
            return Vec::new();
        }
        if len == 1 {
            return vec![1.0];
        }
        let m = (len - 1) as f64;
        (0..len)
            .map(|i| {
                let n = i as f64;
                let w = match self {
                    WindowFunction::Bartlett => {
                        if n <= m / 2.0 {
                            2.0 * n / m
                        } else {
                            2.0 - 2.0 * n / m
                        }
                    }
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * n / m).cos() + 0.08 * (4.0 * PI * n / m).cos()
                    }
                    WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * n / m).cos(),
                    WindowFunction::Hanning => 0.5 - 0.5 * (2.0 * PI * n / m).cos(),
                    WindowFunction::None => 1.0,
                };
                w as f32
            })
            .collect()
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        // "rectangular" is accepted as an alias of "none"
        if wanted == "rectangular" {
            return Ok(WindowFunction::None);
        }
        WindowFunction::ALL
            .into_iter()
            .find(|w| w.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = WindowFunction::ALL.iter().map(|w| w.name()).collect();
                format!("unknown window function '{}', expected one of {:?}", s, known)
            })
    }
}

impl TryFrom<String> for WindowFunction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
