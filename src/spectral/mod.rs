// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//!
//! Spectral analysis module
//!
//! This module turns a capture of complex baseband samples into a power
//! spectral density estimate using Welch's method, expressed over absolute
//! frequencies (MHz) with the calibration correction applied.

mod psd;
mod window;

pub use psd::{analyse_capture, AnalysisError, AnalysisParams, StepSpectrum, WelchAnalyzer};
pub use window::WindowFunction;
