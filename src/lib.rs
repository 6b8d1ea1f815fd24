// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! RTL-SDR scan library
//!
//! Steps a tuner across a frequency band, estimates the power spectral
//! density of each capture with Welch's method and stitches the guard bands
//! of overlapping steps into one time-stamped spectrum.

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod processing;
pub mod scan;
pub mod spectral;
pub mod spectrum;
pub mod utility;
