// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use crate::acquisition::DeviceSelector;
use crate::spectral::WindowFunction;

/// Immutable description of one scan run.
///
/// Frequencies are in Hz. The requested band is padded on both sides so
/// that every frequency in `[start, stop)` falls inside a guard band of at
/// least one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub start: u64,
    pub stop: u64,
    /// Complex samples captured at each step
    pub samples: usize,
    pub calibrate: bool,
    pub device: DeviceSelector,
    /// Local oscillator offset added to every tuned frequency (up/down converters)
    pub lo_offset: i64,
    /// Distance between the step center and the inner edge of its guard bands
    pub offset: u64,
    /// Usable receiver bandwidth
    pub bandwidth: u64,
    /// Manual gain in dB
    pub gain: f64,
    pub sample_rate: u32,
    pub window: WindowFunction,
    pub fft_size: usize,
    pub overlap: f64,
    pub calibration_ppm: f64,
    /// Fold every pass into the earliest timestamp bucket
    pub average: bool,
    pub alert: Option<f64>,
}

impl ScanSession {
    pub fn padded_start(&self) -> u64 {
        self.start.saturating_sub(self.offset + self.bandwidth)
    }

    pub fn padded_stop(&self) -> u64 {
        self.stop + self.offset + 2 * self.bandwidth
    }

    pub fn step(&self) -> u64 {
        (self.bandwidth / 2).max(1)
    }

    /// Number of steps across the padded band, as announced before a scan
    pub fn step_count(&self) -> u64 {
        (self.padded_stop().saturating_sub(self.padded_start())) / self.step()
    }

    /// Step center frequencies, padded start to padded stop inclusive
    pub fn frequencies(&self) -> impl Iterator<Item = u64> {
        let step = self.step();
        let stop = self.padded_stop();
        std::iter::successors(Some(self.padded_start()), move |f| Some(f + step))
            .take_while(move |f| *f <= stop)
    }

    /// Frequency the tuner is set to for a given step
    pub fn tuned_frequency(&self, frequency: u64) -> u64 {
        (frequency as i64).saturating_add(self.lo_offset).max(0) as u64
    }
}
