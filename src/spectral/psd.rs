// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Welch power spectral density estimate of one capture

use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

use super::WindowFunction;
use crate::acquisition::Capture;
use crate::scan::ScanSession;

/// Errors raised while analysing a capture
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Capture contains no samples")]
    EmptyCapture,
    #[error("Capture too short: {samples} samples (need {fft_size})")]
    CaptureTooShort { samples: usize, fft_size: usize },
    #[error("FFT size must be positive")]
    InvalidFftSize,
    #[error("Overlap {0} is outside [0, 1)")]
    InvalidOverlap(f64),
    #[error("Sample rate must be positive")]
    InvalidSampleRate,
}

/// Parameters of the Welch estimate
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    /// Sample rate in samples per second
    pub sample_rate: u32,
    pub fft_size: usize,
    /// Fraction of each segment shared with the next one
    pub overlap: f64,
    pub window: WindowFunction,
    /// Frequency correction in parts per million
    pub calibration_ppm: f64,
}

impl AnalysisParams {
    pub fn from_session(session: &ScanSession) -> Self {
        Self {
            sample_rate: session.sample_rate,
            fft_size: session.fft_size,
            overlap: session.overlap,
            window: session.window,
            calibration_ppm: session.calibration_ppm,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.fft_size == 0 {
            return Err(AnalysisError::InvalidFftSize);
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(AnalysisError::InvalidOverlap(self.overlap));
        }
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate);
        }
        Ok(())
    }

    /// Distance in samples between the starts of two consecutive segments
    pub fn hop(&self) -> usize {
        let shared = (self.fft_size as f64 * self.overlap).floor() as usize;
        (self.fft_size - shared).max(1)
    }
}

/// Power spectrum of one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepSpectrum {
    pub timestamp: i64,
    /// Center frequency of the step in Hz
    pub frequency: u64,
    /// `(frequency in MHz, power density)` in increasing frequency order
    pub bins: Vec<(f64, f64)>,
}

/// Reusable Welch estimator holding the FFT plan and window for one set of
/// parameters.
pub struct WelchAnalyzer {
    params: AnalysisParams,
    window: Vec<f32>,
    /// Σw², part of the density normalisation
    window_power: f64,
    fft: Arc<dyn Fft<f32>>,
}

impl WelchAnalyzer {
    pub fn new(params: AnalysisParams) -> Result<Self, AnalysisError> {
        params.validate()?;
        let window = params.window.coefficients(params.fft_size);
        let window_power = window.iter().map(|&w| (w as f64) * (w as f64)).sum();
        let fft = FftPlanner::new().plan_fft_forward(params.fft_size);
        Ok(Self {
            params,
            window,
            window_power,
            fft,
        })
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Average the windowed periodograms of every full segment, returning
    /// the raw density in FFT bin order.
    fn averaged_periodogram(&self, samples: &[Complex32]) -> Vec<f64> {
        let nfft = self.params.fft_size;
        let hop = self.params.hop();
        let segments = 1 + (samples.len() - nfft) / hop;

        let mut power = vec![0.0f64; nfft];
        let mut buffer = vec![Complex32::new(0.0, 0.0); nfft];
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];

        for segment in 0..segments {
            let start = segment * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = samples[start + i] * self.window[i];
            }
            self.fft.process_with_scratch(&mut buffer, &mut scratch);
            for (acc, x) in power.iter_mut().zip(&buffer) {
                *acc += x.norm_sqr() as f64;
            }
        }

        let fs_mhz = self.params.sample_rate as f64 / 1e6;
        let scale = segments as f64 * fs_mhz * self.window_power;
        if scale > 0.0 {
            for p in &mut power {
                *p /= scale;
            }
        }
        power
    }

    pub fn analyse(&self, capture: &Capture) -> Result<StepSpectrum, AnalysisError> {
        let nfft = self.params.fft_size;
        if capture.samples.is_empty() {
            return Err(AnalysisError::EmptyCapture);
        }
        if capture.samples.len() < nfft {
            return Err(AnalysisError::CaptureTooShort {
                samples: capture.samples.len(),
                fft_size: nfft,
            });
        }

        let power = self.averaged_periodogram(&capture.samples);

        let fs_mhz = self.params.sample_rate as f64 / 1e6;
        let centre_mhz = capture.frequency as f64 / 1e6;
        let ppm = self.params.calibration_ppm;
        let half = nfft / 2;

        // fftshift: negative frequencies first
        let bins = (0..nfft)
            .map(|i| {
                let k = (i + nfft - half) % nfft;
                let signed = if k < nfft.div_ceil(2) {
                    k as f64
                } else {
                    k as f64 - nfft as f64
                };
                let mut x = signed * fs_mhz / nfft as f64 + centre_mhz;
                x += x * ppm / 1e6;
                (x, power[k])
            })
            .collect();

        Ok(StepSpectrum {
            timestamp: capture.timestamp,
            frequency: capture.frequency,
            bins,
        })
    }
}

/// Estimate the power spectral density of a capture with Welch's method
pub fn analyse_capture(
    capture: &Capture,
    params: &AnalysisParams,
) -> Result<StepSpectrum, AnalysisError> {
    WelchAnalyzer::new(params.clone())?.analyse(capture)
}
