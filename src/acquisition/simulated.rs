// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated tuner producing Gaussian noise plus fixed carriers.
//!
//! Useful for running the full scan pipeline without hardware. Output is
//! deterministic for a given seed.

use std::f64::consts::PI;

use log::debug;
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};

use super::{Tuner, TunerError};
use crate::utility::noise_generator::NoiseGenerator;

/// A continuous-wave carrier visible to the simulated receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSignal {
    /// Absolute carrier frequency in Hz
    pub frequency: u64,
    /// Peak amplitude relative to full scale
    pub amplitude: f32,
}

pub struct SimulatedTuner {
    seed: u32,
    noise: f32,
    signals: Vec<SimulatedSignal>,
    generator: Option<NoiseGenerator>,
    sample_rate: u32,
    frequency: u64,
}

impl SimulatedTuner {
    pub fn new(seed: u32, noise: f32, signals: Vec<SimulatedSignal>) -> Self {
        Self {
            seed,
            noise,
            signals,
            generator: None,
            sample_rate: 0,
            frequency: 0,
        }
    }
}

impl Tuner for SimulatedTuner {
    fn open(&mut self) -> Result<(), TunerError> {
        if self.generator.is_none() {
            self.generator = Some(NoiseGenerator::new(self.seed));
        }
        Ok(())
    }

    fn configure(&mut self, sample_rate: u32, gain: f64) -> Result<String, TunerError> {
        if self.generator.is_none() {
            return Err(TunerError::Device("simulated tuner is closed".into()));
        }
        if sample_rate == 0 {
            return Err(TunerError::Device("sample rate must be positive".into()));
        }
        debug!("Simulated tuner at {} S/s, gain {} dB", sample_rate, gain);
        self.sample_rate = sample_rate;
        Ok("Simulated".to_string())
    }

    fn tune(&mut self, frequency: u64) -> Result<(), TunerError> {
        if self.generator.is_none() {
            return Err(TunerError::Device("simulated tuner is closed".into()));
        }
        self.frequency = frequency;
        Ok(())
    }

    fn capture(&mut self, count: usize) -> Result<Vec<Complex32>, TunerError> {
        let generator = self
            .generator
            .as_mut()
            .ok_or_else(|| TunerError::Device("simulated tuner is closed".into()))?;
        let mut samples = generator.generate_iq(count, self.noise);

        let fs = self.sample_rate as f64;
        for signal in &self.signals {
            let offset = signal.frequency as f64 - self.frequency as f64;
            if fs <= 0.0 || offset.abs() >= fs / 2.0 {
                continue;
            }
            let omega = 2.0 * PI * offset / fs;
            for (n, sample) in samples.iter_mut().enumerate() {
                let phase = omega * n as f64;
                *sample += Complex32::new(
                    (phase.cos() as f32) * signal.amplitude,
                    (phase.sin() as f32) * signal.amplitude,
                );
            }
        }
        Ok(samples)
    }

    fn close(&mut self) {
        self.generator = None;
    }
}
