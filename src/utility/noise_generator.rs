// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Gaussian Noise Generator
//!
//! Lightweight generator for complex Gaussian white noise, used by the
//! simulated tuner to stand in for a receiver's thermal noise floor.
//!
//! ## Features
//!
//! * Fast XORShift pseudo-random number generation
//! * Box-Muller transform for Gaussian distribution
//! * Independent I and Q components with configurable amplitude
//!
//! ## Examples
//!
//! ```rust
//! use rtlsdr_scan::utility::noise_generator::NoiseGenerator;
//!
//! let mut generator = NoiseGenerator::new(12345);
//! let iq = generator.generate_iq(1024, 0.05);
//! assert_eq!(iq.len(), 1024);
//! ```

use std::time::SystemTime;

use rustfft::num_complex::Complex32;

/// Random number generator using the XORShift algorithm.
///
/// Suitable for noise samples, not for cryptographic purposes. The same seed
/// always yields the same sequence, which keeps simulated scans reproducible.
pub struct NoiseGenerator {
    rng_state: u32,
}

impl NoiseGenerator {
    /// Creates a new noise generator with a given seed.
    ///
    /// XORShift never leaves the all-zero state, so a zero seed is replaced
    /// by a fixed non-zero constant.
    pub fn new(seed: u32) -> Self {
        Self {
            rng_state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Creates a new noise generator seeded from the system clock
    pub fn new_from_system_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u32)
            .unwrap_or(1);
        Self::new(seed)
    }

    /// Generates a random floating-point number between -1.0 and 1.0.
    pub fn random_float(&mut self) -> f32 {
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;

        (self.rng_state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Generates a value from a standard Gaussian distribution (mean 0, sigma 1).
    ///
    /// ```text
    /// z = sqrt(-2 * ln(u1)) * cos(2 * π * u2)
    /// ```
    pub fn random_gaussian(&mut self) -> f32 {
        let u1 = (self.random_float() + 1.0) / 2.0;
        let u2 = (self.random_float() + 1.0) / 2.0;

        // Avoid ln(0)
        let u1 = if u1 < 0.0001 { 0.0001 } else { u1 };

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
    }

    /// Generates `num_samples` complex samples whose I and Q components are
    /// independent Gaussian values scaled by `amplitude`.
    pub fn generate_iq(&mut self, num_samples: usize, amplitude: f32) -> Vec<Complex32> {
        (0..num_samples)
            .map(|_| {
                let i = self.random_gaussian() * amplitude;
                let q = self.random_gaussian() * amplitude;
                Complex32::new(i, q)
            })
            .collect()
    }
}
