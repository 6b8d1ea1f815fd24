// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Time-bucketed spectrum assembled from overlapping steps

use std::collections::BTreeMap;

use crate::scan::ScanSession;
use crate::spectral::StepSpectrum;

/// Frequency (Hz) to power (dB) for one acquisition timestamp
pub type Bucket = BTreeMap<u64, f64>;

/// Band and policy used when folding a step into the store
#[derive(Debug, Clone, PartialEq)]
pub struct MergeParams {
    /// Requested band in Hz, start inclusive, stop exclusive
    pub start: u64,
    pub stop: u64,
    /// Gap between the step center and each guard band, in Hz
    pub offset: u64,
    /// Receiver bandwidth in Hz, each guard band is half of it
    pub bandwidth: u64,
    pub average: bool,
    pub alert: Option<f64>,
}

impl MergeParams {
    pub fn from_session(session: &ScanSession) -> Self {
        Self {
            start: session.start,
            stop: session.stop,
            offset: session.offset,
            bandwidth: session.bandwidth,
            average: session.average,
            alert: session.alert,
        }
    }

    /// Whether a bin at `frequency` Hz may be written by the step centered on `centre` Hz
    pub fn is_eligible(&self, centre: u64, frequency: f64) -> bool {
        let in_range = frequency >= self.start as f64 && frequency < self.stop as f64;
        if !in_range {
            return false;
        }
        let centre = centre as f64;
        let offset = self.offset as f64;
        let half = self.bandwidth as f64 / 2.0;
        let upper = frequency >= centre + offset && frequency <= centre + offset + half;
        let lower = frequency >= centre - offset - half && frequency <= centre - offset;
        upper || lower
    }
}

/// Place a bin given in MHz on whole hertz.
///
/// Float noise from the MHz scale is removed at millihertz resolution first,
/// so the same bin seen from two neighbouring steps always lands on the same
/// key, half-hertz grid points included.
pub fn bin_frequency(freq_mhz: f64) -> f64 {
    ((freq_mhz * 1e9).round() / 1e3).round()
}

/// Outcome of one merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// At least one bin was written
    pub updated: bool,
    /// `(frequency Hz, stored level dB)` of every write above the alert level
    pub alerts: Vec<(u64, f64)>,
}

/// Accumulated spectrum keyed by acquisition timestamp.
///
/// Within a bucket each key holds the pairwise running mean of the values
/// written to it. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct SpectrumStore {
    buckets: BTreeMap<i64, Bucket>,
}

impl SpectrumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the guard-band bins of one step into the store
    pub fn merge(&mut self, params: &MergeParams, spectrum: &StepSpectrum) -> MergeReport {
        let timestamp = match self.earliest() {
            Some(earliest) if params.average => earliest,
            _ => spectrum.timestamp,
        };

        let mut report = MergeReport::default();
        let bucket = self.buckets.entry(timestamp).or_default();

        for &(freq_mhz, magnitude) in &spectrum.bins {
            let frequency = bin_frequency(freq_mhz);
            if frequency < 0.0 || !params.is_eligible(spectrum.frequency, frequency) {
                continue;
            }
            // log10 is undefined here
            if magnitude <= 0.0 || !magnitude.is_finite() {
                continue;
            }
            let level = 10.0 * magnitude.log10();
            let key = frequency as u64;
            let stored = match bucket.get(&key) {
                Some(&old) => (old + level) / 2.0,
                None => level,
            };
            bucket.insert(key, stored);
            report.updated = true;

            if let Some(alert) = params.alert {
                if stored > alert {
                    report.alerts.push((key, stored));
                }
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.buckets.keys().copied()
    }

    pub fn bucket(&self, timestamp: i64) -> Option<&Bucket> {
        self.buckets.get(&timestamp)
    }

    /// Buckets in increasing timestamp order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Bucket)> {
        self.buckets.iter().map(|(t, b)| (*t, b))
    }

    pub fn earliest(&self) -> Option<i64> {
        self.buckets.keys().next().copied()
    }

    pub fn latest(&self) -> Option<i64> {
        self.buckets.keys().next_back().copied()
    }

    /// Strongest bin of a bucket as `(frequency Hz, level dB)`
    pub fn peak(&self, timestamp: i64) -> Option<(u64, f64)> {
        self.buckets.get(&timestamp)?.iter().fold(None, |best, (&f, &l)| match best {
            Some((_, level)) if level >= l => best,
            _ => Some((f, l)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> MergeParams {
        MergeParams {
            start: 100_000_000,
            stop: 102_000_000,
            offset: 100_000,
            bandwidth: 1_000_000,
            average: false,
            alert: None,
        }
    }

    #[test]
    fn test_guard_bands() {
        let p = params();
        let centre = 101_000_000;
        // Inner gap around the center is excluded
        assert!(!p.is_eligible(centre, 101_000_000.0));
        assert!(!p.is_eligible(centre, 101_050_000.0));
        // Band edges are inclusive
        assert!(p.is_eligible(centre, 101_100_000.0));
        assert!(p.is_eligible(centre, 101_600_000.0));
        assert!(p.is_eligible(centre, 100_400_000.0));
        assert!(p.is_eligible(centre, 100_900_000.0));
        // Beyond the outer edge
        assert!(!p.is_eligible(centre, 101_600_001.0));
        assert!(!p.is_eligible(centre, 100_399_999.0));
    }

    #[test]
    fn test_requested_range_is_half_open() {
        let p = params();
        assert!(p.is_eligible(99_500_000, 100_000_000.0));
        assert!(!p.is_eligible(99_500_000, 99_999_999.0));
        assert!(!p.is_eligible(102_500_000, 102_000_000.0));
        assert!(p.is_eligible(102_500_000, 101_999_999.0));
    }

    #[test]
    fn test_bin_frequency_is_stable() {
        // 1953.125 Hz bins reached from two step centers 250 kHz apart
        let a = 99.7 + 4.0 * 2.0 / 1024.0 + 0.25;
        let b = 99.95 + 4.0 * 2.0 / 1024.0;
        assert_eq!(bin_frequency(a), bin_frequency(b));
        assert_eq!(bin_frequency(101.3), 101_300_000.0);
    }

    #[test]
    fn test_non_positive_magnitude_skipped() {
        let mut store = SpectrumStore::new();
        let spectrum = StepSpectrum {
            timestamp: 1,
            frequency: 101_000_000,
            bins: vec![(101.2, 0.0), (101.3, -1.0)],
        };
        let report = store.merge(&params(), &spectrum);
        assert!(!report.updated);
        assert_eq!(store.bucket(1).map(|b| b.len()), Some(0));
    }

    #[test]
    fn test_peak_and_order() {
        let mut store = SpectrumStore::new();
        let spectrum = StepSpectrum {
            timestamp: 5,
            frequency: 101_000_000,
            bins: vec![(101.2, 10.0), (101.3, 1000.0), (101.4, 100.0)],
        };
        store.merge(&params(), &spectrum);
        let (freq, level) = store.peak(5).unwrap();
        assert_eq!(freq, 101_300_000);
        assert_relative_eq!(level, 30.0, epsilon = 1e-9);
        assert_eq!(store.peak(6), None);
        assert_eq!(store.earliest(), Some(5));
        assert_eq!(store.latest(), Some(5));
    }
}
