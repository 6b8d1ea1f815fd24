// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;
use rtlsdr_scan::scan::{event_channel, ScanEvent};
use rtlsdr_scan::spectral::StepSpectrum;
use rtlsdr_scan::spectrum::{
    lock_spectrum, shared_spectrum, update_spectrum, MergeParams, SpectrumStore,
};

fn params() -> MergeParams {
    MergeParams {
        start: 100_000_000,
        stop: 102_000_000,
        offset: 50_000,
        bandwidth: 1_000_000,
        average: false,
        alert: None,
    }
}

/// Flat spectrum around `centre` Hz, one bin every 10 kHz across 1 MHz
fn flat_step(timestamp: i64, centre: u64, magnitude: f64) -> StepSpectrum {
    let centre_mhz = centre as f64 / 1e6;
    StepSpectrum {
        timestamp,
        frequency: centre,
        bins: (-50..50)
            .map(|k| (centre_mhz + k as f64 * 0.01, magnitude))
            .collect(),
    }
}

#[test]
fn test_only_guard_bands_are_written() {
    let mut store = SpectrumStore::new();
    let report = store.merge(&params(), &flat_step(1, 101_000_000, 10.0));
    assert!(report.updated);

    let bucket = store.bucket(1).unwrap();
    assert!(!bucket.is_empty());
    for &frequency in bucket.keys() {
        let distance = (frequency as i64 - 101_000_000).abs();
        assert!(
            (50_000..=550_000).contains(&distance),
            "{} Hz is outside the guard bands",
            frequency
        );
    }
    // The center gap is never written
    assert!(!bucket.contains_key(&101_000_000));
    assert!(!bucket.contains_key(&101_040_000));
    assert!(bucket.contains_key(&101_050_000));
}

#[test]
fn test_overlap_is_pairwise_mean() {
    let mut store = SpectrumStore::new();
    // 20 dB then 40 dB on the same keys
    store.merge(&params(), &flat_step(1, 101_000_000, 100.0));
    store.merge(&params(), &flat_step(1, 101_000_000, 10_000.0));

    for level in store.bucket(1).unwrap().values() {
        assert_relative_eq!(*level, 30.0, epsilon = 1e-9);
    }
}

#[test]
fn test_same_step_twice_is_idempotent() {
    let step = flat_step(1, 101_000_000, 123.0);
    let mut once = SpectrumStore::new();
    once.merge(&params(), &step);
    let mut twice = SpectrumStore::new();
    twice.merge(&params(), &step);
    twice.merge(&params(), &step);

    let a = once.bucket(1).unwrap();
    let b = twice.bucket(1).unwrap();
    assert_eq!(a.len(), b.len());
    for (key, level) in a {
        assert_relative_eq!(*level, b[key], epsilon = 1e-12);
    }
}

#[test]
fn test_neighbouring_steps_share_keys() {
    let mut store = SpectrumStore::new();
    // Step centers half a bandwidth apart cover the same bins
    store.merge(&params(), &flat_step(1, 100_500_000, 10.0));
    store.merge(&params(), &flat_step(1, 101_000_000, 1000.0));

    let bucket = store.bucket(1).unwrap();
    // Upper band of the first step and lower band of the second
    assert_relative_eq!(bucket[&100_800_000], 20.0, epsilon = 1e-9);
    // 100.6 MHz also lies in both guard bands
    assert_relative_eq!(bucket[&100_600_000], 20.0, epsilon = 1e-9);
    // Second step alone above its center
    assert_relative_eq!(bucket[&101_200_000], 30.0, epsilon = 1e-9);
}

#[test]
fn test_alert_per_qualifying_write() {
    let (tx, mut rx) = event_channel();
    let lock = shared_spectrum();
    let mut merge = params();
    merge.alert = Some(25.0);

    let step = StepSpectrum {
        timestamp: 1,
        frequency: 101_000_000,
        // 30 dB, 20 dB, 40 dB and one bin at the center (not eligible)
        bins: vec![
            (101.1, 1000.0),
            (101.2, 100.0),
            (101.3, 10_000.0),
            (101.0, 1e6),
        ],
    };
    assert!(update_spectrum(&tx, &lock, &merge, &step));

    let mut alerts = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ScanEvent::Alert { frequency, level } = event {
            alerts.push((frequency, level));
        }
    }
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].0, 101_100_000);
    assert_relative_eq!(alerts[0].1, 30.0, epsilon = 1e-9);
    assert_eq!(alerts[1].0, 101_300_000);
}

#[test]
fn test_averaging_folds_into_earliest_bucket() {
    let mut averaging = params();
    averaging.average = true;

    let mut store = SpectrumStore::new();
    store.merge(&averaging, &flat_step(10, 101_000_000, 100.0));
    store.merge(&averaging, &flat_step(20, 101_000_000, 10_000.0));
    assert_eq!(store.len(), 1);
    assert_eq!(store.timestamps().collect::<Vec<_>>(), vec![10]);
    assert_relative_eq!(store.bucket(10).unwrap()[&101_200_000], 30.0, epsilon = 1e-9);

    // Without averaging every scan keeps its own bucket
    let mut store = SpectrumStore::new();
    store.merge(&params(), &flat_step(10, 101_000_000, 100.0));
    store.merge(&params(), &flat_step(20, 101_000_000, 10_000.0));
    assert_eq!(store.len(), 2);
    assert_eq!(store.earliest(), Some(10));
    assert_eq!(store.latest(), Some(20));
}

#[test]
fn test_concurrent_reader_sees_consistent_buckets() {
    let (tx, _rx) = event_channel();
    let lock = shared_spectrum();

    let mut reference = SpectrumStore::new();
    reference.merge(&params(), &flat_step(1, 101_000_000, 10.0));
    let full = reference.bucket(1).map(|b| b.len()).unwrap_or_default();
    assert!(full > 0);

    let reader_lock = Arc::clone(&lock);
    let reader = thread::spawn(move || {
        for _ in 0..200 {
            let store = lock_spectrum(&reader_lock);
            for (_, bucket) in store.iter() {
                // A step is merged as a whole under the lock
                assert_eq!(bucket.len(), full);
            }
        }
    });

    for _ in 0..50 {
        update_spectrum(&tx, &lock, &params(), &flat_step(1, 101_000_000, 10.0));
    }
    reader.join().unwrap();
    assert_eq!(lock_spectrum(&lock).len(), 1);
}
