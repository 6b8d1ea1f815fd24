// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End to end scans against the simulated tuner

use std::sync::Arc;
use std::sync::Once;

use rtlsdr_scan::acquisition::{create_tuner, DeviceSelector};
use rtlsdr_scan::config::{Config, DeviceMode, SignalConfig};
use rtlsdr_scan::daemon::Daemon;
use rtlsdr_scan::processing::SpectrumProcessor;
use rtlsdr_scan::scan::{event_channel, ScanEvent, ScanState, Scanner};
use rtlsdr_scan::spectrum::{lock_spectrum, shared_spectrum};

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// 100-101 MHz with a carrier at 100.4 MHz
fn simulated_config() -> Config {
    let mut config = Config::default();
    config.scan.start = 100.0;
    config.scan.stop = 101.0;
    config.scan.offset = 0.05;
    config.scan.bandwidth = 0.5;
    config.scan.samples = 8192;
    config.device.mode = DeviceMode::Simulated;
    config.device.sample_rate = 1.0;
    config.device.simulation.seed = 3;
    config.device.simulation.noise = 0.01;
    config.device.simulation.signals = vec![SignalConfig {
        frequency: 100.4,
        amplitude: 0.5,
    }];
    config.analysis.fft_size = 512;
    config
}

#[test]
fn test_scan_and_merge_on_caller_thread() {
    setup();
    let session = Arc::new(simulated_config().to_session());
    assert!(matches!(session.device, DeviceSelector::Simulated { .. }));

    let (scan_tx, mut scan_rx) = event_channel();
    let (merge_tx, mut merge_rx) = event_channel();
    let spectrum = shared_spectrum();
    let processor = SpectrumProcessor::new(&session, spectrum.clone(), merge_tx).unwrap();

    let handle = Scanner::new(Arc::clone(&session), scan_tx)
        .start(create_tuner(&session.device))
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = scan_rx.blocking_recv() {
        if let ScanEvent::Data(capture) = &event {
            processor.process(capture).unwrap();
        }
        events.push(event);
    }
    assert_eq!(handle.join(), ScanState::Finished);

    let step_count = session.step_count();
    assert_eq!(events[0], ScanEvent::Starting);
    assert_eq!(events[1], ScanEvent::StepCount(step_count));
    assert_eq!(events[2], ScanEvent::DeviceInfo("Simulated".to_string()));
    let captures = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Data(_)))
        .count();
    assert_eq!(captures as u64, session.frequencies().count() as u64);
    assert_eq!(events.last(), Some(&ScanEvent::Finished));

    let mut updates = 0;
    while let Ok(event) = merge_rx.try_recv() {
        if event == ScanEvent::Updated(true) {
            updates += 1;
        }
    }
    assert!(updates > 0);

    let store = lock_spectrum(&spectrum);
    assert_eq!(store.len(), 1);
    let timestamp = store.earliest().unwrap();
    let bucket = store.bucket(timestamp).unwrap();

    // The requested band is fully covered by guard bands
    let first = *bucket.keys().next().unwrap();
    let last = *bucket.keys().next_back().unwrap();
    assert!(first >= 100_000_000 && first < 100_010_000);
    assert!(last < 101_000_000 && last > 100_990_000);

    let (peak, level) = store.peak(timestamp).unwrap();
    assert!(
        (peak as i64 - 100_400_000).abs() < 3_000,
        "peak at {} Hz",
        peak
    );
    // Well above the noise floor
    let median = {
        let mut levels: Vec<f64> = bucket.values().copied().collect();
        levels.sort_by(|a, b| a.total_cmp(b));
        levels[levels.len() / 2]
    };
    assert!(level > median + 30.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_daemon_runs_averaged_sweeps() {
    setup();
    let mut config = simulated_config();
    config.scan.sweeps = 2;
    config.analysis.average = true;

    let mut daemon = Daemon::new();
    let spectrum = daemon.spectrum();
    daemon.launch(&config).await.unwrap();
    daemon.join().await.unwrap();

    let store = lock_spectrum(&spectrum);
    assert_eq!(store.len(), 1);
    let timestamp = store.earliest().unwrap();
    let (peak, _) = store.peak(timestamp).unwrap();
    assert!((peak as i64 - 100_400_000).abs() < 3_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_daemon_shutdown_before_launch_skips_sweeps() {
    setup();
    let mut daemon = Daemon::new();
    let spectrum = daemon.spectrum();
    daemon.shutdown();
    daemon.launch(&simulated_config()).await.unwrap();
    daemon.join().await.unwrap();
    assert!(lock_spectrum(&spectrum).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_daemon_reports_device_failure() {
    setup();
    let mut config = simulated_config();
    config.device.mode = DeviceMode::Network;
    config.device.host = "127.0.0.1".to_string();
    config.device.port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut daemon = Daemon::new();
    daemon.launch(&config).await.unwrap();
    assert!(daemon.join().await.is_err());
}
