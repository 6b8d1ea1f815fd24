// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! rtl_tcp client against an in-process fake server

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use rtlsdr_scan::acquisition::{RtlTcpTuner, Tuner, TunerError};

type Commands = Arc<Mutex<Vec<(u8, u32)>>>;

/// Accept one client, greet it with `header` and stream a constant
/// I/Q pattern until it disconnects. Received commands are recorded.
fn fake_server(header: [u8; 12], stream_data: bool) -> (u16, Commands) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let commands: Commands = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&commands);

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&header).unwrap();
        if !stream_data {
            return;
        }

        let mut reader = stream.try_clone().unwrap();
        thread::spawn(move || {
            let mut packet = [0u8; 5];
            while reader.read_exact(&mut packet).is_ok() {
                let param = u32::from_be_bytes([packet[1], packet[2], packet[3], packet[4]]);
                recorded.lock().unwrap().push((packet[0], param));
            }
        });

        // I = 255, Q = 0 on every sample
        let chunk: Vec<u8> = [255u8, 0u8].repeat(2048);
        while stream.write_all(&chunk).is_ok() {}
    });

    (port, commands)
}

fn rtl0_header(tuner_type: u32, gains: u32) -> [u8; 12] {
    let mut header = [0u8; 12];
    header[..4].copy_from_slice(b"RTL0");
    header[4..8].copy_from_slice(&tuner_type.to_be_bytes());
    header[8..].copy_from_slice(&gains.to_be_bytes());
    header
}

#[test]
fn test_configure_tune_and_capture() {
    let (port, commands) = fake_server(rtl0_header(5, 29), true);
    let mut tuner = RtlTcpTuner::new("127.0.0.1".to_string(), port);

    tuner.open().unwrap();
    assert_eq!(tuner.configure(2_048_000, 49.6).unwrap(), "R820T");
    tuner.tune(100_500_000).unwrap();

    let samples = tuner.capture(1000).unwrap();
    assert_eq!(samples.len(), 1000);
    for s in &samples {
        assert_eq!(s.re, 1.0);
        assert_eq!(s.im, -1.0);
    }
    tuner.close();
    tuner.close();

    // Give the reader thread time to record the last command
    for _ in 0..50 {
        if commands.lock().unwrap().len() >= 4 {
            break;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    let commands = commands.lock().unwrap().clone();
    assert_eq!(
        commands,
        vec![(0x02, 2_048_000), (0x03, 1), (0x04, 496), (0x01, 100_500_000)]
    );
}

#[test]
fn test_bad_magic_is_protocol_error() {
    let mut header = rtl0_header(5, 29);
    header[..4].copy_from_slice(b"HTTP");
    let (port, _) = fake_server(header, false);

    let mut tuner = RtlTcpTuner::new("127.0.0.1".to_string(), port);
    assert!(matches!(tuner.open(), Err(TunerError::Protocol(_))));
}

#[test]
fn test_refused_connection_is_device_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut tuner = RtlTcpTuner::new("127.0.0.1".to_string(), port);
    assert!(matches!(tuner.open(), Err(TunerError::Device(_))));
}

#[test]
fn test_server_hangup_is_device_error() {
    let (port, _) = fake_server(rtl0_header(1, 14), false);
    let mut tuner = RtlTcpTuner::new("127.0.0.1".to_string(), port);
    tuner.open().unwrap();
    // The server closed right after the greeting
    assert!(matches!(tuner.capture(4096), Err(TunerError::Device(_))));
}

#[test]
fn test_unknown_tuner_type() {
    let (port, _) = fake_server(rtl0_header(99, 0), true);
    let mut tuner = RtlTcpTuner::new("127.0.0.1".to_string(), port);
    tuner.open().unwrap();
    assert_eq!(tuner.configure(1_024_000, 0.0).unwrap(), "Unknown");
}

#[test]
fn test_retune_drops_samples_still_in_flight() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&rtl0_header(5, 29)).unwrap();

        // I = 0 at the old frequency, I = 255 once retuned
        let stale: Vec<u8> = [0u8, 128u8].repeat(2048);
        stream.write_all(&stale).unwrap();

        let mut packet = [0u8; 5];
        while stream.read_exact(&mut packet).is_ok() && packet[0] != 0x01 {}

        // Old samples still leaving the server after the drain
        thread::sleep(std::time::Duration::from_millis(50));
        stream.write_all(&[0u8, 128u8].repeat(8192)).unwrap();

        let fresh: Vec<u8> = [255u8, 128u8].repeat(2048);
        while stream.write_all(&fresh).is_ok() {}
    });

    let mut tuner = RtlTcpTuner::new("127.0.0.1".to_string(), port);
    tuner.open().unwrap();
    tuner.configure(2_048_000, 20.0).unwrap();
    thread::sleep(std::time::Duration::from_millis(20));
    tuner.tune(100_000_000).unwrap();

    let samples = tuner.capture(4096).unwrap();
    assert!(samples.iter().all(|s| s.re == 1.0));
    tuner.close();
}
