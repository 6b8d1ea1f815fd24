// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tuner acquisition module
//!
//! This module handles the acquisition of IQ samples from a radio tuner,
//! either a locally attached RTL2832U device, a remote `rtl_tcp` server or
//! a simulated receiver used for tests and demonstrations.
//!
//! All variants implement the [`Tuner`] trait. The variant is chosen once per
//! scan from a [`DeviceSelector`] through [`create_tuner`].

use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};

mod rtlsdr;
mod rtltcp;
mod simulated;

pub use rtlsdr::RtlSdrTuner;
pub use rtltcp::RtlTcpTuner;
pub use simulated::{SimulatedSignal, SimulatedTuner};

/// Errors raised by tuner operations.
///
/// The variants drive the recovery policy of the scan controller, so they
/// are kept distinct instead of being folded into a generic I/O error.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TunerError {
    /// Connection, tuning or capture I/O failure. Recovered by reconnecting.
    #[error("Device error: {0}")]
    Device(String),
    /// The device answered with something that is not a valid response.
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// The device is temporarily claimed by the platform or another process.
    #[error("Device busy: {0}")]
    PlatformBusy(String),
}

impl From<std::io::Error> for TunerError {
    fn from(err: std::io::Error) -> Self {
        TunerError::Device(err.to_string())
    }
}

/// Capability surface shared by every tuner variant.
///
/// Handles are owned by a single thread; none of the operations may be
/// called concurrently on the same handle.
#[cfg_attr(test, mockall::automock)]
pub trait Tuner: Send {
    /// Claim the device or establish the link to the remote server
    fn open(&mut self) -> Result<(), TunerError>;

    /// Set the sample rate and manual gain (dB), returning the tuner identity
    fn configure(&mut self, sample_rate: u32, gain: f64) -> Result<String, TunerError>;

    /// Retune the receiver to the given center frequency in Hz
    fn tune(&mut self, frequency: u64) -> Result<(), TunerError>;

    /// Block until `count` complex samples have been read
    fn capture(&mut self, count: usize) -> Result<Vec<Complex32>, TunerError>;

    /// Release the device. Calling it on a closed handle does nothing.
    fn close(&mut self);
}

/// Selects which tuner variant a scan drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeviceSelector {
    /// RTL-SDR dongle attached to this machine, by librtlsdr index
    Local { index: u32 },
    /// `rtl_tcp` server reachable over the network
    Network { host: String, port: u16 },
    /// Synthetic receiver producing noise and configured carriers
    Simulated {
        seed: u32,
        noise: f32,
        signals: Vec<SimulatedSignal>,
    },
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelector::Local { index } => write!(f, "local device #{}", index),
            DeviceSelector::Network { host, port } => write!(f, "rtl_tcp {}:{}", host, port),
            DeviceSelector::Simulated { seed, .. } => write!(f, "simulated device (seed {})", seed),
        }
    }
}

/// One block of samples acquired at a single center frequency
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Scan start time in UNIX seconds, shared by every capture of a scan.
    ///
    /// Two scans started within the same second share a timestamp, so their
    /// captures land in the same store bucket and are averaged together even
    /// with averaging mode off.
    pub timestamp: i64,
    /// Center frequency of the step in Hz (before the LO offset)
    pub frequency: u64,
    pub samples: Vec<Complex32>,
}

/// Tuner chipsets reported by librtlsdr and rtl_tcp, indexed by type code
const TUNER_NAMES: [&str; 7] = [
    "Unknown", "E4000", "FC0012", "FC0013", "FC2580", "R820T", "R828D",
];

/// Map a librtlsdr tuner type code to a readable chipset name
pub fn tuner_name(code: u32) -> &'static str {
    TUNER_NAMES
        .get(code as usize)
        .copied()
        .unwrap_or(TUNER_NAMES[0])
}

/// Convert interleaved unsigned 8-bit I/Q bytes to normalised complex samples
pub fn iq_from_bytes(bytes: &[u8]) -> Vec<Complex32> {
    bytes
        .chunks_exact(2)
        .map(|iq| {
            Complex32::new(
                (iq[0] as f32 - 127.5) / 127.5,
                (iq[1] as f32 - 127.5) / 127.5,
            )
        })
        .collect()
}

/// Build the tuner handle for the given selector. The handle is not opened.
pub fn create_tuner(selector: &DeviceSelector) -> Box<dyn Tuner> {
    match selector {
        DeviceSelector::Local { index } => Box::new(RtlSdrTuner::new(*index)),
        DeviceSelector::Network { host, port } => Box::new(RtlTcpTuner::new(host.clone(), *port)),
        DeviceSelector::Simulated {
            seed,
            noise,
            signals,
        } => Box::new(SimulatedTuner::new(*seed, *noise, signals.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iq_from_bytes_normalisation() {
        let samples = iq_from_bytes(&[0, 255, 128, 127, 7]);
        // Trailing odd byte is dropped
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].re, -1.0);
        assert_eq!(samples[0].im, 1.0);
        assert!(samples[1].re > 0.0 && samples[1].re < 0.01);
        assert!(samples[1].im < 0.0 && samples[1].im > -0.01);
    }

    #[test]
    fn test_tuner_names() {
        assert_eq!(tuner_name(5), "R820T");
        assert_eq!(tuner_name(1), "E4000");
        assert_eq!(tuner_name(42), "Unknown");
    }

    #[test]
    fn test_io_error_is_device_error() {
        let err: TunerError =
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed").into();
        assert!(matches!(err, TunerError::Device(_)));
    }
}
