// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Status notifications emitted while scanning

use log::debug;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::acquisition::Capture;

/// Error code for a tuner that cannot be opened, configured or reopened
pub const ERROR_DEVICE: u32 = 1;
/// Error code for a malformed device response
pub const ERROR_PROTOCOL: u32 = 2;
/// Error code for a capture the analyzer rejected
pub const ERROR_ANALYSIS: u32 = 3;

/// Notifications delivered in emission order to the consumer of a scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Starting,
    /// Number of steps across the padded band
    StepCount(u64),
    /// Tuner identity reported once the device is configured
    DeviceInfo(String),
    Data(Capture),
    /// A merge finished, `true` if it wrote at least one bin
    Updated(bool),
    /// A merged bin exceeded the alert level (Hz, dB)
    Alert { frequency: u64, level: f64 },
    Error {
        code: u32,
        frequency: u64,
        message: String,
    },
    Stopped,
    Finished,
    CalibrationComplete,
}

pub type EventSender = UnboundedSender<ScanEvent>;
pub type EventReceiver = UnboundedReceiver<ScanEvent>;

/// Create a notification channel. Sending never blocks.
pub fn event_channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Post an event, ignoring a consumer that already went away
pub fn post_event(notify: &EventSender, event: ScanEvent) {
    if notify.send(event).is_err() {
        debug!("Event dropped, receiver closed");
    }
}
