// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scan control
//!
//! A scan is described by an immutable [`ScanSession`] and driven by a
//! [`Scanner`] on its own thread. Progress is reported as [`ScanEvent`]s on an
//! unbounded channel so the worker never waits on its consumer.

mod controller;
pub mod events;
mod session;

pub use controller::{ScanHandle, ScanState, Scanner};
pub use events::{event_channel, EventReceiver, EventSender, ScanEvent};
pub use session::ScanSession;
