// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Frequency stepping loop
//!
//! A [`Scanner`] owns the tuner on a dedicated `Scan` thread and walks the
//! padded band in half-bandwidth steps, posting one `Data` event per
//! successful capture. Recovery depends on the tuner error kind:
//!
//! - `Device`: close, reopen and reconfigure, then move on to the next
//!   step. The failed step is lost.
//! - `Protocol`: post `Error` and stop the scan.
//! - `PlatformBusy`: close only. The next step fails on the closed handle
//!   and goes through the `Device` path. A busy reopen is handled the same
//!   way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use rustfft::num_complex::Complex32;

use super::events::{post_event, EventSender, ScanEvent, ERROR_DEVICE, ERROR_PROTOCOL};
use super::ScanSession;
use crate::acquisition::{Capture, Tuner, TunerError};

/// Lifecycle of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Starting,
    Running,
    Finished,
    Stopped,
    Error,
}

/// Prepares and launches a scan
pub struct Scanner {
    session: Arc<ScanSession>,
    notify: EventSender,
    cancel: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(session: Arc<ScanSession>, notify: EventSender) -> Self {
        Self {
            session,
            notify,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag observed at the top of every step, shared with the [`ScanHandle`]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Announce the scan and start the worker thread
    pub fn start(self, tuner: Box<dyn Tuner>) -> Result<ScanHandle> {
        let timestamp = chrono::Utc::now().timestamp();
        post_event(&self.notify, ScanEvent::Starting);
        post_event(&self.notify, ScanEvent::StepCount(self.session.step_count()));
        info!(
            "Scanning {:.3}-{:.3} MHz in {} steps",
            self.session.start as f64 / 1e6,
            self.session.stop as f64 / 1e6,
            self.session.step_count()
        );

        let cancel = Arc::clone(&self.cancel);
        let mut worker = ScanWorker {
            session: self.session,
            tuner,
            notify: self.notify,
            cancel: self.cancel,
            timestamp,
            state: ScanState::Starting,
        };
        let thread = thread::Builder::new()
            .name("Scan".to_string())
            .spawn(move || worker.run())
            .context("Failed to spawn scan thread")?;

        Ok(ScanHandle {
            cancel,
            thread: Some(thread),
        })
    }
}

/// Handle on a running scan
pub struct ScanHandle {
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<ScanState>>,
}

impl ScanHandle {
    /// Request cancellation. A capture in flight completes first.
    pub fn abort(&self) {
        debug!("Scan abort requested");
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the worker and return its terminal state
    pub fn join(mut self) -> ScanState {
        match self.thread.take().map(|t| t.join()) {
            Some(Ok(state)) => state,
            Some(Err(_)) => {
                error!("Scan thread panicked");
                ScanState::Error
            }
            None => ScanState::Error,
        }
    }
}

/// Code posted with a fatal `Error` event
fn error_code(err: &TunerError) -> u32 {
    match err {
        TunerError::Protocol(_) => ERROR_PROTOCOL,
        _ => ERROR_DEVICE,
    }
}

struct ScanWorker {
    session: Arc<ScanSession>,
    tuner: Box<dyn Tuner>,
    notify: EventSender,
    cancel: Arc<AtomicBool>,
    timestamp: i64,
    state: ScanState,
}

impl ScanWorker {
    fn transition(&mut self, state: ScanState) {
        info!("Scan state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn post(&self, event: ScanEvent) {
        post_event(&self.notify, event);
    }

    fn setup(&mut self) -> Result<String, TunerError> {
        self.tuner.open()?;
        self.tuner.configure(self.session.sample_rate, self.session.gain)
    }

    fn acquire(&mut self, frequency: u64) -> Result<Vec<Complex32>, TunerError> {
        self.tuner.tune(self.session.tuned_frequency(frequency))?;
        self.tuner.capture(self.session.samples)
    }

    /// Close the tuner, post an error and end the scan
    fn fail(&mut self, code: u32, frequency: u64, err: &TunerError) -> ScanState {
        error!("Scan failed at {} Hz: {}", frequency, err);
        self.post(ScanEvent::Error {
            code,
            frequency,
            message: err.to_string(),
        });
        self.tuner.close();
        self.transition(ScanState::Error);
        self.state
    }

    fn run(&mut self) -> ScanState {
        let first = self.session.padded_start();
        match self.setup() {
            Ok(identity) => {
                info!("Tuner ready: {}", identity);
                self.post(ScanEvent::DeviceInfo(identity));
            }
            Err(e) => return self.fail(error_code(&e), first, &e),
        }

        self.transition(ScanState::Running);
        for frequency in self.session.frequencies() {
            if self.cancel.load(Ordering::SeqCst) {
                self.post(ScanEvent::Stopped);
                self.tuner.close();
                self.transition(ScanState::Stopped);
                return self.state;
            }

            match self.acquire(frequency) {
                Ok(samples) => {
                    debug!("Captured {} samples at {} Hz", samples.len(), frequency);
                    self.post(ScanEvent::Data(Capture {
                        timestamp: self.timestamp,
                        frequency,
                        samples,
                    }));
                }
                Err(TunerError::Device(msg)) => {
                    warn!("Device error at {} Hz, reconnecting: {}", frequency, msg);
                    self.tuner.close();
                    match self.setup() {
                        Ok(_) => {}
                        // Still claimed, the next step retries the reopen
                        Err(TunerError::PlatformBusy(msg)) => {
                            warn!("Device busy on reopen at {} Hz: {}", frequency, msg);
                            self.tuner.close();
                        }
                        Err(e) => return self.fail(error_code(&e), frequency, &e),
                    }
                }
                Err(e @ TunerError::Protocol(_)) => {
                    return self.fail(ERROR_PROTOCOL, frequency, &e);
                }
                Err(TunerError::PlatformBusy(msg)) => {
                    warn!("Device busy at {} Hz: {}", frequency, msg);
                    self.tuner.close();
                }
            }
        }

        self.post(ScanEvent::Finished);
        self.transition(ScanState::Finished);
        if self.session.calibrate {
            self.post(ScanEvent::CalibrationComplete);
        }
        self.tuner.close();
        self.state
    }
}
