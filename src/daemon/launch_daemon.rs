// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::task::{JoinHandle, JoinSet};

use crate::acquisition::create_tuner;
use crate::config::Config;
use crate::processing::SpectrumProcessor;
use crate::scan::events::ERROR_ANALYSIS;
use crate::scan::{event_channel, ScanEvent, ScanSession, ScanState, Scanner};
use crate::spectral::AnalysisError;
use crate::spectrum::{shared_spectrum, SharedSpectrum};

/// Cancellation flag of the scan currently running, if any
type ScanSlot = Arc<Mutex<Option<Arc<AtomicBool>>>>;

/// Counters collected over one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub captures: usize,
    pub updates: usize,
    pub alerts: usize,
    pub errors: usize,
}

/// Cloneable handle used to stop a running daemon from another task
#[derive(Clone)]
pub struct DaemonControl {
    running: Arc<AtomicBool>,
    current_scan: ScanSlot,
}

impl DaemonControl {
    /// Stop after the current step and skip the remaining sweeps
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        let slot = self
            .current_scan
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(cancel) = slot.as_ref() {
            cancel.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Runs the configured sweeps against one shared spectrum store
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    current_scan: ScanSlot,
    spectrum: SharedSpectrum,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            current_scan: Arc::new(Mutex::new(None)),
            spectrum: shared_spectrum(),
        }
    }

    /// Store receiving every sweep; lock it to read results
    pub fn spectrum(&self) -> SharedSpectrum {
        Arc::clone(&self.spectrum)
    }

    pub fn control(&self) -> DaemonControl {
        DaemonControl {
            running: Arc::clone(&self.running),
            current_scan: Arc::clone(&self.current_scan),
        }
    }

    /// Launch all configured tasks based on configuration
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let session = Arc::new(config.to_session());
        info!(
            "Starting {} sweep(s) on {}",
            config.scan.sweeps, session.device
        );
        self.start_sweeps(session, config.scan.sweeps)
    }

    fn start_sweeps(&mut self, session: Arc<ScanSession>, sweeps: u32) -> Result<()> {
        let control = self.control();
        let spectrum = self.spectrum();
        let task = tokio::spawn(async move {
            for sweep in 1..=sweeps {
                if !control.is_running() {
                    debug!("Daemon stopped, skipping remaining sweeps");
                    break;
                }
                info!("Sweep {}/{}", sweep, sweeps);
                let (state, stats) =
                    run_sweep(Arc::clone(&session), spectrum.clone(), &control).await?;
                info!(
                    "Sweep {} ended {:?}: {} captures, {} updates, {} alerts, {} errors",
                    sweep, state, stats.captures, stats.updates, stats.alerts, stats.errors
                );
                match state {
                    ScanState::Finished => {}
                    ScanState::Stopped => break,
                    _ => anyhow::bail!("Sweep {} failed", sweep),
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        self.control().shutdown();
    }

    /// Wait for all tasks to complete, returning the first failure
    pub async fn join(self) -> Result<()> {
        let mut result = Ok(());
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Task failed: {:#}", e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        result
    }
}

/// Run one scan to completion, analysing captures on blocking workers as
/// they arrive.
async fn run_sweep(
    session: Arc<ScanSession>,
    spectrum: SharedSpectrum,
    control: &DaemonControl,
) -> Result<(ScanState, SweepStats)> {
    let (notify, mut events) = event_channel();
    let mut processor = Some(Arc::new(
        SpectrumProcessor::new(&session, spectrum, notify.clone())
            .context("Invalid analysis parameters")?,
    ));

    let scanner = Scanner::new(Arc::clone(&session), notify);
    let cancel = scanner.cancel_flag();
    {
        let mut slot = control
            .current_scan
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !control.is_running() {
            cancel.store(true, Ordering::SeqCst);
        }
        *slot = Some(Arc::clone(&cancel));
    }
    let handle = scanner.start(create_tuner(&session.device))?;

    let mut workers: JoinSet<Result<bool, AnalysisError>> = JoinSet::new();
    let mut stats = SweepStats::default();

    // The channel closes once the scan thread and every worker are done
    while let Some(event) = events.recv().await {
        match event {
            ScanEvent::Starting => debug!("Scan starting"),
            ScanEvent::StepCount(n) => info!("{} steps to scan", n),
            ScanEvent::DeviceInfo(tuner) => info!("Tuner: {}", tuner),
            ScanEvent::Data(capture) => {
                stats.captures += 1;
                if let Some(processor) = &processor {
                    let processor = Arc::clone(processor);
                    workers.spawn_blocking(move || processor.process(&capture));
                }
            }
            ScanEvent::Updated(updated) => {
                if updated {
                    stats.updates += 1;
                }
            }
            ScanEvent::Alert { frequency, level } => {
                stats.alerts += 1;
                warn!(
                    "Level {:.1} dB above alert threshold at {:.6} MHz",
                    level,
                    frequency as f64 / 1e6
                );
            }
            ScanEvent::Error {
                code,
                frequency,
                message,
            } => {
                stats.errors += 1;
                error!("Scan error {} at {} Hz: {}", code, frequency, message);
                if code == ERROR_ANALYSIS {
                    cancel.store(true, Ordering::SeqCst);
                } else {
                    processor = None;
                }
            }
            ScanEvent::Stopped | ScanEvent::Finished => {
                debug!("Scan over, waiting for {} pending analyses", workers.len());
                processor = None;
            }
            ScanEvent::CalibrationComplete => info!("Calibration scan complete"),
        }

        while let Some(done) = workers.try_join_next() {
            if let Err(e) = done {
                error!("Analysis task panicked: {}", e);
            }
        }
    }

    while let Some(done) = workers.join_next().await {
        if let Err(e) = done {
            error!("Analysis task panicked: {}", e);
        }
    }

    control
        .current_scan
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();

    let state = tokio::task::spawn_blocking(move || handle.join())
        .await
        .context("Scan thread join failed")?;

    // An analysis failure aborts the scan, report it as an error
    let state = if state == ScanState::Stopped && stats.errors > 0 && control.is_running() {
        ScanState::Error
    } else {
        state
    };
    Ok((state, stats))
}
