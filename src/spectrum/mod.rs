// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectrum aggregation
//!
//! Steps are merged into a [`SpectrumStore`] shared with readers behind a
//! single mutex. Only bins inside the guard bands of a step are kept, away
//! from the DC spike and local oscillator leakage at the step center.

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

mod store;

pub use store::{bin_frequency, Bucket, MergeParams, MergeReport, SpectrumStore};

use crate::scan::events::{post_event, EventSender, ScanEvent};
use crate::spectral::StepSpectrum;

/// Spectrum store shared between the producer and its readers
pub type SharedSpectrum = Arc<Mutex<SpectrumStore>>;

pub fn shared_spectrum() -> SharedSpectrum {
    Arc::new(Mutex::new(SpectrumStore::new()))
}

/// Lock the store, recovering it if a previous holder panicked
pub fn lock_spectrum(lock: &SharedSpectrum) -> MutexGuard<'_, SpectrumStore> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Merge one step under the store lock and post an `Alert` for every
/// qualifying write once the lock is released.
///
/// Returns whether any bin was written. The caller posts `Updated`.
pub fn update_spectrum(
    notify: &EventSender,
    lock: &SharedSpectrum,
    params: &MergeParams,
    spectrum: &StepSpectrum,
) -> bool {
    let report = {
        let mut store = lock_spectrum(lock);
        store.merge(params, spectrum)
    };
    debug!(
        "Merged step {} Hz: updated={}, {} alert(s)",
        spectrum.frequency,
        report.updated,
        report.alerts.len()
    );
    for (frequency, level) in report.alerts {
        post_event(notify, ScanEvent::Alert { frequency, level });
    }
    report.updated
}
