// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Capture processing
//!
//! Connects the scan output to the spectrum store: every capture is turned
//! into a PSD, merged under the store lock and followed by an `Updated`
//! notification.

use log::error;

use crate::acquisition::Capture;
use crate::scan::events::{post_event, EventSender, ScanEvent, ERROR_ANALYSIS};
use crate::scan::ScanSession;
use crate::spectral::{AnalysisError, AnalysisParams, WelchAnalyzer};
use crate::spectrum::{update_spectrum, MergeParams, SharedSpectrum};

/// Analyses captures and folds them into a shared spectrum.
///
/// Safe to share between worker tasks; only the store access is serialized.
pub struct SpectrumProcessor {
    analyzer: WelchAnalyzer,
    merge: MergeParams,
    spectrum: SharedSpectrum,
    notify: EventSender,
}

impl SpectrumProcessor {
    pub fn new(
        session: &ScanSession,
        spectrum: SharedSpectrum,
        notify: EventSender,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            analyzer: WelchAnalyzer::new(AnalysisParams::from_session(session))?,
            merge: MergeParams::from_session(session),
            spectrum,
            notify,
        })
    }

    pub fn spectrum(&self) -> &SharedSpectrum {
        &self.spectrum
    }

    /// Analyse and merge one capture, returning whether the store changed.
    ///
    /// An analysis failure is posted as an `Error` event before being returned.
    pub fn process(&self, capture: &Capture) -> Result<bool, AnalysisError> {
        let step = match self.analyzer.analyse(capture) {
            Ok(step) => step,
            Err(e) => {
                error!("Analysis failed at {} Hz: {}", capture.frequency, e);
                post_event(
                    &self.notify,
                    ScanEvent::Error {
                        code: ERROR_ANALYSIS,
                        frequency: capture.frequency,
                        message: e.to_string(),
                    },
                );
                return Err(e);
            }
        };
        let updated = update_spectrum(&self.notify, &self.spectrum, &self.merge, &step);
        post_event(&self.notify, ScanEvent::Updated(updated));
        Ok(updated)
    }
}
