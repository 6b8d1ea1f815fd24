// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Runs the configured sweeps in the background. Each sweep starts a scan
//! thread, consumes its notifications and hands every capture to a blocking
//! worker that analyses it and merges it into the shared spectrum.
//!
//! ## Usage
//!
//! ```no_run
//! use rtlsdr_scan::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Stop early on Ctrl+C
//!     let control = daemon.control();
//!     tokio::spawn(async move {
//!         if tokio::signal::ctrl_c().await.is_ok() {
//!             control.shutdown();
//!         }
//!     });
//!
//!     daemon.join().await
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::{Daemon, DaemonControl, SweepStats};
