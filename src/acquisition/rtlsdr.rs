// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Locally attached RTL-SDR tuner
//!
//! librtlsdr is loaded at runtime with `libloading`, so the scanner builds
//! and runs on machines without the library. Opening a local device there
//! fails with a [`TunerError::Device`].

use std::ffi::{c_int, c_uint, c_void};
use std::ptr;
use std::sync::OnceLock;

use libloading::Library;
use log::{debug, info};
use rustfft::num_complex::Complex32;

use super::{iq_from_bytes, tuner_name, Tuner, TunerError};

type DevHandle = *mut c_void;

type OpenFn = unsafe extern "C" fn(*mut DevHandle, c_uint) -> c_int;
type CloseFn = unsafe extern "C" fn(DevHandle) -> c_int;
type SetU32Fn = unsafe extern "C" fn(DevHandle, c_uint) -> c_int;
type SetI32Fn = unsafe extern "C" fn(DevHandle, c_int) -> c_int;
type GetI32Fn = unsafe extern "C" fn(DevHandle) -> c_int;
type ResetFn = unsafe extern "C" fn(DevHandle) -> c_int;
type ReadSyncFn = unsafe extern "C" fn(DevHandle, *mut c_void, c_int, *mut c_int) -> c_int;

/// libusb reports a claimed interface with this code
const LIBUSB_ERROR_BUSY: c_int = -6;

/// Bulk transfers must be a multiple of this many bytes
const USB_BLOCK: usize = 512;

/// Upper bound for a single synchronous read
const MAX_READ: usize = 256 * 1024;

#[cfg(target_os = "linux")]
const LIB_NAMES: &[&str] = &["librtlsdr.so.0", "librtlsdr.so", "librtlsdr.so.2"];

#[cfg(target_os = "macos")]
const LIB_NAMES: &[&str] = &["librtlsdr.dylib", "librtlsdr.0.dylib"];

#[cfg(target_os = "windows")]
const LIB_NAMES: &[&str] = &["rtlsdr.dll", "librtlsdr.dll"];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const LIB_NAMES: &[&str] = &["librtlsdr.so"];

/// Function table resolved from librtlsdr
struct RtlSdrLib {
    open: OpenFn,
    close: CloseFn,
    set_center_freq: SetU32Fn,
    set_sample_rate: SetU32Fn,
    set_tuner_gain_mode: SetI32Fn,
    set_tuner_gain: SetI32Fn,
    get_tuner_type: GetI32Fn,
    reset_buffer: ResetFn,
    read_sync: ReadSyncFn,
    // Keeps the function pointers above valid
    _lib: Library,
}

impl RtlSdrLib {
    /// Resolve every symbol the tuner needs from an already loaded library.
    ///
    /// # Safety
    ///
    /// `lib` must be librtlsdr; the signatures above follow its C header.
    unsafe fn bind(lib: Library) -> Result<Self, libloading::Error> {
        let open = *lib.get::<OpenFn>(b"rtlsdr_open\0")?;
        let close = *lib.get::<CloseFn>(b"rtlsdr_close\0")?;
        let set_center_freq = *lib.get::<SetU32Fn>(b"rtlsdr_set_center_freq\0")?;
        let set_sample_rate = *lib.get::<SetU32Fn>(b"rtlsdr_set_sample_rate\0")?;
        let set_tuner_gain_mode = *lib.get::<SetI32Fn>(b"rtlsdr_set_tuner_gain_mode\0")?;
        let set_tuner_gain = *lib.get::<SetI32Fn>(b"rtlsdr_set_tuner_gain\0")?;
        let get_tuner_type = *lib.get::<GetI32Fn>(b"rtlsdr_get_tuner_type\0")?;
        let reset_buffer = *lib.get::<ResetFn>(b"rtlsdr_reset_buffer\0")?;
        let read_sync = *lib.get::<ReadSyncFn>(b"rtlsdr_read_sync\0")?;

        Ok(Self {
            open,
            close,
            set_center_freq,
            set_sample_rate,
            set_tuner_gain_mode,
            set_tuner_gain,
            get_tuner_type,
            reset_buffer,
            read_sync,
            _lib: lib,
        })
    }
}

static RTLSDR_LIB: OnceLock<Option<RtlSdrLib>> = OnceLock::new();

fn load_library() -> Option<RtlSdrLib> {
    for name in LIB_NAMES {
        let Ok(lib) = (unsafe { Library::new(name) }) else {
            continue;
        };
        match unsafe { RtlSdrLib::bind(lib) } {
            Ok(bound) => {
                info!("Loaded RTL-SDR library: {}", name);
                return Some(bound);
            }
            Err(e) => debug!("{} is missing RTL-SDR symbols: {}", name, e),
        }
    }
    debug!("RTL-SDR library not found");
    None
}

fn library() -> Result<&'static RtlSdrLib, TunerError> {
    RTLSDR_LIB
        .get_or_init(load_library)
        .as_ref()
        .ok_or_else(|| TunerError::Device("librtlsdr not found, install the rtl-sdr package".into()))
}

/// Map a librtlsdr return code to the tuner error taxonomy
fn check(operation: &str, ret: c_int) -> Result<c_int, TunerError> {
    match ret {
        r if r >= 0 => Ok(r),
        LIBUSB_ERROR_BUSY => Err(TunerError::PlatformBusy(format!(
            "{} failed: device is claimed by another driver",
            operation
        ))),
        r => Err(TunerError::Device(format!(
            "{} failed with error code {}",
            operation, r
        ))),
    }
}

/// RTL2832U dongle accessed through librtlsdr
pub struct RtlSdrTuner {
    index: u32,
    device: Option<DevHandle>,
}

// SAFETY: the device handle is only used by the thread that owns the tuner;
// librtlsdr has no thread affinity for synchronous calls.
unsafe impl Send for RtlSdrTuner {}

impl RtlSdrTuner {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            device: None,
        }
    }

    fn handle(&self) -> Result<(&'static RtlSdrLib, DevHandle), TunerError> {
        let device = self
            .device
            .ok_or_else(|| TunerError::Device(format!("RTL-SDR #{} is not open", self.index)))?;
        Ok((library()?, device))
    }
}

impl Tuner for RtlSdrTuner {
    fn open(&mut self) -> Result<(), TunerError> {
        if self.device.is_some() {
            return Ok(());
        }
        let lib = library()?;
        let mut device: DevHandle = ptr::null_mut();
        check("rtlsdr_open", unsafe { (lib.open)(&mut device, self.index) })?;
        if device.is_null() {
            return Err(TunerError::Device("rtlsdr_open returned no handle".into()));
        }
        info!("Opened RTL-SDR device #{}", self.index);
        self.device = Some(device);
        Ok(())
    }

    fn configure(&mut self, sample_rate: u32, gain: f64) -> Result<String, TunerError> {
        let (lib, device) = self.handle()?;
        check("rtlsdr_set_sample_rate", unsafe {
            (lib.set_sample_rate)(device, sample_rate)
        })?;
        check("rtlsdr_set_tuner_gain_mode", unsafe {
            (lib.set_tuner_gain_mode)(device, 1)
        })?;
        // librtlsdr expects tenths of a dB
        let tenths = (gain * 10.0).round() as c_int;
        check("rtlsdr_set_tuner_gain", unsafe {
            (lib.set_tuner_gain)(device, tenths)
        })?;
        let tuner = unsafe { (lib.get_tuner_type)(device) };
        Ok(tuner_name(tuner.max(0) as u32).to_string())
    }

    fn tune(&mut self, frequency: u64) -> Result<(), TunerError> {
        let (lib, device) = self.handle()?;
        let frequency = u32::try_from(frequency).map_err(|_| {
            TunerError::Device(format!("{} Hz is outside the tuner range", frequency))
        })?;
        check("rtlsdr_set_center_freq", unsafe {
            (lib.set_center_freq)(device, frequency)
        })?;
        Ok(())
    }

    fn capture(&mut self, count: usize) -> Result<Vec<Complex32>, TunerError> {
        let (lib, device) = self.handle()?;
        check("rtlsdr_reset_buffer", unsafe { (lib.reset_buffer)(device) })?;

        let wanted = count * 2;
        let total = wanted.div_ceil(USB_BLOCK) * USB_BLOCK;
        let mut buffer = vec![0u8; total];
        let mut filled = 0;
        while filled < total {
            let chunk = (total - filled).min(MAX_READ);
            let mut read: c_int = 0;
            check("rtlsdr_read_sync", unsafe {
                (lib.read_sync)(
                    device,
                    buffer[filled..].as_mut_ptr() as *mut c_void,
                    chunk as c_int,
                    &mut read,
                )
            })?;
            if read <= 0 {
                return Err(TunerError::Device(format!(
                    "short read: {} of {} bytes",
                    filled, total
                )));
            }
            filled += read as usize;
        }
        buffer.truncate(wanted);
        Ok(iq_from_bytes(&buffer))
    }

    fn close(&mut self) {
        if let Some(device) = self.device.take() {
            if let Ok(lib) = library() {
                unsafe { (lib.close)(device) };
            }
            debug!("Closed RTL-SDR device #{}", self.index);
        }
    }
}

impl Drop for RtlSdrTuner {
    fn drop(&mut self) {
        self.close();
    }
}
