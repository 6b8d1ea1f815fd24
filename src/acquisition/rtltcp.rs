// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rtlsdr-scan project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Network tuner speaking the `rtl_tcp` protocol
//!
//! On connection the server sends a 12 byte header: the magic `RTL0`, the
//! tuner type and the number of gain steps, both big-endian `u32`. Control
//! commands are 5 bytes, an opcode followed by a big-endian `u32`
//! parameter. After the header the server streams interleaved unsigned
//! 8-bit I/Q samples.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use log::{debug, info, warn};
use rustfft::num_complex::Complex32;

use super::{iq_from_bytes, tuner_name, Tuner, TunerError};

const MAGIC: &[u8; 4] = b"RTL0";
const HEADER_LEN: usize = 12;

const CMD_SET_FREQUENCY: u8 = 0x01;
const CMD_SET_SAMPLE_RATE: u8 = 0x02;
const CMD_SET_GAIN_MODE: u8 = 0x03;
const CMD_SET_GAIN: u8 = 0x04;

/// Bytes dropped after a retune, one default librtlsdr transfer (128k samples).
/// Covers samples the server produced at the old frequency that were still in
/// flight when the socket buffer was drained.
const SETTLE_BYTES: usize = 16 * 16384;

/// Client for a remote `rtl_tcp` server
pub struct RtlTcpTuner {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    tuner_type: u32,
}

impl RtlTcpTuner {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            stream: None,
            tuner_type: 0,
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TunerError> {
        let (host, port) = (&self.host, self.port);
        self.stream
            .as_mut()
            .ok_or_else(|| TunerError::Device(format!("not connected to {}:{}", host, port)))
    }

    fn send_command(&mut self, command: u8, param: u32) -> Result<(), TunerError> {
        let mut packet = [0u8; 5];
        packet[0] = command;
        packet[1..].copy_from_slice(&param.to_be_bytes());
        self.stream()?.write_all(&packet)?;
        Ok(())
    }

    /// Drop samples the server streamed before the last retune: whatever is
    /// already buffered, then [`SETTLE_BYTES`] more.
    fn discard_pending(&mut self) -> Result<(), TunerError> {
        let stream = self.stream()?;
        stream.set_nonblocking(true)?;
        let mut scratch = [0u8; 16 * 1024];
        let mut discarded = 0usize;
        let result = loop {
            match stream.read(&mut scratch) {
                Ok(0) => break Err(TunerError::Device("connection closed by server".into())),
                Ok(n) => discarded += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break Err(e.into()),
            }
        };
        stream.set_nonblocking(false)?;
        result?;

        // Stay aligned on I/Q pairs
        let mut remaining = SETTLE_BYTES + discarded % 2;
        while remaining > 0 {
            let n = remaining.min(scratch.len());
            stream.read_exact(&mut scratch[..n])?;
            remaining -= n;
        }
        debug!(
            "Discarded {} buffered and {} in-flight bytes after retune",
            discarded, SETTLE_BYTES
        );
        Ok(())
    }
}

/// Parse the greeting sent by the server, returning the tuner type code
fn parse_header(header: &[u8; HEADER_LEN]) -> Result<u32, TunerError> {
    if &header[..4] != MAGIC {
        return Err(TunerError::Protocol(format!(
            "unexpected rtl_tcp header {:02x?}",
            &header[..4]
        )));
    }
    let tuner = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let gains = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
    debug!("rtl_tcp tuner type {}, {} gain steps", tuner, gains);
    Ok(tuner)
}

impl Tuner for RtlTcpTuner {
    fn open(&mut self) -> Result<(), TunerError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| {
            TunerError::Device(format!("cannot connect to {}:{}: {}", self.host, self.port, e))
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Cannot disable Nagle on rtl_tcp link: {}", e);
        }

        let mut header = [0u8; HEADER_LEN];
        stream.read_exact(&mut header)?;
        self.tuner_type = parse_header(&header)?;
        info!("Connected to rtl_tcp server {}:{}", self.host, self.port);
        self.stream = Some(stream);
        Ok(())
    }

    fn configure(&mut self, sample_rate: u32, gain: f64) -> Result<String, TunerError> {
        self.send_command(CMD_SET_SAMPLE_RATE, sample_rate)?;
        self.send_command(CMD_SET_GAIN_MODE, 1)?;
        // Tenths of a dB, sent as the two's complement bit pattern
        let tenths = (gain * 10.0).round() as i32;
        self.send_command(CMD_SET_GAIN, tenths as u32)?;
        Ok(tuner_name(self.tuner_type).to_string())
    }

    fn tune(&mut self, frequency: u64) -> Result<(), TunerError> {
        let frequency = u32::try_from(frequency).map_err(|_| {
            TunerError::Device(format!("{} Hz is outside the tuner range", frequency))
        })?;
        self.send_command(CMD_SET_FREQUENCY, frequency)?;
        self.discard_pending()
    }

    fn capture(&mut self, count: usize) -> Result<Vec<Complex32>, TunerError> {
        let mut buffer = vec![0u8; count * 2];
        self.stream()?.read_exact(&mut buffer)?;
        Ok(iq_from_bytes(&buffer))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!("Disconnected from rtl_tcp server {}:{}", self.host, self.port);
        }
    }
}

impl Drop for RtlTcpTuner {
    fn drop(&mut self) {
        self.close();
    }
}
