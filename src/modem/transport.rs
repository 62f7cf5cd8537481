//! Non-blocking command link to the cellular module.
//!
//! [`Transport`] is the raw byte channel (UART on target, a recording
//! buffer in tests).  [`CommandLink`] sits on top of it and gives the
//! control core three operations that never wait:
//!
//! - [`send`](CommandLink::send): format one command line and write it with
//!   a `\r\n` terminator.
//! - [`send_raw`](CommandLink::send_raw): write a single control byte
//!   (the SMS Ctrl-Z terminator).
//! - [`drain`](CommandLink::drain): pull whatever the module has already
//!   sent, split it into lines, and hand each line to the caller.
//!
//! Inbound bytes are forwarded per line.  The one thing the module sends
//! without a newline is the `> ` body prompt after `AT+CMGS`; a pending
//! partial line ending in it is flushed once nothing more is readable.
//!
//! Replies are never parsed.  Write failures are logged and dropped; the
//! alarm is best-effort and the call cooldown bounds any retry storm.

use core::fmt::{self, Write as _};

use crate::error::Result;

/// Longest command line we ever build (`AT+CMGS` + number, or a full
/// 160-char SMS body).
const MAX_LINE: usize = 192;
/// Inbound line assembly buffer; longer lines are split.
const RX_LINE: usize = 128;
/// Bytes pulled from the transport per read call.
const RX_CHUNK: usize = 64;
/// SMS body prompt; arrives without a line terminator.
const SMS_PROMPT: &[u8] = b"> ";

/// Byte-oriented duplex channel to the module.
pub trait Transport {
    /// Write every byte of `bytes`.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Copy already-buffered inbound bytes into `buf` without blocking.
    /// Returns 0 when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Fire-and-forget command writer plus inbound line splitter.
pub struct CommandLink<T: Transport> {
    transport: T,
    rx_line: heapless::Vec<u8, RX_LINE>,
    write_failures: u32,
}

impl<T: Transport> CommandLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            rx_line: heapless::Vec::new(),
            write_failures: 0,
        }
    }

    /// Write one command line terminated by `\r\n`.
    pub fn send<C: fmt::Display>(&mut self, line: C) {
        let mut buf: heapless::String<MAX_LINE> = heapless::String::new();
        if write!(buf, "{line}\r\n").is_err() {
            log::warn!("modem: command longer than {MAX_LINE} bytes dropped");
            return;
        }
        log::debug!("modem >> {}", buf.trim_end());
        self.write_bytes(buf.as_bytes());
    }

    /// Write a single raw byte.
    pub fn send_raw(&mut self, byte: u8) {
        log::debug!("modem >> 0x{byte:02X}");
        self.write_bytes(&[byte]);
    }

    /// Forward every inbound byte that is already available, one complete
    /// line at a time.  Partial lines are kept for the next call, except
    /// a trailing SMS prompt.
    pub fn drain(&mut self, mut on_line: impl FnMut(&str)) {
        let mut chunk = [0u8; RX_CHUNK];
        loop {
            let n = match self.transport.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    log::debug!("modem: read failed: {e}");
                    break;
                }
            };
            for &b in &chunk[..n] {
                match b {
                    b'\r' => {}
                    b'\n' => self.flush_line(&mut on_line),
                    _ => {
                        let b = if (0x20..=0x7E).contains(&b) { b } else { b'.' };
                        if self.rx_line.push(b).is_err() {
                            self.flush_line(&mut on_line);
                            // Buffer was just emptied, so this push fits.
                            let _ = self.rx_line.push(b);
                        }
                    }
                }
            }
        }
        if self.rx_line.ends_with(SMS_PROMPT) {
            self.flush_line(&mut on_line);
        }
    }

    /// Number of writes the transport has rejected since start-up.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        if let Err(e) = self.transport.write(bytes) {
            self.write_failures = self.write_failures.wrapping_add(1);
            log::warn!("modem: write failed: {e}");
        }
    }

    fn flush_line(&mut self, on_line: &mut impl FnMut(&str)) {
        if !self.rx_line.is_empty() {
            // Only printable ASCII is ever buffered.
            if let Ok(line) = core::str::from_utf8(&self.rx_line) {
                on_line(line);
            }
            self.rx_line.clear();
        }
    }
}
