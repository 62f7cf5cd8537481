//! UART transport to the cellular module (ESP-IDF only).
//!
//! Wraps an `esp-idf-hal` [`UartDriver`] as a [`Transport`].  Reads use a
//! zero timeout so `drain()` never blocks the control loop.

use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::uart::UartDriver;

use crate::error::{Error, Result};
use crate::modem::Transport;

pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl Transport for UartTransport<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut rest = bytes;
        while !rest.is_empty() {
            // Copies into the driver's TX ring; returns once queued.
            let n = self.uart.write(rest).map_err(|_| Error::Transport)?;
            if n == 0 {
                return Err(Error::Transport);
            }
            rest = &rest[n..];
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.uart.read(buf, NON_BLOCK).map_err(|_| Error::Transport)
    }
}
