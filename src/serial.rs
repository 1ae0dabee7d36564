// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::io::{Read, Write};
use std::time::Duration;
use serialport::SerialPort as SerialPortTrait;

use crate::config::LineSettings;
use crate::protocol::DEFAULT_TIMEOUT;

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Trait for the byte channel the protocol engine drives.
///
/// Opening happens in the implementor's constructor and closing when it is
/// dropped. A read that returns `Ok(0)` is treated like a timeout.
pub trait SerialPort: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;

    fn set_baud_rate(&mut self, baud_rate: u32) -> std::io::Result<()>;

    fn baud_rate(&self) -> std::io::Result<u32>;
}

/// Read exactly one byte, turning an empty read into `TimedOut`.
pub fn read_byte(port: &mut dyn SerialPort, timeout: Duration) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    match port.read_timeout(&mut buf, timeout)? {
        0 => Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "no data")),
        _ => Ok(buf[0]),
    }
}

/// Discard whatever the peer is sending until the line goes quiet.
/// Returns the number of bytes thrown away.
pub fn drain(port: &mut dyn SerialPort) -> std::io::Result<usize> {
    let mut dropped = 0;
    loop {
        match read_byte(port, DEFAULT_TIMEOUT) {
            Ok(_) => dropped += 1,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(dropped),
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(port_name: &str, settings: &LineSettings) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .timeout(DEFAULT_TIMEOUT)
            .open()?;

        tracing::debug!(port = port_name, ?settings, "opened serial port");
        Ok(RealSerialPort { port })
    }
}

fn to_io(e: serialport::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e)
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        self.port.set_timeout(timeout).map_err(to_io)?;
        self.port.read(buf)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> std::io::Result<()> {
        self.port.set_baud_rate(baud_rate).map_err(to_io)
    }

    fn baud_rate(&self) -> std::io::Result<u32> {
        self.port.baud_rate().map_err(to_io)
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialPort {
    // Data to return on reads (None = timeout)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
    baud_rate: u32,
    baud_log: Vec<u32>,
    expected_bauds: Vec<u32>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            write_log: Vec::new(),
            expected_writes,
            baud_rate: 9600,
            baud_log: Vec::new(),
            expected_bauds: Vec::new(),
        }
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        // Out of responses = timeout
        if self.read_pos >= self.read_buffer.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        // If current response is None = timeout
        if self.read_buffer[self.read_pos].is_none() {
            self.read_pos += 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        let mut bytes_read = 0;
        while bytes_read < buf.len() && self.read_pos < self.read_buffer.len() {
            match self.read_buffer[self.read_pos] {
                Some(byte) => {
                    buf[bytes_read] = byte;
                    bytes_read += 1;
                    self.read_pos += 1;
                }
                None => break,  // Stop at timeout marker
            }
        }

        Ok(bytes_read)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> std::io::Result<()> {
        self.baud_rate = baud_rate;
        self.baud_log.push(baud_rate);
        Ok(())
    }

    fn baud_rate(&self) -> std::io::Result<u32> {
        Ok(self.baud_rate)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {} bytes)",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\nExpected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );

        assert_eq!(self.baud_log, self.expected_bauds, "MockSerialPort baud rate changes mismatch");
    }
}

// ============================================================================
// Exchange Scripts for Testing
// ============================================================================

/// Builds the read and write sides of a mock conversation from the
/// camera's point of view.
#[cfg(test)]
#[derive(Default)]
pub struct Script {
    pub reads: Vec<Option<u8>>,
    pub writes: Vec<u8>,
    bauds: Vec<u32>,
    start_baud: Option<u32>,
}

#[cfg(test)]
impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// The camera sends `byte`.
    pub fn read(mut self, byte: u8) -> Self {
        self.reads.push(Some(byte));
        self
    }

    pub fn read_all(mut self, bytes: &[u8]) -> Self {
        self.reads.extend(bytes.iter().copied().map(Some));
        self
    }

    /// The camera stays silent for one read.
    pub fn timeout(mut self) -> Self {
        self.reads.push(None);
        self
    }

    /// The host is expected to send `byte`.
    pub fn write(mut self, byte: u8) -> Self {
        self.writes.push(byte);
        self
    }

    pub fn write_all(mut self, bytes: &[u8]) -> Self {
        self.writes.extend_from_slice(bytes);
        self
    }

    /// The host is expected to switch the line to `baud`.
    pub fn baud(mut self, baud: u32) -> Self {
        self.bauds.push(baud);
        self
    }

    /// The mock starts out at `baud` instead of 9600.
    pub fn starting_baud(mut self, baud: u32) -> Self {
        self.start_baud = Some(baud);
        self
    }

    /// The host sends `payload` as one frame and the camera accepts it.
    pub fn host_sends(self, payload: &[u8]) -> Self {
        use crate::protocol::{ACK, ENQ, EOT};
        self.write(ENQ)
            .read(ACK)
            .write_all(&crate::codec::encode(payload, true))
            .read(ACK)
            .write(EOT)
    }

    /// The camera sends `payload` as one frame and the host accepts it.
    pub fn camera_sends(self, payload: &[u8]) -> Self {
        use crate::protocol::{ACK, ENQ, EOT};
        self.read(ENQ)
            .write(ACK)
            .read_all(&crate::codec::encode(payload, true))
            .write(ACK)
            .read(EOT)
    }

    pub fn into_port(self) -> MockSerialPort {
        let mut port = MockSerialPort::new(self.reads, self.writes);
        port.expected_bauds = self.bauds;
        if let Some(baud) = self.start_baud {
            port.baud_rate = baud;
        }
        port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_byte_timeout() {
        let mut port = MockSerialPort::new(vec![None, Some(0x42)], vec![]);
        let err = read_byte(&mut port, DEFAULT_TIMEOUT).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
        assert_eq!(read_byte(&mut port, DEFAULT_TIMEOUT).unwrap(), 0x42);
    }

    #[test]
    fn test_drain_stops_at_silence() {
        let mut port = MockSerialPort::new(vec![Some(1), Some(2), Some(3), None], vec![]);
        assert_eq!(drain(&mut port).unwrap(), 3);
    }

    #[test]
    fn test_script_host_sends() {
        let script = Script::new().host_sends(&[0x00, 0x90, 0x00, 0x00]);
        assert_eq!(script.reads, vec![Some(0x06), Some(0x06)]);
        assert_eq!(script.writes.first(), Some(&0x05));
        assert_eq!(script.writes.last(), Some(&0x04));
    }
}
