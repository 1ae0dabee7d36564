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

//! Serial bit rates the cameras understand, and switching between them

use std::fmt;
use tracing::{debug, info};

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::link::Link;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitRate {
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BitRate {
    /// Slowest first; the position is the rate's bit in [`BitRates`].
    pub const ALL: [BitRate; 10] = [
        BitRate::B300,
        BitRate::B600,
        BitRate::B1200,
        BitRate::B2400,
        BitRate::B4800,
        BitRate::B9600,
        BitRate::B19200,
        BitRate::B38400,
        BitRate::B57600,
        BitRate::B115200,
    ];

    pub fn baud(self) -> u32 {
        match self {
            BitRate::B300 => 300,
            BitRate::B600 => 600,
            BitRate::B1200 => 1200,
            BitRate::B2400 => 2400,
            BitRate::B4800 => 4800,
            BitRate::B9600 => 9600,
            BitRate::B19200 => 19200,
            BitRate::B38400 => 38400,
            BitRate::B57600 => 57600,
            BitRate::B115200 => 115200,
        }
    }

    pub fn from_baud(baud: u32) -> Option<BitRate> {
        BitRate::ALL.into_iter().find(|rate| rate.baud() == baud)
    }

    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for BitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.baud())
    }
}

/// Set of bit rates, as reported by the IO capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitRates(pub u16);

impl BitRates {
    pub fn contains(self, rate: BitRate) -> bool {
        self.0 & rate.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = BitRate> {
        BitRate::ALL.into_iter().filter(move |rate| self.contains(*rate))
    }

    pub fn highest(self) -> Option<BitRate> {
        self.iter().last()
    }
}

impl fmt::Display for BitRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rates: Vec<String> = self.iter().map(|rate| rate.to_string()).collect();
        write!(f, "{}", rates.join(", "))
    }
}

/// Character framing options of the camera's UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitFlags(pub u16);

impl BitFlags {
    pub const EIGHT_BITS: BitFlags = BitFlags(1 << 0);
    pub const STOP_2_BITS: BitFlags = BitFlags(1 << 1);
    pub const PARITY_ON: BitFlags = BitFlags(1 << 2);
    pub const PARITY_ODD: BitFlags = BitFlags(1 << 3);
    pub const HW_FLOW_CONTROL: BitFlags = BitFlags(1 << 4);

    pub fn contains(self, other: BitFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for BitFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (BitFlags::EIGHT_BITS, "8 bits"),
            (BitFlags::STOP_2_BITS, "2 stop bits"),
            (BitFlags::PARITY_ON, "parity"),
            (BitFlags::PARITY_ODD, "odd parity"),
            (BitFlags::HW_FLOW_CONTROL, "hardware flow control"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", set.join(", "))
    }
}

/// Speed to switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    /// Fastest rate the camera reports
    Highest,
    Exact(BitRate),
}

/// Order in which [`probe`] tries the line speeds
pub const PROBE_ORDER: [BitRate; 10] = [
    BitRate::B115200,
    BitRate::B9600,
    BitRate::B57600,
    BitRate::B38400,
    BitRate::B19200,
    BitRate::B4800,
    BitRate::B2400,
    BitRate::B1200,
    BitRate::B600,
    BitRate::B300,
];

/// Find the speed a camera of unknown state is listening at by running the
/// session handshake at each rate in turn.
pub fn probe(link: &mut Link) -> Result<BitRate> {
    for rate in PROBE_ORDER {
        debug!(baud = rate.baud(), "probing");
        link.port_mut().set_baud_rate(rate.baud())?;
        match link.init() {
            Ok(()) => {
                info!(baud = rate.baud(), "camera answered");
                return Ok(rate);
            }
            Err(Error::Io(_)) | Err(Error::Transmission(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        "camera did not answer at any speed",
    )
    .into())
}

impl Camera {
    /// Ask the camera to switch bit rate, follow it and handshake again.
    pub fn set_speed(&mut self, speed: Speed) -> Result<BitRate> {
        let current = self.link_mut().port_mut().baud_rate()?;
        if current == BitRate::B115200.baud() && speed == Speed::Highest {
            return Ok(BitRate::B115200);
        }

        let rate = match speed {
            Speed::Exact(rate) => rate,
            Speed::Highest => self
                .get_io_capability()?
                .bit_rates
                .highest()
                .ok_or(Error::BadParameter("camera reports no usable bit rate"))?,
        };
        if rate.baud() == current {
            return Ok(rate);
        }

        self.set_io_capability(rate, BitFlags::EIGHT_BITS)?;
        info!(baud = rate.baud(), "reconnecting");
        self.link_mut().port_mut().set_baud_rate(rate.baud())?;
        self.init()?;
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{reply_bytes, Command};
    use crate::layout::IdWidth;
    use crate::protocol::{ACK, ENQ};
    use crate::serial::Script;

    #[test]
    fn test_bit_positions() {
        assert_eq!(BitRate::B300.bit(), 0x0001);
        assert_eq!(BitRate::B9600.bit(), 0x0020);
        assert_eq!(BitRate::B115200.bit(), 0x0200);
        assert_eq!(BitRate::from_baud(57600), Some(BitRate::B57600));
        assert_eq!(BitRate::from_baud(14400), None);
    }

    #[test]
    fn test_highest() {
        let rates = BitRates(0x0020 | 0x0040 | 0x0080);
        assert_eq!(rates.highest(), Some(BitRate::B38400));
        assert_eq!(rates.to_string(), "9600, 19200, 38400");
        assert_eq!(BitRates(0).highest(), None);
    }

    #[test]
    fn test_flags_display() {
        let flags = BitFlags(BitFlags::EIGHT_BITS.0 | BitFlags::HW_FLOW_CONTROL.0);
        assert_eq!(flags.to_string(), "8 bits, hardware flow control");
    }

    #[test]
    fn test_probe_falls_back() {
        let mut script = Script::new().baud(115200);
        for _ in 0..5 {
            script = script.write(ENQ).timeout();
        }
        let script = script.baud(9600).write(ENQ).read(ACK);

        let mut link = Link::new(Box::new(script.into_port()));
        assert_eq!(probe(&mut link).unwrap(), BitRate::B9600);
    }

    #[test]
    fn test_set_speed_highest() {
        let get = [0x00, 0x90, 0x00, 0x00];
        let set = [0x80, 0x90, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00];
        let script = Script::new()
            .host_sends(&get)
            .camera_sends(&reply_bytes(Command::GetIoCapability, [0, 0], &[0xE0, 0x01, 0x00]))
            .host_sends(&set)
            .camera_sends(&reply_bytes(Command::SetIoCapability, [0, 0], &[]))
            .baud(57600)
            .write(ENQ)
            .read(ACK);

        let mut camera = Camera::new(Box::new(script.into_port()), IdWidth::Short);
        assert_eq!(camera.set_speed(Speed::Highest).unwrap(), BitRate::B57600);
    }

    #[test]
    fn test_set_speed_noop_at_same_rate() {
        let script = Script::new().starting_baud(38400);
        let mut camera = Camera::new(Box::new(script.into_port()), IdWidth::Short);
        assert_eq!(
            camera.set_speed(Speed::Exact(BitRate::B38400)).unwrap(),
            BitRate::B38400
        );
    }
}
