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

//! Line settings and per-operation reply timeouts

use std::time::Duration;
use serialport::{DataBits, Parity, StopBits};

/// How the serial line is configured before the first handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LineSettings {
    /// The cameras power up at 9600 8N1.
    fn default() -> Self {
        LineSettings {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// How long to wait for the camera to start answering, per kind of
/// operation. Once an answer has started, every further byte is bounded
/// by [`crate::protocol::DEFAULT_TIMEOUT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Commands answered by a control reply only
    pub control: Duration,
    pub image_info: Duration,
    /// Thumbnail, JPEG and EXIF downloads
    pub image: Duration,
    pub preview: Duration,
    /// The camera focuses and fires before it says anything
    pub capture: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            control: Duration::from_millis(1000),
            image_info: Duration::from_millis(1000),
            image: Duration::from_millis(5000),
            preview: Duration::from_millis(5000),
            capture: Duration::from_millis(60000),
        }
    }
}

pub fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

pub fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

pub fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let line = LineSettings::default();
        assert_eq!(line.baud_rate, 9600);
        assert_eq!(line.data_bits, DataBits::Eight);

        let timeouts = Timeouts::default();
        assert!(timeouts.control < timeouts.image);
        assert_eq!(timeouts.capture, Duration::from_secs(60));
    }

    #[test]
    fn test_parsers() {
        assert_eq!(parse_data_bits(7), Ok(DataBits::Seven));
        assert!(parse_data_bits(9).is_err());
        assert_eq!(parse_parity("EVEN"), Ok(Parity::Even));
        assert!(parse_parity("mark").is_err());
        assert_eq!(parse_stop_bits(2), Ok(StopBits::Two));
        assert!(parse_stop_bits(3).is_err());
    }
}
