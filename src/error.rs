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

//! The one error type shared by every layer

use thiserror::Error;

use crate::codec::Reject;
use crate::status::DeviceError;

/// Everything that can go wrong while talking to the camera.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport failed, or a mandatory byte never arrived.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer violated the protocol.
    #[error("transmission error: {0}")]
    Transmission(#[from] Transmission),

    /// The camera answered with a non-success status word.
    #[error("camera error: {0}")]
    Device(#[from] DeviceError),

    /// The caller asked for something that cannot be sent.
    #[error("bad parameter: {0}")]
    BadParameter(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Protocol violations detected on this side of the link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Transmission {
    #[error("camera refused {attempts} requests to send")]
    HandshakeRejected { attempts: u32 },

    #[error("camera kept asking to send after being refused")]
    CollisionUnresolved,

    #[error("camera rejected the frame {attempts} times")]
    FrameNacked { attempts: u32 },

    #[error("frame rejected {attempts} times, last because of {reason}")]
    FrameRejected { reason: Reject, attempts: u32 },

    #[error("camera offered and withdrew {acks} times; link is stuck")]
    LinkStuck { acks: u32 },

    #[error("unexpected byte 0x{byte:02X} while {context}")]
    UnexpectedByte { byte: u8, context: &'static str },

    #[error("reply is for command 0x{actual:04X}, expected 0x{expected:04X}")]
    OpcodeMismatch { expected: u16, actual: u16 },

    #[error("reply too short: {len} bytes, needed {needed}")]
    ShortReply { len: usize, needed: usize },

    #[error("localization upload not acknowledged as complete after {packets} packets")]
    Unterminated { packets: u32 },

    #[error("link finished without delivering a message")]
    NoMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_raw_status_bytes() {
        let err = Error::from(DeviceError::Undiscovered { first: 0x0a, second: 0x07 });
        let text = err.to_string();
        assert!(text.contains("0x0A"), "{}", text);
        assert!(text.contains("0x07"), "{}", text);
    }

    #[test]
    fn test_opcode_mismatch_message() {
        let err = Error::from(Transmission::OpcodeMismatch { expected: 0x9020, actual: 0x9010 });
        assert_eq!(
            err.to_string(),
            "transmission error: reply is for command 0x9010, expected 0x9020"
        );
    }
}
