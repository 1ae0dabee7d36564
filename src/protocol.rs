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

//! Control bytes, timing and retry limits of the Q-M serial protocol

use std::time::Duration;

/// Start of text - first byte of every frame
pub const STX: u8 = 0x02;

/// End of text - end marker of the last frame of a message
pub const ETX: u8 = 0x03;

/// End of transmission - sender closes an acknowledged frame
pub const EOT: u8 = 0x04;

/// Enquiry - request to send
pub const ENQ: u8 = 0x05;

/// Acknowledge - request granted, or frame accepted
pub const ACK: u8 = 0x06;

/// Transmit on (DC1)
pub const XON: u8 = 0x11;

/// Transmit off (DC3)
pub const XOFF: u8 = 0x13;

/// Negative acknowledge - request refused, or frame must be resent
pub const NACK: u8 = 0x15;

/// End of transmission block - end marker of a frame with more to follow
pub const ETB: u8 = 0x17;

/// Escape - the next byte is the complement of a reserved value
pub const ESC: u8 = 0x1b;

/// Bytes that never travel literally inside a frame's length, payload or
/// checksum. EOT is not part of the set.
pub const RESERVED: [u8; 9] = [STX, ETX, ENQ, ACK, XON, XOFF, NACK, ETB, ESC];

/// Whether `byte` must be sent as an escape pair.
pub fn is_reserved(byte: u8) -> bool {
    RESERVED.contains(&byte)
}

/// Whether `byte` closes a frame (final or continuation).
pub fn is_end_marker(byte: u8) -> bool {
    byte == ETX || byte == ETB
}

/// Per-byte line timeout used whenever the caller has no better idea
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Largest payload carried by one frame (the length field is 16 bits)
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// ENQ writes before a send or the session handshake gives up
pub const ENQ_ATTEMPTS: u32 = 5;

/// Extra ENQs tolerated from a peer that also wants to send
pub const PEER_ENQ_REPEATS: u32 = 3;

/// Transmissions of one frame before a NACKing peer is declared broken
pub const SEND_ATTEMPTS: u32 = 3;

/// Rejected copies of one inbound frame before giving up
pub const RECEIVE_ATTEMPTS: u32 = 3;

/// ACKs accepted while waiting for the peer's ENQ before the link is stuck
pub const UNWANTED_ACKS: u32 = 10;

/// Rounds of drained line noise tolerated by the session handshake
pub const NOISE_ROUNDS: u32 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_set() {
        for byte in [STX, ETX, ENQ, ACK, XON, XOFF, NACK, ETB, ESC] {
            assert!(is_reserved(byte), "0x{:02X} should be reserved", byte);
        }
        assert!(!is_reserved(EOT));
        assert!(!is_reserved(0x00));
        assert!(!is_reserved(0xFF));
    }

    #[test]
    fn test_complement_leaves_reserved_set() {
        for byte in RESERVED {
            assert!(!is_reserved(!byte), "complement of 0x{:02X} must be plain data", byte);
        }
    }

    #[test]
    fn test_end_markers() {
        assert!(is_end_marker(ETX));
        assert!(is_end_marker(ETB));
        assert!(!is_end_marker(EOT));
    }
}
