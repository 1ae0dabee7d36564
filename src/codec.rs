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

//! Frame codec
//!
//! ```text
//! STX | len_lo len_hi | payload ... | ETX or ETB | checksum
//! ```
//!
//! The length counts unescaped payload bytes. The checksum is the 8-bit
//! sum of both length bytes, the unescaped payload and the end marker.
//! Length, payload and checksum are escaped after the checksum has been
//! computed; the start and end markers are always literal.

use std::io;
use thiserror::Error;
use tracing::{trace, warn};

use crate::protocol::*;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Vec<u8>,
    /// `true` for ETX, `false` for ETB (more frames follow)
    pub is_final: bool,
}

/// Why a complete frame was refused. The link answers with NACK and the
/// peer resends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Reject {
    #[error("checksum mismatch (sent 0x{sent:02X}, computed 0x{computed:02X})")]
    Checksum { sent: u8, computed: u8 },

    #[error("end marker 0x{marker:02X} inside the frame body")]
    Truncated { marker: u8 },

    #[error("escape followed by 0x{byte:02X}, which masks no reserved byte")]
    BadMask { byte: u8 },

    #[error("expected end marker, got 0x{byte:02X}")]
    BadEndMarker { byte: u8 },

    #[error("unescaped 0x{byte:02X} in checksum position")]
    UnescapedChecksum { byte: u8 },
}

/// Result of reading one frame off the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Valid(Frame),
    Rejected(Reject),
}

// ============================================================================
// Encoding
// ============================================================================

/// Checksum of a frame carrying `payload` and closed by `end_marker`.
pub fn checksum(payload: &[u8], end_marker: u8) -> u8 {
    let [lo, hi] = (payload.len() as u16).to_le_bytes();
    payload
        .iter()
        .fold(lo.wrapping_add(hi).wrapping_add(end_marker), |sum, b| sum.wrapping_add(*b))
}

fn push_escaped(out: &mut Vec<u8>, byte: u8) {
    if is_reserved(byte) {
        out.push(ESC);
        out.push(!byte);
    } else {
        out.push(byte);
    }
}

/// Build the wire bytes of one frame. Use [`encode_chunks`] for arbitrary
/// messages.
///
/// # Panics
///
/// If `payload` is longer than [`MAX_FRAME_PAYLOAD`].
pub fn encode(payload: &[u8], is_final: bool) -> Vec<u8> {
    assert!(
        payload.len() <= MAX_FRAME_PAYLOAD,
        "frame payload of {} bytes does not fit the length field",
        payload.len()
    );

    let end_marker = if is_final { ETX } else { ETB };
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 4 + 8);

    out.push(STX);
    for byte in (payload.len() as u16).to_le_bytes() {
        push_escaped(&mut out, byte);
    }
    for &byte in payload {
        push_escaped(&mut out, byte);
    }
    out.push(end_marker);
    push_escaped(&mut out, checksum(payload, end_marker));

    out
}

/// Split a logical message into frames of at most `chunk_size` payload
/// bytes. Only the last frame is final. An empty message is one empty frame.
pub fn encode_chunks(payload: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    let chunk_size = chunk_size.clamp(1, MAX_FRAME_PAYLOAD);
    if payload.is_empty() {
        return vec![encode(&[], true)];
    }

    let count = payload.len().div_ceil(chunk_size);
    payload
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| encode(chunk, i + 1 == count))
        .collect()
}

// ============================================================================
// Decoding
// ============================================================================

enum Unit {
    Byte(u8),
    End(u8),
}

struct Scanner<F> {
    next: F,
    reject: Option<Reject>,
}

impl<F> Scanner<F>
where
    F: FnMut() -> io::Result<u8>,
{
    fn flag(&mut self, reason: Reject) {
        if self.reject.is_none() {
            self.reject = Some(reason);
        }
    }

    /// One logical byte of length or payload, or an end marker that
    /// showed up where data was expected.
    fn unit(&mut self) -> io::Result<Unit> {
        let byte = (self.next)()?;
        if is_end_marker(byte) {
            return Ok(Unit::End(byte));
        }
        if byte != ESC {
            if is_reserved(byte) {
                warn!(byte, "unescaped control byte inside frame");
            }
            return Ok(Unit::Byte(byte));
        }

        let masked = (self.next)()?;
        if is_end_marker(masked) {
            return Ok(Unit::End(masked));
        }
        if !is_reserved(!masked) {
            self.flag(Reject::BadMask { byte: masked });
            return Ok(Unit::Byte(masked));
        }
        Ok(Unit::Byte(!masked))
    }

    /// The checksum must be escaped when it is a reserved value.
    fn checksum(&mut self) -> io::Result<u8> {
        let byte = (self.next)()?;
        if byte == ESC {
            let masked = (self.next)()?;
            if !is_reserved(!masked) {
                self.flag(Reject::BadMask { byte: masked });
            }
            return Ok(!masked);
        }
        if is_reserved(byte) {
            self.flag(Reject::UnescapedChecksum { byte });
        }
        Ok(byte)
    }
}

/// Read one frame, pulling bytes from `next`.
///
/// Bytes before the start marker are discarded. Damage inside the frame
/// comes back as [`Decoded::Rejected`] once the whole frame has been
/// consumed, so the line is ready for the resend. Errors from `next` are
/// returned unchanged.
pub fn decode_one<F>(next: F) -> io::Result<Decoded>
where
    F: FnMut() -> io::Result<u8>,
{
    let mut scan = Scanner { next, reject: None };

    let mut skipped = 0usize;
    while (scan.next)()? != STX {
        skipped += 1;
    }
    if skipped > 0 {
        warn!(skipped, "discarded bytes before start of frame");
    }

    let mut early_end = None;
    let mut length = [0u8; 2];
    for slot in length.iter_mut() {
        match scan.unit()? {
            Unit::Byte(b) => *slot = b,
            Unit::End(marker) => {
                early_end = Some(marker);
                break;
            }
        }
    }

    let expected = u16::from_le_bytes(length) as usize;
    let mut payload = Vec::new();
    if early_end.is_none() {
        payload.reserve(expected);
        while payload.len() < expected {
            match scan.unit()? {
                Unit::Byte(b) => payload.push(b),
                Unit::End(marker) => {
                    early_end = Some(marker);
                    break;
                }
            }
        }
    }

    let end_marker = match early_end {
        Some(marker) => {
            scan.flag(Reject::Truncated { marker });
            marker
        }
        None => {
            let byte = (scan.next)()?;
            if is_end_marker(byte) {
                byte
            } else {
                scan.flag(Reject::BadEndMarker { byte });
                loop {
                    let byte = (scan.next)()?;
                    if is_end_marker(byte) {
                        break byte;
                    }
                }
            }
        }
    };

    let sent = scan.checksum()?;

    if let Some(reason) = scan.reject {
        warn!(%reason, "rejecting frame");
        return Ok(Decoded::Rejected(reason));
    }

    let computed = checksum(&payload, end_marker);
    if sent != computed {
        warn!(sent, computed, "frame checksum mismatch");
        return Ok(Decoded::Rejected(Reject::Checksum { sent, computed }));
    }

    trace!(len = payload.len(), is_final = end_marker == ETX, "decoded frame");
    Ok(Decoded::Valid(Frame {
        payload,
        is_final: end_marker == ETX,
    }))
}
