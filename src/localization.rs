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

//! Localization files
//!
//! A localization file is plain text holding the data as pairs of hex
//! digits. `#` starts a comment that runs to the end of the line, blanks
//! and line breaks are ignored.
//!
//! ```text
//! # German menu strings
//! 4D 65 6E FC
//! ```

use thiserror::Error;
use tracing::debug;

/// Largest localization image the cameras accept, exclusive.
pub const MAX_LEN: usize = 0x10000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("'{ch}' in line {line} is not allowed")]
    InvalidCharacter { ch: char, line: usize },

    #[error("localization file too long")]
    TooLong,

    #[error("dangling hex digit in line {line}")]
    OddDigits { line: usize },
}

/// Turn the text of a localization file into the bytes to upload.
pub fn parse(text: &str) -> Result<Vec<u8>, ParseError> {
    let mut data = Vec::new();
    let mut line = 1;
    let mut high: Option<u8> = None;
    let mut in_comment = false;

    for ch in text.chars() {
        if ch == '\n' {
            line += 1;
            in_comment = false;
            continue;
        }
        if in_comment {
            continue;
        }
        match ch {
            '#' => in_comment = true,
            ' ' | '\t' | '\r' => {}
            _ => {
                let nibble = ch
                    .to_digit(16)
                    .ok_or(ParseError::InvalidCharacter { ch, line })?
                    as u8;
                match high.take() {
                    None => high = Some(nibble),
                    Some(h) => {
                        if data.len() + 1 >= MAX_LEN {
                            return Err(ParseError::TooLong);
                        }
                        data.push(h << 4 | nibble);
                    }
                }
            }
        }
    }

    if high.is_some() {
        return Err(ParseError::OddDigits { line });
    }
    debug!(len = data.len(), lines = line, "localization file parsed");
    Ok(data)
}
