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

//! Fixed-offset fields of requests and replies
//!
//! Offsets are given for the short ID layout. Fields behind an image id
//! move two bytes further on cameras with long ids.

use crate::error::{Result, Transmission};

/// How a camera family encodes image ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IdWidth {
    /// 16-bit ids, little-endian
    #[default]
    Short,
    /// 32-bit ids, high word first, each word little-endian
    Long,
}

impl IdWidth {
    /// Bytes an image id occupies.
    pub fn id_len(self) -> usize {
        match self {
            IdWidth::Short => 2,
            IdWidth::Long => 4,
        }
    }

    /// Largest image id this width can carry.
    pub fn max_id(self) -> u32 {
        match self {
            IdWidth::Short => u16::MAX as u32,
            IdWidth::Long => u32::MAX,
        }
    }

    /// Offset of a field that follows an image id.
    pub fn shift(self, offset: usize) -> usize {
        offset + self.id_len() - 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    /// 16 bits, little-endian
    Word,
    ImageId,
}

/// One field at a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    offset: usize,
    width: Width,
    after_id: bool,
}

impl Field {
    pub const fn byte(offset: usize) -> Self {
        Field { offset, width: Width::Byte, after_id: false }
    }

    pub const fn word(offset: usize) -> Self {
        Field { offset, width: Width::Word, after_id: false }
    }

    pub const fn image_id(offset: usize) -> Self {
        Field { offset, width: Width::ImageId, after_id: false }
    }

    /// The field sits behind an image id and moves with its width.
    pub const fn after_id(self) -> Self {
        Field { after_id: true, ..self }
    }

    pub fn offset(&self, ids: IdWidth) -> usize {
        if self.after_id { ids.shift(self.offset) } else { self.offset }
    }

    pub fn len(&self, ids: IdWidth) -> usize {
        match self.width {
            Width::Byte => 1,
            Width::Word => 2,
            Width::ImageId => ids.id_len(),
        }
    }

    /// First offset past this field.
    pub fn end(&self, ids: IdWidth) -> usize {
        self.offset(ids) + self.len(ids)
    }

    /// Store `value`, growing `buf` when it is too short.
    pub fn put(&self, buf: &mut Vec<u8>, ids: IdWidth, value: u32) {
        let at = self.offset(ids);
        if buf.len() < self.end(ids) {
            buf.resize(self.end(ids), 0);
        }
        match (self.width, ids) {
            (Width::Byte, _) => buf[at] = value as u8,
            (Width::Word, _) | (Width::ImageId, IdWidth::Short) => {
                buf[at..at + 2].copy_from_slice(&(value as u16).to_le_bytes());
            }
            (Width::ImageId, IdWidth::Long) => {
                buf[at..at + 4].copy_from_slice(&[
                    (value >> 16) as u8,
                    (value >> 24) as u8,
                    value as u8,
                    (value >> 8) as u8,
                ]);
            }
        }
    }

    pub fn get(&self, buf: &[u8], ids: IdWidth) -> Result<u32> {
        let at = self.offset(ids);
        let needed = self.end(ids);
        if buf.len() < needed {
            return Err(Transmission::ShortReply { len: buf.len(), needed }.into());
        }
        Ok(match (self.width, ids) {
            (Width::Byte, _) => buf[at] as u32,
            (Width::Word, _) | (Width::ImageId, IdWidth::Short) => {
                u16::from_le_bytes([buf[at], buf[at + 1]]) as u32
            }
            (Width::ImageId, IdWidth::Long) => {
                (buf[at] as u32) << 16
                    | (buf[at + 1] as u32) << 24
                    | buf[at + 2] as u32
                    | (buf[at + 3] as u32) << 8
            }
        })
    }
}

/// Fixed-length text field, NUL padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text {
    pub offset: usize,
    pub len: usize,
}

impl Text {
    pub const fn new(offset: usize, len: usize) -> Self {
        Text { offset, len }
    }

    pub fn get(&self, buf: &[u8]) -> Result<String> {
        let needed = self.offset + self.len;
        let raw = buf
            .get(self.offset..needed)
            .ok_or(Transmission::ShortReply { len: buf.len(), needed })?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_short_id_round_trip() {
        let id = Field::image_id(6);
        let mut buf = vec![0u8; 8];
        id.put(&mut buf, IdWidth::Short, 0x1234);
        assert_eq!(&buf[6..], &[0x34, 0x12]);
        assert_eq!(id.get(&buf, IdWidth::Short).unwrap(), 0x1234);
    }

    #[test]
    fn test_long_id_word_order() {
        let id = Field::image_id(6);
        let mut buf = vec![0u8; 6];
        id.put(&mut buf, IdWidth::Long, 0x1122_3344);
        assert_eq!(&buf[6..], &[0x22, 0x11, 0x44, 0x33]);
        assert_eq!(id.get(&buf, IdWidth::Long).unwrap(), 0x1122_3344);
    }

    #[test]
    fn test_max_id() {
        assert_eq!(IdWidth::Short.max_id(), 0xFFFF);
        assert_eq!(IdWidth::Long.max_id(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_after_id_shift() {
        let flag = Field::byte(8).after_id();
        assert_eq!(flag.offset(IdWidth::Short), 8);
        assert_eq!(flag.offset(IdWidth::Long), 10);
        assert_eq!(Field::word(4).offset(IdWidth::Long), 4);
    }

    #[test]
    fn test_put_grows_buffer() {
        let mut buf = vec![0x30, 0x80];
        Field::word(4).put(&mut buf, IdWidth::Short, 0x0002);
        assert_eq!(buf, vec![0x30, 0x80, 0x00, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn test_get_short_buffer() {
        let err = Field::word(4).get(&[0; 5], IdWidth::Short).unwrap_err();
        assert!(matches!(
            err,
            Error::Transmission(Transmission::ShortReply { len: 5, needed: 6 })
        ));
    }

    #[test]
    fn test_text_trims_padding() {
        let mut buf = b"\0\0\0\0Q-M100".to_vec();
        buf.extend_from_slice(&[0, 0, 0]);
        assert_eq!(Text::new(4, 9).get(&buf).unwrap(), "Q-M100");
        assert!(Text::new(4, 20).get(&buf).is_err());
    }
}
