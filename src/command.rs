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

//! Opcodes, request building and the command/reply exchange
//!
//! Every request starts with its opcode (little-endian) and two reserved
//! bytes. Every control reply starts with the same opcode followed by the
//! status word.

use std::time::Duration;
use tracing::debug;

use crate::error::{Result, Transmission};
use crate::layout::{Field, IdWidth, Text};
use crate::link::Link;
use crate::status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    EraseImage = 0x8000,
    FormatCard = 0x8010,
    EraseAll = 0x8020,
    SetProtect = 0x8030,
    GetThumbnail = 0x8800,
    GetJpeg = 0x8810,
    GetImageInfo = 0x8820,
    GetExif = 0x8830,
    GetPreview = 0x8840,
    GetIoCapability = 0x9000,
    GetInformation = 0x9010,
    GetStatus = 0x9020,
    GetDateTime = 0x9030,
    GetPreferences = 0x9040,
    SetIoCapability = 0x9080,
    SetDateTime = 0x90b0,
    SetPreference = 0x90c0,
    ResetPreferences = 0x90c1,
    TakePicture = 0x9100,
    Localization = 0x9200,
    Cancel = 0x9e00,
}

const ALL: [Command; 21] = [
    Command::EraseImage,
    Command::FormatCard,
    Command::EraseAll,
    Command::SetProtect,
    Command::GetThumbnail,
    Command::GetJpeg,
    Command::GetImageInfo,
    Command::GetExif,
    Command::GetPreview,
    Command::GetIoCapability,
    Command::GetInformation,
    Command::GetStatus,
    Command::GetDateTime,
    Command::GetPreferences,
    Command::SetIoCapability,
    Command::SetDateTime,
    Command::SetPreference,
    Command::ResetPreferences,
    Command::TakePicture,
    Command::Localization,
    Command::Cancel,
];

impl Command {
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for Command {
    type Error = u16;

    fn try_from(code: u16) -> std::result::Result<Self, u16> {
        ALL.iter().copied().find(|c| c.code() == code).ok_or(code)
    }
}

/// Device selector most image commands carry at offset 4
pub const DEVICE_CARD: u32 = 0x0002;

/// Status word position in every control reply
const STATUS: usize = 2;
const HEADER_LEN: usize = 4;

// ============================================================================
// Request
// ============================================================================

/// A request under construction. Fields are placed at their fixed offsets;
/// gaps stay zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: Command,
    ids: IdWidth,
    bytes: Vec<u8>,
}

impl Request {
    pub fn new(command: Command, ids: IdWidth) -> Self {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[..2].copy_from_slice(&command.code().to_le_bytes());
        Request { command, ids, bytes }
    }

    pub fn with(mut self, field: Field, value: u32) -> Self {
        field.put(&mut self.bytes, self.ids, value);
        self
    }

    /// Like [`Request::with`], but always in the long layout, whatever the
    /// camera's id width.
    pub fn with_long(mut self, field: Field, value: u32) -> Self {
        field.put(&mut self.bytes, IdWidth::Long, value);
        self
    }

    /// Zero-fill up to `len` bytes.
    pub fn pad_to(mut self, len: usize) -> Self {
        if self.bytes.len() < len {
            self.bytes.resize(len, 0);
        }
        self
    }

    pub fn extend(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A control reply that echoed the right opcode and reported success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    ids: IdWidth,
    bytes: Vec<u8>,
}

impl Reply {
    pub fn get(&self, field: Field) -> Result<u32> {
        field.get(&self.bytes, self.ids)
    }

    pub fn flag(&self, field: Field) -> Result<bool> {
        Ok(self.get(field)? != 0)
    }

    pub fn text(&self, text: Text) -> Result<String> {
        text.get(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn echoes(message: &[u8], command: Command) -> bool {
    message.len() >= 2 && message[..2] == command.code().to_le_bytes()
}

/// Check the echoed opcode and the status word of a control reply.
pub fn check_reply(command: Command, ids: IdWidth, bytes: Vec<u8>) -> Result<Reply> {
    if bytes.len() < HEADER_LEN {
        return Err(Transmission::ShortReply { len: bytes.len(), needed: HEADER_LEN }.into());
    }
    let actual = u16::from_le_bytes([bytes[0], bytes[1]]);
    if actual != command.code() {
        return Err(Transmission::OpcodeMismatch { expected: command.code(), actual }.into());
    }
    status::translate(bytes[STATUS], bytes[STATUS + 1])?;
    Ok(Reply { ids, bytes })
}

// ============================================================================
// Exchange
// ============================================================================

/// Send `request` and read its control reply, waiting up to `timeout`.
pub fn execute(link: &mut Link, request: &Request, timeout: Duration) -> Result<Reply> {
    debug!(command = ?request.command, len = request.bytes.len(), "execute");
    link.send(request.as_bytes())?;
    let bytes = link.receive(timeout)?;
    check_reply(request.command, request.ids, bytes)
}

/// Send `request` to a command that answers with bulk data before its
/// control reply.
///
/// The camera skips the data when the command fails, so a first message
/// that already echoes the opcode is taken as the control reply. Otherwise
/// it is the data, and the control reply follows within `control_timeout`.
pub fn execute_bulk(
    link: &mut Link,
    request: &Request,
    timeout: Duration,
    control_timeout: Duration,
) -> Result<(Reply, Vec<u8>)> {
    debug!(command = ?request.command, len = request.bytes.len(), "execute with data");
    link.send(request.as_bytes())?;

    let first = link.receive(timeout)?;
    if echoes(&first, request.command) {
        let reply = check_reply(request.command, request.ids, first)?;
        return Ok((reply, Vec::new()));
    }

    debug!(len = first.len(), "received data block");
    let control = link.receive(control_timeout)?;
    let reply = check_reply(request.command, request.ids, control)?;
    Ok((reply, first))
}

/// Control reply bytes as the camera would send them.
#[cfg(test)]
pub fn reply_bytes(command: Command, status: [u8; 2], rest: &[u8]) -> Vec<u8> {
    let mut bytes = command.code().to_le_bytes().to_vec();
    bytes.extend_from_slice(&status);
    bytes.extend_from_slice(rest);
    bytes
}
