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

//! Serial protocol engine for Konica Q-M and HP PhotoSmart cameras
//!
//! The layers, bottom up:
//!
//! - [`codec`] turns payloads into framed, escaped, checksummed bytes and back
//! - [`link`] runs the ENQ/ACK handshake that moves frames across the line
//! - [`command`] builds requests, checks replies and translates [`status`] words
//! - [`camera`] offers the camera operations on one open session

pub mod camera;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod layout;
pub mod link;
pub mod localization;
pub mod models;
pub mod protocol;
pub mod serial;
pub mod speed;
pub mod status;

pub use camera::Camera;
pub use config::{LineSettings, Timeouts};
pub use error::{Error, Result, Transmission};
pub use layout::IdWidth;
pub use serial::{RealSerialPort, SerialPort};
pub use speed::{BitRate, Speed};
pub use status::DeviceError;
