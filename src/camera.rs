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

//! Camera operations on one open session

use std::fmt;
use tracing::{debug, info};

use crate::command::{self, Command, Request, DEVICE_CARD};
use crate::config::Timeouts;
use crate::error::{Error, Result, Transmission};
use crate::layout::{Field, IdWidth, Text};
use crate::link::Link;
use crate::serial::SerialPort;
use crate::speed::{BitFlags, BitRate, BitRates};
use crate::status::DeviceError;

// ============================================================================
// Field Layouts
// ============================================================================

const DEVICE: Field = Field::word(4);
const IMAGE_ID: Field = Field::image_id(6);
const PROTECT: Field = Field::byte(8).after_id();
const PREVIEW_THUMBNAIL: Field = Field::byte(4);

const INFO_ID: Field = Field::image_id(4);
const INFO_EXIF_SIZE: Field = Field::word(6).after_id();
const INFO_PROTECTED: Field = Field::byte(8).after_id();

const NOT_ERASED: Field = Field::word(4);
const CANCELLED: Field = Field::word(4);

const IO_RATES: Field = Field::word(4);
// overlaps IO_RATES by one byte
const IO_FLAGS: Field = Field::word(5);
const SET_IO_RATE: Field = Field::word(4);
const SET_IO_FLAGS: Field = Field::byte(6);

const MODEL: Text = Text::new(8, 4);
const SERIAL_NUMBER: Text = Text::new(12, 10);
const NAME: Text = Text::new(28, 22);
const MANUFACTURER: Text = Text::new(50, 30);

const PREF_SELECTOR: Field = Field::word(4);
const PREF_VALUE: Field = Field::word(6);

const LOCALE_KIND: Field = Field::word(4);
const LOCALE_VALUE: Field = Field::word(6);
const LOCALE_PACKET_SIZE: Field = Field::word(8);
const LOCALE_OFFSET: Field = Field::image_id(10);
const LOCALE_LAST: Field = Field::byte(14);
const LOCALE_HEADER_LEN: usize = 16;

const LOCALE_TV_FORMAT: u32 = 1;
const LOCALE_DATE_FORMAT: u32 = 2;

/// Payload bytes per localization packet
pub const LOCALIZATION_PACKET: usize = 1024;
/// Shorter uploads are refused before anything is sent
pub const LOCALIZATION_MIN: usize = 512;
/// Past this offset the camera is told each packet is the last
const LOCALIZATION_LAST_AFTER: usize = 65536;
/// Past this offset a camera that keeps accepting packets is broken
const LOCALIZATION_CAP: usize = 131072;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Thumbnail,
    Jpeg,
    Exif,
}

impl ImageKind {
    fn command(self) -> Command {
        match self {
            ImageKind::Thumbnail => Command::GetThumbnail,
            ImageKind::Jpeg => Command::GetJpeg,
            ImageKind::Exif => Command::GetExif,
        }
    }
}

/// What the camera knows about one stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: u32,
    pub exif_size: u16,
    pub protected: bool,
    /// Raw information block, empty when the camera sent none
    pub info: Vec<u8>,
}

impl ImageInfo {
    fn read(reply: &command::Reply, info: Vec<u8>) -> Result<Self> {
        Ok(ImageInfo {
            id: reply.get(INFO_ID)?,
            exif_size: reply.get(INFO_EXIF_SIZE)? as u16,
            protected: reply.flag(INFO_PROTECTED)?,
            info,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoCapability {
    pub bit_rates: BitRates,
    pub bit_flags: BitFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Information {
    pub model: String,
    pub serial_number: String,
    pub hardware: Version,
    pub software: Version,
    pub testing: Version,
    pub name: String,
    pub manufacturer: String,
}

/// Camera clock. The year is two digits, as the camera keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    fn read(reply: &command::Reply, offset: usize) -> Result<Self> {
        let at = |n: usize| -> Result<u8> { Ok(reply.get(Field::byte(offset + n))? as u8) };
        Ok(DateTime {
            year: at(0)?,
            month: at(1)?,
            day: at(2)?,
            hour: at(3)?,
            minute: at(4)?,
            second: at(5)?,
        })
    }

    fn bytes(&self) -> [u8; 6] {
        [self.year, self.month, self.day, self.hour, self.minute, self.second]
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerLevel {
    Low,
    Normal,
    High,
    Unknown(u8),
}

impl From<u8> for PowerLevel {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => PowerLevel::Low,
            0x01 => PowerLevel::Normal,
            0x02 => PowerLevel::High,
            other => PowerLevel::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    Battery,
    Ac,
    Unknown(u8),
}

impl From<u8> for PowerSource {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => PowerSource::Battery,
            0x01 => PowerSource::Ac,
            other => PowerSource::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Present,
    Absent,
    Unknown(u8),
}

impl From<u8> for CardStatus {
    fn from(raw: u8) -> Self {
        match raw {
            0x07 => CardStatus::Present,
            0x12 => CardStatus::Absent,
            other => CardStatus::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveDisplay {
    BuiltIn,
    Tv,
    Unknown(u8),
}

impl From<u8> for ActiveDisplay {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => ActiveDisplay::BuiltIn,
            0x02 => ActiveDisplay::Tv,
            other => ActiveDisplay::Unknown(other),
        }
    }
}

/// Everything the status query reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub self_test_result: u16,
    pub power_level: PowerLevel,
    pub power_source: PowerSource,
    pub card_status: CardStatus,
    pub display: ActiveDisplay,
    pub card_size: u16,
    pub pictures: u16,
    pub pictures_left: u16,
    pub date: DateTime,
    pub bit_rate: u16,
    pub bit_flags: u16,
    pub flash: u8,
    pub resolution: u8,
    pub focus: u8,
    pub exposure: u8,
    pub total_pictures: u16,
    pub total_strobes: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub shutoff_time: u8,
    pub self_timer_time: u8,
    pub beep: u8,
    pub slide_show_interval: u8,
}

/// Setting changed by [`Camera::set_preference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Resolution,
    Exposure,
    SelfTimerTime,
    SlideShowInterval,
    Flash,
    FocusSelfTimer,
    AutoOffTime,
    Beep,
}

impl Preference {
    pub fn selector(self) -> u16 {
        match self {
            Preference::Resolution => 0xc000,
            Preference::Exposure => 0xc002,
            Preference::SelfTimerTime => 0xc004,
            Preference::SlideShowInterval => 0xc006,
            Preference::Flash => 0xd000,
            Preference::FocusSelfTimer => 0xd002,
            Preference::AutoOffTime => 0xd004,
            Preference::Beep => 0xd006,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvOutputFormat {
    Ntsc,
    Pal,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    MonthDayYear,
    DayMonthYear,
    YearMonthDay,
}

// ============================================================================
// Camera
// ============================================================================

/// One session with a camera. Operations run one at a time; the session
/// must be initialized with [`Camera::init`] before the first of them.
pub struct Camera {
    link: Link,
    ids: IdWidth,
    timeouts: Timeouts,
}

impl Camera {
    pub fn new(port: Box<dyn SerialPort>, ids: IdWidth) -> Self {
        Camera {
            link: Link::new(port),
            ids,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    pub fn init(&mut self) -> Result<()> {
        self.link.init()
    }

    pub fn exit(&mut self) -> Result<()> {
        self.link.exit()
    }

    fn request(&self, command: Command) -> Request {
        Request::new(command, self.ids)
    }

    /// Refuse ids the camera's id width would truncate.
    fn checked_id(&self, id: u32) -> Result<u32> {
        if id > self.ids.max_id() {
            return Err(Error::BadParameter("image id does not fit the camera's id width"));
        }
        Ok(id)
    }

    fn control(&mut self, request: Request) -> Result<command::Reply> {
        command::execute(&mut self.link, &request, self.timeouts.control)
    }

    fn bulk(&mut self, request: Request, timeout: std::time::Duration) -> Result<(command::Reply, Vec<u8>)> {
        command::execute_bulk(&mut self.link, &request, timeout, self.timeouts.control)
    }

    // ------------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------------

    pub fn erase_image(&mut self, id: u32) -> Result<()> {
        let id = self.checked_id(id)?;
        let request = self.request(Command::EraseImage).with(DEVICE, DEVICE_CARD).with(IMAGE_ID, id);
        self.control(request)?;
        Ok(())
    }

    pub fn format_card(&mut self) -> Result<()> {
        let request = self.request(Command::FormatCard).with(DEVICE, DEVICE_CARD);
        self.control(request)?;
        Ok(())
    }

    /// Erase every unprotected image. Returns how many were left behind.
    pub fn erase_all(&mut self) -> Result<u16> {
        let request = self.request(Command::EraseAll).with(DEVICE, DEVICE_CARD);
        let reply = self.control(request)?;
        Ok(reply.get(NOT_ERASED)? as u16)
    }

    pub fn set_protect(&mut self, id: u32, protected: bool) -> Result<()> {
        let id = self.checked_id(id)?;
        let request = self
            .request(Command::SetProtect)
            .with(DEVICE, DEVICE_CARD)
            .with(IMAGE_ID, id)
            .with(PROTECT, protected as u32)
            .pad_to(self.ids.shift(10));
        self.control(request)?;
        Ok(())
    }

    /// Download an image, its thumbnail or its EXIF block.
    pub fn get_image(&mut self, id: u32, kind: ImageKind) -> Result<Vec<u8>> {
        let id = self.checked_id(id)?;
        let request = self.request(kind.command()).with(DEVICE, DEVICE_CARD).with(IMAGE_ID, id);
        let (_, data) = self.bulk(request, self.timeouts.image)?;
        debug!(id, ?kind, len = data.len(), "downloaded");
        Ok(data)
    }

    /// Look up the image stored at position `number` (1-based).
    pub fn get_image_info(&mut self, number: u32) -> Result<ImageInfo> {
        let number = self.checked_id(number)?;
        let request = self
            .request(Command::GetImageInfo)
            .with(DEVICE, DEVICE_CARD)
            .with(IMAGE_ID, number);
        let (reply, info) = self.bulk(request, self.timeouts.image_info)?;
        ImageInfo::read(&reply, info)
    }

    /// Grab what the sensor sees right now, as a thumbnail or full frame.
    pub fn get_preview(&mut self, thumbnail: bool) -> Result<Vec<u8>> {
        let request = self
            .request(Command::GetPreview)
            .with(PREVIEW_THUMBNAIL, thumbnail as u32)
            .pad_to(6);
        let (_, data) = self.bulk(request, self.timeouts.preview)?;
        Ok(data)
    }

    pub fn take_picture(&mut self) -> Result<ImageInfo> {
        let request = self.request(Command::TakePicture).with(DEVICE, DEVICE_CARD);
        let (reply, info) = self.bulk(request, self.timeouts.capture)?;
        let image = ImageInfo::read(&reply, info)?;
        info!(id = image.id, "picture taken");
        Ok(image)
    }

    // ------------------------------------------------------------------------
    // Device
    // ------------------------------------------------------------------------

    pub fn get_io_capability(&mut self) -> Result<IoCapability> {
        let reply = self.control(self.request(Command::GetIoCapability))?;
        Ok(IoCapability {
            bit_rates: BitRates(reply.get(IO_RATES)? as u16),
            bit_flags: BitFlags(reply.get(IO_FLAGS)? as u16),
        })
    }

    /// Only the low byte of `flags` is sent.
    pub fn set_io_capability(&mut self, rate: BitRate, flags: BitFlags) -> Result<()> {
        let request = self
            .request(Command::SetIoCapability)
            .with(SET_IO_RATE, rate.bit() as u32)
            .with(SET_IO_FLAGS, flags.0 as u32)
            .pad_to(8);
        self.control(request)?;
        Ok(())
    }

    pub fn get_information(&mut self) -> Result<Information> {
        let reply = self.control(self.request(Command::GetInformation))?;
        let version = |offset: usize| -> Result<Version> {
            Ok(Version {
                major: reply.get(Field::byte(offset))? as u8,
                minor: reply.get(Field::byte(offset + 1))? as u8,
            })
        };
        Ok(Information {
            model: reply.text(MODEL)?,
            serial_number: reply.text(SERIAL_NUMBER)?,
            hardware: version(22)?,
            software: version(24)?,
            testing: version(26)?,
            name: reply.text(NAME)?,
            manufacturer: reply.text(MANUFACTURER)?,
        })
    }

    pub fn get_status(&mut self) -> Result<Status> {
        let reply = self.control(self.request(Command::GetStatus).pad_to(6))?;
        let byte = |offset: usize| -> Result<u8> { Ok(reply.get(Field::byte(offset))? as u8) };
        let word = |offset: usize| -> Result<u16> { Ok(reply.get(Field::word(offset))? as u16) };
        Ok(Status {
            self_test_result: word(4)?,
            power_level: byte(6)?.into(),
            power_source: byte(7)?.into(),
            card_status: byte(8)?.into(),
            display: byte(9)?.into(),
            card_size: word(10)?,
            pictures: word(12)?,
            pictures_left: word(14)?,
            date: DateTime::read(&reply, 16)?,
            bit_rate: word(22)?,
            bit_flags: word(24)?,
            flash: byte(26)?,
            resolution: byte(27)?,
            focus: byte(28)?,
            exposure: byte(29)?,
            total_pictures: word(30)?,
            total_strobes: word(32)?,
        })
    }

    pub fn get_date_time(&mut self) -> Result<DateTime> {
        let reply = self.control(self.request(Command::GetDateTime))?;
        DateTime::read(&reply, 4)
    }

    pub fn set_date_time(&mut self, date: DateTime) -> Result<()> {
        let request = date
            .bytes()
            .iter()
            .enumerate()
            .fold(self.request(Command::SetDateTime), |request, (i, value)| {
                request.with(Field::byte(4 + i), *value as u32)
            });
        self.control(request)?;
        Ok(())
    }

    pub fn get_preferences(&mut self) -> Result<Preferences> {
        let reply = self.control(self.request(Command::GetPreferences))?;
        let byte = |offset: usize| -> Result<u8> { Ok(reply.get(Field::byte(offset))? as u8) };
        Ok(Preferences {
            shutoff_time: byte(4)?,
            self_timer_time: byte(5)?,
            beep: byte(6)?,
            slide_show_interval: byte(7)?,
        })
    }

    pub fn set_preference(&mut self, preference: Preference, value: u16) -> Result<()> {
        let request = self
            .request(Command::SetPreference)
            .with(PREF_SELECTOR, preference.selector() as u32)
            .with(PREF_VALUE, value as u32);
        self.control(request)?;
        Ok(())
    }

    pub fn reset_preferences(&mut self) -> Result<()> {
        self.control(self.request(Command::ResetPreferences))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Localization
    // ------------------------------------------------------------------------

    pub fn set_tv_output_format(&mut self, format: TvOutputFormat) -> Result<()> {
        let value = match format {
            TvOutputFormat::Ntsc => 0,
            TvOutputFormat::Pal => 1,
            TvOutputFormat::Hide => 2,
        };
        self.set_locale(LOCALE_TV_FORMAT, value)
    }

    pub fn set_date_format(&mut self, format: DateFormat) -> Result<()> {
        let value = match format {
            DateFormat::MonthDayYear => 0,
            DateFormat::DayMonthYear => 1,
            DateFormat::YearMonthDay => 2,
        };
        self.set_locale(LOCALE_DATE_FORMAT, value)
    }

    fn set_locale(&mut self, kind: u32, value: u32) -> Result<()> {
        let request = self
            .request(Command::Localization)
            .with(LOCALE_KIND, kind)
            .with(LOCALE_VALUE, value);
        self.control(request)?;
        Ok(())
    }

    /// Upload a localization image in fixed-size packets.
    ///
    /// The camera ends the upload by answering "localization data excess";
    /// that answer is success here.
    pub fn put_localization_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < LOCALIZATION_MIN {
            return Err(Error::BadParameter("localization data must be at least 512 bytes"));
        }
        info!(len = data.len(), "uploading localization data");

        let mut offset = 0usize;
        let mut packets = 0u32;
        loop {
            let mut packet = vec![0xFF; LOCALIZATION_PACKET];
            if offset < data.len() {
                let chunk = &data[offset..data.len().min(offset + LOCALIZATION_PACKET)];
                packet[..chunk.len()].copy_from_slice(chunk);
            }
            let last = offset + LOCALIZATION_PACKET > LOCALIZATION_LAST_AFTER;

            let request = self
                .request(Command::Localization)
                .with(LOCALE_PACKET_SIZE, LOCALIZATION_PACKET as u32)
                .with_long(LOCALE_OFFSET, offset as u32)
                .with(LOCALE_LAST, last as u32)
                .pad_to(LOCALE_HEADER_LEN)
                .extend(&packet);

            packets += 1;
            match self.control(request) {
                Ok(_) => {}
                Err(Error::Device(DeviceError::LocalizationDataExcess)) => {
                    debug!(packets, "camera has all the localization data");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            if offset > LOCALIZATION_CAP {
                return Err(Transmission::Unterminated { packets }.into());
            }
            offset += LOCALIZATION_PACKET;
        }
    }

    // ------------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------------

    /// Abort whatever the camera is busy with. Returns the opcode of the
    /// command that was cancelled.
    pub fn cancel(&mut self) -> Result<u16> {
        let reply = self.control(self.request(Command::Cancel))?;
        Ok(reply.get(CANCELLED)? as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::reply_bytes;
    use crate::serial::Script;

    fn camera(script: Script, ids: IdWidth) -> Camera {
        Camera::new(Box::new(script.into_port()), ids)
    }

    fn exchange(script: Script, request: &[u8], reply: &[u8]) -> Script {
        script.host_sends(request).camera_sends(reply)
    }

    fn status_reply() -> Vec<u8> {
        let mut rest = vec![0u8; 30];
        rest[0..2].copy_from_slice(&[0x01, 0x00]); // self test
        rest[2] = 0x02; // power level
        rest[3] = 0x01; // power source
        rest[4] = 0x07; // card
        rest[5] = 0x00; // display
        rest[6..8].copy_from_slice(&[0x00, 0x04]); // card size
        rest[8..10].copy_from_slice(&[0x0c, 0x00]); // pictures
        rest[10..12].copy_from_slice(&[0x2a, 0x00]); // pictures left
        rest[12..18].copy_from_slice(&[99, 12, 31, 23, 59, 58]);
        rest[18..20].copy_from_slice(&[0x20, 0x00]); // bit rate
        rest[20..22].copy_from_slice(&[0x01, 0x00]); // bit flags
        rest[22..26].copy_from_slice(&[1, 2, 3, 4]);
        rest[26..28].copy_from_slice(&[0x10, 0x27]); // total pictures
        rest[28..30].copy_from_slice(&[0xe8, 0x03]); // total strobes
        reply_bytes(Command::GetStatus, [0x00, 0x00], &rest)
    }

    #[test]
    fn test_get_status() {
        let script = exchange(Script::new(), &[0x20, 0x90, 0x00, 0x00, 0x00, 0x00], &status_reply());
        let status = camera(script, IdWidth::Short).get_status().unwrap();

        assert_eq!(status.self_test_result, 1);
        assert_eq!(status.power_level, PowerLevel::High);
        assert_eq!(status.power_source, PowerSource::Ac);
        assert_eq!(status.card_status, CardStatus::Present);
        assert_eq!(status.display, ActiveDisplay::BuiltIn);
        assert_eq!(status.card_size, 0x0400);
        assert_eq!(status.pictures, 12);
        assert_eq!(status.pictures_left, 42);
        assert_eq!(
            status.date,
            DateTime { year: 99, month: 12, day: 31, hour: 23, minute: 59, second: 58 }
        );
        assert_eq!(status.bit_rate, 0x0020);
        assert_eq!(status.bit_flags, 0x0001);
        assert_eq!((status.flash, status.resolution, status.focus, status.exposure), (1, 2, 3, 4));
        assert_eq!(status.total_pictures, 10000);
        assert_eq!(status.total_strobes, 1000);
    }

    #[test]
    fn test_get_status_no_card() {
        let reply = reply_bytes(Command::GetStatus, [0x01, 0x03], &[]);
        let script = exchange(Script::new(), &[0x20, 0x90, 0x00, 0x00, 0x00, 0x00], &reply);
        let err = camera(script, IdWidth::Short).get_status().unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::NoCardPresent)));
    }

    #[test]
    fn test_get_status_truncated() {
        let reply = reply_bytes(Command::GetStatus, [0x00, 0x00], &[0; 10]);
        let script = exchange(Script::new(), &[0x20, 0x90, 0x00, 0x00, 0x00, 0x00], &reply);
        let err = camera(script, IdWidth::Short).get_status().unwrap_err();
        assert!(matches!(err, Error::Transmission(Transmission::ShortReply { .. })));
    }

    #[test]
    fn test_erase_all_reports_leftovers() {
        let reply = reply_bytes(Command::EraseAll, [0x00, 0x00], &[0x02, 0x00]);
        let script = exchange(Script::new(), &[0x20, 0x80, 0x00, 0x00, 0x02, 0x00], &reply);
        assert_eq!(camera(script, IdWidth::Short).erase_all().unwrap(), 2);
    }

    #[test]
    fn test_erase_image_layouts() {
        let reply = reply_bytes(Command::EraseImage, [0, 0], &[]);

        let script = exchange(
            Script::new(),
            &[0x00, 0x80, 0x00, 0x00, 0x02, 0x00, 0x2a, 0x00],
            &reply,
        );
        camera(script, IdWidth::Short).erase_image(42).unwrap();

        let script = exchange(
            Script::new(),
            &[0x00, 0x80, 0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x2a, 0x00],
            &reply,
        );
        camera(script, IdWidth::Long).erase_image(0x0001_002a).unwrap();
    }

    #[test]
    fn test_wide_id_refused_on_short_camera() {
        let mut camera = camera(Script::new(), IdWidth::Short);
        assert!(matches!(camera.erase_image(0x0001_0005), Err(Error::BadParameter(_))));
        assert!(matches!(camera.set_protect(0x0001_0005, true), Err(Error::BadParameter(_))));
        assert!(matches!(
            camera.get_image(0x0001_0005, ImageKind::Jpeg),
            Err(Error::BadParameter(_))
        ));
        assert!(matches!(camera.get_image_info(0x0001_0000), Err(Error::BadParameter(_))));
    }

    #[test]
    fn test_format_card_without_card() {
        let script = exchange(
            Script::new(),
            &[0x10, 0x80, 0x00, 0x00, 0x02, 0x00],
            &reply_bytes(Command::FormatCard, [0x01, 0x03], &[]),
        );
        let err = camera(script, IdWidth::Short).format_card().unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::NoCardPresent)));
    }

    #[test]
    fn test_set_protect_layouts() {
        let reply = reply_bytes(Command::SetProtect, [0, 0], &[]);

        let script = exchange(
            Script::new(),
            &[0x30, 0x80, 0x00, 0x00, 0x02, 0x00, 0x07, 0x00, 0x01, 0x00],
            &reply,
        );
        camera(script, IdWidth::Short).set_protect(7, true).unwrap();

        let script = exchange(
            Script::new(),
            &[0x30, 0x80, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00],
            &reply,
        );
        camera(script, IdWidth::Long).set_protect(7, false).unwrap();
    }

    #[test]
    fn test_image_info_in_both_id_widths() {
        let info = vec![0xAA; 16];

        let reply = reply_bytes(Command::GetImageInfo, [0, 0], &[0x0a, 0x00, 0x34, 0x12, 0x01]);
        let script = Script::new()
            .host_sends(&[0x20, 0x88, 0x00, 0x00, 0x02, 0x00, 0x03, 0x00])
            .camera_sends(&info)
            .camera_sends(&reply);
        let short = camera(script, IdWidth::Short).get_image_info(3).unwrap();

        let reply = reply_bytes(
            Command::GetImageInfo,
            [0, 0],
            &[0x00, 0x00, 0x0a, 0x00, 0x34, 0x12, 0x01],
        );
        let script = Script::new()
            .host_sends(&[0x20, 0x88, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00])
            .camera_sends(&info)
            .camera_sends(&reply);
        let long = camera(script, IdWidth::Long).get_image_info(3).unwrap();

        let expected = ImageInfo { id: 10, exif_size: 0x1234, protected: true, info };
        assert_eq!(short, expected);
        assert_eq!(long, expected);
    }

    #[test]
    fn test_long_image_id_high_word() {
        let reply = reply_bytes(
            Command::GetImageInfo,
            [0, 0],
            &[0x02, 0x01, 0x04, 0x03, 0x00, 0x00, 0x00],
        );
        let script = exchange(
            Script::new(),
            &[0x20, 0x88, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00],
            &reply,
        );
        let image = camera(script, IdWidth::Long).get_image_info(1).unwrap();
        assert_eq!(image.id, 0x0102_0304);
        assert!(!image.protected);
        assert!(image.info.is_empty());
    }

    #[test]
    fn test_get_image_kinds() {
        let data = vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9];
        for (kind, command) in [
            (ImageKind::Thumbnail, Command::GetThumbnail),
            (ImageKind::Jpeg, Command::GetJpeg),
            (ImageKind::Exif, Command::GetExif),
        ] {
            let mut request = command.code().to_le_bytes().to_vec();
            request.extend_from_slice(&[0x00, 0x00, 0x02, 0x00, 0x05, 0x00]);
            let script = Script::new()
                .host_sends(&request)
                .camera_sends(&data)
                .camera_sends(&reply_bytes(command, [0, 0], &[]));
            assert_eq!(camera(script, IdWidth::Short).get_image(5, kind).unwrap(), data);
        }
    }

    #[test]
    fn test_get_preview() {
        let data = vec![0x10; 40];
        let script = Script::new()
            .host_sends(&[0x40, 0x88, 0x00, 0x00, 0x01, 0x00])
            .camera_sends(&data)
            .camera_sends(&reply_bytes(Command::GetPreview, [0, 0], &[]));
        assert_eq!(camera(script, IdWidth::Short).get_preview(true).unwrap(), data);
    }

    #[test]
    fn test_take_picture() {
        let reply = reply_bytes(Command::TakePicture, [0, 0], &[0x15, 0x00, 0x00, 0x10, 0x00]);
        let script = Script::new()
            .host_sends(&[0x00, 0x91, 0x00, 0x00, 0x02, 0x00])
            .camera_sends(&[0x55; 8])
            .camera_sends(&reply);
        let image = camera(script, IdWidth::Short).take_picture().unwrap();
        assert_eq!(image.id, 0x15);
        assert_eq!(image.exif_size, 0x1000);
        assert_eq!(image.info, vec![0x55; 8]);
    }

    #[test]
    fn test_take_picture_light_too_dark() {
        let reply = reply_bytes(Command::TakePicture, [0x01, 0x04], &[]);
        let script = exchange(Script::new(), &[0x00, 0x91, 0x00, 0x00, 0x02, 0x00], &reply);
        let err = camera(script, IdWidth::Short).take_picture().unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::LightTooDark)));
    }

    #[test]
    fn test_get_io_capability_reads_overlapping_flags() {
        let reply = reply_bytes(Command::GetIoCapability, [0, 0], &[0xE0, 0x03, 0x1F, 0x00]);
        let script = exchange(Script::new(), &[0x00, 0x90, 0x00, 0x00], &reply);
        let caps = camera(script, IdWidth::Short).get_io_capability().unwrap();
        assert_eq!(caps.bit_rates, BitRates(0x03E0));
        assert_eq!(caps.bit_flags, BitFlags(0x1F03));
    }

    #[test]
    fn test_get_information() {
        let mut rest = vec![0u8; 76];
        rest[4..8].copy_from_slice(b"Q-M1");
        rest[8..14].copy_from_slice(b"123456");
        rest[18..24].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        rest[24..30].copy_from_slice(b"Konica");
        rest[46..56].copy_from_slice(b"Konica Co.");
        let reply = reply_bytes(Command::GetInformation, [0, 0], &rest);
        let script = exchange(Script::new(), &[0x10, 0x90, 0x00, 0x00], &reply);

        let info = camera(script, IdWidth::Short).get_information().unwrap();
        assert_eq!(info.model, "Q-M1");
        assert_eq!(info.serial_number, "123456");
        assert_eq!(info.hardware, Version { major: 1, minor: 2 });
        assert_eq!(info.software.to_string(), "3.4");
        assert_eq!(info.testing, Version { major: 5, minor: 6 });
        assert_eq!(info.name, "Konica");
        assert_eq!(info.manufacturer, "Konica Co.");
    }

    #[test]
    fn test_date_time_round_trip() {
        let date = DateTime { year: 26, month: 10, day: 15, hour: 9, minute: 30, second: 0 };
        let script = Script::new()
            .host_sends(&[0xb0, 0x90, 0x00, 0x00, 26, 10, 15, 9, 30, 0])
            .camera_sends(&reply_bytes(Command::SetDateTime, [0, 0], &[]))
            .host_sends(&[0x30, 0x90, 0x00, 0x00])
            .camera_sends(&reply_bytes(Command::GetDateTime, [0, 0], &[26, 10, 15, 9, 30, 0]));

        let mut camera = camera(script, IdWidth::Short);
        camera.set_date_time(date).unwrap();
        assert_eq!(camera.get_date_time().unwrap(), date);
    }

    #[test]
    fn test_preferences() {
        let script = Script::new()
            .host_sends(&[0x40, 0x90, 0x00, 0x00])
            .camera_sends(&reply_bytes(Command::GetPreferences, [0, 0], &[5, 10, 1, 3]))
            .host_sends(&[0xc0, 0x90, 0x00, 0x00, 0x06, 0xd0, 0x00, 0x00])
            .camera_sends(&reply_bytes(Command::SetPreference, [0, 0], &[]))
            .host_sends(&[0xc1, 0x90, 0x00, 0x00])
            .camera_sends(&reply_bytes(Command::ResetPreferences, [0, 0], &[]));

        let mut camera = camera(script, IdWidth::Short);
        assert_eq!(
            camera.get_preferences().unwrap(),
            Preferences { shutoff_time: 5, self_timer_time: 10, beep: 1, slide_show_interval: 3 }
        );
        camera.set_preference(Preference::Beep, 0).unwrap();
        camera.reset_preferences().unwrap();
    }

    #[test]
    fn test_locale_formats() {
        let script = Script::new()
            .host_sends(&[0x00, 0x92, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00])
            .camera_sends(&reply_bytes(Command::Localization, [0, 0], &[]))
            .host_sends(&[0x00, 0x92, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00])
            .camera_sends(&reply_bytes(Command::Localization, [0, 0], &[]));

        let mut camera = camera(script, IdWidth::Short);
        camera.set_tv_output_format(TvOutputFormat::Pal).unwrap();
        camera.set_date_format(DateFormat::YearMonthDay).unwrap();
    }

    fn localization_packet(data: &[u8], offset: usize, last: bool) -> Vec<u8> {
        let mut packet = vec![0x00, 0x92, 0, 0, 0, 0, 0, 0, 0x00, 0x04];
        packet.extend_from_slice(&[
            (offset >> 16) as u8,
            (offset >> 24) as u8,
            offset as u8,
            (offset >> 8) as u8,
            last as u8,
            0,
        ]);
        let start = offset.min(data.len());
        let end = (offset + 1024).min(data.len());
        packet.extend_from_slice(&data[start..end]);
        packet.resize(16 + 1024, 0xFF);
        packet
    }

    #[test]
    fn test_localization_stops_on_data_excess() {
        let data: Vec<u8> = (0..1500u32).map(|i| i as u8).collect();
        let script = Script::new()
            .host_sends(&localization_packet(&data, 0, false))
            .camera_sends(&reply_bytes(Command::Localization, [0, 0], &[]))
            .host_sends(&localization_packet(&data, 1024, false))
            .camera_sends(&reply_bytes(Command::Localization, [0x00, 0x0b], &[]));

        camera(script, IdWidth::Short).put_localization_data(&data).unwrap();
    }

    #[test]
    fn test_localization_corrupt_is_error() {
        let data = vec![0x20; 600];
        let script = Script::new()
            .host_sends(&localization_packet(&data, 0, false))
            .camera_sends(&reply_bytes(Command::Localization, [0xff, 0x0b], &[]));

        let err = camera(script, IdWidth::Short).put_localization_data(&data).unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::LocalizationDataCorrupt)));
    }

    #[test]
    fn test_localization_too_short() {
        let err = camera(Script::new(), IdWidth::Short)
            .put_localization_data(&[0u8; 511])
            .unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)));
    }

    #[test]
    fn test_localization_gives_up_on_endless_success() {
        let data = vec![0x42; 2048];
        let mut script = Script::new();
        let mut offset = 0;
        loop {
            script = script
                .host_sends(&localization_packet(&data, offset, offset + 1024 > 65536))
                .camera_sends(&reply_bytes(Command::Localization, [0, 0], &[]));
            if offset > 131072 {
                break;
            }
            offset += 1024;
        }

        let err = camera(script, IdWidth::Short).put_localization_data(&data).unwrap_err();
        assert!(matches!(
            err,
            Error::Transmission(Transmission::Unterminated { packets: 130 })
        ));
    }

    #[test]
    fn test_cancel_returns_cancelled_command() {
        let reply = reply_bytes(Command::Cancel, [0, 0], &[0x20, 0x90]);
        let script = exchange(Script::new(), &[0x00, 0x9e, 0x00, 0x00], &reply);
        let cancelled = camera(script, IdWidth::Short).cancel().unwrap();
        assert_eq!(cancelled, 0x9020);
        assert_eq!(Command::try_from(cancelled), Ok(Command::GetStatus));
    }
}
