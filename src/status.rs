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

//! Translation of the two status bytes that follow the echoed opcode
//!
//! On the wire the status word is little-endian: reply byte 2 is the
//! subcode and reply byte 3 the group. Codes are written here as
//! `0xGGSS`, group first.

use thiserror::Error;

/// Non-success outcomes reported by the camera.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceError {
    #[error("focusing error")]
    FocusingError,
    #[error("iris error")]
    IrisError,
    #[error("strobe error")]
    StrobeError,
    #[error("EEPROM checksum error")]
    EepromChecksumError,
    #[error("internal error 1")]
    InternalError1,
    #[error("internal error 2")]
    InternalError2,
    #[error("no card present")]
    NoCardPresent,
    #[error("card not supported")]
    CardNotSupported,
    #[error("card removed during access")]
    CardRemovedDuringAccess,
    #[error("image number not valid")]
    ImageNumberNotValid,
    #[error("card can not be written")]
    CardCanNotBeWritten,
    #[error("card is write protected")]
    CardIsWriteProtected,
    #[error("no space left on card")]
    NoSpaceLeftOnCard,
    #[error("image protected")]
    ImageProtected,
    #[error("light too dark")]
    LightTooDark,
    #[error("autofocus error")]
    AutofocusError,
    #[error("system error")]
    SystemError,
    #[error("illegal parameter")]
    IllegalParameter,
    #[error("command can not be cancelled")]
    CommandCannotBeCancelled,
    #[error("localization data excess")]
    LocalizationDataExcess,
    #[error("localization data corrupt")]
    LocalizationDataCorrupt,
    #[error("unsupported command")]
    UnsupportedCommand,
    #[error("other command executing")]
    OtherCommandExecuting,
    #[error("command order error")]
    CommandOrderError,
    #[error("unknown error")]
    UnknownError,
    /// A code missing from the table. Both reply bytes are kept, in
    /// wire order, so the new condition can be reported upstream.
    #[error("undiscovered status (byte 1: 0x{first:02X}, byte 2: 0x{second:02X})")]
    Undiscovered { first: u8, second: u8 },
}

const SUCCESS: u16 = 0x0000;

const TABLE: &[(u16, DeviceError)] = &[
    (0x0101, DeviceError::FocusingError),
    (0x0102, DeviceError::IrisError),
    (0x0201, DeviceError::StrobeError),
    (0x0203, DeviceError::EepromChecksumError),
    (0x0205, DeviceError::InternalError1),
    (0x0206, DeviceError::InternalError2),
    (0x0301, DeviceError::NoCardPresent),
    (0x0311, DeviceError::CardNotSupported),
    (0x0321, DeviceError::CardRemovedDuringAccess),
    (0x0340, DeviceError::ImageNumberNotValid),
    (0x0341, DeviceError::CardCanNotBeWritten),
    (0x0381, DeviceError::CardIsWriteProtected),
    (0x0382, DeviceError::NoSpaceLeftOnCard),
    (0x0390, DeviceError::ImageProtected),
    (0x0401, DeviceError::LightTooDark),
    (0x0402, DeviceError::AutofocusError),
    (0x0501, DeviceError::SystemError),
    (0x0800, DeviceError::IllegalParameter),
    (0x0801, DeviceError::CommandCannotBeCancelled),
    (0x0b00, DeviceError::LocalizationDataExcess),
    (0x0bff, DeviceError::LocalizationDataCorrupt),
    (0x0c01, DeviceError::UnsupportedCommand),
    (0x0c02, DeviceError::OtherCommandExecuting),
    (0x0c03, DeviceError::CommandOrderError),
    (0x0fff, DeviceError::UnknownError),
];

/// Map the status bytes, in wire order, to success or a device error.
pub fn translate(first: u8, second: u8) -> Result<(), DeviceError> {
    let code = u16::from_le_bytes([first, second]);
    if code == SUCCESS {
        return Ok(());
    }
    match TABLE.iter().find(|(known, _)| *known == code) {
        Some((_, error)) => Err(*error),
        None => {
            tracing::warn!(
                first,
                second,
                "camera sent a status code that is not documented; please report it"
            );
            Err(DeviceError::Undiscovered { first, second })
        }
    }
}

impl DeviceError {
    /// The status word, group in the high byte.
    pub fn code(&self) -> u16 {
        match self {
            DeviceError::Undiscovered { first, second } => u16::from_le_bytes([*first, *second]),
            known => TABLE
                .iter()
                .find(|(_, error)| error == known)
                .map(|(code, _)| *code)
                .unwrap_or(SUCCESS),
        }
    }

    /// The two status bytes as they appear in a reply.
    pub fn wire_bytes(&self) -> [u8; 2] {
        self.code().to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert_eq!(translate(0x00, 0x00), Ok(()));
    }

    #[test]
    fn test_no_card_present() {
        // group 0x03, subcode 0x01
        assert_eq!(translate(0x01, 0x03), Err(DeviceError::NoCardPresent));
    }

    #[test]
    fn test_localization_codes() {
        assert_eq!(translate(0x00, 0x0b), Err(DeviceError::LocalizationDataExcess));
        assert_eq!(translate(0xff, 0x0b), Err(DeviceError::LocalizationDataCorrupt));
    }

    #[test]
    fn test_table_round_trip() {
        for (code, error) in TABLE {
            let [first, second] = code.to_le_bytes();
            assert_eq!(translate(first, second), Err(*error));
            assert_eq!(error.code(), *code);
        }
    }

    #[test]
    fn test_undiscovered_keeps_bytes() {
        assert_eq!(
            translate(0x07, 0x0a),
            Err(DeviceError::Undiscovered { first: 0x07, second: 0x0a })
        );
    }

    #[test]
    fn test_every_code_has_an_outcome() {
        for first in 0..=255u8 {
            for second in 0..=255u8 {
                match translate(first, second) {
                    Ok(()) => assert_eq!((first, second), (0, 0)),
                    Err(DeviceError::Undiscovered { first: f, second: s }) => {
                        assert_eq!((f, s), (first, second));
                    }
                    Err(known) => assert_eq!(known.wire_bytes(), [first, second]),
                }
            }
        }
    }
}
