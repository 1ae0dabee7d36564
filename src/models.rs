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

//! Cameras known to speak this protocol

use crate::layout::IdWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    pub name: &'static str,
    pub ids: IdWidth,
}

pub const MODELS: [Model; 8] = [
    Model { name: "Konica Q-EZ", ids: IdWidth::Short },
    Model { name: "Konica Q-M100", ids: IdWidth::Short },
    Model { name: "Konica Q-M100V", ids: IdWidth::Short },
    Model { name: "Konica Q-M200", ids: IdWidth::Long },
    Model { name: "HP PhotoSmart", ids: IdWidth::Short },
    Model { name: "HP PhotoSmart C20", ids: IdWidth::Short },
    Model { name: "HP PhotoSmart C30", ids: IdWidth::Short },
    Model { name: "HP PhotoSmart C200", ids: IdWidth::Short },
];

/// Look a model up by name, ignoring case. The vendor prefix may be left
/// out, so "q-m200" finds the Konica Q-M200.
pub fn find(name: &str) -> Option<&'static Model> {
    let name = name.trim();
    MODELS.iter().find(|model| {
        model.name.eq_ignore_ascii_case(name)
            || model
                .name
                .split_once(' ')
                .is_some_and(|(_, short)| short.eq_ignore_ascii_case(name))
    })
}
