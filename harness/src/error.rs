// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use snafu::Snafu;

use crate::timing::SyncState;

/// A verification failure. Every variant ends the scenario that raised it.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum CheckError {
    #[snafu(display(
        "Device did not start: uio_oe reads {actual:#010b} after reset, expected {expected:#010b}"
    ))]
    Startup { expected: u8, actual: u8 },

    #[snafu(display(
        "Sync mismatch at cycle {cycle} (line {line}, column {column}): expected {expected}, device drives {actual}"
    ))]
    Timing {
        cycle: u64,
        line: u32,
        column: u32,
        expected: SyncState,
        actual: SyncState,
    },

    #[snafu(display(
        "Color outside the active region at cycle {cycle} (line {line}, column {column}): rgb = ({red}, {green}, {blue})"
    ))]
    StrayColor {
        cycle: u64,
        line: u32,
        column: u32,
        red: u8,
        green: u8,
        blue: u8,
    },

    #[snafu(display(
        "Audio flatlined: samples {} through {index} all equal {value}",
        index - 2
    ))]
    Flatline { index: usize, value: u16 },

    #[snafu(display(
        "Audio sample {index} is {actual}, golden vector has {expected}"
    ))]
    Golden {
        index: usize,
        expected: u16,
        actual: u16,
    },

    #[snafu(display(
        "Captured {actual} audio samples, golden vector has {expected}"
    ))]
    GoldenLength { expected: usize, actual: usize },
}
