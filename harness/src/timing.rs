// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The video timing oracle.
//!
//! [`VideoTiming::expected`] predicts the sync signals the device must drive
//! at any cycle after reset. It is a pure function of the cycle counter: the
//! line and column are recomputed from scratch every call, so there is no
//! counter state to drift out of step with the device.
//!
//! A frame starts with its vertical blank band (front porch, sync, back
//! porch) and ends with the active lines. Each line starts with its active
//! columns and ends with its horizontal blank (front porch, sync, back porch).

use std::{fmt, ops::Range};

use tinysync_device::PinSnapshot;

use crate::error::CheckError;

/// The three sync-related signals the device drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyncState {
    pub hsync: bool,
    pub vsync: bool,
    pub active: bool,
}

impl SyncState {
    /// The sync signals of a pin snapshot.
    pub fn observed(pins: &PinSnapshot) -> Self {
        Self {
            hsync: pins.hsync,
            vsync: pins.vsync,
            active: pins.active,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsync={} vsync={} active={}",
            self.hsync as u8, self.vsync as u8, self.active as u8
        )
    }
}

/// Where a cycle falls within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPosition {
    /// Cycle within the line.
    pub column: u32,
    /// Line within the frame, counting from the start of the blank band.
    pub line: u32,
}

/// A video timing profile, in clock cycles and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTiming {
    pub h_active: u32,
    pub h_front_porch: u32,
    pub h_sync: u32,
    pub h_back_porch: u32,
    pub v_active: u32,
    pub v_front_porch: u32,
    pub v_sync: u32,
    pub v_back_porch: u32,
    /// How many columns before the end of the active region the device
    /// already deasserts its active flag.
    pub active_trim: u32,
}

impl VideoTiming {
    /// SVGA 800x600 at 56 Hz with a 36 MHz pixel clock.
    pub const SVGA_800X600_56: VideoTiming = VideoTiming {
        h_active: 800,
        h_front_porch: 24,
        h_sync: 72,
        h_back_porch: 128,
        v_active: 600,
        v_front_porch: 1,
        v_sync: 2,
        v_back_porch: 22,
        active_trim: 1,
    };

    /// Cycles per line.
    pub const fn h_total(&self) -> u32 {
        self.h_active + self.h_front_porch + self.h_sync + self.h_back_porch
    }

    /// Lines in the vertical blank band.
    pub const fn v_blank(&self) -> u32 {
        self.v_front_porch + self.v_sync + self.v_back_porch
    }

    /// Lines per frame.
    pub const fn v_total(&self) -> u32 {
        self.v_blank() + self.v_active
    }

    /// Cycles per frame.
    pub const fn frame_cycles(&self) -> u64 {
        self.h_total() as u64 * self.v_total() as u64
    }

    /// Columns on which hsync is asserted.
    pub const fn hsync_columns(&self) -> Range<u32> {
        let start = self.h_active + self.h_front_porch;
        start..start + self.h_sync
    }

    /// Blank band lines on which vsync is asserted, for columns before the
    /// end of the active region. From that column on, vsync already follows
    /// the next line.
    pub const fn vsync_lines(&self) -> Range<u32> {
        self.v_front_porch..self.v_front_porch + self.v_sync
    }

    pub fn position(&self, cycle: u64) -> TimingPosition {
        let h_total = self.h_total() as u64;
        TimingPosition {
            column: (cycle % h_total) as u32,
            line: ((cycle / h_total) % self.v_total() as u64) as u32,
        }
    }

    /// Whether `line` is one of the active lines.
    pub fn is_active_line(&self, line: u32) -> bool {
        line >= self.v_blank()
    }

    /// The row of the raster drawn on `line`, if any.
    pub fn raster_row(&self, line: u32) -> Option<u32> {
        self.is_active_line(line).then(|| line - self.v_blank())
    }

    /// The sync signals the device must drive at `cycle`.
    pub fn expected(&self, cycle: u64) -> SyncState {
        let TimingPosition { column, line } = self.position(cycle);

        let hsync = self.hsync_columns().contains(&column);

        let vsync_line = if column >= self.h_active {
            (line + 1) % self.v_total()
        } else {
            line
        };
        let vsync = self.vsync_lines().contains(&vsync_line);

        let active = self.is_active_line(line)
            && column < self.h_active - self.active_trim;

        SyncState {
            hsync,
            vsync,
            active,
        }
    }

    /// Checks the device's pins at `cycle` against [`VideoTiming::expected`].
    /// Color must be dark wherever the active flag is low.
    pub fn check(&self, cycle: u64, pins: &PinSnapshot) -> Result<(), CheckError> {
        let expected = self.expected(cycle);
        let actual = SyncState::observed(pins);
        let TimingPosition { column, line } = self.position(cycle);

        if expected != actual {
            return Err(CheckError::Timing {
                cycle,
                line,
                column,
                expected,
                actual,
            });
        }

        if !expected.active && pins.has_color() {
            return Err(CheckError::StrayColor {
                cycle,
                line,
                column,
                red: pins.red,
                green: pins.green,
                blue: pins.blue,
            });
        }

        Ok(())
    }
}

impl Default for VideoTiming {
    fn default() -> Self {
        Self::SVGA_800X600_56
    }
}
