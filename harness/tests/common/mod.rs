// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::env;

use camino::Utf8PathBuf;
use tinysync_device::{Device, InputPort, OutputPort};
use tinysync_harness::HarnessOptions;

/// Clock period at which one 22 us audio window is exactly 800 cycles.
pub const ALIGNED_PERIOD_PS: u64 = 27_500;

/// Cycles per period of the software device's PWM.
pub const PWM_PERIOD: u64 = 200;

/// Cycles per audio window at [`ALIGNED_PERIOD_PS`].
pub const WINDOW_CYCLES: u64 = 800;

/// Ways to break the software device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Hsync starts one column late.
    HsyncLate,
    /// The active flag covers all 800 visible columns.
    ActiveFullWidth,
    /// White is driven during blanking.
    ColorInBlank,
    /// The PWM duty cycle never changes.
    StuckAudio,
}

/// A software stand-in for the generator, built from free-running counters
/// the way the hardware is, rather than from the timing formulas.
pub struct ReferenceDevice {
    clk: bool,
    rst_n: bool,
    ena: bool,
    ui_in: u8,
    uio_in: u8,

    column: u32,
    line: u32,
    vsync: bool,
    ticks: u64,

    uo_out: u8,
    uio_out: u8,
    output_enable: u8,
    /// Clock edges out of reset before `uio_oe` is driven.
    output_enable_delay: u64,
    fault: Option<Fault>,
}

impl Default for ReferenceDevice {
    fn default() -> Self {
        Self {
            clk: false,
            rst_n: false,
            ena: false,
            ui_in: 0,
            uio_in: 0,
            column: 0,
            line: 0,
            vsync: false,
            ticks: 0,
            uo_out: 0,
            uio_out: 0,
            output_enable: 0b1000_0000,
            output_enable_delay: 0,
            fault: None,
        }
    }
}

impl ReferenceDevice {
    pub fn with_output_enable(output_enable: u8) -> Self {
        Self {
            output_enable,
            ..Default::default()
        }
    }

    /// Drives `uio_oe` only from the `delay`-th clock edge after reset.
    pub fn with_late_output_enable(delay: u64) -> Self {
        Self {
            output_enable_delay: delay,
            ..Default::default()
        }
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Default::default()
        }
    }

    /// The color drawn at a visible position.
    pub fn pattern(config: u8, column: u32, line: u32) -> [u8; 3] {
        let tint = (config >> 2) & 3;
        [
            ((column >> 4) as u8 & 3) ^ tint,
            (line >> 4) as u8 & 3,
            ((column ^ line) >> 6) as u8 & 3,
        ]
    }

    /// PWM high cycles per period during audio window `window`.
    pub fn level(&self, window: u64) -> u64 {
        if self.fault == Some(Fault::StuckAudio) {
            100
        } else {
            10 + (window * 37) % 180
        }
    }

    fn tick(&mut self) {
        if !self.rst_n {
            self.column = 0;
            self.line = 0;
            self.vsync = false;
            self.ticks = 0;
            self.uo_out = 0;
            self.uio_out = 0;
            return;
        }
        if !self.ena {
            return;
        }

        let (column, line) = (self.column, self.line);

        if column == 800 {
            self.vsync = matches!((line + 1) % 625, 1 | 2);
        }
        let hsync_start = if self.fault == Some(Fault::HsyncLate) {
            825
        } else {
            824
        };
        let hsync = column >= hsync_start && column < hsync_start + 72;
        let active_width = if self.fault == Some(Fault::ActiveFullWidth) {
            800
        } else {
            799
        };
        let active = line >= 25 && column < active_width;

        let [red, green, blue] = if active {
            Self::pattern(self.ui_in, column, line - 25)
        } else if self.fault == Some(Fault::ColorInBlank) {
            [3, 3, 3]
        } else {
            [0, 0, 0]
        };

        self.uo_out = (hsync as u8) << 7
            | (blue & 1) << 6
            | (green & 1) << 5
            | (red & 1) << 4
            | (self.vsync as u8) << 3
            | (blue >> 1) << 2
            | (green >> 1) << 1
            | red >> 1;

        let pwm = self.ticks % PWM_PERIOD < self.level(self.ticks / WINDOW_CYCLES);
        self.uio_out = (pwm as u8) << 7 | active as u8;

        self.ticks += 1;
        self.column += 1;
        if self.column == 1024 {
            self.column = 0;
            self.line = (self.line + 1) % 625;
        }
    }
}

impl Device for ReferenceDevice {
    fn pin(&mut self, port: InputPort, value: u8) {
        let bit = value & 1 == 1;
        match port {
            InputPort::Clock => {
                if bit && !self.clk {
                    self.clk = true;
                    self.tick();
                }
                self.clk = bit;
            }
            InputPort::ResetN => self.rst_n = bit,
            InputPort::Enable => self.ena = bit,
            InputPort::Config => self.ui_in = value,
            InputPort::Secondary => self.uio_in = value,
        }
    }

    fn read(&self, port: OutputPort) -> u8 {
        match port {
            OutputPort::Outputs => self.uo_out,
            OutputPort::Bidirectional => self.uio_out,
            OutputPort::OutputEnable if self.ticks >= self.output_enable_delay => {
                self.output_enable
            }
            OutputPort::OutputEnable => 0,
        }
    }

    fn eval(&mut self) {}
}

/// Options under which audio windows line up with PWM periods.
pub fn aligned_options() -> HarnessOptions {
    HarnessOptions {
        clock_period_ps: ALIGNED_PERIOD_PS,
        ..HarnessOptions::default()
    }
}

/// A scratch directory unique to this process and `name`.
pub fn scratch_directory(name: &str) -> Utf8PathBuf {
    let base = Utf8PathBuf::from_path_buf(env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("target"));
    base.join(format!("tinysync-{}-{}", name, std::process::id()))
}

pub fn init_logging() {
    if env::var("RUST_LOG").is_ok() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
