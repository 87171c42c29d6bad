// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The boundary between the harness and the simulated device.
//!
//! The device is a black box with the Tiny Tapeout pin interface: a clock, an
//! active-low reset, an enable line, two input bytes, and three output bytes.
//! Anything that can drive those inputs and report those outputs after an
//! evaluation step implements [`Device`]. [`DynamicDevice`] is such an
//! implementation backed by a verilated model compiled to a shared library.

use std::{fmt, str::FromStr};

use snafu::Snafu;

pub mod dynamic;

pub use dynamic::{DeviceError, DynamicDevice};

/// Input ports of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPort {
    Clock,
    ResetN,
    Enable,
    /// The configuration byte.
    Config,
    /// The secondary input byte, held at zero by the harness.
    Secondary,
}

impl InputPort {
    pub const ALL: [InputPort; 5] = [
        InputPort::Clock,
        InputPort::ResetN,
        InputPort::Enable,
        InputPort::Config,
        InputPort::Secondary,
    ];

    /// The HDL-level port name.
    pub fn name(&self) -> &'static str {
        match self {
            InputPort::Clock => "clk",
            InputPort::ResetN => "rst_n",
            InputPort::Enable => "ena",
            InputPort::Config => "ui_in",
            InputPort::Secondary => "uio_in",
        }
    }
}

/// Output ports of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPort {
    /// The dedicated output byte.
    Outputs,
    /// The bidirectional byte, read as outputs.
    Bidirectional,
    /// The output-enable register for the bidirectional byte.
    OutputEnable,
}

impl OutputPort {
    pub const ALL: [OutputPort; 3] = [
        OutputPort::Outputs,
        OutputPort::Bidirectional,
        OutputPort::OutputEnable,
    ];

    /// The HDL-level port name.
    pub fn name(&self) -> &'static str {
        match self {
            OutputPort::Outputs => "uo_out",
            OutputPort::Bidirectional => "uio_out",
            OutputPort::OutputEnable => "uio_oe",
        }
    }
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// Cycle-level access to the device under test.
///
/// Writes take effect on the next [`Device::eval`]; reads return the values
/// computed by the most recent one.
pub trait Device {
    /// Sets `port` to `value`. Single-bit ports use the low bit.
    fn pin(&mut self, port: InputPort, value: u8);

    /// Returns the current value of `port`.
    fn read(&self, port: OutputPort) -> u8;

    /// Settles the device after its inputs changed.
    fn eval(&mut self);
}

impl<D: Device + ?Sized> Device for &mut D {
    fn pin(&mut self, port: InputPort, value: u8) {
        (**self).pin(port, value);
    }

    fn read(&self, port: OutputPort) -> u8 {
        (**self).read(port)
    }

    fn eval(&mut self) {
        (**self).eval();
    }
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn pin(&mut self, port: InputPort, value: u8) {
        (**self).pin(port, value);
    }

    fn read(&self, port: OutputPort) -> u8 {
        (**self).read(port)
    }

    fn eval(&mut self) {
        (**self).eval();
    }
}

/// A single bit of an output port, written `uo_out[7]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bit {
    pub port: OutputPort,
    pub index: u8,
}

impl Bit {
    pub const fn new(port: OutputPort, index: u8) -> Self {
        Self { port, index }
    }

    /// Extracts this bit from the device's current outputs.
    pub fn sample<D: Device + ?Sized>(&self, device: &D) -> bool {
        (device.read(self.port) >> self.index) & 1 == 1
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.port, self.index)
    }
}

/// Failure to parse a [`Bit`].
#[derive(Debug, Snafu)]
#[snafu(display(
    "`{text}` is not an output bit: expected `uo_out[N]`, `uio_out[N]`, or `uio_oe[N]` with N in 0..8"
))]
pub struct ParseBitError {
    text: String,
}

impl FromStr for Bit {
    type Err = ParseBitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseBitError {
            text: s.to_string(),
        };

        let (name, rest) = s.trim().split_once('[').ok_or_else(error)?;
        let index = rest
            .strip_suffix(']')
            .and_then(|index| index.parse::<u8>().ok())
            .filter(|index| *index < 8)
            .ok_or_else(error)?;
        let port = OutputPort::ALL
            .into_iter()
            .find(|port| port.name() == name)
            .ok_or_else(error)?;

        Ok(Bit::new(port, index))
    }
}

/// Where each observed signal lives on the output ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinLayout {
    pub hsync: Bit,
    pub vsync: Bit,
    pub active: Bit,
    /// `[high, low]`
    pub red: [Bit; 2],
    /// `[high, low]`
    pub green: [Bit; 2],
    /// `[high, low]`
    pub blue: [Bit; 2],
    pub pwm: Bit,
}

impl Default for PinLayout {
    /// The TinyVGA Pmod pinout on `uo_out`, the audio line on `uio_out[7]`,
    /// and the active flag on `uio_out[0]`.
    fn default() -> Self {
        use OutputPort::{Bidirectional, Outputs};
        Self {
            hsync: Bit::new(Outputs, 7),
            vsync: Bit::new(Outputs, 3),
            active: Bit::new(Bidirectional, 0),
            red: [Bit::new(Outputs, 0), Bit::new(Outputs, 4)],
            green: [Bit::new(Outputs, 1), Bit::new(Outputs, 5)],
            blue: [Bit::new(Outputs, 2), Bit::new(Outputs, 6)],
            pwm: Bit::new(Bidirectional, 7),
        }
    }
}

/// The observable signals of the device at one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PinSnapshot {
    pub hsync: bool,
    pub vsync: bool,
    pub active: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub pwm: bool,
}

impl PinSnapshot {
    /// Reads every signal named by `layout` from `device`.
    pub fn capture<D: Device + ?Sized>(device: &D, layout: &PinLayout) -> Self {
        let channel = |[high, low]: [Bit; 2]| {
            ((high.sample(device) as u8) << 1) | low.sample(device) as u8
        };

        Self {
            hsync: layout.hsync.sample(device),
            vsync: layout.vsync.sample(device),
            active: layout.active.sample(device),
            red: channel(layout.red),
            green: channel(layout.green),
            blue: channel(layout.blue),
            pwm: layout.pwm.sample(device),
        }
    }

    /// Whether any color channel is lit.
    pub fn has_color(&self) -> bool {
        self.red != 0 || self.green != 0 || self.blue != 0
    }
}
