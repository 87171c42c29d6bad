// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use camino::Utf8Path;
use tinysync_device::{
    Bit, Device, DeviceError, DynamicDevice, InputPort, OutputPort, PinLayout,
    PinSnapshot,
};

/// Outputs fixed at construction.
struct Pins {
    uo_out: u8,
    uio_out: u8,
}

impl Device for Pins {
    fn pin(&mut self, _port: InputPort, _value: u8) {}

    fn read(&self, port: OutputPort) -> u8 {
        match port {
            OutputPort::Outputs => self.uo_out,
            OutputPort::Bidirectional => self.uio_out,
            OutputPort::OutputEnable => 0b1000_0000,
        }
    }

    fn eval(&mut self) {}
}

#[test]
fn bits_parse_from_port_notation() {
    assert_eq!(
        "uo_out[7]".parse::<Bit>().ok(),
        Some(Bit::new(OutputPort::Outputs, 7))
    );
    assert_eq!(
        " uio_oe[0] ".parse::<Bit>().ok(),
        Some(Bit::new(OutputPort::OutputEnable, 0))
    );
    for bad in ["uo_out", "uo_out[8]", "ui_in[0]", "uio_out[x]", "uo_out[1"] {
        assert!(bad.parse::<Bit>().is_err(), "{bad}");
    }
    assert_eq!(Bit::new(OutputPort::Bidirectional, 7).to_string(), "uio_out[7]");
}

#[test]
fn default_layout_decodes_tiny_vga() {
    // hsync, B0, G0, R0, vsync, B1, G1, R1
    let pins = Pins {
        uo_out: 0b1001_1001,
        uio_out: 0b1000_0001,
    };

    let snapshot = PinSnapshot::capture(&pins, &PinLayout::default());

    assert_eq!(
        snapshot,
        PinSnapshot {
            hsync: true,
            vsync: true,
            active: true,
            red: 0b11,
            green: 0b00,
            blue: 0b00,
            pwm: true,
        }
    );
    assert!(snapshot.has_color());
}

#[test]
fn channels_combine_high_and_low_bits() {
    let layout = PinLayout::default();
    let green_high = Pins {
        uo_out: 0b0000_0010,
        uio_out: 0,
    };
    let blue_low = Pins {
        uo_out: 0b0100_0000,
        uio_out: 0,
    };

    assert_eq!(PinSnapshot::capture(&green_high, &layout).green, 0b10);
    assert_eq!(PinSnapshot::capture(&blue_low, &layout).blue, 0b01);
    assert!(!PinSnapshot::capture(&Pins { uo_out: 0, uio_out: 0 }, &layout).has_color());
}

#[test]
fn missing_library_is_reported() {
    let result = DynamicDevice::load(
        Utf8Path::new("does/not/exist/libtt_um_vga.so"),
        "tt_um_vga",
    );
    assert!(matches!(result, Err(DeviceError::LoadLibrary { .. })));

    let result = DynamicDevice::load(Utf8Path::new("unused.so"), "bad name");
    assert!(matches!(result, Err(DeviceError::InvalidTopName { .. })));
}
