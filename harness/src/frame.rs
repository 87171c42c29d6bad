// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Capturing one visible frame as an image.

use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use snafu::{ResultExt, Whatever};
use tinysync_device::Device;

use crate::{
    artifacts::{ArtifactDirectory, eprintln_nocapture},
    error::CheckError,
    options::HarnessOptions,
    sequencer,
};

/// Scales a 2-bit color channel to 8 bits.
pub const CHANNEL_SCALE: u8 = 63;

/// An 8-bit RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Frame {
    /// A black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 3]; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels[self.index(x, y)]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let index = self.index(x, y);
        self.pixels[index] = rgb;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside a {}x{} frame",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    /// Encodes the frame as an 8-bit RGB PNG.
    pub fn encode_png(&self) -> Vec<u8> {
        let mut png = Vec::new();
        png.extend_from_slice(b"\x89PNG\r\n\x1a\n");

        let mut header = Vec::with_capacity(13);
        header.extend_from_slice(&self.width.to_be_bytes());
        header.extend_from_slice(&self.height.to_be_bytes());
        // 8-bit depth, truecolor, deflate, adaptive filtering, no interlace
        header.extend_from_slice(&[8, 2, 0, 0, 0]);
        write_chunk(&mut png, b"IHDR", &header);

        let mut scanlines =
            Vec::with_capacity((self.width as usize * 3 + 1) * self.height as usize);
        for row in self.pixels.chunks(self.width as usize) {
            scanlines.push(0);
            scanlines.extend(row.iter().flatten());
        }
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&scanlines, 6);
        write_chunk(&mut png, b"IDAT", &compressed);

        write_chunk(&mut png, b"IEND", &[]);
        png
    }
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(kind.iter().chain(data)).to_be_bytes());
}

fn crc32<'a>(bytes: impl Iterator<Item = &'a u8>) -> u32 {
    let mut crc = u32::MAX;
    for byte in bytes {
        crc ^= *byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

/// The file a frame captured with `config` is saved as.
pub fn frame_file_name(config: u8) -> String {
    format!("frame{:02}.png", config >> 2)
}

/// Starts the device with `config` and records its first frame.
///
/// The blank band is stepped through first, then every column of the active
/// lines is read. The cycles spent in startup fall on the first blank line. The sync pins are checked against the timing profile on
/// every cycle, so a frame is only returned if the device kept time while
/// drawing it.
pub fn capture_frame<D: Device>(
    device: D,
    config: u8,
    options: &HarnessOptions,
) -> Result<Frame, CheckError> {
    let timing = options.timing;
    let mut simulation = sequencer::start(device, config, options)?;
    let mut frame = Frame::new(timing.h_active, timing.v_active);

    if options.log {
        log::info!("Capturing frame for configuration {:#04x}", config);
    }

    while simulation.cycle_count() < timing.frame_cycles() {
        let cycle = simulation.cycle_count();
        simulation.cycle();
        let pins = simulation.snapshot();
        timing.check(cycle, &pins)?;

        let position = timing.position(cycle);
        if let Some(row) = timing.raster_row(position.line) {
            if position.column < timing.h_active {
                frame.set_pixel(
                    position.column,
                    row,
                    [
                        pins.red * CHANNEL_SCALE,
                        pins.green * CHANNEL_SCALE,
                        pins.blue * CHANNEL_SCALE,
                    ],
                );
            }
        }
    }

    Ok(frame)
}

/// Captures the frame for `config` and saves it under the artifact
/// directory. Returns where it was written.
pub fn dump_frame<D: Device>(
    device: D,
    config: u8,
    options: &HarnessOptions,
) -> Result<Utf8PathBuf, Whatever> {
    let name = frame_file_name(config);
    eprintln_nocapture!("{} {}", "   Capturing".bold().green(), name)?;

    let frame = capture_frame(device, config, options)
        .whatever_context(format!("Failed to capture {name}"))?;
    let directory = ArtifactDirectory::open(&options.artifact_directory)?;
    let path = directory.write(&name, &frame.encode_png())?;

    eprintln_nocapture!("{} {}", "     Written".bold().green(), path)?;
    Ok(path)
}
