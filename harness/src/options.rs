// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use snafu::{ResultExt, Whatever, whatever};
use tinysync_device::{Bit, PinLayout};

use crate::{sequencer::READY_AFTER_CYCLES, timing::VideoTiming};

/// Startup value of the output-enable register: only the audio pin drives.
pub const READY_OUTPUT_ENABLE: u8 = 0b1000_0000;

/// Optional configuration for the harness. Usually, you can just use
/// [`HarnessOptions::default()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOptions {
    /// Clock period in picoseconds. The default gives a 36 MHz clock.
    pub clock_period_ps: u64,

    /// The timing profile the device must follow.
    pub timing: VideoTiming,

    /// How many lines the sync scenario checks, starting at the first cycle
    /// after reset.
    pub video_lines: u32,

    /// Configuration byte the audio scenario starts the device with.
    pub audio_config: u8,

    /// Length of one audio sample window in picoseconds.
    pub sample_window_ps: u64,

    /// How many audio samples to capture.
    pub sample_count: usize,

    /// Value `uio_oe` must read once the device is out of reset.
    pub ready_output_enable: u8,

    /// Cycles after reset release at which `uio_oe` is checked. Checks of
    /// the sync pins start from there.
    pub ready_after_cycles: u64,

    /// Where captured frames are written.
    pub artifact_directory: Utf8PathBuf,

    /// Where observed signals live on the device's ports.
    pub layout: PinLayout,

    /// Whether to use the log crate.
    pub log: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            clock_period_ps: 27_778,
            timing: VideoTiming::SVGA_800X600_56,
            video_lines: 25 + 600 + 25,
            audio_config: 1,
            sample_window_ps: 22_000_000,
            sample_count: 200,
            ready_output_enable: READY_OUTPUT_ENABLE,
            ready_after_cycles: READY_AFTER_CYCLES,
            artifact_directory: "artifacts".into(),
            layout: PinLayout::default(),
            log: false,
        }
    }
}

impl HarnessOptions {
    /// The same as the [`Default`] implementation except that the log crate is
    /// used.
    pub fn default_logging() -> Self {
        Self {
            log: true,
            ..Default::default()
        }
    }

    /// Reads options from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Utf8Path) -> Result<Self, Whatever> {
        let contents = fs::read_to_string(path).whatever_context(format!(
            "Failed to read harness options at {path}"
        ))?;
        Self::from_toml_str(&contents)
            .whatever_context(format!("Invalid harness options at {path}"))
    }

    /// Parses options from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, Whatever> {
        let document: toml::Value = toml::from_str(contents)
            .whatever_context("Failed to parse harness options as valid TOML")?;
        let mut options = Self::default();

        if let Some(log) = document.get("log") {
            options.log = boolean(log, "log")?;
        }

        if let Some(clock) = document.get("clock") {
            if let Some(period) = clock.get("period_ps") {
                options.clock_period_ps = integer(period, "clock.period_ps")?;
                if options.clock_period_ps < 2 {
                    whatever!("clock.period_ps must be at least 2");
                }
            }
        }

        if let Some(video) = document.get("video") {
            if let Some(lines) = video.get("lines") {
                options.video_lines = integer(lines, "video.lines")?;
            }
        }

        if let Some(audio) = document.get("audio") {
            if let Some(config) = audio.get("config") {
                options.audio_config = integer(config, "audio.config")?;
            }
            if let Some(window) = audio.get("window_ps") {
                options.sample_window_ps = integer(window, "audio.window_ps")?;
                if options.sample_window_ps == 0 {
                    whatever!("audio.window_ps must be positive");
                }
            }
            if let Some(count) = audio.get("samples") {
                options.sample_count = integer(count, "audio.samples")?;
            }
        }

        if let Some(startup) = document.get("startup") {
            if let Some(value) = startup.get("output_enable") {
                options.ready_output_enable =
                    integer(value, "startup.output_enable")?;
            }
            if let Some(cycles) = startup.get("cycles") {
                options.ready_after_cycles = integer(cycles, "startup.cycles")?;
            }
        }

        if let Some(artifacts) = document.get("artifacts") {
            if let Some(directory) = artifacts.get("directory") {
                let Some(directory) = directory.as_str() else {
                    whatever!("artifacts.directory must be a string");
                };
                options.artifact_directory = directory.into();
            }
        }

        if let Some(layout) = document.get("layout") {
            let Some(layout) = layout.as_table() else {
                whatever!("layout must be a table");
            };
            for (signal, value) in layout {
                let Some(text) = value.as_str() else {
                    whatever!("layout.{} must be a string like \"uo_out[7]\"", signal);
                };
                let bit: Bit = text
                    .parse()
                    .whatever_context(format!("Invalid bit for layout.{signal}"))?;
                let target = &mut options.layout;
                match signal.as_str() {
                    "hsync" => target.hsync = bit,
                    "vsync" => target.vsync = bit,
                    "active" => target.active = bit,
                    "pwm" => target.pwm = bit,
                    "red_high" => target.red[0] = bit,
                    "red_low" => target.red[1] = bit,
                    "green_high" => target.green[0] = bit,
                    "green_low" => target.green[1] = bit,
                    "blue_high" => target.blue[0] = bit,
                    "blue_low" => target.blue[1] = bit,
                    other => {
                        whatever!("Unknown layout signal `{}`", other);
                    }
                }
            }
        }

        Ok(options)
    }
}

fn boolean(value: &toml::Value, key: &str) -> Result<bool, Whatever> {
    let Some(value) = value.as_bool() else {
        whatever!("{} must be a boolean", key);
    };
    Ok(value)
}

fn integer<T: TryFrom<i64>>(value: &toml::Value, key: &str) -> Result<T, Whatever> {
    let Some(integer) = value.as_integer() else {
        whatever!("{} must be an integer", key);
    };
    let Ok(value) = T::try_from(integer) else {
        whatever!("{} is out of range: {}", key, integer);
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use tinysync_device::OutputPort;

    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        assert_eq!(
            HarnessOptions::from_toml_str("").expect("valid options"),
            HarnessOptions::default()
        );
    }

    #[test]
    fn overrides_are_applied() {
        let options = HarnessOptions::from_toml_str(
            r#"
            log = true

            [clock]
            period_ps = 27500

            [audio]
            config = 3
            window_ps = 11000000
            samples = 16

            [startup]
            output_enable = 0
            cycles = 8

            [artifacts]
            directory = "out/frames"

            [layout]
            active = "uio_out[1]"
            pwm = "uo_out[0]"
            "#,
        )
        .expect("valid options");

        assert!(options.log);
        assert_eq!(options.clock_period_ps, 27_500);
        assert_eq!(options.audio_config, 3);
        assert_eq!(options.sample_window_ps, 11_000_000);
        assert_eq!(options.sample_count, 16);
        assert_eq!(options.ready_output_enable, 0);
        assert_eq!(options.ready_after_cycles, 8);
        assert_eq!(options.artifact_directory, "out/frames");
        assert_eq!(
            options.layout.active,
            Bit::new(OutputPort::Bidirectional, 1)
        );
        assert_eq!(options.layout.pwm, Bit::new(OutputPort::Outputs, 0));
        assert_eq!(options.layout.hsync, PinLayout::default().hsync);
    }

    #[test]
    fn bad_values_are_rejected() {
        for document in [
            "[audio]\nconfig = 256",
            "[audio]\nwindow_ps = 0",
            "[clock]\nperiod_ps = \"fast\"",
            "[layout]\nhsync = \"uo_out[8]\"",
            "[layout]\nsparkle = \"uo_out[1]\"",
            "log = 1",
        ] {
            assert!(
                HarnessOptions::from_toml_str(document).is_err(),
                "{document}"
            );
        }
    }
}
