// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks. Each scenario takes its own device, so a failure in one
//! never keeps the others from running.

use camino::Utf8Path;
use snafu::{ResultExt, Whatever};
use tinysync_device::Device;

use crate::{
    error::CheckError,
    golden::{GoldenOutcome, GoldenSamples},
    options::HarnessOptions,
    pwm::PwmSampler,
    sequencer,
};

/// What a successful sync run observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub cycles: u64,
    /// Rising edges of hsync.
    pub hsync_pulses: u64,
    /// Rising edges of vsync.
    pub vsync_pulses: u64,
    /// Cycles with the active flag high.
    pub active_cycles: u64,
}

/// Starts the device with `config` and checks its sync pins against the
/// timing profile on every cycle of [`HarnessOptions::video_lines`] lines
/// that follows startup.
pub fn run_sync<D: Device>(
    device: D,
    config: u8,
    options: &HarnessOptions,
) -> Result<SyncReport, CheckError> {
    let timing = options.timing;
    let mut simulation = sequencer::start(device, config, options)?;
    let cycles = options.video_lines as u64 * timing.h_total() as u64;

    if options.log {
        log::info!(
            "Checking {} lines ({} cycles) of sync with configuration {:#04x}",
            options.video_lines,
            cycles,
            config
        );
    }

    let mut report = SyncReport {
        cycles,
        ..Default::default()
    };
    let mut previous = simulation.snapshot();
    while simulation.cycle_count() < cycles {
        let cycle = simulation.cycle_count();
        simulation.cycle();
        let pins = simulation.snapshot();
        timing.check(cycle, &pins)?;

        report.hsync_pulses += (pins.hsync && !previous.hsync) as u64;
        report.vsync_pulses += (pins.vsync && !previous.vsync) as u64;
        report.active_cycles += pins.active as u64;
        previous = pins;
    }

    Ok(report)
}

/// Starts the device with [`HarnessOptions::audio_config`] and demodulates
/// its PWM output until [`HarnessOptions::sample_count`] samples exist.
pub fn run_audio<D: Device>(
    device: D,
    options: &HarnessOptions,
) -> Result<Vec<u16>, CheckError> {
    let mut simulation =
        sequencer::start(device, options.audio_config, options)?;
    let mut sampler = PwmSampler::new(
        simulation.now(),
        options.sample_window_ps,
        options.sample_count,
    );

    if options.log {
        log::info!(
            "Sampling {} audio windows of {} ps from {}",
            options.sample_count,
            options.sample_window_ps,
            simulation.now()
        );
    }

    while !sampler.is_complete() {
        let edge = simulation.next_pwm_edge();
        sampler.on_edge(edge)?;
    }

    Ok(sampler.into_samples())
}

/// [`run_audio`], then requires the samples to equal `golden` exactly.
pub fn run_audio_golden<D: Device>(
    device: D,
    options: &HarnessOptions,
    golden: &GoldenSamples,
) -> Result<Vec<u16>, CheckError> {
    let samples = run_audio(device, options)?;
    golden.compare(&samples)?;
    Ok(samples)
}

/// [`run_audio`] against a golden file, which is rewritten instead when
/// golden updates are requested.
pub fn run_audio_golden_file<D: Device>(
    device: D,
    options: &HarnessOptions,
    golden_path: &Utf8Path,
) -> Result<GoldenOutcome, Whatever> {
    let samples = run_audio(device, options)
        .whatever_context("Audio capture failed")?;
    GoldenSamples::check_or_update(golden_path, &samples)
}

/// Starts the device and lets it run for `duration_ps` without checking
/// anything beyond a clean startup. Returns the cycles run after startup.
pub fn run_smoke<D: Device>(
    device: D,
    config: u8,
    options: &HarnessOptions,
    duration_ps: u64,
) -> Result<u64, CheckError> {
    let mut simulation = sequencer::start(device, config, options)?;
    let ready = simulation.cycle_count();
    simulation.run_for(duration_ps);
    Ok(simulation.cycle_count() - ready)
}
