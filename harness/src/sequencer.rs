// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Bringing the device out of reset.

use tinysync_device::{Device, InputPort, OutputPort};

use crate::{error::CheckError, options::HarnessOptions, sim::Simulation};

/// Cycles spent before asserting reset, and again while holding it.
pub const RESET_PHASE_CYCLES: u64 = 2;

/// Cycles after reset release at which the output-enable register is read.
pub const READY_AFTER_CYCLES: u64 = 4;

/// Clocks `device`, applies `config`, and pulses reset. Returns the running
/// simulation once the device has run [`HarnessOptions::ready_after_cycles`]
/// cycles past reset release. The cycle counter counts from release, so cycle
/// 0 is the first clock edge the device sees out of reset.
///
/// Fails if the output-enable register does not then read
/// [`HarnessOptions::ready_output_enable`]: a device that has not latched its
/// static configuration cannot be checked further.
pub fn start<D: Device>(
    device: D,
    config: u8,
    options: &HarnessOptions,
) -> Result<Simulation<D>, CheckError> {
    let mut simulation = Simulation::new(
        device,
        options.layout.clone(),
        options.clock_period_ps,
    );

    if options.log {
        log::info!("Start");
    }
    simulation.pin(InputPort::Enable, 1);
    simulation.pin(InputPort::Config, config);
    simulation.pin(InputPort::Secondary, 0);
    simulation.pin(InputPort::ResetN, 1);
    simulation.cycles(RESET_PHASE_CYCLES);

    if options.log {
        log::info!("Reset");
    }
    simulation.pin(InputPort::ResetN, 0);
    simulation.cycles(RESET_PHASE_CYCLES);
    simulation.pin(InputPort::ResetN, 1);
    simulation.restart_count();

    simulation.cycles(options.ready_after_cycles);
    let output_enable = simulation.device().read(OutputPort::OutputEnable);
    if output_enable != options.ready_output_enable {
        return Err(CheckError::Startup {
            expected: options.ready_output_enable,
            actual: output_enable,
        });
    }

    if options.log {
        log::info!(
            "Device ready {} cycles after reset with configuration {:#04x}",
            simulation.cycle_count(),
            config
        );
    }
    Ok(simulation)
}
