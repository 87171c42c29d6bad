// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::ReferenceDevice;
use snafu::{ResultExt, Whatever};
use tinysync_device::{Device, OutputPort};
use tinysync_harness::{
    CheckError, HarnessOptions, SimTime, run_smoke, sequencer,
};

#[test]
#[snafu::report]
fn device_is_ready_four_cycles_after_reset() -> Result<(), Whatever> {
    let options = HarnessOptions::default();
    let simulation = sequencer::start(ReferenceDevice::default(), 0, &options)
        .whatever_context("Device failed to start")?;

    assert_eq!(simulation.cycle_count(), 4);
    assert_eq!(simulation.now(), SimTime::from_picos(8 * 27_778));
    assert_eq!(
        simulation.device().read(OutputPort::OutputEnable),
        0b1000_0000
    );

    Ok(())
}

#[test]
#[snafu::report]
fn output_enable_may_settle_during_the_first_four_cycles() -> Result<(), Whatever> {
    sequencer::start(
        ReferenceDevice::with_late_output_enable(4),
        0,
        &HarnessOptions::default(),
    )
    .whatever_context("Device failed to start")?;

    Ok(())
}

#[test]
fn output_enable_settling_after_four_cycles_aborts_startup() {
    let error = sequencer::start(
        ReferenceDevice::with_late_output_enable(5),
        0,
        &HarnessOptions::default(),
    )
    .err()
    .expect("startup should fail");

    assert_eq!(
        error,
        CheckError::Startup {
            expected: 0b1000_0000,
            actual: 0,
        }
    );
}

#[test]
fn wrong_output_enable_aborts_startup() {
    let device = ReferenceDevice::with_output_enable(0b0000_0001);

    let error = sequencer::start(device, 0, &HarnessOptions::default())
        .err()
        .expect("startup should fail");

    assert_eq!(
        error,
        CheckError::Startup {
            expected: 0b1000_0000,
            actual: 0b0000_0001,
        }
    );
}

#[test]
#[snafu::report]
fn free_runs_for_a_millisecond() -> Result<(), Whatever> {
    let cycles = run_smoke(
        ReferenceDevice::default(),
        0b10,
        &HarnessOptions::default(),
        SimTime::from_micros(1000).as_picos(),
    )
    .whatever_context("Smoke run failed")?;

    assert_eq!(cycles, 36_000);

    Ok(())
}
