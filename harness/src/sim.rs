// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Clocked simulation of a [`Device`].

use std::{fmt, ops::Sub};

use tinysync_device::{Device, InputPort, PinLayout, PinSnapshot};

use crate::pwm::{EdgeDirection, EdgeEvent};

/// Simulation time in picoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_picos(picos: u64) -> Self {
        Self(picos)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros * 1_000_000)
    }

    pub const fn as_picos(&self) -> u64 {
        self.0
    }

    pub fn as_micros_f64(&self) -> f64 {
        self.0 as f64 / 1e6
    }

    pub const fn plus(self, picos: u64) -> Self {
        Self(self.0 + picos)
    }
}

impl Sub for SimTime {
    type Output = u64;

    /// Picoseconds between two instants.
    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}us", self.as_micros_f64())
    }
}

/// A device together with the clock that drives it.
///
/// Each [`Simulation::cycle`] produces one rising edge at the current time,
/// then a falling edge half a period later, and returns once the full period
/// has elapsed. The clock only advances when the owner of the simulation asks
/// it to.
pub struct Simulation<D: Device> {
    device: D,
    layout: PinLayout,
    half_period: u64,
    now: SimTime,
    cycle: u64,
}

impl<D: Device> Simulation<D> {
    /// `period_ps` is rounded down to an even number of picoseconds.
    pub fn new(mut device: D, layout: PinLayout, period_ps: u64) -> Self {
        device.pin(InputPort::Clock, 0);
        device.eval();
        Self {
            device,
            layout,
            half_period: (period_ps / 2).max(1),
            now: SimTime::ZERO,
            cycle: 0,
        }
    }

    /// Drives `port` and settles the device.
    pub fn pin(&mut self, port: InputPort, value: u8) {
        self.device.pin(port, value);
        self.device.eval();
    }

    /// Advances the clock by one full period.
    pub fn cycle(&mut self) {
        self.device.pin(InputPort::Clock, 1);
        self.device.eval();
        self.now = self.now.plus(self.half_period);
        self.device.pin(InputPort::Clock, 0);
        self.device.eval();
        self.now = self.now.plus(self.half_period);
        self.cycle += 1;
    }

    pub fn cycles(&mut self, count: u64) {
        for _ in 0..count {
            self.cycle();
        }
    }

    /// Advances the clock until at least `duration_ps` have elapsed.
    pub fn run_for(&mut self, duration_ps: u64) {
        let until = self.now.plus(duration_ps);
        while self.now < until {
            self.cycle();
        }
    }

    /// Cycles elapsed since the last [`Simulation::restart_count`].
    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// Starts counting cycles from zero again.
    pub fn restart_count(&mut self) {
        self.cycle = 0;
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn period(&self) -> u64 {
        self.half_period * 2
    }

    pub fn snapshot(&self) -> PinSnapshot {
        PinSnapshot::capture(&self.device, &self.layout)
    }

    /// Runs cycles until the PWM line changes level. The event is stamped
    /// with the rising clock edge on which the change happened.
    ///
    /// This never gives up: a device whose PWM output is stuck hangs the
    /// caller.
    pub fn next_pwm_edge(&mut self) -> EdgeEvent {
        let before = self.snapshot().pwm;
        loop {
            let edge_time = self.now;
            self.cycle();
            let after = self.snapshot().pwm;
            if after != before {
                return EdgeEvent {
                    time: edge_time,
                    direction: if after {
                        EdgeDirection::Rising
                    } else {
                        EdgeDirection::Falling
                    },
                };
            }
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
