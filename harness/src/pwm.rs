// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Demodulation of the PWM audio line.
//!
//! Time is cut into fixed windows starting at the moment sampling begins.
//! The time the line spends high inside a window, as a fraction of the
//! window, becomes one sample in parts per thousand. The sampler only sees
//! edges, so a window is closed when the first edge at or past its end
//! arrives. A high interval ending on that edge credits the first window it
//! closes up to the boundary and the open window from its start; any window in
//! between closes empty.

use crate::{error::CheckError, sim::SimTime};

/// Sample values are parts per thousand of the window.
pub const FULL_SCALE: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Rising,
    Falling,
}

/// A change of level on the PWM line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub time: SimTime,
    pub direction: EdgeDirection,
}

impl EdgeEvent {
    pub fn rising(time: SimTime) -> Self {
        Self {
            time,
            direction: EdgeDirection::Rising,
        }
    }

    pub fn falling(time: SimTime) -> Self {
        Self {
            time,
            direction: EdgeDirection::Falling,
        }
    }
}

/// The window currently accumulating high time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub start: SimTime,
    /// Picoseconds the line was high inside this window, so far.
    pub high_time: u64,
}

impl SampleWindow {
    pub fn new(start: SimTime) -> Self {
        Self {
            start,
            high_time: 0,
        }
    }

    /// The first instant past this window.
    pub fn end(&self, length: u64) -> SimTime {
        self.start.plus(length)
    }

    /// Whether `time` lies at or past the end of the window.
    pub fn is_elapsed_by(&self, time: SimTime, length: u64) -> bool {
        time - self.start >= length
    }

    /// Credits the high interval `[from, until)` clipped to this window.
    pub fn add_high(&mut self, from: SimTime, until: SimTime) {
        let from = from.max(self.start);
        if until > from {
            self.high_time += until - from;
        }
    }

    /// The window's sample, `floor(1000 * high_time / length)`.
    pub fn quantize(&self, length: u64) -> u16 {
        let scaled = FULL_SCALE * self.high_time.min(length) / length;
        scaled as u16
    }
}

/// Turns PWM edges into a bounded sequence of samples.
#[derive(Debug, Clone)]
pub struct PwmSampler {
    window_length: u64,
    limit: usize,
    window: SampleWindow,
    last_edge: SimTime,
    samples: Vec<u16>,
}

impl PwmSampler {
    /// Starts the first window at `start`. Sampling stops after `limit`
    /// samples.
    pub fn new(start: SimTime, window_length: u64, limit: usize) -> Self {
        assert!(window_length > 0, "sample windows must have a length");
        Self {
            window_length,
            limit,
            window: SampleWindow::new(start),
            last_edge: start,
            samples: Vec::with_capacity(limit),
        }
    }

    /// Accounts for the interval since the previous edge, closing every
    /// window that ends within it.
    ///
    /// Fails as soon as three consecutive samples are equal.
    pub fn on_edge(&mut self, edge: EdgeEvent) -> Result<(), CheckError> {
        if self.is_complete() {
            return Ok(());
        }

        // A falling edge ends a high interval, a rising edge a low one.
        let was_high = edge.direction == EdgeDirection::Falling;
        let mut from = self.last_edge;
        let mut corrected = false;

        while self.window.is_elapsed_by(edge.time, self.window_length) {
            let end = self.window.end(self.window_length);
            // Only the first window closed by an edge gets the boundary
            // correction; windows spanned entirely close as they opened.
            if was_high && !corrected {
                self.window.add_high(from, end);
            }
            corrected = true;
            self.emit()?;
            self.window = SampleWindow::new(end);
            from = end;

            if self.is_complete() {
                self.last_edge = edge.time;
                return Ok(());
            }
        }

        if was_high {
            self.window.add_high(from, edge.time);
        }
        self.last_edge = edge.time;
        Ok(())
    }

    fn emit(&mut self) -> Result<(), CheckError> {
        let value = self.window.quantize(self.window_length);
        self.samples.push(value);
        log::debug!(
            "Sample {} = {} (window at {})",
            self.samples.len() - 1,
            value,
            self.window.start
        );

        if let &[.., a, b, c] = self.samples.as_slice() {
            if a == b && b == c {
                return Err(CheckError::Flatline {
                    index: self.samples.len() - 1,
                    value: c,
                });
            }
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.limit
    }

    /// The window still accumulating.
    pub fn open_window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u16> {
        self.samples
    }
}
