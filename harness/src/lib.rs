// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Cycle-accurate checks for a VGA and PWM audio generator.
//!
//! The harness clocks a [`Device`](tinysync_device::Device) through its reset
//! sequence, then compares what it drives against two reference models: the
//! [`VideoTiming`] oracle for the sync pins, and the [`PwmSampler`] for the
//! audio line. Frames can additionally be captured as PNG images.

pub mod artifacts;
pub mod error;
pub mod frame;
pub mod golden;
pub mod options;
pub mod pwm;
pub mod scenario;
pub mod sequencer;
pub mod sim;
pub mod timing;

pub use error::CheckError;
pub use frame::{Frame, capture_frame, dump_frame};
pub use golden::GoldenSamples;
pub use options::HarnessOptions;
pub use pwm::{EdgeDirection, EdgeEvent, PwmSampler, SampleWindow};
pub use scenario::{
    SyncReport, run_audio, run_audio_golden, run_audio_golden_file, run_smoke,
    run_sync,
};
pub use sim::{SimTime, Simulation};
pub use timing::{SyncState, VideoTiming};

pub mod prelude {
    pub use crate::{
        CheckError, HarnessOptions, VideoTiming, capture_frame, dump_frame,
        run_audio, run_audio_golden, run_smoke, run_sync,
    };
    pub use tinysync_device::{
        Device, DynamicDevice, InputPort, OutputPort, PinLayout, PinSnapshot,
    };
}
