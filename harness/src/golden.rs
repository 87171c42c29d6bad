// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Golden audio sample vectors.
//!
//! A golden file is TOML with a single array:
//!
//! ```toml
//! samples = [367, 409, ...]
//! ```
//!
//! Set `TINYSYNC_UPDATE_GOLDEN=1` to overwrite golden files with freshly
//! captured samples instead of comparing against them.

use std::{env, fs};

use camino::{Utf8Path, Utf8PathBuf};
use snafu::{ResultExt, Whatever, whatever};

use crate::{error::CheckError, pwm::FULL_SCALE};

pub const UPDATE_GOLDEN_VARIABLE: &str = "TINYSYNC_UPDATE_GOLDEN";

/// A recorded sample sequence to compare captures against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenSamples {
    samples: Vec<u16>,
}

/// What [`GoldenSamples::check_or_update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldenOutcome {
    Matched,
    Updated,
}

impl GoldenSamples {
    pub fn new(samples: Vec<u16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Parses the contents of a golden file.
    pub fn from_toml_str(contents: &str) -> Result<Self, Whatever> {
        let value: toml::Value = toml::from_str(contents)
            .whatever_context("Failed to parse golden file as valid TOML")?;

        let Some(array) = value.get("samples").and_then(|samples| samples.as_array())
        else {
            whatever!("Golden file has no `samples` array");
        };

        let mut samples = Vec::with_capacity(array.len());
        for (index, entry) in array.iter().enumerate() {
            let Some(sample) = entry
                .as_integer()
                .filter(|sample| (0..=FULL_SCALE as i64).contains(sample))
            else {
                whatever!(
                    "Golden sample {} is {}, expected an integer from 0 to {}",
                    index,
                    entry,
                    FULL_SCALE
                );
            };
            samples.push(sample as u16);
        }

        Ok(Self { samples })
    }

    pub fn from_file(path: &Utf8Path) -> Result<Self, Whatever> {
        let contents = fs::read_to_string(path).whatever_context(format!(
            "Failed to read golden file at {path}"
        ))?;
        Self::from_toml_str(&contents)
            .whatever_context(format!("Invalid golden file at {path}"))
    }

    pub fn to_toml_string(&self) -> Result<String, Whatever> {
        let mut table = toml::Table::new();
        table.insert(
            "samples".into(),
            toml::Value::Array(
                self.samples
                    .iter()
                    .map(|sample| toml::Value::Integer(*sample as i64))
                    .collect(),
            ),
        );
        toml::to_string(&table)
            .whatever_context("Failed to serialize golden samples")
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), Whatever> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).whatever_context(format!(
                "Failed to create golden directory {parent}"
            ))?;
        }
        fs::write(path, self.to_toml_string()?).whatever_context(format!(
            "Failed to write golden file at {path}"
        ))
    }

    /// Requires `captured` to equal the golden samples exactly. Reports the
    /// first index at which they differ.
    pub fn compare(&self, captured: &[u16]) -> Result<(), CheckError> {
        if let Some((index, (expected, actual))) = self
            .samples
            .iter()
            .zip(captured)
            .enumerate()
            .find(|(_, (expected, actual))| expected != actual)
        {
            return Err(CheckError::Golden {
                index,
                expected: *expected,
                actual: *actual,
            });
        }

        if self.samples.len() != captured.len() {
            return Err(CheckError::GoldenLength {
                expected: self.samples.len(),
                actual: captured.len(),
            });
        }

        Ok(())
    }

    /// Compares `captured` against the golden file at `path`, or rewrites the
    /// file when [`UPDATE_GOLDEN_VARIABLE`] is set.
    pub fn check_or_update(
        path: &Utf8Path,
        captured: &[u16],
    ) -> Result<GoldenOutcome, Whatever> {
        if update_requested() {
            log::info!("Updating golden file {}", path);
            GoldenSamples::new(captured.to_vec()).write(path)?;
            return Ok(GoldenOutcome::Updated);
        }

        GoldenSamples::from_file(path)?
            .compare(captured)
            .whatever_context(format!("Samples diverge from golden file {path}"))?;
        Ok(GoldenOutcome::Matched)
    }
}

fn update_requested() -> bool {
    env::var(UPDATE_GOLDEN_VARIABLE)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Where a golden file named `name` lives under `directory`.
pub fn golden_path(directory: &Utf8Path, name: &str) -> Utf8PathBuf {
    directory.join(format!("{name}.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_reserializes() {
        let golden = GoldenSamples::from_toml_str("samples = [367, 409, 0, 1000]")
            .expect("valid golden file");
        assert_eq!(golden.samples(), &[367, 409, 0, 1000]);

        let text = golden.to_toml_string().expect("serializable");
        assert_eq!(
            GoldenSamples::from_toml_str(&text).expect("valid golden file"),
            golden
        );
    }

    #[test]
    fn rejects_out_of_range_samples() {
        assert!(GoldenSamples::from_toml_str("samples = [1001]").is_err());
        assert!(GoldenSamples::from_toml_str("samples = [-1]").is_err());
        assert!(GoldenSamples::from_toml_str("samples = [\"a\"]").is_err());
        assert!(GoldenSamples::from_toml_str("other = [1]").is_err());
    }

    #[test]
    fn compare_reports_the_first_divergent_index() {
        let golden = GoldenSamples::new(vec![367, 409, 500, 612]);
        assert_eq!(golden.compare(&[367, 409, 500, 612]), Ok(()));
        assert_eq!(
            golden.compare(&[367, 409, 501, 600]),
            Err(CheckError::Golden {
                index: 2,
                expected: 500,
                actual: 501
            })
        );
        assert_eq!(
            golden.compare(&[367, 409]),
            Err(CheckError::GoldenLength {
                expected: 4,
                actual: 2
            })
        );
    }
}
