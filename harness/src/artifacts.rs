// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Writing artifacts that outlive a test run.

#[cfg(unix)]
use std::os::fd::FromRawFd;
use std::{
    fs,
    sync::{LazyLock, Mutex},
};

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use snafu::{ResultExt, Whatever, whatever};

/// Stderr opened from its file descriptor, so writes bypass the output capture
/// of the test harness, which only intercepts the print macros.
#[cfg(unix)]
pub(crate) static STDERR: LazyLock<Mutex<fs::File>> =
    LazyLock::new(|| Mutex::new(unsafe { fs::File::from_raw_fd(2) }));

#[cfg(not(unix))]
pub(crate) static STDERR: LazyLock<Mutex<std::io::Stderr>> =
    LazyLock::new(|| Mutex::new(std::io::stderr()));

/// Like `eprintln!`, but not swallowed by the test harness's output capture.
macro_rules! eprintln_nocapture {
    ($($contents:tt)*) => {{
        use snafu::ResultExt;
        use std::io::Write;

        writeln!(
            &mut $crate::artifacts::STDERR.lock().expect("poisoned"),
            $($contents)*
        )
        .whatever_context("Failed to write to non-captured stderr")
    }};
}
pub(crate) use eprintln_nocapture;

#[derive(Default)]
struct ThreadLocalFileLock;

/// Artifact directories locked by threads of this process. `file_guard` only
/// excludes other processes.
static THREAD_LOCK: LazyLock<DashMap<Utf8PathBuf, Mutex<ThreadLocalFileLock>>> =
    LazyLock::new(DashMap::default);

/// A directory that several test processes and threads may write into.
pub struct ArtifactDirectory {
    path: Utf8PathBuf,
}

impl ArtifactDirectory {
    /// Creates the directory if it does not exist yet.
    pub fn open(path: &Utf8Path) -> Result<Self, Whatever> {
        fs::create_dir_all(path).whatever_context(format!(
            "Failed to create artifacts directory {path}"
        ))?;
        Ok(Self {
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Writes `contents` to `name` inside the directory while holding an
    /// exclusive lock on it, so concurrent writers never interleave.
    pub fn write(
        &self,
        name: &str,
        contents: &[u8],
    ) -> Result<Utf8PathBuf, Whatever> {
        let Some(directory_name) = self.path.file_name() else {
            whatever!("Artifacts directory {} has no name", self.path);
        };
        let lock_path = self
            .path
            .with_file_name(format!("{directory_name}.lock"));

        let file_lock = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .whatever_context(
                "Failed to open file lock file for artifacts directory (this is not the actual lock itself, it is an I/O error)",
            )?;

        let _file_lock =
            file_guard::lock(&file_lock, file_guard::Lock::Exclusive, 0, 1)
                .whatever_context(
                    "Failed to acquire file lock for artifacts directory",
                )?;

        let thread_mutex = THREAD_LOCK.entry(self.path.clone()).or_default();
        let Ok(_thread_lock) = thread_mutex.lock() else {
            whatever!(
                "Failed to acquire thread-local lock for artifacts directory"
            );
        };

        let path = self.path.join(name);
        fs::write(&path, contents)
            .whatever_context(format!("Failed to write artifact {path}"))?;
        Ok(path)
    }
}
