// Copyright (C) 2024 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! Support for devices loaded from a verilated shared library.
//!
//! The library must export the C wrappers Verilator-based runtimes generate
//! for a top module `top`:
//!
//! - `ffi_new_V{top}` and `ffi_delete_V{top}`
//! - `ffi_V{top}_eval`
//! - `ffi_V{top}_pin_{port}` for every [`InputPort`]
//! - `ffi_V{top}_read_{port}` for every [`OutputPort`]
//!
//! All ports of the Tiny Tapeout interface are at most 8 bits wide, so every
//! accessor takes or returns a single byte.

use std::{collections::HashMap, ffi};

use camino::{Utf8Path, Utf8PathBuf};
use libloading::Library;
use snafu::{ResultExt, Snafu};

use crate::{Device, InputPort, OutputPort};

type PinFn = extern "C" fn(*mut ffi::c_void, u8);
type ReadFn = extern "C" fn(*mut ffi::c_void) -> u8;

/// Failure to load a [`DynamicDevice`].
#[derive(Debug, Snafu)]
pub enum DeviceError {
    #[snafu(display("Failed to load device library {path}"))]
    LoadLibrary {
        path: Utf8PathBuf,
        source: libloading::Error,
    },
    #[snafu(display(
        "Symbol {symbol} not found in device library {path}: was the top module `{top_module}` verilated with the Tiny Tapeout ports?"
    ))]
    MissingSymbol {
        path: Utf8PathBuf,
        top_module: String,
        symbol: String,
        source: libloading::Error,
    },
    #[snafu(display("Escaped module names are not supported: `{top_module}`"))]
    InvalidTopName { top_module: String },
    #[snafu(display(
        "Device library {path} returned a null model for `{top_module}`"
    ))]
    NullModel {
        path: Utf8PathBuf,
        top_module: String,
    },
}

/// A device whose model lives in a shared library. Every symbol is resolved
/// when the library is loaded, so port accesses cannot fail.
pub struct DynamicDevice {
    name: String,
    main: *mut ffi::c_void,
    delete_main: extern "C" fn(*mut ffi::c_void),
    eval_main: extern "C" fn(*mut ffi::c_void),
    pins: HashMap<InputPort, PinFn>,
    reads: HashMap<OutputPort, ReadFn>,
    // Dropped last: the function pointers above point into it.
    _library: Library,
}

impl DynamicDevice {
    /// Loads the model of `top_module` from the library at `path` and
    /// constructs a fresh instance of it.
    pub fn load(path: &Utf8Path, top_module: &str) -> Result<Self, DeviceError> {
        if top_module.chars().any(|c| c == '\\' || c == ' ') {
            return InvalidTopNameSnafu { top_module }.fail();
        }

        log::info!("Opening device library {}", path);
        let library =
            unsafe { Library::new(path) }.context(LoadLibrarySnafu { path })?;

        macro_rules! symbol {
            ($symbol:expr, $type:ty) => {{
                let symbol: String = $symbol;
                let loaded: libloading::Symbol<$type> =
                    unsafe { library.get(symbol.as_bytes()) }.context(
                        MissingSymbolSnafu {
                            path,
                            top_module,
                            symbol: symbol.clone(),
                        },
                    )?;
                *loaded
            }};
        }

        let new_main = symbol!(
            format!("ffi_new_V{top_module}"),
            extern "C" fn() -> *mut ffi::c_void
        );
        let delete_main = symbol!(
            format!("ffi_delete_V{top_module}"),
            extern "C" fn(*mut ffi::c_void)
        );
        let eval_main = symbol!(
            format!("ffi_V{top_module}_eval"),
            extern "C" fn(*mut ffi::c_void)
        );

        let mut pins = HashMap::new();
        for port in InputPort::ALL {
            let pin = symbol!(
                format!("ffi_V{top_module}_pin_{}", port.name()),
                PinFn
            );
            pins.insert(port, pin);
        }

        let mut reads = HashMap::new();
        for port in OutputPort::ALL {
            let read = symbol!(
                format!("ffi_V{top_module}_read_{}", port.name()),
                ReadFn
            );
            reads.insert(port, read);
        }

        let main = non_null_model(new_main(), path, top_module)?;
        log::info!("Instantiated device `{}`", top_module);

        Ok(Self {
            name: top_module.to_string(),
            main,
            delete_main,
            eval_main,
            pins,
            reads,
            _library: library,
        })
    }

    /// The source-level name of the top module.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Device for DynamicDevice {
    fn pin(&mut self, port: InputPort, value: u8) {
        (self.pins[&port])(self.main, value);
    }

    fn read(&self, port: OutputPort) -> u8 {
        (self.reads[&port])(self.main)
    }

    fn eval(&mut self) {
        (self.eval_main)(self.main);
    }
}

impl Drop for DynamicDevice {
    fn drop(&mut self) {
        (self.delete_main)(self.main);
    }
}

fn non_null_model(
    main: *mut ffi::c_void,
    path: &Utf8Path,
    top_module: &str,
) -> Result<*mut ffi::c_void, DeviceError> {
    if main.is_null() {
        return NullModelSnafu { path, top_module }.fail();
    }
    Ok(main)
}
