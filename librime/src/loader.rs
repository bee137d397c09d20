//! Locating and opening librime at runtime.
//!
//! A missing library, a missing `rime_get_api` export or a table without the
//! entries the bridge calls all surface as `BridgeError::Unavailable`, so the
//! host can refuse to attach instead of failing on first use.
//!
//! # Safety
//!
//! Opening a shared library runs its initializers. Only point
//! `BridgeConfig::library` at a librime build you trust.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use rime_bridge_core::{BridgeConfig, BridgeError, Result};
use tracing::{debug, info, warn};

use crate::native::{Entries, NativeRime};
use crate::table::{RimeGetApiFn, RIME_GET_API_SYMBOL};

/// File names tried, in order, when no explicit path is configured.
pub fn default_library_names() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["rime.dll"]
    } else if cfg!(target_os = "macos") {
        &["librime.1.dylib", "librime.dylib"]
    } else {
        &["librime.so.1", "librime.so"]
    }
}

/// Candidate paths for the library, explicit path first.
pub fn candidates(config: &BridgeConfig) -> Vec<PathBuf> {
    match &config.library {
        Some(path) => vec![path.clone()],
        None => default_library_names().iter().map(PathBuf::from).collect(),
    }
}

fn open_first(paths: &[PathBuf]) -> Result<(Library, PathBuf)> {
    let mut failures = Vec::new();
    for path in paths {
        // SAFETY: see module docs.
        match unsafe { Library::new(path) } {
            Ok(lib) => return Ok((lib, path.clone())),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "librime candidate rejected");
                failures.push(format!("{}: {}", path.display(), e));
            }
        }
    }
    Err(BridgeError::Unavailable(if failures.is_empty() {
        "no librime candidates".to_string()
    } else {
        failures.join("; ")
    }))
}

fn resolve(library: &Library, path: &Path) -> Result<Entries> {
    let get_api: Symbol<RimeGetApiFn> = unsafe { library.get(RIME_GET_API_SYMBOL) }
        .map_err(|e| BridgeError::Unavailable(format!("{}: {}", path.display(), e)))?;

    // SAFETY: `rime_get_api` returns a pointer to a static table owned by
    // the library, valid while it stays loaded.
    let table = unsafe { get_api() };
    if table.is_null() {
        return Err(BridgeError::Unavailable(format!(
            "{}: rime_get_api returned null",
            path.display()
        )));
    }
    Entries::resolve(unsafe { &*table })
}

/// Open librime as configured and resolve its API table.
pub fn load(config: &BridgeConfig) -> Result<NativeRime> {
    let paths = candidates(config);
    let attempt = open_first(&paths).and_then(|(library, path)| {
        let fns = resolve(&library, &path)?;
        Ok((library, fns, path))
    });

    match attempt {
        Ok((library, fns, path)) => {
            info!(path = %path.display(), "librime loaded");
            Ok(NativeRime::new(library, fns))
        }
        Err(e) => {
            warn!(error = %e, "librime unavailable");
            Err(e)
        }
    }
}

impl NativeRime {
    /// Shorthand for [`load`].
    pub fn load(config: &BridgeConfig) -> Result<Self> {
        load(config)
    }
}
