// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use docverify_core::error::Result;

/// Overrides every other location when set.
pub const DATA_DIR_ENV: &str = "DOCVERIFY_DATA_DIR";

/// Return the application data directory, creating it if needed.
///
/// `explicit` (the `--data-dir` flag) wins, then `$DOCVERIFY_DATA_DIR`, then
/// the XDG data home.
pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => resolve(
            std::env::var_os(DATA_DIR_ENV).map(PathBuf::from),
            std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        ),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn resolve(overridden: Option<PathBuf>, xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = overridden.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }
    let base = xdg
        .filter(|d| !d.as_os_str().is_empty())
        .or_else(|| home.map(|h| h.join(".local").join("share")))
        // Last resort
        .unwrap_or_else(std::env::temp_dir);
    base.join("docverify")
}
