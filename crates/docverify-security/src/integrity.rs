// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints: SHA-256 of the uploaded image bytes.

use std::io::Read;
use std::path::Path;

use docverify_core::error::Result;
use sha2::{Digest, Sha256};

/// Stream a file through SHA-256 without loading it whole.
///
/// Audit entries carry this fingerprint so an entry can be matched back to
/// the exact image bytes that were analysed.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
