// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docverify-security: document fingerprints and the append-only audit trail
// that lets a reviewer see what the analysis decided and when.

pub mod audit;
pub mod integrity;

pub use audit::{AuditEntry, AuditLog};
pub use integrity::hash_file;
