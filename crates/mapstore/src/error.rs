// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors surfaced by the store.
//!
//! Expected negative outcomes (unknown region, stale version, descriptor not
//! up-to-date) are reported as null leases or null ids, not errors. `Error`
//! covers the one genuinely exceptional path: a payload factory failing
//! while a lease is being acquired.

use thiserror::Error;

/// Errors returned by mapstore operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend failed to materialize a payload for a map file.
    #[error("failed to open payload for `{region}`: {reason}")]
    PayloadOpen {
        /// Region name of the file being opened.
        region: String,
        /// Backend-supplied failure description.
        reason: String,
    },

    /// I/O error from a backend touching local storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient alias for API results using the crate `Error` type.
pub type Result<T> = std::result::Result<T, Error>;
