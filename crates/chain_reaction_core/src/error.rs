//! # Sync Error Types
//!
//! All errors that can occur while synchronizing with a game contract.
//!
//! | Variant            | Recovery                                          |
//! |--------------------|---------------------------------------------------|
//! | `TransientFetch`   | Silent retry on the next poll cycle               |
//! | `SchemaMismatch`   | Fails this reconciliation, cached state preserved |
//! | `StateUnavailable` | Surfaced to the consumer, subscription keeps going|
//! | `InvalidArgument`  | Programming error, never swallowed                |
//! | `InvalidConfig`    | Rejected at startup                               |

use thiserror::Error;

/// Errors that can occur in the sync engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A single remote fetch or poll cycle failed.
    #[error("remote fetch failed: {0}")]
    TransientFetch(String),

    /// A decode contract was violated (field count or field type).
    #[error("schema mismatch in {section}: {detail}")]
    SchemaMismatch {
        /// Which part of the payload failed (e.g. `legacy mutable fields`).
        section: &'static str,
        /// What was expected versus what was found.
        detail: String,
    },

    /// Both the canonical and the legacy decode paths failed.
    #[error("state unavailable for {address}: canonical: {canonical}; legacy: {legacy}")]
    StateUnavailable {
        /// The contract address that could not be reconciled.
        address: String,
        /// Why the canonical path failed.
        canonical: String,
        /// Why the legacy path failed.
        legacy: String,
    },

    /// A formula was called with an out-of-domain input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration file or environment override.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Shorthand for a schema mismatch.
    #[must_use]
    pub fn schema(section: &'static str, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            section,
            detail: detail.into(),
        }
    }

    /// Returns `true` for errors that are expected to clear on the next cycle.
    #[inline]
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch(_))
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
