//! Error taxonomy for the extraction core.
//!
//! Per-record and per-script failures are logged and skipped inside the
//! component that hit them; only the fatal conditions defined here cross a
//! public API boundary.

use thiserror::Error;

/// Value Coercion Evaluator failures. Local to one record; callers drop the
/// record and keep going.
#[derive(Debug, Error)]
pub enum CoerceError {
    /// The node kind is outside the evaluator's whitelist.
    #[error("unsupported node kind `{kind}` at bytes {start}..{end}")]
    UnsupportedNodeKind {
        kind: &'static str,
        start: usize,
        end: usize,
    },
}

/// Chunk-Manifest Decoder failures. Fatal: without the lazy-file list
/// nothing downstream can proceed.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No shape test matched anywhere in the loader tree. The decoder's
    /// strategies are stale relative to the bundler's current output.
    #[error("no chunk manifest entries found in loader script `{path}`")]
    EmptyManifest { path: String },

    /// The loader script's text could not be parsed at all.
    #[error("loader script `{path}` failed to parse")]
    LoaderParse { path: String },
}

/// Snapshot finalization failures. Distinguishes "nothing found" from
/// "found but malformed" by naming exactly which fields are absent.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("client info is missing required field(s): {}", missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },
}
