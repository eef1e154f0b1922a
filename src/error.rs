//! Error types for the placement and distribution engine.
//!
//! Each fallible seam gets its own narrow error type, mirroring the
//! `StorageError` / `ArrayCreateError` / `ArrayError` split used throughout
//! this crate's storage layer: a caller inspecting a [`ConfigError`] should
//! never have to match on variants that can only occur during dispatch.

use std::path::PathBuf;

use thiserror::Error;

/// A configuration error, detected before any work is dispatched.
///
/// These correspond to the "Configuration error" row of the error handling
/// design: bad divisibility, insufficient node count, unknown dataset, or a
/// missing source for a requested timestep. Configuration errors are always
/// fail-fast: no [`crate::dispatcher::PlacementJob`] is ever produced if one
/// is outstanding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `side` must be a power of two (space-filling index, sub-array side, chunk side).
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Name of the offending field, for diagnostics.
        field: &'static str,
        /// The offending value.
        value: u64,
    },
    /// The sub-array side `S` does not divide the source side `L`.
    #[error("sub_array_side {s} does not divide source side {l}")]
    SubArraySideDoesNotDivideSource {
        /// Source side length.
        l: u64,
        /// Requested sub-array side length.
        s: u64,
    },
    /// The chunk side `C` does not divide the sub-array side `S`.
    #[error("chunk_side {c} does not divide sub_array_side {s}")]
    ChunkSideDoesNotDivideSubArray {
        /// Sub-array side length.
        s: u64,
        /// Requested chunk side length.
        c: u64,
    },
    /// Fewer than 27 nodes were supplied; the 3x3x3 neighborhood exclusion
    /// constraint cannot be satisfied.
    #[error("node coloring requires at least 27 nodes, got {m}")]
    InsufficientNodes {
        /// The number of nodes actually supplied.
        m: usize,
    },
    /// The grid size `N` must be strictly positive.
    #[error("grid size N must be positive, got {n}")]
    EmptyGrid {
        /// The offending grid size.
        n: usize,
    },
    /// A coordinate fell outside of `[0, side)` during packing.
    #[error("coordinate {axis}={value} out of range for side {side}")]
    CoordinateOutOfRange {
        /// Which axis (`x`, `y`, or `z`).
        axis: &'static str,
        /// The offending coordinate value.
        value: u64,
        /// The side length the coordinate must fit within.
        side: u64,
    },
    /// A 1-based slot index was outside `[1, n_cubed]`.
    #[error("slot {slot} out of range for {n_cubed} sub-arrays")]
    SlotOutOfRange {
        /// The offending slot.
        slot: usize,
        /// The total number of sub-arrays, i.e. `N^3`.
        n_cubed: usize,
    },
    /// No source was available for the requested dataset/timestep.
    #[error("no source available for dataset {dataset:?} at timestep {timestep}")]
    MissingSource {
        /// The dataset name.
        dataset: String,
        /// The requested timestep.
        timestep: u32,
    },
    /// The destination's `slot` or `timestep` cannot be represented in the
    /// fixed-width path format (2-digit slot, 3-digit timestep).
    #[error("value {value} does not fit in {digits} decimal digits")]
    PathComponentTooWide {
        /// The value that was too wide.
        value: u64,
        /// How many digits the path format reserves.
        digits: u8,
    },
    /// `DeleteBackup` does not describe a write: deletion is a separate,
    /// confirmation-gated operation reached through
    /// [`crate::backup::BackupMirror::plan_deletion`] and
    /// [`crate::backup::BackupMirror::delete_confirmed`], never the dispatcher.
    #[error("write mode {mode:?} is not a dispatchable write; use BackupMirror to delete backups")]
    NotADispatchableWriteMode {
        /// The offending write mode.
        mode: crate::config::WriteMode,
    },
}

/// A failure reading from, or enumerating, the source timestep.
///
/// This wraps whatever the `SourceAdapter` implementation reports; the core
/// does not know or care about the input file format, only that reading
/// may fail.
#[derive(Debug, Error)]
#[error("source read failed for dataset {dataset:?} timestep {timestep}: {message}")]
pub struct SourceError {
    /// The dataset being read.
    pub dataset: String,
    /// The timestep being read.
    pub timestep: u32,
    /// A human-readable cause, supplied by the adapter.
    pub message: String,
}

/// A single job's write failure, collected (never propagated) by the
/// dispatcher and backup mirror.
#[derive(Debug, Error, Clone)]
#[error("write to {destination} failed: {cause}")]
pub struct JobFailure {
    /// The destination path that failed to materialize.
    pub destination: PathBuf,
    /// A human-readable cause, supplied by the backend.
    pub cause: String,
}

/// A single backup copy's failure, collected by [`crate::backup::BackupMirror`].
#[derive(Debug, Error, Clone)]
#[error("backup copy {source} -> {destination} failed: {cause}")]
pub struct BackupError {
    /// The production-side source path.
    pub source: PathBuf,
    /// The backup destination path.
    pub destination: PathBuf,
    /// A human-readable cause, supplied by the backend.
    pub cause: String,
}

/// Top-level error aggregate for fail-fast paths (configuration, source
/// reads). Per-job and per-copy failures are *not* funneled through this
/// type — they are values collected in a summary, never an `Err`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration error, detected before dispatch.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A source read error for the current timestep.
    #[error(transparent)]
    Source(#[from] SourceError),
}
