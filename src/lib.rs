//! A deterministic placement and distribution engine for chunked
//! scientific arrays: it assigns each equal-sized sub-array of a large
//! cubic source array to one of a fixed set of storage nodes, such that
//! spatially adjacent sub-arrays never land on the same node, and
//! dispatches the resulting writes across the fleet with bounded
//! concurrency.
//!
//! The crate is organized around the eight components of the placement
//! pipeline:
//!
//! - [`morton`] — space-filling (Morton/Z-order) index over a cubic grid.
//! - [`coloring`] — neighborhood-exclusion, load-balanced node coloring.
//! - [`namer`] — bidirectional chunk-name <-> Morton-key-pair mapping.
//! - [`splitter`] — tiles a source timestep into sub-array views.
//! - [`planner`] — composes coloring, naming and the fleet into a job list.
//! - [`dispatcher`] — bounded-concurrency write drain with per-job failure collection.
//! - [`backup`] — production-to-backup mirroring and confirmed deletion.
//! - [`orchestrator`] — drives split -> plan -> dispatch per timestep, across timestep ranges.
//!
//! Reading the source file format and writing the output chunked-store
//! format are both out of scope: this crate defines the [`source::SourceAdapter`]
//! and [`store::SubArrayStore`] trait seams a concrete backend implements.

pub mod backup;
pub mod coloring;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fleet;
pub mod morton;
pub mod namer;
pub mod orchestrator;
pub mod path;
pub mod planner;
pub mod source;
pub mod splitter;
pub mod store;

pub use backup::{BackupMirror, DeletionConfirmation};
pub use coloring::NodeColoring;
pub use config::{global_config, global_config_mut, Config, PlacementConfig, WriteMode};
pub use dispatcher::{CancellationFlag, DispatchSummary, WriteDispatcher};
pub use error::{BackupError, ConfigError, CoreError, JobFailure, SourceError};
pub use fleet::{Fleet, Node};
pub use morton::{morton_pack, MortonKey};
pub use namer::{CellRange, ChunkNamer};
pub use orchestrator::{CoreOutcome, Orchestrator};
pub use path::{DestinationPath, PathMode};
pub use planner::{PlacementJob, PlacementPlanner};
pub use source::{SourceAdapter, VariableData};
pub use splitter::{Splitter, SplitterConfig, SubArrayView, Variable};
pub use store::SubArrayStore;
