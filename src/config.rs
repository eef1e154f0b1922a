//! Global configuration and the typed placement configuration.
//!
//! Two distinct things live here, deliberately kept apart:
//!  - [`Config`] is ambient, process-wide tuning (concurrency defaults,
//!    whether node colorings are cached) in the same spirit as most crates'
//!    global configuration: a lazily-initialised [`RwLock`] reachable via
//!    [`global_config`] / [`global_config_mut`].
//!  - [`PlacementConfig`] is the typed form of the "Configuration recognized
//!    by the core" table: per-run parameters supplied by the (out of scope)
//!    CLI/config-file loader. Parsing it from disk is explicitly not this
//!    crate's concern; validating it is.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Global configuration options for the placement engine.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with
/// [`global_config_mut`].
///
/// ## Cache Node Colorings
/// > default: `true`
///
/// Node coloring is a pure function of `(N, M)` (see [`crate::coloring`]).
/// When enabled, [`crate::orchestrator::Orchestrator`] reuses a previously
/// computed [`crate::coloring::NodeColoring`] across timesteps that share
/// `N` and `M` instead of recomputing it.
///
/// ## Default Dispatch Concurrency
/// > default: [`std::thread::available_parallelism`]`()`
///
/// Used as [`crate::dispatcher::WriteDispatcher`]'s parallelism when a
/// caller does not override it. The recommended default is one worker per
/// storage node (`worker_count = nodes`); this is a fallback
/// for when the node count is not yet known.
#[derive(Debug)]
pub struct Config {
    cache_node_colorings: bool,
    default_dispatch_concurrency: usize,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Self {
            cache_node_colorings: true,
            default_dispatch_concurrency: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

impl Config {
    /// Get the [cache node colorings](#cache-node-colorings) configuration.
    #[must_use]
    pub fn cache_node_colorings(&self) -> bool {
        self.cache_node_colorings
    }

    /// Set the [cache node colorings](#cache-node-colorings) configuration.
    pub fn set_cache_node_colorings(&mut self, enabled: bool) {
        self.cache_node_colorings = enabled;
    }

    /// Get the [default dispatch concurrency](#default-dispatch-concurrency) configuration.
    #[must_use]
    pub fn default_dispatch_concurrency(&self) -> usize {
        self.default_dispatch_concurrency
    }

    /// Set the [default dispatch concurrency](#default-dispatch-concurrency) configuration.
    pub fn set_default_dispatch_concurrency(&mut self, concurrency: usize) {
        self.default_dispatch_concurrency = concurrency;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global placement-engine configuration.
///
/// # Panics
/// Panics if the underlying lock has been poisoned.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global placement-engine configuration.
///
/// # Panics
/// Panics if the underlying lock has been poisoned.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

/// The write mode for a placement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Production placement: one destination per sub-array, colored by [`crate::coloring`].
    Production,
    /// Backup placement: the production plan with the node list rotated by one step.
    Backup,
    /// Enumerate and (after operator confirmation) delete existing backups.
    DeleteBackup,
}

/// The typed form of the configuration a run of the core is parameterized
/// by. Loading this from a file or the command line is an external,
/// out-of-scope concern; this struct and its [`validate`](Self::validate)
/// are the core's actual contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Prefix used in chunk names and directory names.
    pub dataset_name: String,
    /// Side length of the source array (must be a power of two).
    pub source_side: u64,
    /// Side length of each output sub-array; must divide `source_side`.
    pub sub_array_side: u64,
    /// Side length of inner chunks within each sub-array; must divide `sub_array_side`.
    pub chunk_side: u64,
    /// Inclusive range of timesteps to process: `[start_timestep, end_timestep]`.
    pub start_timestep: u32,
    /// See [`start_timestep`](Self::start_timestep).
    pub end_timestep: u32,
    /// The write mode for this run.
    pub write_mode: WriteMode,
    /// Degree of dispatcher parallelism. `0` means "use [`Config::default_dispatch_concurrency`]".
    pub worker_count: usize,
    /// Size of the storage fleet; placement requires `nodes >= 27`.
    pub nodes: usize,
}

impl PlacementConfig {
    /// The number of sub-arrays per axis: `N = source_side / sub_array_side`.
    #[must_use]
    pub fn grid_side(&self) -> u64 {
        if self.sub_array_side == 0 {
            0
        } else {
            self.source_side / self.sub_array_side
        }
    }

    /// Validate every configuration invariant, returning *all* violations
    /// at once rather than stopping at the first — useful for surfacing
    /// every problem in a single diagnostic pass.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("source_side", self.source_side),
            ("sub_array_side", self.sub_array_side),
            ("chunk_side", self.chunk_side),
        ] {
            if !value.is_power_of_two() {
                errors.push(ConfigError::NotPowerOfTwo { field, value });
            }
        }

        if self.sub_array_side != 0
            && self.source_side.is_power_of_two()
            && self.sub_array_side.is_power_of_two()
            && self.source_side % self.sub_array_side != 0
        {
            errors.push(ConfigError::SubArraySideDoesNotDivideSource {
                l: self.source_side,
                s: self.sub_array_side,
            });
        }

        if self.chunk_side != 0
            && self.sub_array_side.is_power_of_two()
            && self.chunk_side.is_power_of_two()
            && self.sub_array_side % self.chunk_side != 0
        {
            errors.push(ConfigError::ChunkSideDoesNotDivideSubArray {
                s: self.sub_array_side,
                c: self.chunk_side,
            });
        }

        if self.nodes < 27 {
            errors.push(ConfigError::InsufficientNodes { m: self.nodes });
        }

        if self.dataset_name.trim().is_empty() {
            errors.push(ConfigError::MissingSource {
                dataset: self.dataset_name.clone(),
                timestep: self.start_timestep,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
