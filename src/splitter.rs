//! Splitter: slices a large 3D multi-variable source array into an
//! `N x N x N` grid of equal sub-arrays with a declared inner chunk layout.
//!
//! The velocity triple is stacked into one trailing-axis-3 variable, the
//! abbreviated scalar fields are renamed, then the cube is tiled into
//! equal sub-arrays. The tagged `Variable` enum below replaces stringly-typed
//! dispatch over variable names — the set of recognized short names is
//! data ([`SplitterConfig::alias_map`]), not compiled-in constants.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::iproduct;
use tracing::{debug, trace};

use crate::error::{ConfigError, SourceError};
use crate::namer::CellRange;
use crate::source::{SourceAdapter, VariableData};

/// How one output variable is assembled from the source's raw variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// The three velocity components, stacked into one trailing-axis-3 variable.
    Velocity {
        /// Raw source variable name for the x-component (conventionally `u`).
        u: String,
        /// Raw source variable name for the y-component (conventionally `v`).
        v: String,
        /// Raw source variable name for the z-component (conventionally `w`).
        w: String,
    },
    /// A scalar field, renamed via the alias map, with a trailing axis of length 1.
    Scalar {
        /// Raw source variable name (e.g. `p`).
        raw_name: String,
        /// Declared output name (e.g. `pressure`).
        declared_name: String,
    },
}

impl Variable {
    /// The declared output name for this variable.
    #[must_use]
    pub fn declared_name(&self) -> &str {
        match self {
            Self::Velocity { .. } => "velocity",
            Self::Scalar { declared_name, .. } => declared_name,
        }
    }

    /// The trailing axis length: 3 for velocity, 1 for scalars.
    #[must_use]
    pub fn trailing(&self) -> u32 {
        match self {
            Self::Velocity { .. } => 3,
            Self::Scalar { .. } => 1,
        }
    }
}

/// The writer-side inner chunk layout for one variable: `(C, C, C, trailing)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkShape {
    /// Side length of the cubic part of the chunk.
    pub c: u64,
    /// Trailing axis length (3 for velocity, 1 for scalars).
    pub trailing: u32,
}

/// Policy configuration for the splitter: which raw variables exist, how
/// they merge/rename, and the declared chunk side. This is data, not code
/// — recognized short names are configuration, never compiled in.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Raw names of the three velocity components, in `(u, v, w)` order.
    pub velocity_components: (String, String, String),
    /// Raw short name -> declared long name, for scalar fields (e.g. `p -> pressure`).
    pub alias_map: HashMap<String, String>,
    /// Inner chunk side `C`; must divide the sub-array side `S`.
    pub chunk_side: u64,
}

impl SplitterConfig {
    /// The alias map used by the reference NCAR turbulence deployment:
    /// `e -> energy`, `t -> temperature`, `p -> pressure`.
    #[must_use]
    pub fn reference_deployment(chunk_side: u64) -> Self {
        let alias_map = [
            ("e".to_string(), "energy".to_string()),
            ("t".to_string(), "temperature".to_string()),
            ("p".to_string(), "pressure".to_string()),
        ]
        .into_iter()
        .collect();
        Self {
            velocity_components: ("u".to_string(), "v".to_string(), "w".to_string()),
            alias_map,
            chunk_side,
        }
    }

    /// Resolve the ordered list of [`Variable`]s this configuration produces
    /// given which raw variables are actually present in the source.
    /// Variables the config expects but which are absent are skipped, not
    /// synthesized with zeros.
    fn resolve_variables(&self, available: &[String]) -> Vec<Variable> {
        let mut variables = Vec::new();
        let (u, v, w) = &self.velocity_components;
        if [u, v, w].iter().all(|name| available.iter().any(|a| a == *name)) {
            variables.push(Variable::Velocity {
                u: u.clone(),
                v: v.clone(),
                w: w.clone(),
            });
        }
        let mut scalar_names: Vec<_> = self.alias_map.keys().collect();
        scalar_names.sort(); // deterministic iteration order regardless of HashMap layout
        for raw_name in scalar_names {
            if available.iter().any(|a| a == raw_name) {
                variables.push(Variable::Scalar {
                    raw_name: raw_name.clone(),
                    declared_name: self.alias_map[raw_name].clone(),
                });
            }
        }
        variables
    }
}

/// A lazily-materialized view over one sub-array of the source.
///
/// No voxel data is read until [`materialize`](Self::materialize) is
/// called, because the full materialized set would exceed memory
/// (`N^3 * S^3` per variable).
#[derive(Clone)]
pub struct SubArrayView {
    source: Arc<dyn SourceAdapter>,
    range: CellRange,
    variables: Arc<[Variable]>,
    chunk_side: u64,
}

impl SubArrayView {
    /// The cell coordinate range this view covers.
    #[must_use]
    pub fn range(&self) -> &CellRange {
        &self.range
    }

    /// The variables this view declares, in deterministic order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The declared inner chunk shape for a given variable.
    #[must_use]
    pub fn chunk_shape_for(&self, variable: &Variable) -> ChunkShape {
        ChunkShape {
            c: self.chunk_side,
            trailing: variable.trailing(),
        }
    }

    /// Read through this view, producing one [`VariableData`] block per
    /// declared variable (velocity pre-stacked as if it were a single
    /// trailing-axis-3 read: callers that need the raw three components
    /// separately should read the source directly).
    ///
    /// This is the single point at which voxel bytes are actually read;
    /// the dispatcher's backend calls this once per job.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if any underlying region read fails.
    pub fn materialize(&self) -> Result<Vec<(String, VariableData)>, SourceError> {
        let mut out = Vec::with_capacity(self.variables.len());
        for variable in self.variables.iter() {
            trace!(variable = variable.declared_name(), "materializing sub-array variable");
            let data = match variable {
                Variable::Velocity { u, v, w } => {
                    let u_data = self.source.read_region(u, &self.range)?;
                    let v_data = self.source.read_region(v, &self.range)?;
                    let w_data = self.source.read_region(w, &self.range)?;
                    stack_velocity(u_data, v_data, w_data)
                }
                Variable::Scalar { raw_name, .. } => self.source.read_region(raw_name, &self.range)?,
            };
            out.push((variable.declared_name().to_string(), data));
        }
        Ok(out)
    }
}

/// Interleave three equally-shaped scalar blocks into one trailing-axis-3 block.
fn stack_velocity(u: VariableData, v: VariableData, w: VariableData) -> VariableData {
    debug_assert_eq!(u.shape, v.shape);
    debug_assert_eq!(u.shape, w.shape);
    let mut values = Vec::with_capacity(u.len() * 3);
    for i in 0..u.len() {
        values.push(u.values[i]);
        values.push(v.values[i]);
        values.push(w.values[i]);
    }
    VariableData {
        values: values.into(),
        shape: u.shape,
    }
}

/// Splits a source timestep into an `N x N x N` grid of equal sub-arrays.
pub struct Splitter {
    config: SplitterConfig,
}

/// The splitter's output: sub-array views and their cell ranges, in the
/// same deterministic row-major iteration order (`i` slowest, `k` fastest).
/// This order is *not* Morton order — that reordering belongs to
/// [`crate::namer::ChunkNamer`].
pub struct SplitOutput {
    /// Lazily-materialized views, one per sub-array.
    pub views: Vec<SubArrayView>,
    /// The cell range each view covers, matching `views` index-for-index.
    pub ranges: Vec<CellRange>,
}

impl Splitter {
    /// Build a splitter from its policy configuration.
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    /// Tile `source` into an `N x N x N` grid of sub-arrays of side `sub_array_side`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if `sub_array_side` does not divide the
    /// source side, or `chunk_side` does not divide `sub_array_side`, or
    /// either is not a power of two.
    pub fn split(
        &self,
        source: &Arc<dyn SourceAdapter>,
        sub_array_side: u64,
    ) -> Result<SplitOutput, ConfigError> {
        let side = source.side();
        if !side.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "source_side",
                value: side,
            });
        }
        if !sub_array_side.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "sub_array_side",
                value: sub_array_side,
            });
        }
        if sub_array_side == 0 || side % sub_array_side != 0 {
            return Err(ConfigError::SubArraySideDoesNotDivideSource {
                l: side,
                s: sub_array_side,
            });
        }
        if !self.config.chunk_side.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "chunk_side",
                value: self.config.chunk_side,
            });
        }
        if self.config.chunk_side == 0 || sub_array_side % self.config.chunk_side != 0 {
            return Err(ConfigError::ChunkSideDoesNotDivideSubArray {
                s: sub_array_side,
                c: self.config.chunk_side,
            });
        }

        let available = source.available_variables();
        let variables: Arc<[Variable]> = self.config.resolve_variables(&available).into();
        let n = side / sub_array_side;

        debug!(n, sub_array_side, variables = variables.len(), "splitting source timestep");

        let mut views = Vec::with_capacity((n * n * n) as usize);
        let mut ranges = Vec::with_capacity((n * n * n) as usize);
        for (i, j, k) in iproduct!(0..n, 0..n, 0..n) {
            let range = CellRange::new(
                i * sub_array_side..(i + 1) * sub_array_side,
                j * sub_array_side..(j + 1) * sub_array_side,
                k * sub_array_side..(k + 1) * sub_array_side,
            );
            views.push(SubArrayView {
                source: Arc::clone(source),
                range: range.clone(),
                variables: Arc::clone(&variables),
                chunk_side: self.config.chunk_side,
            });
            ranges.push(range);
        }

        Ok(SplitOutput { views, ranges })
    }
}
