//! The source-adapter seam: reading the input file format is explicitly
//! out of scope; only this interface matters to the core.
//!
//! A concrete adapter resolves a dataset/timestep to an open handle over a
//! self-describing multi-variable 3D array and answers region reads for
//! the variables the [`crate::splitter::Splitter`] asks for. The core never
//! inspects the underlying file format.

use std::sync::Arc;

use crate::error::SourceError;
use crate::namer::CellRange;

/// A single variable's voxel data for one cell range, as raw native-endian
/// `f32` values in `(x, y, z)`-fastest-last row-major order (matching the
/// splitter's axis-normalized iteration order).
#[derive(Debug, Clone)]
pub struct VariableData {
    /// Flattened voxel values, length `dx * dy * dz`.
    pub values: Arc<[f32]>,
    /// The shape this slice of `values` represents, `(dx, dy, dz)`.
    pub shape: (u64, u64, u64),
}

impl VariableData {
    /// The number of scalar elements in this block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether this block holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An open handle over one timestep of a source dataset.
///
/// Implementations must be safe for concurrent reads — the core treats
/// this as a backend property and does not serialize reads itself; if a
/// concrete adapter cannot support concurrent reads, it must hand out one
/// handle per worker instead of sharing `self`.
pub trait SourceAdapter: Send + Sync {
    /// The side length `L` of the source cube, for this timestep.
    fn side(&self) -> u64;

    /// The raw (pre-merge, pre-rename) variable names present in the
    /// source, e.g. `["u", "v", "w", "p", "t", "e"]`. Variables the
    /// splitter's alias/merge policy does not recognize are left alone;
    /// variables the policy expects but which are absent here are simply
    /// skipped by the splitter, never synthesized with zeros.
    fn available_variables(&self) -> Vec<String>;

    /// Read one raw variable's voxel data over a cell range.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the read fails or `variable` is unknown
    /// to this source.
    fn read_region(&self, variable: &str, range: &CellRange) -> Result<VariableData, SourceError>;
}
