//! Sub-array namer: a bidirectional mapping between chunk names and
//! `(min_key, max_key)` Morton-key pairs.
//!
//! Sub-array ranges are sorted by the Morton key of their first corner,
//! then assigned `<prefix><index>` names in that order.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::ConfigError;
use crate::morton::{morton_pack, MortonKey};

/// A cell's coordinate range: three half-open intervals in voxel units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    /// Range along x.
    pub x: Range<u64>,
    /// Range along y.
    pub y: Range<u64>,
    /// Range along z.
    pub z: Range<u64>,
}

impl CellRange {
    /// Construct a cell range from three half-open intervals.
    #[must_use]
    pub fn new(x: Range<u64>, y: Range<u64>, z: Range<u64>) -> Self {
        Self { x, y, z }
    }

    fn min_key(&self, side: u64) -> Result<MortonKey, ConfigError> {
        morton_pack(side, self.x.start, self.y.start, self.z.start)
    }

    fn max_key(&self, side: u64) -> Result<MortonKey, ConfigError> {
        morton_pack(side, self.x.end - 1, self.y.end - 1, self.z.end - 1)
    }
}

/// The bidirectional chunk-name <-> Morton-key-pair mapping for one
/// `(side, sub_array_side, prefix)` triple.
///
/// Pure function of its inputs; safe to cache across timesteps.
#[derive(Debug, Clone)]
pub struct ChunkNamer {
    /// `(min_key, max_key, name)`, sorted ascending by `min_key` — this is
    /// also the name assignment order (`names[i]` is `prefix<i+1>`).
    by_slot: Vec<(MortonKey, MortonKey, String)>,
    name_to_slot: HashMap<String, usize>,
}

impl ChunkNamer {
    /// Build the namer for the given cell ranges, over a source of side
    /// `side`, with chunk names of the form `<prefix><NN>`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if `side` is not a power of two or any
    /// range's corner falls outside `[0, side)`.
    pub fn build(prefix: &str, side: u64, ranges: &[CellRange]) -> Result<Self, ConfigError> {
        let mut keyed = Vec::with_capacity(ranges.len());
        for range in ranges {
            keyed.push((range.min_key(side)?, range.max_key(side)?));
        }
        keyed.sort_unstable();

        let n_cubed = ranges.len();
        if n_cubed > 99 {
            return Err(ConfigError::PathComponentTooWide {
                value: n_cubed as u64,
                digits: 2,
            });
        }
        let mut by_slot = Vec::with_capacity(n_cubed);
        let mut name_to_slot = HashMap::with_capacity(n_cubed);
        for (idx, (min_key, max_key)) in keyed.into_iter().enumerate() {
            let name = format!("{prefix}{:02}", idx + 1);
            name_to_slot.insert(name.clone(), idx);
            by_slot.push((min_key, max_key, name));
        }

        Ok(Self {
            by_slot,
            name_to_slot,
        })
    }

    /// Total number of named sub-arrays (`N^3`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    /// Whether this namer covers zero sub-arrays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }

    /// The chunk name for the sub-array ranked `slot` (1-based) in Morton order.
    #[must_use]
    pub fn name_for_slot(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|i| self.by_slot.get(i))
            .map(|(_, _, name)| name.as_str())
    }

    /// The 1-based slot for a given chunk name.
    #[must_use]
    pub fn slot_for_name(&self, name: &str) -> Option<usize> {
        self.name_to_slot.get(name).map(|i| i + 1)
    }

    /// Resolve a cell's chunk name from its `(min_key, max_key)` pair,
    /// computed with the same Morton convention this namer was built with.
    ///
    /// # Errors
    /// Returns [`ConfigError::SlotOutOfRange`] if the range is foreign to
    /// this namer (not found in the bijection).
    pub fn name_for_range(&self, range: &CellRange, side: u64) -> Result<&str, ConfigError> {
        let min_key = range.min_key(side)?;
        let max_key = range.max_key(side)?;
        self.by_slot
            .iter()
            .position(|(mn, mx, _)| *mn == min_key && *mx == max_key)
            .map(|i| self.by_slot[i].2.as_str())
            .ok_or(ConfigError::SlotOutOfRange {
                slot: 0,
                n_cubed: self.by_slot.len(),
            })
    }
}
