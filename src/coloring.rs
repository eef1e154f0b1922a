//! Node colorer: deterministic, load-balanced assignment of node ids to
//! cells of an `N x N x N` grid such that no two cells sharing a 3x3x3
//! neighborhood share a color.
//!
//! A greedy row-major sweep picks, among colors unused in the clipped
//! neighborhood, the least-used color, breaking ties by smallest id.

use std::sync::Arc;

use ndarray::Array3;
use tracing::debug;

use crate::error::ConfigError;

/// A computed node coloring for an `N x N x N` grid.
///
/// Cheap to clone (an `Arc`-wrapped array), so callers can cache it across
/// timesteps per [`crate::config::Config::cache_node_colorings`].
#[derive(Debug, Clone)]
pub struct NodeColoring {
    grid: Arc<Array3<u32>>,
    n: usize,
    m: usize,
}

impl NodeColoring {
    /// The grid side `N` this coloring was computed for.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// The number of nodes `M` this coloring was computed for.
    #[must_use]
    pub fn m(&self) -> usize {
        self.m
    }

    /// The color (node id, `1..=m`) assigned to cell `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the index is out of bounds for `N`.
    #[must_use]
    pub fn color_at(&self, i: usize, j: usize, k: usize) -> u32 {
        self.grid[[i, j, k]]
    }

    /// The color at a given row-major flattened slot (`0`-based).
    #[must_use]
    pub fn color_at_flat(&self, slot0: usize) -> u32 {
        let n = self.n;
        let i = slot0 / (n * n);
        let j = (slot0 / n) % n;
        let k = slot0 % n;
        self.color_at(i, j, k)
    }

    /// The per-color assignment counts, 1-indexed by color in `1..=m`.
    #[must_use]
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.m];
        for &color in &self.grid {
            counts[color as usize - 1] += 1;
        }
        counts
    }

    /// Compute the greedy, load-balanced node coloring for an `N x N x N`
    /// grid over `M` nodes.
    ///
    /// Iterates cells in row-major order (`i` slowest, `k` fastest). For
    /// each cell, forms the set of colors already used in its clipped
    /// 3x3x3 neighborhood and picks the least-used remaining color,
    /// breaking ties by smallest node id.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyGrid`] if `n == 0`, or
    /// [`ConfigError::InsufficientNodes`] if `m < 27` (the neighborhood
    /// exclusion constraint cannot be satisfied with fewer nodes).
    pub fn assign(n: usize, m: usize) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::EmptyGrid { n });
        }
        if m < 27 {
            return Err(ConfigError::InsufficientNodes { m });
        }

        let mut grid = Array3::<u32>::zeros((n, n, n));
        let mut counts = vec![0usize; m];

        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let (i_lo, i_hi) = neighborhood_bounds(i, n);
                    let (j_lo, j_hi) = neighborhood_bounds(j, n);
                    let (k_lo, k_hi) = neighborhood_bounds(k, n);

                    let mut used = vec![false; m + 1];
                    for ni in i_lo..i_hi {
                        for nj in j_lo..j_hi {
                            for nk in k_lo..k_hi {
                                let c = grid[[ni, nj, nk]];
                                if c != 0 {
                                    used[c as usize] = true;
                                }
                            }
                        }
                    }

                    let mut best: Option<(usize, usize)> = None; // (count, color)
                    for color in 1..=m {
                        if used[color] {
                            continue;
                        }
                        let count = counts[color - 1];
                        if best.map_or(true, |(bc, bcolor)| {
                            count < bc || (count == bc && color < bcolor)
                        }) {
                            best = Some((count, color));
                        }
                    }

                    let (_, color) = best.expect(
                        "a free color always exists: the clipped neighborhood has at most 26 occupied cells and m >= 27",
                    );
                    grid[[i, j, k]] = color as u32;
                    counts[color - 1] += 1;
                }
            }
        }

        debug!(n, m, "computed node coloring");

        Ok(Self {
            grid: Arc::new(grid),
            n,
            m,
        })
    }
}

/// The clipped `[lo, hi)` bounds of the neighborhood along one axis.
fn neighborhood_bounds(idx: usize, n: usize) -> (usize, usize) {
    let lo = idx.saturating_sub(1);
    let hi = (idx + 2).min(n);
    (lo, hi)
}
