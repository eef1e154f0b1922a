//! Placement planner (C5): composes the node colorer, namer, space-filling
//! index and fleet directory listing into an ordered list of
//! `(sub-array, destination path)` pairs for one timestep.

use tracing::debug;

use crate::coloring::NodeColoring;
use crate::config::WriteMode;
use crate::error::ConfigError;
use crate::fleet::Fleet;
use crate::namer::ChunkNamer;
use crate::path::{DestinationPath, PathMode};
use crate::splitter::{SplitOutput, SubArrayView};

/// One planned write: a sub-array view paired with its resolved destination.
pub struct PlacementJob {
    /// The sub-array to materialize.
    pub view: SubArrayView,
    /// The chunk name this sub-array was assigned (Morton-rank slot).
    pub chunk_name: String,
    /// Where to write it.
    pub destination: DestinationPath,
}

/// Composes C1 (via [`ChunkNamer`]), C2 ([`NodeColoring`]), C3
/// ([`ChunkNamer`] again) and the [`Fleet`] directory listing to produce a
/// placement plan for one timestep.
pub struct PlacementPlanner;

impl PlacementPlanner {
    /// Plan destinations for one timestep's split output.
    ///
    /// The splitter's iteration order is preserved in the returned job
    /// list — only the *name* assignment (via `namer`) uses Morton order;
    /// jobs themselves are never re-sorted.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if a cell range cannot be resolved to a
    /// chunk name, or a destination path's components do not fit the
    /// fixed-width format.
    pub fn plan(
        dataset: &str,
        timestep: u32,
        write_mode: WriteMode,
        split: &SplitOutput,
        namer: &ChunkNamer,
        coloring: &NodeColoring,
        fleet: &Fleet,
    ) -> Result<Vec<PlacementJob>, ConfigError> {
        let base_fleet = match write_mode {
            WriteMode::Production => fleet.clone(),
            WriteMode::Backup => fleet.rotated_for_backup(),
            WriteMode::DeleteBackup => {
                return Err(ConfigError::NotADispatchableWriteMode { mode: write_mode });
            }
        };
        let path_mode = PathMode::try_from(write_mode)?;

        let mut jobs = Vec::with_capacity(split.views.len());
        for (view, range) in split.views.iter().zip(split.ranges.iter()) {
            let side = coloring.n() as u64 * range_side(range);
            let chunk_name = namer.name_for_range(range, side)?;
            let slot = namer
                .slot_for_name(chunk_name)
                .ok_or(ConfigError::SlotOutOfRange {
                    slot: 0,
                    n_cubed: namer.len(),
                })?;

            let color = coloring.color_at_flat(slot - 1);
            let node = base_fleet
                .node(color as usize)
                .ok_or(ConfigError::SlotOutOfRange {
                    slot: color as usize,
                    n_cubed: base_fleet.len(),
                })?;

            let destination = DestinationPath::new(
                node.path(),
                dataset,
                u32::try_from(slot).unwrap_or(u32::MAX),
                path_mode,
                timestep,
            )?;

            jobs.push(PlacementJob {
                view: view.clone(),
                chunk_name: chunk_name.to_string(),
                destination,
            });
        }

        debug!(dataset, timestep, jobs = jobs.len(), ?write_mode, "planned placement");

        Ok(jobs)
    }
}

fn range_side(range: &crate::namer::CellRange) -> u64 {
    // The cell range's own side; the full source side is `N * S`, but the
    // namer only needs a side large enough to pack the range's corners,
    // which `N * S` (computed by the caller as `coloring.n() * S`) provides.
    range.x.end - range.x.start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Node;
    use crate::namer::CellRange;
    use crate::source::{SourceAdapter, VariableData};
    use crate::splitter::{Splitter, SplitterConfig};
    use std::sync::Arc;

    struct FakeSource;
    impl SourceAdapter for FakeSource {
        fn side(&self) -> u64 {
            8
        }
        fn available_variables(&self) -> Vec<String> {
            vec!["u".into(), "v".into(), "w".into(), "p".into()]
        }
        fn read_region(&self, _v: &str, range: &CellRange) -> Result<VariableData, crate::error::SourceError> {
            let n = (range.x.end - range.x.start) * (range.y.end - range.y.start) * (range.z.end - range.z.start);
            Ok(VariableData {
                values: vec![0.0; n as usize].into(),
                shape: (
                    range.x.end - range.x.start,
                    range.y.end - range.y.start,
                    range.z.end - range.z.start,
                ),
            })
        }
    }

    fn fleet(m: usize) -> Fleet {
        Fleet::new((1..=m).map(|i| Node::new(format!("/data/n{i}"))).collect())
    }

    #[test]
    fn placement_is_bijective_for_small_cube() {
        let source: Arc<dyn SourceAdapter> = Arc::new(FakeSource);
        let splitter = Splitter::new(SplitterConfig::reference_deployment(2));
        let split = splitter.split(&source, 4).unwrap(); // N=2, 8 sub-arrays
        let namer = ChunkNamer::build("tiny", 8, &split.ranges).unwrap();
        let coloring = NodeColoring::assign(2, 27).unwrap();
        let fleet = fleet(27);

        let jobs = PlacementPlanner::plan(
            "tiny",
            1,
            WriteMode::Production,
            &split,
            &namer,
            &coloring,
            &fleet,
        )
        .unwrap();

        assert_eq!(jobs.len(), 8);
        let mut destinations: Vec<_> = jobs.iter().map(|j| j.destination.full_path()).collect();
        destinations.sort();
        destinations.dedup();
        assert_eq!(destinations.len(), 8, "every sub-array must have a unique destination");
    }

    #[test]
    fn backup_rotation_matches_production_plus_one() {
        let source: Arc<dyn SourceAdapter> = Arc::new(FakeSource);
        let splitter = Splitter::new(SplitterConfig::reference_deployment(2));
        let split = splitter.split(&source, 4).unwrap();
        let namer = ChunkNamer::build("tiny", 8, &split.ranges).unwrap();
        let coloring = NodeColoring::assign(2, 27).unwrap();
        let fleet = fleet(27);

        let prod = PlacementPlanner::plan(
            "tiny",
            1,
            WriteMode::Production,
            &split,
            &namer,
            &coloring,
            &fleet,
        )
        .unwrap();
        let back = PlacementPlanner::plan(
            "tiny",
            1,
            WriteMode::Backup,
            &split,
            &namer,
            &coloring,
            &fleet,
        )
        .unwrap();

        for (p, b) in prod.iter().zip(back.iter()) {
            assert_eq!(p.chunk_name, b.chunk_name);
            let expected = fleet.backup_node_for(
                fleet
                    .nodes()
                    .iter()
                    .position(|n| p.destination.node_base() == n.path())
                    .unwrap()
                    + 1,
            );
            assert_eq!(b.destination.node_base(), expected.unwrap().path());
        }
    }

    #[test]
    fn delete_backup_is_rejected_not_dispatched() {
        let source: Arc<dyn SourceAdapter> = Arc::new(FakeSource);
        let splitter = Splitter::new(SplitterConfig::reference_deployment(2));
        let split = splitter.split(&source, 4).unwrap();
        let namer = ChunkNamer::build("tiny", 8, &split.ranges).unwrap();
        let coloring = NodeColoring::assign(2, 27).unwrap();
        let fleet = fleet(27);

        let result = PlacementPlanner::plan(
            "tiny",
            1,
            WriteMode::DeleteBackup,
            &split,
            &namer,
            &coloring,
            &fleet,
        );

        assert!(matches!(
            result,
            Err(ConfigError::NotADispatchableWriteMode { mode: WriteMode::DeleteBackup })
        ));
    }
}
