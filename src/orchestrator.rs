//! Orchestrator (C8): composes the splitter, planner and dispatcher for one
//! timestep, and drives a contiguous range of timesteps sequentially,
//! building the chunk list then dispatching writes before moving on to
//! the next timestep.

use std::sync::Arc;

use tracing::{info_span, warn};

use crate::coloring::NodeColoring;
use crate::config::{global_config, PlacementConfig, WriteMode};
use crate::dispatcher::{CancellationFlag, DispatchSummary, WriteDispatcher};
use crate::error::{ConfigError, CoreError, SourceError};
use crate::fleet::Fleet;
use crate::namer::ChunkNamer;
use crate::planner::PlacementPlanner;
use crate::source::SourceAdapter;
use crate::splitter::{Splitter, SplitterConfig};
use crate::store::SubArrayStore;

/// The outcome of a single run, mapped to a process exit code.
#[derive(Debug)]
pub enum CoreOutcome {
    /// Every timestep's every job succeeded.
    Success,
    /// A configuration error was detected before any work was dispatched.
    ConfigurationError(ConfigError),
    /// Dispatch ran, but one or more jobs failed across all timesteps.
    PartialFailure {
        /// Total number of job failures across every timestep processed.
        failed: usize,
        /// Per-timestep dispatch summaries, in timestep order.
        summaries: Vec<(u32, DispatchSummary)>,
    },
    /// The run was cut short by a cooperative cancellation request.
    OperatorAborted {
        /// Per-timestep dispatch summaries completed before cancellation.
        summaries: Vec<(u32, DispatchSummary)>,
    },
}

impl CoreOutcome {
    /// The process exit code this outcome corresponds to: `0` success,
    /// `1` configuration error, `2` partial failure, `130` operator abort.
    /// Calling `std::process::exit` with it is a CLI concern, left to the
    /// caller.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ConfigurationError(_) => 1,
            Self::PartialFailure { .. } => 2,
            Self::OperatorAborted { .. } => 130,
        }
    }
}

/// Drives the C4 (split) -> C5 (plan) -> C6 (dispatch) pipeline for a
/// dataset, reusing [`NodeColoring`] across timesteps per
/// [`crate::config::Config::cache_node_colorings`].
pub struct Orchestrator {
    source: Arc<dyn SourceAdapter>,
    store: Arc<dyn SubArrayStore>,
    fleet: Fleet,
    splitter: Splitter,
    coloring: NodeColoring,
}

impl Orchestrator {
    /// Build an orchestrator for one dataset/fleet pair. Computes the node
    /// coloring once, since it is a pure function of `(N, M)`.
    ///
    /// # Errors
    /// Returns a [`CoreError`] if `config` fails validation or the
    /// neighborhood-exclusion coloring cannot be computed.
    pub fn new(
        config: &PlacementConfig,
        source: Arc<dyn SourceAdapter>,
        store: Arc<dyn SubArrayStore>,
        fleet: Fleet,
        splitter_config: SplitterConfig,
    ) -> Result<Self, CoreError> {
        config.validate().map_err(|mut errors| {
            CoreError::Config(errors.pop().expect("validate() only returns Err with >=1 error"))
        })?;

        let n = usize::try_from(config.grid_side()).unwrap_or(usize::MAX);
        let coloring = NodeColoring::assign(n, config.nodes)?;
        let splitter = Splitter::new(splitter_config);

        Ok(Self {
            source,
            store,
            fleet,
            splitter,
            coloring,
        })
    }

    /// Run one timestep: split, plan, dispatch. Never itself returns an
    /// `Err` for per-job write failures — those surface in the returned
    /// [`DispatchSummary`].
    ///
    /// # Errors
    /// Returns a [`SourceError`] if splitting the source for `timestep`
    /// fails, or a [`ConfigError`] if planning fails (foreign chunk range,
    /// oversized path component, or `config.write_mode` is
    /// [`WriteMode::DeleteBackup`], which has no destination path of its
    /// own and must go through [`crate::backup::BackupMirror`] instead).
    pub fn run_timestep(
        &self,
        config: &PlacementConfig,
        timestep: u32,
        cancel: &CancellationFlag,
    ) -> Result<DispatchSummary, CoreError> {
        let span = info_span!("timestep", dataset = %config.dataset_name, timestep);
        let _guard = span.enter();

        let split = self.splitter.split(&self.source, config.sub_array_side).map_err(CoreError::Config)?;

        let side = config.source_side;
        let namer = ChunkNamer::build(&config.dataset_name, side, &split.ranges).map_err(CoreError::Config)?;

        let jobs = PlacementPlanner::plan(
            &config.dataset_name,
            timestep,
            config.write_mode,
            &split,
            &namer,
            &self.coloring,
            &self.fleet,
        )
        .map_err(CoreError::Config)?;

        let parallelism = if config.worker_count == 0 {
            global_config().default_dispatch_concurrency()
        } else {
            config.worker_count
        };

        let summary = WriteDispatcher::new(parallelism).run(jobs, self.store.as_ref(), cancel);
        if !summary.is_clean() {
            warn!(failed = summary.failed.len(), cancelled = summary.cancelled, "timestep finished with failures");
        }
        Ok(summary)
    }

    /// Run every timestep in `[start, end]` sequentially — timesteps are
    /// never parallelized against each other, only the job batch within
    /// one timestep is.
    ///
    /// Stops early if `cancel` is observed set after a timestep completes.
    pub fn run_range(
        &self,
        config: &PlacementConfig,
        start: u32,
        end: u32,
        cancel: &CancellationFlag,
    ) -> Result<CoreOutcome, CoreError> {
        let mut summaries = Vec::new();
        let mut total_failed = 0usize;

        for timestep in start..=end {
            let summary = self.run_timestep(config, timestep, cancel)?;
            total_failed += summary.failed.len();
            let cancelled = summary.cancelled;
            summaries.push((timestep, summary));
            if cancelled {
                return Ok(CoreOutcome::OperatorAborted { summaries });
            }
        }

        if total_failed == 0 {
            Ok(CoreOutcome::Success)
        } else {
            Ok(CoreOutcome::PartialFailure {
                failed: total_failed,
                summaries,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Node;
    use crate::namer::CellRange;
    use crate::source::VariableData;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;

    struct FakeSource {
        side: u64,
    }
    impl SourceAdapter for FakeSource {
        fn side(&self) -> u64 {
            self.side
        }
        fn available_variables(&self) -> Vec<String> {
            vec!["p".into()]
        }
        fn read_region(&self, _v: &str, range: &CellRange) -> Result<VariableData, SourceError> {
            let n = (range.x.end - range.x.start) * (range.y.end - range.y.start) * (range.z.end - range.z.start);
            Ok(VariableData {
                values: vec![1.0; n as usize].into(),
                shape: (1, 1, 1),
            })
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        written: Mutex<HashSet<PathBuf>>,
    }
    impl SubArrayStore for RecordingStore {
        fn write_sub_array(
            &self,
            destination: &crate::path::DestinationPath,
            _view: &crate::splitter::SubArrayView,
        ) -> Result<(), String> {
            self.written.lock().insert(destination.full_path());
            Ok(())
        }
        fn list_children(&self, _node_base: &Path) -> Result<Vec<String>, String> {
            Ok(vec![])
        }
        fn copy_tree(&self, _s: &Path, _d: &Path) -> Result<(), String> {
            Ok(())
        }
        fn delete_tree(&self, _p: &Path) -> Result<(), String> {
            Ok(())
        }
    }

    fn reference_config() -> PlacementConfig {
        PlacementConfig {
            dataset_name: "demo".to_string(),
            source_side: 8,
            sub_array_side: 4,
            chunk_side: 2,
            start_timestep: 0,
            end_timestep: 1,
            write_mode: WriteMode::Production,
            worker_count: 2,
            nodes: 27,
        }
    }

    fn orchestrator(config: &PlacementConfig) -> Orchestrator {
        let source: Arc<dyn SourceAdapter> = Arc::new(FakeSource { side: config.source_side });
        let store: Arc<dyn SubArrayStore> = Arc::new(RecordingStore::default());
        let fleet = Fleet::new((1..=config.nodes).map(|i| Node::new(format!("/data/n{i}"))).collect());
        Orchestrator::new(config, source, store, fleet, SplitterConfig::reference_deployment(2)).unwrap()
    }

    #[test]
    fn run_timestep_dispatches_every_sub_array() {
        let config = reference_config();
        let orch = orchestrator(&config);
        let cancel: CancellationFlag = Arc::new(AtomicBool::new(false));
        let summary = orch.run_timestep(&config, 0, &cancel).unwrap();
        assert_eq!(summary.total, 8); // N=2 -> 8 sub-arrays
        assert!(summary.is_clean());
    }

    #[test]
    fn run_range_is_success_when_every_timestep_is_clean() {
        let config = reference_config();
        let orch = orchestrator(&config);
        let cancel: CancellationFlag = Arc::new(AtomicBool::new(false));
        let outcome = orch.run_range(&config, 0, 1, &cancel).unwrap();
        assert!(matches!(outcome, CoreOutcome::Success));
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn run_range_stops_on_cancellation() {
        let config = reference_config();
        let orch = orchestrator(&config);
        let cancel: CancellationFlag = Arc::new(AtomicBool::new(true));
        let outcome = orch.run_range(&config, 0, 3, &cancel).unwrap();
        match outcome {
            CoreOutcome::OperatorAborted { summaries } => assert_eq!(summaries.len(), 1),
            other => panic!("expected OperatorAborted, got {other:?}"),
        }
    }

    #[test]
    fn delete_backup_write_mode_is_rejected_not_dispatched() {
        let mut config = reference_config();
        config.write_mode = WriteMode::DeleteBackup;
        let orch = orchestrator(&config);
        let cancel: CancellationFlag = Arc::new(AtomicBool::new(false));
        let result = orch.run_timestep(&config, 0, &cancel);
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::NotADispatchableWriteMode { mode: WriteMode::DeleteBackup }))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_any_dispatch() {
        let mut config = reference_config();
        config.nodes = 10;
        let source: Arc<dyn SourceAdapter> = Arc::new(FakeSource { side: config.source_side });
        let store: Arc<dyn SubArrayStore> = Arc::new(RecordingStore::default());
        let fleet = Fleet::new((1..=config.nodes).map(|i| Node::new(format!("/data/n{i}"))).collect());
        let result = Orchestrator::new(&config, source, store, fleet, SplitterConfig::reference_deployment(2));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
