//! Backup mirror (C7): copies the production containers of a timestep onto
//! the rotated backup node, and — only with an explicit caller-supplied
//! confirmation token — deletes stale backup containers.
//!
//! Drains a work queue against the storage backend using this crate's
//! own bounded-concurrency convention, shared with [`crate::dispatcher`].

use std::path::PathBuf;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use tracing::{info, warn};

use crate::dispatcher::{CancellationFlag, DispatchSummary};
use crate::error::JobFailure;
use crate::fleet::Fleet;
use crate::store::SubArrayStore;

/// One copy task: a production container and its rotated backup destination.
struct CopyTask {
    source: PathBuf,
    destination: PathBuf,
}

/// Mirrors production containers onto the rotated backup node, and manages
/// deletion of stale backup containers under an explicit confirmation gate.
pub struct BackupMirror {
    parallelism: usize,
}

impl BackupMirror {
    /// Build a mirror bounded to `parallelism` concurrent copies/deletes.
    #[must_use]
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Copy every `<dataset>_<slot>_prod` container on each node to the
    /// corresponding `<dataset>_<slot>_back` container on that node's
    /// rotated backup node: `node(backup) = (node(prod) mod M) + 1`.
    ///
    /// Enumerates children via [`SubArrayStore::list_children`] rather than
    /// requiring the caller to already know which slots exist on which
    /// node — the production layout is the source of truth for what needs
    /// backing up.
    pub fn mirror_production(
        &self,
        store: &dyn SubArrayStore,
        fleet: &Fleet,
        dataset: &str,
        cancel: &CancellationFlag,
    ) -> DispatchSummary {
        let rotated = fleet.rotated_for_backup();
        let prefix = format!("{dataset}_");
        let suffix = "_prod";

        let mut tasks = Vec::new();
        for (idx, node) in fleet.nodes().iter().enumerate() {
            let children = match store.list_children(node.path()) {
                Ok(children) => children,
                Err(cause) => {
                    warn!(node = %node.path().display(), %cause, "failed to list production containers");
                    continue;
                }
            };
            let backup_node = rotated.nodes()[idx].path();
            for child in children {
                let Some(stem) = child.strip_prefix(&prefix).and_then(|s| s.strip_suffix(suffix)) else {
                    continue;
                };
                let backup_dir = format!("{dataset}_{stem}_back");
                tasks.push(CopyTask {
                    source: node.path().join(&child),
                    destination: backup_node.join(backup_dir),
                });
            }
        }

        self.drain_copies(tasks, store, cancel)
    }

    fn drain_copies(
        &self,
        tasks: Vec<CopyTask>,
        store: &dyn SubArrayStore,
        cancel: &CancellationFlag,
    ) -> DispatchSummary {
        let total = tasks.len();
        info!(total, parallelism = self.parallelism, "mirroring production containers");

        let results: Vec<Result<(), JobFailure>> = iter_concurrent_limit!(
            self.parallelism,
            tasks.into_par_iter(),
            map,
            |task: CopyTask| {
                if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                    return Err(JobFailure {
                        destination: task.destination.clone(),
                        cause: "cancelled before copy".to_string(),
                    });
                }
                store
                    .copy_tree(&task.source, &task.destination)
                    .map_err(|cause| JobFailure {
                        destination: task.destination,
                        cause,
                    })
            }
        )
        .collect();

        let failed: Vec<JobFailure> = results.into_iter().filter_map(Result::err).collect();
        let succeeded = total - failed.len();
        let cancelled = cancel.load(std::sync::atomic::Ordering::Relaxed);

        DispatchSummary {
            total,
            succeeded,
            failed,
            cancelled,
        }
    }

    /// List the `<dataset>_<slot>_back` containers on every fleet node that
    /// would be deleted by a deletion pass, without deleting anything.
    ///
    /// The caller (a CLI, typically) presents this list to an operator;
    /// this crate never prompts a terminal itself.
    pub fn plan_deletion(&self, store: &dyn SubArrayStore, fleet: &Fleet, dataset: &str) -> Vec<PathBuf> {
        let prefix = format!("{dataset}_");
        let mut candidates = Vec::new();
        for node in fleet.nodes() {
            let children = match store.list_children(node.path()) {
                Ok(children) => children,
                Err(cause) => {
                    warn!(node = %node.path().display(), %cause, "failed to list backup containers");
                    continue;
                }
            };
            for child in children {
                if child.starts_with(&prefix) && child.ends_with("_back") {
                    candidates.push(node.path().join(child));
                }
            }
        }
        candidates.sort();
        candidates
    }

    /// Delete the containers in `candidates`. Requires
    /// [`DeletionConfirmation::Yes`] — there is no way to construct that
    /// value except by the caller explicitly affirming the deletion after
    /// inspecting [`plan_deletion`](Self::plan_deletion)'s output.
    pub fn delete_confirmed(
        &self,
        store: &dyn SubArrayStore,
        candidates: Vec<PathBuf>,
        confirmation: DeletionConfirmation,
        cancel: &CancellationFlag,
    ) -> DispatchSummary {
        let DeletionConfirmation::Yes = confirmation;

        let total = candidates.len();
        info!(total, "deleting confirmed backup containers");

        let results: Vec<Result<(), JobFailure>> = iter_concurrent_limit!(
            self.parallelism,
            candidates.into_par_iter(),
            map,
            |path: PathBuf| {
                if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                    return Err(JobFailure {
                        destination: path.clone(),
                        cause: "cancelled before delete".to_string(),
                    });
                }
                store.delete_tree(&path).map_err(|cause| JobFailure {
                    destination: path,
                    cause,
                })
            }
        )
        .collect();

        let failed: Vec<JobFailure> = results.into_iter().filter_map(Result::err).collect();
        let succeeded = total - failed.len();
        let cancelled = cancel.load(std::sync::atomic::Ordering::Relaxed);

        DispatchSummary {
            total,
            succeeded,
            failed,
            cancelled,
        }
    }
}

/// A typed affirmation that deletion should proceed. The only way to
/// obtain `Yes` is to construct it explicitly — there is no `From`/parse
/// path from a plain bool, so a caller cannot accidentally wire a default
/// or a deserialized flag straight into a destructive deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionConfirmation {
    /// The operator has reviewed the candidate list and confirmed deletion.
    Yes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Node;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeStore {
        children: HashMap<PathBuf, Vec<String>>,
        copies: Mutex<Vec<(PathBuf, PathBuf)>>,
        deletes: Mutex<Vec<PathBuf>>,
    }

    impl SubArrayStore for FakeStore {
        fn write_sub_array(
            &self,
            _destination: &crate::path::DestinationPath,
            _view: &crate::splitter::SubArrayView,
        ) -> Result<(), String> {
            unimplemented!("not exercised by backup tests")
        }
        fn list_children(&self, node_base: &std::path::Path) -> Result<Vec<String>, String> {
            Ok(self.children.get(node_base).cloned().unwrap_or_default())
        }
        fn copy_tree(&self, source: &std::path::Path, destination: &std::path::Path) -> Result<(), String> {
            self.copies.lock().push((source.to_path_buf(), destination.to_path_buf()));
            Ok(())
        }
        fn delete_tree(&self, path: &std::path::Path) -> Result<(), String> {
            self.deletes.lock().push(path.to_path_buf());
            Ok(())
        }
    }

    fn fleet(m: usize) -> Fleet {
        Fleet::new((1..=m).map(|i| Node::new(format!("/data/n{i}"))).collect())
    }

    #[test]
    fn mirror_copies_to_rotated_node() {
        let f = fleet(3);
        let mut children = HashMap::new();
        children.insert(PathBuf::from("/data/n1"), vec!["demo_01_prod".to_string()]);
        let store = FakeStore {
            children,
            ..Default::default()
        };
        let cancel: CancellationFlag = Arc::new(AtomicBool::new(false));
        let summary = BackupMirror::new(2).mirror_production(&store, &f, "demo", &cancel);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 1);
        let copies = store.copies.lock();
        assert_eq!(copies[0].0, PathBuf::from("/data/n1/demo_01_prod"));
        assert_eq!(copies[0].1, PathBuf::from("/data/n2/demo_01_back"));
    }

    #[test]
    fn plan_deletion_lists_only_backup_containers_for_dataset() {
        let f = fleet(2);
        let mut children = HashMap::new();
        children.insert(
            PathBuf::from("/data/n1"),
            vec!["demo_01_back".to_string(), "demo_01_prod".to_string(), "other_01_back".to_string()],
        );
        let store = FakeStore {
            children,
            ..Default::default()
        };
        let candidates = BackupMirror::new(2).plan_deletion(&store, &f, "demo");
        assert_eq!(candidates, vec![PathBuf::from("/data/n1/demo_01_back")]);
    }

    #[test]
    fn delete_confirmed_requires_the_yes_token() {
        let f = fleet(1);
        let store = FakeStore::default();
        let cancel: CancellationFlag = Arc::new(AtomicBool::new(false));
        let candidates = vec![PathBuf::from("/data/n1/demo_01_back")];
        let summary = BackupMirror::new(1).delete_confirmed(
            &store,
            candidates,
            DeletionConfirmation::Yes,
            &cancel,
        );
        assert_eq!(summary.succeeded, 1);
        assert_eq!(store.deletes.lock().len(), 1);
        let _ = f;
    }
}
