//! An in-memory [`SubArrayStore`] test double: records writes, copies and
//! deletes against a `HashMap` keyed by path, instead of touching disk.
//! The on-disk chunked-store codec is out of scope for this crate (see
//! `src/store.rs`), so integration tests exercise the pipeline against
//! this double rather than a real backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use zarr_fleet::path::DestinationPath;
use zarr_fleet::source::VariableData;
use zarr_fleet::splitter::SubArrayView;
use zarr_fleet::store::SubArrayStore;

/// One recorded write: the materialized variable blocks, kept in full so
/// tests can assert a real round-trip against the source values, not just
/// their shape.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub variable_count: usize,
    pub total_elements: usize,
    pub variables: Vec<(String, VariableData)>,
}

/// An in-memory store. `fail_paths` lets a test make specific destinations
/// fail without a full backend, exercising per-job failure collection.
#[derive(Default)]
pub struct MemStore {
    writes: Mutex<HashMap<PathBuf, RecordedWrite>>,
    containers: Mutex<HashMap<PathBuf, Vec<String>>>,
    fail_paths: Mutex<Vec<PathBuf>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes/copies/deletes targeting `path` fail from now on.
    pub fn fail_at(&self, path: PathBuf) {
        self.fail_paths.lock().push(path);
    }

    #[must_use]
    pub fn writes(&self) -> HashMap<PathBuf, RecordedWrite> {
        self.writes.lock().clone()
    }

    #[must_use]
    pub fn container_children(&self, node_base: &Path) -> Vec<String> {
        self.containers.lock().get(node_base).cloned().unwrap_or_default()
    }

    /// Seed a production container directly, as if an earlier pass wrote it.
    pub fn seed_container(&self, node_base: PathBuf, name: impl Into<String>) {
        self.containers.lock().entry(node_base).or_default().push(name.into());
    }

    fn should_fail(&self, path: &Path) -> bool {
        self.fail_paths.lock().iter().any(|p| p == path)
    }
}

impl SubArrayStore for MemStore {
    fn write_sub_array(&self, destination: &DestinationPath, view: &SubArrayView) -> Result<(), String> {
        let path = destination.full_path();
        if self.should_fail(&path) {
            return Err("simulated backend failure".to_string());
        }
        let materialized = view.materialize().map_err(|e| e.to_string())?;
        let total_elements = materialized.iter().map(|(_, data)| data.len()).sum();
        self.writes.lock().insert(
            path.clone(),
            RecordedWrite {
                variable_count: materialized.len(),
                total_elements,
                variables: materialized,
            },
        );
        self.containers
            .lock()
            .entry(destination.node_base().to_path_buf())
            .or_default()
            .push(destination.container_dir());
        Ok(())
    }

    fn list_children(&self, node_base: &Path) -> Result<Vec<String>, String> {
        Ok(self.container_children(node_base))
    }

    fn copy_tree(&self, source: &Path, destination: &Path) -> Result<(), String> {
        if self.should_fail(destination) {
            return Err("simulated copy failure".to_string());
        }
        let _ = source;
        let parent = destination.parent().unwrap_or(destination).to_path_buf();
        let name = destination.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        self.containers.lock().entry(parent).or_default().push(name.to_string());
        Ok(())
    }

    fn delete_tree(&self, path: &Path) -> Result<(), String> {
        if self.should_fail(path) {
            return Err("simulated delete failure".to_string());
        }
        let parent = path.parent().unwrap_or(path).to_path_buf();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if let Some(children) = self.containers.lock().get_mut(&parent) {
            children.retain(|c| c != name);
        }
        Ok(())
    }
}
