//! The storage-backend seam: the serialization format of the output
//! chunked store is explicitly out of scope; only this interface matters
//! to the core.
//!
//! A concrete backend knows how to materialize a [`crate::splitter::SubArrayView`]
//! at a [`crate::path::DestinationPath`] atomically, and how to enumerate
//! and copy/delete the resulting containers for the backup mirror pass.

use crate::path::DestinationPath;
use crate::splitter::SubArrayView;

/// A chunked-store backend.
///
/// Implementations must guarantee that [`write_sub_array`](Self::write_sub_array)
/// is atomic at the sub-array granularity: a successful call produces a
/// complete, readable store at `destination`; a failed call leaves it
/// absent or safely overwritable. Backends must tolerate concurrent calls
/// to distinct destinations; the core never issues two jobs against the
/// same path.
pub trait SubArrayStore: Send + Sync {
    /// Atomically materialize `view` at `destination`, truncating any
    /// existing store there.
    ///
    /// # Errors
    /// Returns a human-readable cause on failure; the dispatcher wraps it
    /// in a [`crate::error::JobFailure`] and continues draining other jobs.
    fn write_sub_array(
        &self,
        destination: &DestinationPath,
        view: &SubArrayView,
    ) -> Result<(), String>;

    /// List the immediate child container names under a node's base
    /// directory (e.g. `demo_03_prod`), used by the backup mirror to find
    /// production containers to copy.
    ///
    /// # Errors
    /// Returns a human-readable cause if the directory cannot be listed.
    fn list_children(&self, node_base: &std::path::Path) -> Result<Vec<String>, String>;

    /// Recursively copy a container directory to a destination, overwriting
    /// anything already present there.
    ///
    /// # Errors
    /// Returns a human-readable cause on failure.
    fn copy_tree(&self, source: &std::path::Path, destination: &std::path::Path) -> Result<(), String>;

    /// Recursively delete a container directory.
    ///
    /// # Errors
    /// Returns a human-readable cause on failure.
    fn delete_tree(&self, path: &std::path::Path) -> Result<(), String>;
}
