//! Destination path construction.
//!
//! ```text
//! <node_base>/<dataset>_<slot_2dig>_<mode>/<dataset><slot_2dig>_<timestep_3dig>.zarr
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::WriteMode;
use crate::error::ConfigError;

/// The `mode` path component: `prod` or `back`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Production placement (`_prod` / `prod`).
    Production,
    /// Backup placement (`_back` / `back`).
    Backup,
}

impl PathMode {
    /// The path-component tag for this mode.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Production => "prod",
            Self::Backup => "back",
        }
    }
}

impl TryFrom<WriteMode> for PathMode {
    type Error = ConfigError;

    /// `DeleteBackup` has no destination path of its own — it names
    /// existing backup containers for deletion, it does not write one.
    fn try_from(mode: WriteMode) -> Result<Self, ConfigError> {
        match mode {
            WriteMode::Production => Ok(Self::Production),
            WriteMode::Backup => Ok(Self::Backup),
            WriteMode::DeleteBackup => Err(ConfigError::NotADispatchableWriteMode { mode }),
        }
    }
}

impl fmt::Display for PathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A fully resolved destination path for one sub-array write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPath {
    node_base: PathBuf,
    dataset: String,
    slot: u32,
    mode: PathMode,
    timestep: u32,
}

impl DestinationPath {
    /// Build a destination path, validating that `slot` and `timestep` fit
    /// the fixed-width path format (2 and 3 decimal digits respectively).
    ///
    /// # Errors
    /// Returns [`ConfigError::PathComponentTooWide`] if `slot > 99` or
    /// `timestep > 999`.
    pub fn new(
        node_base: impl Into<PathBuf>,
        dataset: impl Into<String>,
        slot: u32,
        mode: PathMode,
        timestep: u32,
    ) -> Result<Self, ConfigError> {
        if slot > 99 {
            return Err(ConfigError::PathComponentTooWide {
                value: u64::from(slot),
                digits: 2,
            });
        }
        if timestep > 999 {
            return Err(ConfigError::PathComponentTooWide {
                value: u64::from(timestep),
                digits: 3,
            });
        }
        Ok(Self {
            node_base: node_base.into(),
            dataset: dataset.into(),
            slot,
            mode,
            timestep,
        })
    }

    /// The node base directory this path is rooted at.
    #[must_use]
    pub fn node_base(&self) -> &Path {
        &self.node_base
    }

    /// The directory holding this sub-array's store, e.g. `demo_03_prod`.
    #[must_use]
    pub fn container_dir(&self) -> String {
        format!("{}_{:02}_{}", self.dataset, self.slot, self.mode.tag())
    }

    /// The full path: `<node_base>/<container_dir>/<dataset><slot>_<timestep>.zarr`.
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.node_base.join(self.container_dir()).join(format!(
            "{}{:02}_{:03}.zarr",
            self.dataset, self.slot, self.timestep
        ))
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_per_spec() {
        let path = DestinationPath::new("/data/node03/zarr", "demo", 7, PathMode::Production, 12).unwrap();
        assert_eq!(
            path.full_path(),
            PathBuf::from("/data/node03/zarr/demo_07_prod/demo07_012.zarr")
        );
    }

    #[test]
    fn backup_tag_differs() {
        let path = DestinationPath::new("/data/node03/zarr", "demo", 7, PathMode::Backup, 12).unwrap();
        assert!(path.full_path().to_string_lossy().contains("_back"));
    }

    #[test]
    fn rejects_slot_over_two_digits() {
        assert!(matches!(
            DestinationPath::new("/x", "d", 100, PathMode::Production, 0),
            Err(ConfigError::PathComponentTooWide { digits: 2, .. })
        ));
    }

    #[test]
    fn rejects_timestep_over_three_digits() {
        assert!(matches!(
            DestinationPath::new("/x", "d", 1, PathMode::Production, 1000),
            Err(ConfigError::PathComponentTooWide { digits: 3, .. })
        ));
    }

    #[test]
    fn delete_backup_has_no_path_mode() {
        assert!(matches!(
            PathMode::try_from(WriteMode::DeleteBackup),
            Err(ConfigError::NotADispatchableWriteMode { mode: WriteMode::DeleteBackup })
        ));
    }
}
