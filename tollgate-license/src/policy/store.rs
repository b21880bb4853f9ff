//! Persistence for caching policy state.

use super::PolicySnapshot;
use crate::error::{LicenseError, LicenseResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Loads and saves a [`PolicySnapshot`] across process restarts.
pub trait PolicyStore: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> LicenseResult<Option<PolicySnapshot>>;

    /// Replaces the stored snapshot.
    fn save(&self, snapshot: &PolicySnapshot) -> LicenseResult<()>;
}

/// Keeps the snapshot in memory only.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    snapshot: Mutex<Option<PolicySnapshot>>,
}

impl MemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn load(&self) -> LicenseResult<Option<PolicySnapshot>> {
        Ok(self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &PolicySnapshot) -> LicenseResult<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

/// Stores the snapshot as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFilePolicyStore {
    path: PathBuf,
}

impl JsonFilePolicyStore {
    /// File name used under the platform data directory.
    pub const FILE_NAME: &'static str = "policy.json";

    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store in the platform's local data directory.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Storage`] if the platform has no data directory.
    pub fn open_default() -> LicenseResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    /// Returns `<data dir>/tollgate/policy.json`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Storage`] if the platform has no data directory.
    pub fn default_path() -> LicenseResult<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join("tollgate").join(Self::FILE_NAME))
            .ok_or_else(|| LicenseError::Storage("no local data directory on this platform".to_string()))
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicyStore for JsonFilePolicyStore {
    fn load(&self) -> LicenseResult<Option<PolicySnapshot>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save(&self, snapshot: &PolicySnapshot) -> LicenseResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        // Readers only ever see a complete file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| LicenseError::Storage(format!("failed to replace {}: {e}", self.path.display())))
    }
}
