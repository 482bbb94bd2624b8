//! Storage backend selection.
//!
//! Decides, once per executor lifetime, whether a durable (file-backed)
//! backend is usable and opens the database handle accordingly. Durable
//! storage is probed by mounting the configured data directory and running a
//! write/delete verification; any failure along that path is a warning, not
//! an error, and execution proceeds on a transient in-memory store.

use crate::error::{BackendError, ExecutorError};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default database file name inside the durable data directory.
pub const DEFAULT_DB_NAME: &str = "bridge.db";

/// File name used for the durable-backend verification probe.
const PROBE_FILE: &str = ".bridge-probe";

/// The storage backend chosen during initialization.
///
/// Immutable for the lifetime of the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// File-backed storage; contents survive the process.
    Durable,
    /// In-memory storage; contents are lost on shutdown.
    Transient,
}

/// Configuration for backend selection.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Directory to host the durable database. `None` selects transient
    /// storage without any mount attempt.
    pub data_dir: Option<PathBuf>,
    /// Database file name within `data_dir`.
    pub db_file: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_file: DEFAULT_DB_NAME.to_string(),
        }
    }
}

impl BackendConfig {
    /// Configuration that always selects transient storage.
    #[must_use]
    pub fn transient() -> Self {
        Self::default()
    }

    /// Configuration that prefers durable storage under `dir`.
    pub fn durable(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Overrides the database file name.
    #[must_use]
    pub fn with_db_file(mut self, name: impl Into<String>) -> Self {
        self.db_file = name.into();
        self
    }

    /// Full path of the durable database file, if a data directory is set.
    #[must_use]
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(&self.db_file))
    }
}

/// Selects the backend for this executor.
///
/// Never fails: every problem on the durable path logs a warning and falls
/// back to [`Backend::Transient`].
#[must_use]
pub fn select(config: &BackendConfig) -> Backend {
    let Some(dir) = config.data_dir.as_deref() else {
        info!("no durable location configured; using transient storage");
        return Backend::Transient;
    };

    match mount_and_verify(dir) {
        Ok(()) => {
            info!(path = %dir.display(), "durable backend mounted");
            Backend::Durable
        }
        Err(err) => {
            warn!(%err, "falling back to in-memory storage");
            Backend::Transient
        }
    }
}

/// Mounts the durable location and verifies it is writable.
fn mount_and_verify(dir: &Path) -> std::result::Result<(), BackendError> {
    fs::create_dir_all(dir).map_err(|e| BackendError::MountFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    // Round-trip a probe file to confirm the mount actually took.
    let probe = dir.join(PROBE_FILE);
    fs::write(&probe, b"probe").map_err(|e| BackendError::VerifyFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;
    fs::remove_file(&probe).map_err(|e| BackendError::VerifyFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Opens the database handle for the selected backend.
///
/// Unlike selection, this step can genuinely fail and the failure propagates
/// as an initialization error.
///
/// # Errors
///
/// Returns [`ExecutorError::OpenFailed`] if the engine cannot open a handle.
pub fn open(
    config: &BackendConfig,
    backend: Backend,
) -> std::result::Result<Connection, ExecutorError> {
    match backend {
        Backend::Durable => {
            let path = config.db_path().ok_or_else(|| {
                ExecutorError::OpenFailed(
                    "durable backend selected without a data directory".to_string(),
                )
            })?;
            Connection::open(&path).map_err(|e| ExecutorError::OpenFailed(e.to_string()))
        }
        Backend::Transient => {
            Connection::open_in_memory().map_err(|e| ExecutorError::OpenFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_select_transient_without_data_dir() {
        assert_eq!(select(&BackendConfig::transient()), Backend::Transient);
    }

    #[test]
    fn test_select_durable_with_writable_dir() {
        let temp = TempDir::new().unwrap();
        let config = BackendConfig::durable(temp.path().join("store"));
        assert_eq!(select(&config), Backend::Durable);
        // Mounting created the directory.
        assert!(temp.path().join("store").is_dir());
    }

    #[test]
    fn test_select_falls_back_on_mount_failure() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should go makes the mount fail.
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let config = BackendConfig::durable(blocker.join("store"));
        assert_eq!(select(&config), Backend::Transient);
    }

    #[test]
    fn test_probe_file_is_cleaned_up() {
        let temp = TempDir::new().unwrap();
        let config = BackendConfig::durable(temp.path());
        assert_eq!(select(&config), Backend::Durable);
        assert!(!temp.path().join(PROBE_FILE).exists());
    }

    #[test]
    fn test_open_transient() {
        let conn = open(&BackendConfig::transient(), Backend::Transient).unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn test_open_durable_creates_db_file() {
        let temp = TempDir::new().unwrap();
        let config = BackendConfig::durable(temp.path());
        let backend = select(&config);
        let _conn = open(&config, backend).unwrap();
        assert!(temp.path().join(DEFAULT_DB_NAME).exists());
    }

    #[test]
    fn test_open_durable_without_dir_is_open_failure() {
        let err = open(&BackendConfig::transient(), Backend::Durable).unwrap_err();
        assert!(matches!(err, ExecutorError::OpenFailed(_)));
    }

    #[test]
    fn test_db_path() {
        let config = BackendConfig::durable("/data").with_db_file("custom.db");
        assert_eq!(config.db_path(), Some(PathBuf::from("/data/custom.db")));
        assert_eq!(BackendConfig::transient().db_path(), None);
    }
}
