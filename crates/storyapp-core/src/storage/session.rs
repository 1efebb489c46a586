//! Session persistence
//!
//! Keeps the single logged-in-user record in memory and on disk. The file
//! is replaced atomically (write to temp file, then rename) so a crash never
//! leaves a half-written session behind.
//!
//! Storage location: `{data_dir}/session.toml`

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::SessionRecord;
use crate::storage::error::{StorageError, StorageResult};

/// Process-wide store for the logged-in user
///
/// Readers can either take a snapshot with [`SessionStore::get`] or
/// subscribe to every change.
pub struct SessionStore {
    path: Option<PathBuf>,
    state: watch::Sender<SessionRecord>,
}

impl SessionStore {
    /// Open the session file under the configured data directory
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::with_path(config.session_path())
    }

    /// Open a session file at an explicit path
    ///
    /// A missing file means nobody is logged in. A file that cannot be
    /// parsed is moved to `<name>.corrupt.backup` and the store starts
    /// logged out.
    pub fn with_path(path: PathBuf) -> StorageResult<Self> {
        let record = if path.exists() {
            match load_record(&path) {
                Err(StorageError::InvalidFormat { details, .. }) => {
                    let backup_path = backup_corrupt(&path, &details)?;
                    warn!(
                        "Session file {:?} is corrupted ({}); moved it to {:?} and logged out",
                        path, details, backup_path
                    );
                    SessionRecord::default()
                }
                other => other?,
            }
        } else {
            SessionRecord::default()
        };

        let (state, _) = watch::channel(record);
        Ok(Self {
            path: Some(path),
            state,
        })
    }

    /// A session store that never touches the disk
    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(SessionRecord::default());
        Self { path: None, state }
    }

    /// Current session snapshot
    pub fn get(&self) -> SessionRecord {
        self.state.borrow().clone()
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> watch::Receiver<SessionRecord> {
        self.state.subscribe()
    }

    /// Bearer token, if a user is logged in
    pub fn token(&self) -> Option<String> {
        let session = self.state.borrow();
        (session.is_logged_in && !session.token.is_empty()).then(|| session.token.clone())
    }

    /// Overwrite the session wholesale
    pub fn save(&self, record: SessionRecord) -> StorageResult<()> {
        if let Some(ref path) = self.path {
            let content = toml::to_string(&record).map_err(|e| StorageError::InvalidFormat {
                path: path.clone(),
                details: e.to_string(),
            })?;
            atomic_write(path, content.as_bytes())?;
        }

        debug!("Session saved (logged_in={})", record.is_logged_in);
        self.state.send_replace(record);
        Ok(())
    }

    /// Reset to the logged-out record
    pub fn logout(&self) -> StorageResult<()> {
        if let Some(ref path) = self.path {
            if path.exists() {
                fs::remove_file(path).map_err(|e| StorageError::from_io(e, path.clone()))?;
            }
        }

        debug!("Session cleared");
        self.state.send_replace(SessionRecord::default());
        Ok(())
    }
}

fn load_record(path: &Path) -> StorageResult<SessionRecord> {
    let content = fs::read_to_string(path).map_err(|source| StorageError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

/// Move an unreadable session file out of the way
///
/// If it cannot be moved the parse error is returned, since the next run
/// would hit the same file.
fn backup_corrupt(path: &Path, details: &str) -> StorageResult<PathBuf> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".corrupt.backup");
    let backup_path = PathBuf::from(backup);

    fs::rename(path, &backup_path).map_err(|e| {
        warn!("Failed to back up corrupted session file {:?}: {}", path, e);
        StorageError::InvalidFormat {
            path: path.to_path_buf(),
            details: details.to_string(),
        }
    })?;
    Ok(backup_path)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;

    Ok(())
}
