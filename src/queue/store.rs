//! Durable storage for [`ProcessingState`].
//!
//! Loading never fails: a missing, unreadable or malformed document yields a
//! fresh empty state. Saving never fails either: errors are logged and the
//! run continues, at the cost of possibly redoing in-memory progress next
//! time. The store assumes a single writer and does no locking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, error, info, warn};

use super::state::ProcessingState;

/// Load/save seam used by the scanner and the scheduler.
pub trait StateStore {
    fn load(&self) -> ProcessingState;

    /// Stamp `last_run` and persist. Returns whether the write succeeded.
    fn save(&self, state: &mut ProcessingState) -> bool;
}

/// JSON file store written through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the persisted state so that the next load starts empty.
    pub fn reset(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "processing state reset");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn write_atomic(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> ProcessingState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting fresh");
                return ProcessingState::default();
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "error reading state file, starting fresh");
                return ProcessingState::default();
            }
        };

        match serde_json::from_str::<ProcessingState>(&contents) {
            Ok(state) => {
                debug!(
                    pending = state.pending.len(),
                    completed = state.completed.len(),
                    failed = state.failed.len(),
                    "state loaded"
                );
                state
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "malformed state file, starting fresh");
                ProcessingState::default()
            }
        }
    }

    fn save(&self, state: &mut ProcessingState) -> bool {
        state.last_run = Some(Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string());

        let result = serde_json::to_string_pretty(state)
            .map_err(io::Error::other)
            .and_then(|mut buf| {
                buf.push('\n');
                self.write_atomic(&buf)
            });

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "state saved");
                true
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "error saving state file");
                false
            }
        }
    }
}
