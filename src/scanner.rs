//! Discovery of source files that still need analysis.
//!
//! The scanner walks the root directory, keeps the files accepted by
//! [`EligibilityRules`], and rebuilds the pending queue of the persisted
//! [`ProcessingState`] from them.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::artifacts::artifacts_exist;
use crate::queue::{ItemOutcome, ProcessingState, StateStore};

/// Which files are worth analyzing.
#[derive(Debug, Clone)]
pub struct EligibilityRules {
    /// Lower-case extensions without the leading dot.
    pub extensions: Vec<String>,
    /// File-name endings that exclude an otherwise eligible file.
    pub excluded_suffixes: Vec<String>,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self {
            extensions: vec!["c".into(), "cpp".into(), "dts".into()],
            excluded_suffixes: vec!["mod.c".into(), ".cmd".into()],
        }
    }
}

impl EligibilityRules {
    pub fn is_eligible(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            return false;
        };
        let supported = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext));

        supported
            && !self
                .excluded_suffixes
                .iter()
                .any(|suffix| name.ends_with(&suffix.to_lowercase()))
    }
}

/// Settings for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub rules: EligibilityRules,
    pub output_dir: String,
    /// Treat files whose artifacts are all present as already completed.
    pub skip_existing: bool,
    pub suffixes: Vec<String>,
}

/// Every regular file below `root`, in a stable file-name order.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "skipping unreadable entry"),
        }
    }
    files
}

/// Rebuild the pending queue from `files`, in the order given.
pub fn reconcile(files: &[PathBuf], state: &mut ProcessingState, options: &ScanOptions) {
    state.pending.clear();

    for path in files {
        if !options.rules.is_eligible(path) {
            continue;
        }
        let item = path.to_string_lossy();

        if options.skip_existing && artifacts_exist(path, &options.output_dir, &options.suffixes) {
            if !state.is_completed(&item) {
                debug!(path = %item, "artifacts already present, marking completed");
            }
            state.record(&item, ItemOutcome::Completed);
            continue;
        }

        if state.is_completed(&item) || state.is_failed(&item) {
            continue;
        }
        state.enqueue(&item);
    }
}

/// Load the state, reconcile it with the files under `root` and save it.
pub fn scan(root: &Path, options: &ScanOptions, store: &impl StateStore) -> ProcessingState {
    let mut state = store.load();
    let files = list_files(root);
    reconcile(&files, &mut state, options);
    store.save(&mut state);

    info!(
        pending = state.pending.len(),
        completed = state.completed.len(),
        failed = state.failed.len(),
        "scan finished"
    );
    state
}
