use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Final disposition of one work item after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOutcome {
    Completed,
    Failed,
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemOutcome::Completed => write!(f, "completed"),
            ItemOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// The persisted work queue: three disjoint ordered sets of file paths.
///
/// Items move one at a time from `pending` into `completed` or `failed`.
/// The whole struct is saved and loaded as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub pending: VecDeque<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    /// Local ISO-8601 timestamp of the last save.
    #[serde(default)]
    pub last_run: Option<String>,
}

impl ProcessingState {
    /// Remove and return the item at the front of the queue.
    pub fn next_pending(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Record the outcome for `item`, removing it from every other set.
    pub fn record(&mut self, item: &str, outcome: ItemOutcome) {
        self.pending.retain(|p| p != item);
        match outcome {
            ItemOutcome::Completed => {
                self.failed.retain(|p| p != item);
                if !self.is_completed(item) {
                    self.completed.push(item.to_string());
                }
            }
            ItemOutcome::Failed => {
                self.completed.retain(|p| p != item);
                if !self.is_failed(item) {
                    self.failed.push(item.to_string());
                }
            }
        }
    }

    /// Queue `item` unless it is already known in any set.
    pub fn enqueue(&mut self, item: &str) -> bool {
        if self.is_known(item) {
            return false;
        }
        self.pending.push_back(item.to_string());
        true
    }

    pub fn is_completed(&self, item: &str) -> bool {
        self.completed.iter().any(|p| p == item)
    }

    pub fn is_failed(&self, item: &str) -> bool {
        self.failed.iter().any(|p| p == item)
    }

    pub fn is_pending(&self, item: &str) -> bool {
        self.pending.iter().any(|p| p == item)
    }

    pub fn is_known(&self, item: &str) -> bool {
        self.is_pending(item) || self.is_completed(item) || self.is_failed(item)
    }

    /// Whether no item appears twice across (or within) the three sets.
    #[cfg(test)]
    pub fn is_partitioned(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.pending
            .iter()
            .chain(&self.completed)
            .chain(&self.failed)
            .all(|item| seen.insert(item.as_str()))
    }
}
