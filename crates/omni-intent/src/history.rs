//! Bounded execution history.
//!
//! Keeps the most recent [`HistoryEntry`] records in a ring buffer; once the
//! capacity is reached the oldest entry is dropped for each new one.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step::ComplexityLevel;
use crate::workflow::WorkflowResult;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// One executed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    pub complexity: ComplexityLevel,
    pub success: bool,
    pub completed: usize,
    pub total: usize,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Build an entry from a finished run.
    pub fn from_result(command: impl Into<String>, result: &WorkflowResult) -> Self {
        Self {
            command: command.into(),
            complexity: result.complexity,
            success: result.success,
            completed: result.completed_steps,
            total: result.total_steps,
            at: Utc::now(),
        }
    }
}

/// Ring buffer of recent runs.
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ExecutionHistory {
    /// Create a history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The `n` newest entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    /// Share of recorded runs that succeeded, in `0.0..=1.0`.
    pub fn success_rate(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let ok = self.entries.iter().filter(|e| e.success).count();
        ok as f64 / self.entries.len() as f64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(command: &str, success: bool) -> HistoryEntry {
        HistoryEntry {
            command: command.into(),
            complexity: ComplexityLevel::Simple,
            success,
            completed: usize::from(success),
            total: 1,
            at: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = ExecutionHistory::new(2);
        history.record(entry("a", true));
        history.record(entry("b", false));
        history.record(entry("c", true));

        let commands: Vec<&str> = history.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["b", "c"]);
        assert_eq!(history.recent(1)[0].command, "c");
    }

    #[test]
    fn success_rate() {
        let mut history = ExecutionHistory::default();
        assert_eq!(history.success_rate(), 0.0);
        history.record(entry("a", true));
        history.record(entry("b", false));
        assert_eq!(history.success_rate(), 0.5);
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut history = ExecutionHistory::new(0);
        history.record(entry("a", true));
        history.record(entry("b", true));
        assert_eq!(history.len(), 1);
    }
}
