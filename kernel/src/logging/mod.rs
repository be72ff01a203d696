use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of one audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Logged but not started
    Pending,
    /// Currently running
    InProgress,
    /// Finished successfully
    Completed,
    /// Failed
    Error,
    /// Waiting on the clinician
    HumanInput,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditStatus::Pending => "pending",
            AuditStatus::InProgress => "in_progress",
            AuditStatus::Completed => "completed",
            AuditStatus::Error => "error",
            AuditStatus::HumanInput => "human_input",
        };
        f.write_str(label)
    }
}

/// One line of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Step name, one of the audit name constants
    pub step: String,
    /// Current status
    pub status: AuditStatus,
    /// Free-form outcome text
    pub details: String,
    /// Time the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Review cycle the entry was appended in
    pub cycle: u32,
}

/// Ordered, append-only record of workflow steps.
///
/// Entries are never removed or reordered. Only `status` and `details` of an
/// existing entry may be rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
}

impl AuditLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with `now`
    pub fn append(
        &mut self,
        step: &str,
        details: impl Into<String>,
        status: AuditStatus,
        cycle: u32,
        timestamp: DateTime<Utc>,
    ) {
        self.entries.push(AuditLogEntry {
            step: step.to_string(),
            status,
            details: details.into(),
            timestamp,
            cycle,
        });
    }

    /// Rewrite the first entry named `step`. Returns whether an entry matched;
    /// a miss leaves the log untouched.
    pub fn update_status(&mut self, step: &str, status: AuditStatus, details: Option<String>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.step == step) else {
            return false;
        };
        rewrite(entry, status, details);
        true
    }

    /// Rewrite the entry named `step` that was appended in `cycle`.
    pub fn update_status_in_cycle(
        &mut self,
        step: &str,
        cycle: u32,
        status: AuditStatus,
        details: Option<String>,
    ) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.step == step && e.cycle == cycle)
        else {
            return false;
        };
        rewrite(entry, status, details);
        true
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    /// Iterate entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &AuditLogEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was logged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&AuditLogEntry> {
        self.entries.last()
    }

    /// First entry named `step`
    pub fn find(&self, step: &str) -> Option<&AuditLogEntry> {
        self.entries.iter().find(|e| e.step == step)
    }

    /// Most recent entry named `step`
    pub fn find_last(&self, step: &str) -> Option<&AuditLogEntry> {
        self.entries.iter().rev().find(|e| e.step == step)
    }

    /// Whether any entry has this step name
    pub fn contains(&self, step: &str) -> bool {
        self.find(step).is_some()
    }

    /// Entries with this step name
    pub fn count(&self, step: &str) -> usize {
        self.entries.iter().filter(|e| e.step == step).count()
    }

    /// Step names in log order
    pub fn step_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.step.as_str()).collect()
    }

    /// Entries currently in progress
    pub fn in_progress_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == AuditStatus::InProgress)
            .count()
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a AuditLogEntry;
    type IntoIter = std::slice::Iter<'a, AuditLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn rewrite(entry: &mut AuditLogEntry, status: AuditStatus, details: Option<String>) {
    entry.status = status;
    if let Some(details) = details {
        entry.details = details;
    }
}
