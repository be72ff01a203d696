//! Orchestrator configuration.
//!
//! Resolved once at startup and handed to `WorkflowOrchestrator`. All fields
//! have defaults, so an empty TOML document is a valid configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a status update finds the audit entry it rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditUpdatePolicy {
    /// Entry with the step name appended in the current review cycle
    #[default]
    CurrentCycle,
    /// First entry with the step name, regardless of cycle
    FirstMatch,
}

/// Workflow orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Simulated latency around the record lookup, applied twice
    pub retrieval_latency_ms: u64,
    /// Simulated latency of the finalize step
    pub finalize_latency_ms: u64,
    /// Upper bound on each collaborator call. `None` waits forever.
    pub step_timeout_ms: Option<u64>,
    /// How audit status updates locate their entry
    pub audit_update_policy: AuditUpdatePolicy,
    /// Buffered snapshots per subscriber before it lags
    pub snapshot_capacity: usize,
}

impl WorkflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No simulated latency, for tests and the simulator
    #[must_use]
    pub fn instant() -> Self {
        Self {
            retrieval_latency_ms: 0,
            finalize_latency_ms: 0,
            ..Self::default()
        }
    }

    /// With the same simulated latency for retrieval and finalize
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.retrieval_latency_ms = ms;
        self.finalize_latency_ms = ms;
        self
    }

    /// With a per-call collaborator timeout
    #[inline]
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With the audit update policy
    #[inline]
    #[must_use]
    pub fn with_audit_update_policy(mut self, policy: AuditUpdatePolicy) -> Self {
        self.audit_update_policy = policy;
        self
    }

    /// With the per-subscriber snapshot buffer
    #[inline]
    #[must_use]
    pub fn with_snapshot_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_capacity = capacity;
        self
    }

    /// Retrieval latency as a `Duration`
    pub fn retrieval_latency(&self) -> Duration {
        Duration::from_millis(self.retrieval_latency_ms)
    }

    /// Finalize latency as a `Duration`
    pub fn finalize_latency(&self) -> Duration {
        Duration::from_millis(self.finalize_latency_ms)
    }

    /// Step timeout as a `Duration`, if set
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }

    /// Parse from a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            retrieval_latency_ms: 500,
            finalize_latency_ms: 500,
            step_timeout_ms: None,
            audit_update_policy: AuditUpdatePolicy::CurrentCycle,
            snapshot_capacity: 64,
        }
    }
}
