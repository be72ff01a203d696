//! Supervised discharge-summary workflow kernel.
//!
//! The kernel owns one `WorkflowState`, mutates it only through
//! `WorkflowReducer`, and lets `WorkflowOrchestrator` run whichever step
//! `next_step` selects until the workflow waits on a clinician or ends.
//!
//! ```
//! use dischargeflow_kernel::{AuditLog, AuditStatus, HUMAN_REVIEW};
//!
//! let mut log = AuditLog::new();
//! log.append(HUMAN_REVIEW, "Awaiting review", AuditStatus::HumanInput, 0, chrono::Utc::now());
//! assert!(log.update_status(HUMAN_REVIEW, AuditStatus::Completed, None));
//! assert_eq!(log.entries()[0].details, "Awaiting review");
//! ```

pub mod config;
/// Append-only audit trail
pub mod logging;
pub mod reducer;
pub mod state;
/// Step selection and action gating
pub mod state_machine;
pub mod test_harness;
/// Step names, ids and status enums
pub mod types;

pub mod api;
pub mod error;
/// The workflow orchestrator
pub mod handle;

pub use api::*;
pub use config::*;
pub use error::*;
pub use handle::*;
pub use logging::*;
pub use reducer::*;
pub use state::WorkflowState;
pub use state_machine::{allowed_actions, next_step, validate_action, Action};
pub use types::*;

/// Re-export test harness for external use
pub use test_harness::{run_simulator, SimulatorConfig, TestHarness};
