//! dischargeflow Synthesis - template-based content collaborators
//!
//! Deterministic stand-ins for the model-backed services the workflow calls:
//! - `TemplateSynthesizer` turns a patient record into clinical notes
//! - `TemplateDraftWriter` turns notes into a discharge summary, quoting the
//!   clinician's edit request on regeneration
//!
//! Both accept a simulated latency and a `FailureMode` for demos.
//!
//! # Example
//!
//! ```rust
//! use dischargeflow_synthesis::render_notes;
//! use dischargeflow_records::fixtures;
//!
//! let patient = &fixtures::demo_patients()[0];
//! assert!(render_notes(patient).contains("Flagged results:"));
//! ```

#![warn(unreachable_pub)]

/// Discharge summary drafts
pub mod draft;
pub mod failure;
/// Clinical note synthesis
pub mod notes;

pub use draft::{render_summary, TemplateDraftWriter, ADDENDUM_HEADING};
pub use failure::FailureMode;
pub use notes::{render_notes, TemplateSynthesizer};
