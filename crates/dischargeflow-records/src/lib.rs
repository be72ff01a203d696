//! dischargeflow Records - patient data behind a lookup gateway
//!
//! Provides:
//! - The `Patient` record handed to the content collaborators
//! - The `PatientRecordGateway` contract the workflow retrieves records through
//! - An insertion-ordered in-memory store with seeded demo records
//!
//! # Example
//!
//! ```rust
//! use dischargeflow_records::{InMemoryPatientStore, PatientId, PatientRecordGateway};
//!
//! let store = InMemoryPatientStore::seeded();
//! let patient = store.retrieve_patient(&PatientId::new("P001"));
//! assert!(patient.is_some());
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod fixtures;
pub mod patient;
pub mod store;

pub use error::{RecordsError, RecordsResult};
pub use patient::{
    Demographics, LabResult, LabStatus, MedicationChange, MedicationStatus, Patient, PatientId,
};
pub use store::{InMemoryPatientStore, PatientRecordGateway};
