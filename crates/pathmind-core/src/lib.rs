//! pathmind-core: Test session state machine, data model, and scoring.
//!
//! This crate defines the data contract with the assessment backend, the
//! `AssessmentBackend` seam, the timed test-taking state machine and its
//! async driver, and the local scoring used by offline backends.

pub mod bank;
pub mod controller;
pub mod error;
pub mod model;
pub mod report;
pub mod scoring;
pub mod session;
pub mod traits;

pub use controller::{ResultsView, SessionConfig, SessionController, SessionHandle, SessionOutcome};
pub use error::{BackendError, SessionError};
pub use session::{SessionSnapshot, SessionState, TestSession};
pub use traits::AssessmentBackend;
