//! LabTracker Core Library
//!
//! Laboratory sample-tracking system: intake, lifecycle, assignment, and
//! turnaround-time monitoring for hospital lab units.
//!
//! # Sample Lifecycle
//!
//! ```text
//! Reception registers sample (accession number issued)
//!                     │
//!                [RECEIVED]
//!                     │  first test claimed
//!                     ▼
//!              [IN_PROCESSING] ◄──────────┐
//!                │         │              │ resume
//!                │         └──► [DELAYED] ┘
//!                │ work done
//!                ▼
//!           [AWAITING_REVIEW]
//!                │ review passes          (all results entered
//!                ▼                         auto-completes too)
//!            [COMPLETED]
//! ```
//!
//! Every transition is recorded in an append-only status log; the TAT clock
//! starts at the first entry into IN_PROCESSING and never resets.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Sample, TestDef, User, etc.)
//! - [`auth`]: Credential checking and registration
//! - [`workflow`]: Intake, status transitions, claiming, results
//! - [`tat`]: Turnaround-time evaluation over fetched samples
//! - [`report`]: Role-scoped listings, search, and the public status page
//! - [`admin`]: Role-gated management of units, benches, tests, and users

pub mod admin;
pub mod auth;
pub mod db;
pub mod models;
pub mod report;
pub mod tat;
pub mod workflow;

// Re-export commonly used types
pub use admin::Admin;
pub use auth::{Auth, NewUser};
pub use db::{ClaimOutcome, Database, SampleFilter};
pub use models::{
    Actor, Bench, Role, Sample, SampleDetail, SampleIntake, SampleStatus, SampleStatusLog,
    SiteSettings, TestDef, Unit, User, Ward,
};
pub use report::{DateBucket, PublicStatus, Reports, ScientistBoard};
pub use tat::AlertSummary;
pub use workflow::{Assignments, SampleWorkflow};

use db::DbError;

/// Top-level error type for every service operation.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

pub type LabResult<T> = Result<T, LabError>;

impl From<DbError> for LabError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => LabError::NotFound(msg),
            DbError::Conflict(msg) => LabError::Conflict(msg),
            other => LabError::Database(other),
        }
    }
}
