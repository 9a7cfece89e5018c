//! Sample, ordered-test, and status-log models.

use serde::{Deserialize, Serialize};

use super::TestDef;

/// Sample-level lifecycle status.
///
/// `Collected` exists for samples logged before reaching the lab, but intake
/// always starts samples at `Received`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleStatus {
    Collected,
    Received,
    InProcessing,
    AwaitingReview,
    Completed,
    /// Side state flagged by a scientist; resumable back to `InProcessing`
    Delayed,
}

impl SampleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleStatus::Collected => "COLLECTED",
            SampleStatus::Received => "RECEIVED",
            SampleStatus::InProcessing => "IN_PROCESSING",
            SampleStatus::AwaitingReview => "AWAITING_REVIEW",
            SampleStatus::Completed => "COMPLETED",
            SampleStatus::Delayed => "DELAYED",
        }
    }

    pub fn parse(s: &str) -> Option<SampleStatus> {
        match s {
            "COLLECTED" => Some(SampleStatus::Collected),
            "RECEIVED" => Some(SampleStatus::Received),
            "IN_PROCESSING" => Some(SampleStatus::InProcessing),
            "AWAITING_REVIEW" => Some(SampleStatus::AwaitingReview),
            "COMPLETED" => Some(SampleStatus::Completed),
            "DELAYED" => Some(SampleStatus::Delayed),
            _ => None,
        }
    }

    /// Whether an explicit transition to `to` is allowed.
    ///
    /// Auto-completion on the last saved result goes through
    /// `Database::record_test_result` and is not routed through this check.
    pub fn can_transition(&self, to: SampleStatus) -> bool {
        use SampleStatus::*;
        matches!(
            (self, to),
            (Received, InProcessing)
                | (InProcessing, AwaitingReview)
                | (InProcessing, Delayed)
                | (AwaitingReview, Completed)
                | (AwaitingReview, InProcessing)
                | (Delayed, InProcessing)
        )
    }
}

/// Per-test status within a sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleTestStatus {
    Pending,
    Completed,
}

impl SampleTestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleTestStatus::Pending => "PENDING",
            SampleTestStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<SampleTestStatus> {
        match s {
            "PENDING" => Some(SampleTestStatus::Pending),
            "COMPLETED" => Some(SampleTestStatus::Completed),
            _ => None,
        }
    }
}

/// Intake form data for a new sample.
#[derive(Debug, Clone, Default)]
pub struct SampleIntake {
    pub patient_name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub clinical_info: Option<String>,
    pub specimen_type: Option<String>,
    /// Ward or outpatient origin
    pub source: Option<String>,
    pub ward_id: Option<String>,
    /// Optional lab number known at intake time
    pub lab_number: Option<String>,
    /// IDs of the ordered catalog tests; at least one required
    pub test_ids: Vec<String>,
}

/// One specimen submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub id: String,
    /// Unique public identifier, immutable after intake
    pub accession_number: String,
    /// Assigned later by a scientist
    pub lab_number: Option<String>,
    pub patient_name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub clinical_info: Option<String>,
    pub specimen_type: Option<String>,
    pub source: Option<String>,
    pub ward_id: Option<String>,
    /// Owning unit, immutable after creation
    pub unit_id: String,
    pub created_by_id: String,
    /// Stamped when the sample completes
    pub processed_by_id: Option<String>,
    pub status: SampleStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Sample {
    /// Create a sample at `Received` from intake data.
    pub fn new(accession_number: String, intake: &SampleIntake, unit_id: String, created_by_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            accession_number,
            lab_number: intake.lab_number.clone(),
            patient_name: intake.patient_name.clone(),
            age: intake.age,
            gender: intake.gender.clone(),
            clinical_info: intake.clinical_info.clone(),
            specimen_type: intake.specimen_type.clone(),
            source: intake.source.clone(),
            ward_id: intake.ward_id.clone(),
            unit_id,
            created_by_id,
            processed_by_id: None,
            status: SampleStatus::Received,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One ordered test on a sample, keyed by `(sample_id, test_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleTest {
    pub sample_id: String,
    pub test_id: String,
    pub status: SampleTestStatus,
    /// Result text, null until entered
    pub result: Option<String>,
    /// Claiming scientist; at most one at a time
    pub assigned_to_id: Option<String>,
    pub completed_at: Option<String>,
}

/// Append-only audit record of one sample-level status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleStatusLog {
    pub id: String,
    pub sample_id: String,
    /// None for the intake entry
    pub from_status: Option<SampleStatus>,
    pub to_status: SampleStatus,
    pub user_id: String,
    pub notes: Option<String>,
    pub timestamp: String,
}

impl SampleStatusLog {
    pub fn new(
        sample_id: String,
        from_status: Option<SampleStatus>,
        to_status: SampleStatus,
        user_id: String,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sample_id,
            from_status,
            to_status,
            user_id,
            notes,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// An ordered test joined with its catalog definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleTestDetail {
    pub order: SampleTest,
    pub test: TestDef,
}

/// A sample with its tests and full status history, as the list and live
/// views consume it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleDetail {
    pub sample: Sample,
    pub tests: Vec<SampleTestDetail>,
    /// Ordered oldest first
    pub status_logs: Vec<SampleStatusLog>,
}

impl SampleDetail {
    /// True when every ordered test has a saved result.
    pub fn all_tests_completed(&self) -> bool {
        !self.tests.is_empty()
            && self
                .tests
                .iter()
                .all(|t| t.order.status == SampleTestStatus::Completed)
    }
}
