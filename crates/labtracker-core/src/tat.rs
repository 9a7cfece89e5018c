//! Turnaround-time evaluation.
//!
//! Pure computation over already-fetched [`SampleDetail`] data; nothing here
//! is persisted. "Overdue" (TAT budget exceeded while still processing) and
//! "delayed" (explicitly flagged status) are independent, non-exclusive
//! conditions surfaced separately and summed into one alert count.

use chrono::{DateTime, Duration, Utc};

use crate::models::{SampleDetail, SampleStatus};

/// When processing started: the earliest status-log entry transitioning into
/// IN_PROCESSING. A DELAYED → resume cycle appends a second such entry; the
/// first one wins so the TAT clock never resets.
pub fn processing_started_at(detail: &SampleDetail) -> Option<DateTime<Utc>> {
    detail
        .status_logs
        .iter()
        .find(|log| log.to_status == SampleStatus::InProcessing)
        .and_then(|log| DateTime::parse_from_rfc3339(&log.timestamp).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// The sample's TAT budget in minutes: the maximum expected TAT across its
/// ordered tests. The slowest test governs the whole sample.
pub fn tat_budget_minutes(detail: &SampleDetail) -> i64 {
    detail
        .tests
        .iter()
        .map(|t| t.test.expected_tat_minutes)
        .max()
        .unwrap_or(0)
}

/// Whether the sample has exceeded its TAT budget.
///
/// Never true for completed samples, samples that have not started
/// processing, or samples with a zero budget.
pub fn is_overdue(detail: &SampleDetail, now: DateTime<Utc>) -> bool {
    if detail.sample.status == SampleStatus::Completed {
        return false;
    }
    let budget = tat_budget_minutes(detail);
    if budget == 0 {
        return false;
    }
    match processing_started_at(detail) {
        Some(start) => now > start + Duration::minutes(budget),
        None => false,
    }
}

/// Whether the sample was explicitly flagged delayed.
pub fn is_delayed(detail: &SampleDetail) -> bool {
    detail.sample.status == SampleStatus::Delayed
}

/// Alert counts for a fetched sample set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub overdue: usize,
    pub delayed: usize,
}

impl AlertSummary {
    pub fn total(&self) -> usize {
        self.overdue + self.delayed
    }
}

/// Count overdue and delayed samples in one pass.
pub fn alert_summary(samples: &[SampleDetail], now: DateTime<Utc>) -> AlertSummary {
    let mut summary = AlertSummary::default();
    for detail in samples {
        if is_overdue(detail, now) {
            summary.overdue += 1;
        }
        if is_delayed(detail) {
            summary.delayed += 1;
        }
    }
    summary
}
