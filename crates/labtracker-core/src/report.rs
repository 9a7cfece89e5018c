//! Read-only listing, search, and public status queries.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::db::{Database, SampleFilter};
use crate::models::{Actor, Role, SampleDetail, SampleStatus, SampleTestStatus};
use crate::{LabError, LabResult};

/// Public search result cap.
const PUBLIC_SEARCH_LIMIT: usize = 20;

/// Date bucket for listing filters.
///
/// Weeks are Sunday-anchored: the bucket containing a date starts on the
/// preceding (or same) Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBucket {
    All,
    Day(NaiveDate),
    Week(NaiveDate),
    Month(NaiveDate),
}

impl DateBucket {
    /// Half-open `[start, end)` RFC 3339 bounds in UTC, or `None` for `All`.
    pub fn range(&self) -> Option<(String, String)> {
        let (start, end) = match self {
            DateBucket::All => return None,
            DateBucket::Day(date) => (*date, *date + Duration::days(1)),
            DateBucket::Week(date) => {
                let start = *date - Duration::days(date.weekday().num_days_from_sunday() as i64);
                (start, start + Duration::days(7))
            }
            DateBucket::Month(date) => {
                let start = month_start(*date);
                // From the 1st, +31 days always lands in the next month
                (start, month_start(start + Duration::days(31)))
            }
        };
        let bound = |date: NaiveDate| {
            Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
                .to_rfc3339()
        };
        Some((bound(start), bound(end)))
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// The scientist dashboard's three live panels.
#[derive(Debug, Clone)]
pub struct ScientistBoard {
    /// RECEIVED samples awaiting a first claim
    pub new_arrivals: Vec<SampleDetail>,
    /// IN_PROCESSING or AWAITING_REVIEW
    pub ongoing: Vec<SampleDetail>,
    /// Completed within the last 24 hours
    pub completed: Vec<SampleDetail>,
}

/// Per-test line on the public tracking page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicTestStatus {
    pub name: String,
    pub has_result: bool,
}

/// What the public tracking page may see for an accession number.
#[derive(Debug, Clone)]
pub struct PublicStatus {
    pub status: SampleStatus,
    pub unit_name: Option<String>,
    pub results_ready: bool,
    pub tests: Vec<PublicTestStatus>,
}

/// Reporting queries over one database.
pub struct Reports<'a> {
    db: &'a Database,
}

impl<'a> Reports<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The live monitoring list: substring search plus unit and date filters.
    ///
    /// ADMIN and SUPERVISOR may filter by any unit; UNIT_ADMIN is forced to
    /// their own unit regardless of the requested filter. Matching is
    /// case-insensitive for ASCII (SQLite LIKE).
    pub fn live_samples(
        &self,
        actor: &Actor,
        query: Option<&str>,
        bucket: DateBucket,
        unit_filter: Option<&str>,
    ) -> LabResult<Vec<SampleDetail>> {
        let unit_id = match actor.role {
            Role::UnitAdmin => actor.unit_id.clone(),
            Role::Admin | Role::Supervisor => unit_filter.map(|u| u.to_string()),
            _ => {
                return Err(LabError::Unauthorized(
                    "Live monitoring requires an admin or supervisor role".into(),
                ))
            }
        };

        let filter = SampleFilter {
            unit_id,
            query: query.filter(|q| !q.is_empty()).map(|q| q.to_string()),
            created_range: bucket.range(),
            ..Default::default()
        };
        Ok(self.db.list_sample_details(&filter)?)
    }

    /// Authenticated dashboard search, capped at 20 rows. Queries shorter
    /// than two characters return nothing.
    pub fn search_samples(&self, _actor: &Actor, query: &str) -> LabResult<Vec<SampleDetail>> {
        if query.len() < 2 {
            return Ok(Vec::new());
        }
        let filter = SampleFilter {
            query: Some(query.to_string()),
            limit: Some(PUBLIC_SEARCH_LIMIT),
            ..Default::default()
        };
        Ok(self.db.list_sample_details(&filter)?)
    }

    /// Samples registered within a bucket, for the registration report.
    pub fn registration_report(
        &self,
        actor: &Actor,
        bucket: DateBucket,
        unit_filter: Option<&str>,
    ) -> LabResult<Vec<SampleDetail>> {
        let unit_id = match actor.role {
            Role::Admin => unit_filter.map(|u| u.to_string()),
            Role::UnitAdmin => actor.unit_id.clone(),
            _ => {
                return Err(LabError::Unauthorized(
                    "Registration reports require an admin role".into(),
                ))
            }
        };

        let filter = SampleFilter {
            unit_id,
            created_range: bucket.range(),
            ..Default::default()
        };
        Ok(self.db.list_sample_details(&filter)?)
    }

    /// The scientist dashboard's live panels for one unit.
    pub fn scientist_board(&self, _actor: &Actor, unit_id: &str) -> LabResult<ScientistBoard> {
        let base = SampleFilter {
            unit_id: Some(unit_id.to_string()),
            ..Default::default()
        };

        let new_arrivals = self.db.list_sample_details(&SampleFilter {
            statuses: Some(vec![SampleStatus::Received]),
            ..base.clone()
        })?;
        let ongoing = self.db.list_sample_details(&SampleFilter {
            statuses: Some(vec![SampleStatus::InProcessing, SampleStatus::AwaitingReview]),
            ..base.clone()
        })?;
        let completed = self.db.list_sample_details(&SampleFilter {
            statuses: Some(vec![SampleStatus::Completed]),
            updated_since: Some((Utc::now() - Duration::hours(24)).to_rfc3339()),
            ..base
        })?;

        Ok(ScientistBoard {
            new_arrivals,
            ongoing,
            completed,
        })
    }

    /// Status lookup by accession number for the public tracking page.
    /// No actor: this is the one unauthenticated read.
    pub fn public_status(&self, accession: &str) -> LabResult<Option<PublicStatus>> {
        if accession.is_empty() {
            return Ok(None);
        }
        let sample = match self.db.get_sample_by_accession(accession)? {
            Some(sample) => sample,
            None => return Ok(None),
        };
        let detail = self
            .db
            .get_sample_detail(&sample.id)?
            .ok_or_else(|| LabError::NotFound(format!("Sample {}", sample.id)))?;

        let unit_name = self.db.get_unit(&detail.sample.unit_id)?.map(|u| u.name);
        let tests = detail
            .tests
            .iter()
            .map(|t| PublicTestStatus {
                name: t.test.name.clone(),
                has_result: t.order.status == SampleTestStatus::Completed,
            })
            .collect();

        Ok(Some(PublicStatus {
            status: detail.sample.status,
            unit_name,
            results_ready: detail.sample.status == SampleStatus::Completed,
            tests,
        }))
    }
}
