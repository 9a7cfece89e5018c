//! Sample, ordered-test, and status-log database operations.
//!
//! Multi-step writes (intake, status update + log, result entry +
//! auto-complete, claim cascade) each run inside a single transaction so a
//! crash between steps cannot leave a claimed test on a sample still marked
//! RECEIVED or a transition without its audit row.

use rusqlite::{params, Connection, OptionalExtension};

use super::{is_unique_violation, Database, DbError, DbResult};
use crate::models::{
    Sample, SampleDetail, SampleStatus, SampleStatusLog, SampleTest, SampleTestDetail,
    SampleTestStatus, TestDef,
};

/// Filter for sample listing queries.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    /// Restrict to one unit
    pub unit_id: Option<String>,
    /// Substring match on patient name, accession number, or lab number
    /// (case-insensitive for ASCII, SQLite LIKE semantics)
    pub query: Option<String>,
    /// Half-open `[start, end)` RFC 3339 bounds on created_at
    pub created_range: Option<(String, String)>,
    /// Restrict to these sample statuses
    pub statuses: Option<Vec<SampleStatus>>,
    /// Only samples updated at or after this RFC 3339 instant
    pub updated_since: Option<String>,
    pub limit: Option<usize>,
}

/// Outcome of a claim: whether the cascade started sample processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub sample_started: bool,
}

const SAMPLE_COLUMNS: &str = "id, accession_number, lab_number, patient_name, age, gender, \
     clinical_info, specimen_type, source, ward_id, unit_id, created_by_id, \
     processed_by_id, status, created_at, updated_at";

impl Database {
    /// Insert a sample with its ordered tests and the initial status-log row,
    /// all in one transaction.
    ///
    /// An accession-number collision surfaces as [`DbError::Conflict`] so the
    /// caller can retry with a disambiguated number.
    pub fn insert_sample(
        &self,
        sample: &Sample,
        test_ids: &[String],
        initial_log: &SampleStatusLog,
    ) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let inserted = tx.execute(
            &format!("INSERT INTO samples ({SAMPLE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"),
            params![
                sample.id,
                sample.accession_number,
                sample.lab_number,
                sample.patient_name,
                sample.age,
                sample.gender,
                sample.clinical_info,
                sample.specimen_type,
                sample.source,
                sample.ward_id,
                sample.unit_id,
                sample.created_by_id,
                sample.processed_by_id,
                sample.status.as_str(),
                sample.created_at,
                sample.updated_at,
            ],
        );
        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(DbError::Conflict(format!(
                    "Accession number already exists: {}",
                    sample.accession_number
                )));
            }
            return Err(err.into());
        }

        for test_id in test_ids {
            tx.execute(
                "INSERT INTO sample_tests (sample_id, test_id, status) VALUES (?1, ?2, 'PENDING')",
                params![sample.id, test_id],
            )?;
        }

        insert_status_log(&tx, initial_log)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_sample(&self, id: &str) -> DbResult<Option<Sample>> {
        self.conn
            .query_row(
                &format!("SELECT {SAMPLE_COLUMNS} FROM samples WHERE id = ?"),
                [id],
                map_sample_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn get_sample_by_accession(&self, accession: &str) -> DbResult<Option<Sample>> {
        self.conn
            .query_row(
                &format!("SELECT {SAMPLE_COLUMNS} FROM samples WHERE accession_number = ?"),
                [accession],
                map_sample_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// A sample joined with its tests (plus catalog definitions) and full
    /// status history, oldest log first.
    pub fn get_sample_detail(&self, id: &str) -> DbResult<Option<SampleDetail>> {
        let sample = match self.get_sample(id)? {
            Some(sample) => sample,
            None => return Ok(None),
        };
        let tests = self.list_sample_test_details(id)?;
        let status_logs = self.list_status_logs(id)?;
        Ok(Some(SampleDetail {
            sample,
            tests,
            status_logs,
        }))
    }

    /// List samples matching a filter, newest first, with joined details.
    pub fn list_sample_details(&self, filter: &SampleFilter) -> DbResult<Vec<SampleDetail>> {
        let mut sql = format!("SELECT {SAMPLE_COLUMNS} FROM samples WHERE 1=1");
        let mut bind: Vec<String> = Vec::new();

        if let Some(unit_id) = &filter.unit_id {
            sql.push_str(" AND unit_id = ?");
            bind.push(unit_id.clone());
        }
        if let Some(query) = &filter.query {
            sql.push_str(
                " AND (patient_name LIKE ? OR accession_number LIKE ? OR lab_number LIKE ?)",
            );
            let pattern = format!("%{}%", query);
            bind.push(pattern.clone());
            bind.push(pattern.clone());
            bind.push(pattern);
        }
        if let Some((start, end)) = &filter.created_range {
            sql.push_str(" AND created_at >= ? AND created_at < ?");
            bind.push(start.clone());
            bind.push(end.clone());
        }
        if let Some(statuses) = &filter.statuses {
            if !statuses.is_empty() {
                let placeholders = vec!["?"; statuses.len()].join(", ");
                sql.push_str(&format!(" AND status IN ({placeholders})"));
                for status in statuses {
                    bind.push(status.as_str().to_string());
                }
            }
        }
        if let Some(since) = &filter.updated_since {
            sql.push_str(" AND updated_at >= ?");
            bind.push(since.clone());
        }
        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bind.iter()), map_sample_row)?;

        let mut samples: Vec<Sample> = Vec::new();
        for row in rows {
            samples.push(row?.try_into()?);
        }

        let mut details = Vec::with_capacity(samples.len());
        for sample in samples {
            let tests = self.list_sample_test_details(&sample.id)?;
            let status_logs = self.list_status_logs(&sample.id)?;
            details.push(SampleDetail {
                sample,
                tests,
                status_logs,
            });
        }
        Ok(details)
    }

    pub fn get_sample_test(&self, sample_id: &str, test_id: &str) -> DbResult<Option<SampleTest>> {
        self.conn
            .query_row(
                r#"
                SELECT sample_id, test_id, status, result, assigned_to_id, completed_at
                FROM sample_tests
                WHERE sample_id = ?1 AND test_id = ?2
                "#,
                params![sample_id, test_id],
                map_sample_test_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Explicit status transition: guarded update plus audit row in one
    /// transaction. Fails with Conflict if the sample's status is no longer
    /// `from` (concurrent change since the caller read it).
    pub fn update_sample_status(
        &self,
        sample_id: &str,
        from: SampleStatus,
        to: SampleStatus,
        user_id: &str,
        notes: Option<&str>,
        lab_number: Option<&str>,
    ) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().to_rfc3339();

        let rows_affected = tx.execute(
            r#"
            UPDATE samples SET
                status = ?3,
                lab_number = COALESCE(?4, lab_number),
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
            params![sample_id, from.as_str(), to.as_str(), lab_number, now],
        )?;
        if rows_affected == 0 {
            return Err(DbError::Conflict(format!(
                "Sample is no longer {}",
                from.as_str()
            )));
        }

        let log = SampleStatusLog::new(
            sample_id.to_string(),
            Some(from),
            to,
            user_id.to_string(),
            notes.map(|n| n.to_string()),
        );
        insert_status_log(&tx, &log)?;
        tx.commit()?;
        Ok(())
    }

    /// Save a test result and, inside the same transaction, auto-complete the
    /// sample when this was the last outstanding test. Returns whether the
    /// sample completed.
    pub fn record_test_result(
        &self,
        sample_id: &str,
        test_id: &str,
        result: &str,
        user_id: &str,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().to_rfc3339();

        let rows_affected = tx.execute(
            r#"
            UPDATE sample_tests SET
                result = ?3,
                status = 'COMPLETED',
                completed_at = ?4
            WHERE sample_id = ?1 AND test_id = ?2
            "#,
            params![sample_id, test_id, result, now],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!(
                "Sample test {sample_id}/{test_id}"
            )));
        }

        let pending: i64 = tx.query_row(
            "SELECT COUNT(*) FROM sample_tests WHERE sample_id = ? AND status != 'COMPLETED'",
            [sample_id],
            |row| row.get(0),
        )?;

        let current: String = tx
            .query_row("SELECT status FROM samples WHERE id = ?", [sample_id], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("Sample {sample_id}")))?;
        let current = parse_status(&current)?;

        let mut completed = false;
        if pending == 0 && current != SampleStatus::Completed {
            tx.execute(
                r#"
                UPDATE samples SET
                    status = 'COMPLETED',
                    processed_by_id = ?2,
                    updated_at = ?3
                WHERE id = ?1
                "#,
                params![sample_id, user_id, now],
            )?;
            let log = SampleStatusLog::new(
                sample_id.to_string(),
                Some(current),
                SampleStatus::Completed,
                user_id.to_string(),
                Some("All tests completed".to_string()),
            );
            insert_status_log(&tx, &log)?;
            completed = true;
        }

        tx.commit()?;
        Ok(completed)
    }

    /// Assign an unclaimed test to a scientist. When the sample is still
    /// RECEIVED this is the first claim, and the sample transitions to
    /// IN_PROCESSING within the same transaction.
    pub fn claim_test(&self, sample_id: &str, test_id: &str, user_id: &str) -> DbResult<ClaimOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let assigned: Option<Option<String>> = tx
            .query_row(
                "SELECT assigned_to_id FROM sample_tests WHERE sample_id = ?1 AND test_id = ?2",
                params![sample_id, test_id],
                |row| row.get(0),
            )
            .optional()?;
        match assigned {
            None => {
                return Err(DbError::NotFound(format!(
                    "Sample test {sample_id}/{test_id}"
                )))
            }
            Some(Some(_)) => return Err(DbError::Conflict("Test already claimed".to_string())),
            Some(None) => {}
        }

        tx.execute(
            "UPDATE sample_tests SET assigned_to_id = ?3 WHERE sample_id = ?1 AND test_id = ?2",
            params![sample_id, test_id, user_id],
        )?;

        let current: String = tx.query_row(
            "SELECT status FROM samples WHERE id = ?",
            [sample_id],
            |row| row.get(0),
        )?;
        let current = parse_status(&current)?;

        let mut sample_started = false;
        if current == SampleStatus::Received {
            let now = chrono::Utc::now().to_rfc3339();
            tx.execute(
                "UPDATE samples SET status = 'IN_PROCESSING', updated_at = ?2 WHERE id = ?1",
                params![sample_id, now],
            )?;
            let log = SampleStatusLog::new(
                sample_id.to_string(),
                Some(SampleStatus::Received),
                SampleStatus::InProcessing,
                user_id.to_string(),
                Some("First test claimed".to_string()),
            );
            insert_status_log(&tx, &log)?;
            sample_started = true;
        }

        tx.commit()?;
        Ok(ClaimOutcome { sample_started })
    }

    /// Release a claimed test. Only the current claimant may release it; the
    /// sample status is deliberately left untouched.
    pub fn unclaim_test(&self, sample_id: &str, test_id: &str, user_id: &str) -> DbResult<()> {
        let assigned: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT assigned_to_id FROM sample_tests WHERE sample_id = ?1 AND test_id = ?2",
                params![sample_id, test_id],
                |row| row.get(0),
            )
            .optional()?;
        match assigned {
            None => {
                return Err(DbError::NotFound(format!(
                    "Sample test {sample_id}/{test_id}"
                )))
            }
            Some(claimant) if claimant.as_deref() != Some(user_id) => {
                return Err(DbError::Conflict("Not assigned to you".to_string()))
            }
            Some(_) => {}
        }

        self.conn.execute(
            "UPDATE sample_tests SET assigned_to_id = NULL WHERE sample_id = ?1 AND test_id = ?2",
            params![sample_id, test_id],
        )?;
        Ok(())
    }

    fn list_sample_test_details(&self, sample_id: &str) -> DbResult<Vec<SampleTestDetail>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT st.sample_id, st.test_id, st.status, st.result, st.assigned_to_id, st.completed_at,
                   t.id, t.name, t.expected_tat_minutes, t.unit_id, t.bench_id
            FROM sample_tests st
            JOIN tests t ON t.id = st.test_id
            WHERE st.sample_id = ?
            ORDER BY t.name
            "#,
        )?;
        let rows = stmt.query_map([sample_id], |row| {
            Ok((
                map_sample_test_row(row)?,
                TestDef {
                    id: row.get(6)?,
                    name: row.get(7)?,
                    expected_tat_minutes: row.get(8)?,
                    unit_id: row.get(9)?,
                    bench_id: row.get(10)?,
                },
            ))
        })?;

        let mut details = Vec::new();
        for row in rows {
            let (order_row, test) = row?;
            details.push(SampleTestDetail {
                order: order_row.try_into()?,
                test,
            });
        }
        Ok(details)
    }

    fn list_status_logs(&self, sample_id: &str) -> DbResult<Vec<SampleStatusLog>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, sample_id, from_status, to_status, user_id, notes, timestamp
            FROM sample_status_logs
            WHERE sample_id = ?
            ORDER BY timestamp ASC, rowid ASC
            "#,
        )?;
        let rows = stmt.query_map([sample_id], |row| {
            Ok(StatusLogRow {
                id: row.get(0)?,
                sample_id: row.get(1)?,
                from_status: row.get(2)?,
                to_status: row.get(3)?,
                user_id: row.get(4)?,
                notes: row.get(5)?,
                timestamp: row.get(6)?,
            })
        })?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.try_into()?);
        }
        Ok(logs)
    }
}

fn insert_status_log(conn: &Connection, log: &SampleStatusLog) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO sample_status_logs (id, sample_id, from_status, to_status, user_id, notes, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            log.id,
            log.sample_id,
            log.from_status.map(|s| s.as_str()),
            log.to_status.as_str(),
            log.user_id,
            log.notes,
            log.timestamp,
        ],
    )?;
    Ok(())
}

fn parse_status(s: &str) -> DbResult<SampleStatus> {
    SampleStatus::parse(s).ok_or_else(|| DbError::Constraint(format!("Unknown sample status: {s}")))
}

struct SampleRow {
    id: String,
    accession_number: String,
    lab_number: Option<String>,
    patient_name: String,
    age: Option<i64>,
    gender: Option<String>,
    clinical_info: Option<String>,
    specimen_type: Option<String>,
    source: Option<String>,
    ward_id: Option<String>,
    unit_id: String,
    created_by_id: String,
    processed_by_id: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

fn map_sample_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleRow> {
    Ok(SampleRow {
        id: row.get(0)?,
        accession_number: row.get(1)?,
        lab_number: row.get(2)?,
        patient_name: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        clinical_info: row.get(6)?,
        specimen_type: row.get(7)?,
        source: row.get(8)?,
        ward_id: row.get(9)?,
        unit_id: row.get(10)?,
        created_by_id: row.get(11)?,
        processed_by_id: row.get(12)?,
        status: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

impl TryFrom<SampleRow> for Sample {
    type Error = DbError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        Ok(Sample {
            id: row.id,
            accession_number: row.accession_number,
            lab_number: row.lab_number,
            patient_name: row.patient_name,
            age: row.age,
            gender: row.gender,
            clinical_info: row.clinical_info,
            specimen_type: row.specimen_type,
            source: row.source,
            ward_id: row.ward_id,
            unit_id: row.unit_id,
            created_by_id: row.created_by_id,
            processed_by_id: row.processed_by_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct SampleTestRow {
    sample_id: String,
    test_id: String,
    status: String,
    result: Option<String>,
    assigned_to_id: Option<String>,
    completed_at: Option<String>,
}

fn map_sample_test_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleTestRow> {
    Ok(SampleTestRow {
        sample_id: row.get(0)?,
        test_id: row.get(1)?,
        status: row.get(2)?,
        result: row.get(3)?,
        assigned_to_id: row.get(4)?,
        completed_at: row.get(5)?,
    })
}

impl TryFrom<SampleTestRow> for SampleTest {
    type Error = DbError;

    fn try_from(row: SampleTestRow) -> Result<Self, Self::Error> {
        let status = SampleTestStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown test status: {}", row.status)))?;
        Ok(SampleTest {
            sample_id: row.sample_id,
            test_id: row.test_id,
            status,
            result: row.result,
            assigned_to_id: row.assigned_to_id,
            completed_at: row.completed_at,
        })
    }
}

struct StatusLogRow {
    id: String,
    sample_id: String,
    from_status: Option<String>,
    to_status: String,
    user_id: String,
    notes: Option<String>,
    timestamp: String,
}

impl TryFrom<StatusLogRow> for SampleStatusLog {
    type Error = DbError;

    fn try_from(row: StatusLogRow) -> Result<Self, Self::Error> {
        let from_status = row.from_status.as_deref().map(parse_status).transpose()?;
        let to_status = parse_status(&row.to_status)?;
        Ok(SampleStatusLog {
            id: row.id,
            sample_id: row.sample_id,
            from_status,
            to_status,
            user_id: row.user_id,
            notes: row.notes,
            timestamp: row.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SampleIntake, TestDef, Unit, User};

    struct Fixture {
        db: Database,
        unit_id: String,
        receptionist_id: String,
        scientist_id: String,
        fbc_id: String,
        mp_id: String,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();

        let unit = Unit::new("Haematology".into(), 60);
        db.insert_unit(&unit).unwrap();

        let fbc = TestDef::new("Full Blood Count (FBC)".into(), 60, unit.id.clone());
        let mp = TestDef::new("Malaria Parasite".into(), 45, unit.id.clone());
        db.insert_test(&fbc).unwrap();
        db.insert_test(&mp).unwrap();

        let mut receptionist = User::new(
            "Receptionist".into(),
            "reception@lab.test".into(),
            "h".into(),
            Role::Reception,
        );
        receptionist.unit_id = Some(unit.id.clone());
        db.insert_user(&receptionist).unwrap();

        let mut scientist = User::new(
            "Scientist".into(),
            "scientist@lab.test".into(),
            "h".into(),
            Role::LabScientist,
        );
        scientist.unit_id = Some(unit.id.clone());
        db.insert_user(&scientist).unwrap();

        Fixture {
            db,
            unit_id: unit.id,
            receptionist_id: receptionist.id,
            scientist_id: scientist.id,
            fbc_id: fbc.id,
            mp_id: mp.id,
        }
    }

    fn insert_sample(fx: &Fixture, accession: &str, test_ids: &[String]) -> Sample {
        let intake = SampleIntake {
            patient_name: "Jane Doe".into(),
            test_ids: test_ids.to_vec(),
            ..Default::default()
        };
        let sample = Sample::new(
            accession.into(),
            &intake,
            fx.unit_id.clone(),
            fx.receptionist_id.clone(),
        );
        let log = SampleStatusLog::new(
            sample.id.clone(),
            None,
            SampleStatus::Received,
            fx.receptionist_id.clone(),
            Some("Sample registered".into()),
        );
        fx.db.insert_sample(&sample, test_ids, &log).unwrap();
        sample
    }

    #[test]
    fn test_intake_inserts_tests_and_log() {
        let fx = setup();
        let sample = insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone(), fx.mp_id.clone()]);

        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::Received);
        assert_eq!(detail.tests.len(), 2);
        assert!(detail
            .tests
            .iter()
            .all(|t| t.order.status == SampleTestStatus::Pending));
        assert_eq!(detail.status_logs.len(), 1);
        assert_eq!(detail.status_logs[0].from_status, None);
        assert_eq!(detail.status_logs[0].to_status, SampleStatus::Received);
    }

    #[test]
    fn test_duplicate_accession_is_conflict() {
        let fx = setup();
        insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone()]);

        let intake = SampleIntake {
            patient_name: "John Doe".into(),
            test_ids: vec![fx.fbc_id.clone()],
            ..Default::default()
        };
        let dup = Sample::new(
            "ACC-1".into(),
            &intake,
            fx.unit_id.clone(),
            fx.receptionist_id.clone(),
        );
        let log = SampleStatusLog::new(
            dup.id.clone(),
            None,
            SampleStatus::Received,
            fx.receptionist_id.clone(),
            None,
        );
        let err = fx
            .db
            .insert_sample(&dup, &[fx.fbc_id.clone()], &log)
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn test_claim_cascades_first_claim_only() {
        let fx = setup();
        let sample = insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone(), fx.mp_id.clone()]);

        let outcome = fx
            .db
            .claim_test(&sample.id, &fx.fbc_id, &fx.scientist_id)
            .unwrap();
        assert!(outcome.sample_started);

        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::InProcessing);
        let last = detail.status_logs.last().unwrap();
        assert_eq!(last.to_status, SampleStatus::InProcessing);
        assert_eq!(last.notes.as_deref(), Some("First test claimed"));

        // Second claim on a different test: no further cascade
        let outcome = fx
            .db
            .claim_test(&sample.id, &fx.mp_id, &fx.scientist_id)
            .unwrap();
        assert!(!outcome.sample_started);
    }

    #[test]
    fn test_claim_already_claimed_conflicts() {
        let fx = setup();
        let sample = insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone()]);

        fx.db
            .claim_test(&sample.id, &fx.fbc_id, &fx.scientist_id)
            .unwrap();
        let err = fx
            .db
            .claim_test(&sample.id, &fx.fbc_id, &fx.receptionist_id)
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn test_unclaim_only_by_claimant() {
        let fx = setup();
        let sample = insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone()]);

        fx.db
            .claim_test(&sample.id, &fx.fbc_id, &fx.scientist_id)
            .unwrap();

        let err = fx
            .db
            .unclaim_test(&sample.id, &fx.fbc_id, &fx.receptionist_id)
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        fx.db
            .unclaim_test(&sample.id, &fx.fbc_id, &fx.scientist_id)
            .unwrap();
        let test = fx
            .db
            .get_sample_test(&sample.id, &fx.fbc_id)
            .unwrap()
            .unwrap();
        assert!(test.assigned_to_id.is_none());

        // Status stays IN_PROCESSING even with nothing claimed
        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::InProcessing);
    }

    #[test]
    fn test_result_auto_completes_only_when_last() {
        let fx = setup();
        let sample = insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone(), fx.mp_id.clone()]);
        fx.db
            .claim_test(&sample.id, &fx.fbc_id, &fx.scientist_id)
            .unwrap();

        let completed = fx
            .db
            .record_test_result(&sample.id, &fx.fbc_id, "Normal", &fx.scientist_id)
            .unwrap();
        assert!(!completed);
        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::InProcessing);
        assert!(detail.sample.processed_by_id.is_none());

        let completed = fx
            .db
            .record_test_result(&sample.id, &fx.mp_id, "No parasites seen", &fx.scientist_id)
            .unwrap();
        assert!(completed);
        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::Completed);
        assert_eq!(detail.sample.processed_by_id, Some(fx.scientist_id.clone()));
        let last = detail.status_logs.last().unwrap();
        assert_eq!(last.notes.as_deref(), Some("All tests completed"));
    }

    #[test]
    fn test_update_status_guarded_by_from() {
        let fx = setup();
        let sample = insert_sample(&fx, "ACC-1", &[fx.fbc_id.clone()]);

        fx.db
            .update_sample_status(
                &sample.id,
                SampleStatus::Received,
                SampleStatus::InProcessing,
                &fx.scientist_id,
                None,
                Some("LAB-0042"),
            )
            .unwrap();

        let retrieved = fx.db.get_sample(&sample.id).unwrap().unwrap();
        assert_eq!(retrieved.status, SampleStatus::InProcessing);
        assert_eq!(retrieved.lab_number.as_deref(), Some("LAB-0042"));

        // Stale `from` is rejected and leaves no audit row behind
        let err = fx
            .db
            .update_sample_status(
                &sample.id,
                SampleStatus::Received,
                SampleStatus::Delayed,
                &fx.scientist_id,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.status_logs.len(), 2);
    }

    #[test]
    fn test_filter_by_query_and_status() {
        let fx = setup();
        let s1 = insert_sample(&fx, "ACC-100", &[fx.fbc_id.clone()]);
        let s2 = insert_sample(&fx, "ACC-200", &[fx.mp_id.clone()]);
        fx.db
            .claim_test(&s2.id, &fx.mp_id, &fx.scientist_id)
            .unwrap();

        let by_accession = fx
            .db
            .list_sample_details(&SampleFilter {
                query: Some("ACC-100".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_accession.len(), 1);
        assert_eq!(by_accession[0].sample.id, s1.id);

        let in_processing = fx
            .db
            .list_sample_details(&SampleFilter {
                statuses: Some(vec![SampleStatus::InProcessing]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(in_processing.len(), 1);
        assert_eq!(in_processing[0].sample.id, s2.id);

        let limited = fx
            .db
            .list_sample_details(&SampleFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
