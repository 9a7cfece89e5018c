//! Sample lifecycle: intake, explicit status transitions, result entry.

use tracing::info;

use crate::db::{Database, DbError};
use crate::models::{Actor, Sample, SampleIntake, SampleStatus, SampleStatusLog};
use crate::{LabError, LabResult};

/// Attempts before giving up on accession disambiguation. Generous enough
/// for bulk registration bursts landing in one millisecond.
const MAX_ACCESSION_ATTEMPTS: u32 = 50;

/// Accession number for a creation instant. The first attempt is
/// `ACC-<unix-millis>`; retries append a suffix so two samples registered in
/// the same millisecond still get distinct numbers.
fn format_accession(millis: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("ACC-{millis}")
    } else {
        format!("ACC-{millis}-{attempt}")
    }
}

/// Lifecycle operations over one database.
pub struct SampleWorkflow<'a> {
    db: &'a Database,
}

impl<'a> SampleWorkflow<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a new sample with its ordered tests.
    ///
    /// Requires an actor with an assigned unit; the sample is owned by that
    /// unit. Starts at RECEIVED with one PENDING row per test and the initial
    /// audit entry.
    pub fn create_sample(&self, actor: &Actor, intake: &SampleIntake) -> LabResult<Sample> {
        let unit_id = actor
            .unit_id
            .clone()
            .ok_or_else(|| LabError::Unauthorized("No unit assigned".into()))?;

        if intake.patient_name.trim().is_empty() {
            return Err(LabError::Validation("Patient name is required".into()));
        }
        if intake.test_ids.is_empty() {
            return Err(LabError::Validation(
                "At least one test must be selected".into(),
            ));
        }
        for test_id in &intake.test_ids {
            if self.db.get_test(test_id)?.is_none() {
                return Err(LabError::NotFound(format!("Test {test_id}")));
            }
        }

        let millis = chrono::Utc::now().timestamp_millis();
        for attempt in 0..MAX_ACCESSION_ATTEMPTS {
            let accession = format_accession(millis, attempt);
            let sample = Sample::new(
                accession,
                intake,
                unit_id.clone(),
                actor.user_id.clone(),
            );
            let log = SampleStatusLog::new(
                sample.id.clone(),
                None,
                SampleStatus::Received,
                actor.user_id.clone(),
                Some("Sample registered".into()),
            );
            match self.db.insert_sample(&sample, &intake.test_ids, &log) {
                Ok(()) => {
                    info!(
                        accession = %sample.accession_number,
                        unit = %sample.unit_id,
                        tests = intake.test_ids.len(),
                        "sample registered"
                    );
                    return Ok(sample);
                }
                Err(DbError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(LabError::Conflict(
            "Could not allocate a unique accession number".into(),
        ))
    }

    /// Explicitly transition a sample, validating against the state machine.
    ///
    /// An optional lab number is stored when supplied; entering IN_PROCESSING
    /// without one is allowed (the intake form may not have known it yet).
    pub fn set_sample_status(
        &self,
        actor: &Actor,
        sample_id: &str,
        to: SampleStatus,
        notes: Option<&str>,
        lab_number: Option<&str>,
    ) -> LabResult<()> {
        let sample = self
            .db
            .get_sample(sample_id)?
            .ok_or_else(|| LabError::NotFound(format!("Sample {sample_id}")))?;

        if !sample.status.can_transition(to) {
            return Err(LabError::Validation(format!(
                "Invalid transition {} -> {}",
                sample.status.as_str(),
                to.as_str()
            )));
        }

        self.db.update_sample_status(
            sample_id,
            sample.status,
            to,
            &actor.user_id,
            notes,
            lab_number,
        )?;
        info!(
            accession = %sample.accession_number,
            from = sample.status.as_str(),
            to = to.as_str(),
            "sample status changed"
        );
        Ok(())
    }

    /// Save a test result. The test completes immediately; when it was the
    /// last outstanding test the sample auto-completes in the same
    /// transaction and the acting user is stamped as processor. Returns
    /// whether the sample completed.
    pub fn record_result(
        &self,
        actor: &Actor,
        sample_id: &str,
        test_id: &str,
        result: &str,
    ) -> LabResult<bool> {
        if result.trim().is_empty() {
            return Err(LabError::Validation("Result text is required".into()));
        }

        let completed = self
            .db
            .record_test_result(sample_id, test_id, result, &actor.user_id)?;
        if completed {
            info!(sample_id, "all tests completed, sample auto-completed");
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, TestDef, Unit, User};

    struct Fixture {
        db: Database,
        receptionist: Actor,
        scientist: Actor,
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
            receptionist: receptionist.actor(),
            scientist: scientist.actor(),
            fbc_id: fbc.id,
            mp_id: mp.id,
            db,
        }
    }

    fn intake(fx: &Fixture) -> SampleIntake {
        SampleIntake {
            patient_name: "Jane Doe".into(),
            test_ids: vec![fx.fbc_id.clone()],
            ..Default::default()
        }
    }

    #[test]
    fn test_format_accession_disambiguates() {
        let base = format_accession(1756200000000, 0);
        assert_eq!(base, "ACC-1756200000000");
        let retry = format_accession(1756200000000, 1);
        assert_ne!(base, retry);
        assert_ne!(format_accession(1756200000000, 2), retry);
    }

    #[test]
    fn test_create_requires_unit() {
        let fx = setup();
        let mut actor = fx.receptionist.clone();
        actor.unit_id = None;

        let err = SampleWorkflow::new(&fx.db)
            .create_sample(&actor, &intake(&fx))
            .unwrap_err();
        assert!(matches!(err, LabError::Unauthorized(_)));
    }

    #[test]
    fn test_create_validates_fields() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);

        let mut no_name = intake(&fx);
        no_name.patient_name = "  ".into();
        assert!(matches!(
            workflow.create_sample(&fx.receptionist, &no_name),
            Err(LabError::Validation(_))
        ));

        let mut no_tests = intake(&fx);
        no_tests.test_ids.clear();
        assert!(matches!(
            workflow.create_sample(&fx.receptionist, &no_tests),
            Err(LabError::Validation(_))
        ));

        let mut bad_test = intake(&fx);
        bad_test.test_ids = vec!["missing".into()];
        assert!(matches!(
            workflow.create_sample(&fx.receptionist, &bad_test),
            Err(LabError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_sample_scenario() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);

        let sample = workflow.create_sample(&fx.receptionist, &intake(&fx)).unwrap();
        assert_eq!(sample.status, SampleStatus::Received);
        assert!(sample.accession_number.starts_with("ACC-"));

        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.tests.len(), 1);
        assert_eq!(detail.status_logs.len(), 1);
        assert_eq!(detail.status_logs[0].from_status, None);
        assert_eq!(detail.status_logs[0].to_status, SampleStatus::Received);
    }

    #[test]
    fn test_rapid_creation_yields_unique_accessions() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);

        let mut accessions = std::collections::HashSet::new();
        for _ in 0..5 {
            let sample = workflow.create_sample(&fx.receptionist, &intake(&fx)).unwrap();
            assert!(accessions.insert(sample.accession_number));
        }
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);
        let sample = workflow.create_sample(&fx.receptionist, &intake(&fx)).unwrap();

        // RECEIVED cannot jump straight to COMPLETED
        let err = workflow
            .set_sample_status(&fx.scientist, &sample.id, SampleStatus::Completed, None, None)
            .unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_delay_and_resume() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);
        let sample = workflow.create_sample(&fx.receptionist, &intake(&fx)).unwrap();

        workflow
            .set_sample_status(
                &fx.scientist,
                &sample.id,
                SampleStatus::InProcessing,
                None,
                Some("LAB-0042"),
            )
            .unwrap();
        workflow
            .set_sample_status(
                &fx.scientist,
                &sample.id,
                SampleStatus::Delayed,
                Some("Analyzer down"),
                None,
            )
            .unwrap();
        workflow
            .set_sample_status(&fx.scientist, &sample.id, SampleStatus::InProcessing, None, None)
            .unwrap();

        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::InProcessing);
        assert_eq!(detail.sample.lab_number.as_deref(), Some("LAB-0042"));
        assert_eq!(detail.status_logs.len(), 4);
    }

    #[test]
    fn test_status_log_replays_history() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);
        let sample = workflow.create_sample(&fx.receptionist, &intake(&fx)).unwrap();

        workflow
            .set_sample_status(&fx.scientist, &sample.id, SampleStatus::InProcessing, None, None)
            .unwrap();
        workflow
            .record_result(&fx.scientist, &sample.id, &fx.fbc_id, "Normal")
            .unwrap();

        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        // Each entry chains from the previous one's to_status
        for pair in detail.status_logs.windows(2) {
            assert_eq!(pair[1].from_status, Some(pair[0].to_status));
        }
        assert_eq!(
            detail.status_logs.last().unwrap().to_status,
            detail.sample.status
        );
    }

    #[test]
    fn test_record_result_auto_completes_iff_last() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);

        let mut two_tests = intake(&fx);
        two_tests.test_ids = vec![fx.fbc_id.clone(), fx.mp_id.clone()];
        let sample = workflow.create_sample(&fx.receptionist, &two_tests).unwrap();
        workflow
            .set_sample_status(&fx.scientist, &sample.id, SampleStatus::InProcessing, None, None)
            .unwrap();

        let completed = workflow
            .record_result(&fx.scientist, &sample.id, &fx.fbc_id, "Normal")
            .unwrap();
        assert!(!completed);

        let completed = workflow
            .record_result(&fx.scientist, &sample.id, &fx.mp_id, "No parasites seen")
            .unwrap();
        assert!(completed);

        let detail = fx.db.get_sample_detail(&sample.id).unwrap().unwrap();
        assert_eq!(detail.sample.status, SampleStatus::Completed);
        assert_eq!(
            detail.sample.processed_by_id.as_deref(),
            Some(fx.scientist.user_id.as_str())
        );
        assert!(detail.all_tests_completed());
    }

    #[test]
    fn test_empty_result_rejected() {
        let fx = setup();
        let workflow = SampleWorkflow::new(&fx.db);
        let sample = workflow.create_sample(&fx.receptionist, &intake(&fx)).unwrap();

        let err = workflow
            .record_result(&fx.scientist, &sample.id, &fx.fbc_id, "  ")
            .unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }
}
