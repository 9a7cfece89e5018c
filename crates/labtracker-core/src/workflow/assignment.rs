//! Test assignment: claiming, releasing, and bench preferences.

use tracing::info;

use crate::db::{ClaimOutcome, Database};
use crate::models::{Actor, Bench};
use crate::{LabError, LabResult};

/// Assignment operations over one database.
pub struct Assignments<'a> {
    db: &'a Database,
}

impl<'a> Assignments<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Claim an unassigned test for the acting scientist.
    ///
    /// Claiming an already-claimed test fails with Conflict. The first claim
    /// on a RECEIVED sample moves it to IN_PROCESSING (one transaction, see
    /// [`Database::claim_test`]).
    pub fn claim_test(
        &self,
        actor: &Actor,
        sample_id: &str,
        test_id: &str,
    ) -> LabResult<ClaimOutcome> {
        let outcome = self.db.claim_test(sample_id, test_id, &actor.user_id)?;
        info!(
            sample_id,
            test_id,
            started = outcome.sample_started,
            "test claimed"
        );
        Ok(outcome)
    }

    /// Release a claimed test. Only the current claimant may release it.
    /// The sample keeps its status even when this was the last claimed test.
    pub fn unclaim_test(&self, actor: &Actor, sample_id: &str, test_id: &str) -> LabResult<()> {
        self.db.unclaim_test(sample_id, test_id, &actor.user_id)?;
        info!(sample_id, test_id, "test released");
        Ok(())
    }

    /// Replace a user's bench-preference set. Self-service only: the actor
    /// must be the user whose preferences change.
    pub fn replace_benches(
        &self,
        actor: &Actor,
        user_id: &str,
        bench_ids: &[String],
    ) -> LabResult<()> {
        if actor.user_id != user_id {
            return Err(LabError::Unauthorized(
                "Bench preferences are self-service".into(),
            ));
        }
        for bench_id in bench_ids {
            if self.db.get_bench(bench_id)?.is_none() {
                return Err(LabError::NotFound(format!("Bench {bench_id}")));
            }
        }
        self.db.replace_user_benches(user_id, bench_ids)?;
        Ok(())
    }

    /// A user's preferred benches, for work-queue filtering.
    pub fn user_benches(&self, user_id: &str) -> LabResult<Vec<Bench>> {
        Ok(self.db.list_user_benches(user_id)?)
    }

    /// All benches in a unit.
    pub fn unit_benches(&self, unit_id: &str) -> LabResult<Vec<Bench>> {
        Ok(self.db.list_benches(Some(unit_id))?)
    }
}
