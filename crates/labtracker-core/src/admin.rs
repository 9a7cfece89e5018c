//! Role-gated administration of units, wards, benches, the test catalog,
//! users, and site settings.
//!
//! ADMIN manages everything. UNIT_ADMIN manages benches, tests, and users
//! inside their own unit only. Every other role is rejected here.

use tracing::info;

use crate::auth::{hash_password, NewUser};
use crate::db::Database;
use crate::models::{Actor, Bench, Role, SiteSettings, TestDef, Unit, User, Ward};
use crate::{LabError, LabResult};

/// Administrative operations over one database.
pub struct Admin<'a> {
    db: &'a Database,
}

impl<'a> Admin<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn require_admin(&self, actor: &Actor) -> LabResult<()> {
        if actor.role == Role::Admin {
            Ok(())
        } else {
            Err(LabError::Unauthorized("Requires the ADMIN role".into()))
        }
    }

    /// ADMIN passes for any unit; UNIT_ADMIN only for their own.
    fn require_unit_scope(&self, actor: &Actor, unit_id: &str) -> LabResult<()> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::UnitAdmin if actor.unit_id.as_deref() == Some(unit_id) => Ok(()),
            Role::UnitAdmin => Err(LabError::Unauthorized(
                "UNIT_ADMIN may only manage their own unit".into(),
            )),
            _ => Err(LabError::Unauthorized(
                "Requires the ADMIN or UNIT_ADMIN role".into(),
            )),
        }
    }

    // =========================================================================
    // Units (ADMIN only)
    // =========================================================================

    pub fn create_unit(
        &self,
        actor: &Actor,
        name: &str,
        default_tat_minutes: i64,
    ) -> LabResult<Unit> {
        self.require_admin(actor)?;
        if name.trim().is_empty() {
            return Err(LabError::Validation("Unit name is required".into()));
        }
        let unit = Unit::new(name.trim().to_string(), default_tat_minutes);
        self.db.insert_unit(&unit)?;
        info!(unit_id = %unit.id, name = %unit.name, "unit created");
        Ok(unit)
    }

    pub fn update_unit(&self, actor: &Actor, unit: &Unit) -> LabResult<()> {
        self.require_admin(actor)?;
        if !self.db.update_unit(unit)? {
            return Err(LabError::NotFound(format!("Unit {}", unit.id)));
        }
        Ok(())
    }

    pub fn delete_unit(&self, actor: &Actor, unit_id: &str) -> LabResult<()> {
        self.require_admin(actor)?;
        if !self.db.delete_unit(unit_id)? {
            return Err(LabError::NotFound(format!("Unit {unit_id}")));
        }
        info!(unit_id, "unit deleted");
        Ok(())
    }

    pub fn list_units(&self) -> LabResult<Vec<Unit>> {
        Ok(self.db.list_units()?)
    }

    // =========================================================================
    // Wards (ADMIN only)
    // =========================================================================

    pub fn create_ward(&self, actor: &Actor, name: &str) -> LabResult<Ward> {
        self.require_admin(actor)?;
        if name.trim().is_empty() {
            return Err(LabError::Validation("Ward name is required".into()));
        }
        let ward = Ward::new(name.trim().to_string());
        self.db.insert_ward(&ward)?;
        Ok(ward)
    }

    pub fn update_ward(&self, actor: &Actor, ward: &Ward) -> LabResult<()> {
        self.require_admin(actor)?;
        if !self.db.update_ward(ward)? {
            return Err(LabError::NotFound(format!("Ward {}", ward.id)));
        }
        Ok(())
    }

    pub fn delete_ward(&self, actor: &Actor, ward_id: &str) -> LabResult<()> {
        self.require_admin(actor)?;
        if !self.db.delete_ward(ward_id)? {
            return Err(LabError::NotFound(format!("Ward {ward_id}")));
        }
        Ok(())
    }

    pub fn list_wards(&self) -> LabResult<Vec<Ward>> {
        Ok(self.db.list_wards()?)
    }

    // =========================================================================
    // Benches (ADMIN or owning UNIT_ADMIN)
    // =========================================================================

    pub fn create_bench(&self, actor: &Actor, name: &str, unit_id: &str) -> LabResult<Bench> {
        self.require_unit_scope(actor, unit_id)?;
        if name.trim().is_empty() {
            return Err(LabError::Validation("Bench name is required".into()));
        }
        if self.db.get_unit(unit_id)?.is_none() {
            return Err(LabError::NotFound(format!("Unit {unit_id}")));
        }
        let bench = Bench::new(name.trim().to_string(), unit_id.to_string());
        self.db.insert_bench(&bench)?;
        Ok(bench)
    }

    pub fn rename_bench(&self, actor: &Actor, bench_id: &str, name: &str) -> LabResult<()> {
        let mut bench = self
            .db
            .get_bench(bench_id)?
            .ok_or_else(|| LabError::NotFound(format!("Bench {bench_id}")))?;
        self.require_unit_scope(actor, &bench.unit_id)?;
        bench.name = name.trim().to_string();
        self.db.update_bench(&bench)?;
        Ok(())
    }

    pub fn delete_bench(&self, actor: &Actor, bench_id: &str) -> LabResult<()> {
        let bench = self
            .db
            .get_bench(bench_id)?
            .ok_or_else(|| LabError::NotFound(format!("Bench {bench_id}")))?;
        self.require_unit_scope(actor, &bench.unit_id)?;
        self.db.delete_bench(bench_id)?;
        Ok(())
    }

    // =========================================================================
    // Test Catalog (ADMIN or owning UNIT_ADMIN)
    // =========================================================================

    pub fn create_test(
        &self,
        actor: &Actor,
        name: &str,
        expected_tat_minutes: i64,
        unit_id: &str,
    ) -> LabResult<TestDef> {
        self.require_unit_scope(actor, unit_id)?;
        if name.trim().is_empty() {
            return Err(LabError::Validation("Test name is required".into()));
        }
        if self.db.get_unit(unit_id)?.is_none() {
            return Err(LabError::NotFound(format!("Unit {unit_id}")));
        }
        let test = TestDef::new(name.trim().to_string(), expected_tat_minutes, unit_id.to_string());
        self.db.insert_test(&test)?;
        info!(test_id = %test.id, name = %test.name, "test created");
        Ok(test)
    }

    pub fn update_test(&self, actor: &Actor, test: &TestDef) -> LabResult<()> {
        self.require_unit_scope(actor, &test.unit_id)?;
        if !self.db.update_test(test)? {
            return Err(LabError::NotFound(format!("Test {}", test.id)));
        }
        Ok(())
    }

    pub fn delete_test(&self, actor: &Actor, test_id: &str) -> LabResult<()> {
        let test = self
            .db
            .get_test(test_id)?
            .ok_or_else(|| LabError::NotFound(format!("Test {test_id}")))?;
        self.require_unit_scope(actor, &test.unit_id)?;
        self.db.delete_test(test_id)?;
        Ok(())
    }

    /// Attach a test to a bench (or detach with `None`). The bench must
    /// belong to the test's unit.
    pub fn assign_test_to_bench(
        &self,
        actor: &Actor,
        test_id: &str,
        bench_id: Option<&str>,
    ) -> LabResult<()> {
        let mut test = self
            .db
            .get_test(test_id)?
            .ok_or_else(|| LabError::NotFound(format!("Test {test_id}")))?;
        self.require_unit_scope(actor, &test.unit_id)?;

        if let Some(bench_id) = bench_id {
            let bench = self
                .db
                .get_bench(bench_id)?
                .ok_or_else(|| LabError::NotFound(format!("Bench {bench_id}")))?;
            if bench.unit_id != test.unit_id {
                return Err(LabError::Validation(
                    "Bench belongs to a different unit".into(),
                ));
            }
        }
        test.bench_id = bench_id.map(|b| b.to_string());
        self.db.update_test(&test)?;
        Ok(())
    }

    // =========================================================================
    // Users (ADMIN or owning UNIT_ADMIN)
    // =========================================================================

    /// Create a user with an explicit role. UNIT_ADMIN creations are forced
    /// into the admin's own unit and may not grant the ADMIN role.
    pub fn create_user(&self, actor: &Actor, mut form: NewUser) -> LabResult<User> {
        match actor.role {
            Role::Admin => {}
            Role::UnitAdmin => {
                if form.role == Some(Role::Admin) {
                    return Err(LabError::Unauthorized(
                        "UNIT_ADMIN may not grant the ADMIN role".into(),
                    ));
                }
                form.unit_id = actor.unit_id.clone();
            }
            _ => {
                return Err(LabError::Unauthorized(
                    "Requires the ADMIN or UNIT_ADMIN role".into(),
                ))
            }
        }

        if form.name.trim().is_empty() || form.email.trim().is_empty() {
            return Err(LabError::Validation("Name and email are required".into()));
        }
        if form.password.is_empty() {
            return Err(LabError::Validation("Password is required".into()));
        }
        if self.db.get_user_by_email(&form.email)?.is_some() {
            return Err(LabError::Conflict("User already exists".into()));
        }

        let mut user = User::new(
            form.name,
            form.email,
            hash_password(&form.password),
            form.role.unwrap_or(Role::LabScientist),
        );
        user.unit_id = form.unit_id;
        self.db.insert_user(&user)?;
        info!(user_id = %user.id, role = user.role.as_str(), "user created");
        Ok(user)
    }

    pub fn update_user(&self, actor: &Actor, user: &User) -> LabResult<()> {
        self.require_user_scope(actor, &user.id)?;
        if actor.role == Role::UnitAdmin && user.role == Role::Admin {
            return Err(LabError::Unauthorized(
                "UNIT_ADMIN may not grant the ADMIN role".into(),
            ));
        }
        if !self.db.update_user(user)? {
            return Err(LabError::NotFound(format!("User {}", user.id)));
        }
        Ok(())
    }

    pub fn delete_user(&self, actor: &Actor, user_id: &str) -> LabResult<()> {
        self.require_user_scope(actor, user_id)?;
        self.db.delete_user(user_id)?;
        info!(user_id, "user deleted");
        Ok(())
    }

    /// ADMIN lists every user; UNIT_ADMIN only those in their own unit.
    pub fn list_users(&self, actor: &Actor) -> LabResult<Vec<User>> {
        match actor.role {
            Role::Admin => Ok(self.db.list_users()?),
            Role::UnitAdmin => match &actor.unit_id {
                Some(unit_id) => Ok(self.db.list_users_in_unit(unit_id)?),
                None => Ok(Vec::new()),
            },
            _ => Err(LabError::Unauthorized(
                "Requires the ADMIN or UNIT_ADMIN role".into(),
            )),
        }
    }

    fn require_user_scope(&self, actor: &Actor, user_id: &str) -> LabResult<()> {
        let target = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| LabError::NotFound(format!("User {user_id}")))?;
        match actor.role {
            Role::Admin => Ok(()),
            Role::UnitAdmin
                if target.unit_id.is_some() && target.unit_id == actor.unit_id =>
            {
                Ok(())
            }
            Role::UnitAdmin => Err(LabError::Unauthorized(
                "UNIT_ADMIN may only manage users in their own unit".into(),
            )),
            _ => Err(LabError::Unauthorized(
                "Requires the ADMIN or UNIT_ADMIN role".into(),
            )),
        }
    }

    // =========================================================================
    // Site Settings
    // =========================================================================

    /// Branding settings are readable by anyone (the public page shows them).
    pub fn site_settings(&self) -> LabResult<SiteSettings> {
        Ok(self.db.get_site_settings()?)
    }

    pub fn update_site_settings(
        &self,
        actor: &Actor,
        settings: &SiteSettings,
    ) -> LabResult<()> {
        self.require_admin(actor)?;
        self.db.update_site_settings(settings)?;
        info!("site settings updated");
        Ok(())
    }
}
