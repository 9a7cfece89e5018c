//! User and actor models.

use serde::{Deserialize, Serialize};

/// User role, checked on every privileged operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to all configuration and reporting
    Admin,
    /// Admin scoped to their own unit
    UnitAdmin,
    /// Read access to live monitoring views
    Supervisor,
    /// Registers incoming samples
    Reception,
    /// Claims and processes tests
    LabScientist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::UnitAdmin => "UNIT_ADMIN",
            Role::Supervisor => "SUPERVISOR",
            Role::Reception => "RECEPTION",
            Role::LabScientist => "LAB_SCIENTIST",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "UNIT_ADMIN" => Some(Role::UnitAdmin),
            "SUPERVISOR" => Some(Role::Supervisor),
            "RECEPTION" => Some(Role::Reception),
            "LAB_SCIENTIST" => Some(Role::LabScientist),
            _ => None,
        }
    }
}

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user ID
    pub id: String,
    pub name: String,
    /// Unique login email
    pub email: String,
    /// Salted hash, never the plaintext
    pub password_hash: String,
    pub role: Role,
    /// Owning unit; required for unit-bound roles
    pub unit_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Create a new user with a pre-hashed password.
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role,
            unit_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// The resolved identity threaded into every operation.
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id.clone(),
            role: self.role,
            unit_id: self.unit_id.clone(),
        }
    }
}

/// Resolved `(user, role, unit)` triple from the session boundary.
///
/// Operations take this explicitly; there is no ambient current-user state.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub unit_id: Option<String>,
}
