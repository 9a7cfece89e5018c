//! Credential checking and user registration.
//!
//! Stored format is `salt$digest` where digest = sha256(salt || password),
//! hex-encoded. Authentication failures report a single generic message so
//! the response does not reveal whether the email exists.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::db::Database;
use crate::models::{Actor, Role, User};
use crate::{LabError, LabResult};

/// Registration form data.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to LAB_SCIENTIST when absent
    pub role: Option<Role>,
    pub unit_id: Option<String>,
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

/// Check a password against a stored `salt$digest` hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Session-boundary operations.
pub struct Auth<'a> {
    db: &'a Database,
}

impl<'a> Auth<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Resolve credentials to an [`Actor`].
    pub fn authenticate(&self, email: &str, password: &str) -> LabResult<Actor> {
        let user = match self.db.get_user_by_email(email)? {
            Some(user) => user,
            None => {
                warn!(email, "login attempt for unknown email");
                return Err(LabError::Unauthorized("Invalid credentials".into()));
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(email, "login attempt with wrong password");
            return Err(LabError::Unauthorized("Invalid credentials".into()));
        }

        Ok(user.actor())
    }

    /// Create a new account. Open registration, mirroring the sign-up form;
    /// role assignment beyond the default goes through admin user management.
    pub fn register_user(&self, form: NewUser) -> LabResult<User> {
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
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same-password");
        let b = hash_password("same-password");
        assert_ne!(a, b);
        assert!(verify_password("same-password", &a));
        assert!(verify_password("same-password", &b));
    }

    #[test]
    fn test_malformed_stored_hash() {
        assert!(!verify_password("anything", "no-separator-here"));
    }

    #[test]
    fn test_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let auth = Auth::new(&db);

        let user = auth
            .register_user(NewUser {
                name: "Ada".into(),
                email: "ada@lab.test".into(),
                password: "hunter2".into(),
                role: Some(Role::Reception),
                unit_id: None,
            })
            .unwrap();

        let actor = auth.authenticate("ada@lab.test", "hunter2").unwrap();
        assert_eq!(actor.user_id, user.id);
        assert_eq!(actor.role, Role::Reception);

        let err = auth.authenticate("ada@lab.test", "wrong").unwrap_err();
        assert!(matches!(err, LabError::Unauthorized(_)));
        let err = auth.authenticate("nobody@lab.test", "hunter2").unwrap_err();
        assert!(matches!(err, LabError::Unauthorized(_)));
    }

    #[test]
    fn test_register_duplicate_email() {
        let db = Database::open_in_memory().unwrap();
        let auth = Auth::new(&db);

        let form = NewUser {
            name: "Ada".into(),
            email: "ada@lab.test".into(),
            password: "pw".into(),
            role: None,
            unit_id: None,
        };
        auth.register_user(form.clone()).unwrap();
        let err = auth.register_user(form).unwrap_err();
        assert!(matches!(err, LabError::Conflict(_)));
    }

    #[test]
    fn test_register_defaults_to_scientist() {
        let db = Database::open_in_memory().unwrap();
        let auth = Auth::new(&db);

        let user = auth
            .register_user(NewUser {
                name: "Bea".into(),
                email: "bea@lab.test".into(),
                password: "pw".into(),
                role: None,
                unit_id: None,
            })
            .unwrap();
        assert_eq!(user.role, Role::LabScientist);
    }
}
