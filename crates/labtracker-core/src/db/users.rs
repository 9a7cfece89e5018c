//! User and bench-preference database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Bench, Role, User};

impl Database {
    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, unit_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.unit_id,
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing user.
    pub fn update_user(&self, user: &User) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE users SET
                name = ?2,
                email = ?3,
                password_hash = ?4,
                role = ?5,
                unit_id = ?6,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.unit_id,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, email, password_hash, role, unit_id, created_at, updated_at
                FROM users
                WHERE id = ?
                "#,
                [id],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a user by login email.
    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, email, password_hash, role, unit_id, created_at, updated_at
                FROM users
                WHERE email = ?
                "#,
                [email],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all users.
    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, email, password_hash, role, unit_id, created_at, updated_at
            FROM users
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], map_user_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok(users)
    }

    /// List users belonging to one unit.
    pub fn list_users_in_unit(&self, unit_id: &str) -> DbResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, email, password_hash, role, unit_id, created_at, updated_at
            FROM users
            WHERE unit_id = ?
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([unit_id], map_user_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok(users)
    }

    /// Delete a user.
    pub fn delete_user(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Replace a user's whole bench-preference set in one transaction so the
    /// set is never observed half-updated.
    pub fn replace_user_benches(&self, user_id: &str, bench_ids: &[String]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM user_benches WHERE user_id = ?", [user_id])?;
        for bench_id in bench_ids {
            tx.execute(
                "INSERT INTO user_benches (user_id, bench_id) VALUES (?1, ?2)",
                params![user_id, bench_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// List a user's preferred benches.
    pub fn list_user_benches(&self, user_id: &str) -> DbResult<Vec<Bench>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT b.id, b.name, b.unit_id
            FROM user_benches ub
            JOIN benches b ON b.id = ub.bench_id
            WHERE ub.user_id = ?
            ORDER BY b.name
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(Bench {
                id: row.get(0)?,
                name: row.get(1)?,
                unit_id: row.get(2)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    unit_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        unit_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", row.role)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            unit_id: row.unit_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let user = User::new(
            "Ada".into(),
            "ada@lab.test".into(),
            "hash".into(),
            Role::Reception,
        );
        db.insert_user(&user).unwrap();

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved.email, "ada@lab.test");
        assert_eq!(retrieved.role, Role::Reception);

        let by_email = db.get_user_by_email("ada@lab.test").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = setup_db();

        let user1 = User::new("A".into(), "dup@lab.test".into(), "h".into(), Role::Admin);
        let user2 = User::new("B".into(), "dup@lab.test".into(), "h".into(), Role::Admin);
        db.insert_user(&user1).unwrap();
        assert!(db.insert_user(&user2).is_err());
    }

    #[test]
    fn test_list_users_in_unit() {
        let db = setup_db();
        let haem = Unit::new("Haematology".into(), 60);
        let chem = Unit::new("Chemical Pathology".into(), 120);
        db.insert_unit(&haem).unwrap();
        db.insert_unit(&chem).unwrap();

        let mut user1 = User::new("A".into(), "a@lab.test".into(), "h".into(), Role::LabScientist);
        user1.unit_id = Some(haem.id.clone());
        let mut user2 = User::new("B".into(), "b@lab.test".into(), "h".into(), Role::LabScientist);
        user2.unit_id = Some(chem.id.clone());
        db.insert_user(&user1).unwrap();
        db.insert_user(&user2).unwrap();

        let haem_users = db.list_users_in_unit(&haem.id).unwrap();
        assert_eq!(haem_users.len(), 1);
        assert_eq!(haem_users[0].id, user1.id);
    }

    #[test]
    fn test_replace_user_benches() {
        let db = setup_db();
        let unit = Unit::new("Haematology".into(), 60);
        db.insert_unit(&unit).unwrap();

        let bench1 = Bench::new("Morphology".into(), unit.id.clone());
        let bench2 = Bench::new("Coagulation".into(), unit.id.clone());
        db.insert_bench(&bench1).unwrap();
        db.insert_bench(&bench2).unwrap();

        let user = User::new("Ada".into(), "ada@lab.test".into(), "h".into(), Role::LabScientist);
        db.insert_user(&user).unwrap();

        db.replace_user_benches(&user.id, &[bench1.id.clone()]).unwrap();
        let benches = db.list_user_benches(&user.id).unwrap();
        assert_eq!(benches.len(), 1);
        assert_eq!(benches[0].id, bench1.id);

        // Replace, not append
        db.replace_user_benches(&user.id, &[bench2.id.clone()]).unwrap();
        let benches = db.list_user_benches(&user.id).unwrap();
        assert_eq!(benches.len(), 1);
        assert_eq!(benches[0].id, bench2.id);
    }
}
