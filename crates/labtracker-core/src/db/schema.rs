//! SQLite schema definition.

/// Complete database schema for labtracker.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Units / Wards / Benches
-- ============================================================================

CREATE TABLE IF NOT EXISTS units (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    default_tat_minutes INTEGER NOT NULL DEFAULT 1440,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS wards (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS benches (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit_id TEXT NOT NULL REFERENCES units(id)
);

CREATE INDEX IF NOT EXISTS idx_benches_unit ON benches(unit_id);

-- ============================================================================
-- Test Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS tests (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    expected_tat_minutes INTEGER NOT NULL DEFAULT 60,
    unit_id TEXT NOT NULL REFERENCES units(id),
    bench_id TEXT REFERENCES benches(id)
);

CREATE INDEX IF NOT EXISTS idx_tests_unit ON tests(unit_id);

-- ============================================================================
-- Users
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('ADMIN', 'UNIT_ADMIN', 'SUPERVISOR', 'RECEPTION', 'LAB_SCIENTIST')),
    unit_id TEXT REFERENCES units(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_users_unit ON users(unit_id);

-- Scientist bench preferences, replaced as a whole set
CREATE TABLE IF NOT EXISTS user_benches (
    user_id TEXT NOT NULL REFERENCES users(id),
    bench_id TEXT NOT NULL REFERENCES benches(id),
    PRIMARY KEY (user_id, bench_id)
);

-- ============================================================================
-- Samples
-- ============================================================================

CREATE TABLE IF NOT EXISTS samples (
    id TEXT PRIMARY KEY,
    accession_number TEXT NOT NULL UNIQUE,
    lab_number TEXT,
    patient_name TEXT NOT NULL,
    age INTEGER,
    gender TEXT,
    clinical_info TEXT,
    specimen_type TEXT,
    source TEXT,
    ward_id TEXT REFERENCES wards(id),
    unit_id TEXT NOT NULL REFERENCES units(id),
    created_by_id TEXT NOT NULL REFERENCES users(id),
    processed_by_id TEXT REFERENCES users(id),
    status TEXT NOT NULL DEFAULT 'RECEIVED'
        CHECK (status IN ('COLLECTED', 'RECEIVED', 'IN_PROCESSING', 'AWAITING_REVIEW', 'COMPLETED', 'DELAYED')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_samples_unit ON samples(unit_id);
CREATE INDEX IF NOT EXISTS idx_samples_status ON samples(status);
CREATE INDEX IF NOT EXISTS idx_samples_created ON samples(created_at);

-- One row per ordered test
CREATE TABLE IF NOT EXISTS sample_tests (
    sample_id TEXT NOT NULL REFERENCES samples(id),
    test_id TEXT NOT NULL REFERENCES tests(id),
    status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'COMPLETED')),
    result TEXT,
    assigned_to_id TEXT REFERENCES users(id),
    completed_at TEXT,
    PRIMARY KEY (sample_id, test_id)
);

CREATE INDEX IF NOT EXISTS idx_sample_tests_assignee ON sample_tests(assigned_to_id);

-- Append-only audit trail of sample-level transitions
CREATE TABLE IF NOT EXISTS sample_status_logs (
    id TEXT PRIMARY KEY,
    sample_id TEXT NOT NULL REFERENCES samples(id),
    from_status TEXT,
    to_status TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id),
    notes TEXT,
    timestamp TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_status_logs_sample ON sample_status_logs(sample_id);

-- ============================================================================
-- Site Settings (single row)
-- ============================================================================

CREATE TABLE IF NOT EXISTS site_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    logo_url TEXT,
    logo_title TEXT NOT NULL,
    hero_title TEXT NOT NULL,
    hero_subtitle TEXT NOT NULL,
    hero_button_text TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO site_settings (id, logo_url, logo_title, hero_title, hero_subtitle, hero_button_text)
VALUES (
    1,
    NULL,
    'LabTracker',
    'Precision Sample Tracking For Modern Labs',
    'Streamline your laboratory workflow with our secure, real-time sample management system.',
    'Start Tracking Now'
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_settings_singleton_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM site_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        // A second row must be rejected
        let result = conn.execute(
            "INSERT INTO site_settings (id, logo_title, hero_title, hero_subtitle, hero_button_text)
             VALUES (2, 'x', 'x', 'x', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_accession_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute("INSERT INTO units (id, name) VALUES ('u1', 'Haematology')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role) VALUES ('usr1', 'R', 'r@lab.test', 'h', 'RECEPTION')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO samples (id, accession_number, patient_name, unit_id, created_by_id)
                      VALUES (?1, ?2, 'Jane', 'u1', 'usr1')";
        conn.execute(insert, ["s1", "ACC-1"]).unwrap();
        let dup = conn.execute(insert, ["s2", "ACC-1"]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role) VALUES ('u1', 'X', 'x@lab.test', 'h', 'REVIEWER')",
            [],
        );
        assert!(result.is_err());
    }
}
