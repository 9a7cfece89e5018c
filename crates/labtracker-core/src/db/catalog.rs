//! Configuration-entity database operations: units, wards, benches, the test
//! catalog, and the site-settings singleton.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Bench, SiteSettings, TestDef, Unit, Ward};

impl Database {
    // =========================================================================
    // Units
    // =========================================================================

    pub fn insert_unit(&self, unit: &Unit) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO units (id, name, default_tat_minutes, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![unit.id, unit.name, unit.default_tat_minutes, unit.created_at],
        )?;
        Ok(())
    }

    pub fn update_unit(&self, unit: &Unit) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE units SET name = ?2, default_tat_minutes = ?3 WHERE id = ?1",
            params![unit.id, unit.name, unit.default_tat_minutes],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_unit(&self, id: &str) -> DbResult<Option<Unit>> {
        self.conn
            .query_row(
                "SELECT id, name, default_tat_minutes, created_at FROM units WHERE id = ?",
                [id],
                |row| {
                    Ok(Unit {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        default_tat_minutes: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_units(&self) -> DbResult<Vec<Unit>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, default_tat_minutes, created_at FROM units ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Unit {
                id: row.get(0)?,
                name: row.get(1)?,
                default_tat_minutes: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_unit(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM units WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Wards
    // =========================================================================

    pub fn insert_ward(&self, ward: &Ward) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO wards (id, name) VALUES (?1, ?2)",
            params![ward.id, ward.name],
        )?;
        Ok(())
    }

    pub fn update_ward(&self, ward: &Ward) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE wards SET name = ?2 WHERE id = ?1",
            params![ward.id, ward.name],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn list_wards(&self) -> DbResult<Vec<Ward>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM wards ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Ward {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_ward(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM wards WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Benches
    // =========================================================================

    pub fn insert_bench(&self, bench: &Bench) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO benches (id, name, unit_id) VALUES (?1, ?2, ?3)",
            params![bench.id, bench.name, bench.unit_id],
        )?;
        Ok(())
    }

    pub fn update_bench(&self, bench: &Bench) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE benches SET name = ?2 WHERE id = ?1",
            params![bench.id, bench.name],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_bench(&self, id: &str) -> DbResult<Option<Bench>> {
        self.conn
            .query_row(
                "SELECT id, name, unit_id FROM benches WHERE id = ?",
                [id],
                |row| {
                    Ok(Bench {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        unit_id: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List benches, optionally scoped to one unit.
    pub fn list_benches(&self, unit_id: Option<&str>) -> DbResult<Vec<Bench>> {
        let map = |row: &rusqlite::Row<'_>| {
            Ok(Bench {
                id: row.get(0)?,
                name: row.get(1)?,
                unit_id: row.get(2)?,
            })
        };
        let mut benches = Vec::new();
        match unit_id {
            Some(unit_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, name, unit_id FROM benches WHERE unit_id = ? ORDER BY name",
                )?;
                for row in stmt.query_map([unit_id], map)? {
                    benches.push(row?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id, name, unit_id FROM benches ORDER BY name")?;
                for row in stmt.query_map([], map)? {
                    benches.push(row?);
                }
            }
        }
        Ok(benches)
    }

    pub fn delete_bench(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM benches WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Test Catalog
    // =========================================================================

    pub fn insert_test(&self, test: &TestDef) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO tests (id, name, expected_tat_minutes, unit_id, bench_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                test.id,
                test.name,
                test.expected_tat_minutes,
                test.unit_id,
                test.bench_id,
            ],
        )?;
        Ok(())
    }

    pub fn update_test(&self, test: &TestDef) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE tests SET
                name = ?2,
                expected_tat_minutes = ?3,
                bench_id = ?4
            WHERE id = ?1
            "#,
            params![test.id, test.name, test.expected_tat_minutes, test.bench_id],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_test(&self, id: &str) -> DbResult<Option<TestDef>> {
        self.conn
            .query_row(
                "SELECT id, name, expected_tat_minutes, unit_id, bench_id FROM tests WHERE id = ?",
                [id],
                map_test_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List catalog tests, optionally scoped to one unit.
    pub fn list_tests(&self, unit_id: Option<&str>) -> DbResult<Vec<TestDef>> {
        let mut tests = Vec::new();
        match unit_id {
            Some(unit_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, name, expected_tat_minutes, unit_id, bench_id FROM tests WHERE unit_id = ? ORDER BY name",
                )?;
                for row in stmt.query_map([unit_id], map_test_row)? {
                    tests.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, name, expected_tat_minutes, unit_id, bench_id FROM tests ORDER BY name",
                )?;
                for row in stmt.query_map([], map_test_row)? {
                    tests.push(row?);
                }
            }
        }
        Ok(tests)
    }

    pub fn delete_test(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM tests WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Site Settings
    // =========================================================================

    /// Read the settings singleton. The schema seeds the row, so this never
    /// misses on an initialized database.
    pub fn get_site_settings(&self) -> DbResult<SiteSettings> {
        let settings = self
            .conn
            .query_row(
                r#"
                SELECT logo_url, logo_title, hero_title, hero_subtitle, hero_button_text
                FROM site_settings
                WHERE id = 1
                "#,
                [],
                |row| {
                    Ok(SiteSettings {
                        logo_url: row.get(0)?,
                        logo_title: row.get(1)?,
                        hero_title: row.get(2)?,
                        hero_subtitle: row.get(3)?,
                        hero_button_text: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(settings.unwrap_or_default())
    }

    pub fn update_site_settings(&self, settings: &SiteSettings) -> DbResult<()> {
        self.conn.execute(
            r#"
            UPDATE site_settings SET
                logo_url = ?1,
                logo_title = ?2,
                hero_title = ?3,
                hero_subtitle = ?4,
                hero_button_text = ?5,
                updated_at = datetime('now')
            WHERE id = 1
            "#,
            params![
                settings.logo_url,
                settings.logo_title,
                settings.hero_title,
                settings.hero_subtitle,
                settings.hero_button_text,
            ],
        )?;
        Ok(())
    }
}

fn map_test_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TestDef> {
    Ok(TestDef {
        id: row.get(0)?,
        name: row.get(1)?,
        expected_tat_minutes: row.get(2)?,
        unit_id: row.get(3)?,
        bench_id: row.get(4)?,
    })
}
