//! Configuration entities: units, wards, benches, test catalog, site settings.

use serde::{Deserialize, Serialize};

/// A laboratory department that owns samples, tests, and scoped users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub id: String,
    pub name: String,
    /// Fallback TAT for tests without their own budget
    pub default_tat_minutes: i64,
    pub created_at: String,
}

impl Unit {
    pub fn new(name: String, default_tat_minutes: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            default_tat_minutes,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A hospital ward samples can originate from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ward {
    pub id: String,
    pub name: String,
}

impl Ward {
    pub fn new(name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
        }
    }
}

/// A sub-station within a unit, used to route tests and filter work queues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bench {
    pub id: String,
    pub name: String,
    pub unit_id: String,
}

impl Bench {
    pub fn new(name: String, unit_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            unit_id,
        }
    }
}

/// A test catalog definition. Admin-owned; workflow actions reference but
/// never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestDef {
    pub id: String,
    pub name: String,
    /// Expected turnaround time in minutes
    pub expected_tat_minutes: i64,
    pub unit_id: String,
    /// Optional bench within the same unit
    pub bench_id: Option<String>,
}

impl TestDef {
    pub fn new(name: String, expected_tat_minutes: i64, unit_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            expected_tat_minutes,
            unit_id,
            bench_id: None,
        }
    }
}

/// Branding/display configuration. At most one row ever exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSettings {
    pub logo_url: Option<String>,
    pub logo_title: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_button_text: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            logo_url: None,
            logo_title: "LabTracker".into(),
            hero_title: "Precision Sample Tracking For Modern Labs".into(),
            hero_subtitle: "Streamline your laboratory workflow with our secure, real-time sample management system.".into(),
            hero_button_text: "Start Tracking Now".into(),
        }
    }
}
