//! Upgrades persisted job data written before the schema version key existed.
//!
//! Version 0 records may carry a single recruiter as flat `recruiterName`,
//! `recruiterEmail` and `recruiterLinkedin` fields. Those are folded into the
//! `recruiters` list on load; the next save writes version 1.

use serde_json::{Map, Value};

use crate::models::JobApplication;

pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";
pub const SCHEMA_VERSION: u32 = 1;

const FLAT_FIELDS: [(&str, &str); 3] = [
    ("recruiterName", "name"),
    ("recruiterEmail", "email"),
    ("recruiterLinkedin", "linkedin"),
];

const LEGACY_RECRUITER_ID: &str = "legacy";

/// Missing or unparseable version means legacy data.
pub fn read_version(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

pub fn parse_jobs(raw: &str, version: u32) -> Result<Vec<JobApplication>, serde_json::Error> {
    if version >= SCHEMA_VERSION {
        return serde_json::from_str(raw);
    }

    let mut values: Vec<Value> = serde_json::from_str(raw)?;
    let mut upgraded = 0;
    for value in &mut values {
        if let Value::Object(job) = value {
            if upgrade_flat_recruiter(job) {
                upgraded += 1;
            }
        }
    }
    if upgraded > 0 {
        tracing::info!(upgraded, "migrated flat recruiter fields into recruiter lists");
    }
    serde_json::from_value(Value::Array(values))
}

/// Returns true when a recruiter entry was created.
fn upgrade_flat_recruiter(job: &mut Map<String, Value>) -> bool {
    let mut contact = Map::new();
    for (flat, field) in FLAT_FIELDS {
        if let Some(Value::String(s)) = job.remove(flat) {
            if !s.trim().is_empty() {
                contact.insert(field.to_string(), Value::String(s));
            }
        }
    }

    let has_list = matches!(job.get("recruiters"), Some(Value::Array(_)));
    if has_list || contact.is_empty() {
        if !has_list {
            job.insert("recruiters".to_string(), Value::Array(vec![]));
        }
        return false;
    }

    contact.insert("id".to_string(), Value::String(LEGACY_RECRUITER_ID.to_string()));
    job.insert(
        "recruiters".to_string(),
        Value::Array(vec![Value::Object(contact)]),
    );
    true
}
