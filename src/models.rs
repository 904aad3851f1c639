use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Applied,
    Interviewing,
    Offered,
    Rejected,
    Ghosted,
    Pending,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Applied,
        Status::Interviewing,
        Status::Offered,
        Status::Rejected,
        Status::Ghosted,
        Status::Pending,
    ];

    /// Rejected, Offered and Ghosted are excluded from ghosting and follow-ups.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Rejected | Status::Offered | Status::Ghosted)
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Interviewing => "Interviewing",
            Status::Offered => "Offered",
            Status::Rejected => "Rejected",
            Status::Ghosted => "Ghosted",
            Status::Pending => "Pending",
        }
    }

    /// Next status in display order, wrapping around. Used by the browser.
    pub fn cycle(self) -> Status {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown status '{}' (expected one of: applied, interviewing, offered, rejected, ghosted, pending)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterContact {
    pub id: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

/// A recruiter added directly to the directory rather than through a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRecruiter {
    #[serde(flatten)]
    pub contact: RecruiterContact,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub career_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub role: String,
    pub company: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,
    pub status: Status,
    /// Older records may have saved an empty date.
    #[serde(default, deserialize_with = "blank_as_no_date", skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub status_last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_contacted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received_response: bool,
    #[serde(default)]
    pub recruiters: Vec<RecruiterContact>,
}

impl JobApplication {
    /// Start of the current status period; records that never had a status
    /// change fall back to their creation time.
    pub fn status_since(&self) -> DateTime<Utc> {
        self.status_last_updated.unwrap_or(self.date_added)
    }

    /// The applied date, or the day the record was added when none was saved.
    pub fn applied_on(&self) -> NaiveDate {
        self.applied_date.unwrap_or_else(|| self.date_added.date_naive())
    }
}

// --- Write-side inputs ---

#[derive(Debug, Clone, Default)]
pub struct NewRecruiter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
}

impl NewRecruiter {
    pub fn is_blank(&self) -> bool {
        [&self.name, &self.email, &self.linkedin]
            .iter()
            .all(|field| is_blank(field.as_deref()))
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub role: String,
    pub company: String,
    pub job_link: Option<String>,
    pub status: Status,
    pub applied_date: NaiveDate,
    pub recruiters: Vec<NewRecruiter>,
}

#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub role: Option<String>,
    pub company: Option<String>,
    pub job_link: Option<String>,
    pub status: Option<Status>,
    pub applied_date: Option<NaiveDate>,
    pub last_contacted_date: Option<DateTime<Utc>>,
    pub received_response: Option<bool>,
    pub recruiters: Option<Vec<RecruiterContact>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub career_link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub career_link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewManualRecruiter {
    pub contact: NewRecruiter,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecruiterPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub company: Option<String>,
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(non_blank)
}

fn blank_as_no_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match non_blank(Option::<String>::deserialize(deserializer)?) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(de::Error::custom),
        None => Ok(None),
    }
}

/// Normalises optional user input: whitespace-only becomes `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
