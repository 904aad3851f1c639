use crate::external::Clipboard;
use crate::models::{JobApplication, ManualRecruiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecruiterSource {
    Manual,
    Application,
}

impl RecruiterSource {
    pub fn label(self) -> &'static str {
        match self {
            RecruiterSource::Manual => "manual",
            RecruiterSource::Application => "application",
        }
    }
}

/// One row of the recruiter directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub company: Option<String>,
    pub source: RecruiterSource,
    pub is_duplicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Email,
    Linkedin,
}

impl DirectoryEntry {
    pub fn field(&self, field: ContactField) -> Option<&str> {
        let value = match field {
            ContactField::Email => self.email.as_deref(),
            ContactField::Linkedin => self.linkedin.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn matches(&self, other: &DirectoryEntry) -> bool {
        same_key(self.email.as_deref(), other.email.as_deref())
            || same_key(self.name.as_deref(), other.name.as_deref())
    }
}

/// Case-insensitive equality that never matches on blank values.
fn same_key(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.map(str::trim), b.map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => false,
    }
}

pub fn job_recruiter_id(job_id: &str, recruiter_id: &str) -> String {
    format!("job-{}-{}", job_id, recruiter_id)
}

/// Finds the job and recruiter behind an application entry's directory id.
pub fn locate_job_recruiter<'a>(
    jobs: &'a [JobApplication],
    entry_id: &str,
) -> Option<(&'a str, &'a str)> {
    jobs.iter().find_map(|job| {
        job.recruiters
            .iter()
            .find(|rec| job_recruiter_id(&job.id, &rec.id) == entry_id)
            .map(|rec| (job.id.as_str(), rec.id.as_str()))
    })
}

/// Merges manual recruiters with those embedded in jobs and flags duplicates.
/// Manual entries come first, then job entries in job order.
pub fn aggregate(manual: &[ManualRecruiter], jobs: &[JobApplication]) -> Vec<DirectoryEntry> {
    let manual_entries = manual.iter().map(|rec| DirectoryEntry {
        id: rec.contact.id.clone(),
        name: rec.contact.name.clone(),
        email: rec.contact.email.clone(),
        linkedin: rec.contact.linkedin.clone(),
        company: rec.company.clone(),
        source: RecruiterSource::Manual,
        is_duplicate: false,
    });

    let job_entries = jobs.iter().flat_map(|job| {
        job.recruiters.iter().map(move |rec| DirectoryEntry {
            id: job_recruiter_id(&job.id, &rec.id),
            name: rec.name.clone(),
            email: rec.email.clone(),
            linkedin: rec.linkedin.clone(),
            company: Some(job.company.clone()),
            source: RecruiterSource::Application,
            is_duplicate: false,
        })
    });

    let mut entries: Vec<DirectoryEntry> = manual_entries.chain(job_entries).collect();
    flag_duplicates(&mut entries);
    entries
}

fn flag_duplicates(entries: &mut [DirectoryEntry]) {
    let flags: Vec<bool> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entries
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && entry.matches(other))
        })
        .collect();

    for (entry, flag) in entries.iter_mut().zip(flags) {
        entry.is_duplicate = flag;
    }
}

/// Copies the requested field if the entry has one. Returns what was copied.
pub fn copy_field<'a>(
    entry: &'a DirectoryEntry,
    field: ContactField,
    clipboard: &dyn Clipboard,
) -> Option<&'a str> {
    let value = entry.field(field)?;
    clipboard.write(value);
    Some(value)
}

/// Narrows the directory by company name. Runs after duplicate flagging so
/// flags reflect the whole directory. Entries without a company only survive
/// an empty search.
pub fn filter_by_company<'a>(entries: &'a [DirectoryEntry], term: &str) -> Vec<&'a DirectoryEntry> {
    let needle = term.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| {
            needle.is_empty()
                || entry
                    .company
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
        })
        .collect()
}
