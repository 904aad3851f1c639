use std::fmt;
use std::str::FromStr;

use crate::models::{Company, JobApplication, Status};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.pad("All"),
            StatusFilter::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: StatusFilter,
    pub search: String,
}

impl JobFilter {
    pub fn matches(&self, job: &JobApplication) -> bool {
        self.status.matches(job.status)
            && (contains_ci(&job.company, &self.search) || contains_ci(&job.role, &self.search))
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn filter_jobs<'a>(jobs: &'a [JobApplication], filter: &JobFilter) -> Vec<&'a JobApplication> {
    jobs.iter().filter(|job| filter.matches(job)).collect()
}

pub fn filter_companies<'a>(companies: &'a [Company], term: &str) -> Vec<&'a Company> {
    companies
        .iter()
        .filter(|company| contains_ci(&company.name, term))
        .collect()
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub applied: usize,
    pub interviewing: usize,
    pub offered: usize,
    pub ghosted: usize,
}

impl Stats {
    pub fn from_jobs(jobs: &[JobApplication]) -> Self {
        let count = |status: Status| jobs.iter().filter(|j| j.status == status).count();
        Self {
            total: jobs.len(),
            applied: count(Status::Applied),
            interviewing: count(Status::Interviewing),
            offered: count(Status::Offered),
            ghosted: count(Status::Ghosted),
        }
    }
}
