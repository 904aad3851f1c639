use chrono::{DateTime, Utc};

use crate::models::{JobApplication, Status};

pub const GHOSTING_THRESHOLD_DAYS: i64 = 30;
pub const FOLLOW_UP_THRESHOLD_DAYS: i64 = 4;

/// Whole days elapsed, rounded down. Negative when `since` is in the future.
pub fn elapsed_days(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_milliseconds().div_euclid(86_400_000)
}

/// Moves stale non-terminal jobs to Ghosted. Returns the new list and whether
/// anything changed. Running it again on its own output changes nothing.
pub fn apply_ghosting(jobs: &[JobApplication], now: DateTime<Utc>) -> (Vec<JobApplication>, bool) {
    let mut changed = false;
    let updated = jobs
        .iter()
        .map(|job| {
            if !job.status.is_terminal()
                && elapsed_days(job.status_since(), now) >= GHOSTING_THRESHOLD_DAYS
            {
                changed = true;
                tracing::debug!(id = %job.id, company = %job.company, "ghosting stale application");
                JobApplication {
                    status: Status::Ghosted,
                    status_last_updated: Some(now),
                    ..job.clone()
                }
            } else {
                job.clone()
            }
        })
        .collect();
    (updated, changed)
}

pub fn is_follow_up_due(job: &JobApplication, now: DateTime<Utc>) -> bool {
    let Some(contacted) = job.last_contacted_date else {
        return false;
    };
    !job.received_response
        && !job.status.is_terminal()
        && elapsed_days(contacted, now) >= FOLLOW_UP_THRESHOLD_DAYS
}

pub fn follow_up_due(jobs: &[JobApplication], now: DateTime<Utc>) -> Vec<&JobApplication> {
    jobs.iter().filter(|job| is_follow_up_due(job, now)).collect()
}
