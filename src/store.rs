use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::db::KeyValueStore;
use crate::error::StoreError;
use crate::external::Confirm;
use crate::migrate::{self, SCHEMA_VERSION, SCHEMA_VERSION_KEY};
use crate::models::{
    is_blank, non_blank, Company, CompanyPatch, JobApplication, JobPatch, ManualRecruiter,
    NewCompany, NewJob, NewManualRecruiter, NewRecruiter, RecruiterContact, RecruiterPatch,
    Status,
};
use crate::rules;

pub const JOBS_KEY: &str = "jobs";
pub const MANUAL_RECRUITERS_KEY: &str = "manualRecruiters";
pub const COMPANIES_KEY: &str = "companies";

/// Owns the three collections and writes each one back to the key-value
/// store after every successful mutation. Writes are fire-and-forget: a
/// failed write is logged and the in-memory state stands.
pub struct RecordStore<S> {
    kv: S,
    jobs: Vec<JobApplication>,
    companies: Vec<Company>,
    manual_recruiters: Vec<ManualRecruiter>,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Loads all collections, upgrading legacy data, then applies ghosting.
    /// Missing or corrupt collections load as empty.
    pub fn load(kv: S, now: DateTime<Utc>) -> Self {
        let version = migrate::read_version(read_key(&kv, SCHEMA_VERSION_KEY).as_deref());

        let jobs = match read_key(&kv, JOBS_KEY) {
            Some(raw) => migrate::parse_jobs(&raw, version).unwrap_or_else(|err| {
                tracing::warn!(key = JOBS_KEY, error = %err, "corrupt collection, starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let companies = load_collection(&kv, COMPANIES_KEY);
        let manual_recruiters = load_collection(&kv, MANUAL_RECRUITERS_KEY);

        let mut store = Self {
            kv,
            jobs,
            companies,
            manual_recruiters,
        };

        if version < SCHEMA_VERSION && !store.jobs.is_empty() {
            tracing::info!(from = version, to = SCHEMA_VERSION, "upgrading stored jobs");
            store.save_jobs();
        }
        store.refresh(now);
        store
    }

    #[cfg(test)]
    pub fn backend(&self) -> &S {
        &self.kv
    }

    pub fn jobs(&self) -> &[JobApplication] {
        &self.jobs
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn manual_recruiters(&self) -> &[ManualRecruiter] {
        &self.manual_recruiters
    }

    pub fn job(&self, id: &str) -> Option<&JobApplication> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// Applies the ghosting rule. Returns true when any job changed.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        let (jobs, changed) = rules::apply_ghosting(&self.jobs, now);
        if changed {
            self.jobs = jobs;
            self.save_jobs();
        }
        changed
    }

    // --- Jobs ---

    pub fn add_job(&mut self, new: NewJob, now: DateTime<Utc>) -> Option<&JobApplication> {
        if is_blank(Some(new.role.as_str())) || is_blank(Some(new.company.as_str())) {
            tracing::debug!("rejected job without role or company");
            return None;
        }

        let job = JobApplication {
            id: new_id(),
            role: new.role.trim().to_string(),
            company: new.company.trim().to_string(),
            job_link: non_blank(new.job_link),
            status: new.status,
            applied_date: Some(new.applied_date),
            date_added: now,
            status_last_updated: Some(now),
            last_contacted_date: None,
            received_response: false,
            recruiters: new
                .recruiters
                .into_iter()
                .filter_map(build_contact)
                .collect(),
        };
        tracing::info!(id = %job.id, company = %job.company, role = %job.role, "added job");

        let mut jobs = Vec::with_capacity(self.jobs.len() + 1);
        jobs.push(job);
        jobs.append(&mut self.jobs);
        self.jobs = jobs;
        self.save_jobs();
        self.jobs.first()
    }

    /// Merges the set fields of `patch` into the job. A status change stamps
    /// `status_last_updated`; a new contact date clears `received_response`.
    pub fn update_job(
        &mut self,
        id: &str,
        patch: JobPatch,
        now: DateTime<Utc>,
    ) -> Option<JobApplication> {
        let job = self.jobs.iter_mut().find(|job| job.id == id)?;

        if let Some(role) = non_blank(patch.role) {
            job.role = role;
        }
        if let Some(company) = non_blank(patch.company) {
            job.company = company;
        }
        if let Some(link) = patch.job_link {
            job.job_link = non_blank(Some(link));
        }
        if let Some(date) = patch.applied_date {
            job.applied_date = Some(date);
        }
        if let Some(recruiters) = patch.recruiters {
            job.recruiters = recruiters;
        }
        if let Some(received) = patch.received_response {
            job.received_response = received;
        }
        if let Some(status) = patch.status {
            job.status = status;
            job.status_last_updated = Some(match job.status_last_updated {
                Some(prev) if prev > now => prev,
                _ => now,
            });
        }
        if let Some(contacted) = patch.last_contacted_date {
            job.last_contacted_date = Some(contacted);
            job.received_response = false;
        }

        let updated = job.clone();
        tracing::debug!(id = %updated.id, status = %updated.status, "updated job");
        self.save_jobs();
        Some(updated)
    }

    pub fn set_status(&mut self, id: &str, status: Status, now: DateTime<Utc>) -> Option<JobApplication> {
        let patch = JobPatch {
            status: Some(status),
            ..Default::default()
        };
        self.update_job(id, patch, now)
    }

    pub fn mark_emailed(&mut self, id: &str, now: DateTime<Utc>) -> Option<JobApplication> {
        let patch = JobPatch {
            last_contacted_date: Some(now),
            ..Default::default()
        };
        self.update_job(id, patch, now)
    }

    pub fn toggle_response(&mut self, id: &str, now: DateTime<Utc>) -> Option<JobApplication> {
        let current = self.job(id)?.received_response;
        let patch = JobPatch {
            received_response: Some(!current),
            ..Default::default()
        };
        self.update_job(id, patch, now)
    }

    /// Deletes the job together with its embedded recruiters.
    pub fn remove_job(&mut self, id: &str) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.id != id);
        let removed = self.jobs.len() != before;
        if removed {
            tracing::info!(id, "removed job");
            self.save_jobs();
        }
        removed
    }

    /// Deletes only after the user affirms.
    pub fn remove_job_confirmed(&mut self, id: &str, confirm: &dyn Confirm) -> bool {
        let Some(job) = self.job(id) else {
            return false;
        };
        let prompt = format!("Delete {} at {}?", job.role, job.company);
        if !confirm.confirm(&prompt) {
            tracing::debug!(id, "delete declined");
            return false;
        }
        self.remove_job(id)
    }

    pub fn attach_recruiter(
        &mut self,
        job_id: &str,
        recruiter: NewRecruiter,
        now: DateTime<Utc>,
    ) -> Option<RecruiterContact> {
        let contact = build_contact(recruiter)?;
        let mut recruiters = self.job(job_id)?.recruiters.clone();
        recruiters.push(contact.clone());
        let patch = JobPatch {
            recruiters: Some(recruiters),
            ..Default::default()
        };
        self.update_job(job_id, patch, now).map(|_| contact)
    }

    /// Edits one recruiter embedded in a job. The company field of the patch
    /// does not apply; job recruiters take the job's company. A patch that
    /// would blank every field is ignored.
    pub fn update_job_recruiter(
        &mut self,
        job_id: &str,
        recruiter_id: &str,
        patch: RecruiterPatch,
        now: DateTime<Utc>,
    ) -> Option<RecruiterContact> {
        let mut recruiters = self.job(job_id)?.recruiters.clone();
        let recruiter = recruiters.iter_mut().find(|r| r.id == recruiter_id)?;

        let mut edited = recruiter.clone();
        if let Some(name) = patch.name {
            edited.name = non_blank(Some(name));
        }
        if let Some(email) = patch.email {
            edited.email = non_blank(Some(email));
        }
        if let Some(linkedin) = patch.linkedin {
            edited.linkedin = non_blank(Some(linkedin));
        }
        if edited.name.is_none() && edited.email.is_none() && edited.linkedin.is_none() {
            tracing::debug!(job_id, recruiter_id, "ignored edit that would blank the recruiter");
            return None;
        }
        *recruiter = edited.clone();

        let patch = JobPatch {
            recruiters: Some(recruiters),
            ..Default::default()
        };
        self.update_job(job_id, patch, now).map(|_| edited)
    }

    pub fn detach_recruiter(&mut self, job_id: &str, recruiter_id: &str, now: DateTime<Utc>) -> bool {
        let Some(job) = self.job(job_id) else {
            return false;
        };
        if !job.recruiters.iter().any(|r| r.id == recruiter_id) {
            return false;
        }
        let recruiters = job
            .recruiters
            .iter()
            .filter(|r| r.id != recruiter_id)
            .cloned()
            .collect();
        let patch = JobPatch {
            recruiters: Some(recruiters),
            ..Default::default()
        };
        self.update_job(job_id, patch, now).is_some()
    }

    // --- Companies ---

    pub fn add_company(&mut self, new: NewCompany) -> Option<&Company> {
        let name = non_blank(Some(new.name))?;
        let company = Company {
            id: new_id(),
            name,
            career_link: non_blank(new.career_link),
        };
        tracing::info!(id = %company.id, name = %company.name, "added company");
        self.companies.insert(0, company);
        self.save(COMPANIES_KEY, &self.companies);
        self.companies.first()
    }

    pub fn update_company(&mut self, id: &str, patch: CompanyPatch) -> Option<Company> {
        let company = self.companies.iter_mut().find(|c| c.id == id)?;
        if let Some(name) = non_blank(patch.name) {
            company.name = name;
        }
        if let Some(link) = patch.career_link {
            company.career_link = non_blank(Some(link));
        }
        let updated = company.clone();
        self.save(COMPANIES_KEY, &self.companies);
        Some(updated)
    }

    pub fn remove_company(&mut self, id: &str) -> bool {
        let before = self.companies.len();
        self.companies.retain(|c| c.id != id);
        let removed = self.companies.len() != before;
        if removed {
            self.save(COMPANIES_KEY, &self.companies);
        }
        removed
    }

    // --- Manual recruiters ---

    /// Requires a name or a company.
    pub fn add_manual_recruiter(&mut self, new: NewManualRecruiter) -> Option<&ManualRecruiter> {
        let company = non_blank(new.company);
        if is_blank(new.contact.name.as_deref()) && company.is_none() {
            tracing::debug!("rejected recruiter without name or company");
            return None;
        }
        let recruiter = ManualRecruiter {
            contact: RecruiterContact {
                id: format!("manual-{}", new_id()),
                name: non_blank(new.contact.name),
                email: non_blank(new.contact.email),
                linkedin: non_blank(new.contact.linkedin),
            },
            company,
        };
        self.manual_recruiters.insert(0, recruiter);
        self.save(MANUAL_RECRUITERS_KEY, &self.manual_recruiters);
        self.manual_recruiters.first()
    }

    pub fn update_manual_recruiter(&mut self, id: &str, patch: RecruiterPatch) -> Option<ManualRecruiter> {
        let recruiter = self
            .manual_recruiters
            .iter_mut()
            .find(|r| r.contact.id == id)?;
        let name = patch.name.map(|name| non_blank(Some(name)));
        let company = patch.company.map(|company| non_blank(Some(company)));
        let keeps_name = name.as_ref().map_or(recruiter.contact.name.is_some(), Option::is_some);
        let keeps_company = company.as_ref().map_or(recruiter.company.is_some(), Option::is_some);
        if keeps_name || keeps_company {
            if let Some(name) = name {
                recruiter.contact.name = name;
            }
            if let Some(company) = company {
                recruiter.company = company;
            }
        } else {
            tracing::debug!(id, "ignored edit that would leave recruiter without name or company");
        }
        if let Some(email) = patch.email {
            recruiter.contact.email = non_blank(Some(email));
        }
        if let Some(linkedin) = patch.linkedin {
            recruiter.contact.linkedin = non_blank(Some(linkedin));
        }
        let updated = recruiter.clone();
        self.save(MANUAL_RECRUITERS_KEY, &self.manual_recruiters);
        Some(updated)
    }

    pub fn remove_manual_recruiter(&mut self, id: &str) -> bool {
        let before = self.manual_recruiters.len();
        self.manual_recruiters.retain(|r| r.contact.id != id);
        let removed = self.manual_recruiters.len() != before;
        if removed {
            self.save(MANUAL_RECRUITERS_KEY, &self.manual_recruiters);
        }
        removed
    }

    // --- Persistence ---

    fn save_jobs(&self) {
        self.save(JOBS_KEY, &self.jobs);
        if let Err(err) = self.kv.set(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_string()) {
            tracing::warn!(error = %err, "failed to record schema version");
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) {
        let result = serde_json::to_string(items)
            .map_err(|source| StoreError::Serialize {
                key: key.to_string(),
                source,
            })
            .and_then(|json| self.kv.set(key, &json));
        if let Err(err) = result {
            tracing::warn!(key, error = %err, "failed to persist collection");
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn build_contact(new: NewRecruiter) -> Option<RecruiterContact> {
    if new.is_blank() {
        return None;
    }
    Some(RecruiterContact {
        id: new_id(),
        name: non_blank(new.name),
        email: non_blank(new.email),
        linkedin: non_blank(new.linkedin),
    })
}

fn read_key<S: KeyValueStore>(kv: &S, key: &str) -> Option<String> {
    kv.get(key).unwrap_or_else(|err| {
        tracing::warn!(key, error = %err, "failed to read key, treating as absent");
        None
    })
}

fn load_collection<S: KeyValueStore, T: DeserializeOwned>(kv: &S, key: &str) -> Vec<T> {
    let Some(raw) = read_key(kv, key) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        tracing::warn!(key, error = %err, "corrupt collection, starting empty");
        Vec::new()
    })
}

/// Resolves a full id or unique id prefix typed by the user.
pub fn resolve_prefix<'a, I>(ids: I, prefix: &str, kind: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(anyhow!("Empty {} id", kind));
    }
    let candidates: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    if let Some(exact) = candidates.iter().find(|id| **id == prefix) {
        return Ok(exact.to_string());
    }
    match candidates.as_slice() {
        [] => Err(anyhow!("No {} matches '{}'", kind, prefix)),
        [only] => Ok(only.to_string()),
        many => Err(anyhow!(
            "'{}' is ambiguous: matches {} {}s",
            prefix,
            many.len(),
            kind
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::external::testing::ScriptedConfirm;
    use crate::recruiters;
    use chrono::{Duration, NaiveDate};

    fn now() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn new_job(role: &str, company: &str) -> NewJob {
        NewJob {
            role: role.to_string(),
            company: company.to_string(),
            job_link: None,
            status: Status::Applied,
            applied_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            recruiters: vec![],
        }
    }

    fn empty_store() -> RecordStore<MemoryStore> {
        RecordStore::load(MemoryStore::default(), now())
    }

    #[test]
    fn test_add_job_scenario() {
        let mut store = empty_store();
        let job = store.add_job(new_job("Engineer", "Acme"), now()).cloned().unwrap();

        assert_eq!(store.jobs().len(), 1);
        assert_eq!(job.status, Status::Applied);
        assert!(!job.received_response);
        assert_eq!(job.date_added, now());
        assert_eq!(job.status_last_updated, Some(now()));
        assert_eq!(job.last_contacted_date, None);

        let persisted = store.backend().raw(JOBS_KEY).unwrap();
        assert!(persisted.contains("\"role\":\"Engineer\""));
        assert_eq!(store.backend().raw(SCHEMA_VERSION_KEY).as_deref(), Some("1"));
    }

    #[test]
    fn test_add_job_requires_role_and_company() {
        let mut store = empty_store();
        assert!(store.add_job(new_job("", "Acme"), now()).is_none());
        assert!(store.add_job(new_job("Engineer", "   "), now()).is_none());
        assert!(store.jobs().is_empty());
        assert_eq!(store.backend().writes(), 0);
    }

    #[test]
    fn test_add_prepends_with_unique_ids() {
        let mut store = empty_store();
        store.add_job(new_job("First", "Acme"), now());
        store.add_job(new_job("Second", "Acme"), now());
        let jobs = store.jobs();
        assert_eq!(jobs[0].role, "Second");
        assert_eq!(jobs[1].role, "First");
        assert_ne!(jobs[0].id, jobs[1].id);
    }

    #[test]
    fn test_add_job_drops_blank_recruiters() {
        let mut store = empty_store();
        let mut job = new_job("Engineer", "Acme");
        job.recruiters = vec![
            NewRecruiter { name: Some("Dana".into()), ..Default::default() },
            NewRecruiter { name: Some(" ".into()), email: Some("".into()), linkedin: None },
        ];
        let added = store.add_job(job, now()).unwrap();
        assert_eq!(added.recruiters.len(), 1);
        assert_eq!(added.recruiters[0].name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_status_change_stamps_time() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();
        let later = now() + Duration::days(2);
        let job = store.set_status(&id, Status::Interviewing, later).unwrap();
        assert_eq!(job.status, Status::Interviewing);
        assert_eq!(job.status_last_updated, Some(later));
        assert_eq!(job.date_added, now());
    }

    #[test]
    fn test_status_stamp_never_moves_backwards() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();
        let earlier = now() - Duration::hours(1);
        let job = store.set_status(&id, Status::Pending, earlier).unwrap();
        assert_eq!(job.status_last_updated, Some(now()));
    }

    #[test]
    fn test_mark_emailed_resets_response() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();
        assert!(store.toggle_response(&id, now()).unwrap().received_response);

        let later = now() + Duration::days(1);
        let job = store.mark_emailed(&id, later).unwrap();
        assert_eq!(job.last_contacted_date, Some(later));
        assert!(!job.received_response);
    }

    #[test]
    fn test_patch_contact_date_overrides_response_flag() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();
        let patch = JobPatch {
            received_response: Some(true),
            last_contacted_date: Some(now()),
            ..Default::default()
        };
        assert!(!store.update_job(&id, patch, now()).unwrap().received_response);
    }

    #[test]
    fn test_update_merges_and_ignores_blank_required_fields() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();
        let patch = JobPatch {
            role: Some("".into()),
            company: Some("Globex".into()),
            job_link: Some("https://globex.example/jobs/1".into()),
            ..Default::default()
        };
        let job = store.update_job(&id, patch, now()).unwrap();
        assert_eq!(job.role, "Engineer");
        assert_eq!(job.company, "Globex");
        assert_eq!(job.job_link.as_deref(), Some("https://globex.example/jobs/1"));
        assert_eq!(job.status_last_updated, Some(now()));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut store = empty_store();
        store.add_job(new_job("Engineer", "Acme"), now());
        let writes = store.backend().writes();

        assert!(store.update_job("missing", JobPatch::default(), now()).is_none());
        assert!(store.set_status("missing", Status::Offered, now()).is_none());
        assert!(store.toggle_response("missing", now()).is_none());
        assert!(!store.remove_job("missing"));
        assert!(!store.remove_company("missing"));
        assert!(!store.remove_manual_recruiter("missing"));
        assert!(store.update_company("missing", CompanyPatch::default()).is_none());
        assert_eq!(store.jobs().len(), 1);
        assert_eq!(store.backend().writes(), writes);
    }

    #[test]
    fn test_remove_job_drops_embedded_recruiters_only() {
        let mut store = empty_store();
        let mut job = new_job("Engineer", "Acme");
        job.recruiters = vec![NewRecruiter { name: Some("Bob".into()), ..Default::default() }];
        let id = store.add_job(job, now()).unwrap().id.clone();
        store.add_manual_recruiter(NewManualRecruiter {
            contact: NewRecruiter { name: Some("Ann".into()), ..Default::default() },
            company: None,
        });
        assert_eq!(recruiters::aggregate(store.manual_recruiters(), store.jobs()).len(), 2);

        assert!(store.remove_job(&id));
        let directory = recruiters::aggregate(store.manual_recruiters(), store.jobs());
        assert_eq!(directory.len(), 1);
        assert_eq!(directory[0].name.as_deref(), Some("Ann"));
        assert_eq!(store.manual_recruiters().len(), 1);
    }

    #[test]
    fn test_delete_waits_for_confirmation() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();

        let declined = ScriptedConfirm::new(false);
        assert!(!store.remove_job_confirmed(&id, &declined));
        assert_eq!(store.jobs().len(), 1);
        assert_eq!(*declined.prompts.borrow(), vec!["Delete Engineer at Acme?".to_string()]);

        let unasked = ScriptedConfirm::new(true);
        assert!(!store.remove_job_confirmed("missing", &unasked));
        assert!(unasked.prompts.borrow().is_empty());

        assert!(store.remove_job_confirmed(&id, &unasked));
        assert!(store.jobs().is_empty());
    }

    #[test]
    fn test_attach_and_detach_recruiter() {
        let mut store = empty_store();
        let id = store.add_job(new_job("Engineer", "Acme"), now()).unwrap().id.clone();
        let contact = store
            .attach_recruiter(&id, NewRecruiter { email: Some("r@acme.io".into()), ..Default::default() }, now())
            .unwrap();
        assert!(store.attach_recruiter(&id, NewRecruiter::default(), now()).is_none());
        assert_eq!(store.job(&id).unwrap().recruiters.len(), 1);

        assert!(!store.detach_recruiter(&id, "nope", now()));
        assert!(store.detach_recruiter(&id, &contact.id, now()));
        assert!(store.job(&id).unwrap().recruiters.is_empty());
    }

    #[test]
    fn test_edit_job_recruiter_in_place() {
        let mut store = empty_store();
        let mut job = new_job("Engineer", "Acme");
        job.recruiters = vec![
            NewRecruiter { name: Some("Dana".into()), ..Default::default() },
            NewRecruiter { name: Some("Lee".into()), email: Some("lee@acme.io".into()), linkedin: None },
        ];
        let job_id = store.add_job(job, now()).unwrap().id.clone();
        let rec_id = store.job(&job_id).unwrap().recruiters[1].id.clone();

        let patch = RecruiterPatch {
            email: Some("lee@globex.io".into()),
            linkedin: Some("https://linkedin.com/in/lee".into()),
            company: Some("Ignored".into()),
            ..Default::default()
        };
        let edited = store.update_job_recruiter(&job_id, &rec_id, patch, now()).unwrap();
        assert_eq!(edited.id, rec_id);
        assert_eq!(edited.name.as_deref(), Some("Lee"));
        assert_eq!(edited.email.as_deref(), Some("lee@globex.io"));

        let recruiters = &store.job(&job_id).unwrap().recruiters;
        assert_eq!(recruiters.len(), 2);
        assert_eq!(recruiters[0].name.as_deref(), Some("Dana"));
        assert_eq!(recruiters[1], edited);
        assert!(store.backend().raw(JOBS_KEY).unwrap().contains("lee@globex.io"));

        let blanking = RecruiterPatch {
            name: Some("".into()),
            email: Some(" ".into()),
            linkedin: Some("".into()),
            company: None,
        };
        assert!(store.update_job_recruiter(&job_id, &rec_id, blanking, now()).is_none());
        assert_eq!(store.job(&job_id).unwrap().recruiters[1], edited);
        assert!(store
            .update_job_recruiter(&job_id, "missing", RecruiterPatch::default(), now())
            .is_none());
    }

    #[test]
    fn test_manual_recruiter_edit_keeps_name_or_company() {
        let mut store = empty_store();
        let id = store
            .add_manual_recruiter(NewManualRecruiter {
                contact: NewRecruiter { name: Some("Dana".into()), ..Default::default() },
                company: None,
            })
            .unwrap()
            .contact
            .id
            .clone();

        let blanking = RecruiterPatch {
            name: Some("  ".into()),
            company: Some("".into()),
            email: Some("dana@acme.io".into()),
            ..Default::default()
        };
        let updated = store.update_manual_recruiter(&id, blanking).unwrap();
        assert_eq!(updated.contact.name.as_deref(), Some("Dana"));
        assert_eq!(updated.company, None);
        assert_eq!(updated.contact.email.as_deref(), Some("dana@acme.io"));

        let swap = RecruiterPatch {
            name: Some("".into()),
            company: Some("Acme".into()),
            ..Default::default()
        };
        let updated = store.update_manual_recruiter(&id, swap).unwrap();
        assert_eq!(updated.contact.name, None);
        assert_eq!(updated.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_company_crud() {
        let mut store = empty_store();
        assert!(store.add_company(NewCompany { name: " ".into(), career_link: None }).is_none());

        let id = store
            .add_company(NewCompany { name: "Acme".into(), career_link: Some("".into()) })
            .unwrap()
            .id
            .clone();
        assert_eq!(store.companies()[0].career_link, None);

        let updated = store
            .update_company(&id, CompanyPatch { name: None, career_link: Some("https://acme.io/careers".into()) })
            .unwrap();
        assert_eq!(updated.name, "Acme");
        assert_eq!(updated.career_link.as_deref(), Some("https://acme.io/careers"));

        assert!(store.remove_company(&id));
        assert!(store.companies().is_empty());
        assert_eq!(store.backend().raw(COMPANIES_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_manual_recruiter_requires_name_or_company() {
        let mut store = empty_store();
        let nameless = NewManualRecruiter {
            contact: NewRecruiter { email: Some("x@y.z".into()), ..Default::default() },
            company: None,
        };
        assert!(store.add_manual_recruiter(nameless).is_none());

        let company_only = NewManualRecruiter {
            contact: NewRecruiter::default(),
            company: Some("Acme".into()),
        };
        let rec = store.add_manual_recruiter(company_only).unwrap();
        assert!(rec.contact.id.starts_with("manual-"));

        let id = rec.contact.id.clone();
        let updated = store
            .update_manual_recruiter(&id, RecruiterPatch { name: Some("Dana".into()), ..Default::default() })
            .unwrap();
        assert_eq!(updated.contact.name.as_deref(), Some("Dana"));
        assert_eq!(updated.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_corrupt_jobs_fall_back_to_empty() {
        let kv = MemoryStore::with(&[
            (JOBS_KEY, "{{not json"),
            (COMPANIES_KEY, r#"[{"id":"1","name":"Acme"}]"#),
        ]);
        let store = RecordStore::load(kv, now());
        assert!(store.jobs().is_empty());
        assert_eq!(store.companies().len(), 1);
        assert!(store.manual_recruiters().is_empty());
    }

    #[test]
    fn test_load_applies_ghosting_and_persists() {
        let kv = MemoryStore::with(&[
            (SCHEMA_VERSION_KEY, "1"),
            (
                JOBS_KEY,
                r#"[{"id":"1","role":"Engineer","company":"Acme","status":"Applied",
                    "appliedDate":"2024-01-01","dateAdded":"2024-01-01T00:00:00Z",
                    "statusLastUpdated":"2024-01-01T00:00:00Z","lastContactedDate":null,
                    "receivedResponse":false,"recruiters":[]}]"#,
            ),
        ]);
        let store = RecordStore::load(kv, now());
        assert_eq!(store.jobs()[0].status, Status::Ghosted);
        assert_eq!(store.jobs()[0].status_last_updated, Some(now()));
        assert!(store.backend().raw(JOBS_KEY).unwrap().contains("Ghosted"));
    }

    #[test]
    fn test_legacy_data_is_upgraded_on_load() {
        let kv = MemoryStore::with(&[(
            JOBS_KEY,
            r#"[{"id":"1","role":"Engineer","company":"Acme","status":"Applied",
                "appliedDate":"2024-02-25","dateAdded":"2024-02-25T00:00:00Z",
                "statusLastUpdated":"2024-02-25T00:00:00Z","lastContactedDate":null,
                "receivedResponse":false,"recruiterName":"Dana","recruiterEmail":"","recruiterLinkedin":""}]"#,
        )]);
        let store = RecordStore::load(kv, now());
        assert_eq!(store.jobs()[0].recruiters.len(), 1);
        assert_eq!(store.backend().raw(SCHEMA_VERSION_KEY).as_deref(), Some("1"));
        assert!(!store.backend().raw(JOBS_KEY).unwrap().contains("recruiterName"));
    }

    #[test]
    fn test_legacy_job_without_date_survives_next_save() {
        let kv = MemoryStore::with(&[(
            JOBS_KEY,
            r#"[{"id":"1","role":"Engineer","company":"Acme","status":"Applied",
                "appliedDate":"2024-02-25","dateAdded":"2024-02-25T00:00:00Z",
                "statusLastUpdated":"2024-02-25T00:00:00Z","receivedResponse":false},
               {"id":"2","role":"Designer","company":"Globex","status":"Pending",
                "appliedDate":"","dateAdded":"2024-02-26T00:00:00Z",
                "statusLastUpdated":"2024-02-26T00:00:00Z","receivedResponse":false,
                "recruiterName":"","recruiterEmail":"","recruiterLinkedin":""}]"#,
        )]);
        let mut store = RecordStore::load(kv, now());
        assert_eq!(store.jobs().len(), 2);

        store.add_job(new_job("Analyst", "Initech"), now());
        let persisted = store.backend().raw(JOBS_KEY).unwrap();
        let reloaded = RecordStore::load(
            MemoryStore::with(&[(SCHEMA_VERSION_KEY, "1"), (JOBS_KEY, persisted.as_str())]),
            now(),
        );
        assert_eq!(reloaded.jobs().len(), 3);
        assert_eq!(reloaded.job("2").unwrap().applied_date, None);
    }

    #[test]
    fn test_persist_failure_keeps_memory_state() {
        let kv = MemoryStore::default();
        kv.fail_writes(true);
        let mut store = RecordStore::load(kv, now());
        assert!(store.add_job(new_job("Engineer", "Acme"), now()).is_some());
        assert_eq!(store.jobs().len(), 1);
        assert_eq!(store.backend().raw(JOBS_KEY), None);
    }

    #[test]
    fn test_resolve_prefix() {
        let ids = ["abc123", "abd456", "xyz"];
        assert_eq!(resolve_prefix(ids, "abc", "job").unwrap(), "abc123");
        assert_eq!(resolve_prefix(ids, "xyz", "job").unwrap(), "xyz");
        assert!(resolve_prefix(ids, "ab", "job").is_err());
        assert!(resolve_prefix(ids, "q", "job").is_err());
        assert!(resolve_prefix(ids, "", "job").is_err());
    }
}
