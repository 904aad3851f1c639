mod config;
mod db;
mod error;
mod external;
mod filter;
mod migrate;
mod models;
mod recruiters;
mod rules;
mod store;
mod telemetry;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use db::{Database, KeyValueStore};
use external::{AssumeYes, Confirm, StdinConfirm, SystemClipboard};
use filter::{filter_companies, filter_jobs, JobFilter, Stats, StatusFilter};
use models::{
    CompanyPatch, JobApplication, JobPatch, NewCompany, NewJob, NewManualRecruiter, NewRecruiter,
    RecruiterPatch, Status,
};
use recruiters::ContactField;
use rules::{elapsed_days, follow_up_due, is_follow_up_due};
use std::path::PathBuf;
use store::{resolve_prefix, RecordStore};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Job application tracker - applications, recruiters, and companies")]
struct Cli {
    /// Path to the data file
    #[arg(long, global = true, env = "TRACKER_DB")]
    db: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true, env = "TRACKER_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data file
    Init,

    /// Add a job application
    Add {
        /// Job role
        role: String,

        /// Company name
        company: String,

        /// Link to the posting
        #[arg(short, long)]
        link: Option<String>,

        /// Initial status (applied, interviewing, offered, pending)
        #[arg(short, long, default_value = "applied")]
        status: Status,

        /// Date applied (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        applied: Option<NaiveDate>,

        /// Recruiter name
        #[arg(long)]
        recruiter_name: Option<String>,

        /// Recruiter email
        #[arg(long)]
        recruiter_email: Option<String>,

        /// Recruiter LinkedIn URL
        #[arg(long)]
        recruiter_linkedin: Option<String>,
    },

    /// List applications
    List {
        /// Filter by status (all, applied, interviewing, offered, rejected, ghosted, pending)
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// Search company or role
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID (or unique prefix)
        id: String,
    },

    /// Change application status
    Status {
        /// Application ID (or unique prefix)
        id: String,

        /// New status
        status: Status,
    },

    /// Record that you emailed about an application
    Emailed {
        /// Application ID (or unique prefix)
        id: String,
    },

    /// Toggle whether a response was received
    Response {
        /// Application ID (or unique prefix)
        id: String,
    },

    /// Edit application details
    Edit {
        /// Application ID (or unique prefix)
        id: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        company: Option<String>,

        /// Posting link (empty string clears it)
        #[arg(long)]
        link: Option<String>,

        /// Date applied (YYYY-MM-DD)
        #[arg(long)]
        applied: Option<NaiveDate>,
    },

    /// Delete an application and its recruiters
    Delete {
        /// Application ID (or unique prefix)
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Applications awaiting a reply for 4+ days
    Followups,

    /// Dashboard counters
    Stats,

    /// Browse applications interactively
    Browse {
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Manage target companies
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Manage recruiter contacts
    Recruiter {
        #[command(subcommand)]
        command: RecruiterCommands,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Add a company
    Add {
        name: String,

        /// Career page link
        #[arg(short, long)]
        link: Option<String>,
    },

    /// List companies
    List {
        /// Search by name
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Edit a company
    Edit {
        /// Company ID (or unique prefix)
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// Career page link (empty string clears it)
        #[arg(long)]
        link: Option<String>,
    },

    /// Remove a company
    Remove {
        /// Company ID (or unique prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum RecruiterCommands {
    /// Add a recruiter to the directory
    Add {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        linkedin: Option<String>,
    },

    /// List all recruiters, flagging duplicates
    List {
        /// Filter by company
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Edit a recruiter, either from the directory or from an application
    Edit {
        /// Directory entry ID (or unique prefix), as shown by 'recruiter list'
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        linkedin: Option<String>,
    },

    /// Remove a directory recruiter
    Remove {
        /// Recruiter ID (or unique prefix)
        id: String,
    },

    /// Copy a recruiter's email or LinkedIn to the clipboard
    Copy {
        /// Directory entry ID (or unique prefix)
        id: String,

        #[arg(value_enum, default_value = "email")]
        field: CopyField,
    },

    /// Add a recruiter to an application
    Attach {
        /// Application ID (or unique prefix)
        job_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        linkedin: Option<String>,
    },

    /// Remove a recruiter from an application
    Detach {
        /// Application ID (or unique prefix)
        job_id: String,

        /// Recruiter ID within the application (or unique prefix)
        recruiter_id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CopyField {
    Email,
    Linkedin,
}

impl From<CopyField> for ContactField {
    fn from(value: CopyField) -> Self {
        match value {
            CopyField::Email => ContactField::Email,
            CopyField::Linkedin => ContactField::Linkedin,
        }
    }
}

fn job_id<S: KeyValueStore>(store: &RecordStore<S>, prefix: &str) -> Result<String> {
    resolve_prefix(store.jobs().iter().map(|j| j.id.as_str()), prefix, "application")
}

fn company_id<S: KeyValueStore>(store: &RecordStore<S>, prefix: &str) -> Result<String> {
    resolve_prefix(store.companies().iter().map(|c| c.id.as_str()), prefix, "company")
}

fn manual_recruiter_id<S: KeyValueStore>(store: &RecordStore<S>, prefix: &str) -> Result<String> {
    resolve_prefix(
        store.manual_recruiters().iter().map(|r| r.contact.id.as_str()),
        prefix,
        "recruiter",
    )
}

fn print_jobs(jobs: &[&JobApplication], now: DateTime<Utc>) {
    println!(
        "{:<10} {:<13} {:<28} {:<20} {:<11} {:>3}",
        "ID", "STATUS", "ROLE", "COMPANY", "APPLIED", "F/U"
    );
    println!("{}", "-".repeat(90));
    for job in jobs {
        let follow_up = if is_follow_up_due(job, now) { "!" } else { "" };
        println!(
            "{:<10} {:<13} {:<28} {:<20} {:<11} {:>3}",
            short_id(&job.id),
            job.status,
            truncate(&job.role, 26),
            truncate(&job.company, 18),
            job.applied_on().to_string(),
            follow_up
        );
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::resolve(cli.db, cli.log_level);
    telemetry::init(&config)?;

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    if let Commands::Init = cli.command {
        db.init()?;
        println!("Tracker initialized at {}", db.path().display());
        return Ok(());
    }

    db.ensure_initialized()?;
    let now = Utc::now();
    let mut store = RecordStore::load(db, now);

    match cli.command {
        Commands::Init => unreachable!("handled above"),

        Commands::Add {
            role,
            company,
            link,
            status,
            applied,
            recruiter_name,
            recruiter_email,
            recruiter_linkedin,
        } => {
            let recruiter = NewRecruiter {
                name: recruiter_name,
                email: recruiter_email,
                linkedin: recruiter_linkedin,
            };
            let new = NewJob {
                role,
                company,
                job_link: link,
                status,
                applied_date: applied.unwrap_or_else(|| now.date_naive()),
                recruiters: vec![recruiter],
            };
            match store.add_job(new, now) {
                Some(job) => println!(
                    "Added {} at {} ({})",
                    job.role,
                    job.company,
                    short_id(&job.id)
                ),
                None => println!("Role and company are required."),
            }
        }

        Commands::List { status, search } => {
            let filter = JobFilter {
                status,
                search: search.unwrap_or_default(),
            };
            let jobs = filter_jobs(store.jobs(), &filter);
            if jobs.is_empty() {
                println!("No applications found matching your criteria.");
            } else {
                print_jobs(&jobs, now);
            }
        }

        Commands::Show { id } => {
            let id = job_id(&store, &id)?;
            let job = store
                .job(&id)
                .ok_or_else(|| anyhow!("Application {} not found", id))?;
            println!("Application {}", job.id);
            println!("Role: {}", job.role);
            println!("Company: {}", job.company);
            println!(
                "Status: {} (for {} days)",
                job.status,
                elapsed_days(job.status_since(), now)
            );
            println!("Applied: {}", job.applied_on());
            if let Some(link) = &job.job_link {
                println!("Link: {}", link);
            }
            println!("Added: {}", job.date_added.format("%Y-%m-%d %H:%M"));
            match job.last_contacted_date {
                Some(contacted) => {
                    println!(
                        "Last contacted: {} ({} days ago)",
                        contacted.format("%Y-%m-%d"),
                        elapsed_days(contacted, now)
                    );
                    println!(
                        "Response received: {}",
                        if job.received_response { "yes" } else { "no" }
                    );
                    if is_follow_up_due(job, now) {
                        println!("Follow-up due.");
                    }
                }
                None => println!("Last contacted: never"),
            }
            if !job.recruiters.is_empty() {
                println!("\nRecruiters ({}):", job.recruiters.len());
                for rec in &job.recruiters {
                    println!(
                        "  {} {}",
                        short_id(&rec.id),
                        rec.name.as_deref().unwrap_or("Anonymous")
                    );
                    if let Some(email) = &rec.email {
                        println!("      {}", email);
                    }
                    if let Some(linkedin) = &rec.linkedin {
                        println!("      {}", linkedin);
                    }
                }
            }
        }

        Commands::Status { id, status } => {
            let id = job_id(&store, &id)?;
            if let Some(job) = store.set_status(&id, status, now) {
                println!("{} at {} is now {}.", job.role, job.company, job.status);
            }
        }

        Commands::Emailed { id } => {
            let id = job_id(&store, &id)?;
            if let Some(job) = store.mark_emailed(&id, now) {
                println!("Marked {} at {} as emailed today.", job.role, job.company);
            }
        }

        Commands::Response { id } => {
            let id = job_id(&store, &id)?;
            if let Some(job) = store.toggle_response(&id, now) {
                let state = if job.received_response { "received" } else { "not received" };
                println!("Response for {} at {}: {}.", job.role, job.company, state);
            }
        }

        Commands::Edit {
            id,
            role,
            company,
            link,
            applied,
        } => {
            let id = job_id(&store, &id)?;
            let patch = JobPatch {
                role,
                company,
                job_link: link,
                applied_date: applied,
                ..Default::default()
            };
            if let Some(job) = store.update_job(&id, patch, now) {
                println!("Updated {} at {}.", job.role, job.company);
            }
        }

        Commands::Delete { id, yes } => {
            let id = job_id(&store, &id)?;
            let confirm: &dyn Confirm = if yes { &AssumeYes } else { &StdinConfirm };
            if store.remove_job_confirmed(&id, confirm) {
                println!("Deleted.");
            } else {
                println!("Kept.");
            }
        }

        Commands::Followups => {
            let jobs = follow_up_due(store.jobs(), now);
            if jobs.is_empty() {
                println!("All set! No immediate follow-ups required.");
            } else {
                println!("Awaiting a response ({}+ days):", rules::FOLLOW_UP_THRESHOLD_DAYS);
                print_jobs(&jobs, now);
            }
        }

        Commands::Stats => {
            let stats = Stats::from_jobs(store.jobs());
            let follow_ups = follow_up_due(store.jobs(), now).len();
            println!("Total:        {}", stats.total);
            println!("Applied:      {}", stats.applied);
            println!("Interviews:   {}", stats.interviewing);
            println!("Offers:       {}", stats.offered);
            println!("Ghosted:      {}", stats.ghosted);
            println!("Follow-ups:   {}", follow_ups);
        }

        Commands::Browse { status, search } => {
            let filter = JobFilter {
                status,
                search: search.unwrap_or_default(),
            };
            tui::run_browse(&mut store, filter)?;
        }

        Commands::Company { command } => match command {
            CompanyCommands::Add { name, link } => {
                match store.add_company(NewCompany {
                    name,
                    career_link: link,
                }) {
                    Some(company) => println!("Added {} ({})", company.name, short_id(&company.id)),
                    None => println!("Company name is required."),
                }
            }

            CompanyCommands::List { search } => {
                let term = search.unwrap_or_default();
                let companies = filter_companies(store.companies(), &term);
                if companies.is_empty() {
                    if term.is_empty() {
                        println!("No companies yet. Add one with 'tracker company add'.");
                    } else {
                        println!("No companies match your search.");
                    }
                } else {
                    println!("{:<10} {:<30} {:<40}", "ID", "NAME", "CAREER PAGE");
                    println!("{}", "-".repeat(80));
                    for company in companies {
                        println!(
                            "{:<10} {:<30} {:<40}",
                            short_id(&company.id),
                            truncate(&company.name, 28),
                            company.career_link.as_deref().unwrap_or("-")
                        );
                    }
                }
            }

            CompanyCommands::Edit { id, name, link } => {
                let id = company_id(&store, &id)?;
                let patch = CompanyPatch {
                    name,
                    career_link: link,
                };
                if let Some(company) = store.update_company(&id, patch) {
                    println!("Updated {}.", company.name);
                }
            }

            CompanyCommands::Remove { id } => {
                let id = company_id(&store, &id)?;
                if store.remove_company(&id) {
                    println!("Removed.");
                }
            }
        },

        Commands::Recruiter { command } => match command {
            RecruiterCommands::Add {
                name,
                company,
                email,
                linkedin,
            } => {
                let new = NewManualRecruiter {
                    contact: NewRecruiter {
                        name,
                        email,
                        linkedin,
                    },
                    company,
                };
                match store.add_manual_recruiter(new) {
                    Some(rec) => println!("Added recruiter {}", rec.contact.id),
                    None => println!("A name or company is required."),
                }
            }

            RecruiterCommands::List { company } => {
                let directory = recruiters::aggregate(store.manual_recruiters(), store.jobs());
                let term = company.unwrap_or_default();
                let entries = recruiters::filter_by_company(&directory, &term);
                if entries.is_empty() {
                    if term.is_empty() {
                        println!("No recruiters found. Add one manually or track them via applications.");
                    } else {
                        println!("No recruiters found for \"{}\".", term);
                    }
                } else {
                    println!(
                        "{:<3} {:<22} {:<12} {:<20} {:<18} {:<28}",
                        "", "ID", "SOURCE", "NAME", "COMPANY", "EMAIL"
                    );
                    println!("{}", "-".repeat(106));
                    for entry in entries {
                        let flag = if entry.is_duplicate { "DUP" } else { "" };
                        println!(
                            "{:<3} {:<22} {:<12} {:<20} {:<18} {:<28}",
                            flag,
                            truncate(&entry.id, 22),
                            entry.source.label(),
                            truncate(entry.name.as_deref().unwrap_or("Anonymous"), 18),
                            truncate(entry.company.as_deref().unwrap_or("Unknown Company"), 16),
                            entry.email.as_deref().unwrap_or("-")
                        );
                    }
                }
            }

            RecruiterCommands::Edit {
                id,
                name,
                company,
                email,
                linkedin,
            } => {
                let directory = recruiters::aggregate(store.manual_recruiters(), store.jobs());
                let id = resolve_prefix(directory.iter().map(|e| e.id.as_str()), &id, "recruiter")?;
                let patch = RecruiterPatch {
                    name,
                    email,
                    linkedin,
                    company,
                };
                let embedded = recruiters::locate_job_recruiter(store.jobs(), &id)
                    .map(|(job, rec)| (job.to_string(), rec.to_string()));
                match embedded {
                    Some((job, rec)) => {
                        if patch.company.is_some() {
                            println!("Company follows the application; use 'tracker edit' to change it.");
                        }
                        match store.update_job_recruiter(&job, &rec, patch, now) {
                            Some(rec) => println!("Updated recruiter {}.", short_id(&rec.id)),
                            None => println!("A name, email, or LinkedIn is required."),
                        }
                    }
                    None => {
                        if let Some(rec) = store.update_manual_recruiter(&id, patch) {
                            println!("Updated recruiter {}.", rec.contact.id);
                        }
                    }
                }
            }

            RecruiterCommands::Remove { id } => {
                let id = manual_recruiter_id(&store, &id)?;
                if store.remove_manual_recruiter(&id) {
                    println!("Removed.");
                }
            }

            RecruiterCommands::Copy { id, field } => {
                let directory = recruiters::aggregate(store.manual_recruiters(), store.jobs());
                let id = resolve_prefix(directory.iter().map(|e| e.id.as_str()), &id, "recruiter")?;
                let entry = directory
                    .iter()
                    .find(|e| e.id == id)
                    .ok_or_else(|| anyhow!("Recruiter {} not found", id))?;
                match recruiters::copy_field(entry, field.into(), &SystemClipboard) {
                    Some(value) => println!("Copied {}", value),
                    None => println!("Nothing to copy."),
                }
            }

            RecruiterCommands::Attach {
                job_id: job,
                name,
                email,
                linkedin,
            } => {
                let id = job_id(&store, &job)?;
                let recruiter = NewRecruiter {
                    name,
                    email,
                    linkedin,
                };
                match store.attach_recruiter(&id, recruiter, now) {
                    Some(rec) => println!("Attached recruiter {}", short_id(&rec.id)),
                    None => println!("A name, email, or LinkedIn is required."),
                }
            }

            RecruiterCommands::Detach {
                job_id: job,
                recruiter_id,
            } => {
                let id = job_id(&store, &job)?;
                let recruiter_ids: Vec<String> = store
                    .job(&id)
                    .map(|j| j.recruiters.iter().map(|r| r.id.clone()).collect())
                    .unwrap_or_default();
                let rec_id = resolve_prefix(
                    recruiter_ids.iter().map(String::as_str),
                    &recruiter_id,
                    "recruiter",
                )?;
                if store.detach_recruiter(&id, &rec_id, now) {
                    println!("Detached.");
                }
            }
        },
    }

    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
