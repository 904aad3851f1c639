use std::path::PathBuf;

const DEFAULT_LOG_LEVEL: &str = "warn";
const DB_FILE: &str = "tracker.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Flags win over the environment (clap fills flags from `TRACKER_DB` /
    /// `TRACKER_LOG`), which wins over defaults.
    pub fn resolve(db_path: Option<PathBuf>, log_level: Option<String>) -> Self {
        Self {
            db_path: db_path.unwrap_or_else(default_db_path),
            log_level: log_level
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

fn default_db_path() -> PathBuf {
    // Use XDG data directory or fall back to the working directory
    match directories::ProjectDirs::from("", "", "tracker") {
        Some(dirs) => dirs.data_dir().join(DB_FILE),
        None => PathBuf::from(DB_FILE),
    }
}
