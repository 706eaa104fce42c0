use std::path::PathBuf;

use crate::application::controller::FilterResetPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
pub const DEFAULT_LOG_FILE: &str = "todos.log";

/// Settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub log_file: PathBuf,
    pub on_save: FilterResetPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let log_file = lookup("TODO_LOG_FILE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        let on_save = match lookup("TODO_RESET_FILTER_ON_SAVE").map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("1" | "true") => FilterResetPolicy::ResetToAll,
            _ => FilterResetPolicy::Keep,
        };
        Self { database_url, log_file, on_save }
    }
}
