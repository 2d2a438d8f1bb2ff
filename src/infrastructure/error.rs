use crate::domain::interval::IntervalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid interval: {0}")]
    Interval(#[from] IntervalError),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Calendar error: {0}")]
    Calendar(String),
    #[error("Credential store error: {0}")]
    Credential(String),
}
