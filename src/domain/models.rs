use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_HOURS_PER_ENTRY: f64 = 24.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoursEntry {
    pub id: i64,
    pub logged_on: NaiveDate,
    pub category: String,
    pub hours: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub hours: f64,
}

/// Trims and upper-cases a ledger category.
pub fn normalize_category(value: &str) -> Result<String, String> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err("category must not be empty".to_string());
    }
    Ok(normalized.to_uppercase())
}

pub fn validate_hours(hours: f64) -> Result<(), String> {
    if !hours.is_finite() {
        return Err("hours must be a finite number".to_string());
    }
    if hours <= 0.0 {
        return Err("hours must be > 0".to_string());
    }
    if hours > MAX_HOURS_PER_ENTRY {
        return Err(format!("hours must be <= {MAX_HOURS_PER_ENTRY}"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}
