use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA as u8,
            user_name: default_user_name(),
            timezone: default_timezone(),
            calendar_id: default_calendar_id(),
            default_category: default_category(),
            upcoming_limit: default_upcoming_limit(),
        }
    }
}

impl AppConfig {
    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("unknown timezone '{}': {error}", self.timezone))
        })
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        self.time_zone()?;
        if self.calendar_id.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "calendarId must not be empty".to_string(),
            ));
        }
        if self.default_category.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "defaultCategory must not be empty".to_string(),
            ));
        }
        if self.upcoming_limit == 0 {
            return Err(InfraError::InvalidConfig(
                "upcomingLimit must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_user_name() -> String {
    "there".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_category() -> String {
    "CODING".to_string()
}

fn default_upcoming_limit() -> u32 {
    10
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }

    let config: AppConfig = serde_json::from_value(parsed)?;
    config.validate()?;
    Ok(config)
}
