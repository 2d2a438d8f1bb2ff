use crate::domain::models::{CategoryTotal, HoursEntry, normalize_category, validate_hours};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_connection;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait HoursLedger: Send + Sync {
    fn record(
        &self,
        logged_on: NaiveDate,
        category: &str,
        hours: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<HoursEntry, InfraError>;

    /// Entries with `from <= logged_on <= to`, ordered by date then insertion.
    fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<HoursEntry>, InfraError>;

    fn totals_by_category(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CategoryTotal>, InfraError> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for entry in self.entries_between(from, to)? {
            *totals.entry(entry.category).or_default() += entry.hours;
        }
        Ok(totals
            .into_iter()
            .map(|(category, hours)| CategoryTotal { category, hours })
            .collect())
    }
}

fn validated(category: &str, hours: f64) -> Result<String, InfraError> {
    validate_hours(hours).map_err(InfraError::InvalidInput)?;
    normalize_category(category).map_err(InfraError::InvalidInput)
}

fn ensure_range(from: NaiveDate, to: NaiveDate) -> Result<(), InfraError> {
    if to < from {
        return Err(InfraError::InvalidInput(format!(
            "range end {to} is before range start {from}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SqliteHoursLedger {
    db_path: PathBuf,
}

impl SqliteHoursLedger {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_connection(&self.db_path)
    }
}

impl HoursLedger for SqliteHoursLedger {
    fn record(
        &self,
        logged_on: NaiveDate,
        category: &str,
        hours: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<HoursEntry, InfraError> {
        let category = validated(category, hours)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO hours (logged_on, category, hours, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                logged_on.to_string(),
                category,
                hours,
                recorded_at.to_rfc3339()
            ],
        )?;

        Ok(HoursEntry {
            id: connection.last_insert_rowid(),
            logged_on,
            category,
            hours,
            recorded_at,
        })
    }

    fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<HoursEntry>, InfraError> {
        ensure_range(from, to)?;
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, logged_on, category, hours, recorded_at FROM hours
             WHERE logged_on >= ?1 AND logged_on <= ?2
             ORDER BY logged_on ASC, id ASC",
        )?;
        let rows = statement.query_map(params![from.to_string(), to.to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, logged_on_raw, category, hours, recorded_at_raw) = row?;
            let logged_on = NaiveDate::parse_from_str(&logged_on_raw, "%Y-%m-%d").map_err(|error| {
                InfraError::InvalidConfig(format!(
                    "invalid hours.logged_on '{logged_on_raw}': {error}"
                ))
            })?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_raw)
                .map_err(|error| {
                    InfraError::InvalidConfig(format!(
                        "invalid hours.recorded_at '{recorded_at_raw}': {error}"
                    ))
                })?
                .with_timezone(&Utc);
            entries.push(HoursEntry {
                id,
                logged_on,
                category,
                hours,
                recorded_at,
            });
        }
        Ok(entries)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryHoursLedger {
    entries: Mutex<Vec<HoursEntry>>,
}

impl HoursLedger for InMemoryHoursLedger {
    fn record(
        &self,
        logged_on: NaiveDate,
        category: &str,
        hours: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<HoursEntry, InfraError> {
        let category = validated(category, hours)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("hours ledger lock poisoned: {error}")))?;
        let entry = HoursEntry {
            id: entries.len() as i64 + 1,
            logged_on,
            category,
            hours,
            recorded_at,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<HoursEntry>, InfraError> {
        ensure_range(from, to)?;
        let entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("hours ledger lock poisoned: {error}")))?;
        let mut selected = entries
            .iter()
            .filter(|entry| entry.logged_on >= from && entry.logged_on <= to)
            .cloned()
            .collect::<Vec<_>>();
        selected.sort_by_key(|entry| (entry.logged_on, entry.id));
        Ok(selected)
    }
}
