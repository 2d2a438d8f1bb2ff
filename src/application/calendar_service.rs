use crate::domain::interval::{DayBounds, Interval};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{GoogleCalendarEvent, summary_matches, timed_event};
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ListEventsRequest};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{debug, info, warn};

const CLOCK_INPUT_FORMAT: &str = "%I:%M%p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { event_id: String },
    NotFound,
}

pub struct CalendarService<C>
where
    C: GoogleCalendarClient,
{
    calendar_client: Arc<C>,
    calendar_id: String,
    timezone: Tz,
    upcoming_limit: u32,
    retry_policy: RetryPolicy,
}

impl<C> CalendarService<C>
where
    C: GoogleCalendarClient,
{
    pub fn new(
        calendar_client: Arc<C>,
        calendar_id: impl Into<String>,
        timezone: Tz,
        upcoming_limit: u32,
    ) -> Self {
        Self {
            calendar_client,
            calendar_id: calendar_id.into(),
            timezone,
            upcoming_limit: upcoming_limit.max(1),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn events_for_day(
        &self,
        access_token: &str,
        bounds: &DayBounds,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        let events = self
            .list_events_with_retry(
                access_token,
                ListEventsRequest {
                    time_min: Some(bounds.start()),
                    time_max: Some(bounds.end()),
                    max_results: None,
                    time_zone: Some(self.timezone.name().to_string()),
                },
            )
            .await?;
        debug!(count = events.len(), day_start = %bounds.start(), "fetched events for day");
        Ok(events)
    }

    pub async fn upcoming_events(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
        limit: Option<u32>,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        self.list_events_with_retry(
            access_token,
            ListEventsRequest {
                time_min: Some(now),
                time_max: None,
                max_results: Some(limit.unwrap_or(self.upcoming_limit).max(1)),
                time_zone: Some(self.timezone.name().to_string()),
            },
        )
        .await
    }

    /// Creates a timed event on `date`; times are clock strings such as `3:00PM`.
    pub async fn add_event(
        &self,
        access_token: &str,
        date: NaiveDate,
        start_text: &str,
        end_text: &str,
        description: &str,
    ) -> Result<GoogleCalendarEvent, InfraError> {
        let start = self.resolve_clock(date, start_text)?;
        let end = self.resolve_clock(date, end_text)?;
        let interval = Interval::new(start, end)?;
        if interval.is_empty() {
            return Err(InfraError::InvalidInput(format!(
                "event end {} must be after start {}",
                end_text.trim(),
                start_text.trim()
            )));
        }

        let event = timed_event(description, interval.start(), interval.end(), self.timezone)?;
        let created = self
            .calendar_client
            .insert_event(access_token, &self.calendar_id, &event)
            .await?;
        info!(
            event_id = created.id.as_deref().unwrap_or_default(),
            start = %interval.start(),
            end = %interval.end(),
            "created calendar event"
        );
        Ok(created)
    }

    /// Deletes the first upcoming event whose summary matches `description`.
    pub async fn delete_by_description(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
        description: &str,
    ) -> Result<DeleteOutcome, InfraError> {
        if description.trim().is_empty() {
            return Err(InfraError::InvalidInput(
                "event description must not be empty".to_string(),
            ));
        }

        let upcoming = self.upcoming_events(access_token, now, None).await?;
        let matched = upcoming
            .iter()
            .filter(|event| summary_matches(event, description))
            .find_map(|event| {
                event
                    .id
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            });

        let Some(event_id) = matched else {
            debug!(description, scanned = upcoming.len(), "no upcoming event matched");
            return Ok(DeleteOutcome::NotFound);
        };

        self.calendar_client
            .delete_event(access_token, &self.calendar_id, event_id)
            .await?;
        info!(event_id, "deleted calendar event");
        Ok(DeleteOutcome::Deleted {
            event_id: event_id.to_string(),
        })
    }

    fn resolve_clock(&self, date: NaiveDate, text: &str) -> Result<DateTime<Utc>, InfraError> {
        let compact: String = text
            .chars()
            .filter(|value| !value.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let time = NaiveTime::parse_from_str(&compact, CLOCK_INPUT_FORMAT).map_err(|error| {
            InfraError::InvalidInput(format!(
                "invalid time '{}' (expected e.g. 3:00PM): {error}",
                text.trim()
            ))
        })?;
        self.timezone
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|value| value.with_timezone(&Utc))
            .ok_or_else(|| {
                InfraError::InvalidInput(format!(
                    "time '{}' does not exist on {date} in {}",
                    text.trim(),
                    self.timezone.name()
                ))
            })
    }

    async fn list_events_with_retry(
        &self,
        access_token: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self
                .calendar_client
                .list_events(access_token, &self.calendar_id, request.clone())
                .await
            {
                Ok(events) => return Ok(events),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    warn!(attempt = attempt + 1, delay_ms = delay, %error, "retrying event listing");
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn should_retry(error: &InfraError) -> bool {
    match error {
        InfraError::Calendar(message) => {
            let message = message.to_ascii_lowercase();
            message.contains("network error")
                || message.contains("timeout")
                || message.contains("timed out")
                || message.contains("http 429")
                || message.contains("http 5")
        }
        _ => false,
    }
}
