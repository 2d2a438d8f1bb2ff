use crate::domain::agenda::AgendaItem;
use crate::domain::free_time::BusyPeriod;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

const STATUS_CANCELLED: &str = "cancelled";
const TRANSPARENCY_TRANSPARENT: &str = "transparent";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl CalendarEventDateTime {
    /// Timed values win; an all-day `date` resolves to local midnight in `timezone`.
    pub fn resolve(&self, timezone: Tz) -> Option<DateTime<Utc>> {
        if let Some(raw) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|value| value.with_timezone(&Utc));
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?.trim(), "%Y-%m-%d").ok()?;
        timezone
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .earliest()
            .map(|value| value.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: CalendarEventDateTime,
    #[serde(default)]
    pub end: CalendarEventDateTime,
}

impl GoogleCalendarEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case(STATUS_CANCELLED))
    }

    pub fn blocks_time(&self) -> bool {
        let transparent = self
            .transparency
            .as_deref()
            .is_some_and(|value| value.eq_ignore_ascii_case(TRANSPARENCY_TRANSPARENT));
        !self.is_cancelled() && !transparent
    }
}

/// Busy period for free-time analysis; `None` for events that do not block time.
pub fn busy_period(event: &GoogleCalendarEvent, timezone: Tz) -> Option<BusyPeriod> {
    if !event.blocks_time() {
        return None;
    }
    Some(BusyPeriod {
        start: event.start.resolve(timezone),
        end: event.end.resolve(timezone),
    })
}

pub fn agenda_item(event: &GoogleCalendarEvent, timezone: Tz) -> Option<AgendaItem> {
    if event.is_cancelled() {
        return None;
    }
    Some(AgendaItem {
        start: event.start.resolve(timezone)?,
        end: event.end.resolve(timezone)?,
        summary: event.summary.clone(),
    })
}

pub fn timed_event(
    summary: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: Tz,
) -> Result<GoogleCalendarEvent, InfraError> {
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(InfraError::InvalidInput(
            "event description must not be empty".to_string(),
        ));
    }
    let local = |instant: DateTime<Utc>| CalendarEventDateTime {
        date_time: Some(instant.with_timezone(&timezone).to_rfc3339()),
        date: None,
        time_zone: Some(timezone.name().to_string()),
    };

    Ok(GoogleCalendarEvent {
        id: None,
        summary: Some(summary.to_string()),
        status: None,
        transparency: None,
        html_link: None,
        start: local(start),
        end: local(end),
    })
}

pub fn summary_matches(event: &GoogleCalendarEvent, description: &str) -> bool {
    let wanted = description.trim().to_lowercase();
    event
        .summary
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        == wanted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn parse_event(json: &str) -> GoogleCalendarEvent {
        serde_json::from_str(json).expect("valid event payload")
    }

    #[test]
    fn timed_event_resolves_to_busy_period() {
        let event = parse_event(
            r#"{"id":"e1","summary":"Standup","status":"confirmed",
                "start":{"dateTime":"2026-02-16T09:00:00-05:00"},
                "end":{"dateTime":"2026-02-16T09:30:00-05:00"}}"#,
        );
        let period = busy_period(&event, chrono_tz::America::New_York).expect("busy");
        assert_eq!(period, BusyPeriod::new(at("2026-02-16T14:00:00Z"), at("2026-02-16T14:30:00Z")));
    }

    #[test]
    fn all_day_event_resolves_to_local_midnights() {
        let event = parse_event(
            r#"{"id":"e2","summary":"Holiday",
                "start":{"date":"2026-02-16"},"end":{"date":"2026-02-17"}}"#,
        );
        let period = busy_period(&event, chrono_tz::America::New_York).expect("busy");
        assert_eq!(period.start, Some(at("2026-02-16T05:00:00Z")));
        assert_eq!(period.end, Some(at("2026-02-17T05:00:00Z")));
    }

    #[test]
    fn transparent_and_cancelled_events_do_not_block_time() {
        let transparent = parse_event(
            r#"{"id":"e3","transparency":"transparent",
                "start":{"dateTime":"2026-02-16T09:00:00Z"},"end":{"dateTime":"2026-02-16T10:00:00Z"}}"#,
        );
        let cancelled = parse_event(r#"{"id":"e4","status":"cancelled"}"#);
        assert!(busy_period(&transparent, chrono_tz::UTC).is_none());
        assert!(busy_period(&cancelled, chrono_tz::UTC).is_none());
        assert!(agenda_item(&transparent, chrono_tz::UTC).is_some());
        assert!(agenda_item(&cancelled, chrono_tz::UTC).is_none());
    }

    #[test]
    fn unparseable_times_surface_as_missing_fields() {
        let event = parse_event(
            r#"{"id":"e5","start":{"dateTime":"not-a-time"},"end":{"dateTime":"2026-02-16T10:00:00Z"}}"#,
        );
        let period = busy_period(&event, chrono_tz::UTC).expect("busy");
        assert_eq!(period.start, None);
        assert_eq!(period.end, Some(at("2026-02-16T10:00:00Z")));
    }

    #[test]
    fn timed_event_payload_carries_local_time_and_zone() {
        let event = timed_event(
            " practice ",
            at("2026-02-16T20:00:00Z"),
            at("2026-02-16T23:00:00Z"),
            chrono_tz::America::New_York,
        )
        .expect("event");
        let payload = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(payload["summary"], "practice");
        assert_eq!(payload["start"]["dateTime"], "2026-02-16T15:00:00-05:00");
        assert_eq!(payload["start"]["timeZone"], "America/New_York");
        assert_eq!(payload["end"]["dateTime"], "2026-02-16T18:00:00-05:00");
        assert!(payload.get("id").is_none());
    }

    #[test]
    fn timed_event_rejects_blank_summary() {
        let result = timed_event(
            "  ",
            at("2026-02-16T20:00:00Z"),
            at("2026-02-16T23:00:00Z"),
            chrono_tz::UTC,
        );
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));
    }

    #[test]
    fn summary_match_ignores_case_and_whitespace() {
        let event = parse_event(r#"{"id":"e6","summary":"  Practice "}"#);
        assert!(summary_matches(&event, "practice"));
        assert!(summary_matches(&event, "PRACTICE  "));
        assert!(!summary_matches(&event, "practice session"));
    }
}
