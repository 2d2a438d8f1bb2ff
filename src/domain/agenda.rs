use crate::domain::report::format_clock;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

pub const EMPTY_AGENDA_MESSAGE: &str = "No events scheduled for today.";
pub const AGENDA_HEADER: &str = "Today's events:";
const MISSING_SUMMARY: &str = "No Description";

pub fn greeting(hour: u32, name: &str) -> String {
    match hour {
        5..=11 => format!("Good morning {name}!"),
        12..=16 => format!("Good afternoon {name}!"),
        17..=20 => format!("Good evening {name}!"),
        _ => format!("What are you doing up so late {name}?"),
    }
}

pub fn greeting_line(now: DateTime<Utc>, timezone: Tz, name: &str) -> String {
    let local = now.with_timezone(&timezone);
    format!(
        "{} The time is {} and the date is {}.",
        greeting(local.hour(), name),
        local.format("%I:%M %p"),
        local.date_naive()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaItem {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: Option<String>,
}

pub fn agenda_line(item: &AgendaItem, timezone: Tz) -> String {
    let summary = item
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(MISSING_SUMMARY);
    format!(
        "{} - {} -> {}",
        format_clock(item.start, timezone),
        format_clock(item.end, timezone),
        summary
    )
}

pub fn format_agenda(items: &[AgendaItem], timezone: Tz) -> String {
    if items.is_empty() {
        return EMPTY_AGENDA_MESSAGE.to_string();
    }
    let mut lines = vec![AGENDA_HEADER.to_string()];
    lines.extend(items.iter().map(|item| agenda_line(item, timezone)));
    lines.join("\n")
}
