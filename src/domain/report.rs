use crate::domain::free_time::{FreeTimeAnalysis, SlotSelection};
use crate::domain::interval::Interval;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

const HEADER: &str = "Free Slots";
const RULE: &str = "----------------";
pub const NO_FREE_TIME_MESSAGE: &str = "You have no free time today.";

/// `9:00AM`, `12:30PM`: 12-hour clock without a leading zero on the hour.
pub fn format_clock(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant.with_timezone(&timezone).format("%-I:%M%p").to_string()
}

pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if minutes == 0 {
        format!("{hours} hours")
    } else {
        format!("{hours} hours and {minutes} minutes")
    }
}

pub fn format_range(interval: &Interval, timezone: Tz) -> String {
    format!(
        "{} - {}",
        format_clock(interval.start(), timezone),
        format_clock(interval.end(), timezone)
    )
}

pub fn format_report(analysis: &FreeTimeAnalysis, timezone: Tz) -> String {
    let mut lines = Vec::with_capacity(analysis.gaps.len() + 4);
    lines.push(HEADER.to_string());
    lines.push(RULE.to_string());
    lines.extend(analysis.gaps.iter().map(|gap| format_range(gap, timezone)));
    lines.push(RULE.to_string());
    lines.push(match &analysis.selection {
        SlotSelection::Best(best) => format!(
            "The most optimal time slot you have is from {} to {} for {}.",
            format_clock(best.interval.start(), timezone),
            format_clock(best.interval.end(), timezone),
            format_duration(best.duration)
        ),
        SlotSelection::NoFreeTime => NO_FREE_TIME_MESSAGE.to_string(),
    });
    lines.join("\n")
}
