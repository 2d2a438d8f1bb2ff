use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("interval end {end} precedes start {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("day bounds must end after they start (start={start}, end={end})")]
    EmptyDay {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("local midnight of {date} does not exist in {timezone}")]
    UnresolvableMidnight { date: NaiveDate, timezone: String },
}

/// Half-open time range `[start, end)`. Zero-length ranges are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if end < start {
            return Err(IntervalError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection with the day window, `None` when nothing non-empty remains.
    pub fn clip_to(&self, bounds: &DayBounds) -> Option<Interval> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (end > start).then_some(Interval { start, end })
    }
}

/// The civil-day window `[start, end)` a free/busy analysis runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayBounds {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if end <= start {
            return Err(IntervalError::EmptyDay { start, end });
        }
        Ok(Self { start, end })
    }

    /// Local midnight of `date` up to local midnight of the following day.
    pub fn for_date(date: NaiveDate, timezone: Tz) -> Result<Self, IntervalError> {
        let start = local_midnight(date, timezone)?;
        let next = date
            .succ_opt()
            .ok_or_else(|| IntervalError::UnresolvableMidnight {
                date,
                timezone: timezone.name().to_string(),
            })?;
        let end = local_midnight(next, timezone)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn as_interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    pub fn contains(&self, interval: &Interval) -> bool {
        interval.start >= self.start && interval.end <= self.end
    }
}

fn local_midnight(date: NaiveDate, timezone: Tz) -> Result<DateTime<Utc>, IntervalError> {
    let unresolvable = || IntervalError::UnresolvableMidnight {
        date,
        timezone: timezone.name().to_string(),
    };
    let naive = date.and_hms_opt(0, 0, 0).ok_or_else(unresolvable)?;
    // DST transitions at midnight leave either two candidates or none.
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(unresolvable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn interval_rejects_end_before_start() {
        let result = Interval::new(at("2026-02-16T10:00:00Z"), at("2026-02-16T09:00:00Z"));
        assert!(matches!(result, Err(IntervalError::EndBeforeStart { .. })));
    }

    #[test]
    fn zero_length_interval_is_allowed_and_empty() {
        let interval =
            Interval::new(at("2026-02-16T10:00:00Z"), at("2026-02-16T10:00:00Z")).expect("interval");
        assert!(interval.is_empty());
        assert_eq!(interval.duration(), Duration::zero());
    }

    #[test]
    fn overlap_is_strict_on_both_ends() {
        let morning =
            Interval::new(at("2026-02-16T09:00:00Z"), at("2026-02-16T11:00:00Z")).expect("interval");
        let late_morning =
            Interval::new(at("2026-02-16T10:00:00Z"), at("2026-02-16T12:00:00Z")).expect("interval");
        let touching =
            Interval::new(at("2026-02-16T11:00:00Z"), at("2026-02-16T12:00:00Z")).expect("interval");

        assert!(morning.overlaps(&late_morning));
        assert!(late_morning.overlaps(&morning));
        assert!(!morning.overlaps(&touching));
        assert!(!touching.overlaps(&morning));
    }

    #[test]
    fn clip_to_truncates_and_drops_outside() {
        let bounds = DayBounds::new(at("2026-02-16T00:00:00Z"), at("2026-02-17T00:00:00Z"))
            .expect("bounds");
        let spanning =
            Interval::new(at("2026-02-15T22:00:00Z"), at("2026-02-16T02:00:00Z")).expect("interval");
        let outside =
            Interval::new(at("2026-02-17T01:00:00Z"), at("2026-02-17T02:00:00Z")).expect("interval");

        let clipped = spanning.clip_to(&bounds).expect("clipped");
        assert_eq!(clipped.start(), at("2026-02-16T00:00:00Z"));
        assert_eq!(clipped.end(), at("2026-02-16T02:00:00Z"));
        assert!(outside.clip_to(&bounds).is_none());
    }

    #[test]
    fn day_bounds_reject_empty_window() {
        let instant = at("2026-02-16T00:00:00Z");
        assert!(matches!(
            DayBounds::new(instant, instant),
            Err(IntervalError::EmptyDay { .. })
        ));
    }

    #[test]
    fn day_bounds_for_date_follow_local_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).expect("date");
        let bounds = DayBounds::for_date(date, chrono_tz::America::New_York).expect("bounds");
        assert_eq!(bounds.start(), at("2026-02-16T05:00:00Z"));
        assert_eq!(bounds.end(), at("2026-02-17T05:00:00Z"));
    }

    #[test]
    fn day_bounds_span_23_hours_on_spring_forward() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).expect("date");
        let bounds = DayBounds::for_date(date, chrono_tz::America::New_York).expect("bounds");
        assert_eq!(bounds.as_interval().duration(), Duration::hours(23));
    }
}
