//! Free-time analysis over a single civil day.
//!
//! The pipeline is [`normalize_busy`] -> [`find_gaps`] -> [`select_best_slot`],
//! chained by [`analyze_day`]. Every step is a pure function of its inputs.

use crate::domain::interval::{DayBounds, Interval};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// A busy period as reported by the calendar; either end may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusyPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BusyPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

impl From<Interval> for BusyPeriod {
    fn from(interval: Interval) -> Self {
        Self::new(interval.start(), interval.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingStart,
    MissingEnd,
    NonPositiveWidth,
    OutsideDay,
}

/// A raw busy period the normalizer dropped; `index` points into the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedBusy {
    pub intervals: Vec<Interval>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestSlot {
    pub interval: Interval,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSelection {
    Best(BestSlot),
    NoFreeTime,
}

impl SlotSelection {
    pub fn best(&self) -> Option<&BestSlot> {
        match self {
            Self::Best(slot) => Some(slot),
            Self::NoFreeTime => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeTimeAnalysis {
    pub bounds: DayBounds,
    pub busy: Vec<Interval>,
    pub gaps: Vec<Interval>,
    pub selection: SlotSelection,
    pub skipped: Vec<SkippedEntry>,
}

/// Drops malformed and out-of-day periods, clips the rest to `bounds` and
/// sorts by start then end. Overlapping periods are kept as they are.
pub fn normalize_busy(raw: &[BusyPeriod], bounds: &DayBounds) -> NormalizedBusy {
    let mut intervals = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for (index, period) in raw.iter().enumerate() {
        let clipped = match (period.start, period.end) {
            (None, _) => Err(SkipReason::MissingStart),
            (_, None) => Err(SkipReason::MissingEnd),
            (Some(start), Some(end)) if end <= start => Err(SkipReason::NonPositiveWidth),
            (Some(start), Some(end)) => Interval::new(start, end)
                .ok()
                .and_then(|interval| interval.clip_to(bounds))
                .ok_or(SkipReason::OutsideDay),
        };

        match clipped {
            Ok(interval) => intervals.push(interval),
            Err(reason) => {
                debug!(index, ?reason, ?period, "skipping malformed busy period");
                skipped.push(SkippedEntry { index, reason });
            }
        }
    }

    intervals.sort_by(|left, right| {
        left.start()
            .cmp(&right.start())
            .then_with(|| left.end().cmp(&right.end()))
    });

    NormalizedBusy { intervals, skipped }
}

/// Complement of `busy` within `bounds`, in one forward scan.
///
/// `busy` must be sorted by start. Overlaps are handled by only ever moving
/// `last_end` forward, so no merge pass is needed.
pub fn find_gaps(busy: &[Interval], bounds: &DayBounds) -> Vec<Interval> {
    let mut gaps = Vec::new();
    let mut last_end = bounds.start();

    for interval in busy {
        if interval.start() > last_end {
            gaps.extend(Interval::new(last_end, interval.start()).ok());
        }
        last_end = last_end.max(interval.end());
    }

    if last_end < bounds.end() {
        gaps.extend(Interval::new(last_end, bounds.end()).ok());
    }
    gaps
}

/// Longest gap; on equal durations the earliest one wins.
pub fn select_best_slot(gaps: &[Interval]) -> SlotSelection {
    let mut best: Option<BestSlot> = None;
    for gap in gaps {
        let duration = gap.duration();
        let is_longer = best.is_none_or(|current| duration > current.duration);
        if is_longer {
            best = Some(BestSlot {
                interval: *gap,
                duration,
            });
        }
    }
    best.map_or(SlotSelection::NoFreeTime, SlotSelection::Best)
}

pub fn analyze_day(bounds: DayBounds, raw: &[BusyPeriod]) -> FreeTimeAnalysis {
    let NormalizedBusy { intervals, skipped } = normalize_busy(raw, &bounds);
    let gaps = find_gaps(&intervals, &bounds);
    let selection = select_best_slot(&gaps);
    debug!(
        busy = intervals.len(),
        gaps = gaps.len(),
        skipped = skipped.len(),
        "analyzed free time"
    );

    FreeTimeAnalysis {
        bounds,
        busy: intervals,
        gaps,
        selection,
        skipped,
    }
}
