//! Slot math for availability scheduling.
//!
//! Windows are wall-clock ranges on a weekday, interpreted at a fixed UTC
//! offset supplied by the caller. Busy intervals come from the connected
//! calendar in absolute time.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use spritz_types::models::TimeSlot;

/// Parse `HH:MM` (seconds tolerated).
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Canonical storage form of a window bound.
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// 0 = Sunday, matching the stored `day_of_week`.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

type Interval = (DateTime<Utc>, DateTime<Utc>);

/// Sort and merge overlapping or touching intervals.
fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|(s, e)| s < e);
    intervals.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Remove every busy interval from `free`. Both inputs must be merged.
fn subtract(free: &[Interval], busy: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    for &(start, end) in free {
        let mut cursor = start;
        for &(b_start, b_end) in busy {
            if b_end <= cursor || b_start >= end {
                continue;
            }
            if b_start > cursor {
                out.push((cursor, b_start));
            }
            cursor = cursor.max(b_end);
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            out.push((cursor, end));
        }
    }
    out
}

/// Bookable slots of `duration` on `date`.
///
/// `windows` are `(start, end)` wall-clock times already filtered to the
/// date's weekday. Slots are laid back to back from the start of each free
/// segment; a trailing remainder shorter than `duration` is dropped, as is
/// any slot starting before `not_before`.
pub fn compute_slots(
    date: NaiveDate,
    offset: FixedOffset,
    windows: &[(NaiveTime, NaiveTime)],
    busy: &[Interval],
    duration: Duration,
    not_before: DateTime<Utc>,
) -> Vec<TimeSlot> {
    if duration <= Duration::zero() {
        return vec![];
    }

    let to_utc = |t: NaiveTime| -> Option<DateTime<Utc>> {
        offset
            .from_local_datetime(&date.and_time(t))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    };

    let free = merge(
        windows
            .iter()
            .filter_map(|&(s, e)| Some((to_utc(s)?, to_utc(e)?)))
            .collect(),
    );
    let busy = merge(busy.to_vec());

    let mut slots = Vec::new();
    for (start, end) in subtract(&free, &busy) {
        let mut slot_start = start;
        while slot_start + duration <= end {
            if slot_start >= not_before {
                slots.push(TimeSlot {
                    start: slot_start,
                    end: slot_start + duration,
                });
            }
            slot_start += duration;
        }
    }
    slots
}
