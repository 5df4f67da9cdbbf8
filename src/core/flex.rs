//! Daily flex calculation.
//!
//! Turns one day's time entry into a signed number of minutes worked beyond (or short of)
//! what was owed. Two variants are produced: work only, and work plus the travel time that
//! falls outside the work window. Entries without a usable work window, such as punch
//! clock skeletons that only have a travel start, contribute nothing.

use crate::{
    core::absence::AbsenceFlags,
    entities::{break_interval, extra_time, time_entry},
};

/// Flex minutes produced by one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyFlex {
    /// Work minus breaks plus extra time minus what was owed
    pub flex_work: i64,
    /// Same as `flex_work` with travel outside the work window added
    pub flex_work_travel: i64,
    /// Whether a flex leave withdrawal was folded into both values
    pub flex_leave_withdrawn: bool,
}

/// The `(start, end)` work window if both bounds exist and end is after start.
#[must_use]
pub fn work_window(entry: &time_entry::Model) -> Option<(i32, i32)> {
    match (entry.work_start_time, entry.work_end_time) {
        (Some(start), Some(end)) if end > start => Some((start, end)),
        _ => None,
    }
}

/// Total break minutes. Breaks missing a bound or ending before they start count as zero.
#[must_use]
pub fn break_minutes(breaks: &[break_interval::Model]) -> i64 {
    breaks
        .iter()
        .filter_map(|b| Some(i64::from(b.end_time? - b.start_time?).max(0)))
        .sum()
}

/// Total extra minutes, counting only intervals whose end is after their start.
#[must_use]
pub fn extra_minutes(extra_times: &[extra_time::Model]) -> i64 {
    extra_times
        .iter()
        .filter(|e| e.end_time > e.start_time)
        .map(|e| i64::from(e.end_time - e.start_time))
        .sum()
}

/// Travel minutes outside the work window, if both travel bounds and the work window exist.
///
/// Leaving before work starts and arriving after work ends both add time; a travel start
/// after the work start subtracts symmetrically.
#[must_use]
pub fn travel_outside_window(entry: &time_entry::Model) -> Option<i64> {
    let (work_start, work_end) = work_window(entry)?;
    let travel_start = entry.travel_start_time?;
    let travel_end = entry.travel_end_time?;
    Some(i64::from(work_start - travel_start) + i64::from(travel_end - work_end))
}

/// Computes the flex for one entry.
///
/// `adjusted_minutes` is the nominal duration after absences. When `flags` report a
/// full-day flex leave, `nominal_minutes` (the unadjusted duration) is withdrawn once
/// from both variants.
#[must_use]
pub fn calculate_flex(
    entry: &time_entry::Model,
    breaks: &[break_interval::Model],
    extra_times: &[extra_time::Model],
    adjusted_minutes: i64,
    flags: AbsenceFlags,
    nominal_minutes: i64,
) -> DailyFlex {
    let Some((work_start, work_end)) = work_window(entry) else {
        return DailyFlex::default();
    };

    let work = i64::from(work_end - work_start);
    let base = work - break_minutes(breaks) + extra_minutes(extra_times) - adjusted_minutes;
    let withdrawal = if flags.has_full_day_flex_leave {
        nominal_minutes
    } else {
        0
    };

    let flex_work = base - withdrawal;
    let flex_work_travel = match travel_outside_window(entry) {
        Some(travel) => base + travel - withdrawal,
        None => flex_work,
    };

    DailyFlex {
        flex_work,
        flex_work_travel,
        flex_leave_withdrawn: flags.has_full_day_flex_leave,
    }
}
