//! Time summaries for a day, week or month.
//!
//! Summaries are computed with the same replay as the balance engine, restricted to the
//! requested range, so their totals match what that range contributed to the balances.
//! Weeks start on Sunday.

use crate::{
    core::{
        balance::{Balances, UserHistory, replay},
        flex::{break_minutes, extra_minutes, work_window},
    },
    errors::{Error, Result},
};
use chrono::{Datelike, Days, Months, NaiveDate};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::instrument;

/// Length of a summary range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    Day,
    Week,
    Month,
}

impl std::str::FromStr for SummaryPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(Error::Config {
                message: format!("Unknown summary period: {other}"),
            }),
        }
    }
}

/// Half-open `[start, end)` range of `period` containing `base`.
#[must_use]
pub fn period_range(period: SummaryPeriod, base: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = match period {
        SummaryPeriod::Day => base,
        SummaryPeriod::Week => {
            base - Days::new(u64::from(base.weekday().num_days_from_sunday()))
        }
        SummaryPeriod::Month => base.with_day(1).unwrap_or(base),
    };
    let end = match period {
        SummaryPeriod::Day => start + Days::new(1),
        SummaryPeriod::Week => start + Days::new(7),
        SummaryPeriod::Month => start + Months::new(1),
    };
    (start, end)
}

/// One entry's row in a summary. All values are minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub work: i64,
    /// Travel start to travel end, when both were recorded
    pub travel: i64,
    pub breaks: i64,
    pub extra: i64,
    /// Owed before absences
    pub nominal: i64,
    /// Owed after absences
    pub adjusted: i64,
    pub flex_work: i64,
    pub flex_work_travel: i64,
}

/// Summary of a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub period: SummaryPeriod,
    /// First day, inclusive
    pub start: NaiveDate,
    /// Day after the last day
    pub end: NaiveDate,
    /// Rows in date order
    pub days: Vec<DaySummary>,
    /// Flex leave withdrawn on dates without a valid entry
    pub flex_leave_withdrawn: i64,
    /// Flex contributed by the range
    pub totals: Balances,
}

/// Builds the summary of `period` around `base_date` for `user_id`.
#[instrument(skip(db))]
pub async fn summarize(
    db: &DatabaseConnection,
    user_id: i64,
    period: SummaryPeriod,
    base_date: NaiveDate,
) -> Result<PeriodSummary> {
    let (start, end) = period_range(period, base_date);
    let last = end.pred_opt().unwrap_or(start);
    let history = UserHistory::load(db, user_id, Some((start, last))).await?;
    let result = replay(&history);

    let days = result
        .entries
        .iter()
        .map(|row| {
            let entry = &row.entry;
            let breaks = history.breaks.get(&entry.id).map_or(&[][..], Vec::as_slice);
            let extras = history.extra_times.get(&entry.id).map_or(&[][..], Vec::as_slice);
            let travel = match (entry.travel_start_time, entry.travel_end_time) {
                (Some(s), Some(e)) if e > s => i64::from(e - s),
                _ => 0,
            };
            DaySummary {
                date: entry.date,
                work: work_window(entry).map_or(0, |(s, e)| i64::from(e - s)),
                travel,
                breaks: break_minutes(breaks),
                extra: extra_minutes(extras),
                nominal: row.nominal_minutes,
                adjusted: row.adjusted_minutes,
                flex_work: row.flex.flex_work,
                flex_work_travel: row.flex.flex_work_travel,
            }
        })
        .collect();

    let flex_leave_withdrawn = result
        .standalone_flex_leaves
        .iter()
        .map(|leave| history.policy.nominal_minutes(leave.date))
        .sum();

    Ok(PeriodSummary {
        period,
        start,
        end,
        days,
        flex_leave_withdrawn,
        totals: result.balances,
    })
}
