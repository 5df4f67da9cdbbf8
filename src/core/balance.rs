//! Balance recalculation engine.
//!
//! The flex balances stored on a user row are a cache. They are never patched; every
//! mutation replays the user's whole history (entries, breaks, extra time, absences and
//! work periods) and overwrites both values inside the mutation's own transaction, so a
//! failed rebuild rolls the mutation back with it.
//!
//! Flex leave is withdrawn exactly once per flex leave absence. When a valid time entry
//! exists on the same date, the entry's daily calculation performs the withdrawal for the
//! first flex leave of that date; every other flex leave is withdrawn by the absence pass.

use crate::{
    core::{
        absence::{AbsenceKind, adjust_for_absences, kind_of},
        flex::{DailyFlex, calculate_flex},
        locks,
        policy::WorkTimePolicy,
    },
    entities::{
        Absence, BreakInterval, ExtraTime, TimeEntry, User, absence, break_interval, extra_time,
        time_entry, user,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// The two flex balances of a user, in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balances {
    /// Work only
    pub flex_balance: i64,
    /// Work plus travel outside the work window
    pub flex_balance_travel: i64,
}

impl Balances {
    fn add(&mut self, flex: DailyFlex) {
        self.flex_balance += flex.flex_work;
        self.flex_balance_travel += flex.flex_work_travel;
    }

    fn withdraw(&mut self, minutes: i64) {
        self.flex_balance -= minutes;
        self.flex_balance_travel -= minutes;
    }
}

/// Everything needed to replay a user's flex, optionally limited to a date range.
#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    pub policy: WorkTimePolicy,
    pub entries: Vec<time_entry::Model>,
    pub breaks: HashMap<i64, Vec<break_interval::Model>>,
    pub extra_times: HashMap<i64, Vec<extra_time::Model>>,
    /// Absences in insertion order
    pub absences: Vec<absence::Model>,
}

impl UserHistory {
    /// Loads the history of `user_id`. `range` is inclusive on both ends.
    pub async fn load<C>(db: &C, user_id: i64, range: Option<(NaiveDate, NaiveDate)>) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let policy = WorkTimePolicy::load(db, user_id).await?;

        let mut entries_query = TimeEntry::find()
            .filter(time_entry::Column::UserId.eq(user_id))
            .order_by_asc(time_entry::Column::Date);
        let mut breaks_query = BreakInterval::find()
            .inner_join(TimeEntry)
            .filter(time_entry::Column::UserId.eq(user_id))
            .order_by_asc(break_interval::Column::Position);
        let mut extras_query = ExtraTime::find()
            .inner_join(TimeEntry)
            .filter(time_entry::Column::UserId.eq(user_id))
            .order_by_asc(extra_time::Column::Id);
        let mut absences_query = Absence::find()
            .filter(absence::Column::UserId.eq(user_id))
            .order_by_asc(absence::Column::Id);

        if let Some((start, end)) = range {
            entries_query = entries_query.filter(time_entry::Column::Date.between(start, end));
            breaks_query = breaks_query.filter(time_entry::Column::Date.between(start, end));
            extras_query = extras_query.filter(time_entry::Column::Date.between(start, end));
            absences_query = absences_query.filter(absence::Column::Date.between(start, end));
        }

        let mut breaks: HashMap<i64, Vec<break_interval::Model>> = HashMap::new();
        for b in breaks_query.all(db).await? {
            breaks.entry(b.time_entry_id).or_default().push(b);
        }
        let mut extra_times: HashMap<i64, Vec<extra_time::Model>> = HashMap::new();
        for e in extras_query.all(db).await? {
            extra_times.entry(e.time_entry_id).or_default().push(e);
        }

        Ok(Self {
            policy,
            entries: entries_query.all(db).await?,
            breaks,
            extra_times,
            absences: absences_query.all(db).await?,
        })
    }
}

/// The flex of one entry together with the durations it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFlex {
    pub entry: time_entry::Model,
    /// Nominal minutes before absences
    pub nominal_minutes: i64,
    /// Nominal minutes after absences
    pub adjusted_minutes: i64,
    pub flex: DailyFlex,
}

/// Result of replaying a history.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    /// Per-entry results in date order
    pub entries: Vec<EntryFlex>,
    /// Flex leave absences withdrawn outside any entry's calculation
    pub standalone_flex_leaves: Vec<absence::Model>,
    /// Sum of every entry's flex minus the standalone withdrawals
    pub balances: Balances,
}

/// Replays a history in memory. Pure and deterministic.
#[must_use]
pub fn replay(history: &UserHistory) -> Replay {
    let mut absences_by_date: HashMap<NaiveDate, Vec<absence::Model>> = HashMap::new();
    for a in &history.absences {
        absences_by_date.entry(a.date).or_default().push(a.clone());
    }

    let mut result = Replay::default();
    let mut withdrawn_dates = HashSet::new();

    for entry in &history.entries {
        let nominal = history.policy.nominal_minutes(entry.date);
        let day_absences = absences_by_date.get(&entry.date).map_or(&[][..], Vec::as_slice);
        let (adjusted, flags) = adjust_for_absences(nominal, day_absences);
        let breaks = history.breaks.get(&entry.id).map_or(&[][..], Vec::as_slice);
        let extras = history.extra_times.get(&entry.id).map_or(&[][..], Vec::as_slice);

        let flex = calculate_flex(entry, breaks, extras, adjusted, flags, nominal);
        if flex.flex_leave_withdrawn {
            withdrawn_dates.insert(entry.date);
        }
        result.balances.add(flex);
        result.entries.push(EntryFlex {
            entry: entry.clone(),
            nominal_minutes: nominal,
            adjusted_minutes: adjusted,
            flex,
        });
    }

    let flex_leaves = history
        .absences
        .iter()
        .filter(|a| a.full_day && kind_of(a) == AbsenceKind::FlexLeave);
    for leave in flex_leaves {
        // The entry on this date already withdrew for its first flex leave.
        if withdrawn_dates.remove(&leave.date) {
            continue;
        }
        result
            .balances
            .withdraw(history.policy.nominal_minutes(leave.date));
        result.standalone_flex_leaves.push(leave.clone());
    }

    result
}

/// Rebuilds and stores the balances of `user_id` using an existing connection or
/// transaction. The caller is responsible for holding the user's lock.
pub async fn recalculate_in<C>(db: &C, user_id: i64) -> Result<Balances>
where
    C: ConnectionTrait,
{
    let existing = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { user_id })?;

    let history = UserHistory::load(db, user_id, None).await?;
    let balances = replay(&history).balances;
    debug!(
        "Replayed {} entries and {} absences for user {}",
        history.entries.len(),
        history.absences.len(),
        user_id
    );

    let mut active: user::ActiveModel = existing.into();
    active.flex_balance = Set(balances.flex_balance);
    active.flex_balance_travel = Set(balances.flex_balance_travel);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;

    Ok(balances)
}

/// Recomputes and persists both flex balances of `user_id` from scratch.
///
/// Takes the user's lock and replays the full history inside a fresh transaction. Use
/// [`recalculate_in`] instead from code that already holds the lock and has written its
/// own changes in an open transaction.
///
/// Idempotent. Either both balances are written or, on error, nothing is.
///
/// # Arguments
/// * `user_id` - User whose balances are rebuilt; unknown ids fail with
///   [`Error::UserNotFound`]
#[instrument(skip(db))]
pub async fn recalculate_balances(db: &DatabaseConnection, user_id: i64) -> Result<Balances> {
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;
    let balances = recalculate_in(&txn, user_id).await?;
    txn.commit().await?;

    info!(
        "Recalculated balances for user {}: {} min (with travel {} min)",
        user_id, balances.flex_balance, balances.flex_balance_travel
    );
    Ok(balances)
}

/// Recalculates every user, returning each user's id with the new balances.
pub async fn recalculate_all(db: &DatabaseConnection) -> Result<Vec<(i64, Balances)>> {
    let users = User::find().order_by_asc(user::Column::Id).all(db).await?;
    let mut results = Vec::with_capacity(users.len());
    for u in users {
        let balances = recalculate_balances(db, u.id).await?;
        results.push((u.id, balances));
    }
    Ok(results)
}
