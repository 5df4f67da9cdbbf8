//! Time entry business logic - entries, breaks, extra time and the punch clock.
//!
//! A user has at most one entry per date. Breaks are stored in recording order and
//! replaced wholesale when an entry is updated. Every function that writes also rebuilds
//! the user's balances before committing, under the user's lock.

use crate::{
    core::{balance, locks},
    entities::{BreakInterval, ExtraTime, TimeEntry, break_interval, extra_time, time_entry},
    errors::{Error, Result},
};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::fmt;
use tracing::{debug, info, instrument};

/// Last valid minute value; 1440 stands for 24:00.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Rejects minute values outside 00:00..=24:00.
pub fn validate_time(minutes: i32) -> Result<()> {
    if (0..=MINUTES_PER_DAY).contains(&minutes) {
        Ok(())
    } else {
        Err(Error::InvalidTime { minutes })
    }
}

fn validate_optional(minutes: Option<i32>) -> Result<()> {
    minutes.map_or(Ok(()), validate_time)
}

/// One break as supplied by the caller. Either bound may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreakInput {
    pub start_time: Option<i32>,
    pub end_time: Option<i32>,
}

impl From<(Option<i32>, Option<i32>)> for BreakInput {
    fn from((start_time, end_time): (Option<i32>, Option<i32>)) -> Self {
        Self {
            start_time,
            end_time,
        }
    }
}

/// Pairs parallel start and end sequences by index. When one sequence is longer, the
/// missing partners are left unset.
#[must_use]
pub fn breaks_from_parallel(starts: &[Option<i32>], ends: &[Option<i32>]) -> Vec<BreakInput> {
    (0..starts.len().max(ends.len()))
        .map(|i| BreakInput {
            start_time: starts.get(i).copied().flatten(),
            end_time: ends.get(i).copied().flatten(),
        })
        .collect()
}

/// Fields of a time entry supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct TimeEntryInput {
    pub date: NaiveDate,
    pub travel_start_time: Option<i32>,
    pub work_start_time: Option<i32>,
    pub work_end_time: Option<i32>,
    pub travel_end_time: Option<i32>,
    pub breaks: Vec<BreakInput>,
    pub comments: Option<String>,
}

impl TimeEntryInput {
    /// An entry with nothing recorded yet.
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    /// An entry with only a work window.
    #[must_use]
    pub fn worked(date: NaiveDate, start: i32, end: i32) -> Self {
        Self {
            work_start_time: Some(start),
            work_end_time: Some(end),
            ..Self::empty(date)
        }
    }

    fn validate(&self) -> Result<()> {
        validate_optional(self.travel_start_time)?;
        validate_optional(self.work_start_time)?;
        validate_optional(self.work_end_time)?;
        validate_optional(self.travel_end_time)?;
        for b in &self.breaks {
            validate_optional(b.start_time)?;
            validate_optional(b.end_time)?;
        }
        Ok(())
    }
}

/// An entry with its breaks and extra time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntryDetails {
    pub entry: time_entry::Model,
    pub breaks: Vec<break_interval::Model>,
    pub extra_times: Vec<extra_time::Model>,
}

async fn find_owned<C>(db: &C, user_id: i64, entry_id: i64) -> Result<time_entry::Model>
where
    C: ConnectionTrait,
{
    TimeEntry::find_by_id(entry_id)
        .one(db)
        .await?
        .filter(|e| e.user_id == user_id)
        .ok_or(Error::TimeEntryNotFound { id: entry_id })
}

async fn find_by_date<C>(db: &C, user_id: i64, date: NaiveDate) -> Result<Option<time_entry::Model>>
where
    C: ConnectionTrait,
{
    TimeEntry::find()
        .filter(time_entry::Column::UserId.eq(user_id))
        .filter(time_entry::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn replace_breaks<C>(db: &C, entry_id: i64, breaks: &[BreakInput]) -> Result<()>
where
    C: ConnectionTrait,
{
    BreakInterval::delete_many()
        .filter(break_interval::Column::TimeEntryId.eq(entry_id))
        .exec(db)
        .await?;

    for (position, b) in (0_i32..).zip(breaks) {
        break_interval::ActiveModel {
            time_entry_id: Set(entry_id),
            position: Set(position),
            start_time: Set(b.start_time),
            end_time: Set(b.end_time),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Fetches one entry of `user_id` with its breaks and extra time.
pub async fn get_time_entry(
    db: &DatabaseConnection,
    user_id: i64,
    entry_id: i64,
) -> Result<TimeEntryDetails> {
    let entry = find_owned(db, user_id, entry_id).await?;
    let breaks = BreakInterval::find()
        .filter(break_interval::Column::TimeEntryId.eq(entry_id))
        .order_by_asc(break_interval::Column::Position)
        .all(db)
        .await?;
    let extra_times = ExtraTime::find()
        .filter(extra_time::Column::TimeEntryId.eq(entry_id))
        .order_by_asc(extra_time::Column::Id)
        .all(db)
        .await?;
    Ok(TimeEntryDetails {
        entry,
        breaks,
        extra_times,
    })
}

/// Lists all entries of `user_id`, newest first.
pub async fn list_time_entries(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<time_entry::Model>> {
    TimeEntry::find()
        .filter(time_entry::Column::UserId.eq(user_id))
        .order_by_desc(time_entry::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates an entry with its breaks and rebuilds the user's balances.
///
/// All times are validated before the user's lock is taken. The insert, the breaks and the
/// rebuild share one transaction, so if the rebuild fails the entry is not kept either.
///
/// Fails with [`Error::DuplicateTimeEntry`] if the user already has an entry on that date.
///
/// # Arguments
/// * `user_id` - Owner of the entry
/// * `input` - Date, travel and work times, breaks in recording order and comments
#[instrument(skip(db, input), fields(date = %input.date))]
pub async fn create_time_entry(
    db: &DatabaseConnection,
    user_id: i64,
    input: TimeEntryInput,
) -> Result<time_entry::Model> {
    input.validate()?;
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    if find_by_date(&txn, user_id, input.date).await?.is_some() {
        return Err(Error::DuplicateTimeEntry {
            user_id,
            date: input.date,
        });
    }

    let now = Utc::now();
    let entry = time_entry::ActiveModel {
        user_id: Set(user_id),
        date: Set(input.date),
        travel_start_time: Set(input.travel_start_time),
        work_start_time: Set(input.work_start_time),
        work_end_time: Set(input.work_end_time),
        travel_end_time: Set(input.travel_end_time),
        comments: Set(input.comments),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_breaks(&txn, entry.id, &input.breaks).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    debug!("Created time entry {}", entry.id);
    Ok(entry)
}

/// Replaces every field and the breaks of an entry, then rebuilds the user's balances.
#[instrument(skip(db, input))]
pub async fn update_time_entry(
    db: &DatabaseConnection,
    user_id: i64,
    entry_id: i64,
    input: TimeEntryInput,
) -> Result<time_entry::Model> {
    input.validate()?;
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let existing = find_owned(&txn, user_id, entry_id).await?;
    if existing.date != input.date
        && find_by_date(&txn, user_id, input.date).await?.is_some()
    {
        return Err(Error::DuplicateTimeEntry {
            user_id,
            date: input.date,
        });
    }

    let mut active: time_entry::ActiveModel = existing.into();
    active.date = Set(input.date);
    active.travel_start_time = Set(input.travel_start_time);
    active.work_start_time = Set(input.work_start_time);
    active.work_end_time = Set(input.work_end_time);
    active.travel_end_time = Set(input.travel_end_time);
    active.comments = Set(input.comments);
    active.updated_at = Set(Utc::now());
    let entry = active.update(&txn).await?;
    replace_breaks(&txn, entry.id, &input.breaks).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(entry)
}

/// Deletes an entry together with its breaks and extra time, then rebuilds the balances.
#[instrument(skip(db))]
pub async fn delete_time_entry(db: &DatabaseConnection, user_id: i64, entry_id: i64) -> Result<()> {
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let existing = find_owned(&txn, user_id, entry_id).await?;
    BreakInterval::delete_many()
        .filter(break_interval::Column::TimeEntryId.eq(entry_id))
        .exec(&txn)
        .await?;
    ExtraTime::delete_many()
        .filter(extra_time::Column::TimeEntryId.eq(entry_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(())
}

/// Attaches an extra time interval to an entry and rebuilds the balances.
#[instrument(skip(db))]
pub async fn add_extra_time(
    db: &DatabaseConnection,
    user_id: i64,
    entry_id: i64,
    start_time: i32,
    end_time: i32,
) -> Result<extra_time::Model> {
    validate_time(start_time)?;
    validate_time(end_time)?;
    if end_time <= start_time {
        return Err(Error::InvalidInterval {
            start: start_time,
            end: end_time,
        });
    }

    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    find_owned(&txn, user_id, entry_id).await?;
    let extra = extra_time::ActiveModel {
        time_entry_id: Set(entry_id),
        start_time: Set(start_time),
        end_time: Set(end_time),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(extra)
}

/// Removes an extra time interval and rebuilds the balances.
#[instrument(skip(db))]
pub async fn delete_extra_time(db: &DatabaseConnection, user_id: i64, extra_id: i64) -> Result<()> {
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let extra = ExtraTime::find_by_id(extra_id)
        .one(&txn)
        .await?
        .ok_or(Error::ExtraTimeNotFound { id: extra_id })?;
    find_owned(&txn, user_id, extra.time_entry_id)
        .await
        .map_err(|_| Error::ExtraTimeNotFound { id: extra_id })?;
    extra.delete(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(())
}

/// A single punch clock action recorded against today's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punch {
    TravelStart,
    WorkStart,
    WorkEnd,
    TravelEnd,
}

impl fmt::Display for Punch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TravelStart => "travel start",
            Self::WorkStart => "work start",
            Self::WorkEnd => "work end",
            Self::TravelEnd => "travel end",
        };
        f.write_str(name)
    }
}

fn apply_punch(active: &mut time_entry::ActiveModel, punch: Punch, minutes: i32) {
    match punch {
        Punch::TravelStart => active.travel_start_time = Set(Some(minutes)),
        Punch::WorkStart => active.work_start_time = Set(Some(minutes)),
        Punch::WorkEnd => active.work_end_time = Set(Some(minutes)),
        Punch::TravelEnd => active.travel_end_time = Set(Some(minutes)),
    }
}

/// Records `punch` at `at`, creating the entry for `at`'s date if needed, and rebuilds the
/// balances.
///
/// Only the punched field is written; the others stay as they were, so an entry
/// contributes nothing until both work punches exist. Punching the same action twice
/// overwrites the earlier time.
///
/// # Arguments
/// * `user_id` - Who is punching
/// * `punch` - Which field to set
/// * `at` - Local date and time of the punch, truncated to the minute
#[instrument(skip(db))]
pub async fn register_punch(
    db: &DatabaseConnection,
    user_id: i64,
    punch: Punch,
    at: NaiveDateTime,
) -> Result<time_entry::Model> {
    let date = at.date();
    // num_seconds_from_midnight / 60 is always below 1440.
    let minutes = i32::try_from(at.num_seconds_from_midnight() / 60).unwrap_or(MINUTES_PER_DAY);

    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let now = Utc::now();
    let entry = match find_by_date(&txn, user_id, date).await? {
        Some(existing) => {
            let mut active: time_entry::ActiveModel = existing.into();
            apply_punch(&mut active, punch, minutes);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            let mut active = time_entry::ActiveModel {
                user_id: Set(user_id),
                date: Set(date),
                travel_start_time: Set(None),
                work_start_time: Set(None),
                work_end_time: Set(None),
                travel_end_time: Set(None),
                comments: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            apply_punch(&mut active, punch, minutes);
            active.insert(&txn).await?
        }
    };

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    info!("Registered {} at {:02}:{:02} on {}", punch, minutes / 60, minutes % 60, date);
    Ok(entry)
}

/// Records `punch` at the current local time.
pub async fn register_punch_now(
    db: &DatabaseConnection,
    user_id: i64,
    punch: Punch,
) -> Result<time_entry::Model> {
    register_punch(db, user_id, punch, Local::now().naive_local()).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::get_balances;
    use crate::test_utils::*;

    fn at(minutes: u32) -> NaiveDateTime {
        test_date().and_hms_opt(minutes / 60, minutes % 60, 0).unwrap()
    }

    #[test]
    fn test_breaks_from_parallel_pads_missing_partner() {
        let breaks = breaks_from_parallel(&[Some(600), Some(720)], &[Some(630)]);
        assert_eq!(
            breaks,
            vec![
                BreakInput::from((Some(600), Some(630))),
                BreakInput::from((Some(720), None)),
            ]
        );
    }

    #[test]
    fn test_validate_time_bounds() {
        assert!(validate_time(0).is_ok());
        assert!(validate_time(MINUTES_PER_DAY).is_ok());
        assert!(matches!(validate_time(-1), Err(Error::InvalidTime { minutes: -1 })));
        assert!(matches!(validate_time(1441), Err(Error::InvalidTime { minutes: 1441 })));
    }

    #[tokio::test]
    async fn test_create_and_get_entry_with_breaks() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "entry@example.com").await?;

        let entry = create_time_entry(
            &db,
            user.id,
            TimeEntryInput {
                breaks: breaks_from_parallel(&[Some(600), Some(720)], &[Some(615), Some(735)]),
                comments: Some("regular day".to_string()),
                ..TimeEntryInput::worked(test_date(), 480, 975)
            },
        )
        .await?;

        let details = get_time_entry(&db, user.id, entry.id).await?;
        assert_eq!(details.breaks.len(), 2);
        assert_eq!(details.breaks[0].start_time, Some(600));
        assert_eq!(details.breaks[1].position, 1);
        assert!(details.extra_times.is_empty());
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, -15);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_date_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "duplicate@example.com").await?;
        create_test_entry(&db, user.id, test_date(), 480, 975).await?;

        let result = create_test_entry(&db, user.id, test_date(), 500, 900).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateTimeEntry { .. }));
        assert_eq!(list_time_entries(&db, user.id).await?.len(), 1);
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 15);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_time_rolls_nothing_in() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "invalid@example.com").await?;

        let result = create_test_entry(&db, user.id, test_date(), 480, 1500).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidTime { minutes: 1500 }));
        assert!(list_time_entries(&db, user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_rebuild_rolls_back_written_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "orphan@example.com").await?;
        // Leave the entry insert valid but make the rebuild's user lookup fail.
        db.execute_unprepared("PRAGMA foreign_keys = OFF").await?;
        crate::entities::User::delete_by_id(user.id).exec(&db).await?;

        let result = create_time_entry(
            &db,
            user.id,
            TimeEntryInput {
                breaks: vec![(Some(600), Some(630)).into()],
                ..TimeEntryInput::worked(test_date(), 480, 975)
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { .. }));
        assert!(TimeEntry::find().all(&db).await?.is_empty());
        assert!(BreakInterval::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_entry_replaces_breaks_and_rebalances() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "update@example.com").await?;
        let entry = create_time_entry(
            &db,
            user.id,
            TimeEntryInput {
                breaks: vec![(Some(600), Some(630)).into()],
                ..TimeEntryInput::worked(test_date(), 480, 975)
            },
        )
        .await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, -15);

        update_time_entry(&db, user.id, entry.id, TimeEntryInput::worked(test_date(), 480, 1000)).await?;

        let details = get_time_entry(&db, user.id, entry.id).await?;
        assert!(details.breaks.is_empty());
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 40);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_onto_taken_date_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "move@example.com").await?;
        let next_day = test_date().succ_opt().unwrap();
        create_test_entry(&db, user.id, test_date(), 480, 975).await?;
        let second = create_test_entry(&db, user.id, next_day, 480, 975).await?;

        let result =
            update_time_entry(&db, user.id, second.id, TimeEntryInput::worked(test_date(), 480, 900)).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateTimeEntry { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_extra_time_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "extra@example.com").await?;
        let entry = create_test_entry(&db, user.id, test_date(), 480, 975).await?;

        let extra = add_extra_time(&db, user.id, entry.id, 975, 1005).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 45);

        let result = add_extra_time(&db, user.id, entry.id, 1005, 975).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInterval { .. }));

        delete_extra_time(&db, user.id, extra.id).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 15);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_entry_removes_children_and_rebalances() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "delete@example.com").await?;
        let entry = create_time_entry(
            &db,
            user.id,
            TimeEntryInput {
                breaks: vec![(Some(600), Some(630)).into()],
                ..TimeEntryInput::worked(test_date(), 480, 975)
            },
        )
        .await?;
        add_extra_time(&db, user.id, entry.id, 975, 1005).await?;

        delete_time_entry(&db, user.id, entry.id).await?;

        assert!(list_time_entries(&db, user.id).await?.is_empty());
        assert_eq!(BreakInterval::find().all(&db).await?.len(), 0);
        assert_eq!(ExtraTime::find().all(&db).await?.len(), 0);
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_users_entry_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "entry-owner@example.com").await?;
        let other = create_test_user(&db, "entry-other@example.com").await?;
        let entry = create_test_entry(&db, owner.id, test_date(), 480, 975).await?;

        let result = get_time_entry(&db, other.id, entry.id).await;
        assert!(matches!(result.unwrap_err(), Error::TimeEntryNotFound { .. }));
        let result = add_extra_time(&db, other.id, entry.id, 975, 1005).await;
        assert!(matches!(result.unwrap_err(), Error::TimeEntryNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_punch_clock_day() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "punch@example.com").await?;

        let entry = register_punch(&db, user.id, Punch::TravelStart, at(420)).await?;
        assert_eq!(entry.travel_start_time, Some(420));
        assert_eq!(entry.work_start_time, None);
        assert_eq!(get_balances(&db, user.id).await?, balance::Balances::default());

        register_punch(&db, user.id, Punch::WorkStart, at(480)).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 0);

        register_punch(&db, user.id, Punch::WorkEnd, at(975)).await?;
        let balances = get_balances(&db, user.id).await?;
        assert_eq!(balances.flex_balance, 15);
        assert_eq!(balances.flex_balance_travel, 15);

        let entry = register_punch(&db, user.id, Punch::TravelEnd, at(1020)).await?;
        assert_eq!(entry.id, list_time_entries(&db, user.id).await?[0].id);
        let balances = get_balances(&db, user.id).await?;
        assert_eq!(balances.flex_balance, 15);
        assert_eq!(balances.flex_balance_travel, 15 + 60 + 45);
        assert_eq!(list_time_entries(&db, user.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_punch_at_midnight_is_recorded_as_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "midnight@example.com").await?;

        let entry = register_punch(&db, user.id, Punch::WorkStart, at(0)).await?;
        assert_eq!(entry.work_start_time, Some(0));
        register_punch(&db, user.id, Punch::WorkEnd, at(495)).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 15);
        Ok(())
    }
}
