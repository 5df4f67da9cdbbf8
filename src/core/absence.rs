//! Absence business logic.
//!
//! Absences adjust what a user owes on a date. Full-day vacation and care of a sick child
//! zero the nominal duration, partial absences subtract their length, and flex leave is
//! a withdrawal from the balance applied once by the recalculation engine. Every mutation
//! here rebuilds the user's balances in the same transaction.

use crate::{
    core::{balance, locks, time_entry::validate_time},
    entities::{Absence, absence},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Leave category of an absence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbsenceKind {
    /// Paid vacation; full-day form zeroes the nominal duration
    Vacation,
    /// Care of a sick child; full-day form zeroes the nominal duration
    CareOfSickChild,
    /// Day off taken against the accrued flex balance
    FlexLeave,
    /// Any other category, handled by the generic partial-absence rule
    Other(String),
}

impl AbsenceKind {
    /// Text stored in the `type` column.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vacation => "vacation",
            Self::CareOfSickChild => "care_of_sick_child",
            Self::FlexLeave => "flex_leave",
            Self::Other(name) => name,
        }
    }

    /// Whether a full-day absence of this kind means nothing is owed that day.
    #[must_use]
    pub const fn zeroes_full_day(&self) -> bool {
        matches!(self, Self::Vacation | Self::CareOfSickChild)
    }
}

impl From<&str> for AbsenceKind {
    fn from(value: &str) -> Self {
        match value.trim() {
            "vacation" => Self::Vacation,
            "care_of_sick_child" => Self::CareOfSickChild,
            "flex_leave" => Self::FlexLeave,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for AbsenceKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for AbsenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an absence row.
#[must_use]
pub fn kind_of(model: &absence::Model) -> AbsenceKind {
    AbsenceKind::from(model.absence_type.as_str())
}

/// Day-level facts the flex calculator needs besides the adjusted minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsenceFlags {
    /// A full-day flex leave exists on the date
    pub has_full_day_flex_leave: bool,
    /// A full-day vacation or sick-child absence zeroed the nominal duration
    pub zeroed_by_full_day_leave: bool,
}

/// Adjusts `nominal_minutes` for the absences recorded on one date.
///
/// Partial absences accumulate, overlapping ones included, and the result never drops
/// below zero. A zeroing full-day absence overrides any partial minutes.
#[must_use]
pub fn adjust_for_absences(nominal_minutes: i64, absences: &[absence::Model]) -> (i64, AbsenceFlags) {
    let mut flags = AbsenceFlags::default();
    let mut absence_minutes = 0_i64;

    for a in absences.iter().filter(|a| a.full_day) {
        match kind_of(a) {
            AbsenceKind::FlexLeave => flags.has_full_day_flex_leave = true,
            kind if kind.zeroes_full_day() => flags.zeroed_by_full_day_leave = true,
            _ => {}
        }
    }

    for a in absences.iter().filter(|a| !a.full_day) {
        if kind_of(a) == AbsenceKind::FlexLeave {
            continue;
        }
        if let (Some(start), Some(end)) = (a.start_time, a.end_time) {
            absence_minutes += i64::from(end - start).max(0);
        }
    }

    let adjusted = if flags.zeroed_by_full_day_leave {
        0
    } else {
        (nominal_minutes - absence_minutes).max(0)
    };
    (adjusted, flags)
}

/// Fields of an absence supplied by the caller.
#[derive(Debug, Clone)]
pub struct AbsenceInput {
    pub date: NaiveDate,
    pub kind: AbsenceKind,
    pub full_day: bool,
    pub start_time: Option<i32>,
    pub end_time: Option<i32>,
    pub comments: Option<String>,
}

impl AbsenceInput {
    /// Flex leave is always full-day without bounds; a full-day absence carries no bounds
    /// either. Partial bounds must be valid times with the end after the start.
    fn normalized(mut self) -> Result<Self> {
        if self.kind == AbsenceKind::FlexLeave {
            self.full_day = true;
        }
        if self.full_day {
            self.start_time = None;
            self.end_time = None;
            return Ok(self);
        }
        if let Some(start) = self.start_time {
            validate_time(start)?;
        }
        if let Some(end) = self.end_time {
            validate_time(end)?;
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && end <= start
        {
            return Err(Error::InvalidInterval { start, end });
        }
        Ok(self)
    }
}

/// Lists all absences of a user, newest date first.
pub async fn list_absences(db: &DatabaseConnection, user_id: i64) -> Result<Vec<absence::Model>> {
    Absence::find()
        .filter(absence::Column::UserId.eq(user_id))
        .order_by_desc(absence::Column::Date)
        .order_by_asc(absence::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an absence owned by `user_id`.
async fn find_owned<C>(db: &C, user_id: i64, absence_id: i64) -> Result<absence::Model>
where
    C: ConnectionTrait,
{
    Absence::find_by_id(absence_id)
        .one(db)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or(Error::AbsenceNotFound { id: absence_id })
}

/// Records an absence and rebuilds the user's balances.
///
/// The input is normalized first: a flex leave is always full-day with no times, and a
/// partial absence with both bounds must end after it starts. Adding a vacation or sick
/// child day changes what was owed on that date, so entries already recorded there are
/// re-evaluated by the rebuild.
///
/// # Arguments
/// * `user_id` - Owner of the absence
/// * `input` - Date, kind, full-day flag, optional times and comments
#[instrument(skip(db, input), fields(date = %input.date, kind = %input.kind))]
pub async fn create_absence(
    db: &DatabaseConnection,
    user_id: i64,
    input: AbsenceInput,
) -> Result<absence::Model> {
    let input = input.normalized()?;
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let model = absence::ActiveModel {
        user_id: Set(user_id),
        date: Set(input.date),
        absence_type: Set(input.kind.as_str().to_string()),
        full_day: Set(input.full_day),
        start_time: Set(input.start_time),
        end_time: Set(input.end_time),
        comments: Set(input.comments),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let result = model.insert(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    debug!("Created absence {}", result.id);
    Ok(result)
}

/// Records a full-day flex leave, a day off paid from the flex balance.
pub async fn create_flex_leave(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    comments: Option<String>,
) -> Result<absence::Model> {
    create_absence(
        db,
        user_id,
        AbsenceInput {
            date,
            kind: AbsenceKind::FlexLeave,
            full_day: true,
            start_time: None,
            end_time: None,
            comments,
        },
    )
    .await
}

/// Replaces every field of an existing absence and rebuilds the user's balances.
#[instrument(skip(db, input))]
pub async fn update_absence(
    db: &DatabaseConnection,
    user_id: i64,
    absence_id: i64,
    input: AbsenceInput,
) -> Result<absence::Model> {
    let input = input.normalized()?;
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let existing = find_owned(&txn, user_id, absence_id).await?;
    let mut active: absence::ActiveModel = existing.into();
    active.date = Set(input.date);
    active.absence_type = Set(input.kind.as_str().to_string());
    active.full_day = Set(input.full_day);
    active.start_time = Set(input.start_time);
    active.end_time = Set(input.end_time);
    active.comments = Set(input.comments);
    let result = active.update(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(result)
}

/// Deletes an absence and rebuilds the user's balances.
#[instrument(skip(db))]
pub async fn delete_absence(db: &DatabaseConnection, user_id: i64, absence_id: i64) -> Result<()> {
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let existing = find_owned(&txn, user_id, absence_id).await?;
    existing.delete(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(())
}
