//! User and settings business logic.
//!
//! Users own every other record. Deleting a user removes all of their data in one
//! transaction, children before parents.

use crate::{
    core::{
        balance::{self, Balances},
        locks,
        time_entry::MINUTES_PER_DAY,
    },
    entities::{
        Absence, BreakInterval, ExtraTime, Settings, TimeEntry, User, WorkPeriod, absence,
        break_interval, extra_time, settings, time_entry, user, work_period,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Normal work minutes given to new users.
pub const DEFAULT_NORMAL_WORK_TIME: i32 = 480;
/// Summer work minutes given to new users.
pub const DEFAULT_SUMMER_WORK_TIME: i32 = 435;

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub preferred_language: String,
}

/// Profile fields a user can change.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub preferred_language: String,
}

/// Trims `email` and checks it has the shape `local@domain`.
pub fn normalize_email(email: &str) -> Result<String> {
    let trimmed = email.trim();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        })
        && !trimmed.contains(char::is_whitespace);
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(Error::InvalidEmail {
            email: email.to_string(),
        })
    }
}

/// Rejects daily work minutes outside `1..=1440`.
///
/// Stored zeros from older data still resolve to the default duration, but new settings
/// must say what they mean.
pub fn validate_work_time(minutes: i32) -> Result<()> {
    if (1..=MINUTES_PER_DAY).contains(&minutes) {
        Ok(())
    } else {
        Err(Error::InvalidWorkTime { minutes })
    }
}

/// Creates a user with zero balances and default settings.
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    create_user_with_settings(db, new_user, DEFAULT_NORMAL_WORK_TIME, DEFAULT_SUMMER_WORK_TIME)
        .await
}

/// Creates a user together with their settings in one transaction.
///
/// A new user has no history, so both balances start at zero and no rebuild is needed.
///
/// # Arguments
/// * `new_user` - Name, email and language; the email is trimmed and validated
/// * `normal_work_time` - Nominal minutes per day, `1..=1440`
/// * `summer_work_time` - Summer nominal minutes per day, `1..=1440`
#[instrument(skip(db, new_user), fields(email = %new_user.email))]
pub async fn create_user_with_settings(
    db: &DatabaseConnection,
    new_user: NewUser,
    normal_work_time: i32,
    summer_work_time: i32,
) -> Result<user::Model> {
    let email = normalize_email(&new_user.email)?;
    validate_work_time(normal_work_time)?;
    validate_work_time(summer_work_time)?;

    let txn = db.begin().await?;
    let now = Utc::now();
    let created = user::ActiveModel {
        name: Set(new_user.name.trim().to_string()),
        email: Set(email),
        preferred_language: Set(new_user.preferred_language),
        flex_balance: Set(0),
        flex_balance_travel: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    settings::ActiveModel {
        user_id: Set(created.id),
        normal_work_time: Set(normal_work_time),
        summer_work_time: Set(summer_work_time),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Created user {}", created.id);
    Ok(created)
}

/// Updates the profile fields of a user. Balances are not affected.
#[instrument(skip(db, update), fields(email = %update.email))]
pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i64,
    update: UserUpdate,
) -> Result<user::Model> {
    let email = normalize_email(&update.email)?;
    let existing = get_user(db, user_id).await?;

    let mut active: user::ActiveModel = existing.into();
    active.name = Set(update.name.trim().to_string());
    active.email = Set(email);
    active.preferred_language = Set(update.preferred_language);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Deletes a user and everything they own.
///
/// Breaks and extra time go first through the user's entries, then entries, absences,
/// work periods, settings and finally the user row. Nothing is deleted if any step fails.
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let existing = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(Error::UserNotFound { user_id })?;

    let entry_ids: Vec<i64> = TimeEntry::find()
        .filter(time_entry::Column::UserId.eq(user_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    BreakInterval::delete_many()
        .filter(break_interval::Column::TimeEntryId.is_in(entry_ids.clone()))
        .exec(&txn)
        .await?;
    ExtraTime::delete_many()
        .filter(extra_time::Column::TimeEntryId.is_in(entry_ids))
        .exec(&txn)
        .await?;
    TimeEntry::delete_many()
        .filter(time_entry::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    Absence::delete_many()
        .filter(absence::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    WorkPeriod::delete_many()
        .filter(work_period::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    Settings::delete_many()
        .filter(settings::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted user {} and all their data", user_id);
    Ok(())
}

/// Finds a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { user_id })
}

/// Lists all users ordered by id.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Reads the persisted flex balances of a user.
pub async fn get_balances(db: &DatabaseConnection, user_id: i64) -> Result<Balances> {
    let u = get_user(db, user_id).await?;
    Ok(Balances {
        flex_balance: u.flex_balance,
        flex_balance_travel: u.flex_balance_travel,
    })
}

/// Returns the settings of a user, if any.
pub async fn get_settings(db: &DatabaseConnection, user_id: i64) -> Result<Option<settings::Model>> {
    Settings::find()
        .filter(settings::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates or updates the settings of a user and rebuilds the balances.
#[instrument(skip(db))]
pub async fn update_settings(
    db: &DatabaseConnection,
    user_id: i64,
    normal_work_time: i32,
    summer_work_time: i32,
) -> Result<settings::Model> {
    validate_work_time(normal_work_time)?;
    validate_work_time(summer_work_time)?;

    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(Error::UserNotFound { user_id })?;

    let existing = Settings::find()
        .filter(settings::Column::UserId.eq(user_id))
        .one(&txn)
        .await?;
    let saved = match existing {
        Some(s) => {
            let mut active: settings::ActiveModel = s.into();
            active.normal_work_time = Set(normal_work_time);
            active.summer_work_time = Set(summer_work_time);
            active.update(&txn).await?
        }
        None => {
            settings::ActiveModel {
                user_id: Set(user_id),
                normal_work_time: Set(normal_work_time),
                summer_work_time: Set(summer_work_time),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(saved)
}
