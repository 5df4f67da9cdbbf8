//! Work period business logic.
//!
//! Work periods override the nominal work duration for a date range. Creating, editing or
//! deleting one changes what was owed on past dates, so each change rebuilds the balances.

use crate::{
    core::{balance, locks},
    entities::{WorkPeriod, work_period},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::instrument;

/// Fields of a work period supplied by the caller.
#[derive(Debug, Clone)]
pub struct WorkPeriodInput {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub work_time_minutes: i32,
}

impl WorkPeriodInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config {
                message: "Work period name cannot be empty".to_string(),
            });
        }
        if self.end_date < self.start_date {
            return Err(Error::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        crate::core::time_entry::validate_time(self.work_time_minutes)
    }
}

async fn find_owned<C>(db: &C, user_id: i64, period_id: i64) -> Result<work_period::Model>
where
    C: ConnectionTrait,
{
    WorkPeriod::find_by_id(period_id)
        .one(db)
        .await?
        .filter(|p| p.user_id == user_id)
        .ok_or(Error::WorkPeriodNotFound { id: period_id })
}

/// Lists the work periods of a user ordered by start date.
pub async fn list_work_periods(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<work_period::Model>> {
    WorkPeriod::find()
        .filter(work_period::Column::UserId.eq(user_id))
        .order_by_asc(work_period::Column::StartDate)
        .order_by_asc(work_period::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a work period and rebuilds the balances.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_work_period(
    db: &DatabaseConnection,
    user_id: i64,
    input: WorkPeriodInput,
) -> Result<work_period::Model> {
    input.validate()?;
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let period = work_period::ActiveModel {
        user_id: Set(user_id),
        name: Set(input.name.trim().to_string()),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        work_time_minutes: Set(input.work_time_minutes),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(period)
}

/// Edits a work period in place and rebuilds the balances.
///
/// The creation time is kept, so an edit does not change which overlapping period wins.
#[instrument(skip(db, input))]
pub async fn update_work_period(
    db: &DatabaseConnection,
    user_id: i64,
    period_id: i64,
    input: WorkPeriodInput,
) -> Result<work_period::Model> {
    input.validate()?;
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    let mut active: work_period::ActiveModel = find_owned(&txn, user_id, period_id).await?.into();
    active.name = Set(input.name.trim().to_string());
    active.start_date = Set(input.start_date);
    active.end_date = Set(input.end_date);
    active.work_time_minutes = Set(input.work_time_minutes);
    let period = active.update(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(period)
}

/// Deletes a work period and rebuilds the balances.
#[instrument(skip(db))]
pub async fn delete_work_period(db: &DatabaseConnection, user_id: i64, period_id: i64) -> Result<()> {
    let _guard = locks::lock_user(user_id).await;
    let txn = db.begin().await?;

    find_owned(&txn, user_id, period_id).await?.delete(&txn).await?;

    balance::recalculate_in(&txn, user_id).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::get_balances;
    use crate::test_utils::*;

    fn summer(minutes: i32) -> WorkPeriodInput {
        WorkPeriodInput {
            name: "Summer".to_string(),
            start_date: test_date(),
            end_date: test_date().succ_opt().unwrap(),
            work_time_minutes: minutes,
        }
    }

    #[tokio::test]
    async fn test_work_period_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "period-validation@example.com").await?;

        let reversed = WorkPeriodInput {
            start_date: test_date().succ_opt().unwrap(),
            end_date: test_date(),
            ..summer(435)
        };
        let result = create_work_period(&db, user.id, reversed).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidDateRange { .. }));

        let unnamed = WorkPeriodInput {
            name: "  ".to_string(),
            ..summer(435)
        };
        let result = create_work_period(&db, user.id, unnamed).await;
        assert!(matches!(result.unwrap_err(), Error::Config { .. }));

        assert!(list_work_periods(&db, user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_work_period_changes_rebalance_past_entries() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "period-rebalance@example.com").await?;
        create_test_entry(&db, user.id, test_date(), 480, 960).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 0);

        let period = create_work_period(&db, user.id, summer(435)).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 45);

        update_work_period(&db, user.id, period.id, summer(450)).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 30);

        delete_work_period(&db, user.id, period.id).await?;
        assert_eq!(get_balances(&db, user.id).await?.flex_balance, 0);
        assert!(list_work_periods(&db, user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_other_users_period_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "period-owner@example.com").await?;
        let other = create_test_user(&db, "period-other@example.com").await?;
        let period = create_work_period(&db, owner.id, summer(435)).await?;

        let result = update_work_period(&db, other.id, period.id, summer(400)).await;
        assert!(matches!(result.unwrap_err(), Error::WorkPeriodNotFound { .. }));
        Ok(())
    }
}
