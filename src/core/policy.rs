//! Work-time policy resolution.
//!
//! Decides how many minutes of work a user owes on a given date before absences are
//! taken into account. A matching work period overrides the user's settings; among
//! overlapping periods the most recently created one wins, regardless of how its date
//! range compares to the others. Without settings the nominal duration is 480 minutes.

use crate::{
    entities::{Settings, WorkPeriod, settings, work_period},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::prelude::*;
use tracing::instrument;

/// Nominal work duration used when a user has no usable settings.
pub const DEFAULT_NOMINAL_MINUTES: i64 = 480;

/// A user's settings and work period overrides, loaded once and queried per date.
#[derive(Debug, Clone, Default)]
pub struct WorkTimePolicy {
    normal_work_time: Option<i32>,
    periods: Vec<work_period::Model>,
}

impl WorkTimePolicy {
    /// Builds a policy from already loaded rows.
    #[must_use]
    pub fn new(settings: Option<&settings::Model>, periods: Vec<work_period::Model>) -> Self {
        Self {
            normal_work_time: settings.map(|s| s.normal_work_time),
            periods,
        }
    }

    /// Loads the settings and every work period of `user_id`.
    pub async fn load<C>(db: &C, user_id: i64) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let settings = Settings::find()
            .filter(settings::Column::UserId.eq(user_id))
            .one(db)
            .await?;
        let periods = WorkPeriod::find()
            .filter(work_period::Column::UserId.eq(user_id))
            .all(db)
            .await?;
        Ok(Self::new(settings.as_ref(), periods))
    }

    /// Nominal minutes owed on `date`.
    ///
    /// Ties on `created_at` fall back to the higher id, which is the later insert.
    #[must_use]
    pub fn nominal_minutes(&self, date: NaiveDate) -> i64 {
        let latest = self
            .periods
            .iter()
            .filter(|p| p.start_date <= date && date <= p.end_date)
            .max_by_key(|p| (p.created_at, p.id));

        if let Some(period) = latest {
            return i64::from(period.work_time_minutes);
        }

        match self.normal_work_time {
            Some(minutes) if minutes > 0 => i64::from(minutes),
            _ => DEFAULT_NOMINAL_MINUTES,
        }
    }
}

/// Returns the nominal work minutes for `user_id` on `date`.
///
/// Read-only; list and export views use this to annotate entries without touching balances.
#[instrument(skip(db))]
pub async fn resolve_nominal_minutes<C>(db: &C, user_id: i64, date: NaiveDate) -> Result<i64>
where
    C: ConnectionTrait,
{
    let policy = WorkTimePolicy::load(db, user_id).await?;
    Ok(policy.nominal_minutes(date))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::work_period::{WorkPeriodInput, create_work_period};
    use crate::test_utils::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(id: i64, start: NaiveDate, end: NaiveDate, minutes: i32, created_secs: i64) -> work_period::Model {
        work_period::Model {
            id,
            user_id: 1,
            name: format!("period {id}"),
            start_date: start,
            end_date: end,
            work_time_minutes: minutes,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
        }
    }

    fn settings_with(normal: i32) -> settings::Model {
        settings::Model {
            id: 1,
            user_id: 1,
            normal_work_time: normal,
            summer_work_time: 435,
        }
    }

    #[test]
    fn test_default_without_settings() {
        let policy = WorkTimePolicy::new(None, Vec::new());
        assert_eq!(policy.nominal_minutes(date(2025, 3, 3)), 480);
    }

    #[test]
    fn test_settings_normal_work_time() {
        let policy = WorkTimePolicy::new(Some(&settings_with(450)), Vec::new());
        assert_eq!(policy.nominal_minutes(date(2025, 3, 3)), 450);
    }

    #[test]
    fn test_zero_normal_work_time_falls_back_to_default() {
        let policy = WorkTimePolicy::new(Some(&settings_with(0)), Vec::new());
        assert_eq!(policy.nominal_minutes(date(2025, 3, 3)), 480);
    }

    #[test]
    fn test_period_bounds_are_inclusive() {
        let periods = vec![period(1, date(2025, 6, 1), date(2025, 8, 31), 435, 10)];
        let policy = WorkTimePolicy::new(Some(&settings_with(480)), periods);

        assert_eq!(policy.nominal_minutes(date(2025, 5, 31)), 480);
        assert_eq!(policy.nominal_minutes(date(2025, 6, 1)), 435);
        assert_eq!(policy.nominal_minutes(date(2025, 8, 31)), 435);
        assert_eq!(policy.nominal_minutes(date(2025, 9, 1)), 480);
    }

    #[test]
    fn test_latest_created_period_wins_over_date_range() {
        // The newer period has the earlier, wider range and must still win.
        let periods = vec![
            period(1, date(2025, 7, 1), date(2025, 7, 31), 400, 100),
            period(2, date(2025, 6, 1), date(2025, 8, 31), 435, 200),
        ];
        let policy = WorkTimePolicy::new(None, periods);
        assert_eq!(policy.nominal_minutes(date(2025, 7, 15)), 435);
    }

    #[test]
    fn test_equal_creation_time_prefers_higher_id() {
        let periods = vec![
            period(7, date(2025, 7, 1), date(2025, 7, 31), 420, 100),
            period(3, date(2025, 7, 1), date(2025, 7, 31), 390, 100),
        ];
        let policy = WorkTimePolicy::new(None, periods);
        assert_eq!(policy.nominal_minutes(date(2025, 7, 10)), 420);
    }

    #[tokio::test]
    async fn test_resolve_nominal_minutes_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "policy@example.com").await?;
        let day = date(2025, 7, 15);

        assert_eq!(resolve_nominal_minutes(&db, user.id, day).await?, 480);

        create_work_period(
            &db,
            user.id,
            WorkPeriodInput {
                name: "late summer".to_string(),
                start_date: date(2025, 7, 10),
                end_date: date(2025, 7, 20),
                work_time_minutes: 400,
            },
        )
        .await?;
        create_work_period(
            &db,
            user.id,
            WorkPeriodInput {
                name: "summer".to_string(),
                start_date: date(2025, 6, 1),
                end_date: date(2025, 8, 31),
                work_time_minutes: 435,
            },
        )
        .await?;

        assert_eq!(resolve_nominal_minutes(&db, user.id, day).await?, 435);
        assert_eq!(resolve_nominal_minutes(&db, user.id, date(2025, 9, 1)).await?, 480);
        Ok(())
    }
}
