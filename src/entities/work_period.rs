//! Work period entity - A user-defined date range overriding the nominal work duration.
//!
//! Ranges may overlap. When they do, the most recently created period wins, which lets
//! a user correct an override by adding a new period instead of editing the old one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Work period database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_periods")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Human-readable label (e.g. "Summer 2025")
    pub name: String,
    /// First day of the period, inclusive
    pub start_date: Date,
    /// Last day of the period, inclusive
    pub end_date: Date,
    /// Nominal minutes of work per day inside the period
    pub work_time_minutes: i32,
    /// Creation time, used to break ties between overlapping periods
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each work period belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
