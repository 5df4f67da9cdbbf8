//! Time entry entity - One row per user and calendar date.
//!
//! All time-of-day fields are minutes since midnight. `None` means the field was never
//! recorded, which is distinct from `Some(0)` (00:00). Punch clock actions create entries
//! with only some of these fields set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Time entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "time_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Calendar date of the entry, unique per user
    pub date: Date,
    /// Left home / started travelling
    pub travel_start_time: Option<i32>,
    /// Started work
    pub work_start_time: Option<i32>,
    /// Finished work
    pub work_end_time: Option<i32>,
    /// Arrived home / stopped travelling
    pub travel_end_time: Option<i32>,
    /// Free-text notes
    pub comments: Option<String>,
    /// When the entry was created
    pub created_at: DateTimeUtc,
    /// When the entry was last modified
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One entry has many breaks
    #[sea_orm(has_many = "super::break_interval::Entity")]
    Breaks,
    /// One entry has many extra time intervals
    #[sea_orm(has_many = "super::extra_time::Entity")]
    ExtraTimes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::break_interval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Breaks.def()
    }
}

impl Related<super::extra_time::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExtraTimes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
