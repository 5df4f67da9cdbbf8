//! Extra time entity - Worked time outside the punch clock window, such as approved overtime.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extra time database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extra_times")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent time entry
    pub time_entry_id: i64,
    /// Start, minutes since midnight
    pub start_time: i32,
    /// End, minutes since midnight
    pub end_time: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::time_entry::Entity",
        from = "Column::TimeEntryId",
        to = "super::time_entry::Column::Id"
    )]
    TimeEntry,
}

impl Related<super::time_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
