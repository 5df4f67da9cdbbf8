//! Break entity - An ordered break taken during a time entry's work window.
//!
//! `position` preserves the order in which breaks were recorded. Either bound may be
//! missing on historical rows; such breaks count as zero minutes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Break database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "time_entry_breaks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent time entry
    pub time_entry_id: i64,
    /// Zero-based order within the entry
    pub position: i32,
    /// Break start, minutes since midnight
    pub start_time: Option<i32>,
    /// Break end, minutes since midnight
    pub end_time: Option<i32>,
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
