//! Absence entity - Leave recorded against a single date.
//!
//! `absence_type` is stored as text (`"vacation"`, `"care_of_sick_child"`, `"flex_leave"`,
//! or any other category). Business logic works with `core::absence::AbsenceKind` instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Absence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "absences")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Date of the absence
    pub date: Date,
    /// Leave category
    #[sea_orm(column_name = "type")]
    pub absence_type: String,
    /// Whether the absence covers the whole day
    pub full_day: bool,
    /// Start of a partial absence, minutes since midnight
    pub start_time: Option<i32>,
    /// End of a partial absence, minutes since midnight
    pub end_time: Option<i32>,
    /// Free-text notes
    pub comments: Option<String>,
    /// When the absence was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each absence belongs to one user
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
