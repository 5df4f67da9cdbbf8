//! User entity - Represents an employee tracking their own hours.
//!
//! Besides identity, each user row carries the two denormalized flex balances.
//! Both are caches rebuilt by `core::balance::recalculate_balances` and are never
//! patched incrementally.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// UI language code (e.g. "en", "sv")
    pub preferred_language: String,
    /// Cached flex balance in minutes, work only
    pub flex_balance: i64,
    /// Cached flex balance in minutes, work plus travel
    pub flex_balance_travel: i64,
    /// When the user was created
    pub created_at: DateTimeUtc,
    /// When the user row was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has one settings row
    #[sea_orm(has_one = "super::settings::Entity")]
    Settings,
    /// One user has many time entries
    #[sea_orm(has_many = "super::time_entry::Entity")]
    TimeEntries,
    /// One user has many absences
    #[sea_orm(has_many = "super::absence::Entity")]
    Absences,
    /// One user has many work period overrides
    #[sea_orm(has_many = "super::work_period::Entity")]
    WorkPeriods,
}

impl Related<super::settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settings.def()
    }
}

impl Related<super::time_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeEntries.def()
    }
}

impl Related<super::absence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Absences.def()
    }
}

impl Related<super::work_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkPeriods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
