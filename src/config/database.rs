//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The one constraint the entities cannot
//! express, a single time entry per user and date, is added as a unique index.

use crate::entities::{
    Absence, BreakInterval, ExtraTime, Settings, TimeEntry, User, WorkPeriod, time_entry,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/flextime.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to a
/// local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table(db: &DatabaseConnection, mut statement: TableCreateStatement) -> Result<()> {
    let builder = db.get_database_backend();
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Parent tables are created before the tables that reference them.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, schema.create_table_from_entity(User)).await?;
    create_table(db, schema.create_table_from_entity(Settings)).await?;
    create_table(db, schema.create_table_from_entity(WorkPeriod)).await?;
    create_table(db, schema.create_table_from_entity(TimeEntry)).await?;
    create_table(db, schema.create_table_from_entity(BreakInterval)).await?;
    create_table(db, schema.create_table_from_entity(ExtraTime)).await?;
    create_table(db, schema.create_table_from_entity(Absence)).await?;

    let unique_entry_per_day = Index::create()
        .if_not_exists()
        .name("idx_time_entries_user_date")
        .table(TimeEntry)
        .col(time_entry::Column::UserId)
        .col(time_entry::Column::Date)
        .unique()
        .to_owned();
    db.execute(builder.build(&unique_entry_per_day)).await?;

    info!("Database tables ensured.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        absence::Model as AbsenceModel, time_entry::Model as TimeEntryModel,
        user::Model as UserModel, work_period::Model as WorkPeriodModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<TimeEntryModel> = TimeEntry::find().limit(1).all(&db).await?;
        let _: Vec<AbsenceModel> = Absence::find().limit(1).all(&db).await?;
        let _: Vec<WorkPeriodModel> = WorkPeriod::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
