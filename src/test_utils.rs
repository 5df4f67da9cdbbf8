//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        time_entry::{self, TimeEntryInput},
        user::{self, NewUser},
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Routes tracing output to the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A fixed Monday used by most tests.
///
/// # Panics
/// Never; the date is valid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

/// Creates a test user with default settings (480 normal, 435 summer minutes).
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    user::create_user(
        db,
        NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            preferred_language: "en".to_string(),
        },
    )
    .await
}

/// Creates an entry with only a work window.
pub async fn create_test_entry(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    work_start: i32,
    work_end: i32,
) -> Result<entities::time_entry::Model> {
    time_entry::create_time_entry(db, user_id, TimeEntryInput::worked(date, work_start, work_end))
        .await
}
