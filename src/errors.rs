use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("User {user_id} not found")]
    UserNotFound { user_id: i64 },

    #[error("Time entry {id} not found")]
    TimeEntryNotFound { id: i64 },

    #[error("Extra time {id} not found")]
    ExtraTimeNotFound { id: i64 },

    #[error("Absence {id} not found")]
    AbsenceNotFound { id: i64 },

    #[error("Work period {id} not found")]
    WorkPeriodNotFound { id: i64 },

    #[error("User {user_id} already has a time entry for {date}")]
    DuplicateTimeEntry { user_id: i64, date: NaiveDate },

    #[error("Invalid time of day: {minutes} minutes since midnight")]
    InvalidTime { minutes: i32 },

    #[error("Invalid work time: {minutes} minutes per day")]
    InvalidWorkTime { minutes: i32 },

    #[error("Invalid email address: '{email}'")]
    InvalidEmail { email: String },

    #[error("Invalid interval: end {end} is not after start {start}")]
    InvalidInterval { start: i32, end: i32 },

    #[error("Invalid date range: {end} is before {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
