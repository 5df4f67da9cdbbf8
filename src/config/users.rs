//! User seed configuration loaded from a TOML file.
//!
//! The seed file lists the users that should exist when the maintenance binary starts,
//! together with their nominal work minutes. Seeding is keyed by email, so running it
//! repeatedly never creates duplicates.

use crate::core::user::{self, NewUser};
use crate::entities::{User, user as user_entity};
use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

/// Configuration structure representing the entire seed file
#[derive(Debug, Deserialize)]
pub struct SeedConfig {
    /// Users to create if missing
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Configuration for a single user
#[derive(Debug, Deserialize, Clone)]
pub struct UserConfig {
    /// Display name
    pub name: String,
    /// Unique login email
    pub email: String,
    /// UI language code
    #[serde(default = "default_language")]
    pub preferred_language: String,
    /// Nominal work minutes per day, defaults to 480; must be positive
    pub normal_work_time: Option<i32>,
    /// Nominal work minutes per day in summer, defaults to 435; must be positive
    pub summer_work_time: Option<i32>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Loads the seed configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse seed file: {e}"),
    })
}

/// Creates every configured user that does not exist yet, returning how many were created.
#[instrument(skip(db, config))]
pub async fn seed_users(db: &DatabaseConnection, config: &SeedConfig) -> Result<usize> {
    let mut created = 0;
    for cfg in &config.users {
        let existing = User::find()
            .filter(user_entity::Column::Email.eq(cfg.email.trim()))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }

        // User and settings are written together, so a failed seed leaves nothing behind
        // and the next run retries it.
        user::create_user_with_settings(
            db,
            NewUser {
                name: cfg.name.clone(),
                email: cfg.email.clone(),
                preferred_language: cfg.preferred_language.clone(),
            },
            cfg.normal_work_time.unwrap_or(user::DEFAULT_NORMAL_WORK_TIME),
            cfg.summer_work_time.unwrap_or(user::DEFAULT_SUMMER_WORK_TIME),
        )
        .await?;

        info!("Seeded user '{}'", cfg.email);
        created += 1;
    }
    Ok(created)
}
