use flextime_tracker::{
    config::{database, users},
    core::{balance, user},
    errors::Result,
};
use dotenvy::dotenv;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 4. Seed users if a seed file is present
    let seed_path = std::env::var("SEED_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&seed_path).exists() {
        let config = users::load_config(&seed_path)?;
        let created = users::seed_users(&db, &config).await?;
        info!("Seeded {} new users from {}", created, seed_path);
    } else {
        warn!("No seed file at {}, skipping user seeding", seed_path);
    }

    // 5. Rebuild every cached balance
    for (user_id, balances) in balance::recalculate_all(&db).await? {
        let u = user::get_user(&db, user_id).await?;
        info!(
            "{} <{}>: flex {} min, flex with travel {} min",
            u.name, u.email, balances.flex_balance, balances.flex_balance_travel
        );
    }

    Ok(())
}
