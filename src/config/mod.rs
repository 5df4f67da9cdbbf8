/// Database connection and schema creation
pub mod database;

/// User seeding from a TOML file
pub mod users;
