//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod absence;
pub mod break_interval;
pub mod extra_time;
pub mod settings;
pub mod time_entry;
pub mod user;
pub mod work_period;

// Re-export specific types to avoid conflicts
pub use absence::{Column as AbsenceColumn, Entity as Absence, Model as AbsenceModel};
pub use break_interval::{
    Column as BreakIntervalColumn, Entity as BreakInterval, Model as BreakIntervalModel,
};
pub use extra_time::{Column as ExtraTimeColumn, Entity as ExtraTime, Model as ExtraTimeModel};
pub use settings::{Column as SettingsColumn, Entity as Settings, Model as SettingsModel};
pub use time_entry::{Column as TimeEntryColumn, Entity as TimeEntry, Model as TimeEntryModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use work_period::{
    Column as WorkPeriodColumn, Entity as WorkPeriod, Model as WorkPeriodModel,
};
