/// Absence kinds, the absence adjuster and absence CRUD
pub mod absence;
/// Balance recalculation engine
pub mod balance;
/// Daily flex calculator
pub mod flex;
/// Per-user serialization of mutations
pub mod locks;
/// Nominal work duration resolution
pub mod policy;
/// Day, week and month summaries
pub mod summary;
/// Time entries, breaks, extra time and the punch clock
pub mod time_entry;
/// Users and settings
pub mod user;
/// Work period overrides
pub mod work_period;

pub use balance::{Balances, recalculate_all, recalculate_balances};
pub use policy::resolve_nominal_minutes;
