//! Monthly usage counters and the tenant quota gate

pub mod counter;
pub mod period;
pub mod repository;

pub use counter::{QuotaCounter, QuotaError};
pub use period::PeriodKey;
pub use repository::{UsageCounter, UsageOwner, UsageStore};
