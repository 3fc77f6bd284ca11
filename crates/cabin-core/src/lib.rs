//! cabin-core
//!
//! Usage-record lifecycle, billing computation, and aggregation for cabin energy tracking.
//! Depends on cabin-domain. No CLI, no terminal I/O, no direct storage interactions.

pub mod calendar;
pub mod error;
pub mod ledger;
pub mod stats;
pub mod storage;
pub mod time;
pub mod usage_service;

pub use calendar::StayCalendar;
pub use error::{ConflictError, CoreError, NotFoundError, ValidationError};
pub use ledger::{ScopedLedger, UsageLedger};
pub use stats::{StatsAggregator, UsageSummary};
pub use storage::UsageStore;
pub use time::Clock;
pub use usage_service::{HomeOverview, OpenStayPolicy, PropertyOverview, StayAction, UsageService};

#[cfg(test)]
mod tests;
