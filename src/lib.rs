#![doc(test(attr(deny(warnings))))]

//! Cabin Energy ties the usage ledger, statistics, and JSON store together
//! behind a small command shell for tracking guest stays and their electricity
//! bills.

pub mod cli;
pub mod errors;
pub mod utils;

pub use cabin_config::{Config, ConfigManager};
pub use cabin_core::{
    Clock, CoreError, OpenStayPolicy, StatsAggregator, StayCalendar, UsageLedger, UsageService,
    UsageSummary,
};
pub use cabin_domain::{Home, LedgerScope, NewUsage, Usage, UsageId, UsageState};
pub use cabin_storage_json::JsonUsageStore;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Cabin Energy tracing initialized.");
    });
}
