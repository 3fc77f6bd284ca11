//! Aggregation helpers for per-home and property-wide usage statistics.

use std::{cmp::Reverse, collections::BTreeMap};

use cabin_domain::Usage;
use tracing::warn;

use crate::{calendar::StayCalendar, ledger::UsageLedger};

/// Totals folded from a collection of usage records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageSummary {
    /// Consumption over completed records only.
    pub total_kwh: f64,
    /// Billed amount over completed records, each at its own rate.
    pub total_cost: f64,
    /// Inclusive stay-days over every record, open or completed.
    pub total_days: u64,
    /// Number of records, open or completed.
    pub count: usize,
}

impl UsageSummary {
    fn absorb(&mut self, usage: &Usage) {
        self.count += 1;
        if UsageLedger::is_completed(usage) {
            self.total_kwh += usage.derived_kwh().unwrap_or_default();
            self.total_cost += UsageLedger::cost(usage);
        }
        match StayCalendar::days(usage.start_date, usage.end_date) {
            Ok(days) => self.total_days += u64::from(days),
            Err(err) => warn!(usage = %usage.id, %err, "stay skipped in day count"),
        }
    }
}

/// Folds usage records into summary statistics.
pub struct StatsAggregator;

impl StatsAggregator {
    /// Summarizes `records`; empty input yields an all-zero summary.
    pub fn summarize(records: &[Usage]) -> UsageSummary {
        records
            .iter()
            .fold(UsageSummary::default(), |mut summary, usage| {
                summary.absorb(usage);
                summary
            })
    }

    /// Summaries keyed by home number, in home-number order.
    pub fn summarize_by_home(records: &[Usage]) -> BTreeMap<String, UsageSummary> {
        let mut by_home: BTreeMap<String, UsageSummary> = BTreeMap::new();
        for usage in records {
            by_home
                .entry(usage.home_number.clone())
                .or_default()
                .absorb(usage);
        }
        by_home
    }

    /// The `n` most recent records by reading date, newest first.
    ///
    /// Records sharing a date are ordered by ascending id so the result is stable.
    pub fn latest_n(records: &[Usage], n: usize) -> Vec<&Usage> {
        if n == 0 {
            return Vec::new();
        }
        let mut ordered: Vec<&Usage> = records.iter().collect();
        ordered.sort_by_key(|usage| (Reverse(usage.date), usage.id));
        ordered.truncate(n);
        ordered
    }

    /// Number of open records, i.e. cabins occupied with unfinished billing.
    pub fn active_count(records: &[Usage]) -> usize {
        records
            .iter()
            .filter(|usage| UsageLedger::is_open(usage))
            .count()
    }
}
