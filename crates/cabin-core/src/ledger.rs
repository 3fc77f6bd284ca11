//! Classification, completion, and per-home lookups over usage records.

use cabin_domain::{LedgerScope, NewUsage, Usage, UsageId, UsageState};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
    error::{ConflictError, CoreError, ValidationError},
    stats::{StatsAggregator, UsageSummary},
};

const KWH_TOLERANCE: f64 = 1e-9;

/// Enforces the open/completed state machine and computes derived usage fields.
///
/// Every operation is a pure function of its inputs; nothing is cached between calls.
pub struct UsageLedger;

impl UsageLedger {
    /// Classifies a record from its readings, ignoring the persisted flag.
    pub fn classify(record: &Usage) -> UsageState {
        record.state()
    }

    pub fn is_open(record: &Usage) -> bool {
        Self::classify(record) == UsageState::Open
    }

    pub fn is_completed(record: &Usage) -> bool {
        Self::classify(record) == UsageState::Completed
    }

    /// Returns a completed copy of `record`; the input is never modified.
    ///
    /// A record that is already completed yields [`ConflictError::AlreadyCompleted`].
    pub fn complete(
        record: &Usage,
        final_reading: f64,
        completion_date: NaiveDate,
    ) -> Result<Usage, CoreError> {
        if Self::is_completed(record) {
            debug!(usage = %record.id, "completion rejected, record already completed");
            return Err(ConflictError::AlreadyCompleted(record.id).into());
        }
        if !final_reading.is_finite() || final_reading <= 0.0 {
            return Err(ValidationError::NonPositiveReading(final_reading).into());
        }
        if final_reading <= record.initial_reading {
            return Err(ValidationError::NotGreaterThanInitial {
                initial_reading: record.initial_reading,
                final_reading,
            }
            .into());
        }

        let mut completed = record.clone();
        completed.final_reading = Some(final_reading);
        completed.date = completion_date;
        completed.refresh_derived();
        info!(
            usage = %completed.id,
            home = %completed.home_number,
            kwh = completed.kwh_used.unwrap_or_default(),
            "usage completed"
        );
        Ok(completed)
    }

    /// Billed amount for a record; open records cost nothing yet.
    pub fn cost(record: &Usage) -> f64 {
        match record.derived_kwh() {
            Some(kwh) => kwh * record.cost_per_kwh,
            None => 0.0,
        }
    }

    /// Most recently created open record for `home_number`.
    pub fn latest_open_for<'a>(home_number: &str, records: &'a [Usage]) -> Option<&'a Usage> {
        records
            .iter()
            .filter(|usage| usage.home_number == home_number && Self::is_open(usage))
            .max_by_key(|usage| usage.id)
    }

    /// Completed record of `home_number` with the latest reading date.
    pub fn most_recent_completed<'a>(
        home_number: &str,
        records: &'a [Usage],
    ) -> Option<&'a Usage> {
        records
            .iter()
            .filter(|usage| usage.home_number == home_number && Self::is_completed(usage))
            .max_by_key(|usage| (usage.date, usage.id))
    }

    /// Meter value the next stay should start from; `0` when no stay was completed.
    pub fn last_meter_reading(home_number: &str, records: &[Usage]) -> f64 {
        Self::most_recent_completed(home_number, records)
            .and_then(|usage| usage.final_reading)
            .unwrap_or(0.0)
    }

    /// Revalidates the cached `is_completed`/`kwh_used` fields against the readings.
    pub fn normalize(record: &Usage) -> Usage {
        let mut normalized = record.clone();
        normalized.refresh_derived();
        if normalized.is_completed != record.is_completed
            || !same_kwh(normalized.kwh_used, record.kwh_used)
        {
            warn!(
                usage = %record.id,
                stored_flag = record.is_completed,
                "derived usage fields drifted from readings, recomputed"
            );
        }
        normalized
    }

    pub fn normalize_all(records: &[Usage]) -> Vec<Usage> {
        records.iter().map(Self::normalize).collect()
    }

    /// Detects stored records whose cached fields or invariants do not hold.
    pub fn drift_warnings(records: &[Usage]) -> Vec<String> {
        let mut warnings = Vec::new();
        for usage in records {
            let completed = usage.final_reading.is_some();
            if usage.is_completed != completed {
                warnings.push(format!(
                    "usage {} stores is_completed={} but final reading is {}",
                    usage.id,
                    usage.is_completed,
                    if completed { "present" } else { "missing" }
                ));
            }
            if !same_kwh(usage.derived_kwh(), usage.kwh_used) {
                warnings.push(format!(
                    "usage {} stores kwh_used {:?} but readings imply {:?}",
                    usage.id,
                    usage.kwh_used,
                    usage.derived_kwh()
                ));
            }
            if let Some(final_reading) = usage.final_reading {
                if final_reading <= usage.initial_reading {
                    warnings.push(format!(
                        "usage {} final reading {} is not greater than initial reading {}",
                        usage.id, final_reading, usage.initial_reading
                    ));
                }
            }
            if usage.initial_reading < 0.0 {
                warnings.push(format!(
                    "usage {} has negative initial reading {}",
                    usage.id, usage.initial_reading
                ));
            }
            if usage.cost_per_kwh <= 0.0 {
                warnings.push(format!(
                    "usage {} has non-positive cost per kWh {}",
                    usage.id, usage.cost_per_kwh
                ));
            }
            if usage.end_date < usage.start_date {
                warnings.push(format!(
                    "usage {} ends {} before it starts {}",
                    usage.id, usage.end_date, usage.start_date
                ));
            }
        }
        warnings
    }

    /// Boundary validation for a create payload.
    pub fn validate_new(draft: &NewUsage) -> Result<(), ValidationError> {
        if draft.home_number.trim().is_empty() {
            return Err(ValidationError::MissingField("homeNumber"));
        }
        if draft.user_name.trim().is_empty() {
            return Err(ValidationError::MissingField("userName"));
        }
        if !draft.initial_reading.is_finite() || draft.initial_reading < 0.0 {
            return Err(ValidationError::NegativeInitialReading(
                draft.initial_reading,
            ));
        }
        if !draft.cost_per_kwh.is_finite() || draft.cost_per_kwh <= 0.0 {
            return Err(ValidationError::NonPositiveRate(draft.cost_per_kwh));
        }
        if draft.end_date < draft.start_date {
            return Err(ValidationError::InvertedDateRange {
                start: draft.start_date,
                end: draft.end_date,
            });
        }
        if let Some(final_reading) = draft.final_reading {
            if !final_reading.is_finite() || final_reading <= 0.0 {
                return Err(ValidationError::NonPositiveReading(final_reading));
            }
            if final_reading <= draft.initial_reading {
                return Err(ValidationError::NotGreaterThanInitial {
                    initial_reading: draft.initial_reading,
                    final_reading,
                });
            }
        }
        Ok(())
    }
}

fn same_kwh(left: Option<f64>, right: Option<f64>) -> bool {
    match (left, right) {
        (Some(a), Some(b)) => (a - b).abs() <= KWH_TOLERANCE,
        (None, None) => true,
        _ => false,
    }
}

/// Normalized snapshot of the records belonging to one scope.
#[derive(Debug, Clone)]
pub struct ScopedLedger {
    scope: LedgerScope,
    records: Vec<Usage>,
}

impl ScopedLedger {
    /// Keeps only the records inside `scope`, revalidating their derived fields.
    pub fn new(scope: LedgerScope, records: &[Usage]) -> Self {
        let records = records
            .iter()
            .filter(|usage| scope.includes(&usage.home_number))
            .map(UsageLedger::normalize)
            .collect();
        Self { scope, records }
    }

    pub fn scope(&self) -> &LedgerScope {
        &self.scope
    }

    pub fn records(&self) -> &[Usage] {
        &self.records
    }

    pub fn find(&self, id: UsageId) -> Option<&Usage> {
        self.records.iter().find(|usage| usage.id == id)
    }

    pub fn open_records(&self) -> impl Iterator<Item = &Usage> {
        self.records.iter().filter(|usage| UsageLedger::is_open(usage))
    }

    pub fn completed_records(&self) -> impl Iterator<Item = &Usage> {
        self.records
            .iter()
            .filter(|usage| UsageLedger::is_completed(usage))
    }

    pub fn latest_open_for(&self, home_number: &str) -> Option<&Usage> {
        UsageLedger::latest_open_for(home_number, &self.records)
    }

    pub fn most_recent_completed(&self, home_number: &str) -> Option<&Usage> {
        UsageLedger::most_recent_completed(home_number, &self.records)
    }

    pub fn summary(&self) -> UsageSummary {
        StatsAggregator::summarize(&self.records)
    }

    /// True when the disappearance of `home_number` makes this view stale.
    pub fn depends_on(&self, home_number: &str) -> bool {
        self.scope.includes(home_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabin_domain::NewUsage;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn open(id: u64, home: &str, initial: f64) -> Usage {
        Usage::from_draft(
            UsageId(id),
            NewUsage::open(home, "Guest", initial, 0.75, day(1), day(3)),
        )
    }

    #[test]
    fn complete_derives_consumption_and_date() {
        let record = open(1, "1", 1000.0);
        let completed = UsageLedger::complete(&record, 1050.0, day(4)).expect("complete");
        assert_eq!(UsageLedger::classify(&completed), UsageState::Completed);
        assert_eq!(completed.kwh_used, Some(50.0));
        assert_eq!(completed.date, day(4));
        assert!(completed.is_completed);
        assert_eq!(UsageLedger::classify(&record), UsageState::Open);
    }

    #[test]
    fn complete_rejects_non_positive_reading() {
        let record = open(1, "1", 0.0);
        let err = UsageLedger::complete(&record, 0.0, day(4)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NonPositiveReading(_))
        ));
        let err = UsageLedger::complete(&record, f64::NAN, day(4)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn cost_is_zero_for_open_records() {
        let record = open(1, "1", 100.0);
        assert_eq!(UsageLedger::cost(&record), 0.0);
        let completed = UsageLedger::complete(&record, 150.0, day(4)).unwrap();
        assert!((UsageLedger::cost(&completed) - 37.5).abs() < 1e-9);
    }

    #[test]
    fn cost_ignores_stale_stored_kwh() {
        let mut record = UsageLedger::complete(&open(1, "1", 100.0), 150.0, day(4)).unwrap();
        record.kwh_used = Some(999.0);
        assert!((UsageLedger::cost(&record) - 37.5).abs() < 1e-9);
    }

    #[test]
    fn normalize_recomputes_stale_flag() {
        let mut record = open(1, "1", 100.0);
        record.final_reading = Some(120.0);
        assert!(!record.is_completed);
        assert_eq!(UsageLedger::drift_warnings(&[record.clone()]).len(), 2);
        let normalized = UsageLedger::normalize(&record);
        assert!(normalized.is_completed);
        assert_eq!(normalized.kwh_used, Some(20.0));
        assert!(UsageLedger::drift_warnings(&[normalized]).is_empty());
    }

    #[test]
    fn validate_new_checks_every_boundary_rule() {
        let base = NewUsage::open("1", "Guest", 10.0, 0.75, day(1), day(3));
        assert!(UsageLedger::validate_new(&base).is_ok());

        let mut blank = base.clone();
        blank.user_name = "  ".into();
        assert_eq!(
            UsageLedger::validate_new(&blank),
            Err(ValidationError::MissingField("userName"))
        );

        let mut negative = base.clone();
        negative.initial_reading = -1.0;
        assert!(matches!(
            UsageLedger::validate_new(&negative),
            Err(ValidationError::NegativeInitialReading(_))
        ));

        let mut free = base.clone();
        free.cost_per_kwh = 0.0;
        assert!(matches!(
            UsageLedger::validate_new(&free),
            Err(ValidationError::NonPositiveRate(_))
        ));

        let mut inverted = base.clone();
        inverted.end_date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        assert!(matches!(
            UsageLedger::validate_new(&inverted),
            Err(ValidationError::InvertedDateRange { .. })
        ));

        let equal_final = base.clone().with_final_reading(10.0);
        assert!(matches!(
            UsageLedger::validate_new(&equal_final),
            Err(ValidationError::NotGreaterThanInitial { .. })
        ));
    }

    #[test]
    fn scoped_ledger_filters_and_tracks_dependencies() {
        let records = vec![open(1, "1", 10.0), open(2, "2", 20.0), open(3, "1", 30.0)];
        let view = ScopedLedger::new(LedgerScope::home("1"), &records);
        assert_eq!(view.records().len(), 2);
        assert_eq!(view.latest_open_for("1").map(|u| u.id), Some(UsageId(3)));
        assert!(view.find(UsageId(2)).is_none());
        assert!(view.depends_on("1"));
        assert!(!view.depends_on("2"));

        let property = ScopedLedger::new(LedgerScope::Property, &records);
        assert_eq!(property.open_records().count(), 3);
        assert!(property.depends_on("2"));
    }
}
