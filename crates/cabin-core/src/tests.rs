use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};

use crate::{
    error::{ConflictError, CoreError, NotFoundError, ValidationError},
    ledger::UsageLedger,
    stats::{StatsAggregator, UsageSummary},
    storage::{orphan_warnings, UsageStore},
    time::FixedClock,
    usage_service::{OpenStayPolicy, StayAction, UsageService},
};
use cabin_domain::{Home, LedgerScope, NewUsage, Usage, UsageId, UsageState};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap() + Duration::days(offset)
}

fn open_usage(id: u64, home: &str, initial: f64, start: i64, end: i64) -> Usage {
    Usage::from_draft(
        UsageId(id),
        NewUsage::open(home, "Guest", initial, 0.75, day(start), day(end)),
    )
}

fn completed_usage(id: u64, home: &str, initial: f64, final_reading: f64, rate: f64) -> Usage {
    let mut draft = NewUsage::open(home, "Guest", initial, rate, day(0), day(0));
    draft.final_reading = Some(final_reading);
    Usage::from_draft(UsageId(id), draft)
}

#[derive(Default)]
struct MemoryState {
    homes: Vec<Home>,
    usages: Vec<Usage>,
    next_id: u64,
}

/// In-memory collaborator used to exercise the service layer.
#[derive(Default)]
struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl UsageStore for MemoryStore {
    fn list_homes(&self) -> Result<Vec<Home>, CoreError> {
        let mut homes = self.state.lock().unwrap().homes.clone();
        homes.sort();
        Ok(homes)
    }

    fn get_home(&self, number: &str) -> Result<Home, CoreError> {
        let state = self.state.lock().unwrap();
        state
            .homes
            .iter()
            .find(|home| home.number == number)
            .cloned()
            .ok_or_else(|| NotFoundError::Home(number.to_string()).into())
    }

    fn create_home(&self, home: Home) -> Result<Home, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.homes.iter().any(|h| h.number == home.number) {
            return Err(ConflictError::DuplicateHome(home.number).into());
        }
        state.homes.push(home.clone());
        Ok(home)
    }

    fn delete_home(&self, number: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        let before = state.homes.len();
        state.homes.retain(|home| home.number != number);
        if state.homes.len() == before {
            return Err(NotFoundError::Home(number.to_string()).into());
        }
        state.usages.retain(|usage| usage.home_number != number);
        Ok(())
    }

    fn list_usages(&self, scope: &LedgerScope) -> Result<Vec<Usage>, CoreError> {
        let state = self.state.lock().unwrap();
        let mut usages: Vec<Usage> = state
            .usages
            .iter()
            .filter(|usage| scope.includes(&usage.home_number))
            .cloned()
            .collect();
        usages.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(usages)
    }

    fn get_usage(&self, id: UsageId) -> Result<Usage, CoreError> {
        let state = self.state.lock().unwrap();
        state
            .usages
            .iter()
            .find(|usage| usage.id == id)
            .cloned()
            .ok_or_else(|| NotFoundError::Usage(id).into())
    }

    fn insert_usage(&self, draft: NewUsage) -> Result<Usage, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let usage = Usage::from_draft(UsageId(state.next_id), draft);
        state.usages.push(usage.clone());
        Ok(usage)
    }

    fn save_completion(&self, completed: &Usage) -> Result<Usage, CoreError> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .usages
            .iter_mut()
            .find(|usage| usage.id == completed.id)
            .ok_or(NotFoundError::Usage(completed.id))?;
        if stored.final_reading.is_some() {
            return Err(ConflictError::AlreadyCompleted(completed.id).into());
        }
        *stored = completed.clone();
        Ok(stored.clone())
    }

    fn delete_usage(&self, id: UsageId) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        let before = state.usages.len();
        state.usages.retain(|usage| usage.id != id);
        if state.usages.len() == before {
            return Err(NotFoundError::Usage(id).into());
        }
        Ok(())
    }
}

fn service() -> UsageService {
    let service = UsageService::new(Box::<MemoryStore>::default(), Arc::new(FixedClock(day(20))));
    service.add_home("1").expect("add home 1");
    service.add_home("2").expect("add home 2");
    service
}

#[test]
fn classification_follows_final_reading() {
    let open = open_usage(1, "1", 100.0, 0, 2);
    let completed = completed_usage(2, "1", 100.0, 150.0, 0.75);

    assert_eq!(UsageLedger::classify(&open), UsageState::Open);
    assert_eq!(UsageLedger::classify(&completed), UsageState::Completed);
    assert_eq!(
        completed.kwh_used,
        Some(completed.final_reading.unwrap() - completed.initial_reading)
    );
    assert!(open.kwh_used.is_none());
}

#[test]
fn completing_twice_is_a_conflict() {
    let open = open_usage(1, "1", 100.0, 0, 2);
    let completed = UsageLedger::complete(&open, 120.0, day(3)).expect("first completion");
    let err = UsageLedger::complete(&completed, 130.0, day(4)).expect_err("second completion");
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::AlreadyCompleted(UsageId(1)))
    ));
}

#[test]
fn completion_requires_reading_above_initial() {
    let open = open_usage(1, "1", 100.0, 0, 2);

    let equal = UsageLedger::complete(&open, 100.0, day(3)).unwrap_err();
    assert!(matches!(
        equal,
        CoreError::Validation(ValidationError::NotGreaterThanInitial { .. })
    ));
    let lower = UsageLedger::complete(&open, 99.0, day(3)).unwrap_err();
    assert!(lower.is_validation());

    let done = UsageLedger::complete(&open, 100.1, day(3)).expect("just above initial");
    assert!((done.kwh_used.unwrap() - 0.1).abs() < 1e-9);
}

#[test]
fn empty_summary_is_all_zero() {
    assert_eq!(StatsAggregator::summarize(&[]), UsageSummary::default());
    let summary = StatsAggregator::summarize(&[]);
    assert_eq!(summary.total_kwh, 0.0);
    assert_eq!(summary.total_cost, 0.0);
    assert_eq!(summary.total_days, 0);
    assert_eq!(summary.count, 0);
}

#[test]
fn summary_mixes_open_and_completed_records() {
    let records = vec![
        open_usage(1, "1", 150.0, 0, 2),
        completed_usage(2, "1", 100.0, 150.0, 0.75),
    ];
    let summary = StatsAggregator::summarize(&records);
    assert!((summary.total_kwh - 50.0).abs() < 1e-9);
    assert!((summary.total_cost - 37.5).abs() < 1e-9);
    assert_eq!(summary.total_days, 4);
    assert_eq!(summary.count, 2);
}

#[test]
fn summary_uses_each_record_rate() {
    let records = vec![
        completed_usage(1, "1", 0.0, 10.0, 1.0),
        completed_usage(2, "2", 10.0, 30.0, 0.5),
    ];
    let summary = StatsAggregator::summarize(&records);
    assert!((summary.total_cost - 20.0).abs() < 1e-9);

    let by_home = StatsAggregator::summarize_by_home(&records);
    assert_eq!(by_home.len(), 2);
    assert!((by_home["2"].total_kwh - 20.0).abs() < 1e-9);
}

#[test]
fn latest_n_orders_by_date_then_id() {
    let mut records: Vec<Usage> = (1..=10)
        .map(|id| {
            let mut usage = open_usage(id, "1", 0.0, 0, 1);
            usage.date = day((id as i64) / 2);
            usage
        })
        .collect();
    records.reverse();

    let first = StatsAggregator::latest_n(&records, 5);
    let second = StatsAggregator::latest_n(&records, 5);
    let ids: Vec<u64> = first.iter().map(|usage| usage.id.0).collect();
    assert_eq!(ids, vec![10, 8, 9, 6, 7]);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|pair| pair[0].date >= pair[1].date));

    assert!(StatsAggregator::latest_n(&records, 0).is_empty());
    assert_eq!(StatsAggregator::latest_n(&records, 50).len(), 10);
}

#[test]
fn active_count_counts_open_records() {
    let records = vec![
        open_usage(1, "1", 0.0, 0, 1),
        open_usage(2, "2", 0.0, 0, 1),
        completed_usage(3, "1", 0.0, 5.0, 1.0),
    ];
    assert_eq!(StatsAggregator::active_count(&records), 2);
}

#[test]
fn latest_open_prefers_newest_record() {
    let records = vec![
        open_usage(4, "1", 0.0, 5, 6),
        open_usage(9, "1", 0.0, 1, 2),
        open_usage(12, "2", 0.0, 1, 2),
        completed_usage(15, "1", 0.0, 5.0, 1.0),
    ];
    let latest = UsageLedger::latest_open_for("1", &records).expect("open record");
    assert_eq!(latest.id, UsageId(9));
    assert!(UsageLedger::latest_open_for("3", &records).is_none());
}

#[test]
fn most_recent_completed_uses_reading_date() {
    let mut early = completed_usage(7, "1", 0.0, 50.0, 1.0);
    early.date = day(1);
    let mut late = completed_usage(3, "1", 50.0, 80.0, 1.0);
    late.date = day(9);
    let records = vec![early, late, open_usage(8, "1", 80.0, 10, 12)];

    let found = UsageLedger::most_recent_completed("1", &records).expect("completed record");
    assert_eq!(found.id, UsageId(3));
    assert_eq!(UsageLedger::last_meter_reading("1", &records), 80.0);
    assert_eq!(UsageLedger::last_meter_reading("2", &records), 0.0);
}

#[test]
fn created_with_final_reading_reads_back_completed() {
    let service = service();
    let draft = NewUsage::open("1", "Jan Kowalski", 1000.0, 0.75, day(0), day(4))
        .with_final_reading(1050.0);
    let created = service.record_usage(draft).expect("record usage");

    let read_back = service.usage(created.id).expect("read back");
    assert_eq!(UsageLedger::classify(&read_back), UsageState::Completed);
    assert_eq!(read_back.kwh_used, Some(50.0));
    assert!(read_back.is_completed);
}

#[test]
fn service_completion_defaults_to_today_and_detects_races() {
    let service = service();
    let open = service
        .record_usage(NewUsage::open("1", "Anna", 1050.0, 0.75, day(9), day(14)))
        .expect("open stay");

    let done = service
        .complete_usage(open.id, 1090.0, None)
        .expect("complete");
    assert_eq!(done.date, day(20));
    assert_eq!(done.kwh_used, Some(40.0));

    let err = service
        .complete_usage(open.id, 1100.0, Some(day(21)))
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        service.usage(open.id).unwrap().final_reading,
        Some(1090.0),
        "final reading must not be overwritten"
    );
}

#[test]
fn service_rejects_unknown_targets() {
    let service = service();
    let err = service
        .record_usage(NewUsage::open("9", "Guest", 0.0, 0.75, day(0), day(1)))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(NotFoundError::Home(_))));

    assert!(service.complete_usage(UsageId(404), 10.0, None).unwrap_err().is_not_found());
    assert!(service.remove_usage(UsageId(404)).unwrap_err().is_not_found());
    assert!(service.remove_home("9").unwrap_err().is_not_found());
    assert!(matches!(
        service.add_home("1").unwrap_err(),
        CoreError::Conflict(ConflictError::DuplicateHome(_))
    ));
    assert!(service.add_home("   ").unwrap_err().is_validation());
}

#[test]
fn reject_policy_blocks_second_open_stay() {
    let service = service().with_policy(OpenStayPolicy::Reject);
    let first = service
        .record_usage(NewUsage::open("1", "First", 0.0, 0.75, day(0), day(2)))
        .expect("first stay");
    let err = service
        .record_usage(NewUsage::open("1", "Second", 0.0, 0.75, day(3), day(4)))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::OpenStayExists { open, .. }) if open == first.id
    ));

    service
        .record_usage(NewUsage::open("2", "Elsewhere", 0.0, 0.75, day(3), day(4)))
        .expect("other homes are unaffected");
}

#[test]
fn permit_policy_routes_to_newest_open_stay() {
    let service = service();
    service
        .record_usage(NewUsage::open("1", "First", 0.0, 0.75, day(0), day(2)))
        .unwrap();
    let second = service
        .record_usage(NewUsage::open("1", "Second", 0.0, 0.75, day(3), day(4)))
        .unwrap();

    match service.stay_action("1").unwrap() {
        StayAction::CompleteOpen(usage) => assert_eq!(usage.id, second.id),
        other => panic!("unexpected action: {other:?}"),
    }
}

#[test]
fn next_stay_is_seeded_from_previous_final_reading() {
    let service = service();
    assert_eq!(
        service.stay_action("2").unwrap(),
        StayAction::StartNew {
            initial_reading: 0.0
        }
    );
    let open = service
        .record_usage(NewUsage::open("2", "Guest", 200.0, 0.75, day(0), day(2)))
        .unwrap();
    service.complete_usage(open.id, 260.0, Some(day(2))).unwrap();

    assert_eq!(service.last_meter_reading("2").unwrap(), 260.0);
    let draft = service
        .draft_stay("2", " Next ", day(5), day(7), 0.8)
        .unwrap();
    assert_eq!(draft.initial_reading, 260.0);
    assert_eq!(draft.user_name, "Next");
    assert_eq!(draft.date, day(20));
}

#[test]
fn removing_a_home_drops_its_records() {
    let service = service();
    service
        .record_usage(NewUsage::open("1", "Guest", 0.0, 0.75, day(0), day(2)))
        .unwrap();
    service
        .record_usage(NewUsage::open("2", "Guest", 0.0, 0.75, day(0), day(2)))
        .unwrap();

    let view = service.ledger(LedgerScope::home("1")).unwrap();
    assert!(view.depends_on("1"));
    service.remove_home("1").unwrap();

    assert!(service.ledger(LedgerScope::home("1")).unwrap_err().is_not_found());
    let overview = service.property_overview(5).unwrap();
    assert_eq!(overview.home_count, 1);
    assert_eq!(overview.summary.count, 1);
    assert_eq!(overview.active_count, 1);
}

#[test]
fn home_overview_reports_current_reading_and_active_stay() {
    let service = service();
    let first = service
        .record_usage(NewUsage::open("1", "Jan", 1000.0, 0.75, day(0), day(4)))
        .unwrap();
    service.complete_usage(first.id, 1050.0, Some(day(4))).unwrap();
    let open = service
        .record_usage(NewUsage::open("1", "Anna", 1050.0, 0.75, day(9), day(14)))
        .unwrap();

    let overview = service.home_overview("1").unwrap();
    assert_eq!(overview.current_reading, Some(1050.0));
    assert_eq!(overview.active_count, 1);
    assert_eq!(overview.latest_open.map(|u| u.id), Some(open.id));
    assert_eq!(overview.summary.count, 2);
    assert_eq!(overview.summary.total_days, 5 + 6);
    assert!((overview.summary.total_cost - 37.5).abs() < 1e-9);
}

#[test]
fn orphan_records_are_reported() {
    let homes = vec![Home::new("1")];
    let usages = vec![open_usage(1, "1", 0.0, 0, 1), open_usage(2, "7", 0.0, 0, 1)];
    let warnings = orphan_warnings(&homes, &usages);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("unknown home 7"));
}
