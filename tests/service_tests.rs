mod common;

use cabin_core::{OpenStayPolicy, StatsAggregator, StayAction, UsageLedger};
use cabin_domain::{LedgerScope, NewUsage, UsageState};
use cabin_storage_json::load_document;
use common::{day, setup_service};

#[test]
fn completion_through_the_json_store_defaults_to_today() {
    let (service, path) = setup_service(day(3, 20));
    service.add_home("1").unwrap();
    let open = service
        .record_usage(NewUsage::open("1", "Ola", 400.0, 0.8, day(3, 15), day(3, 19)))
        .unwrap();

    let completed = service.complete_usage(open.id, 450.0, None).unwrap();

    assert_eq!(completed.date, day(3, 20));
    assert_eq!(completed.kwh_used, Some(50.0));
    assert!((UsageLedger::cost(&completed) - 40.0).abs() < 1e-9);

    let stored = load_document(&path).unwrap();
    assert_eq!(stored.usages.len(), 1);
    assert!(stored.usages[0].is_completed);
    assert_eq!(stored.usages[0].final_reading, Some(450.0));
}

#[test]
fn stay_routing_follows_the_stored_records() {
    let (service, _) = setup_service(day(3, 1));
    service.add_home("4").unwrap();
    assert_eq!(
        service.stay_action("4").unwrap(),
        StayAction::StartNew {
            initial_reading: 0.0
        }
    );

    let draft = service
        .draft_stay("4", "Jan", day(3, 1), day(3, 2), 0.75)
        .unwrap();
    let first = service.record_usage(draft).unwrap();
    match service.stay_action("4").unwrap() {
        StayAction::CompleteOpen(open) => assert_eq!(open.id, first.id),
        other => panic!("expected open stay, got {other:?}"),
    }

    service.complete_usage(first.id, 12.5, Some(day(3, 2))).unwrap();
    assert_eq!(
        service.stay_action("4").unwrap(),
        StayAction::StartNew {
            initial_reading: 12.5
        }
    );
}

#[test]
fn property_overview_aggregates_every_home() {
    let (service, _) = setup_service(day(3, 31));
    for home in ["1", "2"] {
        service.add_home(home).unwrap();
    }
    service
        .record_usage(
            NewUsage::open("1", "A", 0.0, 1.0, day(3, 1), day(3, 2))
                .with_final_reading(10.0)
                .with_date(day(3, 2)),
        )
        .unwrap();
    service
        .record_usage(
            NewUsage::open("2", "B", 100.0, 2.0, day(3, 5), day(3, 5))
                .with_final_reading(105.0)
                .with_date(day(3, 5)),
        )
        .unwrap();
    service
        .record_usage(NewUsage::open("2", "C", 105.0, 2.0, day(3, 10), day(3, 12)))
        .unwrap();

    let overview = service.property_overview(2).unwrap();

    assert_eq!(overview.home_count, 2);
    assert_eq!(overview.summary.total_kwh, 15.0);
    assert_eq!(overview.summary.total_cost, 20.0);
    assert_eq!(overview.summary.total_days, 6);
    assert_eq!(overview.summary.count, 3);
    assert_eq!(overview.active_count, 1);
    let recent: Vec<&str> = overview.recent.iter().map(|u| u.user_name.as_str()).collect();
    assert_eq!(recent, vec!["C", "B"]);
    assert_eq!(overview.by_home["1"].total_kwh, 10.0);
    assert_eq!(overview.by_home["2"].count, 2);
}

#[test]
fn reject_policy_applies_to_open_drafts_only() {
    let (service, _) = setup_service(day(3, 1));
    let service = service.with_policy(OpenStayPolicy::Reject);
    service.add_home("1").unwrap();
    service
        .record_usage(NewUsage::open("1", "A", 0.0, 1.0, day(3, 1), day(3, 2)))
        .unwrap();

    let second_open = service
        .record_usage(NewUsage::open("1", "B", 0.0, 1.0, day(3, 3), day(3, 4)))
        .unwrap_err();
    assert!(second_open.is_conflict());

    let backfilled = service
        .record_usage(
            NewUsage::open("1", "C", 0.0, 1.0, day(2, 1), day(2, 2)).with_final_reading(3.0),
        )
        .unwrap();
    assert_eq!(UsageLedger::classify(&backfilled), UsageState::Completed);

    let records = service.usages(&LedgerScope::home("1")).unwrap();
    assert_eq!(StatsAggregator::active_count(&records), 1);
}
