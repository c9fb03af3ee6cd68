use std::thread;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use muster::{
    ChangeEvent, DistressCall, EmergencyType, EntityKind, GeoPoint, Reconciler, RequestPriority,
    RequestStatus, SyncRuntime, SyncRuntimeConfig,
};

fn alert_event(probability: f64) -> ChangeEvent {
    ChangeEvent::upsert(
        EntityKind::Alert,
        1,
        json!({
            "id": Uuid::new_v4(),
            "disaster_type": "cyclone",
            "severity": "Medium",
            "probability": probability,
            "position": { "lat": 17.7, "lon": 83.3 },
            "status": "Active",
        }),
    )
}

fn request_event() -> ChangeEvent {
    ChangeEvent::upsert(
        EntityKind::Request,
        1,
        json!({
            "id": Uuid::new_v4(),
            "requester": "Caller",
            "contact": "112",
            "position": { "lat": 17.7, "lon": 83.3 },
            "emergency": "Flood",
            "people_count": 1,
        }),
    )
}

fn zone_event(capacity: u32) -> ChangeEvent {
    ChangeEvent::upsert(
        EntityKind::Zone,
        1,
        json!({
            "id": Uuid::new_v4(),
            "name": format!("shelter-{capacity}"),
            "type": "Shelter",
            "position": { "lat": 17.8, "lon": 83.2 },
            "capacity": capacity,
            "current_occupancy": 0,
        }),
    )
}

#[test]
fn concurrent_producers_settle_into_one_consistent_view() {
    let runtime = SyncRuntime::start(
        Reconciler::in_memory(),
        SyncRuntimeConfig {
            queue_capacity: 4096,
            settle_window: Duration::from_millis(20),
            max_batch: 4096,
        },
    );

    // Three independent streams, one thread each.
    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..50 {
                runtime.submit(alert_event(f64::from(i))).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..30 {
                runtime.submit(request_event()).unwrap();
            }
        });
        s.spawn(|| {
            for i in 0..20 {
                runtime.submit(zone_event(10 + i)).unwrap();
            }
        });
    });
    runtime.flush().unwrap();

    let view = runtime.facade().snapshot().unwrap();
    assert_eq!(view.alerts.len(), 50);
    assert_eq!(view.requests.len(), 30);
    assert_eq!(view.zones.len(), 20);
    assert_eq!(view.triage.alert_count, 50);

    // Every pending request got a recommendation; zones have room.
    assert_eq!(view.assignments.len(), 30);
    assert!(view.assignments.iter().all(|a| a.outcome.is_assigned()));
}

#[test]
fn operator_sos_flow_end_to_end() {
    let runtime = SyncRuntime::in_memory();

    // A shelter is known before the call comes in.
    runtime.submit(zone_event(25)).unwrap();
    runtime.flush().unwrap();

    let provisional = runtime
        .originate_distress(DistressCall {
            requester: "K. Mensah".to_string(),
            contact: "+233-555-0100".to_string(),
            emergency: EmergencyType::Medical,
            people_count: 2,
            position: GeoPoint::new(17.71, 83.31).unwrap(),
            description: Some("chest pain, needs transport".to_string()),
        })
        .unwrap();
    assert_eq!(provisional.status, RequestStatus::Pending);
    assert_eq!(provisional.priority, RequestPriority::Critical);

    // The provisional record is visible and matched immediately.
    let view = runtime.facade().snapshot().unwrap();
    assert_eq!(view.requests.len(), 1);
    assert_eq!(view.assignments.len(), 1);
    assert!(view.assignments[0].outcome.is_assigned());

    // The authoritative insert confirms the record; no duplicate appears.
    let payload = serde_json::to_value(&provisional).unwrap();
    runtime
        .submit(ChangeEvent::upsert(EntityKind::Request, 1, payload))
        .unwrap();
    runtime.flush().unwrap();

    let view = runtime.facade().snapshot().unwrap();
    assert_eq!(view.requests.len(), 1);
    assert_eq!(view.requests[0].id, provisional.id);
}

#[test]
fn readers_never_observe_a_torn_view() {
    let runtime = SyncRuntime::start(
        Reconciler::in_memory(),
        SyncRuntimeConfig {
            queue_capacity: 4096,
            settle_window: Duration::from_millis(1),
            max_batch: 64,
        },
    );
    let facade = runtime.facade();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..200 {
                runtime.submit(alert_event(f64::from(i % 100))).unwrap();
            }
            runtime.flush().unwrap();
        });

        // Concurrent reader: every observed view must be internally
        // consistent between the alert list and its triage rollup.
        s.spawn(|| {
            for _ in 0..200 {
                let view = facade.snapshot().unwrap();
                assert_eq!(view.triage.alert_count, view.alerts.len());
                assert_eq!(
                    view.triage.severity_distribution.total(),
                    view.alerts.len()
                );
            }
        });
    });

    let view = runtime.facade().snapshot().unwrap();
    assert_eq!(view.alerts.len(), 200);
}
