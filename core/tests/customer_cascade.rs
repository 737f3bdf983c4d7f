//! Customer lifecycle and cascade delete.
//!
//! Dependent cleanup is advisory: a failing dependent delete is reported and
//! skipped. The customer-row delete is authoritative: its failure fails the
//! whole operation.

use pigg_core::{
    chat_inquiry::{ChatInquiryService, NewChatInquiry},
    customer::{CustomerService, NewCustomer},
    login_log::{LoginLogService, NewLoginLog},
    risk_profile::{NewRiskProfile, RiskProfileService},
    simulation_state::SimulationStateService,
    DependentKind, MemoryStore, RecordStore, SqliteStore,
};
use serde_json::json;
use std::sync::Arc;

const LINKED_KINDS: [DependentKind; 4] = [
    DependentKind::InvestmentDetails,
    DependentKind::BrokerLinks,
    DependentKind::VirtualAccounts,
    DependentKind::Notifications,
];

fn sqlite() -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    Arc::new(store)
}

fn new_customer(name: &str) -> NewCustomer {
    NewCustomer {
        name: Some(name.to_string()),
        email: Some(format!("{name}@example.com")),
        phone: None,
    }
}

/// Give a customer one row of every dependent kind.
fn populate(store: Arc<dyn RecordStore>, customer_id: &str) {
    SimulationStateService::new(store.clone())
        .upsert(Some(customer_id), json!(2), json!({"nav": 1000}))
        .unwrap();
    RiskProfileService::new(store.clone())
        .save(
            Some(customer_id),
            NewRiskProfile {
                risk_type: Some("balanced".into()),
                score: 55,
                answers: json!([1, 3, 2]),
            },
        )
        .unwrap();
    LoginLogService::new(store.clone())
        .record(Some(customer_id), NewLoginLog::default())
        .unwrap();
    ChatInquiryService::new(store)
        .submit(
            Some(customer_id),
            NewChatInquiry {
                title: Some("Fees".into()),
                content: Some("What does rebalancing cost?".into()),
            },
        )
        .unwrap();
}

#[test]
fn create_then_get_round_trips() {
    let svc = CustomerService::new(sqlite());
    let created = svc.create(new_customer("ana")).unwrap();

    assert!(!created.customer_id.is_empty());
    let fetched = svc.get(Some(&created.customer_id)).unwrap();
    assert_eq!(fetched, Some(created));
}

#[test]
fn get_unknown_customer_is_none() {
    let svc = CustomerService::new(sqlite());
    assert_eq!(svc.get(Some("nobody")).unwrap(), None);
}

#[test]
fn create_requires_name_and_email() {
    let store = Arc::new(MemoryStore::new());
    let svc = CustomerService::new(store.clone());

    let err = svc
        .create(NewCustomer { name: None, ..new_customer("x") })
        .unwrap_err();
    assert_eq!(err.to_string(), "Name is required");

    let err = svc
        .create(NewCustomer { email: Some(String::new()), ..new_customer("x") })
        .unwrap_err();
    assert_eq!(err.to_string(), "Email is required");

    assert_eq!(store.call_count(), 0);
}

#[test]
fn delete_removes_every_dependent_and_the_customer() {
    let store = sqlite();
    let customers = CustomerService::new(store.clone());
    let victim = customers.create(new_customer("victim")).unwrap();
    let bystander = customers.create(new_customer("bystander")).unwrap();

    for id in [&victim.customer_id, &bystander.customer_id] {
        populate(store.clone(), id);
        for kind in LINKED_KINDS {
            store.insert_linked_record(kind, id).unwrap();
        }
    }

    let report = customers.delete(Some(&victim.customer_id)).unwrap();
    assert!(report.customer_removed);
    assert!(report.is_clean(), "{:?}", report.cleanup_failures);

    for kind in DependentKind::ALL {
        assert_eq!(store.dependent_count(kind, &victim.customer_id).unwrap(), 0, "{kind}");
        assert_eq!(store.dependent_count(kind, &bystander.customer_id).unwrap(), 1, "{kind}");
    }
    assert_eq!(customers.get(Some(&victim.customer_id)).unwrap(), None);
    assert!(customers.get(Some(&bystander.customer_id)).unwrap().is_some());
}

#[test]
fn failed_dependent_cleanup_is_reported_not_fatal() {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MemoryStore::new());
    let customers = CustomerService::new(store.clone());
    let c = customers.create(new_customer("ben")).unwrap();
    populate(store.clone(), &c.customer_id);
    for kind in LINKED_KINDS {
        store.insert_linked_record(kind, &c.customer_id).unwrap();
    }
    store.fail_dependent_delete(DependentKind::BrokerLinks);

    let report = customers.delete(Some(&c.customer_id)).unwrap();

    assert!(report.customer_removed);
    assert_eq!(report.cleanup_failures.len(), 1);
    assert_eq!(report.cleanup_failures[0].kind, DependentKind::BrokerLinks);
    // Kinds after the failing one were still cleaned up.
    assert_eq!(store.dependent_count(DependentKind::SimulationState, &c.customer_id).unwrap(), 0);
    assert_eq!(store.dependent_count(DependentKind::LoginLogs, &c.customer_id).unwrap(), 0);
    assert_eq!(store.dependent_count(DependentKind::BrokerLinks, &c.customer_id).unwrap(), 1);
}

#[test]
fn failed_customer_delete_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    let customers = CustomerService::new(store.clone());
    let c = customers.create(new_customer("cy")).unwrap();
    store.fail_customer_delete();

    let err = customers.delete(Some(&c.customer_id)).unwrap_err();
    assert!(!err.is_validation(), "{err}");
    assert!(customers.get(Some(&c.customer_id)).unwrap().is_some());
}

#[test]
fn deleting_an_unknown_customer_succeeds_without_removal() {
    let customers = CustomerService::new(sqlite());
    let report = customers.delete(Some("ghost")).unwrap();
    assert!(!report.customer_removed);
    assert!(report.is_clean());
}

#[test]
fn delete_without_id_touches_nothing() {
    let store = Arc::new(MemoryStore::new());
    let customers = CustomerService::new(store.clone());

    let err = customers.delete(None).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.call_count(), 0);
}
