//! Rule store against the simulated RESTCONF store

use pretty_assertions::assert_eq;
use tnsr_acl_common::{AclAction, AclError, AclRule};
use tnsr_acl_test::{rule_fixtures, SimulatedRestconf, StoreVerifier};
use tnsr_aclmgr::RuleStore;

fn store(sim: SimulatedRestconf) -> RuleStore<SimulatedRestconf> {
    let paths = sim.paths();
    RuleStore::new(sim, paths)
}

#[tokio::test]
async fn test_create_fetch_delete_round_trip() {
    let sim = SimulatedRestconf::new();
    sim.seed("edge", rule_fixtures::rules_at(&[10, 50]));
    let store = store(sim);

    let rule = rule_fixtures::permit_tcp(42, 22);
    store.create_or_update_rule("edge", &rule).await.unwrap();

    let listing = store.fetch_rules("edge").await.unwrap();
    assert_eq!(listing.rules.find(42), Some(&rule));
    assert!(store.is_known_sequence("edge", 42));
    assert_eq!(store.cached_rule("edge", 42), Some(rule.clone()));

    let deleted = store.delete_rule("edge", &rule).await.unwrap();
    assert_eq!(deleted, 42);

    store.fetch_rules("edge").await.unwrap();
    assert!(!store.is_known_sequence("edge", 42));
    assert_eq!(store.cached_index("edge").unwrap().as_slice(), &[10, 50]);
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let sim = SimulatedRestconf::new();
    sim.seed("edge", rule_fixtures::rules_at(&[3, 1, 2]));
    let store = store(sim);

    store.fetch_rules("edge").await.unwrap();
    let first = store.cached_index("edge").unwrap();
    store.fetch_rules("edge").await.unwrap();
    let second = store.cached_index("edge").unwrap();

    assert_eq!(first, second);
    assert_eq!(store.transport().write_count(), 0);
}

#[tokio::test]
async fn test_empty_acl_lists_no_rules() {
    let sim = SimulatedRestconf::new();
    sim.create_acl("empty");
    let store = store(sim);

    let listing = store.fetch_rules("empty").await.unwrap();
    assert!(listing.rules.is_empty());
    assert!(store.cached_index("empty").unwrap().is_empty());
    assert!(!store.is_known_sequence("empty", 1));
}

#[tokio::test]
async fn test_update_replaces_fields() {
    let sim = SimulatedRestconf::new();
    sim.seed("edge", rule_fixtures::rules_at(&[5]));
    let store = store(sim);

    let mut rule = AclRule::from_fields([("sequence", "5"), ("action", "permit")]).unwrap();
    rule.protocol = Some("udp".to_string());
    store.create_or_update_rule("edge", &rule).await.unwrap();

    let verifier = StoreVerifier::new(store.transport());
    verifier.assert_field_value("edge", 5, "action", "permit").unwrap();
    verifier.assert_field_value("edge", 5, "protocol", "udp").unwrap();

    let listing = store.fetch_rules("edge").await.unwrap();
    assert_eq!(listing.rules.find(5).and_then(|r| r.action), Some(AclAction::Permit));
}

#[tokio::test]
async fn test_remote_failure_propagates_unchanged() {
    let sim = SimulatedRestconf::new();
    sim.seed("edge", rule_fixtures::rules_at(&[5]));
    sim.fail_nth_write(1, 503);
    let store = store(sim);

    let err = store
        .create_or_update_rule("edge", &AclRule::with_sequence(6))
        .await
        .unwrap_err();
    match err {
        AclError::Http(http) => {
            assert_eq!(http.status, 503);
            assert_eq!(http.status_text, "Service Unavailable");
            assert_eq!(http.message(), Some("injected failure"));
        }
        other => panic!("unexpected error {other:?}"),
    }

    // one attempt, no retry
    assert_eq!(store.transport().write_count(), 1);
    assert_eq!(store.transport().sequences("edge"), vec![5]);
}
