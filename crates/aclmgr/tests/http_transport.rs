//! reqwest transport against the fake RESTCONF server

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tnsr_acl_common::paths::YANG_DATA_JSON;
use tnsr_acl_common::{AclError, Method, Transport};
use tnsr_acl_test::{rule_fixtures, FakeRestconfServer, SimulatedRestconf, StoreVerifier};
use tnsr_aclmgr::{HttpTransport, RenumberEngine, RestconfConfig, RuleStore};

async fn start(sim: SimulatedRestconf) -> (FakeRestconfServer, Arc<RuleStore<HttpTransport>>) {
    let server = FakeRestconfServer::start(Arc::new(sim)).await.unwrap();
    let transport = HttpTransport::from_config(&RestconfConfig::default()).unwrap();
    let store = Arc::new(RuleStore::new(transport, server.paths().unwrap()));
    (server, store)
}

#[tokio::test]
async fn test_crud_over_http() {
    let sim = SimulatedRestconf::new();
    sim.seed("edge", rule_fixtures::rules_at(&[10]));
    let (server, store) = start(sim).await;

    let rule = rule_fixtures::permit_tcp(42, 8443);
    store.create_or_update_rule("edge", &rule).await.unwrap();

    let listing = store.fetch_rules("edge").await.unwrap();
    assert_eq!(listing.rules.sequences(), vec![10, 42]);
    assert_eq!(listing.rules.find(42), Some(&rule));

    store.delete_rule("edge", &rule).await.unwrap();
    StoreVerifier::new(server.simulator())
        .assert_sequences("edge", &[10])
        .unwrap();
}

#[tokio::test]
async fn test_requests_carry_yang_media_type() {
    let sim = SimulatedRestconf::new();
    sim.create_acl("edge");
    let (server, store) = start(sim).await;

    store
        .create_or_update_rule("edge", &rule_fixtures::basic_rule(1))
        .await
        .unwrap();

    let calls = server.simulator().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Put);
    assert_eq!(calls[0].sequence, Some(1));
    assert_eq!(calls[0].content_type.as_deref(), Some(YANG_DATA_JSON));
}

#[tokio::test]
async fn test_error_status_and_body() {
    let sim = SimulatedRestconf::new();
    sim.seed("edge", rule_fixtures::rules_at(&[1]));
    let (_server, store) = start(sim).await;

    let err = store.fetch_rules("ghost").await.unwrap_err();
    let http = match &err {
        AclError::Http(http) => http,
        other => panic!("unexpected error {other:?}"),
    };
    assert_eq!(http.status, 404);
    assert_eq!(http.status_text, "Not Found");
    assert_eq!(http.message(), Some("uri keypath not found"));

    let err = store
        .create_rule("edge", &rule_fixtures::basic_rule(1))
        .await
        .unwrap_err();
    assert_eq!(err.http().map(|h| h.status), Some(409));
    assert_eq!(err.to_string(), "HTTP 409 Conflict: object already exists");
}

#[tokio::test]
async fn test_empty_response_body() {
    let sim = SimulatedRestconf::new();
    sim.create_acl("edge");
    let (server, store) = start(sim).await;

    let url = server.paths().unwrap().rule_url("edge", 3);
    let body = tnsr_acl_common::wire::encode_rule(
        &server.paths().unwrap(),
        &rule_fixtures::basic_rule(3),
    )
    .unwrap();
    let response = store
        .transport()
        .send(Method::Put, &url, Some(body))
        .await
        .unwrap();
    assert_eq!(response.status, 201);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_shift_over_http() {
    let sim = SimulatedRestconf::new().strict();
    sim.seed("edge", rule_fixtures::rules_at(&[5, 6, 8, 20]));
    let (server, store) = start(sim).await;
    let engine = RenumberEngine::new(store);

    let outcome = engine.shift_rows_from_sequence("edge", 2, 5).await.unwrap();
    assert_eq!(outcome.selected_sequence, Some(7));
    assert_eq!(outcome.rules.sequences(), vec![7, 8, 10, 20]);

    let verifier = StoreVerifier::new(server.simulator());
    verifier.assert_descending_moves().unwrap();
    verifier.assert_moved("edge", 8, 10).unwrap();
}
