//! Renumbering engine against the simulated RESTCONF store
//!
//! Most tests run the simulator in strict mode, where a PUT onto an
//! occupied sequence number fails: any intermediate collision in a
//! renumbering chain surfaces as an error.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tnsr_acl_common::{AclError, AclRuleList, SequenceIndex};
use tnsr_acl_test::{rule_fixtures, SimulatedRestconf, StoreVerifier};
use tnsr_aclmgr::{
    execute_steps, AclMgrError, Move, RenumberEngine, RenumberPlan, RenumberStep, RuleStore,
};

fn engine_with(sequences: &[u32]) -> RenumberEngine<SimulatedRestconf> {
    let sim = SimulatedRestconf::new().strict();
    sim.seed("edge", rule_fixtures::rules_at(sequences));
    let paths = sim.paths();
    RenumberEngine::new(Arc::new(RuleStore::new(sim, paths)))
}

fn sim(engine: &RenumberEngine<SimulatedRestconf>) -> &SimulatedRestconf {
    engine.store().transport()
}

#[tokio::test]
async fn test_shift_moves_chained_block() {
    let engine = engine_with(&[5, 6, 8, 20]);

    let outcome = engine.shift_rows_from_sequence("edge", 2, 5).await.unwrap();
    assert_eq!(outcome.acl_name, "edge");
    assert_eq!(outcome.selected_sequence, Some(7));
    assert_eq!(outcome.moves, vec![(8, 10), (6, 8), (5, 7)]);
    assert_eq!(outcome.rules.sequences(), vec![7, 8, 10, 20]);

    let verifier = StoreVerifier::new(sim(&engine));
    verifier.assert_sequences("edge", &[7, 8, 10, 20]).unwrap();
    verifier.assert_moved("edge", 5, 7).unwrap();
    verifier.assert_moved("edge", 6, 8).unwrap();
    verifier.assert_moved("edge", 8, 10).unwrap();
    verifier.assert_moved("edge", 20, 20).unwrap();
    verifier.assert_write_count(6).unwrap();
    verifier.assert_descending_moves().unwrap();

    let index = engine.store().cached_index("edge").unwrap();
    assert!(!index.has_duplicates());
    assert_eq!(engine.store().is_stale("edge"), Some(false));
}

#[tokio::test]
async fn test_shift_stops_at_gap() {
    let engine = engine_with(&[5, 6, 9, 20]);

    let outcome = engine.shift_rows_from_sequence("edge", 2, 5).await.unwrap();
    assert_eq!(outcome.moves, vec![(6, 8), (5, 7)]);
    assert_eq!(outcome.selected_sequence, Some(7));

    let verifier = StoreVerifier::new(sim(&engine));
    verifier.assert_sequences("edge", &[7, 8, 9, 20]).unwrap();
    verifier.assert_moved("edge", 9, 9).unwrap();
    verifier.assert_moved("edge", 20, 20).unwrap();
    verifier.assert_write_count(4).unwrap();
}

#[tokio::test]
async fn test_shift_tail_rule() {
    let engine = engine_with(&[1, 2, 3]);

    let outcome = engine.shift_rows_from_sequence("edge", 10, 3).await.unwrap();
    assert_eq!(outcome.moves, vec![(3, 13)]);
    assert_eq!(outcome.rules.sequences(), vec![1, 2, 13]);
}

#[tokio::test]
async fn test_ascending_order_collides() {
    let engine = engine_with(&[5, 6, 8, 20]);
    let store = engine.store();

    let listing = store.fetch_rules("edge").await.unwrap();
    let plan = RenumberPlan::build(&listing.rules, 2, 5).unwrap();
    let ascending: Vec<RenumberStep> = plan.moves().iter().rev().flat_map(Move::steps).collect();

    let failure = execute_steps(store, "edge", ascending).await.unwrap_err();
    assert_eq!(failure.position, 3);
    assert_eq!(failure.total, 6);
    assert_eq!(failure.completed.len(), 2);
    assert!(matches!(failure.failed, RenumberStep::Write { from: 6, to: 8, .. }));
    assert_eq!(failure.source.http().map(|h| h.status), Some(409));
    assert_eq!(store.is_stale("edge"), Some(true));
}

#[tokio::test]
async fn test_partial_failure_halts_chain() {
    let engine = engine_with(&[1, 2, 3]);
    sim(&engine).fail_nth_write(2, 503);

    let err = engine.shift_rows_from_sequence("edge", 1, 1).await.unwrap_err();
    let failure = match err {
        AclMgrError::PartialRenumber(failure) => failure,
        other => panic!("unexpected error {other:?}"),
    };
    assert_eq!(failure.acl_name, "edge");
    assert_eq!(failure.position, 2);
    assert_eq!(failure.total, 6);
    assert_eq!(failure.failed, RenumberStep::Delete { sequence: 3 });
    assert_eq!(failure.completed.len(), 1);
    assert_eq!(failure.source.http().map(|h| h.status), Some(503));

    // fetch, write 4, failed delete 3; steps 3..6 and the re-fetch never ran
    assert_eq!(sim(&engine).call_count(), 3);
    assert_eq!(sim(&engine).sequences("edge"), vec![1, 2, 3, 4]);
    assert_eq!(engine.store().is_stale("edge"), Some(true));
    assert!(!engine.is_shifting("edge"));
}

#[tokio::test]
async fn test_missing_sequence_is_noop() {
    let engine = engine_with(&[5, 6]);

    let outcome = engine.shift_rows_from_sequence("edge", 3, 7).await.unwrap();
    assert_eq!(outcome.selected_sequence, None);
    assert!(outcome.moves.is_empty());
    assert_eq!(outcome.rules.sequences(), vec![5, 6]);

    StoreVerifier::new(sim(&engine)).assert_no_writes().unwrap();
    assert_eq!(sim(&engine).call_count(), 1);
}

#[tokio::test]
async fn test_zero_rows_is_noop() {
    let engine = engine_with(&[5, 6]);

    let outcome = engine.shift_rows_from_sequence("edge", 0, 5).await.unwrap();
    assert_eq!(outcome.selected_sequence, Some(5));
    assert!(outcome.moves.is_empty());
    StoreVerifier::new(sim(&engine)).assert_no_writes().unwrap();
}

#[tokio::test]
async fn test_zero_rows_on_missing_sequence_selects_nothing() {
    let engine = engine_with(&[5, 6]);

    let outcome = engine.shift_rows_from_sequence("edge", 0, 99).await.unwrap();
    assert_eq!(outcome.selected_sequence, None);
    assert!(outcome.moves.is_empty());
    assert_eq!(outcome.rules.sequences(), vec![5, 6]);
    StoreVerifier::new(sim(&engine)).assert_no_writes().unwrap();
}

#[tokio::test]
async fn test_overflow_rejected_before_writes() {
    let engine = engine_with(&[10, u32::MAX - 1]);

    let err = engine
        .shift_rows_from_sequence("edge", 5, u32::MAX - 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AclMgrError::Acl(AclError::Validation { .. })));
    StoreVerifier::new(sim(&engine)).assert_no_writes().unwrap();
}

#[tokio::test]
async fn test_fetch_failure_releases_guard() {
    let engine = engine_with(&[1]);

    let err = engine.shift_rows_from_sequence("ghost", 1, 1).await.unwrap_err();
    assert_eq!(err.http().map(|h| h.status), Some(404));
    assert!(!engine.is_shifting("ghost"));
}

#[tokio::test]
async fn test_concurrent_shift_on_same_acl_rejected() {
    let engine = engine_with(&[5, 6, 8, 20]);

    let (first, second) = tokio::join!(
        engine.shift_rows_from_sequence("edge", 2, 5),
        engine.shift_rows_from_sequence("edge", 2, 5),
    );

    assert_eq!(first.unwrap().selected_sequence, Some(7));
    assert!(matches!(
        second,
        Err(AclMgrError::ShiftInProgress { ref acl_name }) if acl_name == "edge"
    ));

    // exactly one shift worth of requests: fetch, 3 moves, re-fetch
    assert_eq!(sim(&engine).call_count(), 8);
    StoreVerifier::new(sim(&engine))
        .assert_sequences("edge", &[7, 8, 10, 20])
        .unwrap();
}

#[tokio::test]
async fn test_shifts_on_different_acls_run_together() {
    let engine = engine_with(&[1, 2]);
    sim(&engine).seed("core", rule_fixtures::rules_at(&[1, 2]));

    let (edge, core) = tokio::join!(
        engine.shift_rows_from_sequence("edge", 1, 1),
        engine.shift_rows_from_sequence("core", 1, 2),
    );

    assert_eq!(edge.unwrap().rules.sequences(), vec![2, 3]);
    assert_eq!(core.unwrap().rules.sequences(), vec![1, 3]);
}

#[test]
fn test_plan_ignores_server_order() {
    let rules = AclRuleList::new(rule_fixtures::rules_at(&[20, 8, 5, 6]));
    assert_eq!(SequenceIndex::from_rules(&rules).as_slice(), &[20, 8, 5, 6]);

    let plan = RenumberPlan::build(&rules, 2, 5).unwrap();
    assert_eq!(
        plan.moves().iter().map(|m| (m.from, m.to)).collect::<Vec<_>>(),
        vec![(8, 10), (6, 8), (5, 7)]
    );
}
