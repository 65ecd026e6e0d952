//! Contract Test: Degraded Collaborators
//!
//! Constraints verified:
//! - A failed rule removal does not stop the insert or the commit
//! - A failed rule insert does not stop the commit
//! - A failed commit still reports `Updated`, and the next run retries
//! - An unreadable snapshot is treated as "never seen", not as a fatal error
//!
//! If this test fails, one broken collaborator can block synchronization.

mod common;

use common::*;
use ddns_ufw_core::{StepStatus, SyncOutcome, SyncTarget, UpdateReport};

const HOST: &str = "a.example.com";

fn expect_updated(outcome: SyncOutcome) -> UpdateReport {
    match outcome {
        SyncOutcome::Updated(report) => report,
        other => panic!("expected Updated, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_removal_still_inserts_and_commits() {
    let resolver = ScriptedResolver::answering("203.0.113.9");
    let gateway = RecordingGateway::new();
    gateway.fail_removes(true);
    let store = CountingStateStore::with_record(HOST, "203.0.113.5");
    let engine = engine_with(&resolver, &gateway, &store);

    let report = expect_updated(engine.sync(&SyncTarget::new(HOST)).await);

    assert!(report.rule_removed.is_failed());
    assert_eq!(report.rule_inserted, StepStatus::Done);
    assert_eq!(report.state_committed, StepStatus::Done);
    assert!(!report.is_clean());
    assert_eq!(
        gateway.calls(),
        vec![
            GatewayCall::remove("203.0.113.5", HOST),
            GatewayCall::insert("203.0.113.9", HOST),
        ]
    );
    assert_eq!(store.snapshot().await[HOST], "203.0.113.9");
}

#[tokio::test]
async fn failed_insert_still_commits_new_address() {
    let resolver = ScriptedResolver::answering("203.0.113.9");
    let gateway = RecordingGateway::new();
    gateway.fail_inserts(true);
    let store = CountingStateStore::with_record(HOST, "203.0.113.5");
    let engine = engine_with(&resolver, &gateway, &store);

    let report = expect_updated(engine.sync(&SyncTarget::new(HOST)).await);

    assert_eq!(report.rule_removed, StepStatus::Done);
    assert!(report.rule_inserted.is_failed());
    assert_eq!(report.state_committed, StepStatus::Done);
    assert_eq!(store.snapshot().await[HOST], "203.0.113.9");
}

#[tokio::test]
async fn failed_commit_reports_updated_and_retries_next_run() {
    let resolver = ScriptedResolver::answering("203.0.113.9");
    let gateway = RecordingGateway::new();
    let store = CountingStateStore::with_record(HOST, "203.0.113.5");
    store.fail_writes(true);
    let engine = engine_with(&resolver, &gateway, &store);
    let target = SyncTarget::new(HOST);

    let report = expect_updated(engine.sync(&target).await);
    assert!(report.state_committed.is_failed());
    assert_eq!(report.decision.new_address, "203.0.113.9");
    assert_eq!(store.snapshot().await[HOST], "203.0.113.5", "cache stays behind");

    store.fail_writes(false);
    let report = expect_updated(engine.sync(&target).await);
    assert!(report.is_clean());
    assert_eq!(
        report.decision.previous_address.as_deref(),
        Some("203.0.113.5"),
        "second run compares against the stale cache"
    );
    assert_eq!(store.snapshot().await[HOST], "203.0.113.9");
    assert_eq!(gateway.calls().len(), 4);
}

#[tokio::test]
async fn corrupt_state_degrades_to_first_observation() {
    let resolver = ScriptedResolver::answering("203.0.113.9");
    let gateway = RecordingGateway::new();
    let store = CountingStateStore::with_record(HOST, "203.0.113.5");
    store.corrupt(true);
    let engine = engine_with(&resolver, &gateway, &store);

    let report = expect_updated(engine.sync(&SyncTarget::new(HOST)).await);

    assert_eq!(report.decision.previous_address, None);
    assert_eq!(report.rule_removed, StepStatus::Skipped);
    assert_eq!(
        gateway.calls(),
        vec![GatewayCall::insert("203.0.113.9", HOST)]
    );
    assert_eq!(store.save_count(), 1);
}
