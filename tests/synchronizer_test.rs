//! Integration tests for the lock, the run status and process tracking

mod common;

use chrono::{Duration, Utc};
use common::{config_with, ldap, Harness, SYSTEM};
use profile_sync::adapters::storage::ProcessRepository;
use profile_sync::domain::entity::{ObjectType, User};
use profile_sync::domain::process::{
    Process, ProcessBuilder, ProcessStatus, StepKind, StepStatus, SyncOperations,
};
use profile_sync::domain::sync::SyncStatus;
use profile_sync::domain::SyncError;
use tokio::sync::watch;

const USERS: &str = r#"
[[sync.entities]]
object_type = "user"
operations = ["all"]
"#;

fn harness() -> Harness {
    Harness::new(
        config_with(USERS),
        vec![User::new("alice").with_external_id(ldap("U1")).into()],
    )
}

fn unfinished_process(idle_for: Duration) -> Process {
    let mut process = ProcessBuilder::new(SYSTEM)
        .step(StepKind::Entities(ObjectType::User), SyncOperations::ALL)
        .build();
    process.steps[0].mark_started();
    process.updated_at = Utc::now() - idle_for;
    process
}

#[tokio::test]
async fn test_run_releases_lock_and_persists_process() {
    let harness = harness();

    let summary = harness.run().await;

    assert!(harness
        .service
        .synchronizer()
        .is_sync_lock_available()
        .await
        .unwrap());
    let latest = harness.service.latest_process().await.unwrap().unwrap();
    assert_eq!(latest.id, summary.process_id);
    assert_eq!(latest.status, ProcessStatus::Completed);
    assert!(latest.finished_at.is_some());
    assert_eq!(latest.steps[0].final_counts.create, 1);
    assert_eq!(
        harness.service.get_sync_status().await.unwrap(),
        SyncStatus::NotRunning
    );
}

#[tokio::test]
async fn test_held_lock_refuses_to_start() {
    let harness = harness();
    assert!(harness.service.synchronizer().try_set_lock().await);

    let (_tx, rx) = watch::channel(false);
    let outcome = harness.service.start(rx).await;

    assert!(matches!(outcome, Err(SyncError::Lock(_))));
    assert!(harness.destination.commands().await.is_empty());
    assert_eq!(
        harness.service.get_sync_status().await.unwrap(),
        SyncStatus::Running
    );
}

#[tokio::test]
async fn test_idle_unfinished_process_is_reported_stuck() {
    let harness = harness();
    harness
        .storage
        .save(&unfinished_process(Duration::hours(3)))
        .await
        .unwrap();

    assert_eq!(
        harness.service.get_sync_status().await.unwrap(),
        SyncStatus::Stuck
    );
}

#[tokio::test]
async fn test_recent_unfinished_process_is_reported_running() {
    let harness = harness();
    harness
        .storage
        .save(&unfinished_process(Duration::seconds(5)))
        .await
        .unwrap();

    assert_eq!(
        harness.service.get_sync_status().await.unwrap(),
        SyncStatus::Running
    );
}

#[tokio::test]
async fn test_start_aborts_unfinished_processes() {
    let harness = harness();
    let stale = unfinished_process(Duration::hours(3));
    harness.storage.save(&stale).await.unwrap();

    let summary = harness.run().await;

    let previous = harness.storage.load(stale.id).await.unwrap().unwrap();
    assert_eq!(previous.status, ProcessStatus::Aborted);
    assert_eq!(previous.steps[0].status, StepStatus::Aborted);
    assert_eq!(summary.status, ProcessStatus::Completed);
    assert!(harness.storage.list_unfinished().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_run_is_aborted_and_unlocked() {
    let harness = harness();
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let summary = harness.service.start(rx).await.unwrap();

    assert_eq!(summary.status, ProcessStatus::Aborted);
    assert!(summary
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Aborted));
    assert!(harness.destination.commands().await.is_empty());
    assert!(harness
        .service
        .synchronizer()
        .is_sync_lock_available()
        .await
        .unwrap());
}
