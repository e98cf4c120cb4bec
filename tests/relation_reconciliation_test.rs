//! Integration tests for the relation reconciliation engine

mod common;

use common::{config_with, ldap, Harness, SYSTEM};
use profile_sync::domain::command::{RelationMessage, SyncCommand};
use profile_sync::domain::entity::{Function, Group, ObjectType, Role, SyncEntity, User};
use profile_sync::domain::ids::{ExternalId, MaverickId};
use profile_sync::domain::process::{StepKind, StepStatus};
use profile_sync::domain::relation::{AssignmentType, ObjectRelation};

const USERS_AND_GROUPS: &str = r#"
[[sync.entities]]
object_type = "user"
operations = ["all"]

[[sync.entities]]
object_type = "group"
operations = ["all"]
relations = ["add", "delete"]
"#;

fn mid(id: &str) -> MaverickId {
    MaverickId::new(id).unwrap()
}

fn edge_to(assignment_type: AssignmentType, ext: &str, object_type: ObjectType) -> ObjectRelation {
    ObjectRelation::external(assignment_type, ldap(ext), object_type)
}

fn stored_edge(assignment_type: AssignmentType, id: &str, object_type: ObjectType) -> ObjectRelation {
    ObjectRelation {
        assignment_type,
        maverick_id: Some(mid(id)),
        external_id: None,
        object_type,
    }
}

fn relation_messages(commands: &[SyncCommand]) -> Vec<&RelationMessage> {
    commands
        .iter()
        .filter_map(|c| match c {
            SyncCommand::Relations { message } => Some(message),
            _ => None,
        })
        .collect()
}

fn relation_step(summary: &profile_sync::core::synchronizer::SyncSummary, t: ObjectType) -> usize {
    summary
        .steps
        .iter()
        .position(|s| s.kind == StepKind::Relations(t))
        .unwrap()
}

#[tokio::test]
async fn test_new_members_are_sent_in_one_message_per_group() {
    let group: SyncEntity = Group::new("engineering")
        .with_external_id(ldap("G1"))
        .with_relation(edge_to(AssignmentType::Members, "U1", ObjectType::User))
        .with_relation(edge_to(AssignmentType::Members, "U2", ObjectType::User))
        .into();
    let harness = Harness::new(
        config_with(USERS_AND_GROUPS),
        vec![
            User::new("alice").with_external_id(ldap("U1")).into(),
            User::new("bob").with_external_id(ldap("U2")).into(),
            group,
        ],
    );

    let summary = harness.run().await;

    let commands = harness.destination.commands().await;
    let messages = relation_messages(&commands);
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0], RelationMessage::Assignment(_)));
    assert_eq!(messages[0].body().added.len(), 2);
    assert!(messages[0].body().removed.is_empty());

    let step = &summary.steps[relation_step(&summary, ObjectType::Group)];
    assert_eq!(step.status, StepStatus::Success);
    assert_eq!(step.counts.relations_added, 2);

    let stored = harness
        .destination
        .entities()
        .await
        .into_iter()
        .find(|e| e.object_type() == ObjectType::Group)
        .unwrap();
    assert_eq!(stored.related_objects().len(), 2);
    assert!(stored.related_objects().iter().all(|r| r.maverick_id.is_some()));
}

#[tokio::test]
async fn test_relation_stored_in_opposite_direction_is_not_duplicated_or_removed() {
    let config = config_with(
        r#"
[[sync.entities]]
object_type = "group"
operations = ["all"]
relations = ["add", "delete"]
"#,
    );
    let parent: SyncEntity = Group::new("parent")
        .with_external_id(ldap("X"))
        .with_relation(edge_to(AssignmentType::ChildrenToParent, "Y", ObjectType::Group))
        .into();
    let child: SyncEntity = Group::new("child").with_external_id(ldap("Y")).into();
    let harness = Harness::new(config, vec![parent, child]);

    harness
        .destination
        .insert(
            Group::new("parent")
                .with_id(mid("m-X"))
                .with_external_id(ldap("X"))
                .with_source(SYSTEM)
                .into(),
        )
        .await;
    harness
        .destination
        .insert(
            Group::new("child")
                .with_id(mid("m-Y"))
                .with_external_id(ldap("Y"))
                .with_source(SYSTEM)
                .with_relation(stored_edge(AssignmentType::ParentsToChild, "m-X", ObjectType::Group))
                .into(),
        )
        .await;

    let summary = harness.run().await;

    assert!(relation_messages(&harness.destination.commands().await).is_empty());
    let step = &summary.steps[relation_step(&summary, ObjectType::Group)];
    assert_eq!(step.status, StepStatus::Success);
    assert_eq!(step.counts.relations_added, 0);
    assert_eq!(step.counts.relations_removed, 0);

    let child = harness.destination.get(&mid("m-Y")).await.unwrap();
    assert_eq!(child.related_objects().len(), 1);
}

#[tokio::test]
async fn test_stale_members_are_removed_but_foreign_origins_are_kept() {
    let group: SyncEntity = Group::new("engineering")
        .with_external_id(ldap("G"))
        .with_relation(edge_to(AssignmentType::Members, "U1", ObjectType::User))
        .into();
    let harness = Harness::new(
        config_with(USERS_AND_GROUPS),
        vec![User::new("alice").with_external_id(ldap("U1")).into(), group],
    );

    harness
        .destination
        .insert(
            User::new("alice")
                .with_id(mid("m-U1"))
                .with_external_id(ldap("U1"))
                .with_source(SYSTEM)
                .into(),
        )
        .await;
    harness
        .destination
        .insert(User::new("victor").with_id(mid("m-V")).with_source("HR").into())
        .await;
    harness
        .destination
        .insert(
            Group::new("engineering")
                .with_id(mid("m-G"))
                .with_external_id(ldap("G"))
                .with_source(SYSTEM)
                .with_relation(stored_edge(AssignmentType::Members, "m-U1", ObjectType::User))
                .with_relation(stored_edge(AssignmentType::Members, "m-V", ObjectType::User))
                .into(),
        )
        .await;
    harness
        .destination
        .insert(
            Group::new("payroll")
                .with_id(mid("m-Z"))
                .with_external_id(ExternalId::new("Z", "HR").unwrap())
                .with_source("HR")
                .with_relation(stored_edge(AssignmentType::Members, "m-U1", ObjectType::User))
                .into(),
        )
        .await;

    let summary = harness.run().await;

    let commands = harness.destination.commands().await;
    let messages = relation_messages(&commands);
    assert_eq!(messages.len(), 1);
    let body = messages[0].body();
    assert_eq!(body.object.maverick_id, Some(mid("m-G")));
    assert!(body.added.is_empty());
    assert_eq!(body.removed.len(), 1);
    assert_eq!(body.removed[0].maverick_id, Some(mid("m-V")));

    let step = &summary.steps[relation_step(&summary, ObjectType::Group)];
    assert_eq!(step.counts.relations_removed, 1);

    let engineering = harness.destination.get(&mid("m-G")).await.unwrap();
    assert_eq!(engineering.related_objects().len(), 1);
    let payroll = harness.destination.get(&mid("m-Z")).await.unwrap();
    assert_eq!(payroll.related_objects().len(), 1);
}

#[tokio::test]
async fn test_role_function_relations_are_unsupported() {
    let config = config_with(
        r#"
[[sync.entities]]
object_type = "function"
operations = ["all"]

[[sync.entities]]
object_type = "role"
operations = ["all"]
relations = ["add"]
"#,
    );
    let role: SyncEntity = Role::new("approver")
        .with_external_id(ldap("R1"))
        .with_relation(edge_to(AssignmentType::AssignedTo, "F1", ObjectType::Function))
        .into();
    let function: SyncEntity = Function::new("accounting").with_external_id(ldap("F1")).into();
    let harness = Harness::new(config, vec![function, role]);

    let summary = harness.run().await;

    assert!(relation_messages(&harness.destination.commands().await).is_empty());
    let step = &summary.steps[relation_step(&summary, ObjectType::Role)];
    assert_eq!(step.status, StepStatus::Failure);
    assert!(step.errors.iter().any(|e| e.contains("Unsupported")));
    assert_eq!(summary.totals.create, 2);
}

#[tokio::test]
async fn test_failed_group_step_aborts_its_relation_step() {
    let group: SyncEntity = Group::new("engineering")
        .with_external_id(ldap("G"))
        .with_relation(edge_to(AssignmentType::Members, "U1", ObjectType::User))
        .into();
    let harness = Harness::new(
        config_with(USERS_AND_GROUPS),
        vec![User::new("alice").with_external_id(ldap("U1")).into(), group],
    );
    harness
        .destination
        .insert(
            Group::new("old")
                .with_id(mid("m-old"))
                .with_external_id(ldap("OLD"))
                .with_source(SYSTEM)
                .into(),
        )
        .await;
    harness.destination.reject_commands("create").await;
    harness.destination.reject_commands("delete").await;

    let summary = harness.run().await;

    let group_step = summary
        .steps
        .iter()
        .find(|s| s.kind == StepKind::Entities(ObjectType::Group))
        .unwrap();
    assert_eq!(group_step.status, StepStatus::Failure);
    let step = &summary.steps[relation_step(&summary, ObjectType::Group)];
    assert_eq!(step.status, StepStatus::Aborted);
}

#[tokio::test]
async fn test_member_synced_in_an_earlier_run_is_kept() {
    let config = config_with(
        r#"
[[sync.entities]]
object_type = "group"
operations = ["all"]
relations = ["add", "delete"]
"#,
    );
    let group: SyncEntity = Group::new("engineering")
        .with_external_id(ldap("G"))
        .with_relation(edge_to(AssignmentType::Members, "U1", ObjectType::User))
        .into();
    let harness = Harness::new(config, vec![group]);

    harness
        .destination
        .insert(
            User::new("alice")
                .with_id(mid("m-U1"))
                .with_external_id(ldap("U1"))
                .with_source(SYSTEM)
                .into(),
        )
        .await;
    harness
        .destination
        .insert(
            Group::new("engineering")
                .with_id(mid("m-G"))
                .with_external_id(ldap("G"))
                .with_source(SYSTEM)
                .with_relation(stored_edge(AssignmentType::Members, "m-U1", ObjectType::User))
                .into(),
        )
        .await;

    for _ in 0..2 {
        let summary = harness.run().await;
        let step = &summary.steps[relation_step(&summary, ObjectType::Group)];
        assert_eq!(step.status, StepStatus::Success);
        assert_eq!(step.counts.relations_added, 0);
        assert_eq!(step.counts.relations_removed, 0);
    }

    assert!(relation_messages(&harness.destination.commands().await).is_empty());
    let stored = harness.destination.get(&mid("m-G")).await.unwrap();
    assert_eq!(stored.related_objects().len(), 1);
}

#[tokio::test]
async fn test_second_run_sends_no_relation_messages() {
    let group: SyncEntity = Group::new("engineering")
        .with_external_id(ldap("G1"))
        .with_relation(edge_to(AssignmentType::Members, "U1", ObjectType::User))
        .with_relation(edge_to(AssignmentType::Members, "U2", ObjectType::User))
        .into();
    let harness = Harness::new(
        config_with(USERS_AND_GROUPS),
        vec![
            User::new("alice").with_external_id(ldap("U1")).into(),
            User::new("bob").with_external_id(ldap("U2")).into(),
            group,
        ],
    );

    harness.run().await;
    let published = relation_messages(&harness.destination.commands().await).len();
    assert_eq!(published, 1);

    let second = harness.run().await;

    assert_eq!(
        relation_messages(&harness.destination.commands().await).len(),
        published
    );
    let step = &second.steps[relation_step(&second, ObjectType::Group)];
    assert_eq!(step.status, StepStatus::Success);
    assert_eq!(step.counts.relations_added, 0);
    assert_eq!(step.counts.relations_removed, 0);
}
