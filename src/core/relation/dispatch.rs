//! Relation message dispatch
//!
//! Added and removed relations are grouped by parent object and message kind.
//! All changes of one parent end up in a single message, so a parent never
//! receives two messages with partial add/remove sets. Messages of different
//! parents are published concurrently.

use crate::adapters::destination::CommandPublisher;
use crate::domain::command::{
    CommandResult, ObjectAssignmentMessage, RelationMessage, RelationMessageKind,
    RelationProcessingObject, SyncCommand,
};
use crate::domain::errors::SyncError;
use crate::domain::ids::{CommandId, CorrelationId};
use crate::domain::relation::{LookUpObject, ObjectRelation, Relation};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Changes of one parent for one message kind
struct PendingMessage {
    kind: RelationMessageKind,
    object: LookUpObject,
    added: Vec<ObjectRelation>,
    removed: Vec<ObjectRelation>,
    relations: Vec<Relation>,
}

impl PendingMessage {
    fn push(edges: &mut Vec<ObjectRelation>, edge: &ObjectRelation) {
        let duplicate = edges.iter().any(|e| {
            e.assignment_type == edge.assignment_type && e.target().same_object(&edge.target())
        });
        if !duplicate {
            edges.push(edge.clone());
        }
    }
}

/// Key identifying the parent object of a relation
fn parent_key(object: &LookUpObject) -> String {
    match (&object.maverick_id, &object.external_id) {
        (Some(id), _) => format!("id:{id}"),
        (None, Some(ext)) => format!("ext:{}:{}", ext.source.to_lowercase(), ext.id),
        (None, None) => format!("unknown:{}", object.object_type),
    }
}

/// Groups relation changes into messages and publishes them
pub struct RelationDispatcher {
    publisher: Arc<dyn CommandPublisher>,
}

impl RelationDispatcher {
    pub fn new(publisher: Arc<dyn CommandPublisher>) -> Self {
        Self { publisher }
    }

    /// Coalesces `added` and `removed` into one message per parent and kind
    ///
    /// Messages keep the order in which their parents first appear.
    pub fn build_messages(
        added: &[Relation],
        removed: &[Relation],
        correlation_id: CorrelationId,
    ) -> Vec<RelationProcessingObject> {
        let mut pending: Vec<PendingMessage> = Vec::new();
        let mut index: HashMap<(String, RelationMessageKind), usize> = HashMap::new();

        let changes = added
            .iter()
            .map(|r| (r, true))
            .chain(removed.iter().map(|r| (r, false)));

        for (relation, is_add) in changes {
            let parent = &relation.original_object;
            for edge in &relation.related_objects {
                let kind = RelationMessageKind::for_pair(parent.object_type, edge.object_type);
                let slot = *index
                    .entry((parent_key(parent), kind))
                    .or_insert_with(|| {
                        pending.push(PendingMessage {
                            kind,
                            object: parent.clone(),
                            added: Vec::new(),
                            removed: Vec::new(),
                            relations: Vec::new(),
                        });
                        pending.len() - 1
                    });

                let message = &mut pending[slot];
                if is_add {
                    PendingMessage::push(&mut message.added, edge);
                } else {
                    PendingMessage::push(&mut message.removed, edge);
                }
                if !message.relations.contains(relation) {
                    message.relations.push(relation.clone());
                }
            }
        }

        pending
            .into_iter()
            .map(|p| RelationProcessingObject {
                message: RelationMessage::new(
                    p.kind,
                    ObjectAssignmentMessage {
                        command_id: CommandId::new(),
                        correlation_id,
                        object: p.object,
                        added: p.added,
                        removed: p.removed,
                    },
                ),
                relations: p.relations,
                result: None,
            })
            .collect()
    }

    /// Builds the messages and publishes them concurrently
    ///
    /// Every message gets a result; a failed publish becomes a failed result.
    /// Function property messages fail with an unsupported-operation error.
    pub async fn dispatch(
        &self,
        added: Vec<Relation>,
        removed: Vec<Relation>,
        correlation_id: CorrelationId,
    ) -> Vec<RelationProcessingObject> {
        let messages = Self::build_messages(&added, &removed, correlation_id);

        let sends = messages.into_iter().map(|mut processing| async move {
            let command_id = processing.message.command_id();
            let outcome = self.send(&processing.message).await;
            processing.result = Some(match outcome {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        command_id = %command_id,
                        kind = %processing.message.kind(),
                        error = %e,
                        "Relation message failed"
                    );
                    CommandResult::failed(command_id, e.to_string())
                }
            });
            processing
        });

        join_all(sends).await
    }

    async fn send(&self, message: &RelationMessage) -> Result<CommandResult, SyncError> {
        match message {
            RelationMessage::Assignment(_) => {
                self.publisher
                    .publish(SyncCommand::Relations {
                        message: message.clone(),
                    })
                    .await
            }
            RelationMessage::FunctionProperties(body) => Err(SyncError::Unsupported(format!(
                "role/function property propagation for {} {}",
                body.object.object_type,
                parent_key(&body.object)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::destination::InMemoryDestination;
    use crate::domain::entity::ObjectType;
    use crate::domain::ids::ExternalId;
    use crate::domain::relation::{AssignmentType, RelationIntent};

    fn ldap(id: &str) -> ExternalId {
        ExternalId::new(id, "LDAP").unwrap()
    }

    fn relation(parent: &str, object_type: ObjectType, edges: Vec<ObjectRelation>) -> Relation {
        let mut r = Relation::new(LookUpObject {
            external_id: Some(ldap(parent)),
            maverick_id: None,
            source: "LDAP".to_string(),
            object_type,
        });
        r.related_objects = edges;
        r
    }

    fn child(id: &str) -> ObjectRelation {
        ObjectRelation::external(AssignmentType::ParentsToChild, ldap(id), ObjectType::Group)
    }

    #[test]
    fn test_adds_and_removes_of_one_parent_share_a_message() {
        let added = vec![
            relation("P", ObjectType::Group, vec![child("A")]).with_intent(RelationIntent::Added),
            relation("P", ObjectType::Group, vec![child("B")]).with_intent(RelationIntent::Added),
        ];
        let removed = vec![
            relation("P", ObjectType::Group, vec![child("C")]).with_intent(RelationIntent::Deleted),
        ];

        let messages =
            RelationDispatcher::build_messages(&added, &removed, CorrelationId::new());

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].edge_counts(), (2, 1));
        assert_eq!(messages[0].relations.len(), 3);
    }

    #[test]
    fn test_duplicate_edges_are_sent_once() {
        let added = vec![
            relation("P", ObjectType::Group, vec![child("A"), child("A")]),
            relation("Q", ObjectType::Group, vec![child("A")]),
        ];

        let messages = RelationDispatcher::build_messages(&added, &[], CorrelationId::new());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].edge_counts(), (1, 0));
        assert_eq!(messages[1].edge_counts(), (1, 0));
    }

    #[tokio::test]
    async fn test_role_function_messages_are_unsupported() {
        let role_to_function = relation(
            "R",
            ObjectType::Role,
            vec![ObjectRelation::external(
                AssignmentType::Assignments,
                ldap("F"),
                ObjectType::Function,
            )],
        );
        let role_to_user = relation(
            "R",
            ObjectType::Role,
            vec![ObjectRelation::external(
                AssignmentType::Assignments,
                ldap("U"),
                ObjectType::User,
            )],
        );

        let dispatcher = RelationDispatcher::new(Arc::new(InMemoryDestination::new()));
        let results = dispatcher
            .dispatch(
                vec![role_to_function, role_to_user],
                Vec::new(),
                CorrelationId::new(),
            )
            .await;

        assert_eq!(results.len(), 2);
        let unsupported = results
            .iter()
            .find(|r| r.message.kind() == RelationMessageKind::FunctionProperties)
            .unwrap();
        assert!(!unsupported.is_success());
        assert!(unsupported
            .result
            .as_ref()
            .and_then(|r| r.error.as_deref())
            .unwrap()
            .starts_with("Unsupported operation"));
    }
}
