//! Commands sent to the destination system
//!
//! Every create/update/delete decision and every relation delta becomes a
//! [`SyncCommand`] handed to a command publisher. Relation messages are a
//! tagged enum keyed by [`RelationMessageKind`].

use super::diff::ChangedFields;
use super::entity::{ObjectType, SyncEntity};
use super::ids::{CommandId, CorrelationId, MaverickId};
use super::relation::{LookUpObject, ObjectRelation, Relation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one published command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: CommandId,

    pub success: bool,

    /// Destination id of the affected entity, when known
    #[serde(default)]
    pub entity_id: Option<MaverickId>,

    #[serde(default)]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn succeeded(command_id: CommandId, entity_id: Option<MaverickId>) -> Self {
        Self {
            command_id,
            success: true,
            entity_id,
            error: None,
        }
    }

    pub fn failed(command_id: CommandId, error: impl Into<String>) -> Self {
        Self {
            command_id,
            success: false,
            entity_id: None,
            error: Some(error.into()),
        }
    }
}

/// Kind of a relation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationMessageKind {
    /// Object assignment (membership, hierarchy, role assignment)
    Assignment,
    /// Role/function property propagation
    FunctionProperties,
}

impl RelationMessageKind {
    /// Message kind carrying relations between the two object types
    pub fn for_pair(origin: ObjectType, related: ObjectType) -> Self {
        match (origin, related) {
            (ObjectType::Role, ObjectType::Function) | (ObjectType::Function, ObjectType::Role) => {
                RelationMessageKind::FunctionProperties
            }
            _ => RelationMessageKind::Assignment,
        }
    }
}

impl fmt::Display for RelationMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationMessageKind::Assignment => f.write_str("assignment"),
            RelationMessageKind::FunctionProperties => f.write_str("function_properties"),
        }
    }
}

/// Added and removed edges of one parent object, sent as a single message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAssignmentMessage {
    pub command_id: CommandId,

    pub correlation_id: CorrelationId,

    /// The parent object
    pub object: LookUpObject,

    #[serde(default)]
    pub added: Vec<ObjectRelation>,

    #[serde(default)]
    pub removed: Vec<ObjectRelation>,
}

impl ObjectAssignmentMessage {
    /// Number of edge changes carried
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Relation message dispatched to the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationMessage {
    Assignment(ObjectAssignmentMessage),
    FunctionProperties(ObjectAssignmentMessage),
}

impl RelationMessage {
    pub fn new(kind: RelationMessageKind, message: ObjectAssignmentMessage) -> Self {
        match kind {
            RelationMessageKind::Assignment => RelationMessage::Assignment(message),
            RelationMessageKind::FunctionProperties => RelationMessage::FunctionProperties(message),
        }
    }

    pub fn kind(&self) -> RelationMessageKind {
        match self {
            RelationMessage::Assignment(_) => RelationMessageKind::Assignment,
            RelationMessage::FunctionProperties(_) => RelationMessageKind::FunctionProperties,
        }
    }

    pub fn body(&self) -> &ObjectAssignmentMessage {
        match self {
            RelationMessage::Assignment(m) | RelationMessage::FunctionProperties(m) => m,
        }
    }

    pub fn command_id(&self) -> CommandId {
        self.body().command_id
    }
}

/// A relation message together with the relations it was built from and the
/// outcome of dispatching it
#[derive(Debug, Clone)]
pub struct RelationProcessingObject {
    pub message: RelationMessage,

    pub relations: Vec<Relation>,

    /// `None` until dispatched
    pub result: Option<CommandResult>,
}

impl RelationProcessingObject {
    pub fn is_success(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.success)
    }

    /// (added, removed) edge counts of the message
    pub fn edge_counts(&self) -> (usize, usize) {
        let body = self.message.body();
        (body.added.len(), body.removed.len())
    }
}

/// Command published to the destination system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SyncCommand {
    Create {
        command_id: CommandId,
        correlation_id: CorrelationId,
        entity: SyncEntity,
    },
    Update {
        command_id: CommandId,
        correlation_id: CorrelationId,
        entity: SyncEntity,
        changed_fields: ChangedFields,
    },
    Delete {
        command_id: CommandId,
        correlation_id: CorrelationId,
        object_type: ObjectType,
        id: MaverickId,
    },
    Relations {
        message: RelationMessage,
    },
}

impl SyncCommand {
    pub fn command_id(&self) -> CommandId {
        match self {
            SyncCommand::Create { command_id, .. }
            | SyncCommand::Update { command_id, .. }
            | SyncCommand::Delete { command_id, .. } => *command_id,
            SyncCommand::Relations { message } => message.command_id(),
        }
    }

    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            SyncCommand::Create { .. } => "create",
            SyncCommand::Update { .. } => "update",
            SyncCommand::Delete { .. } => "delete",
            SyncCommand::Relations { .. } => "relations",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::User;

    #[test]
    fn test_role_function_pairs_map_to_function_properties() {
        assert_eq!(
            RelationMessageKind::for_pair(ObjectType::Role, ObjectType::Function),
            RelationMessageKind::FunctionProperties
        );
        assert_eq!(
            RelationMessageKind::for_pair(ObjectType::Function, ObjectType::Role),
            RelationMessageKind::FunctionProperties
        );
        assert_eq!(
            RelationMessageKind::for_pair(ObjectType::User, ObjectType::Role),
            RelationMessageKind::Assignment
        );
    }

    #[test]
    fn test_command_serialization_is_tagged() {
        let cmd = SyncCommand::Create {
            command_id: CommandId::new(),
            correlation_id: CorrelationId::new(),
            entity: User::new("alice").into(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "create");
        assert_eq!(json["entity"]["object_type"], "user");
        assert_eq!(cmd.name(), "create");
    }

    #[test]
    fn test_command_result_constructors() {
        let id = CommandId::new();
        let ok = CommandResult::succeeded(id, None);
        assert!(ok.success);
        let failed = CommandResult::failed(id, "rejected");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("rejected"));
    }
}
