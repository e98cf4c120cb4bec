//! In-memory destination store
//!
//! Answers queries from a map of entities and applies published commands to
//! it, the way the Maverick command handlers would. Every published command
//! is recorded so tests can assert on exactly what a run sent.

use super::traits::{CommandPublisher, DestinationRead};
use crate::domain::command::{CommandResult, ObjectAssignmentMessage, RelationMessage, SyncCommand};
use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::errors::{DestinationError, SyncError};
use crate::domain::filter::{Filter, KeyProperties};
use crate::domain::ids::MaverickId;
use crate::domain::relation::ObjectRelation;
use crate::domain::{Page, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// Destination store held in memory
#[derive(Default)]
pub struct InMemoryDestination {
    entities: RwLock<BTreeMap<MaverickId, SyncEntity>>,
    commands: RwLock<Vec<SyncCommand>>,
    rejected: RwLock<HashSet<&'static str>>,
}

impl InMemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entity as-is, assigning an id when it has none
    pub async fn insert(&self, mut entity: SyncEntity) -> MaverickId {
        let id = entity.id().cloned().unwrap_or_else(MaverickId::generate);
        entity.header_mut().id = Some(id.clone());
        self.entities.write().await.insert(id.clone(), entity);
        id
    }

    pub async fn get(&self, id: &MaverickId) -> Option<SyncEntity> {
        self.entities.read().await.get(id).cloned()
    }

    /// Every stored entity, ordered by id
    pub async fn entities(&self) -> Vec<SyncEntity> {
        self.entities.read().await.values().cloned().collect()
    }

    /// Every command published so far, in publishing order
    pub async fn commands(&self) -> Vec<SyncCommand> {
        self.commands.read().await.clone()
    }

    /// Makes every later command named `name` (see [`SyncCommand::name`])
    /// fail with a rejection
    pub async fn reject_commands(&self, name: &'static str) {
        self.rejected.write().await.insert(name);
    }

    fn apply(
        entities: &mut BTreeMap<MaverickId, SyncEntity>,
        command: &SyncCommand,
    ) -> CommandResult {
        let command_id = command.command_id();
        match command {
            SyncCommand::Create { entity, .. } => {
                let mut entity = entity.clone();
                let id = MaverickId::generate();
                entity.header_mut().id = Some(id.clone());
                entities.insert(id.clone(), entity);
                CommandResult::succeeded(command_id, Some(id))
            }
            SyncCommand::Update {
                entity,
                changed_fields,
                ..
            } => {
                let Some(id) = entity.id() else {
                    return CommandResult::failed(command_id, "Update without entity id");
                };
                match entities.get_mut(id) {
                    Some(stored) => {
                        stored.apply_fields(entity, changed_fields);
                        CommandResult::succeeded(command_id, Some(id.clone()))
                    }
                    None => CommandResult::failed(command_id, format!("Entity {id} not found")),
                }
            }
            SyncCommand::Delete { id, .. } => match entities.remove(id) {
                Some(_) => CommandResult::succeeded(command_id, Some(id.clone())),
                None => CommandResult::failed(command_id, format!("Entity {id} not found")),
            },
            SyncCommand::Relations { message } => match message {
                RelationMessage::Assignment(body) => Self::apply_assignment(entities, body),
                RelationMessage::FunctionProperties(_) => CommandResult::failed(
                    command_id,
                    "Function property messages are not handled by this store",
                ),
            },
        }
    }

    fn apply_assignment(
        entities: &mut BTreeMap<MaverickId, SyncEntity>,
        message: &ObjectAssignmentMessage,
    ) -> CommandResult {
        let parent_id = message.object.maverick_id.clone().or_else(|| {
            let ext = message.object.external_id.as_ref()?;
            Self::find_by_external_id(entities, ext.id.as_str(), &ext.source)
        });
        let Some(parent_id) = parent_id else {
            return CommandResult::failed(message.command_id, "Parent object not found");
        };

        let added: Vec<ObjectRelation> = message
            .added
            .iter()
            .map(|r| Self::resolve(entities, r))
            .collect();
        let removed: Vec<ObjectRelation> = message
            .removed
            .iter()
            .map(|r| Self::resolve(entities, r))
            .collect();

        let Some(parent) = entities.get_mut(&parent_id) else {
            return CommandResult::failed(message.command_id, "Parent object not found");
        };
        let related = &mut parent.header_mut().related_objects;
        related.retain(|existing| {
            !removed.iter().any(|r| {
                r.assignment_type == existing.assignment_type
                    && r.target().same_object(&existing.target())
            })
        });
        for relation in added {
            let present = related.iter().any(|existing| {
                existing.assignment_type == relation.assignment_type
                    && existing.target().same_object(&relation.target())
            });
            if !present {
                related.push(relation);
            }
        }

        CommandResult::succeeded(message.command_id, Some(parent_id))
    }

    /// Fills in the destination id of a related object known by external id
    fn resolve(
        entities: &BTreeMap<MaverickId, SyncEntity>,
        relation: &ObjectRelation,
    ) -> ObjectRelation {
        let mut relation = relation.clone();
        if relation.maverick_id.is_none() {
            if let Some(ext) = &relation.external_id {
                relation.maverick_id = Self::find_by_external_id(entities, &ext.id, &ext.source);
            }
        }
        relation
    }

    fn find_by_external_id(
        entities: &BTreeMap<MaverickId, SyncEntity>,
        id: &str,
        source: &str,
    ) -> Option<MaverickId> {
        entities
            .iter()
            .find(|(_, e)| e.external_id_for(source).is_some_and(|x| x.id == id))
            .map(|(k, _)| k.clone())
    }
}

#[async_trait]
impl DestinationRead for InMemoryDestination {
    async fn get_by_filter(&self, key: &KeyProperties) -> Result<Vec<SyncEntity>> {
        Ok(self
            .entities
            .read()
            .await
            .values()
            .filter(|e| key.filter.matches(e))
            .cloned()
            .collect())
    }

    async fn get_batch(
        &self,
        object_type: ObjectType,
        start: usize,
        batch_size: usize,
        filter: Option<&Filter>,
    ) -> Result<Page<SyncEntity>> {
        let entities = self.entities.read().await;
        let selected: Vec<SyncEntity> = entities
            .values()
            .filter(|e| e.object_type() == object_type)
            .filter(|e| filter.map_or(true, |f| f.matches(e)))
            .cloned()
            .collect();
        Ok(Page::slice(&selected, start, batch_size))
    }
}

#[async_trait]
impl CommandPublisher for InMemoryDestination {
    async fn publish(&self, command: SyncCommand) -> Result<CommandResult> {
        self.commands.write().await.push(command.clone());

        if self.rejected.read().await.contains(command.name()) {
            return Err(SyncError::Destination(DestinationError::CommandRejected(
                format!("{} command {} rejected", command.name(), command.command_id()),
            )));
        }

        let mut entities = self.entities.write().await;
        Ok(Self::apply(&mut entities, &command))
    }
}
