//! Relation graphs
//!
//! A graph is the list of [`Relation`]s of one object kind: one relation per
//! origin object with its outgoing edges. The current graph is built from the
//! entities staged during the run, the destination graph from the stored
//! entities. Comparing both yields the edges to add and to remove.

use crate::domain::entity::{ObjectType, SyncEntity};
use crate::domain::ids::{ExternalId, MaverickId};
use crate::domain::relation::{
    AssignmentType, LookUpObject, ObjectRef, ObjectRelation, Relation, RelationIntent,
};

/// Relations of one object kind
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    relations: Vec<Relation>,
}

impl RelationGraph {
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// Builds the graph stored in the destination
    ///
    /// Origins are identified by their destination id and, when present, the
    /// external id of `system`.
    pub fn from_destination(entities: &[SyncEntity], system: &str) -> Self {
        let relations = entities
            .iter()
            .map(|entity| {
                let origin = look_up_object(entity, system, entity.header().source.clone());
                let mut relation = Relation::new(origin);
                relation.related_objects = entity.related_objects().to_vec();
                relation
            })
            .filter(|r| !r.is_empty())
            .collect();
        Self { relations }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Number of edges over all relations
    pub fn edge_count(&self) -> usize {
        self.relations.iter().map(|r| r.related_objects.len()).sum()
    }

    /// Whether the edge `origin -t-> target` exists in either direction
    ///
    /// `(A, B, t)` is satisfied by `(A, B, t)` or by `(B, A, opposite(t))`.
    pub fn has_edge(
        &self,
        origin: &ObjectRef<'_>,
        target: &ObjectRef<'_>,
        assignment_type: AssignmentType,
    ) -> bool {
        self.relations.iter().any(|relation| {
            let from = relation.origin();
            (from.same_object(origin) && relation.has_edge(target, assignment_type))
                || (from.same_object(target)
                    && relation.has_edge(origin, assignment_type.opposite()))
        })
    }

    /// Edges of this graph that `other` lacks, one [`RelationIntent::Added`]
    /// relation per origin
    pub fn missing_from(&self, other: &RelationGraph) -> Vec<Relation> {
        self.relations
            .iter()
            .filter_map(|relation| {
                let origin = relation.origin();
                let missing: Vec<ObjectRelation> = relation
                    .related_objects
                    .iter()
                    .filter(|edge| !other.has_edge(&origin, &edge.target(), edge.assignment_type))
                    .cloned()
                    .collect();
                coalesce(relation, missing, RelationIntent::Added)
            })
            .collect()
    }

    /// Edges of this (destination) graph that the `current` graph no longer
    /// has, one [`RelationIntent::Deleted`] relation per origin
    ///
    /// Only origins owned by `system` that appear in `seen` are considered:
    /// edges of other systems and of objects the run did not reconcile stay
    /// untouched.
    pub fn stale_in(
        &self,
        current: &RelationGraph,
        seen: &[LookUpObject],
        system: &str,
    ) -> Vec<Relation> {
        self.relations
            .iter()
            .filter(|relation| relation.original_object.source.eq_ignore_ascii_case(system))
            .filter(|relation| {
                let origin = relation.origin();
                seen.iter().any(|s| ref_of(s).same_object(&origin))
            })
            .filter_map(|relation| {
                let origin = relation.origin();
                let stale: Vec<ObjectRelation> = relation
                    .related_objects
                    .iter()
                    .filter(|edge| {
                        !current.has_edge(&origin, &edge.target(), edge.assignment_type)
                    })
                    .cloned()
                    .collect();
                coalesce(relation, stale, RelationIntent::Deleted)
            })
            .collect()
    }
}

/// The graph of the entities staged this run
pub struct CurrentGraph {
    /// Relations with at least one edge
    pub graph: RelationGraph,
    /// Every staged origin, including those without edges
    pub seen: Vec<LookUpObject>,
    /// Edges whose target could not be resolved to a destination id
    pub unresolved: usize,
}

impl CurrentGraph {
    /// Builds the relations of `entities`, resolving the destination ids of
    /// related objects against every staged entity of the run
    pub fn build(entities: &[SyncEntity], staged: &[SyncEntity], system: &str) -> Self {
        let mut seen = Vec::with_capacity(entities.len());
        let mut relations = Vec::new();
        let mut unresolved = 0;

        for entity in entities {
            let origin = look_up_object(entity, system, system.to_string());
            seen.push(origin.clone());

            let mut relation = Relation::new(origin);
            for edge in entity.related_objects() {
                let mut edge = edge.clone();
                if edge.maverick_id.is_none() {
                    edge.maverick_id = resolve(&edge, staged);
                    if edge.maverick_id.is_none() {
                        unresolved += 1;
                        tracing::debug!(
                            origin = entity.label(),
                            target = ?edge.external_id,
                            object_type = %edge.object_type,
                            "Related object not staged in this run"
                        );
                    }
                }
                relation.related_objects.push(edge);
            }

            if !relation.is_empty() {
                relations.push(relation);
            }
        }

        Self {
            graph: RelationGraph::new(relations),
            seen,
            unresolved,
        }
    }

    /// Related objects still lacking a destination id, without duplicates
    pub fn unresolved_targets(&self) -> Vec<(ExternalId, ObjectType)> {
        let mut targets: Vec<(ExternalId, ObjectType)> = Vec::new();
        for edge in self.graph.relations.iter().flat_map(|r| &r.related_objects) {
            if edge.maverick_id.is_some() {
                continue;
            }
            if let Some(ext) = &edge.external_id {
                let target = (ext.clone(), edge.object_type);
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        targets
    }

    /// Resolves the remaining related objects against `known` destination
    /// entities
    pub fn resolve_with(&mut self, known: &[SyncEntity]) {
        let mut unresolved = 0;
        for edge in self
            .graph
            .relations
            .iter_mut()
            .flat_map(|r| r.related_objects.iter_mut())
        {
            if edge.maverick_id.is_none() {
                edge.maverick_id = resolve(edge, known);
                if edge.maverick_id.is_none() {
                    unresolved += 1;
                }
            }
        }
        self.unresolved = unresolved;
    }
}

fn look_up_object(entity: &SyncEntity, system: &str, source: String) -> LookUpObject {
    LookUpObject {
        external_id: entity.external_id_for(system).cloned(),
        maverick_id: entity.id().cloned(),
        source,
        object_type: entity.object_type(),
    }
}

fn ref_of(object: &LookUpObject) -> ObjectRef<'_> {
    ObjectRef {
        maverick_id: object.maverick_id.as_ref(),
        external_id: object.external_id.as_ref(),
    }
}

fn resolve(edge: &ObjectRelation, staged: &[SyncEntity]) -> Option<MaverickId> {
    let ext = edge.external_id.as_ref()?;
    staged
        .iter()
        .filter(|e| e.object_type() == edge.object_type)
        .find(|e| {
            e.external_id_for(&ext.source)
                .is_some_and(|own| own.id == ext.id)
        })
        .and_then(|e| e.id().cloned())
}

fn coalesce(
    relation: &Relation,
    edges: Vec<ObjectRelation>,
    intent: RelationIntent,
) -> Option<Relation> {
    if edges.is_empty() {
        return None;
    }
    let mut coalesced = Relation::new(relation.original_object.clone()).with_intent(intent);
    coalesced.related_objects = edges;
    Some(coalesced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Group, ObjectType, User};
    use crate::domain::ids::ExternalId;

    fn ldap(id: &str) -> ExternalId {
        ExternalId::new(id, "LDAP").unwrap()
    }

    fn mid(id: &str) -> MaverickId {
        MaverickId::new(id).unwrap()
    }

    fn edge(t: AssignmentType, target: &str, object_type: ObjectType) -> ObjectRelation {
        ObjectRelation::external(t, ldap(target), object_type)
    }

    fn stored(edge_target: &str, t: AssignmentType, id: &str, ext: &str) -> SyncEntity {
        let mut e = edge(t, edge_target, ObjectType::Group);
        e.maverick_id = Some(mid(&format!("m-{edge_target}")));
        Group::new(ext)
            .with_id(mid(id))
            .with_external_id(ldap(ext))
            .with_source("LDAP")
            .with_relation(e)
            .into()
    }

    #[test]
    fn test_unstaged_targets_resolve_against_destination() {
        let staged: Vec<SyncEntity> = vec![Group::new("team")
            .with_id(mid("m-G"))
            .with_external_id(ldap("G"))
            .with_relation(edge(AssignmentType::Members, "U1", ObjectType::User))
            .with_relation(edge(AssignmentType::Members, "U1", ObjectType::User))
            .into()];
        let mut current = CurrentGraph::build(&staged, &staged, "LDAP");
        assert_eq!(current.unresolved, 2);
        assert_eq!(current.unresolved_targets(), vec![(ldap("U1"), ObjectType::User)]);

        let known: Vec<SyncEntity> = vec![User::new("alice")
            .with_id(mid("m-U1"))
            .with_external_id(ldap("U1"))
            .into()];
        current.resolve_with(&known);

        assert_eq!(current.unresolved, 0);
        assert!(current.unresolved_targets().is_empty());
        assert!(current.graph.relations()[0]
            .related_objects
            .iter()
            .all(|e| e.maverick_id == Some(mid("m-U1"))));
    }

    #[test]
    fn test_current_graph_resolves_staged_targets() {
        let staged: Vec<SyncEntity> = vec![
            Group::new("parent")
                .with_id(mid("m-P"))
                .with_external_id(ldap("P"))
                .with_relation(edge(AssignmentType::Members, "U1", ObjectType::User))
                .with_relation(edge(AssignmentType::Members, "U2", ObjectType::User))
                .into(),
            User::new("alice")
                .with_id(mid("m-U1"))
                .with_external_id(ldap("U1"))
                .into(),
            Group::new("lonely").with_external_id(ldap("L")).into(),
        ];
        let groups: Vec<SyncEntity> = staged
            .iter()
            .filter(|e| e.object_type() == ObjectType::Group)
            .cloned()
            .collect();

        let current = CurrentGraph::build(&groups, &staged, "LDAP");

        assert_eq!(current.graph.len(), 1);
        assert_eq!(current.seen.len(), 2);
        assert_eq!(current.unresolved, 1);
        let edges = &current.graph.relations()[0].related_objects;
        assert_eq!(edges[0].maverick_id, Some(mid("m-U1")));
        assert_eq!(edges[1].maverick_id, None);
    }

    #[test]
    fn test_opposite_direction_satisfies_edge() {
        // Destination stores Y -> X as ParentsToChild
        let destination = RelationGraph::from_destination(
            &[stored("X", AssignmentType::ParentsToChild, "m-Y", "Y")],
            "LDAP",
        );
        // Source says X -> Y as ChildrenToParent
        let x = ldap("X");
        let y = ldap("Y");
        let x_id = mid("m-X");
        let y_id = mid("m-Y");
        let origin = ObjectRef {
            maverick_id: Some(&x_id),
            external_id: Some(&x),
        };
        let target = ObjectRef {
            maverick_id: Some(&y_id),
            external_id: Some(&y),
        };

        assert!(destination.has_edge(&origin, &target, AssignmentType::ChildrenToParent));
        assert!(!destination.has_edge(&origin, &target, AssignmentType::ParentsToChild));
    }

    #[test]
    fn test_missing_edges_are_coalesced_per_origin() {
        let staged: Vec<SyncEntity> = vec![Group::new("parent")
            .with_id(mid("m-P"))
            .with_external_id(ldap("P"))
            .with_relation(edge(AssignmentType::ParentsToChild, "C1", ObjectType::Group))
            .with_relation(edge(AssignmentType::ParentsToChild, "C2", ObjectType::Group))
            .into()];
        let current = CurrentGraph::build(&staged, &staged, "LDAP");

        let added = current.graph.missing_from(&RelationGraph::default());

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].intent, RelationIntent::Added);
        assert_eq!(added[0].related_objects.len(), 2);
    }

    #[test]
    fn test_stale_edges_only_for_seen_origins_of_current_system() {
        let destination = RelationGraph::from_destination(
            &[
                stored("C1", AssignmentType::ParentsToChild, "m-P", "P"),
                stored("C2", AssignmentType::ParentsToChild, "m-Q", "Q"),
                Group::new("hr")
                    .with_id(mid("m-H"))
                    .with_source("Workday")
                    .with_relation(edge(AssignmentType::ParentsToChild, "C3", ObjectType::Group))
                    .into(),
            ],
            "LDAP",
        );
        let staged: Vec<SyncEntity> = vec![
            Group::new("P").with_id(mid("m-P")).with_external_id(ldap("P")).into(),
            Group::new("H").with_id(mid("m-H")).into(),
        ];
        let current = CurrentGraph::build(&staged, &staged, "LDAP");

        let removed = destination.stale_in(&current.graph, &current.seen, "LDAP");

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].intent, RelationIntent::Deleted);
        assert_eq!(removed[0].original_object.maverick_id, Some(mid("m-P")));
        assert_eq!(destination.edge_count(), 3);
    }
}
