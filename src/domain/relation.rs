//! Relation model
//!
//! A relation is a directed edge from an origin object to a related object,
//! labelled with an [`AssignmentType`]. Direction matters: "parent has child"
//! and "child has parent" are distinct labels for the same edge, so any diff
//! between two relation graphs has to check both the edge and its opposite.

use super::entity::ObjectType;
use super::ids::{ExternalId, MaverickId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction-labelled relation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    /// Origin is the parent of the related object
    ParentsToChild,
    /// Origin is a child of the related object
    ChildrenToParent,
    /// Origin is a member of the related object (user -> group)
    MemberOf,
    /// Related object is a member of the origin (group -> user)
    Members,
    /// Origin is assigned to the related object (user -> role/function)
    AssignedTo,
    /// Related object is assigned to the origin (role/function -> user)
    Assignments,
}

impl AssignmentType {
    /// The label describing the same edge seen from the related object
    ///
    /// `opposite` is an involution: `t.opposite().opposite() == t`.
    pub fn opposite(self) -> Self {
        match self {
            AssignmentType::ParentsToChild => AssignmentType::ChildrenToParent,
            AssignmentType::ChildrenToParent => AssignmentType::ParentsToChild,
            AssignmentType::MemberOf => AssignmentType::Members,
            AssignmentType::Members => AssignmentType::MemberOf,
            AssignmentType::AssignedTo => AssignmentType::Assignments,
            AssignmentType::Assignments => AssignmentType::AssignedTo,
        }
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignmentType::ParentsToChild => "parents_to_child",
            AssignmentType::ChildrenToParent => "children_to_parent",
            AssignmentType::MemberOf => "member_of",
            AssignmentType::Members => "members",
            AssignmentType::AssignedTo => "assigned_to",
            AssignmentType::Assignments => "assignments",
        };
        f.write_str(s)
    }
}

/// Synchronization intent of a relation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationIntent {
    /// Plain relation as read from a graph
    #[default]
    Relation,
    /// Edges to be created in the destination
    Added,
    /// Edges to be removed from the destination
    Deleted,
}

/// Reference to the origin object of a relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookUpObject {
    /// Current-system external id, when known
    pub external_id: Option<ExternalId>,

    /// Destination id, when resolved
    pub maverick_id: Option<MaverickId>,

    /// System the origin object belongs to
    pub source: String,

    /// Kind of the origin object
    pub object_type: ObjectType,
}

/// Edge to one related object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRelation {
    /// Label of the edge, seen from the origin
    pub assignment_type: AssignmentType,

    /// Destination id of the related object, when resolved
    #[serde(default)]
    pub maverick_id: Option<MaverickId>,

    /// External id of the related object, when known
    #[serde(default)]
    pub external_id: Option<ExternalId>,

    /// Kind of the related object
    pub object_type: ObjectType,
}

impl ObjectRelation {
    /// Relation to an object known only by its external id
    pub fn external(
        assignment_type: AssignmentType,
        external_id: ExternalId,
        object_type: ObjectType,
    ) -> Self {
        Self {
            assignment_type,
            maverick_id: None,
            external_id: Some(external_id),
            object_type,
        }
    }

    /// Reference to the related object as an origin-shaped ref
    pub fn target(&self) -> ObjectRef<'_> {
        ObjectRef {
            maverick_id: self.maverick_id.as_ref(),
            external_id: self.external_id.as_ref(),
        }
    }
}

/// Borrowed identity of an object, used to compare objects across graphs
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    /// Destination id, when resolved
    pub maverick_id: Option<&'a MaverickId>,
    /// External id, when known
    pub external_id: Option<&'a ExternalId>,
}

impl ObjectRef<'_> {
    /// Two refs name the same object when both destination ids are present
    /// and equal, otherwise when both external ids are present and equal.
    pub fn same_object(&self, other: &ObjectRef<'_>) -> bool {
        if let (Some(a), Some(b)) = (self.maverick_id, other.maverick_id) {
            return a == b;
        }
        match (self.external_id, other.external_id) {
            (Some(a), Some(b)) => a.id == b.id && a.belongs_to(&b.source),
            _ => false,
        }
    }
}

/// One origin object and its related objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Synchronization intent
    #[serde(default)]
    pub intent: RelationIntent,

    /// The origin object
    pub original_object: LookUpObject,

    /// Edges from the origin
    pub related_objects: Vec<ObjectRelation>,
}

impl Relation {
    /// Creates a plain relation with no edges yet
    pub fn new(original_object: LookUpObject) -> Self {
        Self {
            intent: RelationIntent::Relation,
            original_object,
            related_objects: Vec::new(),
        }
    }

    /// Re-tags the relation with a synchronization intent
    pub fn with_intent(mut self, intent: RelationIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Identity of the origin object
    pub fn origin(&self) -> ObjectRef<'_> {
        ObjectRef {
            maverick_id: self.original_object.maverick_id.as_ref(),
            external_id: self.original_object.external_id.as_ref(),
        }
    }

    /// Whether the relation has any edge
    pub fn is_empty(&self) -> bool {
        self.related_objects.is_empty()
    }

    /// Whether this relation contains `edge` from its origin
    pub fn has_edge(&self, target: &ObjectRef<'_>, assignment_type: AssignmentType) -> bool {
        self.related_objects
            .iter()
            .any(|r| r.assignment_type == assignment_type && r.target().same_object(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ext(id: &str) -> ExternalId {
        ExternalId::new(id, "LDAP").unwrap()
    }

    #[test_case(AssignmentType::ParentsToChild, AssignmentType::ChildrenToParent)]
    #[test_case(AssignmentType::MemberOf, AssignmentType::Members)]
    #[test_case(AssignmentType::AssignedTo, AssignmentType::Assignments)]
    fn test_opposite_is_involution(a: AssignmentType, b: AssignmentType) {
        assert_eq!(a.opposite(), b);
        assert_eq!(b.opposite(), a);
        assert_eq!(a.opposite().opposite(), a);
    }

    #[test]
    fn test_same_object_prefers_maverick_id() {
        let m1 = MaverickId::new("m1").unwrap();
        let m2 = MaverickId::new("m2").unwrap();
        let e = ext("E1");

        let a = ObjectRef {
            maverick_id: Some(&m1),
            external_id: Some(&e),
        };
        let b = ObjectRef {
            maverick_id: Some(&m2),
            external_id: Some(&e),
        };
        assert!(!a.same_object(&b));
    }

    #[test]
    fn test_same_object_falls_back_to_external_id() {
        let m1 = MaverickId::new("m1").unwrap();
        let e = ext("E1");
        let lower = ExternalId::new("E1", "ldap").unwrap();

        let a = ObjectRef {
            maverick_id: Some(&m1),
            external_id: Some(&e),
        };
        let b = ObjectRef {
            maverick_id: None,
            external_id: Some(&lower),
        };
        assert!(a.same_object(&b));
    }

    #[test]
    fn test_unknown_refs_never_match() {
        let a = ObjectRef {
            maverick_id: None,
            external_id: None,
        };
        assert!(!a.same_object(&a));
    }

    #[test]
    fn test_has_edge_checks_assignment_type() {
        let mut relation = Relation::new(LookUpObject {
            external_id: Some(ext("P")),
            maverick_id: None,
            source: "LDAP".to_string(),
            object_type: ObjectType::Group,
        });
        relation.related_objects.push(ObjectRelation::external(
            AssignmentType::ParentsToChild,
            ext("C"),
            ObjectType::Group,
        ));

        let child = ext("C");
        let target = ObjectRef {
            maverick_id: None,
            external_id: Some(&child),
        };
        assert!(relation.has_edge(&target, AssignmentType::ParentsToChild));
        assert!(!relation.has_edge(&target, AssignmentType::ChildrenToParent));
    }
}
