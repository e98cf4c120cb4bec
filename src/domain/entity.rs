//! Synchronized entity models
//!
//! Every entity that can be synchronized shares an [`EntityHeader`] (internal
//! id, external ids, related objects, owning source) and carries its own typed
//! properties. [`SyncEntity`] is the sum type the engines work with.
//!
//! # Examples
//!
//! ```
//! use profile_sync::domain::entity::{Group, SyncEntity};
//! use profile_sync::domain::ids::ExternalId;
//!
//! let group = SyncEntity::Group(
//!     Group::new("Engineering").with_external_id(ExternalId::new("cn=eng", "LDAP").unwrap()),
//! );
//! assert!(group.external_id_for("LDAP").is_some());
//! ```

use super::diff::ChangedFields;
use super::errors::SyncError;
use super::ids::{ExternalId, MaverickId};
use super::relation::ObjectRelation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static classification of a sync model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// Person profile
    User,
    /// Group of users or groups
    Group,
    /// Organizational unit
    Organization,
    /// Role
    Role,
    /// Function (job function, attached to roles)
    Function,
}

impl ObjectType {
    /// All object types, in the order a full synchronization processes them
    pub const ALL: [ObjectType; 5] = [
        ObjectType::Organization,
        ObjectType::Group,
        ObjectType::Role,
        ObjectType::Function,
        ObjectType::User,
    ];

    /// Returns the snake_case name used in configuration and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::User => "user",
            ObjectType::Group => "group",
            ObjectType::Organization => "organization",
            ObjectType::Role => "role",
            ObjectType::Function => "function",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "users" => Ok(ObjectType::User),
            "group" | "groups" => Ok(ObjectType::Group),
            "organization" | "organizations" | "organisation" => Ok(ObjectType::Organization),
            "role" | "roles" => Ok(ObjectType::Role),
            "function" | "functions" => Ok(ObjectType::Function),
            other => Err(format!("Unknown object type '{other}'")),
        }
    }
}

/// Capabilities shared by every synchronized entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityHeader {
    /// Destination id (absent for entities read from a source system)
    #[serde(default)]
    pub id: Option<MaverickId>,

    /// External ids, at most one per source system
    #[serde(default)]
    pub external_ids: Vec<ExternalId>,

    /// Edges to other objects
    #[serde(default)]
    pub related_objects: Vec<ObjectRelation>,

    /// System that owns this entity
    #[serde(default)]
    pub source: String,
}

impl EntityHeader {
    /// The external id issued by `system`, if any
    pub fn external_id_for(&self, system: &str) -> Option<&ExternalId> {
        self.external_ids.iter().find(|e| e.belongs_to(system))
    }

    /// Sets the external id for its source, replacing an existing one
    pub fn set_external_id(&mut self, external_id: ExternalId) {
        self.external_ids.retain(|e| !e.belongs_to(&external_id.source));
        self.external_ids.push(external_id);
    }

    /// Copies every external id of `existing` that was issued by a system
    /// other than `system` and is not present here yet.
    ///
    /// A run for one system never erases the linkage of another.
    pub fn merge_foreign_external_ids(&mut self, existing: &[ExternalId], system: &str) {
        for ext in existing.iter().filter(|e| !e.belongs_to(system)) {
            if self.external_id_for(&ext.source).is_none() {
                self.external_ids.push(ext.clone());
            }
        }
    }
}

/// Comparison form of the external id list: order-insensitive
fn normalized_external_ids(ids: &[ExternalId]) -> Vec<(String, String)> {
    let mut v: Vec<(String, String)> = ids
        .iter()
        .map(|e| (e.source.to_lowercase(), e.id.clone()))
        .collect();
    v.sort();
    v
}

macro_rules! header_builders {
    ($ty:ident) => {
        impl $ty {
            /// Adds an external id
            pub fn with_external_id(mut self, external_id: ExternalId) -> Self {
                self.header.set_external_id(external_id);
                self
            }

            /// Sets the destination id
            pub fn with_id(mut self, id: MaverickId) -> Self {
                self.header.id = Some(id);
                self
            }

            /// Sets the owning source system
            pub fn with_source(mut self, source: impl Into<String>) -> Self {
                self.header.source = source.into();
                self
            }

            /// Adds an edge to a related object
            pub fn with_relation(mut self, relation: ObjectRelation) -> Self {
                self.header.related_objects.push(relation);
                self
            }
        }
    };
}

/// Person profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub header: EntityHeader,

    /// Login name
    pub user_name: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// E-mail address, unique across users
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Creates an active user with the given login name
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            active: true,
            ..Default::default()
        }
    }

    /// Sets the e-mail address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    fn diff(&self, current: &User) -> ChangedFields {
        let mut changed = ChangedFields::new();
        changed.compare("user_name", &self.user_name, &current.user_name);
        changed.compare("first_name", &self.first_name, &current.first_name);
        changed.compare("last_name", &self.last_name, &current.last_name);
        changed.compare("display_name", &self.display_name, &current.display_name);
        changed.compare("email", &self.email, &current.email);
        changed.compare("phone", &self.phone, &current.phone);
        changed.compare("active", &self.active, &current.active);
        changed
    }
}

header_builders!(User);

/// Group of users or groups
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    pub header: EntityHeader,

    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Group {
    /// Creates a group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    fn diff(&self, current: &Group) -> ChangedFields {
        let mut changed = ChangedFields::new();
        changed.compare("name", &self.name, &current.name);
        changed.compare("display_name", &self.display_name, &current.display_name);
        changed.compare("description", &self.description, &current.description);
        changed
    }
}

header_builders!(Group);

/// Organizational unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Organization {
    #[serde(flatten)]
    pub header: EntityHeader,

    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Organization {
    /// Creates an organization with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn diff(&self, current: &Organization) -> ChangedFields {
        let mut changed = ChangedFields::new();
        changed.compare("name", &self.name, &current.name);
        changed.compare("display_name", &self.display_name, &current.display_name);
        changed.compare("description", &self.description, &current.description);
        changed
    }
}

header_builders!(Organization);

/// Role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub header: EntityHeader,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl Role {
    /// Creates a role with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn diff(&self, current: &Role) -> ChangedFields {
        let mut changed = ChangedFields::new();
        changed.compare("name", &self.name, &current.name);
        changed.compare("description", &self.description, &current.description);
        changed
    }
}

header_builders!(Role);

/// Function
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Function {
    #[serde(flatten)]
    pub header: EntityHeader,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl Function {
    /// Creates a function with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn diff(&self, current: &Function) -> ChangedFields {
        let mut changed = ChangedFields::new();
        changed.compare("name", &self.name, &current.name);
        changed.compare("description", &self.description, &current.description);
        changed
    }
}

header_builders!(Function);

/// Any synchronized entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object_type", rename_all = "snake_case")]
pub enum SyncEntity {
    User(User),
    Group(Group),
    Organization(Organization),
    Role(Role),
    Function(Function),
}

impl SyncEntity {
    /// Shared header
    pub fn header(&self) -> &EntityHeader {
        match self {
            SyncEntity::User(e) => &e.header,
            SyncEntity::Group(e) => &e.header,
            SyncEntity::Organization(e) => &e.header,
            SyncEntity::Role(e) => &e.header,
            SyncEntity::Function(e) => &e.header,
        }
    }

    /// Shared header, mutable
    pub fn header_mut(&mut self) -> &mut EntityHeader {
        match self {
            SyncEntity::User(e) => &mut e.header,
            SyncEntity::Group(e) => &mut e.header,
            SyncEntity::Organization(e) => &mut e.header,
            SyncEntity::Role(e) => &mut e.header,
            SyncEntity::Function(e) => &mut e.header,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            SyncEntity::User(_) => ObjectType::User,
            SyncEntity::Group(_) => ObjectType::Group,
            SyncEntity::Organization(_) => ObjectType::Organization,
            SyncEntity::Role(_) => ObjectType::Role,
            SyncEntity::Function(_) => ObjectType::Function,
        }
    }

    pub fn id(&self) -> Option<&MaverickId> {
        self.header().id.as_ref()
    }

    pub fn external_ids(&self) -> &[ExternalId] {
        &self.header().external_ids
    }

    pub fn external_id_for(&self, system: &str) -> Option<&ExternalId> {
        self.header().external_id_for(system)
    }

    pub fn related_objects(&self) -> &[ObjectRelation] {
        &self.header().related_objects
    }

    /// Human-readable name for log lines
    pub fn label(&self) -> &str {
        match self {
            SyncEntity::User(u) => &u.user_name,
            SyncEntity::Group(g) => &g.name,
            SyncEntity::Organization(o) => &o.name,
            SyncEntity::Role(r) => &r.name,
            SyncEntity::Function(f) => &f.name,
        }
    }

    /// Value of a named scalar field, used by filter evaluation
    pub fn field(&self, name: &str) -> Option<&str> {
        match (self, name) {
            (_, "id") => self.id().map(MaverickId::as_str),
            (_, "source") => Some(self.header().source.as_str()),
            (_, "object_type") => Some(self.object_type().as_str()),
            (SyncEntity::User(u), "user_name") => Some(&u.user_name),
            (SyncEntity::User(u), "first_name") => u.first_name.as_deref(),
            (SyncEntity::User(u), "last_name") => u.last_name.as_deref(),
            (SyncEntity::User(u), "display_name") => u.display_name.as_deref(),
            (SyncEntity::User(u), "email") => u.email.as_deref(),
            (SyncEntity::User(u), "phone") => u.phone.as_deref(),
            (SyncEntity::Group(g), "name") => Some(&g.name),
            (SyncEntity::Group(g), "display_name") => g.display_name.as_deref(),
            (SyncEntity::Group(g), "description") => g.description.as_deref(),
            (SyncEntity::Organization(o), "name") => Some(&o.name),
            (SyncEntity::Organization(o), "display_name") => o.display_name.as_deref(),
            (SyncEntity::Organization(o), "description") => o.description.as_deref(),
            (SyncEntity::Role(r), "name") => Some(&r.name),
            (SyncEntity::Role(r), "description") => r.description.as_deref(),
            (SyncEntity::Function(f), "name") => Some(&f.name),
            (SyncEntity::Function(f), "description") => f.description.as_deref(),
            _ => None,
        }
    }

    /// Compares this (desired) entity against the `current` destination record
    ///
    /// External ids are compared order-insensitively; the internal id and the
    /// related objects never participate (relations are reconciled on their
    /// own).
    ///
    /// # Errors
    ///
    /// Returns a validation error when the two entities are of different kinds.
    pub fn diff(&self, current: &SyncEntity) -> Result<ChangedFields, SyncError> {
        let mut changed = match (self, current) {
            (SyncEntity::User(a), SyncEntity::User(b)) => a.diff(b),
            (SyncEntity::Group(a), SyncEntity::Group(b)) => a.diff(b),
            (SyncEntity::Organization(a), SyncEntity::Organization(b)) => a.diff(b),
            (SyncEntity::Role(a), SyncEntity::Role(b)) => a.diff(b),
            (SyncEntity::Function(a), SyncEntity::Function(b)) => a.diff(b),
            (a, b) => {
                return Err(SyncError::Validation(format!(
                    "Cannot diff {} against {}",
                    a.object_type(),
                    b.object_type()
                )))
            }
        };
        changed.compare(
            "external_ids",
            &normalized_external_ids(self.external_ids()),
            &normalized_external_ids(current.external_ids()),
        );
        Ok(changed)
    }

    /// Copies `fields` from `update` onto this entity (used by destinations
    /// applying an update command). Unknown field names are ignored.
    pub fn apply_fields(&mut self, update: &SyncEntity, fields: &ChangedFields) {
        if fields.contains("external_ids") {
            self.header_mut().external_ids = update.external_ids().to_vec();
        }
        match (self, update) {
            (SyncEntity::User(a), SyncEntity::User(b)) => {
                for f in fields.iter() {
                    match f {
                        "user_name" => a.user_name = b.user_name.clone(),
                        "first_name" => a.first_name = b.first_name.clone(),
                        "last_name" => a.last_name = b.last_name.clone(),
                        "display_name" => a.display_name = b.display_name.clone(),
                        "email" => a.email = b.email.clone(),
                        "phone" => a.phone = b.phone.clone(),
                        "active" => a.active = b.active,
                        _ => {}
                    }
                }
            }
            (SyncEntity::Group(a), SyncEntity::Group(b)) => {
                for f in fields.iter() {
                    match f {
                        "name" => a.name = b.name.clone(),
                        "display_name" => a.display_name = b.display_name.clone(),
                        "description" => a.description = b.description.clone(),
                        _ => {}
                    }
                }
            }
            (SyncEntity::Organization(a), SyncEntity::Organization(b)) => {
                for f in fields.iter() {
                    match f {
                        "name" => a.name = b.name.clone(),
                        "display_name" => a.display_name = b.display_name.clone(),
                        "description" => a.description = b.description.clone(),
                        _ => {}
                    }
                }
            }
            (SyncEntity::Role(a), SyncEntity::Role(b)) => {
                for f in fields.iter() {
                    match f {
                        "name" => a.name = b.name.clone(),
                        "description" => a.description = b.description.clone(),
                        _ => {}
                    }
                }
            }
            (SyncEntity::Function(a), SyncEntity::Function(b)) => {
                for f in fields.iter() {
                    match f {
                        "name" => a.name = b.name.clone(),
                        "description" => a.description = b.description.clone(),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

impl From<User> for SyncEntity {
    fn from(value: User) -> Self {
        SyncEntity::User(value)
    }
}

impl From<Group> for SyncEntity {
    fn from(value: Group) -> Self {
        SyncEntity::Group(value)
    }
}

impl From<Organization> for SyncEntity {
    fn from(value: Organization) -> Self {
        SyncEntity::Organization(value)
    }
}

impl From<Role> for SyncEntity {
    fn from(value: Role) -> Self {
        SyncEntity::Role(value)
    }
}

impl From<Function> for SyncEntity {
    fn from(value: Function) -> Self {
        SyncEntity::Function(value)
    }
}
