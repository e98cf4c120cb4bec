//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through a synchronization
//! run. Each type ensures type safety so a destination id can never be passed
//! where an external id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an entity inside one specific source system
///
/// The pair `(id, source)` is the join key between the source and the
/// destination system. Source names are compared case-insensitively
/// (`"LDAP"` and `"ldap"` name the same system).
///
/// # Examples
///
/// ```
/// use profile_sync::domain::ids::ExternalId;
///
/// let ext = ExternalId::new("cn=alice,ou=people", "LDAP").unwrap();
/// assert!(ext.belongs_to("ldap"));
/// assert_eq!(ext.to_string(), "LDAP:cn=alice,ou=people");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId {
    /// Identifier within the source system
    pub id: String,

    /// Name of the source system (e.g. "LDAP")
    pub source: String,
}

impl ExternalId {
    /// Creates a new external id
    ///
    /// # Returns
    ///
    /// Returns `Err` if either the id or the source is blank
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let source = source.into();
        if id.trim().is_empty() {
            return Err("External ID cannot be empty".to_string());
        }
        if source.trim().is_empty() {
            return Err("External ID source cannot be empty".to_string());
        }
        Ok(Self { id, source })
    }

    /// Whether this id was issued by the given source system
    pub fn belongs_to(&self, system: &str) -> bool {
        self.source.eq_ignore_ascii_case(system)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// Destination-assigned identifier (the "internal id")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaverickId(String);

impl MaverickId {
    /// Creates a new MaverickId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Maverick ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Generates a fresh random id (used by in-memory destinations)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MaverickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MaverickId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for MaverickId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| format!("Invalid {}: {}", stringify!($name), e))
            }
        }
    };
}

uuid_id!(
    /// Identifier of one synchronization process (run)
    ProcessId
);

uuid_id!(
    /// Identifier of a command sent to the destination; also keys staged entities
    CommandId
);

uuid_id!(
    /// Correlates every command emitted during one run
    CorrelationId
);
