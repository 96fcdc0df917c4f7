//! Entity references and the capabilities the graph needs from entity types.
//!
//! The graph never owns entities. It only needs to know an entity's kind and
//! raw identifier, and to batch-load entities of one kind by identifier.

mod kinds;

pub use kinds::{KindDescriptor, KindRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

/// Identifies a category of domain record by natural key, e.g. `auth.user`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KindId {
    namespace: String,
    name: String,
}

impl KindId {
    /// Build a kind id. The name part is case-insensitive and stored lowercase.
    pub fn new(namespace: impl Into<String>, name: impl AsRef<str>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.as_ref().to_lowercase(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted form, `namespace.name`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Displays the bare kind name (`user`), the form used in relationship
/// and connection descriptions.
impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Capability every connectable entity type provides.
pub trait Entity {
    /// Kind of this entity.
    fn kind(&self) -> KindId;

    /// Raw identifier of this entity within its kind.
    fn id(&self) -> i64;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }
}

/// A `(kind, id)` pair addressing a record without loading it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: KindId,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: KindId, id: i64) -> Self {
        Self { kind, id }
    }
}

impl Entity for EntityRef {
    fn kind(&self) -> KindId {
        self.kind.clone()
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Batch loader for the entities of a single kind.
pub trait EntitySource: Send + Sync {
    type Entity: Clone;

    /// Kind of every entity this source produces.
    fn kind(&self) -> KindId;

    /// Load the entities with the given ids. Ids with no matching record are
    /// skipped, not reported.
    fn load_many(&self, ids: &[i64]) -> Result<Vec<Self::Entity>>;
}
