//! Kind descriptors and their resolution to [`KindId`]s.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};

use super::KindId;
use crate::{RelgraphError, Result};

/// The forms in which a relationship endpoint kind can be named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindDescriptor {
    /// A Rust type registered with [`KindRegistry::register_type`].
    Type {
        type_id: TypeId,
        type_name: &'static str,
    },
    /// A dotted `namespace.Name` reference.
    ByName(String),
    /// An already resolved kind.
    Resolved(KindId),
}

impl KindDescriptor {
    pub fn of<T: 'static>() -> Self {
        Self::Type {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl From<&str> for KindDescriptor {
    fn from(name: &str) -> Self {
        Self::ByName(name.to_string())
    }
}

impl From<String> for KindDescriptor {
    fn from(name: String) -> Self {
        Self::ByName(name)
    }
}

impl From<KindId> for KindDescriptor {
    fn from(kind: KindId) -> Self {
        Self::Resolved(kind)
    }
}

impl From<&KindId> for KindDescriptor {
    fn from(kind: &KindId) -> Self {
        Self::Resolved(kind.clone())
    }
}

/// The set of entity kinds known to the process.
///
/// Populated at startup, then shared read-only.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: BTreeSet<KindId>,
    by_type: HashMap<TypeId, Vec<KindId>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind addressable by name only.
    pub fn register(&mut self, kind: KindId) -> &mut Self {
        self.kinds.insert(kind);
        self
    }

    /// Register a kind and bind the Rust type `T` to it.
    pub fn register_type<T: 'static>(&mut self, kind: KindId) -> &mut Self {
        let bound = self.by_type.entry(TypeId::of::<T>()).or_default();
        if !bound.contains(&kind) {
            bound.push(kind.clone());
        }
        self.kinds.insert(kind);
        self
    }

    pub fn contains(&self, kind: &KindId) -> bool {
        self.kinds.contains(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &KindId> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Resolve a descriptor to exactly one known kind.
    pub fn resolve(&self, descriptor: &KindDescriptor) -> Result<KindId> {
        match descriptor {
            KindDescriptor::Resolved(kind) => Ok(kind.clone()),
            KindDescriptor::ByName(name) => {
                let (namespace, model) = name
                    .split_once('.')
                    .filter(|(ns, model)| !ns.is_empty() && !model.is_empty())
                    .ok_or_else(|| RelgraphError::UnknownKind(name.clone()))?;
                let kind = KindId::new(namespace, model);
                if self.kinds.contains(&kind) {
                    Ok(kind)
                } else {
                    Err(RelgraphError::UnknownKind(name.clone()))
                }
            }
            KindDescriptor::Type { type_id, type_name } => match self.by_type.get(type_id) {
                Some(bound) if bound.len() == 1 => Ok(bound[0].clone()),
                Some(bound) => Err(RelgraphError::AmbiguousKind(format!(
                    "{} ({} kinds: {})",
                    type_name,
                    bound.len(),
                    bound.iter().map(KindId::qualified).collect::<Vec<_>>().join(", ")
                ))),
                None => Err(RelgraphError::UnknownKind(type_name.to_string())),
            },
        }
    }
}
