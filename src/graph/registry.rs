use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Connection, Relationship};
use crate::entity::{KindDescriptor, KindRegistry};
use crate::{RelgraphError, Result};

/// Either a relationship name or an already looked-up relationship.
#[derive(Debug, Clone, Copy)]
pub enum RelationshipRef<'a> {
    Name(&'a str),
    Instance(&'a Arc<Relationship>),
}

impl<'a> From<&'a str> for RelationshipRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for RelationshipRef<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a Arc<Relationship>> for RelationshipRef<'a> {
    fn from(relationship: &'a Arc<Relationship>) -> Self {
        Self::Instance(relationship)
    }
}

/// Name → relationship mapping for one process.
///
/// Built once at startup and shared behind an `Arc`; tests build their own.
#[derive(Debug)]
pub struct RelationshipRegistry {
    kinds: Arc<KindRegistry>,
    relationships: RwLock<HashMap<String, Arc<Relationship>>>,
}

impl RelationshipRegistry {
    pub fn new(kinds: Arc<KindRegistry>) -> Self {
        Self {
            kinds,
            relationships: RwLock::new(HashMap::new()),
        }
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Relationship>>> {
        self.relationships.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Relationship>>> {
        self.relationships.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Define a relationship from `from` kind to `to` kind.
    ///
    /// Kinds are resolved now, so a bad descriptor fails here rather than on
    /// first use. A failed definition leaves the registry unchanged.
    pub fn define(
        &self,
        name: &str,
        from: impl Into<KindDescriptor>,
        to: impl Into<KindDescriptor>,
    ) -> Result<Arc<Relationship>> {
        let mut relationships = self.write();
        if relationships.contains_key(name) {
            return Err(RelgraphError::DuplicateName(name.to_string()));
        }

        let from_kind = self.kinds.resolve(&from.into())?;
        let to_kind = self.kinds.resolve(&to.into())?;
        let relationship = Arc::new(Relationship::new(name, from_kind, to_kind)?);

        relationships.insert(name.to_string(), Arc::clone(&relationship));
        log::info!("Defined relationship {}", relationship);
        Ok(relationship)
    }

    /// Look a relationship up by name; an instance is returned as is.
    pub fn get<'a>(&self, relationship: impl Into<RelationshipRef<'a>>) -> Result<Arc<Relationship>> {
        match relationship.into() {
            RelationshipRef::Instance(r) => Ok(Arc::clone(r)),
            RelationshipRef::Name(name) => self
                .read()
                .get(name)
                .cloned()
                .ok_or_else(|| RelgraphError::RelationshipNotFound(name.to_string())),
        }
    }

    /// The relationship a stored connection belongs to.
    pub fn relationship_of(&self, connection: &Connection) -> Result<Arc<Relationship>> {
        self.get(connection.relationship_name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// All relationships, sorted by name.
    pub fn relationships(&self) -> Vec<Arc<Relationship>> {
        let mut all: Vec<_> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Forget every relationship. Stored connections are not touched.
    pub fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{KindDescriptor, KindId};
    use crate::graph::NAME_MAX_LENGTH;
    use crate::testing::{kinds, setup_test_db, user_kind, Group, User};

    fn registry() -> RelationshipRegistry {
        RelationshipRegistry::new(kinds())
    }

    #[test]
    fn test_define_relationship_by_name() {
        let registry = registry();
        let r1 = registry.define("rel1", "auth.User", "auth.User").unwrap();
        assert!(registry.contains("rel1"));
        assert_eq!(r1.name(), "rel1");
        assert_eq!(r1.from_kind(), &user_kind());
        assert_eq!(r1.to_kind(), &user_kind());
        assert_eq!(r1.to_string(), "rel1 (user -> user)");
    }

    #[test]
    fn test_define_relationship_by_type() {
        let registry = registry();
        let r2 = registry
            .define("rel2", KindDescriptor::of::<User>(), KindDescriptor::of::<Group>())
            .unwrap();
        assert_eq!(r2.from_kind(), &user_kind());
        assert_eq!(r2.to_kind(), &KindId::new("auth", "group"));
        assert_eq!(r2.to_string(), "rel2 (user -> group)");
    }

    #[test]
    fn test_define_relationship_resolved_kind() {
        let registry = registry();
        let r = registry.define("rel", user_kind(), &user_kind()).unwrap();
        assert_eq!(r.from_kind(), &user_kind());
    }

    #[test]
    fn test_define_relationship_raises_for_duplicate() {
        let registry = registry();
        let first = registry.define("r1", "auth.user", "auth.user").unwrap();
        let err = registry.define("r1", "auth.group", "auth.group").unwrap_err();
        assert!(matches!(err, RelgraphError::DuplicateName(ref n) if n == "r1"));
        let kept = registry.get("r1").unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
        assert_eq!(kept.from_kind(), &user_kind());
    }

    #[test]
    fn test_relationship_name_max_length() {
        let registry = registry();
        let err = registry
            .define(&"x".repeat(NAME_MAX_LENGTH + 1), "auth.user", "auth.user")
            .unwrap_err();
        assert!(matches!(err, RelgraphError::NameTooLong { .. }));
        assert!(registry.is_empty());
        registry
            .define(&"x".repeat(NAME_MAX_LENGTH), "auth.user", "auth.user")
            .unwrap();
    }

    #[test]
    fn test_define_bad_kinds() {
        let registry = registry();
        assert!(matches!(
            registry.define("a", "invalidmodelname", "auth.user"),
            Err(RelgraphError::UnknownKind(_))
        ));
        assert!(matches!(
            registry.define("b", "auth.user", "invalid.Model"),
            Err(RelgraphError::UnknownKind(_))
        ));
        assert!(matches!(
            registry.define("c", KindDescriptor::of::<u32>(), "auth.user"),
            Err(RelgraphError::UnknownKind(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_relationship() {
        let registry = registry();
        let r = registry.define("rel", "auth.user", "auth.user").unwrap();
        assert!(Arc::ptr_eq(&r, &registry.get("rel").unwrap()));
        assert!(Arc::ptr_eq(&r, &registry.get(&r).unwrap()));
        assert!(Arc::ptr_eq(&r, &registry.get(&"rel".to_string()).unwrap()));
        assert!(matches!(
            registry.get("invalid"),
            Err(RelgraphError::RelationshipNotFound(ref n)) if n == "invalid"
        ));
    }

    #[test]
    fn test_get_passes_through_unregistered_instance() {
        let registry = registry();
        let other = RelationshipRegistry::new(kinds());
        let r = other.define("elsewhere", "auth.user", "auth.user").unwrap();
        assert!(Arc::ptr_eq(&r, &registry.get(&r).unwrap()));
    }

    #[test]
    fn test_relationships_sorted() {
        let registry = registry();
        registry.define("b", "auth.user", "auth.user").unwrap();
        registry.define("a", "auth.user", "auth.group").unwrap();
        let names: Vec<String> = registry
            .relationships()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_keeps_connections() {
        let (db, _temp) = setup_test_db().await;
        let registry = registry();
        let r = registry.define("user_follow", "auth.user", "auth.user").unwrap();
        let c = r
            .create_connection(&db, &User::new(1, "foo"), &User::new(2, "bar"))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&r, &registry.relationship_of(&c).unwrap()));

        registry.clear();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.relationship_of(&c),
            Err(RelgraphError::RelationshipNotFound(_))
        ));

        let again = registry.define("user_follow", "auth.user", "auth.user").unwrap();
        assert_eq!(again.connections(&db).await.unwrap(), vec![c]);
    }
}
