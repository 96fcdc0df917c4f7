//! Relationship-by-name entry points.
//!
//! Each function looks the relationship up in the registry (or passes an
//! instance straight through) and forwards to the [`Relationship`] method of
//! the same name.
//!
//! [`Relationship`]: crate::graph::Relationship

use crate::db::Db;
use crate::entity::{Entity, EntitySource};
use crate::graph::{Connection, RelationshipRef, RelationshipRegistry};
use crate::Result;

pub async fn create_connection<'a>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    from: &(impl Entity + ?Sized),
    to: &(impl Entity + ?Sized),
) -> Result<Connection> {
    registry.get(relationship)?.create_connection(db, from, to).await
}

pub async fn get_connection<'a>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    from: &(impl Entity + ?Sized),
    to: &(impl Entity + ?Sized),
) -> Result<Option<Connection>> {
    registry.get(relationship)?.get_connection(db, from, to).await
}

pub async fn connection_exists<'a>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    from: &(impl Entity + ?Sized),
    to: &(impl Entity + ?Sized),
) -> Result<bool> {
    registry.get(relationship)?.connection_exists(db, from, to).await
}

pub async fn connections_from_object<'a>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    from: &(impl Entity + ?Sized),
) -> Result<Vec<Connection>> {
    registry.get(relationship)?.connections_from(db, from).await
}

pub async fn connections_to_object<'a>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    to: &(impl Entity + ?Sized),
) -> Result<Vec<Connection>> {
    registry.get(relationship)?.connections_to(db, to).await
}

pub async fn connected_objects<'a, S: EntitySource>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    from: &(impl Entity + ?Sized),
    source: &S,
) -> Result<Vec<S::Entity>> {
    registry.get(relationship)?.connected_objects(db, from, source).await
}

pub async fn connected_to_objects<'a, S: EntitySource>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    to: &(impl Entity + ?Sized),
    source: &S,
) -> Result<Vec<S::Entity>> {
    registry.get(relationship)?.connected_from_objects(db, to, source).await
}

/// Distance between two entities along `relationship`, within `limit` hops.
pub async fn connection_distance<'a>(
    registry: &RelationshipRegistry,
    db: &Db,
    relationship: impl Into<RelationshipRef<'a>>,
    from: &(impl Entity + ?Sized),
    to: &(impl Entity + ?Sized),
    limit: usize,
) -> Result<Option<usize>> {
    registry.get(relationship)?.distance_between(db, from, to, limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EndpointCache;
    use crate::graph::DEFAULT_DISTANCE_LIMIT;
    use crate::testing::{kinds, setup_test_db, user_kind, MemorySource, User};
    use crate::RelgraphError;

    struct Fixture {
        db: Db,
        _temp: tempfile::TempDir,
        registry: RelationshipRegistry,
        foo: User,
        bar: User,
        jaz: User,
    }

    async fn fixture() -> Fixture {
        let (db, _temp) = setup_test_db().await;
        let registry = RelationshipRegistry::new(kinds());
        registry.define("user_follow", "auth.user", "auth.user").unwrap();
        Fixture {
            db,
            _temp,
            registry,
            foo: User::new(1, "foo"),
            bar: User::new(2, "bar"),
            jaz: User::new(3, "jaz"),
        }
    }

    #[tokio::test]
    async fn test_by_name_and_instance_agree() {
        let f = fixture().await;
        let r = f.registry.get("user_follow").unwrap();
        create_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.bar)
            .await
            .unwrap();

        for rel in [RelationshipRef::Name("user_follow"), RelationshipRef::Instance(&r)] {
            let d = connection_distance(&f.registry, &f.db, rel, &f.foo, &f.bar, DEFAULT_DISTANCE_LIMIT)
                .await
                .unwrap();
            assert_eq!(d, Some(1));
            assert!(connection_exists(&f.registry, &f.db, rel, &f.foo, &f.bar).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_connections_from_object_usernames() {
        let f = fixture().await;
        create_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.bar).await.unwrap();
        create_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.jaz).await.unwrap();

        let r = f.registry.get("user_follow").unwrap();
        let source = MemorySource::new(user_kind(), vec![f.foo.clone(), f.bar.clone(), f.jaz.clone()]);
        let cache = EndpointCache::new(16);
        let names: Vec<String> = connections_from_object(&f.registry, &f.db, "user_follow", &f.foo)
            .await
            .unwrap()
            .iter()
            .map(|c| r.to_object(c, &source, &cache).unwrap().username)
            .collect();
        assert_eq!(names.join(", "), "bar, jaz");
    }

    #[tokio::test]
    async fn test_connections_to_object_usernames() {
        let f = fixture().await;
        create_connection(&f.registry, &f.db, "user_follow", &f.bar, &f.foo).await.unwrap();
        create_connection(&f.registry, &f.db, "user_follow", &f.jaz, &f.foo).await.unwrap();

        let r = f.registry.get("user_follow").unwrap();
        let source = MemorySource::new(user_kind(), vec![f.foo.clone(), f.bar.clone(), f.jaz.clone()]);
        let cache = EndpointCache::new(16);
        let names: Vec<String> = connections_to_object(&f.registry, &f.db, &r, &f.foo)
            .await
            .unwrap()
            .iter()
            .map(|c| r.from_object(c, &source, &cache).unwrap().username)
            .collect();
        assert_eq!(names.join(", "), "bar, jaz");
    }

    #[tokio::test]
    async fn test_connected_objects_shortcuts() {
        let f = fixture().await;
        let source = MemorySource::new(user_kind(), vec![f.foo.clone(), f.bar.clone(), f.jaz.clone()]);
        create_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.bar).await.unwrap();
        create_connection(&f.registry, &f.db, "user_follow", &f.jaz, &f.bar).await.unwrap();

        let out = connected_objects(&f.registry, &f.db, "user_follow", &f.foo, &source)
            .await
            .unwrap();
        assert_eq!(out, vec![f.bar.clone()]);
        let inbound = connected_to_objects(&f.registry, &f.db, "user_follow", &f.bar, &source)
            .await
            .unwrap();
        assert_eq!(inbound, vec![f.foo.clone(), f.jaz.clone()]);
    }

    #[tokio::test]
    async fn test_get_connection_shortcut() {
        let f = fixture().await;
        let c = create_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.bar)
            .await
            .unwrap();
        assert_eq!(
            get_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.bar).await.unwrap(),
            Some(c)
        );
        assert_eq!(
            get_connection(&f.registry, &f.db, "user_follow", &f.foo, &f.jaz).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_unknown_relationship() {
        let f = fixture().await;
        let err = connection_exists(&f.registry, &f.db, "nope", &f.foo, &f.bar)
            .await
            .unwrap_err();
        assert!(matches!(err, RelgraphError::RelationshipNotFound(_)));
    }
}
