use std::fmt;

use super::{store, traversal, Connection};
use crate::cache::EndpointCache;
use crate::db::Db;
use crate::entity::{Entity, EntitySource, KindId};
use crate::notify::{ListenerId, Notifier, Topic};
use crate::{RelgraphError, Result};

/// Longest relationship name the `connections` table accepts.
pub const NAME_MAX_LENGTH: usize = 50;

/// A named, typed kind of directed edge between a "from" entity kind and a
/// "to" entity kind.
///
/// Every operation taking concrete entities checks their kinds against the
/// pinned pair before touching storage, so a rejected call writes nothing and
/// notifies nobody.
#[derive(Debug)]
pub struct Relationship {
    name: String,
    from_kind: KindId,
    to_kind: KindId,
    notifier: Notifier,
}

impl Relationship {
    pub(crate) fn new(name: &str, from_kind: KindId, to_kind: KindId) -> Result<Self> {
        let len = name.chars().count();
        if len > NAME_MAX_LENGTH {
            return Err(RelgraphError::NameTooLong {
                name: name.to_string(),
                len,
                max: NAME_MAX_LENGTH,
            });
        }
        if name.is_empty() {
            return Err(RelgraphError::InvalidInput("relationship name is empty".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            from_kind,
            to_kind,
            notifier: Notifier::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from_kind(&self) -> &KindId {
        &self.from_kind
    }

    pub fn to_kind(&self) -> &KindId {
        &self.to_kind
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Subscribe to connections created or removed on this relationship.
    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> ListenerId
    where
        F: Fn(&Relationship, &Connection) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.notifier.subscribe(topic, listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub(crate) fn validate_from(&self, kind: &KindId) -> Result<()> {
        if *kind != self.from_kind {
            return Err(RelgraphError::KindMismatch {
                relationship: self.name.clone(),
                kind: kind.clone(),
                direction: "from",
            });
        }
        Ok(())
    }

    pub(crate) fn validate_to(&self, kind: &KindId) -> Result<()> {
        if *kind != self.to_kind {
            return Err(RelgraphError::KindMismatch {
                relationship: self.name.clone(),
                kind: kind.clone(),
                direction: "to",
            });
        }
        Ok(())
    }

    fn validate_own(&self, connection: &Connection) -> Result<()> {
        if connection.relationship_name != self.name {
            return Err(RelgraphError::InvalidInput(format!(
                "connection {} belongs to relationship '{}', not '{}'",
                connection.id, connection.relationship_name, self.name
            )));
        }
        Ok(())
    }

    /// `name (from_model:from_id --> to_model:to_id)`
    pub fn describe(&self, connection: &Connection) -> String {
        format!(
            "{} ({}:{} --> {}:{})",
            self.name, self.from_kind, connection.from_id, self.to_kind, connection.to_id
        )
    }

    /// Create the connection `from → to`, or return the existing one unchanged.
    ///
    /// Listeners for [`Topic::Created`] run only when a row was inserted. If any
    /// of them fails the connection stays stored and the failure is returned.
    pub async fn create_connection(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
        to: &(impl Entity + ?Sized),
    ) -> Result<Connection> {
        self.validate_from(&from.kind())?;
        self.validate_to(&to.kind())?;

        let name = self.name.clone();
        let (from_id, to_id) = (from.id(), to.id());
        let (connection, created) = db
            .with_connection(move |conn| store::get_or_create(conn, &name, from_id, to_id))
            .await?;

        if created {
            log::debug!("Created {}", self.describe(&connection));
            self.notifier.emit(Topic::Created, self, std::slice::from_ref(&connection))?;
        }
        Ok(connection)
    }

    /// The connection `from → to`, or `None`.
    pub async fn get_connection(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
        to: &(impl Entity + ?Sized),
    ) -> Result<Option<Connection>> {
        self.validate_from(&from.kind())?;
        self.validate_to(&to.kind())?;

        let name = self.name.clone();
        let (from_id, to_id) = (from.id(), to.id());
        db.with_connection(move |conn| store::find_one(conn, &name, from_id, to_id))
            .await
    }

    pub async fn connection_exists(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
        to: &(impl Entity + ?Sized),
    ) -> Result<bool> {
        self.validate_from(&from.kind())?;
        self.validate_to(&to.kind())?;

        let name = self.name.clone();
        let (from_id, to_id) = (from.id(), to.id());
        db.with_connection(move |conn| store::exists(conn, &name, from_id, to_id))
            .await
    }

    /// Every connection of this relationship.
    pub async fn connections(&self, db: &Db) -> Result<Vec<Connection>> {
        let name = self.name.clone();
        db.with_connection(move |conn| store::find(conn, &name, None, None))
            .await
    }

    /// Connections with `from` as source.
    pub async fn connections_from(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
    ) -> Result<Vec<Connection>> {
        self.validate_from(&from.kind())?;
        let name = self.name.clone();
        let from_id = from.id();
        db.with_connection(move |conn| store::find(conn, &name, Some(from_id), None))
            .await
    }

    /// Connections with `to` as destination.
    pub async fn connections_to(
        &self,
        db: &Db,
        to: &(impl Entity + ?Sized),
    ) -> Result<Vec<Connection>> {
        self.validate_to(&to.kind())?;
        let name = self.name.clone();
        let to_id = to.id();
        db.with_connection(move |conn| store::find(conn, &name, None, Some(to_id)))
            .await
    }

    /// Ids of the entities `from` is connected to.
    pub async fn connected_object_ids(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
    ) -> Result<Vec<i64>> {
        self.validate_from(&from.kind())?;
        let name = self.name.clone();
        let from_id = from.id();
        db.with_connection(move |conn| store::target_ids(conn, &name, from_id))
            .await
    }

    /// Ids of the entities connected to `to`.
    pub async fn connected_from_object_ids(
        &self,
        db: &Db,
        to: &(impl Entity + ?Sized),
    ) -> Result<Vec<i64>> {
        self.validate_to(&to.kind())?;
        let name = self.name.clone();
        let to_id = to.id();
        db.with_connection(move |conn| store::source_ids(conn, &name, to_id))
            .await
    }

    /// Entities `from` is connected to, batch-loaded from `source`.
    pub async fn connected_objects<S: EntitySource>(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
        source: &S,
    ) -> Result<Vec<S::Entity>> {
        self.validate_to(&source.kind())?;
        let ids = self.connected_object_ids(db, from).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        source.load_many(&ids)
    }

    /// Entities connected to `to`, batch-loaded from `source`.
    pub async fn connected_from_objects<S: EntitySource>(
        &self,
        db: &Db,
        to: &(impl Entity + ?Sized),
        source: &S,
    ) -> Result<Vec<S::Entity>> {
        self.validate_from(&source.kind())?;
        let ids = self.connected_from_object_ids(db, to).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        source.load_many(&ids)
    }

    /// Length of the shortest directed path `from → to` within `limit` hops.
    /// See [`traversal::distance_between`].
    pub async fn distance_between(
        &self,
        db: &Db,
        from: &(impl Entity + ?Sized),
        to: &(impl Entity + ?Sized),
        limit: usize,
    ) -> Result<Option<usize>> {
        traversal::distance_between(db, self, from, to, limit).await
    }

    /// Delete `connection`. Returns false, without notifying, if it was
    /// already gone.
    pub async fn remove_connection(&self, db: &Db, connection: &Connection) -> Result<bool> {
        self.validate_own(connection)?;
        let target = connection.clone();
        let deleted = db
            .with_connection(move |conn| store::delete(conn, &target))
            .await?;
        if deleted {
            log::debug!("Removed {}", self.describe(connection));
            self.notifier.emit(Topic::Removed, self, std::slice::from_ref(connection))?;
        }
        Ok(deleted)
    }

    /// Delete every connection of this relationship, notifying once per row.
    pub async fn remove_all(&self, db: &Db) -> Result<usize> {
        let name = self.name.clone();
        let deleted = db
            .with_connection(move |conn| store::delete_all(conn, &name))
            .await?;
        log::info!("Removed {} connection(s) of relationship '{}'", deleted.len(), self.name);
        self.notifier.emit(Topic::Removed, self, &deleted)?;
        Ok(deleted.len())
    }

    /// Source entity of `connection`, memoised in `cache`.
    pub fn from_object<S: EntitySource>(
        &self,
        connection: &Connection,
        source: &S,
        cache: &EndpointCache<S::Entity>,
    ) -> Result<S::Entity> {
        self.validate_own(connection)?;
        self.validate_from(&source.kind())?;
        cache.resolve(source, connection.from_id)
    }

    /// Destination entity of `connection`, memoised in `cache`.
    pub fn to_object<S: EntitySource>(
        &self,
        connection: &Connection,
        source: &S,
        cache: &EndpointCache<S::Entity>,
    ) -> Result<S::Entity> {
        self.validate_own(connection)?;
        self.validate_to(&source.kind())?;
        cache.resolve(source, connection.to_id)
    }
}

/// `name (from_model -> to_model)`
impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.name, self.from_kind, self.to_kind)
    }
}
