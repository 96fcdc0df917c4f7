use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use crate::entity::EntitySource;
use crate::{RelgraphError, Result};

/// Request-scoped memo of resolved connection endpoints, keyed by entity id.
///
/// One cache holds entities of a single kind. Bounded with LRU eviction so a
/// long request walking many connections keeps memory flat.
pub struct EndpointCache<E> {
    cache: Mutex<LruCache<i64, E>>,
}

impl<E: Clone> EndpointCache<E> {
    /// Create a new endpoint cache holding at most `capacity` entities
    /// (a capacity of 0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<i64, E>> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, id: i64) -> Option<E> {
        self.lock().get(&id).cloned()
    }

    pub fn put(&self, id: i64, entity: E) {
        self.lock().put(id, entity);
    }

    /// The entity with `id`, loaded from `source` on a miss.
    ///
    /// Fails with [`RelgraphError::EntityNotFound`] when the source no longer
    /// has it, e.g. a connection left behind after its endpoint was deleted.
    pub fn resolve<S>(&self, source: &S, id: i64) -> Result<E>
    where
        S: EntitySource<Entity = E>,
    {
        if let Some(entity) = self.get(id) {
            return Ok(entity);
        }
        let entity = source
            .load_many(&[id])?
            .into_iter()
            .next()
            .ok_or_else(|| RelgraphError::EntityNotFound { kind: source.kind(), id })?;
        self.put(id, entity.clone());
        Ok(entity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
