//! Shared test fixtures: two entity kinds, an in-memory entity source and a
//! migrated throwaway database.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::db::{migrate, Db};
use crate::entity::{Entity, EntitySource, KindId, KindRegistry};
use crate::Result;

pub fn user_kind() -> KindId {
    KindId::new("auth", "user")
}

pub fn group_kind() -> KindId {
    KindId::new("auth", "group")
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

impl User {
    pub fn new(id: i64, username: &str) -> Self {
        Self { id, username: username.to_string() }
    }
}

impl Entity for User {
    fn kind(&self) -> KindId {
        user_kind()
    }

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

impl Group {
    pub fn new(id: i64, name: &str) -> Self {
        Self { id, name: name.to_string() }
    }
}

impl Entity for Group {
    fn kind(&self) -> KindId {
        group_kind()
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// `auth.user` bound to [`User`], `auth.group` bound to [`Group`].
pub fn kinds() -> Arc<KindRegistry> {
    let mut kinds = KindRegistry::new();
    kinds
        .register_type::<User>(user_kind())
        .register_type::<Group>(group_kind());
    Arc::new(kinds)
}

/// Entity store backed by a map; counts `load_many` calls.
pub struct MemorySource<E> {
    kind: KindId,
    rows: Mutex<BTreeMap<i64, E>>,
    loads: AtomicUsize,
}

impl<E: Entity + Clone> MemorySource<E> {
    pub fn new(kind: KindId, entities: Vec<E>) -> Self {
        let rows = entities.into_iter().map(|e| (e.id(), e)).collect();
        Self {
            kind,
            rows: Mutex::new(rows),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn remove(&self, id: i64) {
        self.rows.lock().unwrap().remove(&id);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl<E: Entity + Clone + Send> EntitySource for MemorySource<E> {
    type Entity = E;

    fn kind(&self) -> KindId {
        self.kind.clone()
    }

    fn load_many(&self, ids: &[i64]) -> Result<Vec<E>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }
}

pub async fn setup_test_db() -> (Db, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Db::new(&db_path);
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await
        .unwrap();
    (db, temp_dir)
}
