//! Connection created/removed notifications.
//!
//! Each [`Relationship`] owns one [`Notifier`]; the relationship is the topic
//! sender. Listeners run synchronously, in registration order, after the
//! storage mutation has been committed.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::graph::{Connection, Relationship};
use crate::{RelgraphError, Result};

/// Notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// A new connection row was inserted.
    Created,
    /// A connection row was deleted.
    Removed,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Created => f.write_str("created"),
            Topic::Removed => f.write_str("removed"),
        }
    }
}

/// Handle returned by [`Notifier::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked with the sending relationship and the affected connection.
pub type Listener = Arc<dyn Fn(&Relationship, &Connection) -> anyhow::Result<()> + Send + Sync>;

pub struct Notifier {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Topic, Listener)>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> ListenerId
    where
        F: Fn(&Relationship, &Connection) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        let mut listeners = self.listeners.write().unwrap_or_else(|p| p.into_inner());
        listeners.push((id, topic, listener));
        id
    }

    /// Returns false if the listener was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|p| p.into_inner());
        let before = listeners.len();
        listeners.retain(|(lid, _, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .count()
    }

    /// Deliver `topic` for each connection to every subscribed listener.
    ///
    /// All listeners are called even if some fail; failures are logged and
    /// then reported together as [`RelgraphError::Listener`].
    pub fn emit(
        &self,
        topic: Topic,
        relationship: &Relationship,
        connections: &[Connection],
    ) -> Result<()> {
        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, l)| Arc::clone(l))
            .collect();
        if listeners.is_empty() {
            return Ok(());
        }

        let mut failures = Vec::new();
        for connection in connections {
            for listener in &listeners {
                if let Err(e) = listener(relationship, connection) {
                    log::warn!(
                        "{} listener failed for {}: {:#}",
                        topic,
                        relationship.describe(connection),
                        e
                    );
                    failures.push(format!("{:#}", e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RelgraphError::Listener {
                relationship: relationship.name().to_string(),
                topic,
                count: failures.len(),
                message: failures.join("; "),
            })
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("created", &self.listener_count(Topic::Created))
            .field("removed", &self.listener_count(Topic::Removed))
            .finish()
    }
}
