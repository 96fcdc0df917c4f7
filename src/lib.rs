pub mod cache;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod graph;
pub mod notify;
pub mod shortcuts;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use entity::{Entity, EntityRef, EntitySource, KindDescriptor, KindId, KindRegistry};
pub use error::{RelgraphError, Result};
pub use graph::{Connection, Relationship, RelationshipRegistry};
pub use notify::{ListenerId, Topic};
