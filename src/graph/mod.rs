//! Relationship graph: typed relationships, stored connections, traversal.
//!
//! A [`Relationship`] pins a name to a (from kind, to kind) pair and exposes
//! every graph operation; connections live in the `connections` table and are
//! accessed through the [`store`] functions.

mod registry;
mod relationship;
pub mod store;
mod traversal;

pub use registry::{RelationshipRef, RelationshipRegistry};
pub use relationship::{Relationship, NAME_MAX_LENGTH};
pub use traversal::{distance_between, DEFAULT_DISTANCE_LIMIT};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weight given to newly created connections.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A single directed edge (from_id --relationship_name--> to_id).
///
/// Connections are not symmetric: an edge A→B says nothing about B→A.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Row id.
    pub id: i64,
    /// Name of the relationship this edge belongs to.
    pub relationship_name: String,
    /// Identifier of the source entity (of the relationship's from kind).
    pub from_id: i64,
    /// Identifier of the destination entity (of the relationship's to kind).
    pub to_id: i64,
    /// Consumer-defined weight, 1.0 unless changed outside the library.
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}
