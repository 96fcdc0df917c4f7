use thiserror::Error;

use crate::entity::KindId;
use crate::notify::Topic;

/// Main error type for relgraph
#[derive(Error, Debug)]
pub enum RelgraphError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A relationship with this name is already registered
    #[error("Relationship already defined: '{0}'")]
    DuplicateName(String),

    /// Relationship names are stored in a bounded column
    #[error("Relationship name too long ({len} > {max}): '{name}'")]
    NameTooLong { name: String, len: usize, max: usize },

    /// Kind descriptor is malformed, names no registered kind, or is a type
    /// with no kind bound to it
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    /// Type is bound to more than one kind
    #[error("Entity kind is ambiguous: {0}")]
    AmbiguousKind(String),

    /// Lookup of an undefined relationship
    #[error("Relationship not found: '{0}'")]
    RelationshipNotFound(String),

    /// Entity of the wrong kind passed to a relationship operation
    #[error("Relationship \"{relationship}\" does not support connections {direction} \"{kind}\" types")]
    KindMismatch {
        relationship: String,
        kind: KindId,
        direction: &'static str,
    },

    /// Connection endpoint no longer exists in its entity store
    #[error("Entity not found: {kind}:{id}")]
    EntityNotFound { kind: KindId, id: i64 },

    /// One or more listeners failed after the mutation was committed
    #[error("{count} {topic} listener(s) failed on relationship '{relationship}': {message}")]
    Listener {
        relationship: String,
        topic: Topic,
        count: usize,
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using RelgraphError
pub type Result<T> = std::result::Result<T, RelgraphError>;
