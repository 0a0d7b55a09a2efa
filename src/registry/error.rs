//! Registry usage errors

use std::fmt;

use hecs::Entity;

use super::{HandlerId, RecordId};

/// Misuse of the registry or of a link.
///
/// The operation that detected it was aborted and left every handler,
/// record and link unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Release or unload of a key that is not loaded
    NotLoaded { key: String },
    /// The handler for the key holds no registration for this link
    NotRegistered { key: String },
    /// The link or callback is already registered on the key's handler
    DuplicateLoad { key: String },
    /// A scene load was requested for a key that already has a handler
    DuplicateScene { key: String },
    /// The key's handler manages the other load variant
    KindMismatch { key: String, expected: &'static str },
    /// Instance release on a record that did not request a spawn
    NotAnInstance { key: String },
    /// The handler was already retired
    UnknownHandler(HandlerId),
    /// The record is not registered on the handler
    UnknownRecord { key: String, record: RecordId },
    /// The entity is not a tracked asset instance
    UnknownInstance(Entity),
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded { key } => write!(f, "'{key}' is not loaded"),
            Self::NotRegistered { key } => write!(f, "link is not registered for '{key}'"),
            Self::DuplicateLoad { key } => write!(f, "duplicate load of '{key}'"),
            Self::DuplicateScene { key } => write!(f, "scene '{key}' is already loading or loaded"),
            Self::KindMismatch { key, expected } => {
                write!(f, "'{key}' is not managed as {expected}")
            }
            Self::NotAnInstance { key } => write!(f, "record for '{key}' is not an instance"),
            Self::UnknownHandler(id) => write!(f, "handler {id:?} is no longer registered"),
            Self::UnknownRecord { key, record } => {
                write!(f, "record {record:?} is not registered for '{key}'")
            }
            Self::UnknownInstance(entity) => write!(f, "{entity:?} is not an asset instance"),
        }
    }
}

impl std::error::Error for UsageError {}
