//! Error types for the save/load pipeline.

use savebox_tree::TreeError;
use thiserror::Error;

use crate::loadable::LoadableObjectId;
use crate::storage::StorageError;

/// Save/load error type.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("save document version {found} is newer than supported version {current}")]
    UnsupportedVersion { found: u32, current: u32 },
    #[error("invalid save document: {0}")]
    InvalidDocument(String),
    #[error("type tag '{0}' does not resolve to a registered type")]
    UnresolvedType(String),
    #[error("record needs loadable object {0} but no loadable object database is configured")]
    MissingDatabase(LoadableObjectId),
    #[error("loadable object {0} is not in the database")]
    MissingLoadableObject(LoadableObjectId),
    #[error("failed to spawn '{name}': {reason}")]
    Spawn { name: String, reason: String },
    #[error("{0}")]
    Entity(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl SaveError {
    /// Shorthand for entity-level failures raised from user code.
    pub fn entity(message: impl Into<String>) -> Self {
        SaveError::Entity(message.into())
    }
}

pub type SaveResult<T> = Result<T, SaveError>;
