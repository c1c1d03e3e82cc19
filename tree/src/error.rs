//! Error type for tree construction, conversion and parsing.

use std::fmt;

use thiserror::Error;

/// Errors produced by the node tree, the document parser and the serde bridge.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The textual document is not well-formed.
    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),
    /// The document is well-formed JSON but violates the node layout.
    #[error("invalid document layout: {0}")]
    Layout(String),
    /// A node had a different kind than the caller expected.
    #[error("expected {expected} node, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A scalar value cannot be represented in the requested type.
    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },
    /// A named child was required but not present.
    #[error("missing child '{0}'")]
    MissingChild(String),
    /// Object children must carry a non-empty name.
    #[error("object child has no name")]
    UnnamedChild,
    /// A child name that the textual form reserves for its markers.
    #[error("'{0}' is a reserved key and cannot name a child")]
    ReservedName(String),
    /// A second child with a name already present in the object.
    #[error("duplicate child '{0}'")]
    DuplicateChild(String),
    /// Error raised from a `Serialize` / `Deserialize` implementation.
    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for TreeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        TreeError::Custom(msg.to_string())
    }
}

impl serde::de::Error for TreeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        TreeError::Custom(msg.to_string())
    }
}
