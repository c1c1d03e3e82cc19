//! The in-memory document tree.
//!
//! A [`Node`] is one of four kinds:
//!
//! - [`ScalarNode`] — a single [`Primitive`] value
//! - [`ObjectNode`] — ordered, named children (a record)
//! - [`ArrayNode`] — ordered, heterogeneous children (a sequence)
//! - [`PrimitiveArrayNode`] — a flat, homogeneous run of primitives
//!
//! Every node carries an optional `name` (its slot label inside the parent
//! object). Compound nodes also carry an optional `type_tag` (the runtime
//! type needed to rebuild them); a scalar's kind is implied by its literal.

mod array;
mod object;
mod primitive_array;

pub use array::ArrayNode;
pub use object::ObjectNode;
pub use primitive_array::{PrimitiveArray, PrimitiveArrayNode};

use crate::error::TreeError;
use crate::primitive::Primitive;

/// Reserved key carrying a node's type tag in the textual form.
pub const TYPE_TAG_KEY: &str = "StbTypeAssembly";

/// Reserved key marking an array as a [`PrimitiveArrayNode`].
pub const PRIMITIVE_ARRAY_MARKER_KEY: &str = "IsStbPrimitiveArray";

/// A node of the document tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Scalar(ScalarNode),
    Object(ObjectNode),
    Array(ArrayNode),
    PrimitiveArray(PrimitiveArrayNode),
}

impl Node {
    /// Slot label inside the parent object, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Scalar(n) => n.name.as_deref(),
            Node::Object(n) => n.name.as_deref(),
            Node::Array(n) => n.name.as_deref(),
            Node::PrimitiveArray(n) => n.name.as_deref(),
        }
    }

    pub fn set_name(&mut self, name: Option<String>) {
        match self {
            Node::Scalar(n) => n.name = name,
            Node::Object(n) => n.name = name,
            Node::Array(n) => n.name = name,
            Node::PrimitiveArray(n) => n.name = name,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(Some(name.into()));
        self
    }

    /// Type tag recorded for this node, if any. Always `None` for scalars.
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            Node::Scalar(_) => None,
            Node::Object(n) => n.type_tag.as_deref(),
            Node::Array(n) => n.type_tag.as_deref(),
            Node::PrimitiveArray(n) => n.type_tag.as_deref(),
        }
    }

    /// Set the type tag of a compound node. Scalars carry no tag; the call
    /// leaves them unchanged.
    pub fn set_type_tag(&mut self, type_tag: Option<String>) {
        match self {
            Node::Scalar(_) => {}
            Node::Object(n) => n.type_tag = type_tag,
            Node::Array(n) => n.type_tag = type_tag,
            Node::PrimitiveArray(n) => n.type_tag = type_tag,
        }
    }

    pub fn with_type_tag(mut self, type_tag: impl Into<String>) -> Self {
        self.set_type_tag(Some(type_tag.into()));
        self
    }

    /// Kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Object(_) => "object",
            Node::Array(_) => "array",
            Node::PrimitiveArray(_) => "primitive array",
        }
    }

    /// Number of scalar leaves below (and including) this node.
    ///
    /// Primitive-array elements count as leaves. Used for diagnostics only.
    pub fn underlying_node_count(&self) -> usize {
        match self {
            Node::Scalar(_) => 1,
            Node::Object(n) => n.children().iter().map(Node::underlying_node_count).sum(),
            Node::Array(n) => n.items().iter().map(Node::underlying_node_count).sum(),
            Node::PrimitiveArray(n) => n.len(),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            Node::Scalar(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            Node::Object(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Node::Array(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_primitive_array(&self) -> Option<&PrimitiveArrayNode> {
        match self {
            Node::PrimitiveArray(n) => Some(n),
            _ => None,
        }
    }

    /// Scalar payload, or a kind mismatch error.
    pub fn expect_primitive(&self) -> Result<&Primitive, TreeError> {
        self.as_scalar()
            .map(|n| &n.value)
            .ok_or_else(|| self.kind_mismatch("scalar"))
    }

    pub fn expect_object(&self) -> Result<&ObjectNode, TreeError> {
        self.as_object().ok_or_else(|| self.kind_mismatch("object"))
    }

    pub fn expect_array(&self) -> Result<&ArrayNode, TreeError> {
        self.as_array().ok_or_else(|| self.kind_mismatch("array"))
    }

    pub fn expect_primitive_array(&self) -> Result<&PrimitiveArrayNode, TreeError> {
        self.as_primitive_array()
            .ok_or_else(|| self.kind_mismatch("primitive array"))
    }

    fn kind_mismatch(&self, expected: &'static str) -> TreeError {
        TreeError::KindMismatch {
            expected,
            found: self.kind_name(),
        }
    }
}

impl From<ScalarNode> for Node {
    fn from(node: ScalarNode) -> Self {
        Node::Scalar(node)
    }
}

impl From<ObjectNode> for Node {
    fn from(node: ObjectNode) -> Self {
        Node::Object(node)
    }
}

impl From<ArrayNode> for Node {
    fn from(node: ArrayNode) -> Self {
        Node::Array(node)
    }
}

impl From<PrimitiveArrayNode> for Node {
    fn from(node: PrimitiveArrayNode) -> Self {
        Node::PrimitiveArray(node)
    }
}

impl From<Primitive> for Node {
    fn from(value: Primitive) -> Self {
        Node::Scalar(ScalarNode::new(value))
    }
}

/// A leaf holding one primitive value.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarNode {
    pub name: Option<String>,
    pub value: Primitive,
}

impl ScalarNode {
    pub fn new(value: impl Into<Primitive>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}
