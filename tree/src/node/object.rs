use super::{Node, ScalarNode, PRIMITIVE_ARRAY_MARKER_KEY, TYPE_TAG_KEY};
use crate::error::TreeError;
use crate::primitive::Primitive;

/// A structured record: an ordered sequence of named children.
///
/// Insertion order is preserved and is the render order. Every child has a
/// non-empty name that is unique within the object and is not one of the
/// reserved marker keys; the textual form keys children by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectNode {
    pub name: Option<String>,
    pub type_tag: Option<String>,
    children: Vec<Node>,
}

impl ObjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Append a named child node.
    pub fn add_child(&mut self, child: impl Into<Node>) -> Result<(), TreeError> {
        let child = child.into();
        let name = child.name().ok_or(TreeError::UnnamedChild)?;
        validate_child_name(name)?;
        if self.try_get_child(name).is_some() {
            return Err(TreeError::DuplicateChild(name.to_owned()));
        }
        self.children.push(child);
        Ok(())
    }

    /// Append a named scalar child.
    pub fn add_simple_child(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Primitive>,
    ) -> Result<(), TreeError> {
        self.add_child(ScalarNode::named(name, value))
    }

    /// Child whose name equals `name` (case-sensitive).
    pub fn try_get_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name() == Some(name))
    }

    /// Named child, or [`TreeError::MissingChild`].
    pub fn child(&self, name: &str) -> Result<&Node, TreeError> {
        self.try_get_child(name)
            .ok_or_else(|| TreeError::MissingChild(name.to_owned()))
    }

    /// Scalar payload of a named child.
    pub fn primitive(&self, name: &str) -> Result<&Primitive, TreeError> {
        self.child(name)?.expect_primitive()
    }

    /// Remove and return the child named `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        let index = self.children.iter().position(|c| c.name() == Some(name))?;
        Some(self.children.remove(index))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

fn validate_child_name(name: &str) -> Result<(), TreeError> {
    match name {
        "" => Err(TreeError::UnnamedChild),
        TYPE_TAG_KEY | PRIMITIVE_ARRAY_MARKER_KEY => Err(TreeError::ReservedName(name.to_owned())),
        _ => Ok(()),
    }
}
