use super::{Node, ScalarNode};
use crate::primitive::Primitive;

/// An ordered, possibly heterogeneous sequence of child nodes.
///
/// Items are positional: a name on an inserted node is cleared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayNode {
    pub name: Option<String>,
    pub type_tag: Option<String>,
    items: Vec<Node>,
}

impl ArrayNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn from_items(items: Vec<Node>) -> Self {
        let mut array = Self::default();
        for item in items {
            array.push(item);
        }
        array
    }

    pub fn push(&mut self, item: impl Into<Node>) {
        let mut item = item.into();
        item.set_name(None);
        self.items.push(item);
    }

    /// Append an unnamed scalar element.
    pub fn add_simple(&mut self, value: impl Into<Primitive>) {
        self.items.push(Node::Scalar(ScalarNode::new(value)));
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Node> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ObjectNode;

    #[test]
    fn items_are_unnamed() {
        let mut array = ArrayNode::from_items(vec![Node::from(ScalarNode::named("a", 1))]);
        array.push(ObjectNode::named("b"));
        array.add_simple(true);
        assert_eq!(array.len(), 3);
        assert!(array.items().iter().all(|item| item.name().is_none()));
    }
}
