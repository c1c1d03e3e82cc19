//! Serde bridge between arbitrary Rust values and the node tree.
//!
//! Use [`to_node`] and [`from_node`] to convert between any serde type and a
//! [`Node`]. The mapping:
//!
//! | serde data model            | node                                   |
//! |-----------------------------|----------------------------------------|
//! | bool, integers, floats, char, str | [`ScalarNode`] (a char is a one-character string) |
//! | `None`, unit, unit struct   | scalar `null`                          |
//! | struct, map                 | [`ObjectNode`], one named child per field |
//! | seq, tuple of one scalar kind | [`PrimitiveArrayNode`]               |
//! | any other seq or tuple      | [`ArrayNode`]                          |
//! | bytes                       | `u64` primitive array                  |
//! | unit variant                | string scalar                          |
//! | newtype/tuple/struct variant | object with a single child named after the variant |
//!
//! Field and map key names follow [`ObjectNode::add_child`]: a reserved key
//! or two keys rendering to the same name fail serialization.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Unexpected,
    Visitor,
};
use serde::{forward_to_deserialize_any, Deserializer, Serialize};

use crate::error::TreeError;
use crate::node::{ArrayNode, Node, ObjectNode, PrimitiveArray, PrimitiveArrayNode, ScalarNode};
use crate::primitive::Primitive;

/// Convert any `T: Serialize` into a [`Node`].
pub fn to_node<T: ?Sized + Serialize>(value: &T) -> Result<Node, TreeError> {
    value.serialize(NodeSerializer)
}

/// Convert a [`Node`] back into any `T: DeserializeOwned`.
pub fn from_node<T: DeserializeOwned>(node: &Node) -> Result<T, TreeError> {
    T::deserialize(NodeDeserializer(node))
}

impl ObjectNode {
    /// Serialize `value` and append it as a child named `name`.
    pub fn add_value<T: ?Sized + Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), TreeError> {
        self.add_child(to_node(value)?.with_name(name))
    }

    /// Deserialize the child named `name`.
    pub fn read_value<T: DeserializeOwned>(&self, name: &str) -> Result<T, TreeError> {
        from_node(self.child(name)?)
    }
}

fn scalar(value: impl Into<Primitive>) -> Node {
    Node::Scalar(ScalarNode::new(value))
}

/// Pack a finished sequence: homogeneous unnamed scalars become a primitive
/// array, everything else an array node.
fn pack_sequence(items: Vec<Node>) -> Node {
    let packable = !items.is_empty()
        && items.iter().all(|item| match item {
            Node::Scalar(n) => n.name.is_none() && !n.value.is_null(),
            _ => false,
        });
    if packable {
        let values: Vec<Primitive> = items
            .iter()
            .filter_map(|item| item.as_scalar().map(|n| n.value.clone()))
            .collect();
        if let Some(values) = PrimitiveArray::from_primitives(values) {
            return Node::PrimitiveArray(PrimitiveArrayNode::new(values));
        }
    }
    Node::Array(ArrayNode::from_items(items))
}

fn single_child_object(name: &str, child: Node) -> Result<Node, TreeError> {
    let mut object = ObjectNode::new();
    object.add_child(child.with_name(name))?;
    Ok(Node::Object(object))
}

// ---------------------------------------------------------------------------
// NodeSerializer
// ---------------------------------------------------------------------------

struct NodeSerializer;

impl serde::Serializer for NodeSerializer {
    type Ok = Node;
    type Error = TreeError;
    type SerializeSeq = NodeSerializeSeq;
    type SerializeTuple = NodeSerializeSeq;
    type SerializeTupleStruct = NodeSerializeSeq;
    type SerializeTupleVariant = NodeSerializeTupleVariant;
    type SerializeMap = NodeSerializeMap;
    type SerializeStruct = NodeSerializeMap;
    type SerializeStructVariant = NodeSerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_i16(self, v: i16) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_i32(self, v: i32) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_i64(self, v: i64) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_u16(self, v: u16) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_u32(self, v: u32) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_u64(self, v: u64) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_f64(self, v: f64) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }

    fn serialize_char(self, v: char) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_str(self, v: &str) -> Result<Node, TreeError> {
        Ok(scalar(v))
    }
    fn serialize_bytes(self, v: &[u8]) -> Result<Node, TreeError> {
        Ok(Node::PrimitiveArray(PrimitiveArrayNode::new(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Node, TreeError> {
        Ok(scalar(Primitive::Null))
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Node, TreeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Node, TreeError> {
        Ok(scalar(Primitive::Null))
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Node, TreeError> {
        Ok(scalar(Primitive::Null))
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Node, TreeError> {
        Ok(scalar(variant))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Node, TreeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Node, TreeError> {
        let inner = value.serialize(NodeSerializer)?;
        single_child_object(variant, inner)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<NodeSerializeSeq, TreeError> {
        Ok(NodeSerializeSeq {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<NodeSerializeSeq, TreeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<NodeSerializeSeq, TreeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<NodeSerializeTupleVariant, TreeError> {
        Ok(NodeSerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<NodeSerializeMap, TreeError> {
        Ok(NodeSerializeMap {
            object: ObjectNode::new(),
            current_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<NodeSerializeMap, TreeError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<NodeSerializeStructVariant, TreeError> {
        Ok(NodeSerializeStructVariant {
            variant,
            object: ObjectNode::new(),
        })
    }
}

struct NodeSerializeSeq {
    items: Vec<Node>,
}

impl serde::ser::SerializeSeq for NodeSerializeSeq {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), TreeError> {
        self.items.push(value.serialize(NodeSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Node, TreeError> {
        Ok(pack_sequence(self.items))
    }
}

impl serde::ser::SerializeTuple for NodeSerializeSeq {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), TreeError> {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node, TreeError> {
        serde::ser::SerializeSeq::end(self)
    }
}

impl serde::ser::SerializeTupleStruct for NodeSerializeSeq {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), TreeError> {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node, TreeError> {
        serde::ser::SerializeSeq::end(self)
    }
}

struct NodeSerializeTupleVariant {
    variant: &'static str,
    items: Vec<Node>,
}

impl serde::ser::SerializeTupleVariant for NodeSerializeTupleVariant {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), TreeError> {
        self.items.push(value.serialize(NodeSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Node, TreeError> {
        single_child_object(self.variant, pack_sequence(self.items))
    }
}

struct NodeSerializeMap {
    object: ObjectNode,
    current_key: Option<String>,
}

impl serde::ser::SerializeMap for NodeSerializeMap {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), TreeError> {
        let key = match key.serialize(NodeSerializer)? {
            Node::Scalar(ScalarNode {
                value: Primitive::String(s),
                ..
            }) => s,
            Node::Scalar(ScalarNode { value, .. }) if !value.is_null() => {
                // Non-string keys are stored as their token, e.g. `3` or `true`.
                value.to_token()
            }
            other => {
                return Err(TreeError::Custom(format!(
                    "map keys must be scalar values, found {}",
                    other.kind_name()
                )))
            }
        };
        self.current_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), TreeError> {
        let key = self.current_key.take().ok_or_else(|| {
            TreeError::Custom("serialize_value called before serialize_key".into())
        })?;
        self.object
            .add_child(value.serialize(NodeSerializer)?.with_name(key))
    }

    fn end(self) -> Result<Node, TreeError> {
        Ok(Node::Object(self.object))
    }
}

impl serde::ser::SerializeStruct for NodeSerializeMap {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), TreeError> {
        self.object
            .add_child(value.serialize(NodeSerializer)?.with_name(key))
    }

    fn end(self) -> Result<Node, TreeError> {
        Ok(Node::Object(self.object))
    }
}

struct NodeSerializeStructVariant {
    variant: &'static str,
    object: ObjectNode,
}

impl serde::ser::SerializeStructVariant for NodeSerializeStructVariant {
    type Ok = Node;
    type Error = TreeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), TreeError> {
        self.object
            .add_child(value.serialize(NodeSerializer)?.with_name(key))
    }

    fn end(self) -> Result<Node, TreeError> {
        single_child_object(self.variant, Node::Object(self.object))
    }
}

// ---------------------------------------------------------------------------
// NodeDeserializer: &Node -> T
// ---------------------------------------------------------------------------

struct NodeDeserializer<'de>(&'de Node);

impl<'de> NodeDeserializer<'de> {
    fn unexpected(&self) -> Unexpected<'static> {
        Unexpected::Other(self.0.kind_name())
    }
}

macro_rules! forward_scalar {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
                match self.0 {
                    Node::Scalar(n) => PrimitiveDeserializer(n.value.clone()).$method(visitor),
                    _ => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for NodeDeserializer<'de> {
    type Error = TreeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Node::Scalar(n) => PrimitiveDeserializer(n.value.clone()).deserialize_any(visitor),
            Node::Object(n) => visitor.visit_map(ObjectAccess {
                iter: n.children().iter(),
                pending_value: None,
            }),
            Node::Array(n) => visitor.visit_seq(NodeSeqAccess::Nodes(n.items().iter())),
            Node::PrimitiveArray(n) => visitor.visit_seq(NodeSeqAccess::Primitives {
                values: &n.values,
                index: 0,
            }),
        }
    }

    forward_scalar! {
        deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64
        deserialize_char deserialize_str deserialize_string
        deserialize_unit deserialize_identifier
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_seq(visitor)
    }
    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Node::Scalar(n) if n.value.is_null() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Node::Array(_) | Node::PrimitiveArray(_) => self.deserialize_any(visitor),
            _ => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        self.deserialize_seq(visitor)
    }
    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Node::Object(_) => self.deserialize_any(visitor),
            _ => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        match self.0 {
            Node::Scalar(n) => {
                PrimitiveDeserializer(n.value.clone()).deserialize_enum(name, variants, visitor)
            }
            Node::Object(n) if n.len() == 1 => {
                let child = &n.children()[0];
                visitor.visit_enum(NodeEnumAccess {
                    variant: child.name().unwrap_or(""),
                    content: child,
                })
            }
            _ => Err(TreeError::Custom(format!(
                "enum {name} expects a string or a single-entry object, found {}",
                self.0.kind_name()
            ))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_unit()
    }
}

// --- PrimitiveDeserializer ---

struct PrimitiveDeserializer(Primitive);

impl<'de> Deserializer<'de> for PrimitiveDeserializer {
    type Error = TreeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Primitive::Null => visitor.visit_unit(),
            Primitive::Bool(v) => visitor.visit_bool(v),
            Primitive::Int(v) => match (v.to_i64(), v.to_u64()) {
                (Some(signed), _) => visitor.visit_i64(signed),
                (None, Some(unsigned)) => visitor.visit_u64(unsigned),
                (None, None) => visitor.visit_i128(v.get()),
            },
            Primitive::Float(v) => visitor.visit_f64(v),
            Primitive::String(v) => visitor.visit_string(v),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_bool(self.0.as_bool()?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_i64(visitor)
    }
    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_i64(visitor)
    }
    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_i64(visitor)
    }
    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_i64(self.0.as_i64()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_u64(visitor)
    }
    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_u64(visitor)
    }
    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_u64(visitor)
    }
    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_u64(self.0.as_u64()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_f32(self.0.as_f32()?)
    }
    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_f64(self.0.as_f64()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_char(self.0.as_char()?)
    }
    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_string(visitor)
    }
    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_string(self.0.as_str()?.to_owned())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Primitive::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        match self.0 {
            Primitive::Null => visitor.visit_unit(),
            other => Err(TreeError::Conversion {
                value: other.to_token(),
                target: "unit",
            }),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        let variant: de::value::StringDeserializer<TreeError> =
            self.0.as_str()?.to_owned().into_deserializer();
        visitor.visit_enum(variant)
    }

    forward_to_deserialize_any! {
        bytes byte_buf unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

// --- KeyDeserializer ---

/// Deserializes an object child name. Numeric and boolean targets parse the
/// name, which is how non-string map keys come back.
struct KeyDeserializer<'de>(&'de str);

impl<'de> KeyDeserializer<'de> {
    fn parse<T: std::str::FromStr>(&self, target: &'static str) -> Result<T, TreeError> {
        self.0.parse().map_err(|_| TreeError::Conversion {
            value: self.0.to_owned(),
            target,
        })
    }
}

impl<'de> Deserializer<'de> for KeyDeserializer<'de> {
    type Error = TreeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_borrowed_str(self.0)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_bool(self.parse("bool")?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_i64(visitor)
    }
    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_i64(visitor)
    }
    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_i64(visitor)
    }
    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_i64(self.parse("i64")?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_u64(visitor)
    }
    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_u64(visitor)
    }
    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_u64(visitor)
    }
    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, TreeError> {
        visitor.visit_u64(self.parse("u64")?)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        let variant: de::value::BorrowedStrDeserializer<'de, TreeError> =
            de::value::BorrowedStrDeserializer::new(self.0);
        visitor.visit_enum(variant)
    }

    forward_to_deserialize_any! {
        f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

// --- SeqAccess ---

enum NodeSeqAccess<'de> {
    Nodes(std::slice::Iter<'de, Node>),
    Primitives {
        values: &'de PrimitiveArray,
        index: usize,
    },
}

impl<'de> SeqAccess<'de> for NodeSeqAccess<'de> {
    type Error = TreeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, TreeError> {
        match self {
            NodeSeqAccess::Nodes(iter) => match iter.next() {
                Some(node) => seed.deserialize(NodeDeserializer(node)).map(Some),
                None => Ok(None),
            },
            NodeSeqAccess::Primitives { values, index } => match values.get(*index) {
                Some(value) => {
                    *index += 1;
                    seed.deserialize(PrimitiveDeserializer(value)).map(Some)
                }
                None => Ok(None),
            },
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self {
            NodeSeqAccess::Nodes(iter) => Some(iter.len()),
            NodeSeqAccess::Primitives { values, index } => Some(values.len() - index),
        }
    }
}

// --- MapAccess ---

struct ObjectAccess<'de> {
    iter: std::slice::Iter<'de, Node>,
    pending_value: Option<&'de Node>,
}

impl<'de> MapAccess<'de> for ObjectAccess<'de> {
    type Error = TreeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, TreeError> {
        match self.iter.next() {
            Some(child) => {
                self.pending_value = Some(child);
                seed.deserialize(KeyDeserializer(child.name().unwrap_or("")))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, TreeError> {
        let value = self.pending_value.take().ok_or_else(|| {
            TreeError::Custom("next_value_seed called before next_key_seed".into())
        })?;
        seed.deserialize(NodeDeserializer(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

// --- EnumAccess ---

struct NodeEnumAccess<'de> {
    variant: &'de str,
    content: &'de Node,
}

impl<'de> de::EnumAccess<'de> for NodeEnumAccess<'de> {
    type Error = TreeError;
    type Variant = NodeDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), TreeError> {
        let variant = seed.deserialize(KeyDeserializer(self.variant))?;
        Ok((variant, NodeDeserializer(self.content)))
    }
}

impl<'de> de::VariantAccess<'de> for NodeDeserializer<'de> {
    type Error = TreeError;

    fn unit_variant(self) -> Result<(), TreeError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, TreeError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, TreeError> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, TreeError> {
        self.deserialize_map(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[test]
    fn roundtrip_primitives() {
        assert!(from_node::<bool>(&to_node(&true).unwrap()).unwrap());
        assert_eq!(from_node::<i32>(&to_node(&42i32).unwrap()).unwrap(), 42);
        assert_eq!(from_node::<u64>(&to_node(&99u64).unwrap()).unwrap(), 99);
        assert_eq!(from_node::<f32>(&to_node(&1.5f32).unwrap()).unwrap(), 1.5);
        assert_eq!(from_node::<char>(&to_node(&'q').unwrap()).unwrap(), 'q');
        assert_eq!(
            from_node::<String>(&to_node("hello").unwrap()).unwrap(),
            "hello"
        );
    }

    #[test]
    fn homogeneous_sequences_become_primitive_arrays() {
        let node = to_node(&vec![1u32, 2, 3]).unwrap();
        assert_eq!(
            node.expect_primitive_array().unwrap().values,
            PrimitiveArray::from(vec![1u32, 2, 3])
        );
        assert_eq!(from_node::<Vec<u32>>(&node).unwrap(), vec![1, 2, 3]);

        let mixed = to_node(&(1i32, "two")).unwrap();
        assert!(mixed.as_array().is_some());
        assert_eq!(
            from_node::<(i32, String)>(&mixed).unwrap(),
            (1, "two".to_owned())
        );
    }

    #[test]
    fn optional_values() {
        let some = to_node(&Some(42i32)).unwrap();
        let none = to_node(&None::<i32>).unwrap();
        assert_eq!(from_node::<Option<i32>>(&some).unwrap(), Some(42));
        assert_eq!(from_node::<Option<i32>>(&none).unwrap(), None);

        let with_gap = to_node(&vec![Some(1), None]).unwrap();
        assert!(with_gap.as_array().is_some());
        assert_eq!(
            from_node::<Vec<Option<i32>>>(&with_gap).unwrap(),
            vec![Some(1), None]
        );
    }

    #[test]
    fn structs_become_named_children() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Stats {
            health: i32,
            speed: f32,
            tags: Vec<String>,
            nickname: Option<String>,
        }
        let stats = Stats {
            health: 42,
            speed: 2.5,
            tags: vec!["brave".into()],
            nickname: None,
        };
        let node = to_node(&stats).unwrap();
        let object = node.expect_object().unwrap();
        assert_eq!(object.primitive("health").unwrap(), &Primitive::from(42));
        assert_eq!(from_node::<Stats>(&node).unwrap(), stats);
    }

    #[test]
    fn enums_use_variant_names() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        enum Shape {
            Empty,
            Circle(f64),
            Segment(i32, i32),
            Rect { w: u8, h: u8 },
        }
        for shape in [
            Shape::Empty,
            Shape::Circle(1.5),
            Shape::Segment(3, 4),
            Shape::Rect { w: 1, h: 2 },
        ] {
            let node = to_node(&shape).unwrap();
            assert_eq!(from_node::<Shape>(&node).unwrap(), shape);
        }
        let node = to_node(&Shape::Circle(1.5)).unwrap();
        assert_eq!(node.expect_object().unwrap().children()[0].name(), Some("Circle"));
    }

    #[test]
    fn integer_map_keys_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert(3u32, "three".to_owned());
        map.insert(10u32, "ten".to_owned());
        let node = to_node(&map).unwrap();
        assert!(node.expect_object().unwrap().try_get_child("10").is_some());
        assert_eq!(from_node::<BTreeMap<u32, String>>(&node).unwrap(), map);
    }

    #[test]
    fn colliding_keys_fail_serialization() {
        let mut map = BTreeMap::new();
        map.insert("StbTypeAssembly".to_owned(), 1);
        assert!(matches!(to_node(&map), Err(TreeError::ReservedName(_))));

        let mut map = BTreeMap::new();
        map.insert(1u8, "int");
        map.insert(2u8, "int");
        assert!(to_node(&map).is_ok());

        // `true` and "true" both become the key `true`
        struct Colliding;
        impl Serialize for Colliding {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(&true, &1)?;
                map.serialize_entry("true", &2)?;
                map.end()
            }
        }
        let err = to_node(&Colliding).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateChild(name) if name == "true"));
    }

    #[test]
    fn object_value_helpers() {
        let mut object = ObjectNode::new();
        object.add_value("position", &[1.0f32, 2.0]).unwrap();
        assert_eq!(
            object.read_value::<[f32; 2]>("position").unwrap(),
            [1.0, 2.0]
        );
        assert!(matches!(
            object.read_value::<i32>("missing"),
            Err(TreeError::MissingChild(_))
        ));
    }

    #[test]
    fn non_finite_floats_survive() {
        let node = to_node(&vec![f64::INFINITY, 1.0]).unwrap();
        let text = node.render_to_string(crate::RenderOptions::compact());
        let parsed = crate::parse_document(&text).unwrap();
        let back: Vec<f64> = from_node(&parsed).unwrap();
        assert_eq!(back, vec![f64::INFINITY, 1.0]);
    }
}
