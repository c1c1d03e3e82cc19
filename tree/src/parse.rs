//! Reading the textual form back into a node tree.
//!
//! The text is first parsed by `serde_json` (with `preserve_order`, so field
//! order survives) and the resulting value is then mapped onto nodes. The
//! reserved keys are interpreted on the way:
//!
//! - an object's `"StbTypeAssembly"` string becomes its type tag
//! - an array starting with `{"IsStbPrimitiveArray": true}` becomes a
//!   [`PrimitiveArrayNode`], optionally followed by a type tag marker
//! - any other array starting with a lone `{"StbTypeAssembly": ...}` object
//!   takes that tag as its own; a `null` tag there marks the array untagged
//!
//! Object keys go through [`ObjectNode::add_child`], so empty and reserved
//! keys are layout errors.

use std::iter::Peekable;

use serde_json::{Map, Value};

use crate::error::TreeError;
use crate::node::{
    ArrayNode, Node, ObjectNode, PrimitiveArray, PrimitiveArrayNode, ScalarNode,
    PRIMITIVE_ARRAY_MARKER_KEY, TYPE_TAG_KEY,
};
use crate::primitive::{parse_non_finite, Integer, Primitive, PrimitiveKind};

/// Parse a rendered document.
pub fn parse_document(text: &str) -> Result<Node, TreeError> {
    let value: Value = serde_json::from_str(text)?;
    node_from_value(value)
}

/// Map an already parsed JSON value onto a node tree.
pub fn node_from_value(value: Value) -> Result<Node, TreeError> {
    Ok(match value {
        Value::Object(map) => Node::Object(object_from_map(map)?),
        Value::Array(items) => array_from_items(items)?,
        scalar => Node::Scalar(ScalarNode::new(primitive_from_value(scalar)?)),
    })
}

fn object_from_map(map: Map<String, Value>) -> Result<ObjectNode, TreeError> {
    let mut object = ObjectNode::new();
    for (key, value) in map {
        if key == TYPE_TAG_KEY {
            object.type_tag = Some(tag_string(value)?);
            continue;
        }
        let child = node_from_value(value)?.with_name(key);
        object.add_child(child).map_err(|e| TreeError::Layout(e.to_string()))?;
    }
    Ok(object)
}

fn array_from_items(items: Vec<Value>) -> Result<Node, TreeError> {
    let mut items = items.into_iter().peekable();

    if items.peek().is_some_and(is_primitive_array_marker) {
        items.next();
        let type_tag = take_leading_tag(&mut items)?;
        let values = items
            .map(primitive_from_value)
            .collect::<Result<Vec<_>, _>>()?;
        let mut node = PrimitiveArrayNode::new(pack_primitives(values)?);
        node.type_tag = type_tag;
        return Ok(Node::PrimitiveArray(node));
    }

    let type_tag = take_leading_tag(&mut items)?;
    let mut array = ArrayNode::new();
    array.type_tag = type_tag;
    for item in items {
        array.push(node_from_value(item)?);
    }
    Ok(Node::Array(array))
}

fn take_leading_tag(
    items: &mut Peekable<impl Iterator<Item = Value>>,
) -> Result<Option<String>, TreeError> {
    if !items.peek().is_some_and(is_tag_marker) {
        return Ok(None);
    }
    match items.next() {
        Some(Value::Object(mut map)) => match map.remove(TYPE_TAG_KEY) {
            Some(Value::Null) | None => Ok(None),
            Some(tag) => tag_string(tag).map(Some),
        },
        _ => Ok(None),
    }
}

fn is_primitive_array_marker(value: &Value) -> bool {
    match value {
        Value::Object(map) if map.len() == 1 => {
            matches!(map.get(PRIMITIVE_ARRAY_MARKER_KEY), Some(Value::Bool(true)))
        }
        _ => false,
    }
}

/// `{"StbTypeAssembly": "<tag>"}` or `{"StbTypeAssembly": null}`.
fn is_tag_marker(value: &Value) -> bool {
    match value {
        Value::Object(map) if map.len() == 1 => {
            matches!(map.get(TYPE_TAG_KEY), Some(Value::String(_) | Value::Null))
        }
        _ => false,
    }
}

fn tag_string(value: Value) -> Result<String, TreeError> {
    match value {
        Value::String(tag) => Ok(tag),
        other => Err(TreeError::Layout(format!(
            "{TYPE_TAG_KEY} must be a string, found {other}"
        ))),
    }
}

fn primitive_from_value(value: Value) -> Result<Primitive, TreeError> {
    match value {
        Value::Null => Ok(Primitive::Null),
        Value::Bool(b) => Ok(Primitive::Bool(b)),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Primitive::Int(Integer::from(v)))
            } else if let Some(v) = n.as_u64() {
                Ok(Primitive::Int(Integer::from(v)))
            } else {
                n.as_f64()
                    .map(Primitive::Float)
                    .ok_or_else(|| TreeError::Layout(format!("unrepresentable number {n}")))
            }
        }
        Value::String(s) => Ok(Primitive::String(s)),
        Value::Array(_) | Value::Object(_) => Err(TreeError::Layout(
            "primitive arrays may only contain scalar values".to_owned(),
        )),
    }
}

/// Infer the storage kind for the values of a primitive array.
///
/// Integers and floats may mix (the array widens to floats), and so may
/// numbers and the non-finite float tokens. An empty array has no kind and
/// converts to any kind on read.
fn pack_primitives(values: Vec<Primitive>) -> Result<PrimitiveArray, TreeError> {
    if values.is_empty() {
        return Ok(PrimitiveArray::Int(Vec::new()));
    }
    if values.iter().any(Primitive::is_null) {
        return Err(TreeError::Layout(
            "primitive arrays cannot contain null".to_owned(),
        ));
    }
    let first = values[0].kind();
    if values.iter().all(|v| v.kind() == first) {
        return PrimitiveArray::from_primitives(values)
            .ok_or_else(|| TreeError::Layout("inconsistent primitive array".to_owned()));
    }

    let numeric = |v: &Primitive| matches!(v.kind(), PrimitiveKind::Int | PrimitiveKind::Float);
    let all_float_like = values.iter().all(|v| {
        numeric(v) || v.as_str().map(|s| parse_non_finite(s).is_some()).unwrap_or(false)
    });
    if all_float_like && values.iter().any(numeric) {
        let floats = values
            .iter()
            .map(Primitive::as_f64)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(PrimitiveArray::Float(floats));
    }

    Err(TreeError::Layout(format!(
        "primitive array mixes {} with other kinds",
        first.name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_reads_tag_and_children_in_order() {
        let node =
            parse_document(r#"{"StbTypeAssembly": "game::Npc", "b": 1, "a": "x"}"#).unwrap();
        let object = node.expect_object().unwrap();
        assert_eq!(object.type_tag.as_deref(), Some("game::Npc"));
        let names: Vec<_> = object.children().iter().filter_map(Node::name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(object.primitive("b").unwrap(), &Primitive::from(1));
    }

    #[test]
    fn marker_makes_primitive_array() {
        let node =
            parse_document(r#"[{"IsStbPrimitiveArray": true}, {"StbTypeAssembly": "i32[]"}, 1, 2]"#)
                .unwrap();
        let array = node.expect_primitive_array().unwrap();
        assert_eq!(array.type_tag.as_deref(), Some("i32[]"));
        assert_eq!(array.values, PrimitiveArray::from(vec![1i64, 2]));
    }

    #[test]
    fn unsigned_beyond_i64_stays_integral() {
        let node = parse_document(r#"[{"IsStbPrimitiveArray": true}, 1, 18446744073709551615]"#)
            .unwrap();
        assert_eq!(
            node.expect_primitive_array().unwrap().values,
            PrimitiveArray::from(vec![1u64, u64::MAX])
        );
    }

    #[test]
    fn mixed_numbers_widen_to_float() {
        let node = parse_document(r#"[{"IsStbPrimitiveArray": true}, 1, 2.5, "NaN"]"#).unwrap();
        let values = node.expect_primitive_array().unwrap().as_f64_vec().unwrap();
        assert_eq!(values[..2], [1.0, 2.5]);
        assert!(values[2].is_nan());
    }

    #[test]
    fn mixed_kinds_in_primitive_array_fail() {
        let err = parse_document(r#"[{"IsStbPrimitiveArray": true}, 1, "a"]"#).unwrap_err();
        assert!(matches!(err, TreeError::Layout(_)));
        let err = parse_document(r#"[{"IsStbPrimitiveArray": true}, null]"#).unwrap_err();
        assert!(matches!(err, TreeError::Layout(_)));
    }

    #[test]
    fn leading_tag_marker_tags_regular_array() {
        let node = parse_document(r#"[{"StbTypeAssembly": "List"}, {"x": 1}, 3]"#).unwrap();
        let array = node.expect_array().unwrap();
        assert_eq!(array.type_tag.as_deref(), Some("List"));
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn null_tag_marker_leaves_array_untagged() {
        let node =
            parse_document(r#"[{"StbTypeAssembly": null}, {"StbTypeAssembly": "Marker"}, 3]"#)
                .unwrap();
        let array = node.expect_array().unwrap();
        assert_eq!(array.type_tag, None);
        assert_eq!(array.len(), 2);
        assert_eq!(array.items()[0].type_tag(), Some("Marker"));
    }

    #[test]
    fn empty_and_reserved_keys_are_layout_errors() {
        for text in [r#"{"": 5}"#, r#"{"IsStbPrimitiveArray": true}"#] {
            assert!(
                matches!(parse_document(text), Err(TreeError::Layout(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(matches!(
            parse_document("{\"a\": "),
            Err(TreeError::Parse(_))
        ));
        assert!(matches!(
            parse_document(r#"{"StbTypeAssembly": 3}"#),
            Err(TreeError::Layout(_))
        ));
    }
}
