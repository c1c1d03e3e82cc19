//! # savebox-tree
//!
//! The document layer of savebox: an in-memory node tree, its textual
//! rendering and the parser that reads it back.
//!
//! ## Core Types
//!
//! - [`Primitive`] — A scalar value and its token form
//! - [`Node`] — One node of the tree: scalar, object, array or primitive array
//! - [`ObjectNode`] / [`ArrayNode`] / [`PrimitiveArrayNode`] — Compound nodes
//!
//! ## Rendering
//!
//! - [`RenderOptions`] — Pretty/compact output and type tag emission
//! - [`RenderTask`] — Resumable renderer with an explicit stack
//! - [`render_async`] — Frame-budgeted rendering that suspends via [`yield_now`]
//! - [`FrameBudget`] — Wall-clock interval between suspensions
//!
//! ## Reading
//!
//! - [`parse_document`] — Text back into a [`Node`]
//! - [`to_node`] / [`from_node`] — Serde bridge for arbitrary Rust values

mod error;
mod frame_budget;
pub mod node;
mod parse;
mod primitive;
mod render;
mod value;

pub use error::TreeError;
pub use frame_budget::{yield_now, FrameBudget, YieldNow};
pub use node::{
    ArrayNode, Node, ObjectNode, PrimitiveArray, PrimitiveArrayNode, ScalarNode,
    PRIMITIVE_ARRAY_MARKER_KEY, TYPE_TAG_KEY,
};
pub use parse::{node_from_value, parse_document};
pub use primitive::{
    Integer, Primitive, PrimitiveKind, INFINITY_TOKEN, NAN_TOKEN, NEG_INFINITY_TOKEN,
};
pub use render::{render_async, RenderOptions, RenderStatus, RenderTask};
pub use value::{from_node, to_node};
