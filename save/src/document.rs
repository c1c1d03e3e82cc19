//! Layout of a save document.
//!
//! ```text
//! {
//!   "Version": 1,
//!   "SavedAt": "2026-10-19T12:00:00+00:00",
//!   "EntityCount": 2,
//!   "Entities": [ <record>, <record> ]
//! }
//! ```
//!
//! Each record holds `Type`, `SaveIdentifier`, an optional
//! `LoadableObjectId`, `DeserializationPriority` and the entity's own `Data`
//! node. When type tags are emitted the record object is tagged with the
//! same type name; `Type` is what the reader goes by, so documents written
//! with tags off load the same way.
//!
//! A record that cannot be decoded does not sink the document: it is
//! reported in [`SaveDocument::malformed`] and the rest still loads. Header
//! and layout errors are fatal.

use chrono::{DateTime, Utc};
use savebox_tree::{ArrayNode, Node, ObjectNode};

use crate::error::{SaveError, SaveResult};
use crate::identity::SaveIdentifier;
use crate::loadable::LoadableObjectId;

/// Newest document version this build writes and reads.
pub const CURRENT_VERSION: u32 = 1;

const VERSION_KEY: &str = "Version";
const SAVED_AT_KEY: &str = "SavedAt";
const ENTITY_COUNT_KEY: &str = "EntityCount";
const ENTITIES_KEY: &str = "Entities";
const TYPE_KEY: &str = "Type";
const IDENTIFIER_KEY: &str = "SaveIdentifier";
const LOADABLE_ID_KEY: &str = "LoadableObjectId";
const PRIORITY_KEY: &str = "DeserializationPriority";
const DATA_KEY: &str = "Data";

/// The fields of a document that describe it without reading its entities.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveHeader {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub entity_count: usize,
}

impl SaveHeader {
    /// Read the header, rejecting versions newer than [`CURRENT_VERSION`].
    pub fn read(document: &Node) -> SaveResult<Self> {
        let root = document
            .as_object()
            .ok_or_else(|| invalid(format!("root is {}, expected object", document.kind_name())))?;

        let version = root.primitive(VERSION_KEY)?.as_u32()?;
        if version > CURRENT_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: version,
                current: CURRENT_VERSION,
            });
        }

        let saved_at = root.primitive(SAVED_AT_KEY)?.as_str()?;
        let saved_at = DateTime::parse_from_rfc3339(saved_at)
            .map_err(|e| invalid(format!("{SAVED_AT_KEY} '{saved_at}': {e}")))?
            .with_timezone(&Utc);
        let entity_count = root.primitive(ENTITY_COUNT_KEY)?.as_u64()? as usize;

        Ok(Self {
            version,
            saved_at,
            entity_count,
        })
    }
}

/// One saved entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRecord {
    pub type_tag: String,
    pub identifier: SaveIdentifier,
    pub loadable_object_id: Option<LoadableObjectId>,
    pub priority: i32,
    pub data: Node,
}

impl SaveRecord {
    pub fn to_node(&self) -> SaveResult<Node> {
        let mut record = ObjectNode::new();
        record.type_tag = Some(self.type_tag.clone());
        record.add_simple_child(TYPE_KEY, self.type_tag.as_str())?;
        record.add_simple_child(IDENTIFIER_KEY, self.identifier.as_str())?;
        if let Some(id) = self.loadable_object_id {
            record.add_simple_child(LOADABLE_ID_KEY, id.0)?;
        }
        record.add_simple_child(PRIORITY_KEY, self.priority)?;
        record.add_child(self.data.clone().with_name(DATA_KEY))?;
        Ok(record.into())
    }

    pub fn from_node(node: &Node) -> SaveResult<Self> {
        let record = node.expect_object()?;
        let type_tag = match record.try_get_child(TYPE_KEY) {
            Some(name) => name.expect_primitive()?.as_str()?.to_owned(),
            None => record
                .type_tag
                .clone()
                .ok_or_else(|| invalid("entity record without a type"))?,
        };
        if type_tag.is_empty() {
            return Err(invalid("entity record with an empty type"));
        }
        let identifier = SaveIdentifier::new(record.primitive(IDENTIFIER_KEY)?.as_str()?);
        let loadable_object_id = match record.try_get_child(LOADABLE_ID_KEY) {
            Some(id) => Some(LoadableObjectId(id.expect_primitive()?.as_u32()?)),
            None => None,
        };
        let priority = match record.try_get_child(PRIORITY_KEY) {
            Some(priority) => priority.expect_primitive()?.as_i32()?,
            None => 0,
        };
        let mut data = record.child(DATA_KEY)?.clone();
        data.set_name(None);

        Ok(Self {
            type_tag,
            identifier,
            loadable_object_id,
            priority,
            data,
        })
    }
}

/// An entry of `Entities` that could not be decoded into a [`SaveRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// Position in the `Entities` array.
    pub index: usize,
    /// Identifier, if one could still be read.
    pub identifier: SaveIdentifier,
    /// Type name, if one could still be read.
    pub type_tag: String,
    pub reason: String,
}

impl MalformedRecord {
    fn salvage(index: usize, node: &Node, err: SaveError) -> Self {
        let record = node.as_object();
        let text = |key| {
            record
                .and_then(|r| r.try_get_child(key))
                .and_then(|c| c.expect_primitive().ok())
                .and_then(|p| p.as_str().ok())
        };
        let identifier = text(IDENTIFIER_KEY).map(SaveIdentifier::new).unwrap_or_default();
        let type_tag = text(TYPE_KEY)
            .or_else(|| record.and_then(|r| r.type_tag.as_deref()))
            .unwrap_or_default()
            .to_owned();
        Self {
            index,
            identifier,
            type_tag,
            reason: err.to_string(),
        }
    }
}

/// A decoded document.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDocument {
    pub header: SaveHeader,
    /// Decoded records, in document order.
    pub records: Vec<SaveRecord>,
    pub malformed: Vec<MalformedRecord>,
}

/// Assemble a complete document from records.
pub fn build_document(records: &[SaveRecord], saved_at: DateTime<Utc>) -> SaveResult<Node> {
    let nodes = records
        .iter()
        .map(SaveRecord::to_node)
        .collect::<SaveResult<Vec<_>>>()?;
    assemble_document(nodes, saved_at)
}

/// Assemble a document from record nodes already built by
/// [`SaveRecord::to_node`].
pub(crate) fn assemble_document(records: Vec<Node>, saved_at: DateTime<Utc>) -> SaveResult<Node> {
    let mut root = ObjectNode::new();
    root.add_simple_child(VERSION_KEY, CURRENT_VERSION)?;
    root.add_simple_child(SAVED_AT_KEY, saved_at.to_rfc3339())?;
    root.add_simple_child(ENTITY_COUNT_KEY, records.len() as u64)?;
    let mut entities = ArrayNode::named(ENTITIES_KEY);
    for record in records {
        entities.push(record);
    }
    root.add_child(entities)?;
    Ok(root.into())
}

/// Header plus every record, in document order.
///
/// Fails only when the header or the `Entities` array is unreadable; a bad
/// record lands in [`SaveDocument::malformed`].
pub fn read_document(document: &Node) -> SaveResult<SaveDocument> {
    let header = SaveHeader::read(document)?;
    let root = document.expect_object()?;
    let items = root.child(ENTITIES_KEY)?.expect_array()?.items();

    let mut records = Vec::with_capacity(items.len());
    let mut malformed = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match SaveRecord::from_node(item) {
            Ok(record) => records.push(record),
            Err(err) => malformed.push(MalformedRecord::salvage(index, item, err)),
        }
    }
    if items.len() != header.entity_count {
        log::warn!(
            "Save document declares {} entities but holds {}",
            header.entity_count,
            items.len()
        );
    }
    Ok(SaveDocument {
        header,
        records,
        malformed,
    })
}

fn invalid(message: impl Into<String>) -> SaveError {
    SaveError::InvalidDocument(message.into())
}
