//! Contracts between the save pipeline and the host's objects.
//!
//! - [`SaveDataEntity`] — objects whose state is written to and read from a save
//! - [`SaveCallbacks`] — optional hooks at the four pipeline checkpoints
//! - [`SceneObject`] — anything living in the host's object graph
//! - [`SceneGraph`] — the host's live object graph and spawner
//!
//! Scene objects are shared as [`SharedObject`] handles so the scene, the
//! entity registry and the callback distributor can all refer to the same
//! instance.

use std::sync::Arc;

use parking_lot::RwLock;
use savebox_tree::Node;

use crate::error::SaveResult;
use crate::identity::SaveIdentifier;
use crate::loadable::{LoadableObject, LoadableObjectId};

/// An object that participates in save/load.
pub trait SaveDataEntity {
    fn save_identifier(&self) -> &SaveIdentifier;

    fn set_save_identifier(&mut self, identifier: SaveIdentifier);

    /// Capture the entity's state.
    fn serialize(&self) -> SaveResult<Node>;

    /// Restore state captured by [`serialize`](Self::serialize).
    fn deserialize(&mut self, data: &Node) -> SaveResult<()>;

    /// Higher priorities are deserialized first.
    fn deserialization_priority(&self) -> i32 {
        0
    }

    /// Template to spawn this entity from when it is missing at load time.
    fn loadable_object_id(&self) -> Option<LoadableObjectId> {
        None
    }
}

/// Pipeline checkpoint hooks. All default to no-ops.
pub trait SaveCallbacks {
    fn on_before_save(&mut self) {}
    fn on_after_save(&mut self) {}
    fn on_before_load(&mut self) {}
    fn on_after_load(&mut self) {}
}

/// An object in the host's scene.
///
/// The capability views return `None` by default; implement the ones that
/// apply.
pub trait SceneObject: Send + Sync + 'static {
    /// Fully qualified type name, used as the record's type tag.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Inactive objects are skipped unless the scan includes them.
    fn is_active(&self) -> bool {
        true
    }

    fn as_save_entity(&self) -> Option<&dyn SaveDataEntity> {
        None
    }

    fn as_save_entity_mut(&mut self) -> Option<&mut dyn SaveDataEntity> {
        None
    }

    fn as_save_callbacks(&mut self) -> Option<&mut dyn SaveCallbacks> {
        None
    }
}

/// Shared handle to a scene object.
pub type SharedObject = Arc<RwLock<dyn SceneObject>>;

/// Wrap a scene object in a [`SharedObject`] handle.
pub fn shared<T: SceneObject>(object: T) -> SharedObject {
    Arc::new(RwLock::new(object))
}

/// The host's live object graph.
pub trait SceneGraph {
    /// All live objects, optionally including inactive ones.
    fn objects(&self, include_inactive: bool) -> Vec<SharedObject>;

    /// Instantiate a loadable object template into the scene.
    fn spawn(&mut self, template: &LoadableObject) -> SaveResult<SharedObject>;
}

/// A flat in-memory scene.
#[derive(Default)]
pub struct MemoryScene {
    objects: Vec<SharedObject>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its shared handle.
    pub fn add<T: SceneObject>(&mut self, object: T) -> SharedObject {
        let handle = shared(object);
        self.objects.push(handle.clone());
        handle
    }

    pub fn insert(&mut self, object: SharedObject) {
        self.objects.push(object);
    }

    /// Remove an object by handle identity.
    pub fn remove(&mut self, object: &SharedObject) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| !Arc::ptr_eq(o, object));
        self.objects.len() != before
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl SceneGraph for MemoryScene {
    fn objects(&self, include_inactive: bool) -> Vec<SharedObject> {
        self.objects
            .iter()
            .filter(|o| include_inactive || o.read().is_active())
            .cloned()
            .collect()
    }

    fn spawn(&mut self, template: &LoadableObject) -> SaveResult<SharedObject> {
        let object = template.instantiate();
        self.objects.push(object.clone());
        Ok(object)
    }
}
