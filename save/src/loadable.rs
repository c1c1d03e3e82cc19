//! Spawnable templates for entities that may be missing at load time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::entity::{SceneObject, SharedObject, shared};
use crate::error::{SaveError, SaveResult};

/// Stable integer key of a [`LoadableObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadableObjectId(pub u32);

impl fmt::Display for LoadableObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Factory = Arc<dyn Fn() -> SharedObject + Send + Sync>;

/// A template that instantiates a fresh scene object.
#[derive(Clone)]
pub struct LoadableObject {
    id: LoadableObjectId,
    name: String,
    factory: Factory,
}

impl LoadableObject {
    pub fn new<T, F>(id: LoadableObjectId, name: impl Into<String>, factory: F) -> Self
    where
        T: SceneObject,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            id,
            name: name.into(),
            factory: Arc::new(move || shared(factory())),
        }
    }

    pub fn id(&self) -> LoadableObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a new instance of the template.
    pub fn instantiate(&self) -> SharedObject {
        (self.factory)()
    }
}

impl fmt::Debug for LoadableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadableObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Owns the id → template mapping. Read-only for the save pipeline.
#[derive(Debug, Default)]
pub struct LoadableObjectDatabase {
    objects: HashMap<LoadableObjectId, LoadableObject>,
}

impl LoadableObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, replacing (and returning) any previous one with the same id.
    pub fn register(&mut self, object: LoadableObject) -> Option<LoadableObject> {
        let previous = self.objects.insert(object.id, object);
        if let Some(previous) = &previous {
            log::warn!(
                "Loadable object {} ('{}') was replaced",
                previous.id,
                previous.name
            );
        }
        previous
    }

    /// Template by id, or [`SaveError::MissingLoadableObject`].
    pub fn get_by_id(&self, id: LoadableObjectId) -> SaveResult<&LoadableObject> {
        self.try_get_by_id(id)
            .ok_or(SaveError::MissingLoadableObject(id))
    }

    pub fn try_get_by_id(&self, id: LoadableObjectId) -> Option<&LoadableObject> {
        self.objects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
