use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::entity::{SceneObject, SharedObject};

type WeakObject = Weak<RwLock<dyn SceneObject>>;

fn same_object(weak: &WeakObject, object: &SharedObject) -> bool {
    Weak::ptr_eq(weak, &Arc::downgrade(object))
}

/// Weakly held set of scene objects, compared by handle identity.
///
/// Dropped objects fall out on their own; [`prune`](Self::prune) reclaims
/// their slots.
#[derive(Default)]
pub(crate) struct WeakSet {
    entries: Vec<WeakObject>,
}

impl WeakSet {
    pub(crate) fn insert(&mut self, object: &SharedObject) -> bool {
        self.prune();
        if self.contains(object) {
            return false;
        }
        self.entries.push(Arc::downgrade(object));
        true
    }

    pub(crate) fn remove(&mut self, object: &SharedObject) -> bool {
        let before = self.entries.len();
        self.entries.retain(|w| !same_object(w, object));
        self.prune();
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, object: &SharedObject) -> bool {
        self.entries
            .iter()
            .any(|w| w.strong_count() > 0 && same_object(w, object))
    }

    pub(crate) fn live(&self) -> Vec<SharedObject> {
        self.entries.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn prune(&mut self) {
        self.entries.retain(|w| w.strong_count() > 0);
    }
}

/// Save entities that live outside the scene scan.
///
/// Register objects the [`SceneGraph`](crate::SceneGraph) does not
/// enumerate (e.g. services or data assets). Entries are weak: dropping the
/// last strong handle unregisters the object. Objects with no other owner,
/// such as entities recreated at load time, are [`adopt`](Self::adopt)ed
/// instead and kept alive until unregistered.
#[derive(Default)]
pub struct EntityRegistry {
    entities: WeakSet,
    owned: Vec<SharedObject>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the object was already registered.
    pub fn register(&mut self, object: &SharedObject) -> bool {
        self.entities.insert(object)
    }

    /// Register and hold a strong handle.
    pub fn adopt(&mut self, object: SharedObject) {
        self.entities.insert(&object);
        if !self.owned.iter().any(|o| Arc::ptr_eq(o, &object)) {
            self.owned.push(object);
        }
    }

    pub fn unregister(&mut self, object: &SharedObject) -> bool {
        self.owned.retain(|o| !Arc::ptr_eq(o, object));
        self.entities.remove(object)
    }

    pub fn contains(&self, object: &SharedObject) -> bool {
        self.entities.contains(object)
    }

    /// Strong handles to every registered object that is still alive.
    pub fn entities(&self) -> Vec<SharedObject> {
        self.entities.live()
    }

    pub fn len(&self) -> usize {
        self.entities.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merge object lists, keeping the first occurrence of each handle.
pub(crate) fn dedup_objects(lists: impl IntoIterator<Item = Vec<SharedObject>>) -> Vec<SharedObject> {
    let mut merged: Vec<SharedObject> = Vec::new();
    for object in lists.into_iter().flatten() {
        if !merged.iter().any(|o| Arc::ptr_eq(o, &object)) {
            merged.push(object);
        }
    }
    merged
}
