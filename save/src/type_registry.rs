//! Capability registry: which types are entities, which take which
//! callbacks, and which names they used to go by.
//!
//! Registrations are explicit. Direct name lookup always sees the latest
//! registrations, but the derived tables (renamed types, per-role sets and
//! the entity set) are only rebuilt by
//! [`cache_callback_types`](TypeRegistry::cache_callback_types). Call it
//! after registering, and again after the type set changes; until then
//! [`is_stale`](TypeRegistry::is_stale) returns `true` and dispatch uses the
//! previous tables.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::entity::{SaveCallbacks, SceneObject, SharedObject, shared};

bitflags! {
    /// Set of pipeline checkpoints a type listens to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CallbackRoles: u8 {
        const BEFORE_SAVE = 1 << 0;
        const AFTER_SAVE = 1 << 1;
        const BEFORE_LOAD = 1 << 2;
        const AFTER_LOAD = 1 << 3;
        const SAVE = Self::BEFORE_SAVE.bits() | Self::AFTER_SAVE.bits();
        const LOAD = Self::BEFORE_LOAD.bits() | Self::AFTER_LOAD.bits();
    }
}

impl Default for CallbackRoles {
    fn default() -> Self {
        Self::empty()
    }
}

/// One pipeline checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackRole {
    BeforeSave,
    AfterSave,
    BeforeLoad,
    AfterLoad,
}

impl CallbackRole {
    pub const ALL: [CallbackRole; 4] = [
        CallbackRole::BeforeSave,
        CallbackRole::AfterSave,
        CallbackRole::BeforeLoad,
        CallbackRole::AfterLoad,
    ];

    pub fn flag(self) -> CallbackRoles {
        match self {
            CallbackRole::BeforeSave => CallbackRoles::BEFORE_SAVE,
            CallbackRole::AfterSave => CallbackRoles::AFTER_SAVE,
            CallbackRole::BeforeLoad => CallbackRoles::BEFORE_LOAD,
            CallbackRole::AfterLoad => CallbackRoles::AFTER_LOAD,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Call the matching hook.
    pub fn invoke(self, callbacks: &mut dyn SaveCallbacks) {
        match self {
            CallbackRole::BeforeSave => callbacks.on_before_save(),
            CallbackRole::AfterSave => callbacks.on_after_save(),
            CallbackRole::BeforeLoad => callbacks.on_before_load(),
            CallbackRole::AfterLoad => callbacks.on_after_load(),
        }
    }
}

impl fmt::Display for CallbackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallbackRole::BeforeSave => "before-save",
            CallbackRole::AfterSave => "after-save",
            CallbackRole::BeforeLoad => "before-load",
            CallbackRole::AfterLoad => "after-load",
        })
    }
}

type Factory = Arc<dyn Fn() -> SharedObject + Send + Sync>;

/// What the registry knows about one type.
#[derive(Clone)]
pub struct TypeRegistration {
    type_name: String,
    formerly_known_as: Vec<String>,
    roles: CallbackRoles,
    is_entity: bool,
    factory: Option<Factory>,
}

impl TypeRegistration {
    /// Registration keyed by `T`'s [`SceneObject::type_name`] default.
    pub fn of<T: SceneObject>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            formerly_known_as: Vec::new(),
            roles: CallbackRoles::empty(),
            is_entity: false,
            factory: None,
        }
    }

    /// Mark the type as a save entity.
    pub fn entity(mut self) -> Self {
        self.is_entity = true;
        self
    }

    pub fn callbacks(mut self, roles: CallbackRoles) -> Self {
        self.roles |= roles;
        self
    }

    /// Accept records tagged with an older name of this type.
    pub fn formerly_known_as(mut self, old_name: impl Into<String>) -> Self {
        self.formerly_known_as.push(old_name.into());
        self
    }

    /// Constructor used to recreate an entity that is missing at load time
    /// and has no loadable object id.
    pub fn with_factory<T, F>(mut self, factory: F) -> Self
    where
        T: SceneObject,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || shared(factory())));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn former_names(&self) -> &[String] {
        &self.formerly_known_as
    }

    pub fn roles(&self) -> CallbackRoles {
        self.roles
    }

    pub fn is_entity(&self) -> bool {
        self.is_entity
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Build a fresh instance through the factory, if there is one.
    pub fn instantiate(&self) -> Option<SharedObject> {
        self.factory.as_ref().map(|f| f())
    }
}

impl fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistration")
            .field("type_name", &self.type_name)
            .field("formerly_known_as", &self.formerly_known_as)
            .field("roles", &self.roles)
            .field("is_entity", &self.is_entity)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// Registry of entity and callback types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Ordered by name so cache rebuilds are deterministic.
    types: BTreeMap<String, TypeRegistration>,
    renamed: HashMap<String, String>,
    role_types: [HashSet<String>; 4],
    entity_types: HashSet<String>,
    stale: bool,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a registration. Derived tables go stale until the next
    /// [`cache_callback_types`](Self::cache_callback_types).
    pub fn register(&mut self, registration: TypeRegistration) {
        log::debug!("Registering save type {}", registration.type_name);
        self.types
            .insert(registration.type_name.clone(), registration);
        self.stale = true;
    }

    /// Remove a registration.
    pub fn unregister(&mut self, type_name: &str) -> Option<TypeRegistration> {
        let removed = self.types.remove(type_name);
        if removed.is_some() {
            self.stale = true;
        }
        removed
    }

    /// Rebuild the renamed-type table and the per-role and entity sets.
    pub fn cache_callback_types(&mut self) {
        self.renamed.clear();
        self.entity_types.clear();
        for set in &mut self.role_types {
            set.clear();
        }

        for (name, registration) in &self.types {
            if registration.is_entity {
                self.entity_types.insert(name.clone());
            }
            for role in CallbackRole::ALL {
                if registration.roles.contains(role.flag()) {
                    self.role_types[role.index()].insert(name.clone());
                }
            }
            for old_name in &registration.formerly_known_as {
                if self.types.contains_key(old_name) {
                    log::warn!(
                        "{name} claims former name {old_name}, which is still a registered type"
                    );
                    continue;
                }
                match self.renamed.get(old_name) {
                    Some(existing) => log::warn!(
                        "Former name {old_name} claimed by both {existing} and {name}; keeping {existing}"
                    ),
                    None => {
                        self.renamed.insert(old_name.clone(), name.clone());
                    }
                }
            }
        }

        self.stale = false;
        log::debug!(
            "Cached save types: {} entity, {} renamed, {}/{}/{}/{} callback",
            self.entity_types.len(),
            self.renamed.len(),
            self.role_types[0].len(),
            self.role_types[1].len(),
            self.role_types[2].len(),
            self.role_types[3].len(),
        );
    }

    /// Registrations changed since the last cache rebuild.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeRegistration> {
        self.types.get(type_name)
    }

    /// Resolve a stored type tag: direct name first, then the
    /// formerly-known-as table.
    pub fn resolve(&self, type_tag: &str) -> Option<&TypeRegistration> {
        if let Some(registration) = self.types.get(type_tag) {
            return Some(registration);
        }
        let current = self.renamed.get(type_tag)?;
        log::debug!("Type tag {type_tag} resolved through rename to {current}");
        self.types.get(current)
    }

    /// Type is cached as a save entity.
    pub fn is_entity_type(&self, type_name: &str) -> bool {
        self.entity_types.contains(type_name)
    }

    /// Type is cached as a listener for `role`.
    pub fn has_role(&self, type_name: &str, role: CallbackRole) -> bool {
        self.role_types[role.index()].contains(type_name)
    }

    /// Names cached for `role`, sorted.
    pub fn types_for_role(&self, role: CallbackRole) -> Vec<&str> {
        let mut names: Vec<&str> = self.role_types[role.index()]
            .iter()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
