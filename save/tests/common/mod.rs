//! Shared scene fixtures for save/load integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use savebox::tree::{from_node, to_node, Node};
use savebox::{
    CallbackRoles, LoadableObjectId, SaveCallbacks, SaveDataEntity, SaveIdentifier, SaveManager,
    SaveResult, SaveSettings, SceneObject, TypeRegistration,
};

/// Ordered record of what happened during an operation.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Events starting with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub name: String,
    pub health: i32,
    pub position: [f32; 2],
}

/// A save entity that records its serialize/deserialize calls.
pub struct Player {
    pub identifier: SaveIdentifier,
    pub stats: Stats,
    pub priority: i32,
    pub loadable: Option<LoadableObjectId>,
    pub active: bool,
    pub fail_on_load: bool,
    pub log: EventLog,
}

impl Player {
    pub fn new(name: &str, health: i32, log: &EventLog) -> Self {
        Self {
            identifier: SaveIdentifier::empty(),
            stats: Stats {
                name: name.to_owned(),
                health,
                position: [0.0, 0.0],
            },
            priority: 0,
            loadable: None,
            active: true,
            fail_on_load: false,
            log: log.clone(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = SaveIdentifier::new(identifier);
        self
    }
}

impl SaveDataEntity for Player {
    fn save_identifier(&self) -> &SaveIdentifier {
        &self.identifier
    }

    fn set_save_identifier(&mut self, identifier: SaveIdentifier) {
        self.identifier = identifier;
    }

    fn serialize(&self) -> SaveResult<Node> {
        self.log.push(format!("save:{}", self.stats.name));
        Ok(to_node(&self.stats)?)
    }

    fn deserialize(&mut self, data: &Node) -> SaveResult<()> {
        if self.fail_on_load {
            panic!("corrupt {}", self.stats.name);
        }
        self.stats = from_node(data)?;
        self.log.push(format!("load:{}", self.stats.name));
        Ok(())
    }

    fn deserialization_priority(&self) -> i32 {
        self.priority
    }

    fn loadable_object_id(&self) -> Option<LoadableObjectId> {
        self.loadable
    }
}

impl SceneObject for Player {
    fn is_active(&self) -> bool {
        self.active
    }

    fn as_save_entity(&self) -> Option<&dyn SaveDataEntity> {
        Some(self)
    }

    fn as_save_entity_mut(&mut self) -> Option<&mut dyn SaveDataEntity> {
        Some(self)
    }
}

// ============================================================================
// Hud
// ============================================================================

/// A callback listener with no saved state.
pub struct Hud {
    pub log: EventLog,
}

impl SaveCallbacks for Hud {
    fn on_before_save(&mut self) {
        self.log.push("hud:before-save");
    }

    fn on_after_save(&mut self) {
        self.log.push("hud:after-save");
    }

    fn on_before_load(&mut self) {
        self.log.push("hud:before-load");
    }

    fn on_after_load(&mut self) {
        self.log.push("hud:after-load");
    }
}

impl SceneObject for Hud {
    fn as_save_callbacks(&mut self) -> Option<&mut dyn SaveCallbacks> {
        Some(self)
    }
}

// ============================================================================
// Manager
// ============================================================================

pub fn settings() -> SaveSettings {
    SaveSettings {
        pretty_print: false,
        ..SaveSettings::default()
    }
}

/// Manager with `Player` as an entity and `Hud` listening to every role.
pub fn manager() -> SaveManager {
    let mut manager = SaveManager::new(settings());
    let types = manager.types_mut();
    types.register(TypeRegistration::of::<Player>().entity());
    types.register(TypeRegistration::of::<Hud>().callbacks(CallbackRoles::all()));
    types.cache_callback_types();
    manager
}

pub fn player_type() -> &'static str {
    std::any::type_name::<Player>()
}
