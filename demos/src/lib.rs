//! A small game world wired into savebox.
//!
//! - [`Player`] — scene entity with a position and inventory
//! - [`Chest`] — spawned from the loadable object database when missing
//! - [`DayNightCycle`] — world state, loaded before everything else
//! - [`Hud`] — callback listener that refreshes after a load

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use savebox::tree::{from_node, to_node, Node, ObjectNode};
use savebox::{
    CallbackRoles, LoadableObject, LoadableObjectDatabase, LoadableObjectId, MemoryScene,
    SaveCallbacks, SaveDataEntity, SaveIdentifier, SaveManager, SaveResult, SaveSettings,
    SceneObject, TypeRegistration,
};

pub const CHEST_TEMPLATE: LoadableObjectId = LoadableObjectId(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub health: i32,
    pub position: [f32; 3],
    pub inventory: Vec<String>,
}

pub struct Player {
    identifier: SaveIdentifier,
    pub state: PlayerState,
}

impl Player {
    pub fn new(name: &str) -> Self {
        Self {
            identifier: SaveIdentifier::empty(),
            state: PlayerState {
                name: name.to_owned(),
                health: 100,
                position: [0.0; 3],
                inventory: Vec::new(),
            },
        }
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
        Ok(to_node(&self.state)?)
    }

    fn deserialize(&mut self, data: &Node) -> SaveResult<()> {
        self.state = from_node(data)?;
        Ok(())
    }

    fn deserialization_priority(&self) -> i32 {
        5
    }
}

impl SceneObject for Player {
    fn type_name(&self) -> &'static str {
        "demo::Player"
    }

    fn as_save_entity(&self) -> Option<&dyn SaveDataEntity> {
        Some(self)
    }

    fn as_save_entity_mut(&mut self) -> Option<&mut dyn SaveDataEntity> {
        Some(self)
    }
}

/// Loot container. Written by hand instead of through serde.
pub struct Chest {
    identifier: SaveIdentifier,
    pub gold: u32,
    pub opened: bool,
}

impl Chest {
    pub fn new(gold: u32) -> Self {
        Self {
            identifier: SaveIdentifier::empty(),
            gold,
            opened: false,
        }
    }
}

impl SaveDataEntity for Chest {
    fn save_identifier(&self) -> &SaveIdentifier {
        &self.identifier
    }

    fn set_save_identifier(&mut self, identifier: SaveIdentifier) {
        self.identifier = identifier;
    }

    fn serialize(&self) -> SaveResult<Node> {
        let mut data = ObjectNode::new();
        data.add_simple_child("gold", self.gold)?;
        data.add_simple_child("opened", self.opened)?;
        Ok(data.into())
    }

    fn deserialize(&mut self, data: &Node) -> SaveResult<()> {
        let data = data.expect_object()?;
        self.gold = data.primitive("gold")?.as_u32()?;
        self.opened = data.primitive("opened")?.as_bool()?;
        Ok(())
    }

    fn loadable_object_id(&self) -> Option<LoadableObjectId> {
        Some(CHEST_TEMPLATE)
    }
}

impl SceneObject for Chest {
    fn type_name(&self) -> &'static str {
        "demo::Chest"
    }

    fn as_save_entity(&self) -> Option<&dyn SaveDataEntity> {
        Some(self)
    }

    fn as_save_entity_mut(&mut self) -> Option<&mut dyn SaveDataEntity> {
        Some(self)
    }
}

pub struct DayNightCycle {
    identifier: SaveIdentifier,
    pub hour: f32,
    pub day: u32,
}

impl DayNightCycle {
    pub fn new() -> Self {
        Self {
            identifier: SaveIdentifier::new("world-clock"),
            hour: 6.0,
            day: 1,
        }
    }
}

impl Default for DayNightCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveDataEntity for DayNightCycle {
    fn save_identifier(&self) -> &SaveIdentifier {
        &self.identifier
    }

    fn set_save_identifier(&mut self, identifier: SaveIdentifier) {
        self.identifier = identifier;
    }

    fn serialize(&self) -> SaveResult<Node> {
        Ok(to_node(&(self.hour, self.day))?)
    }

    fn deserialize(&mut self, data: &Node) -> SaveResult<()> {
        (self.hour, self.day) = from_node(data)?;
        Ok(())
    }

    fn deserialization_priority(&self) -> i32 {
        10
    }
}

impl SceneObject for DayNightCycle {
    fn type_name(&self) -> &'static str {
        "demo::DayNightCycle"
    }

    fn as_save_entity(&self) -> Option<&dyn SaveDataEntity> {
        Some(self)
    }

    fn as_save_entity_mut(&mut self) -> Option<&mut dyn SaveDataEntity> {
        Some(self)
    }
}

#[derive(Default)]
pub struct Hud {
    pub refreshes: u32,
}

impl SaveCallbacks for Hud {
    fn on_before_save(&mut self) {
        log::info!("HUD: saving...");
    }

    fn on_after_load(&mut self) {
        self.refreshes += 1;
        log::info!("HUD: refreshed after load");
    }
}

impl SceneObject for Hud {
    fn type_name(&self) -> &'static str {
        "demo::Hud"
    }

    fn as_save_callbacks(&mut self) -> Option<&mut dyn SaveCallbacks> {
        Some(self)
    }
}

/// Manager with every demo type registered.
pub fn build_manager(settings: SaveSettings) -> SaveManager {
    let mut manager = SaveManager::new(settings);
    let types = manager.types_mut();
    types.register(
        TypeRegistration::named("demo::Player")
            .entity()
            .formerly_known_as("game::Player")
            .with_factory(|| Player::new("unnamed")),
    );
    types.register(TypeRegistration::named("demo::Chest").entity());
    types.register(TypeRegistration::named("demo::DayNightCycle").entity());
    types.register(
        TypeRegistration::named("demo::Hud")
            .callbacks(CallbackRoles::BEFORE_SAVE | CallbackRoles::AFTER_LOAD),
    );
    types.cache_callback_types();

    let mut database = LoadableObjectDatabase::new();
    database.register(LoadableObject::new(CHEST_TEMPLATE, "chest", || Chest::new(0)));
    manager.set_database(Some(Arc::new(database)));
    manager
}

/// The starting world: a player, a clock, a HUD and two chests.
pub fn build_world() -> MemoryScene {
    let mut scene = MemoryScene::new();
    scene.add(DayNightCycle::new());
    let mut player = Player::new("Ayla");
    player.state.position = [12.5, 0.0, -3.25];
    player.state.inventory = vec!["sword".into(), "torch".into()];
    scene.add(player);
    scene.add(Chest::new(25));
    scene.add(Chest::new(40));
    scene.add(Hud::default());
    scene
}

/// World with only the fixed objects. Chests are spawned from the database
/// and the player is recreated through its factory.
pub fn build_empty_world() -> MemoryScene {
    let mut scene = MemoryScene::new();
    scene.add(DayNightCycle::new());
    scene.add(Hud::default());
    scene
}
