//! Save/load orchestration.
//!
//! A [`SaveManager`] runs one operation at a time through
//! `Idle -> BeforeCallbacks -> Processing -> AfterCallbacks -> Idle`.
//! Before-callbacks happen before any entity is touched and
//! after-callbacks after the last one; entity failures are isolated and
//! reported, never abort the batch.
//!
//! # Example
//!
//! ```ignore
//! let mut manager = SaveManager::new(SaveSettings::default());
//! manager.types_mut().register(TypeRegistration::of::<Player>().entity());
//! manager.types_mut().cache_callback_types();
//!
//! let (text, report) = manager.save_to_string(&scene)?;
//! let report = manager.load_from_str(&text, &mut scene)?;
//! ```

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use savebox_tree::{Node, parse_document, render_async};

use crate::callbacks::{CallbackDistributor, DistributionReport};
use crate::document::{MalformedRecord, SaveHeader, SaveRecord, assemble_document, read_document};
use crate::entity::{SceneGraph, SharedObject};
use crate::error::{SaveError, SaveResult};
use crate::identity::SaveIdentifier;
use crate::isolate::run_isolated;
use crate::loadable::LoadableObjectDatabase;
use crate::registry::{EntityRegistry, dedup_objects};
use crate::settings::SaveSettings;
use crate::storage::SaveStorage;
use crate::type_registry::{CallbackRole, TypeRegistry};

/// Phase of the operation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    BeforeCallbacks,
    Processing,
    AfterCallbacks,
}

/// An entity whose serialize or deserialize failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub identifier: SaveIdentifier,
    pub type_name: String,
    pub message: String,
}

/// A record the load could not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub identifier: SaveIdentifier,
    pub type_tag: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    /// Entities written to the document.
    pub saved: usize,
    /// Identifiers assigned because they were empty or duplicated.
    pub generated_identifiers: usize,
    /// Leaf count of the whole document.
    pub underlying_node_count: usize,
    pub failures: Vec<EntityFailure>,
    pub callbacks: Vec<DistributionReport>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.callbacks.iter().all(DistributionReport::is_clean)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Entities deserialized successfully.
    pub loaded: usize,
    /// Entities spawned from loadable object templates.
    pub spawned: usize,
    /// Entities recreated through a type factory.
    pub recreated: usize,
    pub skipped: Vec<SkippedRecord>,
    pub failures: Vec<EntityFailure>,
    pub callbacks: Vec<DistributionReport>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.failures.is_empty()
            && self.callbacks.iter().all(DistributionReport::is_clean)
    }
}

/// A save slot found in storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInfo {
    pub slot: String,
    pub file_name: String,
    pub header: SaveHeader,
}

/// Drives save and load over a host scene.
pub struct SaveManager {
    settings: SaveSettings,
    types: TypeRegistry,
    entities: EntityRegistry,
    callbacks: CallbackDistributor,
    database: Option<Arc<LoadableObjectDatabase>>,
    state: SaveState,
}

impl SaveManager {
    pub fn new(settings: SaveSettings) -> Self {
        Self {
            settings,
            types: TypeRegistry::new(),
            entities: EntityRegistry::new(),
            callbacks: CallbackDistributor::new(),
            database: None,
            state: SaveState::Idle,
        }
    }

    pub fn settings(&self) -> &SaveSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SaveSettings {
        &mut self.settings
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        &mut self.entities
    }

    pub fn callbacks(&self) -> &CallbackDistributor {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackDistributor {
        &mut self.callbacks
    }

    pub fn database(&self) -> Option<&Arc<LoadableObjectDatabase>> {
        self.database.as_ref()
    }

    /// Templates for records whose entity is missing at load time.
    pub fn set_database(&mut self, database: Option<Arc<LoadableObjectDatabase>>) {
        self.database = database;
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    // ---------------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------------

    /// Build the save document for every entity in the scene and the entity
    /// registry, with before/after-save callbacks around it.
    pub fn save_document(&mut self, scene: &dyn SceneGraph) -> SaveResult<(Node, SaveReport)> {
        let (document, mut report) = self.begin_save(scene)?;
        self.finish_save(scene, &mut report);
        Ok((document, report))
    }

    /// [`save_document`](Self::save_document) rendered with the configured
    /// options.
    pub fn save_to_string(&mut self, scene: &dyn SceneGraph) -> SaveResult<(String, SaveReport)> {
        let (document, mut report) = self.begin_save(scene)?;
        let text = document.render_to_string(self.settings.render_options());
        self.finish_save(scene, &mut report);
        Ok((text, report))
    }

    /// Like [`save_to_string`](Self::save_to_string), but rendering yields
    /// to the executor whenever the frame budget runs out.
    pub async fn save_to_string_async(
        &mut self,
        scene: &dyn SceneGraph,
    ) -> SaveResult<(String, SaveReport)> {
        let (document, mut report) = self.begin_save(scene)?;
        let text = render_async(
            &document,
            self.settings.render_options(),
            self.settings.frame_budget(),
        )
        .await;
        self.finish_save(scene, &mut report);
        Ok((text, report))
    }

    /// Save into `storage` under the slot's file name.
    ///
    /// After-save callbacks only fire once the write succeeded.
    pub fn save_slot(
        &mut self,
        storage: &dyn SaveStorage,
        slot: &str,
        scene: &dyn SceneGraph,
    ) -> SaveResult<SaveReport> {
        let (document, mut report) = self.begin_save(scene)?;
        let text = document.render_to_string(self.settings.render_options());
        self.write_slot(storage, slot, &text)?;
        self.finish_save(scene, &mut report);
        Ok(report)
    }

    pub async fn save_slot_async(
        &mut self,
        storage: &dyn SaveStorage,
        slot: &str,
        scene: &dyn SceneGraph,
    ) -> SaveResult<SaveReport> {
        let (document, mut report) = self.begin_save(scene)?;
        let text = render_async(
            &document,
            self.settings.render_options(),
            self.settings.frame_budget(),
        )
        .await;
        self.write_slot(storage, slot, &text)?;
        self.finish_save(scene, &mut report);
        Ok(report)
    }

    fn write_slot(&mut self, storage: &dyn SaveStorage, slot: &str, text: &str) -> SaveResult<()> {
        let file_name = self.settings.slot_file_name(slot);
        if let Err(err) = storage.write(&file_name, text) {
            self.enter(SaveState::Idle);
            return Err(err.into());
        }
        log::info!("Saved slot '{slot}' ({} bytes)", text.len());
        Ok(())
    }

    fn begin_save(&mut self, scene: &dyn SceneGraph) -> SaveResult<(Node, SaveReport)> {
        self.warn_if_stale();
        let mut report = SaveReport::default();

        self.enter(SaveState::BeforeCallbacks);
        report
            .callbacks
            .push(self.distribute(CallbackRole::BeforeSave, scene));

        self.enter(SaveState::Processing);
        let objects = self.collect_entities(scene);
        report.generated_identifiers = self.assign_identifiers(&objects);

        let mut records = Vec::with_capacity(objects.len());
        for object in &objects {
            let guard = object.read();
            let type_name = guard.type_name();
            let Some(entity) = guard.as_save_entity() else {
                continue;
            };
            let identifier = entity.save_identifier().clone();
            let record = run_isolated(|| {
                SaveRecord {
                    type_tag: type_name.to_owned(),
                    identifier: identifier.clone(),
                    loadable_object_id: entity.loadable_object_id(),
                    priority: entity.deserialization_priority(),
                    data: entity.serialize()?,
                }
                .to_node()
            });
            match record {
                Ok(record) => records.push(record),
                Err(err) => report
                    .failures
                    .push(self.entity_failed("serialize", identifier, type_name, err)),
            }
        }

        report.saved = records.len();
        let document = match assemble_document(records, Utc::now()) {
            Ok(document) => document,
            Err(err) => {
                self.enter(SaveState::Idle);
                return Err(err);
            }
        };
        report.underlying_node_count = document.underlying_node_count();
        Ok((document, report))
    }

    fn finish_save(&mut self, scene: &dyn SceneGraph, report: &mut SaveReport) {
        self.enter(SaveState::AfterCallbacks);
        report
            .callbacks
            .push(self.distribute(CallbackRole::AfterSave, scene));
        self.enter(SaveState::Idle);
        log::debug!(
            "Save finished: {} saved, {} failed, {} identifiers generated",
            report.saved,
            report.failures.len(),
            report.generated_identifiers
        );
    }

    /// Give every entity a unique identifier, generating one where it is
    /// empty or already taken in this batch.
    fn assign_identifiers(&self, objects: &[SharedObject]) -> usize {
        let mut seen = HashSet::new();
        let mut generated = 0;
        for object in objects {
            let mut guard = object.write();
            let type_name = guard.type_name();
            let Some(entity) = guard.as_save_entity_mut() else {
                continue;
            };
            let current = entity.save_identifier().clone();
            if !current.is_empty() && seen.insert(current.clone()) {
                continue;
            }
            if !current.is_empty() && self.settings.enable_logs {
                log::warn!("Duplicate save identifier {current} on {type_name}; generating a new one");
            }
            let fresh = SaveIdentifier::generate();
            entity.set_save_identifier(fresh.clone());
            seen.insert(fresh);
            generated += 1;
        }
        generated
    }

    // ---------------------------------------------------------------------
    // Load
    // ---------------------------------------------------------------------

    /// Apply a save document to the scene.
    ///
    /// The header is checked before any callback fires. Malformed and
    /// unresolvable records are skipped and failing entities are reported;
    /// a record that needs a loadable object while no database is set fails
    /// the whole load.
    pub fn load_document(
        &mut self,
        document: &Node,
        scene: &mut dyn SceneGraph,
    ) -> SaveResult<LoadReport> {
        let document = read_document(document)?;
        log::debug!(
            "Loading save v{} from {} with {} records ({} malformed)",
            document.header.version,
            document.header.saved_at.to_rfc3339(),
            document.records.len(),
            document.malformed.len()
        );
        let result = self.load_records(document.records, document.malformed, scene);
        self.enter(SaveState::Idle);
        result
    }

    pub fn load_from_str(&mut self, text: &str, scene: &mut dyn SceneGraph) -> SaveResult<LoadReport> {
        let document = parse_document(text)?;
        self.load_document(&document, scene)
    }

    pub fn load_slot(
        &mut self,
        storage: &dyn SaveStorage,
        slot: &str,
        scene: &mut dyn SceneGraph,
    ) -> SaveResult<LoadReport> {
        let text = storage.read(&self.settings.slot_file_name(slot))?;
        let report = self.load_from_str(&text, scene)?;
        log::info!("Loaded slot '{slot}' ({} entities)", report.loaded);
        Ok(report)
    }

    fn load_records(
        &mut self,
        records: Vec<SaveRecord>,
        malformed: Vec<MalformedRecord>,
        scene: &mut dyn SceneGraph,
    ) -> SaveResult<LoadReport> {
        self.warn_if_stale();
        let mut report = LoadReport::default();

        self.enter(SaveState::BeforeCallbacks);
        report
            .callbacks
            .push(self.distribute(CallbackRole::BeforeLoad, &*scene));

        self.enter(SaveState::Processing);
        for entry in malformed {
            let reason = format!("malformed record #{}: {}", entry.index, entry.reason);
            skip(
                &mut report,
                entry.identifier,
                entry.type_tag,
                reason,
                self.settings.enable_logs,
            );
        }
        let mut live = self.live_by_identifier(&*scene);
        let mut pending = Vec::with_capacity(records.len());
        for record in records {
            if let Some(target) = self.locate(&record, &mut live, scene, &mut report)? {
                pending.push((record, target));
            }
        }

        // Stable: equal priorities keep document order.
        pending.sort_by_key(|(record, _)| Reverse(record.priority));

        for (record, target) in pending {
            let mut guard = target.write();
            let type_name = guard.type_name();
            let Some(entity) = guard.as_save_entity_mut() else {
                skip(
                    &mut report,
                    record.identifier,
                    record.type_tag,
                    format!("{type_name} is not a save entity"),
                    self.settings.enable_logs,
                );
                continue;
            };
            match run_isolated(|| entity.deserialize(&record.data)) {
                Ok(()) => report.loaded += 1,
                Err(err) => report.failures.push(self.entity_failed(
                    "deserialize",
                    record.identifier,
                    type_name,
                    err,
                )),
            }
        }

        self.enter(SaveState::AfterCallbacks);
        report
            .callbacks
            .push(self.distribute(CallbackRole::AfterLoad, &*scene));
        log::debug!(
            "Load finished: {} loaded, {} spawned, {} recreated, {} skipped, {} failed",
            report.loaded,
            report.spawned,
            report.recreated,
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Find or create the live entity a record applies to.
    fn locate(
        &mut self,
        record: &SaveRecord,
        live: &mut HashMap<SaveIdentifier, SharedObject>,
        scene: &mut dyn SceneGraph,
        report: &mut LoadReport,
    ) -> SaveResult<Option<SharedObject>> {
        let enable_logs = self.settings.enable_logs;
        let Some(registration) = self.types.resolve(&record.type_tag) else {
            let reason = SaveError::UnresolvedType(record.type_tag.clone()).to_string();
            skip_record(report, record, reason, enable_logs);
            return Ok(None);
        };

        if let Some(object) = live.get(&record.identifier) {
            return Ok(Some(object.clone()));
        }

        let object = if let Some(id) = record.loadable_object_id {
            let database = self
                .database
                .as_ref()
                .ok_or(SaveError::MissingDatabase(id))?;
            let Some(template) = database.try_get_by_id(id) else {
                let reason = SaveError::MissingLoadableObject(id).to_string();
                skip_record(report, record, reason, enable_logs);
                return Ok(None);
            };
            let spawned = run_isolated(|| scene.spawn(template)).map_err(|err| match err {
                SaveError::Spawn { .. } => err,
                other => SaveError::Spawn {
                    name: template.name().to_owned(),
                    reason: other.to_string(),
                },
            });
            match spawned {
                Ok(object) => {
                    report.spawned += 1;
                    object
                }
                Err(err) => {
                    let failure = self.entity_failed(
                        "spawn",
                        record.identifier.clone(),
                        &record.type_tag,
                        err,
                    );
                    report.failures.push(failure);
                    return Ok(None);
                }
            }
        } else if let Some(object) = registration.instantiate() {
            self.entities.adopt(object.clone());
            report.recreated += 1;
            object
        } else {
            skip_record(
                report,
                record,
                "no live entity with this identifier and nothing to create it from".into(),
                enable_logs,
            );
            return Ok(None);
        };

        if let Some(entity) = object.write().as_save_entity_mut() {
            entity.set_save_identifier(record.identifier.clone());
        }
        live.insert(record.identifier.clone(), object.clone());
        Ok(Some(object))
    }

    fn live_by_identifier(&self, scene: &dyn SceneGraph) -> HashMap<SaveIdentifier, SharedObject> {
        let mut live = HashMap::new();
        for object in self.collect_entities(scene) {
            let identifier = object
                .read()
                .as_save_entity()
                .map(|e| e.save_identifier().clone());
            if let Some(identifier) = identifier.filter(|id| !id.is_empty()) {
                live.entry(identifier).or_insert(object);
            }
        }
        live
    }

    // ---------------------------------------------------------------------
    // Slots
    // ---------------------------------------------------------------------

    pub fn slot_exists(&self, storage: &dyn SaveStorage, slot: &str) -> SaveResult<bool> {
        Ok(storage.exists(&self.settings.slot_file_name(slot))?)
    }

    pub fn delete_slot(&self, storage: &dyn SaveStorage, slot: &str) -> SaveResult<()> {
        storage.delete(&self.settings.slot_file_name(slot))?;
        log::info!("Deleted slot '{slot}'");
        Ok(())
    }

    /// Every readable slot in `storage`, newest first.
    pub fn list_slots(&self, storage: &dyn SaveStorage) -> SaveResult<Vec<SlotInfo>> {
        let mut slots = Vec::new();
        for file_name in storage.list()? {
            let Some(slot) = self.settings.slot_from_file_name(&file_name) else {
                continue;
            };
            let header = storage
                .read(&file_name)
                .map_err(SaveError::from)
                .and_then(|text| Ok(parse_document(&text)?))
                .and_then(|document| SaveHeader::read(&document));
            match header {
                Ok(header) => slots.push(SlotInfo {
                    slot: slot.to_owned(),
                    file_name: file_name.clone(),
                    header,
                }),
                Err(err) => log::debug!("Skipping unreadable save {file_name}: {err}"),
            }
        }
        slots.sort_by(|a, b| b.header.saved_at.cmp(&a.header.saved_at));
        Ok(slots)
    }

    // ---------------------------------------------------------------------
    // Shared helpers
    // ---------------------------------------------------------------------

    fn enter(&mut self, state: SaveState) {
        if self.state != state {
            log::debug!("Save state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn warn_if_stale(&self) {
        if self.types.is_stale() && self.settings.enable_logs {
            log::warn!("Type registry changed since the last cache_callback_types; using the cached tables");
        }
    }

    fn distribute(&self, role: CallbackRole, scene: &dyn SceneGraph) -> DistributionReport {
        let report =
            self.callbacks
                .distribute(role, scene, &self.types, self.settings.include_inactive);
        if self.settings.enable_logs {
            for (type_name, message) in &report.failures {
                log::warn!("{role} handler on {type_name} failed: {message}");
            }
        }
        report
    }

    /// Scene entities of cached entity types, then registry entities.
    fn collect_entities(&self, scene: &dyn SceneGraph) -> Vec<SharedObject> {
        let scanned: Vec<SharedObject> = scene
            .objects(self.settings.include_inactive)
            .into_iter()
            .filter(|o| {
                let object = o.read();
                self.types.is_entity_type(object.type_name()) && object.as_save_entity().is_some()
            })
            .collect();
        let registered: Vec<SharedObject> = self
            .entities
            .entities()
            .into_iter()
            .filter(|o| o.read().as_save_entity().is_some())
            .collect();
        dedup_objects([scanned, registered])
    }

    fn entity_failed(
        &self,
        action: &str,
        identifier: SaveIdentifier,
        type_name: &str,
        err: SaveError,
    ) -> EntityFailure {
        if self.settings.enable_logs {
            log::warn!("Failed to {action} {type_name} ({identifier}): {err}");
        }
        EntityFailure {
            identifier,
            type_name: type_name.to_owned(),
            message: err.to_string(),
        }
    }
}

impl Default for SaveManager {
    fn default() -> Self {
        Self::new(SaveSettings::default())
    }
}

fn skip_record(report: &mut LoadReport, record: &SaveRecord, reason: String, enable_logs: bool) {
    skip(
        report,
        record.identifier.clone(),
        record.type_tag.clone(),
        reason,
        enable_logs,
    );
}

fn skip(
    report: &mut LoadReport,
    identifier: SaveIdentifier,
    type_tag: String,
    reason: String,
    enable_logs: bool,
) {
    if enable_logs {
        log::warn!("Skipping record {identifier} ({type_tag}): {reason}");
    }
    report.skipped.push(SkippedRecord {
        identifier,
        type_tag,
        reason,
    });
}
