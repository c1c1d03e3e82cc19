//! # savebox
//!
//! Save/load orchestration on top of [`savebox_tree`].
//!
//! ## Core Types
//!
//! - [`SaveManager`] — Runs save and load operations over a [`SceneGraph`]
//! - [`SaveDataEntity`] / [`SaveCallbacks`] — What host objects implement
//! - [`TypeRegistry`] — Entity types, callback roles and renamed types
//! - [`EntityRegistry`] — Entities outside the scene scan
//! - [`CallbackDistributor`] — Pipeline checkpoint notifications
//! - [`LoadableObjectDatabase`] — Templates for entities missing at load time
//!
//! ## Persistence
//!
//! - [`SaveSettings`] — Output format, logging and slot naming
//! - [`SaveStorage`] — [`MemoryStorage`] and [`FileSystemStorage`] slots
//!
//! ## Example
//!
//! ```ignore
//! use savebox::*;
//!
//! let mut manager = SaveManager::default();
//! manager
//!     .types_mut()
//!     .register(TypeRegistration::of::<Player>().entity().formerly_known_as("old::Player"));
//! manager.types_mut().cache_callback_types();
//!
//! let storage = FileSystemStorage::new("saves");
//! manager.save_slot(&storage, "quick", &scene)?;
//! let report = manager.load_slot(&storage, "quick", &mut scene)?;
//! ```

mod callbacks;
mod document;
mod entity;
mod error;
mod identity;
mod isolate;
mod loadable;
mod manager;
mod registry;
mod settings;
mod storage;
mod type_registry;

pub use callbacks::{CallbackDistributor, DistributionReport};
pub use document::{
    build_document, read_document, MalformedRecord, SaveDocument, SaveHeader, SaveRecord,
    CURRENT_VERSION,
};
pub use entity::{
    shared, MemoryScene, SaveCallbacks, SaveDataEntity, SceneGraph, SceneObject, SharedObject,
};
pub use error::{SaveError, SaveResult};
pub use identity::SaveIdentifier;
pub use loadable::{LoadableObject, LoadableObjectDatabase, LoadableObjectId};
pub use manager::{
    EntityFailure, LoadReport, SaveManager, SaveReport, SaveState, SkippedRecord, SlotInfo,
};
pub use registry::EntityRegistry;
pub use settings::SaveSettings;
pub use storage::{FileSystemStorage, MemoryStorage, SaveStorage, StorageError, StorageResult};
pub use type_registry::{CallbackRole, CallbackRoles, TypeRegistration, TypeRegistry};

pub use savebox_tree as tree;
