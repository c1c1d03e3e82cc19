//! Notifies callback listeners at the pipeline checkpoints.
//!
//! Listeners come from two places: scene objects whose type is cached for
//! the role in the [`TypeRegistry`], and participants registered directly
//! with the distributor (objects the scene scan never sees). Each object is
//! notified at most once per distribution. A panicking handler is recorded
//! in the report and the remaining handlers still run.

use crate::entity::{SceneGraph, SharedObject};
use crate::isolate::run_isolated;
use crate::registry::{WeakSet, dedup_objects};
use crate::type_registry::{CallbackRole, TypeRegistry};

/// Outcome of one [`CallbackDistributor::distribute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReport {
    pub role: CallbackRole,
    /// Handlers that ran to completion.
    pub notified: usize,
    /// `(type name, message)` for each handler that panicked.
    pub failures: Vec<(String, String)>,
}

impl DistributionReport {
    fn new(role: CallbackRole) -> Self {
        Self {
            role,
            notified: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
pub struct CallbackDistributor {
    participants: WeakSet,
}

impl CallbackDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener outside the scene scan. Held weakly; notified for
    /// every role its [`SaveCallbacks`](crate::SaveCallbacks) view handles.
    pub fn register(&mut self, participant: &SharedObject) -> bool {
        self.participants.insert(participant)
    }

    pub fn unregister(&mut self, participant: &SharedObject) -> bool {
        self.participants.remove(participant)
    }

    /// Listeners for `role`, in notification order: scene objects first,
    /// then explicit participants.
    pub fn listeners(
        &self,
        role: CallbackRole,
        scene: &dyn SceneGraph,
        types: &TypeRegistry,
        include_inactive: bool,
    ) -> Vec<SharedObject> {
        let scanned: Vec<SharedObject> = scene
            .objects(include_inactive)
            .into_iter()
            .filter(|o| types.has_role(o.read().type_name(), role))
            .collect();
        dedup_objects([scanned, self.participants.live()])
    }

    /// Notify every listener for `role`.
    pub fn distribute(
        &self,
        role: CallbackRole,
        scene: &dyn SceneGraph,
        types: &TypeRegistry,
        include_inactive: bool,
    ) -> DistributionReport {
        let mut report = DistributionReport::new(role);
        for listener in self.listeners(role, scene, types, include_inactive) {
            let mut object = listener.write();
            let type_name = object.type_name();
            let Some(callbacks) = object.as_save_callbacks() else {
                continue;
            };
            match run_isolated(|| {
                role.invoke(callbacks);
                Ok(())
            }) {
                Ok(()) => report.notified += 1,
                Err(err) => report.failures.push((type_name.to_owned(), err.to_string())),
            }
        }
        log::debug!(
            "Distributed {role}: {} notified, {} failed",
            report.notified,
            report.failures.len()
        );
        report
    }
}
