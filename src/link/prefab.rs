//! Instantiating link

use std::rc::Rc;

use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{AssetLink, AssetReference};
use crate::loader::ContentLoader;
use crate::registry::{AssetRegistry, HandlerId, InstanceCallback, RecordId, UsageError};
use crate::spawn::{SpawnParams, Spawner};

/// Link that spawns instances of a template.
///
/// Each spawned instance holds its own consumer slot, so resetting or
/// dropping the link leaves live instances untouched. Requests that have not
/// spawned yet are released with the link.
#[derive(Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefabLink {
    link: AssetLink,
    #[serde(skip)]
    callbacks: Vec<Rc<InstanceCallback>>,
}

impl PrefabLink {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            link: AssetLink::new(key),
            callbacks: Vec::new(),
        }
    }

    /// Request one instance; `on_instantiated` runs when the spawn completes.
    ///
    /// Returns `None` without a key.
    ///
    /// # Errors
    ///
    /// Propagates the registry's [`UsageError`].
    #[track_caller]
    pub fn instantiate<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
        params: SpawnParams,
        on_instantiated: impl Fn(Entity) + 'static,
    ) -> Result<Option<(HandlerId, RecordId)>, UsageError> {
        if !self.link.has_key() {
            return Ok(None);
        }

        // Callbacks whose record is gone are no longer observed
        self.callbacks.retain(|callback| Rc::weak_count(callback) > 0);

        let callback: Rc<InstanceCallback> = Rc::new(on_instantiated);
        let slot = registry.instantiate(&self.link, &callback, params)?;
        self.callbacks.push(callback);
        self.link.set_loaded(true);
        Ok(Some(slot))
    }

    /// Instance callbacks still waiting on their record
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }
}

impl AssetReference for PrefabLink {
    fn link(&self) -> &AssetLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut AssetLink {
        &mut self.link
    }

    fn release_registration<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
    ) {
        registry.release_pending_instances(&self.link);
        self.callbacks.clear();
    }
}
