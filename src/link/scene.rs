//! Scene link

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{AssetLink, AssetReference};
use crate::loader::{ContentLoader, LoadSceneMode, SceneInstance};
use crate::registry::{AssetRegistry, SceneCallback, UnloadCallback, UsageError};
use crate::spawn::Spawner;

/// Link owning one loaded scene
#[derive(Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneLink {
    link: AssetLink,
    #[serde(skip)]
    relay: Option<Rc<SceneCallback>>,
}

impl SceneLink {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            link: AssetLink::new(key),
            relay: None,
        }
    }

    /// Load the scene; a loaded link refuses to load again
    ///
    /// # Errors
    ///
    /// `DuplicateScene` if this link already loaded its scene, or the
    /// registry's error.
    #[track_caller]
    pub fn load<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
        mode: LoadSceneMode,
        activate: bool,
        on_loaded: impl Fn(&SceneInstance) + 'static,
    ) -> Result<(), UsageError> {
        if !self.link.has_key() {
            return Ok(());
        }
        if self.link.is_loaded() {
            let error = UsageError::DuplicateScene {
                key: self.link.key().to_string(),
            };
            log::error!("Cannot load: {}", error);
            return Err(error);
        }

        let relay: Rc<SceneCallback> = Rc::new(on_loaded);
        registry.load_scene(&self.link, &relay, mode, activate)?;
        self.relay = Some(relay);
        self.link.set_loaded(true);
        Ok(())
    }

    /// Unload the scene this link loaded
    ///
    /// # Errors
    ///
    /// `NotLoaded` if the link holds no scene, or the registry's error.
    pub fn unload<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
        on_unloaded: Option<UnloadCallback>,
    ) -> Result<(), UsageError> {
        if !self.link.has_key() {
            return Ok(());
        }
        if !self.link.is_loaded() {
            let error = UsageError::NotLoaded {
                key: self.link.key().to_string(),
            };
            log::error!("Cannot unload: {}", error);
            return Err(error);
        }

        registry.unload_scene(&self.link, on_unloaded)?;
        self.relay = None;
        self.link.set_loaded(false);
        Ok(())
    }

    /// The loaded scene, once the load completed successfully
    pub fn get<'r, L: ContentLoader, S: Spawner>(
        &self,
        registry: &'r AssetRegistry<L, S>,
    ) -> Option<&'r SceneInstance> {
        if !self.link.is_loaded() {
            log::warn!("Scene '{}' is not loaded", self.link.key());
            return None;
        }
        registry.scene(self.link.key())
    }
}

impl AssetReference for SceneLink {
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
        if registry.unload_scene(&self.link, None).is_ok() {
            self.relay = None;
        }
    }
}
