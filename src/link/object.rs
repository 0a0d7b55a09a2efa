//! Typed object link

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{AssetLink, AssetReference};
use crate::loader::{ContentLoader, LoadedAsset};
use crate::registry::{AssetRegistry, ObjectCallback, UsageError};
use crate::spawn::Spawner;

/// Callback slot shared between a link and its relay
type CallbackSlot<T> = Rc<RefCell<Option<Box<dyn Fn(Rc<T>)>>>>;

/// Link to an object resource of type `T`
pub struct ObjectLink<T> {
    link: AssetLink,
    /// Owned relay the registry observes weakly
    relay: Option<Rc<ObjectCallback>>,
    /// Latest callback passed to `load`; the relay forwards to it
    slot: CallbackSlot<T>,
}

impl<T: 'static> ObjectLink<T> {
    pub fn new(key: impl Into<String>) -> Self {
        Self::from_link(AssetLink::new(key))
    }

    fn from_link(link: AssetLink) -> Self {
        Self {
            link,
            relay: None,
            slot: Rc::default(),
        }
    }

    /// Load the object and hand it to `on_loaded`.
    ///
    /// Does nothing without a key. Loading an already loaded link replaces
    /// its callback instead of registering again: the new callback receives
    /// the pending result, or the cached object right away.
    ///
    /// # Errors
    ///
    /// Propagates the registry's [`UsageError`].
    #[track_caller]
    pub fn load<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
        on_loaded: impl Fn(Rc<T>) + 'static,
    ) -> Result<(), UsageError> {
        if !self.link.has_key() {
            return Ok(());
        }

        let on_loaded: Box<dyn Fn(Rc<T>)> = Box::new(on_loaded);
        self.slot.replace(Some(on_loaded));
        if self.link.is_loaded() {
            log::debug!("'{}' is already loaded; replacing its callback", self.link.key());
            let cached = registry
                .asset(self.link.key())
                .and_then(|asset| asset.downcast::<T>());
            if let Some(value) = cached {
                self.forward(value);
            }
            return Ok(());
        }

        let key = self.link.key().to_string();
        let slot = Rc::clone(&self.slot);
        let relay: Rc<ObjectCallback> = Rc::new(move |asset: &LoadedAsset| {
            match asset.downcast::<T>() {
                Some(value) => {
                    if let Some(on_loaded) = slot.borrow().as_ref() {
                        on_loaded(value);
                    }
                }
                None => log::error!("'{}' is not a {}", key, type_name::<T>()),
            }
        });

        if let Err(error) = registry.load_object(&self.link, &relay) {
            self.slot.replace(None);
            return Err(error);
        }
        self.relay = Some(relay);
        self.link.set_loaded(true);
        Ok(())
    }

    fn forward(&self, value: Rc<T>) {
        if let Some(on_loaded) = self.slot.borrow().as_ref() {
            on_loaded(value);
        }
    }

    /// Release the registration made by [`load`](Self::load)
    ///
    /// # Errors
    ///
    /// `NotLoaded` if the link is not loaded, or the registry's error.
    pub fn release<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
    ) -> Result<(), UsageError> {
        if !self.link.has_key() {
            return Ok(());
        }
        if !self.link.is_loaded() {
            let error = UsageError::NotLoaded {
                key: self.link.key().to_string(),
            };
            log::error!("Cannot release: {}", error);
            return Err(error);
        }

        registry.release_object(&self.link)?;
        self.relay = None;
        self.slot.replace(None);
        self.link.set_loaded(false);
        Ok(())
    }

    /// The loaded object, once the load completed successfully
    pub fn get<L: ContentLoader, S: Spawner>(
        &self,
        registry: &AssetRegistry<L, S>,
    ) -> Option<Rc<T>> {
        if !self.link.has_key() || !self.link.is_loaded() {
            log::warn!("'{}' is not loaded", self.link.key());
            return None;
        }
        let Some(asset) = registry.asset(self.link.key()) else {
            log::warn!("'{}' has no loaded object", self.link.key());
            return None;
        };
        asset.downcast::<T>()
    }
}

impl<T> AssetReference for ObjectLink<T> {
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
        if registry.release_object(&self.link).is_ok() {
            self.relay = None;
            self.slot.replace(None);
        }
    }
}

impl<T> fmt::Debug for ObjectLink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectLink")
            .field("key", &self.link.key())
            .field("loaded", &self.link.is_loaded())
            .finish()
    }
}

impl<T> Serialize for ObjectLink<T> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.link.serialize(serializer)
    }
}

impl<'de, T: 'static> Deserialize<'de> for ObjectLink<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        AssetLink::deserialize(deserializer).map(Self::from_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RegistryConfig;
    use crate::loader::MemoryLoader;
    use hecs::World;
    use std::cell::Cell;

    fn registry() -> AssetRegistry<MemoryLoader> {
        let mut loader = MemoryLoader::new();
        loader.insert("sword", 12_u32).insert("shield", String::from("oak"));
        AssetRegistry::with_loader(loader, RegistryConfig::default())
    }

    #[test]
    fn test_load_delivers_typed_value() {
        let mut registry = registry();
        let mut world = World::new();
        let seen = Rc::new(Cell::new(0));

        let mut link = ObjectLink::<u32>::new("sword");
        let sink = Rc::clone(&seen);
        link.load(&mut registry, move |value| sink.set(*value)).unwrap();
        assert!(link.is_loaded());
        assert_eq!(seen.get(), 0);

        registry.update(&mut world);
        assert_eq!(seen.get(), 12);
        assert_eq!(link.get(&registry).as_deref(), Some(&12));
    }

    #[test]
    fn test_reload_replays_cached_value() {
        let mut registry = registry();
        let mut world = World::new();
        let mut link = ObjectLink::<u32>::new("sword");
        link.load(&mut registry, |_| {}).unwrap();
        registry.update(&mut world);

        let hits = Rc::new(Cell::new(0));
        let sink = Rc::clone(&hits);
        link.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.consumer_count("sword"), 1);
    }

    #[test]
    fn test_reload_while_pending_replaces_callback() {
        let mut registry = registry();
        let mut world = World::new();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let mut link = ObjectLink::<u32>::new("sword");
        let sink = Rc::clone(&first);
        link.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
        let sink = Rc::clone(&second);
        link.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
        assert_eq!(second.get(), 0);
        assert_eq!(registry.consumer_count("sword"), 1);

        registry.update(&mut world);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_type_mismatch_skips_callback() {
        let mut registry = registry();
        let mut world = World::new();
        let hits = Rc::new(Cell::new(0));

        let mut link = ObjectLink::<u32>::new("shield");
        let sink = Rc::clone(&hits);
        link.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
        registry.update(&mut world);

        assert_eq!(hits.get(), 0);
        assert!(link.get(&registry).is_none());
    }

    #[test]
    fn test_release_requires_load() {
        let mut registry = registry();
        let mut link = ObjectLink::<u32>::new("sword");
        assert!(matches!(link.release(&mut registry), Err(UsageError::NotLoaded { .. })));

        let mut unset = ObjectLink::<u32>::new("");
        assert!(unset.release(&mut registry).is_ok());
        assert!(unset.load(&mut registry, |_| {}).is_ok());
        assert_eq!(registry.stats().active, 0);
    }

    #[test]
    fn test_link_round_trips_as_key() {
        let link = ObjectLink::<u32>::new("sword");
        let text = ron::to_string(&link).unwrap();
        let restored: ObjectLink<u32> = ron::from_str(&text).unwrap();
        assert_eq!(restored.key(), "sword");
        assert!(!restored.is_loaded());
    }
}
