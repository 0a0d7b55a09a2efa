//! Consumer records
//!
//! One record per outstanding request against a handler. Records observe the
//! requesting link, the callback and the spawn parent without owning any of
//! them; they only ask whether those still exist.

use std::panic::Location;
use std::rc::Weak;

use hecs::{Entity, World};

use crate::link::WeakLink;
use crate::loader::{LoadedAsset, SceneInstance};
use crate::spawn::SpawnParams;

/// Callback invoked with a loaded object
pub type ObjectCallback = dyn Fn(&LoadedAsset);
/// Callback invoked with a spawned instance
pub type InstanceCallback = dyn Fn(Entity);
/// Callback invoked with a loaded scene
pub type SceneCallback = dyn Fn(&SceneInstance);

/// Identity of one registration; never reused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RecordId(pub u64);

#[derive(Default)]
enum Callback {
    #[default]
    None,
    Object(Weak<ObjectCallback>),
    Instance(Weak<InstanceCallback>),
    Scene(Weak<SceneCallback>),
}

/// One outstanding request for a key
#[derive(Default)]
pub struct ConsumerRecord {
    id: RecordId,
    key: String,
    link: Option<WeakLink>,
    callback: Callback,
    spawn: Option<SpawnParams>,
    /// Root of the spawned instance once bound
    instance: Option<Entity>,
    trace: Option<&'static Location<'static>>,
}

impl ConsumerRecord {
    /// Populate for a plain object load
    pub(crate) fn setup_object(
        &mut self,
        id: RecordId,
        key: &str,
        link: WeakLink,
        callback: Weak<ObjectCallback>,
        trace: Option<&'static Location<'static>>,
    ) {
        self.assign(id, key, Some(link), trace);
        self.callback = Callback::Object(callback);
    }

    /// Populate for a scene load; key-only loads have no link
    pub(crate) fn setup_scene(
        &mut self,
        id: RecordId,
        key: &str,
        link: Option<WeakLink>,
        callback: Weak<SceneCallback>,
        trace: Option<&'static Location<'static>>,
    ) {
        self.assign(id, key, link, trace);
        self.callback = Callback::Scene(callback);
    }

    /// Populate for an instantiate request
    pub(crate) fn setup_instance(
        &mut self,
        id: RecordId,
        key: &str,
        link: WeakLink,
        callback: Weak<InstanceCallback>,
        params: SpawnParams,
        trace: Option<&'static Location<'static>>,
    ) {
        self.assign(id, key, Some(link), trace);
        self.callback = Callback::Instance(callback);
        self.spawn = Some(params);
    }

    fn assign(
        &mut self,
        id: RecordId,
        key: &str,
        link: Option<WeakLink>,
        trace: Option<&'static Location<'static>>,
    ) {
        self.id = id;
        self.key.clear();
        self.key.push_str(key);
        self.link = link;
        self.spawn = None;
        self.instance = None;
        self.trace = trace;
    }

    /// Clear every field before the record returns to its pool
    pub(crate) fn reset(&mut self) {
        self.id = RecordId::default();
        self.key.clear();
        self.link = None;
        self.callback = Callback::None;
        self.spawn = None;
        self.instance = None;
        self.trace = None;
    }

    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this record reserves a spawned instance
    #[must_use]
    pub fn is_instantiate(&self) -> bool {
        self.spawn.is_some()
    }

    #[must_use]
    pub fn spawn_params(&self) -> Option<&SpawnParams> {
        self.spawn.as_ref()
    }

    /// Spawned instance holding this slot
    #[must_use]
    pub fn instance(&self) -> Option<Entity> {
        self.instance
    }

    pub(crate) fn bind_instance(&mut self, entity: Entity) {
        self.instance = Some(entity);
    }

    /// Instance request still waiting for its spawn
    #[must_use]
    pub fn is_pending_instance(&self) -> bool {
        self.is_instantiate() && self.instance.is_none()
    }

    /// Caller location captured when the request was made
    #[must_use]
    pub fn trace(&self) -> Option<&'static Location<'static>> {
        self.trace
    }

    pub(crate) fn is_link(&self, link: &WeakLink) -> bool {
        self.link.as_ref().is_some_and(|own| own.id() == link.id())
    }

    /// Registered by key alone, with no link to observe
    pub(crate) fn is_unowned(&self) -> bool {
        self.link.is_none()
    }

    pub(crate) fn has_callback(&self, callback: &Weak<ObjectCallback>) -> bool {
        match &self.callback {
            Callback::Object(own) => own.strong_count() > 0 && Weak::ptr_eq(own, callback),
            _ => false,
        }
    }

    /// The requesting link was dropped without releasing
    #[must_use]
    pub fn is_dangling_link(&self) -> bool {
        self.link.as_ref().is_some_and(|link| !link.is_alive())
    }

    /// A parent was requested and no longer exists in `world`
    #[must_use]
    pub fn is_dangling_parent(&self, world: &World) -> bool {
        self.spawn
            .and_then(|params| params.parent)
            .is_some_and(|parent| !world.contains(parent))
    }

    pub(crate) fn notify_object(&self, asset: &LoadedAsset) {
        if let Callback::Object(callback) = &self.callback
            && let Some(callback) = callback.upgrade()
        {
            callback(asset);
        }
    }

    pub(crate) fn notify_instance(&self, entity: Entity) {
        if let Callback::Instance(callback) = &self.callback
            && let Some(callback) = callback.upgrade()
        {
            callback(entity);
        }
    }

    pub(crate) fn notify_scene(&self, scene: &SceneInstance) {
        if let Callback::Scene(callback) = &self.callback
            && let Some(callback) = callback.upgrade()
        {
            callback(scene);
        }
    }

    /// Location suffix for diagnostics
    pub(crate) fn trace_suffix(&self) -> String {
        self.trace
            .map(|location| format!(" (requested at {location})"))
            .unwrap_or_default()
    }
}
