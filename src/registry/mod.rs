//! Reference-counted asset registry
//!
//! [`AssetRegistry`] maps each key to one [`LoadHandler`], deduplicating
//! concurrent requests and releasing the loader operation exactly when the
//! last consumer is gone. Consumers that disappear without releasing are
//! reclaimed by sweeps (dropped links) and by the dangling reference queue
//! (instance slots whose spawn never produced a usable instance).
//!
//! The registry is driven by the host: call [`AssetRegistry::update`] once
//! per tick. Callbacks run inside registry calls and cannot re-enter it.

mod dangling;
mod error;
mod handler;
mod record;

#[cfg(test)]
mod tests;

pub use dangling::DanglingRefs;
pub use error::UsageError;
pub use handler::{HandlerId, HandlerKind, LoadHandler, LoadState, UnloadCallback};
pub use record::{ConsumerRecord, InstanceCallback, ObjectCallback, RecordId, SceneCallback};

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;
use std::rc::Rc;

use hecs::{Entity, World};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::core::{Pool, PoolStats, RegistryConfig};
use crate::ecs::ReleaseOnDestroy;
use crate::link::{AssetLink, WeakLink};
use crate::loader::{
    Completion, ContentLoader, LoadError, LoadSceneMode, LoadedAsset, OperationId, SceneInstance,
};
use crate::spawn::{DeferredSpawner, SpawnCompletion, SpawnParams, SpawnTicket, Spawner};

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Handlers registered under their key
    pub active: usize,
    /// Handlers without consumers waiting for their load to finish
    pub postponed: usize,
    /// Consumer records across all handlers
    pub consumers: usize,
    /// Spawns requested and not completed
    pub pending_spawns: usize,
    /// Spawned instances holding a consumer slot
    pub instances: usize,
    /// Slots queued for the reconciler
    pub dangling: usize,
    pub handler_pool: PoolStats,
    pub record_pool: PoolStats,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} active, {} postponed, {} consumers, {} instances | handlers {} | records {}",
            self.active,
            self.postponed,
            self.consumers,
            self.instances,
            self.handler_pool,
            self.record_pool
        )
    }
}

struct PendingUnload {
    key: String,
    callback: Option<UnloadCallback>,
}

/// Log a usage error at its detection site and hand it back
fn report(error: UsageError) -> UsageError {
    log::error!("{}", error);
    error
}

fn despawn_all(world: &mut World, objects: &[Entity]) {
    for &entity in objects {
        if world.despawn(entity).is_err() {
            log::debug!("Spawned entity {:?} was already despawned", entity);
        }
    }
}

/// The handler registry.
///
/// Owns the loader, the spawner, both pools and every handler. A key maps to
/// at most one active handler; handlers whose consumers all released before
/// the load finished are postponed until it does.
pub struct AssetRegistry<L, S = DeferredSpawner> {
    loader: L,
    spawner: S,
    config: RegistryConfig,
    active: FxHashMap<String, HandlerId>,
    postponed: Vec<HandlerId>,
    slots: FxHashMap<HandlerId, LoadHandler>,
    handler_pool: Pool<LoadHandler>,
    record_pool: Pool<ConsumerRecord>,
    /// Handlers waiting on each loader operation
    waiters: FxHashMap<OperationId, SmallVec<[HandlerId; 2]>>,
    spawns: FxHashMap<SpawnTicket, (HandlerId, RecordId)>,
    instances: FxHashMap<Entity, (HandlerId, RecordId)>,
    unloads: FxHashMap<OperationId, PendingUnload>,
    dangling: DanglingRefs,
    tick: u64,
    next_handler: u64,
    next_record: u64,
    completions: Vec<Completion>,
    spawned: Vec<SpawnCompletion>,
}

impl<L: ContentLoader> AssetRegistry<L> {
    /// Create a registry spawning through a [`DeferredSpawner`]
    pub fn with_loader(loader: L, config: RegistryConfig) -> Self {
        Self::new(loader, DeferredSpawner::new(), config)
    }
}

impl<L: ContentLoader, S: Spawner> AssetRegistry<L, S> {
    pub fn new(loader: L, spawner: S, config: RegistryConfig) -> Self {
        log::info!(
            "Asset registry ready (handler pool {}, record pool {})",
            config.handler_pool_capacity,
            config.record_pool_capacity
        );

        Self {
            handler_pool: Pool::with_capacity(LoadHandler::default, config.handler_pool_capacity),
            record_pool: Pool::with_capacity(ConsumerRecord::default, config.record_pool_capacity)
                .with_reset(ConsumerRecord::reset),
            loader,
            spawner,
            config,
            active: FxHashMap::default(),
            postponed: Vec::new(),
            slots: FxHashMap::default(),
            waiters: FxHashMap::default(),
            spawns: FxHashMap::default(),
            instances: FxHashMap::default(),
            unloads: FxHashMap::default(),
            dangling: DanglingRefs::default(),
            tick: 0,
            next_handler: 0,
            next_record: 0,
            completions: Vec::new(),
            spawned: Vec::new(),
        }
    }

    // ========================================================================
    // Object loads
    // ========================================================================

    /// Register `link` for its key and start the load if nobody did yet.
    ///
    /// `on_loaded` is observed weakly; keep it alive for as long as the
    /// notification matters. If the key already finished loading the callback
    /// runs before this returns.
    ///
    /// # Errors
    ///
    /// `KindMismatch` if the key is loaded as a scene, `DuplicateLoad` if the
    /// link or the callback is already registered for the key.
    #[track_caller]
    pub fn load_object(
        &mut self,
        link: &AssetLink,
        on_loaded: &Rc<ObjectCallback>,
    ) -> Result<HandlerId, UsageError> {
        let key = link.key();
        let observer = link.observe();
        let callback = Rc::downgrade(on_loaded);

        if let Some(handler) = self.active.get(key).and_then(|id| self.slots.get(id)) {
            if handler.kind() == Some(HandlerKind::Scene) {
                return Err(report(UsageError::KindMismatch {
                    key: key.to_string(),
                    expected: HandlerKind::Object.describe(),
                }));
            }
            if handler.is_duplicate(&observer, &callback) {
                return Err(report(UsageError::DuplicateLoad {
                    key: key.to_string(),
                }));
            }
        }

        let trace = self.capture();
        let record_id = self.next_record_id();
        let id = self.find_or_create(key);
        let handler = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| report(UsageError::UnknownHandler(id)))?;

        let mut record = self.record_pool.acquire();
        record.setup_object(record_id, key, observer, callback, trace);
        handler.push_record(record);
        log::debug!("'{}' has {} consumers", key, handler.consumer_count());

        if let Some(asset) = handler.asset() {
            if let Some(record) = handler.records().last() {
                record.notify_object(asset);
            }
        } else if let Some(op) = handler.start_object(&mut self.loader) {
            self.waiters.entry(op).or_default().push(id);
        }

        Ok(id)
    }

    /// Remove the object registration of `link`.
    ///
    /// The handler is retired when this was its last consumer and the load
    /// finished, or postponed when the load is still in flight.
    ///
    /// # Errors
    ///
    /// `NotLoaded` if no handler exists for the key, `KindMismatch` for a
    /// scene key, `NotRegistered` if the link holds no registration.
    pub fn release_object(&mut self, link: &AssetLink) -> Result<(), UsageError> {
        let key = link.key();
        let Some(&id) = self.active.get(key) else {
            return Err(report(UsageError::NotLoaded {
                key: key.to_string(),
            }));
        };
        let handler = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| report(UsageError::UnknownHandler(id)))?;

        if handler.kind() == Some(HandlerKind::Scene) {
            return Err(report(UsageError::KindMismatch {
                key: key.to_string(),
                expected: HandlerKind::Object.describe(),
            }));
        }
        if handler.remove_link(&link.observe(), &mut self.record_pool) == 0 {
            return Err(report(UsageError::NotRegistered {
                key: key.to_string(),
            }));
        }

        log::debug!("'{}' has {} consumers", key, handler.consumer_count());
        self.settle(id);
        Ok(())
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Reserve a consumer slot and spawn one instance of the key's template.
    ///
    /// The spawn always completes on a later [`update`](Self::update). The
    /// slot belongs to the instance and is released when the instance is
    /// destroyed, or by the reconciler when no usable instance was produced.
    ///
    /// # Errors
    ///
    /// `KindMismatch` if the key is loaded as a scene.
    #[track_caller]
    pub fn instantiate(
        &mut self,
        link: &AssetLink,
        on_instantiated: &Rc<InstanceCallback>,
        params: SpawnParams,
    ) -> Result<(HandlerId, RecordId), UsageError> {
        let key = link.key();
        if let Some(handler) = self.active.get(key).and_then(|id| self.slots.get(id))
            && handler.kind() == Some(HandlerKind::Scene)
        {
            return Err(report(UsageError::KindMismatch {
                key: key.to_string(),
                expected: HandlerKind::Object.describe(),
            }));
        }

        let trace = self.capture();
        let record_id = self.next_record_id();
        let id = self.find_or_create(key);
        let handler = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| report(UsageError::UnknownHandler(id)))?;

        let mut record = self.record_pool.acquire();
        record.setup_instance(
            record_id,
            key,
            link.observe(),
            Rc::downgrade(on_instantiated),
            params,
            trace,
        );
        handler.push_record(record);
        log::debug!("'{}' has {} consumers", key, handler.consumer_count());

        if let Some(asset) = handler.asset() {
            let ticket = self.spawner.spawn_async(asset, &params);
            self.spawns.insert(ticket, (id, record_id));
        } else if handler.load_error().is_some() {
            self.dangling.push(id, record_id);
        } else if let Some(op) = handler.start_object(&mut self.loader) {
            self.waiters.entry(op).or_default().push(id);
        }

        Ok((id, record_id))
    }

    /// Release the slot held by one instance.
    ///
    /// # Errors
    ///
    /// `UnknownHandler` / `UnknownRecord` for stale ids, `NotAnInstance` if
    /// the record did not request a spawn.
    pub fn release_instance(
        &mut self,
        handler: HandlerId,
        record: RecordId,
    ) -> Result<(), UsageError> {
        let slot = self
            .slots
            .get_mut(&handler)
            .ok_or_else(|| report(UsageError::UnknownHandler(handler)))?;

        let Some(found) = slot.record(record) else {
            return Err(report(UsageError::UnknownRecord {
                key: slot.key().to_string(),
                record,
            }));
        };
        if !found.is_instantiate() {
            return Err(report(UsageError::NotAnInstance {
                key: slot.key().to_string(),
            }));
        }

        if let Some(taken) = slot.take_record(record) {
            self.record_pool.release(taken);
        }
        log::debug!("'{}' has {} consumers", slot.key(), slot.consumer_count());

        self.instances.retain(|_, bound| *bound != (handler, record));
        self.settle(handler);
        Ok(())
    }

    /// Release the slots `link` reserved for instances that have not spawned
    /// yet, returning how many were released.
    ///
    /// Instances already spawned keep their slots.
    pub fn release_pending_instances(&mut self, link: &AssetLink) -> usize {
        let Some(&id) = self.active.get(link.key()) else {
            return 0;
        };
        let Some(handler) = self.slots.get_mut(&id) else {
            return 0;
        };

        let released = handler.remove_pending_instances(&link.observe(), &mut self.record_pool);
        if released > 0 {
            log::debug!(
                "Released {} pending instances of '{}', {} consumers left",
                released,
                link.key(),
                handler.consumer_count()
            );
            self.settle(id);
        }
        released
    }

    /// Despawn an instance and release its slot exactly once
    ///
    /// # Errors
    ///
    /// `UnknownInstance` if the entity was not spawned through this registry
    /// or was already released.
    pub fn destroy_instance(
        &mut self,
        world: &mut World,
        entity: Entity,
    ) -> Result<(), UsageError> {
        let hook = world
            .get::<&ReleaseOnDestroy>(entity)
            .ok()
            .map(|hook| (hook.handler, hook.record));
        let Some((handler, record)) = hook.or_else(|| self.instances.get(&entity).copied()) else {
            return Err(report(UsageError::UnknownInstance(entity)));
        };
        if self.instances.remove(&entity).is_none() {
            return Err(report(UsageError::UnknownInstance(entity)));
        }

        if world.despawn(entity).is_err() {
            log::debug!("Instance {:?} was already despawned", entity);
        }
        self.release_instance(handler, record)
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    /// Start loading a scene owned by `link`
    ///
    /// # Errors
    ///
    /// `DuplicateScene` if the key already has an active handler.
    #[track_caller]
    pub fn load_scene(
        &mut self,
        link: &AssetLink,
        on_loaded: &Rc<SceneCallback>,
        mode: LoadSceneMode,
        activate: bool,
    ) -> Result<HandlerId, UsageError> {
        let trace = self.capture();
        self.begin_scene(link.key(), Some(link.observe()), on_loaded, mode, activate, trace)
    }

    /// Start loading a scene registered by key alone
    ///
    /// # Errors
    ///
    /// `DuplicateScene` if the key already has an active handler.
    #[track_caller]
    pub fn load_scene_by_key(
        &mut self,
        key: &str,
        on_loaded: &Rc<SceneCallback>,
        mode: LoadSceneMode,
        activate: bool,
    ) -> Result<HandlerId, UsageError> {
        let trace = self.capture();
        self.begin_scene(key, None, on_loaded, mode, activate, trace)
    }

    /// Unload the scene owned by `link`; `on_unloaded` runs once the loader
    /// reports the unload finished
    ///
    /// # Errors
    ///
    /// `NotLoaded`, `KindMismatch` for object keys, `NotRegistered` if the
    /// link does not own the scene.
    pub fn unload_scene(
        &mut self,
        link: &AssetLink,
        on_unloaded: Option<UnloadCallback>,
    ) -> Result<(), UsageError> {
        self.end_scene(link.key(), Some(&link.observe()), on_unloaded)
    }

    /// Unload a scene loaded with [`load_scene_by_key`](Self::load_scene_by_key)
    ///
    /// # Errors
    ///
    /// Same as [`unload_scene`](Self::unload_scene).
    pub fn unload_scene_by_key(
        &mut self,
        key: &str,
        on_unloaded: Option<UnloadCallback>,
    ) -> Result<(), UsageError> {
        self.end_scene(key, None, on_unloaded)
    }

    fn begin_scene(
        &mut self,
        key: &str,
        link: Option<WeakLink>,
        on_loaded: &Rc<SceneCallback>,
        mode: LoadSceneMode,
        activate: bool,
        trace: Option<&'static Location<'static>>,
    ) -> Result<HandlerId, UsageError> {
        if self.active.contains_key(key) {
            return Err(report(UsageError::DuplicateScene {
                key: key.to_string(),
            }));
        }

        let record_id = self.next_record_id();
        let id = self.find_or_create(key);
        let handler = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| report(UsageError::UnknownHandler(id)))?;

        let mut record = self.record_pool.acquire();
        record.setup_scene(record_id, key, link, Rc::downgrade(on_loaded), trace);
        handler.push_record(record);

        let op = handler.start_scene(&mut self.loader, mode, activate);
        self.waiters.entry(op).or_default().push(id);
        log::debug!("Loading scene '{}' ({:?})", key, mode);
        Ok(id)
    }

    fn end_scene(
        &mut self,
        key: &str,
        link: Option<&WeakLink>,
        on_unloaded: Option<UnloadCallback>,
    ) -> Result<(), UsageError> {
        let Some(&id) = self.active.get(key) else {
            return Err(report(UsageError::NotLoaded {
                key: key.to_string(),
            }));
        };
        let handler = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| report(UsageError::UnknownHandler(id)))?;

        if handler.kind() != Some(HandlerKind::Scene) {
            return Err(report(UsageError::KindMismatch {
                key: key.to_string(),
                expected: HandlerKind::Scene.describe(),
            }));
        }

        let removed = match link {
            Some(link) => handler.remove_link(link, &mut self.record_pool) > 0,
            None => handler.remove_unowned(&mut self.record_pool),
        };
        if !removed {
            return Err(report(UsageError::NotRegistered {
                key: key.to_string(),
            }));
        }

        handler.set_unload_callback(on_unloaded);
        self.settle(id);
        Ok(())
    }

    // ========================================================================
    // Handler lifecycle
    // ========================================================================

    /// Retire every active handler whose load finished and whose consumers,
    /// once dropped links are purged, are all gone.
    ///
    /// With `report` set each purged link is logged with the location that
    /// registered it. Returns the number of handlers retired.
    pub fn sweep_unused(&mut self, report: bool) -> usize {
        let ids: Vec<HandlerId> = self.active.values().copied().collect();
        let mut retired = 0;

        for id in ids {
            let Some(handler) = self.slots.get_mut(&id) else {
                continue;
            };
            if handler.is_unused(report, &mut self.record_pool) {
                self.retire(id);
                retired += 1;
            } else if handler.consumer_count() == 0 && handler.is_loading() {
                self.postpone(id);
            }
        }

        if retired > 0 {
            log::debug!("Sweep retired {} handlers", retired);
        }
        retired
    }

    /// Retire or postpone a handler that may have lost its last consumer
    fn settle(&mut self, id: HandlerId) {
        let Some(handler) = self.slots.get(&id) else {
            return;
        };
        if handler.consumer_count() > 0 {
            return;
        }
        if handler.is_loading() {
            self.postpone(id);
        } else {
            self.retire(id);
        }
    }

    fn postpone(&mut self, id: HandlerId) {
        let Some(handler) = self.slots.get(&id) else {
            return;
        };
        if self.active.get(handler.key()) == Some(&id) {
            self.active.remove(handler.key());
        }
        if !self.postponed.contains(&id) {
            log::debug!("Postponed handler {:?} for '{}'", id, handler.key());
            self.postponed.push(id);
        }
    }

    /// Remove a handler from the registry, hand its operation back to the
    /// loader and return it to the pool
    fn retire(&mut self, id: HandlerId) {
        let Some(mut handler) = self.slots.remove(&id) else {
            return;
        };

        if self.active.get(handler.key()) == Some(&id) {
            self.active.remove(handler.key());
        }
        if let Some(index) = self.postponed.iter().position(|&p| p == id) {
            self.postponed.swap_remove(index);
            log::debug!("Un-postponed handler {:?} for '{}'", id, handler.key());
        }

        if let Some(unload) = handler.release_operation(&mut self.loader) {
            self.unloads.insert(
                unload,
                PendingUnload {
                    key: handler.key().to_string(),
                    callback: handler.take_unload_callback(),
                },
            );
        }

        log::debug!("Retired handler {:?} for '{}'", id, handler.key());
        handler.reset(&mut self.record_pool);
        self.handler_pool.release(handler);
    }

    fn find_or_create(&mut self, key: &str) -> HandlerId {
        if let Some(&id) = self.active.get(key) {
            return id;
        }

        self.next_handler += 1;
        let id = HandlerId(self.next_handler);
        let mut handler = self.handler_pool.acquire();
        handler.begin(id, key);
        self.slots.insert(id, handler);
        self.active.insert(key.to_string(), id);
        log::debug!("Created handler {:?} for '{}'", id, key);
        id
    }

    fn next_record_id(&mut self) -> RecordId {
        self.next_record += 1;
        RecordId(self.next_record)
    }

    #[track_caller]
    fn capture(&self) -> Option<&'static Location<'static>> {
        if self.config.capture_traces {
            Some(Location::caller())
        } else {
            None
        }
    }

    // ========================================================================
    // Update cycle
    // ========================================================================

    /// Advance the registry by one tick.
    ///
    /// Drains spawn completions, then loader completions, releases instances
    /// despawned outside the registry, runs the reconciler and, when
    /// configured, an automatic sweep.
    pub fn update(&mut self, world: &mut World) {
        self.tick += 1;

        self.process_spawns(world);
        self.process_completions(world);
        self.release_despawned(world);
        self.reconcile();

        let interval = u64::from(self.config.sweep_interval);
        if interval > 0 && self.tick % interval == 0 {
            self.sweep_unused(self.config.report_dangling);
        }
    }

    fn process_spawns(&mut self, world: &mut World) {
        let mut spawned = std::mem::take(&mut self.spawned);
        self.spawner.poll_completions(world, &mut spawned);
        for completion in spawned.drain(..) {
            self.finish_spawn(world, completion);
        }
        self.spawned = spawned;
    }

    fn finish_spawn(&mut self, world: &mut World, completion: SpawnCompletion) {
        let SpawnCompletion { ticket, objects } = completion;
        let Some((handler_id, record_id)) = self.spawns.remove(&ticket) else {
            log::debug!("Discarding untracked spawn {:?}", ticket);
            despawn_all(world, &objects);
            return;
        };
        let Some(handler) = self.slots.get(&handler_id) else {
            despawn_all(world, &objects);
            return;
        };
        let Some(record) = handler.record(record_id) else {
            despawn_all(world, &objects);
            return;
        };

        let Some(&instance) = objects.first() else {
            log::warn!("Spawn of '{}' produced no instance", handler.key());
            self.dangling.push(handler_id, record_id);
            return;
        };
        if record.is_dangling_parent(world) {
            log::warn!(
                "Parent of '{}' was destroyed during the spawn{}",
                handler.key(),
                record.trace_suffix()
            );
            despawn_all(world, &objects);
            self.dangling.push(handler_id, record_id);
            return;
        }

        let hook = ReleaseOnDestroy {
            handler: handler_id,
            record: record_id,
        };
        if world.insert_one(instance, hook).is_err() {
            log::warn!("Instance of '{}' vanished before it was bound", handler.key());
            despawn_all(world, &objects);
            self.dangling.push(handler_id, record_id);
            return;
        }

        self.instances.insert(instance, (handler_id, record_id));
        record.notify_instance(instance);
        if let Some(handler) = self.slots.get_mut(&handler_id) {
            handler.bind_instance(record_id, instance);
        }
    }

    fn process_completions(&mut self, world: &World) {
        let mut completions = std::mem::take(&mut self.completions);
        self.loader.poll_completions(&mut completions);
        for completion in completions.drain(..) {
            match completion {
                Completion::Object { op, result } => {
                    for id in self.waiters.remove(&op).unwrap_or_default() {
                        self.finish_object(world, id, op, result.clone());
                    }
                }
                Completion::Scene { op, result } => {
                    for id in self.waiters.remove(&op).unwrap_or_default() {
                        self.finish_scene(id, op, result.clone());
                    }
                }
                Completion::SceneUnloaded { op, result } => self.finish_unload(op, result),
            }
        }
        self.completions = completions;
    }

    fn finish_object(
        &mut self,
        world: &World,
        id: HandlerId,
        op: OperationId,
        result: Result<LoadedAsset, LoadError>,
    ) {
        let Some(handler) = self.slots.get_mut(&id) else {
            return;
        };
        if !handler.complete_object(op, result) {
            return;
        }
        if let Some(error) = handler.load_error() {
            log::error!("Failed to load '{}': {}", handler.key(), error);
        }
        if handler.is_unused(self.config.report_dangling, &mut self.record_pool) {
            self.retire(id);
            return;
        }

        let Some(handler) = self.slots.get(&id) else {
            return;
        };
        if handler.load_error().is_some() {
            for record in handler.records().iter().filter(|r| r.is_instantiate()) {
                self.dangling.push(id, record.id());
            }
            return;
        }
        let Some(asset) = handler.asset() else {
            return;
        };

        for record in handler.records() {
            let Some(params) = record.spawn_params() else {
                record.notify_object(asset);
                continue;
            };
            if record.is_dangling_parent(world) {
                log::warn!(
                    "Parent of '{}' was destroyed before the spawn{}",
                    handler.key(),
                    record.trace_suffix()
                );
                self.dangling.push(id, record.id());
                continue;
            }
            let ticket = self.spawner.spawn_async(asset, params);
            self.spawns.insert(ticket, (id, record.id()));
        }
    }

    fn finish_scene(
        &mut self,
        id: HandlerId,
        op: OperationId,
        result: Result<SceneInstance, LoadError>,
    ) {
        let Some(handler) = self.slots.get_mut(&id) else {
            return;
        };
        if !handler.complete_scene(op, result) {
            return;
        }
        if let Some(error) = handler.load_error() {
            log::error!("Failed to load scene '{}': {}", handler.key(), error);
        }
        if handler.is_unused(self.config.report_dangling, &mut self.record_pool) {
            self.retire(id);
            return;
        }
        if handler.load_error().is_some() {
            return;
        }
        if let Some(scene) = handler.scene() {
            log::info!("Loaded scene '{}'", handler.key());
            for record in handler.records() {
                record.notify_scene(scene);
            }
        }
    }

    fn finish_unload(&mut self, op: OperationId, result: Result<(), LoadError>) {
        let Some(PendingUnload { key, callback }) = self.unloads.remove(&op) else {
            return;
        };
        match result {
            Ok(()) => {
                log::info!("Unloaded scene '{}'", key);
                if let Some(callback) = callback {
                    callback(&key);
                }
            }
            Err(error) => log::error!("Failed to unload scene '{}': {}", key, error),
        }
    }

    /// Release instances despawned directly through the world
    fn release_despawned(&mut self, world: &World) {
        let gone: Vec<(Entity, (HandlerId, RecordId))> = self
            .instances
            .iter()
            .filter(|(entity, _)| !world.contains(**entity))
            .map(|(&entity, &bound)| (entity, bound))
            .collect();

        for (entity, (handler, record)) in gone {
            log::debug!("Instance {:?} was despawned", entity);
            self.instances.remove(&entity);
            self.release_instance(handler, record).ok();
        }
    }

    /// Release every queued slot that never got a usable instance
    fn reconcile(&mut self) {
        for (handler, record) in self.dangling.take() {
            // Purged or released since it was queued
            let queued = self.slots.get(&handler).filter(|h| h.record(record).is_some());
            let Some(slot) = queued else {
                continue;
            };
            log::warn!("Releasing unfulfilled instance of '{}'", slot.key());
            self.release_instance(handler, record).ok();
        }
    }

    /// Tear the registry down: hand every operation back to the loader,
    /// forget all handlers, spawns and instances, and drain both pools
    pub fn shutdown(&mut self) {
        let ids: Vec<HandlerId> = self.slots.keys().copied().collect();
        for id in ids {
            let Some(mut handler) = self.slots.remove(&id) else {
                continue;
            };
            if handler.is_loading() {
                log::warn!("Releasing '{}' while it is still loading", handler.key());
            }
            handler.release_operation(&mut self.loader);
            handler.reset(&mut self.record_pool);
            self.handler_pool.release(handler);
        }

        self.active.clear();
        self.postponed.clear();
        self.waiters.clear();
        self.spawns.clear();
        self.instances.clear();
        self.unloads.clear();
        self.dangling.clear();
        self.handler_pool.drain();
        self.record_pool.drain();
        log::info!("Asset registry shut down");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Active handler for `key`
    #[must_use]
    pub fn get_handler(&self, key: &str) -> Option<HandlerId> {
        self.active.get(key).copied()
    }

    /// Any live handler, active or postponed
    #[must_use]
    pub fn handler(&self, id: HandlerId) -> Option<&LoadHandler> {
        self.slots.get(&id)
    }

    #[must_use]
    pub fn is_postponed(&self, id: HandlerId) -> bool {
        self.postponed.contains(&id)
    }

    /// Consumers registered on the active handler for `key`
    #[must_use]
    pub fn consumer_count(&self, key: &str) -> usize {
        self.get_handler(key)
            .and_then(|id| self.handler(id))
            .map_or(0, LoadHandler::consumer_count)
    }

    /// Loaded object for `key`, if its load succeeded
    #[must_use]
    pub fn asset(&self, key: &str) -> Option<&LoadedAsset> {
        self.get_handler(key)
            .and_then(|id| self.handler(id))
            .and_then(LoadHandler::asset)
    }

    /// Loaded scene for `key`, if its load succeeded
    #[must_use]
    pub fn scene(&self, key: &str) -> Option<&SceneInstance> {
        self.get_handler(key)
            .and_then(|id| self.handler(id))
            .and_then(LoadHandler::scene)
    }

    /// Source path of `key`, as reported by the loader
    #[must_use]
    pub fn resolve_path(&self, key: &str) -> Option<PathBuf> {
        self.loader.resolve_path(key)
    }

    /// Handler bound to a spawned instance
    #[must_use]
    pub fn instance(&self, entity: Entity) -> Option<(HandlerId, RecordId)> {
        self.instances.get(&entity).copied()
    }

    #[must_use]
    pub fn handler_pool(&self) -> PoolStats {
        self.handler_pool.stats()
    }

    #[must_use]
    pub fn record_pool(&self) -> PoolStats {
        self.record_pool.stats()
    }

    /// Slots waiting for the reconciler's next pass
    #[must_use]
    pub fn pending_dangling(&self) -> usize {
        self.dangling.len()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            active: self.active.len(),
            postponed: self.postponed.len(),
            consumers: self.slots.values().map(LoadHandler::consumer_count).sum(),
            pending_spawns: self.spawns.len(),
            instances: self.instances.len(),
            dangling: self.dangling.len(),
            handler_pool: self.handler_pool.stats(),
            record_pool: self.record_pool.stats(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Ticks run so far
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    #[must_use]
    pub fn spawner(&self) -> &S {
        &self.spawner
    }
}

impl<L, S> fmt::Debug for AssetRegistry<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("active", &self.active.len())
            .field("postponed", &self.postponed.len())
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}
