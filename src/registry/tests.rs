use super::*;
use crate::ecs::{Name, Transform};
use crate::link::{AssetReference, ObjectLink, PrefabLink, SceneLink};
use crate::loader::MemoryLoader;
use crate::spawn::Prefab;
use glam::Vec3;
use std::cell::{Cell, RefCell};

fn catalog() -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    loader
        .insert("hero", 1_u32)
        .insert("rock", 5_u32)
        .insert("crate", Prefab::new("Crate"))
        .insert_broken("broken", "corrupt bundle")
        .insert_scene("level");
    loader
}

fn registry() -> AssetRegistry<MemoryLoader> {
    AssetRegistry::with_loader(catalog(), RegistryConfig::default().with_pool_capacity(8, 8))
}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

/// Spawner that always produces an entity, ignoring the requested parent
#[derive(Default)]
struct OrphanSpawner {
    queue: Vec<SpawnTicket>,
    next: u64,
}

impl Spawner for OrphanSpawner {
    fn spawn_async(&mut self, _template: &LoadedAsset, _params: &SpawnParams) -> SpawnTicket {
        self.next += 1;
        self.queue.push(SpawnTicket(self.next));
        SpawnTicket(self.next)
    }

    fn poll_completions(&mut self, world: &mut World, out: &mut Vec<SpawnCompletion>) {
        for ticket in self.queue.drain(..) {
            let entity = world.spawn((Name::new("orphan"),));
            out.push(SpawnCompletion {
                ticket,
                objects: vec![entity],
            });
        }
    }
}

// ============================================================================
// Object loads
// ============================================================================

#[test]
fn test_five_links_share_one_load() {
    let mut registry = registry();
    let mut world = World::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let mut links: Vec<ObjectLink<u32>> = (0..5).map(|_| ObjectLink::new("hero")).collect();
    for (index, link) in links.iter_mut().enumerate() {
        let sink = Rc::clone(&order);
        link.load(&mut registry, move |_| sink.borrow_mut().push(index)).unwrap();
    }
    assert_eq!(registry.loader().stats().load_calls, 1);
    assert!(order.borrow().is_empty());

    registry.update(&mut world);
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
    assert_eq!(registry.consumer_count("hero"), 5);

    for link in &mut links[..2] {
        link.release(&mut registry).unwrap();
    }
    assert_eq!(registry.consumer_count("hero"), 3);

    for link in &mut links[2..] {
        link.reset(&mut registry);
    }
    assert!(registry.get_handler("hero").is_none());
    assert_eq!(registry.handler_pool(), PoolStats { live: 0, spare: 1 });
    assert_eq!(registry.handler_pool().high_water_mark(), 1);
    assert_eq!(registry.record_pool(), PoolStats { live: 0, spare: 5 });
    assert_eq!(registry.loader().stats().releases, 1);
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_release_after_completion_retires_immediately() {
    let mut registry = registry();
    let mut world = World::new();
    let mut link = ObjectLink::<u32>::new("hero");
    link.load(&mut registry, |_| {}).unwrap();
    registry.update(&mut world);

    let id = registry.get_handler("hero").unwrap();
    link.release(&mut registry).unwrap();

    assert!(registry.get_handler("hero").is_none());
    assert!(!registry.is_postponed(id));
    assert!(registry.handler(id).is_none());
    assert_eq!(registry.loader().stats().releases, 1);
}

#[test]
fn test_postponed_handler_shares_operation() {
    let mut registry = registry();
    let mut world = World::new();
    let a_hits = counter();
    let b_hits = counter();

    let mut a = ObjectLink::<u32>::new("hero");
    let sink = Rc::clone(&a_hits);
    a.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
    let first = registry.get_handler("hero").unwrap();

    a.release(&mut registry).unwrap();
    assert!(registry.is_postponed(first));
    assert!(registry.get_handler("hero").is_none());
    assert_eq!(registry.handler(first).map(LoadHandler::consumer_count), Some(0));

    let mut b = ObjectLink::<u32>::new("hero");
    let sink = Rc::clone(&b_hits);
    b.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
    let second = registry.get_handler("hero").unwrap();
    assert_ne!(first, second);
    assert_eq!(
        registry.handler(first).and_then(LoadHandler::operation),
        registry.handler(second).and_then(LoadHandler::operation)
    );

    registry.update(&mut world);
    assert_eq!(a_hits.get(), 0);
    assert_eq!(b_hits.get(), 1);
    assert!(!registry.is_postponed(first));
    assert!(registry.handler(first).is_none());

    b.release(&mut registry).unwrap();
    assert_eq!(registry.stats().postponed, 0);
    assert_eq!(registry.handler_pool().high_water_mark(), 2);
    assert_eq!(registry.handler_pool().spare, 2);

    let stats = registry.loader().stats();
    assert_eq!(stats.releases, 1);
    assert_eq!(stats.premature_releases, 0);
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_late_consumer_is_notified_synchronously() {
    let mut registry = registry();
    let mut world = World::new();
    let mut first = ObjectLink::<u32>::new("rock");
    first.load(&mut registry, |_| {}).unwrap();
    registry.update(&mut world);

    let seen = counter();
    let sink = Rc::clone(&seen);
    let mut late = ObjectLink::<u32>::new("rock");
    late.load(&mut registry, move |value| sink.set(*value)).unwrap();
    assert_eq!(seen.get(), 5);
    assert_eq!(registry.loader().stats().load_calls, 1);
}

#[test]
fn test_duplicate_load_is_rejected() {
    let mut registry = registry();
    let link = AssetLink::new("hero");
    let other = AssetLink::new("hero");
    let callback: Rc<ObjectCallback> = Rc::new(|_: &LoadedAsset| {});
    let fresh: Rc<ObjectCallback> = Rc::new(|_: &LoadedAsset| {});

    registry.load_object(&link, &callback).unwrap();
    assert!(matches!(
        registry.load_object(&link, &fresh),
        Err(UsageError::DuplicateLoad { .. })
    ));
    assert!(matches!(
        registry.load_object(&other, &callback),
        Err(UsageError::DuplicateLoad { .. })
    ));
    assert_eq!(registry.consumer_count("hero"), 1);
}

#[test]
fn test_release_errors_leave_state_unchanged() {
    let mut registry = registry();
    let link = AssetLink::new("hero");
    let stranger = AssetLink::new("hero");
    let callback: Rc<ObjectCallback> = Rc::new(|_: &LoadedAsset| {});

    assert!(matches!(
        registry.release_object(&link),
        Err(UsageError::NotLoaded { .. })
    ));

    let id = registry.load_object(&link, &callback).unwrap();
    assert!(matches!(
        registry.release_object(&stranger),
        Err(UsageError::NotRegistered { .. })
    ));

    let record = registry.handler(id).unwrap().records()[0].id();
    assert!(matches!(
        registry.release_instance(id, record),
        Err(UsageError::NotAnInstance { .. })
    ));
    assert!(matches!(
        registry.release_instance(id, RecordId(999)),
        Err(UsageError::UnknownRecord { .. })
    ));
    assert!(matches!(
        registry.release_instance(HandlerId(999), record),
        Err(UsageError::UnknownHandler(_))
    ));
    assert_eq!(registry.consumer_count("hero"), 1);
}

#[test]
fn test_assign_key_releases_old_registration() {
    let mut registry = registry();
    let mut world = World::new();
    let mut keep = ObjectLink::<u32>::new("hero");
    let mut link = ObjectLink::<u32>::new("hero");
    keep.load(&mut registry, |_| {}).unwrap();
    link.load(&mut registry, |_| {}).unwrap();
    registry.update(&mut world);
    assert_eq!(registry.consumer_count("hero"), 2);

    link.assign_key(&mut registry, "hero");
    assert_eq!(registry.consumer_count("hero"), 2);

    link.assign_key(&mut registry, "rock");
    assert_eq!(registry.consumer_count("hero"), 1);
    assert_eq!(link.key(), "rock");
    assert!(!link.is_loaded());

    link.load(&mut registry, |_| {}).unwrap();
    assert_eq!(registry.consumer_count("rock"), 1);
}

// ============================================================================
// Dangling consumers
// ============================================================================

#[test]
fn test_sweep_reclaims_dropped_links() {
    let mut registry = registry();
    let mut world = World::new();
    {
        let mut links: Vec<ObjectLink<u32>> = (0..3)
            .map(|_| ObjectLink::new("hero"))
            .chain((0..2).map(|_| ObjectLink::new("rock")))
            .collect();
        for link in &mut links {
            link.load(&mut registry, |_| {}).unwrap();
        }
        registry.update(&mut world);
    }
    assert_eq!(registry.consumer_count("hero"), 3);

    assert_eq!(registry.sweep_unused(true), 2);
    assert_eq!(registry.handler_pool(), PoolStats { live: 0, spare: 2 });
    assert_eq!(registry.record_pool().spare, 5);
    assert_eq!(registry.loader().stats().releases, 2);
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_link_dropped_before_completion_is_reclaimed() {
    let mut registry = registry();
    let mut world = World::new();
    let hits = counter();
    {
        let mut link = ObjectLink::<u32>::new("hero");
        let sink = Rc::clone(&hits);
        link.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
    }

    registry.update(&mut world);
    assert_eq!(hits.get(), 0);
    assert!(registry.get_handler("hero").is_none());
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_automatic_sweep_interval() {
    let config = RegistryConfig::default().with_sweep_interval(2, false);
    let mut registry = AssetRegistry::with_loader(catalog(), config);
    let mut world = World::new();

    let mut link = ObjectLink::<u32>::new("hero");
    link.load(&mut registry, |_| {}).unwrap();
    registry.update(&mut world);
    drop(link);

    assert!(registry.get_handler("hero").is_some());
    registry.update(&mut world);
    assert!(registry.get_handler("hero").is_none());
}

#[test]
fn test_sweep_postpones_handler_still_loading() {
    let mut registry = registry();
    let mut world = World::new();
    {
        let mut link = ObjectLink::<u32>::new("hero");
        link.load(&mut registry, |_| {}).unwrap();
    }
    let id = registry.get_handler("hero").unwrap();

    assert_eq!(registry.sweep_unused(true), 0);
    assert!(registry.is_postponed(id));
    assert!(registry.get_handler("hero").is_none());
    assert_eq!(registry.loader().stats().releases, 0);

    registry.update(&mut world);
    assert!(registry.handler(id).is_none());
    assert_eq!(registry.stats().postponed, 0);
    assert_eq!(registry.loader().stats().releases, 1);
    assert_eq!(registry.loader().stats().premature_releases, 0);
}

#[test]
fn test_sweep_reclaims_dropped_prefab_requests() {
    let mut registry = registry();
    let mut world = World::new();
    {
        let mut prefab = PrefabLink::new("crate");
        prefab.instantiate(&mut registry, SpawnParams::default(), |_| {}).unwrap();
    }

    assert_eq!(registry.sweep_unused(true), 0);
    assert_eq!(registry.stats().consumers, 0);

    registry.update(&mut world);
    registry.update(&mut world);
    assert_eq!(world.len(), 0);
    assert_eq!(registry.stats().instances, 0);
    assert!(registry.get_handler("crate").is_none());
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_sweep_discards_spawn_of_dropped_prefab() {
    let mut registry = registry();
    let mut world = World::new();
    let mut prefab = PrefabLink::new("crate");
    prefab.instantiate(&mut registry, SpawnParams::default(), |_| {}).unwrap();
    registry.update(&mut world);
    assert_eq!(registry.stats().pending_spawns, 1);

    drop(prefab);
    assert_eq!(registry.sweep_unused(true), 1);
    registry.update(&mut world);
    assert_eq!(world.len(), 0);
    assert_eq!(registry.stats().consumers, 0);
    assert_eq!(registry.stats().pending_spawns, 0);
}

#[test]
fn test_sweep_keeps_spawned_instances_of_dropped_prefab() {
    let mut registry = registry();
    let mut world = World::new();
    let spawned = Rc::new(Cell::new(None));
    {
        let mut prefab = PrefabLink::new("crate");
        let sink = Rc::clone(&spawned);
        prefab
            .instantiate(&mut registry, SpawnParams::default(), move |e| sink.set(Some(e)))
            .unwrap();
        registry.update(&mut world);
        registry.update(&mut world);
    }
    let entity = spawned.get().unwrap();

    assert_eq!(registry.sweep_unused(true), 0);
    assert_eq!(registry.consumer_count("crate"), 1);
    registry.destroy_instance(&mut world, entity).unwrap();
    assert!(registry.get_handler("crate").is_none());
}

// ============================================================================
// Instances
// ============================================================================

#[test]
fn test_destroying_instance_releases_once() {
    let mut registry = registry();
    let mut world = World::new();
    let spawned = Rc::new(RefCell::new(Vec::new()));

    let mut holder = ObjectLink::<Prefab>::new("crate");
    holder.load(&mut registry, |_| {}).unwrap();

    let mut prefab = PrefabLink::new("crate");
    for x in 0..2 {
        let sink = Rc::clone(&spawned);
        let params = SpawnParams::at(Vec3::new(x as f32, 0.0, 0.0));
        prefab
            .instantiate(&mut registry, params, move |entity| sink.borrow_mut().push(entity))
            .unwrap();
    }

    registry.update(&mut world);
    assert!(spawned.borrow().is_empty());
    registry.update(&mut world);
    assert_eq!(spawned.borrow().len(), 2);
    assert_eq!(registry.consumer_count("crate"), 3);

    let first = spawned.borrow()[0];
    let hook = *world.get::<&ReleaseOnDestroy>(first).unwrap();
    assert_eq!(registry.instance(first), Some((hook.handler, hook.record)));

    registry.destroy_instance(&mut world, first).unwrap();
    assert_eq!(registry.consumer_count("crate"), 2);
    assert!(matches!(
        registry.destroy_instance(&mut world, first),
        Err(UsageError::UnknownInstance(_))
    ));
    assert_eq!(registry.consumer_count("crate"), 2);

    let second = spawned.borrow()[1];
    world.despawn(second).unwrap();
    registry.update(&mut world);
    assert_eq!(registry.consumer_count("crate"), 1);
    registry.update(&mut world);
    assert_eq!(registry.consumer_count("crate"), 1);
}

#[test]
fn test_spawn_under_parent_is_local() {
    let mut registry = registry();
    let mut world = World::new();
    let parent = world.spawn((Transform::from_position_rotation(Vec3::Y, glam::Quat::IDENTITY),));
    let spawned = Rc::new(Cell::new(None));

    let mut prefab = PrefabLink::new("crate");
    let sink = Rc::clone(&spawned);
    prefab
        .instantiate(
            &mut registry,
            SpawnParams::at(Vec3::new(0.0, 3.0, 0.0)).with_parent(parent),
            move |entity| sink.set(Some(entity)),
        )
        .unwrap();
    registry.update(&mut world);
    registry.update(&mut world);

    let entity = spawned.get().unwrap();
    let transform = *world.get::<&Transform>(entity).unwrap();
    assert!((transform.position - Vec3::new(0.0, 2.0, 0.0)).length() < 0.001);
}

#[test]
fn test_parent_destroyed_before_spawn_step() {
    let mut registry = registry();
    let mut world = World::new();
    let parent = world.spawn((Transform::default(),));
    let hits = counter();

    let mut prefab = PrefabLink::new("crate");
    let sink = Rc::clone(&hits);
    prefab
        .instantiate(&mut registry, SpawnParams::default().with_parent(parent), move |_| {
            sink.set(sink.get() + 1);
        })
        .unwrap();

    registry.update(&mut world);
    assert_eq!(registry.stats().pending_spawns, 1);

    world.despawn(parent).unwrap();
    registry.update(&mut world);

    assert_eq!(hits.get(), 0);
    assert_eq!(world.len(), 0);
    assert_eq!(registry.pending_dangling(), 0);
    assert!(registry.get_handler("crate").is_none());
    assert_eq!(registry.loader().stats().releases, 1);
}

#[test]
fn test_parent_destroyed_before_load_completes() {
    let mut registry = registry();
    let mut world = World::new();
    let parent = world.spawn((Transform::default(),));
    let hits = counter();

    let mut prefab = PrefabLink::new("crate");
    let sink = Rc::clone(&hits);
    prefab
        .instantiate(&mut registry, SpawnParams::default().with_parent(parent), move |_| {
            sink.set(sink.get() + 1);
        })
        .unwrap();
    world.despawn(parent).unwrap();

    registry.update(&mut world);
    assert_eq!(registry.stats().pending_spawns, 0);
    assert!(registry.get_handler("crate").is_none());
    registry.update(&mut world);
    assert_eq!(hits.get(), 0);
}

#[test]
fn test_parent_destroyed_during_spawn_destroys_partial_instance() {
    let mut registry =
        AssetRegistry::new(catalog(), OrphanSpawner::default(), RegistryConfig::default());
    let mut world = World::new();
    let parent = world.spawn((Transform::default(),));
    let hits = counter();

    let link = AssetLink::new("crate");
    let sink = Rc::clone(&hits);
    let callback: Rc<InstanceCallback> = Rc::new(move |_: Entity| sink.set(sink.get() + 1));
    registry
        .instantiate(&link, &callback, SpawnParams::default().with_parent(parent))
        .unwrap();

    registry.update(&mut world);
    world.despawn(parent).unwrap();
    registry.update(&mut world);

    assert_eq!(hits.get(), 0);
    assert_eq!(world.len(), 0);
    assert_eq!(registry.stats().instances, 0);
    assert!(registry.get_handler("crate").is_none());
}

#[test]
fn test_non_prefab_spawn_goes_to_reconciler() {
    let mut registry = registry();
    let mut world = World::new();
    let hits = counter();

    let mut prefab = PrefabLink::new("hero");
    let sink = Rc::clone(&hits);
    prefab
        .instantiate(&mut registry, SpawnParams::default(), move |_| sink.set(sink.get() + 1))
        .unwrap();

    registry.update(&mut world);
    assert_eq!(registry.consumer_count("hero"), 1);
    registry.update(&mut world);

    assert_eq!(hits.get(), 0);
    assert!(registry.get_handler("hero").is_none());
    assert_eq!(registry.record_pool().live, 0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failed_load_drops_callbacks() {
    let mut registry = registry();
    let mut world = World::new();
    let hits = counter();

    let mut link = ObjectLink::<u32>::new("broken");
    let sink = Rc::clone(&hits);
    link.load(&mut registry, move |_| sink.set(sink.get() + 1)).unwrap();
    let mut prefab = PrefabLink::new("broken");
    prefab.instantiate(&mut registry, SpawnParams::default(), |_| {}).unwrap();

    registry.update(&mut world);
    assert_eq!(hits.get(), 0);
    assert_eq!(registry.consumer_count("broken"), 1);

    let id = registry.get_handler("broken").unwrap();
    assert!(matches!(
        registry.handler(id).and_then(LoadHandler::load_error),
        Some(LoadError::Failed { .. })
    ));
    assert!(link.get(&registry).is_none());

    link.release(&mut registry).unwrap();
    assert!(registry.get_handler("broken").is_none());
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_failed_load_without_consumers_is_released() {
    let mut registry = registry();
    let mut world = World::new();
    let mut link = ObjectLink::<u32>::new("broken");
    link.load(&mut registry, |_| {}).unwrap();
    link.release(&mut registry).unwrap();
    assert_eq!(registry.stats().postponed, 1);

    registry.update(&mut world);
    assert_eq!(registry.stats().postponed, 0);
    assert_eq!(registry.loader().stats().releases, 1);
    assert_eq!(registry.handler_pool().live, 0);
}

#[test]
fn test_instantiate_after_failure_goes_to_reconciler() {
    let mut registry = registry();
    let mut world = World::new();
    let mut link = ObjectLink::<u32>::new("broken");
    link.load(&mut registry, |_| {}).unwrap();
    registry.update(&mut world);
    assert_eq!(registry.consumer_count("broken"), 1);

    let hits = counter();
    let sink = Rc::clone(&hits);
    let mut prefab = PrefabLink::new("broken");
    prefab
        .instantiate(&mut registry, SpawnParams::default(), move |_| sink.set(sink.get() + 1))
        .unwrap();
    assert_eq!(registry.consumer_count("broken"), 2);
    assert_eq!(registry.pending_dangling(), 1);
    assert_eq!(registry.stats().pending_spawns, 0);

    registry.update(&mut world);
    assert_eq!(hits.get(), 0);
    assert_eq!(registry.pending_dangling(), 0);
    assert_eq!(registry.consumer_count("broken"), 1);
    assert_eq!(registry.loader().stats().object_operations, 1);
}

// ============================================================================
// Scenes
// ============================================================================

#[test]
fn test_scene_by_key_lifecycle() {
    let mut registry = registry();
    let mut world = World::new();
    let loaded = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&loaded);
    let on_loaded: Rc<SceneCallback> =
        Rc::new(move |scene: &SceneInstance| *sink.borrow_mut() = Some(scene.clone()));

    registry
        .load_scene_by_key("level", &on_loaded, LoadSceneMode::Single, true)
        .unwrap();
    assert!(matches!(
        registry.load_scene_by_key("level", &on_loaded, LoadSceneMode::Single, true),
        Err(UsageError::DuplicateScene { .. })
    ));

    registry.update(&mut world);
    assert_eq!(loaded.borrow().as_ref().map(|s| s.key.as_str()), Some("level"));
    assert!(registry.scene("level").is_some());

    let object = AssetLink::new("level");
    let callback: Rc<ObjectCallback> = Rc::new(|_: &LoadedAsset| {});
    assert!(matches!(
        registry.load_object(&object, &callback),
        Err(UsageError::KindMismatch { .. })
    ));

    let unloaded = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&unloaded);
    let on_unloaded: UnloadCallback = Box::new(move |key: &str| sink.borrow_mut().push_str(key));
    registry.unload_scene_by_key("level", Some(on_unloaded)).unwrap();
    assert!(registry.get_handler("level").is_none());
    assert!(unloaded.borrow().is_empty());

    registry.update(&mut world);
    assert_eq!(*unloaded.borrow(), "level");
    assert_eq!(registry.loader().live_operations(), 0);
}

#[test]
fn test_scene_unloaded_while_loading_waits_for_completion() {
    let mut registry = registry();
    let mut world = World::new();
    let unloaded = Rc::new(Cell::new(false));

    let mut link = SceneLink::new("level");
    link.load(&mut registry, LoadSceneMode::Additive, false, |_| {}).unwrap();
    let sink = Rc::clone(&unloaded);
    link.unload(&mut registry, Some(Box::new(move |_: &str| sink.set(true))))
        .unwrap();
    assert_eq!(registry.stats().postponed, 1);
    assert_eq!(registry.loader().stats().scene_unloads, 0);

    registry.update(&mut world);
    assert_eq!(registry.stats().postponed, 0);
    assert_eq!(registry.loader().stats().scene_unloads, 1);
    assert_eq!(registry.loader().stats().premature_releases, 0);

    registry.update(&mut world);
    assert!(unloaded.get());
}

// ============================================================================
// Diagnostics and teardown
// ============================================================================

#[test]
fn test_capture_site_is_recorded() {
    let config = RegistryConfig::default().with_traces(true);
    let mut registry = AssetRegistry::with_loader(catalog(), config);
    let link = AssetLink::new("hero");
    let callback: Rc<ObjectCallback> = Rc::new(|_: &LoadedAsset| {});

    let id = registry.load_object(&link, &callback).unwrap();
    let trace = registry.handler(id).unwrap().records()[0].trace().unwrap();
    assert_eq!(trace.file(), file!());

    let quiet = RegistryConfig::default().with_traces(false);
    let mut registry = AssetRegistry::with_loader(catalog(), quiet);
    let id = registry.load_object(&link, &callback).unwrap();
    assert!(registry.handler(id).unwrap().records()[0].trace().is_none());
}

#[test]
fn test_resolve_path_forwards_to_loader() {
    let mut loader = catalog();
    loader.set_path("hero", "characters/hero.prefab");
    let registry = AssetRegistry::with_loader(loader, RegistryConfig::default());

    assert_eq!(
        registry.resolve_path("hero"),
        Some(PathBuf::from("characters/hero.prefab"))
    );
    assert_eq!(registry.resolve_path("rock"), None);
}

#[test]
fn test_shutdown_releases_everything() {
    let mut registry = registry();
    let mut world = World::new();
    let mut hero = ObjectLink::<u32>::new("hero");
    hero.load(&mut registry, |_| {}).unwrap();
    registry.update(&mut world);

    let mut rock = ObjectLink::<u32>::new("rock");
    rock.load(&mut registry, |_| {}).unwrap();
    let mut scene = SceneLink::new("level");
    scene.load(&mut registry, LoadSceneMode::Single, true, |_| {}).unwrap();

    let summary = registry.stats().to_string();
    assert!(summary.starts_with("3 active"));

    registry.shutdown();
    let stats = registry.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.consumers, 0);
    assert_eq!(stats.handler_pool, PoolStats::default());
    assert_eq!(stats.record_pool, PoolStats::default());
    assert_eq!(registry.loader().stats().releases, 2);
    assert_eq!(registry.loader().stats().scene_unloads, 1);
}
