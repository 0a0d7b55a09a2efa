//! Headless demo driving an asset registry over a few ticks

use std::cell::RefCell;
use std::rc::Rc;

use assetlink::prelude::*;
use assetlink::registry::UnloadCallback;

/// Demo object resource
#[derive(Debug)]
struct Sword {
    damage: u32,
}

fn catalog() -> MemoryLoader {
    let mut loader = MemoryLoader::with_latency(2);
    loader
        .insert("items/sword", Sword { damage: 12 })
        .set_path("items/sword", "assets/items/sword.ron")
        .insert("props/crate", Prefab::new("Crate"))
        .insert_scene("levels/arena")
        .insert_broken("items/cursed", "missing bundle");
    loader
}

fn load_config() -> RegistryConfig {
    let Some(path) = std::env::args().nth(1) else {
        return RegistryConfig::default();
    };
    match RegistryConfig::load_ron(&path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config '{}': {}", path, e);
            RegistryConfig::default()
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut registry = AssetRegistry::with_loader(catalog(), load_config());
    let mut world = World::new();
    let spawned: Rc<RefCell<Vec<Entity>>> = Rc::default();

    let mut sword = ObjectLink::<Sword>::new("items/sword");
    let mut spare = ObjectLink::<Sword>::new("items/sword");
    let mut cursed = ObjectLink::<Sword>::new("items/cursed");
    let mut crates = PrefabLink::new("props/crate");
    let mut arena = SceneLink::new("levels/arena");

    log::info!(
        "'items/sword' resolves to {:?}",
        registry.resolve_path("items/sword")
    );

    for tick in 0..8 {
        match tick {
            0 => {
                let loads = [
                    sword.load(&mut registry, |s| log::info!("Sword ready ({} damage)", s.damage)),
                    spare.load(&mut registry, |_| log::info!("Spare sword ready")),
                    cursed.load(&mut registry, |_| log::info!("Cursed sword ready")),
                    arena.load(&mut registry, LoadSceneMode::Single, true, |scene| {
                        log::info!("Scene '{}' loaded as #{}", scene.key, scene.id);
                    }),
                ];
                for result in loads {
                    if let Err(e) = result {
                        log::error!("Request failed: {}", e);
                    }
                }

                for x in 0..3 {
                    let sink = Rc::clone(&spawned);
                    let params = SpawnParams::at(Vec3::new(x as f32 * 2.0, 0.0, 0.0));
                    if let Err(e) = crates.instantiate(&mut registry, params, move |entity| {
                        sink.borrow_mut().push(entity);
                    }) {
                        log::error!("Instantiate failed: {}", e);
                    }
                }
            }
            3 => {
                if let Err(e) = spare.release(&mut registry) {
                    log::error!("Release failed: {}", e);
                }
                let first = spawned.borrow().first().copied();
                if let Some(entity) = first
                    && let Err(e) = registry.destroy_instance(&mut world, entity)
                {
                    log::error!("Destroy failed: {}", e);
                }
            }
            5 => {
                cursed.reset(&mut registry);
                let unloaded: UnloadCallback =
                    Box::new(|key: &str| log::info!("Scene '{}' unloaded", key));
                if let Err(e) = arena.unload(&mut registry, Some(unloaded)) {
                    log::error!("Unload failed: {}", e);
                }
            }
            _ => {}
        }

        registry.update(&mut world);
        log::info!("Tick {}: {}", registry.tick(), registry.stats());
    }

    log::info!("{} crates in the world", spawned.borrow().len());
    drop(sword);
    registry.sweep_unused(true);
    registry.shutdown();
    log::info!("Loader: {:?}", registry.loader().stats());
}
