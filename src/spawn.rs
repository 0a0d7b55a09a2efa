//! Asynchronous spawn primitive
//!
//! Instantiate requests turn a loaded template into entities in the host's
//! `hecs::World`. Spawning is always deferred: a request made during one
//! tick is fulfilled by the spawner's next poll.

use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::ecs::{Name, Parent, Transform};
use crate::loader::LoadedAsset;

/// Placement of a spawned instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnParams {
    /// Spawn position
    pub position: Vec3,
    /// Spawn rotation
    pub rotation: Quat,
    /// Parent to attach the instance to, observed without ownership
    pub parent: Option<Entity>,
    /// Whether `position`/`rotation` are world-space (otherwise parent-local)
    pub world_space: bool,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            parent: None,
            world_space: true,
        }
    }
}

impl SpawnParams {
    /// Spawn at a world-space position
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set the spawn rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Attach the instance to a parent
    pub fn with_parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Treat position and rotation as parent-local
    pub fn local(mut self) -> Self {
        self.world_space = false;
        self
    }
}

/// Ticket identifying one outstanding spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpawnTicket(pub u64);

/// Result of one spawn; empty `objects` means the spawn failed
#[derive(Debug, Clone)]
pub struct SpawnCompletion {
    pub ticket: SpawnTicket,
    pub objects: Vec<Entity>,
}

/// The spawn primitive consumed by the registry
pub trait Spawner {
    /// Queue a spawn of `template`
    fn spawn_async(&mut self, template: &LoadedAsset, params: &SpawnParams) -> SpawnTicket;

    /// Fulfil queued spawns, moving their results into `out`
    fn poll_completions(&mut self, world: &mut World, out: &mut Vec<SpawnCompletion>);
}

/// Template understood by [`DeferredSpawner`]
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    /// Base name; instances are named `"<name> (Clone)"`
    pub name: String,
    /// Scale applied to every instance
    pub scale: Vec3,
}

impl Prefab {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: Vec3::ONE,
        }
    }
}

struct PendingSpawn {
    ticket: SpawnTicket,
    template: LoadedAsset,
    params: SpawnParams,
}

/// Spawner that builds [`Prefab`] instances on its next poll.
///
/// A spawn fails (empty result) when the template is not a `Prefab` or the
/// requested parent no longer exists at poll time.
#[derive(Default)]
pub struct DeferredSpawner {
    queue: Vec<PendingSpawn>,
    next_ticket: u64,
}

impl DeferredSpawner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns waiting for the next poll
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn build(world: &mut World, template: &LoadedAsset, params: &SpawnParams) -> Option<Entity> {
        let Some(prefab) = template.downcast_ref::<Prefab>() else {
            log::warn!("Spawn template is not a prefab");
            return None;
        };

        let mut transform = Transform::from_position_rotation(params.position, params.rotation);
        transform.scale = prefab.scale;
        let name = Name::new(format!("{} (Clone)", prefab.name));

        let Some(parent) = params.parent else {
            return Some(world.spawn((transform, name)));
        };

        if !world.contains(parent) {
            log::warn!("Spawn parent {:?} no longer exists", parent);
            return None;
        }

        if params.world_space
            && let Ok(parent_transform) = world.get::<&Transform>(parent)
        {
            let scale = transform.scale;
            transform = parent_transform.to_local(params.position, params.rotation);
            transform.scale = scale;
        }

        Some(world.spawn((transform, name, Parent(parent))))
    }
}

impl Spawner for DeferredSpawner {
    fn spawn_async(&mut self, template: &LoadedAsset, params: &SpawnParams) -> SpawnTicket {
        self.next_ticket += 1;
        let ticket = SpawnTicket(self.next_ticket);
        self.queue.push(PendingSpawn {
            ticket,
            template: template.clone(),
            params: *params,
        });
        ticket
    }

    fn poll_completions(&mut self, world: &mut World, out: &mut Vec<SpawnCompletion>) {
        for pending in self.queue.drain(..) {
            let objects = Self::build(world, &pending.template, &pending.params)
                .into_iter()
                .collect();
            out.push(SpawnCompletion {
                ticket: pending.ticket,
                objects,
            });
        }
    }
}
