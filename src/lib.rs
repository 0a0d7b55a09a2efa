//! Reference-counted asynchronous asset links
//!
//! This crate provides:
//! - Deduplicated, reference-counted loads on top of an external content loader
//! - Postponed release of handlers whose consumers left before the load finished
//! - Reclamation of consumers dropped without releasing
//! - Instance spawning into a `hecs` world with a release-on-destroy hook
//! - Object, prefab and scene links for application code

pub mod core;
pub mod ecs;
pub mod link;
pub mod loader;
pub mod registry;
pub mod spawn;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{Pool, PoolStats, RegistryConfig};
    pub use crate::ecs::{Name, Parent, ReleaseOnDestroy, Transform};
    pub use crate::link::{AssetLink, AssetReference, ObjectLink, PrefabLink, SceneLink};
    pub use crate::loader::{
        Completion, ContentLoader, LoadError, LoadSceneMode, LoadedAsset, MemoryLoader,
        OperationId, SceneInstance,
    };
    pub use crate::registry::{AssetRegistry, HandlerId, RecordId, RegistryStats, UsageError};
    pub use crate::spawn::{DeferredSpawner, Prefab, SpawnParams, Spawner};
    pub use glam::{Quat, Vec3};
    pub use hecs::{Entity, World};
}
