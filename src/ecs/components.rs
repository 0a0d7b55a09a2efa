//! Components attached to spawned asset instances

use glam::{Quat, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::registry::{HandlerId, RecordId};

/// Transform component for position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position relative to the parent (or the world when unparented)
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Express a world-space pose relative to this transform
    pub fn to_local(&self, position: Vec3, rotation: Quat) -> Self {
        let inverse = self.rotation.inverse();
        Self {
            position: inverse * (position - self.position) / self.scale,
            rotation: inverse * rotation,
            scale: Vec3::ONE,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Parent component - indicates this entity has a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

impl Parent {
    /// Get the parent entity
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.0
    }
}

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Destruction hook binding a spawned instance to the consumer slot it holds.
///
/// Destroying the entity through [`AssetRegistry::destroy_instance`], or
/// despawning it directly, releases that slot exactly once.
///
/// [`AssetRegistry::destroy_instance`]: crate::registry::AssetRegistry::destroy_instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOnDestroy {
    /// Handler owning the instance's asset
    pub handler: HandlerId,
    /// Consumer record reserved by the instantiate request
    pub record: RecordId,
}
