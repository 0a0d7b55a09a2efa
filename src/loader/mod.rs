//! External content loader contract
//!
//! The registry never fetches anything itself. It submits load-by-key and
//! release requests to a [`ContentLoader`] and drains the loader's
//! completion events once per tick.

mod memory;

pub use memory::{MemoryLoader, MemoryLoaderStats};

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Identifier of one underlying loader operation.
///
/// A loader may return the same id for repeated loads of one key while the
/// operation is still referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub u64);

/// A loaded, type-erased resource.
#[derive(Clone)]
pub struct LoadedAsset {
    value: Rc<dyn Any>,
}

impl LoadedAsset {
    /// Wrap a resource value
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Rc::new(value),
        }
    }

    /// Borrow the resource as `T`
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Get a shared handle to the resource as `T`
    #[must_use]
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.value).downcast::<T>().ok()
    }

    /// Check if two values refer to the same loaded resource
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("refs", &Rc::strong_count(&self.value))
            .finish()
    }
}

/// How a loaded scene joins the running application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadSceneMode {
    /// Replace every loaded scene
    #[default]
    Single,
    /// Load alongside the current scenes
    Additive,
}

/// A scene produced by the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneInstance {
    /// Key the scene was loaded from
    pub key: String,
    /// Loader-assigned scene id
    pub id: u64,
    /// Mode the scene was loaded with
    pub mode: LoadSceneMode,
    /// Whether the scene was activated on load
    pub activated: bool,
}

/// Failure reported by the loader for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The key does not name a loadable resource
    InvalidKey(String),
    /// The resource exists but could not be produced
    Failed {
        /// Key of the failed resource
        key: String,
        /// Loader-provided reason
        reason: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid key '{key}'"),
            Self::Failed { key, reason } => write!(f, "loading '{key}' failed: {reason}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Completion event delivered by [`ContentLoader::poll_completions`]
#[derive(Debug, Clone)]
pub enum Completion {
    /// An object load finished
    Object {
        op: OperationId,
        result: Result<LoadedAsset, LoadError>,
    },
    /// A scene load finished
    Scene {
        op: OperationId,
        result: Result<SceneInstance, LoadError>,
    },
    /// A scene unload finished
    SceneUnloaded {
        op: OperationId,
        result: Result<(), LoadError>,
    },
}

/// The narrow contract consumed from the asynchronous content system.
pub trait ContentLoader {
    /// Start (or join) the load of an object
    fn load_by_key(&mut self, key: &str) -> OperationId;

    /// Start a scene load
    fn load_scene_by_key(&mut self, key: &str, mode: LoadSceneMode, activate: bool)
    -> OperationId;

    /// Drop one reference to an object operation
    fn release(&mut self, op: OperationId);

    /// Unload a loaded scene, returning the unload operation
    fn unload_scene(&mut self, op: OperationId) -> OperationId;

    /// Resolve a key to its source path, for tooling
    fn resolve_path(&self, key: &str) -> Option<PathBuf>;

    /// Move every completion that became ready since the last call into `out`
    fn poll_completions(&mut self, out: &mut Vec<Completion>);
}
