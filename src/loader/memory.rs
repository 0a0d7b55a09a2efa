//! In-process content catalog
//!
//! `MemoryLoader` serves resources registered up front, completing each
//! operation after a fixed number of polls. Loads of a key that is still
//! referenced join the existing operation and bump its reference count, so
//! it behaves like a real loader's own accounting. Counters make premature
//! or unbalanced releases observable.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::{
    Completion, ContentLoader, LoadError, LoadSceneMode, LoadedAsset, OperationId, SceneInstance,
};

/// A registered catalog entry
#[derive(Debug, Clone)]
enum Entry {
    Object(LoadedAsset),
    Scene,
    Broken(String),
}

#[derive(Debug, Clone)]
struct CatalogItem {
    entry: Entry,
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Object,
    Scene {
        mode: LoadSceneMode,
        activate: bool,
    },
    Unload,
}

#[derive(Debug)]
struct Operation {
    key: String,
    kind: OpKind,
    /// Polls left before completion (0 once done)
    ticks_left: u32,
    /// Outstanding references held by callers
    refs: u32,
}

impl Operation {
    fn is_done(&self) -> bool {
        self.ticks_left == 0
    }
}

/// Accounting counters exposed for assertions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryLoaderStats {
    /// Calls to `load_by_key`
    pub load_calls: usize,
    /// Distinct object operations started
    pub object_operations: usize,
    /// Scene loads started
    pub scene_loads: usize,
    /// Object operations whose last reference was released
    pub releases: usize,
    /// Scene unloads started
    pub scene_unloads: usize,
    /// Releases or unloads issued before their operation completed
    pub premature_releases: usize,
    /// Releases or unloads of unknown or already-released operations
    pub invalid_releases: usize,
}

/// An in-memory [`ContentLoader`]
#[derive(Debug)]
pub struct MemoryLoader {
    catalog: FxHashMap<String, CatalogItem>,
    /// Ordered so completions are emitted deterministically
    operations: BTreeMap<OperationId, Operation>,
    /// Live object operation per key
    by_key: FxHashMap<String, OperationId>,
    /// Completions owed to callers that joined an already finished operation
    redelivery: Vec<OperationId>,
    latency: u32,
    next_op: u64,
    next_scene: u64,
    stats: MemoryLoaderStats,
}

impl MemoryLoader {
    /// Create an empty catalog whose operations complete on the first poll
    #[must_use]
    pub fn new() -> Self {
        Self::with_latency(1)
    }

    /// Create an empty catalog whose operations complete after `polls` polls
    #[must_use]
    pub fn with_latency(polls: u32) -> Self {
        Self {
            catalog: FxHashMap::default(),
            operations: BTreeMap::new(),
            by_key: FxHashMap::default(),
            redelivery: Vec::new(),
            latency: polls.max(1),
            next_op: 1,
            next_scene: 1,
            stats: MemoryLoaderStats::default(),
        }
    }

    /// Register an object resource
    pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T) -> &mut Self {
        self.insert_item(key.into(), Entry::Object(LoadedAsset::new(value)))
    }

    /// Register a scene
    pub fn insert_scene(&mut self, key: impl Into<String>) -> &mut Self {
        self.insert_item(key.into(), Entry::Scene)
    }

    /// Register a key whose loads always fail
    pub fn insert_broken(
        &mut self,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.insert_item(key.into(), Entry::Broken(reason.into()))
    }

    /// Attach a source path to an already registered key
    pub fn set_path(&mut self, key: &str, path: impl Into<PathBuf>) -> &mut Self {
        if let Some(item) = self.catalog.get_mut(key) {
            item.path = Some(path.into());
        }
        self
    }

    fn insert_item(&mut self, key: String, entry: Entry) -> &mut Self {
        self.catalog.insert(key, CatalogItem { entry, path: None });
        self
    }

    /// Accounting counters
    #[must_use]
    pub const fn stats(&self) -> MemoryLoaderStats {
        self.stats
    }

    /// Operations still referenced or in flight
    #[must_use]
    pub fn live_operations(&self) -> usize {
        self.operations.len()
    }

    /// Reference count of an operation (0 if unknown)
    #[must_use]
    pub fn ref_count(&self, op: OperationId) -> u32 {
        self.operations.get(&op).map_or(0, |o| o.refs)
    }

    fn start(&mut self, key: &str, kind: OpKind) -> OperationId {
        let op = OperationId(self.next_op);
        self.next_op += 1;
        self.operations.insert(
            op,
            Operation {
                key: key.to_string(),
                kind,
                ticks_left: self.latency,
                refs: 1,
            },
        );
        op
    }

    fn object_result(&self, key: &str) -> Result<LoadedAsset, LoadError> {
        match self.catalog.get(key).map(|item| &item.entry) {
            Some(Entry::Object(asset)) => Ok(asset.clone()),
            Some(Entry::Broken(reason)) => Err(LoadError::Failed {
                key: key.to_string(),
                reason: reason.clone(),
            }),
            Some(Entry::Scene) => Err(LoadError::Failed {
                key: key.to_string(),
                reason: "key names a scene".to_string(),
            }),
            None => Err(LoadError::InvalidKey(key.to_string())),
        }
    }

    fn scene_result(
        &mut self,
        key: &str,
        mode: LoadSceneMode,
        activate: bool,
    ) -> Result<SceneInstance, LoadError> {
        match self.catalog.get(key).map(|item| &item.entry) {
            Some(Entry::Scene) => {
                let id = self.next_scene;
                self.next_scene += 1;
                Ok(SceneInstance {
                    key: key.to_string(),
                    id,
                    mode,
                    activated: activate,
                })
            }
            Some(Entry::Broken(reason)) => Err(LoadError::Failed {
                key: key.to_string(),
                reason: reason.clone(),
            }),
            Some(Entry::Object(_)) => Err(LoadError::Failed {
                key: key.to_string(),
                reason: "key names an object".to_string(),
            }),
            None => Err(LoadError::InvalidKey(key.to_string())),
        }
    }

    fn completion_for(&mut self, op: OperationId, key: &str, kind: OpKind) -> Completion {
        match kind {
            OpKind::Object => Completion::Object {
                op,
                result: self.object_result(key),
            },
            OpKind::Scene { mode, activate } => Completion::Scene {
                op,
                result: self.scene_result(key, mode, activate),
            },
            OpKind::Unload => Completion::SceneUnloaded { op, result: Ok(()) },
        }
    }
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentLoader for MemoryLoader {
    fn load_by_key(&mut self, key: &str) -> OperationId {
        self.stats.load_calls += 1;

        if let Some(&op) = self.by_key.get(key)
            && let Some(operation) = self.operations.get_mut(&op)
        {
            operation.refs += 1;
            if operation.is_done() {
                self.redelivery.push(op);
            }
            return op;
        }

        self.stats.object_operations += 1;
        let op = self.start(key, OpKind::Object);
        self.by_key.insert(key.to_string(), op);
        op
    }

    fn load_scene_by_key(
        &mut self,
        key: &str,
        mode: LoadSceneMode,
        activate: bool,
    ) -> OperationId {
        self.stats.scene_loads += 1;
        self.start(key, OpKind::Scene { mode, activate })
    }

    fn release(&mut self, op: OperationId) {
        let Some(operation) = self.operations.get_mut(&op) else {
            log::error!("Release of unknown operation {:?}", op);
            self.stats.invalid_releases += 1;
            return;
        };

        if operation.kind != OpKind::Object {
            log::error!("Release of non-object operation {:?} ('{}')", op, operation.key);
            self.stats.invalid_releases += 1;
            return;
        }

        if !operation.is_done() {
            log::warn!("Operation {:?} ('{}') released before completion", op, operation.key);
            self.stats.premature_releases += 1;
        }

        operation.refs -= 1;
        if operation.refs == 0 {
            let key = operation.key.clone();
            self.operations.remove(&op);
            if self.by_key.get(&key) == Some(&op) {
                self.by_key.remove(&key);
            }
            self.stats.releases += 1;
        }
    }

    fn unload_scene(&mut self, op: OperationId) -> OperationId {
        let scene = self.operations.remove(&op);
        match &scene {
            Some(operation) if matches!(operation.kind, OpKind::Scene { .. }) => {
                if !operation.is_done() {
                    self.stats.premature_releases += 1;
                }
            }
            Some(operation) => {
                log::error!("Unload of non-scene operation {:?} ('{}')", op, operation.key);
                self.stats.invalid_releases += 1;
            }
            None => {
                log::error!("Unload of unknown scene operation {:?}", op);
                self.stats.invalid_releases += 1;
            }
        }

        self.stats.scene_unloads += 1;
        let key = scene.map(|s| s.key).unwrap_or_default();
        self.start(&key, OpKind::Unload)
    }

    fn resolve_path(&self, key: &str) -> Option<PathBuf> {
        self.catalog.get(key).and_then(|item| item.path.clone())
    }

    fn poll_completions(&mut self, out: &mut Vec<Completion>) {
        let mut ready = Vec::new();
        for (&op, operation) in self.operations.iter_mut() {
            if operation.ticks_left > 0 {
                operation.ticks_left -= 1;
                if operation.ticks_left == 0 {
                    ready.push((op, operation.key.clone(), operation.kind));
                }
            }
        }

        for op in std::mem::take(&mut self.redelivery) {
            if let Some(operation) = self.operations.get(&op) {
                ready.push((op, operation.key.clone(), operation.kind));
            }
        }

        for (op, key, kind) in ready {
            let completion = self.completion_for(op, &key, kind);
            if kind == OpKind::Unload {
                self.operations.remove(&op);
            }
            out.push(completion);
        }
    }
}
