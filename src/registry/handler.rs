//! Per-key load handler
//!
//! A handler owns at most one loader operation for its key and the ordered
//! list of consumers waiting on it. It never decides its own retirement:
//! the registry asks [`LoadHandler::is_unused`] and pools it.

use std::rc::Weak;

use hecs::Entity;

use crate::core::Pool;
use crate::link::WeakLink;
use crate::loader::{
    ContentLoader, LoadError, LoadSceneMode, LoadedAsset, OperationId, SceneInstance,
};

use super::record::{ConsumerRecord, ObjectCallback, RecordId};

/// Identity of one handler lifetime; never reused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

/// Invoked with the key once a scene unload completes
pub type UnloadCallback = Box<dyn FnOnce(&str)>;

/// Progress of a loader operation
#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Pending,
    Done(Result<T, LoadError>),
}

impl<T> LoadState<T> {
    fn value(&self) -> Option<&T> {
        match self {
            Self::Done(Ok(value)) => Some(value),
            _ => None,
        }
    }

    fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Done(Err(error)) => Some(error),
            _ => None,
        }
    }
}

/// Which load variant a handler manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Object,
    Scene,
}

impl HandlerKind {
    pub(crate) const fn describe(self) -> &'static str {
        match self {
            Self::Object => "an object",
            Self::Scene => "a scene",
        }
    }
}

#[derive(Debug, Default)]
enum HandlerOperation {
    #[default]
    Idle,
    Object {
        op: OperationId,
        state: LoadState<LoadedAsset>,
    },
    Scene {
        op: OperationId,
        state: LoadState<SceneInstance>,
    },
}

/// Owner of one key's loader operation and its consumers
#[derive(Default)]
pub struct LoadHandler {
    id: HandlerId,
    key: String,
    operation: HandlerOperation,
    records: Vec<ConsumerRecord>,
    on_unloaded: Option<UnloadCallback>,
}

impl LoadHandler {
    pub(crate) fn begin(&mut self, id: HandlerId, key: &str) {
        self.id = id;
        self.key.clear();
        self.key.push_str(key);
    }

    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load variant, once an operation was started
    #[must_use]
    pub fn kind(&self) -> Option<HandlerKind> {
        match self.operation {
            HandlerOperation::Idle => None,
            HandlerOperation::Object { .. } => Some(HandlerKind::Object),
            HandlerOperation::Scene { .. } => Some(HandlerKind::Scene),
        }
    }

    /// Loader operation held by this handler
    #[must_use]
    pub fn operation(&self) -> Option<OperationId> {
        match self.operation {
            HandlerOperation::Idle => None,
            HandlerOperation::Object { op, .. } | HandlerOperation::Scene { op, .. } => Some(op),
        }
    }

    /// Operation started and not completed yet
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(
            self.operation,
            HandlerOperation::Object { state: LoadState::Pending, .. }
                | HandlerOperation::Scene { state: LoadState::Pending, .. }
        )
    }

    /// Operation completed, successfully or not
    #[must_use]
    pub fn is_done(&self) -> bool {
        match &self.operation {
            HandlerOperation::Idle => false,
            HandlerOperation::Object { state, .. } => matches!(state, LoadState::Done(_)),
            HandlerOperation::Scene { state, .. } => matches!(state, LoadState::Done(_)),
        }
    }

    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.records.len()
    }

    /// Registered consumers in registration order
    #[must_use]
    pub fn records(&self) -> &[ConsumerRecord] {
        &self.records
    }

    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<&ConsumerRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Loaded object, if the object load succeeded
    #[must_use]
    pub fn asset(&self) -> Option<&LoadedAsset> {
        match &self.operation {
            HandlerOperation::Object { state, .. } => state.value(),
            _ => None,
        }
    }

    /// Loaded scene, if the scene load succeeded
    #[must_use]
    pub fn scene(&self) -> Option<&SceneInstance> {
        match &self.operation {
            HandlerOperation::Scene { state, .. } => state.value(),
            _ => None,
        }
    }

    /// Failure of the completed operation
    #[must_use]
    pub fn load_error(&self) -> Option<&LoadError> {
        match &self.operation {
            HandlerOperation::Idle => None,
            HandlerOperation::Object { state, .. } => state.error(),
            HandlerOperation::Scene { state, .. } => state.error(),
        }
    }

    /// A non-instance record of `link`, or one sharing `callback`, is registered
    pub(crate) fn is_duplicate(&self, link: &WeakLink, callback: &Weak<ObjectCallback>) -> bool {
        self.records.iter().any(|record| {
            (!record.is_instantiate() && record.is_link(link)) || record.has_callback(callback)
        })
    }

    pub(crate) fn push_record(&mut self, record: ConsumerRecord) {
        self.records.push(record);
    }

    /// Start the object load if none was started yet
    pub(crate) fn start_object<L: ContentLoader>(&mut self, loader: &mut L) -> Option<OperationId> {
        if !matches!(self.operation, HandlerOperation::Idle) {
            return None;
        }
        let op = loader.load_by_key(&self.key);
        self.operation = HandlerOperation::Object {
            op,
            state: LoadState::Pending,
        };
        Some(op)
    }

    /// Start the scene load; the handler must be idle
    pub(crate) fn start_scene<L: ContentLoader>(
        &mut self,
        loader: &mut L,
        mode: LoadSceneMode,
        activate: bool,
    ) -> OperationId {
        let op = loader.load_scene_by_key(&self.key, mode, activate);
        self.operation = HandlerOperation::Scene {
            op,
            state: LoadState::Pending,
        };
        op
    }

    /// Store an object result; false if this handler was not waiting on `op`
    pub(crate) fn complete_object(
        &mut self,
        op: OperationId,
        result: Result<LoadedAsset, LoadError>,
    ) -> bool {
        match &mut self.operation {
            HandlerOperation::Object { op: own, state }
                if *own == op && matches!(state, LoadState::Pending) =>
            {
                *state = LoadState::Done(result);
                true
            }
            _ => false,
        }
    }

    /// Store a scene result; false if this handler was not waiting on `op`
    pub(crate) fn complete_scene(
        &mut self,
        op: OperationId,
        result: Result<SceneInstance, LoadError>,
    ) -> bool {
        match &mut self.operation {
            HandlerOperation::Scene { op: own, state }
                if *own == op && matches!(state, LoadState::Pending) =>
            {
                *state = LoadState::Done(result);
                true
            }
            _ => false,
        }
    }

    /// Remove the non-instance records of `link`, returning how many went
    pub(crate) fn remove_link(
        &mut self,
        link: &WeakLink,
        pool: &mut Pool<ConsumerRecord>,
    ) -> usize {
        self.remove_where(pool, |record| !record.is_instantiate() && record.is_link(link))
    }

    /// Remove the instance records of `link` that have not spawned yet
    pub(crate) fn remove_pending_instances(
        &mut self,
        link: &WeakLink,
        pool: &mut Pool<ConsumerRecord>,
    ) -> usize {
        self.remove_where(pool, |record| record.is_pending_instance() && record.is_link(link))
    }

    fn remove_where(
        &mut self,
        pool: &mut Pool<ConsumerRecord>,
        matches: impl Fn(&ConsumerRecord) -> bool,
    ) -> usize {
        let before = self.records.len();
        let mut index = 0;
        while index < self.records.len() {
            if matches(&self.records[index]) {
                pool.release(self.records.remove(index));
            } else {
                index += 1;
            }
        }
        before - self.records.len()
    }

    /// Mark a record as held by its spawned instance
    pub(crate) fn bind_instance(&mut self, id: RecordId, entity: Entity) -> bool {
        match self.records.iter_mut().find(|record| record.id() == id) {
            Some(record) => {
                record.bind_instance(entity);
                true
            }
            None => false,
        }
    }

    /// Remove the first record registered without a link
    pub(crate) fn remove_unowned(&mut self, pool: &mut Pool<ConsumerRecord>) -> bool {
        match self.records.iter().position(|record| record.is_unowned()) {
            Some(index) => {
                pool.release(self.records.remove(index));
                true
            }
            None => false,
        }
    }

    /// Remove one record by id
    pub(crate) fn take_record(&mut self, id: RecordId) -> Option<ConsumerRecord> {
        let index = self.records.iter().position(|record| record.id() == id)?;
        Some(self.records.remove(index))
    }

    /// Purge records whose link was dropped, then report whether the handler
    /// has completed and has no consumers left.
    ///
    /// Records bound to a spawned instance are never purged here; their slot
    /// belongs to the instance.
    pub fn is_unused(&mut self, report: bool, pool: &mut Pool<ConsumerRecord>) -> bool {
        let mut index = 0;
        while index < self.records.len() {
            let record = &self.records[index];
            if record.instance().is_none() && record.is_dangling_link() {
                if report {
                    log::error!(
                        "Dangling link for '{}' was dropped without release{}",
                        self.key,
                        record.trace_suffix()
                    );
                }
                pool.release(self.records.remove(index));
            } else {
                index += 1;
            }
        }
        self.is_done() && self.records.is_empty()
    }

    pub(crate) fn set_unload_callback(&mut self, callback: Option<UnloadCallback>) {
        self.on_unloaded = callback;
    }

    pub(crate) fn take_unload_callback(&mut self) -> Option<UnloadCallback> {
        self.on_unloaded.take()
    }

    /// Hand the held operation back to the loader.
    ///
    /// Object operations are released; scene operations are unloaded and the
    /// unload operation returned. Calling it on an idle handler does nothing.
    pub(crate) fn release_operation<L: ContentLoader>(
        &mut self,
        loader: &mut L,
    ) -> Option<OperationId> {
        match std::mem::take(&mut self.operation) {
            HandlerOperation::Idle => None,
            HandlerOperation::Object { op, .. } => {
                loader.release(op);
                None
            }
            HandlerOperation::Scene { op, .. } => Some(loader.unload_scene(op)),
        }
    }

    /// Return every record to `pool` and clear the handler for reuse
    pub(crate) fn reset(&mut self, pool: &mut Pool<ConsumerRecord>) {
        for record in self.records.drain(..) {
            pool.release(record);
        }
        self.id = HandlerId::default();
        self.key.clear();
        self.operation = HandlerOperation::Idle;
        self.on_unloaded = None;
    }
}
