//! Asset links
//!
//! Links are the handles application code holds. Each one carries a key, a
//! loaded flag and an identity token the registry observes weakly, so a link
//! dropped without releasing is detected instead of leaking its slot.

mod object;
mod prefab;
mod scene;

pub use object::ObjectLink;
pub use prefab::PrefabLink;
pub use scene::SceneLink;

use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::loader::ContentLoader;
use crate::registry::AssetRegistry;
use crate::spawn::Spawner;

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

/// Strong identity owned by a link; dropping it marks every observer dangling
#[derive(Debug)]
pub struct LinkToken(Rc<LinkId>);

impl Default for LinkToken {
    fn default() -> Self {
        Self(Rc::new(LinkId(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed))))
    }
}

impl LinkToken {
    #[must_use]
    pub fn id(&self) -> LinkId {
        *self.0
    }

    /// Non-owning observer of this token
    #[must_use]
    pub fn observe(&self) -> WeakLink {
        WeakLink {
            id: *self.0,
            alive: Rc::downgrade(&self.0),
        }
    }
}

/// Weak observer of a link's identity
#[derive(Debug, Clone)]
pub struct WeakLink {
    id: LinkId,
    alive: Weak<LinkId>,
}

impl WeakLink {
    #[must_use]
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Whether the observed link still exists
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// State shared by every link variant.
///
/// Only the key is persisted; a deserialized link starts unloaded with a
/// fresh identity.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AssetLink {
    key: String,
    #[serde(skip)]
    loaded: bool,
    #[serde(skip)]
    token: LinkToken,
}

impl AssetLink {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn id(&self) -> LinkId {
        self.token.id()
    }

    /// Weak observer handed to consumer records
    #[must_use]
    pub fn observe(&self) -> WeakLink {
        self.token.observe()
    }

    pub(crate) fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    fn set_key(&mut self, key: &str) {
        self.key.clear();
        self.key.push_str(key);
    }
}

/// Common behavior of the link variants
pub trait AssetReference {
    fn link(&self) -> &AssetLink;

    fn link_mut(&mut self) -> &mut AssetLink;

    /// Drop whatever this link registered with the registry
    fn release_registration<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
    );

    fn key(&self) -> &str {
        self.link().key()
    }

    fn is_loaded(&self) -> bool {
        self.link().is_loaded()
    }

    /// Point the link at another key, releasing the current registration first
    fn assign_key<L: ContentLoader, S: Spawner>(
        &mut self,
        registry: &mut AssetRegistry<L, S>,
        key: &str,
    ) {
        if self.key() == key {
            return;
        }
        self.reset(registry);
        self.link_mut().set_key(key);
    }

    /// Release any registration and clear the key
    fn reset<L: ContentLoader, S: Spawner>(&mut self, registry: &mut AssetRegistry<L, S>) {
        if !self.link().has_key() {
            return;
        }
        if self.is_loaded() {
            self.release_registration(registry);
        }
        let link = self.link_mut();
        link.set_loaded(false);
        link.key.clear();
    }
}
