//! Entity Component System module
//!
//! Spawned instances live in a host-owned `hecs::World`; these are the
//! components the instantiate path reads and attaches.

mod components;

pub use components::{Name, Parent, ReleaseOnDestroy, Transform};
