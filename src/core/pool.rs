//! Object Pool for Allocation-Free Reuse
//!
//! A stack of spare instances plus a live counter. `acquire` pops a spare or
//! builds a new one with the generator; `release` runs the optional reset
//! callback and pushes the instance back for the next `acquire`.
//!
//! # Example
//!
//! ```ignore
//! use assetlink::core::Pool;
//!
//! let mut pool = Pool::with_capacity(Vec::<u8>::new, 16).with_reset(Vec::clear);
//!
//! let mut buffer = pool.acquire();
//! buffer.extend_from_slice(b"payload");
//! pool.release(buffer);
//!
//! // The next acquire reuses the cleared buffer
//! assert!(pool.acquire().is_empty());
//! ```
//!
//! Capacity is advisory: the pool grows without bound under demand.

use std::fmt;

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances currently handed out
    pub live: usize,
    /// Instances waiting for reuse
    pub spare: usize,
}

impl PoolStats {
    /// Total instances ever constructed by the pool (`live + spare`).
    #[must_use]
    pub const fn high_water_mark(&self) -> usize {
        self.live + self.spare
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} live / {} spare (max {})",
            self.live,
            self.spare,
            self.high_water_mark()
        )
    }
}

/// A generic reusable-object pool.
///
/// | Operation | Time Complexity |
/// |-----------|-----------------|
/// | `acquire` | O(1) amortized  |
/// | `release` | O(1) + reset    |
pub struct Pool<T> {
    /// Spare instances, reused in LIFO order
    spares: Vec<T>,
    /// Number of instances currently handed out
    live: usize,
    /// Builds a fresh instance when no spare exists
    generator: Box<dyn Fn() -> T>,
    /// Clears an instance before it is stored for reuse
    resetter: Option<Box<dyn Fn(&mut T)>>,
}

impl<T> Pool<T> {
    /// Create an empty pool around a generator.
    #[must_use]
    pub fn new(generator: impl Fn() -> T + 'static) -> Self {
        Self::with_capacity(generator, 0)
    }

    /// Create a pool with room reserved for `capacity` spares.
    ///
    /// Nothing is constructed up front; the reservation only avoids
    /// reallocating the spare stack.
    #[must_use]
    pub fn with_capacity(generator: impl Fn() -> T + 'static, capacity: usize) -> Self {
        Self {
            spares: Vec::with_capacity(capacity),
            live: 0,
            generator: Box::new(generator),
            resetter: None,
        }
    }

    /// Install the callback run on every released instance.
    #[must_use]
    pub fn with_reset(mut self, resetter: impl Fn(&mut T) + 'static) -> Self {
        self.resetter = Some(Box::new(resetter));
        self
    }

    /// Take an instance, reusing a spare when one is available.
    pub fn acquire(&mut self) -> T {
        self.live += 1;
        self.spares.pop().unwrap_or_else(|| (self.generator)())
    }

    /// Return an instance for later reuse.
    pub fn release(&mut self, mut item: T) {
        if let Some(reset) = &self.resetter {
            reset(&mut item);
        }
        self.live = self.live.saturating_sub(1);
        self.spares.push(item);
    }

    /// Instances currently handed out.
    #[must_use]
    #[inline]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Instances waiting for reuse.
    #[must_use]
    #[inline]
    pub fn spare_count(&self) -> usize {
        self.spares.len()
    }

    /// Total instances the pool has constructed.
    #[must_use]
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.spares.len() + self.live
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.live,
            spare: self.spares.len(),
        }
    }

    /// Drop every spare instance.
    ///
    /// Live instances are unaffected and may still be released afterwards.
    pub fn drain(&mut self) {
        self.spares.clear();
        self.spares.shrink_to_fit();
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("live", &self.live)
            .field("spare", &self.spares.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
