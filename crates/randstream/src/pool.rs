use crate::{RandSource, ThreadRandom, U256};
use parking_lot::Mutex;
use std::collections::HashSet;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A process-wide source of never-repeating 256-bit random values.
///
/// Values are drawn from a [`RandSource`] and recorded in a shared set of
/// every value handed out so far. A value that is already in the set is
/// discarded and redrawn, so two calls to [`Self::next`] never return the same
/// value for the lifetime of the pool, no matter how many sessions share it.
///
/// ## Locking
///
/// The random draw happens outside the lock. The lock is held only for the
/// `HashSet::insert`, whose return value is the membership check, so the
/// check and the record are a single atomic step.
///
/// ## Memory
///
/// The set is never pruned. With 2^256 possible values a redraw is a
/// correctness fallback rather than a performance concern, but every emitted
/// value costs one set entry until the process exits.
pub struct NumberPool<R = ThreadRandom>
where
    R: RandSource<U256>,
{
    seen: Mutex<HashSet<U256>>,
    rng: R,
}

impl<R> NumberPool<R>
where
    R: RandSource<U256>,
{
    /// Creates an empty pool drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self::with_capacity(rng, 0)
    }

    /// Creates an empty pool with room for `capacity` values before the seen
    /// set has to grow.
    pub fn with_capacity(rng: R, capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::with_capacity(capacity)),
            rng,
        }
    }

    /// Returns a value that has never been returned by this pool before.
    ///
    /// This never fails: it keeps drawing until it finds a fresh value and
    /// records that value before returning it.
    ///
    /// # Example
    /// ```
    /// use randstream::{NumberPool, ThreadRandom};
    ///
    /// let pool = NumberPool::new(ThreadRandom);
    /// let a = pool.next();
    /// let b = pool.next();
    /// assert_ne!(a, b);
    /// assert_eq!(pool.len(), 2);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next(&self) -> U256 {
        loop {
            let value = self.rng.rand();
            if self.seen.lock().insert(value) {
                return value;
            }
            #[cfg(feature = "tracing")]
            tracing::warn!(%value, "discarding previously emitted value");
        }
    }

    /// Returns `true` if `value` has already been handed out.
    pub fn contains(&self, value: &U256) -> bool {
        self.seen.lock().contains(value)
    }

    /// Number of values handed out so far.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NumberPool<ThreadRandom> {
    fn default() -> Self {
        Self::new(ThreadRandom)
    }
}
