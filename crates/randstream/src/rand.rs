use crate::U256;
use rand::{RngCore, rng};

/// A trait for random sources that return uniformly distributed values.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests.
///
/// # Example
/// ```
/// use randstream::{RandSource, U256};
///
/// struct FixedRand;
/// impl RandSource<U256> for FixedRand {
///     fn rand(&self) -> U256 {
///         U256::from(1234_u64)
///     }
/// }
///
/// let rng = FixedRand;
/// assert_eq!(rng.rand(), U256::from(1234_u64));
/// ```
pub trait RandSource<T> {
    /// Returns a random value.
    fn rand(&self) -> T;
}

/// A `RandSource` backed by the thread-local RNG (`rand::rng()`).
///
/// The thread-local generator is a ChaCha-based CSPRNG seeded from the
/// operating system and reseeded periodically, so its output is suitable for
/// values that must not be guessable.
///
/// This type does not store the RNG; it accesses the thread-local generator
/// on each call. It is therefore zero-sized, `Send` and `Sync`, and can be
/// shared by every session even though `ThreadRng` itself cannot.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource<U256> for ThreadRandom {
    fn rand(&self) -> U256 {
        let mut bytes = [0_u8; U256::BYTES];
        rng().fill_bytes(&mut bytes);
        U256::from_be_bytes(bytes)
    }
}
