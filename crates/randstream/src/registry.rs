use crate::Address;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// The set of addresses that currently own a live stream.
///
/// An address is in the registry if and only if exactly one session holds it.
/// Both mutations run under a single lock, so two connections racing from the
/// same address can never both be admitted.
#[derive(Default, Debug)]
pub struct ConnectionRegistry {
    active: Mutex<HashSet<Address>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically admits `address` if it is not already active.
    ///
    /// Returns `false` when another session already holds the address; the
    /// caller must reject the connection.
    pub fn try_admit(&self, address: &Address) -> bool {
        let mut active = self.active.lock();
        if active.contains(address) {
            return false;
        }
        active.insert(address.clone())
    }

    /// Removes `address`. Releasing an address that is not active is a no-op.
    pub fn release(&self, address: &Address) {
        self.active.lock().remove(address);
    }

    /// Admits `address` and returns a token that releases it when dropped.
    ///
    /// # Example
    /// ```
    /// use randstream::{Address, ConnectionRegistry};
    /// use std::sync::Arc;
    ///
    /// let registry = Arc::new(ConnectionRegistry::new());
    /// let admission = registry.admit(Address::from("10.0.0.1")).unwrap();
    /// assert!(registry.admit(Address::from("10.0.0.1")).is_none());
    ///
    /// admission.release();
    /// assert!(registry.admit(Address::from("10.0.0.1")).is_some());
    /// ```
    pub fn admit(self: &Arc<Self>, address: Address) -> Option<Admission> {
        self.try_admit(&address).then(|| Admission {
            registry: Arc::clone(self),
            address,
        })
    }

    pub fn is_active(&self, address: &Address) -> bool {
        self.active.lock().contains(address)
    }

    /// Number of addresses with a live session.
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Proof that an address was admitted into a [`ConnectionRegistry`].
///
/// The address is released exactly once: by [`Admission::release`], or when
/// the token is dropped (including during a panic unwind).
#[derive(Debug)]
#[must_use = "dropping an admission releases its address immediately"]
pub struct Admission {
    registry: Arc<ConnectionRegistry>,
    address: Address,
}

impl Admission {
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Releases the address back to the registry.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.registry.release(&self.address);
    }
}
