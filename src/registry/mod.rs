//! Hash registry.
//!
//! The authoritative set of accepted content fingerprints, and the only
//! state shared between concurrent runs. A run reserves its fingerprint
//! before the duplicate check and commits it after a proof exists; a
//! second run holding the same content sees the reservation and stops
//! before proof generation, even when it runs in another pipeline.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryHashRegistry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("hash registry unavailable: {0}")]
    Unavailable(String),

    #[error("hash registry rejected fingerprint: {0}")]
    Rejected(String),
}

/// Outcome of [`HashRegistry::reserve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The caller now holds the fingerprint until it commits or releases.
    Acquired,
    /// Already accepted. The content is a duplicate.
    Registered,
    /// Another run holds it. Its outcome is not known yet.
    InFlight,
}

#[async_trait]
pub trait HashRegistry: Send + Sync {
    /// True only for committed fingerprints; reservations do not count.
    async fn exists(&self, fingerprint: &str) -> Result<bool, RegistryError>;

    /// Atomically check and reserve `fingerprint`.
    async fn reserve(&self, fingerprint: &str) -> Result<Reservation, RegistryError>;

    /// Drop a reservation that will not be committed. Called from `Drop`,
    /// so it must not block.
    fn release(&self, fingerprint: &str);

    /// Atomically inserts `fingerprint`, clearing any reservation on it.
    /// Returns `false` when it was already present, in which case nothing
    /// changes.
    async fn insert_if_absent(&self, fingerprint: &str) -> Result<bool, RegistryError>;
}

/// A held reservation. Released on drop unless committed.
pub struct ReservationGuard {
    registry: Arc<dyn HashRegistry>,
    fingerprint: String,
    committed: bool,
}

impl ReservationGuard {
    pub fn new(registry: Arc<dyn HashRegistry>, fingerprint: &str) -> Self {
        Self {
            registry,
            fingerprint: fingerprint.to_string(),
            committed: false,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Insert the reserved fingerprint. On `Ok(true)` the reservation is
    /// consumed; on anything else it is released when the guard drops.
    pub async fn commit(&mut self) -> Result<bool, RegistryError> {
        let inserted = self.registry.insert_if_absent(&self.fingerprint).await?;
        self.committed = inserted;
        Ok(inserted)
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.release(&self.fingerprint);
        }
    }
}
