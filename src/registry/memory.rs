//! In-process hash registry.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{HashRegistry, RegistryError, Reservation};

#[derive(Debug, Default)]
struct Entries {
    committed: HashSet<String>,
    reserved: HashSet<String>,
}

/// Registry backed by one lock over committed and reserved sets, so
/// check-and-reserve is a single critical section. Share it between
/// pipelines through an `Arc`; never a process-wide static.
#[derive(Debug, Default)]
pub struct InMemoryHashRegistry {
    entries: Mutex<Entries>,
}

impl InMemoryHashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with previously accepted fingerprints.
    pub fn with_fingerprints<I, S>(fingerprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(Entries {
                committed: fingerprints.into_iter().map(Into::into).collect(),
                reserved: HashSet::new(),
            }),
        }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.lock().committed.contains(fingerprint)
    }

    /// Number of committed fingerprints.
    pub fn len(&self) -> usize {
        self.entries.lock().committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().committed.is_empty()
    }

    /// Number of outstanding reservations.
    pub fn reserved(&self) -> usize {
        self.entries.lock().reserved.len()
    }
}

#[async_trait]
impl HashRegistry for InMemoryHashRegistry {
    async fn exists(&self, fingerprint: &str) -> Result<bool, RegistryError> {
        Ok(self.contains(fingerprint))
    }

    async fn reserve(&self, fingerprint: &str) -> Result<Reservation, RegistryError> {
        if fingerprint.is_empty() {
            return Err(RegistryError::Rejected("empty fingerprint".to_string()));
        }

        let mut entries = self.entries.lock();
        if entries.committed.contains(fingerprint) {
            return Ok(Reservation::Registered);
        }
        if !entries.reserved.insert(fingerprint.to_string()) {
            return Ok(Reservation::InFlight);
        }
        Ok(Reservation::Acquired)
    }

    fn release(&self, fingerprint: &str) {
        self.entries.lock().reserved.remove(fingerprint);
    }

    async fn insert_if_absent(&self, fingerprint: &str) -> Result<bool, RegistryError> {
        if fingerprint.is_empty() {
            return Err(RegistryError::Rejected("empty fingerprint".to_string()));
        }

        let mut entries = self.entries.lock();
        entries.reserved.remove(fingerprint);
        Ok(entries.committed.insert(fingerprint.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ReservationGuard;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_if_absent() {
        let registry = InMemoryHashRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.exists("abc").await.unwrap());

        assert!(registry.insert_if_absent("abc").await.unwrap());
        assert!(!registry.insert_if_absent("abc").await.unwrap());

        assert!(registry.exists("abc").await.unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_fingerprint_rejected() {
        let registry = InMemoryHashRegistry::new();
        assert!(matches!(
            registry.insert_if_absent("").await,
            Err(RegistryError::Rejected(_))
        ));
        assert!(matches!(registry.reserve("").await, Err(RegistryError::Rejected(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_seeded() {
        let registry = InMemoryHashRegistry::with_fingerprints(["a", "b"]);
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_reserve_states() {
        let registry = InMemoryHashRegistry::with_fingerprints(["done"]);

        assert_eq!(registry.reserve("done").await.unwrap(), Reservation::Registered);
        assert_eq!(registry.reserve("fp").await.unwrap(), Reservation::Acquired);
        assert_eq!(registry.reserve("fp").await.unwrap(), Reservation::InFlight);

        // Reservations are not visible as registered content.
        assert!(!registry.exists("fp").await.unwrap());
        assert_eq!(registry.reserved(), 1);

        registry.release("fp");
        assert_eq!(registry.reserve("fp").await.unwrap(), Reservation::Acquired);
    }

    #[tokio::test]
    async fn test_guard_releases_unless_committed() {
        let registry = Arc::new(InMemoryHashRegistry::new());
        let shared: Arc<dyn HashRegistry> = registry.clone();

        assert_eq!(registry.reserve("a").await.unwrap(), Reservation::Acquired);
        drop(ReservationGuard::new(Arc::clone(&shared), "a"));
        assert_eq!(registry.reserved(), 0);
        assert!(registry.is_empty());

        assert_eq!(registry.reserve("b").await.unwrap(), Reservation::Acquired);
        let mut guard = ReservationGuard::new(Arc::clone(&shared), "b");
        assert!(guard.commit().await.unwrap());
        drop(guard);
        assert_eq!(registry.reserved(), 0);
        assert!(registry.contains("b"));
        assert_eq!(registry.reserve("b").await.unwrap(), Reservation::Registered);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_single_winner() {
        let registry = Arc::new(InMemoryHashRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.reserve("same").await.unwrap()
            }));
        }

        let mut acquired = 0;
        for handle in handles {
            if handle.await.unwrap() == Reservation::Acquired {
                acquired += 1;
            }
        }
        assert_eq!(acquired, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let registry = Arc::new(InMemoryHashRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.insert_if_absent("same").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }
}
