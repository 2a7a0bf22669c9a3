//! In-memory service registry with snapshot reads.
//!
//! The registry keeps its map behind an [`ArcSwap`]. Writers build a new
//! map and swap it in atomically, so a compilation holding a
//! [`Snapshot`] sees a consistent set of services as of the moment it
//! started, and never a half-applied upsert.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::model::Service;

/// An immutable view of the registry, keyed by service name.
pub type Snapshot = Arc<BTreeMap<String, Arc<Service>>>;

pub struct ServiceRegistry {
    services: ArcSwap<BTreeMap<String, Arc<Service>>>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: ArcSwap::from_pointee(BTreeMap::new()),
        }
    }

    /// Insert or wholesale-replace the record stored under `service_name`.
    pub fn upsert(&self, service: Service) {
        tracing::debug!(service = %service.service_name, "upserting service");
        let service = Arc::new(service);
        self.services.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.insert(service.service_name.clone(), Arc::clone(&service));
            next
        });
    }

    /// Remove a service by name. Removing an unknown name is a no-op.
    pub fn remove(&self, service_name: &str) {
        tracing::debug!(service = %service_name, "removing service");
        self.services.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.remove(service_name);
            next
        });
    }

    /// Replace the whole set at once, dropping services not present in `services`.
    ///
    /// Returns the names that were removed.
    pub fn replace_all(&self, services: Vec<Service>) -> Vec<String> {
        let next: BTreeMap<String, Arc<Service>> = services
            .into_iter()
            .map(|s| (s.service_name.clone(), Arc::new(s)))
            .collect();
        let next = Arc::new(next);
        let previous = self.services.swap(Arc::clone(&next));
        previous
            .keys()
            .filter(|name| !next.contains_key(*name))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, service_name: &str) -> Option<Arc<Service>> {
        self.services.load().get(service_name).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.services.load_full()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::model::ServiceDest;

    fn service(name: &str, port: u16) -> Service {
        Service {
            service_name: name.into(),
            service_dest: vec![ServiceDest {
                port,
                ..ServiceDest::default()
            }],
            ..Service::default()
        }
    }

    #[test]
    fn upsert_replaces_wholesale() {
        let registry = ServiceRegistry::new();
        registry.upsert(Service {
            https_only: true,
            ..service("api", 8080)
        });
        registry.upsert(service("api", 9090));

        assert_eq!(registry.len(), 1);
        let stored = registry.get("api").unwrap();
        assert_eq!(stored.service_dest[0].port, 9090);
        assert!(!stored.https_only);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let registry = ServiceRegistry::new();
        registry.upsert(service("api", 8080));
        registry.remove("nope");
        assert_eq!(registry.len(), 1);
        registry.remove("api");
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let registry = ServiceRegistry::new();
        registry.upsert(service("a", 1));
        let snapshot = registry.snapshot();

        registry.upsert(service("b", 2));
        registry.remove("a");

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("a"));
        assert_eq!(registry.snapshot().keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn replace_all_reports_dropped_names() {
        let registry = ServiceRegistry::new();
        registry.upsert(service("a", 1));
        registry.upsert(service("b", 2));

        let removed = registry.replace_all(vec![service("b", 3), service("c", 4)]);

        assert_eq!(removed, vec!["a".to_string()]);
        assert_eq!(registry.get("b").unwrap().service_dest[0].port, 3);
        assert!(registry.get("c").is_some());
    }

    #[test]
    fn concurrent_upserts_are_all_applied() {
        let registry = Arc::new(ServiceRegistry::new());
        let handles: Vec<_> = (0..8u16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for j in 0..25u16 {
                        registry.upsert(service(&format!("svc-{i}-{j}"), j));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}
