use crate::error::{MeshestraHttpError, Result};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Thread-safe singleton store keyed by type.
#[derive(Clone, Default)]
pub struct Container {
    services: DashMap<TypeId, ServiceEntry>,
}

#[derive(Clone)]
struct ServiceEntry {
    instance: Arc<dyn Any + Send + Sync>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    pub fn register<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        self.register_arc(Arc::new(instance))
    }

    pub fn register_arc<T: 'static + Send + Sync>(&mut self, instance: Arc<T>) -> &mut Self {
        let entry = ServiceEntry { instance };
        self.services.insert(TypeId::of::<T>(), entry);
        self
    }

    /// Register a singleton built by `factory`, replacing any instance
    /// previously registered under the same type.
    ///
    /// Returns the instance that is now stored.
    pub fn singleton_override<T, F>(&mut self, factory: F) -> Arc<T>
    where
        T: 'static + Send + Sync,
        F: FnOnce() -> T,
    {
        let instance = Arc::new(factory());
        if self.contains::<T>() {
            tracing::debug!(
                "Overriding singleton: {}",
                std::any::type_name::<T>()
            );
        }
        self.register_arc(Arc::clone(&instance));
        instance
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let entry = self
            .services
            .get(&TypeId::of::<T>())
            .ok_or_else(MeshestraHttpError::not_found::<T>)?;
        entry
            .instance
            .clone()
            .downcast::<T>()
            .map_err(|_| MeshestraHttpError::downcast_failed::<T>())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestService {
        value: i32,
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(TestService { value: 42 });
        let service = container.resolve::<TestService>().unwrap();
        assert_eq!(service.value, 42);
    }

    #[test]
    fn test_resolve_missing() {
        let container = Container::new();
        let err = container.resolve::<TestService>().err().unwrap();
        assert!(matches!(err, MeshestraHttpError::DependencyNotFound { .. }));
        assert!(err.to_string().contains("TestService"));
    }

    #[test]
    fn test_singleton_override_replaces() {
        let mut container = Container::new();
        let first = container.singleton_override(|| TestService { value: 1 });
        let second = container.singleton_override(|| TestService { value: 2 });

        assert_eq!(container.len(), 1);
        assert!(!Arc::ptr_eq(&first, &second));

        let resolved = container.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
        assert_eq!(resolved.value, 2);
    }
}
