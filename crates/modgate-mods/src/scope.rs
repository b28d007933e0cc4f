//! Per-mod service scopes.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-keyed service map.
///
/// Every mod gets its own scope, and the server has one shared root
/// scope. What a mod provides stays in its scope unless it shares it
/// into the root; see [`ModRegistrar`](crate::ModRegistrar).
#[derive(Default)]
pub struct ServiceScope {
    services: HashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
}

impl ServiceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` as the `T` of this scope, replacing any earlier one.
    pub fn provide<T: Any + Send + Sync>(&mut self, value: T) {
        self.provide_arc(Arc::new(value));
    }

    /// Stores an already shared `T`.
    pub fn provide_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        let service: Arc<dyn Any + Send + Sync> = value;
        self.services.insert(TypeId::of::<T>(), (type_name::<T>(), service));
    }

    /// Returns this scope's `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let (_, service) = self.services.get(&TypeId::of::<T>())?;
        Arc::clone(service).downcast::<T>().ok()
    }

    /// Whether this scope holds a `T`.
    pub fn contains<T: Any>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.services.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("ServiceScope").field("services", &names).finish()
    }
}
