//! Process-wide service directory.
//!
//! One explicitly constructed [`ServiceContext`] is shared (via `PluginCtx`)
//! with every plugin; there is no hidden global. A service is a singleton
//! capability object registered under a stable name and looked up by its
//! declared type — the mechanism by which one plugin discovers another's
//! capability surface with only a shared interface crate between them.

use std::any::{Any, TypeId};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service '{0}' is already registered")]
    DuplicateService(String),
    #[error("required service '{0}' is not available")]
    MissingService(String),
}

struct ServiceDescriptor {
    name: String,
    type_id: TypeId,
    // Box holds an `Arc<S>`; `type_id` is `TypeId::of::<S>()`.
    instance: Box<dyn Any + Send + Sync>,
}

/// Directory of named service singletons. Mutated during plugin init,
/// read-mostly thereafter; torn down in reverse registration order.
#[derive(Default)]
pub struct ServiceContext {
    services: RwLock<Vec<ServiceDescriptor>>,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service singleton under `name`. At most one live instance
    /// per name; duplicates are rejected and the original stays untouched.
    pub fn register<S>(&self, name: &str, service: Arc<S>) -> Result<(), ServiceError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let mut services = self.services.write();
        if services.iter().any(|d| d.name == name) {
            return Err(ServiceError::DuplicateService(name.to_owned()));
        }
        tracing::debug!(service = name, "Registering service");
        services.push(ServiceDescriptor {
            name: name.to_owned(),
            type_id: TypeId::of::<S>(),
            instance: Box::new(service),
        });
        Ok(())
    }

    /// Typed lookup by name. `None` when the name is absent or was
    /// registered under a different capability type.
    pub fn get<S>(&self, name: &str) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services
            .read()
            .iter()
            .find(|d| d.name == name && d.type_id == TypeId::of::<S>())
            .and_then(|d| d.instance.downcast_ref::<Arc<S>>())
            .map(Arc::clone)
    }

    /// Lookup by capability type alone; when several names carry the same
    /// type, the first registrant wins.
    pub fn get_by_type<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services
            .read()
            .iter()
            .find(|d| d.type_id == TypeId::of::<S>())
            .and_then(|d| d.instance.downcast_ref::<Arc<S>>())
            .map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.read().iter().any(|d| d.name == name)
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.services
            .read()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    /// Drop all services in reverse registration order (dependency-safe
    /// unwind). Idempotent.
    pub fn teardown(&self) {
        let mut services = self.services.write();
        while let Some(descriptor) = services.pop() {
            tracing::debug!(service = %descriptor.name, "Tearing down service");
            drop(descriptor);
        }
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
