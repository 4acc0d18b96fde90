//! Contract registry.
//!
//! [`HttpApiRegistry`] maps each contract type to exactly one
//! [`HttpApiFactory`]. Registration runs under a single mutex so the
//! check-and-insert is atomic; resolution only reads a concurrent map and never
//! touches that mutex, so many callers can resolve at once.
//!
//! The registry is an ordinary value: build one at startup and share it
//! (`Arc<HttpApiRegistry>` or a `&'static` from `OnceLock`) with every
//! resolution site. Registrations live as long as the registry.

pub mod client;
pub mod config;
pub mod factory;

use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::HttpApiError;

pub use client::{ApiClient, classify_status};
pub use config::{DEFAULT_LIFETIME, HttpApiConfig};
pub use factory::{HttpApi, HttpApiFactory, TransportBuilder};

type AnyFactory = Arc<dyn Any + Send + Sync>;

/// Contract identity to factory map.
#[derive(Default)]
pub struct HttpApiRegistry {
    factories: DashMap<TypeId, AnyFactory>,
    registration: Mutex<()>,
}

impl std::fmt::Debug for HttpApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiRegistry")
            .field("contracts", &self.factories.len())
            .finish()
    }
}

impl HttpApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register contract `A` with a default configuration.
    ///
    /// Fails with [`HttpApiError::DuplicateRegistration`] if `A` already has a
    /// factory; the existing registration is left untouched.
    pub fn register<A: HttpApi>(&self) -> Result<Arc<HttpApiFactory<A>>, HttpApiError> {
        self.register_with::<A>(HttpApiConfig::default())
    }

    /// Register contract `A` with an initial configuration.
    pub fn register_with<A: HttpApi>(
        &self,
        config: HttpApiConfig,
    ) -> Result<Arc<HttpApiFactory<A>>, HttpApiError> {
        let _guard = self.registration.lock().map_err(|e| {
            HttpApiError::InternalError(format!("Registration lock poisoned: {e}"))
        })?;

        let contract = TypeId::of::<A>();
        if self.factories.contains_key(&contract) {
            return Err(HttpApiError::DuplicateRegistration(
                A::contract_name().to_string(),
            ));
        }

        let factory = Arc::new(HttpApiFactory::<A>::new(config));
        self.factories
            .insert(contract, factory.clone() as AnyFactory);
        tracing::info!(contract = A::contract_name(), "registered contract factory");
        Ok(factory)
    }

    /// Factory registered for `A`.
    pub fn factory<A: HttpApi>(&self) -> Result<Arc<HttpApiFactory<A>>, HttpApiError> {
        let entry = self
            .factories
            .get(&TypeId::of::<A>())
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| HttpApiError::NotRegistered(A::contract_name().to_string()))?;
        entry.downcast::<HttpApiFactory<A>>().map_err(|_| {
            HttpApiError::InternalError(format!(
                "Factory type mismatch for contract: {}",
                A::contract_name()
            ))
        })
    }

    /// Create an instance of `A`.
    pub fn resolve<A: HttpApi>(&self) -> Result<A, HttpApiError> {
        self.factory::<A>()?.create()
    }

    pub fn is_registered<A: HttpApi>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<A>())
    }

    /// Number of registered contracts.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
