//! Per-contract factories.
//!
//! A [`HttpApiFactory`] produces instances of one contract. Instances are cheap:
//! they only hold an [`ApiClient`] handle. The expensive part, the `reqwest`
//! client and its connection pool, is cached by the factory and rebuilt once it
//! outlives the configured lifetime, so long-running processes never pin a
//! stale transport.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::HttpApiError;
use crate::registry::client::ApiClient;
use crate::registry::config::HttpApiConfig;

/// A service contract that can be created over a managed transport.
///
/// Implement this for the concrete type callers resolve, typically a thin
/// struct whose methods issue requests through the held [`ApiClient`].
///
/// ```rust,ignore
/// struct UsersApi { client: ApiClient }
///
/// impl HttpApi for UsersApi {
///     fn from_client(client: ApiClient) -> Self { Self { client } }
/// }
/// ```
pub trait HttpApi: Sized + Send + Sync + 'static {
    fn from_client(client: ApiClient) -> Self;

    /// Name used in logs and errors.
    fn contract_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Builds the `reqwest` client for a configuration; replaces the default builder.
pub type TransportBuilder =
    Arc<dyn Fn(&HttpApiConfig) -> Result<reqwest::Client, HttpApiError> + Send + Sync>;

struct FactoryState {
    config: HttpApiConfig,
    transport_builder: Option<TransportBuilder>,
}

/// Factory and transport owner for contract `A`.
pub struct HttpApiFactory<A> {
    state: RwLock<FactoryState>,
    cached: RwLock<Option<ApiClient>>,
    generation: AtomicU64,
    _contract: PhantomData<fn() -> A>,
}

impl<A: HttpApi> fmt::Debug for HttpApiFactory<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApiFactory")
            .field("contract", &A::contract_name())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<A: HttpApi> HttpApiFactory<A> {
    pub(crate) fn new(config: HttpApiConfig) -> Self {
        Self {
            state: RwLock::new(FactoryState {
                config,
                transport_builder: None,
            }),
            cached: RwLock::new(None),
            generation: AtomicU64::new(0),
            _contract: PhantomData,
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> HttpApiConfig {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config
            .clone()
    }

    /// Edit the configuration; the next resolution builds a fresh transport.
    pub fn configure<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&mut HttpApiConfig),
    {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state.config);
        }
        self.invalidate();
        self
    }

    /// How long a transport is reused before it is recycled.
    pub fn set_lifetime(&self, lifetime: Duration) -> &Self {
        self.configure(|config| config.lifetime = lifetime)
    }

    /// Use a custom builder for the underlying `reqwest` client.
    pub fn with_transport<F>(&self, builder: F) -> &Self
    where
        F: Fn(&HttpApiConfig) -> Result<reqwest::Client, HttpApiError> + Send + Sync + 'static,
    {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.transport_builder = Some(Arc::new(builder));
        }
        self.invalidate();
        self
    }

    /// Number of transports built so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Create a new contract instance over the shared transport.
    pub fn create(&self) -> Result<A, HttpApiError> {
        Ok(A::from_client(self.client()?))
    }

    /// Current transport, building or recycling it as needed.
    pub fn client(&self) -> Result<ApiClient, HttpApiError> {
        // Fast path: a live cached transport
        if let Some(client) = self.live_cached()? {
            return Ok(client);
        }

        let mut slot = self.cached.write().map_err(|e| {
            HttpApiError::InternalError(format!("Transport cache lock poisoned: {e}"))
        })?;

        // Double-check after acquiring the write lock
        if let Some(client) = slot.as_ref().filter(|c| self.is_live(c)) {
            return Ok(client.clone());
        }

        let client = self.build_client()?;
        if let Some(old) = slot.replace(client.clone()) {
            tracing::debug!(
                contract = A::contract_name(),
                old_generation = old.generation(),
                new_generation = client.generation(),
                "recycled expired transport"
            );
        }
        Ok(client)
    }

    fn live_cached(&self) -> Result<Option<ApiClient>, HttpApiError> {
        let slot = self.cached.read().map_err(|e| {
            HttpApiError::InternalError(format!("Transport cache lock poisoned: {e}"))
        })?;
        Ok(slot.as_ref().filter(|c| self.is_live(c)).cloned())
    }

    fn is_live(&self, client: &ApiClient) -> bool {
        client.age() <= client.config().lifetime
    }

    fn build_client(&self) -> Result<ApiClient, HttpApiError> {
        let (config, builder) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.config.clone(), state.transport_builder.clone())
        };
        config.validate()?;
        let http = match builder {
            Some(build) => build(&config)?,
            None => config.build_http_client()?,
        };
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            contract = A::contract_name(),
            generation,
            base_url = config.base_url.as_deref().unwrap_or(""),
            "built transport"
        );
        ApiClient::new(http, config, generation)
    }

    fn invalidate(&self) {
        self.cached
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct PingApi {
        client: ApiClient,
    }

    impl HttpApi for PingApi {
        fn from_client(client: ApiClient) -> Self {
            Self { client }
        }
    }

    fn factory() -> HttpApiFactory<PingApi> {
        HttpApiFactory::new(HttpApiConfig::new().with_base_url("https://ping.example.com/"))
    }

    #[test]
    fn instances_share_one_transport_within_lifetime() {
        let factory = factory();
        let a = factory.create().unwrap();
        let b = factory.create().unwrap();
        assert!(a.client.same_transport(&b.client));
        assert_eq!(factory.generation(), 1);
    }

    #[test]
    fn expired_transport_is_recycled() {
        let factory = factory();
        factory.set_lifetime(Duration::from_millis(1));
        let first = factory.create().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        let second = factory.create().unwrap();

        assert!(!first.client.same_transport(&second.client));
        assert!(second.client.generation() > first.client.generation());
        // The old transport stays usable for instances that still hold it
        assert!(first.client.url("health").is_ok());
    }

    #[test]
    fn configure_invalidates_cached_transport() {
        let factory = factory();
        let before = factory.create().unwrap();
        factory.configure(|c| c.base_url = Some("https://pong.example.com/".into()));
        let after = factory.create().unwrap();

        assert!(!before.client.same_transport(&after.client));
        assert_eq!(
            after.client.url("x").unwrap().as_str(),
            "https://pong.example.com/x"
        );
        assert_eq!(
            factory.config().base_url.as_deref(),
            Some("https://pong.example.com/")
        );
    }

    #[test]
    fn custom_transport_builder_is_used() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let factory = factory();
        factory.with_transport(move |_config| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(reqwest::Client::new())
        });

        factory.create().unwrap();
        factory.create().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_configuration_fails_creation() {
        let factory = factory();
        factory.configure(|c| c.base_url = Some("::::".into()));
        assert!(matches!(
            factory.create(),
            Err(HttpApiError::InvalidConfiguration(_))
        ));
    }
}
