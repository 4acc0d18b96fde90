//! # httpapi
//!
//! Resilience and lifecycle engine for declarative HTTP API clients.
//!
//! - [`retry`]: wrap any asynchronous unit of work ([`ApiTask`]) in a retry
//!   decorator with an attempt budget and failure/result clauses.
//! - [`registry`]: register each service contract once, then resolve cheap
//!   instances that share a managed, periodically recycled transport.
//!
//! ```rust,ignore
//! use httpapi::prelude::*;
//!
//! struct UsersApi { client: ApiClient }
//!
//! impl HttpApi for UsersApi {
//!     fn from_client(client: ApiClient) -> Self { Self { client } }
//! }
//!
//! let registry = HttpApiRegistry::new();
//! registry
//!     .register::<UsersApi>()?
//!     .configure(|c| c.base_url = Some("https://api.example.com/".into()));
//!
//! let users = registry.resolve::<UsersApi>()?;
//! let client = users.client.clone();
//! let name: String = task_fn(move || {
//!     let client = client.clone();
//!     async move { client.get_json::<String>("users/1/name").await }
//! })
//! .retry(3)?
//! .when_retryable()
//! .await?;
//! ```
#![deny(unsafe_code)]

pub mod error;
pub mod observability;
pub mod registry;
pub mod retry;
pub mod retry_api;

pub use error::{BoxError, HttpApiError};
pub use registry::{ApiClient, HttpApi, HttpApiConfig, HttpApiFactory, HttpApiRegistry};
pub use retry::{
    ApiTask, ApiTaskExt, RetryCause, RetryDelay, RetryError, RetryException, RetryPolicy,
    RetryTask, TaskFn, task_fn,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{BoxError, HttpApiError};
    pub use crate::registry::{ApiClient, HttpApi, HttpApiConfig, HttpApiFactory, HttpApiRegistry};
    pub use crate::retry::{
        ApiTask, ApiTaskExt, RetryCause, RetryDelay, RetryError, RetryException, RetryPolicy,
        RetryTask, task_fn,
    };
}
