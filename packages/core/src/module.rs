//! Per-process bookkeeping of registered APIs.
//!
//! The module records which APIs were added, which `(verb, pattern)` routes
//! they claimed, and whether every API endpoint requires authorization. It
//! does not perform discovery; that is [`ApiRegistrar`](crate::ApiRegistrar)'s
//! job.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::api::Api;
use crate::error::{PreconditionError, RegistrationError};

/// Options the hosting layer configures the module with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiConfiguration {
    /// Require authorization on every endpoint of every mapped API.
    pub use_authorization: bool,
}

/// Key of the route table: wire verb token and resolved pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub verb: String,
    pub pattern: String,
}

impl RouteKey {
    pub fn new(verb: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.pattern)
    }
}

/// Registered APIs, their routes, and the global authorization flag.
pub struct ApiModule<H> {
    apis: Vec<Arc<dyn Api>>,
    routes: IndexMap<RouteKey, H>,
    require_auth: bool,
}

impl<H> ApiModule<H> {
    pub fn new(options: ApiConfiguration) -> Self {
        Self {
            apis: Vec::new(),
            routes: IndexMap::new(),
            require_auth: options.use_authorization,
        }
    }

    /// Record `api`. Blank names are rejected; an instance that is already
    /// recorded is kept once.
    pub fn add_api(&mut self, api: Arc<dyn Api>) -> Result<&mut Self, RegistrationError> {
        if api.name().trim().is_empty() {
            return Err(PreconditionError::EmptyApiName.into());
        }
        self.record_api(api);
        Ok(self)
    }

    /// Record an API whose name was already checked.
    pub(crate) fn record_api(&mut self, api: Arc<dyn Api>) {
        if self
            .apis
            .iter()
            .any(|known| std::ptr::addr_eq(Arc::as_ptr(known), Arc::as_ptr(&api)))
        {
            tracing::debug!(api = api.name(), "api already recorded");
            return;
        }
        tracing::debug!(api = api.name(), "api recorded");
        self.apis.push(api);
    }

    /// APIs in the order they were added.
    pub fn apis(&self) -> &[Arc<dyn Api>] {
        &self.apis
    }

    /// Claimed routes in registration order.
    pub fn routes(&self) -> &IndexMap<RouteKey, H> {
        &self.routes
    }

    pub fn require_auth(&self) -> bool {
        self.require_auth
    }

    pub fn has_route(&self, key: &RouteKey) -> bool {
        self.routes.contains_key(key)
    }

    pub(crate) fn insert_route(&mut self, key: RouteKey, handler: H) {
        self.routes.insert(key, handler);
    }
}

impl<H> fmt::Debug for ApiModule<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiModule")
            .field("apis", &self.apis.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("require_auth", &self.require_auth)
            .finish()
    }
}
