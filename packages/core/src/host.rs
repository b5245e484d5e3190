//! The registration façade.
//!
//! [`ApiHost`] owns the [`EndpointRegistry`] and, once configured, the
//! [`ApiModule`]. Applications configure the module first, then map APIs or
//! individual handlers, then hand the registry to the routing layer.
//!
//! ```rust,ignore
//! let mut host = ApiHost::new();
//! host.add_api_module(ApiConfiguration { use_authorization: false });
//! host.map_api(Arc::new(OrdersApi::default()))?
//!     .with_tags(["orders"]);
//! let router = build_router(host.registry(), &config)?;
//! ```

use std::sync::Arc;

use crate::api::{Api, ExposeEndpoints};
use crate::convention::ConventionBuilder;
use crate::endpoint::EndpointDescriptor;
use crate::error::{ConfigurationError, RegistrationError};
use crate::module::{ApiConfiguration, ApiModule};
use crate::registrar::ApiRegistrar;
use crate::registry::EndpointRegistry;
use crate::verb::HttpVerb;

/// Entry point for registering APIs and endpoints.
pub struct ApiHost<H> {
    module: Option<ApiModule<H>>,
    registry: EndpointRegistry<H>,
}

impl<H: Clone> Default for ApiHost<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> ApiHost<H> {
    pub fn new() -> Self {
        Self::with_registry(EndpointRegistry::new())
    }

    /// A host registering into an existing registry.
    pub fn with_registry(registry: EndpointRegistry<H>) -> Self {
        Self {
            module: None,
            registry,
        }
    }

    /// Configure the API module. Only the first call has any effect.
    pub fn add_api_module(&mut self, options: ApiConfiguration) -> &mut Self {
        if self.module.is_some() {
            tracing::debug!(?options, "api module already configured; ignoring");
        } else {
            tracing::debug!(?options, "api module configured");
            self.module = Some(ApiModule::new(options));
        }
        self
    }

    /// Record an API in the module without discovering its endpoints.
    pub fn add_api(&mut self, api: Arc<dyn Api>) -> Result<&mut Self, RegistrationError> {
        self.module_mut()?.add_api(api)?;
        Ok(self)
    }

    /// Discover and register every exposed method of `api`.
    pub fn map_api<A>(&mut self, api: Arc<A>) -> Result<ConventionBuilder, RegistrationError>
    where
        A: ExposeEndpoints<H>,
    {
        let module = self
            .module
            .as_mut()
            .ok_or(ConfigurationError::ModuleNotConfigured)?;
        ApiRegistrar::new(module, &self.registry).register_api(api)
    }

    /// Register `handler` directly for `verbs` on `pattern`.
    ///
    /// The pattern is used as given; no route prefix applies.
    pub fn map_methods(
        &mut self,
        pattern: impl Into<String>,
        name: impl Into<String>,
        verbs: &[HttpVerb],
        handler: H,
    ) -> Result<ConventionBuilder, RegistrationError> {
        let module = self
            .module
            .as_mut()
            .ok_or(ConfigurationError::ModuleNotConfigured)?;
        let descriptor = EndpointDescriptor::new(name, pattern, verbs, handler)?;
        ApiRegistrar::new(module, &self.registry).register_descriptor(descriptor)
    }

    pub fn registry(&self) -> &EndpointRegistry<H> {
        &self.registry
    }

    /// The module, if one has been configured.
    pub fn module(&self) -> Option<&ApiModule<H>> {
        self.module.as_ref()
    }

    fn module_mut(&mut self) -> Result<&mut ApiModule<H>, RegistrationError> {
        self.module
            .as_mut()
            .ok_or_else(|| ConfigurationError::ModuleNotConfigured.into())
    }
}
