//! Discovery: turning an API's exposure metadata into registered endpoints.
//!
//! Registration of one API is all-or-nothing. Every exposed method is
//! resolved and checked first; only when all of them succeed are the
//! endpoints added to the registry and the routes recorded in the module.
//! A failure leaves both untouched.

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{discover, Api, ExposeEndpoints, ExposedMethod};
use crate::convention::ConventionBuilder;
use crate::endpoint::EndpointDescriptor;
use crate::error::{ConfigurationError, PreconditionError, RegistrationError};
use crate::module::{ApiModule, RouteKey};
use crate::registry::EndpointRegistry;

/// Registers APIs into a registry, recording them in a module.
pub struct ApiRegistrar<'a, H> {
    module: &'a mut ApiModule<H>,
    registry: &'a EndpointRegistry<H>,
}

impl<'a, H: Clone> ApiRegistrar<'a, H> {
    pub fn new(module: &'a mut ApiModule<H>, registry: &'a EndpointRegistry<H>) -> Self {
        Self { module, registry }
    }

    /// Discover and register every exposed method of `api`.
    ///
    /// Returns one composite builder over all of the API's endpoints, in
    /// declaration order. When the module requires authorization, the
    /// composite already carries a require-authorization convention.
    pub fn register_api<A>(&mut self, api: Arc<A>) -> Result<ConventionBuilder, RegistrationError>
    where
        A: ExposeEndpoints<H>,
    {
        if api.name().trim().is_empty() {
            return Err(PreconditionError::EmptyApiName.into());
        }

        let exposure = discover::<A, H>();
        let descriptors = exposure
            .iter()
            .map(|method| resolve_method(&api, method))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|descriptors| {
                self.check_routes(&descriptors)?;
                Ok(descriptors)
            })
            .inspect_err(|e| {
                tracing::warn!(api = api.name(), error = %e, "api registration rejected");
            })?;

        let count = descriptors.len();
        let composite = self.commit(descriptors);
        self.module.record_api(api.clone());

        if self.module.require_auth() {
            composite.require_authorization();
        }
        tracing::info!(
            api = api.name(),
            prefix = api.route_prefix(),
            endpoints = count,
            "api mapped"
        );
        Ok(composite)
    }

    /// Register a single, already-built descriptor under the same rules.
    pub fn register_descriptor(
        &mut self,
        descriptor: EndpointDescriptor<H>,
    ) -> Result<ConventionBuilder, RegistrationError> {
        let descriptors = vec![descriptor];
        self.check_routes(&descriptors).inspect_err(|e| {
            tracing::warn!(error = %e, "endpoint registration rejected");
        })?;

        let composite = self.commit(descriptors);
        if self.module.require_auth() {
            composite.require_authorization();
        }
        Ok(composite)
    }

    /// Reject any `(verb, pattern)` already claimed in the module or twice
    /// within `descriptors`.
    fn check_routes(&self, descriptors: &[EndpointDescriptor<H>]) -> Result<(), RegistrationError> {
        let mut claimed = HashSet::new();
        for d in descriptors {
            for verb in d.verbs() {
                let key = RouteKey::new(*verb, d.pattern());
                if self.module.has_route(&key) || !claimed.insert(key.clone()) {
                    return Err(ConfigurationError::DuplicateRoute {
                        verb: key.verb,
                        pattern: key.pattern,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, descriptors: Vec<EndpointDescriptor<H>>) -> ConventionBuilder {
        let mut leaves = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            for verb in d.verbs() {
                self.module
                    .insert_route(RouteKey::new(*verb, d.pattern()), d.handler().clone());
            }
            leaves.push(self.registry.add_endpoint(d));
        }
        ConventionBuilder::composite(leaves)
    }
}

/// Resolve one exposed method into a descriptor bound to `api`.
pub fn resolve_method<A, H>(
    api: &Arc<A>,
    method: &ExposedMethod<A, H>,
) -> Result<EndpointDescriptor<H>, RegistrationError>
where
    A: Api,
{
    if method.method.trim().is_empty() {
        return Err(PreconditionError::EmptyMethodName {
            api: api.name().to_string(),
        }
        .into());
    }

    let name = match method.meta.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}: {}", method.meta.verb, method.method),
    };

    let pattern = match method.meta.pattern.as_deref() {
        Some(p) if !p.trim().is_empty() => join_pattern(api.route_prefix(), p),
        _ => return Err(ConfigurationError::MissingPattern { endpoint: name }.into()),
    };

    let handler = method.bind(Arc::clone(api));
    Ok(EndpointDescriptor::new(name, pattern, &[method.meta.verb], handler)?)
}

/// Join a route prefix and a pattern with exactly one `/` between them.
///
/// No other normalisation happens; patterns are passed through to the
/// routing engine as written.
pub fn join_pattern(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return pattern.to_string();
    }
    format!("{}/{}", prefix, pattern.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ExposeEndpoint, Exposure};
    use crate::module::ApiConfiguration;
    use crate::verb::HttpVerb;

    type Handler = Arc<dyn Fn() -> String + Send + Sync>;

    struct Orders {
        prefix: &'static str,
    }

    impl Api for Orders {
        fn name(&self) -> &str {
            "Orders"
        }

        fn route_prefix(&self) -> &str {
            self.prefix
        }
    }

    impl ExposeEndpoints<Handler> for Orders {
        fn expose(exposure: &mut Exposure<Self, Handler>) {
            exposure
                .method("list", ExposeEndpoint::get("/orders"), |api| {
                    Arc::new(move || format!("list under {:?}", api.prefix)) as Handler
                })
                .method("create", ExposeEndpoint::post("/orders").named("CreateOrder"), |_| {
                    Arc::new(|| "create".to_string()) as Handler
                });
        }
    }

    struct Broken;

    impl Api for Broken {
        fn name(&self) -> &str {
            "Broken"
        }
    }

    impl ExposeEndpoints<Handler> for Broken {
        fn expose(exposure: &mut Exposure<Self, Handler>) {
            exposure
                .method("fine", ExposeEndpoint::get("/fine"), |_| Arc::new(String::new) as Handler)
                .method("unrouted", ExposeEndpoint::new().with_verb(HttpVerb::Put), |_| {
                    Arc::new(String::new) as Handler
                });
        }
    }

    fn fixture() -> (ApiModule<Handler>, EndpointRegistry<Handler>) {
        (ApiModule::new(ApiConfiguration::default()), EndpointRegistry::new())
    }

    #[test]
    fn registers_one_endpoint_per_exposed_method() {
        let (mut module, registry) = fixture();
        let composite = ApiRegistrar::new(&mut module, &registry)
            .register_api(Arc::new(Orders { prefix: "" }))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(composite.leaf_count(), 2);
        assert_eq!(module.apis().len(), 1);
        assert_eq!(module.routes().len(), 2);
    }

    #[test]
    fn handlers_are_bound_to_the_instance() {
        let (mut module, registry) = fixture();
        ApiRegistrar::new(&mut module, &registry)
            .register_api(Arc::new(Orders { prefix: "/api" }))
            .unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].pattern(), "/api/orders");
        assert_eq!((snapshot[0].handler())(), "list under \"/api\"");
    }

    #[test]
    fn missing_pattern_registers_nothing() {
        let (mut module, registry) = fixture();
        let err = ApiRegistrar::new(&mut module, &registry)
            .register_api(Arc::new(Broken))
            .unwrap_err();

        assert_eq!(
            err,
            RegistrationError::Configuration(ConfigurationError::MissingPattern {
                endpoint: "PUT: unrouted".into()
            })
        );
        assert!(registry.is_empty());
        assert!(module.apis().is_empty());
        assert!(module.routes().is_empty());
    }

    #[test]
    fn duplicate_route_is_rejected_atomically() {
        let (mut module, registry) = fixture();
        let mut registrar = ApiRegistrar::new(&mut module, &registry);
        registrar.register_api(Arc::new(Orders { prefix: "" })).unwrap();

        let err = registrar.register_api(Arc::new(Orders { prefix: "" })).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Configuration(ConfigurationError::DuplicateRoute {
                verb: "GET".into(),
                pattern: "/orders".into()
            })
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(module.apis().len(), 1);
    }

    #[test]
    fn module_flag_requires_authorization() {
        let mut module = ApiModule::new(ApiConfiguration {
            use_authorization: true,
        });
        let registry = EndpointRegistry::new();
        ApiRegistrar::new(&mut module, &registry)
            .register_api(Arc::new(Orders { prefix: "" }))
            .unwrap();

        assert!(registry.snapshot().iter().all(|e| e.requires_authorization()));
    }

    #[test]
    fn join_pattern_inserts_a_single_slash() {
        assert_eq!(join_pattern("", "/orders"), "/orders");
        assert_eq!(join_pattern("/api/", "/orders"), "/api/orders");
        assert_eq!(join_pattern("/api", "orders/{id}"), "/api/orders/{id}");
    }
}
