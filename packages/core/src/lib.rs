//! Registration of API handler objects as HTTP endpoints.
//!
//! An application describes its API objects through [`ExposeEndpoints`],
//! registers them through [`ApiHost`], decorates the returned
//! [`ConventionBuilder`]s, and finally lets a routing engine pull finalized
//! [`Endpoint`]s out of the [`EndpointRegistry`].
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`verb`] | [`HttpVerb`] and the static [`VerbTable`] of wire tokens |
//! | [`endpoint`] | [`EndpointDescriptor`], [`EndpointBuilder`], [`Endpoint`], [`Metadata`] |
//! | [`convention`] | Leaf and composite [`ConventionBuilder`]s |
//! | [`registry`] | [`EndpointRegistry`]: pending builders and the snapshot cache |
//! | [`api`] | The [`Api`] identity trait and explicit exposure declarations |
//! | [`module`] | [`ApiModule`]: registered APIs, claimed routes, auth flag |
//! | [`registrar`] | [`ApiRegistrar`]: discovery with all-or-nothing commit |
//! | [`host`] | [`ApiHost`]: the registration façade |
//! | [`error`] | [`RegistrationError`] and its three arms |
//!
//! The crate is generic over the handler type `H`; it never calls a
//! handler. HTTP glue lives in `apimount-server`.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use apimount::{ApiConfiguration, ApiHost};
//!
//! let mut host = ApiHost::new();
//! host.add_api_module(ApiConfiguration::default());
//! host.map_api(Arc::new(Orders::default()))?
//!     .require_authorization_with("orders:write");
//!
//! for endpoint in host.registry().snapshot().iter() {
//!     println!("{} {}", endpoint.verbs().join(","), endpoint.pattern());
//! }
//! ```

pub mod api;
pub mod convention;
pub mod endpoint;
pub mod error;
pub mod host;
pub mod module;
pub mod registrar;
pub mod registry;
pub mod verb;

pub use api::{discover, Api, ExposeEndpoint, ExposeEndpoints, ExposedMethod, Exposure};
pub use convention::{CompositeBuilder, Convention, ConventionBuilder, LeafBuilder};
pub use endpoint::{Endpoint, EndpointBuilder, EndpointDescriptor, Metadata, RouteEntry};
pub use error::{CompositionError, ConfigurationError, PreconditionError, RegistrationError};
pub use host::ApiHost;
pub use module::{ApiConfiguration, ApiModule, RouteKey};
pub use registrar::{join_pattern, ApiRegistrar};
pub use registry::{BuilderHandle, ChangeToken, EndpointRegistry};
pub use verb::{HttpVerb, VerbTable};
