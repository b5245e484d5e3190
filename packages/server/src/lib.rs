//! Public surface for the `apimount-server` crate.
//!
//! Mounts the endpoints of an [`apimount::EndpointRegistry`] on an Axum
//! router and exposes the demo APIs so that external crates (e.g. the
//! conformance test suite) can spin up an in-process server without spawning
//! a subprocess.

pub mod auth;
pub mod config;
pub mod demo;
pub mod error;
pub mod handler;
pub mod router;

pub use auth::{AuthError, BearerTokens};
pub use config::{ConfigError, ServerConfig};
pub use demo::demo_host;
pub use error::{AppError, ErrorResponse, MountError, ServerError};
pub use handler::{bind_api, handler_fn, ApiHandler, BoxResponseFuture, ExposureExt};
pub use router::{build_router, ROUTE_TABLE_PATH};
