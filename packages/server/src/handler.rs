//! The concrete handler type mounted by this crate.
//!
//! Every endpoint handler is an [`ApiHandler`]: a shared, type-erased async
//! function from a raw [`Request`] to a [`Response`]. Handlers pull what they
//! need out of the request themselves (`Path`, `Json`, headers) through
//! axum's extractor traits.
//!
//! APIs declare their endpoints with [`ExposureExt::handle`], which binds an
//! `async fn(Arc<Self>, Request) -> impl IntoResponse` to the API instance:
//!
//! ```rust,ignore
//! impl ExposeEndpoints<ApiHandler> for OrdersApi {
//!     fn expose(exposure: &mut Exposure<Self, ApiHandler>) {
//!         exposure.handle("list", ExposeEndpoint::get("/orders"), Self::list);
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};

use apimount::{ExposeEndpoint, Exposure};

/// The boxed future returned by an [`ApiHandler`].
pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A mounted endpoint handler.
pub type ApiHandler = Arc<dyn Fn(Request) -> BoxResponseFuture + Send + Sync>;

/// Wrap a free-standing async function as an [`ApiHandler`].
pub fn handler_fn<F, Fut, R>(f: F) -> ApiHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req: Request| -> BoxResponseFuture {
        let fut = f(req);
        Box::pin(async move { fut.await.into_response() })
    })
}

/// Bind `f` to an API instance, producing an [`ApiHandler`].
pub fn bind_api<A, F, Fut, R>(api: Arc<A>, f: F) -> ApiHandler
where
    A: Send + Sync + 'static,
    F: Fn(Arc<A>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    handler_fn(move |req| f(Arc::clone(&api), req))
}

/// Declares HTTP endpoints on an [`Exposure`] of [`ApiHandler`]s.
pub trait ExposureExt<A> {
    /// Expose `f` as method `method`, bound to the API instance at
    /// registration time.
    fn handle<F, Fut, R>(&mut self, method: &str, meta: ExposeEndpoint, f: F) -> &mut Self
    where
        F: Fn(Arc<A>, Request) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse;
}

impl<A> ExposureExt<A> for Exposure<A, ApiHandler>
where
    A: Send + Sync + 'static,
{
    fn handle<F, Fut, R>(&mut self, method: &str, meta: ExposeEndpoint, f: F) -> &mut Self
    where
        F: Fn(Arc<A>, Request) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.method(method, meta, move |api| bind_api(api, f.clone()))
    }
}
