//! The API surface applications implement to expose endpoints.
//!
//! Instead of scanning a type for annotated methods at runtime, an API lists
//! its exposed methods explicitly in [`ExposeEndpoints::expose`]: each entry
//! pairs a method name and its [`ExposeEndpoint`] metadata with a binder that
//! turns the shared API instance into a handler.
//!
//! ```rust,ignore
//! impl ExposeEndpoints<Handler> for Orders {
//!     fn expose(exposure: &mut Exposure<Self, Handler>) {
//!         exposure
//!             .method("list", ExposeEndpoint::get("/orders"), |api| handler_for(api, Orders::list))
//!             .method(
//!                 "create",
//!                 ExposeEndpoint::post("/orders").named("CreateOrder"),
//!                 |api| handler_for(api, Orders::create),
//!             );
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::verb::HttpVerb;

/// Identity of an API object: a name and the prefix its routes live under.
pub trait Api: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Joined in front of every exposed pattern. Empty by default.
    fn route_prefix(&self) -> &str {
        ""
    }
}

/// Declares which methods of an API are exposed as endpoints producing
/// handlers of type `H`.
pub trait ExposeEndpoints<H>: Api + Sized {
    /// List exposed methods. Declaration order is the discovery order.
    fn expose(exposure: &mut Exposure<Self, H>);
}

// ---------------------------------------------------------------------------
// ExposeEndpoint
// ---------------------------------------------------------------------------

/// Exposure metadata for one method.
///
/// `name` defaults to `"{VERB}: {method}"` and `verb` to GET. `pattern` has
/// no default: registration fails when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposeEndpoint {
    pub name: Option<String>,
    pub verb: HttpVerb,
    pub pattern: Option<String>,
}

impl ExposeEndpoint {
    /// A GET endpoint with no pattern yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verb(verb: HttpVerb, pattern: impl Into<String>) -> Self {
        Self {
            name: None,
            verb,
            pattern: Some(pattern.into()),
        }
    }

    pub fn get(pattern: impl Into<String>) -> Self {
        Self::verb(HttpVerb::Get, pattern)
    }

    pub fn post(pattern: impl Into<String>) -> Self {
        Self::verb(HttpVerb::Post, pattern)
    }

    pub fn put(pattern: impl Into<String>) -> Self {
        Self::verb(HttpVerb::Put, pattern)
    }

    pub fn delete(pattern: impl Into<String>) -> Self {
        Self::verb(HttpVerb::Delete, pattern)
    }

    pub fn patch(pattern: impl Into<String>) -> Self {
        Self::verb(HttpVerb::Patch, pattern)
    }

    /// Override the synthesised endpoint name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_verb(mut self, verb: HttpVerb) -> Self {
        self.verb = verb;
        self
    }

    pub fn at(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Exposure
// ---------------------------------------------------------------------------

type Binder<A, H> = Box<dyn Fn(Arc<A>) -> H + Send + Sync>;

/// One declared method: its name, exposure metadata and handler binder.
pub struct ExposedMethod<A, H> {
    pub method: String,
    pub meta: ExposeEndpoint,
    bind: Binder<A, H>,
}

impl<A, H> ExposedMethod<A, H> {
    /// Bind this method to an API instance.
    pub fn bind(&self, api: Arc<A>) -> H {
        (self.bind)(api)
    }
}

impl<A, H> fmt::Debug for ExposedMethod<A, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposedMethod")
            .field("method", &self.method)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Collector passed to [`ExposeEndpoints::expose`].
pub struct Exposure<A, H> {
    methods: Vec<ExposedMethod<A, H>>,
}

impl<A, H> Default for Exposure<A, H> {
    fn default() -> Self {
        Self {
            methods: Vec::new(),
        }
    }
}

impl<A, H> Exposure<A, H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an exposed method. `bind` receives the shared API instance.
    pub fn method<F>(&mut self, method: impl Into<String>, meta: ExposeEndpoint, bind: F) -> &mut Self
    where
        F: Fn(Arc<A>) -> H + Send + Sync + 'static,
    {
        self.methods.push(ExposedMethod {
            method: method.into(),
            meta,
            bind: Box::new(bind),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExposedMethod<A, H>> {
        self.methods.iter()
    }

    pub fn into_methods(self) -> Vec<ExposedMethod<A, H>> {
        self.methods
    }
}

/// Discover the exposed methods of `A`, in declaration order.
pub fn discover<A, H>() -> Exposure<A, H>
where
    A: ExposeEndpoints<H>,
{
    let mut exposure = Exposure::new();
    A::expose(&mut exposure);
    exposure
}
