//! The endpoint registry: pending builders in, finalized endpoints out.
//!
//! Registration appends a pending entry (descriptor plus convention list) and
//! hands back a [`BuilderHandle`]. The routing engine calls
//! [`EndpointRegistry::snapshot`], which materialises every entry by seeding
//! a fresh metadata bag and applying its conventions in append order.
//!
//! # Caching
//!
//! Every mutation (a new entry, or a convention added to any leaf) bumps one
//! shared version counter. A snapshot is cached under the version it was
//! computed at and reused until the counter moves.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::convention::{ConventionBuilder, ConventionList, LeafBuilder};
use crate::endpoint::{Endpoint, EndpointDescriptor};

/// Opaque identifier of one pending endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuilderHandle(u64);

impl fmt::Display for BuilderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Change notification token for the registry.
///
/// Endpoints are fixed once the application has booted, so this token never
/// fires. Re-registration after traffic starts is not signalled to routers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeToken;

impl ChangeToken {
    pub fn has_changed(&self) -> bool {
        false
    }

    pub fn active_change_callbacks(&self) -> bool {
        false
    }

    /// Accepts and drops `callback`; it is never invoked.
    pub fn register_change_callback<F: FnOnce()>(&self, callback: F) {
        drop(callback);
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct PendingEndpoint<H> {
    handle: BuilderHandle,
    descriptor: EndpointDescriptor<H>,
    conventions: Arc<ConventionList>,
}

impl<H: Clone> PendingEndpoint<H> {
    fn build(&self) -> Endpoint<H> {
        let mut bag = self.descriptor.seed();
        self.conventions.apply(&mut bag);
        bag.build(self.descriptor.handler().clone())
    }
}

struct CachedSnapshot<H> {
    version: u64,
    endpoints: Arc<[Endpoint<H>]>,
}

struct Shared<H> {
    pending: RwLock<Vec<PendingEndpoint<H>>>,
    cache: RwLock<Option<CachedSnapshot<H>>>,
    version: Arc<AtomicU64>,
    next_handle: AtomicU64,
}

// ---------------------------------------------------------------------------
// EndpointRegistry
// ---------------------------------------------------------------------------

/// Process-wide collection of pending endpoints for one application boot.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct EndpointRegistry<H> {
    shared: Arc<Shared<H>>,
}

impl<H> Clone for EndpointRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<H: Clone> Default for EndpointRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> EndpointRegistry<H> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: RwLock::new(Vec::new()),
                cache: RwLock::new(None),
                version: Arc::new(AtomicU64::new(0)),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    /// Register a pending endpoint. Existing entries are never touched.
    pub fn add(&self, descriptor: EndpointDescriptor<H>) -> BuilderHandle {
        self.insert(descriptor).0
    }

    /// [`add`](Self::add) followed by [`conventions_for`](Self::conventions_for).
    pub fn add_endpoint(&self, descriptor: EndpointDescriptor<H>) -> ConventionBuilder {
        let (handle, list) = self.insert(descriptor);
        ConventionBuilder::Leaf(LeafBuilder::new(handle, list))
    }

    fn insert(&self, descriptor: EndpointDescriptor<H>) -> (BuilderHandle, Arc<ConventionList>) {
        let handle = BuilderHandle(self.shared.next_handle.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            %handle,
            pattern = descriptor.pattern(),
            name = descriptor.name(),
            "endpoint registered"
        );

        let conventions = Arc::new(ConventionList::new(Arc::clone(&self.shared.version)));
        self.shared
            .pending
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingEndpoint {
                handle,
                descriptor,
                conventions: Arc::clone(&conventions),
            });
        self.shared.version.fetch_add(1, Ordering::AcqRel);
        (handle, conventions)
    }

    /// The leaf convention builder for `handle`, or `None` if it is unknown.
    pub fn conventions_for(&self, handle: BuilderHandle) -> Option<ConventionBuilder> {
        self.entry_conventions(handle)
            .map(|list| ConventionBuilder::Leaf(LeafBuilder::new(handle, list)))
    }

    fn entry_conventions(&self, handle: BuilderHandle) -> Option<Arc<ConventionList>> {
        self.shared
            .pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| Arc::clone(&p.conventions))
    }

    /// Every endpoint, finalized, in registration order.
    ///
    /// Returns the cached result when nothing changed since it was computed.
    pub fn snapshot(&self) -> Arc<[Endpoint<H>]> {
        let version = self.version();
        if let Some(cached) = self
            .shared
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            if cached.version == version {
                return Arc::clone(&cached.endpoints);
            }
        }

        let endpoints: Arc<[Endpoint<H>]> = self
            .shared
            .pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(PendingEndpoint::build)
            .collect::<Vec<_>>()
            .into();
        tracing::debug!(version, count = endpoints.len(), "endpoint snapshot rebuilt");

        *self
            .shared
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(CachedSnapshot {
            version,
            endpoints: Arc::clone(&endpoints),
        });
        endpoints
    }

    pub fn change_token(&self) -> ChangeToken {
        ChangeToken
    }

    /// Number of pending endpoints.
    pub fn len(&self) -> usize {
        self.shared
            .pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current mutation counter.
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Metadata;
    use crate::verb::HttpVerb;

    fn descriptor(pattern: &str, verb: HttpVerb) -> EndpointDescriptor<&'static str> {
        EndpointDescriptor::new(format!("{verb}: {pattern}"), pattern, &[verb], "handler").unwrap()
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let registry = EndpointRegistry::new();
        registry.add(descriptor("/b", HttpVerb::Get));
        registry.add(descriptor("/a", HttpVerb::Post));
        registry.add(descriptor("/c", HttpVerb::Delete));

        let patterns: Vec<_> = registry.snapshot().iter().map(|e| e.pattern().to_string()).collect();
        assert_eq!(patterns, vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn snapshot_is_idempotent_and_cached() {
        let registry = EndpointRegistry::new();
        let handle = registry.add(descriptor("/orders", HttpVerb::Get));
        registry
            .conventions_for(handle)
            .unwrap()
            .with_tags(["orders"])
            .require_authorization();

        let first = registry.snapshot();
        let second = registry.snapshot();
        assert!(Arc::ptr_eq(&first, &second), "unchanged registry reuses the cache");

        let a: Vec<_> = first.iter().map(|e| e.describe()).collect();
        let b: Vec<_> = second.iter().map(|e| e.describe()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn rebuilt_snapshot_is_structurally_identical() {
        let registry = EndpointRegistry::new();
        let builder = registry.add_endpoint(descriptor("/orders", HttpVerb::Get));
        builder.with_display_name("Orders");

        let before: Vec<_> = registry.snapshot().iter().map(|e| e.describe()).collect();
        // Force a rebuild without changing any entry's conventions.
        registry.add(descriptor("/other", HttpVerb::Get));
        let after: Vec<_> = registry.snapshot().iter().map(|e| e.describe()).collect();

        assert_eq!(before[..], after[..1]);
    }

    #[test]
    fn mutations_invalidate_the_cache() {
        let registry = EndpointRegistry::new();
        let builder = registry.add_endpoint(descriptor("/orders", HttpVerb::Get));
        let first = registry.snapshot();

        builder.require_authorization();
        let second = registry.snapshot();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!first[0].requires_authorization());
        assert!(second[0].requires_authorization());

        registry.add(descriptor("/more", HttpVerb::Get));
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn conventions_apply_in_append_order() {
        let registry = EndpointRegistry::new();
        let builder = registry.add_endpoint(descriptor("/x", HttpVerb::Get));
        builder
            .with_display_name("first")
            .with_display_name("second")
            .with_metadata(Metadata::AllowAnonymous);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].display_name(), "second");
        assert_eq!(snapshot[0].metadata().last(), Some(&Metadata::AllowAnonymous));
    }

    #[test]
    fn unknown_handle_has_no_conventions() {
        let registry: EndpointRegistry<()> = EndpointRegistry::new();
        assert!(registry.conventions_for(BuilderHandle(42)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn change_token_never_fires() {
        let registry: EndpointRegistry<()> = EndpointRegistry::new();
        let token = registry.change_token();
        token.register_change_callback(|| panic!("must not be called"));
        registry.add(EndpointDescriptor::new("x", "/x", &[HttpVerb::Get], ()).unwrap());
        assert!(!token.has_changed());
        assert!(!token.active_change_callbacks());
    }
}
