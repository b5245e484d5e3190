//! Convention builders: deferred customisation of not-yet-built endpoints.
//!
//! A [`ConventionBuilder`] is either a [`LeafBuilder`] bound to exactly one
//! registry entry, or a [`CompositeBuilder`] that forwards every convention
//! to each of its children. Composites may wrap other composites; the graph
//! is kept acyclic by [`CompositeBuilder::push`].
//!
//! Pushes and forwarding both run under one process-wide composition lock.
//! A cycle check and its insert therefore happen atomically, and every child
//! sees conventions in the same order as its composite.
//!
//! Builders are handles: cloning one shares the underlying state, so a
//! convention added through any clone reaches the same endpoints.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::endpoint::{EndpointBuilder, Metadata};
use crate::error::CompositionError;
use crate::registry::BuilderHandle;

/// A deferred mutation applied to an endpoint's metadata bag at build time.
///
/// `Fn` rather than `FnMut`: a convention runs once per build and must leave
/// the same result every time it runs over the same seed.
pub type Convention = Arc<dyn Fn(&mut EndpointBuilder) + Send + Sync>;

/// Writer lock over the builder graph.
static COMPOSITION: Mutex<()> = Mutex::new(());

fn composition_lock() -> MutexGuard<'static, ()> {
    COMPOSITION.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// ConventionList (shared with the registry)
// ---------------------------------------------------------------------------

/// The ordered conventions of one registry entry.
///
/// Every push bumps the registry-wide version so cached snapshots go stale.
pub(crate) struct ConventionList {
    items: RwLock<Vec<Convention>>,
    version: Arc<AtomicU64>,
}

impl ConventionList {
    pub(crate) fn new(version: Arc<AtomicU64>) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            version,
        }
    }

    fn push(&self, convention: Convention) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(convention);
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Apply every convention, in append order.
    pub(crate) fn apply(&self, bag: &mut EndpointBuilder) {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        for convention in items.iter() {
            convention(bag);
        }
    }
}

// ---------------------------------------------------------------------------
// LeafBuilder
// ---------------------------------------------------------------------------

/// Accumulates conventions for a single registered endpoint.
#[derive(Clone)]
pub struct LeafBuilder {
    handle: BuilderHandle,
    list: Arc<ConventionList>,
}

impl LeafBuilder {
    pub(crate) fn new(handle: BuilderHandle, list: Arc<ConventionList>) -> Self {
        Self { handle, list }
    }

    /// The registry handle this leaf is bound to.
    pub fn handle(&self) -> BuilderHandle {
        self.handle
    }
}

// ---------------------------------------------------------------------------
// CompositeBuilder
// ---------------------------------------------------------------------------

struct CompositeState {
    /// Everything ever added here, kept for inspection.
    conventions: Vec<Convention>,
    children: Vec<ConventionBuilder>,
}

/// Fans every convention out to an ordered list of child builders.
#[derive(Clone)]
pub struct CompositeBuilder {
    state: Arc<RwLock<CompositeState>>,
}

impl CompositeBuilder {
    /// Wrap `children` in discovery order.
    ///
    /// Infallible: a composite that does not exist yet cannot be reachable
    /// from any of its children.
    pub fn new(children: impl IntoIterator<Item = ConventionBuilder>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CompositeState {
                conventions: Vec::new(),
                children: children.into_iter().collect(),
            })),
        }
    }

    /// Append a child builder.
    ///
    /// Rejects `child` when it is this composite or transitively contains it.
    /// Conventions added before the push are not replayed on `child`.
    pub fn push(&self, child: ConventionBuilder) -> Result<(), CompositionError> {
        let _guard = composition_lock();
        if let ConventionBuilder::Composite(c) = &child {
            if c.same_as(self) || c.reaches(self) {
                tracing::warn!("rejected cyclic convention builder composition");
                return Err(CompositionError::Cycle);
            }
        }
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .children
            .push(child);
        Ok(())
    }

    /// The current children, in order.
    pub fn children(&self) -> Vec<ConventionBuilder> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .children
            .clone()
    }

    fn same_as(&self, other: &CompositeBuilder) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Whether `target` is a (transitive) child of this composite.
    fn reaches(&self, target: &CompositeBuilder) -> bool {
        self.children().iter().any(|child| match child {
            ConventionBuilder::Composite(c) => c.same_as(target) || c.reaches(target),
            ConventionBuilder::Leaf(_) => false,
        })
    }

    /// Caller holds the composition lock.
    fn forward(&self, convention: Convention) {
        let children = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.conventions.push(Arc::clone(&convention));
            state.children.clone()
        };
        for child in &children {
            child.forward(Arc::clone(&convention));
        }
    }

    fn conventions_len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .conventions
            .len()
    }
}

// ---------------------------------------------------------------------------
// ConventionBuilder
// ---------------------------------------------------------------------------

/// A leaf or composite accumulator of conventions.
#[derive(Clone)]
pub enum ConventionBuilder {
    Leaf(LeafBuilder),
    Composite(CompositeBuilder),
}

impl ConventionBuilder {
    /// A new composite over `children`.
    pub fn composite(children: impl IntoIterator<Item = ConventionBuilder>) -> Self {
        ConventionBuilder::Composite(CompositeBuilder::new(children))
    }

    /// Add a convention. A composite forwards it to every current child.
    pub fn add<F>(&self, convention: F) -> &Self
    where
        F: Fn(&mut EndpointBuilder) + Send + Sync + 'static,
    {
        self.add_shared(Arc::new(convention))
    }

    /// Add an already shared convention without re-wrapping it.
    pub fn add_shared(&self, convention: Convention) -> &Self {
        let _guard = composition_lock();
        self.forward(convention);
        self
    }

    fn forward(&self, convention: Convention) {
        match self {
            ConventionBuilder::Leaf(leaf) => leaf.list.push(convention),
            ConventionBuilder::Composite(composite) => composite.forward(convention),
        }
    }

    /// Number of leaves reachable from this builder, counting repeats.
    pub fn leaf_count(&self) -> usize {
        match self {
            ConventionBuilder::Leaf(_) => 1,
            ConventionBuilder::Composite(c) => c.children().iter().map(Self::leaf_count).sum(),
        }
    }

    /// Number of conventions added directly to this builder.
    pub fn conventions_len(&self) -> usize {
        match self {
            ConventionBuilder::Leaf(leaf) => leaf.list.len(),
            ConventionBuilder::Composite(c) => c.conventions_len(),
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeBuilder> {
        match self {
            ConventionBuilder::Composite(c) => Some(c),
            ConventionBuilder::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafBuilder> {
        match self {
            ConventionBuilder::Leaf(l) => Some(l),
            ConventionBuilder::Composite(_) => None,
        }
    }

    // --- common conventions --------------------------------------------------

    /// Mark the endpoint(s) as requiring an authorized caller.
    pub fn require_authorization(&self) -> &Self {
        self.add(|b| b.metadata.push(Metadata::Authorize { policy: None }))
    }

    /// Mark the endpoint(s) as requiring an authorized caller under `policy`.
    pub fn require_authorization_with(&self, policy: impl Into<String>) -> &Self {
        let policy = policy.into();
        self.add(move |b| {
            b.metadata.push(Metadata::Authorize {
                policy: Some(policy.clone()),
            })
        })
    }

    pub fn allow_anonymous(&self) -> &Self {
        self.add(|b| b.metadata.push(Metadata::AllowAnonymous))
    }

    pub fn with_display_name(&self, display_name: impl Into<String>) -> &Self {
        let display_name = display_name.into();
        self.add(move |b| b.display_name = display_name.clone())
    }

    pub fn with_metadata(&self, entry: Metadata) -> &Self {
        self.add(move |b| b.metadata.push(entry.clone()))
    }

    pub fn with_tags<I, S>(&self, tags: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect();
        self.with_metadata(Metadata::Tags { tags })
    }

    pub fn with_custom(&self, key: impl Into<String>, value: serde_json::Value) -> &Self {
        self.with_metadata(Metadata::Custom {
            key: key.into(),
            value,
        })
    }
}

impl fmt::Debug for ConventionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConventionBuilder::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("handle", &leaf.handle)
                .field("conventions", &leaf.list.len())
                .finish(),
            ConventionBuilder::Composite(c) => f
                .debug_struct("Composite")
                .field("conventions", &c.conventions_len())
                .field("children", &c.children())
                .finish(),
        }
    }
}
