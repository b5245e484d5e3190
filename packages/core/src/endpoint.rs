//! Endpoint values: the immutable descriptor produced at discovery time, the
//! mutable metadata bag conventions operate on, and the finalized endpoint
//! handed to the routing engine.
//!
//! # Lifecycle
//!
//! ```text
//! EndpointDescriptor ──seed──▶ EndpointBuilder ──conventions──▶ Endpoint
//!   (immutable)                  (mutable bag)                  (immutable)
//! ```
//!
//! A fresh [`EndpointBuilder`] is seeded from the descriptor on every build,
//! so repeated builds over the same conventions yield identical endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::verb::{HttpVerb, VerbTable};

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// One annotation attached to an endpoint.
///
/// Serialises as an internally tagged object, e.g.
/// `{"kind":"authorize","policy":"admin"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    /// The verbs the endpoint matches. Seeded from the descriptor.
    HttpMethods { methods: Vec<String> },
    /// The endpoint's route name. Seeded from the descriptor.
    EndpointName { name: String },
    /// The endpoint requires an authorized caller, optionally under a named policy.
    Authorize {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        policy: Option<String>,
    },
    /// Overrides any [`Metadata::Authorize`] entry.
    AllowAnonymous,
    /// Free-form grouping labels (e.g. for documentation).
    Tags { tags: Vec<String> },
    /// Application-defined annotation.
    Custom {
        key: String,
        value: serde_json::Value,
    },
}

// ---------------------------------------------------------------------------
// EndpointDescriptor
// ---------------------------------------------------------------------------

/// The immutable description of one discovered endpoint.
///
/// Invariants, checked by [`EndpointDescriptor::new`]: `pattern` is not
/// blank and `verbs` is a non-empty, de-duplicated list of VerbTable tokens.
#[derive(Clone)]
pub struct EndpointDescriptor<H> {
    name: String,
    pattern: String,
    verbs: Vec<&'static str>,
    handler: H,
}

impl<H> EndpointDescriptor<H> {
    /// Build a descriptor, resolving `verbs` through [`VerbTable`].
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        verbs: &[HttpVerb],
        handler: H,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let pattern = pattern.into();

        if pattern.trim().is_empty() {
            return Err(ConfigurationError::MissingPattern { endpoint: name });
        }
        if verbs.is_empty() {
            return Err(ConfigurationError::NoVerbs { endpoint: name });
        }

        let mut tokens: Vec<&'static str> = Vec::with_capacity(verbs.len());
        for verb in verbs {
            for token in VerbTable::resolve(Some(*verb)) {
                if !tokens.contains(token) {
                    tokens.push(*token);
                }
            }
        }

        Ok(Self {
            name,
            pattern,
            verbs: tokens,
            handler,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn verbs(&self) -> &[&'static str] {
        &self.verbs
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// A freshly seeded metadata bag for this descriptor.
    pub(crate) fn seed(&self) -> EndpointBuilder {
        EndpointBuilder {
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            verbs: self.verbs.clone(),
            display_name: format!("{} HTTP: {}", self.pattern, self.verbs.join(", ")),
            metadata: vec![
                Metadata::EndpointName {
                    name: self.name.clone(),
                },
                Metadata::HttpMethods {
                    methods: self.verbs.iter().map(|v| v.to_string()).collect(),
                },
            ],
        }
    }
}

impl<H> fmt::Debug for EndpointDescriptor<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("verbs", &self.verbs)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EndpointBuilder
// ---------------------------------------------------------------------------

/// The mutable metadata bag a convention receives.
///
/// Route identity (name, pattern, verbs) is read-only; conventions may change
/// the display name and the metadata list.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointBuilder {
    name: String,
    pattern: String,
    verbs: Vec<&'static str>,
    /// Human-readable label. Seeded as `"{pattern} HTTP: {verbs}"`.
    pub display_name: String,
    /// Ordered annotations, starting with the seeded name and verb entries.
    pub metadata: Vec<Metadata>,
}

impl EndpointBuilder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn verbs(&self) -> &[&'static str] {
        &self.verbs
    }

    pub(crate) fn build<H>(self, handler: H) -> Endpoint<H> {
        Endpoint {
            name: self.name,
            pattern: self.pattern,
            verbs: self.verbs,
            display_name: self.display_name,
            metadata: self.metadata,
            handler,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A finalized, routable endpoint.
#[derive(Clone)]
pub struct Endpoint<H> {
    name: String,
    pattern: String,
    verbs: Vec<&'static str>,
    display_name: String,
    metadata: Vec<Metadata>,
    handler: H,
}

impl<H> Endpoint<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn verbs(&self) -> &[&'static str] {
        &self.verbs
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// `true` when an [`Metadata::Authorize`] entry is present and no
    /// [`Metadata::AllowAnonymous`] entry overrides it.
    pub fn requires_authorization(&self) -> bool {
        let mut authorize = false;
        for m in &self.metadata {
            match m {
                Metadata::AllowAnonymous => return false,
                Metadata::Authorize { .. } => authorize = true,
                _ => {}
            }
        }
        authorize
    }

    /// Named policies attached through [`Metadata::Authorize`], in order.
    pub fn policies(&self) -> Vec<&str> {
        self.metadata
            .iter()
            .filter_map(|m| match m {
                Metadata::Authorize { policy: Some(p) } => Some(p.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The serialisable summary of this endpoint (handler omitted).
    pub fn describe(&self) -> RouteEntry {
        RouteEntry {
            verbs: self.verbs.iter().map(|v| v.to_string()).collect(),
            pattern: self.pattern.clone(),
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            requires_authorization: self.requires_authorization(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<H> fmt::Debug for Endpoint<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("verbs", &self.verbs)
            .field("display_name", &self.display_name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// One row of the route table, as served for inspection.
///
/// ```json
/// { "verbs": ["GET"], "pattern": "/orders", "name": "GET: list",
///   "display_name": "/orders HTTP: GET", "requires_authorization": false,
///   "metadata": [{ "kind": "endpoint_name", "name": "GET: list" }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub verbs: Vec<String>,
    pub pattern: String,
    pub name: String,
    pub display_name: String,
    pub requires_authorization: bool,
    pub metadata: Vec<Metadata>,
}
