//! Assembles the Axum [`Router`] from an endpoint registry.
//!
//! The registry is snapshotted once. Endpoints sharing a pattern are merged
//! into one [`MethodRouter`], in registration order. Endpoints that require
//! authorization get the bearer-token check in front of their handler.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{Method, Uri},
    response::{IntoResponse, Response},
    routing::{get, MethodFilter, MethodRouter},
    Json, Router,
};
use indexmap::IndexMap;
use tower_http::trace::TraceLayer;

use apimount::{Endpoint, EndpointRegistry, HttpVerb, RouteEntry};

use crate::{
    auth::BearerTokens,
    config::ServerConfig,
    error::{AppError, MountError},
    handler::ApiHandler,
};

/// Path at which the route table is served.
pub const ROUTE_TABLE_PATH: &str = "/_routes";

/// Build the application router for every endpoint in `registry`.
pub fn build_router(
    registry: &EndpointRegistry<ApiHandler>,
    config: &ServerConfig,
) -> Result<Router, MountError> {
    let endpoints = registry.snapshot();
    let tokens = Arc::new(BearerTokens::new(config.tokens.iter().cloned()));

    let mut by_pattern: IndexMap<&str, Vec<&Endpoint<ApiHandler>>> = IndexMap::new();
    let mut mounted = HashSet::new();
    for endpoint in endpoints.iter() {
        validate_pattern(endpoint, config)?;
        for verb in endpoint.verbs() {
            if !mounted.insert((*verb, endpoint.pattern())) {
                return Err(MountError::DuplicateRoute {
                    verb: verb.to_string(),
                    pattern: endpoint.pattern().to_string(),
                });
            }
        }
        by_pattern.entry(endpoint.pattern()).or_default().push(endpoint);
    }
    check_conflicts(by_pattern.keys().copied())?;

    let protected = endpoints.iter().filter(|e| e.requires_authorization()).count();
    if protected > 0 && tokens.is_empty() {
        tracing::warn!(
            protected,
            "endpoints require authorization but no bearer tokens are configured; they will reject every request"
        );
    }

    let mut router = Router::new();
    for (pattern, group) in by_pattern {
        let mut methods = MethodRouter::new();
        for endpoint in group {
            let guard = endpoint
                .requires_authorization()
                .then(|| Arc::clone(&tokens));
            for verb in HttpVerb::ALL {
                if !endpoint.verbs().contains(&verb.as_str()) {
                    continue;
                }
                let handler = endpoint.handler().clone();
                let guard = guard.clone();
                methods = methods.on(method_filter(verb), move |req: Request| {
                    dispatch(handler.clone(), guard.clone(), req)
                });
            }
            tracing::debug!(
                pattern,
                name = endpoint.name(),
                verbs = ?endpoint.verbs(),
                protected = endpoint.requires_authorization(),
                "route mounted"
            );
        }
        router = router.route(pattern, methods);
    }

    if config.route_table {
        let table: Arc<[RouteEntry]> = endpoints.iter().map(Endpoint::describe).collect();
        router = router.route(
            ROUTE_TABLE_PATH,
            get(move || {
                let table = Arc::clone(&table);
                async move { Json(table.to_vec()) }
            }),
        );
    }

    tracing::info!(
        endpoints = endpoints.len(),
        routes = mounted.len(),
        "router built"
    );

    Ok(router
        .fallback(not_found)
        .layer(TraceLayer::new_for_http()))
}

/// Run the authorization check, if any, then the handler.
async fn dispatch(handler: ApiHandler, guard: Option<Arc<BearerTokens>>, req: Request) -> Response {
    if let Some(tokens) = guard {
        if let Err(e) = tokens.authorize(req.headers()) {
            tracing::debug!(path = %req.uri().path(), reason = %e.0, "request rejected");
            return e.into_response();
        }
    }
    handler(req).await
}

async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {method} {}", uri.path()))
}

fn method_filter(verb: HttpVerb) -> MethodFilter {
    match verb {
        HttpVerb::Get => MethodFilter::GET,
        HttpVerb::Post => MethodFilter::POST,
        HttpVerb::Put => MethodFilter::PUT,
        HttpVerb::Delete => MethodFilter::DELETE,
        HttpVerb::Patch => MethodFilter::PATCH,
    }
}

// ---------------------------------------------------------------------------
// Pattern checks
// ---------------------------------------------------------------------------

/// Reject patterns the routing engine would refuse or misread.
fn validate_pattern(endpoint: &Endpoint<ApiHandler>, config: &ServerConfig) -> Result<(), MountError> {
    let pattern = endpoint.pattern();
    let invalid = |reason| MountError::InvalidPattern {
        endpoint: endpoint.name().to_string(),
        pattern: pattern.to_string(),
        reason,
    };

    if !pattern.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if pattern
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(invalid("captures are written as {name} or {*name}"));
    }
    if !captures_well_formed(pattern) {
        return Err(invalid("captures must be balanced, unnested and named"));
    }
    if config.route_table && pattern == ROUTE_TABLE_PATH {
        return Err(invalid("reserved for the route table"));
    }
    Ok(())
}

fn captures_well_formed(pattern: &str) -> bool {
    let mut open: Option<usize> = None;
    for (i, c) in pattern.char_indices() {
        match (c, open) {
            ('{', None) => open = Some(i),
            ('}', Some(start)) => {
                let name = pattern[start + 1..i].trim_start_matches('*');
                if name.is_empty() || name.contains('/') {
                    return false;
                }
                open = None;
            }
            ('{', Some(_)) | ('}', None) => return false,
            _ => {}
        }
    }
    open.is_none()
}

/// `{name}` becomes `{}` and `{*name}` becomes `{*}`.
fn segment_shape(segment: &str) -> String {
    let mut shape = String::with_capacity(segment.len());
    let mut in_capture = false;
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                in_capture = true;
                shape.push('{');
                if chars.peek() == Some(&'*') {
                    shape.push('*');
                }
            }
            '}' => {
                in_capture = false;
                shape.push('}');
            }
            _ if in_capture => {}
            _ => shape.push(c),
        }
    }
    shape
}

/// Two patterns collide when, at the first segment where they differ, both
/// segments have the same shape: the same capture position under different
/// names.
fn captures_collide(a: &str, b: &str) -> bool {
    a.split('/')
        .zip(b.split('/'))
        .find(|(x, y)| x != y)
        .is_some_and(|(x, y)| segment_shape(x) == segment_shape(y))
}

/// Reject distinct patterns the routing engine cannot hold side by side.
fn check_conflicts<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<(), MountError> {
    let mut seen: Vec<&str> = Vec::new();
    for pattern in patterns {
        if let Some(existing) = seen.iter().find(|other| captures_collide(pattern, other)) {
            return Err(MountError::ConflictingPattern {
                pattern: pattern.to_string(),
                existing: existing.to_string(),
            });
        }
        seen.push(pattern);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
