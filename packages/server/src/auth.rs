//! Bearer-token authorization for endpoints that require it.
//!
//! The router wraps every endpoint whose metadata requires authorization in
//! a check against [`BearerTokens`]. The check reads the
//! `Authorization: Bearer <token>` header and rejects the request with 401
//! before the handler runs when the token is absent or unknown.

use std::collections::HashSet;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;

// ---------------------------------------------------------------------------
// Auth errors
// ---------------------------------------------------------------------------

/// An authorization failure that maps to HTTP 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError(pub String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new("unauthorized", self.0);
        let mut resp = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        resp
    }
}

// ---------------------------------------------------------------------------
// BearerTokens
// ---------------------------------------------------------------------------

/// The set of bearer tokens accepted by protected endpoints.
#[derive(Debug, Clone, Default)]
pub struct BearerTokens {
    tokens: HashSet<String>,
}

impl BearerTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Accept the request if it carries one of the configured tokens.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AuthError("missing Authorization header".into()))?;
        let value = value
            .to_str()
            .map_err(|_| AuthError("Authorization header is not valid UTF-8".into()))?;
        let token = bearer_token(value)
            .ok_or_else(|| AuthError("Authorization header must use the Bearer scheme".into()))?;

        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(AuthError("bearer token not recognised".into()))
        }
    }
}

/// The token of a `Bearer <token>` credential. The scheme is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
