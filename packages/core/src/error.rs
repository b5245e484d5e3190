//! Registration error taxonomy.
//!
//! Every failure surfaces at registration time, before any request is served.
//! The three arms keep caller mistakes ([`PreconditionError`]), bad
//! declarative setup ([`ConfigurationError`]) and illegal builder graphs
//! ([`CompositionError`]) distinguishable.

use thiserror::Error;

/// A required argument was absent or blank at the call site.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("api name must not be empty")]
    EmptyApiName,

    #[error("exposed method on api {api:?} has an empty method name")]
    EmptyMethodName { api: String },
}

/// The declared setup cannot produce a routable endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("endpoint {endpoint:?} has no route pattern; a pattern must be declared explicitly")]
    MissingPattern { endpoint: String },

    #[error("endpoint {endpoint:?} declares no HTTP verbs")]
    NoVerbs { endpoint: String },

    #[error("the api module must be configured before any api is added")]
    ModuleNotConfigured,

    #[error("route {verb} {pattern} is already registered")]
    DuplicateRoute { verb: String, pattern: String },
}

/// A convention builder composition would create a cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompositionError {
    #[error("a composite convention builder cannot wrap itself, directly or transitively")]
    Cycle,
}

/// Any failure of a registration operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("precondition violated: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("invalid composition: {0}")]
    Composition(#[from] CompositionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_part() {
        let e: RegistrationError = ConfigurationError::DuplicateRoute {
            verb: "GET".into(),
            pattern: "/orders".into(),
        }
        .into();
        assert_eq!(
            e.to_string(),
            "configuration error: route GET /orders is already registered"
        );

        let e: RegistrationError = PreconditionError::EmptyApiName.into();
        assert!(e.to_string().starts_with("precondition violated"));
    }
}
