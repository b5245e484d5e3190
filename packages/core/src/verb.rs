//! HTTP verbs accepted in exposure metadata and their wire-level tokens.

use std::fmt;
use std::str::FromStr;

/// The verbs an exposed method can be mapped to.
///
/// Defaults to [`HttpVerb::Get`], so exposure metadata that omits the verb
/// still produces a routable endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpVerb {
    /// Every verb, in table order.
    pub const ALL: [HttpVerb; 5] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Delete,
        HttpVerb::Patch,
    ];

    /// The upper-case wire token for this verb (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
        }
    }
}

/// Formats the verb as its wire token (e.g. `"POST"`).
impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a verb case-insensitively.
///
/// Strict: unknown input is an error. Use [`VerbTable::resolve_token`] for
/// the lenient GET fallback.
impl FromStr for HttpVerb {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpVerb::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown HTTP verb {:?}; expected one of: GET, POST, PUT, DELETE, PATCH",
                    s
                )
            })
    }
}

// Shared so that resolution never allocates.
static GET: [&str; 1] = ["GET"];
static POST: [&str; 1] = ["POST"];
static PUT: [&str; 1] = ["PUT"];
static DELETE: [&str; 1] = ["DELETE"];
static PATCH: [&str; 1] = ["PATCH"];

/// Static mapping from [`HttpVerb`] to the wire tokens an endpoint matches.
pub struct VerbTable;

impl VerbTable {
    /// Resolve a verb to its token set. Total: `None` maps to `["GET"]`.
    pub fn resolve(verb: Option<HttpVerb>) -> &'static [&'static str] {
        match verb.unwrap_or_default() {
            HttpVerb::Get => &GET,
            HttpVerb::Post => &POST,
            HttpVerb::Put => &PUT,
            HttpVerb::Delete => &DELETE,
            HttpVerb::Patch => &PATCH,
        }
    }

    /// Resolve a textual verb. Unrecognized input falls back to `["GET"]`.
    pub fn resolve_token(token: &str) -> &'static [&'static str] {
        Self::resolve(token.parse().ok())
    }
}
