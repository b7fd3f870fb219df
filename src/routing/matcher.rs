//! Path matching logic.
//!
//! # Responsibilities
//! - Parse endpoint URIs into segment patterns (`/accounts/{id}`)
//! - Match request paths against patterns, capturing parameters
//! - Order candidate routes so that the winner is deterministic
//!
//! # Design Decisions
//! - Exact string match is tried before any pattern match
//! - A `{name}` segment matches exactly one non-empty request segment
//! - Segment counts must be equal; there are no wildcards or prefixes
//! - Paths are case-sensitive
//! - No regex, matching is a linear scan over pre-sorted routes
//!
//! # Precedence
//! When several patterns match the same path the first of these wins:
//! 1. more leading literal segments (`/accounts/me` over `/accounts/{id}`)
//! 2. more literal segments overall
//! 3. lexical order of the pattern text
//! 4. lexical order of the operation name

use std::cmp::Ordering;
use std::collections::BTreeMap;

use axum::http::Method;

use crate::config::schema::EndpointDefinition;

/// Error raised while parsing an endpoint URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("path must start with '/'")]
    MissingLeadingSlash,

    #[error("segment {0:?} mixes literal text and parameter braces")]
    MalformedSegment(String),

    #[error("parameter name is empty")]
    EmptyParameter,

    #[error("parameter {0} appears more than once")]
    DuplicateParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

/// Compiled form of an endpoint URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let mut segments = Vec::new();
        let mut seen = Vec::new();
        for part in raw.split('/') {
            let is_param = part.len() >= 2 && part.starts_with('{') && part.ends_with('}');
            if is_param {
                let name = &part[1..part.len() - 1];
                if name.is_empty() {
                    return Err(PatternError::EmptyParameter);
                }
                if name.contains(['{', '}']) {
                    return Err(PatternError::MalformedSegment(part.to_string()));
                }
                if seen.contains(&name) {
                    return Err(PatternError::DuplicateParameter(name.to_string()));
                }
                seen.push(name);
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(PatternError::MalformedSegment(part.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern has no parameters.
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(Segment::is_literal)
    }

    pub fn leading_literals(&self) -> usize {
        self.segments.iter().take_while(|s| s.is_literal()).count()
    }

    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_literal()).count()
    }

    /// Match `path` segment by segment, returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() || is_dot_segment(part) => return None,
                Segment::Param(name) => params.push(name, part),
            }
        }
        Some(params)
    }

    /// Substitute parameters back into the pattern.
    ///
    /// Parameters missing from `params` are left as `{name}`.
    pub fn render(&self, params: &PathParams) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal.clone(),
                Segment::Param(name) => params
                    .get(name)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{{{name}}}")),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Precedence between two patterns; `Less` means `self` is tried first.
    fn precedence(&self, other: &Self) -> Ordering {
        other
            .leading_literals()
            .cmp(&self.leading_literals())
            .then_with(|| other.literal_count().cmp(&self.literal_count()))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

/// `.` or `..`, literally or percent-encoded. A parameter never captures
/// one, so a rendered path cannot climb out of its endpoint.
fn is_dot_segment(part: &str) -> bool {
    let decoded = part.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Parameters captured from a request path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Error from route table construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("endpoint {operation} has invalid uri {uri:?}: {source}")]
    Pattern {
        operation: String,
        uri: String,
        #[source]
        source: PatternError,
    },

    #[error("endpoint {operation} has invalid method {method:?}")]
    Method { operation: String, method: String },
}

/// Why a path could not be matched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("no endpoint is configured for this path")]
    NoRoute,

    #[error("method {method} is not configured for this path (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed { method: Method, allowed: Vec<String> },
}

/// One operation bound to a method and pattern.
#[derive(Debug, Clone)]
pub struct Route {
    pub operation: String,
    pub method: Method,
    pub pattern: PathPattern,
}

/// Result of a successful match.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

/// Routes of one service, sorted by precedence.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(endpoints: &BTreeMap<String, EndpointDefinition>) -> Result<Self, RouteError> {
        let mut routes = Vec::with_capacity(endpoints.len());
        for (operation, endpoint) in endpoints {
            let pattern = PathPattern::parse(&endpoint.uri).map_err(|source| RouteError::Pattern {
                operation: operation.clone(),
                uri: endpoint.uri.clone(),
                source,
            })?;
            let method = parse_method(&endpoint.method).ok_or_else(|| RouteError::Method {
                operation: operation.clone(),
                method: endpoint.method.clone(),
            })?;
            routes.push(Route {
                operation: operation.clone(),
                method,
                pattern,
            });
        }

        routes.sort_by(|a, b| {
            a.pattern
                .precedence(&b.pattern)
                .then_with(|| a.operation.cmp(&b.operation))
        });

        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the route for `path` and `method`.
    pub fn match_path(&self, path: &str, method: &Method) -> Result<RouteMatch<'_>, MatchError> {
        let mut allowed: Vec<String> = Vec::new();

        // Exact textual match first.
        for route in self.routes.iter().filter(|r| r.pattern.as_str() == path) {
            if &route.method == method {
                return Ok(RouteMatch {
                    route,
                    params: PathParams::default(),
                });
            }
            allowed.push(route.method.to_string());
        }

        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                if &route.method == method {
                    return Ok(RouteMatch { route, params });
                }
                allowed.push(route.method.to_string());
            }
        }

        if allowed.is_empty() {
            Err(MatchError::NoRoute)
        } else {
            allowed.sort();
            allowed.dedup();
            Err(MatchError::MethodNotAllowed {
                method: method.clone(),
                allowed,
            })
        }
    }

    /// Look a route up by operation identifier.
    pub fn by_operation(&self, operation: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.operation == operation)
    }
}

/// Methods an endpoint may be configured with.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Parse a configured method name (case-insensitive) into a supported method.
pub fn parse_method(method: &str) -> Option<Method> {
    let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).ok()?;
    SUPPORTED_METHODS.contains(&method).then_some(method)
}
