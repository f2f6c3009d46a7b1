//! Route pattern matching
//!
//! [`RouteMatcher`] keeps the set of registered route patterns and answers the
//! two questions the router asks about a URL: does *any* pattern match it
//! ([`RouteMatcher::test`]), and which of a given subset matches it, with what
//! parameters ([`RouteMatcher::parse`]).
//!
//! Patterns are path templates:
//! - `/measurement` -> static segments
//! - `/measurement/:id` -> named parameter
//! - `/measurement/:id<\d+>` -> constrained parameter
//! - `/files/*` -> wildcard tail
//!
//! URLs are reduced to their path before matching (see
//! [`RouteMatcher::clean_route`]), so scheme, host, query and fragment never
//! take part in a match. Empty segments are ignored, which makes `/foo` and
//! `/foo/` equivalent.

#[cfg(feature = "cache")]
use crate::cache::MatchCache;
use crate::params::{QueryParams, RouteParams};
use crate::trace_log;
use std::collections::HashMap;

/// A compiled route pattern with segments and priority
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePattern {
    /// Pattern source as registered
    pub source: String,
    /// Pattern segments
    pub segments: Vec<Segment>,
    /// Matching priority (higher = tried first)
    pub priority: u8,
}

impl RoutePattern {
    /// Compile a pattern string
    ///
    /// Examples:
    /// - "/measurement" -> static segments, priority 100
    /// - "/measurement/:id" -> one parameter, priority 90
    /// - "/files/*" -> wildcard, priority 0
    pub fn from_path(path: &str) -> Self {
        let segments: Vec<Segment> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();

        let priority = Self::calculate_priority(&segments);

        Self {
            source: path.to_string(),
            segments,
            priority,
        }
    }

    fn calculate_priority(segments: &[Segment]) -> u8 {
        let mut priority: u8 = 100;

        for segment in segments {
            match segment {
                Segment::Static(_) => {}
                Segment::Param { .. } => {
                    priority = priority.saturating_sub(10);
                }
                Segment::Wildcard => return 0,
            }
        }

        priority
    }

    /// Match this pattern against a cleaned path
    ///
    /// Returns extracted parameters if matched
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = HashMap::new();
        let mut path_idx = 0;

        for segment in &self.segments {
            match segment {
                Segment::Static(expected) => {
                    if path_segments.get(path_idx) != Some(&expected.as_str()) {
                        return None;
                    }
                    path_idx += 1;
                }
                Segment::Param { name, constraint } => {
                    let value = path_segments.get(path_idx)?;

                    if let Some(constraint) = constraint {
                        if !constraint.validate(value) {
                            return None;
                        }
                    }

                    params.insert(name.clone(), (*value).to_string());
                    path_idx += 1;
                }
                Segment::Wildcard => return Some(params),
            }
        }

        // Every path segment must be consumed
        (path_idx == path_segments.len()).then_some(params)
    }
}

/// A single segment in a route pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Static text that must match exactly
    Static(String),
    /// Parameter that captures one path segment
    Param {
        name: String,
        constraint: Option<Constraint>,
    },
    /// Matches the rest of the path
    Wildcard,
}

impl Segment {
    /// Parse a segment from string
    ///
    /// - "users" -> Static("users")
    /// - ":id" -> Param { name: "id", constraint: None }
    /// - ":id<\\d+>" -> Param { name: "id", constraint: Some(Numeric) }
    /// - "*" -> Wildcard
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            return Segment::Wildcard;
        }

        let Some(rest) = s.strip_prefix(':') else {
            return Segment::Static(s.to_string());
        };

        match (rest.find('<'), rest.ends_with('>')) {
            (Some(pos), true) => Segment::Param {
                name: rest[..pos].to_string(),
                constraint: Some(Constraint::parse(&rest[pos + 1..rest.len() - 1])),
            },
            _ => Segment::Param {
                name: rest.to_string(),
                constraint: None,
            },
        }
    }
}

/// Constraint for validating parameter values
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// ASCII digits only (`\d+`)
    Numeric,
    /// ASCII letters only (`alpha`)
    Alpha,
    /// 8-4-4-4-12 hex UUID (`uuid`)
    Uuid,
    /// Unknown constraint, accepts any value
    Any(String),
}

impl Constraint {
    fn parse(s: &str) -> Self {
        match s {
            "\\d+" | "int" => Constraint::Numeric,
            "alpha" => Constraint::Alpha,
            "uuid" => Constraint::Uuid,
            other => Constraint::Any(other.to_string()),
        }
    }

    /// Validate a value against this constraint
    pub fn validate(&self, value: &str) -> bool {
        match self {
            Constraint::Numeric => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
            Constraint::Alpha => {
                !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
            }
            Constraint::Uuid => {
                let parts: Vec<&str> = value.split('-').collect();
                parts.len() == 5
                    && parts
                        .iter()
                        .zip([8, 4, 4, 4, 12])
                        .all(|(p, len)| p.len() == len && p.chars().all(|c| c.is_ascii_hexdigit()))
            }
            Constraint::Any(_) => true,
        }
    }
}

// ============================================================================
// Route Request
// ============================================================================

/// Result of parsing a URL against a set of patterns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequest {
    /// Whether any of the candidate patterns matched
    pub matched: bool,
    /// The pattern that matched (empty when unmatched)
    pub route: String,
    /// The cleaned path that was matched
    pub uri: String,
    /// Named parameters captured by the pattern
    pub params: RouteParams,
    /// Decoded query string of the URL
    pub query: QueryParams,
}

impl RouteRequest {
    /// An unmatched parse result for `url`
    pub fn unmatched(url: &str) -> Self {
        Self {
            matched: false,
            route: String::new(),
            uri: RouteMatcher::clean_route(url),
            params: RouteParams::new(),
            query: query_of(url),
        }
    }
}

fn query_of(url: &str) -> QueryParams {
    let without_fragment = url.split('#').next().unwrap_or_default();
    without_fragment
        .split_once('?')
        .map(|(_, query)| QueryParams::from_query_string(query))
        .unwrap_or_default()
}

// ============================================================================
// Route Matcher
// ============================================================================

/// Registry of route patterns
#[derive(Debug, Default)]
pub struct RouteMatcher {
    /// Patterns in registration order
    routes: Vec<String>,
    compiled: HashMap<String, RoutePattern>,
    #[cfg(feature = "cache")]
    cache: MatchCache,
}

impl RouteMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register patterns
    ///
    /// Patterns already known are skipped, so registering the same pattern
    /// for several callbacks keeps one entry.
    pub fn configure<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in patterns {
            let pattern = pattern.into();
            if self.compiled.contains_key(&pattern) {
                continue;
            }
            trace_log!("registering route pattern '{}'", pattern);
            self.compiled
                .insert(pattern.clone(), RoutePattern::from_path(&pattern));
            self.routes.push(pattern);
        }
    }

    /// Check whether `url` matches any registered pattern
    pub fn test(&mut self, url: &str) -> bool {
        let routes = self.routes.clone();
        self.parse(url, &routes).matched
    }

    /// Parse `url` against `patterns`
    ///
    /// Patterns are tried by descending priority (static before dynamic
    /// before wildcard); ties keep the order given. Unknown patterns are
    /// compiled on the fly without being registered.
    pub fn parse(&mut self, url: &str, patterns: &[String]) -> RouteRequest {
        let uri = Self::clean_route(url);

        let mut candidates: Vec<RoutePattern> = patterns
            .iter()
            .map(|p| {
                self.compiled
                    .get(p)
                    .cloned()
                    .unwrap_or_else(|| RoutePattern::from_path(p))
            })
            .collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

        for pattern in &candidates {
            if let Some(params) = self.match_pattern(pattern, &uri) {
                return RouteRequest {
                    matched: true,
                    route: pattern.source.clone(),
                    uri,
                    params: RouteParams::from_map(params),
                    query: query_of(url),
                };
            }
        }

        RouteRequest::unmatched(url)
    }

    #[cfg(feature = "cache")]
    fn match_pattern(&mut self, pattern: &RoutePattern, uri: &str) -> Option<HashMap<String, String>> {
        if let Some(hit) = self.cache.get(&pattern.source, uri) {
            return hit;
        }
        let result = pattern.matches(uri);
        self.cache.insert(&pattern.source, uri, result.clone());
        result
    }

    #[cfg(not(feature = "cache"))]
    fn match_pattern(&mut self, pattern: &RoutePattern, uri: &str) -> Option<HashMap<String, String>> {
        pattern.matches(uri)
    }

    /// Registered patterns in registration order
    pub fn list_routes(&self) -> &[String] {
        &self.routes
    }

    /// Reduce a URL to the route string used for matching
    ///
    /// Scheme, host, query and fragment are stripped:
    /// `http://example.com/foo/?a=1#top` -> `/foo/`.
    pub fn clean_route(url: &str) -> String {
        let path = match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        }
    }

    /// Match memoization statistics
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> &crate::cache::CacheStats {
        self.cache.stats()
    }
}
