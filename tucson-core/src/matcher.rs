use std::sync::Arc;

use http::Method;

use crate::config::ConfigError;
use crate::origin::{Origin, OriginRegistry};

/// Methods a matcher rule forwards. Other methods on a matched path get 405.
pub const PROXIED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

/// A routing pattern: literal segments, `{name}` placeholders and an
/// optional trailing `*` wildcard.
///
/// `/api/*` matches `/api/` and `/api/users/7` but not `/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    /// Prefix the remainder of the path must start with, when the pattern
    /// ends in `*`.
    wildcard: Option<String>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw == "*" {
            return Ok(Self {
                raw: raw.to_string(),
                segments: Vec::new(),
                wildcard: Some(String::new()),
            });
        }
        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let parts: Vec<&str> = raw[1..].split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        let mut wildcard = None;

        for (i, part) in parts.iter().enumerate() {
            if let Some(prefix) = part.strip_suffix('*') {
                if i != last {
                    return Err(invalid("'*' is only allowed at the end"));
                }
                if prefix.contains(['*', '{', '}']) {
                    return Err(invalid("malformed wildcard segment"));
                }
                wildcard = Some(prefix.to_string());
            } else if part.contains('*') {
                return Err(invalid("'*' is only allowed at the end"));
            } else if part.starts_with('{') && part.ends_with('}') && part.len() > 2 {
                if part.contains(':') {
                    return Err(invalid("regex placeholders are not supported"));
                }
                segments.push(Segment::Param);
            } else if part.contains(['{', '}']) {
                return Err(invalid("malformed placeholder"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            wildcard,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.raw == "*" {
            return true;
        }
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        let parts: Vec<&str> = rest.split('/').collect();

        match &self.wildcard {
            None => {
                parts.len() == self.segments.len()
                    && self.segments.iter().zip(&parts).all(|(s, p)| segment_matches(s, p))
            }
            Some(prefix) => {
                let fixed = self.segments.len();
                if parts.len() <= fixed {
                    return false;
                }
                if !self.segments.iter().zip(&parts).all(|(s, p)| segment_matches(s, p)) {
                    return false;
                }
                parts[fixed..].join("/").starts_with(prefix.as_str())
            }
        }
    }
}

fn segment_matches(segment: &Segment, part: &str) -> bool {
    match segment {
        Segment::Literal(lit) => lit == part,
        Segment::Param => !part.is_empty(),
    }
}

/// Whether `path` has a `.` or `..` segment, literal or percent-encoded.
///
/// URL parsing resolves such segments, so the backend would see a different
/// path than the one the matchers checked.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// One routing rule: requests whose path matches go to `origin`.
#[derive(Debug, Clone)]
pub struct Matcher {
    pub pattern: PathPattern,
    pub origin: String,
}

impl Matcher {
    pub fn new(path: &str, origin: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: PathPattern::parse(path)?,
            origin: origin.into(),
        })
    }
}

/// Outcome of resolving a request path.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A matcher rule claimed the path.
    Matched {
        rule: &'a Matcher,
        origin: &'a Arc<Origin>,
    },
    /// No rule claimed the path; the default origin serves it.
    Default(&'a Arc<Origin>),
}

impl<'a> Resolution<'a> {
    pub fn origin(&self) -> &'a Arc<Origin> {
        match self {
            Resolution::Matched { origin, .. } => origin,
            Resolution::Default(origin) => origin,
        }
    }

    /// Whether `method` may be forwarded under this resolution.
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            Resolution::Matched { .. } => PROXIED_METHODS.contains(method),
            Resolution::Default(_) => true,
        }
    }
}

/// Ordered matcher rules. The first rule whose pattern matches wins.
#[derive(Debug, Clone, Default)]
pub struct MatcherTable {
    rules: Vec<Matcher>,
}

impl MatcherTable {
    pub fn new(rules: Vec<Matcher>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Matcher] {
        &self.rules
    }

    /// Pick the origin for `path`.
    ///
    /// Rules naming an origin the registry does not know never match.
    pub fn resolve<'a>(&'a self, path: &str, registry: &'a OriginRegistry) -> Resolution<'a> {
        for rule in &self.rules {
            if !rule.pattern.matches(path) {
                continue;
            }
            match registry.get(&rule.origin) {
                Some(origin) => return Resolution::Matched { rule, origin },
                None => {
                    tracing::warn!(
                        path = rule.pattern.as_str(),
                        origin = %rule.origin,
                        "Matcher refers to unknown origin, skipping"
                    );
                }
            }
        }
        Resolution::Default(registry.default_origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OriginSettings;

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    fn registry() -> OriginRegistry {
        let origin = |name: &str| {
            Origin::from_settings(
                name,
                &OriginSettings {
                    url: format!("http://{name}"),
                    ..Default::default()
                },
            )
            .unwrap()
        };
        OriginRegistry::new(vec![origin("default"), origin("api"), origin("static")], "default")
            .unwrap()
    }

    #[test]
    fn literal_pattern_is_exact() {
        let p = pattern("/healthz");
        assert!(p.matches("/healthz"));
        assert!(!p.matches("/healthz/"));
        assert!(!p.matches("/healthz/x"));
        assert!(!p.matches("/health"));
    }

    #[test]
    fn root_pattern() {
        let p = pattern("/");
        assert!(p.matches("/"));
        assert!(!p.matches("/a"));
    }

    #[test]
    fn placeholder_matches_one_segment() {
        let p = pattern("/users/{id}/profile");
        assert!(p.matches("/users/42/profile"));
        assert!(!p.matches("/users//profile"));
        assert!(!p.matches("/users/42/43/profile"));
    }

    #[test]
    fn trailing_wildcard_requires_separator() {
        let p = pattern("/api/*");
        assert!(p.matches("/api/"));
        assert!(p.matches("/api/users/7"));
        assert!(!p.matches("/api"));
        assert!(!p.matches("/apix/users"));
    }

    #[test]
    fn wildcard_with_prefix_segment() {
        let p = pattern("/static/app*");
        assert!(p.matches("/static/app.js"));
        assert!(p.matches("/static/app/v2/main.css"));
        assert!(!p.matches("/static/vendor.js"));
    }

    #[test]
    fn star_alone_matches_everything() {
        let p = pattern("*");
        assert!(p.matches("/"));
        assert!(p.matches("/anything/at/all"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(PathPattern::parse("api").is_err());
        assert!(PathPattern::parse("/a/*/b").is_err());
        assert!(PathPattern::parse("/a/{id").is_err());
    }

    #[test]
    fn rejects_regex_placeholders() {
        let err = PathPattern::parse("/users/{id:[0-9]+}").unwrap_err();
        assert!(err.to_string().contains("regex placeholders"));
    }

    #[test]
    fn detects_dot_segments() {
        assert!(has_dot_segment("/x/../private/secret"));
        assert!(has_dot_segment("/x/%2e%2e/private/secret"));
        assert!(has_dot_segment("/x/%2E./private"));
        assert!(has_dot_segment("/./private"));
        assert!(has_dot_segment("/x/..\\private"));
        assert!(has_dot_segment("/x/.."));
        assert!(!has_dot_segment("/"));
        assert!(!has_dot_segment("/static/app.js"));
        assert!(!has_dot_segment("/files/..hidden/a...b"));
        assert!(!has_dot_segment("/v1.2/%2e%2ex"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = MatcherTable::new(vec![
            Matcher::new("/api/*", "api").unwrap(),
            Matcher::new("/api/static/*", "static").unwrap(),
        ]);
        let registry = registry();

        match table.resolve("/api/static/logo.png", &registry) {
            Resolution::Matched { rule, origin } => {
                assert_eq!(rule.origin, "api");
                assert_eq!(origin.name, "api");
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn unknown_origin_falls_through() {
        let table = MatcherTable::new(vec![
            Matcher::new("/api/*", "ghost").unwrap(),
            Matcher::new("/api/*", "api").unwrap(),
        ]);
        let registry = registry();

        assert_eq!(table.resolve("/api/x", &registry).origin().name, "api");
    }

    #[test]
    fn unmatched_path_uses_default() {
        let table = MatcherTable::new(vec![Matcher::new("/api/*", "api").unwrap()]);
        let registry = registry();

        let resolution = table.resolve("/index.html", &registry);
        assert!(matches!(resolution, Resolution::Default(_)));
        assert_eq!(resolution.origin().name, "default");
        assert!(resolution.allows(&Method::OPTIONS));
    }

    #[test]
    fn matched_rule_limits_methods() {
        let table = MatcherTable::new(vec![Matcher::new("/api/*", "api").unwrap()]);
        let registry = registry();

        let resolution = table.resolve("/api/x", &registry);
        assert!(resolution.allows(&Method::PATCH));
        assert!(!resolution.allows(&Method::HEAD));
        assert!(!resolution.allows(&Method::OPTIONS));
    }
}
