//! Route policy: which paths need an identity token.
//!
//! Paths are secured unless they fall under an open-route pattern. A path is
//! open when it starts with a configured pattern on a segment boundary, so
//! `/auth/login` also opens `/auth/login/otp` but not `/auth/login-internal`.

use std::borrow::Cow;

/// Classifies request paths as open or secured.
pub trait RoutePolicy: Send + Sync {
    /// `false` when `path` is open, `true` when it needs a valid token.
    ///
    /// `path` must already be normalized (see [`normalize_path`]).
    fn is_secured(&self, path: &str) -> bool;
}

/// Allow-list of path prefixes that bypass authentication.
#[derive(Debug, Clone, Default)]
pub struct OpenRoutes {
    patterns: Vec<String>,
}

impl OpenRoutes {
    /// Build from configured patterns. Blank patterns are dropped since an
    /// empty prefix would open every path.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// Configured patterns in order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// First pattern that opens `path`, if any.
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| prefix_matches(p, path))
            .map(String::as_str)
    }
}

/// `pattern` is a prefix of `path` ending on a segment boundary. A pattern
/// ending in `/` opens everything below it.
fn prefix_matches(pattern: &str, path: &str) -> bool {
    path.strip_prefix(pattern)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || pattern.ends_with('/'))
}

impl RoutePolicy for OpenRoutes {
    fn is_secured(&self, path: &str) -> bool {
        self.matching_pattern(path).is_none()
    }
}

/// Canonical form of a request path.
///
/// Collapses repeated slashes and resolves `.` and `..` segments without
/// climbing above the root. Percent-encoded dot segments (`%2e`, `.%2E`,
/// `%2e%2e`, ...) are resolved too, matching how the upstream URL parser
/// treats them. A trailing slash is kept. Returns the input unchanged
/// (borrowed) when it is already canonical.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_normalized(path) {
        return Cow::Borrowed(path);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match dot_segment(segment) {
            Some(DotSegment::Current) => {}
            Some(DotSegment::Parent) => {
                segments.pop();
            }
            None if segment.is_empty() => {}
            None => segments.push(segment),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }

    let trailing = path.ends_with('/')
        || path
            .rsplit('/')
            .next()
            .is_some_and(|last| dot_segment(last).is_some());
    if normalized.is_empty() || trailing {
        normalized.push('/');
    }

    Cow::Owned(normalized)
}

fn is_normalized(path: &str) -> bool {
    if !path.starts_with('/') {
        return false;
    }
    // Skip the leading empty segment; only the final segment may be empty
    let mut segments = path.split('/').skip(1).peekable();
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        if dot_segment(segment).is_some() || (segment.is_empty() && !last) {
            return false;
        }
    }
    true
}

enum DotSegment {
    Current,
    Parent,
}

/// `.` or `..`, literal or with any dot written as `%2e` in either case.
fn dot_segment(segment: &str) -> Option<DotSegment> {
    // "%2e%2e" is the longest spelling
    if segment.is_empty() || segment.len() > 6 {
        return None;
    }
    match segment.to_ascii_lowercase().replace("%2e", ".").as_str() {
        "." => Some(DotSegment::Current),
        ".." => Some(DotSegment::Parent),
        _ => None,
    }
}
