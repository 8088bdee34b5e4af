//! Function-name patterns used by configurable sniffs
//!
//! - `eval` matches a global function exactly
//! - `mysql_*` matches by prefix, `*_unsafe` by suffix
//! - `\Vendor\Pkg\helper` matches one namespaced function
//!
//! Matching is case-insensitive, as PHP function names are.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    /// Fully qualified name without the leading backslash
    Namespaced(String),
}

impl Pattern {
    /// Whether a called function name matches.
    ///
    /// `name` is the name as written at the call site; a leading `\` marks
    /// the global namespace.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let qualified = name.strip_prefix('\\').unwrap_or(&name);

        match self {
            Pattern::Namespaced(full) => qualified == full,
            _ if qualified.contains('\\') => false,
            Pattern::Exact(exact) => qualified == exact,
            Pattern::Prefix(prefix) => qualified.starts_with(prefix.as_str()),
            Pattern::Suffix(suffix) => qualified.ends_with(suffix.as_str()),
        }
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
}

impl FromStr for Pattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: s.to_string(),
            reason: reason.to_string(),
        };

        if let Some(qualified) = raw.strip_prefix('\\').filter(|q| q.contains('\\')) {
            if !qualified.split('\\').all(is_name) {
                return Err(invalid("namespace segments must be plain names"));
            }
            return Ok(Pattern::Namespaced(qualified.to_string()));
        }
        let raw = raw.trim_start_matches('\\');
        if raw.contains('\\') {
            return Err(invalid("namespaced patterns must start with '\\'"));
        }

        let (pattern, body) = if let Some(prefix) = raw.strip_suffix('*') {
            (Pattern::Prefix(prefix.to_string()), prefix)
        } else if let Some(suffix) = raw.strip_prefix('*') {
            (Pattern::Suffix(suffix.to_string()), suffix)
        } else {
            (Pattern::Exact(raw.to_string()), raw)
        };

        if body.is_empty() {
            return Err(invalid("pattern matches nothing or everything"));
        }
        if body.contains('*') {
            return Err(invalid("only a single leading or trailing '*' is allowed"));
        }
        if !body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
        {
            return Err(invalid("only letters, digits and '_' are allowed"));
        }
        if matches!(pattern, Pattern::Exact(_)) && !is_name(body) {
            return Err(invalid("function names cannot start with a digit"));
        }
        Ok(pattern)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(name) => write!(f, "{name}"),
            Pattern::Prefix(prefix) => write!(f, "{prefix}*"),
            Pattern::Suffix(suffix) => write!(f, "*{suffix}"),
            Pattern::Namespaced(full) => write!(f, "\\{full}"),
        }
    }
}

/// First pattern matching `name`, if any
pub fn first_match<'p>(patterns: &'p [Pattern], name: &str) -> Option<&'p Pattern> {
    patterns.iter().find(|p| p.matches(name))
}
