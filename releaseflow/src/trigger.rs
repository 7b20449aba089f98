//! Trigger matching for pushed references.
//!
//! A [`TriggerRule`] pairs a reference namespace (`refs/tags`) with a glob
//! pattern evaluated against the part of the reference after the namespace.

use crate::errors::TriggerRuleError;
use regex::Regex;
use std::fmt;

/// Default namespace for release tags.
pub const DEFAULT_NAMESPACE: &str = "refs/tags";

/// Default tag pattern.
pub const DEFAULT_PATTERN: &str = "v*";

/// An immutable, compiled trigger rule.
#[derive(Clone)]
pub struct TriggerRule {
    namespace: String,
    pattern: String,
    matcher: Regex,
}

impl TriggerRule {
    /// Creates a rule for the given namespace and glob pattern.
    ///
    /// The namespace is normalized to end with a `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or cannot be compiled.
    pub fn new(
        namespace: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, TriggerRuleError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(TriggerRuleError::EmptyPattern);
        }

        let mut namespace = namespace.into();
        if !namespace.ends_with('/') {
            namespace.push('/');
        }

        let matcher = Regex::new(&glob_to_regex(&pattern)).map_err(|e| {
            TriggerRuleError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            namespace,
            pattern,
            matcher,
        })
    }

    /// Creates a rule matching tags under `refs/tags/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or cannot be compiled.
    pub fn tags(pattern: impl Into<String>) -> Result<Self, TriggerRuleError> {
        Self::new(DEFAULT_NAMESPACE, pattern)
    }

    /// The namespace prefix, always ending in `/`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The glob pattern as written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Strips the namespace from a reference.
    #[must_use]
    pub fn tag_name<'a>(&self, git_ref: &'a str) -> Option<&'a str> {
        git_ref.strip_prefix(self.namespace.as_str())
    }

    /// Returns true if the reference is a release-qualifying tag.
    #[must_use]
    pub fn matches(&self, git_ref: &str) -> bool {
        match self.tag_name(git_ref) {
            Some(tag) if !tag.is_empty() => self.matcher.is_match(tag),
            _ => false,
        }
    }
}

impl fmt::Debug for TriggerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRule")
            .field("namespace", &self.namespace)
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl PartialEq for TriggerRule {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.pattern == other.pattern
    }
}

/// Returns true if `git_ref` qualifies under `rule`.
#[must_use]
pub fn matches(git_ref: &str, rule: &TriggerRule) -> bool {
    rule.matches(git_ref)
}

/// Translates a glob into an anchored regex.
///
/// `*` matches any run of characters, `?` one character and `[...]` a class
/// (`!` or `^` negates). Everything else is literal.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from(r"\A");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push('[');
                    let mut j = i + 1;
                    if matches!(chars[j], '!' | '^') {
                        out.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if matches!(c, '\\' | '[' | ']' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push(']');
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    out.push_str(r"\z");
    out
}

/// Finds the `]` closing a class opened at `start`; a `]` right after the
/// opening (or after the negation) is a literal member.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if j < chars.len() && matches!(chars[j], '!' | '^') {
        j += 1;
    }
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    chars[j.min(chars.len())..]
        .iter()
        .position(|&c| c == ']')
        .map(|p| j + p)
}
