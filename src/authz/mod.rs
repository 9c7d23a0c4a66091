//! Rule matching and effect resolution.
//!
//! Evaluation is a two-step pipeline:
//! 1. A [`RuleMatcher`] selects the rules of a policy that apply to the
//!    request (subject, resource, action, context)
//! 2. An [`EffectResolver`] reduces the matched rules to a single effect
//!
//! [`PolicyEvaluator`] composes the two. Nothing in this module holds
//! mutable state; evaluators can be shared freely across threads.

mod engine;
mod matcher;
mod resolver;

pub use engine::{AuditConfig, Decision, PolicyEvaluator};
pub use matcher::RuleMatcher;
pub use resolver::EffectResolver;

/// Match a glob pattern against a value.
///
/// Supports:
/// - `*` matches any run of characters, including none
/// - `?` matches exactly one character
/// - any other character matches itself (case-sensitive)
///
/// # Examples
///
/// ```ignore
/// assert!(pattern_matches("*", "anything"));
/// assert!(pattern_matches("document:*", "document:123"));
/// assert!(pattern_matches("user:?", "user:7"));
/// assert!(!pattern_matches("document:*", "report:1"));
/// assert!(pattern_matches("team", "team"));
/// assert!(!pattern_matches("team", "teams"));
/// ```
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !is_glob(pattern) {
        return pattern == value;
    }
    if let Some(prefix) = pattern.strip_suffix('*')
        && !is_glob(prefix)
    {
        return value.starts_with(prefix);
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    wildcard_match(&pattern, &value)
}

/// Whether a pattern contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Iterative matcher that backtracks only to the most recent `*`.
fn wildcard_match(pattern: &[char], value: &[char]) -> bool {
    let (mut p, mut v) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some('?') => {
                p += 1;
                v += 1;
            }
            Some('*') => {
                star = Some((p, v));
                p += 1;
            }
            Some(c) if *c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match star {
                Some((star_p, star_v)) => {
                    p = star_p + 1;
                    v = star_v + 1;
                    star = Some((star_p, star_v + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
