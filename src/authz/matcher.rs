//! Rule matching strategies.

use serde::{Deserialize, Serialize};

use super::pattern_matches;
use crate::models::{Action, Context, PolicyRule, Resource, Subject};

/// Strategy deciding whether a rule applies to a concrete request.
///
/// Every strategy additionally requires the rule's domain (if any) to match
/// the context and its condition (if any) to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleMatcher {
    /// Glob match on subject id, resource id and action name.
    #[default]
    Acl,
    /// Subject pattern matched against the subject's roles; resource pattern
    /// against the resource id or type.
    Rbac,
    /// As `Acl`, with subject and resource attributes exposed to conditions.
    Abac,
    /// Resource pattern is an HTTP path template, action an HTTP method list.
    Restful,
    /// `Acl` matching over the policy's priority order.
    Priority,
}

impl RuleMatcher {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acl => "acl",
            Self::Rbac => "rbac",
            Self::Abac => "abac",
            Self::Restful => "restful",
            Self::Priority => "priority",
        }
    }

    /// Whether this matcher scans rules in priority order.
    pub fn is_priority_ordered(&self) -> bool {
        matches!(self, Self::Priority)
    }

    /// Decide whether `rule` applies to the request.
    pub fn matches(
        &self,
        rule: &PolicyRule,
        subject: &Subject,
        resource: Option<&Resource>,
        action: &Action,
        context: &Context,
    ) -> bool {
        if !rule.applies_in_domain(context) {
            return false;
        }

        let patterns_match = match self {
            Self::Acl | Self::Abac | Self::Priority => {
                acl_matches(rule, subject, resource, action)
            }
            Self::Rbac => rbac_matches(rule, subject, resource, action),
            Self::Restful => restful_matches(rule, subject, resource, action),
        };
        if !patterns_match {
            return false;
        }

        match self {
            Self::Abac if rule.is_conditional() => {
                rule.condition_holds(&attribute_context(context, subject, resource))
            }
            _ => rule.condition_holds(context),
        }
    }
}

/// A `None` resource pattern matches anything, including an absent resource.
/// A concrete pattern never matches an absent resource.
fn resource_pattern_matches(
    rule: &PolicyRule,
    resource: Option<&Resource>,
    value: impl Fn(&str, &Resource) -> bool,
) -> bool {
    match (&rule.resource, resource) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(pattern), Some(resource)) => value(pattern, resource),
    }
}

fn acl_matches(
    rule: &PolicyRule,
    subject: &Subject,
    resource: Option<&Resource>,
    action: &Action,
) -> bool {
    pattern_matches(&rule.subject, &subject.id)
        && resource_pattern_matches(rule, resource, |pattern, resource| {
            pattern_matches(pattern, &resource.id)
        })
        && pattern_matches(&rule.action, &action.name)
}

fn rbac_matches(
    rule: &PolicyRule,
    subject: &Subject,
    resource: Option<&Resource>,
    action: &Action,
) -> bool {
    let subject_matches = subject
        .roles()
        .into_iter()
        .any(|role| pattern_matches(&rule.subject, role))
        || pattern_matches(&rule.subject, &subject.id);

    subject_matches
        && resource_pattern_matches(rule, resource, |pattern, resource| {
            pattern_matches(pattern, &resource.id)
                || pattern_matches(pattern, &resource.resource_type)
        })
        && pattern_matches(&rule.action, &action.name)
}

fn restful_matches(
    rule: &PolicyRule,
    subject: &Subject,
    resource: Option<&Resource>,
    action: &Action,
) -> bool {
    pattern_matches(&rule.subject, &subject.id)
        && resource_pattern_matches(rule, resource, |template, resource| {
            path_matches(template, &resource.id)
        })
        && method_matches(&rule.action, &action.name)
}

/// Match an HTTP path against a template.
///
/// `:name` and `{name}` segments match any single non-empty segment, a `*`
/// segment matches the remainder of the path, other segments are globs.
pub(crate) fn path_matches(template: &str, path: &str) -> bool {
    if template == "*" {
        return true;
    }

    let mut template_segments = template.trim_matches('/').split('/');
    let mut path_segments = path.trim_matches('/').split('/');

    loop {
        match (template_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some("*"), _) => return true,
            (Some(segment), Some(value)) => {
                let is_param = segment.starts_with(':')
                    || (segment.starts_with('{') && segment.ends_with('}'));
                if is_param {
                    if value.is_empty() {
                        return false;
                    }
                } else if !pattern_matches(segment, value) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Match an HTTP method against `GET`, `get|post` or `*`. Case-insensitive.
pub(crate) fn method_matches(pattern: &str, method: &str) -> bool {
    pattern
        .split('|')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.eq_ignore_ascii_case(method))
}

/// Caller context enriched with `subject.*` and `resource.*` attributes.
/// Keys already present in the caller context win.
fn attribute_context(
    context: &Context,
    subject: &Subject,
    resource: Option<&Resource>,
) -> Context {
    let mut enriched = Context::new();
    enriched.insert("subject.id".into(), subject.id.clone().into());
    for (key, value) in &subject.attributes {
        enriched.insert(format!("subject.{key}"), value.clone());
    }
    if let Some(resource) = resource {
        enriched.insert("resource.id".into(), resource.id.clone().into());
        enriched.insert("resource.type".into(), resource.resource_type.clone().into());
        for (key, value) in &resource.attributes {
            enriched.insert(format!("resource.{key}"), value.clone());
        }
    }
    enriched.extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
    enriched
}
