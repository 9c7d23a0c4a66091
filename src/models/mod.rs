mod delegation;
mod policy;
mod request;
mod rule;

use std::collections::BTreeMap;

pub use delegation::*;
pub use policy::*;
pub use request::*;
pub use rule::*;

/// Free-form attributes attached to subjects, resources and domains.
///
/// Ordered so that serialized values (and anything hashed from them) are
/// deterministic.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Request context handed to rule conditions.
pub type Context = BTreeMap<String, serde_json::Value>;

/// Context key consulted when a rule is scoped to a [`Domain`].
pub const DOMAIN_CONTEXT_KEY: &str = "domain";
