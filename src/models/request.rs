use serde::{Deserialize, Serialize};

use super::Attributes;

/// Attribute holding a subject's role names.
pub const ROLES_ATTRIBUTE: &str = "roles";

/// Subject (actor) making the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Set the subject's roles (stored under the `roles` attribute).
    pub fn with_roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = roles
            .into_iter()
            .map(|r| serde_json::Value::String(r.into()))
            .collect();
        self.with_attribute(ROLES_ATTRIBUTE, serde_json::Value::Array(roles))
    }

    /// Role names from the `roles` attribute. Non-string entries are ignored.
    pub fn roles(&self) -> Vec<&str> {
        self.attributes
            .get(ROLES_ATTRIBUTE)
            .and_then(|v| v.as_array())
            .map(|roles| roles.iter().filter_map(|r| r.as_str()).collect())
            .unwrap_or_default()
    }

    /// Check if the subject has a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles().contains(&role)
    }
}

/// The target of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Resource {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: Attributes::new(),
        }
    }

    /// Build a resource from an identifier of the form `type:id`.
    ///
    /// Identifiers without a `:` use the whole identifier as the type.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let resource_type = id.split_once(':').map_or(id.as_str(), |(t, _)| t).to_string();
        Self::new(id, resource_type)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// The operation being performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Tenant or security-zone scope attachable to rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Domain {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
