use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{require_non_empty, ValidationError};

/// Publisher as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(rename = "uuid")]
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

/// Fields accepted when creating or updating a publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPublisher {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NewPublisher {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Both fields are required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("url", &self.url)?;
        Ok(())
    }
}

impl Publisher {
    /// Creates a publisher with a freshly generated id.
    pub fn new(fields: NewPublisher) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            url: fields.url,
        }
    }

    /// Overwrites the mutable fields, keeping the identity.
    pub fn apply(&mut self, fields: NewPublisher) {
        self.name = fields.name;
        self.url = fields.url;
    }
}

impl std::fmt::Display for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{UUID: {}, Name: {}, URL: {}}}", self.id, self.name, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_distinct_ids() {
        let a = Publisher::new(NewPublisher::new("Acme News", "https://acme.example"));
        let b = Publisher::new(NewPublisher::new("Acme News", "https://acme.example"));
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_nil());
    }

    #[test]
    fn test_validate_requires_name_and_url() {
        assert!(NewPublisher::new("Acme", "https://acme.example").validate().is_ok());

        let err = NewPublisher::new("", "https://acme.example").validate().unwrap_err();
        assert_eq!(err.to_string(), "missing required 'name' field");

        let err = NewPublisher::new("Acme", "  ").validate().unwrap_err();
        assert_eq!(err.to_string(), "missing required 'url' field");
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut publisher = Publisher::new(NewPublisher::new("Old", "https://old.example"));
        let id = publisher.id;
        publisher.apply(NewPublisher::new("New", "https://new.example"));
        assert_eq!(publisher.id, id);
        assert_eq!(publisher.name, "New");
        assert_eq!(publisher.url, "https://new.example");
    }

    #[test]
    fn test_wire_format_uses_uuid_key() {
        let publisher = Publisher::new(NewPublisher::new("Acme", "https://acme.example"));
        let json = serde_json::to_value(&publisher).unwrap();
        assert_eq!(json["uuid"], publisher.id.to_string());
        assert_eq!(json["name"], "Acme");
    }
}
