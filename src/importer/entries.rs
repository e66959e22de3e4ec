use serde::{Deserialize, Serialize};

/// Publisher fields of an import entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Publication fields of an import entry. `config` is forwarded untouched and
/// interpreted by the API according to `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(rename = "type", default)]
    pub publication_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// One record of the import file: a publisher and its publications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub publisher: PublisherEntry,
    #[serde(default)]
    pub publications: Vec<PublicationEntry>,
}

impl std::fmt::Display for PublisherEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{Name: {}, URL: {}}}", self.name, self.url)
    }
}

impl std::fmt::Display for PublicationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{Name: {}, LanguageCode: {}, Type: {}}}",
            self.name, self.language_code, self.publication_type
        )
    }
}
