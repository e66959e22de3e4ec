//! Bulk import of publishers and their publications through the HTTP API.
//!
//! Entries are processed one at a time. A failed publisher skips its
//! publications; every failure is collected and reported at the end.

mod entries;

pub use entries::{Entry, PublicationEntry, PublisherEntry};

use std::sync::Arc;
use thiserror::Error;

use crate::api::PublicationRequest;
use crate::apiclient::{ClientError, PublicationsApi};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Cannot read json from file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("import failed for {} entries", .0.len())]
    Failed(Vec<ImportFailure>),
}

/// A publisher or publication the API refused.
#[derive(Debug)]
pub struct ImportFailure {
    pub publisher: PublisherEntry,
    /// `None` when the publisher itself failed.
    pub publication: Option<PublicationEntry>,
    pub error: ClientError,
}

impl std::fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Publisher: {}", self.publisher)?;
        if let Some(publication) = &self.publication {
            write!(f, " Publication: {publication}")?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Counts of what an import created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub entries: usize,
    pub publishers: usize,
    pub publications: usize,
}

pub struct Importer {
    api: Arc<dyn PublicationsApi>,
}

impl Importer {
    pub fn new(api: Arc<dyn PublicationsApi>) -> Self {
        Self { api }
    }

    /// Parses a JSON array of entries and imports it.
    pub async fn run(&self, bytes: &[u8]) -> Result<ImportSummary, ImportError> {
        let entries: Vec<Entry> = serde_json::from_slice(bytes)?;
        self.import(entries).await
    }

    pub async fn import(&self, entries: Vec<Entry>) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary {
            entries: entries.len(),
            ..ImportSummary::default()
        };
        let mut failures = Vec::new();
        tracing::info!(entries = entries.len(), "Starting import");

        for entry in entries {
            let publisher = match self
                .api
                .create_publisher(&entry.publisher.name, &entry.publisher.url)
                .await
            {
                Ok(publisher) => publisher,
                Err(error) => {
                    tracing::warn!(publisher = %entry.publisher, error = %error, "Publisher rejected");
                    failures.push(ImportFailure {
                        publisher: entry.publisher,
                        publication: None,
                        error,
                    });
                    continue;
                }
            };
            summary.publishers += 1;

            for publication in entry.publications {
                let request = PublicationRequest {
                    name: publication.name.clone(),
                    description: publication.description.clone(),
                    language_code: publication.language_code.clone(),
                    publisher_uuid: publisher.id,
                    publication_type: publication.publication_type.clone(),
                    config: publication.config.clone(),
                };
                match self.api.create_publication(&request).await {
                    Ok(created) => {
                        tracing::debug!(id = %created.id, "Publication imported");
                        summary.publications += 1;
                    }
                    Err(error) => {
                        tracing::warn!(publication = %publication, error = %error, "Publication rejected");
                        failures.push(ImportFailure {
                            publisher: entry.publisher.clone(),
                            publication: Some(publication),
                            error,
                        });
                    }
                }
            }
        }

        if failures.is_empty() {
            tracing::info!(
                publishers = summary.publishers,
                publications = summary.publications,
                "Import finished"
            );
            Ok(summary)
        } else {
            Err(ImportError::Failed(failures))
        }
    }
}
