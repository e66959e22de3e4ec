//! Domain records shared by the store, the HTTP layer, the API client and the importer.
//!
//! - [`Publisher`] - an organization owning publications
//! - [`Publication`] - a named feed owned by a publisher, typed by delivery mechanism
//! - [`PublicationConfig`] - the type-specific payload, one variant per [`PublicationType`]
//!
//! Both records get a fresh UUIDv4 identity from their constructors; the identity
//! never changes afterwards. Wire names follow the public JSON API (`uuid`,
//! `publisher_uuid`, `publication_type`, `config`).

mod publication;
mod publisher;

pub use publication::{
    ConfigDecodeError, NewPublication, Publication, PublicationConfig, PublicationType, RssConfig,
};
pub use publisher::{NewPublisher, Publisher};
