//! SQLite persistence for publishers and publications.
//!
//! [`Database`] owns the sqlx pool and exposes the SQL operations as inherent
//! methods split by entity; [`PublicationStore`] is the object-safe seam the
//! service and HTTP layers depend on.

mod publications;
mod publishers;
mod schema;
mod store;
mod types;

pub use schema::Database;
pub use store::PublicationStore;
pub use types::StoreError;
