pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, DocumentPath, Version};
pub use error::{Result, StoreError};
pub use memory::{AccessPolicy, InMemoryDocumentStore};
pub use postgres::PostgresDocumentStore;
pub use query::{Cursor, Direction, DocumentQuery, FieldFilter, QueryPage};
pub use store::{DocumentStore, DocumentStoreExt, MAX_TRANSACTION_ATTEMPTS, Transaction, Write};
