//! Store access for the books collection.

mod memory;
mod mongo;

pub use memory::InMemoryBookStore;
pub use mongo::MongoBookStore;

use std::fmt;

use async_trait::async_trait;
use mongodb::{bson::oid::ObjectId, error::ErrorKind};
use thiserror::Error;

use super::models::{Book, BookPatch, NewBook};

/// Errors raised by a [`BookStore`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(mongodb::error::Error),

    #[error("failed to encode book update: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("store returned a non-ObjectId identifier: {0}")]
    UnexpectedId(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<mongodb::error::Error> for StoreError {
    /// Failures to reach any server become [`StoreError::Unavailable`];
    /// everything else stays a database error.
    fn from(error: mongodb::error::Error) -> Self {
        match error.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => Self::Unavailable(error.to_string()),
            _ => Self::Database(error),
        }
    }
}

/// Lookup key for single-record operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookKey {
    Id(ObjectId),
    Isbn(String),
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={}", id.to_hex()),
            Self::Isbn(isbn) => write!(f, "isbn={}", isbn),
        }
    }
}

/// Operations the book handlers need from the document store.
///
/// Every method maps to a single store call; no implementation keeps
/// state across calls beyond the records themselves.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every record in the collection
    async fn list(&self) -> StoreResult<Vec<Book>>;

    /// The record matching `key`, if any
    async fn find(&self, key: &BookKey) -> StoreResult<Option<Book>>;

    /// Insert a record and return it with its generated id
    async fn insert(&self, book: NewBook) -> StoreResult<Book>;

    /// Apply `patch` to the record matching `key` and return its new state
    async fn update(&self, key: &BookKey, patch: &BookPatch) -> StoreResult<Option<Book>>;

    /// Remove at most one record; `true` when one was removed
    async fn delete(&self, key: &BookKey) -> StoreResult<bool>;

    /// Records whose category contains `needle`, ignoring case
    async fn by_category(&self, needle: &str) -> StoreResult<Vec<Book>>;

    /// Records whose author first or last name contains `needle`, ignoring case
    async fn by_author(&self, needle: &str) -> StoreResult<Vec<Book>>;

    /// Liveness probe that does not touch the books collection
    async fn ping(&self) -> StoreResult<()>;
}
