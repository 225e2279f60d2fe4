//! Document store trait.
//!
//! Defines the four primitive operations the publication layer needs from
//! the shared document store, for both the fleet directory and the daily
//! event partitions. Implementations live in netwatch-infra.

use std::future::Future;

use netwatch_types::error::StoreError;

/// Query passed to [`DocumentStore::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Every document in the collection.
    MatchAll,
    /// Documents whose `field` equals `value` exactly.
    Term { field: String, value: String },
}

impl SearchQuery {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        SearchQuery::Term {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub source: serde_json::Value,
}

/// Trait for the shared document store.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations are expected to apply their own request timeouts.
pub trait DocumentStore: Send + Sync {
    /// Write `document` under `id`, or under a store-assigned id when `None`.
    fn index(
        &self,
        collection: &str,
        category: &str,
        id: Option<&str>,
        document: &serde_json::Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Return every document matching `query`.
    fn search(
        &self,
        collection: &str,
        category: &str,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<Vec<SearchHit>, StoreError>> + Send;

    /// Delete a document. Returns `false` if it did not exist.
    fn delete(
        &self,
        collection: &str,
        category: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Check whether a document exists.
    fn exists(
        &self,
        collection: &str,
        category: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
