//! Document store trait definition.

use async_trait::async_trait;
use s3qa_core::{Document, Result};
use serde_json::Value;

/// Name of the identifier field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// Result of an `update_many` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Number of documents matching the filter.
    pub matched: u64,
    /// Number of documents actually changed.
    pub modified: u64,
}

/// Trait for one collection of freeform documents.
///
/// Filters are exact-match maps: a document matches when every filter key
/// (top-level or dotted path) is present with an equal value. Updates use
/// `$set` / `$unset` operator documents.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Return every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    async fn find(&self, filter: &Document) -> Result<Vec<Document>>;

    /// Count documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    async fn count_documents(&self, filter: &Document) -> Result<u64>;

    /// Distinct values of `field` across documents matching `filter`.
    ///
    /// Array values contribute their elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    async fn distinct(&self, field: &str, filter: &Document) -> Result<Vec<Value>>;

    /// Apply `update` to every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update document is invalid or the database
    /// rejects it.
    async fn update_many(&self, filter: &Document, update: &Document) -> Result<UpdateSummary>;

    /// Insert a document and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database rejects the document.
    async fn insert_one(&self, doc: Document) -> Result<Value>;
}
