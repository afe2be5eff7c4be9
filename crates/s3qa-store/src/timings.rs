//! Timing results backing the reporting dashboards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use s3qa_core::{Document, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::backend::DocumentStore;

/// One measured operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Build under test.
    pub build: String,
    /// Test identifier, e.g. `TEST-5514`.
    pub test: String,
    /// Measured operation, e.g. `put_object`.
    pub operation: String,
    /// Elapsed time in seconds.
    pub duration_secs: f64,
    /// `Pass` or `Fail`.
    pub result: String,
    /// When the measurement was taken.
    pub recorded_at: DateTime<Utc>,
    /// Any other fields the dashboard groups by.
    #[serde(flatten)]
    pub extra: Document,
}

impl TimingRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        build: impl Into<String>,
        test: impl Into<String>,
        operation: impl Into<String>,
        duration_secs: f64,
        passed: bool,
    ) -> Self {
        Self {
            build: build.into(),
            test: test.into(),
            operation: operation.into(),
            duration_secs,
            result: if passed { "Pass" } else { "Fail" }.to_string(),
            recorded_at: Utc::now(),
            extra: Document::new(),
        }
    }

    /// Adds a free-form field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Queries over the timings collection.
#[derive(Clone)]
pub struct TimingRepository {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for TimingRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingRepository").finish_non_exhaustive()
    }
}

impl TimingRepository {
    /// Creates a repository over the timings collection.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Documents matching `filter`, e.g. `{"result": "Fail"}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database cannot be searched.
    pub async fn find(&self, filter: &Document) -> Result<Vec<Document>> {
        self.store.find(filter).await.inspect_err(|e| {
            error!(error = %e, ?filter, "Unable to search documents from database");
        })
    }

    /// Number of documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database cannot be searched.
    pub async fn count_documents(&self, filter: &Document) -> Result<u64> {
        self.store.count_documents(filter).await.inspect_err(|e| {
            error!(error = %e, ?filter, "Unable to count documents in database");
        })
    }

    /// Distinct values of `entry` among documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database cannot be searched.
    pub async fn find_distinct(&self, entry: &str, filter: &Document) -> Result<Vec<Value>> {
        self.store.distinct(entry, filter).await.inspect_err(|e| {
            error!(error = %e, entry, ?filter, "Unable to fetch distinct values from database");
        })
    }

    /// Insert a timing result and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the record cannot be serialized or stored.
    pub async fn record(&self, record: &TimingRecord) -> Result<Value> {
        let doc = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            _ => return Err(Error::Store("timing record is not a document".to_string())),
        };
        let id = self.store.insert_one(doc).await?;
        debug!(test = %record.test, operation = %record.operation, %id, "Timing recorded");
        Ok(id)
    }
}
