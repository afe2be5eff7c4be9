// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Setup details stored in the document database.
//!
//! Each setup document describes one lab system and carries a `setupname`
//! field. Results are keyed by that name so callers can pick one target.

use std::sync::Arc;

use async_trait::async_trait;
use s3qa_core::{Document, Result, SetupSource};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{DocumentStore, UpdateSummary, ID_FIELD};

/// Field naming the setup a document describes.
pub const SETUP_NAME_FIELD: &str = "setupname";

/// Reads and updates setup documents.
#[derive(Clone)]
pub struct SetupRepository {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for SetupRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupRepository").finish_non_exhaustive()
    }
}

impl SetupRepository {
    /// Creates a repository over the setups collection.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Return setup documents matching `query`, keyed by `setupname`.
    ///
    /// `_id` is removed from every document when `drop_id` is set. Documents
    /// without a `setupname` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub async fn get_config_db(&self, query: &Document, drop_id: bool) -> Result<Document> {
        debug!(?query, "Fetching setup details");
        let docs = self.store.find(query).await?;

        let mut setups = Document::new();
        for mut doc in docs {
            if drop_id {
                doc.remove(ID_FIELD);
            }
            let name = match doc.get(SETUP_NAME_FIELD) {
                Some(Value::String(name)) => name.clone(),
                Some(other) => other.to_string(),
                None => {
                    warn!("Skipping setup document without {SETUP_NAME_FIELD}");
                    continue;
                }
            };
            setups.insert(name, Value::Object(doc));
        }
        debug!(count = setups.len(), "Setup details fetched");
        Ok(setups)
    }

    /// Apply `update` to every setup document matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected.
    pub async fn update_config_db(&self, query: &Document, update: &Document) -> Result<UpdateSummary> {
        debug!(?query, ?update, "Updating setup details");
        let summary = self.store.update_many(query, update).await?;
        debug!(matched = summary.matched, modified = summary.modified, "Setup details updated");
        Ok(summary)
    }
}

#[async_trait]
impl SetupSource for SetupRepository {
    async fn setups(&self, query: &Document, drop_id: bool) -> Result<Document> {
        self.get_config_db(query, drop_id).await
    }
}
