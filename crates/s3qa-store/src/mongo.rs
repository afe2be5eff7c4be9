//! MongoDB document store.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson};
use mongodb::{Client, Collection};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use s3qa_core::config::DatabaseConfig;
use s3qa_core::{Document, Error, PasswordManager, Result};
use serde_json::Value;
use tracing::{debug, error};

use crate::backend::{DocumentStore, UpdateSummary};

/// Characters left unescaped in credentials: the RFC 3986 unreserved set.
const CREDENTIAL_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Build `mongodb://<user>:<password>@<hostname>` with encoded credentials.
#[must_use]
pub fn connection_uri(user: &str, password: &str, hostname: &str) -> String {
    format!(
        "mongodb://{}:{}@{}",
        utf8_percent_encode(user, CREDENTIAL_SET),
        utf8_percent_encode(password, CREDENTIAL_SET),
        hostname
    )
}

/// A MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<bson::Document>,
}

impl MongoStore {
    /// Connect to `database.collection` using credentials from the password
    /// manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be resolved or the URI is
    /// rejected by the driver.
    pub async fn connect(
        config: &DatabaseConfig,
        passwords: &PasswordManager,
        database: &str,
        collection: &str,
    ) -> Result<Self> {
        debug!(hostname = %config.hostname, database, collection, "Connecting to document database");
        let creds =
            passwords.get_secrets(&[config.user_secret.as_str(), config.password_secret.as_str()])?;
        let resolved = |id: &str| {
            creds.get(id).ok_or_else(|| Error::Secret(format!("secret '{id}' not resolved")))
        };
        let user = resolved(&config.user_secret)?;
        let password = resolved(&config.password_secret)?;
        let uri = connection_uri(user, password, &config.hostname);

        let client = Client::with_uri_str(&uri).await.map_err(store_error)?;
        Ok(Self::from_collection(client.database(database).collection(collection)))
    }

    /// Connect to the setups collection.
    ///
    /// # Errors
    ///
    /// See [`MongoStore::connect`].
    pub async fn setups(config: &DatabaseConfig, passwords: &PasswordManager) -> Result<Self> {
        Self::connect(config, passwords, &config.setups_database, &config.setups_collection).await
    }

    /// Connect to the timings collection.
    ///
    /// # Errors
    ///
    /// See [`MongoStore::connect`].
    pub async fn timings(config: &DatabaseConfig, passwords: &PasswordManager) -> Result<Self> {
        Self::connect(config, passwords, &config.timings_database, &config.timings_collection)
            .await
    }

    /// Wrap an existing collection handle.
    #[must_use]
    pub fn from_collection(collection: Collection<bson::Document>) -> Self {
        Self { collection }
    }
}

fn store_error(err: mongodb::error::Error) -> Error {
    error!(error = %err, "Document database operation failed");
    Error::Store(err.to_string())
}

fn to_bson(doc: &Document) -> Result<bson::Document> {
    bson::to_document(doc).map_err(|e| Error::Store(format!("invalid document: {e}")))
}

fn from_bson(doc: bson::Document) -> Document {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, filter: &Document) -> Result<Vec<Document>> {
        let cursor = self.collection.find(to_bson(filter)?).await.map_err(store_error)?;
        let docs: Vec<bson::Document> = cursor.try_collect().await.map_err(store_error)?;
        Ok(docs.into_iter().map(from_bson).collect())
    }

    async fn count_documents(&self, filter: &Document) -> Result<u64> {
        self.collection.count_documents(to_bson(filter)?).await.map_err(store_error)
    }

    async fn distinct(&self, field: &str, filter: &Document) -> Result<Vec<Value>> {
        let values = self.collection.distinct(field, to_bson(filter)?).await.map_err(store_error)?;
        Ok(values.into_iter().map(Bson::into_relaxed_extjson).collect())
    }

    async fn update_many(&self, filter: &Document, update: &Document) -> Result<UpdateSummary> {
        let result = self
            .collection
            .update_many(to_bson(filter)?, to_bson(update)?)
            .await
            .map_err(store_error)?;
        Ok(UpdateSummary { matched: result.matched_count, modified: result.modified_count })
    }

    async fn insert_one(&self, doc: Document) -> Result<Value> {
        let result = self.collection.insert_one(to_bson(&doc)?).await.map_err(store_error)?;
        Ok(result.inserted_id.into_relaxed_extjson())
    }
}
