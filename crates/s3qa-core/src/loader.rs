//! Reading and merging test configuration.
//!
//! Test configuration comes from two places: YAML files shipped with the
//! suites, and setup details describing the target system. Setup details are
//! read from a local setups JSON file when present, otherwise from the
//! setups collection of the document database.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::secrets::PasswordManager;
use crate::{Error, Result};

/// A freeform key-value document.
pub type Document = Map<String, Value>;

/// Source of setup details stored in the document database.
#[async_trait]
pub trait SetupSource: Send + Sync {
    /// Returns the documents matching `query`, keyed by their `setupname`.
    ///
    /// When `drop_id` is set the database identifier field is removed.
    async fn setups(&self, query: &Document, drop_id: bool) -> Result<Document>;
}

/// Parse a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid YAML.
pub fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Parse a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

/// Read a YAML configuration file and decrypt the secrets it carries.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or a secret cannot be
/// decrypted.
pub fn get_config_yaml(path: &Path, passwords: &PasswordManager) -> Result<Value> {
    debug!(path = %path.display(), "Reading details from file");
    let mut data = read_yaml(path)?;
    debug!(path = %path.display(), "Decrypting passwords from file");
    passwords.decrypt_all(&mut data)?;
    Ok(data)
}

/// Deserialize a merged configuration value into a typed structure.
///
/// # Errors
///
/// Returns an error if the value does not match `T`.
pub fn load_typed<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))
}

/// What [`get_config_wrapper`] should read.
#[derive(Debug, Clone, Default)]
pub struct ConfigRequest {
    /// YAML file to read.
    pub fpath: Option<PathBuf>,
    /// Narrow the YAML file to this top-level key.
    pub config_key: Option<String>,
    /// Setup whose details are appended.
    pub target: Option<String>,
    /// Narrow the setup details to this key.
    pub target_key: Option<String>,
}

impl ConfigRequest {
    /// Request reading a YAML file.
    #[must_use]
    pub fn file(fpath: impl Into<PathBuf>) -> Self {
        Self { fpath: Some(fpath.into()), ..Self::default() }
    }

    /// Request reading the details of a setup.
    #[must_use]
    pub fn target(target: impl Into<String>) -> Self {
        Self { target: Some(target.into()), ..Self::default() }
    }

    /// Narrow the YAML file to `key`.
    #[must_use]
    pub fn with_config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    /// Also append the details of setup `target`.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Narrow the setup details to `key`.
    #[must_use]
    pub fn with_target_key(mut self, key: impl Into<String>) -> Self {
        self.target_key = Some(key.into());
        self
    }
}

/// Read the YAML file and/or the target's setup details and merge them.
///
/// YAML keys are inserted first and setup keys overwrite them; the two
/// sources are expected not to overlap. Setup details come from
/// `setups_file` when it exists, otherwise from `setups`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when neither a file nor a target was
/// requested, and a configuration error when a requested key is missing.
pub async fn get_config_wrapper(
    request: &ConfigRequest,
    passwords: &PasswordManager,
    setups_file: &Path,
    setups: &dyn SetupSource,
) -> Result<Document> {
    let mut requested = false;
    let mut data = Document::new();

    if let Some(fpath) = &request.fpath {
        requested = true;
        debug!(path = %fpath.display(), "Reading config from yaml file");
        let mut details = get_config_yaml(fpath, passwords)?;
        if let Some(key) = &request.config_key {
            details = take_key(details, key)?;
        }
        data.extend(into_document(details, "yaml config")?);
    }

    if let Some(target) = &request.target {
        requested = true;
        let mut details = if setups_file.exists() {
            debug!(target = %target, path = %setups_file.display(), "Reading config from setups file");
            take_key(read_json(setups_file)?, target)?
        } else {
            debug!(target = %target, "Reading config from DB");
            let mut query = Document::new();
            query.insert("setupname".to_string(), Value::String(target.clone()));
            let mut docs = setups.setups(&query, true).await?;
            docs.remove(target).ok_or_else(|| Error::missing_key(target))?
        };
        if let Some(key) = &request.target_key {
            details = take_key(details, key)?;
        }
        data.extend(into_document(details, target)?);
    }

    if !requested {
        error!("Invalid keyword argument: neither fpath nor target given");
        return Err(Error::InvalidArgument("either fpath or target is required".to_string()));
    }
    Ok(data)
}

fn take_key(value: Value, key: &str) -> Result<Value> {
    match value {
        Value::Object(mut map) => map.remove(key).ok_or_else(|| Error::missing_key(key)),
        _ => Err(Error::Config(format!("cannot look up '{key}' in a non-mapping value"))),
    }
}

fn into_document(value: Value, what: &str) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Document::new()),
        _ => Err(Error::Config(format!("{what} is not a mapping"))),
    }
}
