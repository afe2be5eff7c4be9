//! Configuration file of the MinIO `mc` client.
//!
//! `mc` keeps aliases in `~/.mc/config.json`:
//!
//! ```json
//! { "version": "10", "aliases": { "s3": { "url": "...", "accessKey": "...", "secretKey": "..." } } }
//! ```
//!
//! Unknown fields are preserved on save.

use std::path::{Path, PathBuf};

use s3qa_core::{Error, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Alias the suites use for the storage under test.
pub const DEFAULT_ALIAS: &str = "s3";

/// A loaded `config.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinioConfig {
    path: PathBuf,
    data: Value,
}

impl MinioConfig {
    /// Default location, `$HOME/.mc/config.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".mc").join("config.json"))
    }

    /// Read the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    pub fn load(path: &Path) -> Result<Self> {
        let data: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if !data.is_object() {
            return Err(Error::Config(format!("{} is not a JSON object", path.display())));
        }
        debug!(path = %path.display(), "Loaded minio client config");
        Ok(Self { path: path.to_path_buf(), data })
    }

    /// Access key of `alias`, if set.
    #[must_use]
    pub fn access_key(&self, alias: &str) -> Option<&str> {
        self.data.pointer(&format!("/aliases/{alias}/accessKey")).and_then(Value::as_str)
    }

    /// Secret key of `alias`, if set.
    #[must_use]
    pub fn secret_key(&self, alias: &str) -> Option<&str> {
        self.data.pointer(&format!("/aliases/{alias}/secretKey")).and_then(Value::as_str)
    }

    /// Returns true if `alias` carries exactly these keys.
    #[must_use]
    pub fn keys_match(&self, alias: &str, access_key: &str, secret_key: &str) -> bool {
        self.access_key(alias) == Some(access_key) && self.secret_key(alias) == Some(secret_key)
    }

    /// Set the keys of `alias`, creating the alias when missing.
    pub fn set_keys(&mut self, alias: &str, access_key: &str, secret_key: &str) {
        let Value::Object(root) = &mut self.data else {
            return;
        };
        let Some(entry) = object_entry(root, "aliases").and_then(|aliases| object_entry(aliases, alias))
        else {
            return;
        };
        entry.insert("accessKey".to_string(), Value::String(access_key.to_string()));
        entry.insert("secretKey".to_string(), Value::String(secret_key.to_string()));
    }

    /// Write the configuration back to where it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        info!(path = %self.path.display(), "Saved minio client config");
        Ok(())
    }

    /// Load `path` and rewrite the keys of `alias` when they differ. Returns
    /// true if the file was updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn ensure_keys(path: &Path, alias: &str, access_key: &str, secret_key: &str) -> Result<bool> {
        let mut config = Self::load(path)?;
        if config.keys_match(alias, access_key, secret_key) {
            return Ok(false);
        }
        info!(alias, "Updating minio client keys");
        config.set_keys(alias, access_key, secret_key);
        config.save()?;
        Ok(true)
    }
}

/// The object stored under `key`, replacing any non-object value.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    if !map.get(key).is_some_and(Value::is_object) {
        map.insert(key.to_string(), Value::Object(Map::new()));
    }
    map.get_mut(key).and_then(Value::as_object_mut)
}
