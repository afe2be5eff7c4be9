// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Password manager: secret lookup and decryption of marked values.
//!
//! Secret identifiers (`DB_USER`, `MASTER_KEY`, ...) are resolved through a
//! [`SecretProvider`] every time they are needed; nothing here caches
//! plaintext.
//!
//! Configuration values may carry encrypted secrets of the form
//! `enc:<base64(nonce || ciphertext)>`, produced with AES-256-GCM under the
//! master key. [`PasswordManager::decrypt_all`] replaces them in place.

use std::collections::HashMap;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rand::RngCore;
use serde_json::Value;
use tracing::debug;
use zeroize::Zeroize;

use crate::{Error, Result};

/// Marker prefix of encrypted values.
pub const ENCRYPTED_PREFIX: &str = "enc:";

/// AES-256-GCM nonce size (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// AES-256 key size (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Resolves secret identifiers to their values.
pub trait SecretProvider: Send + Sync {
    /// Returns the value of a single secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Secret`] if the secret is unknown.
    fn secret(&self, id: &str) -> Result<String>;

    /// Returns the values of several secrets keyed by id.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown secret.
    fn get_secrets(&self, ids: &[&str]) -> Result<HashMap<String, String>> {
        ids.iter().map(|id| Ok(((*id).to_string(), self.secret(id)?))).collect()
    }
}

/// Secrets read from environment variables named `<prefix><ID>`.
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    prefix: String,
}

impl EnvSecrets {
    /// Creates a provider reading `<prefix><ID>` variables.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl SecretProvider for EnvSecrets {
    fn secret(&self, id: &str) -> Result<String> {
        let var = format!("{}{}", self.prefix, id);
        std::env::var(&var).map_err(|_| Error::Secret(format!("secret '{id}' not set ({var})")))
    }
}

/// Secrets held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret.
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(id.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn secret(&self, id: &str) -> Result<String> {
        self.values.get(id).cloned().ok_or_else(|| Error::Secret(format!("secret '{id}' not set")))
    }
}

/// AES-256-GCM cipher for `enc:` tokens.
///
/// The key is zeroed when the cipher is dropped.
pub struct SecretCipher {
    key: [u8; KEY_SIZE],
}

impl Drop for SecretCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl SecretCipher {
    /// Creates a cipher from a raw 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(Error::Secret("master key must be exactly 32 bytes".to_string()));
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(key);
        Ok(Self { key: bytes })
    }

    /// Creates a cipher from a 64-character hex key.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or has the wrong length.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let mut bytes = hex::decode(hex_key.trim())
            .map_err(|_| Error::Secret("master key is not valid hex".to_string()))?;
        let cipher = Self::new(&bytes);
        bytes.zeroize();
        cipher
    }

    /// Encrypts `plaintext` into an `enc:` token.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| Error::Secret(format!("failed to create cipher: {e}")))?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| Error::Secret("encryption failed".to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);

        Ok(format!(
            "{ENCRYPTED_PREFIX}{}",
            base64::engine::general_purpose::STANDARD.encode(payload)
        ))
    }

    /// Decrypts an `enc:` token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not marked, malformed, or was
    /// encrypted under a different key.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let encoded = token
            .strip_prefix(ENCRYPTED_PREFIX)
            .ok_or_else(|| Error::Secret("value is not an encrypted token".to_string()))?;

        let payload = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| Error::Secret("encrypted token is not valid base64".to_string()))?;
        if payload.len() <= NONCE_SIZE {
            return Err(Error::Secret("encrypted token is too short".to_string()));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_SIZE);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| Error::Secret(format!("failed to create cipher: {e}")))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Secret("decryption failed: wrong key or tampered token".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Secret("decrypted secret is not valid UTF-8".to_string()))
    }
}

/// Returns true if `value` carries the encryption marker.
#[must_use]
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Secret lookup plus decryption of marked configuration values.
#[derive(Clone)]
pub struct PasswordManager {
    provider: Arc<dyn SecretProvider>,
    master_key_id: String,
}

impl std::fmt::Debug for PasswordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordManager").field("master_key_id", &self.master_key_id).finish()
    }
}

impl PasswordManager {
    /// Creates a password manager over `provider`; the master key is looked
    /// up under `master_key_id`.
    #[must_use]
    pub fn new(provider: Arc<dyn SecretProvider>, master_key_id: impl Into<String>) -> Self {
        Self { provider, master_key_id: master_key_id.into() }
    }

    /// Creates a password manager from the `[secrets]` settings, reading
    /// secrets from the environment.
    #[must_use]
    pub fn from_config(config: &crate::config::SecretsConfig) -> Self {
        Self::new(Arc::new(EnvSecrets::new(&config.env_prefix)), &config.master_key_id)
    }

    /// Resolves several secrets.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown secret.
    pub fn get_secrets(&self, ids: &[&str]) -> Result<HashMap<String, String>> {
        self.provider.get_secrets(ids)
    }

    fn cipher(&self) -> Result<SecretCipher> {
        let key = self.provider.secret(&self.master_key_id)?;
        SecretCipher::from_hex(&key)
    }

    /// Encrypts `plaintext` under the master key.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key is missing or invalid.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.cipher()?.encrypt(plaintext)
    }

    /// Decrypts an `enc:` token.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key is missing or the token is invalid.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        self.cipher()?.decrypt(token)
    }

    /// Decrypts `value` when it is marked, otherwise returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if a marked value cannot be decrypted.
    pub fn reveal(&self, value: &str) -> Result<String> {
        if is_encrypted(value) {
            self.decrypt(value)
        } else {
            Ok(value.to_string())
        }
    }

    /// Replaces every marked string inside `data` with its plaintext.
    ///
    /// Returns the number of values decrypted. The master key is only looked
    /// up when at least one marked value is present.
    ///
    /// # Errors
    ///
    /// Returns an error if a marked value cannot be decrypted.
    pub fn decrypt_all(&self, data: &mut Value) -> Result<usize> {
        let mut marked = Vec::new();
        collect_marked(data, &mut marked);
        if marked.is_empty() {
            return Ok(0);
        }

        let cipher = self.cipher()?;
        let count = decrypt_in_place(data, &cipher)?;
        debug!(count, "Decrypted marked secrets");
        Ok(count)
    }
}

fn collect_marked<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) if is_encrypted(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| collect_marked(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_marked(item, out)),
        _ => {}
    }
}

fn decrypt_in_place(value: &mut Value, cipher: &SecretCipher) -> Result<usize> {
    match value {
        Value::String(s) if is_encrypted(s) => {
            *s = cipher.decrypt(s)?;
            Ok(1)
        }
        Value::Array(items) => {
            items.iter_mut().map(|item| decrypt_in_place(item, cipher)).sum::<Result<usize>>()
        }
        Value::Object(map) => {
            map.values_mut().map(|item| decrypt_in_place(item, cipher)).sum::<Result<usize>>()
        }
        _ => Ok(0),
    }
}
