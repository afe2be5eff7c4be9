// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for s3qa.
//!
//! Storage-service failures are deliberately not classified: every SDK or CLI
//! failure becomes [`Error::Client`] carrying the service message, and suites
//! assert on substrings of that message.

use thiserror::Error;

/// A specialized `Result` type for s3qa operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a test run.
#[derive(Debug, Error)]
pub enum Error {
    /// A storage client operation failed.
    #[error("{operation} failed: {message}")]
    Client {
        /// The wrapper operation that failed (e.g. `set_bucket_tag`).
        operation: &'static str,
        /// Message of the underlying error, `"<Code>: <Message>"` when the
        /// service returned one.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required keyword was missing or a combination of keywords is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Secret lookup or decryption error.
    #[error("secret error: {0}")]
    Secret(String),

    /// Document database error.
    #[error("database error: {0}")]
    Store(String),

    /// An external command could not be spawned.
    #[error("command error: {0}")]
    Command(String),

    /// An aggregate expectation over test results did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new client error for the given wrapper operation.
    #[must_use]
    pub fn client(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Client { operation, message: message.into() }
    }

    /// Creates a configuration error for a missing key.
    #[must_use]
    pub fn missing_key(key: &str) -> Self {
        Self::Config(format!("missing key '{key}'"))
    }

    /// Returns the message suites match against.
    ///
    /// For client errors this is the bare service message without the
    /// operation prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Client { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true if this is a client error whose message contains `needle`.
    #[must_use]
    pub fn client_message_contains(&self, needle: &str) -> bool {
        matches!(self, Self::Client { message, .. } if message.contains(needle))
    }
}
