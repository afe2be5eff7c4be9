//! Suite settings for s3qa.
//!
//! Settings describe *where* the suite runs (storage endpoint, document
//! database, local paths). Per-test expectations live in the YAML files read
//! by [`crate::loader`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the S3 endpoint.
pub const ENV_ENDPOINT: &str = "S3QA_ENDPOINT";
/// Environment variable overriding the S3 access key.
pub const ENV_ACCESS_KEY: &str = "S3QA_ACCESS_KEY";
/// Environment variable overriding the S3 secret key.
pub const ENV_SECRET_KEY: &str = "S3QA_SECRET_KEY";

/// Main settings for a test run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage service under test.
    pub s3: S3Config,
    /// Document database holding setups and timings.
    pub database: DatabaseConfig,
    /// Local paths.
    pub paths: PathsConfig,
    /// Password manager settings.
    pub secrets: SecretsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load settings from an optional file, then apply environment overrides.
    ///
    /// Without a file the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `S3QA_ENDPOINT`, `S3QA_ACCESS_KEY` and `S3QA_SECRET_KEY`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.s3.endpoint = endpoint;
        }
        if let Ok(access_key) = std::env::var(ENV_ACCESS_KEY) {
            self.s3.access_key = access_key;
        }
        if let Ok(secret_key) = std::env::var(ENV_SECRET_KEY) {
            self.s3.secret_key = secret_key;
        }
    }
}

/// Connection settings for the storage service under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Endpoint URL, e.g. `http://127.0.0.1:9000`.
    pub endpoint: String,
    /// Signing region.
    pub region: String,
    /// Access key ID. May be an `enc:` token.
    pub access_key: String,
    /// Secret access key. May be an `enc:` token.
    pub secret_key: String,
    /// Optional session token.
    pub session_token: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`).
    pub force_path_style: bool,
    /// Maximum attempts per request. 1 disables retries.
    pub max_attempts: u32,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            session_token: None,
            force_path_style: true,
            max_attempts: 1,
        }
    }
}

/// Document database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `host[:port]` of the MongoDB server.
    pub hostname: String,
    /// Database holding setup details.
    pub setups_database: String,
    /// Collection holding setup details, keyed by `setupname`.
    pub setups_collection: String,
    /// Database holding timing results.
    pub timings_database: String,
    /// Collection holding timing results.
    pub timings_collection: String,
    /// Secret id resolving to the database user.
    pub user_secret: String,
    /// Secret id resolving to the database password.
    pub password_secret: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost:27017".to_string(),
            setups_database: "cft_test_results".to_string(),
            setups_collection: "r2_systems".to_string(),
            timings_database: "cft_test_results".to_string(),
            timings_collection: "timings".to_string(),
            user_secret: "DB_USER".to_string(),
            password_secret: "DB_PASSWORD".to_string(),
        }
    }
}

/// Local path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Setups file consulted before the database.
    pub setups_file: PathBuf,
    /// Directory for generated test data.
    pub test_data_dir: PathBuf,
    /// Directory holding the per-suite YAML files.
    pub config_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            setups_file: PathBuf::from("setups.json"),
            test_data_dir: PathBuf::from("testdata"),
            config_dir: PathBuf::from("config"),
        }
    }
}

/// Password manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Prefix of the environment variables secrets are read from.
    pub env_prefix: String,
    /// Secret id resolving to the hex-encoded master key.
    pub master_key_id: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self { env_prefix: "S3QA_".to_string(), master_key_id: "MASTER_KEY".to_string() }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging.
    Json,
    /// Human-readable pretty logging.
    #[default]
    Pretty,
}
