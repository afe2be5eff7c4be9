//! `s3cmd` command lines.

use serde::Deserialize;

/// Builds `s3cmd` invocations from suite configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct S3CmdFormatter {
    /// Executable name or path.
    pub tool: String,
    /// Flags placed before the operation, e.g. `--no-ssl`.
    pub flags: Vec<String>,
    /// Bucket URL format with one `{}` for the bucket name.
    pub bkt_path_format: String,
}

impl Default for S3CmdFormatter {
    fn default() -> Self {
        Self { tool: "s3cmd".to_string(), flags: Vec::new(), bkt_path_format: "s3://{}".to_string() }
    }
}

impl S3CmdFormatter {
    /// Add `--access_key`, `--secret_key`, `--host` and `--host-bucket` flags.
    ///
    /// `endpoint` may carry a scheme; a plain `http://` endpoint also adds
    /// `--no-ssl`.
    #[must_use]
    pub fn with_credentials(mut self, access_key: &str, secret_key: &str, endpoint: &str) -> Self {
        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(endpoint)
            .trim_end_matches('/');
        self.flags.push(format!("--access_key={access_key}"));
        self.flags.push(format!("--secret_key={secret_key}"));
        self.flags.push(format!("--host={host}"));
        self.flags.push(format!("--host-bucket={host}"));
        if endpoint.starts_with("http://") {
            self.flags.push("--no-ssl".to_string());
        }
        self
    }

    /// `"<tool> <flags...> <operation> <args...>"`.
    #[must_use]
    pub fn command<S: AsRef<str>>(&self, operation: &str, args: &[S]) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.flags.len() + args.len() + 2);
        parts.push(&self.tool);
        parts.extend(self.flags.iter().map(String::as_str));
        parts.push(operation);
        parts.extend(args.iter().map(AsRef::as_ref));
        parts.join(" ")
    }

    /// URL of `bucket`, e.g. `s3://qa-bkt`.
    #[must_use]
    pub fn bucket_url(&self, bucket: &str) -> String {
        self.bkt_path_format.replacen("{}", bucket, 1)
    }

    /// URL of `key` inside `bucket`.
    #[must_use]
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{key}", self.bucket_url(bucket))
    }
}
