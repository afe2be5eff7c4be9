//! Command line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// s3qa: black-box QA suite for S3-compatible object storage.
#[derive(Parser)]
#[command(name = "s3qa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the suite settings file (TOML).
    #[arg(short, long, global = true, env = "S3QA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or update test configuration.
    Config(ConfigCommand),
    /// Encrypt or decrypt configuration secrets.
    Secret(SecretCommand),
    /// Query recorded timing results.
    Timings(TimingsCommand),
    /// Print version information.
    Version,
}

/// Configuration commands.
#[derive(Args)]
pub struct ConfigCommand {
    /// Configuration subcommand.
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the merged YAML and setup configuration as JSON.
    Show(ConfigShowArgs),
    /// Update setup details in the document database.
    Update(ConfigUpdateArgs),
}

/// Arguments for `config show`.
#[derive(Args)]
pub struct ConfigShowArgs {
    /// YAML test configuration file.
    #[arg(short, long)]
    pub fpath: Option<PathBuf>,

    /// Top-level key of the YAML file to keep.
    #[arg(long, requires = "fpath")]
    pub config_key: Option<String>,

    /// Setup name to merge in.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Key of the setup details to keep.
    #[arg(long, requires = "target")]
    pub target_key: Option<String>,
}

/// Arguments for `config update`.
#[derive(Args)]
pub struct ConfigUpdateArgs {
    /// Setup to update.
    #[arg(short, long)]
    pub setupname: String,

    /// Field to set, as `path=value`. Values are parsed as JSON when
    /// possible and kept as strings otherwise.
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// Field to remove.
    #[arg(long = "unset", value_name = "PATH")]
    pub unset: Vec<String>,
}

/// Secret commands.
#[derive(Args)]
pub struct SecretCommand {
    /// Secret subcommand.
    #[command(subcommand)]
    pub command: SecretSubcommand,
}

/// Secret subcommands.
#[derive(Subcommand)]
pub enum SecretSubcommand {
    /// Encrypt a value under the master key.
    Encrypt {
        /// Plaintext to encrypt.
        value: String,
    },
    /// Decrypt an `enc:` token.
    Decrypt {
        /// Token to decrypt.
        token: String,
    },
}

/// Timing commands.
#[derive(Args)]
pub struct TimingsCommand {
    /// Output format (text, json).
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Timing subcommand.
    #[command(subcommand)]
    pub command: TimingsSubcommand,
}

/// Timing subcommands.
#[derive(Subcommand)]
pub enum TimingsSubcommand {
    /// Store one timing result.
    Record(RecordArgs),
    /// List documents matching a filter.
    Find(FilterArgs),
    /// Count documents matching a filter.
    Count(FilterArgs),
    /// Distinct values of a field among documents matching a filter.
    Distinct {
        /// Field to collect.
        field: String,

        /// Filter arguments.
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Arguments for `timings record`.
#[derive(Args)]
pub struct RecordArgs {
    /// Build under test.
    #[arg(long)]
    pub build: String,

    /// Test identifier, e.g. TEST-2128.
    #[arg(long)]
    pub test: String,

    /// Measured operation, e.g. put_object.
    #[arg(long)]
    pub operation: String,

    /// Elapsed time in seconds.
    #[arg(long)]
    pub duration: f64,

    /// Record the operation as failed.
    #[arg(long)]
    pub failed: bool,

    /// Extra field, as `name=value`. Values are parsed as JSON when
    /// possible and kept as strings otherwise.
    #[arg(long = "field", value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
}

/// A query filter.
#[derive(Args)]
pub struct FilterArgs {
    /// Filter as a JSON object, e.g. '{"result": "Fail"}'.
    #[arg(long, default_value = "{}")]
    pub filter: String,
}

/// Output format for CLI commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
