//! CLI command handlers.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use s3qa_core::loader::get_config_wrapper;
use s3qa_core::{Config, ConfigRequest, Document, PasswordManager};
use s3qa_store::{MemoryStore, MongoStore, SetupRepository, TimingRecord, TimingRepository};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cli::{
    ConfigShowArgs, ConfigUpdateArgs, FilterArgs, OutputFormat, RecordArgs, SecretSubcommand,
    TimingsCommand, TimingsSubcommand,
};

/// Handle `config show`.
pub async fn handle_config_show(config: &Config, args: ConfigShowArgs) -> Result<()> {
    let passwords = PasswordManager::from_config(&config.secrets);
    let request = ConfigRequest {
        fpath: args.fpath,
        config_key: args.config_key,
        target: args.target,
        target_key: args.target_key,
    };

    // The database is only needed for a target missing from the setups file.
    let setups_file = &config.paths.setups_file;
    let setups = if request.target.is_some() && !setups_file.exists() {
        let store = MongoStore::setups(&config.database, &passwords)
            .await
            .context("Failed to connect to the setups database")?;
        SetupRepository::new(Arc::new(store))
    } else {
        SetupRepository::new(Arc::new(MemoryStore::new()))
    };

    let merged = get_config_wrapper(&request, &passwords, setups_file, &setups)
        .await
        .context("Failed to read configuration")?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

/// Handle `config update`.
pub async fn handle_config_update(config: &Config, args: ConfigUpdateArgs) -> Result<()> {
    let update = build_update(&args.set, &args.unset)?;
    let passwords = PasswordManager::from_config(&config.secrets);
    let store = MongoStore::setups(&config.database, &passwords)
        .await
        .context("Failed to connect to the setups database")?;

    let mut query = Document::new();
    query.insert("setupname".to_string(), Value::String(args.setupname.clone()));
    let summary = SetupRepository::new(Arc::new(store))
        .update_config_db(&query, &update)
        .await
        .context("Failed to update setup details")?;

    info!(setup = %args.setupname, matched = summary.matched, modified = summary.modified, "Setup updated");
    println!("matched: {}, modified: {}", summary.matched, summary.modified);
    Ok(())
}

/// Build a `$set` / `$unset` update from `path=value` assignments and paths.
fn build_update(set: &[String], unset: &[String]) -> Result<Document> {
    if set.is_empty() && unset.is_empty() {
        bail!("nothing to update: pass --set or --unset");
    }

    let mut set_fields = Document::new();
    for assignment in set {
        let (path, value) = parse_assignment(assignment)?;
        set_fields.insert(path, value);
    }
    let unset_fields: Document =
        unset.iter().map(|path| (path.clone(), Value::String(String::new()))).collect();

    let mut update = Document::new();
    if !set_fields.is_empty() {
        update.insert("$set".to_string(), Value::Object(set_fields));
    }
    if !unset_fields.is_empty() {
        update.insert("$unset".to_string(), Value::Object(unset_fields));
    }
    debug!(?update, "Built setup update");
    Ok(update)
}

/// Split `path=value`, parsing the value as JSON when possible.
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((path, raw)) = assignment.split_once('=') else {
        bail!("invalid assignment '{assignment}', expected PATH=VALUE");
    };
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path.to_string(), value))
}

/// Build a timing record from `timings record` arguments.
fn build_record(args: &RecordArgs) -> Result<TimingRecord> {
    if !args.duration.is_finite() || args.duration < 0.0 {
        bail!("duration must be a non-negative number of seconds");
    }
    let mut record =
        TimingRecord::new(&args.build, &args.test, &args.operation, args.duration, !args.failed);
    for field in &args.fields {
        let (name, value) = parse_assignment(field)?;
        record = record.with_field(name, value);
    }
    Ok(record)
}

/// Handle `secret encrypt` and `secret decrypt`.
pub fn handle_secret(config: &Config, command: SecretSubcommand) -> Result<()> {
    let passwords = PasswordManager::from_config(&config.secrets);
    let output = match command {
        SecretSubcommand::Encrypt { value } => {
            passwords.encrypt(&value).context("Failed to encrypt value")?
        }
        SecretSubcommand::Decrypt { token } => {
            passwords.decrypt(&token).context("Failed to decrypt token")?
        }
    };
    println!("{output}");
    Ok(())
}

/// Handle `timings record|find|count|distinct`.
pub async fn handle_timings(config: &Config, cmd: TimingsCommand) -> Result<()> {
    let passwords = PasswordManager::from_config(&config.secrets);
    let store = MongoStore::timings(&config.database, &passwords)
        .await
        .context("Failed to connect to the timings database")?;
    let timings = TimingRepository::new(Arc::new(store));

    match cmd.command {
        TimingsSubcommand::Record(args) => {
            let record = build_record(&args)?;
            let id = timings.record(&record).await.context("Failed to record timing")?;
            info!(test = %record.test, operation = %record.operation, "Timing recorded");
            match cmd.format {
                OutputFormat::Json => println!("{}", json!({ "id": id })),
                OutputFormat::Text => match &id {
                    Value::String(s) => println!("{s}"),
                    other => println!("{other}"),
                },
            }
        }
        TimingsSubcommand::Find(args) => {
            let docs = timings.find(&parse_filter(&args)?).await.context("Failed to find timings")?;
            match cmd.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&docs)?),
                OutputFormat::Text => {
                    for doc in &docs {
                        println!("{}", Value::Object(doc.clone()));
                    }
                    println!("{} document(s)", docs.len());
                }
            }
        }
        TimingsSubcommand::Count(args) => {
            let count = timings
                .count_documents(&parse_filter(&args)?)
                .await
                .context("Failed to count timings")?;
            match cmd.format {
                OutputFormat::Json => println!("{}", json!({ "count": count })),
                OutputFormat::Text => println!("{count}"),
            }
        }
        TimingsSubcommand::Distinct { field, filter } => {
            let values = timings
                .find_distinct(&field, &parse_filter(&filter)?)
                .await
                .context("Failed to fetch distinct timings")?;
            match cmd.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&values)?),
                OutputFormat::Text => {
                    for value in &values {
                        match value {
                            Value::String(s) => println!("{s}"),
                            other => println!("{other}"),
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn parse_filter(args: &FilterArgs) -> Result<Document> {
    let value: Value = serde_json::from_str(&args.filter).context("Filter is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("filter must be a JSON object"),
    }
}
