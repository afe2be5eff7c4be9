// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! In-memory document store.
//!
//! Mirrors the query semantics the suites rely on from MongoDB so setup and
//! timing logic can run without a database.

use async_trait::async_trait;
use parking_lot::RwLock;
use s3qa_core::{Document, Error, Result};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{DocumentStore, UpdateSummary, ID_FIELD};

/// A collection held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<Document>>,
}

impl MemoryStore {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding `docs`; documents without `_id` get one.
    #[must_use]
    pub fn with_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let docs = docs.into_iter().map(with_id).collect();
        Self { docs: RwLock::new(docs) }
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

fn with_id(mut doc: Document) -> Document {
    if !doc.contains_key(ID_FIELD) {
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().simple().to_string()));
    }
    doc
}

/// Resolve a top-level or dotted path inside a document.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match lookup(doc, key) {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<bool> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else { return Ok(false) };

    let mut current = doc;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        current = match entry {
            Value::Object(next) => next,
            _ => {
                return Err(Error::Store(format!(
                    "cannot create field '{last}' in non-document '{part}' for '{path}'"
                )))
            }
        };
    }

    let previous = current.insert(last.to_string(), value.clone());
    Ok(previous.as_ref() != Some(&value))
}

fn unset_path(doc: &mut Document, path: &str) -> bool {
    match path.rsplit_once('.') {
        None => doc.remove(path).is_some(),
        Some((parent, last)) => {
            let mut current = doc;
            for part in parent.split('.') {
                match current.get_mut(part) {
                    Some(Value::Object(next)) => current = next,
                    _ => return false,
                }
            }
            current.remove(last).is_some()
        }
    }
}

/// Reject anything other than `$set` / `$unset` with document operands.
fn check_update(update: &Document) -> Result<()> {
    for (op, fields) in update {
        if !matches!(op.as_str(), "$set" | "$unset") {
            return Err(Error::Store(format!("unsupported update operator '{op}'")));
        }
        if !fields.is_object() {
            return Err(Error::Store(format!("update operator {op} expects a document")));
        }
    }
    Ok(())
}

fn apply_update(doc: &mut Document, update: &Document) -> Result<bool> {
    let mut changed = false;
    for (op, fields) in update {
        let Some(fields) = fields.as_object() else { continue };
        if op == "$set" {
            for (path, value) in fields {
                changed |= set_path(doc, path, value.clone())?;
            }
        } else {
            for path in fields.keys() {
                changed |= unset_path(doc, path);
            }
        }
    }
    Ok(changed)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, filter: &Document) -> Result<Vec<Document>> {
        Ok(self.docs.read().iter().filter(|doc| matches(doc, filter)).cloned().collect())
    }

    async fn count_documents(&self, filter: &Document) -> Result<u64> {
        Ok(self.docs.read().iter().filter(|doc| matches(doc, filter)).count() as u64)
    }

    async fn distinct(&self, field: &str, filter: &Document) -> Result<Vec<Value>> {
        let docs = self.docs.read();
        let mut values: Vec<Value> = Vec::new();
        let mut push = |value: &Value| {
            if !values.contains(value) {
                values.push(value.clone());
            }
        };
        for doc in docs.iter().filter(|doc| matches(doc, filter)) {
            match lookup(doc, field) {
                Some(Value::Array(items)) => items.iter().for_each(&mut push),
                Some(value) => push(value),
                None => {}
            }
        }
        Ok(values)
    }

    async fn update_many(&self, filter: &Document, update: &Document) -> Result<UpdateSummary> {
        if update.keys().any(|key| !key.starts_with('$')) {
            return Err(Error::Store("update document must only contain operators".to_string()));
        }
        check_update(update)?;

        // Updated copies are committed only once every matched document took the update.
        let mut docs = self.docs.write();
        let mut summary = UpdateSummary::default();
        let mut updated = Vec::new();
        for (index, doc) in docs.iter().enumerate().filter(|(_, doc)| matches(doc, filter)) {
            summary.matched += 1;
            let mut copy = doc.clone();
            if apply_update(&mut copy, update)? {
                summary.modified += 1;
                updated.push((index, copy));
            }
        }
        for (index, doc) in updated {
            docs[index] = doc;
        }
        Ok(summary)
    }

    async fn insert_one(&self, doc: Document) -> Result<Value> {
        let doc = with_id(doc);
        let id = doc.get(ID_FIELD).cloned().unwrap_or(Value::Null);
        self.docs.write().push(doc);
        Ok(id)
    }
}
