//! One-shot startup population of the store from an exported message log.
//!
//! The export scripts produce JSON in two shapes: a list of attribute maps,
//! or a map from a unique key (the message date) to an attribute map. Both
//! are accepted; records are inserted in document order.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::IngestError;
use crate::record::{fields_from_json, json_kind, Fields};
use crate::store::RecordStore;

/// Reads and validates the whole source before anything is inserted, so a
/// malformed file never leaves a partially seeded store.
pub fn load_source(path: &Path) -> Result<Vec<Fields>, IngestError> {
    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(path, &content)
}

fn parse_source(path: &Path, content: &str) -> Result<Vec<Fields>, IngestError> {
    let document: Value = serde_json::from_str(content).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: Vec<Value> = match document {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => {
            return Err(IngestError::Shape {
                path: path.to_path_buf(),
                reason: format!("expected a list or map of records, got {}", json_kind(&other)),
            });
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            fields_from_json(entry).map_err(|e| IngestError::Shape {
                path: path.to_path_buf(),
                reason: format!("entry {idx}: {e}"),
            })
        })
        .collect()
}

/// Seeds `store` from `path` and returns how many records were loaded.
///
/// Failures are logged and leave the store untouched; the service still
/// starts and serves an empty collection.
#[instrument(skip(store))]
pub fn seed_store(store: &RecordStore, path: &Path) -> usize {
    if !path.exists() {
        warn!("No record source found at {:?}, starting empty", path);
        return 0;
    }

    match load_source(path) {
        Ok(entries) => {
            let count = entries.len();
            for fields in entries {
                store.insert(fields);
            }
            info!(count, "Loaded records from {:?}", path);
            count
        }
        Err(e) => {
            error!(error = %e, "Failed to load records, starting empty");
            0
        }
    }
}
