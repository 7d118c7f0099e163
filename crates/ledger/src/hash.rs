//! Hash chain utilities for ledger integrity

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::LedgerResult;
use crate::record::{Record, RecordPayload, RecordReport, GENESIS_PREV_HASH};

/// Calculate SHA256 hash of record content (excluding the hash field itself)
///
/// The content is serialized as JSON with object keys sorted at every depth,
/// so the digest does not depend on field or map insertion order.
pub fn calculate_record_hash(
    index: u64,
    timestamp: &DateTime<Utc>,
    payload: &RecordPayload,
    report: &RecordReport,
    previous_hash: &str,
) -> LedgerResult<String> {
    let mut content = Map::new();
    content.insert("index".to_string(), Value::from(index));
    content.insert("timestamp".to_string(), Value::from(timestamp.to_rfc3339()));
    content.insert("payload".to_string(), serde_json::to_value(payload)?);
    content.insert("report".to_string(), serde_json::to_value(report)?);
    content.insert("previous_hash".to_string(), Value::from(previous_hash));

    let canonical = canonicalize(Value::Object(content));
    let bytes = serde_json::to_vec(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Rebuild every object with its keys in sorted order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Verify hash chain integrity
///
/// Fails fast on the first offending record. Never repairs anything.
pub fn verify_chain(records: &[Record]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_PREV_HASH.to_string();

    for (i, record) in records.iter().enumerate() {
        if record.index != i as u64 {
            return Err(ChainError::InvalidIndex {
                expected: i as u64,
                actual: record.index,
            });
        }

        if i == 0 && !record.is_genesis() {
            return Err(ChainError::InvalidGenesis);
        }

        // Verify previous_hash links correctly
        if record.previous_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                index: record.index,
                expected: prev_hash,
                actual: record.previous_hash.clone(),
            });
        }

        // Verify hash is correct
        let calculated = record
            .compute_hash()
            .map_err(|_| ChainError::Unhashable { index: record.index })?;
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                index: record.index,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }

        prev_hash = record.hash.clone();
    }

    Ok(())
}

/// Errors in hash chain verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    InvalidGenesis,
    InvalidIndex {
        expected: u64,
        actual: u64,
    },
    BrokenLink {
        index: u64,
        expected: String,
        actual: String,
    },
    InvalidHash {
        index: u64,
        expected: String,
        actual: String,
    },
    Unhashable {
        index: u64,
    },
}

impl ChainError {
    /// Index of the first offending record
    pub fn index(&self) -> u64 {
        match self {
            ChainError::InvalidGenesis => 0,
            ChainError::InvalidIndex { expected, .. } => *expected,
            ChainError::BrokenLink { index, .. }
            | ChainError::InvalidHash { index, .. }
            | ChainError::Unhashable { index } => *index,
        }
    }
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::InvalidGenesis => {
                write!(f, "Record 0 is not a genesis record")
            }
            ChainError::InvalidIndex { expected, actual } => {
                write!(f, "Invalid index: expected {}, got {}", expected, actual)
            }
            ChainError::BrokenLink {
                index,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Broken link at index {}: expected previous_hash '{}', got '{}'",
                    index, expected, actual
                )
            }
            ChainError::InvalidHash {
                index,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Invalid hash at index {}: expected '{}', got '{}'",
                    index, expected, actual
                )
            }
            ChainError::Unhashable { index } => {
                write!(f, "Record {} could not be serialized for hashing", index)
            }
        }
    }
}

impl std::error::Error for ChainError {}
