//! Per-file operation results.

use std::path::PathBuf;

use serde_json::Value;

use super::decode::Fields;
use crate::{Error, Result};

/// The outcome of an operation on one file.
///
/// Batch operations return one `FileMetadata` per input file, in input order.
/// A failure is recorded in [`error`](Self::error) and never stops the rest of
/// the batch.
#[derive(Debug)]
pub struct FileMetadata {
    /// The file as passed by the caller.
    pub file: PathBuf,
    /// Decoded fields. Empty when `error` is set.
    pub fields: Fields,
    /// Why this file failed, if it did.
    pub error: Option<Error>,
}

impl FileMetadata {
    pub(crate) fn success(file: PathBuf, fields: Fields) -> Self {
        Self {
            file,
            fields,
            error: None,
        }
    }

    pub(crate) fn failure(file: PathBuf, error: Error) -> Self {
        Self {
            file,
            fields: Fields::new(),
            error: Some(error),
        }
    }

    /// Returns true if the operation succeeded for this file.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn get(&self, key: &str) -> Result<&Value> {
        self.fields.get(key).ok_or_else(|| Error::KeyNotFound {
            key: key.to_string(),
        })
    }

    /// Read a field as a string. Numbers and booleans are formatted.
    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(mismatch(key, "string")),
        }
    }

    /// Read a field as an integer. Numeric strings are parsed.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().ok_or_else(|| mismatch(key, "integer")),
            Value::String(s) => s.trim().parse().map_err(|_| mismatch(key, "integer")),
            _ => Err(mismatch(key, "integer")),
        }
    }

    /// Read a field as a float. Numeric strings are parsed.
    pub fn get_float(&self, key: &str) -> Result<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(key, "float")),
            Value::String(s) => s.trim().parse().map_err(|_| mismatch(key, "float")),
            _ => Err(mismatch(key, "float")),
        }
    }

    /// Read a list field. A scalar is returned as a one-element list.
    pub fn get_strings(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key)? {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(b) => Ok(b.to_string()),
                    _ => Err(mismatch(key, "list of strings")),
                })
                .collect(),
            Value::Null | Value::Object(_) => Err(mismatch(key, "list of strings")),
            _ => Ok(vec![self.get_string(key)?]),
        }
    }
}

fn mismatch(key: &str, expected: &'static str) -> Error {
    Error::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}
