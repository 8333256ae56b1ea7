//! Command blocks for the `-stay_open` argument stream.
//!
//! Every argument goes on its own line. A block is terminated by `-execute`,
//! which makes ExifTool run it and answer with one frame.

use std::path::Path;

use crate::config::{FieldName, Namespace};
use crate::{Error, Result};

/// Line that triggers execution of the preceding arguments.
pub const EXECUTE: &str = "-execute";

/// One command block, without its `-execute` terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBlock {
    lines: Vec<String>,
}

impl CommandBlock {
    /// Build a block from raw argument lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Write one custom XMP field on one file.
    pub fn set(namespace: &Namespace, field: &FieldName, value: &str, file: &str) -> Self {
        Self::new(vec![assignment(namespace, field, value), file.to_string()])
    }

    /// Extract metadata from one file.
    pub fn extract(args: &[String], file: &str) -> Self {
        let mut lines = args.to_vec();
        lines.push(file.to_string());
        Self::new(lines)
    }

    /// Ask a stay-open process to exit once this block executes.
    pub fn close() -> Self {
        Self::new(vec!["-stay_open".to_string(), "False".to_string()])
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Serialize the block followed by the execute line.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(EXECUTE.as_bytes());
        out.push(b'\n');
        out
    }
}

/// Tag assignment argument, e.g. `-xmp-custom:Title=value`.
pub fn assignment(namespace: &Namespace, field: &FieldName, value: &str) -> String {
    format!("-xmp-{namespace}:{field}={value}")
}

/// Reject values that would break out of their argument line.
pub fn check_value(value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(Error::InvalidValue(format!(
            "value contains a line break: {value:?}"
        )));
    }
    Ok(())
}

/// Turn a file path into its argument line.
///
/// Relative paths starting with `-` are prefixed with `./` so they are not
/// parsed as options.
pub fn path_arg(path: &Path) -> Result<String> {
    let s = path.to_str().ok_or_else(|| Error::InvalidPath {
        path: path.to_path_buf(),
    })?;
    if s.is_empty() || s.contains(['\n', '\r']) {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
        });
    }
    if s.starts_with('-') {
        return Ok(format!("./{s}"));
    }
    Ok(s.to_string())
}
