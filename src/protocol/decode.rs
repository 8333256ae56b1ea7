//! Decoding of `-j` response frames.

use serde::de::Error as _;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Field name to value mapping for one file.
pub type Fields = Map<String, Value>;

/// Decode a frame produced by a `-j` extraction.
///
/// ExifTool answers with a JSON array holding one object per file even when a
/// single file was requested; the first object is returned.
pub fn decode_fields(frame: &[u8]) -> Result<Fields> {
    let mut records: Vec<Fields> =
        serde_json::from_slice(frame).map_err(|e| Error::decode(e, frame))?;

    if records.is_empty() {
        let source = serde_json::Error::custom("expected one object, got an empty array");
        return Err(Error::decode(source, frame));
    }

    Ok(records.swap_remove(0))
}
