//! One-shot custom field writes.
//!
//! These functions start a dedicated session declaring exactly one field,
//! write it, and close the session again. For repeated writes, start a
//! [`Session`] with [`custom_fields`](crate::SessionConfigBuilder::custom_fields)
//! once and call [`Session::set_field`].

use std::path::Path;

use crate::config::{FieldName, Namespace, SessionConfig, SessionConfigBuilder, DEFAULT_NAMESPACE};
use crate::protocol::{check_value, FileMetadata};
use crate::session::Session;
use crate::Result;

/// Write a custom XMP field under `namespace` on each file.
///
/// `namespace` must match `^[a-zA-Z0-9]+$` and `field` must match
/// `^[A-Z][a-zA-Z0-9]*$`; both are checked before exiftool is started.
///
/// # Example
///
/// ```ignore
/// let results = libexiftool::set_metadata("acme", "BatchId", "b-17", &["a.jpg", "b.jpg"]).await?;
/// assert_eq!(results.len(), 2);
/// ```
pub async fn set_metadata<P: AsRef<Path>>(
    namespace: &str,
    field: &str,
    value: &str,
    files: &[P],
) -> Result<Vec<FileMetadata>> {
    set_metadata_with(SessionConfig::builder(), namespace, field, value, files).await
}

/// Write a custom XMP field under the `custom` namespace on each file.
pub async fn set_custom_metadata<P: AsRef<Path>>(
    field: &str,
    value: &str,
    files: &[P],
) -> Result<Vec<FileMetadata>> {
    set_metadata(DEFAULT_NAMESPACE, field, value, files).await
}

/// Like [`set_metadata`], with session options taken from `builder`.
///
/// Any custom fields declared on `builder` are replaced by `namespace` and
/// `field`.
pub async fn set_metadata_with<P: AsRef<Path>>(
    builder: SessionConfigBuilder,
    namespace: &str,
    field: &str,
    value: &str,
    files: &[P],
) -> Result<Vec<FileMetadata>> {
    let namespace = Namespace::new(namespace)?;
    let field = FieldName::new(field)?;
    check_value(value)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let config = builder
        .custom_fields(namespace.as_str(), [field.as_str()])
        .build()?;
    let session = Session::start(config).await?;

    let results = session
        .set_metadata(namespace.as_str(), field.as_str(), value, files)
        .await;

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "failed to close one-shot exiftool session");
    }

    results
}
