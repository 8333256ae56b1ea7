//! Session configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .binary_path("/usr/local/bin/exiftool")
//!     .custom_fields("custom", ["OriginalFilename", "Checksum"])
//!     .buffer_size(1024 * 1024)
//!     .build()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::identifier::FieldSet;
use crate::{Error, Result};

/// Default ExifTool binary, resolved through `PATH`.
pub const DEFAULT_BINARY: &str = "exiftool";

/// Default maximum response frame size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for an ExifTool [`Session`](crate::Session).
///
/// Use [`SessionConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) binary_path: PathBuf,
    pub(crate) buffer_size: usize,
    pub(crate) field_set: Option<FieldSet>,
    pub(crate) config_dir: Option<PathBuf>,
    pub(crate) overwrite_original: bool,
    pub(crate) extract_args: Vec<String>,
    pub(crate) common_args: Vec<String>,
    pub(crate) timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a new builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Path or name of the ExifTool binary.
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Maximum size of one response frame in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The custom fields accepted by bound writes, if any.
    pub fn field_set(&self) -> Option<&FieldSet> {
        self.field_set.as_ref()
    }

    /// Directory for the generated config file (default: system temp dir).
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Arguments sent before the file path on every extraction.
    pub fn extract_args(&self) -> &[String] {
        &self.extract_args
    }

    /// Get the timeout if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from(DEFAULT_BINARY),
            buffer_size: DEFAULT_BUFFER_SIZE,
            field_set: None,
            config_dir: None,
            overwrite_original: true,
            extract_args: vec!["-j".to_string()],
            common_args: Vec::new(),
            timeout: None,
        }
    }
}

/// Builder for [`SessionConfig`].
///
/// Validation happens in [`build()`](SessionConfigBuilder::build), before
/// any process is started.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    binary_path: Option<PathBuf>,
    buffer_size: Option<usize>,
    custom_fields: Option<(String, Vec<String>)>,
    config_dir: Option<PathBuf>,
    overwrite_original: Option<bool>,
    extra_extract_args: Vec<String>,
    common_args: Vec<String>,
    timeout: Option<Duration>,
}

impl SessionConfigBuilder {
    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the exiftool binary (default: search PATH for "exiftool").
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    /// Raise the maximum response frame size.
    ///
    /// Needed for files carrying large embedded metadata.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = Some(bytes);
        self
    }

    /// Bound every response wait. On expiry the process is killed.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    // -------------------------------------------------------------------------
    // Writing
    // -------------------------------------------------------------------------

    /// Declare the custom fields this session may write.
    ///
    /// A config declaring them is generated at session start.
    pub fn custom_fields(
        mut self,
        namespace: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.custom_fields = Some((
            namespace.into(),
            fields.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Write the generated config into `dir` instead of the system temp dir.
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Replace files in place instead of keeping `_original` backups
    /// (default: true).
    pub fn overwrite_original(mut self, overwrite: bool) -> Self {
        self.overwrite_original = Some(overwrite);
        self
    }

    // -------------------------------------------------------------------------
    // Extraction and common arguments
    // -------------------------------------------------------------------------

    /// Add an argument sent with every extraction, after `-j`.
    pub fn extract_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_extract_args.push(arg.into());
        self
    }

    /// Report raw values instead of print-converted ones (`-n`).
    pub fn no_print_conversion(self) -> Self {
        self.extract_arg("-n")
    }

    /// Extract metadata from embedded documents (`-ee`).
    pub fn extract_embedded(self) -> Self {
        self.extract_arg("-ee")
    }

    /// Prefix keys with their family 0 group name (`-G`).
    pub fn print_group_names(self) -> Self {
        self.extract_arg("-G")
    }

    /// Add an argument applied to every command via `-common_args`.
    pub fn common_arg(mut self, arg: impl Into<String>) -> Self {
        self.common_args.push(arg.into());
        self
    }

    /// Set a character encoding option, e.g. `charset("filename=utf8")`.
    pub fn charset(self, charset: impl Into<String>) -> Self {
        self.common_arg("-charset").common_arg(charset)
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - Custom namespace and field names
    /// - Buffer size is positive
    /// - No argument contains a line break
    ///
    /// Note: binary existence is checked lazily at start time.
    pub fn build(self) -> Result<SessionConfig> {
        let defaults = SessionConfig::default();

        let field_set = match self.custom_fields {
            Some((namespace, fields)) => Some(FieldSet::new(namespace, fields)?),
            None => None,
        };

        let buffer_size = self.buffer_size.unwrap_or(defaults.buffer_size);
        if buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer_size must be positive".into()));
        }

        let mut extract_args = defaults.extract_args;
        extract_args.extend(self.extra_extract_args);

        for arg in extract_args.iter().chain(&self.common_args) {
            if arg.contains(['\n', '\r']) {
                return Err(Error::InvalidConfig(format!(
                    "argument contains a line break: {arg:?}"
                )));
            }
        }

        Ok(SessionConfig {
            binary_path: self.binary_path.unwrap_or(defaults.binary_path),
            buffer_size,
            field_set,
            config_dir: self.config_dir,
            overwrite_original: self
                .overwrite_original
                .unwrap_or(defaults.overwrite_original),
            extract_args,
            common_args: self.common_args,
            timeout: self.timeout,
        })
    }
}
