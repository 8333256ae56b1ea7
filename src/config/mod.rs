//! Session configuration and custom field declarations.
//!
//! This module provides:
//!
//! - [`SessionConfig`] and [`SessionConfigBuilder`] for configuring a session
//! - [`Namespace`], [`FieldName`] and [`FieldSet`] for validated custom tags
//! - [`GeneratedConfig`], the ExifTool config file declaring those tags
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::config::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .custom_fields("custom", ["OriginalFilename"])
//!     .no_print_conversion()
//!     .build()?;
//! ```

pub mod builder;
pub mod generated;
pub mod identifier;

pub use builder::{SessionConfig, SessionConfigBuilder, DEFAULT_BINARY, DEFAULT_BUFFER_SIZE};
pub use generated::{render_config, GeneratedConfig};
pub use identifier::{
    is_valid_field_name, is_valid_namespace, FieldName, FieldSet, IdentifierKind, Namespace,
    DEFAULT_NAMESPACE, FIELD_PATTERN, NAMESPACE_PATTERN,
};
