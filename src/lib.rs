//! # libexiftool
//!
//! Async Rust driver for a long-lived ExifTool process.
//!
//! This library keeps one `exiftool -stay_open` process per [`Session`] and
//! talks to it over its line protocol, supporting:
//! - Batch metadata extraction without a process per file
//! - Writing custom XMP fields declared through a generated config
//! - Safe sharing of one session between tasks
//!
//! ## Quick Start
//!
//! ```ignore
//! use libexiftool::{Session, SessionConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::start(SessionConfig::builder().build()?).await?;
//!     for result in session.extract_metadata(&["photo.jpg"]).await? {
//!         println!("{:?}", result.get_string("Make"));
//!     }
//!     session.close().await
//! }
//! ```
//!
//! ## Custom Fields
//!
//! ```ignore
//! let config = SessionConfig::builder()
//!     .custom_fields("custom", ["OriginalFilename"])
//!     .build()?;
//! let session = Session::start(config).await?;
//! let results = session
//!     .set_field("OriginalFilename", "archive_001", &["photo.jpg"])
//!     .await?;
//! ```
//!
//! ## One-shot Writes
//!
//! ```ignore
//! let results = libexiftool::set_custom_metadata("OriginalFilename", "archive_001", &["photo.jpg"]).await?;
//! ```

pub mod config;
mod error;
mod oneshot;
pub mod process;
pub mod protocol;
mod session;

pub use error::{Error, Result};

pub use oneshot::{set_custom_metadata, set_metadata, set_metadata_with};
pub use session::Session;

// Re-export commonly used config types at crate root
pub use config::{
    FieldName, FieldSet, GeneratedConfig, IdentifierKind, Namespace, SessionConfig,
    SessionConfigBuilder,
};

// Re-export commonly used protocol types at crate root
pub use protocol::{FileMetadata, Fields};
