//! Process management for exiftool.
//!
//! A single exiftool process is started in `-stay_open` mode and reused for
//! every command of a session.
//!
//! # Architecture
//!
//! ```text
//! libexiftool                          exiftool -stay_open True -@ -
//! ┌──────────────┐                    ┌─────────────┐
//! │ExifToolProcess│──stdin (args)─────▶│             │
//! │              │◀─merged pipe───┬───│ stdout      │
//! │              │                └───│ stderr      │
//! └──────────────┘                    └─────────────┘
//! ```
//!
//! Stdout and stderr are connected to the write end of the same OS pipe, so
//! the session sees one ordered stream.

mod io;
mod spawn;

pub use io::{InputStream, OutputStream, ProcessWriter};
pub use spawn::ExifToolProcess;

/// Minimum exiftool version this crate is tested against.
pub const MIN_EXIFTOOL_VERSION: &str = "12.15";
