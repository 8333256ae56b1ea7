//! ExifTool `-stay_open` line protocol.
//!
//! # Input
//!
//! Arguments are written one per line to the process stdin. A line holding
//! `-execute` runs everything written since the previous `-execute`:
//!
//! ```text
//! -xmp-custom:OriginalFilename=archive_001
//! photo.jpg
//! -execute
//! ```
//!
//! # Output
//!
//! Stdout and stderr share one stream. After each block ExifTool prints
//! `{ready}`; the bytes before it form one frame. Extraction frames hold a
//! JSON array with one object per file:
//!
//! ```text
//! [{"SourceFile":"photo.jpg","OriginalFilename":"archive_001"}]
//! {ready}
//! ```

mod command;
mod decode;
mod frame;
mod metadata;

pub use command::{assignment, check_value, path_arg, CommandBlock, EXECUTE};
pub use decode::{decode_fields, Fields};
pub use frame::{find_frame, FrameReader, READY_TOKEN};
pub use metadata::FileMetadata;
