//! ExifTool user-defined tag configuration.
//!
//! ExifTool only writes XMP tags it knows about. To write custom fields we
//! generate a config file declaring a custom XMP group with one writable
//! string tag per field and pass it with `-config` at startup.

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use super::identifier::FieldSet;
use crate::{Error, Result};

/// Render the config document for a field set.
///
/// The output is deterministic: tags are declared in field-set order.
pub fn render_config(set: &FieldSet) -> String {
    let ns = set.namespace().as_str();
    let fields: String = set
        .fields()
        .iter()
        .map(|field| format!("    {field} => {{ }},\n"))
        .collect();

    format!(
        "\
%Image::ExifTool::UserDefined = (
    'Image::ExifTool::XMP::Main' => {{
        {ns} => {{
            SubDirectory => {{
                TagTable => 'Image::ExifTool::UserDefined::{ns}',
            }},
        }},
    }}
);
%Image::ExifTool::UserDefined::{ns} = (
    GROUPS => {{ 0 => 'XMP', 1 => 'XMP-{ns}' }},
    NAMESPACE => {{ '{ns}' => 'http://ns.example.com/{ns}/1.0/' }},
    WRITABLE => 'string',
{fields});
1;
"
    )
}

/// A generated config file on disk.
///
/// The file is removed when this value is dropped, so it must outlive the
/// process that was started with it.
#[derive(Debug)]
pub struct GeneratedConfig {
    file: NamedTempFile,
}

impl GeneratedConfig {
    /// Render and persist the config for `set` to a temporary file.
    pub fn write(set: &FieldSet) -> Result<Self> {
        Self::write_in(set, None)
    }

    /// Like [`write`](Self::write), placing the file in `dir` if given.
    pub fn write_in(set: &FieldSet, dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("exif").suffix(".config");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(Error::ConfigWrite)?;

        file.write_all(render_config(set).as_bytes())
            .map_err(Error::ConfigWrite)?;
        file.as_file().sync_all().map_err(Error::ConfigWrite)?;

        tracing::debug!(
            path = %file.path().display(),
            namespace = %set.namespace(),
            "wrote exiftool config"
        );

        Ok(Self { file })
    }

    /// Location of the config file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
