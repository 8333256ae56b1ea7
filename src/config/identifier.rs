//! Validated identifiers for user-defined tags.
//!
//! ExifTool only accepts a narrow identifier syntax for custom XMP groups and
//! tags. Anything else would corrupt the generated config, so both are checked
//! before any process interaction.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pattern a custom namespace must match.
pub const NAMESPACE_PATTERN: &str = "^[a-zA-Z0-9]+$";

/// Pattern a custom field name must match.
pub const FIELD_PATTERN: &str = "^[A-Z][a-zA-Z0-9]*$";

/// Namespace used by [`set_custom_metadata`](crate::set_custom_metadata).
pub const DEFAULT_NAMESPACE: &str = "custom";

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAMESPACE_PATTERN).expect("namespace regex"))
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FIELD_PATTERN).expect("field regex"))
}

/// Which identifier failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Namespace,
    Field,
}

impl IdentifierKind {
    /// The pattern this kind of identifier must match.
    pub fn pattern(self) -> &'static str {
        match self {
            IdentifierKind::Namespace => NAMESPACE_PATTERN,
            IdentifierKind::Field => FIELD_PATTERN,
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Namespace => write!(f, "namespace"),
            IdentifierKind::Field => write!(f, "field name"),
        }
    }
}

/// Returns true if `s` is a valid custom namespace.
pub fn is_valid_namespace(s: &str) -> bool {
    namespace_regex().is_match(s)
}

/// Returns true if `s` is a valid custom field name.
pub fn is_valid_field_name(s: &str) -> bool {
    field_regex().is_match(s)
}

/// A custom XMP namespace, e.g. `custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace.
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if !is_valid_namespace(&s) {
            return Err(Error::InvalidIdentifier {
                kind: IdentifierKind::Namespace,
                value: s,
            });
        }
        Ok(Namespace(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A custom field (tag) name, e.g. `OriginalFilename`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldName(String);

impl FieldName {
    /// Validate and wrap a field name.
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if !is_valid_field_name(&s) {
            return Err(Error::InvalidIdentifier {
                kind: IdentifierKind::Field,
                value: s,
            });
        }
        Ok(FieldName(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! identifier_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(s: String) -> Result<Self> {
                $ty::new(s)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = Error;

            fn try_from(s: &str) -> Result<Self> {
                $ty::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> String {
                id.0
            }
        }
    };
}

identifier_conversions!(Namespace);
identifier_conversions!(FieldName);

/// A fixed list of custom fields bound to one namespace.
///
/// Field order is preserved and duplicates are dropped, so the generated
/// config is deterministic for a given input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    namespace: Namespace,
    fields: Vec<FieldName>,
}

impl FieldSet {
    /// Validate a namespace and its field names.
    ///
    /// The namespace is checked first, then each field in order. At least one
    /// field is required.
    pub fn new(
        namespace: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let namespace = Namespace::new(namespace)?;
        let mut validated: Vec<FieldName> = Vec::new();
        for field in fields {
            let field = FieldName::new(field)?;
            if !validated.contains(&field) {
                validated.push(field);
            }
        }
        if validated.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "field set for namespace {namespace} declares no fields"
            )));
        }
        Ok(Self {
            namespace,
            fields: validated,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }

    /// Returns true if `name` is one of the declared fields.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.as_str() == name)
    }
}
