//! Dotted field paths (`a.b.c`) addressing values inside nested documents.

use std::fmt;

use doccol_common::{Result, error::Error, error::ErrorKind};

/// Maximum length of a field path, in bytes.
pub const MAX_FIELD_NAME_LEN: usize = 1024;

/// Maximum number of `.` separators in a field path written into documents.
pub const MAX_NESTING_DEPTH: usize = 100;

/// The name of the primary identifier field of a record.
pub const ID_FIELD: &str = "_id";

/// A non-empty field path no longer than [`MAX_FIELD_NAME_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    /// Creates a path, checking only the constraints shared by reads and writes:
    /// the path must be non-empty and within the length bound.
    pub fn parse(path: impl Into<String>) -> Result<FieldPath> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::invalid_field_name(path, "field name must not be empty"));
        }
        if path.len() > MAX_FIELD_NAME_LEN {
            return Err(ErrorKind::FieldNameTooLong {
                len: path.len(),
                max: MAX_FIELD_NAME_LEN,
            }
            .into());
        }
        Ok(FieldPath(path))
    }

    /// Checks the stricter rules for paths used as keys of written documents:
    /// no empty segment (which also rules out leading and trailing dots), no segment
    /// starting with the `$` operator prefix, and at most [`MAX_NESTING_DEPTH`] levels.
    pub fn validate_for_insert(&self) -> Result<()> {
        let depth = self.0.matches('.').count();
        if depth >= MAX_NESTING_DEPTH {
            return Err(ErrorKind::NestingTooDeep {
                field: self.0.clone(),
                max: MAX_NESTING_DEPTH,
            }
            .into());
        }
        for segment in self.segments() {
            if segment.is_empty() {
                return Err(Error::invalid_field_name(
                    self.0.as_str(),
                    "field name has an empty segment",
                ));
            }
            if segment.starts_with('$') {
                return Err(Error::invalid_field_name(
                    self.0.as_str(),
                    "field name segment must not start with '$'",
                ));
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('.')
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Returns `true` if the path is the record's primary identifier field.
    pub fn is_id(&self) -> bool {
        self.0 == ID_FIELD
    }

    /// Returns `true` if `self` is a strict dotted prefix of `other`
    /// (`a.b` is a prefix of `a.b.c`, but not of `a.bc`).
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(self.0.as_str())
            && other.0.as_bytes()[self.0.len()] == b'.'
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = Error;

    fn try_from(value: &str) -> Result<FieldPath> {
        FieldPath::parse(value)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = Error;

    fn try_from(value: String) -> Result<FieldPath> {
        FieldPath::parse(value)
    }
}
