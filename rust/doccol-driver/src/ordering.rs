//! Sort and hint specifications.

use bson::{Bson, Document};
use doccol_common::{Result, error::Error};

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// The direction as written in a sort document (`1` or `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    fn from_bson(value: &Bson) -> Option<SortDirection> {
        let v = match value {
            Bson::Int32(v) => *v as f64,
            Bson::Int64(v) => *v as f64,
            Bson::Double(v) => *v,
            _ => return None,
        };
        if v == 1.0 {
            Some(SortDirection::Ascending)
        } else if v == -1.0 {
            Some(SortDirection::Descending)
        } else {
            None
        }
    }
}

/// An ordered, non-empty list of `(field, direction)` keys, used both for sorting and
/// for index hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering(Vec<(String, SortDirection)>);

impl Ordering {
    /// A single ascending key.
    pub fn ascending(field: impl Into<String>) -> Result<Ordering> {
        Ordering::from_keys(vec![(field.into(), SortDirection::Ascending)])
    }

    pub fn from_keys(keys: Vec<(String, SortDirection)>) -> Result<Ordering> {
        if keys.is_empty() {
            return Err(Error::invalid_ordering("ordering must not be empty"));
        }
        if keys.iter().any(|(field, _)| field.is_empty()) {
            return Err(Error::invalid_ordering("field name must not be empty"));
        }
        Ok(Ordering(keys))
    }

    /// Interprets a caller-supplied ordering: either a field name (ascending) or an
    /// array of `[field, direction]` pairs with direction `1` or `-1`.
    pub fn from_bson(value: &Bson) -> Result<Ordering> {
        match value {
            Bson::String(field) => Ordering::ascending(field.as_str()),
            Bson::Array(pairs) => {
                let keys = pairs
                    .iter()
                    .map(|pair| match pair {
                        Bson::Array(items) => match items.as_slice() {
                            [Bson::String(field), direction] => {
                                let direction =
                                    SortDirection::from_bson(direction).ok_or_else(|| {
                                        Error::invalid_ordering(format!(
                                            "invalid direction {direction} for '{field}'"
                                        ))
                                    })?;
                                Ok((field.clone(), direction))
                            }
                            _ => Err(Error::invalid_ordering(
                                "each key must be a [field, direction] pair",
                            )),
                        },
                        other => Err(Error::invalid_ordering(format!(
                            "expected a [field, direction] pair, found {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ordering::from_keys(keys)
            }
            other => Err(Error::invalid_ordering(format!(
                "ordering must be a field name or a list of (field, direction) pairs, \
                 found {other}"
            ))),
        }
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.0
    }

    /// Renders the ordering as a sort/hint document (`{ field: 1, other: -1 }`).
    pub fn to_document(&self) -> Document {
        self.0
            .iter()
            .map(|(field, direction)| (field.clone(), Bson::Int32(direction.as_i32())))
            .collect()
    }
}
