//! Column type catalog.
//!
//! A column type is written as `name` or `name:arg`, where `arg` is a positive
//! byte count. Fixed-width kinds ignore the argument; the variable-width kinds
//! (`string`, `binary`, `bson`) require it, and the resulting width is a hard
//! truncation boundary for every cell of the column.

use std::fmt;
use std::str::FromStr;

use doccol_common::{Result, error::Error};

use crate::WireType;

/// The closed set of column kinds.
///
/// The last four variants are derived pseudo-kinds: their cells are computed from the
/// shape of the source value (its wire type tag, its length or its size) instead of
/// being copied from its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    ObjectId,
    Date,
    Timestamp,
    String,
    Binary,
    Bson,
    Type,
    Length,
    Size,
    WireSize,
}

impl TypeKind {
    pub const ALL: [TypeKind; 21] = [
        TypeKind::Bool,
        TypeKind::Int8,
        TypeKind::Int16,
        TypeKind::Int32,
        TypeKind::Int64,
        TypeKind::UInt8,
        TypeKind::UInt16,
        TypeKind::UInt32,
        TypeKind::UInt64,
        TypeKind::Float32,
        TypeKind::Float64,
        TypeKind::ObjectId,
        TypeKind::Date,
        TypeKind::Timestamp,
        TypeKind::String,
        TypeKind::Binary,
        TypeKind::Bson,
        TypeKind::Type,
        TypeKind::Length,
        TypeKind::Size,
        TypeKind::WireSize,
    ];

    /// The name of the kind in the type grammar.
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::Int8 => "int8",
            TypeKind::Int16 => "int16",
            TypeKind::Int32 => "int32",
            TypeKind::Int64 => "int64",
            TypeKind::UInt8 => "uint8",
            TypeKind::UInt16 => "uint16",
            TypeKind::UInt32 => "uint32",
            TypeKind::UInt64 => "uint64",
            TypeKind::Float32 => "float32",
            TypeKind::Float64 => "float64",
            TypeKind::ObjectId => "id",
            TypeKind::Date => "date",
            TypeKind::Timestamp => "timestamp",
            TypeKind::String => "string",
            TypeKind::Binary => "binary",
            TypeKind::Bson => "bson",
            TypeKind::Type => "type",
            TypeKind::Length => "length",
            TypeKind::Size => "size",
            TypeKind::WireSize => "wiresize",
        }
    }

    /// Looks up a kind by its grammar name.
    pub fn from_name(name: &str) -> Option<TypeKind> {
        TypeKind::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Returns `true` for `string`, `binary` and `bson`, whose cell width comes from
    /// the explicit size argument.
    pub fn is_variable_width(&self) -> bool {
        matches!(self, TypeKind::String | TypeKind::Binary | TypeKind::Bson)
    }

    /// Returns `true` for the pseudo-kinds computed from a value's shape.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            TypeKind::Type | TypeKind::Length | TypeKind::Size | TypeKind::WireSize
        )
    }

    /// Cell width in bytes for the fixed-width kinds, `None` for the variable-width ones.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            TypeKind::Bool | TypeKind::Int8 | TypeKind::UInt8 | TypeKind::Type => Some(1),
            TypeKind::Int16 | TypeKind::UInt16 => Some(2),
            TypeKind::Int32
            | TypeKind::UInt32
            | TypeKind::Float32
            | TypeKind::Length
            | TypeKind::Size
            | TypeKind::WireSize => Some(4),
            TypeKind::Int64
            | TypeKind::UInt64
            | TypeKind::Float64
            | TypeKind::Date
            | TypeKind::Timestamp => Some(8),
            TypeKind::ObjectId => Some(12),
            TypeKind::String | TypeKind::Binary | TypeKind::Bson => None,
        }
    }

    pub fn numeric_kind(&self) -> NumericKind {
        match self {
            TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 | TypeKind::Int64 => {
                NumericKind::Signed
            }
            TypeKind::UInt8
            | TypeKind::UInt16
            | TypeKind::UInt32
            | TypeKind::UInt64
            | TypeKind::Type
            | TypeKind::Length
            | TypeKind::Size
            | TypeKind::WireSize => NumericKind::Unsigned,
            TypeKind::Float32 | TypeKind::Float64 => NumericKind::Float,
            _ => NumericKind::None,
        }
    }

    /// The wire type a cell of this kind is written as when building documents.
    /// Derived kinds have no wire representation.
    pub fn encode_wire_type(&self) -> Option<WireType> {
        match self {
            TypeKind::Bool => Some(WireType::Boolean),
            TypeKind::Int8
            | TypeKind::Int16
            | TypeKind::Int32
            | TypeKind::UInt8
            | TypeKind::UInt16 => Some(WireType::Int32),
            TypeKind::Int64 | TypeKind::UInt32 | TypeKind::UInt64 => Some(WireType::Int64),
            TypeKind::Float32 | TypeKind::Float64 => Some(WireType::Double),
            TypeKind::ObjectId => Some(WireType::ObjectId),
            TypeKind::Date => Some(WireType::DateTime),
            TypeKind::Timestamp => Some(WireType::Timestamp),
            TypeKind::String => Some(WireType::String),
            TypeKind::Binary => Some(WireType::Binary),
            TypeKind::Bson => Some(WireType::EmbeddedDocument),
            TypeKind::Type | TypeKind::Length | TypeKind::Size | TypeKind::WireSize => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric interpretation of a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    None,
    Signed,
    Unsigned,
    Float,
}

/// A resolved column type: its kind, the width of one cell in bytes, and the wire
/// type used when the column is written into documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    /// Bytes per cell. For variable-width kinds this is the explicit size argument.
    pub width: usize,
    pub numeric: NumericKind,
    pub wire_type: Option<WireType>,
    /// The argument given in the type spec. Kept for fixed-width kinds so the spec
    /// prints back as written, but it does not affect their width.
    pub arg: Option<usize>,
}

impl TypeDescriptor {
    /// Parses and resolves a `name[:arg]` type spec.
    pub fn resolve(type_spec: &str) -> Result<TypeDescriptor> {
        let mut parts = type_spec.split(':');
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(Error::invalid_type_spec(type_spec, "too many parts in type"));
        }

        let kind = TypeKind::from_name(name)
            .ok_or_else(|| Error::invalid_type_spec(type_spec, "unknown type name"))?;

        let arg = match arg {
            Some(arg) => Some(parse_type_arg(arg).ok_or_else(|| {
                Error::invalid_type_spec(type_spec, "unable to parse type argument")
            })?),
            None => None,
        };

        match kind.fixed_width() {
            Some(_) => Ok(TypeDescriptor {
                arg,
                ..TypeDescriptor::fixed(kind)
            }),
            None => match arg {
                Some(width) if width > 0 => Ok(TypeDescriptor::sized(kind, width)),
                _ => Err(Error::invalid_type_spec(
                    type_spec,
                    format!("'{name}' must have an explicit type argument with nonzero length"),
                )),
            },
        }
    }

    /// Descriptor for a fixed-width kind.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is variable-width.
    pub fn fixed(kind: TypeKind) -> TypeDescriptor {
        let width = kind
            .fixed_width()
            .expect("TypeDescriptor::fixed requires a fixed-width kind");
        TypeDescriptor {
            kind,
            width,
            numeric: kind.numeric_kind(),
            wire_type: kind.encode_wire_type(),
            arg: None,
        }
    }

    /// Descriptor for a variable-width kind with an explicit cell width.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is fixed-width or `width` is zero.
    pub fn sized(kind: TypeKind, width: usize) -> TypeDescriptor {
        assert!(kind.is_variable_width());
        assert_ne!(width, 0);
        TypeDescriptor {
            kind,
            width,
            numeric: NumericKind::None,
            wire_type: kind.encode_wire_type(),
            arg: Some(width),
        }
    }

    pub fn is_derived(&self) -> bool {
        self.kind.is_derived()
    }

    /// Returns `true` if cells of both descriptors have the same kind and width,
    /// regardless of any ignored type argument.
    pub fn same_layout(&self, other: &TypeDescriptor) -> bool {
        self.kind == other.kind && self.width == other.width
    }

    /// Returns `true` if the descriptor can be used for a column written into documents.
    pub fn is_insertable(&self) -> bool {
        !self.kind.is_derived()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg {
            Some(arg) => write!(f, "{}:{arg}", self.kind.name()),
            None => f.write_str(self.kind.name()),
        }
    }
}

/// Parses a type argument written as plain decimal digits without a leading zero.
fn parse_type_arg(arg: &str) -> Option<usize> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if arg.len() > 1 && arg.starts_with('0') {
        return None;
    }
    arg.parse().ok()
}

impl FromStr for TypeDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<TypeDescriptor> {
        TypeDescriptor::resolve(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_kinds_ignore_argument() {
        let plain = TypeDescriptor::resolve("int32").unwrap();
        let with_arg = TypeDescriptor::resolve("int32:17").unwrap();
        assert!(plain.same_layout(&with_arg));
        assert_eq!(with_arg.width, 4);
        assert_eq!(with_arg.arg, Some(17));
        assert_eq!(with_arg.to_string(), "int32:17");
        assert_eq!(plain.width, 4);
        assert_eq!(plain.numeric, NumericKind::Signed);
        assert_eq!(plain.wire_type, Some(WireType::Int32));
    }

    #[test]
    fn test_variable_width_requires_argument() {
        for name in ["string", "binary", "bson"] {
            assert!(TypeDescriptor::resolve(name).is_err());
            assert!(TypeDescriptor::resolve(&format!("{name}:0")).is_err());
            let desc = TypeDescriptor::resolve(&format!("{name}:12")).unwrap();
            assert_eq!(desc.width, 12);
        }
    }

    #[test]
    fn test_widths() {
        let widths = [
            ("bool", 1),
            ("uint16", 2),
            ("float32", 4),
            ("date", 8),
            ("timestamp", 8),
            ("id", 12),
            ("type", 1),
            ("length", 4),
            ("size", 4),
            ("wiresize", 4),
        ];
        for (spec, width) in widths {
            assert_eq!(TypeDescriptor::resolve(spec).unwrap().width, width, "{spec}");
        }
    }

    #[test]
    fn test_derived_kinds() {
        for spec in ["type", "length", "size", "wiresize"] {
            let desc = TypeDescriptor::resolve(spec).unwrap();
            assert!(desc.is_derived());
            assert!(!desc.is_insertable());
            assert_eq!(desc.wire_type, None);
        }
        assert!(TypeDescriptor::resolve("bson:64").unwrap().is_insertable());
    }
}
