//! Materializes one document into one row of a [`ColumnSet`].

use bson::raw::{RawArray, RawBsonRef, RawDocument};
use bson::spec::BinarySubtype;
use doccol_columns::{ColumnBuffer, ColumnSet, NativeType};
use doccol_common::{Result, error::Error, verify_arg};
use doccol_format::TypeKind;

/// Fills row `row` of every column in `set` from `doc`.
///
/// Each column's path is resolved in the document; if the path is absent or the
/// value cannot be represented exactly in the column's kind, the cell is masked and
/// its data bytes are left as they were. Otherwise the value is stored and the mask
/// cleared.
///
/// Returns the number of cells masked in this row.
pub fn decode_into(doc: &RawDocument, set: &mut ColumnSet, row: usize) -> Result<usize> {
    verify_arg!(row, row < set.capacity());
    let mut masked = 0;
    for column in set.columns_mut() {
        let (spec, buffer) = column.split_mut();
        let stored = match lookup_path(doc, spec.path.as_str())? {
            Some(value) => store_value(buffer, row, value)?,
            None => false,
        };
        if !stored {
            buffer.set_masked(row);
            masked += 1;
        }
    }
    Ok(masked)
}

/// Resolves a dotted path inside `doc`, descending into nested documents and, for
/// segments that are non-negative integers, into arrays.
pub fn lookup_path<'a>(doc: &'a RawDocument, path: &str) -> Result<Option<RawBsonRef<'a>>> {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Ok(None);
    };
    let mut current = match doc.get(first).map_err(|e| raw_error(path, e))? {
        Some(value) => value,
        None => return Ok(None),
    };
    for segment in segments {
        let next = match current {
            RawBsonRef::Document(sub) => sub.get(segment).map_err(|e| raw_error(path, e))?,
            RawBsonRef::Array(items) => match segment.parse::<usize>() {
                Ok(index) => items.get(index).map_err(|e| raw_error(path, e))?,
                Err(_) => None,
            },
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Stores `value` into the cell if it is representable in the column's kind.
/// Returns `false` if the cell should be masked instead.
fn store_value(buffer: &mut ColumnBuffer, row: usize, value: RawBsonRef<'_>) -> Result<bool> {
    let stored = match buffer.kind() {
        TypeKind::Bool => match value {
            RawBsonRef::Boolean(b) => store(buffer, row, b as u8)?,
            _ => false,
        },
        TypeKind::Int8 => store_int::<i8>(buffer, row, value)?,
        TypeKind::Int16 => store_int::<i16>(buffer, row, value)?,
        TypeKind::Int32 => store_int::<i32>(buffer, row, value)?,
        TypeKind::Int64 => store_int::<i64>(buffer, row, value)?,
        TypeKind::UInt8 => store_int::<u8>(buffer, row, value)?,
        TypeKind::UInt16 => store_int::<u16>(buffer, row, value)?,
        TypeKind::UInt32 => store_int::<u32>(buffer, row, value)?,
        TypeKind::UInt64 => store_int::<u64>(buffer, row, value)?,
        TypeKind::Float32 => match as_f32(value) {
            Some(v) => store(buffer, row, v)?,
            None => false,
        },
        TypeKind::Float64 => match as_f64(value) {
            Some(v) => store(buffer, row, v)?,
            None => false,
        },
        TypeKind::ObjectId => match value {
            RawBsonRef::ObjectId(id) => store(buffer, row, id.bytes())?,
            _ => false,
        },
        TypeKind::Date => match value {
            RawBsonRef::DateTime(dt) => store(buffer, row, dt.timestamp_millis())?,
            _ => false,
        },
        TypeKind::Timestamp => match value {
            RawBsonRef::Timestamp(ts) => {
                store(buffer, row, ((ts.time as u64) << 32) | ts.increment as u64)?
            }
            _ => false,
        },
        TypeKind::String => match value {
            RawBsonRef::String(s) | RawBsonRef::Symbol(s) | RawBsonRef::JavaScriptCode(s) => {
                store_bytes(buffer, row, s.as_bytes())?
            }
            _ => false,
        },
        TypeKind::Binary => match value {
            RawBsonRef::Binary(bin) => store_bytes(buffer, row, bin.bytes)?,
            _ => false,
        },
        TypeKind::Bson => match value {
            RawBsonRef::Document(doc) => store_bytes(buffer, row, doc.as_bytes())?,
            RawBsonRef::Array(items) => store_bytes(buffer, row, items.as_bytes())?,
            _ => false,
        },
        TypeKind::Type => store(buffer, row, value.element_type() as u8)?,
        TypeKind::Length => match value_length(value)? {
            Some(len) => store_u32(buffer, row, len)?,
            None => false,
        },
        TypeKind::Size => match value_size(value) {
            Some(size) => store_u32(buffer, row, size)?,
            None => false,
        },
        TypeKind::WireSize => match wire_size(value) {
            Some(size) => store_u32(buffer, row, size)?,
            None => false,
        },
    };
    Ok(stored)
}

#[inline]
fn store<T: NativeType>(buffer: &mut ColumnBuffer, row: usize, value: T) -> Result<bool> {
    buffer.set(row, value)?;
    Ok(true)
}

#[inline]
fn store_bytes(buffer: &mut ColumnBuffer, row: usize, data: &[u8]) -> Result<bool> {
    buffer.set_bytes(row, data)?;
    Ok(true)
}

fn store_u32(buffer: &mut ColumnBuffer, row: usize, value: usize) -> Result<bool> {
    match u32::try_from(value) {
        Ok(v) => store(buffer, row, v),
        Err(_) => Ok(false),
    }
}

fn store_int<T>(buffer: &mut ColumnBuffer, row: usize, value: RawBsonRef<'_>) -> Result<bool>
where
    T: NativeType + TryFrom<i64> + TryFrom<u64>,
{
    let exact = match as_exact_i64(value) {
        Some(v) => <T as TryFrom<i64>>::try_from(v).ok(),
        // The only integral source beyond the i64 range is a large double.
        None => match value {
            RawBsonRef::Double(d) => {
                exact_u64(d).and_then(|v| <T as TryFrom<u64>>::try_from(v).ok())
            }
            _ => None,
        },
    };
    match exact {
        Some(v) => store(buffer, row, v),
        None => Ok(false),
    }
}

/// The value as an `i64` if it is an integer, or an integral double within range.
fn as_exact_i64(value: RawBsonRef<'_>) -> Option<i64> {
    match value {
        RawBsonRef::Int32(v) => Some(v as i64),
        RawBsonRef::Int64(v) => Some(v),
        RawBsonRef::Double(d) => {
            if d.is_finite() && d.trunc() == d && d >= i64::MIN as f64 && d < i64::MAX as f64 {
                Some(d as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn exact_u64(d: f64) -> Option<u64> {
    (d.is_finite() && d.trunc() == d && d >= 0.0 && d < u64::MAX as f64).then_some(d as u64)
}

fn as_f32(value: RawBsonRef<'_>) -> Option<f32> {
    match value {
        RawBsonRef::Int32(v) => {
            let f = v as f32;
            (f as i64 == v as i64).then_some(f)
        }
        RawBsonRef::Int64(v) => {
            let f = v as f32;
            (f as i128 == v as i128).then_some(f)
        }
        RawBsonRef::Double(d) => {
            let f = d as f32;
            (d.is_nan() || f as f64 == d).then_some(f)
        }
        _ => None,
    }
}

fn as_f64(value: RawBsonRef<'_>) -> Option<f64> {
    match value {
        RawBsonRef::Int32(v) => Some(v as f64),
        RawBsonRef::Int64(v) => {
            let f = v as f64;
            (f as i128 == v as i128).then_some(f)
        }
        RawBsonRef::Double(d) => Some(d),
        _ => None,
    }
}

/// Element count for arrays, key count for documents, character count for strings
/// and byte count for binaries. `None` for values that have no length.
pub fn value_length(value: RawBsonRef<'_>) -> Result<Option<usize>> {
    let len = match value {
        RawBsonRef::String(s) | RawBsonRef::Symbol(s) | RawBsonRef::JavaScriptCode(s) => {
            Some(s.chars().count())
        }
        RawBsonRef::JavaScriptCodeWithScope(code) => Some(code.code.chars().count()),
        RawBsonRef::Binary(bin) => Some(bin.bytes.len()),
        RawBsonRef::Array(items) => Some(count_items(items)?),
        RawBsonRef::Document(doc) => Some(count_keys(doc)?),
        _ => None,
    };
    Ok(len)
}

/// Payload size in bytes: UTF-8 length of strings, length of binaries, serialized
/// size of documents and arrays. `None` for values that have no size.
pub fn value_size(value: RawBsonRef<'_>) -> Option<usize> {
    match value {
        RawBsonRef::String(s) | RawBsonRef::Symbol(s) | RawBsonRef::JavaScriptCode(s) => {
            Some(s.len())
        }
        RawBsonRef::JavaScriptCodeWithScope(code) => Some(code.code.len()),
        RawBsonRef::Binary(bin) => Some(bin.bytes.len()),
        RawBsonRef::Array(items) => Some(items.as_bytes().len()),
        RawBsonRef::Document(doc) => Some(doc.as_bytes().len()),
        _ => None,
    }
}

/// Number of bytes the value occupies in a serialized document, excluding the type
/// tag and the key.
pub fn wire_size(value: RawBsonRef<'_>) -> Option<usize> {
    let size = match value {
        RawBsonRef::Double(_) => 8,
        RawBsonRef::String(s) | RawBsonRef::Symbol(s) | RawBsonRef::JavaScriptCode(s) => {
            4 + s.len() + 1
        }
        RawBsonRef::Document(doc) => doc.as_bytes().len(),
        RawBsonRef::Array(items) => items.as_bytes().len(),
        RawBsonRef::Binary(bin) => {
            let old_prefix = if bin.subtype == BinarySubtype::BinaryOld { 4 } else { 0 };
            4 + 1 + old_prefix + bin.bytes.len()
        }
        RawBsonRef::Undefined | RawBsonRef::Null | RawBsonRef::MinKey | RawBsonRef::MaxKey => 0,
        RawBsonRef::ObjectId(_) => 12,
        RawBsonRef::Boolean(_) => 1,
        RawBsonRef::DateTime(_) | RawBsonRef::Timestamp(_) | RawBsonRef::Int64(_) => 8,
        RawBsonRef::RegularExpression(regex) => regex.pattern.len() + 1 + regex.options.len() + 1,
        RawBsonRef::JavaScriptCodeWithScope(code) => {
            4 + (4 + code.code.len() + 1) + code.scope.as_bytes().len()
        }
        RawBsonRef::Int32(_) => 4,
        RawBsonRef::Decimal128(_) => 16,
        _ => return None,
    };
    Some(size)
}

fn count_items(items: &RawArray) -> Result<usize> {
    let mut count = 0;
    for item in items {
        item.map_err(|e| raw_error("array", e))?;
        count += 1;
    }
    Ok(count)
}

fn count_keys(doc: &RawDocument) -> Result<usize> {
    let mut count = 0;
    for entry in doc {
        entry.map_err(|e| raw_error("document", e))?;
        count += 1;
    }
    Ok(count)
}

fn raw_error(context: &str, e: bson::raw::Error) -> Error {
    Error::invalid_document(context, e.to_string())
}
