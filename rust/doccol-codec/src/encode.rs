//! Builds one document from one row of a [`ColumnSet`].

use bson::{Bson, Document, RawDocument, oid::ObjectId, spec::BinarySubtype};
use doccol_columns::{
    ColumnBuffer, ColumnSet, ColumnSpec, NativeType, column_set::validate_insert_specs,
};
use doccol_common::{Result, error::Error, verify_arg};
use doccol_format::{TypeKind, field_path::ID_FIELD};
use itertools::Itertools;

/// Writes rows of a column set as documents.
///
/// The identifier column, if present, is always emitted first; the remaining columns
/// follow in field-path order, which keeps the keys of each nested sub-document
/// together.
#[derive(Debug, Clone)]
pub struct DocumentEncoder {
    id_column: Option<usize>,
    order: Vec<usize>,
}

impl DocumentEncoder {
    /// Validates the column set for writing and precomputes the column order.
    pub fn new(set: &ColumnSet) -> Result<DocumentEncoder> {
        let specs = set.specs().cloned().collect::<Vec<ColumnSpec>>();
        validate_insert_specs(&specs)?;
        let id_column = set.position(ID_FIELD);
        let order = specs
            .iter()
            .enumerate()
            .filter(|(_, spec)| !spec.path.is_id())
            .sorted_by(|(_, a), (_, b)| a.path.cmp(&b.path))
            .map(|(i, _)| i)
            .collect();
        Ok(DocumentEncoder { id_column, order })
    }

    /// Returns `true` if the set carries its own `_id` column.
    pub fn has_identifier(&self) -> bool {
        self.id_column.is_some()
    }

    /// Encodes row `row`.
    ///
    /// Masked cells are omitted. When the set has no identifier column, `_id` is set
    /// to `generated_id`, or to a fresh ObjectId if none is given.
    pub fn encode_row(
        &self,
        set: &ColumnSet,
        row: usize,
        generated_id: Option<ObjectId>,
    ) -> Result<Document> {
        verify_arg!(row, row < set.capacity());
        let mut doc = Document::new();

        match self.id_column {
            Some(index) => {
                let buffer = set.column(index).buffer();
                let value =
                    cell_to_bson(buffer, row)?.ok_or_else(|| Error::missing_identifier(row))?;
                doc.insert(ID_FIELD, value);
            }
            None => {
                doc.insert(ID_FIELD, generated_id.unwrap_or_else(ObjectId::new));
            }
        }

        for &index in &self.order {
            let column = set.column(index);
            if let Some(value) = cell_to_bson(column.buffer(), row)? {
                insert_nested(&mut doc, column.path().as_str(), value);
            }
        }
        Ok(doc)
    }
}

/// Fails with `MissingIdentifier` for the first row whose `_id` cell is masked.
///
/// Only the filled rows are checked.
pub fn validate_identifiers(set: &ColumnSet) -> Result<()> {
    if let Some(column) = set.column_by_path(ID_FIELD) {
        let buffer = column.buffer();
        if let Some(row) = (0..set.rows_filled()).find(|&row| buffer.is_masked(row)) {
            return Err(Error::missing_identifier(row));
        }
    }
    Ok(())
}

/// Converts one cell to a document value.
///
/// Returns `None` for masked cells and for cells whose content has no document
/// representation (a `uint64` above `i64::MAX`, a `string` that is not valid UTF-8,
/// a `bson` cell that does not hold a well-formed document).
pub fn cell_to_bson(buffer: &ColumnBuffer, row: usize) -> Result<Option<Bson>> {
    verify_arg!(row, row < buffer.capacity());
    if buffer.is_masked(row) {
        return Ok(None);
    }
    let value = match buffer.kind() {
        TypeKind::Bool => Bson::Boolean(cell_value::<u8>(buffer, row)? != 0),
        TypeKind::Int8 => Bson::Int32(cell_value::<i8>(buffer, row)? as i32),
        TypeKind::Int16 => Bson::Int32(cell_value::<i16>(buffer, row)? as i32),
        TypeKind::Int32 => Bson::Int32(cell_value::<i32>(buffer, row)?),
        TypeKind::Int64 => Bson::Int64(cell_value::<i64>(buffer, row)?),
        TypeKind::UInt8 => Bson::Int32(cell_value::<u8>(buffer, row)? as i32),
        TypeKind::UInt16 => Bson::Int32(cell_value::<u16>(buffer, row)? as i32),
        TypeKind::UInt32 => Bson::Int64(cell_value::<u32>(buffer, row)? as i64),
        TypeKind::UInt64 => {
            let v = cell_value::<u64>(buffer, row)?;
            match i64::try_from(v) {
                Ok(v) => Bson::Int64(v),
                Err(_) => return Ok(omit(buffer, row, "value exceeds the int64 range")),
            }
        }
        TypeKind::Float32 => Bson::Double(cell_value::<f32>(buffer, row)? as f64),
        TypeKind::Float64 => Bson::Double(cell_value::<f64>(buffer, row)?),
        TypeKind::ObjectId => {
            Bson::ObjectId(ObjectId::from_bytes(cell_value::<[u8; 12]>(buffer, row)?))
        }
        TypeKind::Date => {
            Bson::DateTime(bson::DateTime::from_millis(cell_value::<i64>(buffer, row)?))
        }
        TypeKind::Timestamp => {
            let v = cell_value::<u64>(buffer, row)?;
            Bson::Timestamp(bson::Timestamp {
                time: (v >> 32) as u32,
                increment: v as u32,
            })
        }
        TypeKind::String => {
            let cell = buffer.bytes(row);
            let end = cell.iter().position(|&b| b == 0).unwrap_or(cell.len());
            match std::str::from_utf8(&cell[..end]) {
                Ok(s) => Bson::String(s.to_string()),
                Err(_) => return Ok(omit(buffer, row, "string is not valid UTF-8")),
            }
        }
        TypeKind::Binary => Bson::Binary(bson::Binary {
            subtype: BinarySubtype::Generic,
            bytes: buffer.bytes(row).to_vec(),
        }),
        TypeKind::Bson => match embedded_document(buffer.bytes(row)) {
            Some(doc) => Bson::Document(doc),
            None => return Ok(omit(buffer, row, "cell does not hold a well-formed document")),
        },
        TypeKind::Type | TypeKind::Length | TypeKind::Size | TypeKind::WireSize => {
            return Err(Error::invalid_type_spec(
                buffer.type_desc().to_string(),
                "derived types cannot be encoded",
            ));
        }
    };
    Ok(Some(value))
}

#[inline]
fn cell_value<T: NativeType>(buffer: &ColumnBuffer, row: usize) -> Result<T> {
    Ok(buffer.values::<T>()?[row])
}

fn omit(buffer: &ColumnBuffer, row: usize, reason: &str) -> Option<Bson> {
    log::debug!("omitting '{}' cell at row {row}: {reason}", buffer.type_desc());
    None
}

/// Parses the document whose length prefix starts the cell. Trailing padding after
/// the document is ignored.
fn embedded_document(cell: &[u8]) -> Option<Document> {
    let prefix: [u8; 4] = cell.get(..4)?.try_into().ok()?;
    let len = usize::try_from(i32::from_le_bytes(prefix)).ok()?;
    let raw = RawDocument::from_bytes(cell.get(..len)?).ok()?;
    Document::try_from(raw).ok()
}

/// Inserts `value` at a dotted path, creating intermediate sub-documents on demand.
fn insert_nested(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Some(Bson::Document(sub)) = doc.get_mut(head) {
                insert_nested(sub, rest, value);
            }
        }
    }
}
