//! Result of a bulk insert.

use bson::oid::ObjectId;
use doccol_columns::{ColumnBuffer, ColumnSet, ColumnSpec};
use doccol_common::Result;
use doccol_format::{FieldPath, TypeDescriptor, TypeKind, field_path::ID_FIELD};

/// The `_id` of every submitted row, as a single-column [`ColumnSet`].
///
/// The column has the type of the inserted set's own `_id` column, or `id` when the
/// identifiers were generated. Rows the server rejected are masked.
#[derive(Debug, Clone)]
pub struct IdentifierColumn {
    set: ColumnSet,
}

impl IdentifierColumn {
    pub(crate) fn new(spec: ColumnSpec, buffer: ColumnBuffer) -> Result<IdentifierColumn> {
        let set = ColumnSet::from_columns(vec![(spec, buffer)])?;
        Ok(IdentifierColumn { set })
    }

    /// The spec and an empty buffer for generated object ids.
    pub(crate) fn generated(rows: usize) -> Result<(ColumnSpec, ColumnBuffer)> {
        let desc = TypeDescriptor::fixed(TypeKind::ObjectId);
        let spec = ColumnSpec::new(FieldPath::parse(ID_FIELD)?, desc);
        Ok((spec, ColumnBuffer::new(desc, rows)))
    }

    pub fn len(&self) -> usize {
        self.set.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn buffer(&self) -> &ColumnBuffer {
        self.set.column(0).buffer()
    }

    /// Returns `true` if row `row` was written.
    pub fn is_inserted(&self, row: usize) -> bool {
        !self.buffer().is_masked(row)
    }

    /// Number of rows written.
    pub fn inserted_count(&self) -> usize {
        self.set.count_valid()
    }

    /// Rows the server rejected.
    pub fn failed_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&row| !self.is_inserted(row)).collect()
    }

    /// The identifier of row `row`, for `id` columns.
    pub fn object_id(&self, row: usize) -> Result<Option<ObjectId>> {
        self.buffer().object_id(row)
    }

    pub fn column_set(&self) -> &ColumnSet {
        &self.set
    }

    pub fn into_column_set(self) -> ColumnSet {
        self.set
    }
}
