//! An ordered collection of columns sharing one row capacity.

use ahash::AHashSet;
use doccol_common::{Result, error::Error, error::ErrorKind, verify_arg};
use doccol_format::{FieldPath, TypeDescriptor};

use crate::column::ColumnBuffer;

/// Maximum number of columns in a [`ColumnSet`].
pub const MAX_COLUMNS: usize = 1024;

/// A field path and the type its values are materialized as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub path: FieldPath,
    pub desc: TypeDescriptor,
}

impl ColumnSpec {
    pub fn new(path: FieldPath, desc: TypeDescriptor) -> ColumnSpec {
        ColumnSpec { path, desc }
    }

    /// Parses the field path and resolves the `name[:arg]` type spec.
    pub fn parse(path: &str, type_spec: &str) -> Result<ColumnSpec> {
        Ok(ColumnSpec {
            path: FieldPath::parse(path)?,
            desc: TypeDescriptor::resolve(type_spec)?,
        })
    }
}

/// One column of a [`ColumnSet`]: its spec and its buffer.
#[derive(Debug, Clone)]
pub struct Column {
    spec: ColumnSpec,
    buffer: ColumnBuffer,
}

impl Column {
    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    pub fn path(&self) -> &FieldPath {
        &self.spec.path
    }

    pub fn buffer(&self) -> &ColumnBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ColumnBuffer {
        &mut self.buffer
    }

    /// Borrows the spec and the buffer at the same time.
    pub fn split_mut(&mut self) -> (&ColumnSpec, &mut ColumnBuffer) {
        (&self.spec, &mut self.buffer)
    }
}

/// Typed column buffers for a list of field paths, all with the same row capacity.
///
/// Row `i` of every column corresponds to the same source or target document. The
/// set exclusively owns its buffers; decoders, encoders and cursors only borrow them
/// for the duration of a call.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: Vec<Column>,
    capacity: usize,
    rows_filled: usize,
}

impl ColumnSet {
    /// Allocates a column set for reading query results.
    ///
    /// The same field path may appear more than once (for example, to read a value
    /// together with its `length` and `size`).
    pub fn allocate(specs: Vec<ColumnSpec>, capacity: usize) -> Result<ColumnSet> {
        validate_query_specs(&specs)?;
        let columns = specs
            .into_iter()
            .map(|spec| Column {
                buffer: ColumnBuffer::new(spec.desc, capacity),
                spec,
            })
            .collect();
        Ok(ColumnSet {
            columns,
            capacity,
            rows_filled: 0,
        })
    }

    /// Allocates a column set whose rows will be written as documents.
    ///
    /// On top of the [`ColumnSet::allocate`] checks, field paths must be unique,
    /// no path may be a dotted prefix of another, every path must be a valid document
    /// key path, and derived pseudo-kinds are rejected.
    ///
    /// Every row counts as filled; lower [`ColumnSet::set_rows_filled`] to write fewer.
    pub fn allocate_for_insert(specs: Vec<ColumnSpec>, capacity: usize) -> Result<ColumnSet> {
        validate_insert_specs(&specs)?;
        let mut set = ColumnSet::allocate(specs, capacity)?;
        set.rows_filled = capacity;
        Ok(set)
    }

    /// Convenience constructor from `(field, type_spec)` pairs.
    pub fn from_specs_str(specs: &[(&str, &str)], capacity: usize) -> Result<ColumnSet> {
        let specs = parse_specs(specs)?;
        ColumnSet::allocate(specs, capacity)
    }

    /// Convenience constructor from `(field, type_spec)` pairs for inserts.
    pub fn from_specs_str_for_insert(specs: &[(&str, &str)], capacity: usize) -> Result<ColumnSet> {
        let specs = parse_specs(specs)?;
        ColumnSet::allocate_for_insert(specs, capacity)
    }

    /// Builds a column set from columns of the same length, e.g. to wrap buffers that
    /// were filled independently.
    pub fn from_columns(columns: Vec<(ColumnSpec, ColumnBuffer)>) -> Result<ColumnSet> {
        verify_arg!(columns, columns.len() <= MAX_COLUMNS);
        let capacity = columns.first().map(|(_, b)| b.capacity()).unwrap_or(0);
        for (spec, buffer) in &columns {
            verify_arg!(buffer, buffer.capacity() == capacity);
            verify_arg!(buffer, buffer.type_desc().same_layout(&spec.desc));
        }
        Ok(ColumnSet {
            columns: columns
                .into_iter()
                .map(|(spec, buffer)| Column { spec, buffer })
                .collect(),
            capacity,
            rows_filled: capacity,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of leading rows that hold data from the most recent fill.
    #[inline]
    pub fn rows_filled(&self) -> usize {
        self.rows_filled
    }

    pub fn set_rows_filled(&mut self, rows: usize) -> Result<()> {
        verify_arg!(rows, rows <= self.capacity);
        self.rows_filled = rows;
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn column_mut(&mut self, index: usize) -> &mut Column {
        &mut self.columns[index]
    }

    pub fn specs(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().map(|c| &c.spec)
    }

    /// Index of the first column bound to `path`.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.spec.path.as_str() == path)
    }

    /// The first column bound to `path`.
    pub fn column_by_path(&self, path: &str) -> Option<&Column> {
        self.position(path).map(|i| &self.columns[i])
    }

    /// Buffer of the first column bound to `path`.
    pub fn buffer_by_path(&self, path: &str) -> Option<&ColumnBuffer> {
        self.position(path).map(|i| &self.columns[i].buffer)
    }

    pub fn buffer_by_path_mut(&mut self, path: &str) -> Option<&mut ColumnBuffer> {
        self.position(path).map(|i| &mut self.columns[i].buffer)
    }

    /// Masks every cell at or beyond `row` in every column.
    pub fn mask_rows_from(&mut self, row: usize) {
        for column in &mut self.columns {
            column.buffer.mask_from(row);
        }
    }

    /// Masks and zeroes every cell and resets the filled row count.
    pub fn reset(&mut self) {
        for column in &mut self.columns {
            column.buffer.reset();
        }
        self.rows_filled = 0;
    }

    /// Total number of masked cells within the filled rows.
    pub fn count_masked(&self) -> usize {
        self.columns
            .iter()
            .map(|c| {
                (0..self.rows_filled)
                    .filter(|&row| c.buffer.is_masked(row))
                    .count()
            })
            .sum()
    }

    /// Total number of valid cells within the filled rows.
    pub fn count_valid(&self) -> usize {
        self.rows_filled * self.columns.len() - self.count_masked()
    }

    /// Total memory held by the column buffers, in bytes.
    pub fn heap_size(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.buffer.as_bytes().len() + c.buffer.capacity())
            .sum()
    }
}

/// Parses `(field, type_spec)` pairs into column specs.
pub fn parse_specs(specs: &[(&str, &str)]) -> Result<Vec<ColumnSpec>> {
    if specs.len() > MAX_COLUMNS {
        return Err(ErrorKind::TooManyColumns {
            count: specs.len(),
            max: MAX_COLUMNS,
        }
        .into());
    }
    specs
        .iter()
        .map(|(path, type_spec)| ColumnSpec::parse(path, type_spec))
        .collect()
}

/// Checks the rules for columns read from query results. Only the number of columns
/// is limited; the same path may be read more than once.
pub fn validate_query_specs(specs: &[ColumnSpec]) -> Result<()> {
    if specs.len() > MAX_COLUMNS {
        return Err(ErrorKind::TooManyColumns {
            count: specs.len(),
            max: MAX_COLUMNS,
        }
        .into());
    }
    Ok(())
}

/// Checks the rules for columns whose rows become documents: valid key paths,
/// insertable kinds, no duplicates and no path nested under another.
pub fn validate_insert_specs(specs: &[ColumnSpec]) -> Result<()> {
    validate_query_specs(specs)?;

    let mut paths = AHashSet::with_capacity(specs.len());
    for spec in specs {
        spec.path.validate_for_insert()?;
        if !spec.desc.is_insertable() {
            return Err(Error::invalid_type_spec(
                spec.desc.to_string(),
                format!("'{}' is a derived type and cannot be inserted", spec.desc.kind),
            ));
        }
        if !paths.insert(spec.path.as_str()) {
            return Err(ErrorKind::DuplicateField {
                field: spec.path.to_string(),
            }
            .into());
        }
    }

    for spec in specs {
        let path = spec.path.as_str();
        for (pos, _) in path.match_indices('.') {
            let prefix = &path[..pos];
            if paths.contains(prefix) {
                return Err(ErrorKind::ConflictingNestedField {
                    field: prefix.to_string(),
                    nested: path.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}
