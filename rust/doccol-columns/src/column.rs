//! A single typed, nullable, fixed-capacity column.

use bson::{DateTime, Timestamp, oid::ObjectId};
use doccol_common::{Result, error::Error, verify_arg};
use doccol_format::{TypeDescriptor, TypeKind};

use crate::{mask::Mask, native::NativeType, values::CellValues};

/// Contiguous storage for `capacity` cells of one [`TypeDescriptor`], paired with a
/// same-length [`Mask`].
///
/// The byte layout is `capacity * desc.width` bytes; cell `i` occupies bytes
/// `i * width..(i + 1) * width`. Fixed-width kinds can be viewed as a typed slice
/// through [`ColumnBuffer::values`]. The variable-width kinds (`string`, `binary`,
/// `bson`) are accessed as byte cells through [`ColumnBuffer::bytes`].
#[derive(Debug, Clone)]
pub struct ColumnBuffer {
    desc: TypeDescriptor,
    capacity: usize,
    values: CellValues,
    mask: Mask,
}

impl ColumnBuffer {
    /// Allocates a zeroed buffer with every cell masked.
    pub fn new(desc: TypeDescriptor, capacity: usize) -> ColumnBuffer {
        ColumnBuffer {
            desc,
            capacity,
            values: CellValues::zeroed(capacity * desc.width),
            mask: Mask::all_masked(capacity),
        }
    }

    #[inline]
    pub fn type_desc(&self) -> &TypeDescriptor {
        &self.desc
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.desc.kind
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.desc.width
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    #[inline]
    pub fn is_masked(&self, row: usize) -> bool {
        self.mask.is_masked(row)
    }

    /// Marks the cell as masked. The data bytes are left as they are.
    #[inline]
    pub fn set_masked(&mut self, row: usize) {
        self.mask.set(row, true);
    }

    /// Marks the cell as valid without touching its data bytes.
    #[inline]
    pub fn set_valid(&mut self, row: usize) {
        self.mask.set(row, false);
    }

    /// Masks every cell from `start` to the end of the buffer.
    pub fn mask_from(&mut self, start: usize) {
        if start < self.capacity {
            self.mask.mask_range(start..self.capacity);
        }
    }

    /// Masks every cell and zeroes the data.
    pub fn reset(&mut self) {
        self.mask.mask_range(0..self.capacity);
        self.values.as_bytes_mut().fill(0);
    }

    /// All cells viewed as a typed slice.
    ///
    /// Fails if `T` is not the native representation of this column's kind.
    pub fn values<T: NativeType>(&self) -> Result<&[T]> {
        self.check_native::<T>()?;
        Ok(self.values.as_slice::<T>())
    }

    /// All cells viewed as a mutable typed slice. Writing through this view does not
    /// change the mask.
    pub fn values_mut<T: NativeType>(&mut self) -> Result<&mut [T]> {
        self.check_native::<T>()?;
        Ok(self.values.as_mut_slice::<T>())
    }

    /// Returns the value of a valid cell, or `None` if the cell is masked.
    pub fn get<T: NativeType>(&self, row: usize) -> Result<Option<T>> {
        verify_arg!(row, row < self.capacity);
        let values = self.values::<T>()?;
        Ok((!self.mask.is_masked(row)).then(|| values[row]))
    }

    /// Stores `value` and marks the cell valid.
    pub fn set<T: NativeType>(&mut self, row: usize, value: T) -> Result<()> {
        verify_arg!(row, row < self.capacity);
        self.values_mut::<T>()?[row] = value;
        self.mask.set(row, false);
        Ok(())
    }

    /// The raw bytes of one cell (exactly `width` bytes), regardless of the mask.
    #[inline]
    pub fn bytes(&self, row: usize) -> &[u8] {
        let width = self.desc.width;
        &self.values.as_bytes()[row * width..(row + 1) * width]
    }

    /// Mutable raw bytes of one cell. Writing through this view does not change the mask.
    #[inline]
    pub fn bytes_mut(&mut self, row: usize) -> &mut [u8] {
        let width = self.desc.width;
        &mut self.values.as_bytes_mut()[row * width..(row + 1) * width]
    }

    /// The whole data area as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.values.as_bytes()
    }

    /// Copies `data` into the cell and marks it valid.
    ///
    /// For `string`, `binary` and `bson` columns the data is silently truncated to the
    /// column width and the remainder of the cell is zero-filled. For fixed-width kinds
    /// `data` must be exactly `width` bytes long.
    pub fn set_bytes(&mut self, row: usize, data: &[u8]) -> Result<()> {
        verify_arg!(row, row < self.capacity);
        if !self.desc.kind.is_variable_width() && data.len() != self.desc.width {
            return Err(Error::invalid_arg(
                "data",
                format!(
                    "expected {} bytes for a '{}' cell, got {}",
                    self.desc.width,
                    self.desc,
                    data.len()
                ),
            ));
        }
        copy_truncated(self.bytes_mut(row), data);
        self.mask.set(row, false);
        Ok(())
    }

    /// For `string` columns: the cell's bytes up to the first NUL, or `None` if masked.
    pub fn text(&self, row: usize) -> Option<&[u8]> {
        if self.mask.is_masked(row) {
            return None;
        }
        let cell = self.bytes(row);
        let end = cell.iter().position(|&b| b == 0).unwrap_or(cell.len());
        Some(&cell[..end])
    }

    /// For `id` columns: the ObjectId stored in the cell, or `None` if masked.
    pub fn object_id(&self, row: usize) -> Result<Option<ObjectId>> {
        Ok(self.get::<[u8; 12]>(row)?.map(ObjectId::from_bytes))
    }

    pub fn set_object_id(&mut self, row: usize, id: ObjectId) -> Result<()> {
        self.set::<[u8; 12]>(row, id.bytes())
    }

    /// For `date` columns: the cell as a UTC datetime, or `None` if masked.
    pub fn date(&self, row: usize) -> Result<Option<DateTime>> {
        self.check_kind(TypeKind::Date)?;
        Ok(self.get::<i64>(row)?.map(DateTime::from_millis))
    }

    pub fn set_date(&mut self, row: usize, date: DateTime) -> Result<()> {
        self.check_kind(TypeKind::Date)?;
        self.set::<i64>(row, date.timestamp_millis())
    }

    /// For `timestamp` columns: the unpacked timestamp, or `None` if masked.
    pub fn timestamp(&self, row: usize) -> Result<Option<Timestamp>> {
        self.check_kind(TypeKind::Timestamp)?;
        Ok(self.get::<u64>(row)?.map(|packed| Timestamp {
            time: (packed >> 32) as u32,
            increment: packed as u32,
        }))
    }

    pub fn set_timestamp(&mut self, row: usize, ts: Timestamp) -> Result<()> {
        self.check_kind(TypeKind::Timestamp)?;
        self.set::<u64>(row, ((ts.time as u64) << 32) | ts.increment as u64)
    }

    /// Copies one cell (data and mask) from another buffer of the same type.
    pub fn copy_cell_from(&mut self, row: usize, source: &ColumnBuffer, source_row: usize) -> Result<()> {
        verify_arg!(source, source.desc.same_layout(&self.desc));
        verify_arg!(row, row < self.capacity);
        verify_arg!(source_row, source_row < source.capacity);
        self.bytes_mut(row).copy_from_slice(source.bytes(source_row));
        self.mask.set(row, source.mask.is_masked(source_row));
        Ok(())
    }

    fn check_kind(&self, kind: TypeKind) -> Result<()> {
        if self.desc.kind == kind {
            Ok(())
        } else {
            Err(Error::invalid_arg(
                "kind",
                format!("expected a '{kind}' column, got '{}'", self.desc),
            ))
        }
    }

    fn check_native<T: NativeType>(&self) -> Result<()> {
        if T::stores(self.desc.kind) {
            Ok(())
        } else {
            Err(Error::invalid_arg(
                "T",
                format!(
                    "'{}' cells are not stored as {}",
                    self.desc,
                    std::any::type_name::<T>()
                ),
            ))
        }
    }
}

/// Copies as much of `src` as fits into `dest` and zero-fills the rest of `dest`.
#[inline]
pub fn copy_truncated(dest: &mut [u8], src: &[u8]) {
    let n = src.len().min(dest.len());
    dest[..n].copy_from_slice(&src[..n]);
    dest[n..].fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(spec: &str, capacity: usize) -> ColumnBuffer {
        ColumnBuffer::new(TypeDescriptor::resolve(spec).unwrap(), capacity)
    }

    #[test]
    fn test_new_buffer_is_masked() {
        let col = buffer("float64", 4);
        assert_eq!(col.mask().count_masked(), 4);
        assert_eq!(col.get::<f64>(2).unwrap(), None);
        assert_eq!(col.values::<f64>().unwrap(), &[0.0; 4]);
    }

    #[test]
    fn test_set_and_get() {
        let mut col = buffer("int16", 3);
        col.set::<i16>(1, -300).unwrap();
        assert_eq!(col.get::<i16>(1).unwrap(), Some(-300));
        assert!(col.is_masked(0));
        assert!(col.get::<i32>(1).is_err());
        assert!(col.set::<i16>(3, 1).is_err());
        col.set_masked(1);
        assert_eq!(col.get::<i16>(1).unwrap(), None);
        assert_eq!(col.values::<i16>().unwrap()[1], -300);
    }

    #[test]
    fn test_set_bytes_truncates_variable_width() {
        let mut col = buffer("string:5", 2);
        col.set_bytes(0, b"longstr").unwrap();
        assert_eq!(col.text(0), Some(&b"longs"[..]));
        col.set_bytes(1, b"ab").unwrap();
        assert_eq!(col.bytes(1), b"ab\0\0\0");
        assert_eq!(col.text(1), Some(&b"ab"[..]));
    }

    #[test]
    fn test_set_bytes_fixed_width_requires_exact_len() {
        let mut col = buffer("int32", 1);
        assert!(col.set_bytes(0, &[1, 2]).is_err());
        col.set_bytes(0, &7i32.to_le_bytes()).unwrap();
        assert_eq!(col.get::<i32>(0).unwrap(), Some(7));
    }

    #[test]
    fn test_shared_native_types() {
        let mut dates = buffer("date", 1);
        dates.set::<i64>(0, 1_000).unwrap();
        let mut flags = buffer("bool", 1);
        flags.set::<u8>(0, 1).unwrap();
        let mut ts = buffer("timestamp", 1);
        ts.set::<u64>(0, (5u64 << 32) | 9).unwrap();
        assert_eq!(ts.get::<u64>(0).unwrap(), Some((5u64 << 32) | 9));
    }

    #[test]
    fn test_object_id_cells() {
        let mut col = buffer("id", 2);
        let id = ObjectId::new();
        col.set_object_id(1, id).unwrap();
        assert_eq!(col.object_id(1).unwrap(), Some(id));
        assert_eq!(col.object_id(0).unwrap(), None);

        let mut copy = buffer("id", 1);
        copy.copy_cell_from(0, &col, 1).unwrap();
        assert_eq!(copy.object_id(0).unwrap(), Some(id));
        assert!(copy.copy_cell_from(0, &buffer("int32", 1), 0).is_err());
    }

    #[test]
    fn test_copy_ignores_fixed_width_argument() {
        let mut source = buffer("int32:17", 1);
        source.set::<i32>(0, 5).unwrap();
        let mut dest = buffer("int32", 1);
        dest.copy_cell_from(0, &source, 0).unwrap();
        assert_eq!(dest.get::<i32>(0).unwrap(), Some(5));
    }

    #[test]
    fn test_date_cells() {
        let mut col = buffer("date", 3);
        let epoch = DateTime::from_millis(0);
        let before = DateTime::from_millis(-86_400_000);
        // 2014-05-01T12:30:15.250Z
        let later = DateTime::from_millis(1_398_947_415_250);
        col.set_date(0, epoch).unwrap();
        col.set_date(1, before).unwrap();
        assert_eq!(col.date(0).unwrap(), Some(epoch));
        assert_eq!(col.date(1).unwrap(), Some(before));
        assert_eq!(col.get::<i64>(1).unwrap(), Some(-86_400_000));
        assert_eq!(col.date(2).unwrap(), None);
        col.set_date(2, later).unwrap();
        assert_eq!(col.date(2).unwrap(), Some(later));
        assert_eq!(col.get::<i64>(2).unwrap(), Some(1_398_947_415_250));

        let mut ints = buffer("int64", 1);
        assert!(ints.set_date(0, epoch).is_err());
        assert!(ints.date(0).is_err());
    }

    #[test]
    fn test_timestamp_cells() {
        let mut col = buffer("timestamp", 2);
        let ts = Timestamp {
            time: 1_400_000_000,
            increment: 7,
        };
        col.set_timestamp(0, ts).unwrap();
        assert_eq!(col.timestamp(0).unwrap(), Some(ts));
        assert_eq!(col.get::<u64>(0).unwrap(), Some((1_400_000_000u64 << 32) | 7));
        assert_eq!(col.timestamp(1).unwrap(), None);
        assert!(buffer("uint64", 1).timestamp(0).is_err());
    }
}
