//! Fixed-length cell storage with 8-byte alignment.

/// A zero-initialized byte buffer whose start is aligned for any primitive cell type
/// (up to 8 bytes), so that it can be viewed as a typed slice without copying.
///
/// The storage is allocated once and never grows: the column's capacity is fixed at
/// allocation time.
#[derive(Clone)]
pub struct CellValues {
    words: Vec<u64>,
    len: usize,
}

impl CellValues {
    /// Allocates `len` zeroed bytes.
    pub fn zeroed(len: usize) -> CellValues {
        CellValues {
            words: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    /// Number of bytes in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }

    /// Interprets the buffer as a slice of `T`.
    ///
    /// # Panics
    ///
    /// Panics if the byte length is not a multiple of `size_of::<T>()` or if `T`
    /// requires an alignment above 8.
    #[inline]
    pub fn as_slice<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::cast_slice(self.as_bytes())
    }

    /// Interprets the buffer as a mutable slice of `T`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`CellValues::as_slice`].
    #[inline]
    pub fn as_mut_slice<T>(&mut self) -> &mut [T]
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }

    /// Bytes occupied by the underlying allocation.
    pub fn heap_size(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>()
    }
}

impl std::fmt::Debug for CellValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellValues").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_views() {
        let mut values = CellValues::zeroed(3 * 8);
        assert_eq!(values.len(), 24);
        values.as_mut_slice::<i64>()[1] = -5;
        assert_eq!(values.as_slice::<i64>(), &[0, -5, 0]);
        assert_eq!(values.as_slice::<u8>().len(), 24);
    }

    #[test]
    fn test_odd_lengths() {
        let mut values = CellValues::zeroed(3 * 12);
        values.as_mut_slice::<[u8; 12]>()[2] = [7u8; 12];
        assert_eq!(values.as_slice::<[u8; 12]>()[2], [7u8; 12]);
        assert_eq!(values.as_bytes().len(), 36);

        let empty = CellValues::zeroed(0);
        assert!(empty.is_empty());
        assert!(empty.as_slice::<f64>().is_empty());
    }
}
