//! Per-cell validity mask.

use std::ops::Range;

/// A validity mask where `true` marks a cell as masked (absent, not convertible, or
/// "omit this key" on writes) and `false` marks a valid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(Vec<bool>);

impl Mask {
    /// Creates a mask of `len` cells, all masked.
    pub fn all_masked(len: usize) -> Mask {
        Mask(vec![true; len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn is_masked(&self, index: usize) -> bool {
        self.0[index]
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        !self.0[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, masked: bool) {
        self.0[index] = masked;
    }

    /// Masks every cell in `range`.
    pub fn mask_range(&mut self, range: Range<usize>) {
        self.0[range].fill(true);
    }

    pub fn count_masked(&self) -> usize {
        self.0.iter().filter(|&&m| m).count()
    }

    pub fn count_valid(&self) -> usize {
        self.len() - self.count_masked()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}
