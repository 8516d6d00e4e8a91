//! Typed, nullable, fixed-capacity column buffers.
//!
//! A [`ColumnSet`](column_set::ColumnSet) owns one [`ColumnBuffer`](column::ColumnBuffer)
//! per requested field path. Every buffer holds `capacity` cells of its declared type
//! plus a mask with the same number of entries; a masked cell carries no meaningful
//! value. All cells start masked and only become valid through an explicit write
//! (a decode from a document, or one of the setters).

pub mod column;
pub mod column_set;
pub mod mask;
pub mod native;
pub mod values;

pub use column::ColumnBuffer;
pub use column_set::{
    Column, ColumnSet, ColumnSpec, MAX_COLUMNS, parse_specs, validate_insert_specs,
    validate_query_specs,
};
pub use mask::Mask;
pub use native::NativeType;
