//! Type catalog and field-path definitions shared by the column, codec and driver
//! crates.
//!
//! * [`type_desc`] - the `name[:size]` type grammar and the descriptors it resolves to.
//! * [`field_path`] - dotted field paths addressing values in nested documents.

pub mod field_path;
pub mod type_desc;
#[cfg(test)]
mod tests;

pub use bson::spec::ElementType as WireType;
pub use field_path::FieldPath;
pub use type_desc::{NumericKind, TypeDescriptor, TypeKind};
