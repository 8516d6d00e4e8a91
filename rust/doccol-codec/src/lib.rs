//! Conversion between documents and rows of a column set.
//!
//! [`decode_into`] materializes one document into one row; [`DocumentEncoder`] builds
//! one document from one row. Neither allocates per cell beyond what the document
//! representation itself requires.

pub mod decode;
pub mod encode;

pub use decode::{decode_into, lookup_path};
pub use encode::{DocumentEncoder, cell_to_bson, validate_identifiers};
