//! Core definitions (error taxonomy and result helpers), relied upon by all doccol-* crates.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
