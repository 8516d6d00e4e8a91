//! # Doccol: Columnar Materialization of Document Queries
//!
//! Doccol reads the results of document-database queries straight into typed,
//! nullable, fixed-capacity column buffers, and writes such buffers back as documents
//! through bulk inserts. Values are decoded from the raw binary document
//! representation without building an intermediate object per document.
//!
//! ## Key Features
//!
//! * **Typed columns**: integers, floats, booleans, object ids, dates, timestamps,
//!   fixed-width strings, binaries and embedded documents, plus derived columns that
//!   report the type, length or size of a value instead of its content
//! * **Precise masking**: an absent field, a type mismatch or a value that does not fit
//!   the column is a masked cell, never an error
//! * **Bounded memory**: results can be read in one allocation sized from a count, or
//!   streamed through a fixed-size block reused across reads
//! * **Bulk insert**: one document per row, masked cells omitted, with per-row failures
//!   reported back as masked identifier cells
//!
//! ## Getting Started
//!
//! A [`Client`] wraps a [`Driver`](driver::Driver) implementation:
//!
//! ```
//! use std::sync::Arc;
//!
//! use bson::doc;
//! use doccol::{Client, ClientConfig, QueryOptions};
//! use doccol::columns::parse_specs;
//! use doccol::driver::{Driver, Namespace, memory::MemoryDriver};
//!
//! let driver = Arc::new(MemoryDriver::new());
//! let ns = Namespace::parse("shop.items").unwrap();
//! driver
//!     .insert_many(&ns, vec![doc! { "price": 3 }, doc! { "price": 4.5 }])
//!     .unwrap();
//!
//! let client = Client::init(driver, ClientConfig::default()).unwrap();
//! let columns = parse_specs(&[("price", "float64")]).unwrap();
//! let set = client
//!     .query(&ns, doc! {}, columns, &QueryOptions::default())
//!     .unwrap();
//! assert_eq!(set.rows_filled(), 2);
//! assert_eq!(set.column(0).buffer().get::<f64>(1).unwrap(), Some(4.5));
//! ```
//!
//! ## Module Organization
//!
//! * [`common`] - Error taxonomy and result helpers
//! * [`format`] - Type grammar, type descriptors and field paths
//! * [`columns`] - Column buffers and column sets
//! * [`codec`] - Document to row and row to document conversion
//! * [`driver`] - The database driver seam, query command shapes and an in-memory driver
//! * [`cursor`] - Streams query results into a column set block by block
//! * [`estimate`] - Result size estimation for one-shot reads
//! * [`insert`] - Identifier columns returned by bulk inserts

pub use doccol_codec as codec;
pub use doccol_columns as columns;
pub use doccol_common as common;
pub use doccol_driver as driver;
pub use doccol_format as format;

pub mod block;
pub mod client;
pub mod config;
pub mod cursor;
pub mod estimate;
pub mod insert;
pub mod options;

pub use block::BlockQuery;
pub use client::Client;
pub use config::ClientConfig;
pub use cursor::{Cursor, CursorState};
pub use estimate::{CountSource, allocation_size, estimate};
pub use insert::IdentifierColumn;
pub use options::{BlockQueryOptions, QueryOptions};
