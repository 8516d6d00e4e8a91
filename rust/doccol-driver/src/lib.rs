//! *Driver* abstraction: the document-database client consumed by the column
//! queries and bulk inserts, plus the command shapes sent through it.
//!
//! A network-backed client implements [`Driver`] outside this workspace;
//! [`memory::MemoryDriver`] is an in-process implementation used for tests.

pub mod command;
pub mod memory;
pub mod namespace;
pub mod ordering;
pub mod pipeline;
pub mod stream;

use bson::{Document, RawDocument};
use doccol_common::Result;

pub use command::{FindCommand, select_fields};
pub use namespace::Namespace;
pub use ordering::{Ordering, SortDirection};
pub use pipeline::Pipeline;

/// A forward-only stream of result documents.
///
/// Streams hold server-side resources; `close` releases them and must be safe to
/// call more than once.
pub trait DocumentStream: Send {
    /// Moves to the next document. Returns `false` once the stream is exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// The document the stream is positioned on.
    ///
    /// # Panics
    ///
    /// May panic if the last call to `advance` did not return `true`.
    fn current(&self) -> &RawDocument;

    /// Releases the stream. Subsequent calls to `advance` return `false`.
    fn close(&mut self) -> Result<()>;
}

/// The `Driver` trait represents a connection to a document database.
///
/// Failures of the connection itself (network, authentication, server errors) are
/// reported as `ErrorKind::Connection`.
pub trait Driver: Send + Sync + 'static {
    /// Runs a find command and returns a stream over the matching documents.
    fn find(&self, ns: &Namespace, command: &FindCommand) -> Result<Box<dyn DocumentStream>>;

    /// Runs an aggregation pipeline and returns a stream over its output.
    fn aggregate(&self, ns: &Namespace, pipeline: &Pipeline) -> Result<Box<dyn DocumentStream>>;

    /// Counts the documents matching `filter`.
    fn count(&self, ns: &Namespace, filter: &Document) -> Result<u64>;

    /// Inserts `docs` without stopping at the first failed document.
    ///
    /// Per-document failures (for example a duplicate key) are reported in the
    /// returned [`InsertOutcome`]; only a failure of the whole call is an error.
    fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<InsertOutcome>;

    /// Drops the collection if it exists.
    fn drop_collection(&self, ns: &Namespace) -> Result<()>;
}

/// Per-document outcome of [`Driver::insert_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Number of documents written.
    pub inserted: usize,
    /// Documents that were rejected, by their index in the submitted batch.
    pub failures: Vec<InsertFailure>,
}

impl InsertOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Indices of the rejected documents.
    pub fn failed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.failures.iter().map(|f| f.index)
    }
}

/// One rejected document of a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFailure {
    pub index: usize,
    /// Server error code (`11000` for a duplicate key).
    pub code: i32,
    pub message: String,
}

/// Server error code reported for a duplicate `_id`.
pub const DUPLICATE_KEY_CODE: i32 = 11000;
