//! Per-call query options.
//!
//! Unset options fall back to the [`ClientConfig`](crate::ClientConfig) of the client
//! running the query.

use doccol_driver::Ordering;

/// Options of a one-shot read ([`Client::query`](crate::Client::query) and
/// [`Client::aggregate`](crate::Client::aggregate)).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub(crate) limit: u64,
    pub(crate) offset: u64,
    pub(crate) sort: Option<Ordering>,
    pub(crate) hint: Option<Ordering>,
    pub(crate) use_exact_count: Option<bool>,
    pub(crate) select_fields: Option<bool>,
}

impl QueryOptions {
    pub fn new() -> QueryOptions {
        Default::default()
    }

    /// Maximum number of rows to read; `0` reads all matches.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Number of matching documents to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn sort(mut self, sort: Ordering) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn hint(mut self, hint: Ordering) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Counts the matching documents before allocating, even when a limit is set.
    pub fn use_exact_count(mut self, exact: bool) -> Self {
        self.use_exact_count = Some(exact);
        self
    }

    /// Asks the server to return only the requested fields.
    pub fn select_fields(mut self, select: bool) -> Self {
        self.select_fields = Some(select);
        self
    }

    pub fn get_limit(&self) -> u64 {
        self.limit
    }

    pub fn get_offset(&self) -> u64 {
        self.offset
    }

    /// Returns `true` if any option that only applies to find commands is set.
    pub(crate) fn has_find_only_options(&self) -> bool {
        self.offset > 0 || self.sort.is_some() || self.hint.is_some()
    }
}

/// Options of a streaming read ([`Client::block_query`](crate::Client::block_query)
/// and [`Client::block_aggregate`](crate::Client::block_aggregate)).
#[derive(Debug, Clone, Default)]
pub struct BlockQueryOptions {
    pub(crate) block_size: Option<usize>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
    pub(crate) sort: Option<Ordering>,
    pub(crate) hint: Option<Ordering>,
    pub(crate) select_fields: Option<bool>,
}

impl BlockQueryOptions {
    pub fn new() -> BlockQueryOptions {
        Default::default()
    }

    /// Capacity of the column set reused by every block.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Maximum number of rows over all blocks; `0` reads all matches.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn sort(mut self, sort: Ordering) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn hint(mut self, hint: Ordering) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn select_fields(mut self, select: bool) -> Self {
        self.select_fields = Some(select);
        self
    }

    pub(crate) fn has_find_only_options(&self) -> bool {
        self.limit > 0 || self.offset > 0 || self.sort.is_some() || self.hint.is_some()
    }
}
