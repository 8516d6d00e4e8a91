//! Streaming reads with a fixed-size, reused block.

use doccol_columns::ColumnSet;
use doccol_common::Result;

use crate::cursor::{Cursor, CursorState};

/// A query read block by block into one column set of `block_size` rows.
///
/// Each [`next_block`](BlockQuery::next_block) overwrites the previous block. Dropping
/// the query releases the underlying stream.
pub struct BlockQuery {
    cursor: Cursor<ColumnSet>,
    block_size: usize,
    blocks: usize,
}

impl BlockQuery {
    pub(crate) fn new(cursor: Cursor<ColumnSet>) -> BlockQuery {
        let block_size = cursor.column_set().capacity();
        BlockQuery {
            cursor,
            block_size,
            blocks: 0,
        }
    }

    /// Reads the next block. Returns `None` once every result has been read.
    ///
    /// The returned set holds `rows_filled()` rows; all rows past it are masked.
    pub fn next_block(&mut self) -> Result<Option<&ColumnSet>> {
        let rows = self.cursor.load_block(self.block_size)?;
        if rows == 0 {
            return Ok(None);
        }
        self.blocks += 1;
        Ok(Some(self.cursor.column_set()))
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of non-empty blocks returned so far.
    pub fn blocks_read(&self) -> usize {
        self.blocks
    }

    pub fn total_rows(&self) -> u64 {
        self.cursor.total_rows()
    }

    pub fn masked_cells(&self) -> u64 {
        self.cursor.masked_cells()
    }

    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    pub fn close(&mut self) -> Result<()> {
        self.cursor.close()
    }
}
