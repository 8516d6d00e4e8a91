//! Reading a document stream into a column set, one block of rows at a time.

use std::borrow::BorrowMut;

use doccol_codec::decode_into;
use doccol_columns::ColumnSet;
use doccol_common::{Result, error::Error, verify_arg};
use doccol_driver::DocumentStream;

/// Lifecycle of a [`Cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Opened, nothing read yet.
    Initialized,
    /// At least one block was read and the stream may hold more documents.
    Loading,
    /// The stream has no more documents.
    Exhausted,
    /// Closed by the caller or after a failure.
    Closed,
}

/// Binds a [`DocumentStream`] to a [`ColumnSet`] and decodes one document per row.
///
/// Every [`load_block`](Cursor::load_block) call writes into rows `0..n` of the same
/// set, so a block's values must be consumed (or copied) before the next call. The
/// set is held either by mutable reference or by value (`S = ColumnSet`).
///
/// The stream is released by [`close`](Cursor::close), on exhaustion, on any failed
/// read, and when the cursor is dropped.
pub struct Cursor<S: BorrowMut<ColumnSet>> {
    stream: Box<dyn DocumentStream>,
    set: S,
    state: CursorState,
    total_rows: u64,
    masked_cells: u64,
}

impl<S: BorrowMut<ColumnSet>> Cursor<S> {
    pub fn open(stream: Box<dyn DocumentStream>, set: S) -> Cursor<S> {
        Cursor {
            stream,
            set,
            state: CursorState::Initialized,
            total_rows: 0,
            masked_cells: 0,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Rows decoded over all blocks so far.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Cells masked over all blocks so far.
    pub fn masked_cells(&self) -> u64 {
        self.masked_cells
    }

    /// The column set holding the most recent block.
    pub fn column_set(&self) -> &ColumnSet {
        self.set.borrow()
    }

    /// Decodes up to `capacity` documents into rows `0..n` and returns `n`.
    ///
    /// Rows from `n` to the end of the set are masked and the set's filled row count
    /// becomes `n`. A result below `capacity` means the stream ran out; once it has,
    /// further calls return `0`. Loading from a closed cursor is an error.
    ///
    /// A `capacity` of zero reads nothing from the stream and leaves the state as it
    /// was, so its `0` result does not signal exhaustion.
    pub fn load_block(&mut self, capacity: usize) -> Result<usize> {
        match self.state {
            CursorState::Closed => {
                return Err(Error::invalid_operation("load_block on a closed cursor"));
            }
            CursorState::Exhausted => {
                self.finish_block(0)?;
                return Ok(0);
            }
            CursorState::Initialized | CursorState::Loading => (),
        }

        let result = self.fill(capacity);
        if result.is_err() {
            // The load error takes precedence over a close error.
            let _ = self.close();
        }
        result
    }

    /// Reads as many documents as the column set has rows.
    pub fn load_all(&mut self) -> Result<usize> {
        let capacity = self.column_set().capacity();
        self.load_block(capacity)
    }

    /// Releases the stream. Closing more than once is allowed.
    pub fn close(&mut self) -> Result<()> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        let was_exhausted = self.state == CursorState::Exhausted;
        self.state = CursorState::Closed;
        log::debug!(
            "closing cursor after {} rows, {} masked cells",
            self.total_rows,
            self.masked_cells
        );
        if was_exhausted {
            Ok(())
        } else {
            self.stream.close()
        }
    }

    fn fill(&mut self, capacity: usize) -> Result<usize> {
        verify_arg!(capacity, capacity <= self.column_set().capacity());
        if capacity == 0 {
            self.finish_block(0)?;
            return Ok(0);
        }

        self.state = CursorState::Loading;
        let set: &mut ColumnSet = self.set.borrow_mut();
        let mut rows = 0;
        let mut masked = 0;
        while rows < capacity {
            if !self.stream.advance()? {
                self.state = CursorState::Exhausted;
                break;
            }
            masked += decode_into(self.stream.current(), set, rows)?;
            rows += 1;
        }

        self.total_rows += rows as u64;
        self.masked_cells += masked as u64;
        self.finish_block(rows)?;
        log::debug!(
            "loaded block of {rows} rows ({masked} masked cells), {} rows total",
            self.total_rows
        );

        if self.state == CursorState::Exhausted {
            self.stream.close()?;
        }
        Ok(rows)
    }

    fn finish_block(&mut self, rows: usize) -> Result<()> {
        let set: &mut ColumnSet = self.set.borrow_mut();
        set.mask_rows_from(rows);
        set.set_rows_filled(rows)
    }
}

impl<S: BorrowMut<ColumnSet>> Drop for Cursor<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("failed to close cursor on drop: {e}");
        }
    }
}
