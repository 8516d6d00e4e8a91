//! A [`DocumentStream`] over documents already held in memory.

use std::collections::VecDeque;

use bson::{Document, RawDocument, RawDocumentBuf};
use doccol_common::{Result, error::Error};

use crate::DocumentStream;

/// Streams a fixed batch of documents in order.
pub struct BufferedStream {
    pending: VecDeque<RawDocumentBuf>,
    current: Option<RawDocumentBuf>,
    closed: bool,
}

impl BufferedStream {
    pub fn new(docs: impl IntoIterator<Item = RawDocumentBuf>) -> BufferedStream {
        BufferedStream {
            pending: docs.into_iter().collect(),
            current: None,
            closed: false,
        }
    }

    /// Serializes `docs` up front.
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Result<BufferedStream> {
        let docs = docs
            .into_iter()
            .map(|doc| {
                RawDocumentBuf::from_document(doc)
                    .map_err(|e| Error::invalid_document("serialize", e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BufferedStream::new(docs))
    }

    /// Number of documents not yet reached by `advance`.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl DocumentStream for BufferedStream {
    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn current(&self) -> &RawDocument {
        self.current
            .as_deref()
            .expect("BufferedStream::current called without a successful advance")
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn test_advance_and_close() {
        let docs = [doc! { "a": 1 }, doc! { "a": 2 }, doc! { "a": 3 }];
        let mut stream = BufferedStream::from_documents(&docs).unwrap();
        assert!(stream.advance().unwrap());
        assert_eq!(stream.current().get_i32("a").unwrap(), 1);
        assert_eq!(stream.remaining(), 2);
        stream.close().unwrap();
        stream.close().unwrap();
        assert!(stream.is_closed());
        assert!(!stream.advance().unwrap());
    }

    #[test]
    fn test_exhaustion() {
        let mut stream = BufferedStream::new(Vec::new());
        assert!(!stream.advance().unwrap());
        assert!(!stream.advance().unwrap());
    }
}
