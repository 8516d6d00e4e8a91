//! In-process implementation of the [`Driver`] trait.

pub mod aggregate;
pub mod filter;

use std::{
    io,
    sync::{
        RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
    },
};

use ahash::AHashMap;
use bson::{Bson, Document, oid::ObjectId};
use doccol_common::{Result, error::Error};
use doccol_format::field_path::ID_FIELD;

use crate::{
    DUPLICATE_KEY_CODE, DocumentStream, Driver, FindCommand, InsertFailure, InsertOutcome,
    Namespace, Pipeline, stream::BufferedStream,
};

use aggregate::{filter_docs, project_docs, run_pipeline, sort_docs};
use filter::values_equal;

/// A `MemoryDriver` keeps every collection as a vector of documents in insertion
/// order.
///
/// It evaluates the subset of the query language used by column queries and their
/// tests: field filters, sorting, paging, inclusion projections, unique identifiers
/// and the `$match`, `$sort`, `$skip`, `$limit`, `$project` and `$group` stages.
///
/// [`MemoryDriver::set_offline`] makes every call fail with a connection error.
#[derive(Default)]
pub struct MemoryDriver {
    collections: RwLock<AHashMap<Namespace, Vec<Document>>>,
    offline: AtomicBool,
    round_trips: AtomicUsize,
}

impl MemoryDriver {
    pub fn new() -> MemoryDriver {
        Default::default()
    }

    /// Simulates a lost connection (`true`) or restores it (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of calls that reached the store, successful or not.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(AtomicOrdering::SeqCst)
    }

    /// A copy of the documents stored in `ns`, in insertion order.
    pub fn documents(&self, ns: &Namespace) -> Vec<Document> {
        self.collections
            .read()
            .unwrap()
            .get(ns)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, operation: &str) -> Result<()> {
        self.round_trips.fetch_add(1, AtomicOrdering::SeqCst);
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(Error::connection(
                operation,
                io::Error::new(io::ErrorKind::NotConnected, "driver is offline"),
            ));
        }
        Ok(())
    }

    fn matching(&self, ns: &Namespace, filter: &Document) -> Result<Vec<Document>> {
        filter_docs(self.documents(ns), filter)
    }
}

impl Driver for MemoryDriver {
    fn find(&self, ns: &Namespace, command: &FindCommand) -> Result<Box<dyn DocumentStream>> {
        self.begin("find")?;
        let mut docs = self.matching(ns, &command.filter)?;
        if let Some(sort) = &command.sort {
            let keys = sort
                .keys()
                .iter()
                .map(|(field, direction)| (field.clone(), direction.as_i32() < 0))
                .collect::<Vec<_>>();
            sort_docs(&mut docs, &keys);
        }
        let skip = usize::try_from(command.skip).unwrap_or(usize::MAX);
        let mut docs: Vec<Document> = docs.into_iter().skip(skip).collect();
        if command.limit > 0 {
            docs.truncate(usize::try_from(command.limit).unwrap_or(usize::MAX));
        }
        if let Some(projection) = &command.projection {
            docs = project_docs(docs, projection)?;
        }
        log::trace!("memory find on {ns} returned {} documents", docs.len());
        Ok(Box::new(BufferedStream::from_documents(&docs)?))
    }

    fn aggregate(&self, ns: &Namespace, pipeline: &Pipeline) -> Result<Box<dyn DocumentStream>> {
        self.begin("aggregate")?;
        let docs = run_pipeline(self.documents(ns), pipeline)?;
        log::trace!("memory aggregate on {ns} returned {} documents", docs.len());
        Ok(Box::new(BufferedStream::from_documents(&docs)?))
    }

    fn count(&self, ns: &Namespace, filter: &Document) -> Result<u64> {
        self.begin("count")?;
        Ok(self.matching(ns, filter)?.len() as u64)
    }

    fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<InsertOutcome> {
        self.begin("insert")?;
        let mut collections = self.collections.write().unwrap();
        let collection = collections.entry(ns.clone()).or_default();
        let mut outcome = InsertOutcome::default();
        for (index, mut doc) in docs.into_iter().enumerate() {
            if !doc.contains_key(ID_FIELD) {
                let mut with_id = Document::new();
                with_id.insert(ID_FIELD, ObjectId::new());
                for (key, value) in doc {
                    with_id.insert(key, value);
                }
                doc = with_id;
            }
            let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
            let duplicate = collection
                .iter()
                .any(|existing| existing.get(ID_FIELD).is_some_and(|e| values_equal(e, &id)));
            if duplicate {
                outcome.failures.push(InsertFailure {
                    index,
                    code: DUPLICATE_KEY_CODE,
                    message: format!("E11000 duplicate key error collection: {ns} dup key: {id}"),
                });
                continue;
            }
            collection.push(doc);
            outcome.inserted += 1;
        }
        Ok(outcome)
    }

    fn drop_collection(&self, ns: &Namespace) -> Result<()> {
        self.begin("drop")?;
        self.collections.write().unwrap().remove(ns);
        Ok(())
    }
}
