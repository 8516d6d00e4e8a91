//! Fully qualified collection names (`database.collection`).

use std::fmt;

use doccol_common::{Result, error::Error};

/// Characters that may not appear in a database name.
const INVALID_DB_CHARS: &[char] = &['.', ' ', '$', '/', '\\', '\0'];

/// A verified `database.collection` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    db: String,
    collection: String,
}

impl Namespace {
    /// Creates a namespace from its two parts.
    ///
    /// Both parts must be non-empty. The database name must not contain `.`, spaces,
    /// `$`, path separators or NUL; the collection name must not contain `$` or NUL.
    pub fn new(db: impl Into<String>, collection: impl Into<String>) -> Result<Namespace> {
        let db = db.into();
        let collection = collection.into();
        let full = || format!("{db}.{collection}");
        if db.is_empty() {
            return Err(Error::invalid_namespace(full(), "database name is empty"));
        }
        if let Some(c) = db.chars().find(|c| INVALID_DB_CHARS.contains(c)) {
            return Err(Error::invalid_namespace(
                full(),
                format!("database name contains invalid character {c:?}"),
            ));
        }
        if collection.is_empty() {
            return Err(Error::invalid_namespace(full(), "collection name is empty"));
        }
        if collection.contains(['$', '\0']) {
            return Err(Error::invalid_namespace(
                full(),
                "collection name must not contain '$'",
            ));
        }
        Ok(Namespace { db, collection })
    }

    /// Parses `database.collection`, splitting at the first `.`.
    pub fn parse(ns: &str) -> Result<Namespace> {
        let (db, collection) = ns
            .split_once('.')
            .ok_or_else(|| Error::invalid_namespace(ns, "expected 'database.collection'"))?;
        Namespace::new(db, collection)
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.collection)
    }
}

impl std::str::FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Namespace> {
        Namespace::parse(s)
    }
}
