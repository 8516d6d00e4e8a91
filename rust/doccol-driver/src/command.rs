//! The find command sent for a column query.
//!
//! Queries target the `find` command of server protocol 3.2 and later. When a sort
//! or an index hint is present, the filter travels in an envelope keyed with the
//! command's own field names (`filter`, `sort`, `hint`).

use bson::{Bson, Document, doc};
use doccol_format::field_path::ID_FIELD;

use crate::{namespace::Namespace, ordering::Ordering};

/// Filter, ordering and paging options of a single find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindCommand {
    pub filter: Document,
    pub sort: Option<Ordering>,
    pub hint: Option<Ordering>,
    pub projection: Option<Document>,
    /// Number of leading matches to skip.
    pub skip: u64,
    /// Maximum number of documents to return; `0` means no limit.
    pub limit: u64,
}

impl FindCommand {
    pub fn new(filter: Document) -> FindCommand {
        FindCommand {
            filter,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort: Ordering) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_hint(mut self, hint: Ordering) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// The query envelope: the bare filter when neither sort nor hint is set,
    /// otherwise `{ filter, sort?, hint? }`.
    pub fn envelope(&self) -> Document {
        if self.sort.is_none() && self.hint.is_none() {
            return self.filter.clone();
        }
        let mut envelope = doc! { "filter": self.filter.clone() };
        if let Some(sort) = &self.sort {
            envelope.insert("sort", sort.to_document());
        }
        if let Some(hint) = &self.hint {
            envelope.insert("hint", hint.to_document());
        }
        envelope
    }

    /// Renders the full `find` command for `ns`.
    pub fn to_command(&self, ns: &Namespace) -> Document {
        let mut command = doc! {
            "find": ns.collection(),
            "filter": self.filter.clone(),
        };
        if let Some(sort) = &self.sort {
            command.insert("sort", sort.to_document());
        }
        if let Some(hint) = &self.hint {
            command.insert("hint", hint.to_document());
        }
        if let Some(projection) = &self.projection {
            command.insert("projection", projection.clone());
        }
        if self.skip > 0 {
            command.insert("skip", to_int64(self.skip));
        }
        if self.limit > 0 {
            command.insert("limit", to_int64(self.limit));
        }
        command
    }
}

fn to_int64(v: u64) -> Bson {
    Bson::Int64(i64::try_from(v).unwrap_or(i64::MAX))
}

/// An inclusion projection for the given field paths.
///
/// The identifier field is excluded explicitly unless it is one of the requested
/// paths, since servers return it by default.
pub fn select_fields<'a>(paths: impl IntoIterator<Item = &'a str>) -> Document {
    let mut projection = Document::new();
    for path in paths {
        projection.insert(path, 1);
    }
    if !projection.contains_key(ID_FIELD) {
        projection.insert(ID_FIELD, 0);
    }
    projection
}
