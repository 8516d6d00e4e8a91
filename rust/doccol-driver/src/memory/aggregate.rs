//! Evaluation of the pipeline stages and find options supported by the in-memory driver.

use std::cmp::Ordering as CmpOrdering;

use ahash::AHashMap;
use bson::{Bson, Document};
use doccol_common::{Result, error::Error};
use doccol_format::field_path::ID_FIELD;

use super::filter::{compare_values, get_path, matches};
use crate::pipeline::Pipeline;

/// Runs every stage of `pipeline` over `docs`.
pub fn run_pipeline(mut docs: Vec<Document>, pipeline: &Pipeline) -> Result<Vec<Document>> {
    for stage in pipeline.stages() {
        let mut entries = stage.iter();
        let (Some((name, spec)), None) = (entries.next(), entries.next()) else {
            return Err(Error::invalid_pipeline("each stage must have exactly one key"));
        };
        docs = match (name.as_str(), spec) {
            ("$match", Bson::Document(filter)) => filter_docs(docs, filter)?,
            ("$sort", Bson::Document(keys)) => {
                sort_docs(&mut docs, &sort_keys(keys)?);
                docs
            }
            ("$skip", n) => {
                let n = stage_count(name, n)?;
                docs.into_iter().skip(n).collect()
            }
            ("$limit", n) => {
                let n = stage_count(name, n)?;
                docs.truncate(n);
                docs
            }
            ("$project", Bson::Document(projection)) => project_docs(docs, projection)?,
            ("$group", Bson::Document(group)) => group_docs(&docs, group)?,
            (name, _) => {
                return Err(Error::invalid_pipeline(format!(
                    "unsupported or malformed stage '{name}'"
                )));
            }
        };
    }
    Ok(docs)
}

pub fn filter_docs(docs: Vec<Document>, filter: &Document) -> Result<Vec<Document>> {
    let mut matched = Vec::with_capacity(docs.len());
    for doc in docs {
        if matches(&doc, filter)? {
            matched.push(doc);
        }
    }
    Ok(matched)
}

/// Parses `{ field: 1 | -1, ... }` into sort keys; `true` means descending.
pub fn sort_keys(keys: &Document) -> Result<Vec<(String, bool)>> {
    keys.iter()
        .map(|(field, direction)| match direction {
            Bson::Int32(1) | Bson::Int64(1) => Ok((field.clone(), false)),
            Bson::Int32(-1) | Bson::Int64(-1) => Ok((field.clone(), true)),
            Bson::Double(d) if *d == 1.0 => Ok((field.clone(), false)),
            Bson::Double(d) if *d == -1.0 => Ok((field.clone(), true)),
            other => Err(Error::invalid_arg(
                "sort",
                format!("invalid direction {other} for '{field}'"),
            )),
        })
        .collect()
}

/// Stable multi-key sort; missing fields sort as null.
pub fn sort_docs(docs: &mut [Document], keys: &[(String, bool)]) {
    docs.sort_by(|a, b| {
        for (field, descending) in keys {
            let x = get_path(a, field).unwrap_or(&Bson::Null);
            let y = get_path(b, field).unwrap_or(&Bson::Null);
            let ordering = compare_values(x, y);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != CmpOrdering::Equal {
                return ordering;
            }
        }
        CmpOrdering::Equal
    });
}

/// Applies an inclusion projection. The identifier is kept unless `_id: 0`.
pub fn project_docs(docs: Vec<Document>, projection: &Document) -> Result<Vec<Document>> {
    let mut include_id = true;
    let mut paths = Vec::new();
    for (path, flag) in projection {
        let included = match flag {
            Bson::Boolean(b) => *b,
            Bson::Int32(v) => *v != 0,
            Bson::Int64(v) => *v != 0,
            Bson::Double(v) => *v != 0.0,
            other => {
                return Err(Error::invalid_arg(
                    "projection",
                    format!("unsupported projection value {other} for '{path}'"),
                ));
            }
        };
        if path == ID_FIELD {
            include_id = included;
        } else if included {
            paths.push(path.as_str());
        } else {
            return Err(Error::invalid_arg(
                "projection",
                "exclusion is only supported for the identifier",
            ));
        }
    }

    Ok(docs
        .into_iter()
        .map(|doc| {
            let mut projected = Document::new();
            if include_id {
                if let Some(id) = doc.get(ID_FIELD) {
                    projected.insert(ID_FIELD, id.clone());
                }
            }
            for path in &paths {
                copy_path(&doc, &mut projected, path);
            }
            projected
        })
        .collect())
}

/// Copies the value at a dotted path, recreating the enclosing sub-documents.
fn copy_path(source: &Document, target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path, value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Bson::Document(sub)) = source.get(head) else {
                return;
            };
            if !matches!(target.get(head), Some(Bson::Document(_))) {
                target.insert(head, Document::new());
            }
            if let Some(Bson::Document(sub_target)) = target.get_mut(head) {
                copy_path(sub, sub_target, rest);
            }
            if matches!(target.get(head), Some(Bson::Document(d)) if d.is_empty()) {
                target.remove(head);
            }
        }
    }
}

/// `$group` with a `$path` or constant key and `$sum` accumulators.
fn group_docs(docs: &[Document], group: &Document) -> Result<Vec<Document>> {
    let key_expr = group
        .get(ID_FIELD)
        .ok_or_else(|| Error::invalid_pipeline("$group requires an '_id' expression"))?;

    let mut accumulators = Vec::new();
    for (field, spec) in group.iter().filter(|(field, _)| field.as_str() != ID_FIELD) {
        match spec {
            Bson::Document(acc) if acc.len() == 1 && acc.contains_key("$sum") => {
                accumulators.push((field.as_str(), acc.get("$sum").unwrap_or(&Bson::Null)));
            }
            _ => {
                return Err(Error::invalid_pipeline(format!(
                    "unsupported accumulator for '{field}'"
                )));
            }
        }
    }

    // Groups keep the order in which their keys were first seen.
    let mut order: Vec<Bson> = Vec::new();
    let mut sums: AHashMap<String, Vec<Sum>> = AHashMap::new();
    for doc in docs {
        let key = evaluate(doc, key_expr);
        let slot = sums.entry(key.to_string()).or_insert_with(|| {
            order.push(key.clone());
            vec![Sum::default(); accumulators.len()]
        });
        for (sum, (_, expr)) in slot.iter_mut().zip(&accumulators) {
            sum.add(&evaluate(doc, expr));
        }
    }

    Ok(order
        .into_iter()
        .map(|key| {
            let mut out = Document::new();
            let slot = sums.remove(&key.to_string()).unwrap_or_default();
            out.insert(ID_FIELD, key);
            for ((field, _), sum) in accumulators.iter().zip(slot) {
                out.insert(*field, sum.into_bson());
            }
            out
        })
        .collect())
}

/// Evaluates a `$path` reference or returns the constant as is.
fn evaluate(doc: &Document, expr: &Bson) -> Bson {
    match expr {
        Bson::String(s) if s.starts_with('$') => {
            get_path(doc, &s[1..]).cloned().unwrap_or(Bson::Null)
        }
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Sum {
    int: i64,
    float: f64,
    is_float: bool,
}

impl Sum {
    fn add(&mut self, value: &Bson) {
        match value {
            Bson::Int32(v) => self.int = self.int.wrapping_add(*v as i64),
            Bson::Int64(v) => self.int = self.int.wrapping_add(*v),
            Bson::Double(v) => {
                self.float += v;
                self.is_float = true;
            }
            _ => {}
        }
    }

    fn into_bson(self) -> Bson {
        if self.is_float {
            Bson::Double(self.float + self.int as f64)
        } else if let Ok(v) = i32::try_from(self.int) {
            Bson::Int32(v)
        } else {
            Bson::Int64(self.int)
        }
    }
}

fn stage_count(name: &str, value: &Bson) -> Result<usize> {
    let n = match value {
        Bson::Int32(v) => i64::from(*v),
        Bson::Int64(v) => *v,
        Bson::Double(v) if v.trunc() == *v => *v as i64,
        _ => -1,
    };
    usize::try_from(n)
        .map_err(|_| Error::invalid_pipeline(format!("{name} expects a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use bson::{bson, doc};

    use super::*;

    fn sample() -> Vec<Document> {
        vec![
            doc! { "_id": 1, "g": "a", "v": 10, "n": { "x": 1, "y": 2 } },
            doc! { "_id": 2, "g": "b", "v": 5 },
            doc! { "_id": 3, "g": "a", "v": 2.5 },
            doc! { "_id": 4, "v": 1 },
        ]
    }

    fn pipeline(stages: Bson) -> Pipeline {
        Pipeline::from_bson(&stages).unwrap()
    }

    #[test]
    fn test_match_sort_skip_limit() {
        let out = run_pipeline(
            sample(),
            &pipeline(bson!([
                { "$match": { "v": { "$gte": 2 } } },
                { "$sort": { "v": 1 } },
                { "$skip": 1 },
                { "$limit": 1 },
            ])),
        )
        .unwrap();
        assert_eq!(out, vec![doc! { "_id": 2, "g": "b", "v": 5 }]);
    }

    #[test]
    fn test_group() {
        let out = run_pipeline(
            sample(),
            &pipeline(bson!([{ "$group": { "_id": "$g", "total": { "$sum": "$v" }, "count": { "$sum": 1 } } }])),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                doc! { "_id": "a", "total": 12.5, "count": 2 },
                doc! { "_id": "b", "total": 5, "count": 1 },
                doc! { "_id": null, "total": 1, "count": 1 },
            ]
        );

        let counted = run_pipeline(sample(), &Pipeline::default().with_count_stage()).unwrap();
        assert_eq!(counted, vec![doc! { "_id": null, "count": 4 }]);

        let empty = run_pipeline(Vec::new(), &Pipeline::default().with_count_stage()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_project() {
        let out = project_docs(sample(), &doc! { "n.y": 1, "_id": 0 }).unwrap();
        assert_eq!(out[0], doc! { "n": { "y": 2 } });
        assert_eq!(out[1], doc! {});

        let out = project_docs(sample(), &doc! { "g": 1 }).unwrap();
        assert_eq!(out[3], doc! { "_id": 4 });
        assert!(project_docs(sample(), &doc! { "g": 0 }).is_err());
    }

    #[test]
    fn test_unsupported_stage() {
        assert!(run_pipeline(sample(), &pipeline(bson!([{ "$unwind": "$g" }]))).is_err());
    }

    #[test]
    fn test_sort_descending_with_missing() {
        let mut docs = sample();
        sort_docs(&mut docs, &[("g".to_string(), true), ("_id".to_string(), false)]);
        let ids: Vec<i32> = docs.iter().map(|d| d.get_i32("_id").unwrap()).collect();
        assert_eq!(ids, [2, 1, 3, 4]);
    }
}
