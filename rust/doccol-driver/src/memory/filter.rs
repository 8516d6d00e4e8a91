//! Query-filter evaluation and value ordering over owned documents.

use std::cmp::Ordering as CmpOrdering;

use bson::{Bson, Document, spec::ElementType};
use doccol_common::{Result, error::Error};

/// Resolves a dotted path, descending into sub-documents and array indices.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(sub) => sub.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Returns `true` if `doc` satisfies `filter`.
///
/// Supported: implicit conjunction of field conditions, `$and`, `$or`, equality
/// (matching array elements too), and the operators `$eq`, `$ne`, `$gt`, `$gte`,
/// `$lt`, `$lte`, `$exists` and `$type`.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => all_of(doc, condition)?.iter().all(|&m| m),
            "$or" => all_of(doc, condition)?.iter().any(|&m| m),
            op if op.starts_with('$') => {
                return Err(Error::invalid_arg(
                    "filter",
                    format!("unsupported top-level operator '{op}'"),
                ));
            }
            path => field_matches(get_path(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_of(doc: &Document, clauses: &Bson) -> Result<Vec<bool>> {
    let Bson::Array(clauses) = clauses else {
        return Err(Error::invalid_arg("filter", "$and/$or expect an array"));
    };
    clauses
        .iter()
        .map(|clause| match clause {
            Bson::Document(clause) => matches(doc, clause),
            _ => Err(Error::invalid_arg("filter", "$and/$or clauses must be documents")),
        })
        .collect()
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> Result<bool> {
    match condition {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            for (op, operand) in ops {
                if !operator_matches(value, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(equals(value, condition)),
    }
}

fn operator_matches(value: Option<&Bson>, op: &str, operand: &Bson) -> Result<bool> {
    let ok = match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" => compares(value, operand, |o| o == CmpOrdering::Greater),
        "$gte" => compares(value, operand, |o| o != CmpOrdering::Less),
        "$lt" => compares(value, operand, |o| o == CmpOrdering::Less),
        "$lte" => compares(value, operand, |o| o != CmpOrdering::Greater),
        "$exists" => value.is_some() == truthy(operand),
        "$type" => match value {
            Some(v) => type_matches(v, operand)?,
            None => false,
        },
        _ => {
            return Err(Error::invalid_arg(
                "filter",
                format!("unsupported query operator '{op}'"),
            ));
        }
    };
    Ok(ok)
}

fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(v) if values_equal(v, expected) => true,
        Some(Bson::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
        Some(_) => false,
    }
}

/// Range operators only compare values of the same type class, as servers do.
fn compares(value: Option<&Bson>, operand: &Bson, accept: impl Fn(CmpOrdering) -> bool) -> bool {
    let check =
        |v: &Bson| type_class(v) == type_class(operand) && accept(compare_values(v, operand));
    match value {
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(v) => check(v),
        None => false,
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        Bson::Int32(v) => *v != 0,
        Bson::Int64(v) => *v != 0,
        Bson::Double(v) => *v != 0.0,
        _ => true,
    }
}

fn type_matches(value: &Bson, operand: &Bson) -> Result<bool> {
    let actual = value.element_type();
    let ok = match operand {
        Bson::Int32(code) => actual as i32 == *code,
        Bson::Int64(code) => actual as i64 == *code,
        Bson::Double(code) => actual as i32 as f64 == *code,
        Bson::String(alias) => match alias.as_str() {
            "number" => type_class(value) == NUMBER_CLASS,
            alias => {
                let expected = type_alias(alias).ok_or_else(|| {
                    Error::invalid_arg("$type", format!("unknown type alias '{alias}'"))
                })?;
                expected == actual
            }
        },
        _ => return Err(Error::invalid_arg("$type", "expected a type code or alias")),
    };
    Ok(ok)
}

fn type_alias(alias: &str) -> Option<ElementType> {
    let element_type = match alias {
        "double" => ElementType::Double,
        "string" => ElementType::String,
        "object" => ElementType::EmbeddedDocument,
        "array" => ElementType::Array,
        "binData" => ElementType::Binary,
        "objectId" => ElementType::ObjectId,
        "bool" => ElementType::Boolean,
        "date" => ElementType::DateTime,
        "null" => ElementType::Null,
        "regex" => ElementType::RegularExpression,
        "int" => ElementType::Int32,
        "timestamp" => ElementType::Timestamp,
        "long" => ElementType::Int64,
        "decimal" => ElementType::Decimal128,
        _ => return None,
    };
    Some(element_type)
}

const NUMBER_CLASS: u8 = 2;

/// Canonical ordering class of a value; numbers of all widths share one class.
fn type_class(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => NUMBER_CLASS,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Equality with numbers compared by value across widths.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Int32(x)) => *x as i64 == *y,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

/// Total order over values: by type class first, then by value within the class.
pub fn compare_values(a: &Bson, b: &Bson) -> CmpOrdering {
    let class = type_class(a).cmp(&type_class(b));
    if class != CmpOrdering::Equal {
        return class;
    }
    if let Some(ordering) = compare_numbers(a, b) {
        return ordering;
    }
    match (a, b) {
        (Bson::String(x) | Bson::Symbol(x), Bson::String(y) | Bson::Symbol(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Bson::Binary(x), Bson::Binary(y)) => {
            let key = |b: &bson::Binary| (b.bytes.len(), u8::from(b.subtype));
            key(x).cmp(&key(y)).then_with(|| x.bytes.cmp(&y.bytes))
        }
        (Bson::Array(x), Bson::Array(y)) => compare_sequences(x.iter(), y.iter()),
        (Bson::Document(x), Bson::Document(y)) => compare_sequences(x.iter(), y.iter()),
        _ => CmpOrdering::Equal,
    }
}

fn compare_numbers(a: &Bson, b: &Bson) -> Option<CmpOrdering> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) => Some((*x as i64).cmp(y)),
        (Bson::Int64(x), Bson::Int32(y)) => Some(x.cmp(&(*y as i64))),
        _ => Some(as_number(a)?.total_cmp(&as_number(b)?)),
    }
}

trait SortElement {
    fn compare(&self, other: &Self) -> CmpOrdering;
}

impl SortElement for &Bson {
    fn compare(&self, other: &Self) -> CmpOrdering {
        compare_values(self, other)
    }
}

impl SortElement for (&String, &Bson) {
    fn compare(&self, other: &Self) -> CmpOrdering {
        compare_values(self.1, other.1).then_with(|| self.0.cmp(other.0))
    }
}

fn compare_sequences<T: SortElement>(
    mut a: impl Iterator<Item = T>,
    mut b: impl Iterator<Item = T>,
) -> CmpOrdering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return CmpOrdering::Equal,
            (None, Some(_)) => return CmpOrdering::Less,
            (Some(_), None) => return CmpOrdering::Greater,
            (Some(x), Some(y)) => match x.compare(&y) {
                CmpOrdering::Equal => continue,
                other => return other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::{bson, doc};

    use super::*;

    #[test]
    fn test_get_path() {
        let doc = doc! { "a": { "b": [ { "c": 1 }, { "c": 2 } ] } };
        assert_eq!(get_path(&doc, "a.b.1.c"), Some(&Bson::Int32(2)));
        assert_eq!(get_path(&doc, "a.x"), None);
        assert_eq!(get_path(&doc, "a.b.c"), None);
    }

    #[test]
    fn test_operators() {
        let doc = doc! { "x": 5, "s": "abc", "tags": ["a", "b"], "n": null };
        let cases = [
            (doc! {}, true),
            (doc! { "x": 5 }, true),
            (doc! { "x": 5.0 }, true),
            (doc! { "x": 6 }, false),
            (doc! { "x": { "$gt": 4, "$lt": 6 } }, true),
            (doc! { "x": { "$gte": 6 } }, false),
            (doc! { "x": { "$gt": "a" } }, false),
            (doc! { "x": { "$ne": 5 } }, false),
            (doc! { "tags": "b" }, true),
            (doc! { "missing": { "$exists": false } }, true),
            (doc! { "n": { "$exists": true } }, true),
            (doc! { "missing": null }, true),
            (doc! { "s": { "$type": "string" } }, true),
            (doc! { "s": { "$type": 2 } }, true),
            (doc! { "x": { "$type": "number" } }, true),
            (doc! { "$or": [ { "x": 1 }, { "s": "abc" } ] }, true),
            (doc! { "$and": [ { "x": 5 }, { "s": "abd" } ] }, false),
        ];
        for (filter, expected) in cases {
            assert_eq!(matches(&doc, &filter).unwrap(), expected, "{filter}");
        }
        assert!(matches(&doc, &doc! { "x": { "$regex": "a" } }).is_err());
    }

    #[test]
    fn test_compare_values() {
        let mut values = vec![
            bson!("b"),
            bson!(3.5),
            Bson::Null,
            bson!(2i64),
            bson!(true),
            bson!("a"),
            bson!(10),
        ];
        values.sort_by(compare_values);
        assert_eq!(
            values,
            vec![
                Bson::Null,
                bson!(2i64),
                bson!(3.5),
                bson!(10),
                bson!("a"),
                bson!("b"),
                bson!(true)
            ]
        );
    }
}
