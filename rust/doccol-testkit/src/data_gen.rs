//! Data generation utilities for testing.
//!
//! Generated "record" documents have a fixed shape with a few optional and
//! irregular fields, so that reads exercise both stored and masked cells.

use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use bson::{Binary, Bson, DateTime, Document, doc, spec::BinarySubtype};

/// 2022-01-01 00:00:00 UTC, in milliseconds.
const BASE_TIMESTAMP_MS: i64 = 1_640_995_200_000;

/// Column specs that read every field of a generated record.
pub const RECORD_COLUMNS: &[(&str, &str)] = &[
    ("_id", "int64"),
    ("ordinal", "int32"),
    ("name", "string:16"),
    ("score", "float64"),
    ("active", "bool"),
    ("point.x", "int32"),
    ("point.y", "float64"),
    ("blob", "binary:8"),
    ("created", "date"),
    ("rare", "int32"),
];

/// Builds record number `pos`.
///
/// * `_id` and `ordinal` are `pos`; `name` is `record_{pos}`
/// * `score` is a random double; `active` is random
/// * `point` is a sub-document `{ x, y }`
/// * `tags` is an array of zero to three strings
/// * `blob` is a generic binary of zero to eight random bytes
/// * `created` is `pos` seconds after 2022-01-01
/// * `rare` is present in one record out of five
/// * `ordinal` is stored as a string in one record out of seven
pub fn generate_record(rng: &mut fastrand::Rng, pos: u64) -> Document {
    let ordinal = if pos % 7 == 6 {
        Bson::String(pos.to_string())
    } else {
        Bson::Int32(pos as i32)
    };
    let tags: Vec<Bson> = (0..rng.usize(0..4))
        .map(|i| Bson::String(format!("tag{i}")))
        .collect();
    let bytes: Vec<u8> = (0..rng.usize(0..=8)).map(|_| rng.u8(..)).collect();
    let blob = Binary {
        subtype: BinarySubtype::Generic,
        bytes,
    };

    let id = pos as i64;
    let name = format!("record_{pos}");
    let score = rng.f64() * 100.0;
    let active = rng.bool();
    let x = rng.i32(-1000..1000);
    let y = rng.f64();
    let created = DateTime::from_millis(BASE_TIMESTAMP_MS + id * 1000);

    let mut doc = doc! {
        "_id": id,
        "ordinal": ordinal,
        "name": name,
        "score": score,
        "active": active,
        "point": { "x": x, "y": y },
        "tags": tags,
        "blob": blob,
        "created": created,
    };
    if pos % 5 == 0 {
        doc.insert("rare", rng.i32(..));
    }
    doc
}

/// Generates `count` records with a seeded generator; equal seeds give equal records.
pub fn generate_records(count: usize, seed: u64) -> Vec<Document> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count as u64)
        .map(|pos| generate_record(&mut rng, pos))
        .collect()
}

/// Writes `count` generated records to a temporary file, one canonical extended JSON
/// document per line, positioned at the start of the file.
pub fn generate_record_entries(count: usize, seed: u64) -> anyhow::Result<tempfile::NamedTempFile> {
    assert_ne!(count, 0);
    let mut file = tempfile::NamedTempFile::new()?;
    for doc in generate_records(count, seed) {
        let json = Bson::Document(doc).into_canonical_extjson();
        serde_json::to_writer(&mut file, &json)?;
        file.write_all(b"\n")?;
    }
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

/// Reads documents from a file written by [`generate_record_entries`].
pub fn load_record_entries(path: &Path) -> anyhow::Result<Vec<Document>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)?;
        match Bson::try_from(value)? {
            Bson::Document(doc) => docs.push(doc),
            other => anyhow::bail!("expected a document, found {other}"),
        }
    }
    Ok(docs)
}
