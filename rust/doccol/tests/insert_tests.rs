use std::sync::Arc;

use bson::doc;
use doccol::{
    Client, ClientConfig, QueryOptions,
    columns::{ColumnSet, parse_specs},
    common::ErrorKind,
    driver::{Namespace, Ordering, memory::MemoryDriver},
};

fn client() -> anyhow::Result<(Arc<MemoryDriver>, Client)> {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::init(driver.clone(), ClientConfig::default())?;
    Ok((driver, client))
}

#[test]
fn test_insert_then_query_round_trip() -> anyhow::Result<()> {
    let (_driver, client) = client()?;
    let ns = Namespace::parse("insert.round_trip")?;

    let mut set = ColumnSet::from_specs_str_for_insert(&[("a", "int32"), ("b", "int32")], 1)?;
    set.column_mut(0).buffer_mut().set::<i32>(0, 1)?;
    set.column_mut(1).buffer_mut().set::<i32>(0, 2)?;
    set.set_rows_filled(1)?;
    let ids = client.insert(&ns, &set)?;
    assert_eq!(ids.len(), 1);
    assert!(ids.object_id(0)?.is_some());

    let columns = parse_specs(&[("a", "int32"), ("b", "int32")])?;
    let read = client.query(&ns, doc! {}, columns, &QueryOptions::default())?;
    assert_eq!(read.column(0).buffer().get::<i32>(0)?, Some(1));
    assert_eq!(read.column(1).buffer().get::<i32>(0)?, Some(2));
    Ok(())
}

#[test]
fn test_three_row_scenario() -> anyhow::Result<()> {
    let (_driver, client) = client()?;
    let ns = Namespace::parse("insert.scenario")?;

    let specs = [("n", "int32"), ("s", "string:5"), ("order", "int32")];
    let mut set = ColumnSet::from_specs_str_for_insert(&specs, 3)?;
    set.column_mut(0).buffer_mut().set::<i32>(0, 1)?;
    set.column_mut(0).buffer_mut().set::<i32>(1, 2)?;
    let s = set.column_mut(1).buffer_mut();
    s.set_bytes(0, b"ab")?;
    s.set_bytes(1, b"longstr")?;
    s.set_bytes(2, b"cd")?;
    for row in 0..3 {
        set.column_mut(2).buffer_mut().set::<i32>(row, row as i32)?;
    }
    set.set_rows_filled(3)?;
    client.insert(&ns, &set)?;

    let columns = parse_specs(&[("n", "int32"), ("s", "string:5")])?;
    let options = QueryOptions::new().sort(Ordering::ascending("order")?);
    let read = client.query(&ns, doc! {}, columns, &options)?;
    let n = read.column(0).buffer();
    let s = read.column(1).buffer();
    assert_eq!((n.get::<i32>(0)?, s.text(0)), (Some(1), Some(&b"ab"[..])));
    assert_eq!((n.get::<i32>(1)?, s.text(1)), (Some(2), Some(&b"longs"[..])));
    assert!(n.is_masked(2));
    assert_eq!(s.text(2), Some(&b"cd"[..]));
    Ok(())
}

#[test]
fn test_insert_writes_every_row_of_a_fresh_set() -> anyhow::Result<()> {
    let (driver, client) = client()?;
    let ns = Namespace::parse("insert.fresh")?;

    let mut set = ColumnSet::from_specs_str_for_insert(&[("v", "int32")], 2)?;
    set.column_mut(0).buffer_mut().set::<i32>(0, 7)?;
    set.column_mut(0).buffer_mut().set::<i32>(1, 8)?;
    let ids = client.insert(&ns, &set)?;
    assert_eq!(ids.len(), 2);
    assert_eq!(ids.inserted_count(), 2);
    assert_eq!(driver.documents(&ns).len(), 2);

    // Lowering the filled count writes only the leading rows.
    set.set_rows_filled(1)?;
    let ids = client.insert(&ns, &set)?;
    assert_eq!(ids.len(), 1);
    assert_eq!(driver.documents(&ns).len(), 3);
    Ok(())
}

#[test]
fn test_insert_connection_failure_is_propagated() -> anyhow::Result<()> {
    let (driver, client) = client()?;
    let ns = Namespace::parse("insert.offline")?;
    let mut set = ColumnSet::from_specs_str_for_insert(&[("_id", "int64")], 2)?;
    set.column_mut(0).buffer_mut().set::<i64>(0, 1)?;
    set.column_mut(0).buffer_mut().set::<i64>(1, 2)?;

    driver.set_offline(true);
    let err = client.insert(&ns, &set).unwrap_err();
    assert!(err.is_connection());

    driver.set_offline(false);
    assert!(driver.documents(&ns).is_empty());
    Ok(())
}

#[test]
fn test_sparse_insert_omits_masked_keys() -> anyhow::Result<()> {
    let (driver, client) = client()?;
    let ns = Namespace::parse("insert.sparse")?;

    let mut set = ColumnSet::from_specs_str_for_insert(
        &[("x", "float64"), ("_id", "int32"), ("nested.y", "bool")],
        2,
    )?;
    set.column_mut(1).buffer_mut().set::<i32>(0, 10)?;
    set.column_mut(1).buffer_mut().set::<i32>(1, 11)?;
    set.column_mut(0).buffer_mut().set::<f64>(1, 0.5)?;
    set.column_mut(2).buffer_mut().set::<u8>(0, 1)?;
    set.set_rows_filled(2)?;
    let ids = client.insert(&ns, &set)?;
    assert_eq!(ids.buffer().get::<i32>(1)?, Some(11));

    let docs = driver.documents(&ns);
    assert_eq!(docs[0], doc! { "_id": 10, "nested": { "y": true } });
    assert_eq!(docs[1], doc! { "_id": 11, "x": 0.5 });
    assert_eq!(docs[1].keys().next().map(String::as_str), Some("_id"));
    Ok(())
}

#[test]
fn test_duplicate_ids_are_masked() -> anyhow::Result<()> {
    let (driver, client) = client()?;
    let ns = Namespace::parse("insert.duplicates")?;

    let mut set = ColumnSet::from_specs_str_for_insert(&[("_id", "int64"), ("v", "int32")], 4)?;
    for (row, id) in [1i64, 2, 1, 3].into_iter().enumerate() {
        set.column_mut(0).buffer_mut().set::<i64>(row, id)?;
        set.column_mut(1).buffer_mut().set::<i32>(row, row as i32)?;
    }
    set.set_rows_filled(4)?;

    let ids = client.insert(&ns, &set)?;
    assert_eq!(ids.failed_rows(), [2]);
    assert_eq!(ids.inserted_count(), 3);
    assert_eq!(ids.buffer().get::<i64>(3)?, Some(3));
    assert_eq!(driver.documents(&ns).len(), 3);
    Ok(())
}

#[test]
fn test_masked_identifier_fails_before_write() -> anyhow::Result<()> {
    let (driver, client) = client()?;
    let ns = Namespace::parse("insert.missing")?;

    let mut set = ColumnSet::from_specs_str_for_insert(&[("_id", "int64")], 3)?;
    set.column_mut(0).buffer_mut().set::<i64>(0, 1)?;
    set.column_mut(0).buffer_mut().set::<i64>(2, 3)?;
    set.set_rows_filled(3)?;

    let err = client.insert(&ns, &set).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingIdentifier { row: 1 }));
    assert_eq!(driver.round_trips(), 0);
    Ok(())
}

#[test]
fn test_conflicting_fields_rejected() -> anyhow::Result<()> {
    let err = ColumnSet::from_specs_str_for_insert(&[("a", "int32"), ("a.b", "int32")], 1)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ConflictingNestedField { .. }));

    // A query set may hold such columns; inserting it is still rejected.
    let (driver, client) = client()?;
    let mut set = ColumnSet::from_specs_str(&[("a", "int32"), ("a", "length")], 1)?;
    set.set_rows_filled(1)?;
    let err = client
        .insert(&Namespace::parse("insert.conflict")?, &set)
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(driver.round_trips(), 0);
    Ok(())
}

#[test]
fn test_insert_records_and_read_back() -> anyhow::Result<()> {
    let (_driver, client) = client()?;
    let ns = Namespace::parse("insert.records")?;
    let records = doccol_testkit::data_gen::generate_records(30, 3);

    // Read the generated records out of one collection and write them into another.
    let (source_driver, source_ns, _) =
        doccol_testkit::collection::seeded_collection("insert.source", 30, 3)?;
    let source = Client::init(source_driver, ClientConfig::default())?;
    let columns = parse_specs(&[("_id", "int64"), ("name", "string:16"), ("point.x", "int32")])?;
    let set = source.query(&source_ns, doc! {}, columns.clone(), &QueryOptions::default())?;
    let ids = client.insert(&ns, &set)?;
    assert_eq!(ids.inserted_count(), records.len());

    let copy = client.query(&ns, doc! {}, columns, &QueryOptions::default())?;
    for (row, record) in records.iter().enumerate() {
        assert_eq!(copy.column(0).buffer().get::<i64>(row)?, Some(record.get_i64("_id")?));
        let name = record.get_str("name")?;
        assert_eq!(copy.column(1).buffer().text(row), Some(name.as_bytes()));
        let x = record.get_document("point")?.get_i32("x")?;
        assert_eq!(copy.column(2).buffer().get::<i32>(row)?, Some(x));
    }
    Ok(())
}
