use doccol_columns::{ColumnBuffer, ColumnSet, ColumnSpec};
use doccol_format::{TypeDescriptor, TypeKind};

#[test]
fn test_every_kind_allocates_masked() {
    let names: Vec<String> = TypeKind::ALL.iter().map(|k| format!("f_{}", k.name())).collect();
    let specs = TypeKind::ALL
        .iter()
        .zip(&names)
        .map(|(kind, name)| {
            let spec = if kind.is_variable_width() {
                format!("{}:7", kind.name())
            } else {
                kind.name().to_string()
            };
            ColumnSpec::parse(name, &spec).unwrap()
        })
        .collect::<Vec<_>>();
    let set = ColumnSet::allocate(specs, 10).unwrap();
    assert_eq!(set.len(), TypeKind::ALL.len());
    for column in set.columns() {
        let buffer = column.buffer();
        assert_eq!(buffer.capacity(), 10);
        assert_eq!(buffer.as_bytes().len(), 10 * buffer.width());
        assert_eq!(buffer.mask().count_masked(), 10);
    }
}

#[test]
fn test_random_fill_counts() {
    fastrand::seed(977123);
    let mut set = ColumnSet::from_specs_str(&[("x", "float32"), ("y", "uint16")], 200).unwrap();
    let mut valid = 0;
    for row in 0..200 {
        if fastrand::bool() {
            set.column_mut(0)
                .buffer_mut()
                .set::<f32>(row, fastrand::f32())
                .unwrap();
            valid += 1;
        }
        if fastrand::bool() {
            set.column_mut(1)
                .buffer_mut()
                .set::<u16>(row, fastrand::u16(..))
                .unwrap();
            valid += 1;
        }
    }
    set.set_rows_filled(200).unwrap();
    assert_eq!(set.count_valid(), valid);
    assert_eq!(set.count_masked(), 400 - valid);

    set.set_rows_filled(0).unwrap();
    assert_eq!(set.count_masked(), 0);
}

#[test]
fn test_from_columns() {
    let mut ids = ColumnBuffer::new(TypeDescriptor::fixed(TypeKind::Int64), 3);
    ids.set::<i64>(0, 10).unwrap();
    let names = ColumnBuffer::new(TypeDescriptor::resolve("string:4").unwrap(), 3);
    let set = ColumnSet::from_columns(vec![
        (ColumnSpec::parse("_id", "int64").unwrap(), ids),
        (ColumnSpec::parse("name", "string:4").unwrap(), names),
    ])
    .unwrap();
    assert_eq!(set.rows_filled(), 3);
    assert_eq!(
        set.column_by_path("_id")
            .unwrap()
            .buffer()
            .get::<i64>(0)
            .unwrap(),
        Some(10)
    );

    let short = ColumnBuffer::new(TypeDescriptor::fixed(TypeKind::Bool), 2);
    let long = ColumnBuffer::new(TypeDescriptor::fixed(TypeKind::Bool), 3);
    assert!(
        ColumnSet::from_columns(vec![
            (ColumnSpec::parse("a", "bool").unwrap(), short),
            (ColumnSpec::parse("b", "bool").unwrap(), long),
        ])
        .is_err()
    );
}
