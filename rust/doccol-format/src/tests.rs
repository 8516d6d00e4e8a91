use doccol_common::error::ErrorKind;

use crate::{TypeDescriptor, TypeKind, WireType};

#[test]
fn test_resolve_round_trips_name_and_argument() {
    for kind in TypeKind::ALL {
        let spec = if kind.is_variable_width() {
            format!("{}:37", kind.name())
        } else {
            kind.name().to_string()
        };
        let first = TypeDescriptor::resolve(&spec).unwrap();
        let second = TypeDescriptor::resolve(&spec).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.kind, kind);
        assert_eq!(first.to_string(), spec);
        assert_eq!(TypeDescriptor::resolve(&first.to_string()).unwrap(), first);
    }
}

#[test]
fn test_fixed_kinds_keep_written_argument() {
    for kind in TypeKind::ALL.into_iter().filter(|k| !k.is_variable_width()) {
        let spec = format!("{}:17", kind.name());
        let desc = TypeDescriptor::resolve(&spec).unwrap();
        assert_eq!(desc.to_string(), spec);
        assert_eq!(desc.arg, Some(17));
        assert_eq!(Some(desc.width), kind.fixed_width());
        assert!(desc.same_layout(&TypeDescriptor::fixed(kind)));
        assert_eq!(TypeDescriptor::resolve(&desc.to_string()).unwrap(), desc);
    }
    assert_eq!(TypeDescriptor::resolve("int32:0").unwrap().to_string(), "int32:0");
}

#[test]
fn test_resolve_errors() {
    let cases = [
        ("string:6:4", "too many parts"),
        ("string:x", "unable to parse"),
        ("junk", "unknown type name"),
        ("string:0", "nonzero length"),
        ("binary", "nonzero length"),
        ("int32:-1", "unable to parse"),
        ("string:+5", "unable to parse"),
        ("string:05", "unable to parse"),
        ("int64:007", "unable to parse"),
        ("string: 5", "unable to parse"),
        ("string:", "unable to parse"),
        ("", "unknown type name"),
    ];
    for (spec, expected) in cases {
        let err = TypeDescriptor::resolve(spec).unwrap_err();
        assert!(err.is_configuration());
        match err.kind() {
            ErrorKind::InvalidTypeSpec { message, .. } => {
                assert!(message.contains(expected), "{spec}: {message}")
            }
            other => panic!("{spec}: unexpected error {other:?}"),
        }
    }
}

#[test]
fn test_encode_wire_types() {
    let expected = [
        ("bool", WireType::Boolean),
        ("int8", WireType::Int32),
        ("uint16", WireType::Int32),
        ("uint32", WireType::Int64),
        ("int64", WireType::Int64),
        ("float32", WireType::Double),
        ("id", WireType::ObjectId),
        ("date", WireType::DateTime),
        ("timestamp", WireType::Timestamp),
        ("string:4", WireType::String),
        ("binary:4", WireType::Binary),
        ("bson:4", WireType::EmbeddedDocument),
    ];
    for (spec, wire_type) in expected {
        let desc: TypeDescriptor = spec.parse().unwrap();
        assert_eq!(desc.wire_type, Some(wire_type), "{spec}");
    }
}
