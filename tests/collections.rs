use std::collections::HashMap;

use facet::Facet;
use facet_testhelpers::test;
use facet_unstructured::{Map, UnstructuredErrorKind, Value, from_unstructured, to_unstructured};

// ============================================================================
// Byte sequences
// ============================================================================

/// Byte vectors travel as standard base64 strings
#[test]
fn bytes_encode_as_base64() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Secret {
        data: Vec<u8>,
    }

    let secret = Secret {
        data: vec![0x68, 0x69],
    };
    let map = to_unstructured(&secret).unwrap();
    assert_eq!(map["data"], Value::from("aGk="));

    let back: Secret = from_unstructured(&map).unwrap();
    assert_eq!(back, secret);
}

/// An empty string decodes to an empty byte vector
#[test]
fn empty_base64_string() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Secret {
        data: Vec<u8>,
    }

    let map = Map::from([("data".into(), Value::from(""))]);
    let secret: Secret = from_unstructured(&map).unwrap();
    assert!(secret.data.is_empty());

    let map = to_unstructured(&Secret::default()).unwrap();
    assert_eq!(map["data"], Value::from(""));
}

/// Invalid base64 surfaces the decoder's error
#[test]
fn invalid_base64() {
    #[derive(Facet, Debug, Default)]
    struct Secret {
        data: Vec<u8>,
    }

    let map = Map::from([("data".into(), Value::from("not base64!"))]);
    let err = from_unstructured::<Secret>(&map).unwrap_err();
    assert!(matches!(err.kind(), UnstructuredErrorKind::Base64(_)));
    assert!(std::error::Error::source(&err).is_some());
}

/// Byte vectors cannot be built from arrays of numbers
#[test]
fn bytes_from_array_is_mismatch() {
    #[derive(Facet, Debug, Default)]
    struct Secret {
        data: Vec<u8>,
    }

    let map = Map::from([(
        "data".into(),
        Value::Array(vec![Value::Int(104), Value::Int(105)]),
    )]);
    let err = from_unstructured::<Secret>(&map).unwrap_err();
    assert_eq!(err.to_string(), "cannot restore slice from array");
}

// ============================================================================
// Sequences
// ============================================================================

/// A sequence field cannot be built from an object
#[test]
fn sequence_from_object_is_mismatch() {
    #[derive(Facet, Debug, Default)]
    struct Config {
        hosts: Vec<String>,
    }

    let map = Map::from([("hosts".into(), Value::Object(Map::new()))]);
    let err = from_unstructured::<Config>(&map).unwrap_err();
    assert!(matches!(err.kind(), UnstructuredErrorKind::ShapeMismatch(_)));
    assert_eq!(err.to_string(), "cannot restore slice from object");
}

/// Fixed-size arrays and tuples are positional
#[test]
fn arrays_and_tuples() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Shape {
        origin: [i32; 3],
        label: (String, u8),
    }

    let shape = Shape {
        origin: [1, -2, 3],
        label: ("cube".into(), 6),
    };
    let map = to_unstructured(&shape).unwrap();
    assert_eq!(
        map["origin"],
        Value::Array(vec![Value::Int(1), Value::Int(-2), Value::Int(3)])
    );
    assert_eq!(
        map["label"],
        Value::Array(vec![Value::from("cube"), Value::Int(6)])
    );

    let back: Shape = from_unstructured(&map).unwrap();
    assert_eq!(back, shape);
}

/// Arrays must match their declared length exactly
#[test]
fn array_length_mismatch() {
    #[derive(Facet, Debug, Default)]
    struct Shape {
        origin: [i32; 3],
    }

    let map = Map::from([(
        "origin".into(),
        Value::Array(vec![Value::Int(1), Value::Int(2)]),
    )]);
    let err = from_unstructured::<Shape>(&map).unwrap_err();
    assert!(matches!(err.kind(), UnstructuredErrorKind::ShapeMismatch(_)));
}

// ============================================================================
// Maps
// ============================================================================

/// String-keyed maps become objects
#[test]
fn string_keyed_maps() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Limits {
        resources: HashMap<String, i64>,
    }

    let limits = Limits {
        resources: [("cpu".to_string(), 2), ("memory".to_string(), 512)].into(),
    };
    let map = to_unstructured(&limits).unwrap();
    assert_eq!(
        map["resources"],
        Value::Object(Map::from([
            ("cpu".into(), Value::Int(2)),
            ("memory".into(), Value::Int(512)),
        ]))
    );

    let back: Limits = from_unstructured(&map).unwrap();
    assert_eq!(back, limits);
}

/// A top-level map destination accepts any mapping
#[test]
fn top_level_map() {
    let source = Map::from([
        ("a".into(), Value::Int(1)),
        ("b".into(), Value::Float(2.0)),
    ]);
    let counts: HashMap<String, u32> = from_unstructured(&source).unwrap();
    assert_eq!(counts["a"], 1);
    assert_eq!(counts["b"], 2);
}

/// Maps cannot be built from arrays
#[test]
fn map_from_array_is_mismatch() {
    #[derive(Facet, Debug, Default)]
    struct Limits {
        resources: HashMap<String, i64>,
    }

    let map = Map::from([("resources".into(), Value::Array(vec![]))]);
    let err = from_unstructured::<Limits>(&map).unwrap_err();
    assert_eq!(err.to_string(), "cannot restore map from array");
}

/// Maps with non-string keys have no unstructured form
#[test]
fn non_string_keys_rejected() {
    #[derive(Facet, Debug, Default)]
    struct Ports {
        by_number: HashMap<u16, String>,
    }

    let ports = Ports {
        by_number: [(80, "http".to_string())].into(),
    };
    let err = to_unstructured(&ports).unwrap_err();
    assert!(matches!(err.kind(), UnstructuredErrorKind::ShapeMismatch(_)));
}
