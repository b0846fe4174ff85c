use facet::Facet;
use facet_testhelpers::test;
use facet_unstructured::{
    Map, UnstructuredErrorKind, Value, from_unstructured, from_unstructured_with_validation,
};

fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Object(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

// ============================================================================
// Unknown field detection
// ============================================================================

/// A single unknown key at the root
#[test]
fn rejects_unknown_root_key() {
    #[derive(Facet, Debug, Default)]
    struct Config {
        name: String,
    }

    let map = Map::from([
        ("name".into(), Value::from("web")),
        ("extra".into(), Value::Int(1)),
    ]);

    let err = from_unstructured_with_validation::<Config>(&map).unwrap_err();
    assert!(err.is_strict_decoding());
    assert_eq!(
        err.to_string(),
        r#"strict decoding error: unknown field "extra""#
    );

    // The same input decodes fine without validation
    let config: Config = from_unstructured(&map).unwrap();
    assert_eq!(config.name, "web");
}

/// Paths join keys with dots and render sequence positions as indices
#[test]
fn reports_nested_paths() {
    #[derive(Facet, Debug, Default)]
    struct Root {
        a: A,
    }

    #[derive(Facet, Debug, Default)]
    struct A {
        b: Vec<Item>,
    }

    #[derive(Facet, Debug, Default)]
    struct Item {
        name: String,
    }

    let map = Map::from([(
        "a".into(),
        object([(
            "b",
            Value::Array(vec![
                object([("name", Value::from("x"))]),
                object([("name", Value::from("y"))]),
                object([("name", Value::from("z")), ("c", Value::Bool(true))]),
            ]),
        )]),
    )]);

    let err = from_unstructured_with_validation::<Root>(&map).unwrap_err();
    let strict = err.strict_errors().unwrap();
    let paths: Vec<_> = strict.errors().iter().map(|e| e.path()).collect();
    assert_eq!(paths, ["a.b[2].c"]);
}

/// Every unknown field is collected, then reported once, sorted
#[test]
fn collects_all_unknown_fields_sorted() {
    #[derive(Facet, Debug, Default)]
    struct Deployment {
        spec: Spec,
    }

    #[derive(Facet, Debug, Default)]
    struct Spec {
        replicas: u32,
        containers: Vec<Container>,
    }

    #[derive(Facet, Debug, Default)]
    struct Container {
        image: String,
    }

    let map = Map::from([
        ("zzz".into(), Value::Null),
        (
            "spec".into(),
            object([
                ("replicas", Value::Int(3)),
                ("paused", Value::Bool(false)),
                (
                    "containers",
                    Value::Array(vec![
                        object([("image", Value::from("nginx")), ("ports", Value::Null)]),
                        object([("image", Value::from("redis"))]),
                    ]),
                ),
            ]),
        ),
    ]);

    let err = from_unstructured_with_validation::<Deployment>(&map).unwrap_err();
    assert_eq!(
        err.to_string(),
        concat!(
            r#"strict decoding error: "#,
            r#"unknown field "spec.containers[0].ports", "#,
            r#"unknown field "spec.paused", "#,
            r#"unknown field "zzz""#
        )
    );
    assert_eq!(err.strict_errors().unwrap().errors().len(), 3);
}

/// Keys consumed by an inlined field are known to the parent
#[test]
fn inlined_fields_share_the_parent_scope() {
    #[derive(Facet, Debug, Default)]
    struct Object {
        #[facet(flatten)]
        meta: Meta,
        spec: String,
    }

    #[derive(Facet, Debug, Default)]
    struct Meta {
        name: String,
        namespace: String,
    }

    let map = Map::from([
        ("name".into(), Value::from("web")),
        ("namespace".into(), Value::from("default")),
        ("spec".into(), Value::from("x")),
    ]);
    let object: Object = from_unstructured_with_validation(&map).unwrap();
    assert_eq!(object.meta.name, "web");
    assert_eq!(object.meta.namespace, "default");

    let mut with_extra = map.clone();
    with_extra.insert("status".into(), Value::Null);
    let err = from_unstructured_with_validation::<Object>(&with_extra).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"strict decoding error: unknown field "status""#
    );
}

/// A failure that is not about unknown fields wins over the collected ones
#[test]
fn other_errors_take_precedence() {
    #[derive(Facet, Debug, Default)]
    struct Config {
        port: u16,
    }

    let map = Map::from([
        ("port".into(), Value::from("eighty")),
        ("extra".into(), Value::Int(1)),
    ]);
    let err = from_unstructured_with_validation::<Config>(&map).unwrap_err();
    assert!(!err.is_strict_decoding());
    assert!(matches!(err.kind(), UnstructuredErrorKind::Coercion(_)));
}

/// Entries of a map destination are never unknown
#[test]
fn map_entries_are_not_unknown() {
    #[derive(Facet, Debug, Default)]
    struct Config {
        labels: std::collections::BTreeMap<String, String>,
    }

    let map = Map::from([(
        "labels".into(),
        object([("anything", Value::from("goes"))]),
    )]);
    let config: Config = from_unstructured_with_validation(&map).unwrap();
    assert_eq!(config.labels["anything"], "goes");
}
