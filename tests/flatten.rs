use facet::Facet;
use facet_testhelpers::test;
use facet_unstructured::{Map, Value, from_unstructured, to_unstructured};

// ============================================================================
// Inlined fields
// ============================================================================

/// A flattened struct's fields sit next to the parent's own fields
#[test]
fn flatten_promotes_fields() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Service {
        #[facet(flatten)]
        meta: ObjectMeta,
        port: u16,
    }

    #[derive(Facet, Debug, PartialEq, Default)]
    struct ObjectMeta {
        name: String,
        namespace: String,
    }

    let service = Service {
        meta: ObjectMeta {
            name: "api".into(),
            namespace: "prod".into(),
        },
        port: 443,
    };

    let map = to_unstructured(&service).unwrap();
    assert_eq!(
        map,
        Map::from([
            ("name".into(), Value::from("api")),
            ("namespace".into(), Value::from("prod")),
            ("port".into(), Value::Int(443)),
        ])
    );

    let back: Service = from_unstructured(&map).unwrap();
    assert_eq!(back, service);
}

/// Flattening nests: inner inlined fields reach the outermost object
#[test]
fn nested_flatten() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Outer {
        #[facet(flatten)]
        middle: Middle,
        outer: bool,
    }

    #[derive(Facet, Debug, PartialEq, Default)]
    struct Middle {
        #[facet(flatten)]
        inner: Inner,
        middle: i32,
    }

    #[derive(Facet, Debug, PartialEq, Default)]
    struct Inner {
        inner: String,
    }

    let value = Outer {
        middle: Middle {
            inner: Inner {
                inner: "deep".into(),
            },
            middle: 2,
        },
        outer: true,
    };

    let map = to_unstructured(&value).unwrap();
    let keys: Vec<_> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["inner", "middle", "outer"]);

    let back: Outer = from_unstructured(&map).unwrap();
    assert_eq!(back, value);
}

/// An absent optional inlined struct contributes nothing on encode, and is
/// always allocated on decode
#[test]
fn optional_flatten() {
    #[derive(Facet, Debug, PartialEq, Default)]
    struct Pod {
        name: String,
        #[facet(flatten)]
        extras: Option<Extras>,
    }

    #[derive(Facet, Debug, PartialEq, Default)]
    struct Extras {
        priority: i32,
    }

    let map = to_unstructured(&Pod {
        name: "web".into(),
        extras: None,
    })
    .unwrap();
    assert_eq!(map, Map::from([("name".into(), Value::from("web"))]));

    let back: Pod = from_unstructured(&map).unwrap();
    assert_eq!(back.extras, Some(Extras { priority: 0 }));

    let map = Map::from([
        ("name".into(), Value::from("web")),
        ("priority".into(), Value::Int(10)),
    ]);
    let back: Pod = from_unstructured(&map).unwrap();
    assert_eq!(back.extras, Some(Extras { priority: 10 }));
}
