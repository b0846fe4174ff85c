use facet::Facet;
use facet_testhelpers::test;
use facet_unstructured::{Value, to_unstructured};

// ============================================================================
// Omit-if-empty
// ============================================================================

/// Zero values disappear, everything else stays
#[test]
fn zero_values_are_omitted() {
    #[derive(Facet, Debug, Default)]
    struct Spec {
        #[facet(omitempty)]
        name: String,
        #[facet(omitempty)]
        replicas: u32,
        #[facet(omitempty)]
        paused: bool,
        #[facet(omitempty)]
        ratio: f64,
        #[facet(omitempty)]
        args: Vec<String>,
        #[facet(omitempty)]
        labels: std::collections::BTreeMap<String, String>,
        #[facet(omitempty)]
        selector: Option<String>,
        #[facet(omitempty)]
        data: Vec<u8>,
    }

    let map = to_unstructured(&Spec::default()).unwrap();
    assert!(map.is_empty(), "expected empty map, got {map:?}");

    let map = to_unstructured(&Spec {
        name: "web".into(),
        replicas: 1,
        paused: true,
        ratio: 0.25,
        args: vec!["run".into()],
        labels: [("app".to_string(), "web".to_string())].into(),
        selector: Some(String::new()),
        data: vec![1],
    })
    .unwrap();
    assert_eq!(map.len(), 8);
    // A present option is never empty, even around an empty string
    assert_eq!(map["selector"], Value::from(""));
}

/// Without the attribute, empty values are still written
#[test]
fn zero_values_kept_without_attribute() {
    #[derive(Facet, Debug, Default)]
    struct Spec {
        name: String,
        replicas: u32,
        args: Vec<String>,
        selector: Option<String>,
    }

    let map = to_unstructured(&Spec::default()).unwrap();
    assert_eq!(map["name"], Value::from(""));
    assert_eq!(map["replicas"], Value::Int(0));
    assert_eq!(map["args"], Value::Array(vec![]));
    assert_eq!(map["selector"], Value::Null);
}

/// Structs are never considered empty
#[test]
fn structs_are_never_empty() {
    #[derive(Facet, Debug, Default)]
    struct Outer {
        #[facet(omitempty)]
        inner: Inner,
    }

    #[derive(Facet, Debug, Default)]
    struct Inner {
        #[facet(omitempty)]
        name: String,
    }

    let map = to_unstructured(&Outer::default()).unwrap();
    assert_eq!(map["inner"], Value::Object(Default::default()));
}
