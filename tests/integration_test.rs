use serde_json::{json, Value};
use siftql::{
    and_all, negate, normalize, or_all, DataType, FilterError, FilterNode, MapSchema, SchemaRef,
    SerializeOptions,
};

fn order_schema() -> SchemaRef {
    let detail = MapSchema::new("OrderDetail")
        .with_property("unitPrice", DataType::Float64)
        .with_property("quantity", DataType::Int32)
        .into_ref();
    MapSchema::new("Order")
        .with_property("freight", DataType::Float64)
        .with_property("shipCity", DataType::String)
        .with_property("shippedDate", DataType::DateTime)
        .with_navigation("details", detail)
        .into_ref()
}

fn must(input: Value) -> FilterNode {
    let _ = env_logger::builder().is_test(true).try_init();
    normalize(&input).unwrap().unwrap()
}

#[test]
fn test_tuple_input_serializes_and_evaluates() {
    let node = must(json!(["freight", ">", 100]));
    assert_eq!(node.to_json().unwrap(), json!({"freight": {"gt": 100}}));

    let pred = node.compile(None).unwrap();
    assert!(pred(&json!({"freight": 150})));
    assert!(!pred(&json!({"freight": 50})));
}

#[test]
fn test_startswith_object_form() {
    let pred = must(json!({"shipCity": {"startswith": "C"}}))
        .compile(None)
        .unwrap();
    assert!(pred(&json!({"shipCity": "Chicago"})));
    assert!(!pred(&json!({"shipCity": "Denver"})));
}

#[test]
fn test_and_merge_canonicalization() {
    let node = must(json!({"and": [
        {"freight": {"gt": 10}},
        {"shipCity": {"startswith": "C"}}
    ]}));
    assert_eq!(
        node.to_json().unwrap(),
        json!({"freight": {"gt": 10}, "shipCity": {"startswith": "C"}})
    );
}

#[test]
fn test_function_text_on_left_side() {
    let pred = must(json!({"toupper(shipCity)": "CHICAGO"}))
        .compile(None)
        .unwrap();
    assert!(pred(&json!({"shipCity": "chicago"})));
    assert!(!pred(&json!({"shipCity": "denver"})));
}

#[test]
fn test_negation_includes_boundary() {
    let pred = must(json!({"not": {"freight": {"gt": 100}}}))
        .compile(None)
        .unwrap();
    // gt is strict, so its complement includes the boundary
    assert!(pred(&json!({"freight": 100})));
    assert!(pred(&json!({"freight": 99})));
    assert!(!pred(&json!({"freight": 101})));
}

#[test]
fn test_combinators_collapse() {
    assert!(and_all([]).is_none());
    assert!(or_all([None]).is_none());
    assert!(negate(None).is_none());

    let single = and_all([Some(must(json!({"freight": {"gt": 10}})))]).unwrap();
    assert_eq!(single.to_json().unwrap(), json!({"freight": {"gt": 10}}));

    let both = and_all([
        Some(must(json!({"freight": {"gt": 10}}))),
        None,
        Some(must(json!({"shipCity": "Chicago"}))),
    ])
    .unwrap();
    let pred = both.compile(None).unwrap();
    assert!(pred(&json!({"freight": 20, "shipCity": "Chicago"})));
    assert!(!pred(&json!({"freight": 20, "shipCity": "Denver"})));
}

#[test]
fn test_alias_equivalence() {
    let symbolic = must(json!(["freight", ">=", 100]));
    let worded = must(json!(["freight", "GE", 100]));
    assert_eq!(symbolic.to_json().unwrap(), worded.to_json().unwrap());
}

#[test]
fn test_round_trip_law() {
    let records = [
        json!({"freight": 5, "shipCity": "Chicago"}),
        json!({"freight": 15, "shipCity": "Chicago"}),
        json!({"freight": 15, "shipCity": "Denver"}),
        json!({"freight": 15}),
        json!({}),
    ];
    let inputs = [
        json!(["freight", ">", 10]),
        json!({"shipCity": "Chicago"}),
        json!({"and": [{"freight": {"gt": 10}}, {"shipCity": {"startswith": "C"}}]}),
        json!({"or": [{"freight": {"gt": 10}}, {"shipCity": {"startswith": "C"}}]}),
        json!({"not": {"freight": {"le": 10}}}),
        json!({"toupper(shipCity)": "CHICAGO"}),
        json!({"freight": {"value": "10", "dataType": "Int32"}}),
    ];
    for input in inputs {
        let tree = must(input.clone());
        let rendered = tree.to_json().unwrap();
        let reparsed = must(rendered.clone());
        let original = tree.compile(None).unwrap();
        let round_tripped = reparsed.compile(None).unwrap();
        for record in &records {
            assert_eq!(
                original(record),
                round_tripped(record),
                "round trip diverged for {} on {}",
                rendered,
                record
            );
        }
    }
}

#[test]
fn test_quantifiers_over_collections() {
    let schema = order_schema();
    let node = must(json!({"details": {"any": {"unitPrice": {"gt": 5}}}}));
    let pred = node.compile(Some(&schema)).unwrap();

    assert!(pred(&json!({"details": [{"unitPrice": 2}, {"unitPrice": 9}]})));
    assert!(!pred(&json!({"details": [{"unitPrice": 2}]})));
    // Empty collection: any is vacuously false
    assert!(!pred(&json!({"details": []})));

    let node = must(json!({"details": {"all": {"unitPrice": {"gt": 5}}}}));
    let pred = node.compile(Some(&schema)).unwrap();
    assert!(pred(&json!({"details": [{"unitPrice": 9}, {"unitPrice": 8}]})));
    assert!(!pred(&json!({"details": [{"unitPrice": 9}, {"unitPrice": 2}]})));
    // Empty collection: all is vacuously true
    assert!(pred(&json!({"details": []})));
}

#[test]
fn test_five_element_tuple_matches_object_form() {
    let tuple = must(json!(["details", "any", "unitPrice", ">", 5]));
    let object = must(json!({"details": {"any": {"unitPrice": {"gt": 5}}}}));
    assert_eq!(tuple.to_json().unwrap(), object.to_json().unwrap());
}

#[test]
fn test_validation_failures_name_the_offender() {
    let schema = order_schema();
    let node = must(json!({"cargoWeight": {"gt": 100}}));
    match node.validate(Some(&schema)).unwrap_err() {
        FilterError::UnresolvablePath { path, schema } => {
            assert_eq!(path, "cargoWeight");
            assert_eq!(schema, "Order");
        }
        other => panic!("expected unresolvable path, got {:?}", other),
    }
}

#[test]
fn test_schema_typed_evaluation() {
    let schema = order_schema();
    // The declared Float64 type lets a numeric string on the right compare
    // numerically
    let node = must(json!(["freight", ">", "100"]));
    let pred = node.compile(Some(&schema)).unwrap();
    assert!(pred(&json!({"freight": 150.5})));
    assert!(!pred(&json!({"freight": 99.5})));
}

#[test]
fn test_datetime_filtering_through_schema() {
    let schema = order_schema();
    let node = must(json!({"shippedDate": {"ge": "2020-01-01T00:00:00Z"}}));
    let pred = node.compile(Some(&schema)).unwrap();
    assert!(pred(&json!({"shippedDate": "2020-03-15T08:00:00Z"})));
    assert!(!pred(&json!({"shippedDate": "2019-11-30T08:00:00Z"})));
}

#[test]
fn test_passthrough_round_trip_but_no_local_evaluation() {
    let node = must(json!("Status eq 'Open'"));
    assert_eq!(node.to_json().unwrap(), json!("Status eq 'Open'"));
    assert!(matches!(
        node.compile(None).err().unwrap(),
        FilterError::CannotEvaluate { .. }
    ));
}

#[test]
fn test_server_serialization() {
    let schema: SchemaRef = MapSchema::new("Order")
        .with_property("freight", DataType::Float64)
        .with_property("shipCity", DataType::String)
        .with_server_name("freight", "Freight")
        .with_server_name("shipCity", "ShipCity")
        .into_ref();
    let node = must(json!({"and": [
        {"freight": {"gt": 10}},
        {"shipCity": "Chicago"}
    ]}));
    let rendered = node
        .to_json_with(
            SerializeOptions {
                server: true,
                explicit_data_type: false,
            },
            Some(&schema),
        )
        .unwrap();
    assert_eq!(
        rendered,
        json!({"Freight": {"gt": 10}, "ShipCity": "Chicago"})
    );
}

#[test]
fn test_method_combinators() {
    let gt = must(json!({"freight": {"gt": 10}}));
    let city = must(json!({"shipCity": "Chicago"}));
    let pred = gt.and(city).not().compile(None).unwrap();
    assert!(!pred(&json!({"freight": 20, "shipCity": "Chicago"})));
    assert!(pred(&json!({"freight": 5, "shipCity": "Chicago"})));
}
