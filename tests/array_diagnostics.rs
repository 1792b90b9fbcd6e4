use avro_schema::{Array, Label, Map, Schema, Value};
use proptest::prelude::*;

fn arb_item() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::Int),
        "[a-z]{0,4}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Boolean),
    ]
}

proptest! {
    /// Every position holding something other than an int is reported, and
    /// nothing else is.
    #[test]
    fn array_reports_exactly_the_bad_positions(items in prop::collection::vec(arb_item(), 0..32)) {
        let schema = Schema::from(Array::new(Schema::INT));
        let expected: Vec<Label> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| !matches!(item, Value::Int(_)))
            .map(|(i, _)| Label::Index(i))
            .collect();

        match schema.validate(&Value::Array(items)) {
            Ok(()) => prop_assert!(expected.is_empty()),
            Err(err) => {
                let reported: Vec<Label> = err.tree().children().keys().cloned().collect();
                prop_assert_eq!(expected, reported);
            }
        }
    }

    /// The report does not depend on the order in which entries were given.
    #[test]
    fn map_report_is_order_independent(mut entries in prop::collection::vec(("[a-z]{1,3}", arb_item()), 0..16)) {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);

        let schema = Schema::from(Map::new(Schema::STRING));
        let forward = schema.validate(&Value::map(entries.clone()));
        entries.reverse();
        let backward = schema.validate(&Value::map(entries));

        prop_assert_eq!(forward, backward);
    }
}
