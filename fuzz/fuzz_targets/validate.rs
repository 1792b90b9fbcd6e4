#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Vec<u8>, avro_schema::Value)| {
    let (spec, value) = input;

    // We're only interested in fuzzing against valid schemas.
    let schema = match serde_json::from_slice(&spec) {
        Ok(json) => match avro_schema::Schema::from_json(&json) {
            Ok(schema) => schema,
            Err(_) => return,
        },
        Err(_) => return,
    };

    if let Err(err) = schema.validate(&value) {
        assert!(!err.is_invalid_schema());
        let _ = err.to_string();
    }
});
