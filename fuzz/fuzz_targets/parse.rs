#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = avro_schema::ParseOptions::new().with_max_depth(64);

    // Anything the parser accepts must serialize and parse back to itself.
    if let Ok(schema) = avro_schema::parse_with(data, &options) {
        let spec = schema.to_vec().expect("parsed schema serializes");
        assert_eq!(schema, avro_schema::parse(&spec).expect("serialized schema parses"));
    }
});
