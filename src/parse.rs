use crate::name::NamedAttributes;
use crate::validate::ValidationError;
use crate::value::bytes_from_json;
use crate::{Array, Enum, Field, Fixed, Map, Order, Primitive, Record, Schema, Union, Value};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

type JsonObject = JsonMap<String, JsonValue>;

/// Limits that apply while parsing a schema document.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    max_depth: usize,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects documents nested more than `max_depth` schemas deep. Zero, the
    /// default, means no limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unmarshal schema json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required attribute \"{0}\"")]
    MissingRequiredAttribute(&'static str),

    #[error("expected attribute \"{attribute}\" to have type \"{expected}\" but it was \"{actual}\"")]
    InvalidAttributeType {
        attribute: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("\"{actual}\" is an invalid value for field \"{field}\"")]
    InvalidValue { field: &'static str, actual: String },

    /// A bare string that is not a primitive name. References to named types
    /// are not resolved.
    #[error("unsupported type: \"{0}\"")]
    UnsupportedType(String),

    #[error("a schema must be a string, an array or an object, but it was \"{0}\"")]
    InvalidShape(&'static str),

    #[error("{kind} schema is invalid:\n{source}")]
    Invalid {
        kind: &'static str,
        source: ValidationError,
    },

    #[error("schema is nested more than {0} levels deep")]
    MaxDepthExceeded(usize),

    #[error("unmarshal {path} json: {source}")]
    Nested {
        path: String,
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// The innermost error, with every [`ParseError::Nested`] wrapper removed.
    pub fn root(&self) -> &ParseError {
        match self {
            ParseError::Nested { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Parses an Avro schema declaration.
///
/// ```
/// use avro_schema::{parse, Schema};
///
/// let schema = parse(br#"{"type": "array", "items": "long"}"#).unwrap();
/// assert_eq!("array", schema.kind());
///
/// let union = parse(br#"["null", "string"]"#).unwrap();
/// assert_eq!("union", union.kind());
/// ```
pub fn parse(spec: &[u8]) -> Result<Schema, ParseError> {
    parse_with(spec, &ParseOptions::default())
}

pub fn parse_str(spec: &str) -> Result<Schema, ParseError> {
    parse(spec.as_bytes())
}

pub fn parse_with(spec: &[u8], options: &ParseOptions) -> Result<Schema, ParseError> {
    let json: JsonValue = serde_json::from_slice(spec)?;
    Parser::new(options).schema(&json)
}

impl Schema {
    /// Builds a schema from an already decoded JSON document.
    pub fn from_json(json: &JsonValue) -> Result<Schema, ParseError> {
        Parser::new(&ParseOptions::default()).schema(json)
    }
}

impl FromStr for Schema {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_str(s)
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn required<'a>(obj: &'a JsonObject, attribute: &'static str) -> Result<&'a JsonValue, ParseError> {
    obj.get(attribute)
        .ok_or(ParseError::MissingRequiredAttribute(attribute))
}

fn required_str<'a>(obj: &'a JsonObject, attribute: &'static str) -> Result<&'a str, ParseError> {
    match required(obj, attribute)? {
        JsonValue::String(s) => Ok(s),
        other => Err(ParseError::InvalidAttributeType {
            attribute,
            expected: "string",
            actual: json_kind(other),
        }),
    }
}

fn optional_str(obj: &JsonObject, attribute: &'static str) -> Result<Option<String>, ParseError> {
    match obj.get(attribute) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ParseError::InvalidAttributeType {
            attribute,
            expected: "string",
            actual: json_kind(other),
        }),
    }
}

fn strings(json: &JsonValue, attribute: &'static str) -> Result<Vec<String>, ParseError> {
    let invalid = |actual| ParseError::InvalidAttributeType {
        attribute,
        expected: "array of strings",
        actual,
    };

    match json {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => Ok(s.clone()),
                other => Err(invalid(json_kind(other))),
            })
            .collect(),
        other => Err(invalid(json_kind(other))),
    }
}

fn optional_strings(obj: &JsonObject, attribute: &'static str) -> Result<Vec<String>, ParseError> {
    match obj.get(attribute) {
        None => Ok(Vec::new()),
        Some(json) => strings(json, attribute),
    }
}

fn named_attributes(obj: &JsonObject) -> Result<NamedAttributes, ParseError> {
    Ok(NamedAttributes {
        name: required_str(obj, "name")?.to_owned(),
        namespace: optional_str(obj, "namespace")?,
        aliases: optional_strings(obj, "aliases")?,
    })
}

/// Recursive descent over a schema document.
struct Parser {
    max_depth: usize,
    depth: usize,
}

impl Parser {
    fn new(options: &ParseOptions) -> Self {
        Self {
            max_depth: options.max_depth,
            depth: 0,
        }
    }

    fn schema(&mut self, json: &JsonValue) -> Result<Schema, ParseError> {
        match json {
            JsonValue::String(s) => s
                .parse::<Primitive>()
                .map(Schema::Primitive)
                .map_err(|()| ParseError::UnsupportedType(s.clone())),
            JsonValue::Array(members) => self.union(members),
            JsonValue::Object(obj) => self.object(obj),
            other => Err(ParseError::InvalidShape(json_kind(other))),
        }
    }

    /// Parses a schema-valued attribute, labelling any failure with `path`.
    fn nested(&mut self, path: impl FnOnce() -> String, json: &JsonValue) -> Result<Schema, ParseError> {
        if self.max_depth != 0 && self.depth >= self.max_depth {
            return Err(ParseError::MaxDepthExceeded(self.max_depth));
        }

        self.depth += 1;
        let result = self.schema(json);
        self.depth -= 1;

        result.map_err(|source| ParseError::Nested {
            path: path(),
            source: Box::new(source),
        })
    }

    fn object(&mut self, obj: &JsonObject) -> Result<Schema, ParseError> {
        let type_ = required_str(obj, "type")?;
        trace!(kind = type_, depth = self.depth, "parsing schema object");

        let schema = match type_ {
            "" => return Err(ParseError::MissingRequiredAttribute("type")),
            "record" => Schema::Record(self.record(obj)?),
            "enum" => Schema::Enum(enum_(obj)?),
            "array" => Schema::Array(Array {
                items: Box::new(self.nested(|| "array.items".to_owned(), required(obj, "items")?)?),
            }),
            "map" => Schema::Map(Map {
                values: Box::new(self.nested(|| "map.values".to_owned(), required(obj, "values")?)?),
            }),
            "fixed" => Schema::Fixed(fixed(obj)?),
            other => match other.parse::<Primitive>() {
                Ok(primitive) => return Ok(Schema::Primitive(primitive)),
                Err(()) => {
                    return Err(ParseError::InvalidValue {
                        field: "type",
                        actual: other.to_owned(),
                    })
                }
            },
        };

        checked(schema)
    }

    fn union(&mut self, members: &[JsonValue]) -> Result<Schema, ParseError> {
        trace!(members = members.len(), depth = self.depth, "parsing union");

        let members = members
            .iter()
            .enumerate()
            .map(|(i, member)| self.nested(|| format!("union[{}]", i), member))
            .collect::<Result<Vec<_>, _>>()?;

        checked(Schema::Union(Union { members }))
    }

    fn record(&mut self, obj: &JsonObject) -> Result<Record, ParseError> {
        let named = named_attributes(obj)?;
        let doc = optional_str(obj, "doc")?;

        let fields = match required(obj, "fields")? {
            JsonValue::Array(fields) => fields,
            other => {
                return Err(ParseError::InvalidAttributeType {
                    attribute: "fields",
                    expected: "array",
                    actual: json_kind(other),
                })
            }
        };

        let fields = fields
            .iter()
            .enumerate()
            .map(|(i, field)| self.field(i, field))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Record { named, doc, fields })
    }

    fn field(&mut self, index: usize, json: &JsonValue) -> Result<Field, ParseError> {
        let obj = match json {
            JsonValue::Object(obj) => obj,
            other => {
                return Err(ParseError::InvalidAttributeType {
                    attribute: "fields",
                    expected: "array of objects",
                    actual: json_kind(other),
                })
            }
        };

        let name = required_str(obj, "name")?.to_owned();
        let type_ = self.nested(
            || format!("record.fields[{}].type", index),
            required(obj, "type")?,
        )?;
        let default = obj.get("default").map(|json| default_value(json, &type_));

        Ok(Field {
            name,
            doc: optional_str(obj, "doc")?,
            type_,
            default,
            order: optional_str(obj, "order")?.map(|order| Order::from(order.as_str())),
            aliases: optional_strings(obj, "aliases")?,
        })
    }
}

fn enum_(obj: &JsonObject) -> Result<Enum, ParseError> {
    Ok(Enum {
        named: named_attributes(obj)?,
        doc: optional_str(obj, "doc")?,
        symbols: strings(required(obj, "symbols")?, "symbols")?,
        default: optional_str(obj, "default")?,
    })
}

fn fixed(obj: &JsonObject) -> Result<Fixed, ParseError> {
    let named = named_attributes(obj)?;

    let size = match required(obj, "size")? {
        JsonValue::Number(n) => n.as_u64().ok_or_else(|| ParseError::InvalidValue {
            field: "size",
            actual: n.to_string(),
        })?,
        other => {
            return Err(ParseError::InvalidAttributeType {
                attribute: "size",
                expected: "number",
                actual: json_kind(other),
            })
        }
    };

    Ok(Fixed { named, size })
}

/// Runs self-validation on a freshly built node.
fn checked(schema: Schema) -> Result<Schema, ParseError> {
    match schema.self_validate() {
        Ok(()) => Ok(schema),
        Err(source) => {
            debug!(kind = schema.kind(), "parsed schema failed self-validation");
            Err(ParseError::Invalid {
                kind: schema.kind(),
                source,
            })
        }
    }
}

/// Reads a field default the way Avro encodes defaults in JSON, with the
/// field's type deciding what each JSON value stands for. JSON the type cannot
/// account for is converted as-is, so that self-validation reports it.
fn default_value(json: &JsonValue, schema: &Schema) -> Value {
    match (schema, json) {
        (Schema::Primitive(Primitive::Int), JsonValue::Number(n)) => {
            match n.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(n) => Value::Int(n),
                None => Value::from(json.clone()),
            }
        }
        (Schema::Primitive(Primitive::Long), JsonValue::Number(n)) => match n.as_i64() {
            Some(n) => Value::Long(n),
            None => Value::from(json.clone()),
        },
        (Schema::Primitive(Primitive::Float), JsonValue::Number(n)) => {
            match n.as_f64().map(|n| n as f32).filter(|n| n.is_finite()) {
                Some(n) => Value::Float(n),
                None => Value::from(json.clone()),
            }
        }
        (Schema::Primitive(Primitive::Double), JsonValue::Number(n)) => match n.as_f64() {
            Some(n) => Value::Double(n),
            None => Value::from(json.clone()),
        },
        (Schema::Primitive(Primitive::Bytes), JsonValue::String(s))
        | (Schema::Fixed(_), JsonValue::String(s)) => match bytes_from_json(s) {
            Some(bytes) => Value::Bytes(Some(bytes)),
            None => Value::String(s.clone()),
        },
        (Schema::Array(array), JsonValue::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| default_value(item, &array.items))
                .collect(),
        ),
        (Schema::Map(map), JsonValue::Object(obj)) => Value::map(
            obj.iter()
                .map(|(key, value)| (key.clone(), default_value(value, &map.values))),
        ),
        (Schema::Record(record), JsonValue::Object(obj)) => {
            Value::map(obj.iter().map(|(key, value)| {
                let value = match record.field(key) {
                    Some(field) => default_value(value, &field.type_),
                    None => Value::from(value.clone()),
                };
                (key.clone(), value)
            }))
        }
        (Schema::Union(union), _) => union
            .members
            .iter()
            .map(|member| (member, default_value(json, member)))
            .find(|(member, value)| member.conform(value).is_ok())
            .map(|(_, value)| value)
            .unwrap_or_else(|| Value::from(json.clone())),
        _ => Value::from(json.clone()),
    }
}

/// The value a parser would read back after `value` is written out as the
/// default of a field of type `schema`. Values that do not conform, or that
/// have no JSON form, are returned unchanged.
pub(crate) fn canonical_default(value: Value, schema: &Schema) -> Value {
    let representable = value.has_json_form()
        && schema.self_validate().is_ok()
        && schema.conform(&value).is_ok();
    if !representable {
        return value;
    }

    let canonical = default_value(&value.to_json(), schema);
    if schema.conform(&canonical).is_ok() {
        canonical
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_json(json: JsonValue) -> Result<Schema, ParseError> {
        Schema::from_json(&json)
    }

    #[test]
    fn bare_strings() {
        assert_eq!(Schema::INT, parse(br#""int""#).unwrap());
        assert_eq!(Schema::STRING, parse(br#""string""#).unwrap());

        for primitive in Primitive::ALL.iter() {
            let spec = format!("\"{}\"", primitive.name());
            assert_eq!(Schema::Primitive(*primitive), parse_str(&spec).unwrap());
        }

        assert!(matches!(
            parse(br#""""#),
            Err(ParseError::UnsupportedType(ref s)) if s.is_empty()
        ));
        assert!(matches!(
            parse(br#""com.example.User""#),
            Err(ParseError::UnsupportedType(_))
        ));
    }

    #[test]
    fn malformed_documents() {
        assert!(matches!(parse(b""), Err(ParseError::Json(_))));
        assert!(matches!(parse(b"["), Err(ParseError::Json(_))));
        assert!(matches!(parse(b"42"), Err(ParseError::InvalidShape("number"))));
        assert!(matches!(parse(b"null"), Err(ParseError::InvalidShape("null"))));
    }

    #[test]
    fn type_attribute() {
        assert!(matches!(
            parse_json(json!({ "name": "Test" })),
            Err(ParseError::MissingRequiredAttribute("type"))
        ));
        assert!(matches!(
            parse_json(json!({ "type": "" })),
            Err(ParseError::MissingRequiredAttribute("type"))
        ));
        assert!(matches!(
            parse_json(json!({ "type": 5 })),
            Err(ParseError::InvalidAttributeType {
                attribute: "type",
                expected: "string",
                actual: "number",
            })
        ));
        assert!(matches!(
            parse_json(json!({ "type": "unsupported" })),
            Err(ParseError::InvalidValue { field: "type", ref actual }) if actual == "unsupported"
        ));
    }

    #[test]
    fn primitive_objects() {
        assert_eq!(Schema::LONG, parse_json(json!({ "type": "long" })).unwrap());
        assert_eq!(
            Schema::INT,
            parse_json(json!({ "type": "int", "logicalType": "date" })).unwrap()
        );
    }

    #[test]
    fn arrays_and_maps() {
        assert_eq!(
            Schema::from(Array::new(Schema::STRING)),
            parse_json(json!({ "type": "array", "items": "string" })).unwrap()
        );
        assert_eq!(
            Schema::from(Map::new(Schema::from(Array::new(Schema::INT)))),
            parse_json(json!({
                "type": "map",
                "values": { "type": "array", "items": "int" },
            }))
            .unwrap()
        );

        assert!(matches!(
            parse_json(json!({ "type": "array" })),
            Err(ParseError::MissingRequiredAttribute("items"))
        ));

        let error = parse_json(json!({ "type": "map", "values": "nope" })).unwrap_err();
        assert!(matches!(error, ParseError::Nested { ref path, .. } if path == "map.values"));
        assert!(matches!(error.root(), ParseError::UnsupportedType(_)));
    }

    #[test]
    fn enums() {
        assert_eq!(
            Schema::from(Enum::new("Test", vec!["a", "b"]).with_doc("letters")),
            parse_json(json!({
                "type": "enum",
                "name": "Test",
                "doc": "letters",
                "symbols": ["a", "b"],
            }))
            .unwrap()
        );

        assert!(matches!(
            parse_json(json!({ "type": "enum", "name": "Test" })),
            Err(ParseError::MissingRequiredAttribute("symbols"))
        ));
        assert!(matches!(
            parse_json(json!({ "type": "enum", "name": "Test", "symbols": ["a", 1] })),
            Err(ParseError::InvalidAttributeType { attribute: "symbols", .. })
        ));
        assert!(matches!(
            parse_json(json!({ "type": "enum", "name": "Test", "symbols": ["a", "a"] })),
            Err(ParseError::Invalid { kind: "enum", .. })
        ));
    }

    #[test]
    fn fixeds() {
        assert_eq!(
            Schema::from(Fixed::new(
                NamedAttributes::new("Md5")
                    .with_namespace("org.example")
                    .with_aliases(vec!["Hash"]),
                16
            )),
            parse_json(json!({
                "type": "fixed",
                "name": "Md5",
                "namespace": "org.example",
                "aliases": ["Hash"],
                "size": 16,
            }))
            .unwrap()
        );

        assert!(matches!(
            parse_json(json!({ "type": "fixed", "name": "F", "size": "16" })),
            Err(ParseError::InvalidAttributeType { attribute: "size", .. })
        ));
        assert!(matches!(
            parse_json(json!({ "type": "fixed", "name": "F", "size": -1 })),
            Err(ParseError::InvalidValue { field: "size", .. })
        ));
        assert!(matches!(
            parse_json(json!({ "type": "fixed", "name": "F", "size": 0 })),
            Err(ParseError::Invalid { kind: "fixed", .. })
        ));
        assert!(matches!(
            parse_json(json!({ "type": "fixed", "size": 2 })),
            Err(ParseError::MissingRequiredAttribute("name"))
        ));
    }

    #[test]
    fn records() {
        let schema = parse_json(json!({
            "type": "record",
            "name": "User",
            "namespace": "com.example",
            "doc": "a user",
            "fields": [
                { "name": "id", "type": "long", "order": "descending" },
                { "name": "email", "type": ["null", "string"], "default": null },
                { "name": "score", "type": "float", "default": 1.5, "aliases": ["points"] },
            ],
        }))
        .unwrap();

        let expected = Record::new(
            NamedAttributes::new("User").with_namespace("com.example"),
            vec![
                Field::new("id", Schema::LONG).with_order(Order::Descending),
                Field::new(
                    "email",
                    Union::new(vec![Schema::NULL, Schema::STRING]).into(),
                )
                .with_default(Value::Null),
                Field::new("score", Schema::FLOAT)
                    .with_default(Value::Float(1.5))
                    .with_aliases(vec!["points"]),
            ],
        )
        .with_doc("a user");

        assert_eq!(Schema::from(expected), schema);
    }

    #[test]
    fn record_defaults_follow_field_type() {
        let schema = parse_json(json!({
            "type": "record",
            "name": "Test",
            "fields": [
                { "name": "raw", "type": "bytes", "default": "\u{00ff}" },
                { "name": "nums", "type": { "type": "array", "items": "double" }, "default": [1, 2.5] },
                { "name": "maybe", "type": ["null", "int"], "default": 3 },
            ],
        }))
        .unwrap();

        let record = match schema {
            Schema::Record(record) => record,
            other => panic!("expected a record, got {:?}", other),
        };

        assert_eq!(Some(Value::Bytes(Some(vec![255]))), record.fields[0].default);
        assert_eq!(
            Some(Value::Array(vec![Value::Double(1.0), Value::Double(2.5)])),
            record.fields[1].default
        );
        assert_eq!(Some(Value::Int(3)), record.fields[2].default);
    }

    #[test]
    fn record_failures() {
        let error = parse_json(json!({
            "type": "record",
            "name": "Test",
            "fields": [{ "name": "X", "type": "int", "default": 0.5 }],
        }))
        .unwrap_err();
        match error {
            ParseError::Invalid { kind, source } => {
                assert_eq!("record", kind);
                assert!(source.child("field #0 (\"X\") default").is_some());
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(matches!(
            parse_json(json!({ "type": "record", "name": "Test" })),
            Err(ParseError::MissingRequiredAttribute("fields"))
        ));
        assert!(matches!(
            parse_json(json!({ "type": "record", "name": "Test", "fields": {} })),
            Err(ParseError::InvalidAttributeType { attribute: "fields", .. })
        ));
        assert!(matches!(
            parse_json(json!({ "type": "record", "name": "Test", "fields": [{ "name": "X" }] })),
            Err(ParseError::MissingRequiredAttribute("type"))
        ));

        let error = parse_json(json!({
            "type": "record",
            "name": "Test",
            "fields": [{ "name": "X", "type": "int" }, { "name": "Y", "type": "Other" }],
        }))
        .unwrap_err();
        assert!(
            matches!(error, ParseError::Nested { ref path, .. } if path == "record.fields[1].type")
        );
    }

    #[test]
    fn unions() {
        assert_eq!(
            Schema::from(Union::new(vec![Schema::STRING, Schema::INT])),
            parse(br#"["string", "int"]"#).unwrap()
        );

        assert!(matches!(
            parse(b"[]"),
            Err(ParseError::Invalid { kind: "union", .. })
        ));
        assert!(matches!(
            parse(br#"["int", "int"]"#),
            Err(ParseError::Invalid { kind: "union", .. })
        ));
        assert!(matches!(
            parse(br#"["int", ["string"]]"#),
            Err(ParseError::Invalid { kind: "union", .. })
        ));

        let error = parse(br#"["int", "__WRONG__"]"#).unwrap_err();
        assert!(matches!(error, ParseError::Nested { ref path, .. } if path == "union[1]"));
    }

    #[test]
    fn max_depth() {
        let spec = br#"{"type": "array", "items": {"type": "array", "items": "int"}}"#;

        assert!(parse_with(spec, &ParseOptions::new().with_max_depth(2)).is_ok());

        let error = parse_with(spec, &ParseOptions::new().with_max_depth(1)).unwrap_err();
        assert!(matches!(error.root(), ParseError::MaxDepthExceeded(1)));

        assert!(parse_with(spec, &ParseOptions::new()).is_ok());
    }
}
