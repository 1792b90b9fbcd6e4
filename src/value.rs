use crate::validate::ValidationError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A runtime value to check against a [`Schema`][`crate::Schema`].
///
/// Callers translate their own data into this model before validating; the
/// validator never looks at anything else.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// A byte sequence. `None` is an absent sequence, which is distinct from an
    /// empty one.
    Bytes(Option<Vec<u8>>),
    String(String),
    Array(Vec<Value>),
    /// Entries in insertion order. Keys are values so that a mapping keyed by
    /// something other than text can be represented, and rejected.
    Map(Vec<(Value, Value)>),
    /// A structured value whose members are addressed by name.
    Struct(Vec<Member>),
    /// One level of indirection, looked through once during validation.
    Ref(Box<Value>),
}

/// A named member of a [`Value::Struct`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct Member {
    pub name: String,
    /// Overrides `name` when matching the member against record fields.
    pub tag: Option<String>,
    pub value: Value,
}

impl Member {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            tag: None,
            value,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The name used to look the member up among record fields.
    pub fn field_name(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.name)
    }
}

fn unix_epoch() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

impl Value {
    /// A short name for the kind of value, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(Some(_)) => "bytes",
            Value::Bytes(None) => "absent bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Ref(_) => "reference",
        }
    }

    /// Builds a text-keyed [`Value::Map`].
    pub fn map<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (Value::String(key.into()), value))
                .collect(),
        )
    }

    pub fn reference(value: Value) -> Value {
        Value::Ref(Box::new(value))
    }

    /// The Avro `date` logical value: days since the Unix epoch, as an int.
    ///
    /// ```
    /// use avro_schema::Value;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(1970, 1, 11).unwrap();
    /// assert_eq!(Value::Int(10), Value::from_date(date));
    /// assert_eq!(Some(date), Value::Int(10).to_date());
    /// ```
    pub fn from_date(date: NaiveDate) -> Value {
        // NaiveDate spans about 262,000 years either side, well inside i32 days.
        Value::Int(date.signed_duration_since(unix_epoch()).num_days() as i32)
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Int(days) => unix_epoch().checked_add_signed(Duration::days(i64::from(*days))),
            _ => None,
        }
    }

    /// Looks through a single [`Value::Ref`].
    pub(crate) fn deref_once(&self) -> Result<&Value, ValidationError> {
        match self {
            Value::Ref(inner) => match inner.as_ref() {
                Value::Ref(_) => Err(ValidationError::new(
                    "a reference to a reference is not supported",
                )),
                inner => Ok(inner),
            },
            value => Ok(value),
        }
    }

    /// Reports whether [`Value::to_json`] is lossless with respect to floats:
    /// false when a NaN or infinity appears anywhere in the value.
    pub fn has_json_form(&self) -> bool {
        match self {
            Value::Float(n) => n.is_finite(),
            Value::Double(n) => n.is_finite(),
            Value::Array(items) => items.iter().all(Value::has_json_form),
            Value::Map(entries) => entries
                .iter()
                .all(|(key, value)| key.has_json_form() && value.has_json_form()),
            Value::Struct(members) => members.iter().all(|member| member.value.has_json_form()),
            Value::Ref(inner) => inner.has_json_form(),
            _ => true,
        }
    }

    /// The JSON form of the value, as used for defaults in schema documents.
    ///
    /// Bytes become a string with one code point per byte. Non-finite floats
    /// have no JSON form and become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null | Value::Bytes(None) => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Long(n) => JsonValue::from(*n),
            Value::Float(n) => float_json(f64::from(*n)),
            Value::Double(n) => float_json(*n),
            Value::Bytes(Some(bytes)) => {
                JsonValue::String(bytes.iter().map(|b| char::from(*b)).collect())
            }
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key_json(key), value.to_json()))
                    .collect(),
            ),
            Value::Struct(members) => JsonValue::Object(
                members
                    .iter()
                    .map(|member| (member.field_name().to_owned(), member.value.to_json()))
                    .collect(),
            ),
            Value::Ref(inner) => inner.to_json(),
        }
    }
}

fn float_json(n: f64) -> JsonValue {
    serde_json::Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn key_json(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

/// Decodes one code point per byte, the JSON encoding Avro uses for bytes. Text
/// with a code point above U+00FF has no such decoding.
pub(crate) fn bytes_from_json(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(Some(bytes))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(Some(bytes.to_vec()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Converts without a schema to guide it: integers become `Int` when they fit
/// in 32 bits and `Long` otherwise, other numbers become `Double`, and objects
/// become text-keyed maps.
impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(n) => i32::try_from(n).map_or(Value::Long(n), Value::Int),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(obj) => {
                Value::map(obj.into_iter().map(|(key, value)| (key, Value::from(value))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json() {
        assert_eq!(Value::Null, Value::from(json!(null)));
        assert_eq!(Value::Int(5), Value::from(json!(5)));
        assert_eq!(Value::Long(1 << 40), Value::from(json!(1i64 << 40)));
        assert_eq!(Value::Double(0.5), Value::from(json!(0.5)));
        assert_eq!(
            Value::map(vec![("a", Value::Array(vec![Value::Boolean(true)]))]),
            Value::from(json!({ "a": [true] }))
        );
    }

    #[test]
    fn to_json() {
        assert_eq!(json!("\u{0}\u{ff}"), Value::Bytes(Some(vec![0, 255])).to_json());
        assert_eq!(json!(1.5), Value::Float(1.5).to_json());
        assert_eq!(json!(null), Value::Double(f64::NAN).to_json());
        assert_eq!(
            json!({ "X": 1 }),
            Value::Struct(vec![Member::new("x", 1.into()).with_tag("X")]).to_json()
        );
        assert_eq!(json!(3), Value::reference(3.into()).to_json());
    }

    #[test]
    fn json_form() {
        assert!(Value::Double(1.5).has_json_form());
        assert!(!Value::Double(f64::NAN).has_json_form());
        assert!(!Value::Array(vec![Value::Float(f32::INFINITY)]).has_json_form());
        assert!(!Value::Struct(vec![Member::new("x", Value::Double(f64::NEG_INFINITY))])
            .has_json_form());
        assert!(!Value::reference(Value::map(vec![("a", Value::Double(f64::NAN))])).has_json_form());
        assert!(Value::map(vec![("a", Value::Null)]).has_json_form());
    }

    #[test]
    fn bytes_decoding() {
        assert_eq!(Some(vec![0, 255]), bytes_from_json("\u{0}\u{ff}"));
        assert_eq!(None, bytes_from_json("\u{100}"));
    }

    #[test]
    fn dates() {
        assert_eq!(Value::Int(0), Value::from_date(unix_epoch()));

        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert_eq!(Value::Int(-1), Value::from_date(before));
        assert_eq!(None, Value::Long(0).to_date());
    }

    #[test]
    fn member_names() {
        assert_eq!("a", Member::new("a", Value::Null).field_name());
        assert_eq!("b", Member::new("a", Value::Null).with_tag("b").field_name());
    }
}
