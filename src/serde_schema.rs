use crate::validate::ValidationError;
use crate::{Field, Schema};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("cannot serialize an invalid schema:\n{0}")]
    Invalid(#[from] ValidationError),

    #[error("default of field \"{field}\" in record \"{record}\" has no JSON form")]
    NonFiniteDefault { record: String, field: String },

    #[error("marshal schema json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fails on the first field default that holds a NaN or an infinity, which
/// JSON cannot carry.
fn check_defaults(schema: &Schema) -> Result<(), SerializeError> {
    match schema {
        Schema::Primitive(_) | Schema::Enum(_) | Schema::Fixed(_) => Ok(()),
        Schema::Array(array) => check_defaults(&array.items),
        Schema::Map(map) => check_defaults(&map.values),
        Schema::Union(union) => union.members.iter().try_for_each(check_defaults),
        Schema::Record(record) => record.fields.iter().try_for_each(|field| {
            if let Some(default) = &field.default {
                if !default.has_json_form() {
                    return Err(SerializeError::NonFiniteDefault {
                        record: record.named.fullname(),
                        field: field.name.clone(),
                    });
                }
            }
            check_defaults(&field.type_)
        }),
    }
}

/// The JSON shape of a schema, borrowing from the [`Schema`] it describes.
#[derive(Serialize)]
#[serde(untagged)]
enum SerdeSchema<'a> {
    Name(&'static str),
    Union(Vec<SerdeSchema<'a>>),
    Object(Box<SerdeObject<'a>>),
}

#[derive(Serialize, Default)]
struct SerdeObject<'a> {
    #[serde(rename = "type")]
    type_: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    aliases: Option<&'a [String]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    symbols: Option<&'a [String]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<SerdeSchema<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<SerdeSchema<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<SerdeField<'a>>>,
}

#[derive(Serialize)]
struct SerdeField<'a> {
    name: &'a str,

    #[serde(rename = "type")]
    type_: SerdeSchema<'a>,

    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a str>,

    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    aliases: &'a [String],
}

fn non_empty(list: &[String]) -> Option<&[String]> {
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

impl<'a> From<&'a Field> for SerdeField<'a> {
    fn from(field: &'a Field) -> Self {
        SerdeField {
            name: &field.name,
            type_: (&field.type_).into(),
            doc: field.doc.as_deref(),
            default: field.default.as_ref().map(|default| default.to_json()),
            order: field.order.as_ref().map(|order| order.as_str()),
            aliases: &field.aliases,
        }
    }
}

impl<'a> From<&'a Schema> for SerdeSchema<'a> {
    fn from(schema: &'a Schema) -> Self {
        let mut out = SerdeObject {
            type_: schema.kind(),
            ..Default::default()
        };

        if let Some(named) = schema.named() {
            out.name = Some(named.name.as_str());
            out.namespace = named.namespace.as_deref();
            out.aliases = non_empty(&named.aliases);
        }

        match schema {
            Schema::Primitive(primitive) => return SerdeSchema::Name(primitive.name()),
            Schema::Union(union) => {
                return SerdeSchema::Union(union.members.iter().map(Into::into).collect())
            }
            Schema::Array(array) => out.items = Some((&*array.items).into()),
            Schema::Map(map) => out.values = Some((&*map.values).into()),
            Schema::Enum(enum_) => {
                out.doc = enum_.doc.as_deref();
                out.symbols = Some(enum_.symbols.as_slice());
                out.default = enum_.default.as_deref();
            }
            Schema::Fixed(fixed) => out.size = Some(fixed.size),
            Schema::Record(record) => {
                out.doc = record.doc.as_deref();
                out.fields = Some(record.fields.iter().map(Into::into).collect());
            }
        }

        SerdeSchema::Object(Box::new(out))
    }
}

impl Schema {
    fn check_serializable(&self) -> Result<(), SerializeError> {
        self.self_validate()?;
        check_defaults(self)
    }

    /// The JSON declaration of this schema. The schema must be self-valid and
    /// every field default must have a JSON form.
    ///
    /// ```
    /// use avro_schema::{Array, Schema};
    /// use serde_json::json;
    ///
    /// assert_eq!(
    ///     json!({ "type": "array", "items": "int" }),
    ///     Schema::from(Array::new(Schema::INT)).to_json().unwrap()
    /// );
    /// ```
    pub fn to_json(&self) -> Result<JsonValue, SerializeError> {
        self.check_serializable()?;
        Ok(serde_json::to_value(SerdeSchema::from(self))?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, SerializeError> {
        self.check_serializable()?;
        Ok(serde_json::to_vec(&SerdeSchema::from(self))?)
    }

    pub fn to_json_string(&self) -> Result<String, SerializeError> {
        self.check_serializable()?;
        Ok(serde_json::to_string(&SerdeSchema::from(self))?)
    }
}

/// Serializes the JSON declaration, failing where [`Schema::to_json`] would.
impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.check_serializable().map_err(S::Error::custom)?;
        SerdeSchema::from(self).serialize(serializer)
    }
}
