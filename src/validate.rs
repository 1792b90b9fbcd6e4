use crate::{Array, Enum, Fixed, Map, Primitive, Record, Schema, Union, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

const INDENT: &str = "  ";

/// The key of a child in a [`ValidationError`] tree.
///
/// Array positions use `Index`; field labels, map keys, symbols and union
/// signatures use `Name`. Children are ordered by label, so a report is stable
/// no matter in which order the checks ran.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Index(usize),
    Name(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Index(index) => write!(f, "item at index {}", index),
            Label::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for Label {
    fn from(index: usize) -> Self {
        Label::Index(index)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::Name(name.to_owned())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Label::Name(name)
    }
}

/// A recursive diagnostic: an optional message of its own plus labelled
/// children, each of which may be an aggregate again.
///
/// The same tree describes both an ill-formed schema and a value that does
/// not conform to a schema. Its `Display` output is an indented report of
/// every defect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationError {
    message: Option<String>,
    children: BTreeMap<Label, ValidationError>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            children: BTreeMap::new(),
        }
    }

    pub fn with_child(mut self, label: impl Into<Label>, child: ValidationError) -> Self {
        self.children.insert(label.into(), child);
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn children(&self) -> &BTreeMap<Label, ValidationError> {
        &self.children
    }

    pub fn child(&self, label: impl Into<Label>) -> Option<&ValidationError> {
        self.children.get(&label.into())
    }

    fn write_children(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);

        for (i, (label, child)) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }

            write!(f, "{}{}:", pad, label)?;
            if let Some(message) = &child.message {
                write!(f, " {}", message)?;
            }

            if !child.children.is_empty() {
                f.write_str("\n")?;
                child.write_children(f, depth + 1)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            f.write_str(message)?;
            if !self.children.is_empty() {
                f.write_str("\n")?;
            }
        }

        self.write_children(f, 0)
    }
}

impl std::error::Error for ValidationError {}

/// Gathers child errors so that every defect at one level is reported in a
/// single pass.
#[derive(Default)]
pub(crate) struct Collector {
    children: BTreeMap<Label, ValidationError>,
}

impl Collector {
    /// Records `error` under `label`. The first error recorded for a label wins.
    pub fn push(&mut self, label: impl Into<Label>, error: ValidationError) {
        self.children.entry(label.into()).or_insert(error);
    }

    pub fn check(&mut self, label: impl Into<Label>, result: Result<(), ValidationError>) {
        if let Err(error) = result {
            self.push(label, error);
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.children.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                message: None,
                children: self.children,
            })
        }
    }

    pub fn finish_with(self, message: &str) -> Result<(), ValidationError> {
        self.finish().map_err(|mut error| {
            error.message = Some(message.to_owned());
            error
        })
    }
}

/// The outcome of a failed [`Schema::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidateError {
    /// The schema is not well-formed, so the value was never inspected.
    #[error("validation aborted, {kind} schema is invalid:\n{source}")]
    InvalidSchema {
        kind: &'static str,
        source: ValidationError,
    },

    /// The schema is well-formed and the value does not conform to it.
    #[error(transparent)]
    Nonconforming(#[from] ValidationError),
}

impl ValidateError {
    pub fn is_invalid_schema(&self) -> bool {
        matches!(self, ValidateError::InvalidSchema { .. })
    }

    /// The diagnostic tree, whichever side it describes.
    pub fn tree(&self) -> &ValidationError {
        match self {
            ValidateError::InvalidSchema { source, .. } => source,
            ValidateError::Nonconforming(error) => error,
        }
    }
}

impl Schema {
    /// Checks that `value` conforms to this schema.
    ///
    /// The schema is self-validated first; if it is ill-formed the value is not
    /// looked at and [`ValidateError::InvalidSchema`] is returned. A single
    /// [`Value::Ref`] around the value, or around any nested value, is looked
    /// through. A reference to a reference never conforms.
    ///
    /// ```
    /// use avro_schema::{Array, Schema, Value};
    ///
    /// let schema = Schema::from(Array::new(Schema::INT));
    /// let value = Value::Array(vec![1.into(), "x".into(), 2.into(), "y".into()]);
    ///
    /// let error = schema.validate(&value).unwrap_err();
    /// assert_eq!(2, error.tree().children().len());
    /// assert!(error.tree().child(1usize).is_some());
    /// assert!(error.tree().child(3usize).is_some());
    /// ```
    pub fn validate(&self, value: &Value) -> Result<(), ValidateError> {
        if let Err(source) = self.self_validate() {
            debug!(kind = self.kind(), "validation aborted on invalid schema");
            return Err(ValidateError::InvalidSchema {
                kind: self.kind(),
                source,
            });
        }

        self.conform(value).map_err(ValidateError::Nonconforming)
    }

    /// Conformance without the self-validation guard. Callers must already know
    /// the schema is well-formed, as every parent does after checking itself.
    pub(crate) fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        let value = value.deref_once()?;

        match self {
            Schema::Primitive(primitive) => primitive.conform(value),
            Schema::Array(array) => array.conform(value),
            Schema::Map(map) => map.conform(value),
            Schema::Enum(enum_) => enum_.conform(value),
            Schema::Fixed(fixed) => fixed.conform(value),
            Schema::Record(record) => record.conform(value),
            Schema::Union(union) => union.conform(value),
        }
    }
}

fn wrong_kind(value: &Value, expected: &str) -> ValidationError {
    ValidationError::new(format!(
        "value has kind \"{}\" but must be {}",
        value.kind(),
        expected
    ))
}

impl Primitive {
    fn conform(self, value: &Value) -> Result<(), ValidationError> {
        let accepted = match (self, value) {
            (Primitive::Null, Value::Null) => true,
            (Primitive::Boolean, Value::Boolean(_)) => true,
            (Primitive::Int, Value::Int(_)) => true,
            (Primitive::Int, Value::Long(n)) => {
                if i32::try_from(*n).is_err() {
                    return Err(ValidationError::new(format!(
                        "value {} does not fit in an int",
                        n
                    )));
                }
                true
            }
            (Primitive::Long, Value::Int(_)) | (Primitive::Long, Value::Long(_)) => true,
            (Primitive::Float, Value::Float(_)) => true,
            (Primitive::Double, Value::Double(_)) => true,
            (Primitive::Bytes, Value::Bytes(Some(_))) => true,
            (Primitive::String, Value::String(_)) => true,
            _ => false,
        };

        if accepted {
            Ok(())
        } else {
            Err(wrong_kind(value, self.name()))
        }
    }
}

impl Array {
    fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(wrong_kind(other, "array")),
        };

        let mut errors = Collector::default();
        for (i, item) in items.iter().enumerate() {
            errors.check(i, self.items.conform(item));
        }
        errors.finish()
    }
}

/// Borrows the text keys of a map value, or fails on the first key that is
/// not text.
fn text_keys(entries: &[(Value, Value)]) -> Result<Vec<(&str, &Value)>, ValidationError> {
    entries
        .iter()
        .map(|(key, value)| match key {
            Value::String(key) => Ok((key.as_str(), value)),
            other => Err(ValidationError::new(format!(
                "map key has kind \"{}\" but it must be string",
                other.kind()
            ))),
        })
        .collect()
}

impl Map {
    fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        let entries = match value {
            Value::Map(entries) => text_keys(entries)?,
            other => return Err(wrong_kind(other, "map")),
        };

        let mut errors = Collector::default();
        for (key, value) in entries {
            errors.check(key, self.values.conform(value));
        }
        errors.finish()
    }
}

impl Enum {
    fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        match value {
            Value::String(symbol) if self.symbols.iter().any(|s| s == symbol) => Ok(()),
            Value::String(symbol) => Err(ValidationError::new(format!(
                "symbol \"{}\" not in enum",
                symbol
            ))),
            other => Err(wrong_kind(other, "string")),
        }
    }
}

impl Fixed {
    fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        let len = match value {
            Value::Bytes(Some(bytes)) => bytes.len(),
            Value::String(text) => text.len(),
            Value::Bytes(None) | Value::Null => {
                return Err(ValidationError::new("fixed value cannot be absent"))
            }
            other => return Err(wrong_kind(other, "bytes")),
        };

        if len as u64 != self.size {
            return Err(ValidationError::new(format!(
                "value has length {} but fixed size is {}",
                len, self.size
            )));
        }

        Ok(())
    }
}

impl Record {
    fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        let members: Vec<(&str, &Value)> = match value {
            Value::Map(entries) => text_keys(entries)?,
            Value::Struct(members) => members
                .iter()
                .map(|member| (member.field_name(), &member.value))
                .collect(),
            other => return Err(wrong_kind(other, "map or struct")),
        };

        let mut errors = Collector::default();
        for (name, value) in members {
            match self.field(name) {
                Some(field) => errors.check(name, field.type_.conform(value)),
                None => errors.push(
                    name,
                    ValidationError::new("record does not have a field with this name"),
                ),
            }
        }
        errors.finish()
    }
}

impl Union {
    fn conform(&self, value: &Value) -> Result<(), ValidationError> {
        let mut errors = Collector::default();
        let mut accepted = false;

        for member in &self.members {
            match member.conform(value) {
                Ok(()) => accepted = true,
                Err(error) => errors.push(member.signature(), error),
            }
        }

        if accepted {
            return Ok(());
        }

        errors.finish_with("value does not match any type in the union; here is a breakdown")
    }
}
