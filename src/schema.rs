use crate::name::{is_valid_name, NamedAttributes};
use crate::parse::canonical_default;
use crate::validate::{Collector, ValidationError};
use crate::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An Avro schema.
///
/// A schema is built once, either by [`parse`][`crate::parse`] or by hand
/// through the variant constructors, and is read-only afterwards. Trees
/// produced by the parser are always self-valid; hand-built trees can be
/// checked with [`Schema::self_validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
    Primitive(Primitive),
    Array(Array),
    Map(Map),
    Enum(Enum),
    Fixed(Fixed),
    Record(Record),
    Union(Union),
}

impl Schema {
    pub const NULL: Schema = Schema::Primitive(Primitive::Null);
    pub const BOOLEAN: Schema = Schema::Primitive(Primitive::Boolean);
    pub const INT: Schema = Schema::Primitive(Primitive::Int);
    pub const LONG: Schema = Schema::Primitive(Primitive::Long);
    pub const FLOAT: Schema = Schema::Primitive(Primitive::Float);
    pub const DOUBLE: Schema = Schema::Primitive(Primitive::Double);
    pub const BYTES: Schema = Schema::Primitive(Primitive::Bytes);
    pub const STRING: Schema = Schema::Primitive(Primitive::String);

    /// The type discriminator: a primitive name, or one of `"array"`, `"map"`,
    /// `"enum"`, `"fixed"`, `"record"` and `"union"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Schema::Primitive(primitive) => primitive.name(),
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Enum(_) => "enum",
            Schema::Fixed(_) => "fixed",
            Schema::Record(_) => "record",
            Schema::Union(_) => "union",
        }
    }

    /// The identity of a named schema, `None` for every other kind.
    pub fn named(&self) -> Option<&NamedAttributes> {
        match self {
            Schema::Enum(Enum { named, .. })
            | Schema::Fixed(Fixed { named, .. })
            | Schema::Record(Record { named, .. }) => Some(named),
            _ => None,
        }
    }

    pub fn fullname(&self) -> Option<String> {
        self.named().map(NamedAttributes::fullname)
    }

    /// The key under which two members of a union count as duplicates:
    /// `"<kind> <fullname>"` for named kinds and the bare kind otherwise.
    ///
    /// ```
    /// use avro_schema::{Fixed, Schema};
    ///
    /// assert_eq!("int", Schema::INT.signature());
    /// assert_eq!("fixed Pair", Schema::from(Fixed::new("Pair", 2)).signature());
    /// ```
    pub fn signature(&self) -> String {
        match self.named() {
            Some(named) => format!("{} {}", self.kind(), named.fullname()),
            None => self.kind().to_owned(),
        }
    }

    /// Checks that this schema, and every schema beneath it, is well-formed.
    ///
    /// Every defect found is reported, each under the label of the attribute,
    /// field, symbol or member it was found in.
    pub fn self_validate(&self) -> Result<(), ValidationError> {
        match self {
            Schema::Primitive(_) => Ok(()),
            Schema::Array(array) => array.self_validate(),
            Schema::Map(map) => map.self_validate(),
            Schema::Enum(enum_) => enum_.self_validate(),
            Schema::Fixed(fixed) => fixed.self_validate(),
            Schema::Record(record) => record.self_validate(),
            Schema::Union(union) => union.self_validate(),
        }
    }
}

impl From<Primitive> for Schema {
    fn from(primitive: Primitive) -> Self {
        Schema::Primitive(primitive)
    }
}

impl From<Array> for Schema {
    fn from(array: Array) -> Self {
        Schema::Array(array)
    }
}

impl From<Map> for Schema {
    fn from(map: Map) -> Self {
        Schema::Map(map)
    }
}

impl From<Enum> for Schema {
    fn from(enum_: Enum) -> Self {
        Schema::Enum(enum_)
    }
}

impl From<Fixed> for Schema {
    fn from(fixed: Fixed) -> Self {
        Schema::Fixed(fixed)
    }
}

impl From<Record> for Schema {
    fn from(record: Record) -> Self {
        Schema::Record(record)
    }
}

impl From<Union> for Schema {
    fn from(union: Union) -> Self {
        Schema::Union(union)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Null,
        Primitive::Boolean,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Bytes,
        Primitive::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }
}

impl FromStr for Primitive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Primitive::ALL
            .iter()
            .copied()
            .find(|primitive| primitive.name() == s)
            .ok_or(())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    pub items: Box<Schema>,
}

impl Array {
    pub fn new(items: Schema) -> Self {
        Self {
            items: Box::new(items),
        }
    }

    pub fn self_validate(&self) -> Result<(), ValidationError> {
        self.items
            .self_validate()
            .map_err(|error| ValidationError::default().with_child("items", error))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Map {
    pub values: Box<Schema>,
}

impl Map {
    pub fn new(values: Schema) -> Self {
        Self {
            values: Box::new(values),
        }
    }

    pub fn self_validate(&self) -> Result<(), ValidationError> {
        self.values
            .self_validate()
            .map_err(|error| ValidationError::default().with_child("values", error))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub named: NamedAttributes,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
    pub default: Option<String>,
}

impl Enum {
    pub fn new<I, S>(named: impl Into<NamedAttributes>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            named: named.into(),
            doc: None,
            symbols: symbols.into_iter().map(Into::into).collect(),
            default: None,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_default(mut self, symbol: impl Into<String>) -> Self {
        self.default = Some(symbol.into());
        self
    }

    pub fn self_validate(&self) -> Result<(), ValidationError> {
        let mut errors = Collector::default();
        self.named.check_into(&mut errors);

        let mut seen = BTreeSet::new();
        for symbol in &self.symbols {
            let label = format!("symbol \"{}\"", symbol);
            if !is_valid_name(symbol) {
                errors.push(label, ValidationError::new("invalid name"));
            } else if !seen.insert(symbol.as_str()) {
                errors.push(label, ValidationError::new("duplicate symbol"));
            }
        }

        if let Some(default) = &self.default {
            if !self.symbols.contains(default) {
                errors.push(
                    "default",
                    ValidationError::new(format!("\"{}\" is not a symbol of the enum", default)),
                );
            }
        }

        errors.finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Fixed {
    pub named: NamedAttributes,
    pub size: u64,
}

impl Fixed {
    pub fn new(named: impl Into<NamedAttributes>, size: u64) -> Self {
        Self {
            named: named.into(),
            size,
        }
    }

    pub fn self_validate(&self) -> Result<(), ValidationError> {
        let mut errors = Collector::default();
        self.named.check_into(&mut errors);

        if self.size == 0 {
            errors.push("size", ValidationError::new("size cannot be zero"));
        }

        errors.finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub named: NamedAttributes,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(named: impl Into<NamedAttributes>, fields: Vec<Field>) -> Self {
        Self {
            named: named.into(),
            doc: None,
            fields,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// The first field called `name`. Aliases are not consulted.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn self_validate(&self) -> Result<(), ValidationError> {
        let mut errors = Collector::default();
        self.named.check_into(&mut errors);

        let mut seen = BTreeSet::new();
        for (i, field) in self.fields.iter().enumerate() {
            let label = format!("field #{} (\"{}\")", i, field.name);

            if !is_valid_name(&field.name) {
                errors.push(label.clone(), ValidationError::new("invalid name"));
            } else if !seen.insert(field.name.as_str()) {
                errors.push(label.clone(), ValidationError::new("duplicate field name"));
            }

            if let Err(error) = field.type_.self_validate() {
                errors.push(format!("{} type", label), error);
                continue;
            }

            if let Some(Order::Other(order)) = &field.order {
                errors.push(
                    format!("{} order", label),
                    ValidationError::new(format!("\"{}\" is not a valid value", order)),
                );
            }

            if let Some(default) = &field.default {
                errors.check(format!("{} default", label), field.type_.conform(default));
            }
        }

        errors.finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub doc: Option<String>,
    pub type_: Schema,
    /// Set directly, the default is kept exactly as given and may not equal
    /// what a parsed copy of the schema holds.
    pub default: Option<Value>,
    pub order: Option<Order>,
    pub aliases: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_: Schema) -> Self {
        Self {
            name: name.into(),
            doc: None,
            type_,
            default: None,
            order: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Sets the default, stored in the form it takes after a trip through the
    /// JSON schema document: an int under a `long` field becomes a long, a
    /// struct under a record becomes a map, references are looked through.
    /// A default that does not conform, or has no JSON form, is kept as given.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(canonical_default(default.into(), &self.type_));
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

/// The sort order of a record field.
///
/// `Other` keeps an order string the Avro grammar does not allow, so that
/// self-validation can report it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
    Ignore,
    Other(String),
}

impl Order {
    pub fn as_str(&self) -> &str {
        match self {
            Order::Ascending => "ascending",
            Order::Descending => "descending",
            Order::Ignore => "ignore",
            Order::Other(order) => order,
        }
    }
}

impl From<&str> for Order {
    fn from(s: &str) -> Self {
        match s {
            "ascending" => Order::Ascending,
            "descending" => Order::Descending,
            "ignore" => Order::Ignore,
            other => Order::Other(other.to_owned()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Union {
    pub members: Vec<Schema>,
}

impl Union {
    pub fn new(members: Vec<Schema>) -> Self {
        Self { members }
    }

    pub fn self_validate(&self) -> Result<(), ValidationError> {
        if self.members.is_empty() {
            return Err(ValidationError::new("union may not be empty"));
        }

        let mut errors = Collector::default();
        let mut signatures = BTreeSet::new();
        for (i, member) in self.members.iter().enumerate() {
            let signature = member.signature();

            if let Schema::Union(_) = member {
                errors.push(i, ValidationError::new("union may not directly contain a union"));
            } else if let Err(error) = member.self_validate() {
                errors.push(i, error);
            } else if signatures.contains(&signature) {
                errors.push(
                    i,
                    ValidationError::new(format!("duplicate \"{}\" in union", signature)),
                );
            }

            signatures.insert(signature);
        }

        errors.finish()
    }
}
