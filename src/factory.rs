use crate::validate::ValidationError;
use crate::{Record, Schema, Value};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Constructs the default value for a type.
pub type Factory = fn() -> Value;

/// A caller-owned table from a type name to the constructor of its default
/// value.
///
/// Lookup uses the fullname of a named type, or the kind of any other type.
/// Nothing in the crate holds a table of its own; pass one to
/// [`Record::defaults`] where defaults are wanted.
#[derive(Clone, Debug, Default)]
pub struct Factories {
    table: BTreeMap<String, Factory>,
}

impl Factories {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the `"date"` factory, which produces the Unix epoch.
    pub fn standard() -> Self {
        Self::new().with("date", unix_epoch_date)
    }

    pub fn with(mut self, name: impl Into<String>, factory: Factory) -> Self {
        self.register(name, factory);
        self
    }

    /// Adds or replaces the factory for `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: Factory) {
        self.table.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Factory> {
        self.table.get(name).copied()
    }

    pub fn construct(&self, name: &str) -> Option<Value> {
        self.get(name).map(|factory| factory())
    }

    fn construct_for(&self, schema: &Schema) -> Option<Value> {
        match schema.fullname() {
            Some(fullname) => self.construct(&fullname),
            None => self.construct(schema.kind()),
        }
    }
}

fn unix_epoch_date() -> Value {
    Value::from_date(DateTime::<Utc>::UNIX_EPOCH.date_naive())
}

impl Record {
    /// The default value of each field that has one.
    ///
    /// A declared default wins. Otherwise the factory registered for the
    /// field's type is used, as long as what it produces conforms to the type.
    /// The record must self-validate; if it does not, its defects are returned.
    ///
    /// ```
    /// use avro_schema::{Factories, Field, Record, Schema, Value};
    ///
    /// let record = Record::new("Event", vec![
    ///     Field::new("count", Schema::LONG).with_default(Value::Long(1)),
    ///     Field::new("day", Schema::INT),
    ///     Field::new("note", Schema::STRING),
    /// ]);
    ///
    /// let factories = Factories::new().with("int", || Value::Int(-1));
    /// let defaults = record.defaults(&factories).unwrap();
    ///
    /// assert_eq!(Some(&Value::Long(1)), defaults.get("count"));
    /// assert_eq!(Some(&Value::Int(-1)), defaults.get("day"));
    /// assert_eq!(None, defaults.get("note"));
    /// ```
    pub fn defaults(
        &self,
        factories: &Factories,
    ) -> Result<BTreeMap<String, Value>, ValidationError> {
        self.self_validate()?;

        let mut defaults = BTreeMap::new();

        for field in &self.fields {
            if defaults.contains_key(&field.name) {
                continue;
            }

            let default = match &field.default {
                Some(default) => Some(default.clone()),
                None => factories
                    .construct_for(&field.type_)
                    .filter(|value| field.type_.conform(value).is_ok()),
            };

            if let Some(default) = default {
                defaults.insert(field.name.clone(), default);
            }
        }

        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, Fixed};

    #[test]
    fn standard_table() {
        let factories = Factories::standard();
        assert_eq!(Some(Value::Int(0)), factories.construct("date"));
        assert_eq!(None, factories.construct("time"));
        assert_eq!(None, Factories::new().construct("date"));
    }

    #[test]
    fn register_replaces() {
        let mut factories = Factories::standard();
        factories.register("date", || Value::Int(7));
        assert_eq!(Some(Value::Int(7)), factories.construct("date"));
    }

    #[test]
    fn defaults_by_fullname() {
        let record = Record::new(
            "Test",
            vec![
                Field::new("when", Schema::from(Fixed::new("date", 4))),
                Field::new("id", Schema::from(Fixed::new("Id", 2))),
            ],
        );

        let factories = Factories::new()
            .with("date", || Value::Bytes(Some(vec![0; 4])))
            .with("Id", || Value::Bytes(Some(vec![0; 3])));
        let defaults = record.defaults(&factories).unwrap();

        assert_eq!(Some(&Value::Bytes(Some(vec![0; 4]))), defaults.get("when"));
        // the produced value is the wrong size for the fixed
        assert_eq!(None, defaults.get("id"));
    }

    #[test]
    fn declared_default_wins() {
        let record = Record::new(
            "Test",
            vec![Field::new("day", Schema::INT).with_default(Value::Int(3))],
        );

        let factories = Factories::new().with("int", || Value::Int(9));
        assert_eq!(
            Some(&Value::Int(3)),
            record.defaults(&factories).unwrap().get("day")
        );
    }

    #[test]
    fn invalid_records_have_no_defaults() {
        let record = Record::new(
            "Test",
            vec![
                Field::new("size", Schema::from(Fixed::new("Empty", 0))),
                Field::new("day", Schema::INT),
            ],
        );

        let factories = Factories::new().with("int", || Value::Int(9));
        let error = record.defaults(&factories).unwrap_err();
        assert!(error.child("field #0 (\"size\") type").is_some());
    }
}
