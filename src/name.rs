use crate::validate::{Collector, ValidationError};
use regex::Regex;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Reports whether `name` is a valid Avro identifier: a letter or underscore
/// followed by letters, digits and underscores.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// The identity shared by the named schema kinds: records, enums and fixeds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamedAttributes {
    pub name: String,
    pub namespace: Option<String>,
    pub aliases: Vec<String>,
}

impl NamedAttributes {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
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

    /// The namespace-qualified name. An empty namespace is the same as none.
    ///
    /// ```
    /// use avro_schema::NamedAttributes;
    ///
    /// assert_eq!("User", NamedAttributes::new("User").fullname());
    /// assert_eq!(
    ///     "com.example.User",
    ///     NamedAttributes::new("User").with_namespace("com.example").fullname()
    /// );
    /// ```
    pub fn fullname(&self) -> String {
        match self.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => format!("{}.{}", namespace, self.name),
            _ => self.name.clone(),
        }
    }

    /// Checks the name against the identifier pattern.
    pub fn self_validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("name cannot be empty"));
        }

        if !is_valid_name(&self.name) {
            return Err(ValidationError::new(format!(
                "\"{}\" is an invalid name",
                self.name
            )));
        }

        Ok(())
    }

    pub(crate) fn check_into(&self, errors: &mut Collector) {
        errors.check("name", self.self_validate());
    }
}

impl From<&str> for NamedAttributes {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NamedAttributes {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
