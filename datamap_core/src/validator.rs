//! Pluggable attribute validation.

use async_trait::async_trait;

use crate::Record;

/// One validation pass over an attribute mapping.
///
/// Created per check, filled by a [`Validator`], then consumed. It is valid exactly
/// when no errors were pushed.
#[derive(Debug)]
pub struct Validation<'a> {
    attributes: &'a Record,
    errors: Vec<String>,
}

impl<'a> Validation<'a> {
    pub fn new(attributes: &'a Record) -> Self {
        Self {
            attributes,
            errors: Vec::new(),
        }
    }

    /// Construct a pass over `attributes` and run `validator` on it.
    pub async fn exec<V>(validator: &V, attributes: &'a Record) -> Validation<'a>
    where
        V: Validator + ?Sized,
    {
        let mut validation = Self::new(attributes);
        validator.validate(&mut validation).await;
        validation
    }

    pub fn attributes(&self) -> &'a Record {
        self.attributes
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn push_error(&mut self, message: impl Into<String>) -> &mut Self {
        self.errors.push(message.into());
        self
    }

    /// Push `message` when `key` is missing, null, or an empty string.
    pub fn require(&mut self, key: &str, message: impl Into<String>) -> &mut Self {
        let present = self.attributes.get(key).is_some_and(|v| !v.is_blank());
        if !present {
            self.push_error(message);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

/// Domain rules for an entity's attributes.
///
/// Implementations inspect `validation.attributes()` and push one human-readable
/// error per failed rule.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, validation: &mut Validation<'_>);
}

/// Performs no checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysValid;

#[async_trait]
impl Validator for AlwaysValid {
    async fn validate(&self, _validation: &mut Validation<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record, Value};
    use futures::executor::block_on;

    struct NameRequired;

    #[async_trait]
    impl Validator for NameRequired {
        async fn validate(&self, validation: &mut Validation<'_>) {
            validation.require("name", "Missing name");
        }
    }

    #[test]
    fn always_valid_accepts_anything() {
        let attrs = record! {};
        let v = block_on(Validation::exec(&AlwaysValid, &attrs));
        assert!(v.is_valid());
        assert!(v.errors().is_empty());
    }

    #[test]
    fn custom_validator_collects_errors() {
        let attrs = record! { "isVegan" => true };
        let v = block_on(Validation::exec(&NameRequired, &attrs));
        assert!(!v.is_valid());
        assert_eq!(v.errors(), &["Missing name".to_string()]);
    }

    #[test]
    fn require_treats_null_and_empty_as_missing() {
        let null_name = record! { "name" => Value::Null };
        let empty_name = record! { "name" => "" };
        let named = record! { "name" => "Erdbeere" };
        assert!(!Validation::new(&null_name).require("name", "x").is_valid());
        assert!(!Validation::new(&empty_name).require("name", "x").is_valid());
        assert!(Validation::new(&named).require("name", "x").is_valid());
    }

    #[test]
    fn dyn_validator_can_be_executed() {
        let boxed: Box<dyn Validator> = Box::new(NameRequired);
        let attrs = record! { "name" => "Vanille" };
        let v = block_on(Validation::exec(boxed.as_ref(), &attrs));
        assert!(v.is_valid());
        assert_eq!(v.attributes().get("name"), Some(&Value::from("Vanille")));
    }
}
