//! Attribute bags bound to an [`EntityKind`].

use std::fmt;
use std::marker::PhantomData;

use datamap_core::{Adaptor, EntityKind, Record, Validation, Value, ID_COLUMN};
use serde::{Serialize, Serializer};

/// Outcome of the last validation of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Validity {
    /// `validate()` has not run yet.
    #[default]
    Unvalidated,
    Valid,
    Invalid(Vec<String>),
}

impl Validity {
    fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Validity::Valid
        } else {
            Validity::Invalid(errors)
        }
    }

    /// `None` until validated.
    pub fn is_valid(&self) -> Option<bool> {
        match self {
            Validity::Unvalidated => None,
            Validity::Valid => Some(true),
            Validity::Invalid(_) => Some(false),
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Validity::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

/// One record of kind `K`: camelCase attributes plus its validation state.
///
/// Entities are values; two entities with the same attributes and validity are equal.
pub struct Entity<K: EntityKind> {
    attributes: Record,
    validity: Validity,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityKind> Entity<K> {
    pub fn new(attributes: Record) -> Self {
        Self::with_validity(attributes, Validity::Unvalidated)
    }

    pub fn with_validity(attributes: Record, validity: Validity) -> Self {
        Self {
            attributes,
            validity,
            _kind: PhantomData,
        }
    }

    /// Build from a persisted row, converting column names to attribute names.
    pub fn from_columns(columns: &Record) -> Self {
        Self::new(K::adaptor().attributes(columns))
    }

    /// One unvalidated entity per row, in row order.
    pub fn collection<I>(rows: I) -> Vec<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        rows.into_iter().map(|row| Self::from_columns(&row)).collect()
    }

    pub fn adaptor() -> K::Adaptor {
        K::adaptor()
    }

    pub fn attributes(&self) -> &Record {
        &self.attributes
    }

    pub fn into_attributes(self) -> Record {
        self.attributes
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// The integer `id` attribute, once persisted.
    pub fn id(&self) -> Option<i64> {
        self.get(ID_COLUMN).and_then(Value::as_i64)
    }

    /// Attributes rewritten to column names. A fresh copy on every call.
    pub fn columns(&self) -> Record {
        K::adaptor().columns(&self.attributes)
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn is_valid(&self) -> Option<bool> {
        self.validity.is_valid()
    }

    pub fn errors(&self) -> &[String] {
        self.validity.errors()
    }

    /// Run the kind's validator over the current attributes and store the outcome.
    pub async fn validate(&mut self) -> bool {
        let validator = K::validator();
        let errors = Validation::exec(&validator, &self.attributes)
            .await
            .into_errors();
        self.validity = Validity::from_errors(errors);
        matches!(self.validity, Validity::Valid)
    }
}

impl<K: EntityKind> From<Record> for Entity<K> {
    fn from(attributes: Record) -> Self {
        Self::new(attributes)
    }
}

impl<K: EntityKind> Clone for Entity<K> {
    fn clone(&self) -> Self {
        Self::with_validity(self.attributes.clone(), self.validity.clone())
    }
}

impl<K: EntityKind> PartialEq for Entity<K> {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes && self.validity == other.validity
    }
}

impl<K: EntityKind> fmt::Debug for Entity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("table", &K::TABLE)
            .field("attributes", &self.attributes)
            .field("validity", &self.validity)
            .finish()
    }
}

/// Serializes to the attribute mapping, not the columns.
impl<K: EntityKind> Serialize for Entity<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}
