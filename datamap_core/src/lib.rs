#![forbid(unsafe_code)]
//! Core traits and data types for the datamap entity/repository layer.
//! This crate is database-agnostic and should not contain any backend-specific logic.

// Re-export for downstream implementations of `Validator` and `QueryBuilder`.
pub use async_trait::async_trait;

pub mod adaptor;
pub mod obs;
pub mod query;
pub mod record;
pub mod validator;

pub use adaptor::{Adaptor, CaseAdaptor, IdentityAdaptor};
pub use query::{Direction, Operation, Query, QueryBuilder, QueryOutput, COUNT_COLUMN};
pub use record::Record;
pub use validator::{AlwaysValid, Validation, Validator};

/// Name of the integer identifier, both as attribute and as column.
pub const ID_COLUMN: &str = "id";

/// A backend-agnostic representation of a single attribute or column value.
/// Backends convert to and from their driver value types at the persistence boundary.
#[derive(Debug, Clone, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for `Null` and for empty strings.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            Value::I64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Booleans, plus the 0/1 integers SQLite stores them as.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::I64(0) => Some(false),
            Value::I64(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Compile-time configuration of an entity type: which validator and adaptor
/// its entities use, and the table its repositories default to.
///
/// Usually implemented with `#[derive(EntityKind)]` from `datamap_macros`.
pub trait EntityKind: Send + Sync + 'static {
    /// Default table for repositories of this kind.
    const TABLE: &'static str;

    type Validator: Validator;
    type Adaptor: Adaptor;

    fn validator() -> Self::Validator;
    fn adaptor() -> Self::Adaptor;
}

/// Lightweight, backend-agnostic error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No row matched the requested id.
    #[error("Record not found")]
    NotFound,
    /// The query builder returned a result of an unexpected shape.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Opaque backend error from the underlying query builder or driver.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RepoError {
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Backend {
            source: Box::new(e),
        }
    }
    /// Wrap a result-shape error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Mapping {
            source: Box::new(e),
        }
    }
}

/// Convenience alias for results returned by repository methods.
pub type RepoResult<T> = Result<T, RepoError>;
