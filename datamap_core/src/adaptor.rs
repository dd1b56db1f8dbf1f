//! Key-casing conversion between attributes (camelCase) and columns (snake_case).

use inflections::Inflect;

use crate::Record;

/// Converts record keys between the attribute and the column convention.
///
/// Only keys are rewritten; values pass through untouched. Implementors provide the
/// per-key conversions and get the record-level ones for free.
pub trait Adaptor: Send + Sync {
    /// Column name -> attribute name.
    fn attribute_key(&self, column: &str) -> String;

    /// Attribute name -> column name.
    fn column_key(&self, attribute: &str) -> String;

    fn attributes(&self, columns: &Record) -> Record {
        columns.map_keys(|k| self.attribute_key(k))
    }

    fn columns(&self, attributes: &Record) -> Record {
        attributes.map_keys(|k| self.column_key(k))
    }
}

/// camelCase attributes, snake_case columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseAdaptor;

impl Adaptor for CaseAdaptor {
    fn attribute_key(&self, column: &str) -> String {
        column.to_camel_case()
    }

    fn column_key(&self, attribute: &str) -> String {
        split_digit_runs(&attribute.to_snake_case())
    }
}

/// Puts `_` between letters and digits (`line2` -> `line_2`), so `address_line_2`
/// survives a trip through `addressLine2`.
fn split_digit_runs(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len() + 2);
    let mut prev: Option<char> = None;
    for c in snake.chars() {
        if let Some(p) = prev {
            let boundary = (p.is_alphabetic() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_alphabetic());
            if boundary {
                out.push('_');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Leaves keys untouched, for tables whose columns already use attribute names.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAdaptor;

impl Adaptor for IdentityAdaptor {
    fn attribute_key(&self, column: &str) -> String {
        column.to_string()
    }

    fn column_key(&self, attribute: &str) -> String {
        attribute.to_string()
    }
}
