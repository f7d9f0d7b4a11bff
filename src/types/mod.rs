//! Cell values and rows

mod table;
pub mod timestamp;

pub use table::{Attribute, Table, TypeFamily, ValueAction};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{QuartzError, Result};

/// Tagged cell value
///
/// Cells are stored typed rather than as raw text; coercion to the declared
/// attribute family happens once on the way in, and emission re-formats on
/// the way out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL sentinel, distinct from the empty string
    Null,

    /// 64-bit signed integer
    Integer(i64),

    /// Boolean
    Bool(bool),

    /// Text string
    Text(String),

    /// Timestamp with offset
    Timestamp(DateTime<FixedOffset>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce this value to the given declared family.
    ///
    /// NULL passes through untouched. Booleans accept `true`/`false`/`0`/`1`
    /// in any case; timestamps accept every format `timestamp::parse_date`
    /// accepts; the text family takes anything and keeps its emission form.
    pub fn coerce_to(&self, family: TypeFamily) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }

        match family {
            TypeFamily::Integer => match self {
                Value::Integer(n) => Ok(Value::Integer(*n)),
                Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| QuartzError::Type(format!("not an integer: {s}"))),
                other => Err(QuartzError::Type(format!(
                    "cannot coerce {other:?} to integer"
                ))),
            },
            TypeFamily::Boolean => match self {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::Integer(0) => Ok(Value::Bool(false)),
                Value::Integer(1) => Ok(Value::Bool(true)),
                Value::Text(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(QuartzError::Type(format!("not a boolean: {s}"))),
                },
                other => Err(QuartzError::Type(format!(
                    "cannot coerce {other:?} to boolean"
                ))),
            },
            TypeFamily::Timestamp => match self {
                Value::Timestamp(t) => Ok(Value::Timestamp(*t)),
                Value::Text(s) => timestamp::parse_date(s).map(Value::Timestamp),
                other => Err(QuartzError::Type(format!(
                    "cannot coerce {other:?} to timestamp"
                ))),
            },
            TypeFamily::Text => match self {
                Value::Text(s) => Ok(Value::Text(s.clone())),
                other => Ok(Value::Text(other.emit().unwrap_or_default())),
            },
        }
    }

    /// Textual emission form, `None` for NULL.
    pub fn emit(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Timestamp(t) => Some(timestamp::format_long(t)),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// A row contains one cell per table attribute, in attribute order.
pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(
            Value::Text("TRUE".into()).coerce_to(TypeFamily::Boolean).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::Integer(0).coerce_to(TypeFamily::Boolean).unwrap(),
            Value::Bool(false)
        );
        assert!(Value::Text("yes".into()).coerce_to(TypeFamily::Boolean).is_err());
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(
            Value::Text(" 42 ".into()).coerce_to(TypeFamily::Integer).unwrap(),
            Value::Integer(42)
        );
        assert!(Value::Text("forty-two".into()).coerce_to(TypeFamily::Integer).is_err());
    }

    #[test]
    fn test_null_passes_through_coercion() {
        for family in [
            TypeFamily::Integer,
            TypeFamily::Boolean,
            TypeFamily::Timestamp,
            TypeFamily::Text,
        ] {
            assert_eq!(Value::Null.coerce_to(family).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_emission() {
        assert_eq!(Value::Null.emit(), None);
        assert_eq!(Value::Bool(false).emit().unwrap(), "false");
        assert_eq!(Value::Integer(-7).emit().unwrap(), "-7");
        assert_eq!(Value::Text(String::new()).emit().unwrap(), "");
    }
}
