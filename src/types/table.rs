//! Table schema and attribute definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{timestamp, Value};
use crate::error::{QuartzError, Result};

/// Families of declared SQL types, matched on the type-name prefix.
///
/// Type names are free-form text (`INT`, `VARCHAR(255)`, `TIMESTAMP WITH
/// TIME ZONE`, ...); the family decides coercion and comparison. Unknown
/// names fall back to text, which never coerces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeFamily {
    Integer,
    Text,
    Boolean,
    Timestamp,
}

impl TypeFamily {
    pub fn of(type_name: &str) -> Self {
        let t = type_name.to_lowercase();

        // MySQL idiom: tinyint(1) is a boolean, wider tinyints are integers.
        if t.starts_with("bool") || t == "tinyint(1)" {
            return TypeFamily::Boolean;
        }
        if t.starts_with("int")
            || t.starts_with("bigint")
            || t.starts_with("bigserial")
            || t.starts_with("serial")
            || t.starts_with("smallint")
            || t.starts_with("tinyint")
        {
            return TypeFamily::Integer;
        }
        if t.starts_with("date") || t.starts_with("timestamp") {
            return TypeFamily::Timestamp;
        }

        TypeFamily::Text
    }
}

/// A deferred or literal value attached to an attribute as DEFAULT or
/// ON UPDATE action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueAction {
    /// Literal recorded at CREATE time.
    Literal(Value),

    /// Materialize the current wall-clock time at execution time
    /// (NOW(), LOCALTIMESTAMP, CURRENT_TIMESTAMP).
    CurrentTimestamp,
}

impl ValueAction {
    pub fn materialize(&self) -> Value {
        match self {
            ValueAction::Literal(v) => v.clone(),
            ValueAction::CurrentTimestamp => Value::Timestamp(timestamp::now()),
        }
    }
}

/// Attribute (aka field, column) is a named column of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Declared type name, kept verbatim (case preserved) for reporting.
    pub type_name: String,
    /// Resolved family of `type_name`.
    pub family: TypeFamily,
    pub default_value: Option<ValueAction>,
    pub on_update_value: Option<ValueAction>,
    pub auto_increment: bool,
    pub unique: bool,
    pub nullable: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let family = TypeFamily::of(&type_name);
        Self {
            name: name.into(),
            type_name,
            family,
            default_value: None,
            on_update_value: None,
            auto_increment: false,
            unique: false,
            nullable: true,
        }
    }
}

/// Table schema: an ordered list of attributes defining the positional
/// mapping of rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub attributes: Vec<Attribute>,
    #[serde(skip)]
    column_map: HashMap<String, usize>,
}

impl Table {
    /// Build a table schema, rejecting duplicate attribute names.
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Result<Self> {
        let name = name.into();
        let mut column_map = HashMap::with_capacity(attributes.len());
        for (pos, attr) in attributes.iter().enumerate() {
            if column_map.insert(attr.name.clone(), pos).is_some() {
                return Err(QuartzError::Schema(format!(
                    "duplicate attribute {} in table {}",
                    attr.name, name
                )));
            }
        }
        Ok(Self {
            name,
            attributes,
            column_map,
        })
    }

    /// Position and definition of an attribute, looked up case-sensitively.
    pub fn attribute(&self, name: &str) -> Option<(usize, &Attribute)> {
        self.column_map
            .get(name)
            .map(|&pos| (pos, &self.attributes[pos]))
    }

    /// First declared auto-increment attribute, the one backing the sequence.
    pub fn auto_increment_attribute(&self) -> Option<(usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.auto_increment)
    }
}
