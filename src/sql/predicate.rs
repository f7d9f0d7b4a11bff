//! Predicate evaluation over rows bound to their tables
//!
//! Conditions are a flat list of comparisons joined by AND/OR. AND binds
//! tighter than OR: the list splits into OR-groups and a row matches when
//! any group is fully satisfied. AND short-circuits false, OR true.

use super::ast::{AttrRef, CompareOp, Comparison, ConditionItem, Connector, Operand};
use crate::error::{QuartzError, Result};
use crate::types::{timestamp, Attribute, Table, Value};

/// One table contributing cells to a combined row.
pub struct Source<'a> {
    /// Alias if the table reference carried one, otherwise the table name.
    pub label: String,
    pub table: &'a Table,
    /// Index of this table's first cell within the combined row.
    pub offset: usize,
}

/// The ordered set of tables a row is bound to.
pub struct RowSources<'a> {
    pub sources: Vec<Source<'a>>,
}

impl<'a> RowSources<'a> {
    pub fn new(sources: Vec<Source<'a>>) -> Self {
        Self { sources }
    }

    /// Resolve `table.col` against the labeled source, or a bare `col`
    /// uniquely across all sources.
    pub fn resolve(&self, attr: &AttrRef) -> Result<(usize, &'a Attribute)> {
        match &attr.table {
            Some(table) => {
                let source = self
                    .sources
                    .iter()
                    .find(|s| s.label == *table)
                    .ok_or_else(|| {
                        QuartzError::Schema(format!("unknown table {table} in {attr}"))
                    })?;
                let (pos, a) = source.table.attribute(&attr.name).ok_or_else(|| {
                    QuartzError::Schema(format!("unknown attribute {attr}"))
                })?;
                Ok((source.offset + pos, a))
            }
            None => {
                let mut found = None;
                for source in &self.sources {
                    if let Some((pos, a)) = source.table.attribute(&attr.name) {
                        if found.is_some() {
                            return Err(QuartzError::Schema(format!(
                                "ambiguous attribute {}",
                                attr.name
                            )));
                        }
                        found = Some((source.offset + pos, a));
                    }
                }
                found.ok_or_else(|| {
                    QuartzError::Schema(format!("unknown attribute {}", attr.name))
                })
            }
        }
    }
}

/// Materialize the value side of a comparison or assignment.
pub fn resolve_operand(operand: &Operand, params: &[Value]) -> Result<Value> {
    match operand {
        Operand::Literal(v) => Ok(v.clone()),
        Operand::Placeholder(i) => params.get(*i).cloned().ok_or_else(|| {
            QuartzError::Type(format!("missing bind parameter ${}", i + 1))
        }),
        Operand::CurrentTimestamp => Ok(Value::Timestamp(timestamp::now())),
    }
}

/// Evaluate a full condition list against one combined row.
pub fn evaluate_conditions(
    items: &[ConditionItem],
    row: &[Value],
    sources: &RowSources<'_>,
    params: &[Value],
) -> Result<bool> {
    let mut group = true;

    for item in items {
        if group {
            group = evaluate_comparison(&item.comparison, row, sources, params)?;
        }

        if item.connector == Some(Connector::Or) {
            if group {
                return Ok(true);
            }
            group = true;
        }
    }

    Ok(group)
}

fn evaluate_comparison(
    comparison: &Comparison,
    row: &[Value],
    sources: &RowSources<'_>,
    params: &[Value],
) -> Result<bool> {
    match comparison {
        Comparison::True => Ok(true),

        Comparison::Binary { left, op, right } => {
            let (index, attr) = sources.resolve(left)?;
            let cell = &row[index];
            let rhs = resolve_operand(right, params)?;
            // NULL never compares with a non-IS operator.
            if cell.is_null() || rhs.is_null() {
                return Ok(false);
            }
            let rhs = rhs.coerce_to(attr.family)?;
            Ok(compare(*op, cell, &rhs))
        }

        Comparison::In { left, list } => {
            let (index, attr) = sources.resolve(left)?;
            let cell = &row[index];
            if cell.is_null() {
                return Ok(false);
            }
            for operand in list {
                let candidate = resolve_operand(operand, params)?;
                if candidate.is_null() {
                    continue;
                }
                if candidate.coerce_to(attr.family)? == *cell {
                    return Ok(true);
                }
            }
            Ok(false)
        }

        Comparison::IsNull { left, negated } => {
            let (index, _) = sources.resolve(left)?;
            Ok(row[index].is_null() != *negated)
        }
    }
}

fn compare(op: CompareOp, cell: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering;

    match cell.partial_cmp(rhs) {
        Some(ord) => match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attribute, Table};

    fn account() -> Table {
        Table::new(
            "account",
            vec![
                Attribute::new("id", "INT"),
                Attribute::new("email", "TEXT"),
                Attribute::new("age", "INT"),
            ],
        )
        .unwrap()
    }

    fn sources(table: &Table) -> RowSources<'_> {
        RowSources::new(vec![Source {
            label: table.name.clone(),
            table,
            offset: 0,
        }])
    }

    fn row() -> Vec<Value> {
        vec![
            Value::Integer(2),
            Value::Text("roger@gmail.com".into()),
            Value::Null,
        ]
    }

    fn attr(name: &str) -> AttrRef {
        AttrRef {
            table: None,
            name: name.into(),
        }
    }

    fn binary(name: &str, op: CompareOp, value: Value) -> ConditionItem {
        ConditionItem {
            comparison: Comparison::Binary {
                left: attr(name),
                op,
                right: Operand::Literal(value),
            },
            connector: None,
        }
    }

    #[test]
    fn test_equality_with_text_coercion() {
        let table = account();
        let s = sources(&table);
        // The literal arrives as text and coerces against the INT family.
        let items = vec![binary("id", CompareOp::Eq, Value::Text("2".into()))];
        assert!(evaluate_conditions(&items, &row(), &s, &[]).unwrap());
    }

    #[test]
    fn test_null_collapses_to_false() {
        let table = account();
        let s = sources(&table);
        let items = vec![binary("age", CompareOp::Eq, Value::Integer(0))];
        assert!(!evaluate_conditions(&items, &row(), &s, &[]).unwrap());
        let items = vec![binary("id", CompareOp::Eq, Value::Null)];
        assert!(!evaluate_conditions(&items, &row(), &s, &[]).unwrap());
    }

    #[test]
    fn test_is_null_and_is_not_null() {
        let table = account();
        let s = sources(&table);
        let is_null = |name: &str, negated| ConditionItem {
            comparison: Comparison::IsNull {
                left: attr(name),
                negated,
            },
            connector: None,
        };
        assert!(evaluate_conditions(&[is_null("age", false)], &row(), &s, &[]).unwrap());
        assert!(!evaluate_conditions(&[is_null("age", true)], &row(), &s, &[]).unwrap());
        assert!(evaluate_conditions(&[is_null("id", true)], &row(), &s, &[]).unwrap());
    }

    #[test]
    fn test_in_list() {
        let table = account();
        let s = sources(&table);
        let items = vec![ConditionItem {
            comparison: Comparison::In {
                left: attr("id"),
                list: vec![
                    Operand::Literal(Value::Integer(1)),
                    Operand::Literal(Value::Integer(2)),
                ],
            },
            connector: None,
        }];
        assert!(evaluate_conditions(&items, &row(), &s, &[]).unwrap());
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let table = account();
        let s = sources(&table);

        // id = 99 AND id = 2 OR id = 2  => false OR true => true
        let mut first = binary("id", CompareOp::Eq, Value::Integer(99));
        first.connector = Some(Connector::And);
        let mut second = binary("id", CompareOp::Eq, Value::Integer(2));
        second.connector = Some(Connector::Or);
        let third = binary("id", CompareOp::Eq, Value::Integer(2));
        let items = vec![first, second, third];
        assert!(evaluate_conditions(&items, &row(), &s, &[]).unwrap());

        // id = 2 AND id = 99  => false
        let mut first = binary("id", CompareOp::Eq, Value::Integer(2));
        first.connector = Some(Connector::And);
        let second = binary("id", CompareOp::Eq, Value::Integer(99));
        assert!(!evaluate_conditions(&[first, second], &row(), &s, &[]).unwrap());
    }

    #[test]
    fn test_placeholder_substitution() {
        let table = account();
        let s = sources(&table);
        let items = vec![ConditionItem {
            comparison: Comparison::Binary {
                left: attr("id"),
                op: CompareOp::Eq,
                right: Operand::Placeholder(0),
            },
            connector: None,
        }];
        assert!(evaluate_conditions(&items, &row(), &s, &[Value::Integer(2)]).unwrap());
        assert!(evaluate_conditions(&items, &row(), &s, &[]).is_err());
    }

    #[test]
    fn test_ambiguous_bare_attribute() {
        let left = account();
        let mut right = account();
        right.name = "account2".into();
        let s = RowSources::new(vec![
            Source {
                label: "account".into(),
                table: &left,
                offset: 0,
            },
            Source {
                label: "account2".into(),
                table: &right,
                offset: 3,
            },
        ]);
        assert!(matches!(
            s.resolve(&attr("id")),
            Err(QuartzError::Schema(_))
        ));
        let qualified = AttrRef {
            table: Some("account2".into()),
            name: "id".into(),
        };
        assert_eq!(s.resolve(&qualified).unwrap().0, 3);
    }
}
