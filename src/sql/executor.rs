//! Statement executors - run tagged statements against the catalog
//!
//! One executor per verb. Executors validate against the schema, take the
//! row locks of every relation they touch (in lexicographic table-name
//! order when there is more than one), and stream results or completion
//! status to the connection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::ast::*;
use super::predicate::{evaluate_conditions, resolve_operand, RowSources, Source};
use crate::catalog::{Engine, Relation};
use crate::error::{QuartzError, Result};
use crate::protocol::EngineConn;
use crate::types::{timestamp, Attribute, Row, Table, TypeFamily, Value};

pub struct Executor<'a> {
    engine: &'a Engine,
}

impl<'a> Executor<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub fn execute(
        &self,
        statement: &Statement,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        match statement {
            Statement::CreateTable(stmt) => self.execute_create_table(stmt, conn),
            Statement::Select(stmt) => self.execute_select(stmt, params, conn),
            Statement::Insert(stmt) => self.execute_insert(stmt, params, conn),
            Statement::Update(stmt) => self.execute_update(stmt, params, conn),
            Statement::Delete(stmt) => self.execute_delete(stmt, params, conn),
            Statement::Truncate(stmt) => self.execute_truncate(stmt, conn),
            Statement::DropTable(stmt) => self.execute_drop(stmt, conn),
            Statement::Grant => conn.write_result(0, 0),
        }
    }

    // CREATE TABLE

    fn execute_create_table(&self, stmt: &CreateTableStmt, conn: &mut dyn EngineConn) -> Result<()> {
        debug!(table = %stmt.table, "create table");

        let mut attributes = Vec::with_capacity(stmt.columns.len());
        for column in &stmt.columns {
            let mut attr = Attribute::new(column.name.as_str(), column.type_name.as_str());
            attr.unique = column.unique;
            attr.nullable = column.nullable;
            attr.default_value = column.default_value.clone();
            attr.on_update_value = column.on_update_value.clone();
            attr.auto_increment = column.auto_increment
                || column.type_name.to_lowercase().starts_with("bigserial");
            attributes.push(attr);
        }

        let table = Table::new(stmt.table.as_str(), attributes)?;
        let created = self.engine.create_table(table, stmt.if_not_exists)?;
        conn.write_result(0, i64::from(created))
    }

    // INSERT

    fn execute_insert(
        &self,
        stmt: &InsertStmt,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        debug!(table = %stmt.table, "insert");
        let relation = self.engine.relation(&stmt.table)?;
        let table = &relation.table;

        // A missing column list binds values to all attributes positionally.
        let columns: Vec<String> = if stmt.columns.is_empty() && !stmt.values.is_empty() {
            table.attributes.iter().map(|a| a.name.clone()).collect()
        } else {
            stmt.columns.clone()
        };
        if columns.len() != stmt.values.len() {
            return Err(QuartzError::Schema(format!(
                "table {} given {} columns but {} values",
                table.name,
                columns.len(),
                stmt.values.len()
            )));
        }

        let mut provided: HashMap<&str, &InsertValue> = HashMap::with_capacity(columns.len());
        for (column, value) in columns.iter().zip(&stmt.values) {
            if table.attribute(column).is_none() {
                return Err(QuartzError::Schema(format!(
                    "unknown attribute {} in table {}",
                    column, table.name
                )));
            }
            if provided.insert(column.as_str(), value).is_some() {
                return Err(QuartzError::Schema(format!(
                    "attribute {column} named twice"
                )));
            }
        }

        let mut rows = relation.rows.write();

        // Only the first declared auto-increment attribute draws from the
        // sequence; any further ones resolve like ordinary attributes.
        let sequence_index = table.auto_increment_attribute().map(|(index, _)| index);

        let mut row: Row = Vec::with_capacity(table.attributes.len());
        let mut last_insert_id = 0;
        for (index, attr) in table.attributes.iter().enumerate() {
            row.push(self.insert_cell(
                &relation,
                attr,
                sequence_index == Some(index),
                provided.get(attr.name.as_str()).copied(),
                params,
                &mut last_insert_id,
            )?);
        }

        check_unique(table, &rows, &row, usize::MAX)?;
        rows.push(row);

        match &stmt.returning {
            Some(attr) => {
                let inserted = &rows[rows.len() - 1];
                let sources = RowSources::new(vec![Source {
                    label: table.name.clone(),
                    table,
                    offset: 0,
                }]);
                let projected: Vec<(String, usize)> = if attr.is_star() {
                    table
                        .attributes
                        .iter()
                        .enumerate()
                        .map(|(i, a)| (a.name.clone(), i))
                        .collect()
                } else {
                    let (index, a) = sources.resolve(attr)?;
                    vec![(a.name.clone(), index)]
                };

                conn.write_row_header(projected.iter().map(|(n, _)| n.clone()).collect())?;
                conn.write_row(projected.iter().map(|(_, i)| inserted[*i].emit()).collect())?;
                conn.write_rows_end()
            }
            None => conn.write_result(last_insert_id, 1),
        }
    }

    /// Resolve the cell for one attribute: provided value, then default,
    /// then sequence (only for the table's sequence-backing attribute),
    /// then NULL if allowed.
    fn insert_cell(
        &self,
        relation: &Relation,
        attr: &Attribute,
        assigns_sequence: bool,
        provided: Option<&InsertValue>,
        params: &[Value],
        last_insert_id: &mut i64,
    ) -> Result<Value> {
        if let Some(InsertValue::Operand(operand)) = provided {
            let value = resolve_operand(operand, params)?.coerce_to(attr.family)?;
            if !value.is_null() {
                return Ok(value);
            }
            if !attr.nullable {
                return Err(QuartzError::Schema(format!(
                    "attribute {} cannot be null",
                    attr.name
                )));
            }
            return Ok(Value::Null);
        }

        // Value omitted or the DEFAULT keyword.
        if let Some(action) = &attr.default_value {
            return action.materialize().coerce_to(attr.family);
        }
        if assigns_sequence {
            let id = relation.next_sequence();
            *last_insert_id = id;
            return Ok(Value::Integer(id));
        }
        if !attr.nullable {
            return Err(QuartzError::Schema(format!(
                "attribute {} has no default and cannot be null",
                attr.name
            )));
        }
        Ok(Value::Null)
    }

    // SELECT

    fn execute_select(
        &self,
        stmt: &SelectStmt,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        // Table references in written order: FROM list, then joins.
        let mut refs: Vec<&TableRef> = stmt.tables.iter().collect();
        refs.extend(stmt.joins.iter().map(|j| &j.table));

        let relations: Vec<Arc<Relation>> = refs
            .iter()
            .map(|r| self.engine.relation(&r.name))
            .collect::<Result<_>>()?;

        // Locks are taken in lexicographic table-name order so concurrent
        // multi-table statements cannot deadlock.
        let mut lock_order: Vec<Arc<Relation>> = relations.clone();
        lock_order.sort_by(|a, b| a.table.name.cmp(&b.table.name));
        lock_order.dedup_by(|a, b| Arc::ptr_eq(a, b));
        let guards: HashMap<String, _> = lock_order
            .iter()
            .map(|r| (r.table.name.clone(), r.rows.read()))
            .collect();

        let mut source_list = Vec::with_capacity(relations.len());
        let mut width = 0;
        for (table_ref, relation) in refs.iter().zip(&relations) {
            source_list.push(Source {
                label: table_ref.label().to_string(),
                table: &relation.table,
                offset: width,
            });
            width += relation.table.attributes.len();
        }
        let sources = RowSources::new(source_list);

        // Cartesian product over the FROM list.
        let from_count = stmt.tables.len();
        let mut combined: Vec<Row> = vec![Vec::new()];
        for relation in relations.iter().take(from_count) {
            let rows = locked_rows(&guards, &relation.table.name)?;
            let mut next = Vec::with_capacity(combined.len() * rows.len());
            for base in &combined {
                for row in rows.iter() {
                    let mut candidate = base.clone();
                    candidate.extend(row.iter().cloned());
                    next.push(candidate);
                }
            }
            combined = next;
        }

        // Nested-loop joins in written order; ON is an equality between one
        // attribute on each side. Outer join keywords run as inner joins.
        let mut width: usize = relations
            .iter()
            .take(from_count)
            .map(|r| r.table.attributes.len())
            .sum();
        for (join, relation) in stmt.joins.iter().zip(relations.iter().skip(from_count)) {
            width += relation.table.attributes.len();
            let (left_index, left_attr) = sources.resolve(&join.left)?;
            let (right_index, _) = sources.resolve(&join.right)?;
            if left_index >= width || right_index >= width {
                return Err(QuartzError::Schema(format!(
                    "join condition {} = {} references a table joined later",
                    join.left, join.right
                )));
            }

            let join_rows = locked_rows(&guards, &relation.table.name)?;
            let mut next = Vec::new();
            for base in &combined {
                for row in join_rows.iter() {
                    let mut candidate = base.clone();
                    candidate.extend(row.iter().cloned());
                    if join_matches(&candidate, left_index, left_attr, right_index)? {
                        next.push(candidate);
                    }
                }
            }
            combined = next;
        }

        let mut matched = Vec::new();
        for row in combined {
            if evaluate_conditions(&stmt.conditions, &row, &sources, params)? {
                matched.push(row);
            }
        }

        // COUNT degenerates the statement into a single-row count result.
        if let Some((attr, alias)) = stmt.projections.iter().find_map(|p| match p {
            Projection::Count { attr, alias } => Some((attr, alias)),
            _ => None,
        }) {
            if !attr.is_star() {
                sources.resolve(attr)?;
            }
            let name = alias.clone().unwrap_or_else(|| format!("count({attr})"));
            conn.write_row_header(vec![name])?;
            conn.write_row(vec![Some(matched.len().to_string())])?;
            return conn.write_rows_end();
        }

        if let Some(order) = &stmt.order_by {
            let mut keys = Vec::with_capacity(order.attrs.len());
            for attr in &order.attrs {
                keys.push(sources.resolve(attr)?.0);
            }
            matched.sort_by(|a, b| {
                let mut ord = std::cmp::Ordering::Equal;
                for &key in &keys {
                    ord = cmp_cells(&a[key], &b[key]);
                    if ord != std::cmp::Ordering::Equal {
                        break;
                    }
                }
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        let offset = stmt.offset.unwrap_or(0) as usize;
        let emitted: Vec<Row> = match stmt.limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit as usize).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };

        // Output schema: stars expand, AS renames.
        let mut projected: Vec<(String, usize)> = Vec::new();
        for projection in &stmt.projections {
            match projection {
                Projection::Attribute { attr, alias } => {
                    if attr.is_star() {
                        for source in sources.sources.iter().filter(|s| match &attr.table {
                            Some(table) => s.label == *table,
                            None => true,
                        }) {
                            for (i, a) in source.table.attributes.iter().enumerate() {
                                projected.push((a.name.clone(), source.offset + i));
                            }
                        }
                        if let Some(table) = &attr.table {
                            if !sources.sources.iter().any(|s| s.label == *table) {
                                return Err(QuartzError::Schema(format!(
                                    "unknown table {table} in {attr}"
                                )));
                            }
                        }
                    } else {
                        let (index, a) = sources.resolve(attr)?;
                        let name = alias.clone().unwrap_or_else(|| a.name.clone());
                        projected.push((name, index));
                    }
                }
                Projection::Count { .. } => {}
            }
        }

        conn.write_row_header(projected.iter().map(|(name, _)| name.clone()).collect())?;
        for row in &emitted {
            conn.write_row(projected.iter().map(|(_, index)| row[*index].emit()).collect())?;
        }
        conn.write_rows_end()
    }

    // UPDATE

    fn execute_update(
        &self,
        stmt: &UpdateStmt,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        debug!(table = %stmt.table, "update");
        let relation = self.engine.relation(&stmt.table)?;
        let table = &relation.table;

        let mut assignments: Vec<(usize, &Attribute, &Operand)> =
            Vec::with_capacity(stmt.assignments.len());
        for (name, operand) in &stmt.assignments {
            let (index, attr) = table.attribute(name).ok_or_else(|| {
                QuartzError::Schema(format!("unknown attribute {} in table {}", name, table.name))
            })?;
            assignments.push((index, attr, operand));
        }

        let sources = RowSources::new(vec![Source {
            label: table.name.clone(),
            table,
            offset: 0,
        }]);

        let mut rows = relation.rows.write();
        let mut matched = 0;
        for i in 0..rows.len() {
            if !evaluate_conditions(&stmt.conditions, &rows[i], &sources, params)? {
                continue;
            }
            matched += 1;

            for (index, attr, operand) in &assignments {
                let value = resolve_operand(operand, params)?;
                let value = materialize_symbolic(value, attr);
                rows[i][*index] = value.coerce_to(attr.family)?;
            }

            // Every ON UPDATE action fires on a matched row, whether or not
            // SET touched its attribute.
            for (j, attr) in table.attributes.iter().enumerate() {
                if assignments.iter().any(|(index, _, _)| *index == j) {
                    continue;
                }
                if let Some(action) = &attr.on_update_value {
                    rows[i][j] = action.materialize().coerce_to(attr.family)?;
                }
            }

            check_unique(table, &rows, &rows[i], i)?;
        }

        conn.write_result(0, matched)
    }

    // DELETE

    fn execute_delete(
        &self,
        stmt: &DeleteStmt,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        debug!(table = %stmt.table, "delete");
        let relation = self.engine.relation(&stmt.table)?;

        let sources = RowSources::new(vec![Source {
            label: relation.table.name.clone(),
            table: &relation.table,
            offset: 0,
        }]);

        let mut rows = relation.rows.write();

        // Evaluate before mutating so a predicate error leaves the rows
        // untouched; removals preserve survivor order.
        let mut keep = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            keep.push(!evaluate_conditions(&stmt.conditions, row, &sources, params)?);
        }

        let old = std::mem::take(&mut *rows);
        let mut deleted = 0;
        for (row, keep_row) in old.into_iter().zip(keep) {
            if keep_row {
                rows.push(row);
            } else {
                deleted += 1;
            }
        }

        conn.write_result(0, deleted)
    }

    // TRUNCATE / DROP

    fn execute_truncate(&self, stmt: &TruncateStmt, conn: &mut dyn EngineConn) -> Result<()> {
        debug!(table = %stmt.table, "truncate");
        let removed = self.engine.truncate(&stmt.table)?;
        conn.write_result(0, removed)
    }

    fn execute_drop(&self, stmt: &DropTableStmt, conn: &mut dyn EngineConn) -> Result<()> {
        debug!(table = %stmt.table, "drop table");
        let dropped = self.engine.drop_table(&stmt.table, stmt.if_exists)?;
        conn.write_result(0, i64::from(dropped))
    }
}

/// Symbolic current-timestamp strings assigned to a timestamp attribute
/// materialize at execution time.
fn materialize_symbolic(value: Value, attr: &Attribute) -> Value {
    if attr.family == TypeFamily::Timestamp {
        if let Value::Text(s) = &value {
            let s = s.to_lowercase();
            if s == "current_timestamp" || s == "now()" || s == "localtimestamp" {
                return Value::Timestamp(timestamp::now());
            }
        }
    }
    value
}

fn join_matches(row: &[Value], left: usize, left_attr: &Attribute, right: usize) -> Result<bool> {
    if row[left].is_null() || row[right].is_null() {
        return Ok(false);
    }
    Ok(row[right].coerce_to(left_attr.family)? == row[left])
}

/// UNIQUE attributes must not collide with any other row. `skip` excludes
/// the row's own slot on UPDATE.
fn check_unique(table: &Table, rows: &[Row], candidate: &Row, skip: usize) -> Result<()> {
    for (j, attr) in table.attributes.iter().enumerate() {
        if !attr.unique || candidate[j].is_null() {
            continue;
        }
        for (k, row) in rows.iter().enumerate() {
            if k != skip && row[j] == candidate[j] {
                return Err(QuartzError::Constraint(format!(
                    "duplicate value for unique attribute {}",
                    attr.name
                )));
            }
        }
    }
    Ok(())
}

fn cmp_cells(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

fn locked_rows<'g>(
    guards: &'g HashMap<String, parking_lot::RwLockReadGuard<'_, Vec<Row>>>,
    name: &str,
) -> Result<&'g Vec<Row>> {
    guards
        .get(name)
        .map(|guard| &**guard)
        .ok_or_else(|| QuartzError::Schema(format!("table {name} is not locked")))
}
