//! Catalog of relations and statement dispatch
//!
//! The engine owns a process-wide mapping from relation name to `Relation`.
//! Relations are the locking unit: every executor takes the row lock of each
//! table it touches and holds it for the whole statement.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{QuartzError, Result};
use crate::protocol::EngineConn;
use crate::sql::ast::Statement;
use crate::sql::executor::Executor;
use crate::types::{Row, Table, Value};

/// A table together with its row storage, lock, and sequence.
pub struct Relation {
    pub table: Table,
    pub rows: RwLock<Vec<Row>>,
    sequence: AtomicI64,
}

impl Relation {
    pub fn new(table: Table, sequence_start: i64) -> Self {
        Self {
            table,
            rows: RwLock::new(Vec::new()),
            sequence: AtomicI64::new(sequence_start),
        }
    }

    /// Next auto-increment value. The counter increments before use, so the
    /// first value handed out is `sequence_start + 1`.
    pub fn next_sequence(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Test hook. TRUNCATE intentionally preserves the sequence; nothing in
    /// the engine calls this.
    pub fn reset_sequence(&self, to: i64) {
        self.sequence.store(to, Ordering::SeqCst);
    }
}

/// The engine: catalog plus statement dispatch.
pub struct Engine {
    catalog: DashMap<String, Arc<Relation>>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            catalog: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a new relation. Returns false when the table already exists
    /// and `if_not_exists` made that acceptable.
    pub fn create_table(&self, table: Table, if_not_exists: bool) -> Result<bool> {
        match self.catalog.entry(table.name.clone()) {
            Entry::Occupied(_) => {
                if if_not_exists {
                    Ok(false)
                } else {
                    Err(QuartzError::Schema(format!(
                        "table {} already exists",
                        table.name
                    )))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Relation::new(table, self.config.sequence_start)));
                Ok(true)
            }
        }
    }

    /// Remove a relation. Returns false when the table was absent and
    /// `if_exists` made that acceptable.
    pub fn drop_table(&self, name: &str, if_exists: bool) -> Result<bool> {
        match self.catalog.remove(name) {
            Some(_) => Ok(true),
            None if if_exists => Ok(false),
            None => Err(QuartzError::Schema(format!("table {name} does not exist"))),
        }
    }

    /// Clear a relation's rows, preserving schema and sequence. Returns the
    /// number of rows removed.
    pub fn truncate(&self, name: &str) -> Result<i64> {
        let relation = self.relation(name)?;
        let mut rows = relation.rows.write();
        let removed = rows.len() as i64;
        rows.clear();
        Ok(removed)
    }

    /// Handle to a relation; callers take its row lock for any access.
    pub fn relation(&self, name: &str) -> Result<Arc<Relation>> {
        self.catalog
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| QuartzError::Schema(format!("table {name} does not exist")))
    }

    /// Execute one parsed statement against this catalog, streaming results
    /// to the connection. Errors are surfaced on the connection's error path
    /// and returned.
    pub fn execute(
        &self,
        statement: &Statement,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        if self.config.log_statements {
            debug!(?statement, "executing statement");
        }

        let outcome = Executor::new(self).execute(statement, params, conn);
        if let Err(err) = &outcome {
            // Best effort; the connection may already be gone.
            let _ = conn.write_error(err.kind(), &err.to_string());
        }
        outcome
    }

    /// Lex, parse, and execute a statement string. Multiple semicolon
    /// separated statements run in order; bind parameters apply to the
    /// whole batch positionally.
    pub fn execute_sql(
        &self,
        input: &str,
        params: &[Value],
        conn: &mut dyn EngineConn,
    ) -> Result<()> {
        let statements = match crate::sql::parse(input) {
            Ok(statements) => statements,
            Err(err) => {
                let _ = conn.write_error(err.kind(), &err.to_string());
                return Err(err);
            }
        };

        for statement in &statements {
            self.execute(statement, params, conn)?;
        }
        Ok(())
    }
}
