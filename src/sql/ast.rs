//! Tagged statement tree produced by the parser
//!
//! Each statement variant carries typed fields; conditions stay a flat list
//! of comparisons joined by AND/OR, which is all the executor evaluates.

use crate::types::{Value, ValueAction};

/// One parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStmt),
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Truncate(TruncateStmt),
    DropTable(DropTableStmt),
    /// GRANT parses to a trivial statement and executes as a no-op.
    Grant,
}

/// Attribute reference: `[table.]name`, where name may be `*`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrRef {
    pub table: Option<String>,
    pub name: String,
}

impl AttrRef {
    pub fn is_star(&self) -> bool {
        self.name == "*"
    }
}

impl std::fmt::Display for AttrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

// CREATE TABLE

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub if_not_exists: bool,
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Declared type name including any size suffix and WITH TIME ZONE.
    pub type_name: String,
    pub unique: bool,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default_value: Option<ValueAction>,
    pub on_update_value: Option<ValueAction>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            unique: false,
            nullable: true,
            primary_key: false,
            auto_increment: false,
            default_value: None,
            on_update_value: None,
        }
    }
}

// SELECT

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub projections: Vec<Projection>,
    pub tables: Vec<TableRef>,
    pub joins: Vec<JoinClause>,
    pub conditions: Vec<ConditionItem>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// FOR UPDATE parses but the executor ignores it.
    pub for_update: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `[table.]col` or `[table.]*`, optionally renamed with AS.
    Attribute { attr: AttrRef, alias: Option<String> },
    /// `COUNT(attr)` / `COUNT(*)`.
    Count { attr: AttrRef, alias: Option<String> },
}

/// Table reference in FROM or JOIN: `name [AS alias]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The label attribute references resolve against.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

/// `JOIN table ON left = right`. Outer variants parse but run as inner.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: TableRef,
    pub left: AttrRef,
    pub right: AttrRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// ORDER BY keys with the single trailing direction the grammar allows.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub attrs: Vec<AttrRef>,
    pub direction: Direction,
}

// Conditions

/// Value side of a comparison or assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Bind parameter, zero-based position into the driver's argument list.
    Placeholder(usize),
    /// NOW() / LOCALTIMESTAMP / CURRENT_TIMESTAMP, materialized at
    /// execution time.
    CurrentTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

/// One comparison within a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// `WHERE 1` / `WHERE 1=1`, and the synthesized implicit clause.
    True,
    Binary {
        left: AttrRef,
        op: CompareOp,
        right: Operand,
    },
    In {
        left: AttrRef,
        list: Vec<Operand>,
    },
    IsNull {
        left: AttrRef,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

/// A comparison plus the connector linking it to the next condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionItem {
    pub comparison: Comparison,
    pub connector: Option<Connector>,
}

// INSERT

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    /// Empty when the column list was omitted: values then bind to all
    /// attributes positionally. Empty together with `values` for
    /// `INSERT INTO t DEFAULT VALUES`.
    pub columns: Vec<String>,
    pub values: Vec<InsertValue>,
    pub returning: Option<AttrRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    Operand(Operand),
    /// The DEFAULT keyword in a value position.
    Default,
}

// UPDATE / DELETE / TRUNCATE / DROP

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: String,
    pub assignments: Vec<(String, Operand)>,
    pub conditions: Vec<ConditionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: String,
    pub conditions: Vec<ConditionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateStmt {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStmt {
    pub table: String,
    pub if_exists: bool,
}
