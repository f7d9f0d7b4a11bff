//! SQL parser - converts the token stream into tagged statements
//!
//! A single cursor over the space-stripped token stream; one sub-parser per
//! statement verb. Every failed expectation reports the three-token window
//! around the cursor.

use super::ast::*;
use super::token::{Token, TokenKind};
use crate::error::{QuartzError, Result};
use crate::types::{Value, ValueAction};

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    placeholder_seq: usize,
}

impl Parser {
    /// Space tokens are stripped up front; the grammar never needs them.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .filter(|t| t.kind != TokenKind::Space)
                .collect(),
            index: 0,
            placeholder_seq: 0,
        }
    }

    /// Parse a list of statements separated by semicolons.
    pub fn parse(mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        while let Some(kind) = self.kind() {
            match kind {
                TokenKind::Semicolon => self.advance(),
                // EXPLAIN is recognized and ignored.
                TokenKind::Explain => self.advance(),
                TokenKind::Create => statements.push(self.parse_create()?),
                TokenKind::Select => statements.push(Statement::Select(self.parse_select()?)),
                TokenKind::Insert => statements.push(Statement::Insert(self.parse_insert()?)),
                TokenKind::Update => statements.push(Statement::Update(self.parse_update()?)),
                TokenKind::Delete => statements.push(Statement::Delete(self.parse_delete()?)),
                TokenKind::Truncate => {
                    statements.push(Statement::Truncate(self.parse_truncate()?))
                }
                TokenKind::Drop => statements.push(Statement::DropTable(self.parse_drop()?)),
                TokenKind::Grant => {
                    while self.kind().is_some() && !self.is(TokenKind::Semicolon) {
                        self.advance();
                    }
                    statements.push(Statement::Grant);
                }
                _ => {
                    return Err(QuartzError::Syntax(format!(
                        "parsing error near <{}>",
                        self.lexeme()
                    )))
                }
            }
        }

        Ok(statements)
    }

    // CREATE

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Create)?;
        if !self.is(TokenKind::Table) {
            return Err(self.syntax_error());
        }
        Ok(Statement::CreateTable(self.parse_create_table()?))
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStmt> {
        self.expect(TokenKind::Table)?;

        let if_not_exists = if self.take(TokenKind::If) {
            self.expect(TokenKind::Not)?;
            self.expect(TokenKind::Exists)?;
            true
        } else {
            false
        };

        let table = self.parse_quoted_name()?;
        self.expect(TokenKind::BracketOpening)?;

        let mut columns = Vec::new();
        loop {
            match self.kind() {
                None => return Err(self.syntax_error()),
                Some(TokenKind::BracketClosing) => {
                    self.advance();
                    break;
                }
                // Table-level constraints parse for acceptance and are
                // discarded; only column definitions carry semantics.
                Some(TokenKind::Constraint) => self.parse_table_constraint()?,
                Some(TokenKind::Primary) => self.parse_primary_key_constraint()?,
                Some(TokenKind::Unique) => {
                    self.advance();
                    self.parse_table_index()?;
                }
                Some(TokenKind::Index) | Some(TokenKind::Key) => self.parse_table_index()?,
                Some(TokenKind::Foreign) => self.parse_table_foreign_key()?,
                _ => columns.push(self.parse_column_def()?),
            }

            self.take(TokenKind::Comma);
        }

        self.parse_table_options()?;

        Ok(CreateTableStmt {
            if_not_exists,
            table,
            columns,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.parse_quoted_name()?;
        let type_name = self.parse_type_name()?;
        let mut column = ColumnDef::new(name, type_name);

        // Column constraints may come in any order.
        while !matches!(
            self.kind(),
            None | Some(TokenKind::BracketClosing) | Some(TokenKind::Comma)
        ) {
            match self.kind() {
                Some(TokenKind::Unique) => {
                    self.advance();
                    column.unique = true;
                }
                Some(TokenKind::Not) => {
                    self.advance();
                    self.expect(TokenKind::Null)?;
                    column.nullable = false;
                }
                Some(TokenKind::Null) => {
                    self.advance();
                    column.nullable = true;
                }
                Some(TokenKind::Primary) => {
                    self.advance();
                    self.expect(TokenKind::Key)?;
                    column.primary_key = true;
                }
                Some(TokenKind::Autoincrement) => {
                    self.advance();
                    column.auto_increment = true;
                }
                Some(TokenKind::With) => {
                    if !column.type_name.to_lowercase().starts_with("timestamp") {
                        return Err(self.syntax_error());
                    }
                    self.advance();
                    self.expect(TokenKind::Time)?;
                    self.expect(TokenKind::Zone)?;
                    column.type_name.push_str(" with time zone");
                }
                Some(TokenKind::Default) => {
                    self.advance();
                    column.default_value = Some(self.parse_value_action()?);
                }
                Some(TokenKind::On) => {
                    self.advance();
                    self.expect(TokenKind::Update)?;
                    column.on_update_value = Some(self.parse_value_action()?);
                }
                _ => return Err(self.syntax_error()),
            }
        }

        Ok(column)
    }

    fn parse_type_name(&mut self) -> Result<String> {
        let base = self.expect(TokenKind::String)?.lexeme;

        // Maybe a sized type, e.g. VARCHAR(255) or TINYINT(1).
        if self.take(TokenKind::BracketOpening) {
            let size = self.expect(TokenKind::Number)?.lexeme;
            self.expect(TokenKind::BracketClosing)?;
            return Ok(format!("{base}({size})"));
        }

        Ok(base)
    }

    /// Value of a DEFAULT or ON UPDATE column constraint.
    fn parse_value_action(&mut self) -> Result<ValueAction> {
        let token = self.take_any(&[
            TokenKind::False,
            TokenKind::True,
            TokenKind::String,
            TokenKind::Number,
            TokenKind::Date,
            TokenKind::Null,
            TokenKind::LocalTimestamp,
            TokenKind::Now,
        ])?;

        Ok(match token.kind {
            TokenKind::LocalTimestamp | TokenKind::Now => ValueAction::CurrentTimestamp,
            TokenKind::False => ValueAction::Literal(Value::Bool(false)),
            TokenKind::True => ValueAction::Literal(Value::Bool(true)),
            TokenKind::Null => ValueAction::Literal(Value::Null),
            TokenKind::Number => ValueAction::Literal(Value::Integer(self.parse_i64(&token)?)),
            _ => ValueAction::Literal(Value::Text(token.lexeme)),
        })
    }

    fn parse_table_constraint(&mut self) -> Result<()> {
        self.expect(TokenKind::Constraint)?;
        // Optional constraint name.
        self.take(TokenKind::String);

        match self.kind() {
            Some(TokenKind::Primary) => self.parse_primary_key_constraint(),
            Some(TokenKind::Unique) => {
                self.advance();
                self.parse_table_index()
            }
            Some(TokenKind::Foreign) => self.parse_table_foreign_key(),
            _ => Err(self.syntax_error()),
        }
    }

    fn parse_primary_key_constraint(&mut self) -> Result<()> {
        self.expect(TokenKind::Primary)?;
        self.expect(TokenKind::Key)?;
        self.parse_name_list()
    }

    /// `{ INDEX | KEY } [name] [USING {BTREE|HASH}] '(' col [ASC|DESC], ... ')'`
    fn parse_table_index(&mut self) -> Result<()> {
        if !self.take(TokenKind::Index) && !self.take(TokenKind::Key) {
            return Err(self.syntax_error());
        }
        self.take(TokenKind::String);

        if self.take(TokenKind::Using) {
            if !self.take(TokenKind::Btree) && !self.take(TokenKind::Hash) {
                return Err(self.syntax_error());
            }
        }

        self.expect(TokenKind::BracketOpening)?;
        loop {
            self.expect(TokenKind::String)?;
            if !self.take(TokenKind::Asc) {
                self.take(TokenKind::Desc);
            }
            if self.take(TokenKind::BracketClosing) {
                break;
            }
            self.expect(TokenKind::Comma)?;
        }
        Ok(())
    }

    fn parse_table_foreign_key(&mut self) -> Result<()> {
        self.expect(TokenKind::Foreign)?;
        self.expect(TokenKind::Key)?;
        self.take(TokenKind::String);
        self.parse_name_list()?;

        if self.take(TokenKind::References) {
            self.expect(TokenKind::String)?;
            self.parse_name_list()?;

            if self.take(TokenKind::Match) {
                if !self.take(TokenKind::Full)
                    && !self.take(TokenKind::Partial)
                    && !self.take(TokenKind::Simple)
                {
                    return Err(self.syntax_error());
                }
            }

            while self.take(TokenKind::On) {
                if !self.take(TokenKind::Update) && !self.take(TokenKind::Delete) {
                    return Err(self.syntax_error());
                }
                self.parse_reference_option()?;
            }
        }

        Ok(())
    }

    fn parse_reference_option(&mut self) -> Result<()> {
        match self.kind() {
            Some(TokenKind::Restrict) | Some(TokenKind::Cascade) => {
                self.advance();
                Ok(())
            }
            Some(TokenKind::Set) => {
                self.advance();
                if !self.take(TokenKind::Null) && !self.take(TokenKind::Default) {
                    return Err(self.syntax_error());
                }
                Ok(())
            }
            Some(TokenKind::No) => {
                self.advance();
                self.expect(TokenKind::Action)?;
                Ok(())
            }
            _ => Err(self.syntax_error()),
        }
    }

    /// `'(' name [, name]* ')'`, names discarded.
    fn parse_name_list(&mut self) -> Result<()> {
        self.expect(TokenKind::BracketOpening)?;
        loop {
            self.parse_quoted_name()?;
            if self.take(TokenKind::BracketClosing) {
                break;
            }
            self.expect(TokenKind::Comma)?;
        }
        Ok(())
    }

    /// Table options: ENGINE[=]v, [DEFAULT] CHARSET[=]v,
    /// [DEFAULT] CHARACTER SET[=]v. Parsed, validated, discarded.
    fn parse_table_options(&mut self) -> Result<()> {
        loop {
            match self.kind() {
                Some(TokenKind::Engine) => {
                    self.advance();
                    self.take(TokenKind::Equality);
                    self.take_any(&[TokenKind::False, TokenKind::String, TokenKind::Number])?;
                }
                Some(TokenKind::Default) => {
                    self.advance();
                    match self.kind() {
                        Some(TokenKind::Charset) => self.parse_charset_value()?,
                        Some(TokenKind::Character) => self.parse_character_set_value()?,
                        _ => return Err(self.syntax_error()),
                    }
                }
                Some(TokenKind::Charset) => self.parse_charset_value()?,
                Some(TokenKind::Character) => self.parse_character_set_value()?,
                // Semicolon ends the instruction; leave it for the caller.
                _ => return Ok(()),
            }
        }
    }

    fn parse_charset_value(&mut self) -> Result<()> {
        self.expect(TokenKind::Charset)?;
        self.take(TokenKind::Equality);
        self.expect(TokenKind::String)?;
        Ok(())
    }

    fn parse_character_set_value(&mut self) -> Result<()> {
        self.expect(TokenKind::Character)?;
        self.expect(TokenKind::Set)?;
        self.take(TokenKind::Equality);
        self.expect(TokenKind::String)?;
        Ok(())
    }

    // SELECT

    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect(TokenKind::Select)?;

        let mut projections = Vec::new();
        loop {
            if self.is(TokenKind::Count) {
                self.advance();
                self.expect(TokenKind::BracketOpening)?;
                let (attr, _) = self.parse_attribute()?;
                self.expect(TokenKind::BracketClosing)?;
                let alias = self.parse_alias()?;
                projections.push(Projection::Count { attr, alias });
            } else {
                let (attr, alias) = self.parse_attribute()?;
                projections.push(Projection::Attribute { attr, alias });
            }

            if !self.take(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::From)?;

        let mut tables = Vec::new();
        loop {
            tables.push(self.parse_table_ref()?);
            if !self.take(TokenKind::Comma) {
                break;
            }
        }

        let mut joins = Vec::new();
        while matches!(
            self.kind(),
            Some(TokenKind::Inner)
                | Some(TokenKind::Left)
                | Some(TokenKind::Right)
                | Some(TokenKind::Outer)
                | Some(TokenKind::Join)
        ) {
            joins.push(self.parse_join()?);
        }

        let mut conditions = Vec::new();
        let mut has_where = false;
        let mut order_by = None;
        let mut limit = None;
        let mut offset = None;
        let mut for_update = false;

        loop {
            match self.kind() {
                Some(TokenKind::Where) => {
                    conditions = self.parse_where()?;
                    has_where = true;
                }
                Some(TokenKind::Order) => {
                    self.advance();
                    self.expect(TokenKind::By)?;
                    order_by = Some(self.parse_order_by()?);
                }
                Some(TokenKind::Limit) => {
                    self.advance();
                    limit = Some(self.parse_u64()?);
                }
                Some(TokenKind::Offset) => {
                    self.advance();
                    offset = Some(self.parse_u64()?);
                }
                Some(TokenKind::For) => {
                    self.advance();
                    self.expect(TokenKind::Update)?;
                    for_update = true;
                }
                _ => break,
            }
        }

        // WHERE is implicit when missing: match every row.
        if !has_where {
            conditions = vec![ConditionItem {
                comparison: Comparison::True,
                connector: None,
            }];
        }

        Ok(SelectStmt {
            projections,
            tables,
            joins,
            conditions,
            order_by,
            limit,
            offset,
            for_update,
        })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let (attr, alias) = self.parse_attribute()?;
        if attr.is_star() || attr.table.is_some() {
            return Err(self.syntax_error());
        }
        Ok(TableRef {
            name: attr.name,
            alias,
        })
    }

    /// `[INNER|LEFT|RIGHT] [OUTER] JOIN table ON attr = attr`
    fn parse_join(&mut self) -> Result<JoinClause> {
        let mut join_type = JoinType::Inner;
        self.take(TokenKind::Inner);
        if self.take(TokenKind::Left) {
            join_type = JoinType::Left;
        } else if self.take(TokenKind::Right) {
            join_type = JoinType::Right;
        }
        if self.take(TokenKind::Outer) && join_type == JoinType::Inner {
            join_type = JoinType::Full;
        }

        self.expect(TokenKind::Join)?;
        let table = self.parse_table_ref()?;
        self.expect(TokenKind::On)?;
        let (left, _) = self.parse_attribute()?;
        self.expect(TokenKind::Equality)?;
        let (right, _) = self.parse_attribute()?;

        Ok(JoinClause {
            join_type,
            table,
            left,
            right,
        })
    }

    fn parse_order_by(&mut self) -> Result<OrderBy> {
        let mut attrs = Vec::new();
        loop {
            let (attr, _) = self.parse_attribute()?;
            attrs.push(attr);
            if !self.take(TokenKind::Comma) {
                break;
            }
        }

        let direction = if self.take(TokenKind::Desc) {
            Direction::Desc
        } else {
            self.take(TokenKind::Asc);
            Direction::Asc
        };

        Ok(OrderBy { attrs, direction })
    }

    // INSERT

    fn parse_insert(&mut self) -> Result<InsertStmt> {
        self.expect(TokenKind::Insert)?;
        self.expect(TokenKind::Into)?;
        let table = self.parse_quoted_name()?;

        let mut columns = Vec::new();
        let mut values = Vec::new();

        if self.take(TokenKind::Default) {
            // INSERT INTO t DEFAULT VALUES: every attribute defaulted.
            self.expect(TokenKind::Values)?;
        } else {
            // The column list may be omitted; values then bind to all
            // attributes positionally.
            if self.take(TokenKind::BracketOpening) {
                loop {
                    columns.push(self.parse_quoted_name()?);
                    if self.take(TokenKind::BracketClosing) {
                        break;
                    }
                    self.expect(TokenKind::Comma)?;
                }
            }

            self.expect(TokenKind::Values)?;
            self.expect(TokenKind::BracketOpening)?;
            loop {
                values.push(self.parse_insert_value()?);
                if self.take(TokenKind::BracketClosing) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }

        let returning = if self.take(TokenKind::Returning) {
            let (attr, _) = self.parse_attribute()?;
            Some(attr)
        } else {
            None
        };

        Ok(InsertStmt {
            table,
            columns,
            values,
            returning,
        })
    }

    fn parse_insert_value(&mut self) -> Result<InsertValue> {
        if self.take(TokenKind::Default) {
            return Ok(InsertValue::Default);
        }
        Ok(InsertValue::Operand(self.parse_operand()?))
    }

    // UPDATE / DELETE / TRUNCATE / DROP

    fn parse_update(&mut self) -> Result<UpdateStmt> {
        self.expect(TokenKind::Update)?;
        let table = self.parse_quoted_name()?;
        self.expect(TokenKind::Set)?;

        let mut assignments = Vec::new();
        loop {
            let name = self.parse_quoted_name()?;
            self.expect(TokenKind::Equality)?;
            let value = self.parse_operand()?;
            assignments.push((name, value));
            if !self.take(TokenKind::Comma) {
                break;
            }
        }

        let conditions = self.parse_where()?;

        Ok(UpdateStmt {
            table,
            assignments,
            conditions,
        })
    }

    fn parse_delete(&mut self) -> Result<DeleteStmt> {
        self.expect(TokenKind::Delete)?;
        self.expect(TokenKind::From)?;
        let table = self.parse_quoted_name()?;

        let conditions = if self.is(TokenKind::Where) {
            self.parse_where()?
        } else {
            vec![ConditionItem {
                comparison: Comparison::True,
                connector: None,
            }]
        };

        Ok(DeleteStmt { table, conditions })
    }

    fn parse_truncate(&mut self) -> Result<TruncateStmt> {
        self.expect(TokenKind::Truncate)?;
        self.take(TokenKind::Table);
        let table = self.parse_quoted_name()?;
        Ok(TruncateStmt { table })
    }

    fn parse_drop(&mut self) -> Result<DropTableStmt> {
        self.expect(TokenKind::Drop)?;
        self.expect(TokenKind::Table)?;

        let if_exists = if self.take(TokenKind::If) {
            self.expect(TokenKind::Exists)?;
            true
        } else {
            false
        };

        let table = self.parse_quoted_name()?;
        Ok(DropTableStmt { table, if_exists })
    }

    // Conditions

    fn parse_where(&mut self) -> Result<Vec<ConditionItem>> {
        self.expect(TokenKind::Where)?;

        let mut items = Vec::new();
        loop {
            let comparison = self.parse_condition()?;
            let connector = match self.kind() {
                Some(TokenKind::And) => {
                    self.advance();
                    Some(Connector::And)
                }
                Some(TokenKind::Or) => {
                    self.advance();
                    Some(Connector::Or)
                }
                _ => None,
            };

            let done = connector.is_none();
            items.push(ConditionItem {
                comparison,
                connector,
            });
            if done {
                break;
            }
        }

        Ok(items)
    }

    fn parse_condition(&mut self) -> Result<Comparison> {
        // The degenerate WHERE 1 / WHERE 1=1 clause.
        if self.is(TokenKind::Number) && self.lexeme() == "1" {
            self.advance();
            if self.is(TokenKind::Equality)
                && self.peek(1).map(|t| (t.kind, t.lexeme.as_str())) == Some((TokenKind::Number, "1"))
            {
                self.advance();
                self.advance();
            }
            return Ok(Comparison::True);
        }

        let (left, _) = self.parse_attribute()?;

        match self.kind() {
            Some(TokenKind::Equality) => self.parse_binary(left, CompareOp::Eq),
            Some(TokenKind::LeftDiple) => self.parse_binary(left, CompareOp::Lt),
            Some(TokenKind::RightDiple) => self.parse_binary(left, CompareOp::Gt),
            Some(TokenKind::LessOrEqual) => self.parse_binary(left, CompareOp::Le),
            Some(TokenKind::GreaterOrEqual) => self.parse_binary(left, CompareOp::Ge),
            Some(TokenKind::In) => {
                self.advance();
                self.expect(TokenKind::BracketOpening)?;
                let mut list = Vec::new();
                loop {
                    list.push(self.parse_operand()?);
                    if self.take(TokenKind::BracketClosing) {
                        break;
                    }
                    self.expect(TokenKind::Comma)?;
                }
                Ok(Comparison::In { left, list })
            }
            Some(TokenKind::Is) => {
                self.advance();
                let negated = self.take(TokenKind::Not);
                self.expect(TokenKind::Null)?;
                Ok(Comparison::IsNull { left, negated })
            }
            _ => Err(self.syntax_error()),
        }
    }

    fn parse_binary(&mut self, left: AttrRef, op: CompareOp) -> Result<Comparison> {
        self.advance();
        let right = self.parse_operand()?;
        Ok(Comparison::Binary { left, op, right })
    }

    /// A value position: literal, NULL, TRUE/FALSE, symbolic timestamp, or
    /// bind placeholder, optionally quoted.
    fn parse_operand(&mut self) -> Result<Operand> {
        let quote = match self.kind() {
            Some(kind @ (TokenKind::SimpleQuote | TokenKind::DoubleQuote)) => {
                self.advance();
                Some(kind)
            }
            _ => None,
        };

        let token = self.take_any(&[
            TokenKind::String,
            TokenKind::Number,
            TokenKind::Date,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
            TokenKind::Now,
            TokenKind::LocalTimestamp,
            TokenKind::Placeholder,
        ])?;

        let operand = match token.kind {
            TokenKind::Number => Operand::Literal(Value::Integer(self.parse_i64(&token)?)),
            TokenKind::True => Operand::Literal(Value::Bool(true)),
            TokenKind::False => Operand::Literal(Value::Bool(false)),
            TokenKind::Null => Operand::Literal(Value::Null),
            TokenKind::Now | TokenKind::LocalTimestamp => Operand::CurrentTimestamp,
            TokenKind::Placeholder => Operand::Placeholder(self.placeholder_index(&token)?),
            _ => Operand::Literal(Value::Text(token.lexeme)),
        };

        if let Some(kind) = quote {
            self.expect(kind)?;
        }

        Ok(operand)
    }

    // Attribute and name parsing

    /// `[table.]col`, `[table.]*`, quoted forms, with optional `AS alias`.
    fn parse_attribute(&mut self) -> Result<(AttrRef, Option<String>)> {
        let quote = match self.kind() {
            Some(kind @ (TokenKind::DoubleQuote | TokenKind::Backtick)) => {
                self.advance();
                Some(kind)
            }
            _ => None,
        };

        let first = self.parse_word_or_star()?;
        if let Some(kind) = quote {
            self.expect(kind)?;
        }

        let attr = if self.take(TokenKind::Period) {
            let name = self.parse_word_or_star()?;
            AttrRef {
                table: Some(first),
                name,
            }
        } else {
            AttrRef {
                table: None,
                name: first,
            }
        };

        let alias = self.parse_alias()?;
        Ok((attr, alias))
    }

    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.take(TokenKind::As) {
            let token = self.expect(TokenKind::String)?;
            return Ok(Some(token.lexeme));
        }
        Ok(None)
    }

    fn parse_word_or_star(&mut self) -> Result<String> {
        match self.kind() {
            Some(TokenKind::Star) => {
                self.advance();
                Ok("*".to_string())
            }
            Some(kind) if kind.is_word() => {
                let lexeme = self.lexeme().to_string();
                self.advance();
                Ok(lexeme)
            }
            _ => Err(self.syntax_error()),
        }
    }

    /// A possibly-quoted name: `<WORD>`, `'<WORD>'`, `"<WORD>"`, `` `<WORD>` ``.
    /// Quoting lets reserved words appear as identifiers.
    fn parse_quoted_name(&mut self) -> Result<String> {
        let quote = match self.kind() {
            Some(
                kind @ (TokenKind::SimpleQuote | TokenKind::DoubleQuote | TokenKind::Backtick),
            ) => {
                self.advance();
                Some(kind)
            }
            _ => None,
        };

        let name = match self.kind() {
            Some(kind) if kind.is_word() => {
                let lexeme = self.lexeme().to_string();
                self.advance();
                lexeme
            }
            _ => return Err(self.syntax_error()),
        };

        if let Some(kind) = quote {
            self.expect(kind)?;
        }

        Ok(name)
    }

    // Cursor helpers

    fn kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.index).map(|t| t.kind)
    }

    fn lexeme(&self) -> &str {
        self.tokens
            .get(self.index)
            .map(|t| t.lexeme.as_str())
            .unwrap_or("")
    }

    fn peek(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.index + ahead)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Consume the token when it matches.
    fn take(&mut self, kind: TokenKind) -> bool {
        if self.is(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn take_any(&mut self, kinds: &[TokenKind]) -> Result<Token> {
        match self.kind() {
            Some(kind) if kinds.contains(&kind) => {
                let token = self.tokens[self.index].clone();
                self.advance();
                Ok(token)
            }
            _ => Err(self.syntax_error()),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.is(kind) {
            let token = self.tokens[self.index].clone();
            self.advance();
            return Ok(token);
        }
        Err(self.syntax_error())
    }

    fn parse_u64(&mut self) -> Result<u64> {
        let token = self.expect(TokenKind::Number)?;
        token
            .lexeme
            .parse::<u64>()
            .map_err(|_| QuartzError::Syntax(format!("invalid number {}", token.lexeme)))
    }

    fn parse_i64(&self, token: &Token) -> Result<i64> {
        token
            .lexeme
            .parse::<i64>()
            .map_err(|_| QuartzError::Syntax(format!("invalid number {}", token.lexeme)))
    }

    /// `$N` is 1-indexed; `?` numbers itself sequentially.
    fn placeholder_index(&mut self, token: &Token) -> Result<usize> {
        if token.lexeme == "?" {
            let index = self.placeholder_seq;
            self.placeholder_seq += 1;
            return Ok(index);
        }

        let n = token.lexeme[1..]
            .parse::<usize>()
            .map_err(|_| QuartzError::Syntax(format!("invalid placeholder {}", token.lexeme)))?;
        if n == 0 {
            return Err(QuartzError::Syntax(
                "placeholder indexes start at $1".to_string(),
            ));
        }
        Ok(n - 1)
    }

    /// "Syntax error near <prev> <cur> <next>".
    fn syntax_error(&self) -> QuartzError {
        let mut window = Vec::new();
        if self.index > 0 {
            if let Some(t) = self.tokens.get(self.index - 1) {
                window.push(t.lexeme.as_str());
            }
        }
        if let Some(t) = self.tokens.get(self.index) {
            window.push(t.lexeme.as_str());
        }
        if let Some(t) = self.tokens.get(self.index + 1) {
            window.push(t.lexeme.as_str());
        }
        QuartzError::Syntax(format!("near {}", window.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::lexer;

    fn parse_sql(sql: &str) -> Result<Vec<Statement>> {
        Parser::new(lexer::lex(sql)?).parse()
    }

    fn parse_one(sql: &str) -> Statement {
        let mut statements = parse_sql(sql).unwrap();
        assert_eq!(statements.len(), 1, "expected one statement");
        statements.remove(0)
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse_one("CREATE TABLE account (id INT, email TEXT)");
        match stmt {
            Statement::CreateTable(c) => {
                assert!(!c.if_not_exists);
                assert_eq!(c.table, "account");
                assert_eq!(c.columns.len(), 2);
                assert_eq!(c.columns[0].name, "id");
                assert_eq!(c.columns[1].type_name, "TEXT");
            }
            _ => panic!("expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_parse_create_table_constraints_any_order() {
        let stmt = parse_one(
            "CREATE TABLE IF NOT EXISTS t (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) UNIQUE NOT NULL,
                age INT DEFAULT 42,
                created TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated TIMESTAMP DEFAULT LOCALTIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            )",
        );
        match stmt {
            Statement::CreateTable(c) => {
                assert!(c.if_not_exists);
                let email = &c.columns[1];
                assert!(email.unique);
                assert!(!email.nullable);
                assert_eq!(email.type_name, "VARCHAR(255)");

                let age = &c.columns[2];
                assert_eq!(
                    age.default_value,
                    Some(ValueAction::Literal(Value::Integer(42)))
                );

                let created = &c.columns[3];
                assert_eq!(created.type_name, "TIMESTAMP with time zone");
                assert_eq!(created.default_value, Some(ValueAction::CurrentTimestamp));

                let updated = &c.columns[4];
                assert_eq!(updated.on_update_value, Some(ValueAction::CurrentTimestamp));
            }
            _ => panic!("expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_parse_create_table_with_table_constraints() {
        let stmt = parse_one(
            "CREATE TABLE t (
                id INT,
                other_id INT,
                PRIMARY KEY (id),
                UNIQUE KEY uniq_other (other_id),
                INDEX idx_other USING BTREE (other_id ASC),
                FOREIGN KEY fk_other (other_id) REFERENCES other (id) MATCH SIMPLE ON DELETE CASCADE ON UPDATE SET NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8",
        );
        match stmt {
            Statement::CreateTable(c) => {
                // Constraints and options are accepted and discarded.
                assert_eq!(c.columns.len(), 2);
            }
            _ => panic!("expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_parse_select_star() {
        let stmt = parse_one("SELECT * FROM account");
        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.tables[0].name, "account");
                assert!(matches!(
                    &s.projections[0],
                    Projection::Attribute { attr, .. } if attr.is_star()
                ));
                // Implicit WHERE matches every row.
                assert_eq!(s.conditions[0].comparison, Comparison::True);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_parse_select_join_order_limit() {
        let stmt = parse_one(
            "SELECT user.name, address.value FROM user \
             JOIN address ON address.user_id = user.id \
             WHERE user.id = $1 \
             ORDER BY address.value ASC LIMIT 10 OFFSET 2 FOR UPDATE",
        );
        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.joins.len(), 1);
                assert_eq!(s.joins[0].table.name, "address");
                assert_eq!(s.joins[0].left.to_string(), "address.user_id");
                assert_eq!(s.joins[0].right.to_string(), "user.id");
                assert_eq!(
                    s.conditions[0].comparison,
                    Comparison::Binary {
                        left: AttrRef {
                            table: Some("user".into()),
                            name: "id".into()
                        },
                        op: CompareOp::Eq,
                        right: Operand::Placeholder(0),
                    }
                );
                let order = s.order_by.unwrap();
                assert_eq!(order.direction, Direction::Asc);
                assert_eq!(s.limit, Some(10));
                assert_eq!(s.offset, Some(2));
                assert!(s.for_update);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_parse_select_outer_join_keywords() {
        let stmt = parse_one(
            "SELECT a.x FROM a LEFT OUTER JOIN b ON b.a_id = a.id INNER JOIN c ON c.b_id = b.id",
        );
        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.joins.len(), 2);
                assert_eq!(s.joins[0].join_type, JoinType::Left);
                assert_eq!(s.joins[1].join_type, JoinType::Inner);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_parse_where_one_equals_one() {
        let stmt = parse_one("SELECT COUNT(*) FROM a WHERE 1=1");
        match stmt {
            Statement::Select(s) => {
                assert!(matches!(&s.projections[0], Projection::Count { attr, .. } if attr.is_star()));
                assert_eq!(s.conditions[0].comparison, Comparison::True);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_parse_order_without_where_synthesizes_match_all() {
        let stmt = parse_one("SELECT id FROM u ORDER BY id DESC");
        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.conditions[0].comparison, Comparison::True);
                assert_eq!(s.order_by.unwrap().direction, Direction::Desc);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_parse_insert() {
        let stmt = parse_one("INSERT INTO account ('email', age) VALUES ('foo@bar.com', 42)");
        match stmt {
            Statement::Insert(i) => {
                assert_eq!(i.table, "account");
                assert_eq!(i.columns, vec!["email", "age"]);
                assert_eq!(
                    i.values[0],
                    InsertValue::Operand(Operand::Literal(Value::Text("foo@bar.com".into())))
                );
                assert_eq!(
                    i.values[1],
                    InsertValue::Operand(Operand::Literal(Value::Integer(42)))
                );
                assert!(i.returning.is_none());
            }
            _ => panic!("expected INSERT"),
        }
    }

    #[test]
    fn test_parse_insert_returning_and_symbolic_values() {
        let stmt = parse_one(
            "INSERT INTO t (a, b, c, d) VALUES (DEFAULT, NULL, NOW(), false) RETURNING a",
        );
        match stmt {
            Statement::Insert(i) => {
                assert_eq!(i.values[0], InsertValue::Default);
                assert_eq!(
                    i.values[1],
                    InsertValue::Operand(Operand::Literal(Value::Null))
                );
                assert_eq!(i.values[2], InsertValue::Operand(Operand::CurrentTimestamp));
                assert_eq!(
                    i.values[3],
                    InsertValue::Operand(Operand::Literal(Value::Bool(false)))
                );
                assert_eq!(i.returning.unwrap().name, "a");
            }
            _ => panic!("expected INSERT"),
        }
    }

    #[test]
    fn test_parse_insert_without_column_list() {
        let stmt = parse_one("INSERT INTO account VALUES (1, 'a')");
        match stmt {
            Statement::Insert(i) => {
                assert!(i.columns.is_empty());
                assert_eq!(i.values.len(), 2);
            }
            _ => panic!("expected INSERT"),
        }
    }

    #[test]
    fn test_parse_insert_default_values() {
        let stmt = parse_one("INSERT INTO t DEFAULT VALUES");
        match stmt {
            Statement::Insert(i) => {
                assert!(i.columns.is_empty());
                assert!(i.values.is_empty());
            }
            _ => panic!("expected INSERT"),
        }
    }

    #[test]
    fn test_parse_escaped_string_value() {
        let stmt = parse_one("INSERT INTO user (name) VALUES ($$riri$$)");
        match stmt {
            Statement::Insert(i) => {
                assert_eq!(
                    i.values[0],
                    InsertValue::Operand(Operand::Literal(Value::Text("riri".into())))
                );
            }
            _ => panic!("expected INSERT"),
        }
    }

    #[test]
    fn test_parse_update() {
        let stmt = parse_one("UPDATE account SET email = 'roger@gmail.com', age = 12 WHERE id = 2");
        match stmt {
            Statement::Update(u) => {
                assert_eq!(u.table, "account");
                assert_eq!(u.assignments.len(), 2);
                assert_eq!(u.assignments[0].0, "email");
                assert_eq!(u.conditions.len(), 1);
            }
            _ => panic!("expected UPDATE"),
        }
    }

    #[test]
    fn test_parse_delete_without_where_matches_all() {
        let stmt = parse_one("DELETE FROM account");
        match stmt {
            Statement::Delete(d) => {
                assert_eq!(d.table, "account");
                assert_eq!(d.conditions[0].comparison, Comparison::True);
            }
            _ => panic!("expected DELETE"),
        }
    }

    #[test]
    fn test_parse_truncate_and_drop() {
        assert_eq!(
            parse_one("TRUNCATE TABLE account"),
            Statement::Truncate(TruncateStmt {
                table: "account".into()
            })
        );
        assert_eq!(
            parse_one("DROP TABLE IF EXISTS account"),
            Statement::DropTable(DropTableStmt {
                table: "account".into(),
                if_exists: true,
            })
        );
    }

    #[test]
    fn test_parse_backtick_identifier() {
        let stmt = parse_one("SELECT `key` FROM `table_with_key`");
        match stmt {
            Statement::Select(s) => match &s.projections[0] {
                Projection::Attribute { attr, .. } => assert_eq!(attr.name, "key"),
                _ => panic!("expected attribute projection"),
            },
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_parse_in_and_is_null() {
        let stmt = parse_one("SELECT a FROM t WHERE a IN (1, 2, 3) AND b IS NOT NULL OR c IS NULL");
        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.conditions.len(), 3);
                assert!(matches!(
                    &s.conditions[0].comparison,
                    Comparison::In { list, .. } if list.len() == 3
                ));
                assert_eq!(s.conditions[0].connector, Some(Connector::And));
                assert!(matches!(
                    s.conditions[1].comparison,
                    Comparison::IsNull { negated: true, .. }
                ));
                assert_eq!(s.conditions[1].connector, Some(Connector::Or));
                assert!(matches!(
                    s.conditions[2].comparison,
                    Comparison::IsNull { negated: false, .. }
                ));
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn test_sequential_placeholders() {
        let stmt = parse_one("UPDATE t SET a = ?, b = ? WHERE id = ?");
        match stmt {
            Statement::Update(u) => {
                assert_eq!(u.assignments[0].1, Operand::Placeholder(0));
                assert_eq!(u.assignments[1].1, Operand::Placeholder(1));
                assert_eq!(
                    u.conditions[0].comparison,
                    Comparison::Binary {
                        left: AttrRef {
                            table: None,
                            name: "id".into()
                        },
                        op: CompareOp::Eq,
                        right: Operand::Placeholder(2),
                    }
                );
            }
            _ => panic!("expected UPDATE"),
        }
    }

    #[test]
    fn test_parse_grant_is_noop_statement() {
        assert_eq!(
            parse_one("GRANT ALL PRIVILEGES ON DATABASE foo TO bar"),
            Statement::Grant
        );
    }

    #[test]
    fn test_multiple_statements() {
        let statements =
            parse_sql("CREATE TABLE t (id INT); INSERT INTO t (id) VALUES (1); SELECT * FROM t")
                .unwrap();
        assert_eq!(statements.len(), 3);
    }

    #[test]
    fn test_syntax_error_reports_token_window() {
        match parse_sql("SELECT FROM WHERE") {
            Err(QuartzError::Syntax(msg)) => assert!(msg.contains("from"), "got: {msg}"),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
