//! Token kinds for the SQL lexer
use phf::phf_map;

/// Perfect hash map for keyword lookup, keyed by the lowercase lexeme.
/// `NOW()` is absent on purpose: it contains punctuation and gets its own
/// matcher in the lexer.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    // First-order (statement verbs)
    "create" => TokenKind::Create,
    "select" => TokenKind::Select,
    "insert" => TokenKind::Insert,
    "update" => TokenKind::Update,
    "delete" => TokenKind::Delete,
    "truncate" => TokenKind::Truncate,
    "drop" => TokenKind::Drop,
    "grant" => TokenKind::Grant,
    "explain" => TokenKind::Explain,
    // Second-order
    "action" => TokenKind::Action,
    "and" => TokenKind::And,
    "as" => TokenKind::As,
    "asc" => TokenKind::Asc,
    "autoincrement" => TokenKind::Autoincrement,
    "auto_increment" => TokenKind::Autoincrement,
    "btree" => TokenKind::Btree,
    "by" => TokenKind::By,
    "cascade" => TokenKind::Cascade,
    "character" => TokenKind::Character,
    "charset" => TokenKind::Charset,
    "constraint" => TokenKind::Constraint,
    "count" => TokenKind::Count,
    "current_timestamp" => TokenKind::LocalTimestamp,
    "default" => TokenKind::Default,
    "desc" => TokenKind::Desc,
    "engine" => TokenKind::Engine,
    "exists" => TokenKind::Exists,
    "false" => TokenKind::False,
    "for" => TokenKind::For,
    "foreign" => TokenKind::Foreign,
    "from" => TokenKind::From,
    "full" => TokenKind::Full,
    "hash" => TokenKind::Hash,
    "if" => TokenKind::If,
    "in" => TokenKind::In,
    "index" => TokenKind::Index,
    "inner" => TokenKind::Inner,
    "into" => TokenKind::Into,
    "is" => TokenKind::Is,
    "join" => TokenKind::Join,
    "key" => TokenKind::Key,
    "left" => TokenKind::Left,
    "limit" => TokenKind::Limit,
    "localtimestamp" => TokenKind::LocalTimestamp,
    "match" => TokenKind::Match,
    "no" => TokenKind::No,
    "not" => TokenKind::Not,
    "null" => TokenKind::Null,
    "offset" => TokenKind::Offset,
    "on" => TokenKind::On,
    "or" => TokenKind::Or,
    "order" => TokenKind::Order,
    "outer" => TokenKind::Outer,
    "partial" => TokenKind::Partial,
    "primary" => TokenKind::Primary,
    "references" => TokenKind::References,
    "restrict" => TokenKind::Restrict,
    "returning" => TokenKind::Returning,
    "right" => TokenKind::Right,
    "set" => TokenKind::Set,
    "simple" => TokenKind::Simple,
    "table" => TokenKind::Table,
    "time" => TokenKind::Time,
    "true" => TokenKind::True,
    "unique" => TokenKind::Unique,
    "using" => TokenKind::Using,
    "values" => TokenKind::Values,
    "where" => TokenKind::Where,
    "with" => TokenKind::With,
    "zone" => TokenKind::Zone,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Punctuation
    Space,
    Semicolon,
    Comma,
    BracketOpening,
    BracketClosing,
    Star,
    SimpleQuote,
    DoubleQuote,
    Backtick,
    Equality,
    Period,
    LeftDiple,       // <
    RightDiple,      // >
    LessOrEqual,     // <=
    GreaterOrEqual,  // >=

    // First-order keywords (statement verbs)
    Create,
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    Drop,
    Grant,
    Explain,

    // Second-order keywords
    Action,
    And,
    As,
    Asc,
    Autoincrement,
    Btree,
    By,
    Cascade,
    Character,
    Charset,
    Constraint,
    Count,
    Default,
    Desc,
    Engine,
    Exists,
    False,
    For,
    Foreign,
    From,
    Full,
    Hash,
    If,
    In,
    Index,
    Inner,
    Into,
    Is,
    Join,
    Key,
    Left,
    Limit,
    LocalTimestamp,
    Match,
    No,
    Not,
    Now,
    Null,
    Offset,
    On,
    Or,
    Order,
    Outer,
    Partial,
    Primary,
    References,
    Restrict,
    Returning,
    Right,
    Set,
    Simple,
    Table,
    Time,
    True,
    Unique,
    Using,
    Values,
    Where,
    With,
    Zone,

    // Literals
    Number,
    String,
    Date,
    Placeholder,
}

impl TokenKind {
    /// Keyword lookup, case-insensitive.
    pub fn from_keyword(word: &str) -> Option<Self> {
        KEYWORDS.get(word.to_lowercase().as_str()).copied()
    }

    /// Whether this token is a word (keyword or plain string) and may
    /// therefore serve as a quoted identifier.
    pub fn is_word(&self) -> bool {
        !matches!(
            self,
            TokenKind::Space
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::BracketOpening
                | TokenKind::BracketClosing
                | TokenKind::Star
                | TokenKind::SimpleQuote
                | TokenKind::DoubleQuote
                | TokenKind::Backtick
                | TokenKind::Equality
                | TokenKind::Period
                | TokenKind::LeftDiple
                | TokenKind::RightDiple
                | TokenKind::LessOrEqual
                | TokenKind::GreaterOrEqual
                | TokenKind::Number
                | TokenKind::Date
                | TokenKind::Placeholder
        )
    }
}

/// A lexed token: kind plus the literal lexeme text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
        }
    }
}
