//! SQL lexer - converts a byte sequence into tokens
//!
//! Each step tries an ordered list of matchers; the first one to advance the
//! cursor wins. Whitespace produces Space tokens that the parser strips.

use tracing::warn;

use super::token::{Token, TokenKind};
use crate::error::{QuartzError, Result};
use crate::types::timestamp;

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

/// Tokenize one or more SQL statements.
pub fn lex(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).run()
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<Vec<Token>> {
        while self.pos < self.input.len() {
            if !self.step() {
                let suffix = String::from_utf8_lossy(&self.input[self.pos..]);
                warn!(pos = self.pos, "lexer stuck, no matcher advanced");
                return Err(QuartzError::Lex(format!("syntax error near {suffix}")));
            }
        }
        Ok(self.tokens)
    }

    /// One matcher cycle, in priority order.
    fn step(&mut self) -> bool {
        self.match_space()
            || self.match_single(b';', TokenKind::Semicolon)
            || self.match_single(b',', TokenKind::Comma)
            || self.match_single(b'(', TokenKind::BracketOpening)
            || self.match_single(b')', TokenKind::BracketClosing)
            || self.match_single(b'*', TokenKind::Star)
            || self.match_quoted(b'\'', TokenKind::SimpleQuote)
            || self.match_single(b'=', TokenKind::Equality)
            || self.match_single(b'.', TokenKind::Period)
            || self.match_quoted(b'"', TokenKind::DoubleQuote)
            || self.match_two(b"<=", TokenKind::LessOrEqual)
            || self.match_single(b'<', TokenKind::LeftDiple)
            || self.match_two(b">=", TokenKind::GreaterOrEqual)
            || self.match_single(b'>', TokenKind::RightDiple)
            || self.match_single(b'`', TokenKind::Backtick)
            || self.match_keyword()
            || self.match_now()
            || self.match_escaped()
            || self.match_placeholder()
            || self.match_date()
            || self.match_number()
            || self.match_identifier()
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.input.get(at).copied()
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>) {
        self.tokens.push(Token::new(kind, lexeme));
    }

    fn match_space(&mut self) -> bool {
        if self.input[self.pos].is_ascii_whitespace() {
            self.push(TokenKind::Space, " ");
            self.pos += 1;
            return true;
        }
        false
    }

    fn match_single(&mut self, ch: u8, kind: TokenKind) -> bool {
        if self.input[self.pos] == ch {
            self.push(kind, (ch as char).to_string());
            self.pos += 1;
            return true;
        }
        false
    }

    fn match_two(&mut self, pat: &[u8; 2], kind: TokenKind) -> bool {
        if self.input[self.pos..].starts_with(pat) {
            self.push(kind, String::from_utf8_lossy(pat).into_owned());
            self.pos += 2;
            return true;
        }
        false
    }

    /// `'interior'` and `"interior"` produce quote, string, quote.
    /// A missing closing quote leaves the cursor stuck, surfacing as a lex
    /// error on the opening quote.
    fn match_quoted(&mut self, quote: u8, kind: TokenKind) -> bool {
        if self.input[self.pos] != quote {
            return false;
        }

        let mut i = self.pos + 1;
        while i < self.input.len() && self.input[i] != quote {
            i += 1;
        }
        if i == self.input.len() {
            return false;
        }

        let interior = String::from_utf8_lossy(&self.input[self.pos + 1..i]).into_owned();
        self.push(kind, (quote as char).to_string());
        self.push(TokenKind::String, interior);
        self.push(kind, (quote as char).to_string());
        self.pos = i + 1;
        true
    }

    /// Reserved words, matched case-insensitively on a maximal identifier
    /// run so COUNT never matches inside COUNTRY.
    fn match_keyword(&mut self) -> bool {
        let end = self.word_end(self.pos);
        if end == self.pos {
            return false;
        }

        let word = String::from_utf8_lossy(&self.input[self.pos..end]).into_owned();
        match TokenKind::from_keyword(&word) {
            Some(kind) => {
                self.push(kind, word.to_lowercase());
                self.pos = end;
                true
            }
            None => false,
        }
    }

    /// NOW() carries punctuation and cannot go through the keyword table.
    fn match_now(&mut self) -> bool {
        let pat = b"now()";
        if self.pos + pat.len() > self.input.len() {
            return false;
        }
        let candidate = &self.input[self.pos..self.pos + pat.len()];
        if !candidate.eq_ignore_ascii_case(pat) {
            return false;
        }
        if let Some(next) = self.byte(self.pos + pat.len()) {
            if is_word_byte(next) {
                return false;
            }
        }

        self.push(TokenKind::Now, "now()");
        self.pos += pat.len();
        true
    }

    /// `$$ ... $$` escaped literal; the kind of the interior is inferred.
    fn match_escaped(&mut self) -> bool {
        if !self.input[self.pos..].starts_with(b"$$") {
            return false;
        }

        let body_start = self.pos + 2;
        let mut i = body_start;
        while i + 1 < self.input.len() && !(self.input[i] == b'$' && self.input[i + 1] == b'$') {
            i += 1;
        }
        if i + 1 >= self.input.len() {
            return false;
        }

        let escaped = String::from_utf8_lossy(&self.input[body_start..i]).into_owned();
        let kind = if timestamp::parse_date(&escaped).is_ok() {
            TokenKind::Date
        } else if !escaped.is_empty() && escaped.bytes().all(|b| b.is_ascii_digit()) {
            TokenKind::Number
        } else {
            TokenKind::String
        };

        self.push(kind, escaped);
        self.pos = i + 2;
        true
    }

    /// Bind placeholders: `$N` (1-indexed) and `?` (sequential).
    fn match_placeholder(&mut self) -> bool {
        if self.input[self.pos] == b'?' {
            self.push(TokenKind::Placeholder, "?");
            self.pos += 1;
            return true;
        }

        if self.input[self.pos] != b'$' {
            return false;
        }
        let mut i = self.pos + 1;
        while i < self.input.len() && self.input[i].is_ascii_digit() {
            i += 1;
        }
        if i == self.pos + 1 {
            return false;
        }

        let lexeme = String::from_utf8_lossy(&self.input[self.pos..i]).into_owned();
        self.push(TokenKind::Placeholder, lexeme);
        self.pos = i;
        true
    }

    /// Greedy read up to `,` or `)`; emit a string token when the slice
    /// parses as one of the accepted date formats, rewind otherwise.
    fn match_date(&mut self) -> bool {
        let mut i = self.pos;
        while i < self.input.len() && self.input[i] != b',' && self.input[i] != b')' {
            i += 1;
        }

        let data = match std::str::from_utf8(&self.input[self.pos..i]) {
            Ok(s) => s,
            Err(_) => return false,
        };
        if timestamp::parse_date(data).is_err() {
            return false;
        }

        self.push(TokenKind::String, data.to_owned());
        self.pos = i;
        true
    }

    fn match_number(&mut self) -> bool {
        let mut i = self.pos;
        while i < self.input.len() && self.input[i].is_ascii_digit() {
            i += 1;
        }
        if i == self.pos {
            return false;
        }

        let lexeme = String::from_utf8_lossy(&self.input[self.pos..i]).into_owned();
        self.push(TokenKind::Number, lexeme);
        self.pos = i;
        true
    }

    fn match_identifier(&mut self) -> bool {
        let mut i = self.pos;
        while i < self.input.len() && (is_word_byte(self.input[i]) || self.input[i] == b'@') {
            i += 1;
        }
        if i == self.pos {
            return false;
        }

        let lexeme = String::from_utf8_lossy(&self.input[self.pos..i]).into_owned();
        self.push(TokenKind::String, lexeme);
        self.pos = i;
        true
    }

    /// End of the identifier run starting at `from`.
    fn word_end(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.input.len() && is_word_byte(self.input[i]) {
            i += 1;
        }
        i
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_simple_select() {
        let tokens = lex("SELECT * FROM users").unwrap();
        let no_space: Vec<_> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Space)
            .collect();
        assert_eq!(no_space.len(), 4);
        assert_eq!(no_space[0].kind, TokenKind::Select);
        assert_eq!(no_space[1].kind, TokenKind::Star);
        assert_eq!(no_space[2].kind, TokenKind::From);
        assert_eq!(no_space[3].kind, TokenKind::String);
        assert_eq!(no_space[3].lexeme, "users");
    }

    #[test]
    fn test_keyword_does_not_match_inside_identifier() {
        let tokens = lex("SELECT country FROM intake").unwrap();
        let words: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(words, vec!["country", "intake"]);
    }

    #[test]
    fn test_quoted_string_produces_triple() {
        assert_eq!(
            kinds("'John'"),
            vec![TokenKind::SimpleQuote, TokenKind::String, TokenKind::SimpleQuote]
        );
        let tokens = lex("\"with space\"").unwrap();
        assert_eq!(tokens[1].lexeme, "with space");
    }

    #[test]
    fn test_unterminated_string_is_lex_error() {
        assert!(matches!(lex("SELECT 'oops"), Err(QuartzError::Lex(_))));
    }

    #[test]
    fn test_backtick_identifier() {
        assert_eq!(
            kinds("`key`"),
            vec![TokenKind::Backtick, TokenKind::Key, TokenKind::Backtick]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("<= >= < > ="),
            vec![
                TokenKind::LessOrEqual,
                TokenKind::Space,
                TokenKind::GreaterOrEqual,
                TokenKind::Space,
                TokenKind::LeftDiple,
                TokenKind::Space,
                TokenKind::RightDiple,
                TokenKind::Space,
                TokenKind::Equality,
            ]
        );
    }

    #[test]
    fn test_escaped_literal_kinds() {
        let tokens = lex("$$riri$$").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "riri");

        let tokens = lex("$$1234$$").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);

        let tokens = lex("$$2015-09-10$$").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Date);
        assert_eq!(tokens[0].lexeme, "2015-09-10");
    }

    #[test]
    fn test_date_literal_before_number() {
        let tokens = lex("(2015-09-10)").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].lexeme, "2015-09-10");
    }

    #[test]
    fn test_placeholders() {
        let tokens = lex("$1 ? $23").unwrap();
        let p: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Placeholder)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(p, vec!["$1", "?", "$23"]);
    }

    #[test]
    fn test_now_function_token() {
        assert_eq!(kinds("NOW()"), vec![TokenKind::Now]);
    }

    #[test]
    fn test_unrecognized_byte_reports_suffix() {
        match lex("SELECT %") {
            Err(QuartzError::Lex(msg)) => assert!(msg.contains('%')),
            other => panic!("expected lex error, got {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip_lexemes() {
        let input = "select a.b from t where x='yz' order by a limit 3";
        let tokens = lex(input).unwrap();
        let rebuilt: String = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Space)
            .map(|t| t.lexeme.as_str())
            .collect();
        let collapsed: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(rebuilt, collapsed);
    }
}
