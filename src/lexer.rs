//! Tokenization. Converts source text into a flat token
//! stream with source spans, folding keywords and applying the
//! significant-newline statement-termination rules:
//! a bare newline ends a statement unless the next non-space characters
//! begin a pipe continuation (`|>`/`?|>`), in which case it is swallowed.
//!
//! A hand-rolled lexer producing a `TokenKind` + [`Span`] pair per token,
//! rather than a grammar-file-driven one (see DESIGN.md).

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::ast::Span;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    /// Backtick-delimited identifier; carries arbitrary text between
    /// backticks.
    BacktickIdent(String),
    Column(String),

    // Keywords
    If,
    Else,
    Function,
    Pipeline,
    Intent,
    True,
    False,
    Null,
    Na,
    In,
    And,
    Or,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    ColonEq,
    Arrow,
    Ellipsis,
    Pipe,
    PipeUnconditional,
    Tilde,
    Eq,
    Backslash,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Amp,
    Bar,
    Bang,

    // Broadcast (dotted) counterparts
    DotPlus,
    DotMinus,
    DotStar,
    DotSlash,
    DotPercent,
    DotEqEq,
    DotNe,
    DotLt,
    DotGt,
    DotLe,
    DotGe,
    DotAmp,
    DotBar,

    /// A statement-terminating newline. Swallowed rather
    /// than emitted when the following line begins with `|>`/`?|>`.
    Newline,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("function", TokenKind::Function),
        ("pipeline", TokenKind::Pipeline),
        ("intent", TokenKind::Intent),
        ("true", TokenKind::True),
        ("false", TokenKind::False),
        ("null", TokenKind::Null),
        ("NA", TokenKind::Na),
        ("in", TokenKind::In),
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
    ])
});

fn keyword(word: &str) -> Option<TokenKind> {
    KEYWORDS.get(word).cloned()
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn byte_offset(&self, char_pos: usize) -> usize {
        self.src
            .char_indices()
            .nth(char_pos)
            .map(|(b, _)| b)
            .unwrap_or(self.src.len())
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.byte_offset(start), self.byte_offset(end))
    }

    /// Skips horizontal whitespace, carriage returns, and `--` line
    /// comments. Does *not* skip newlines (those are significant tokens).
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.pos += 1;
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// True if, scanning ahead from `from` (skipping horizontal whitespace
    /// and blank lines), the next non-space characters begin `|>` or
    /// `?|>` — the pipe-continuation rule.
    fn next_line_starts_with_pipe(&self, from: usize) -> bool {
        let mut i = from;
        loop {
            match self.chars.get(i) {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => i += 1,
                Some('-') if self.chars.get(i + 1) == Some(&'-') => {
                    while !matches!(self.chars.get(i), None | Some('\n')) {
                        i += 1;
                    }
                }
                _ => break,
            }
        }
        if self.chars.get(i) == Some(&'?') && self.chars.get(i + 1) == Some(&'|') && self.chars.get(i + 2) == Some(&'>')
        {
            return true;
        }
        self.chars.get(i) == Some(&'|') && self.chars.get(i + 1) == Some(&'>')
    }

    /// `digit+ '.' digit*` takes precedence over a bare integer. A dot not followed by a digit is still consumed as a float
    /// dot here *unless* the next two characters are `..` (the `...`
    /// spread token) or the dot is immediately followed by an identifier
    /// start (dot-access on an integer literal, e.g. a future `5.to_s()` —
    /// not part of this grammar, but kept unambiguous for extensibility).
    fn lex_number(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let is_float_dot = self.peek() == Some('.')
            && self.peek_at(1) != Some('.')
            && !matches!(self.peek_at(1), Some(c) if c.is_alphabetic() || c == '_');
        if is_float_dot {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            return TokenKind::Float(text.parse().unwrap_or(0.0));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Int(text.parse().unwrap_or(0))
    }

    fn lex_string(&mut self, quote: char, start: usize) -> Result<TokenKind, ParseError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::new(
                        "unterminated string literal",
                        self.span(start, self.pos),
                    ))
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\'') => out.push('\''),
                    Some('\\') => out.push('\\'),
                    Some(other) => out.push(other),
                    None => {
                        return Err(ParseError::new(
                            "unterminated string literal",
                            self.span(start, self.pos),
                        ))
                    }
                },
                Some(c) => out.push(c),
            }
        }
        Ok(TokenKind::Str(out))
    }

    fn lex_backtick(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::new(
                        "unterminated backtick identifier",
                        self.span(start, self.pos),
                    ))
                }
                Some('`') => break,
                Some(c) => out.push(c),
            }
        }
        Ok(TokenKind::BacktickIdent(out))
    }

    fn lex_ident(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        keyword(&text).unwrap_or(TokenKind::Ident(text))
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(c) = self.peek() else {
                out.push(Token {
                    kind: TokenKind::Eof,
                    span: self.span(start, start),
                });
                break;
            };

            if c == '\n' {
                self.pos += 1;
                if self.next_line_starts_with_pipe(self.pos) {
                    // Swallowed: expression continuation across lines.
                    continue;
                }
                out.push(Token {
                    kind: TokenKind::Newline,
                    span: self.span(start, self.pos),
                });
                continue;
            }

            if c.is_ascii_digit() {
                let kind = self.lex_number(start);
                out.push(Token {
                    kind,
                    span: self.span(start, self.pos),
                });
                continue;
            }

            if c == '"' || c == '\'' {
                self.pos += 1;
                let kind = self.lex_string(c, start)?;
                out.push(Token {
                    kind,
                    span: self.span(start, self.pos),
                });
                continue;
            }

            if c == '`' {
                self.pos += 1;
                let kind = self.lex_backtick(start)?;
                out.push(Token {
                    kind,
                    span: self.span(start, self.pos),
                });
                continue;
            }

            if c == '$' {
                self.pos += 1;
                let name_start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '.') {
                    self.pos += 1;
                }
                let name: String = self.chars[name_start..self.pos].iter().collect();
                out.push(Token {
                    kind: TokenKind::Column(name),
                    span: self.span(start, self.pos),
                });
                continue;
            }

            if c.is_alphabetic() || c == '_' {
                let kind = self.lex_ident(start);
                out.push(Token {
                    kind,
                    span: self.span(start, self.pos),
                });
                continue;
            }

            let kind = self.lex_punct(start)?;
            out.push(Token {
                kind,
                span: self.span(start, self.pos),
            });
        }
        Ok(out)
    }

    fn lex_punct(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let c = self.bump().unwrap();
        Ok(match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            '\\' => TokenKind::Backslash,
            '&' => TokenKind::Amp,
            '!' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokenKind::Ne
                } else {
                    TokenKind::Bang
                }
            }
            '+' => TokenKind::Plus,
            '-' => {
                if self.peek() == Some('>') {
                    self.pos += 1;
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '|' => {
                if self.peek() == Some('>') {
                    self.pos += 1;
                    TokenKind::Pipe
                } else {
                    TokenKind::Bar
                }
            }
            '?' => {
                if self.peek() == Some('|') && self.peek_at(1) == Some('>') {
                    self.pos += 2;
                    TokenKind::PipeUnconditional
                } else {
                    return Err(ParseError::new("unexpected '?'", self.span(start, self.pos)));
                }
            }
            ':' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokenKind::ColonEq
                } else {
                    TokenKind::Colon
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_at(1) == Some('.') {
                    self.pos += 2;
                    return Ok(TokenKind::Ellipsis);
                }
                match self.peek() {
                    Some('+') => {
                        self.pos += 1;
                        TokenKind::DotPlus
                    }
                    Some('-') => {
                        self.pos += 1;
                        TokenKind::DotMinus
                    }
                    Some('*') => {
                        self.pos += 1;
                        TokenKind::DotStar
                    }
                    Some('/') => {
                        self.pos += 1;
                        TokenKind::DotSlash
                    }
                    Some('%') => {
                        self.pos += 1;
                        TokenKind::DotPercent
                    }
                    Some('&') => {
                        self.pos += 1;
                        TokenKind::DotAmp
                    }
                    Some('|') => {
                        self.pos += 1;
                        TokenKind::DotBar
                    }
                    Some('=') if self.peek_at(1) == Some('=') => {
                        self.pos += 2;
                        TokenKind::DotEqEq
                    }
                    Some('!') if self.peek_at(1) == Some('=') => {
                        self.pos += 2;
                        TokenKind::DotNe
                    }
                    Some('<') if self.peek_at(1) == Some('=') => {
                        self.pos += 2;
                        TokenKind::DotLe
                    }
                    Some('<') => {
                        self.pos += 1;
                        TokenKind::DotLt
                    }
                    Some('>') if self.peek_at(1) == Some('=') => {
                        self.pos += 2;
                        TokenKind::DotGe
                    }
                    Some('>') => {
                        self.pos += 1;
                        TokenKind::DotGt
                    }
                    _ => TokenKind::Dot,
                }
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{other}'"),
                    self.span(start, self.pos),
                ))
            }
        })
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn float_takes_precedence_over_int() {
        assert_eq!(kinds("3.14"), vec![TokenKind::Float(3.14), TokenKind::Eof]);
    }

    #[test]
    fn int_without_dot() {
        assert_eq!(kinds("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn dotted_broadcast_operators() {
        assert_eq!(
            kinds(".+ .== .&"),
            vec![
                TokenKind::DotPlus,
                TokenKind::DotEqEq,
                TokenKind::DotAmp,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn column_reference() {
        assert_eq!(
            kinds("$age"),
            vec![TokenKind::Column("age".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn newline_swallowed_before_pipe_continuation() {
        let toks = kinds("5\n|> f()");
        assert!(!toks.contains(&TokenKind::Newline));
    }

    #[test]
    fn newline_kept_without_pipe_continuation() {
        let toks = kinds("x = 1\ny = 2");
        assert!(toks.contains(&TokenKind::Newline));
    }

    #[test]
    fn unconditional_pipe_continuation_also_swallows_newline() {
        let toks = kinds("5\n?|> f()");
        assert!(!toks.contains(&TokenKind::Newline));
    }

    #[test]
    fn backtick_identifier_allows_arbitrary_characters() {
        assert_eq!(
            kinds("`weird name!`"),
            vec![
                TokenKind::BacktickIdent("weird name!".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn line_comment_to_end_of_line() {
        assert_eq!(
            kinds("1 -- comment\n2"),
            vec![TokenKind::Int(1), TokenKind::Newline, TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn semicolon_is_its_own_token() {
        assert_eq!(
            kinds("1;2"),
            vec![TokenKind::Int(1), TokenKind::Semicolon, TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\"c""#),
            vec![TokenKind::Str("a\nb\"c".to_string()), TokenKind::Eof]
        );
    }
}
