//! Hand-rolled character-stream tokenizer.
//!
//! Most grammar positions are context-free, but two are not: a node's
//! property list reads as structured key/value tokens in MATCH but as one
//! verbatim JSON blob in CREATE, and a JSON path needs `.` to split segments
//! while a kind name needs it to stay part of one. Rather than have the
//! lexer guess which position it is in, the parser drives it explicitly via
//! [`Lexer::set_mode`] and [`Lexer::capture_json_block`].

use crate::error::{ParseError, Result};
use crate::token::{Span, Token, TokenKind};

/// Scanning mode for identifier-shaped runs. The parser sets this before
/// asking for the next token and resets it to `Normal` once the token has
/// been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// Keywords, punctuation, operators, plain `[A-Za-z_][A-Za-z0-9_]*` idents.
    Normal,
    /// Scanning a resource kind name: `.`, `/`, `-` and quoted segments stay
    /// part of the same token.
    Kind,
    /// Scanning one segment of a JSON path: `.`, `/`, `-` stay part of the
    /// segment; an unescaped `.` is left unconsumed so the next call emits
    /// `Dot`. `\.` is consumed and unescaped to a literal `.`.
    PropertyPath,
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    mode: LexMode,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            mode: LexMode::Normal,
        }
    }

    pub fn set_mode(&mut self, mode: LexMode) {
        self.mode = mode;
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn here(&self) -> Span {
        Span {
            start: self.pos,
            end: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    fn span_from(&self, start: Span) -> Span {
        Span {
            start: start.start,
            end: self.pos,
            line: start.line,
            col: start.col,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_ident_continue(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    /// Reads a plain `[A-Za-z_][A-Za-z0-9_]*` run (keywords and variable names).
    fn read_plain_ident(&mut self) -> String {
        let mut buf = String::new();
        while let Some(c) = self.peek() {
            if Self::is_ident_continue(c) {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
        buf
    }

    /// Reads a composite name: a plain identifier run, optionally extended
    /// across `/`, `-`, quoted segments, and — in `Kind` mode only — `.`.
    /// In `PropertyPath` mode an unescaped `.` stops the scan; `\.` unescapes
    /// to a literal `.` and continues.
    fn read_composite(&mut self) -> String {
        let mut buf = String::new();
        loop {
            match self.peek() {
                Some(c) if Self::is_ident_continue(c) || c == '-' => {
                    buf.push(c);
                    self.advance();
                }
                Some('/') => {
                    buf.push('/');
                    self.advance();
                }
                Some('.') if self.mode == LexMode::Kind => {
                    buf.push('.');
                    self.advance();
                }
                Some('\\') if self.peek_at(1) == Some('.') => {
                    buf.push('.');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == '"' {
                            self.advance();
                            break;
                        }
                        buf.push(c);
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        buf
    }

    fn read_string(&mut self, start: Span) -> Result<Token> {
        let mut raw = String::from("\"");
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::UnterminatedString {
                        span: self.span_from(start),
                    });
                }
                Some('"') => {
                    raw.push('"');
                    self.advance();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.advance();
                    if let Some(escaped) = self.peek() {
                        raw.push(escaped);
                        self.advance();
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::String, raw, self.span_from(start)))
    }

    fn read_number(&mut self, start: Span) -> Result<Token> {
        let mut buf = String::new();
        if self.peek() == Some('-') {
            buf.push('-');
            self.advance();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            buf.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    buf.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            buf.push(self.advance().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                buf.push(self.advance().unwrap());
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    buf.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let kind = if is_float {
            TokenKind::Number
        } else {
            TokenKind::Int
        };
        Ok(Token::new(kind, buf, self.span_from(start)))
    }

    /// Called by the parser right after it has consumed the `LBrace` token
    /// that opens a CREATE node's property map (or any other JSON-valued
    /// position). The opening brace is already behind the lexer's cursor, so
    /// this resumes from depth 1 and reconstructs it in the returned literal.
    /// Consumes a balanced, string-aware run of braces and returns the whole
    /// document verbatim as a single `JsonData` token; the parser hands the
    /// literal to `serde_json`.
    pub fn capture_json_block(&mut self) -> Result<Token> {
        let start = self.here();
        let mut buf = String::from("{");
        let mut depth = 1i32;
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::UnterminatedJson {
                        span: self.span_from(start),
                    });
                }
                Some('{') => {
                    depth += 1;
                    buf.push('{');
                    self.advance();
                }
                Some('}') => {
                    depth -= 1;
                    buf.push('}');
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                Some('"') => {
                    buf.push('"');
                    self.advance();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(ParseError::UnterminatedJson {
                                    span: self.span_from(start),
                                });
                            }
                            Some('\\') => {
                                buf.push('\\');
                                self.advance();
                                if let Some(escaped) = self.peek() {
                                    buf.push(escaped);
                                    self.advance();
                                }
                            }
                            Some('"') => {
                                buf.push('"');
                                self.advance();
                                break;
                            }
                            Some(c) => {
                                buf.push(c);
                                self.advance();
                            }
                        }
                    }
                }
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(
            TokenKind::JsonData,
            buf,
            self.span_from(start),
        ))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let start = self.here();
        let mode = self.mode;
        self.mode = LexMode::Normal;

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", start));
        };

        if ch == '"' {
            return self.read_string(start);
        }

        if ch.is_ascii_digit() || (ch == '-' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) && mode != LexMode::PropertyPath)
        {
            return self.read_number(start);
        }

        if Self::is_ident_start(ch) {
            let word = if mode == LexMode::Normal {
                self.read_plain_ident()
            } else {
                self.read_composite()
            };
            if mode == LexMode::Normal {
                if let Some(kw) = TokenKind::keyword_from_str(&word) {
                    return Ok(Token::new(kw, word, self.span_from(start)));
                }
            }
            return Ok(Token::new(TokenKind::Ident, word, self.span_from(start)));
        }

        if ch == '.' && mode == LexMode::PropertyPath {
            self.advance();
            return Ok(Token::new(TokenKind::Dot, ".", self.span_from(start)));
        }

        match ch {
            '(' => {
                self.advance();
                Ok(Token::new(TokenKind::LParen, "(", self.span_from(start)))
            }
            ')' => {
                self.advance();
                Ok(Token::new(TokenKind::RParen, ")", self.span_from(start)))
            }
            '{' => {
                self.advance();
                Ok(Token::new(TokenKind::LBrace, "{", self.span_from(start)))
            }
            '}' => {
                self.advance();
                Ok(Token::new(TokenKind::RBrace, "}", self.span_from(start)))
            }
            ',' => {
                self.advance();
                Ok(Token::new(TokenKind::Comma, ",", self.span_from(start)))
            }
            '.' => {
                self.advance();
                Ok(Token::new(TokenKind::Dot, ".", self.span_from(start)))
            }
            ':' => {
                self.advance();
                Ok(Token::new(TokenKind::Colon, ":", self.span_from(start)))
            }
            '+' => {
                self.advance();
                Ok(Token::new(TokenKind::Plus, "+", self.span_from(start)))
            }
            '*' => {
                self.advance();
                Ok(Token::new(TokenKind::Star, "*", self.span_from(start)))
            }
            '[' => {
                self.advance();
                Ok(Token::new(TokenKind::LBracket, "[", self.span_from(start)))
            }
            ']' => {
                self.advance();
                if self.peek() == Some('-') {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        return Ok(Token::new(
                            TokenKind::ArrowCloseRight,
                            "]->",
                            self.span_from(start),
                        ));
                    }
                    return Ok(Token::new(
                        TokenKind::ArrowCloseUndir,
                        "]-",
                        self.span_from(start),
                    ));
                }
                Ok(Token::new(TokenKind::RBracket, "]", self.span_from(start)))
            }
            '-' => {
                self.advance();
                match self.peek() {
                    Some('>') => {
                        self.advance();
                        Ok(Token::new(TokenKind::ArrowRight, "->", self.span_from(start)))
                    }
                    Some('-') => {
                        self.advance();
                        Ok(Token::new(TokenKind::ArrowBoth, "--", self.span_from(start)))
                    }
                    Some('[') => {
                        self.advance();
                        Ok(Token::new(
                            TokenKind::ArrowOpenRight,
                            "-[",
                            self.span_from(start),
                        ))
                    }
                    _ => Ok(Token::new(TokenKind::Minus, "-", self.span_from(start))),
                }
            }
            '<' => {
                self.advance();
                if self.peek() == Some('-') {
                    self.advance();
                    if self.peek() == Some('[') {
                        self.advance();
                        return Ok(Token::new(
                            TokenKind::ArrowOpenLeft,
                            "<-[",
                            self.span_from(start),
                        ));
                    }
                    return Ok(Token::new(TokenKind::ArrowLeft, "<-", self.span_from(start)));
                }
                if self.peek() == Some('=') {
                    self.advance();
                    return Ok(Token::new(TokenKind::Lte, "<=", self.span_from(start)));
                }
                Ok(Token::new(TokenKind::Lt, "<", self.span_from(start)))
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    return Ok(Token::new(TokenKind::Gte, ">=", self.span_from(start)));
                }
                Ok(Token::new(TokenKind::Gt, ">", self.span_from(start)))
            }
            '=' => {
                self.advance();
                if self.peek() == Some('~') {
                    self.advance();
                    return Ok(Token::new(TokenKind::RegexEq, "=~", self.span_from(start)));
                }
                Ok(Token::new(TokenKind::Eq, "=", self.span_from(start)))
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    return Ok(Token::new(TokenKind::Neq, "!=", self.span_from(start)));
                }
                Err(ParseError::IllegalChar {
                    found: '!',
                    span: self.span_from(start),
                })
            }
            other => {
                self.advance();
                Err(ParseError::IllegalChar {
                    found: other,
                    span: self.span_from(start),
                })
            }
        }
    }
}
