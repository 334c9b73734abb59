use log::debug;
use serde::Serialize;
use std::fmt;
use std::mem;

use crate::value::{Builtin, Color};

/// The different kinds of tokens recognized by the Hey scanner.
///
/// Punctuation and `def` carry no data.  `NUMBER`, `STRING`, `COLOR` and
/// `BUILTIN` carry their decoded literal.  `IDENTIFIER` is used for
/// user‑defined names.  `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// ':'
    COLON,

    /// '->'
    ARROW,

    /// 'def'
    DEF,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A palette color such as `green`
    COLOR(Color),

    /// A built‑in operation name such as `range` or `c`
    BUILTIN(Builtin),

    /// A string literal (contents without quotes, `""` already unescaped)
    STRING(String),

    /// A numeric literal, sign included
    NUMBER(f64),

    /// End‑of‑file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data).
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl TokenType {
    /// Name used when a token appears in a diagnostic or in `tokenize` output.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::COLON => "COLON",
            TokenType::ARROW => "ARROW",
            TokenType::DEF => "DEF",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::COLOR(_) => "COLOR",
            TokenType::BUILTIN(_) => "BUILTIN",
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::EOF => "EOF",
        }
    }
}

/// A scanned token, including its type, the original lexeme,
/// and where it was found.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// Byte offset of the first character of `lexeme`.
    pub offset: usize,

    /// 1‑based line number in the source.
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(token_type: TokenType, lexeme: &'a str, offset: usize, line: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, offset={}, line={}",
            token_type, lexeme, offset, line
        );

        Self {
            token_type,
            lexeme,
            offset,
            line,
        }
    }

    /// Byte offset one past the last character of `lexeme`.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.lexeme.len()
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ── literal column: decoded payload or "null" ──────────────────────
        let literal: String = match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::NUMBER(n) => {
                // 3 → "3.0", 3.14 → "3.14"
                if n.fract() == 0.0 {
                    let mut buf = itoa::Buffer::new();
                    format!("{}.0", buf.format(*n as i64))
                } else {
                    n.to_string()
                }
            }
            TokenType::COLOR(c) => c.to_string(),
            TokenType::BUILTIN(b) => b.name().to_string(),
            _ => "null".to_string(),
        };

        write!(f, "{} {} {}", self.token_type.name(), self.lexeme, literal)
    }
}
