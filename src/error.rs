//! Centralised error hierarchy for the **Hey interpreter**.
//!
//! Every failure a Hey program can provoke (lexing, parsing, or a built‑in
//! rejecting its arguments) is reported as one [`HeyError`].  The error is
//! anchored to a *position* in the program text: callers hand over the source
//! and the byte offset of the offending construct, and the constructor derives
//! the 1‑based `line`/`col` pair the editor needs to place its marker.
//!
//! The module **does not** print diagnostics itself.
//!
//! Internal invariant violations (e.g. popping the global frame) are *not*
//! represented here; they panic, because they indicate a driver bug rather
//! than a problem in the user's program.

use std::fmt::Display;

use log::info;
use memchr::memchr2_iter;
use serde::Serialize;
use thiserror::Error;

/// Which rule the program broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A numeric argument was expected.
    Number,

    /// A color from the palette was expected.
    Color,

    /// A bound identifier was expected (or, for `unknown`, an unbound one).
    Identifier,

    /// A sequence was expected.
    Data,

    /// The callee is neither a function nor a sequence.
    Call,

    /// A callable received the wrong number of arguments.
    Arity,

    /// `def` tried to rebind a name in the same scope.
    AlreadyDefined,

    /// The evaluation was cancelled by the host.
    Interruption,

    /// The program text does not match the grammar.
    Parse,

    /// A shape operand was expected.
    Shape,

    /// A vector operand was expected.
    Vector,

    /// Calls or scopes nested deeper than [`crate::MAX_EVAL_DEPTH`].
    Depth,
}

/// A position‑aware evaluation or parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("[line {line}, col {col}] Error: {message}")]
pub struct HeyError {
    pub kind: ErrorKind,

    /// 1‑based line of the offending construct.
    pub line: usize,

    /// 1‑based column (in characters) of the offending construct.
    pub col: usize,

    /// `expected <construct>, got <token or value>`.
    pub message: String,
}

impl HeyError {
    /// Build an error pointing at `pos` in `source`.
    ///
    /// When `got` is `None` the character found at `pos` is reported instead.
    pub fn at(
        source: &str,
        pos: usize,
        kind: ErrorKind,
        expected: impl Display,
        got: Option<&dyn Display>,
    ) -> Self {
        let (line, col, tok) = line_col(source, pos);

        let message = match got {
            Some(symbol) => format!("expected {}, got {}", expected, symbol),
            None => format!("expected {}, got {}", expected, tok),
        };

        info!(
            "Creating {:?} error: line={}, col={}, msg={}",
            kind, line, col, message
        );

        HeyError {
            kind,
            line,
            col,
            message,
        }
    }

    pub fn number(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Number, "number", Some(&symbol))
    }

    /// A number was supplied but it cannot serve as a count or an index.
    pub fn integer(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Number, "integer", Some(&symbol))
    }

    pub fn color(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Color, "color", Some(&symbol))
    }

    pub fn identifier(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Identifier, "identifier", Some(&symbol))
    }

    pub fn unbound(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(
            source,
            pos,
            ErrorKind::Identifier,
            "unbound identifier",
            Some(&symbol),
        )
    }

    pub fn data(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Data, "data", Some(&symbol))
    }

    pub fn index(source: &str, pos: usize, len: usize, index: impl Display) -> Self {
        Self::at(
            source,
            pos,
            ErrorKind::Data,
            format!("index between 1 and {}", len),
            Some(&index),
        )
    }

    pub fn call(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Call, "function or data", Some(&symbol))
    }

    /// `expected` is already rendered, e.g. `2` or `2-3` or `at least 1`.
    pub fn arity(source: &str, pos: usize, expected: impl Display, actual: usize) -> Self {
        Self::at(
            source,
            pos,
            ErrorKind::Arity,
            format!("{} argument(s)", expected),
            Some(&actual),
        )
    }

    pub fn already_defined(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(
            source,
            pos,
            ErrorKind::AlreadyDefined,
            "new identifier",
            Some(&symbol),
        )
    }

    pub fn interruption(source: &str, pos: usize) -> Self {
        Self::at(
            source,
            pos,
            ErrorKind::Interruption,
            "completion",
            Some(&"interruption"),
        )
    }

    pub fn shape(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Shape, "shape", Some(&symbol))
    }

    pub fn vector(source: &str, pos: usize, symbol: impl Display) -> Self {
        Self::at(source, pos, ErrorKind::Vector, "vector", Some(&symbol))
    }

    /// Nesting went past `limit`.  `kind` is [`ErrorKind::Parse`] when the
    /// parser gave up and [`ErrorKind::Depth`] when the evaluator did.
    pub fn depth(source: &str, pos: usize, kind: ErrorKind, limit: usize) -> Self {
        Self::at(
            source,
            pos,
            kind,
            format!("at most {} nested levels", limit),
            Some(&"deeper nesting"),
        )
    }

    /// Grammar failure at the rightmost position reached by the parser.
    /// `rules` are the constructs that were still being attempted there.
    pub fn parse(source: &str, pos: usize, rules: &[&str], got: Option<&dyn Display>) -> Self {
        Self::at(source, pos, ErrorKind::Parse, rules.join(" or "), got)
    }
}

/// Map a byte offset to `(line, col, token)`.
///
/// The text considered runs up to *and including* the character at `pos`;
/// `\r\n`, `\r` and `\n` each count as one line terminator.  `token` is that
/// last character.  Offsets past the end are clamped to the end.
pub fn line_col(source: &str, pos: usize) -> (usize, usize, &str) {
    let end = match source.get(pos..).and_then(|rest| rest.chars().next()) {
        Some(c) => pos + c.len_utf8(),
        None => source.len().min(pos),
    };

    let sofar = &source[..end];
    let bytes = sofar.as_bytes();

    let mut line = 1;
    let mut line_start = 0;

    for i in memchr2_iter(b'\r', b'\n', bytes) {
        line_start = i + 1;

        // second half of a "\r\n" pair
        if bytes[i] == b'\n' && i > 0 && bytes[i - 1] == b'\r' {
            continue;
        }

        line += 1;
    }

    let col = sofar[line_start..].chars().count().max(1);

    let tok = sofar
        .char_indices()
        .next_back()
        .map(|(i, _)| &sofar[i..])
        .unwrap_or("");

    (line, col, tok)
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, HeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_character_is_line_one_col_one() {
        assert_eq!(line_col("abc", 0), (1, 1, "a"));
    }

    #[test]
    fn counts_every_terminator_style_once() {
        let source = "a\r\nb\rc\nd";
        assert_eq!(line_col(source, 3), (2, 1, "b"));
        assert_eq!(line_col(source, 5), (3, 1, "c"));
        assert_eq!(line_col(source, 7), (4, 1, "d"));
    }

    #[test]
    fn column_counts_characters_not_bytes() {
        let source = "ééx";
        assert_eq!(line_col(source, 4), (1, 3, "x"));
    }

    #[test]
    fn offset_past_end_is_clamped() {
        assert_eq!(line_col("ab", 10), (1, 2, "b"));
    }

    #[test]
    fn message_uses_found_character_when_no_symbol_given() {
        let err = HeyError::at("def x 1\nx(", 8, ErrorKind::Call, "function or data", None);
        assert_eq!(err.message, "expected function or data, got x");
        assert_eq!((err.line, err.col), (2, 1));
    }

    #[test]
    fn arity_message() {
        let err = HeyError::arity("a(2)", 0, 2, 1);
        assert_eq!(err.kind, ErrorKind::Arity);
        assert_eq!(err.message, "expected 2 argument(s), got 1");
        assert_eq!(err.to_string(), "[line 1, col 1] Error: expected 2 argument(s), got 1");
    }
}
