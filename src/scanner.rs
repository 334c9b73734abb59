//! Module `scanner` implements a one‑pass, streaming lexer for the Hey language.
//!
//! It transforms a `&str` into a sequence of `Token<'a>`s, skipping whitespace
//! and `;` comments, and emitting exactly one `EOF` token at the end. Designed
//! as a `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Token Recognition
//!
//! - Punctuators: `(`, `)`, `:`, and the arrow `->`.
//! - Numbers: an optional `+`/`-` sign glued to the digits, optional fraction.
//! - Strings: `"` … `"`, where `""` stands for one literal quote.
//! - Words: `[A-Za-z_][A-Za-z0-9_-]*`, resolved via a perfect‑hash `KEYWORDS`
//!   map into `def`, palette colors, built‑in names, or `IDENTIFIER`.
//!   `red-2` is an identifier: keywords only match whole words.
//! - Errors: any unexpected character yields an `ErrorKind::Parse` [`HeyError`]
//!   positioned on that character.
//!
//! Every token carries its byte offset so the parser can build spans and the
//! error model can map them back to line/column.

use crate::error::{HeyError, Result};
use crate::token::{Token, TokenType};
use crate::value::{Builtin, Color};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "def"           => TokenType::DEF,

    "green"         => TokenType::COLOR(Color::Green),
    "blue"          => TokenType::COLOR(Color::Blue),
    "yellow"        => TokenType::COLOR(Color::Yellow),
    "red"           => TokenType::COLOR(Color::Red),
    "purple"        => TokenType::COLOR(Color::Purple),
    "grey"          => TokenType::COLOR(Color::Grey),
    "black"         => TokenType::COLOR(Color::Black),
    "white"         => TokenType::COLOR(Color::White),
    "orange"        => TokenType::COLOR(Color::Orange),

    "range"         => TokenType::BUILTIN(Builtin::Range),
    "square"        => TokenType::BUILTIN(Builtin::Square),
    "parallelogram" => TokenType::BUILTIN(Builtin::Parallelogram),
    "merge"         => TokenType::BUILTIN(Builtin::Merge),
    "vector"        => TokenType::BUILTIN(Builtin::Vector),
    "concat"        => TokenType::BUILTIN(Builtin::Concat),
    "c"             => TokenType::BUILTIN(Builtin::Concat),
    "repeat"        => TokenType::BUILTIN(Builtin::Repeat),
    "r"             => TokenType::BUILTIN(Builtin::Repeat),
    "slice"         => TokenType::BUILTIN(Builtin::Slice),
    "s"             => TokenType::BUILTIN(Builtin::Slice),
    "length"        => TokenType::BUILTIN(Builtin::Length),
    "ada-lovelace"  => TokenType::BUILTIN(Builtin::AdaLovelace),
};

/// A single pass **scanner / lexer** that converts Hey source text into a
/// sequence of [`Token`]s.  The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source.
pub struct Scanner<'a> {
    src: &'a str,               // entire program text
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src.as_bytes()[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src.as_bytes()[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src.as_bytes()[self.curr + 1]
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── punctuators ───────────────────────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b':' => self.pending = Some(TokenType::COLON),

            // ── "->" or a signed number ──────────────────────────────────
            b'-' if self.peek() == b'>' => {
                self.advance();
                self.pending = Some(TokenType::ARROW);
            }

            b'-' | b'+' if self.peek().is_ascii_digit() => {
                self.parse_number();
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(());
            }

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            // ── comments (; … until newline) ─────────────────────────────
            b';' => {
                if let Some(pos) = memchr(b'\n', &self.src.as_bytes()[self.curr..]) {
                    self.curr += pos;
                } else {
                    self.curr = self.len();
                }

                return Ok(());
            }

            b'"' => {
                return self.parse_string();
            }

            b'0'..=b'9' => {
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_word();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // keep `curr` on a char boundary for multi‑byte input
                let ch = self.src[self.start..].chars().next().unwrap_or('\0');
                self.curr = self.start + ch.len_utf8();

                debug!("Unexpected character {:?} at offset {}", ch, self.start);

                return Err(HeyError::parse(self.src, self.start, &["token"], Some(&ch)));
            }
        }

        Ok(())
    }

    /// Parse a double‑quoted string literal; `""` inside is one quote.
    fn parse_string(&mut self) -> Result<()> {
        let mut value = String::new();
        let mut chunk_start = self.curr;

        loop {
            if self.is_at_end() {
                return Err(HeyError::parse(
                    self.src,
                    self.len(),
                    &["'\"'"],
                    Some(&"end of input"),
                ));
            }

            match self.peek() {
                b'"' if self.peek_next() == b'"' => {
                    value.push_str(&self.src[chunk_start..self.curr]);
                    value.push('"');
                    self.curr += 2;
                    chunk_start = self.curr;
                }

                b'"' => break,

                b'\n' => {
                    self.line += 1;
                    self.curr += 1;
                }

                _ => self.curr += 1,
            }
        }

        value.push_str(&self.src[chunk_start..self.curr]);
        self.advance(); // closing quote

        self.pending = Some(TokenType::STRING(value));

        Ok(())
    }

    /// Parse a numeric literal (`12`, `-3`, `2.5`).  Any sign was already
    /// consumed by the caller.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self.src[self.start..self.curr].parse().unwrap_or(0.0); // digits checked above
        self.pending = Some(TokenType::NUMBER(n));
    }

    /// Parse a word and decide whether it is a keyword or an `IDENTIFIER`.
    fn parse_word(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_' || (c == b'-' && self.peek_next() != b'>')
        } {
            self.advance();
        }

        let word = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(word)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.len(), self.line)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lex: &'a str = &self.src[self.start..self.curr];

                return Some(Ok(Token::new(tt, lex, self.start, self.line)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
