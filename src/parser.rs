/*!
Recursive‑descent parser turning Hey tokens into the evaluator's node tree.

Grammar (PEG‑ish, whitespace separates, `;` starts a comment)
------------------------------------------------------------

```text
program   → prog EOF ;
prog      → def* expr ;
def       → "def" IDENT ":"? prog ;               (a def body is its own scope)
expr      → primary call* ;
call      → "(" expr* ")" ;                        ("(" touches the callee)
primary   → NUMBER | STRING | COLOR | BUILTIN | IDENT | function ;
function  → "(" IDENT* ")" "->"? expr ;
```

A `(` that directly follows an expression (no whitespace) is a call; anywhere
else it opens a function literal.  That is what lets `def f (x) x` define a
function while `f(1)` calls it.

Failures carry the offset of the token where the parse could not continue
and the set of constructs that would have been accepted there.

### Logging Policy

| Location            | Level   | Purpose                         |
|---------------------|---------|---------------------------------|
| `parse`             | `info`  | Lifecycle milestones.           |
| `prog`, `function`  | `debug` | Descent into grammar branches.  |
*/

use std::rc::Rc;

use crate::error::{ErrorKind, HeyError, Result};
use crate::scanner::Scanner;
use crate::token::{Token, TokenType};
use crate::value::{Builtin, Color};
use crate::MAX_PARSE_DEPTH;

use log::{debug, info};

/// Byte range `[start, end)` of a node in the program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// The matched substring.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }

    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

/// A node of the parse tree: its kind, children (inside the kind) and where
/// it was matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.text(source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Definitions followed by the expression whose value the scope yields.
    Prog {
        defs: Vec<Definition>,
        result: Box<Node>,
    },

    /// Function literal `(a b) body`.  The body is shared with every
    /// callable created from this literal.
    Function {
        params: Vec<Param>,
        body: Rc<Node>,
    },

    /// A callee followed by one or more argument lists: `f(1)(2 3)`.
    Result {
        callee: Box<Node>,
        calls: Vec<Call>,
    },

    /// Identifier that must already be bound.
    Known(String),

    Builtin(Builtin),

    Number(f64),

    Str(String),

    Color(Color),
}

/// `def name body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub name_span: Span,
    /// Always a `Prog` node.
    pub body: Node,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

/// One parenthesised argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub args: Vec<Node>,
    pub span: Span,
}

/// Scan and parse a whole program.
pub fn parse(source: &str) -> Result<Node> {
    let tokens: Vec<Token<'_>> = Scanner::new(source).collect::<Result<_>>()?;
    Parser::new(&tokens, source).parse()
}

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    source: &'a str,
    current: usize,
    depth: usize, // nested prog/expression rules being parsed
}

impl<'a> Parser<'a> {
    /// `tokens` must end with the scanner's `EOF` token.
    pub fn new(tokens: &'a [Token<'a>], source: &'a str) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            source,
            current: 0,
            depth: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    pub fn parse(&mut self) -> Result<Node> {
        info!("Beginning parse phase");

        let program = self.prog()?;

        if !self.is_at_end() {
            return Err(self.error(&["def", "end of input"]));
        }

        info!("Parse phase completed");

        Ok(program)
    }

    // ───────────────────────── grammar rules ──────────────────────

    fn prog(&mut self) -> Result<Node> {
        self.nested(Self::scope)
    }

    fn scope(&mut self) -> Result<Node> {
        debug!("Entering prog at offset {}", self.peek().offset);

        let mut defs: Vec<Definition> = Vec::new();

        while self.matches(TokenType::DEF) {
            defs.push(self.definition()?);
        }

        if !self.at_expression() {
            return Err(self.error(&["def", "expression"]));
        }

        let result = self.expression()?;

        let start = defs.first().map_or(result.span.start, |d| d.span.start);
        let span = Span::new(start, result.span.end);

        Ok(Node::new(
            NodeKind::Prog {
                defs,
                result: Box::new(result),
            },
            span,
        ))
    }

    fn definition(&mut self) -> Result<Definition> {
        let keyword: &Token<'_> = self.previous();
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, &["identifier"])?;

        self.matches(TokenType::COLON);

        let body = self.prog()?;

        Ok(Definition {
            name: name.lexeme.to_string(),
            name_span: Span::new(name.offset, name.end()),
            span: Span::new(keyword.offset, body.span.end),
            body,
        })
    }

    fn expression(&mut self) -> Result<Node> {
        self.nested(Self::call_chain)
    }

    fn call_chain(&mut self) -> Result<Node> {
        let callee = self.primary()?;

        let mut calls: Vec<Call> = Vec::new();
        let mut end = callee.span.end;

        while self.check(TokenType::LEFT_PAREN) && self.peek().offset == end {
            let open: &Token<'_> = self.advance();
            let args = self.arguments()?;
            let close: &Token<'_> = self.consume(TokenType::RIGHT_PAREN, &["expression", "')'"])?;

            end = close.end();
            calls.push(Call {
                args,
                span: Span::new(open.offset, end),
            });
        }

        if calls.is_empty() {
            return Ok(callee);
        }

        let span = Span::new(callee.span.start, end);

        Ok(Node::new(
            NodeKind::Result {
                callee: Box::new(callee),
                calls,
            },
            span,
        ))
    }

    fn arguments(&mut self) -> Result<Vec<Node>> {
        let mut args: Vec<Node> = Vec::new();

        while self.at_expression() {
            args.push(self.expression()?);
        }

        Ok(args)
    }

    fn primary(&mut self) -> Result<Node> {
        let token: &Token<'_> = self.peek();
        let span = Span::new(token.offset, token.end());

        let kind = match &token.token_type {
            TokenType::NUMBER(n) => NodeKind::Number(*n),
            TokenType::STRING(s) => NodeKind::Str(s.clone()),
            TokenType::COLOR(c) => NodeKind::Color(*c),
            TokenType::BUILTIN(b) => NodeKind::Builtin(*b),
            TokenType::IDENTIFIER => NodeKind::Known(token.lexeme.to_string()),
            TokenType::LEFT_PAREN => {
                self.advance();
                return self.function();
            }
            _ => return Err(self.error(&["expression"])),
        };

        self.advance();

        Ok(Node::new(kind, span))
    }

    fn function(&mut self) -> Result<Node> {
        let open: &Token<'_> = self.previous();

        debug!("Entering function literal at offset {}", open.offset);

        let mut params: Vec<Param> = Vec::new();

        while self.check(TokenType::IDENTIFIER) {
            let name: &Token<'_> = self.advance();
            params.push(Param {
                name: name.lexeme.to_string(),
                span: Span::new(name.offset, name.end()),
            });
        }

        self.consume(TokenType::RIGHT_PAREN, &["identifier", "')'"])?;

        self.matches(TokenType::ARROW);

        let body = self.expression()?;
        let span = Span::new(open.offset, body.span.end);

        Ok(Node::new(
            NodeKind::Function {
                params,
                body: Rc::new(body),
            },
            span,
        ))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Run `rule` one nesting level deeper, refusing past `MAX_PARSE_DEPTH`.
    fn nested<T>(&mut self, rule: fn(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_PARSE_DEPTH {
            let token: &Token<'_> = self.peek();

            debug!("Nesting limit reached at offset {}", token.offset);

            return Err(HeyError::depth(
                self.source,
                token.offset,
                ErrorKind::Parse,
                MAX_PARSE_DEPTH,
            ));
        }

        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;

        result
    }

    /// Can the current token start an expression?
    fn at_expression(&self) -> bool {
        matches!(
            self.peek().token_type,
            TokenType::NUMBER(_)
                | TokenType::STRING(_)
                | TokenType::COLOR(_)
                | TokenType::BUILTIN(_)
                | TokenType::IDENTIFIER
                | TokenType::LEFT_PAREN
        )
    }

    /// Failure at the current token.
    fn error(&self, rules: &[&str]) -> HeyError {
        let token: &Token<'_> = self.peek();

        debug!(
            "Parse failure at offset {}: expected {:?}, found {}",
            token.offset,
            rules,
            token.token_type.name()
        );

        if matches!(token.token_type, TokenType::EOF) {
            HeyError::parse(self.source, token.offset, rules, Some(&"end of input"))
        } else {
            HeyError::parse(self.source, token.offset, rules, Some(&token.lexeme))
        }
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, rules: &[&str]) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error(rules))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current - 1]
    }
}
