pub mod actions;
pub mod ast_printer;
pub mod bernoulli;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod shape;
pub mod token;
pub mod value;

/// Deepest nesting of expressions and `def` scopes the parser accepts.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Deepest nesting of scopes and calls the evaluator follows before failing
/// with [`ErrorKind::Depth`].  Bounds native stack use, so runaway recursion
/// in a Hey program surfaces as an error.
pub const MAX_EVAL_DEPTH: usize = 128;

pub use actions::{CancelHandle, CHECKPOINT_INTERVAL};
pub use error::{ErrorKind, HeyError, Result};
pub use interpreter::Interpreter;
pub use value::Value;
