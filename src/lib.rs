//! minischeme - a small Scheme interpreter over shared, mutable cons pairs
//!
//! This crate reads one Scheme expression, builds a tree of cons pairs from it, and
//! evaluates that tree against a lexically scoped environment. The result is rendered
//! back to the same concrete syntax the reader accepts.
//!
//! ```scheme
//! (+ 1 2 3)                          ; => 6
//! (if #f 1)                          ; => ()
//! (cons 1 2)                         ; => (1 . 2)
//! ((lambda (x y) (* x y)) 6 7)       ; => 42
//! ```
//!
//! ## Pipeline
//!
//! text -> [`scheme::tokenizer::Tokenizer`] -> [`scheme::read`] -> [`ast::Term`]
//! -> [`evaluator::eval`] (consulting [`evaluator::environment::ScopeChain`]) -> [`ast::Term::serialize`]
//!
//! The [`Interpreter`] wires these stages together and keeps a persistent global scope,
//! so state defined by one [`Interpreter::run`] call is visible to the next one.
//!
//! ## Semantics worth knowing
//!
//! - Pairs are shared by reference: `set-car!`/`set-cdr!` are visible through every alias.
//! - Every value except `#f` is truthy.
//! - Numbers are signed 64-bit integers; overflow and division by zero are runtime errors.
//! - Closures see their defining environment first, then (by default) the caller's
//!   environment. See [`evaluator::Scoping`].
//!
//! ## Modules
//!
//! - `ast`: the term model and its serializer
//! - `scheme`: tokenizer and reader
//! - `evaluator`: evaluation, special forms and the environment model
//! - `builtinops`: the primitive procedure library
//! - `interpreter`: the `run(program) -> text` entry point

use crate::builtinops::Arity;

/// Default maximum list nesting accepted by the reader.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Default maximum evaluator recursion depth. Deeper programs fail with a
/// [`Error::RuntimeError`] instead of exhausting the host stack.
///
/// Each level of user recursion costs about three evaluator levels (the application,
/// its argument and the closure body), so the default admits roughly 85 nested calls.
/// Raise [`InterpreterConfig::max_eval_depth`] together with the thread's stack size.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Broad error categories, for callers that only care about the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed token or grammar at read time
    Syntax,
    /// Semantic violation during evaluation (types, arity, bounds, non-procedure calls)
    Runtime,
    /// Unresolved symbol
    Name,
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("SyntaxError: {0}")]
    SyntaxError(String),
    #[error("RuntimeError: {0}")]
    RuntimeError(String),
    /// Wrong number of arguments; a runtime error
    #[error("RuntimeError: invalid arguments count: expected {expected}, got {got}")]
    InvalidArgsCount { expected: Arity, got: usize },
    #[error("NameError: {0}")]
    NameError(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SyntaxError(_) => ErrorKind::Syntax,
            Error::RuntimeError(_) | Error::InvalidArgsCount { .. } => ErrorKind::Runtime,
            Error::NameError(_) => ErrorKind::Name,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Error::SyntaxError(message.into())
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Error::RuntimeError(message.into())
    }

    pub(crate) fn name(message: impl Into<String>) -> Self {
        Error::NameError(message.into())
    }

    pub(crate) fn arity_error(expected: Arity, got: usize) -> Self {
        Error::InvalidArgsCount { expected, got }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod interpreter;
pub mod scheme;

pub use interpreter::{Interpreter, InterpreterConfig};
