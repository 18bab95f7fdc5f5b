//! The `run(program) -> text` entry point.
//!
//! An [`Interpreter`] owns the builtins scope and one persistent global scope on top of
//! it. Each [`Interpreter::run`] reads the first term of its input, evaluates it in a fresh
//! chain rooted at the global scope and serializes the result, so definitions made by one
//! run are visible to the next.

use std::rc::Rc;

use tracing::debug;

use crate::ast::Term;
use crate::builtinops::{Arity, BuiltinOp, create_builtins_scope};
use crate::evaluator::environment::{Scope, ScopeChain};
use crate::evaluator::{EvalContext, Scoping, eval_with_context};
use crate::scheme::{ParseConfig, parse_scheme_with_config};
use crate::{Error, MAX_EVAL_DEPTH};

/// Interpreter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub parse: ParseConfig,
    /// Maximum evaluator recursion depth
    pub max_eval_depth: usize,
    pub scoping: Scoping,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            parse: ParseConfig::default(),
            max_eval_depth: MAX_EVAL_DEPTH,
            scoping: Scoping::default(),
        }
    }
}

/// Reads, evaluates and prints one expression at a time against a persistent global scope.
///
/// # Example
/// ```
/// use minischeme::Interpreter;
///
/// let interpreter = Interpreter::new();
/// interpreter.run("(define (square x) (* x x))").unwrap();
/// assert_eq!(interpreter.run("(square 12)").unwrap(), "144");
/// assert_eq!(interpreter.run("(cons 1 2)").unwrap(), "(1 . 2)");
/// ```
#[derive(Debug)]
pub struct Interpreter {
    global: Rc<Scope>,
    config: InterpreterConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let builtins = Rc::new(create_builtins_scope());
        Interpreter {
            global: Rc::new(Scope::with_parent(builtins)),
            config,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Evaluate the first expression of `program` and return the result term
    pub fn eval_str(&self, program: &str) -> Result<Term, Error> {
        let expr = parse_scheme_with_config(program, self.config.parse)?;
        let env = ScopeChain::new(self.global.clone());
        let ctx = EvalContext::new(self.config.max_eval_depth, self.config.scoping);
        eval_with_context(&expr, &env, ctx)
    }

    /// Evaluate the first expression of `program` and render the result
    pub fn run(&self, program: &str) -> Result<String, Error> {
        let result = self
            .eval_str(program)
            .and_then(|value| value.serialize());

        match &result {
            Ok(output) => debug!(program, output = %output, "run"),
            Err(err) => debug!(program, error = %err, "run failed"),
        }
        result
    }

    /// Every binding visible at top level, user definitions shadowing builtins, sorted by name
    pub fn global_bindings(&self) -> Vec<(String, Term)> {
        self.global.all_bindings()
    }

    /// Register a custom builtin function in the global scope.
    ///
    /// The function receives its arguments already evaluated, in call order, and may
    /// accept any number of them; it is responsible for its own arity and type checks.
    ///
    /// # Example
    /// ```
    /// use minischeme::{Error, Interpreter};
    /// use minischeme::ast::Term;
    ///
    /// fn count(args: &[Term]) -> Result<Term, Error> {
    ///     Ok(Term::Integer(args.len() as i64))
    /// }
    ///
    /// let interpreter = Interpreter::new();
    /// interpreter.register_builtin("count", count);
    /// assert_eq!(interpreter.run("(count 1 2 3)").unwrap(), "3");
    /// ```
    pub fn register_builtin(&self, name: &str, func: fn(&[Term]) -> Result<Term, Error>) {
        let op = BuiltinOp::function(
            name.to_owned(),
            Arity::AtLeast(0),
            Rc::new(move |args: Vec<Term>| func(&args)),
        );
        self.global.define(
            name,
            Term::Procedure(crate::ast::Procedure::Builtin(Rc::new(op))),
        );
    }
}
