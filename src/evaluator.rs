//! Tree-walking evaluator.
//!
//! Evaluation dispatches on the shape of the term:
//!
//! - integers, booleans and `()` evaluate to themselves
//! - symbols are looked up in the active [`ScopeChain`] (`NameError` when unbound)
//! - a pair is an application: the head must evaluate to a [`Procedure`] and the tail must
//!   be a proper list of argument terms
//! - a procedure value cannot be evaluated on its own
//!
//! Procedures are called in two phases. [`Procedure::prepare`] either evaluates every
//! argument in the caller's environment or passes the raw terms through, depending on the
//! procedure's [`ArgumentPolicy`]; [`Procedure::do_call`] then runs the operation.
//! Builtin functions take evaluated arguments. Special forms and closures take raw ones:
//! closures check their arity before evaluating anything.

pub mod environment;
pub(crate) mod intooperation;

use std::rc::Rc;

use tracing::trace;

use crate::ast::{PairRef, Procedure, Term};
use crate::builtinops::{Arity, OpKind};
use crate::{Error, MAX_EVAL_DEPTH};
use environment::{Scope, ScopeChain};

/// How a closure activation resolves names its own frames do not bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scoping {
    /// Activation chain is `[frame] + captured + caller`: names unbound at the definition
    /// site fall back to the caller's environment
    #[default]
    CallerFallback,
    /// Activation chain is `[frame] + captured` only
    Lexical,
}

/// Per-evaluation settings threaded through every recursive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    depth: usize,
    pub max_depth: usize,
    pub scoping: Scoping,
}

impl Default for EvalContext {
    fn default() -> Self {
        EvalContext::new(MAX_EVAL_DEPTH, Scoping::default())
    }
}

impl EvalContext {
    pub fn new(max_depth: usize, scoping: Scoping) -> Self {
        EvalContext {
            depth: 0,
            max_depth,
            scoping,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn deeper(self) -> Self {
        EvalContext {
            depth: self.depth + 1,
            ..self
        }
    }
}

/// Whether a procedure receives evaluated or raw argument terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentPolicy {
    Evaluated,
    Raw,
}

/// A user-defined procedure and the environment captured where it was created
pub struct Closure {
    name: Option<String>,
    params: Vec<String>,
    body: Vec<Term>,
    captured: ScopeChain,
}

impl Closure {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    fn invoke(&self, args: &[Term], caller: &ScopeChain, ctx: EvalContext) -> Result<Term, Error> {
        if args.len() != self.params.len() {
            return Err(Error::arity_error(
                Arity::Exact(self.params.len()),
                args.len(),
            ));
        }

        let frame = Scope::new();
        for (param, arg) in self.params.iter().zip(args) {
            frame.define(param.as_str(), eval_with_context(arg, caller, ctx)?);
        }

        trace!(
            closure = self.name().unwrap_or("lambda"),
            args = args.len(),
            depth = ctx.depth(),
            "calling closure"
        );

        let mut activation = ScopeChain::new(Rc::new(frame));
        activation.extend(&self.captured);
        if ctx.scoping == Scoping::CallerFallback {
            activation.extend(caller);
        }

        let mut result = Term::Null;
        for term in &self.body {
            result = eval_with_context(term, &activation, ctx)?;
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Closure {
    // The captured chain can reach this closure again, so it is not printed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl Procedure {
    pub fn argument_policy(&self) -> ArgumentPolicy {
        match self {
            Procedure::Builtin(op) => match op.op_kind {
                OpKind::Function { .. } => ArgumentPolicy::Evaluated,
                OpKind::SpecialForm(_) => ArgumentPolicy::Raw,
            },
            Procedure::Closure(_) => ArgumentPolicy::Raw,
        }
    }

    /// Phase one: evaluate the arguments in the caller's environment, or pass them through
    pub fn prepare(
        &self,
        args: &[Term],
        env: &ScopeChain,
        ctx: EvalContext,
    ) -> Result<Vec<Term>, Error> {
        match self.argument_policy() {
            ArgumentPolicy::Evaluated => args
                .iter()
                .map(|arg| eval_with_context(arg, env, ctx))
                .collect(),
            ArgumentPolicy::Raw => Ok(args.to_vec()),
        }
    }

    /// Phase two: run the operation over prepared arguments
    pub fn do_call(
        &self,
        args: Vec<Term>,
        env: &ScopeChain,
        ctx: EvalContext,
    ) -> Result<Term, Error> {
        match self {
            Procedure::Builtin(op) => match &op.op_kind {
                OpKind::Function { func, arity } => {
                    arity.validate(args.len())?;
                    func(args)
                }
                OpKind::SpecialForm(form) => form(&args, env, ctx),
            },
            Procedure::Closure(closure) => closure.invoke(&args, env, ctx),
        }
    }

    pub fn call(&self, args: &[Term], env: &ScopeChain, ctx: EvalContext) -> Result<Term, Error> {
        let prepared = self.prepare(args, env, ctx)?;
        self.do_call(prepared, env, ctx)
    }
}

/// Evaluate a term with default limits and scoping (public API)
pub fn eval(expr: &Term, env: &ScopeChain) -> Result<Term, Error> {
    eval_with_context(expr, env, EvalContext::default())
}

/// Evaluate a term, failing once the context's depth limit is reached
pub fn eval_with_context(expr: &Term, env: &ScopeChain, ctx: EvalContext) -> Result<Term, Error> {
    if ctx.depth >= ctx.max_depth {
        return Err(Error::runtime(format!(
            "evaluation depth limit exceeded (max: {})",
            ctx.max_depth
        )));
    }

    match expr {
        Term::Null | Term::Integer(_) | Term::Boolean(_) => Ok(expr.clone()),
        Term::Symbol(name) => env.lookup(name),
        Term::Pair(pair) => eval_application(pair, env, ctx.deeper()),
        Term::Procedure(_) => Err(Error::runtime("a procedure value cannot be evaluated")),
    }
}

/// Apply the head of `pair` to the terms of its tail
fn eval_application(pair: &PairRef, env: &ScopeChain, ctx: EvalContext) -> Result<Term, Error> {
    let head = eval_with_context(&pair.first(), env, ctx)?;

    let mut args = pair.second().flatten()?;
    if !matches!(args.pop(), Some(Term::Null)) {
        return Err(Error::runtime(
            "cannot call a procedure with an improper argument list",
        ));
    }

    let Term::Procedure(procedure) = head else {
        let shown = head
            .serialize()
            .unwrap_or_else(|_| head.type_name().to_owned());
        return Err(Error::runtime(format!("not a function: {shown}")));
    };

    procedure.call(&args, env, ctx)
}

/// Build a closure over `env` from a parameter spec and body terms
fn make_closure(
    name: Option<String>,
    param_spec: &Term,
    body: &[Term],
    env: &ScopeChain,
) -> Result<Term, Error> {
    let mut spec = param_spec.flatten()?;
    if !matches!(spec.pop(), Some(Term::Null)) {
        return Err(Error::syntax("lambda parameters must be a proper list"));
    }

    let params = spec
        .into_iter()
        .map(|param| match param {
            Term::Symbol(name) => Ok(name),
            other => Err(Error::syntax(format!(
                "lambda parameter must be a symbol, got {}",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Term::Procedure(Procedure::Closure(Rc::new(Closure {
        name,
        params,
        body: body.to_vec(),
        captured: env.clone(),
    }))))
}

/// Evaluate quote special form
pub(crate) fn eval_quote(
    args: &[Term],
    _env: &ScopeChain,
    _ctx: EvalContext,
) -> Result<Term, Error> {
    match args {
        [expr] => Ok(expr.clone()),
        _ => Err(Error::arity_error(Arity::Exact(1), args.len())),
    }
}

/// Evaluate if special form
pub(crate) fn eval_if(args: &[Term], env: &ScopeChain, ctx: EvalContext) -> Result<Term, Error> {
    let arity = Arity::Range(2, 3);
    if !arity.accepts(args.len()) {
        return Err(Error::syntax(format!(
            "if expects {arity} arguments, got {}",
            args.len()
        )));
    }
    let (condition, consequent, alternative) = (&args[0], &args[1], args.get(2));

    if eval_with_context(condition, env, ctx)?.is_truthy() {
        eval_with_context(consequent, env, ctx)
    } else if let Some(alternative) = alternative {
        eval_with_context(alternative, env, ctx)
    } else {
        Ok(Term::Null)
    }
}

/// Evaluate define special form, in both the variable and the procedure shape
pub(crate) fn eval_define(
    args: &[Term],
    env: &ScopeChain,
    ctx: EvalContext,
) -> Result<Term, Error> {
    match args {
        [] => Err(Error::syntax("define expects a name and a value")),
        [Term::Pair(signature), body @ ..] => {
            if body.is_empty() {
                return Err(Error::syntax("procedure definition needs a body"));
            }
            let Term::Symbol(name) = signature.first() else {
                return Err(Error::syntax("not a function name"));
            };
            let closure = make_closure(Some(name.clone()), &signature.second(), body, env)?;
            trace!(name = %name, "define procedure");
            env.define(name, closure)?;
            Ok(Term::Null)
        }
        [target, expr] => {
            let Term::Symbol(name) = target else {
                return Err(Error::runtime(format!(
                    "not a symbol: {}",
                    target.type_name()
                )));
            };
            let value = eval_with_context(expr, env, ctx)?;
            trace!(name = %name, "define");
            env.define(name.as_str(), value)?;
            Ok(Term::Null)
        }
        _ => Err(Error::syntax(format!(
            "define expects 2 arguments, got {}",
            args.len()
        ))),
    }
}

/// Evaluate set! special form: the name must already be bound somewhere in the chain
pub(crate) fn eval_set(args: &[Term], env: &ScopeChain, ctx: EvalContext) -> Result<Term, Error> {
    let [target, expr] = args else {
        return Err(Error::syntax(format!(
            "set! expects 2 arguments, got {}",
            args.len()
        )));
    };
    let Term::Symbol(name) = target else {
        return Err(Error::runtime(format!(
            "not a symbol: {}",
            target.type_name()
        )));
    };
    if !env.contains(name) {
        return Err(Error::name(format!("no such object: {name}")));
    }

    let value = eval_with_context(expr, env, ctx)?;
    trace!(name = %name, "set!");
    env.assign(name, value)?;
    Ok(Term::Null)
}

/// Evaluate both operands of a pair mutation form and return the target pair and value
fn eval_pair_mutation(
    form: &str,
    args: &[Term],
    env: &ScopeChain,
    ctx: EvalContext,
) -> Result<(PairRef, Term), Error> {
    let [target, expr] = args else {
        return Err(Error::arity_error(Arity::Exact(2), args.len()));
    };
    let pair = match eval_with_context(target, env, ctx)? {
        Term::Pair(pair) => pair,
        other => {
            return Err(Error::runtime(format!(
                "{form}: not a pair: {}",
                other.type_name()
            )));
        }
    };
    let value = eval_with_context(expr, env, ctx)?;
    Ok((pair, value))
}

/// Evaluate set-car! special form
pub(crate) fn eval_set_car(
    args: &[Term],
    env: &ScopeChain,
    ctx: EvalContext,
) -> Result<Term, Error> {
    let (pair, value) = eval_pair_mutation("set-car!", args, env, ctx)?;
    trace!("set-car!");
    pair.set_first(value);
    Ok(Term::Null)
}

/// Evaluate set-cdr! special form
pub(crate) fn eval_set_cdr(
    args: &[Term],
    env: &ScopeChain,
    ctx: EvalContext,
) -> Result<Term, Error> {
    let (pair, value) = eval_pair_mutation("set-cdr!", args, env, ctx)?;
    trace!("set-cdr!");
    pair.set_second(value);
    Ok(Term::Null)
}

/// Evaluate lambda special form
pub(crate) fn eval_lambda(
    args: &[Term],
    env: &ScopeChain,
    _ctx: EvalContext,
) -> Result<Term, Error> {
    match args {
        [param_spec, body @ ..] if !body.is_empty() => make_closure(None, param_spec, body, env),
        _ => Err(Error::syntax(format!(
            "lambda expects a parameter list and at least one body term, got {} arguments",
            args.len()
        ))),
    }
}

// Short-circuiting logic: stop at the first value whose truthiness equals the
// short-circuit target and return that value, otherwise return the last value
macro_rules! boolean_logic_op {
    ($name:ident, $short_circuit:literal, $default:literal) => {
        pub(crate) fn $name(
            args: &[Term],
            env: &ScopeChain,
            ctx: EvalContext,
        ) -> Result<Term, Error> {
            let mut result = Term::Boolean($default);
            for arg in args {
                result = eval_with_context(arg, env, ctx)?;
                if result.is_truthy() == $short_circuit {
                    break;
                }
            }
            Ok(result)
        }
    };
}

// Generate boolean logic functions
boolean_logic_op!(eval_and, false, true);
boolean_logic_op!(eval_or, true, false);
