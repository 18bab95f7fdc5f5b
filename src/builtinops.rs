//! Built-in operations registry.
//!
//! Every primitive procedure and special form is described by one [`BuiltinOp`]. The
//! registry is built by [`builtin_ops`] and installed into a fresh scope by
//! [`create_builtins_scope`] when an interpreter is constructed; there is no global table.
//!
//! ```scheme
//! (+ 1 2 3)              ; arithmetic, left fold, checked
//! (< 1 2 3)              ; chained comparison
//! (list-ref (list 1 2 3) 2)
//! (if (null? x) 0 1)     ; special form
//! ```
//!
//! ## Functions vs Special Forms
//!
//! - **Functions** receive their arguments already evaluated in the caller's environment.
//!   Their argument count is validated against the declared [`Arity`] before the body runs.
//! - **Special forms** receive the raw argument terms plus the environment and evaluate
//!   whichever sub-terms they need (`quote`, `if`, `define`, `set!`, `set-car!`,
//!   `set-cdr!`, `lambda`, `and`, `or`).
//!
//! ## Adding New Operations
//!
//! 1. Write the function against typed parameters (`IntType`, `PairRef`, `Term`, or a
//!    `Rest<_>` tail) returning `Result<R, Error>` with `R: Into<Term>`
//! 2. Add a [`BuiltinOp::function`] entry to [`builtin_ops`] with its arity
//! 3. Add cases to the tests below

use std::borrow::Cow;
use std::rc::Rc;

use crate::Error;
use crate::ast::{IntType, PairRef, Procedure, Term};
use crate::evaluator::environment::{Scope, ScopeChain};
use crate::evaluator::intooperation::{
    IntoOperation, IntoVariadicOperation, NumRest, OperationFn, TermRest,
};
use crate::evaluator::{
    EvalContext, eval_and, eval_define, eval_if, eval_lambda, eval_or, eval_quote, eval_set,
    eval_set_car, eval_set_cdr,
};

/// Accepted argument counts of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Range(min, max) => (min..=max).contains(&count),
        }
    }

    pub fn validate(&self, count: usize) -> Result<(), Error> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(Error::arity_error(*self, count))
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "between {min} and {max}"),
        }
    }
}

/// Signature shared by all special forms: raw argument terms, the active environment and
/// the evaluation context
pub type SpecialFormFn = fn(&[Term], &ScopeChain, EvalContext) -> Result<Term, Error>;

/// Represents the implementation of a built-in operation (function or special form)
#[derive(Clone)]
pub enum OpKind {
    /// Takes evaluated arguments
    Function { func: Rc<OperationFn>, arity: Arity },
    /// Takes raw argument terms and the environment
    SpecialForm(SpecialFormFn),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function { arity, .. } => write!(f, "Function(<fn>, {arity:?})"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The Scheme identifier for this operation
    pub scheme_id: Cow<'static, str>,
    /// The implementation of this operation (function or special form)
    pub op_kind: OpKind,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Compare operations by their scheme_id, which uniquely identifies them
        self.scheme_id == other.scheme_id
    }
}

impl BuiltinOp {
    pub(crate) fn function(
        scheme_id: impl Into<Cow<'static, str>>,
        arity: Arity,
        func: Rc<OperationFn>,
    ) -> Self {
        BuiltinOp {
            scheme_id: scheme_id.into(),
            op_kind: OpKind::Function { func, arity },
        }
    }

    pub(crate) fn special_form(scheme_id: &'static str, form: SpecialFormFn) -> Self {
        BuiltinOp {
            scheme_id: Cow::Borrowed(scheme_id),
            op_kind: OpKind::SpecialForm(form),
        }
    }

    /// Check if this operation is a special form
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }
}

//
// Builtin Function Implementations
//

fn overflow(operation: &str) -> Error {
    Error::runtime(format!("integer overflow in {operation}"))
}

// Type predicates
fn builtin_is_number(value: Term) -> Result<bool, Error> {
    Ok(matches!(value, Term::Integer(_)))
}

fn builtin_is_boolean(value: Term) -> Result<bool, Error> {
    Ok(matches!(value, Term::Boolean(_)))
}

fn builtin_is_pair(value: Term) -> Result<bool, Error> {
    Ok(matches!(value, Term::Pair(_)))
}

fn builtin_is_null(value: Term) -> Result<bool, Error> {
    Ok(value.is_null())
}

fn builtin_is_list(value: Term) -> Result<bool, Error> {
    Ok(value.is_proper_list())
}

fn builtin_is_symbol(value: Term) -> Result<bool, Error> {
    Ok(matches!(value, Term::Symbol(_)))
}

fn builtin_not(value: Term) -> Result<bool, Error> {
    Ok(!value.is_truthy())
}

// Arithmetic
fn builtin_add(mut args: NumRest) -> Result<IntType, Error> {
    args.try_fold(0, |sum: IntType, n| {
        sum.checked_add(n).ok_or_else(|| overflow("addition"))
    })
}

fn builtin_mul(mut args: NumRest) -> Result<IntType, Error> {
    args.try_fold(1, |product: IntType, n| {
        product
            .checked_mul(n)
            .ok_or_else(|| overflow("multiplication"))
    })
}

fn builtin_sub(first: IntType, mut rest: NumRest) -> Result<IntType, Error> {
    rest.try_fold(first, |result, n| {
        result
            .checked_sub(n)
            .ok_or_else(|| overflow("subtraction"))
    })
}

fn builtin_div(first: IntType, mut rest: NumRest) -> Result<IntType, Error> {
    rest.try_fold(first, |result, n| {
        if n == 0 {
            return Err(Error::runtime("division by zero"));
        }
        result.checked_div(n).ok_or_else(|| overflow("division"))
    })
}

fn builtin_max(first: IntType, rest: NumRest) -> Result<IntType, Error> {
    Ok(rest.fold(first, IntType::max))
}

fn builtin_min(first: IntType, rest: NumRest) -> Result<IntType, Error> {
    Ok(rest.fold(first, IntType::min))
}

fn builtin_abs(n: IntType) -> Result<IntType, Error> {
    n.checked_abs().ok_or_else(|| overflow("abs"))
}

// Macro to generate numeric comparison functions. Adjacent pairs are compared left to
// right and the first failing pair ends the chain; fewer than two arguments is true.
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(mut args: NumRest) -> Result<bool, Error> {
            let Some(mut prev) = args.next() else {
                return Ok(true);
            };
            for current in args {
                if !(prev $op current) {
                    return Ok(false);
                }
                prev = current;
            }
            Ok(true)
        }
    };
}

numeric_comparison!(builtin_lt, <);
numeric_comparison!(builtin_le, <=);
numeric_comparison!(builtin_eq, ==);
numeric_comparison!(builtin_ge, >=);
numeric_comparison!(builtin_gt, >);

// Lists
fn builtin_cons(first: Term, second: Term) -> Result<Term, Error> {
    Ok(Term::cons(first, second))
}

fn builtin_car(pair: PairRef) -> Result<Term, Error> {
    Ok(pair.first())
}

fn builtin_cdr(pair: PairRef) -> Result<Term, Error> {
    Ok(pair.second())
}

fn builtin_list(items: TermRest) -> Result<Term, Error> {
    Ok(Term::list(items))
}

/// Validate a list index against the length of `list`'s spine minus `reserved` trailing slots
fn checked_index(list: &Term, index: IntType, reserved: usize) -> Result<usize, Error> {
    let limit = list.flatten()?.len().saturating_sub(reserved);
    match usize::try_from(index) {
        Ok(index) if index < limit => Ok(index),
        _ => Err(Error::runtime(format!("index out of bounds: {index}"))),
    }
}

/// Follow `second` slots `steps` times. Callers bound `steps` by the spine length.
fn nth_tail(list: Term, steps: usize) -> Term {
    let mut current = list;
    for _ in 0..steps {
        match current {
            Term::Pair(pair) => current = pair.second(),
            other => return other,
        }
    }
    current
}

fn builtin_list_ref(list: Term, index: IntType) -> Result<Term, Error> {
    // the final tail slot is not an element
    let index = checked_index(&list, index, 1)?;
    match nth_tail(list, index) {
        Term::Pair(pair) => Ok(pair.first()),
        other => Ok(other),
    }
}

fn builtin_list_tail(list: Term, index: IntType) -> Result<Term, Error> {
    let index = checked_index(&list, index, 0)?;
    Ok(nth_tail(list, index))
}

/// All builtin operations, in registry order.
///
/// The typed implementations above are wired through the adapter layer in
/// [`crate::evaluator::intooperation`] here, once per interpreter.
pub(crate) fn builtin_ops() -> Vec<BuiltinOp> {
    fn fixed<Args, F>(f: F) -> Rc<OperationFn>
    where
        F: IntoOperation<Args>,
    {
        <F as IntoOperation<Args>>::into_operation(f)
    }

    fn variadic<Args, F>(f: F) -> Rc<OperationFn>
    where
        F: IntoVariadicOperation<Args>,
    {
        <F as IntoVariadicOperation<Args>>::into_variadic_operation(f)
    }

    use Arity::{AtLeast, Exact};

    vec![
        // Special forms
        BuiltinOp::special_form("quote", eval_quote),
        BuiltinOp::special_form("if", eval_if),
        BuiltinOp::special_form("define", eval_define),
        BuiltinOp::special_form("set!", eval_set),
        BuiltinOp::special_form("set-car!", eval_set_car),
        BuiltinOp::special_form("set-cdr!", eval_set_cdr),
        BuiltinOp::special_form("lambda", eval_lambda),
        BuiltinOp::special_form("and", eval_and),
        BuiltinOp::special_form("or", eval_or),
        // Type predicates
        BuiltinOp::function("number?", Exact(1), fixed::<(Term,), _>(builtin_is_number)),
        BuiltinOp::function("boolean?", Exact(1), fixed::<(Term,), _>(builtin_is_boolean)),
        BuiltinOp::function("pair?", Exact(1), fixed::<(Term,), _>(builtin_is_pair)),
        BuiltinOp::function("null?", Exact(1), fixed::<(Term,), _>(builtin_is_null)),
        BuiltinOp::function("list?", Exact(1), fixed::<(Term,), _>(builtin_is_list)),
        BuiltinOp::function("symbol?", Exact(1), fixed::<(Term,), _>(builtin_is_symbol)),
        // Logic
        BuiltinOp::function("not", Exact(1), fixed::<(Term,), _>(builtin_not)),
        // Arithmetic
        BuiltinOp::function("+", AtLeast(0), variadic::<(NumRest,), _>(builtin_add)),
        BuiltinOp::function("*", AtLeast(0), variadic::<(NumRest,), _>(builtin_mul)),
        BuiltinOp::function(
            "-",
            AtLeast(1),
            variadic::<(IntType, NumRest), _>(builtin_sub),
        ),
        BuiltinOp::function(
            "/",
            AtLeast(1),
            variadic::<(IntType, NumRest), _>(builtin_div),
        ),
        BuiltinOp::function(
            "max",
            AtLeast(1),
            variadic::<(IntType, NumRest), _>(builtin_max),
        ),
        BuiltinOp::function(
            "min",
            AtLeast(1),
            variadic::<(IntType, NumRest), _>(builtin_min),
        ),
        BuiltinOp::function("abs", Exact(1), fixed::<(IntType,), _>(builtin_abs)),
        // Comparison
        BuiltinOp::function("<", AtLeast(0), variadic::<(NumRest,), _>(builtin_lt)),
        BuiltinOp::function("<=", AtLeast(0), variadic::<(NumRest,), _>(builtin_le)),
        BuiltinOp::function("=", AtLeast(0), variadic::<(NumRest,), _>(builtin_eq)),
        BuiltinOp::function(">=", AtLeast(0), variadic::<(NumRest,), _>(builtin_ge)),
        BuiltinOp::function(">", AtLeast(0), variadic::<(NumRest,), _>(builtin_gt)),
        // Lists
        BuiltinOp::function("cons", Exact(2), fixed::<(Term, Term), _>(builtin_cons)),
        BuiltinOp::function("car", Exact(1), fixed::<(PairRef,), _>(builtin_car)),
        BuiltinOp::function("cdr", Exact(1), fixed::<(PairRef,), _>(builtin_cdr)),
        BuiltinOp::function("list", AtLeast(0), variadic::<(TermRest,), _>(builtin_list)),
        BuiltinOp::function(
            "list-ref",
            Exact(2),
            fixed::<(Term, IntType), _>(builtin_list_ref),
        ),
        BuiltinOp::function(
            "list-tail",
            Exact(2),
            fixed::<(Term, IntType), _>(builtin_list_tail),
        ),
    ]
}

/// Create the root scope holding every builtin operation.
pub fn create_builtins_scope() -> Scope {
    let scope = Scope::new();
    for op in builtin_ops() {
        let name = op.scheme_id.to_string();
        scope.define(name, Term::Procedure(Procedure::Builtin(Rc::new(op))));
    }
    scope
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};
    use pretty_assertions::assert_eq;

    /// Micro-helper for success cases
    fn success<T: Into<Term>>(value: T) -> Option<Term> {
        Some(val(value))
    }

    fn find_op(name: &str) -> BuiltinOp {
        builtin_ops()
            .into_iter()
            .find(|op| op.scheme_id == name)
            .unwrap_or_else(|| panic!("builtin not found: {name}"))
    }

    /// Invoke a function builtin the way the evaluator does: arity first, then the body
    fn call_builtin(name: &str, args: &[Term]) -> Result<Term, Error> {
        match find_op(name).op_kind {
            OpKind::Function { func, arity } => {
                arity.validate(args.len())?;
                func(args.to_vec())
            }
            OpKind::SpecialForm(_) => {
                panic!("expected function builtin in tests, got special form: {name}")
            }
        }
    }

    #[test]
    fn test_builtin_ops_registry() {
        let ops = builtin_ops();
        let mut names: Vec<&str> = ops.iter().map(|op| op.scheme_id.as_ref()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total, "duplicate builtin names");

        for form in [
            "quote", "if", "define", "set!", "set-car!", "set-cdr!", "lambda", "and", "or",
        ] {
            assert!(find_op(form).is_special_form(), "{form} is a special form");
        }
        for function in ["+", "car", "list-tail", "null?", "not", "<="] {
            assert!(!find_op(function).is_special_form(), "{function} is a function");
        }

        let scope = create_builtins_scope();
        assert!(matches!(
            scope.get("list-ref"),
            Some(Term::Procedure(Procedure::Builtin(_)))
        ));
        assert_eq!(scope.all_bindings().len(), total);
    }

    #[test]
    fn test_arity() {
        let test_cases = vec![
            (Arity::Exact(2), 2, true),
            (Arity::Exact(2), 1, false),
            (Arity::Exact(0), 0, true),
            (Arity::AtLeast(1), 0, false),
            (Arity::AtLeast(1), 5, true),
            (Arity::Range(2, 3), 1, false),
            (Arity::Range(2, 3), 2, true),
            (Arity::Range(2, 3), 3, true),
            (Arity::Range(2, 3), 4, false),
        ];
        for (arity, count, accepted) in test_cases {
            assert_eq!(arity.accepts(count), accepted, "{arity:?} with {count}");
            assert_eq!(arity.validate(count).is_ok(), accepted);
        }

        assert_eq!(Arity::Exact(1).to_string(), "exactly 1");
        assert_eq!(Arity::AtLeast(0).to_string(), "at least 0");
        assert_eq!(Arity::Range(2, 3).to_string(), "between 2 and 3");
        assert_eq!(
            Arity::Exact(2).validate(3).unwrap_err().to_string(),
            "RuntimeError: invalid arguments count: expected exactly 2, got 3"
        );
    }

    /// Macro to create test cases, invoking builtins via the registry.
    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_builtin($name, $args), $expected)
        };
    }

    #[test]
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Result<Term, Error>, Option<Term>);

        let dotted = Term::cons(val(1), Term::cons(val(2), val(3)));
        let many_ones: Vec<Term> = (0..100).map(|_| val(1)).collect();

        let test_cases: Vec<TestCase> = vec![
            // =================================================================
            // TYPE PREDICATES
            // =================================================================
            test!("number?", &[val(3)], success(true)),
            test!("number?", &[sym("x")], success(false)),
            test!("boolean?", &[val(false)], success(true)),
            test!("boolean?", &[nil()], success(false)),
            test!("pair?", &[val([1])], success(true)),
            test!("pair?", &[dotted.clone()], success(true)),
            test!("pair?", &[nil()], success(false)),
            test!("null?", &[nil()], success(true)),
            test!("null?", &[val(0)], success(false)),
            test!("null?", &[val(false)], success(false)),
            test!("list?", &[nil()], success(true)),
            test!("list?", &[val([1, 2])], success(true)),
            test!("list?", &[dotted.clone()], success(false)),
            test!("list?", &[val(1)], success(false)),
            test!("symbol?", &[sym("a")], success(true)),
            test!("symbol?", &[val(1)], success(false)),
            test!("number?", &[], None),
            test!("symbol?", &[val(1), val(2)], None),
            // =================================================================
            // NOT (truthiness: only #f is false)
            // =================================================================
            test!("not", &[val(false)], success(true)),
            test!("not", &[val(true)], success(false)),
            test!("not", &[val(0)], success(false)),
            test!("not", &[nil()], success(false)),
            test!("not", &[], None),
            // =================================================================
            // ARITHMETIC
            // =================================================================
            test!("+", &[], success(0)),
            test!("+", &[val(5)], success(5)),
            test!("+", &[val(1), val(2), val(3)], success(6)),
            test!("+", &many_ones, success(100)),
            test!("+", &[val(1), val(true)], None),
            test!("+", &[val(IntType::MAX), val(1)], None),
            test!("*", &[], success(1)),
            test!("*", &[val(2), val(3), val(4)], success(24)),
            test!("*", &[val(-2), val(3)], success(-6)),
            test!("*", &[val(IntType::MAX), val(2)], None),
            test!("*", &[val(2), nil()], None),
            test!("-", &[val(10), val(3), val(2)], success(5)),
            // a single argument is returned as is (left fold, no negation)
            test!("-", &[val(5)], success(5)),
            test!("-", &[val(IntType::MIN), val(1)], None),
            test!("-", &[], None),
            test!("/", &[val(20), val(2), val(5)], success(2)),
            test!("/", &[val(7), val(2)], success(3)),
            test!("/", &[val(-7), val(2)], success(-3)),
            test!("/", &[val(9)], success(9)),
            test!("/", &[val(1), val(0)], None),
            test!("/", &[val(IntType::MIN), val(-1)], None),
            test!("/", &[], None),
            test!("max", &[val(3), val(9), val(-1)], success(9)),
            test!("max", &[val(4)], success(4)),
            test!("min", &[val(3), val(9), val(-1)], success(-1)),
            test!("min", &[], None),
            test!("abs", &[val(-4)], success(4)),
            test!("abs", &[val(4)], success(4)),
            test!("abs", &[val(IntType::MIN)], None),
            test!("abs", &[sym("x")], None),
            // =================================================================
            // COMPARISONS
            // =================================================================
            test!("<", &[val(1), val(2), val(3)], success(true)),
            test!("<", &[val(1), val(3), val(2)], success(false)),
            test!("<=", &[val(1), val(1), val(2)], success(true)),
            test!("=", &[val(7), val(7), val(7)], success(true)),
            test!("=", &[val(9), val(9), val(4)], success(false)),
            test!(">=", &[val(3), val(3), val(4)], success(false)),
            test!(">", &[val(9), val(6), val(2)], success(true)),
            test!(">", &[val(9), val(6), val(7)], success(false)),
            test!("<", &[], success(true)),
            test!("<", &[val(1)], success(true)),
            test!("<", &[val(1), val(true)], None),
            // =================================================================
            // LISTS
            // =================================================================
            test!("cons", &[val(1), val(2)], Some(Term::cons(val(1), val(2)))),
            test!("cons", &[val(0), val([1, 2])], success([0, 1, 2])),
            test!("cons", &[val(1), nil()], success([1])),
            test!("cons", &[val(1)], None),
            test!("car", &[val([1, 2, 3])], success(1)),
            test!("car", &[dotted.clone()], success(1)),
            test!("car", &[nil()], None),
            test!("car", &[val(42)], None),
            test!("cdr", &[val([1, 2, 3])], success([2, 3])),
            test!("cdr", &[val([1])], Some(nil())),
            test!("cdr", &[Term::cons(val(1), val(2))], success(2)),
            test!("cdr", &[nil()], None),
            test!("list", &[], Some(nil())),
            test!("list", &[val(1), val(false), val([2])], success(vec![val(1), val(false), val([2])])),
            test!("list-ref", &[val([1, 2, 3]), val(0)], success(1)),
            test!("list-ref", &[val([1, 2, 3]), val(2)], success(3)),
            test!("list-ref", &[val([1, 2, 3]), val(3)], None),
            test!("list-ref", &[val([1, 2, 3]), val(-1)], None),
            test!("list-ref", &[nil(), val(0)], None),
            test!("list-ref", &[val([1, 2, 3]), val(true)], None),
            test!("list-tail", &[val([1, 2, 3]), val(0)], success([1, 2, 3])),
            test!("list-tail", &[val([1, 2, 3]), val(1)], success([2, 3])),
            test!("list-tail", &[val([1, 2, 3]), val(3)], Some(nil())),
            test!("list-tail", &[val([1, 2, 3]), val(4)], None),
            test!("list-tail", &[dotted, val(2)], success(3)),
        ];

        for (i, (name, result, expected)) in test_cases.into_iter().enumerate() {
            let test_id = format!("#{} ({name})", i + 1);
            match (result, expected) {
                (Ok(actual), Some(expected)) => {
                    assert_eq!(actual, expected, "{test_id}: value mismatch");
                }
                (Err(_), None) => {}
                (Ok(actual), None) => panic!("{test_id}: expected error, got {actual:?}"),
                (Err(err), Some(expected)) => {
                    panic!("{test_id}: expected {expected:?}, got error {err:?}")
                }
            }
        }
    }

    #[test]
    fn test_error_messages() {
        let test_cases = vec![
            ("/", vec![val(1), val(0)], "RuntimeError: division by zero"),
            (
                "+",
                vec![val(IntType::MAX), val(1)],
                "RuntimeError: integer overflow in addition",
            ),
            ("car", vec![val(1)], "RuntimeError: not a pair: number"),
            (
                "list-ref",
                vec![val([1, 2, 3]), val(3)],
                "RuntimeError: index out of bounds: 3",
            ),
            (
                "cons",
                vec![val(1)],
                "RuntimeError: invalid arguments count: expected exactly 2, got 1",
            ),
        ];

        for (name, args, expected) in test_cases {
            let err = call_builtin(name, &args).unwrap_err();
            assert_eq!(err.to_string(), expected);
            assert_eq!(err.kind(), crate::ErrorKind::Runtime);
        }
    }

    #[test]
    fn test_list_tail_shares_structure() {
        let list = val([1, 2, 3]);
        let tail = call_builtin("list-tail", &[list.clone(), val(1)]).unwrap();

        let (Term::Pair(tail_pair), Term::Pair(list_pair)) = (&tail, &list) else {
            panic!("expected pairs");
        };
        tail_pair.set_first(val(20));
        // the tail is the original list's second pair, not a copy
        assert_eq!(list_pair.second(), val([20, 3]));
        assert_eq!(list.serialize().unwrap(), "(1 20 3)");
    }
}
