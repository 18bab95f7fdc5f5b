//! This module defines the term model: the values the interpreter reads, evaluates and
//! prints. The main enum, [`Term`], is a closed sum over atoms (integers, booleans,
//! symbols, the null term), shared mutable pairs and procedures. Pairs are reference
//! counted handles ([`PairRef`]) so that aliases observe `set-car!`/`set-cdr!`.
//!
//! The module also provides the two generic list conversions used throughout the
//! evaluator: [`Term::flatten`] turns a pair chain into its spine (elements followed by
//! the final tail) and [`Term::from_spine`] rebuilds a chain from such a spine. The
//! serializer, [`Term::serialize`], renders a term in exactly the syntax the reader accepts.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::BuiltinOp;
use crate::evaluator::Closure;

/// Type alias for number values in interpreter
pub type IntType = i64;

/// Core term type in interpreter
///
/// To build terms in code and tests, use the helpers:
/// - `val(42)`, `val(true)` for atoms, `sym("name")` for symbols, `nil()` for `()`
/// - `val([1, 2, 3])` / `val(vec![sym("op"), val(42)])` for proper lists
/// - [`Term::cons`] for single pairs
#[derive(Clone)]
pub enum Term {
    /// The empty list, terminator of proper lists
    Null,
    Integer(IntType),
    Boolean(bool),
    Symbol(String),
    /// A mutable two-slot cell, shared by reference
    Pair(PairRef),
    Procedure(Procedure),
}

/// A two-slot cell. Only reachable through a [`PairRef`].
pub struct Pair {
    first: Term,
    second: Term,
}

impl Drop for Pair {
    // Unlink the spine one cell at a time so long lists do not drop recursively
    fn drop(&mut self) {
        let mut next = std::mem::replace(&mut self.second, Term::Null);
        while let Term::Pair(PairRef(cell)) = next {
            match Rc::try_unwrap(cell) {
                Ok(cell) => {
                    let mut pair = cell.into_inner();
                    next = std::mem::replace(&mut pair.second, Term::Null);
                }
                // still shared elsewhere
                Err(_) => break,
            }
        }
    }
}

/// Shared handle to a [`Pair`]. Cloning the handle aliases the pair; it never copies it.
#[derive(Clone)]
pub struct PairRef(Rc<RefCell<Pair>>);

impl PairRef {
    pub fn new(first: Term, second: Term) -> Self {
        PairRef(Rc::new(RefCell::new(Pair { first, second })))
    }

    pub fn first(&self) -> Term {
        self.0.borrow().first.clone()
    }

    pub fn second(&self) -> Term {
        self.0.borrow().second.clone()
    }

    pub fn set_first(&self, value: Term) {
        self.0.borrow_mut().first = value;
    }

    pub fn set_second(&self, value: Term) {
        self.0.borrow_mut().second = value;
    }

    /// Identity comparison: true when both handles point at the same cell
    pub fn ptr_eq(&self, other: &PairRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Callable values. Builtins wrap a host operation; closures are user-defined.
#[derive(Clone)]
pub enum Procedure {
    Builtin(Rc<BuiltinOp>),
    Closure(Rc<Closure>),
}

impl Procedure {
    pub fn name(&self) -> Option<&str> {
        match self {
            Procedure::Builtin(op) => Some(&*op.scheme_id),
            Procedure::Closure(closure) => closure.name(),
        }
    }
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Procedure::Builtin(op) => write!(f, "Builtin({})", op.scheme_id),
            Procedure::Closure(closure) => write!(f, "{closure:?}"),
        }
    }
}

impl std::fmt::Debug for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Null => write!(f, "Null"),
            Term::Integer(n) => write!(f, "Integer({n})"),
            Term::Boolean(b) => write!(f, "Boolean({b})"),
            Term::Symbol(s) => write!(f, "Symbol({s})"),
            Term::Pair(_) => match self.flatten() {
                Ok(mut spine) => {
                    let tail = spine.pop().unwrap_or(Term::Null);
                    for item in &spine {
                        write!(f, "Pair({item:?}, ")?;
                    }
                    write!(f, "{tail:?}")?;
                    for _ in &spine {
                        write!(f, ")")?;
                    }
                    Ok(())
                }
                Err(_) => write!(f, "Pair(<circular>)"),
            },
            Term::Procedure(procedure) => write!(f, "Procedure({procedure:?})"),
        }
    }
}

// From trait implementations for Term - enables .into() conversion
impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Term::Boolean(b)
    }
}

impl From<PairRef> for Term {
    fn from(pair: PairRef) -> Self {
        Term::Pair(pair)
    }
}

impl From<Procedure> for Term {
    fn from(procedure: Procedure) -> Self {
        Term::Procedure(procedure)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Term {
            fn from(n: $int_type) -> Self {
                Term::Integer(IntType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(IntType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Term>> From<Vec<T>> for Term {
    fn from(v: Vec<T>) -> Self {
        Term::list(v.into_iter().map(Into::into))
    }
}

impl<T: Into<Term>, const N: usize> From<[T; N]> for Term {
    fn from(arr: [T; N]) -> Self {
        Term::list(arr.into_iter().map(Into::into))
    }
}

///   Helper function for creating symbols
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Term {
    Term::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating terms from anything convertible
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Term>>(value: T) -> Term {
    value.into()
}

/// Helper function for the empty list
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Term {
    Term::Null
}

impl Term {
    pub fn cons(first: Term, second: Term) -> Term {
        Term::Pair(PairRef::new(first, second))
    }

    /// Build a proper list from its elements.
    pub fn list<I>(items: I) -> Term
    where
        I: IntoIterator<Item = Term>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Term::Null, |tail, item| Term::cons(item, tail))
    }

    /// Split a pair chain into its spine: every `first` slot in order, followed by the
    /// final `second` slot. A proper list therefore ends with [`Term::Null`]; any
    /// non-pair term flattens to itself.
    ///
    /// A chain whose `second` slots loop back on themselves (built with `set-cdr!`) has no
    /// spine and is a runtime error.
    pub fn flatten(&self) -> Result<Vec<Term>, Error> {
        let mut spine = Vec::new();
        let mut current = self.clone();
        // advances at half speed; the walk meets it again only on a cycle
        let mut trailing = self.clone();
        while let Term::Pair(pair) = current {
            spine.push(pair.first());
            current = pair.second();
            if spine.len() % 2 == 0
                && let Term::Pair(slow) = &trailing
            {
                trailing = slow.second();
            }
            if let (Term::Pair(fast), Term::Pair(slow)) = (&current, &trailing)
                && fast.ptr_eq(slow)
            {
                return Err(Error::runtime("circular list"));
            }
        }
        spine.push(current);
        Ok(spine)
    }

    /// Inverse of [`Term::flatten`]: the last element becomes the final tail. A single
    /// element spine is that element itself; an empty spine is `()`.
    pub fn from_spine(mut spine: Vec<Term>) -> Term {
        let Some(tail) = spine.pop() else {
            return Term::Null;
        };
        spine
            .into_iter()
            .rev()
            .fold(tail, |tail, item| Term::cons(item, tail))
    }

    /// Everything except `#f` is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Term::Boolean(false))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Term::Null)
    }

    /// `()` or a pair chain ending in `()`
    pub fn is_proper_list(&self) -> bool {
        match self.flatten() {
            Ok(spine) => matches!(spine.last(), Some(Term::Null)),
            Err(_) => false,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Term::Null => "null",
            Term::Integer(_) => "number",
            Term::Boolean(_) => "boolean",
            Term::Symbol(_) => "symbol",
            Term::Pair(_) => "pair",
            Term::Procedure(_) => "procedure",
        }
    }

    /// Render this term in the reader's concrete syntax.
    ///
    /// Procedures are not data: serializing one (at any depth) is an error rather than a
    /// placeholder, so `read(serialize(t))` always reproduces `t`'s shape.
    pub fn serialize(&self) -> Result<String, Error> {
        let mut out = String::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn write_to(&self, out: &mut String) -> Result<(), Error> {
        match self {
            Term::Null => out.push_str("()"),
            Term::Integer(n) => out.push_str(&n.to_string()),
            Term::Boolean(b) => out.push_str(if *b { "#t" } else { "#f" }),
            Term::Symbol(name) => out.push_str(name),
            Term::Pair(_) => {
                let mut spine = self.flatten()?;
                let tail = spine.pop().unwrap_or(Term::Null);
                out.push('(');
                for (i, item) in spine.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.write_to(out)?;
                }
                if !tail.is_null() {
                    out.push_str(" . ");
                    tail.write_to(out)?;
                }
                out.push(')');
            }
            Term::Procedure(_) => {
                return Err(Error::runtime("procedure is not serializable"));
            }
        }
        Ok(())
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Null, Term::Null) => true,
            (Term::Integer(a), Term::Integer(b)) => a == b,
            (Term::Boolean(a), Term::Boolean(b)) => a == b,
            (Term::Symbol(a), Term::Symbol(b)) => a == b,
            (Term::Pair(a), Term::Pair(b)) => {
                // Structural equality along both spines, short-circuited by identity
                let (mut a, mut b) = (a.clone(), b.clone());
                loop {
                    if a.ptr_eq(&b) {
                        return true;
                    }
                    if a.first() != b.first() {
                        return false;
                    }
                    match (a.second(), b.second()) {
                        (Term::Pair(next_a), Term::Pair(next_b)) => {
                            a = next_a;
                            b = next_b;
                        }
                        (tail_a, tail_b) => return tail_a == tail_b,
                    }
                }
            }
            (Term::Procedure(Procedure::Builtin(a)), Term::Procedure(Procedure::Builtin(b))) => {
                a.scheme_id == b.scheme_id
            }
            (Term::Procedure(Procedure::Closure(a)), Term::Procedure(Procedure::Closure(b))) => {
                Rc::ptr_eq(a, b)
            }
            _ => false, // Different variants are never equal
        }
    }
}
