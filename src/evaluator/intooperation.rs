use crate::Error;
use crate::ast::{IntType, PairRef, Term};
use crate::builtinops::Arity;
use std::iter::FusedIterator;
use std::rc::Rc;

// NOTE: This module is internal plumbing for the builtin library.
// It turns strongly-typed Rust functions into the erased
// `OperationFn` stored on builtin procedures, so that each builtin
// can be written against the types it actually works with.

/// Canonical erased builtin function type used by the evaluator.
///
/// Builtins receive ownership of their evaluated argument vector.
pub(crate) type OperationFn = dyn Fn(Vec<Term>) -> Result<Term, Error>;

// =====================================================================
// Argument conversion
// =====================================================================

/// Conversion of one evaluated argument into a typed parameter.
pub(crate) trait FromParam: Sized {
    fn from_arg(term: Term) -> Result<Self, Error>;
}

impl FromParam for Term {
    fn from_arg(term: Term) -> Result<Self, Error> {
        Ok(term)
    }
}

impl FromParam for IntType {
    fn from_arg(term: Term) -> Result<Self, Error> {
        match term {
            Term::Integer(n) => Ok(n),
            other => Err(Error::runtime(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }
}

impl FromParam for PairRef {
    fn from_arg(term: Term) -> Result<Self, Error> {
        match term {
            Term::Pair(pair) => Ok(pair),
            other => Err(Error::runtime(format!("not a pair: {}", other.type_name()))),
        }
    }
}

// =====================================================================
// Rest parameters
// =====================================================================

/// Owned iterator over the trailing arguments of a variadic builtin.
///
/// Every element is converted up front, so a type error in any rest
/// argument fails the call before the builtin body runs.
pub(crate) struct Rest<T> {
    inner: std::vec::IntoIter<T>,
}

impl<T: FromParam> Rest<T> {
    fn new(terms: Vec<Term>) -> Result<Self, Error> {
        let items = terms
            .into_iter()
            .map(T::from_arg)
            .collect::<Result<Vec<T>, Error>>()?;
        Ok(Rest {
            inner: items.into_iter(),
        })
    }
}

impl<T> Iterator for Rest<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Rest<T> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Rest<T> {}
impl<T> FusedIterator for Rest<T> {}

/// Numeric rest arguments
pub(crate) type NumRest = Rest<IntType>;

/// Rest arguments of any kind
pub(crate) type TermRest = Rest<Term>;

// =====================================================================
// Adapter traits
// =====================================================================

/// Converts a fixed-arity typed function into an erased [`OperationFn`].
///
/// Builtins return `Result<R, Error>` for any `R: Into<Term>`.
pub(crate) trait IntoOperation<Args> {
    fn into_operation(self) -> Rc<OperationFn>;
}

/// Converts a function taking an optional fixed prefix plus a [`Rest`]
/// parameter into an erased [`OperationFn`].
pub(crate) trait IntoVariadicOperation<Args> {
    fn into_variadic_operation(self) -> Rc<OperationFn>;
}

fn into_term_result<R: Into<Term>>(result: Result<R, Error>) -> Result<Term, Error> {
    result.map(Into::into)
}

/// Helper macro to implement `IntoOperation` for functions of various
/// arities. The argument vector is destructured into an array of the
/// exact length, so a count mismatch surfaces as an arity error.
macro_rules! impl_into_operation_for_arity {
    ($arity:expr, $( $p:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoOperation<( $( $A, )+ )> for F
        where
            F: Fn( $( $A ),+ ) -> Result<R, Error> + 'static,
            $( $A: FromParam, )+
            R: Into<Term>,
        {
            fn into_operation(self) -> Rc<OperationFn> {
                Rc::new(move |args: Vec<Term>| -> Result<Term, Error> {
                    let len = args.len();
                    let [ $( $p ),+ ] = <[Term; $arity]>::try_from(args)
                        .map_err(|_| Error::arity_error(Arity::Exact($arity), len))?;
                    $(
                        let $p = <$A as FromParam>::from_arg($p)?;
                    )+
                    into_term_result((self)( $( $p ),+ ))
                })
            }
        }
    };
}

impl_into_operation_for_arity!(1, p0: A1);
impl_into_operation_for_arity!(2, p0: A1, p1: A2);

/// Rest parameter only
impl<F, T, R> IntoVariadicOperation<(Rest<T>,)> for F
where
    F: Fn(Rest<T>) -> Result<R, Error> + 'static,
    T: FromParam,
    R: Into<Term>,
{
    fn into_variadic_operation(self) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Term>| -> Result<Term, Error> {
            into_term_result((self)(Rest::new(args)?))
        })
    }
}

/// One fixed parameter followed by a rest parameter
impl<F, A, T, R> IntoVariadicOperation<(A, Rest<T>)> for F
where
    F: Fn(A, Rest<T>) -> Result<R, Error> + 'static,
    A: FromParam,
    T: FromParam,
    R: Into<Term>,
{
    fn into_variadic_operation(self) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Term>| -> Result<Term, Error> {
            let mut args = args.into_iter();
            let Some(first) = args.next() else {
                return Err(Error::arity_error(Arity::AtLeast(1), 0));
            };
            let first = A::from_arg(first)?;
            let rest = Rest::new(args.collect())?;
            into_term_result((self)(first, rest))
        })
    }
}
