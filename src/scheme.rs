//! Reader: builds [`Term`] trees from program text.
//!
//! Grammar accepted:
//!
//! ```text
//! expr      := INTEGER | SYMBOL | '(' list-body ')'
//! list-body := expr* ['.' expr]
//! ```
//!
//! `#t` and `#f` read as boolean atoms. The quote marker is lexed but has no reader
//! expansion, so a bare `'` is a syntax error. The reader performs no evaluation.

pub mod tokenizer;

use crate::Error;
use crate::MAX_PARSE_DEPTH;
use crate::ast::Term;
use tokenizer::{Token, Tokenizer};

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Skip `;` line comments
    pub handle_comments: bool,
    /// Maximum list nesting; deeper input is a syntax error
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: false,
            max_depth: MAX_PARSE_DEPTH,
        }
    }
}

/// Symbols that read as boolean atoms
fn symbol_or_boolean(name: String) -> Term {
    match name.as_str() {
        "#t" => Term::Boolean(true),
        "#f" => Term::Boolean(false),
        _ => Term::Symbol(name),
    }
}

/// Read exactly one term, leaving the tokenizer on the token after it.
pub fn read(tokenizer: &mut Tokenizer<'_>) -> Result<Term, Error> {
    read_term(tokenizer, 0)
}

fn read_term(tokenizer: &mut Tokenizer<'_>, depth: usize) -> Result<Term, Error> {
    let Some(token) = tokenizer.token().cloned() else {
        return Err(Error::syntax("unexpected end of input"));
    };

    match token {
        Token::Constant(n) => {
            tokenizer.advance()?;
            Ok(Term::Integer(n))
        }
        Token::Symbol(name) => {
            tokenizer.advance()?;
            Ok(symbol_or_boolean(name))
        }
        Token::Open => {
            if depth >= tokenizer.config().max_depth {
                return Err(Error::syntax(format!(
                    "expression too deeply nested (max depth: {})",
                    tokenizer.config().max_depth
                )));
            }
            tokenizer.advance()?;
            read_list(tokenizer, depth + 1)
        }
        Token::Close => Err(Error::syntax(format!(
            "unexpected ')' at position {}",
            tokenizer.position()
        ))),
        Token::Quote => Err(Error::syntax("unexpected quote")),
        Token::Dot => Err(Error::syntax("unexpected '.' outside of a list")),
    }
}

/// Read list elements after the opening bracket, through the matching close bracket.
fn read_list(tokenizer: &mut Tokenizer<'_>, depth: usize) -> Result<Term, Error> {
    let mut items = Vec::new();

    loop {
        match tokenizer.token() {
            None => return Err(Error::syntax("unexpected end of input: expected ')'")),
            Some(Token::Close) => {
                tokenizer.advance()?;
                return Ok(Term::list(items));
            }
            Some(Token::Dot) => {
                if items.is_empty() {
                    return Err(Error::syntax("'.' must follow at least one list element"));
                }
                tokenizer.advance()?;
                let tail = read_term(tokenizer, depth)?;

                if tokenizer.token() != Some(&Token::Close) {
                    return Err(Error::syntax("expected ')' after the tail of a dotted list"));
                }
                tokenizer.advance()?;

                items.push(tail);
                return Ok(Term::from_spine(items));
            }
            Some(_) => items.push(read_term(tokenizer, depth)?),
        }
    }
}

/// Parse the first complete S-expression from input.
pub fn parse_scheme(input: &str) -> Result<Term, Error> {
    parse_scheme_with_config(input, ParseConfig::default())
}

/// Parse the first complete S-expression from input with explicit reader options.
///
/// Input after the first term is not validated beyond the single token of lookahead
/// the tokenizer keeps.
pub fn parse_scheme_with_config(input: &str, config: ParseConfig) -> Result<Term, Error> {
    let mut tokenizer = Tokenizer::new(input, config)?;
    read(&mut tokenizer)
}
