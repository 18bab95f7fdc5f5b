//! Lexer for the reader.
//!
//! The [`Tokenizer`] holds exactly one token of lookahead: [`Tokenizer::token`] is the
//! current token and [`Tokenizer::advance`] lexes the next one. Individual tokens are
//! recognized with `nom` combinators over the remaining input.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, digit1, multispace0, not_line_ending, one_of, satisfy},
    combinator::{map, opt, recognize, value},
    error::ErrorKind,
    sequence::pair,
};

use crate::Error;
use crate::ast::IntType;
use crate::scheme::ParseConfig;

/// Characters, besides ASCII letters, that may start a symbol
const SYMBOL_START_CHARS: &str = "<=>*/#";

/// Characters, besides symbol starters and digits, allowed after the first character
const SYMBOL_TAIL_CHARS: &str = "/?!-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Integer literal, `[+-]?[0-9]+`
    Constant(IntType),
    Symbol(String),
    Open,
    Close,
    Quote,
    Dot,
}

fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphabetic() || SYMBOL_START_CHARS.contains(c)
}

fn is_symbol_tail(c: char) -> bool {
    is_symbol_start(c) || c.is_ascii_digit() || SYMBOL_TAIL_CHARS.contains(c)
}

/// Parse an integer literal with an optional sign
fn lex_integer(input: &str) -> IResult<&str, Token> {
    let (remaining, literal) = recognize(pair(opt(one_of("+-")), digit1)).parse(input)?;

    match literal.parse::<IntType>() {
        Ok(n) => Ok((remaining, Token::Constant(n))),
        // Digits were consumed, so no other token kind can match: fail hard
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        ))),
    }
}

/// Parse a symbol. A lone `+` or `-` not followed by digits is a symbol on its own.
fn lex_symbol(input: &str) -> IResult<&str, Token> {
    map(
        alt((
            recognize(pair(satisfy(is_symbol_start), take_while(is_symbol_tail))),
            recognize(one_of("+-")),
        )),
        |name: &str| Token::Symbol(name.to_owned()),
    )
    .parse(input)
}

fn lex_token(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Open, char('(')),
        value(Token::Close, char(')')),
        value(Token::Quote, char('\'')),
        value(Token::Dot, char('.')),
        lex_integer,
        lex_symbol,
    ))
    .parse(input)
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), not_line_ending)).parse(input)
}

/// Skip whitespace and, when enabled, `;` line comments
fn skip_trivia(mut input: &str, handle_comments: bool) -> &str {
    loop {
        if let Ok((rest, _)) = whitespace(input) {
            input = rest;
        }

        if !handle_comments {
            return input;
        }
        match line_comment(input) {
            Ok((rest, _)) => input = rest,
            Err(_) => return input,
        }
    }
}

/// One-token-lookahead lexer over a program string.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    input: &'a str,
    remaining: &'a str,
    current: Option<Token>,
    config: ParseConfig,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer positioned on the first token of `input`.
    pub fn new(input: &'a str, config: ParseConfig) -> Result<Self, Error> {
        let mut tokenizer = Tokenizer {
            input,
            remaining: input,
            current: None,
            config,
        };
        tokenizer.advance()?;
        Ok(tokenizer)
    }

    /// True once every token has been consumed
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    /// The current token, or `None` at end of input
    pub fn token(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Byte offset of the unconsumed input
    pub fn position(&self) -> usize {
        self.input.len() - self.remaining.len()
    }

    /// Move to the next token. Whitespace is skipped and never produces a token.
    pub fn advance(&mut self) -> Result<(), Error> {
        self.remaining = skip_trivia(self.remaining, self.config.handle_comments);

        if self.remaining.is_empty() {
            self.current = None;
            return Ok(());
        }

        match lex_token(self.remaining) {
            Ok((rest, token)) => {
                self.remaining = rest;
                self.current = Some(token);
                Ok(())
            }
            Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
                let literal: String = self
                    .remaining
                    .chars()
                    .take_while(|c| *c == '+' || *c == '-' || c.is_ascii_digit())
                    .collect();
                Err(Error::syntax(format!(
                    "integer literal out of range: {literal} at position {}",
                    self.position()
                )))
            }
            Err(_) => {
                let found = self.remaining.chars().next().unwrap_or_default();
                Err(Error::syntax(format!(
                    "unknown token '{found}' at position {}",
                    self.position()
                )))
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn symbol(name: &str) -> Token {
        Token::Symbol(name.to_owned())
    }

    fn tokenize(input: &str, config: ParseConfig) -> Result<Vec<Token>, Error> {
        let mut tokenizer = Tokenizer::new(input, config)?;
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.token() {
            tokens.push(token.clone());
            tokenizer.advance()?;
        }
        Ok(tokens)
    }

    #[test]
    fn test_tokenizer_data_driven() {
        use Token::*;

        let test_cases = vec![
            ("", vec![]),
            ("   \n\t ", vec![]),
            ("42", vec![Constant(42)]),
            ("-7 +7", vec![Constant(-7), Constant(7)]),
            ("+ -", vec![symbol("+"), symbol("-")]),
            ("(+ 1 2)", vec![Open, symbol("+"), Constant(1), Constant(2), Close]),
            ("'x", vec![Quote, symbol("x")]),
            ("(1 . 2)", vec![Open, Constant(1), Dot, Constant(2), Close]),
            ("#t #f", vec![symbol("#t"), symbol("#f")]),
            (
                "set-car! list? <= >= /",
                vec![
                    symbol("set-car!"),
                    symbol("list?"),
                    symbol("<="),
                    symbol(">="),
                    symbol("/"),
                ],
            ),
            ("a1b2", vec![symbol("a1b2")]),
            // digits stop at the first non-digit
            ("12abc", vec![Constant(12), symbol("abc")]),
            // a sign only joins digits; otherwise it stands alone
            ("-abc", vec![symbol("-"), symbol("abc")]),
            (
                "9223372036854775807 -9223372036854775808",
                vec![Constant(i64::MAX), Constant(i64::MIN)],
            ),
        ];

        for (input, expected) in test_cases {
            let tokens = tokenize(input, ParseConfig::default())
                .unwrap_or_else(|e| panic!("tokenizing '{input}' failed: {e}"));
            assert_eq!(tokens, expected, "tokens for '{input}'");
        }
    }

    #[test]
    fn test_tokenizer_errors() {
        for input in ["@", "(a @)", "\"str\"", "a;b", "9223372036854775808", "[1]"] {
            let result = tokenize(input, ParseConfig::default());
            assert!(
                matches!(result, Err(Error::SyntaxError(_))),
                "expected SyntaxError for '{input}', got {result:?}"
            );
        }
    }

    #[test]
    fn test_current_token_and_advance() {
        let mut tokenizer = Tokenizer::new(" (x) ", ParseConfig::default()).unwrap();
        assert!(!tokenizer.is_end());
        assert_eq!(tokenizer.token(), Some(&Token::Open));
        // The current token is stable until advance
        assert_eq!(tokenizer.token(), Some(&Token::Open));

        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.token(), Some(&symbol("x")));
        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.token(), Some(&Token::Close));
        tokenizer.advance().unwrap();
        assert!(tokenizer.is_end());
        assert_eq!(tokenizer.position(), 5);
    }

    #[test]
    fn test_comments_are_configurable() {
        let with_comments = ParseConfig {
            handle_comments: true,
            ..ParseConfig::default()
        };

        let tokens = tokenize("; leading\n(a ; inner\n b) ; trailing", with_comments).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Open, symbol("a"), symbol("b"), Token::Close]
        );

        assert!(tokenize("; comment", ParseConfig::default()).is_err());
        assert_eq!(tokenize("; only a comment", with_comments).unwrap(), vec![]);
    }

    #[test]
    fn test_error_reports_position() {
        let err = tokenize("(a  %)", ParseConfig::default()).unwrap_err();
        assert_eq!(
            err,
            Error::SyntaxError("unknown token '%' at position 4".to_owned())
        );
    }
}
