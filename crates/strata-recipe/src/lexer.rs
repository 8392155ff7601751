//! Tokenization of `.strata` recipe text using `nom`.
//!
//! Produces a stream of [`Token`]s from raw input for the parser to consume.
//! Whitespace and `#` line comments are discarded between tokens.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending},
    combinator::value,
    multi::many0,
    sequence::preceded,
};
use strata_common::error::{Result, StrataError};

/// A token in the `.strata` recipe language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `FROM` keyword — base environment selection.
    From,
    /// `WORKDIR` keyword — working directory inside the image.
    Workdir,
    /// `TOOLCHAIN` keyword — system compiler/linker package installation.
    Toolchain,
    /// `INSTALL` keyword — dependency-manifest installation.
    Install,
    /// `COPY` keyword — source tree materialization.
    Copy,
    /// `USER` keyword — restricted execution account declaration.
    User,
    /// `CMD` keyword — entry command declaration.
    Cmd,
    /// An identifier (user name, package name, property name).
    Identifier(String),
    /// A double-quoted string literal.
    StringLiteral(String),
    /// An integer literal.
    Integer(i64),
    /// `{` opening brace.
    BraceOpen,
    /// `}` closing brace.
    BraceClose,
    /// `[` opening bracket.
    BracketOpen,
    /// `]` closing bracket.
    BracketClose,
    /// `=` assignment.
    Equals,
    /// `,` comma separator.
    Comma,
}

/// Skippable items: whitespace or `#` line comments.
fn skip_trivia(input: &str) -> IResult<&str, ()> {
    let comment = value((), preceded(tag("#"), not_line_ending));
    let ws = value((), multispace1);
    let (input, _) = many0(alt((ws, comment))).parse(input)?;
    Ok((input, ()))
}

/// Parses a double-quoted string literal with basic escape support.
fn string_literal(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = input.char_indices();
    loop {
        match chars.next() {
            Some((idx, '"')) => {
                let remaining = &input[idx + 1..];
                return Ok((remaining, Token::StringLiteral(result)));
            }
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, '"')) => result.push('"'),
                Some((_, c)) => {
                    result.push('\\');
                    result.push(c);
                }
                None => {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Char,
                    )));
                }
            },
            Some((_, c)) => result.push(c),
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

/// Parses an integer literal (sequence of digits).
fn integer_literal(input: &str) -> IResult<&str, Token> {
    let (input, digits) = digit1(input)?;
    let val: i64 = digits.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((input, Token::Integer(val)))
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '+'
}

/// Parses an identifier or keyword.
///
/// Package identifiers may contain `.` and `+` (`g++`, `libssl3.1`), so
/// those are valid continuation characters.
fn identifier_or_keyword(input: &str) -> IResult<&str, Token> {
    let (input, first) = take_while1(is_ident_start)(input)?;
    let (input, rest) = take_while(is_ident_continue)(input)?;
    let word = format!("{first}{rest}");
    let token = match word.as_str() {
        "FROM" => Token::From,
        "WORKDIR" => Token::Workdir,
        "TOOLCHAIN" => Token::Toolchain,
        "INSTALL" => Token::Install,
        "COPY" => Token::Copy,
        "USER" => Token::User,
        "CMD" => Token::Cmd,
        _ => Token::Identifier(word),
    };
    Ok((input, token))
}

/// Parses a symbol token.
fn symbol(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::BraceOpen, char('{')),
        value(Token::BraceClose, char('}')),
        value(Token::BracketOpen, char('[')),
        value(Token::BracketClose, char(']')),
        value(Token::Equals, char('=')),
        value(Token::Comma, char(',')),
    ))
    .parse(input)
}

/// Parses a single token (after trivia has been skipped).
fn single_token(input: &str) -> IResult<&str, Token> {
    alt((string_literal, symbol, integer_literal, identifier_or_keyword)).parse(input)
}

/// Tokenizes a `.strata` recipe string into a vector of tokens.
///
/// Whitespace and `#` line comments are discarded.
///
/// # Errors
///
/// Returns an error if the input contains characters that cannot be
/// tokenized.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, ()) = skip_trivia(remaining).map_err(|e| StrataError::Recipe {
            message: format!("lexer error skipping whitespace: {e}"),
        })?;
        remaining = rest;

        if remaining.is_empty() {
            break;
        }

        let (rest, token) = single_token(remaining).map_err(|e| StrataError::Recipe {
            message: format!(
                "unexpected character at: \"{}\" ({e})",
                &remaining[..remaining.len().min(20)]
            ),
        })?;
        tokens.push(token);
        remaining = rest;
    }

    Ok(tokens)
}
