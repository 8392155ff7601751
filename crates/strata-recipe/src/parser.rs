//! `.strata` recipe parser built on the token stream from [`crate::lexer`].
//!
//! Transforms raw recipe text into an ordered [`Instruction`] sequence.
//! Ordering and cardinality rules are checked afterwards by
//! [`crate::validator`].

use strata_common::error::{Result, StrataError};

use crate::ast::{Instruction, UserDecl};
use crate::lexer::{self, Token};

/// Cursor into a token stream for recursive-descent parsing.
struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s.clone()),
            other => Err(parse_err(format!("expected identifier, got {other:?}"))),
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(parse_err(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::StringLiteral(s)) => Ok(s.clone()),
            other => Err(parse_err(format!(
                "expected string literal, got {other:?}"
            ))),
        }
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.advance() {
            Some(Token::Integer(n)) => Ok(*n),
            other => Err(parse_err(format!("expected integer, got {other:?}"))),
        }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

const fn parse_err(message: String) -> StrataError {
    StrataError::Recipe { message }
}

fn skip_optional_comma(cursor: &mut TokenCursor<'_>) {
    if cursor.peek() == Some(&Token::Comma) {
        let _ = cursor.advance();
    }
}

/// Parses recipe source text into an ordered instruction sequence.
///
/// # Errors
///
/// Returns an error if the input contains syntax errors. Semantic rules
/// (ordering, cardinality) are enforced by [`crate::validator::validate`].
pub fn parse(input: &str) -> Result<Vec<Instruction>> {
    tracing::debug!("parsing recipe input");
    let tokens = lexer::tokenize(input)?;
    let mut cursor = TokenCursor::new(&tokens);
    let mut instructions = Vec::new();

    while let Some(tok) = cursor.peek() {
        let instruction = match tok {
            Token::From => parse_from(&mut cursor)?,
            Token::Workdir => parse_workdir(&mut cursor)?,
            Token::Toolchain => parse_toolchain(&mut cursor)?,
            Token::Install => parse_install(&mut cursor)?,
            Token::Copy => parse_copy(&mut cursor)?,
            Token::User => parse_user(&mut cursor)?,
            Token::Cmd => parse_cmd(&mut cursor)?,
            other => {
                return Err(parse_err(format!(
                    "expected a recipe instruction at top level, got {other:?}"
                )));
            }
        };
        instructions.push(instruction);
    }

    Ok(instructions)
}

fn parse_from(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::From)?;
    let source = cursor.expect_string()?;
    Ok(Instruction::From { source })
}

fn parse_workdir(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::Workdir)?;
    let path = cursor.expect_string()?;
    Ok(Instruction::Workdir { path })
}

fn parse_toolchain(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::Toolchain)?;
    let packages = parse_identifier_list(cursor)?;
    Ok(Instruction::Toolchain { packages })
}

fn parse_install(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::Install)?;
    let manifest = cursor.expect_string()?;
    Ok(Instruction::Install { manifest })
}

fn parse_copy(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::Copy)?;
    let source = cursor.expect_string()?;
    Ok(Instruction::Copy { source })
}

fn parse_user(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::User)?;
    let name = cursor.expect_identifier()?;

    let mut decl = UserDecl {
        name,
        uid: None,
        home: None,
    };

    if cursor.peek() == Some(&Token::BraceOpen) {
        let _ = cursor.advance();
        while cursor.peek() != Some(&Token::BraceClose) {
            if cursor.at_end() {
                return Err(parse_err("unexpected end of input inside USER block".into()));
            }
            let key = cursor.expect_identifier()?;
            cursor.expect_token(&Token::Equals)?;
            match key.as_str() {
                "uid" => {
                    let val = cursor.expect_integer()?;
                    decl.uid = Some(
                        u32::try_from(val)
                            .map_err(|_| parse_err(format!("uid value out of range: {val}")))?,
                    );
                }
                "home" => decl.home = Some(cursor.expect_string()?),
                _ => {
                    return Err(parse_err(format!("unknown USER property: {key}")));
                }
            }
            skip_optional_comma(cursor);
        }
        cursor.expect_token(&Token::BraceClose)?;
    }

    Ok(Instruction::User(decl))
}

fn parse_cmd(cursor: &mut TokenCursor<'_>) -> Result<Instruction> {
    cursor.expect_token(&Token::Cmd)?;
    let argv = parse_string_list(cursor)?;
    Ok(Instruction::Cmd { argv })
}

fn parse_string_list(cursor: &mut TokenCursor<'_>) -> Result<Vec<String>> {
    cursor.expect_token(&Token::BracketOpen)?;
    let mut items = Vec::new();

    while cursor.peek() != Some(&Token::BracketClose) {
        if cursor.at_end() {
            return Err(parse_err("unexpected end of input inside list".into()));
        }
        items.push(cursor.expect_string()?);
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BracketClose)?;
    Ok(items)
}

/// Parses a bracketed list of bare identifiers (package names).
fn parse_identifier_list(cursor: &mut TokenCursor<'_>) -> Result<Vec<String>> {
    cursor.expect_token(&Token::BracketOpen)?;
    let mut items = Vec::new();

    while cursor.peek() != Some(&Token::BracketClose) {
        if cursor.at_end() {
            return Err(parse_err("unexpected end of input inside list".into()));
        }
        match cursor.advance() {
            Some(Token::Identifier(s)) => items.push(s.clone()),
            Some(Token::StringLiteral(s)) => items.push(s.clone()),
            other => {
                return Err(parse_err(format!("expected package name, got {other:?}")));
            }
        }
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BracketClose)?;
    Ok(items)
}
