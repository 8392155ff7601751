//! # strata-recipe
//!
//! Parser for the `.strata` build recipe language and the dependency
//! manifest format.
//!
//! A recipe is a short, order-sensitive sequence of instructions that
//! describes one image build: base selection, working directory, toolchain
//! packages, dependency installation, source copy, execution account, and
//! entry command. Parsing happens in three phases:
//!
//! 1. [`lexer::tokenize`] — raw text to tokens (`nom`).
//! 2. [`parser::parse`] — tokens to an [`ast::Instruction`] sequence.
//! 3. [`validator::validate`] — semantic checks, producing a typed
//!    [`plan::BuildPlan`] the executor can run without re-checking order.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod ast;
pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod plan;
pub mod validator;

use strata_common::error::Result;

/// Parses and validates recipe source text into an executable build plan.
///
/// # Errors
///
/// Returns an error if the recipe cannot be tokenized, parsed, or fails
/// semantic validation.
pub fn load_plan(source: &str) -> Result<plan::BuildPlan> {
    let instructions = parser::parse(source)?;
    validator::validate(&instructions)
}
