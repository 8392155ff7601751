//! Dependency-manifest parsing.
//!
//! A manifest declares one logical dependency per line: a bare package name
//! or `name<op>version` with `op` one of `==`, `>=`, `<=`, `~=`, `!=`.
//! Blank lines and `#` comments are ignored. The whole file must parse
//! before any install command runs — a malformed line is a fatal
//! resolution error, not a warning.

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};

/// Version-constraint operators, in the order they are matched.
const OPERATORS: &[&str] = &["==", ">=", "<=", "~=", "!="];

/// A single declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name.
    pub name: String,
    /// Version constraint, if the line carried one.
    pub constraint: Option<Constraint>,
}

/// A version constraint attached to a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Comparison operator (`==`, `>=`, `<=`, `~=`, `!=`).
    pub op: String,
    /// Version string the operator compares against.
    pub version: String,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}{}{}", self.name, c.op, c.version),
            None => write!(f, "{}", self.name),
        }
    }
}

fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Parses manifest text into its declared dependencies.
///
/// # Errors
///
/// Returns a resolution error naming the offending line if any entry is
/// malformed.
pub fn parse_manifest(input: &str) -> Result<Vec<Dependency>> {
    let mut dependencies = Vec::new();

    for (lineno, raw) in input.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        dependencies.push(parse_line(line, lineno + 1)?);
    }

    tracing::debug!(count = dependencies.len(), "parsed dependency manifest");
    Ok(dependencies)
}

fn parse_line(line: &str, lineno: usize) -> Result<Dependency> {
    let malformed = |detail: &str| StrataError::Resolution {
        package: line.to_string(),
        message: format!("manifest line {lineno}: {detail}"),
    };

    for op in OPERATORS {
        if let Some((name, version)) = line.split_once(op) {
            let name = name.trim();
            let version = version.trim();
            if !is_valid_package_name(name) {
                return Err(malformed("invalid package name"));
            }
            if version.is_empty()
                || !version
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '-' | '+'))
            {
                return Err(malformed("invalid version string"));
            }
            return Ok(Dependency {
                name: name.to_string(),
                constraint: Some(Constraint {
                    op: (*op).to_string(),
                    version: version.to_string(),
                }),
            });
        }
    }

    if !is_valid_package_name(line) {
        return Err(malformed("invalid package name"));
    }
    Ok(Dependency {
        name: line.to_string(),
        constraint: None,
    })
}
