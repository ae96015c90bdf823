//! The language custom transforms are written in.
//!
//! A custom transform is a Python-style function with the fixed signature
//! `def name(dataset, column):`. Its body is a straight sequence of
//! statements, each of which calls a transform or primitive with the
//! current dataset:
//!
//! ```text
//! # Encode the education form as an integer.
//! def encode_form(dataset, column):
//!     """Map education form labels to codes."""
//!     logger.info(f"encoding {column}")
//!     dataset = map_values(dataset, column, {"Full-time": 0, "Part-time": 2}, default=1)
//!     return fill_missing_values(dataset, column, method="mode")
//! ```
//!
//! Supported statements: `dataset = CALL`, `return dataset`,
//! `return CALL`, `return None`, `pass`, `logger.<level>(...)`,
//! `raise Name("message")`, docstrings and comments.

mod ast;
mod interpreter;
mod lexer;
mod parser;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{KilnError, Result};
use crate::transform::SIGNATURE;

pub use ast::{Call, Expr, LogLevel, Part, Returned, Stmt, Template, Value};
pub use interpreter::ScriptTransform;

use lexer::Lexer;

// =============================================================================
// DEFINITION LINES
// =============================================================================

static DEF_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*:").unwrap()
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Python keywords, which cannot name a transform.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Names with a fixed meaning inside a body.
const RESERVED: &[&str] = &["dataset", "column", "logger"];

/// Whether `name` can name a transform.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !KEYWORDS.contains(&name) && !RESERVED.contains(&name)
}

/// Whether a line is blank or a comment.
pub fn is_trivia(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// The function name declared on a `def` line.
pub fn declared_name(line: &str) -> Option<&str> {
    DEF_LINE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The exact definition line a transform called `name` must start with.
pub fn expected_definition(name: &str) -> String {
    format!("def {}{}:", name, SIGNATURE)
}

/// Validate the definition line of `source` for a transform called `name`
/// and return its index among the source lines.
pub fn check_definition(name: &str, source: &str) -> Result<usize> {
    let (index, line) = source
        .lines()
        .enumerate()
        .find(|(_, line)| !is_trivia(line))
        .ok_or_else(|| KilnError::Validation("The function source is empty".to_string()))?;

    if !line.starts_with("def ") {
        return Err(KilnError::Validation(
            "The first line of code must start with 'def '".to_string(),
        ));
    }
    let declared = declared_name(line).ok_or_else(|| {
        KilnError::Validation(format!(
            "Invalid function definition; use '{}'",
            expected_definition("name")
        ))
    })?;
    if declared != name {
        return Err(KilnError::Validation(format!(
            "The function is declared as '{}' but is being saved as '{}'",
            declared, name
        )));
    }
    let expected = expected_definition(name);
    if !line.starts_with(&expected) {
        return Err(KilnError::Validation(format!(
            "The function must have the signature '{}'",
            expected
        )));
    }
    if !is_trivia(&line[expected.len()..]) {
        return Err(KilnError::Validation(
            "The function body must start on the line after the definition".to_string(),
        ));
    }
    Ok(index)
}

/// Compile the source of one function.
///
/// `first_line` is the line number of the source's first line, so that
/// errors point into the file the source came from.
pub fn compile(name: &str, source: &str, first_line: usize) -> Result<ScriptTransform> {
    let def_index = check_definition(name, source)?;
    let body: Vec<&str> = source.lines().skip(def_index + 1).collect();
    let body_first_line = first_line + def_index + 1;

    let lines = Lexer::new(&body.join("\n"), body_first_line, "column")
        .logical_lines()
        .map_err(|e| KilnError::Script {
            function: name.to_string(),
            line: e.line,
            message: e.message,
        })?;
    let parsed = parser::parse_body(name, &lines).map_err(|e| match e {
        KilnError::Script {
            function, line: 0, message,
        } => KilnError::Script {
            function,
            line: first_line + def_index,
            message,
        },
        other => other,
    })?;

    Ok(ScriptTransform::new(
        name.to_string(),
        parsed.docstring,
        parsed.statements,
        source.to_string(),
    ))
}
