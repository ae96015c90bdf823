//! Syntax tree of a compiled transform body.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::input::{Cell, format_number};

/// A literal value passed to a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Number(f64),
    Str(String),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// The value as a cell. Maps have no cell form.
    pub fn to_cell(&self) -> Option<Cell> {
        match self {
            Value::None => Some(Cell::Null),
            Value::Bool(b) => Some(Cell::Number(if *b { 1.0 } else { 0.0 })),
            Value::Number(n) => Some(Cell::Number(*n)),
            Value::Str(s) => Some(Cell::Text(s.clone())),
            Value::Map(_) => None,
        }
    }

    /// Text a map key is matched against cell text with.
    pub fn key_text(&self) -> String {
        match self {
            Value::None => String::new(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::Map(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Piece of a string that may refer to the `column` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Literal(String),
    Column,
}

/// Text built from literals and the `column` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Template(pub Vec<Part>);

impl Template {
    pub fn column() -> Self {
        Template(vec![Part::Column])
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Template(vec![Part::Literal(text.into())])
    }

    pub fn render(&self, column: &str) -> String {
        self.0
            .iter()
            .map(|part| match part {
                Part::Literal(s) => s.as_str(),
                Part::Column => column,
            })
            .collect()
    }
}

/// An argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Text(Template),
    Map(Vec<(Expr, Expr)>),
}

impl Expr {
    /// Evaluate with the `column` parameter bound.
    pub fn eval(&self, column: &str) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Text(template) => Value::Str(template.render(column)),
            Expr::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.eval(column), v.eval(column)))
                    .collect(),
            ),
        }
    }
}

/// `callee(dataset, <column>, args..., key=value...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: String,
    pub column: Template,
    pub args: Vec<Expr>,
    pub kwargs: IndexMap<String, Expr>,
    pub line: usize,
}

/// Log levels available through `logger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" | "warn" => Some(LogLevel::Warning),
            "error" | "critical" | "exception" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_log(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// What a `return` statement yields.
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
    Dataset,
    Call(Call),
    Nothing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `dataset = call(...)`
    Assign(Call),
    Return { value: Returned, line: usize },
    Log { level: LogLevel, message: Expr },
    Raise { kind: String, message: Expr, line: usize },
    Pass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_render() {
        let template = Template(vec![Part::Column, Part::Literal("_age".into())]);
        assert_eq!(template.render("bdate"), "bdate_age");
    }

    #[test]
    fn test_value_display() {
        let map = Value::Map(vec![
            (Value::Str("a".into()), Value::Number(1.0)),
            (Value::None, Value::Bool(true)),
        ]);
        assert_eq!(map.to_string(), "{\"a\": 1, None: True}");
    }

    #[test]
    fn test_key_text_matches_cell_display() {
        assert_eq!(Value::Number(7.0).key_text(), Cell::Number(7.0).to_string());
        assert_eq!(Value::Str("x".into()).key_text(), "x");
    }
}
