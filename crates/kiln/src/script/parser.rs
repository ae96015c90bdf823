//! Turns logical lines into statements.

use indexmap::IndexMap;

use super::ast::{Call, Expr, LogLevel, Returned, Stmt, Template, Value};
use super::lexer::{LogicalLine, Tok};
use crate::error::{KilnError, Result};

/// Python keywords for constructs transform scripts do not have.
const UNSUPPORTED: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
    "lambda", "import", "from", "global", "nonlocal", "del", "assert", "yield", "async",
    "await",
];

/// Parsed body: docstring and statements.
pub struct Body {
    pub docstring: Option<String>,
    pub statements: Vec<Stmt>,
}

/// Parse the logical lines of a function body.
pub fn parse_body(function: &str, lines: &[LogicalLine]) -> Result<Body> {
    let Some(first) = lines.first() else {
        return Err(KilnError::Script {
            function: function.to_string(),
            line: 0,
            message: "function body is empty".to_string(),
        });
    };
    let indent = first.indent;
    if indent == 0 {
        return Err(KilnError::Script {
            function: function.to_string(),
            line: first.line,
            message: "expected an indented block".to_string(),
        });
    }

    let mut docstring = None;
    let mut statements = Vec::new();
    for (i, logical) in lines.iter().enumerate() {
        let mut cursor = Cursor {
            function,
            tokens: &logical.tokens,
            pos: 0,
            line: logical.line,
        };
        if logical.indent != indent {
            return Err(cursor.error("unexpected indentation; nested blocks are not supported"));
        }

        if let [Tok::Str(text)] = logical.tokens.as_slice() {
            if i == 0 {
                docstring = text
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(str::to_string);
            }
            continue;
        }
        if let [Tok::FStr(_)] = logical.tokens.as_slice() {
            continue;
        }

        statements.push(cursor.statement()?);
    }

    Ok(Body {
        docstring,
        statements,
    })
}

struct Cursor<'a> {
    function: &'a str,
    tokens: &'a [Tok],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn error(&self, message: impl Into<String>) -> KilnError {
        KilnError::Script {
            function: self.function.to_string(),
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&'a Tok> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Tok> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<&'a Tok> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Tok) -> Result<()> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(self.error(format!("expected {}, found {}", expected, tok))),
            None => Err(self.error(format!("expected {}, found end of line", expected))),
        }
    }

    fn name(&mut self) -> Result<&'a str> {
        match self.next() {
            Some(Tok::Name(name)) => Ok(name),
            Some(tok) => Err(self.error(format!("expected a name, found {}", tok))),
            None => Err(self.error("expected a name, found end of line")),
        }
    }

    fn end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(self.error(format!("unexpected {} after statement", tok))),
        }
    }

    fn is_name(tok: Option<&Tok>, name: &str) -> bool {
        matches!(tok, Some(Tok::Name(n)) if n == name)
    }

    fn statement(&mut self) -> Result<Stmt> {
        let Some(Tok::Name(first)) = self.peek() else {
            return Err(self.error("unsupported statement"));
        };

        if let Some(keyword) = UNSUPPORTED.iter().find(|k| **k == first.as_str()) {
            return Err(self.error(format!(
                "'{}' is not supported in transform scripts",
                keyword
            )));
        }

        match first.as_str() {
            "pass" => {
                self.pos += 1;
                self.end()?;
                Ok(Stmt::Pass)
            }
            "return" => {
                self.pos += 1;
                let line = self.line;
                let value = match (self.peek(), self.peek_at(1)) {
                    (None, _) => Returned::Nothing,
                    (Some(Tok::Name(n)), None) if n == "None" => {
                        self.pos += 1;
                        Returned::Nothing
                    }
                    (Some(Tok::Name(n)), None) if n == "dataset" => {
                        self.pos += 1;
                        Returned::Dataset
                    }
                    _ => Returned::Call(self.call()?),
                };
                self.end()?;
                Ok(Stmt::Return { value, line })
            }
            "dataset" => {
                self.pos += 1;
                self.expect(&Tok::Eq)?;
                let call = self.call()?;
                self.end()?;
                Ok(Stmt::Assign(call))
            }
            "logger" => {
                self.pos += 1;
                self.expect(&Tok::Dot)?;
                let method = self.name()?;
                let level = LogLevel::from_method(method)
                    .ok_or_else(|| self.error(format!("unknown logger method '{}'", method)))?;
                self.expect(&Tok::LParen)?;
                let message = self.expr()?;
                self.expect(&Tok::RParen)?;
                self.end()?;
                Ok(Stmt::Log { level, message })
            }
            "raise" => {
                self.pos += 1;
                let line = self.line;
                let kind = self.name()?.to_string();
                let mut message = Expr::Literal(Value::Str(String::new()));
                if self.peek() == Some(&Tok::LParen) {
                    self.pos += 1;
                    if self.peek() != Some(&Tok::RParen) {
                        message = self.expr()?;
                    }
                    self.expect(&Tok::RParen)?;
                }
                self.end()?;
                Ok(Stmt::Raise {
                    kind,
                    message,
                    line,
                })
            }
            other if self.peek_at(1) == Some(&Tok::Eq) => Err(self.error(format!(
                "cannot assign to '{}'; only 'dataset' can be assigned",
                other
            ))),
            _ => Err(self.error("unsupported statement")),
        }
    }

    /// `callee(dataset, column, args..., key=value...)`
    fn call(&mut self) -> Result<Call> {
        let line = self.line;
        let callee = self.name()?.to_string();
        self.expect(&Tok::LParen)?;

        if !Self::is_name(self.next(), "dataset") {
            return Err(self.error(format!(
                "the first argument of '{}' must be dataset",
                callee
            )));
        }
        if self.next() != Some(&Tok::Comma) {
            return Err(self.error(format!("'{}' needs a column argument", callee)));
        }
        let column = match self.next() {
            Some(Tok::Name(n)) if n == "column" => Template::column(),
            Some(Tok::Str(s)) => Template::literal(s.clone()),
            Some(Tok::FStr(t)) => t.clone(),
            _ => {
                return Err(self.error(format!(
                    "the second argument of '{}' must be column or a string",
                    callee
                )));
            }
        };

        let mut args = Vec::new();
        let mut kwargs = IndexMap::new();
        loop {
            match self.next() {
                Some(Tok::RParen) => break,
                Some(Tok::Comma) => {}
                Some(tok) => return Err(self.error(format!("expected ',' or ')', found {}", tok))),
                None => return Err(self.error("expected ')'")),
            }
            if self.peek() == Some(&Tok::RParen) {
                self.pos += 1;
                break;
            }

            if let (Some(Tok::Name(key)), Some(Tok::Eq)) = (self.peek(), self.peek_at(1)) {
                self.pos += 2;
                let value = self.expr()?;
                if kwargs.insert(key.clone(), value).is_some() {
                    return Err(self.error(format!("keyword argument '{}' repeated", key)));
                }
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.expr()?);
            }
        }

        Ok(Call {
            callee,
            column,
            args,
            kwargs,
            line,
        })
    }

    fn expr(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::Str(s.clone()))),
            Some(Tok::FStr(t)) => Ok(Expr::Text(t.clone())),
            Some(Tok::Number(n)) => Ok(Expr::Literal(Value::Number(*n))),
            Some(Tok::Minus) => match self.next() {
                Some(Tok::Number(n)) => Ok(Expr::Literal(Value::Number(-n))),
                _ => Err(self.error("'-' must be followed by a number")),
            },
            Some(Tok::Plus) => match self.next() {
                Some(Tok::Number(n)) => Ok(Expr::Literal(Value::Number(*n))),
                _ => Err(self.error("'+' must be followed by a number")),
            },
            Some(Tok::Name(name)) => match name.as_str() {
                "None" => Ok(Expr::Literal(Value::None)),
                "True" => Ok(Expr::Literal(Value::Bool(true))),
                "False" => Ok(Expr::Literal(Value::Bool(false))),
                "column" => Ok(Expr::Text(Template::column())),
                "dataset" => Err(self.error("dataset can only be the first argument of a call")),
                other => Err(self.error(format!("unknown name '{}'", other))),
            },
            Some(Tok::LBrace) => self.map(),
            Some(Tok::LBracket) => Err(self.error("lists are not supported")),
            Some(tok) => Err(self.error(format!("unexpected {}", tok))),
            None => Err(self.error("expected a value, found end of line")),
        }
    }

    /// `{key: value, ...}` after the opening brace.
    fn map(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        loop {
            if self.peek() == Some(&Tok::RBrace) {
                self.pos += 1;
                break;
            }
            let key = self.expr()?;
            if matches!(key, Expr::Map(_)) {
                return Err(self.error("map keys must be scalars"));
            }
            self.expect(&Tok::Colon)?;
            let value = self.expr()?;
            entries.push((key, value));
            match self.next() {
                Some(Tok::Comma) => {}
                Some(Tok::RBrace) => break,
                Some(tok) => return Err(self.error(format!("expected ',' or '}}', found {}", tok))),
                None => return Err(self.error("expected '}'")),
            }
        }
        Ok(Expr::Map(entries))
    }
}
