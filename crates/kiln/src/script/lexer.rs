//! Splits a function body into logical lines of tokens.

use std::fmt;

use super::ast::{Part, Template};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Number(f64),
    Str(String),
    /// An f-string, already split on `{column}`.
    FStr(Template),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Eq,
    Dot,
    Minus,
    Plus,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Name(n) => write!(f, "'{}'", n),
            Tok::Number(_) => write!(f, "number"),
            Tok::Str(_) | Tok::FStr(_) => write!(f, "string"),
            Tok::LParen => write!(f, "'('"),
            Tok::RParen => write!(f, "')'"),
            Tok::LBrace => write!(f, "'{{'"),
            Tok::RBrace => write!(f, "'}}'"),
            Tok::LBracket => write!(f, "'['"),
            Tok::RBracket => write!(f, "']'"),
            Tok::Comma => write!(f, "','"),
            Tok::Colon => write!(f, "':'"),
            Tok::Eq => write!(f, "'='"),
            Tok::Dot => write!(f, "'.'"),
            Tok::Minus => write!(f, "'-'"),
            Tok::Plus => write!(f, "'+'"),
        }
    }
}

/// One statement's worth of tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    /// Source line the statement starts on.
    pub line: usize,
    /// Leading whitespace width.
    pub indent: usize,
    pub tokens: Vec<Tok>,
}

/// A lexing failure at a source line.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column_name: &'a str,
}

impl<'a> Lexer<'a> {
    /// `first_line` is the source line number of the first character.
    /// `column_name` is the parameter f-strings may interpolate.
    pub fn new(source: &str, first_line: usize, column_name: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: first_line,
            column_name,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            line: self.line,
            message: message.into(),
        }
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Tokenize the whole source.
    pub fn logical_lines(mut self) -> Result<Vec<LogicalLine>, LexError> {
        let mut lines = Vec::new();
        let mut current: Option<LogicalLine> = None;
        let mut depth = 0usize;
        let mut brackets: Vec<(char, usize)> = Vec::new();

        loop {
            if current.is_none() && depth == 0 {
                // Measure indentation; blank and comment-only lines are skipped
                let mut indent = 0;
                while let Some(c @ (' ' | '\t')) = self.peek() {
                    indent += if c == '\t' { 4 } else { 1 };
                    self.pos += 1;
                }
                match self.peek() {
                    None => break,
                    Some('\n') => {
                        self.pos += 1;
                        self.line += 1;
                        continue;
                    }
                    Some('#') => {
                        self.skip_to_line_end();
                        continue;
                    }
                    Some('\r') => {
                        self.pos += 1;
                        continue;
                    }
                    Some(_) => {
                        current = Some(LogicalLine {
                            line: self.line,
                            indent,
                            tokens: Vec::new(),
                        });
                    }
                }
            }

            let Some(c) = self.peek() else {
                break;
            };

            match c {
                ' ' | '\t' | '\r' => {
                    self.pos += 1;
                }
                '\n' => {
                    self.pos += 1;
                    self.line += 1;
                    if depth == 0 {
                        if let Some(done) = current.take() {
                            lines.push(done);
                        }
                    }
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '#' => self.skip_to_line_end(),
                '"' | '\'' => {
                    let tok = self.string(false, false)?;
                    push(&mut current, tok);
                }
                '0'..='9' => {
                    let tok = self.number()?;
                    push(&mut current, tok);
                }
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                    let tok = self.number()?;
                    push(&mut current, tok);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.word();
                    let prefix = word.to_ascii_lowercase();
                    let is_prefix = matches!(prefix.as_str(), "f" | "r" | "rf" | "fr");
                    if is_prefix && matches!(self.peek(), Some('"' | '\'')) {
                        let tok = self.string(prefix.contains('f'), prefix.contains('r'))?;
                        push(&mut current, tok);
                    } else {
                        push(&mut current, Tok::Name(word));
                    }
                }
                '(' | '{' | '[' => {
                    depth += 1;
                    brackets.push((c, self.line));
                    self.pos += 1;
                    push(
                        &mut current,
                        match c {
                            '(' => Tok::LParen,
                            '{' => Tok::LBrace,
                            _ => Tok::LBracket,
                        },
                    );
                }
                ')' | '}' | ']' => {
                    let expected = match c {
                        ')' => '(',
                        '}' => '{',
                        _ => '[',
                    };
                    match brackets.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => return Err(self.error(format!("unmatched '{}'", c))),
                    }
                    depth -= 1;
                    self.pos += 1;
                    push(
                        &mut current,
                        match c {
                            ')' => Tok::RParen,
                            '}' => Tok::RBrace,
                            _ => Tok::RBracket,
                        },
                    );
                }
                ',' | ':' | '=' | '.' | '-' | '+' => {
                    self.pos += 1;
                    if c == '=' && self.peek() == Some('=') {
                        return Err(self.error("comparisons are not supported"));
                    }
                    push(
                        &mut current,
                        match c {
                            ',' => Tok::Comma,
                            ':' => Tok::Colon,
                            '=' => Tok::Eq,
                            '.' => Tok::Dot,
                            '-' => Tok::Minus,
                            _ => Tok::Plus,
                        },
                    );
                }
                other => return Err(self.error(format!("unexpected character '{}'", other))),
            }
        }

        if let Some((open, line)) = brackets.pop() {
            return Err(LexError {
                line,
                message: format!("'{}' was never closed", open),
            });
        }
        if let Some(done) = current.take() {
            lines.push(done);
        }
        Ok(lines)
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn number(&mut self) -> Result<Tok, LexError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'));
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        text.parse::<f64>()
            .map(Tok::Number)
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    fn string(&mut self, fstring: bool, raw: bool) -> Result<Tok, LexError> {
        let start_line = self.line;
        let quote = self.peek().unwrap_or('"');
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(LexError {
                    line: start_line,
                    message: "unterminated string".to_string(),
                });
            };
            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if c == '\n' {
                if !triple {
                    return Err(LexError {
                        line: start_line,
                        message: "unterminated string".to_string(),
                    });
                }
                self.line += 1;
            }
            if c == '\\' && !raw {
                if let Some(next) = self.peek_at(1) {
                    self.pos += 2;
                    match next {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        '\\' | '\'' | '"' => text.push(next),
                        '\n' => self.line += 1,
                        other => {
                            text.push('\\');
                            text.push(other);
                        }
                    }
                    continue;
                }
            }
            text.push(c);
            self.pos += 1;
        }

        if fstring {
            self.template(&text, start_line).map(Tok::FStr)
        } else {
            Ok(Tok::Str(text))
        }
    }

    /// Split f-string text on `{column}` placeholders.
    fn template(&self, text: &str, line: usize) -> Result<Template, LexError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    if name.trim() != self.column_name {
                        return Err(LexError {
                            line,
                            message: format!(
                                "f-strings may only interpolate {{{}}}, found {{{}}}",
                                self.column_name, name
                            ),
                        });
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Column);
                }
                '}' => {
                    return Err(LexError {
                        line,
                        message: "single '}' in f-string".to_string(),
                    });
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Template(parts))
    }
}

fn push(current: &mut Option<LogicalLine>, tok: Tok) {
    if let Some(line) = current {
        line.tokens.push(tok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<LogicalLine> {
        Lexer::new(source, 2, "column").logical_lines().unwrap()
    }

    #[test]
    fn test_lines_and_indent() {
        let lines = lex("    # note\n    x = 1\n\n    return dataset\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 3);
        assert_eq!(lines[0].indent, 4);
        assert_eq!(
            lines[0].tokens,
            vec![Tok::Name("x".into()), Tok::Eq, Tok::Number(1.0)]
        );
        assert_eq!(lines[1].line, 5);
    }

    #[test]
    fn test_brackets_join_lines() {
        let lines = lex("    m = {\n        \"a\": 1,\n    }\n    pass\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].line, 5);
    }

    #[test]
    fn test_triple_quoted_docstring() {
        let lines = lex("    \"\"\"Doc\n    more\"\"\"\n    pass\n");
        assert_eq!(lines[0].tokens, vec![Tok::Str("Doc\n    more".into())]);
        assert_eq!(lines[1].line, 4);
    }

    #[test]
    fn test_escapes_and_fstrings() {
        let lines = lex("    x = 'a\\'b' + f\"{column}_age\"\n");
        assert_eq!(lines[0].tokens[2], Tok::Str("a'b".into()));
        assert_eq!(
            lines[0].tokens[4],
            Tok::FStr(Template(vec![Part::Column, Part::Literal("_age".into())]))
        );
    }

    #[test]
    fn test_errors() {
        let err = Lexer::new("    x = (1\n", 2, "column").logical_lines().unwrap_err();
        assert_eq!(err.line, 2);
        assert!(Lexer::new("    x = 'open\n", 2, "column").logical_lines().is_err());
        assert!(Lexer::new("    x = f'{other}'\n", 2, "column").logical_lines().is_err());
        assert!(Lexer::new("    x = 1 ]\n", 2, "column").logical_lines().is_err());
    }
}
