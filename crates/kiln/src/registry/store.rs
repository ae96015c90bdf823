//! Block-level model of the custom transform text store.
//!
//! The store is a preamble followed by top-level blocks. A function block
//! owns the comment lines directly above its `def` line and every line up
//! to the next top-level line; text inside triple-quoted strings never ends
//! a block. Blank lines between blocks are separators and are normalized
//! to exactly one on output.

use std::fmt;

use crate::script::declared_name;

/// What a block holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// A function definition with its declared name.
    Function(String),
    /// Any other top-level text, kept verbatim.
    Other,
}

/// One top-level block of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    kind: BlockKind,
    lines: Vec<String>,
    first_line: usize,
}

impl Block {
    /// A function block from source text.
    pub fn function(name: impl Into<String>, source: &str) -> Self {
        Self {
            kind: BlockKind::Function(name.into()),
            lines: source.lines().map(str::to_string).collect(),
            first_line: 1,
        }
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    /// The declared function name, for function blocks.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Function(name) => Some(name),
            BlockKind::Other => None,
        }
    }

    /// Line number of the block's first line in the text it was parsed
    /// from.
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// The block's text, without a trailing newline.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// The parsed store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreDocument {
    preamble: Vec<String>,
    blocks: Vec<Block>,
}

enum Segment {
    Preamble,
    Block(Block),
}

impl StoreDocument {
    /// A document with only a preamble.
    pub fn with_preamble(preamble: &str) -> Self {
        Self {
            preamble: preamble.lines().map(str::to_string).collect(),
            blocks: Vec::new(),
        }
    }

    /// Parse store text. Never fails; unrecognized text is kept verbatim.
    pub fn parse(text: &str) -> Self {
        let text = text.replace("\r\n", "\n");
        let lines: Vec<&str> = text.lines().collect();
        let boundaries = top_level_lines(&lines);

        let mut document = StoreDocument::default();
        let mut current = Segment::Preamble;

        for (i, line) in lines.iter().enumerate() {
            if !boundaries[i] {
                append(&mut document, &mut current, line);
                continue;
            }

            let is_comment = line.starts_with('#');
            if line.starts_with("def ") {
                let leading = take_leading_comments(&mut document, &mut current);
                let name = declared_name(line).unwrap_or_default().to_string();
                let first_line = i + 1 - leading.len();
                let mut block_lines = leading;
                block_lines.push(line.to_string());
                let block = Block {
                    kind: BlockKind::Function(name),
                    lines: block_lines,
                    first_line,
                };
                flush(&mut document, std::mem::replace(&mut current, Segment::Block(block)));
            } else {
                let starts_block = match &current {
                    Segment::Preamble => false,
                    Segment::Block(block) => {
                        matches!(block.kind, BlockKind::Function(_))
                            || (is_comment && ends_with_blank(&block.lines))
                    }
                };
                if starts_block {
                    let block = Block {
                        kind: BlockKind::Other,
                        lines: vec![line.to_string()],
                        first_line: i + 1,
                    };
                    flush(&mut document, std::mem::replace(&mut current, Segment::Block(block)));
                } else {
                    append(&mut document, &mut current, line);
                }
            }
        }
        flush(&mut document, current);

        trim_trailing_blank(&mut document.preamble);
        document
    }

    /// Serialize: preamble and blocks separated by one blank line.
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.blocks.len() + 1);
        if !self.preamble.is_empty() {
            parts.push(self.preamble.join("\n"));
        }
        parts.extend(self.blocks.iter().map(Block::text));
        if parts.is_empty() {
            return String::new();
        }
        let mut text = parts.join("\n\n");
        text.push('\n');
        text
    }

    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Function blocks in store order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &Block)> {
        self.blocks
            .iter()
            .filter_map(|block| block.name().map(|name| (name, block)))
    }

    /// Position of the function block declaring `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.name() == Some(name))
    }

    /// Append a block after all existing ones.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Replace the block at `index`.
    pub fn replace(&mut self, index: usize, block: Block) {
        if let Some(slot) = self.blocks.get_mut(index) {
            *slot = block;
        }
    }

    /// Remove the block at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Block> {
        (index < self.blocks.len()).then(|| self.blocks.remove(index))
    }
}

impl fmt::Display for StoreDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn append(document: &mut StoreDocument, current: &mut Segment, line: &str) {
    match current {
        Segment::Preamble => document.preamble.push(line.to_string()),
        Segment::Block(block) => block.lines.push(line.to_string()),
    }
}

fn flush(document: &mut StoreDocument, segment: Segment) {
    if let Segment::Block(mut block) = segment {
        trim_trailing_blank(&mut block.lines);
        if !block.lines.is_empty() {
            document.blocks.push(block);
        }
    }
}

/// Detach the top-level comment lines directly above the current line.
fn take_leading_comments(document: &mut StoreDocument, current: &mut Segment) -> Vec<String> {
    let lines = match current {
        Segment::Preamble => &mut document.preamble,
        Segment::Block(block) => &mut block.lines,
    };
    let keep = lines
        .iter()
        .rposition(|l| !l.starts_with('#'))
        .map_or(0, |i| i + 1);
    lines.split_off(keep)
}

fn ends_with_blank(lines: &[String]) -> bool {
    lines.last().is_some_and(|l| l.trim().is_empty())
}

fn trim_trailing_blank(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

/// For each line, whether it is a top-level line that can end a block.
///
/// A top-level line is non-blank, unindented and not inside a
/// triple-quoted string. A column-zero comment only counts when the next
/// line of code is itself top-level; otherwise it belongs to the body.
fn top_level_lines(lines: &[&str]) -> Vec<bool> {
    let mut top = Vec::with_capacity(lines.len());
    let mut open: Option<char> = None;
    for line in lines {
        let unindented = !line.trim().is_empty() && !line.starts_with([' ', '\t']);
        top.push(open.is_none() && unindented);
        open = scan_triple_quotes(line, open);
    }

    let is_code = |i: usize| {
        let trimmed = lines[i].trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    };

    let mut boundaries = top.clone();
    for i in 0..lines.len() {
        if top[i] && lines[i].starts_with('#') {
            let next_code = (i + 1..lines.len()).find(|&j| is_code(j));
            boundaries[i] = next_code.is_none_or(|j| top[j]);
        }
    }
    boundaries
}

/// Track whether a triple-quoted string is open at the end of a line.
fn scan_triple_quotes(line: &str, mut open: Option<char>) -> Option<char> {
    let chars: Vec<char> = line.chars().collect();
    let triple_at = |i: usize, q: char| {
        chars.get(i) == Some(&q) && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q)
    };
    let mut i = 0;
    while i < chars.len() {
        match open {
            Some(q) => {
                if chars[i] == '\\' {
                    i += 2;
                } else if triple_at(i, q) {
                    open = None;
                    i += 3;
                } else {
                    i += 1;
                }
            }
            None => match chars[i] {
                '#' => break,
                q @ ('"' | '\'') if triple_at(i, q) => {
                    open = Some(q);
                    i += 3;
                }
                q @ ('"' | '\'') => {
                    i += 1;
                    while i < chars.len() && chars[i] != q {
                        if chars[i] == '\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                }
                _ => i += 1,
            },
        }
    }
    open
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = "\
# Custom transforms
import logging

# Adds one.
def first(dataset, column):
    \"\"\"Doc with a blank line

def not_a_function(dataset, column):
    \"\"\"
    return dataset

def second(dataset, column):
    dataset = clip(dataset, column, 0, 1)
# column-zero comment inside the body
    return dataset

def last(dataset, column):
    return dataset
";

    fn names(document: &StoreDocument) -> Vec<&str> {
        document.functions().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_parse_blocks() {
        let document = StoreDocument::parse(STORE);
        assert_eq!(document.preamble(), ["# Custom transforms", "import logging"]);
        assert_eq!(names(&document), vec!["first", "second", "last"]);

        let first = &document.blocks()[0];
        assert_eq!(first.first_line(), 4);
        assert!(first.text().starts_with("# Adds one.\ndef first("));
        assert!(first.text().contains("def not_a_function"));

        let second = &document.blocks()[1];
        assert!(second.text().ends_with("# column-zero comment inside the body\n    return dataset"));
    }

    #[test]
    fn test_canonical_text_round_trips() {
        assert_eq!(StoreDocument::parse(STORE).render(), STORE);
    }

    #[test]
    fn test_separators_are_normalized() {
        let text = "import x\r\n\r\n\r\ndef a(dataset, column):\r\n    return dataset\r\n   \r\ndef b(dataset, column):\r\n    return dataset";
        let document = StoreDocument::parse(text);
        assert_eq!(
            document.render(),
            "import x\n\ndef a(dataset, column):\n    return dataset\n\ndef b(dataset, column):\n    return dataset\n"
        );
    }

    #[test]
    fn test_function_without_trailing_blank_line() {
        let text = "def a(dataset, column):\n    return dataset\ndef b(dataset, column):\n    return dataset\n";
        let document = StoreDocument::parse(text);
        assert_eq!(names(&document), vec!["a", "b"]);
        assert_eq!(document.blocks()[0].text(), "def a(dataset, column):\n    return dataset");
    }

    #[test]
    fn test_remove_keeps_neighbours_intact() {
        let mut document = StoreDocument::parse(STORE);
        let before: Vec<String> = document.blocks().iter().map(Block::text).collect();

        let index = document.position("second").unwrap();
        document.remove(index);

        let after = StoreDocument::parse(&document.render());
        assert_eq!(names(&after), vec!["first", "last"]);
        assert_eq!(after.blocks()[0].text(), before[0]);
        assert_eq!(after.blocks()[1].text(), before[2]);
        assert_eq!(after.preamble(), document.preamble());
    }

    #[test]
    fn test_other_blocks_are_kept() {
        let text = "def a(dataset, column):\n    return dataset\n\nHELPER = 1\n\n# stray note\n\ndef b(dataset, column):\n    return dataset\n";
        let document = StoreDocument::parse(text);
        assert_eq!(document.blocks().len(), 4);
        assert_eq!(document.blocks()[1].kind(), &BlockKind::Other);
        assert_eq!(document.blocks()[2].text(), "# stray note");
        assert_eq!(document.render(), text);
    }

    #[test]
    fn test_empty_store() {
        let document = StoreDocument::parse("");
        assert!(document.blocks().is_empty());
        assert_eq!(document.render(), "");
    }

    #[test]
    fn test_scan_triple_quotes() {
        assert_eq!(scan_triple_quotes("    \"\"\"open", None), Some('"'));
        assert_eq!(scan_triple_quotes("close\"\"\" x", Some('"')), None);
        assert_eq!(scan_triple_quotes("x = '\"\"\"'", None), None);
        assert_eq!(scan_triple_quotes("# '''", None), None);
    }
}
