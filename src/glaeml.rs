//! Line-oriented parser for the mode/charset directive language.
//!
//! The surface is deliberately small: a file is a sequence of lines, each of
//! which is blank, a `**` comment, a `\directive arg arg ...`, or plain text
//! (legal only inside a block, where the owning component interprets it -
//! rule lines, substitution pairs, and so on).
//!
//! Directive arguments support three shapes:
//!
//! - bare words, split on whitespace;
//! - `"quoted strings"`, which keep interior spaces;
//! - `{ brace blocks }`, captured verbatim as a single argument - these may
//!   span multiple lines until the matching closing brace.
//!
//! A configurable set of *block* directives (`\processor`, `\rules`, ...)
//! collect child nodes until the matching `\end`. Everything else is an
//! inline directive. The parser never fails hard; it records
//! [`ParseError`]s and keeps going, so authors see every problem at once.

use rustc_hash::FxHashSet;

use crate::error::ParseError;

/// Node classification in the parsed document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A plain text line inside a block.
    Text,
    /// An inline `\directive`.
    Directive,
    /// A `\directive ... \end` block with children.
    Block,
}

/// One node of the parsed document tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// 1-based source line.
    pub line: usize,
    /// Node classification.
    pub kind: NodeKind,
    /// Directive name; `"text"` for text nodes.
    pub name: String,
    /// Arguments; for text nodes, the single trimmed line.
    pub args: Vec<String>,
    /// Child nodes (blocks only).
    pub children: Vec<Node>,
}

impl Node {
    /// True for text nodes.
    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// The text content of a text node.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        if self.is_text() {
            self.args.first().map(String::as_str)
        } else {
            None
        }
    }

    /// First argument, if any.
    #[inline]
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Direct children that are directives or blocks with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children
            .iter()
            .filter(move |c| !c.is_text() && c.name == name)
    }

    /// All descendant directive/block nodes with the given name, depth-first.
    pub fn find_all(&self, name: &str) -> Vec<&Node> {
        let mut out = Vec::new();
        for child in &self.children {
            if !child.is_text() && child.name == name {
                out.push(child);
            }
            out.extend(child.find_all(name));
        }
        out
    }

    /// First descendant directive/block node with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        for child in &self.children {
            if !child.is_text() && child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

/// A parsed document: the root node plus accumulated errors.
#[derive(Debug)]
pub struct Document {
    /// Synthetic root block holding the top-level nodes.
    pub root: Node,
    /// Errors hit while parsing; empty means a clean parse.
    pub errors: Vec<ParseError>,
}

impl Document {
    /// True if any parse error was recorded.
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// The directive-language parser.
///
/// Construct with the set of block directive names the caller's vocabulary
/// uses; every other directive parses as inline.
#[derive(Debug)]
pub struct Parser {
    blocks: FxHashSet<String>,
}

impl Parser {
    /// Build a parser treating `block_directives` as `\end`-terminated.
    pub fn new(block_directives: &[&str]) -> Self {
        Self {
            blocks: block_directives.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse a full document.
    pub fn parse(&self, source: &str) -> Document {
        let lines: Vec<&str> = source.lines().collect();
        let mut scanner = Scanner { lines, idx: 0 };
        let mut errors = Vec::new();
        let mut root = Node {
            line: 0,
            kind: NodeKind::Block,
            name: "root".to_string(),
            args: Vec::new(),
            children: Vec::new(),
        };
        self.parse_children(&mut root, &mut scanner, &mut errors, false);
        Document { root, errors }
    }

    /// Read nodes into `parent` until EOF, or until `\end` when inside a block.
    fn parse_children(
        &self,
        parent: &mut Node,
        scanner: &mut Scanner<'_>,
        errors: &mut Vec<ParseError>,
        in_block: bool,
    ) {
        while let Some((line_no, raw)) = scanner.next_line() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("**") {
                continue;
            }
            if let Some(rest) = line.strip_prefix('\\') {
                let (name, tail) = split_directive(rest);
                if name == "end" {
                    if in_block {
                        return;
                    }
                    errors.push(ParseError::new(line_no, "unexpected `\\end` outside any block"));
                    continue;
                }
                let args = scan_args(tail, line_no, scanner, errors);
                let mut node = Node {
                    line: line_no,
                    kind: NodeKind::Directive,
                    name: name.to_string(),
                    args,
                    children: Vec::new(),
                };
                if self.blocks.contains(name) {
                    node.kind = NodeKind::Block;
                    self.parse_children(&mut node, scanner, errors, true);
                }
                parent.children.push(node);
            } else {
                parent.children.push(Node {
                    line: line_no,
                    kind: NodeKind::Text,
                    name: "text".to_string(),
                    args: vec![line.to_string()],
                    children: Vec::new(),
                });
            }
        }
        if in_block {
            errors.push(ParseError::new(
                parent.line,
                format!("block `\\{}` is never closed by `\\end`", parent.name),
            ));
        }
    }
}

struct Scanner<'a> {
    lines: Vec<&'a str>,
    idx: usize,
}

impl<'a> Scanner<'a> {
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = *self.lines.get(self.idx)?;
        self.idx += 1;
        Some((self.idx, line))
    }
}

/// Split `name rest` after the leading backslash.
fn split_directive(rest: &str) -> (&str, &str) {
    match rest.find(char::is_whitespace) {
        Some(at) => (&rest[..at], &rest[at..]),
        None => (rest, ""),
    }
}

/// Tokenize a directive's argument tail.
///
/// Pulls further lines from the scanner while a brace block is open, so
/// `\vars { ... }` may span lines. The brace interior is captured verbatim
/// (newlines preserved) as a single argument.
fn scan_args(
    tail: &str,
    line_no: usize,
    scanner: &mut Scanner<'_>,
    errors: &mut Vec<ParseError>,
) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars: Vec<char> = tail.chars().collect();
    let mut i = 0;

    loop {
        // Skip whitespace between tokens.
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        match chars[i] {
            '"' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                if i >= chars.len() {
                    errors.push(ParseError::new(line_no, "unterminated quoted argument"));
                }
                args.push(chars[start..i.min(chars.len())].iter().collect());
                i += 1;
            }
            '{' => {
                i += 1;
                let mut depth = 1usize;
                let mut body = String::new();
                loop {
                    while i < chars.len() {
                        let c = chars[i];
                        i += 1;
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        body.push(c);
                    }
                    if depth == 0 {
                        break;
                    }
                    // Brace block continues on the next line.
                    match scanner.next_line() {
                        Some((_, next)) => {
                            body.push('\n');
                            chars = next.chars().collect();
                            i = 0;
                        }
                        None => {
                            errors.push(ParseError::new(line_no, "unterminated `{` block"));
                            break;
                        }
                    }
                }
                args.push(body.trim().to_string());
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                args.push(chars[start..i].iter().collect());
            }
        }
    }
    args
}
