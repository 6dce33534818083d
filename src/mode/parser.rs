//! Parser for `.glaem` mode files.
//!
//! The recognized surface:
//!
//! ```text
//! \language qya
//! \writing tengwar
//! \charset tengwar_test true
//! \options { reverse_numbers: true }
//! \preprocessor
//!   "ë" --> "e"
//! \end
//! \processor
//!   \rules main
//!     \vars { VOWELS = (a,e,i,o,u); }
//!     \def pair(S, D)
//!       {S} --> {D}
//!     \end
//!     \deploy pair(t, TINCO) if classic
//!     [{VOWELS}] --> [(A_TEHTA,E_TEHTA,I_TEHTA,O_TEHTA,U_TEHTA)]
//!   \end
//! \end
//! \postprocessor
//!   \resolve_charsets
//!   \resolve_virtuals
//!   \emit spaces
//! \end
//! ```

use std::fs;
use std::path::Path;

use crate::error::ParseError;
use crate::glaeml;
use crate::postprocessor::{EmitPolicy, PostOp, PostProcessor};
use crate::rules::{CodeLine, Deploy, Macro, Predicate, RuleGroup, Statement};

use super::{Mode, ModeOption};

const BLOCK_DIRECTIVES: &[&str] = &["preprocessor", "processor", "postprocessor", "rules", "def"];

/// Parses mode files into [`Mode`] objects.
#[derive(Debug, Default)]
pub struct ModeParser;

impl ModeParser {
    /// A fresh parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a mode from a file path; the file stem names the mode.
    ///
    /// # Errors
    ///
    /// Returns the accumulated parse errors, io failures included as a
    /// single error at line 0.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Mode, Vec<ParseError>> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = fs::read_to_string(path)
            .map_err(|e| vec![ParseError::new(0, format!("cannot read {}: {e}", path.display()))])?;
        self.parse_str(&stem, &source)
    }

    /// Parse a mode from in-memory source.
    ///
    /// # Errors
    ///
    /// Returns every parse error found.
    pub fn parse_str(&self, name: &str, source: &str) -> Result<Mode, Vec<ParseError>> {
        let doc = glaeml::Parser::new(BLOCK_DIRECTIVES).parse(source);
        let mut errors = doc.errors.clone();
        let mut mode = Mode {
            name: name.to_string(),
            ..Mode::default()
        };

        for node in &doc.root.children {
            if node.is_text() {
                errors.push(ParseError::new(
                    node.line,
                    format!("stray text outside any block: `{}`", node.text().unwrap_or_default()),
                ));
                continue;
            }
            match node.name.as_str() {
                "language" => mode.language = node.first_arg().unwrap_or_default().to_string(),
                "writing" => mode.writing = node.first_arg().unwrap_or_default().to_string(),
                "charset" => {
                    let Some(name) = node.first_arg() else {
                        errors.push(ParseError::new(node.line, "`\\charset` needs a name"));
                        continue;
                    };
                    let is_default = node.args.get(1).is_some_and(|a| a == "true");
                    mode.charset_refs.push((name.to_string(), is_default));
                }
                "options" => self.parse_options(node, &mut mode, &mut errors),
                "preprocessor" => self.parse_preprocessor(node, &mut mode, &mut errors),
                "processor" => self.parse_processor(node, &mut mode, &mut errors),
                "postprocessor" => self.parse_postprocessor(node, &mut mode, &mut errors),
                other => {
                    errors.push(ParseError::new(
                        node.line,
                        format!("unknown mode directive `\\{other}`"),
                    ));
                }
            }
        }
        mode.preprocessor.seal();

        if errors.is_empty() {
            Ok(mode)
        } else {
            Err(errors)
        }
    }

    fn parse_options(&self, node: &glaeml::Node, mode: &mut Mode, errors: &mut Vec<ParseError>) {
        let Some(body) = node.first_arg() else {
            errors.push(ParseError::new(node.line, "`\\options` needs a `{ ... }` body"));
            return;
        };
        for item in body.lines() {
            let item = item.trim();
            if item.is_empty() || item.starts_with("**") {
                continue;
            }
            match item.split_once(':') {
                Some((name, default)) => mode.options.push(ModeOption {
                    line: node.line,
                    name: name.trim().to_string(),
                    default: default.trim().to_string(),
                }),
                None => errors.push(ParseError::new(
                    node.line,
                    format!("option item `{item}` is not `name: default`"),
                )),
            }
        }
    }

    fn parse_preprocessor(
        &self,
        node: &glaeml::Node,
        mode: &mut Mode,
        errors: &mut Vec<ParseError>,
    ) {
        for child in &node.children {
            let Some(text) = child.text() else {
                errors.push(ParseError::new(
                    child.line,
                    format!("unexpected directive `\\{}` in `\\preprocessor`", child.name),
                ));
                continue;
            };
            match text.split_once("-->") {
                Some((pattern, replacement)) => {
                    mode.preprocessor
                        .add_substitution(unquote(pattern), unquote(replacement));
                }
                None => errors.push(ParseError::new(
                    child.line,
                    format!("substitution `{text}` is not `\"pattern\" --> \"replacement\"`"),
                )),
            }
        }
    }

    fn parse_processor(&self, node: &glaeml::Node, mode: &mut Mode, errors: &mut Vec<ParseError>) {
        for child in &node.children {
            if child.is_text() {
                errors.push(ParseError::new(
                    child.line,
                    "rule lines belong inside a `\\rules` block",
                ));
                continue;
            }
            if child.name != "rules" {
                errors.push(ParseError::new(
                    child.line,
                    format!("unexpected directive `\\{}` in `\\processor`", child.name),
                ));
                continue;
            }
            let group_name = child.first_arg().unwrap_or("main");
            let mut group = RuleGroup::new(group_name);
            self.parse_group_children(child, &mut group, errors);
            mode.processor.add_group(group);
        }
    }

    fn parse_group_children(
        &self,
        node: &glaeml::Node,
        group: &mut RuleGroup,
        errors: &mut Vec<ParseError>,
    ) {
        for child in &node.children {
            if let Some(text) = child.text() {
                group.push_statement(Statement::Line(CodeLine {
                    line: child.line,
                    text: text.to_string(),
                }));
                continue;
            }
            match child.name.as_str() {
                "vars" => match child.first_arg() {
                    Some(body) => group.push_var_block(child.line, body),
                    None => errors.push(ParseError::new(
                        child.line,
                        "`\\vars` needs a `{ ... }` body",
                    )),
                },
                "def" => self.parse_macro_def(child, group, errors),
                "deploy" => {
                    if let Some(deploy) = self.parse_deploy(child, errors) {
                        group.push_statement(Statement::Deploy(deploy));
                    }
                }
                other => errors.push(ParseError::new(
                    child.line,
                    format!("unexpected directive `\\{other}` in `\\rules`"),
                )),
            }
        }
    }

    fn parse_macro_def(
        &self,
        node: &glaeml::Node,
        group: &mut RuleGroup,
        errors: &mut Vec<ParseError>,
    ) {
        let signature = node.args.join(" ");
        let Some((name, params)) = parse_call(&signature) else {
            errors.push(ParseError::new(
                node.line,
                format!("`\\def` signature `{signature}` is not `name(arg, ...)`"),
            ));
            return;
        };
        let mut body = Vec::new();
        for child in &node.children {
            if let Some(text) = child.text() {
                body.push(Statement::Line(CodeLine {
                    line: child.line,
                    text: text.to_string(),
                }));
            } else if child.name == "deploy" {
                if let Some(deploy) = self.parse_deploy(child, errors) {
                    body.push(Statement::Deploy(deploy));
                }
            } else {
                errors.push(ParseError::new(
                    child.line,
                    format!("unexpected directive `\\{}` in `\\def`", child.name),
                ));
            }
        }
        group.add_macro(Macro { name, params, body });
    }

    fn parse_deploy(&self, node: &glaeml::Node, errors: &mut Vec<ParseError>) -> Option<Deploy> {
        let text = node.args.join(" ");
        let (call, guard_text) = match text.split_once(" if ") {
            Some((call, guard)) => (call.trim().to_string(), Some(guard.trim().to_string())),
            None => (text.trim().to_string(), None),
        };
        let Some((name, args)) = parse_call(&call) else {
            errors.push(ParseError::new(
                node.line,
                format!("`\\deploy` target `{call}` is not `name(arg, ...)`"),
            ));
            return None;
        };
        let guard = match guard_text {
            Some(text) => match Predicate::parse(&text) {
                Some(predicate) => Some(predicate),
                None => {
                    errors.push(ParseError::new(
                        node.line,
                        format!("cannot parse deploy condition `{text}`"),
                    ));
                    return None;
                }
            },
            None => None,
        };
        Some(Deploy {
            line: node.line,
            name,
            args,
            guard,
        })
    }

    fn parse_postprocessor(
        &self,
        node: &glaeml::Node,
        mode: &mut Mode,
        errors: &mut Vec<ParseError>,
    ) {
        let mut ops = Vec::new();
        let mut emit = EmitPolicy::Spaces;
        for child in &node.children {
            if child.is_text() {
                errors.push(ParseError::new(
                    child.line,
                    "`\\postprocessor` takes operator directives, not text",
                ));
                continue;
            }
            match child.name.as_str() {
                "resolve_charsets" => ops.push(PostOp::ResolveCharsets),
                "resolve_virtuals" => ops.push(PostOp::ResolveVirtuals),
                "emit" => {
                    emit = match child.first_arg() {
                        None | Some("spaces") => EmitPolicy::Spaces,
                        Some("discard") => EmitPolicy::Discard,
                        Some(other) => {
                            errors.push(ParseError::new(
                                child.line,
                                format!("unknown emit policy `{other}`"),
                            ));
                            EmitPolicy::Spaces
                        }
                    };
                }
                other => errors.push(ParseError::new(
                    child.line,
                    format!("unknown postprocessor operator `\\{other}`"),
                )),
            }
        }
        mode.postprocessor = PostProcessor { ops, emit };
    }
}

/// Strip one layer of surrounding double quotes.
fn unquote(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

/// Parse `name(arg, arg)` into its parts; `name()` yields no args.
fn parse_call(text: &str) -> Option<(String, Vec<String>)> {
    let text = text.trim();
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close < open {
        return None;
    }
    let name = text[..open].trim();
    if name.is_empty() || !text[close + 1..].trim().is_empty() {
        return None;
    }
    let inner = text[open + 1..close].trim();
    let args = if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(|a| a.trim().to_string()).collect()
    };
    Some((name.to_string(), args))
}
