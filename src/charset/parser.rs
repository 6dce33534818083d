//! Parser for `.cst` charset definition files.
//!
//! The file format:
//!
//! ```text
//! \charset tengwar_test            ** optional; defaults to the file stem
//! \char E000 TINCO
//! \char E020 SULE THULE            ** aliases share one entry
//! \char E0C0 PUNCT_PILINKE punct   ** trailing lower-case words are flags
//! \virtual LIGA_LL {
//!   LAMBE LIGA_LL --> DOUBLE_LAMBE;
//!   \sequence LAMBE LAMBE
//!   \swap before
//! }
//! ```
//!
//! Font codes are always hexadecimal, without an `0x` prefix. The virtual
//! body is a brace block: rewrite lines terminated by `;`, plus optional
//! `\sequence` and `\swap` declarations.

use std::fs;
use std::path::Path;

use crate::error::ParseError;
use crate::glaeml;

use super::{Char, CharFlags, Charset, Rewrite, SwapSide, VirtualChar};

/// Parses charset files into [`Charset`] objects.
#[derive(Debug, Default)]
pub struct CharsetParser;

impl CharsetParser {
    /// A fresh parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a charset from a file path; the file stem names the charset
    /// unless a `\charset` directive overrides it.
    ///
    /// # Errors
    ///
    /// Returns the accumulated parse errors, io failures included as a
    /// single error at line 0.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Charset, Vec<ParseError>> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = fs::read_to_string(path)
            .map_err(|e| vec![ParseError::new(0, format!("cannot read {}: {e}", path.display()))])?;
        self.parse_str(&stem, &source)
    }

    /// Parse a charset from in-memory source.
    ///
    /// # Errors
    ///
    /// Returns every parse error found; the charset is not constructed
    /// partially on failure.
    pub fn parse_str(&self, name: &str, source: &str) -> Result<Charset, Vec<ParseError>> {
        let doc = glaeml::Parser::new(&[]).parse(source);
        let mut errors = doc.errors.clone();
        let mut charset = Charset::new(name);

        for node in &doc.root.children {
            if node.is_text() {
                errors.push(ParseError::new(
                    node.line,
                    format!("stray text in charset file: `{}`", node.text().unwrap_or_default()),
                ));
                continue;
            }
            match node.name.as_str() {
                "charset" => {
                    if let Some(n) = node.first_arg() {
                        charset.name = n.to_string();
                    }
                }
                "char" => self.parse_char(node, &mut charset, &mut errors),
                "virtual" => self.parse_virtual(node, &mut charset, &mut errors),
                other => {
                    errors.push(ParseError::new(
                        node.line,
                        format!("unknown charset directive `\\{other}`"),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(charset)
        } else {
            Err(errors)
        }
    }

    fn parse_char(&self, node: &glaeml::Node, charset: &mut Charset, errors: &mut Vec<ParseError>) {
        let Some(code_text) = node.first_arg() else {
            errors.push(ParseError::new(node.line, "`\\char` is missing its font code"));
            return;
        };
        let code = match u32::from_str_radix(code_text, 16) {
            Ok(code) if code <= 0x10FFFF => code,
            _ => {
                errors.push(ParseError::new(
                    node.line,
                    format!("invalid font code `{code_text}` (expected hex)"),
                ));
                return;
            }
        };

        let mut flags = CharFlags::default();
        let mut names = Vec::new();
        for arg in &node.args[1..] {
            match arg.as_str() {
                "punct" => flags.punctuation = true,
                "space" => flags.space = true,
                "digit" => flags.digit = true,
                "?" => {} // placeholder slot, skipped
                name => names.push(name.to_string()),
            }
        }
        if names.is_empty() {
            errors.push(ParseError::new(node.line, "`\\char` declares no usable name"));
            return;
        }
        charset.add_char(Char {
            line: node.line,
            code,
            names,
            flags,
        });
    }

    fn parse_virtual(
        &self,
        node: &glaeml::Node,
        charset: &mut Charset,
        errors: &mut Vec<ParseError>,
    ) {
        // Last argument is the brace body; everything before it is a name.
        if node.args.len() < 2 {
            errors.push(ParseError::new(
                node.line,
                "`\\virtual` needs a name and a `{ ... }` body",
            ));
            return;
        }
        let (names, body) = node.args.split_at(node.args.len() - 1);
        let names: Vec<String> = names.iter().filter(|n| *n != "?").cloned().collect();
        if names.is_empty() {
            errors.push(ParseError::new(node.line, "`\\virtual` declares no usable name"));
            return;
        }

        let mut rewrites = Vec::new();
        let mut sequence = Vec::new();
        let mut swap = None;
        for raw in body[0].lines() {
            let line = raw.trim().trim_end_matches(';').trim();
            if line.is_empty() || line.starts_with("**") {
                continue;
            }
            if let Some(rest) = line.strip_prefix("\\sequence") {
                sequence = rest.split_whitespace().map(str::to_string).collect();
                if sequence.is_empty() {
                    errors.push(ParseError::new(node.line, "`\\sequence` lists no tokens"));
                }
            } else if let Some(rest) = line.strip_prefix("\\swap") {
                swap = match rest.trim() {
                    "before" => Some(SwapSide::Before),
                    "after" => Some(SwapSide::After),
                    other => {
                        errors.push(ParseError::new(
                            node.line,
                            format!("`\\swap` side must be `before` or `after`, got `{other}`"),
                        ));
                        None
                    }
                };
            } else if let Some((trigger, replacement)) = line.split_once("-->") {
                let trigger: Vec<String> =
                    trigger.split_whitespace().map(str::to_string).collect();
                let replacement: Vec<String> =
                    replacement.split_whitespace().map(str::to_string).collect();
                if trigger.is_empty() {
                    errors.push(ParseError::new(node.line, "rewrite with empty trigger"));
                    continue;
                }
                if !trigger.iter().any(|t| names.contains(t)) {
                    errors.push(ParseError::new(
                        node.line,
                        format!("rewrite trigger `{}` never mentions the virtual itself", trigger.join(" ")),
                    ));
                    continue;
                }
                rewrites.push(Rewrite {
                    trigger,
                    replacement,
                });
            } else {
                errors.push(ParseError::new(
                    node.line,
                    format!("cannot understand virtual body line `{line}`"),
                ));
            }
        }

        charset.add_virtual(VirtualChar {
            line: node.line,
            names,
            rewrites,
            sequence,
            swap,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
** test charset
\\char E000 TINCO
\\char E020 SULE THULE
\\char E0C0 PUNCT_PILINKE punct
\\virtual LIGA_LL {
  LAMBE LIGA_LL --> DOUBLE_LAMBE;
}
";

    #[test]
    fn parses_chars_and_aliases() {
        let cs = CharsetParser::new().parse_str("test", SAMPLE).unwrap();
        assert_eq!(cs.char_named("TINCO").unwrap().code, 0xE000);
        assert_eq!(cs.canonical("THULE"), Some("SULE"));
        assert!(cs.char_named("PUNCT_PILINKE").unwrap().flags.punctuation);
    }

    #[test]
    fn parses_virtual_rewrites() {
        let cs = CharsetParser::new().parse_str("test", SAMPLE).unwrap();
        let vc = cs.virtual_named("LIGA_LL").unwrap();
        assert_eq!(vc.rewrites.len(), 1);
        assert_eq!(vc.rewrites[0].trigger, vec!["LAMBE", "LIGA_LL"]);
        assert_eq!(vc.rewrites[0].replacement, vec!["DOUBLE_LAMBE"]);
    }

    #[test]
    fn sequence_and_swap_declarations() {
        let src = "\\virtual SEQ {\n\\sequence QUESSE SILME_NUQUERNA\n\\swap after\n}\n";
        let cs = CharsetParser::new().parse_str("test", src).unwrap();
        let vc = cs.virtual_named("SEQ").unwrap();
        assert_eq!(vc.sequence, vec!["QUESSE", "SILME_NUQUERNA"]);
        assert_eq!(vc.swap, Some(SwapSide::After));
    }

    #[test]
    fn bad_font_code_is_an_error() {
        let err = CharsetParser::new()
            .parse_str("test", "\\char XYZZY NAME\n")
            .unwrap_err();
        assert!(err[0].to_string().contains("invalid font code"));
    }

    #[test]
    fn rewrite_must_mention_the_virtual() {
        let src = "\\virtual V {\nA --> B;\n}\n";
        let err = CharsetParser::new().parse_str("test", src).unwrap_err();
        assert!(err[0].to_string().contains("never mentions"));
    }
}
