//! Rules and their enumerated sub-rules.

use crate::error::FinalizeError;
use crate::token::Token;

use super::{SheafChain, SheafChainIterator};

/// Positional constraints parsed off a rule's source side.
///
/// A leading `^` anchors to the start of a word, a leading `$` to the start
/// of a line; trailing `^`/`$` anchor the end likewise. Anchored rules only
/// accept when their constraints hold at the match site, and outrank
/// unanchored rules of equal depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Anchors {
    /// Match must begin at a word start.
    pub word_start: bool,
    /// Match must begin at a line start.
    pub line_start: bool,
    /// Match must end at a word end.
    pub word_end: bool,
    /// Match must end at a line end.
    pub line_end: bool,
}

impl Anchors {
    /// No constraints.
    #[inline]
    pub fn none() -> Self {
        Self::default()
    }

    /// Number of constraints set; used to rank strictness.
    #[inline]
    pub fn count(&self) -> u32 {
        self.word_start as u32
            + self.line_start as u32
            + self.word_end as u32
            + self.line_end as u32
    }

    /// Strip anchor markers off a source expression.
    pub fn strip(expression: &str) -> (Self, &str) {
        let mut anchors = Self::none();
        let mut rest = expression.trim();
        loop {
            if let Some(tail) = rest.strip_prefix('^') {
                anchors.word_start = true;
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix('$') {
                anchors.line_start = true;
                rest = tail;
            } else {
                break;
            }
        }
        loop {
            if let Some(head) = rest.strip_suffix('^') {
                anchors.word_end = true;
                rest = head;
            } else if let Some(head) = rest.strip_suffix('$') {
                anchors.line_end = true;
                rest = head;
            } else {
                break;
            }
        }
        (anchors, rest.trim())
    }
}

/// The destination of an authored rule.
#[derive(Debug, Clone)]
pub enum Destination {
    /// An ordinary destination chain of charset symbols.
    Chain(SheafChain),
    /// A cross-rule schema: 1-based indices into the matched source.
    Schema(Vec<usize>),
}

/// One concrete `(src, dst)` transformation, fully enumerated.
#[derive(Debug, Clone)]
pub struct SubRule {
    /// Source tokens; non-empty, placeholders removed.
    pub src: Vec<String>,
    /// Destination tokens fed to the output stream.
    pub dst: Vec<Token>,
    /// Anchor constraints inherited from the rule.
    pub anchors: Anchors,
}

/// An authored rule: source chain, destination, anchors.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Line of the rule in the mode file.
    pub line: usize,
    /// Anchor constraints from the source side.
    pub anchors: Anchors,
    /// The source chain.
    pub src: SheafChain,
    /// Destination chain or cross schema.
    pub dst: Destination,
    /// Enumerated sub-rules, filled by [`Rule::finalize`].
    pub sub_rules: Vec<SubRule>,
}

impl Rule {
    /// Build an unfinalized rule.
    pub fn new(line: usize, anchors: Anchors, src: SheafChain, dst: Destination) -> Self {
        Self {
            line,
            anchors,
            src,
            dst,
            sub_rules: Vec::new(),
        }
    }

    /// Finalize chains and enumerate sub-rules.
    ///
    /// Non-cross rules zip source and destination steps when their counts
    /// match, broadcast when either side is a singleton, and are rejected
    /// otherwise. Cross rules build each destination from the source tokens
    /// selected by the schema; duplicate indices are permitted and
    /// duplicate the token.
    pub fn finalize(&mut self, errors: &mut Vec<FinalizeError>) {
        let before = errors.len();
        self.src.finalize(self.line, errors);
        if let Destination::Chain(chain) = &mut self.dst {
            chain.finalize(self.line, errors);
        }
        if errors.len() > before {
            return;
        }

        match self.dst.clone() {
            Destination::Chain(chain) => self.finalize_plain(chain, errors),
            Destination::Schema(schema) => self.finalize_cross(schema, errors),
        }
    }

    fn finalize_plain(&mut self, dst_chain: SheafChain, errors: &mut Vec<FinalizeError>) {
        let src_iter = SheafChainIterator::new(&self.src);
        let dst_iter = SheafChainIterator::new(&dst_chain);
        let (src_total, dst_total) = (src_iter.total(), dst_iter.total());

        let pairs: Vec<(Vec<String>, Vec<String>)> = if src_total == dst_total {
            src_iter.zip(dst_iter).collect()
        } else if dst_total == 1 {
            let dst: Vec<String> = dst_iter.into_iter().next().unwrap_or_default();
            src_iter.map(|src| (src, dst.clone())).collect()
        } else if src_total == 1 {
            let src: Vec<String> = src_iter.into_iter().next().unwrap_or_default();
            dst_iter.map(|dst| (src.clone(), dst)).collect()
        } else {
            errors.push(FinalizeError::CombinationMismatch {
                line: self.line,
                src: src_total,
                dst: dst_total,
            });
            return;
        };

        let mut empty_reported = false;
        for (src, dst) in pairs {
            let src = drop_placeholders(src);
            if src.is_empty() {
                if !empty_reported {
                    errors.push(FinalizeError::EmptySource { line: self.line });
                    empty_reported = true;
                }
                continue;
            }
            let dst = drop_placeholders(dst).into_iter().map(Token::Symbol).collect();
            self.sub_rules.push(SubRule {
                src,
                dst,
                anchors: self.anchors,
            });
        }
    }

    fn finalize_cross(&mut self, schema: Vec<usize>, errors: &mut Vec<FinalizeError>) {
        let mut range_reported = false;
        let mut empty_reported = false;
        for combination in SheafChainIterator::new(&self.src) {
            let src = drop_placeholders(combination);
            if src.is_empty() {
                if !empty_reported {
                    errors.push(FinalizeError::EmptySource { line: self.line });
                    empty_reported = true;
                }
                continue;
            }
            let mut dst = Vec::new();
            let mut in_range = true;
            for &index in &schema {
                match src.get(index.wrapping_sub(1)) {
                    Some(token) => dst.extend(token.chars().map(Token::Raw)),
                    None => {
                        if !range_reported {
                            errors.push(FinalizeError::CrossIndexOutOfRange {
                                line: self.line,
                                index,
                                arity: src.len(),
                            });
                            range_reported = true;
                        }
                        in_range = false;
                        break;
                    }
                }
            }
            if in_range {
                self.sub_rules.push(SubRule {
                    src,
                    dst,
                    anchors: self.anchors,
                });
            }
        }
    }
}

/// Remove the empty placeholder tokens contributed by empty alternatives.
fn drop_placeholders(tokens: Vec<String>) -> Vec<String> {
    tokens.into_iter().filter(|t| !t.is_empty()).collect()
}
