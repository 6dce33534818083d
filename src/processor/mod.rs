//! The transcription processor: rule groups, trie, longest-match walk.
//!
//! Finalization compiles every rule group against the option map and
//! installs the resulting sub-rules into one [`TranscriptionTree`], in
//! authored order. Transcription then walks the preprocessed token stream:
//!
//! 1. At each position, descend the trie as far as the input allows,
//!    remembering the deepest accepting node whose anchor constraints hold.
//! 2. Commit the best acceptance: emit its destination and advance by the
//!    matched length. With no acceptance, the literal token passes through
//!    and the cursor advances by one.
//! 3. Ties at equal depth go to the acceptance with stricter anchors, then
//!    to the one written last.
//!
//! Every input position is consumed exactly once; boundary tokens are
//! preserved verbatim unless a rule consumes them (a source `{UNI_20}`
//! matches the inter-word space marker).

mod preprocessor;
mod tree;

pub use preprocessor::{tokenize, Preprocessor, Substitution};
pub use tree::{Acceptance, TranscriptionTree};

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::error::FinalizeError;
use crate::rules::RuleGroup;
use crate::token::{Boundary, Token};

/// One committed match, recorded for the debug record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct MatchSpan {
    /// The consumed source scalars.
    pub consumed: String,
    /// The emitted destination tokens.
    pub produced: Vec<Token>,
}

/// The processor: rule groups plus their compiled trie.
#[derive(Debug, Default)]
pub struct Processor {
    groups: Vec<RuleGroup>,
    tree: TranscriptionTree,
}

impl Processor {
    /// A processor with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule group, keeping authored order.
    pub fn add_group(&mut self, group: RuleGroup) {
        self.groups.push(group);
    }

    /// The rule groups, in authored order.
    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    /// The compiled trie; empty before finalization.
    pub fn tree(&self) -> &TranscriptionTree {
        &self.tree
    }

    /// Finalize all groups against resolved options and rebuild the trie.
    pub fn finalize(
        &mut self,
        options: &BTreeMap<String, String>,
        errors: &mut Vec<FinalizeError>,
    ) {
        self.tree = TranscriptionTree::new();
        for group in &mut self.groups {
            group.finalize(options, errors);
        }
        for group in &self.groups {
            for rule in &group.rules {
                for sub_rule in &rule.sub_rules {
                    let path: SmallVec<[char; 8]> =
                        sub_rule.src.iter().flat_map(|t| t.chars()).collect();
                    self.tree
                        .insert(path, sub_rule.dst.clone(), sub_rule.anchors);
                }
            }
        }
    }

    /// Run the longest-match walk over a preprocessed token stream.
    pub fn transcribe(&self, tokens: &[Token]) -> (Vec<Token>, Vec<MatchSpan>) {
        let mut out = Vec::with_capacity(tokens.len());
        let mut spans = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if tokens[i].match_key().is_none() {
                out.push(tokens[i].clone());
                i += 1;
                continue;
            }
            match self.best_match(tokens, i) {
                Some((len, acceptance)) => {
                    let consumed: String = tokens[i..i + len]
                        .iter()
                        .filter_map(Token::match_key)
                        .collect();
                    spans.push(MatchSpan {
                        consumed,
                        produced: acceptance.dst.clone(),
                    });
                    out.extend(acceptance.dst.iter().cloned());
                    i += len;
                }
                None => {
                    out.push(tokens[i].clone());
                    i += 1;
                }
            }
        }
        (out, spans)
    }

    /// Deepest satisfied acceptance starting at `start`.
    fn best_match(&self, tokens: &[Token], start: usize) -> Option<(usize, &Acceptance)> {
        let mut best: Option<(usize, &Acceptance)> = None;
        let mut node = self.tree.root();
        let mut depth = 0;

        loop {
            if depth > 0 {
                let candidate = node
                    .accepts
                    .iter()
                    .filter(|a| anchors_hold(a, tokens, start, start + depth))
                    .max_by_key(|a| (a.anchors.count(), a.serial));
                if let Some(acceptance) = candidate {
                    best = Some((depth, acceptance));
                }
            }
            let Some(key) = tokens.get(start + depth).and_then(Token::match_key) else {
                break;
            };
            match node.edges.get(&key) {
                Some(next) => {
                    node = next;
                    depth += 1;
                }
                None => break,
            }
        }
        best
    }
}

fn anchors_hold(acceptance: &Acceptance, tokens: &[Token], start: usize, end: usize) -> bool {
    let a = acceptance.anchors;
    (!a.word_start || word_start_at(tokens, start))
        && (!a.line_start || line_start_at(tokens, start))
        && (!a.word_end || word_end_at(tokens, end))
        && (!a.line_end || line_end_at(tokens, end))
}

fn word_start_at(tokens: &[Token], i: usize) -> bool {
    i == 0 || tokens[i - 1] == Token::Boundary(Boundary::WordStart)
}

fn line_start_at(tokens: &[Token], i: usize) -> bool {
    match i {
        0 => true,
        1 => tokens[0] == Token::Boundary(Boundary::LineStart),
        _ => {
            tokens[i - 1] == Token::Boundary(Boundary::LineStart)
                || (tokens[i - 1] == Token::Boundary(Boundary::WordStart)
                    && tokens[i - 2] == Token::Boundary(Boundary::LineStart))
        }
    }
}

fn word_end_at(tokens: &[Token], j: usize) -> bool {
    j >= tokens.len()
        || matches!(
            tokens[j],
            Token::Boundary(Boundary::WordEnd) | Token::Boundary(Boundary::LineEnd)
        )
}

fn line_end_at(tokens: &[Token], j: usize) -> bool {
    if j >= tokens.len() {
        return true;
    }
    match &tokens[j] {
        Token::Boundary(Boundary::LineEnd) => true,
        Token::Boundary(Boundary::WordEnd) => {
            j + 1 >= tokens.len() || tokens[j + 1] == Token::Boundary(Boundary::LineEnd)
        }
        _ => false,
    }
}
