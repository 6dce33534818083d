//! Sheaf chains: one full rule side, and its combination iterator.

use crate::error::FinalizeError;

use super::Sheaf;

/// An ordered list of sheaves parsed from one side of a rule.
///
/// `b[a*c]e` splits into three sheaves: the degenerate `b`, the linkable
/// `a*c`, and the degenerate `e`. Plain characters and bracketed
/// alternations mix freely.
#[derive(Debug, Clone)]
pub struct SheafChain {
    /// The rule side as authored.
    pub expression: String,
    /// Member sheaves, in authored order.
    pub sheaves: Vec<Sheaf>,
}

impl SheafChain {
    /// Parse a rule side, scanning for balanced `[...]` groups.
    pub fn parse(expression: &str) -> Self {
        let mut sheaves = Vec::new();
        let mut outside = String::new();
        let mut chars = expression.chars();

        while let Some(c) = chars.next() {
            if c == '[' {
                let trimmed = outside.trim();
                if !trimmed.is_empty() {
                    sheaves.push(Sheaf::parse(trimmed, false));
                }
                outside.clear();
                let mut inside = String::new();
                for g in chars.by_ref() {
                    if g == ']' {
                        break;
                    }
                    inside.push(g);
                }
                sheaves.push(Sheaf::parse(inside.trim(), true));
            } else {
                outside.push(c);
            }
        }
        let trimmed = outside.trim();
        if !trimmed.is_empty() {
            sheaves.push(Sheaf::parse(trimmed, false));
        }
        if sheaves.is_empty() {
            sheaves.push(Sheaf::parse("", false));
        }
        Self {
            expression: expression.to_string(),
            sheaves,
        }
    }

    /// Finalize every member sheaf.
    pub fn finalize(&mut self, line: usize, errors: &mut Vec<FinalizeError>) {
        for sheaf in &mut self.sheaves {
            sheaf.finalize(line, errors);
        }
    }
}

/// Odometer-style enumerator over a chain's cartesian product.
///
/// Holds one index per sheaf; each step emits the concatenation of the
/// currently selected combination from every sheaf, with the rightmost
/// index varying fastest. Finite and restartable.
#[derive(Debug)]
pub struct SheafChainIterator {
    combos: Vec<Vec<Vec<String>>>,
    counters: Vec<usize>,
    exhausted: bool,
}

impl SheafChainIterator {
    /// Snapshot a chain's combinations and start at the first step.
    pub fn new(chain: &SheafChain) -> Self {
        let combos: Vec<Vec<Vec<String>>> =
            chain.sheaves.iter().map(Sheaf::combinations).collect();
        let exhausted = combos.iter().any(Vec::is_empty);
        Self {
            counters: vec![0; combos.len()],
            combos,
            exhausted,
        }
    }

    /// Total number of steps this iterator will emit.
    pub fn total(&self) -> usize {
        self.combos.iter().map(Vec::len).product()
    }

    /// Rewind to the first step.
    pub fn restart(&mut self) {
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.exhausted = self.combos.iter().any(Vec::is_empty);
    }

    fn advance(&mut self) {
        for pos in (0..self.counters.len()).rev() {
            self.counters[pos] += 1;
            if self.counters[pos] < self.combos[pos].len() {
                return;
            }
            self.counters[pos] = 0;
        }
        // Wrapped: every counter rolled over.
        self.exhausted = true;
    }
}

impl Iterator for SheafChainIterator {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self
            .counters
            .iter()
            .zip(&self.combos)
            .flat_map(|(&idx, combos)| combos[idx].iter().cloned())
            .collect();
        self.advance();
        Some(current)
    }
}
