//! Fragments: the smallest rule expansion unit.

use crate::error::FinalizeError;

use super::resolve_unicode_literals;

/// A parsed fragment expression and its enumerated combinations.
///
/// `h(a,ä)(i,ï)` denotes the cartesian product of the fixed prefix `h` with
/// each group of alternatives - four combinations. Alternatives may hold
/// several whitespace-separated tokens, and an empty alternative (`(,x)`)
/// contributes an empty placeholder token so that every combination keeps
/// the same arity; placeholders are dropped when sub-rules are built.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// The expression as authored.
    pub expression: String,
    /// Enumerated token sequences; equal lengths once finalized.
    pub combinations: Vec<Vec<String>>,
    valid: bool,
}

/// One `(...)` group or fixed run, as a list of alternatives.
type Segment = Vec<Vec<String>>;

impl Fragment {
    /// Parse a fragment expression into its combinations.
    pub fn parse(expression: &str) -> Self {
        let segments = split_segments(expression);
        let combinations = enumerate(&segments);
        Self {
            expression: expression.to_string(),
            combinations,
            valid: true,
        }
    }

    /// Resolve Unicode literals and check the equal-length invariant.
    ///
    /// Regular variables were substituted before the fragment was parsed;
    /// `{UNI_XXXX}` literals resolve here, at the last moment, so that
    /// multi-scalar literals stay atomic tokens. A fragment whose
    /// combinations disagree on length is marked invalid and recorded.
    pub fn finalize(&mut self, line: usize, errors: &mut Vec<FinalizeError>) {
        for combination in &mut self.combinations {
            for token in combination.iter_mut() {
                match resolve_unicode_literals(token) {
                    Ok(resolved) => *token = resolved,
                    Err(message) => {
                        self.valid = false;
                        errors.push(FinalizeError::BadUnicodeLiteral { line, message });
                        return;
                    }
                }
            }
        }
        let mut lengths = self.combinations.iter().map(Vec::len);
        if let Some(first) = lengths.next() {
            if lengths.any(|len| len != first) {
                self.valid = false;
                errors.push(FinalizeError::FragmentArity {
                    line,
                    expression: self.expression.clone(),
                });
            }
        }
    }

    /// False once an arity violation was detected.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The uniform sequence length, if the fragment is valid and non-empty.
    pub fn sequence_len(&self) -> Option<usize> {
        if self.valid {
            self.combinations.first().map(Vec::len)
        } else {
            None
        }
    }
}

/// Split an expression into fixed runs and `(...)` alternative groups.
fn split_segments(expression: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut fixed = String::new();
    let mut chars = expression.chars();

    while let Some(c) = chars.next() {
        if c == '(' {
            push_fixed(&mut segments, &mut fixed);
            let mut group = String::new();
            for g in chars.by_ref() {
                if g == ')' {
                    break;
                }
                group.push(g);
            }
            let alternatives: Segment = group
                .split(',')
                .map(|alt| {
                    let tokens: Vec<String> =
                        alt.split_whitespace().map(str::to_string).collect();
                    if tokens.is_empty() {
                        vec![String::new()]
                    } else {
                        tokens
                    }
                })
                .collect();
            segments.push(alternatives);
        } else {
            fixed.push(c);
        }
    }
    push_fixed(&mut segments, &mut fixed);
    segments
}

fn push_fixed(segments: &mut Vec<Segment>, fixed: &mut String) {
    let tokens: Vec<String> = fixed.split_whitespace().map(str::to_string).collect();
    if !tokens.is_empty() {
        segments.push(vec![tokens]);
    }
    fixed.clear();
}

/// Cartesian product across segments, concatenating the chosen token lists.
fn enumerate(segments: &[Segment]) -> Vec<Vec<String>> {
    let mut result: Vec<Vec<String>> = vec![Vec::new()];
    for segment in segments {
        let mut next = Vec::with_capacity(result.len() * segment.len());
        for prefix in &result {
            for alternative in segment {
                let mut combination = prefix.clone();
                combination.extend(alternative.iter().cloned());
                next.push(combination);
            }
        }
        result = next;
    }
    if result.len() == 1 && result[0].is_empty() {
        // A NULL fragment still contributes one empty-token combination.
        result[0].push(String::new());
    }
    result
}
