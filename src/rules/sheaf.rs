//! Sheaves: `*`-joined fragment bundles.

use crate::error::FinalizeError;

use super::Fragment;

/// A bundle of parallel fragments, written `[a*b*c]`.
///
/// Sheaves factor parallel rules: `[a*b] --> [X*Y]` pairs `a → X` with
/// `b → Y`. A sheaf parsed from a bracketed block is *linkable* - its
/// fragments stand in positional correspondence with those of the opposite
/// side, so they must all expand to sequences of equal arity. Bare text
/// between brackets becomes a degenerate non-linkable sheaf.
#[derive(Debug, Clone)]
pub struct Sheaf {
    /// The expression as authored (bracket interior).
    pub expression: String,
    /// Whether this sheaf came from a `[...]` block.
    pub linkable: bool,
    /// Member fragments, in authored order.
    pub fragments: Vec<Fragment>,
}

impl Sheaf {
    /// Parse a sheaf body, splitting members on `*`.
    ///
    /// Empty members are kept - a NULL fragment is legal and matches the
    /// empty token.
    pub fn parse(expression: &str, linkable: bool) -> Self {
        let fragments = expression
            .split('*')
            .map(|member| Fragment::parse(member.trim()))
            .collect();
        Self {
            expression: expression.to_string(),
            linkable,
            fragments,
        }
    }

    /// Finalize member fragments and check the linkability invariant.
    pub fn finalize(&mut self, line: usize, errors: &mut Vec<FinalizeError>) {
        for fragment in &mut self.fragments {
            fragment.finalize(line, errors);
        }
        if self.linkable {
            let mut lens = self.fragments.iter().filter_map(Fragment::sequence_len);
            if let Some(first) = lens.next() {
                if lens.any(|len| len != first) {
                    errors.push(FinalizeError::SheafArity {
                        line,
                        expression: self.expression.clone(),
                    });
                }
            }
        }
    }

    /// All combinations this sheaf contributes, fragment order preserved.
    pub fn combinations(&self) -> Vec<Vec<String>> {
        self.fragments
            .iter()
            .flat_map(|f| f.combinations.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_star() {
        let sheaf = Sheaf::parse("a*b*c", true);
        assert_eq!(sheaf.fragments.len(), 3);
        assert_eq!(sheaf.combinations(), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn fragments_expand_within_members() {
        let sheaf = Sheaf::parse("h(a,ä)*x", true);
        assert_eq!(
            sheaf.combinations(),
            vec![vec!["h", "a"], vec!["h", "ä"], vec!["x"]]
        );
    }

    #[test]
    fn linkable_arity_mismatch_is_reported() {
        let mut sheaf = Sheaf::parse("a b*c", true);
        let mut errors = Vec::new();
        sheaf.finalize(5, &mut errors);
        assert!(matches!(
            errors.as_slice(),
            [FinalizeError::SheafArity { line: 5, .. }]
        ));
    }

    #[test]
    fn non_linkable_skips_the_arity_check() {
        let mut sheaf = Sheaf::parse("a b", false);
        let mut errors = Vec::new();
        sheaf.finalize(1, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn null_member_is_kept() {
        let sheaf = Sheaf::parse("a*", true);
        assert_eq!(sheaf.fragments.len(), 2);
        assert_eq!(sheaf.combinations()[1], vec![String::new()]);
    }
}
