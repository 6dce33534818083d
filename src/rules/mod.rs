//! The rule expansion algebra.
//!
//! Compact authored rules expand into enumerated concrete transformations in
//! three layers:
//!
//! - [`Fragment`] - the smallest unit: `h(a,ä)(i,ï)` is the cartesian
//!   product of a fixed prefix with grouped alternatives.
//! - [`Sheaf`] / [`SheafChain`] - `*`-joined fragments inside `[...]`
//!   blocks, chained across a rule side; a [`SheafChainIterator`] enumerates
//!   the cartesian product odometer-style.
//! - [`Rule`] / [`SubRule`] - an authored rule finalizes into the set of
//!   concrete `(src, dst)` token sequences fed to the transcription trie.
//!
//! [`RuleGroup`] is the lexical scope owning variables, macros and raw
//! rules, and drives finalization against an option map.

mod fragment;
mod group;
mod rule;
mod sheaf;
mod sheaf_chain;

pub use fragment::Fragment;
pub use group::{CodeLine, Deploy, Macro, Predicate, RuleGroup, Statement};
pub use rule::{Anchors, Destination, Rule, SubRule};
pub use sheaf::Sheaf;
pub use sheaf_chain::{SheafChain, SheafChainIterator};

/// Resolve `{UNI_XXXX}` literals in a token to their scalar values.
///
/// The hex digits are read as authored, without any normalization, so
/// multi-scalar literals stay atomic within their token. Returns an error
/// message for malformed or out-of-range escapes.
pub(crate) fn resolve_unicode_literals(text: &str) -> Result<String, String> {
    if !text.contains("{UNI_") {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{UNI_") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 5..];
        let Some(end) = tail.find('}') else {
            return Err(format!("unterminated unicode literal in `{text}`"));
        };
        let hex = &tail[..end];
        let scalar = u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| format!("invalid unicode literal {{UNI_{hex}}}"))?;
        out.push(scalar);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::resolve_unicode_literals;

    #[test]
    fn resolves_hex_literals() {
        assert_eq!(resolve_unicode_literals("{UNI_2C}").unwrap(), ",");
        assert_eq!(resolve_unicode_literals("u{UNI_301}").unwrap(), "u\u{301}");
        assert_eq!(resolve_unicode_literals("plain").unwrap(), "plain");
    }

    #[test]
    fn rejects_bad_literals() {
        assert!(resolve_unicode_literals("{UNI_ZZZ}").is_err());
        assert!(resolve_unicode_literals("{UNI_110000}").is_err());
        assert!(resolve_unicode_literals("{UNI_2C").is_err());
    }
}
