//! Two-pass resolution of virtual characters.
//!
//! **Pass 1 - triggered substitutions.** Scan left to right. At each
//! virtual, try its rewrites in declaration order: a rewrite's trigger is a
//! token-name window containing the virtual itself; when the surrounding
//! tokens match, the whole window is replaced and the scan advances past
//! the replacement. At most one substitution happens per position; spliced
//! tokens are visible as context to virtuals further right, so a
//! replacement can cascade into later trigger windows.
//!
//! **Pass 2 - sequences and swaps.** Each virtual still present expands its
//! declared sequence (always), then swaps the expansion with its adjacent
//! token if a swap side is declared. A virtual with neither rewrite match
//! nor sequence cannot become real: it is dropped with a diagnostic. After
//! this pass no virtual remains in the stream.

use crate::charset::{Charset, SwapSide};
use crate::error::Warning;
use crate::token::Token;

/// Resolve all virtual characters in the stream.
pub fn resolve_virtuals(
    tokens: Vec<Token>,
    charset: &Charset,
    warnings: &mut Vec<Warning>,
) -> Vec<Token> {
    let tokens = triggered_pass(tokens, charset);
    structural_pass(tokens, charset, warnings)
}

/// Pass 1: contextual rewrites.
fn triggered_pass(mut tokens: Vec<Token>, charset: &Charset) -> Vec<Token> {
    let mut i = 0;
    while i < tokens.len() {
        let Some(vc) = tokens[i]
            .as_symbol()
            .and_then(|name| charset.virtual_named(name))
        else {
            i += 1;
            continue;
        };
        let own = charset.canonical(&vc.names[0]);

        let mut applied = false;
        for rewrite in &vc.rewrites {
            // Align the window on the trigger's own-virtual position.
            let Some(k) = rewrite
                .trigger
                .iter()
                .position(|t| charset.canonical(t) == own)
            else {
                continue;
            };
            let Some(start) = i.checked_sub(k) else {
                continue;
            };
            let end = start + rewrite.trigger.len();
            if end > tokens.len() {
                continue;
            }
            let matches = rewrite.trigger.iter().zip(&tokens[start..end]).all(
                |(want, token)| match token.as_symbol() {
                    Some(name) => charset.canonical(name) == charset.canonical(want),
                    None => false,
                },
            );
            if !matches {
                continue;
            }
            let replacement: Vec<Token> = rewrite
                .replacement
                .iter()
                .map(|name| Token::symbol(charset.canonical(name).unwrap_or(name)))
                .collect();
            let advance = start + replacement.len();
            tokens.splice(start..end, replacement);
            i = advance;
            applied = true;
            break;
        }
        if !applied {
            i += 1;
        }
    }
    tokens
}

/// Pass 2: sequence expansion, swaps, and the no-virtual guarantee.
fn structural_pass(
    mut tokens: Vec<Token>,
    charset: &Charset,
    warnings: &mut Vec<Warning>,
) -> Vec<Token> {
    let mut i = 0;
    while i < tokens.len() {
        let Some(vc) = tokens[i]
            .as_symbol()
            .and_then(|name| charset.virtual_named(name))
        else {
            i += 1;
            continue;
        };

        if vc.sequence.is_empty() {
            // Nothing can make this token real; drop it.
            warnings.push(Warning::UnresolvedVirtual {
                name: vc.names[0].clone(),
            });
            tokens.remove(i);
            continue;
        }

        let expansion: Vec<Token> = vc
            .sequence
            .iter()
            .map(|name| Token::symbol(charset.canonical(name).unwrap_or(name)))
            .collect();
        let len = expansion.len();
        let swap = vc.swap;
        tokens.splice(i..=i, expansion);

        match swap {
            Some(SwapSide::Before) if i > 0 && !tokens[i - 1].is_boundary() => {
                let prev = tokens.remove(i - 1);
                tokens.insert(i - 1 + len, prev);
                i += len;
            }
            Some(SwapSide::After)
                if i + len < tokens.len() && !tokens[i + len].is_boundary() =>
            {
                let next = tokens.remove(i + len);
                tokens.insert(i, next);
                i += len + 1;
            }
            _ => i += len,
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::CharsetParser;

    const CHARSET: &str = "\
\\char E044 MALTA
\\char E068 LAMBE
\\char E0A4 E_TEHTA
\\char E0B4 DOUBLE_LAMBE
\\char E00C QUESSE
\\char E074 SILME_NUQUERNA
\\virtual LIGA_LL {
  LAMBE LIGA_LL --> DOUBLE_LAMBE;
}
\\virtual X_SEQ {
  \\sequence QUESSE SILME_NUQUERNA
}
\\virtual TEHTA_FLIP {
  \\sequence E_TEHTA
  \\swap before
}
\\virtual HOPELESS {
}
\\virtual CASCADE {
  MALTA CASCADE --> MALTA LIGA_LL;
}
";

    fn charset() -> Charset {
        CharsetParser::new().parse_str("test", CHARSET).unwrap()
    }

    fn resolve(tokens: Vec<Token>) -> (Vec<Token>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let out = resolve_virtuals(tokens, &charset(), &mut warnings);
        (out, warnings)
    }

    fn syms(names: &[&str]) -> Vec<Token> {
        names.iter().map(|n| Token::symbol(*n)).collect()
    }

    #[test]
    fn trigger_window_rewrites_in_place() {
        let (out, warnings) = resolve(syms(&["MALTA", "LAMBE", "LIGA_LL"]));
        assert!(warnings.is_empty());
        assert_eq!(out, syms(&["MALTA", "DOUBLE_LAMBE"]));
    }

    #[test]
    fn no_trigger_means_no_pass1_rewrite() {
        let (out, warnings) = resolve(syms(&["MALTA", "LIGA_LL"]));
        // Pass 1 fails, no sequence either: dropped with a diagnostic.
        assert_eq!(out, syms(&["MALTA"]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn sequences_expand_unconditionally() {
        let (out, warnings) = resolve(syms(&["X_SEQ"]));
        assert!(warnings.is_empty());
        assert_eq!(out, syms(&["QUESSE", "SILME_NUQUERNA"]));
    }

    #[test]
    fn swap_before_reorders_with_previous_token() {
        let (out, warnings) = resolve(syms(&["MALTA", "TEHTA_FLIP"]));
        assert!(warnings.is_empty());
        assert_eq!(out, syms(&["E_TEHTA", "MALTA"]));
    }

    #[test]
    fn swap_skips_boundaries() {
        let mut tokens = vec![Token::Boundary(crate::token::Boundary::WordStart)];
        tokens.extend(syms(&["TEHTA_FLIP"]));
        let (out, _) = resolve(tokens);
        assert_eq!(out[1], Token::symbol("E_TEHTA"));
    }

    #[test]
    fn hopeless_virtual_is_dropped_with_warning() {
        let (out, warnings) = resolve(syms(&["MALTA", "HOPELESS", "LAMBE"]));
        assert_eq!(out, syms(&["MALTA", "LAMBE"]));
        assert!(matches!(
            warnings.as_slice(),
            [Warning::UnresolvedVirtual { name }] if name == "HOPELESS"
        ));
    }

    #[test]
    fn scan_advances_past_replacements() {
        // CASCADE rewrites to MALTA LIGA_LL; the spliced LIGA_LL sits
        // inside the replacement, so pass 1 does not revisit it and pass 2
        // drops it (it has no LAMBE before it anyway).
        let (out, warnings) = resolve(syms(&["MALTA", "CASCADE"]));
        assert_eq!(out, syms(&["MALTA"]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn spliced_tokens_are_context_for_later_virtuals() {
        // The first LIGA_LL rewrites [LAMBE LIGA_LL] to DOUBLE_LAMBE...
        let (out, warnings) =
            resolve(syms(&["LAMBE", "LIGA_LL", "LAMBE", "LIGA_LL"]));
        assert!(warnings.is_empty());
        // ...and the second resolves independently against its own window.
        assert_eq!(out, syms(&["DOUBLE_LAMBE", "DOUBLE_LAMBE"]));
    }

    #[test]
    fn no_virtual_survives() {
        let inputs = vec![
            syms(&["LIGA_LL"]),
            syms(&["LAMBE", "LIGA_LL", "X_SEQ", "HOPELESS"]),
        ];
        for tokens in inputs {
            let (out, _) = resolve(tokens);
            assert!(out.iter().all(|t| t
                .as_symbol()
                .map_or(true, |name| !charset().is_virtual(name))));
        }
    }
}
