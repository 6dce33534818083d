//! Input normalization and tokenization.

use unicode_normalization::UnicodeNormalization;

use crate::token::{Boundary, Token};

/// One literal substitution pair from a `\preprocessor` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Text to search for.
    pub pattern: String,
    /// Text to splice in.
    pub replacement: String,
}

/// The preprocessor: ordered substitutions plus engine normalizations.
///
/// Normalization runs first - NFD decomposition then case folding - and the
/// authored substitutions are themselves normalized the same way when the
/// preprocessor is sealed, so patterns written precomposed in a mode file
/// still match decomposed input. Normalization is idempotent; substitution
/// idempotence is up to the mode author.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    subs: Vec<Substitution>,
}

impl Preprocessor {
    /// An empty preprocessor (normalization only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a substitution pair, in application order.
    pub fn add_substitution(&mut self, pattern: impl Into<String>, replacement: impl Into<String>) {
        self.subs.push(Substitution {
            pattern: pattern.into(),
            replacement: replacement.into(),
        });
    }

    /// Normalize the authored patterns so they match normalized input.
    pub fn seal(&mut self) {
        for sub in &mut self.subs {
            sub.pattern = normalize_text(&sub.pattern);
            sub.replacement = normalize_text(&sub.replacement);
        }
    }

    /// The substitution list, in application order.
    pub fn substitutions(&self) -> &[Substitution] {
        &self.subs
    }

    /// NFD-decompose, case-fold, and apply the substitutions in order.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = normalize_text(text);
        for sub in &self.subs {
            if !sub.pattern.is_empty() {
                out = out.replace(&sub.pattern, &sub.replacement);
            }
        }
        out
    }

    /// Full preprocessing: normalize then tokenize.
    pub fn run(&self, text: &str) -> Vec<Token> {
        tokenize(&self.normalize(text))
    }
}

fn normalize_text(text: &str) -> String {
    text.nfd().flat_map(char::to_lowercase).collect()
}

/// Split normalized text into the boundary-marked token stream.
///
/// Each line contributes `LineStart ... LineEnd`; each whitespace-delimited
/// word contributes `WordStart <scalars> WordEnd`; every whitespace *run*
/// collapses into one [`Boundary::Space`] marker, never one per scalar.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len() + 8);
    let text = text.replace('\r', "");
    for line in text.split('\n') {
        tokens.push(Token::Boundary(Boundary::LineStart));
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                tokens.push(Token::Boundary(Boundary::Space));
            } else {
                tokens.push(Token::Boundary(Boundary::WordStart));
                while chars.peek().is_some_and(|c| !c.is_whitespace()) {
                    tokens.push(Token::Raw(chars.next().unwrap()));
                }
                tokens.push(Token::Boundary(Boundary::WordEnd));
            }
        }
        tokens.push(Token::Boundary(Boundary::LineEnd));
    }
    if tokens.len() == 2 {
        // Sole empty line: an empty input has an empty stream.
        tokens.clear();
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use Boundary::*;

    fn b(boundary: Boundary) -> Token {
        Token::Boundary(boundary)
    }

    #[test]
    fn empty_input_is_an_empty_stream() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn words_get_boundaries() {
        let tokens = tokenize("ab c");
        assert_eq!(
            tokens,
            vec![
                b(LineStart),
                b(WordStart),
                Token::Raw('a'),
                Token::Raw('b'),
                b(WordEnd),
                b(Space),
                b(WordStart),
                Token::Raw('c'),
                b(WordEnd),
                b(LineEnd),
            ]
        );
    }

    #[test]
    fn whitespace_runs_collapse_to_one_marker() {
        let tokens = tokenize("a \t b");
        let spaces = tokens
            .iter()
            .filter(|t| **t == b(Space))
            .count();
        assert_eq!(spaces, 1);
    }

    #[test]
    fn lines_are_delimited() {
        let tokens = tokenize("a\nb");
        let line_starts = tokens.iter().filter(|t| **t == b(LineStart)).count();
        assert_eq!(line_starts, 2);
    }

    #[test]
    fn normalization_decomposes_and_lowercases() {
        let pre = Preprocessor::new();
        assert_eq!(pre.normalize("Ai"), "ai");
        // Precomposed ë decomposes to e + combining diaeresis.
        assert_eq!(pre.normalize("\u{EB}"), "e\u{308}");
    }

    #[test]
    fn sealed_patterns_match_decomposed_input() {
        let mut pre = Preprocessor::new();
        pre.add_substitution("\u{EB}", "e");
        pre.seal();
        assert_eq!(pre.normalize("lauri\u{EB}"), "laurie");
        // Already-decomposed input matches too.
        assert_eq!(pre.normalize("laurie\u{308}"), "laurie");
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut pre = Preprocessor::new();
        pre.add_substitution("\u{EB}", "e");
        pre.seal();
        let once = pre.normalize("Ai ! lauri\u{EB} lantar");
        assert_eq!(pre.normalize(&once), once);
    }
}
