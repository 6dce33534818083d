//! The post-processor chain: charset resolution, virtual resolution, emit.
//!
//! Operators run in the order the mode's `\postprocessor` block declares
//! them, each transforming the token stream; the terminal emit step renders
//! tokens to the output string. Warnings accumulate on the side - the chain
//! is best-effort and never fails.

mod resolve_virtuals;

pub use resolve_virtuals::resolve_virtuals;

use crate::charset::Charset;
use crate::error::Warning;
use crate::token::{Boundary, Token};

/// How the emit step renders boundary tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitPolicy {
    /// Inter-word markers become U+0020, line ends become U+000A.
    #[default]
    Spaces,
    /// All boundary tokens are dropped.
    Discard,
}

/// One operator of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOp {
    /// Canonicalize symbol names against the charset; warn on unknowns.
    ResolveCharsets,
    /// Two-pass contextual resolution of virtual characters.
    ResolveVirtuals,
}

/// The ordered operator chain plus the terminal emit policy.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    /// Operators, in declaration order.
    pub ops: Vec<PostOp>,
    /// Boundary rendering policy.
    pub emit: EmitPolicy,
}

impl Default for PostProcessor {
    /// The conventional chain: resolve charsets, resolve virtuals, emit
    /// with spaces.
    fn default() -> Self {
        Self {
            ops: vec![PostOp::ResolveCharsets, PostOp::ResolveVirtuals],
            emit: EmitPolicy::Spaces,
        }
    }
}

impl PostProcessor {
    /// Run the chain; returns the post-operator token stream and the
    /// rendered output string.
    pub fn apply(
        &self,
        mut tokens: Vec<Token>,
        charset: &Charset,
        warnings: &mut Vec<Warning>,
    ) -> (Vec<Token>, String) {
        for op in &self.ops {
            tokens = match op {
                PostOp::ResolveCharsets => resolve_charsets(tokens, charset, warnings),
                PostOp::ResolveVirtuals => resolve_virtuals(tokens, charset, warnings),
            };
        }
        let output = emit(&tokens, charset, self.emit, warnings);
        (tokens, output)
    }
}

/// Canonicalize symbol tokens against the charset.
///
/// Alias names collapse to their canonical spelling so later passes compare
/// identity cheaply. Unknown names stay in the stream - the emit step
/// renders them verbatim - and are reported once each.
pub fn resolve_charsets(
    tokens: Vec<Token>,
    charset: &Charset,
    warnings: &mut Vec<Warning>,
) -> Vec<Token> {
    let mut reported: Vec<String> = Vec::new();
    tokens
        .into_iter()
        .map(|token| match token {
            Token::Symbol(name) => match charset.canonical(&name) {
                Some(canonical) => Token::symbol(canonical),
                None => {
                    if !reported.contains(&name) {
                        reported.push(name.clone());
                        warnings.push(Warning::UnresolvedToken {
                            name: name.clone(),
                            charset: charset.name.clone(),
                        });
                    }
                    Token::Symbol(name)
                }
            },
            other => other,
        })
        .collect()
}

/// Render the final token stream to the output string.
///
/// Real characters emit their code point, raw scalars pass through, and
/// unknown symbol names emit verbatim (they were warned about upstream).
/// A virtual that somehow survives resolution is dropped with a warning.
pub fn emit(
    tokens: &[Token],
    charset: &Charset,
    policy: EmitPolicy,
    warnings: &mut Vec<Warning>,
) -> String {
    let mut out = String::with_capacity(tokens.len() * 2);
    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::Raw(c) => out.push(*c),
            Token::Symbol(name) => {
                if let Some(ch) = charset.char_named(name) {
                    out.push(ch.output_point());
                } else if charset.is_virtual(name) {
                    warnings.push(Warning::UnresolvedVirtual { name: name.clone() });
                } else {
                    out.push_str(name);
                }
            }
            Token::Boundary(boundary) => {
                if policy == EmitPolicy::Spaces {
                    match boundary {
                        Boundary::Space => out.push(' '),
                        Boundary::LineEnd if idx + 1 < tokens.len() => out.push('\n'),
                        _ => {}
                    }
                }
            }
        }
    }
    out
}
