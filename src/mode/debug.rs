//! Structured debug record of a transcription.

use crate::error::Warning;
use crate::processor::MatchSpan;
use crate::token::Token;

/// The token stream at every pipeline stage, plus warnings.
///
/// Tokens are plain values carrying names, so the whole record serializes
/// cleanly when the `serialization` feature is on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct DebugRecord {
    /// Tokens after preprocessing.
    pub preprocessor_output: Vec<Token>,
    /// The committed matches, in order.
    pub spans: Vec<MatchSpan>,
    /// Tokens after the trie walk.
    pub processor_output: Vec<Token>,
    /// Tokens after the postprocessor operators, before emit.
    pub postprocessor_output: Vec<Token>,
    /// Warnings hit along the way.
    pub warnings: Vec<Warning>,
}
