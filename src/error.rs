//! Error taxonomy for the transcription pipeline.
//!
//! Three severities flow through the engine:
//!
//! - [`ParseError`] - a malformed mode or charset file. Collected while
//!   reading the file; a mode with parse errors can still be inspected but
//!   will refuse to finalize.
//! - [`FinalizeError`] - a rule that cannot be compiled: unresolved
//!   variables, arity mismatches, bad cross schemas, macro misuse. Collected
//!   during [`Mode::finalize`](crate::mode::Mode::finalize); finalization
//!   succeeds only if the list is empty.
//! - [`Warning`] - a best-effort condition hit while transcribing
//!   (unresolved token, virtual that survived resolution). Attached to the
//!   debug record; transcription itself never fails.
//!
//! Errors are *accumulated*, never thrown mid-parse: authors get the whole
//! list in one round trip. [`EngineError`] sits apart from the taxonomy: it
//! marks caller-contract violations on the strict API surface.

use thiserror::Error;

/// A syntax error in a mode or charset file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line in the source file.
    pub line: usize,
    /// What went wrong, in author-facing terms.
    pub message: String,
}

impl ParseError {
    /// Build a parse error at the given line.
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Errors raised while compiling rules against an option map.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    /// A `{NAME}` reference with no visible definition.
    #[error("line {line}: failed to evaluate variable {{{name}}}")]
    UnresolvedVariable {
        /// Line of the referencing expression.
        line: usize,
        /// The variable name as written.
        name: String,
    },

    /// Variable substitution recursed past the depth limit.
    #[error("line {line}: variable substitution overflow in `{expression}` (circular reference?)")]
    SubstitutionOverflow {
        /// Line of the expression being expanded.
        line: usize,
        /// The expression that failed to converge.
        expression: String,
    },

    /// A Unicode-literal variable used where only regular variables are
    /// allowed (destination side of a rule).
    #[error("line {line}: unicode variable {token} is only legal in rule sources and variable definitions")]
    UnicodeVarMisuse {
        /// Line of the offending expression.
        line: usize,
        /// The `{UNI_...}` token as written.
        token: String,
    },

    /// A `{UNI_...}` literal that does not name a Unicode scalar.
    #[error("line {line}: {message}")]
    BadUnicodeLiteral {
        /// Line of the owning rule.
        line: usize,
        /// Description of the malformed literal.
        message: String,
    },

    /// A fragment whose enumerated sequences have unequal lengths.
    #[error("line {line}: fragment `{expression}` expands to sequences of unequal length")]
    FragmentArity {
        /// Line of the owning rule.
        line: usize,
        /// The fragment expression.
        expression: String,
    },

    /// Fragments of a linkable sheaf disagree on sequence length.
    #[error("line {line}: sheaf `{expression}` mixes fragments of unequal arity")]
    SheafArity {
        /// Line of the owning rule.
        line: usize,
        /// The sheaf expression.
        expression: String,
    },

    /// Source and destination chains enumerate incompatible counts.
    #[error("line {line}: source enumerates {src} combinations but destination {dst}")]
    CombinationMismatch {
        /// Line of the rule.
        line: usize,
        /// Source combination count.
        src: usize,
        /// Destination combination count.
        dst: usize,
    },

    /// A rule whose source expands to nothing.
    #[error("line {line}: rule source expands to an empty combination")]
    EmptySource {
        /// Line of the rule.
        line: usize,
    },

    /// A cross-rule schema that is not a list of positive integers.
    #[error("line {line}: cross schema `{schema}` must be whitespace-separated positive integers")]
    CrossSchemaInvalid {
        /// Line of the rule.
        line: usize,
        /// The schema text as written.
        schema: String,
    },

    /// A cross-rule index outside the matched source combination.
    #[error("line {line}: cross schema index {index} out of range (source has {arity} tokens)")]
    CrossIndexOutOfRange {
        /// Line of the rule.
        line: usize,
        /// The 1-based offending index.
        index: usize,
        /// Token count of the source combination.
        arity: usize,
    },

    /// Deployment of a macro that was never defined.
    #[error("line {line}: deploying unknown macro `{name}`")]
    MacroUnknown {
        /// Line of the deploy statement.
        line: usize,
        /// Macro name.
        name: String,
    },

    /// A deploy with the wrong number of arguments.
    #[error("line {line}: macro `{name}` takes {expected} arguments, got {got}")]
    MacroArity {
        /// Line of the deploy statement.
        line: usize,
        /// Macro name.
        name: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// A macro parameter that would shadow an existing variable.
    #[error("line {line}: macro parameter {{{name}}} shadows a variable in this scope")]
    MacroShadow {
        /// Line of the deploy statement.
        line: usize,
        /// Parameter name.
        name: String,
    },

    /// Macro deployments nested past the depth limit.
    #[error("line {line}: macro deployment depth exceeded at `{name}`")]
    DeployDepthExceeded {
        /// Line of the deploy statement.
        line: usize,
        /// Macro name where the cap was hit.
        name: String,
    },

    /// A deploy guard naming an option the mode never declared.
    #[error("line {line}: condition references unknown option `{name}`")]
    UnknownOption {
        /// Line of the deploy statement.
        line: usize,
        /// Option name.
        name: String,
    },

    /// A code line that is neither a variable definition nor a rule.
    #[error("line {line}: cannot understand `{text}`")]
    UnknownStatement {
        /// Line of the statement.
        line: usize,
        /// The statement text.
        text: String,
    },
}

impl FinalizeError {
    /// The source line this error points at.
    pub fn line(&self) -> usize {
        match self {
            Self::UnresolvedVariable { line, .. }
            | Self::SubstitutionOverflow { line, .. }
            | Self::UnicodeVarMisuse { line, .. }
            | Self::BadUnicodeLiteral { line, .. }
            | Self::FragmentArity { line, .. }
            | Self::SheafArity { line, .. }
            | Self::CombinationMismatch { line, .. }
            | Self::EmptySource { line }
            | Self::CrossSchemaInvalid { line, .. }
            | Self::CrossIndexOutOfRange { line, .. }
            | Self::MacroUnknown { line, .. }
            | Self::MacroArity { line, .. }
            | Self::MacroShadow { line, .. }
            | Self::DeployDepthExceeded { line, .. }
            | Self::UnknownOption { line, .. }
            | Self::UnknownStatement { line, .. } => *line,
        }
    }
}

/// Best-effort conditions recorded while transcribing.
///
/// Warnings never abort a transcription; they land in the debug record so
/// mode authors can see what the engine had to paper over.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub enum Warning {
    /// A symbol token whose name is not in the active charset.
    #[error("token `{name}` is not defined by charset `{charset}`")]
    UnresolvedToken {
        /// The token name.
        name: String,
        /// The active charset.
        charset: String,
    },

    /// A virtual character that survived both resolution passes.
    #[error("virtual `{name}` could not be resolved and was dropped")]
    UnresolvedVirtual {
        /// The virtual's name.
        name: String,
    },
}

/// Caller-contract violations, as opposed to author errors.
///
/// Returned by the strict [`try_transcribe`](crate::mode::Mode::try_transcribe)
/// surface; the lenient `transcribe` folds them into an `ok = false` result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `transcribe` was called before a successful `finalize`.
    #[error("mode `{mode}` used before successful finalization")]
    NotFinalized {
        /// The mode name.
        mode: String,
    },
}
