//! Modes: the composed transcription pipeline.
//!
//! A [`Mode`] aggregates the preprocessor, the processor with its rule
//! groups, the postprocessor chain, and the charsets it may target. It is
//! parsed once, [finalized](Mode::finalize) against an option map - which
//! deploys macros, expands rules and builds the transcription trie - and
//! then serves read-only [`transcribe`](Mode::transcribe) calls. A
//! finalized mode is immutable and safe to share across threads.

mod debug;
mod library;
mod parser;

pub use debug::DebugRecord;
pub use library::ModeLibrary;
pub use parser::ModeParser;

use std::collections::BTreeMap;
use std::path::Path;

use crate::charset::Charset;
use crate::error::{EngineError, FinalizeError, ParseError};
use crate::postprocessor::PostProcessor;
use crate::processor::{Preprocessor, Processor};

/// A user-supplied option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A boolean switch.
    Bool(bool),
    /// A named value.
    Str(String),
}

impl OptionValue {
    fn to_plain(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.clone(),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// Options passed to [`Mode::finalize`], keyed by option name.
pub type OptionMap = BTreeMap<String, OptionValue>;

/// An option declared by a mode's `\options` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeOption {
    /// Declaration line.
    pub line: usize,
    /// Option name.
    pub name: String,
    /// Default value when the caller supplies none.
    pub default: String,
}

/// The result of one transcription.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// False only when the mode was not successfully finalized.
    pub ok: bool,
    /// Best-effort output string.
    pub output: String,
    /// Per-stage token streams and warnings.
    pub debug: DebugRecord,
}

/// A complete transcription mode.
#[derive(Debug, Default)]
pub struct Mode {
    /// Mode name (usually the file stem).
    pub name: String,
    /// Source language code.
    pub language: String,
    /// Target writing-system code.
    pub writing: String,
    /// Declared options, in declaration order.
    pub options: Vec<ModeOption>,
    pub(crate) charset_refs: Vec<(String, bool)>,
    pub(crate) charsets: Vec<Charset>,
    pub(crate) preprocessor: Preprocessor,
    pub(crate) processor: Processor,
    pub(crate) postprocessor: PostProcessor,
    finalize_errors: Vec<FinalizeError>,
    resolved_options: Option<BTreeMap<String, String>>,
}

impl Mode {
    /// Parse a mode file from disk. Charsets referenced by the mode must be
    /// attached afterwards ([`Mode::add_charset`]) or via [`ModeLibrary`].
    ///
    /// # Errors
    ///
    /// All parse errors found in the file.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, Vec<ParseError>> {
        ModeParser::new().parse_file(path)
    }

    /// The charset names this mode declares, with their default flag.
    pub fn charset_refs(&self) -> &[(String, bool)] {
        &self.charset_refs
    }

    /// Attach a loaded charset.
    pub fn add_charset(&mut self, charset: Charset) {
        self.charsets.push(charset);
    }

    /// The charset transcription targets: the declared default, or the
    /// first attached one.
    pub fn default_charset(&self) -> Option<&Charset> {
        let default_name = self
            .charset_refs
            .iter()
            .find(|(_, is_default)| *is_default)
            .map(|(name, _)| name.as_str());
        match default_name {
            Some(name) => self
                .charsets
                .iter()
                .find(|cs| cs.name == name)
                .or(self.charsets.first()),
            None => self.charsets.first(),
        }
    }

    /// The preprocessor stage.
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// The processor stage: rule groups and the compiled trie.
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Errors collected by the last finalization attempt.
    pub fn finalize_errors(&self) -> &[FinalizeError] {
        &self.finalize_errors
    }

    /// True once finalization succeeded.
    pub fn is_finalized(&self) -> bool {
        self.resolved_options.is_some() && self.finalize_errors.is_empty()
    }

    /// Resolve options, deploy macros, expand rules, build the trie.
    ///
    /// Idempotent: re-finalizing with the same options after success is a
    /// no-op. Unknown option names in the map are rejected.
    ///
    /// # Errors
    ///
    /// The accumulated finalization errors; the mode stays usable for
    /// inspection but will not transcribe.
    pub fn finalize(&mut self, options: &OptionMap) -> Result<(), Vec<FinalizeError>> {
        let mut resolved: BTreeMap<String, String> = self
            .options
            .iter()
            .map(|opt| (opt.name.clone(), opt.default.clone()))
            .collect();
        let mut errors = Vec::new();
        for (name, value) in options {
            if resolved.contains_key(name) {
                resolved.insert(name.clone(), value.to_plain());
            } else {
                errors.push(FinalizeError::UnknownOption {
                    line: 0,
                    name: name.clone(),
                });
            }
        }

        if self.resolved_options.as_ref() == Some(&resolved) && self.finalize_errors.is_empty() {
            return Ok(());
        }

        self.processor.finalize(&resolved, &mut errors);
        self.resolved_options = Some(resolved);
        self.finalize_errors = errors;
        if self.finalize_errors.is_empty() {
            Ok(())
        } else {
            Err(self.finalize_errors.clone())
        }
    }

    /// Run the full pipeline over the input.
    ///
    /// Never fails: unresolvable tokens are preserved or dropped with a
    /// warning in the debug record. `ok` is false only when the mode is not
    /// successfully finalized.
    pub fn transcribe(&self, text: &str) -> Transcription {
        self.try_transcribe(text).unwrap_or_else(|_| Transcription {
            ok: false,
            output: String::new(),
            debug: DebugRecord::default(),
        })
    }

    /// Like [`transcribe`](Self::transcribe), but strict about the
    /// finalize-before-use contract.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFinalized`] when `finalize` has not succeeded.
    pub fn try_transcribe(&self, text: &str) -> Result<Transcription, EngineError> {
        if !self.is_finalized() {
            return Err(EngineError::NotFinalized {
                mode: self.name.clone(),
            });
        }

        let placeholder = Charset::default();
        let charset = self.default_charset().unwrap_or(&placeholder);

        let pre_tokens = self.preprocessor.run(text);
        let (proc_tokens, spans) = self.processor.transcribe(&pre_tokens);
        let mut warnings = Vec::new();
        let (post_tokens, output) =
            self.postprocessor
                .apply(proc_tokens.clone(), charset, &mut warnings);

        Ok(Transcription {
            ok: true,
            output,
            debug: DebugRecord {
                preprocessor_output: pre_tokens,
                spans,
                processor_output: proc_tokens,
                postprocessor_output: post_tokens,
                warnings,
            },
        })
    }
}
