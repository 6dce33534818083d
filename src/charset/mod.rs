//! Target alphabets: real characters and contextual virtual characters.
//!
//! A [`Charset`] is the registry backing a mode's output side. It owns two
//! kinds of entries:
//!
//! - [`Char`] - a real character: one or more names, a hexadecimal *font
//!   code*, and classification flags. When the font code already lies in a
//!   Unicode Private Use Area (or the ASCII printable range) it doubles as
//!   the emitted code point; legacy font codes below `U+E000` are emitted in
//!   the supplementary PUA at `U+E0000 + code`.
//! - [`VirtualChar`] - a placeholder resolved during postprocessing: an
//!   ordered list of contextual [`Rewrite`]s, an optional unconditional
//!   sequence expansion, and an optional swap with an adjacent token.
//!
//! Tokens in the pipeline reference entries by *name*; the charset is the
//! only place names resolve to anything concrete. Several names may alias
//! one entry (`SULE` / `THULE`); the first declared name is canonical.

mod parser;

pub use parser::CharsetParser;

use rustc_hash::FxHashMap;

/// Classification flags on a real character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharFlags {
    /// Punctuation mark.
    pub punctuation: bool,
    /// Whitespace-like glyph.
    pub space: bool,
    /// Digit glyph.
    pub digit: bool,
}

/// A real charset character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Char {
    /// Declaration line in the charset file.
    pub line: usize,
    /// Font code, parsed from hexadecimal.
    pub code: u32,
    /// Names, first one canonical.
    pub names: Vec<String>,
    /// Classification flags.
    pub flags: CharFlags,
}

impl Char {
    /// The Unicode scalar this character emits.
    ///
    /// Font codes in the BMP PUA (`U+E000..`) and the ASCII printable range
    /// map directly; anything else lands in the supplementary PUA at
    /// `U+E0000 + code` so extended font positions stay addressable.
    pub fn output_point(&self) -> char {
        let direct = (0x20..0x7F).contains(&self.code) || self.code >= 0xE000;
        let point = if direct { self.code } else { 0xE0000 + self.code };
        // Fallback codes stay below U+EE000, and direct codes below U+E000
        // never reach here, so the conversion cannot hit a surrogate.
        char::from_u32(point).unwrap_or('\u{FFFD}')
    }
}

/// One contextual rewrite of a virtual character.
///
/// The trigger is a token-name window containing the virtual itself; when
/// the surrounding tokens match, the whole window is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Token names to match, including at least one name of the owning
    /// virtual.
    pub trigger: Vec<String>,
    /// Token names spliced in place of the matched window.
    pub replacement: Vec<String>,
}

/// Which neighbour a virtual swaps with during pass 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    /// Exchange with the token before the virtual.
    Before,
    /// Exchange with the token after the virtual.
    After,
}

/// A virtual character: resolved against context during postprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualChar {
    /// Declaration line in the charset file.
    pub line: usize,
    /// Names, first one canonical.
    pub names: Vec<String>,
    /// Contextual rewrites, tried in declaration order.
    pub rewrites: Vec<Rewrite>,
    /// Unconditional expansion applied in pass 2; empty means none.
    pub sequence: Vec<String>,
    /// Optional swap with an adjacent token, applied in pass 2.
    pub swap: Option<SwapSide>,
}

/// Index entry: which table a name points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRef {
    /// Index into the real-character table.
    Real(usize),
    /// Index into the virtual-character table.
    Virtual(usize),
}

/// A complete charset: named real characters plus virtuals.
#[derive(Debug, Clone, Default)]
pub struct Charset {
    /// Charset name (usually the file stem).
    pub name: String,
    chars: Vec<Char>,
    virtuals: Vec<VirtualChar>,
    index: FxHashMap<String, EntryRef>,
}

impl Charset {
    /// An empty charset with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register a real character. Later declarations win name collisions.
    pub fn add_char(&mut self, ch: Char) {
        let idx = self.chars.len();
        for name in &ch.names {
            self.index.insert(name.clone(), EntryRef::Real(idx));
        }
        self.chars.push(ch);
    }

    /// Register a virtual character. Later declarations win name collisions.
    pub fn add_virtual(&mut self, vc: VirtualChar) {
        let idx = self.virtuals.len();
        for name in &vc.names {
            self.index.insert(name.clone(), EntryRef::Virtual(idx));
        }
        self.virtuals.push(vc);
    }

    /// Look a name up in the registry.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<EntryRef> {
        self.index.get(name).copied()
    }

    /// True if the name resolves to any entry.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The real character behind a name, if any.
    pub fn char_named(&self, name: &str) -> Option<&Char> {
        match self.lookup(name)? {
            EntryRef::Real(idx) => self.chars.get(idx),
            EntryRef::Virtual(_) => None,
        }
    }

    /// The virtual character behind a name, if any.
    pub fn virtual_named(&self, name: &str) -> Option<&VirtualChar> {
        match self.lookup(name)? {
            EntryRef::Virtual(idx) => self.virtuals.get(idx),
            EntryRef::Real(_) => None,
        }
    }

    /// True if the name resolves to a virtual.
    #[inline]
    pub fn is_virtual(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(EntryRef::Virtual(_)))
    }

    /// The canonical (first-declared) name behind any alias.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        match self.lookup(name)? {
            EntryRef::Real(idx) => self.chars.get(idx).and_then(|c| c.names.first()),
            EntryRef::Virtual(idx) => self.virtuals.get(idx).and_then(|v| v.names.first()),
        }
        .map(String::as_str)
    }

    /// All real characters, in declaration order.
    #[inline]
    pub fn chars(&self) -> &[Char] {
        &self.chars
    }

    /// All virtual characters, in declaration order.
    #[inline]
    pub fn virtuals(&self) -> &[VirtualChar] {
        &self.virtuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Charset {
        let mut cs = Charset::new("test");
        cs.add_char(Char {
            line: 1,
            code: 0xE000,
            names: vec!["TINCO".into(), "T".into()],
            flags: CharFlags::default(),
        });
        cs.add_char(Char {
            line: 2,
            code: 0x25,
            names: vec!["LEGACY".into()],
            flags: CharFlags::default(),
        });
        cs.add_virtual(VirtualChar {
            line: 3,
            names: vec!["LIG".into()],
            rewrites: vec![],
            sequence: vec![],
            swap: None,
        });
        cs
    }

    #[test]
    fn aliases_share_an_entry() {
        let cs = sample();
        assert_eq!(cs.canonical("T"), Some("TINCO"));
        assert_eq!(cs.char_named("T").unwrap().code, 0xE000);
    }

    #[test]
    fn virtual_lookup() {
        let cs = sample();
        assert!(cs.is_virtual("LIG"));
        assert!(!cs.is_virtual("TINCO"));
        assert!(cs.char_named("LIG").is_none());
    }

    #[test]
    fn pua_codes_emit_directly() {
        let cs = sample();
        assert_eq!(cs.char_named("TINCO").unwrap().output_point(), '\u{E000}');
    }

    #[test]
    fn legacy_codes_fall_back_to_supplementary_pua() {
        let cs = sample();
        // 0x25 is '%', inside the printable ASCII range, so it maps directly.
        assert_eq!(cs.char_named("LEGACY").unwrap().output_point(), '%');
        let ch = Char {
            line: 1,
            code: 0x5,
            names: vec!["X".into()],
            flags: CharFlags::default(),
        };
        assert_eq!(ch.output_point(), '\u{E0005}');
    }
}
