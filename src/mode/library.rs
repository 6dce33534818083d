//! Resource lookup: enumerate and load modes from a directory tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::charset::CharsetParser;
use crate::error::ParseError;

use super::{Mode, ModeParser};

/// A scanned resource directory: `<root>/modes/*.glaem` plus
/// `<root>/charsets/*.cst`.
///
/// Loading a mode parses its file and attaches every charset it references,
/// so the result is ready to finalize.
#[derive(Debug)]
pub struct ModeLibrary {
    modes_dir: PathBuf,
    charsets_dir: PathBuf,
    mode_names: Vec<String>,
}

impl ModeLibrary {
    /// Scan a resource root for available modes.
    ///
    /// # Errors
    ///
    /// Propagates directory-listing failures.
    pub fn scan(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        let modes_dir = root.join("modes");
        let charsets_dir = root.join("charsets");

        let mut mode_names = Vec::new();
        for entry in fs::read_dir(&modes_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "glaem") {
                if let Some(stem) = path.file_stem() {
                    mode_names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        mode_names.sort();

        Ok(Self {
            modes_dir,
            charsets_dir,
            mode_names,
        })
    }

    /// Available mode names, sorted.
    pub fn mode_names(&self) -> &[String] {
        &self.mode_names
    }

    /// Parse a mode and attach its referenced charsets.
    ///
    /// # Errors
    ///
    /// Parse errors from the mode file or any referenced charset file.
    pub fn load(&self, name: &str) -> Result<Mode, Vec<ParseError>> {
        let mode_path = self.modes_dir.join(format!("{name}.glaem"));
        let mut mode = ModeParser::new().parse_file(&mode_path)?;

        let charset_parser = CharsetParser::new();
        let refs: Vec<String> = mode
            .charset_refs()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        for charset_name in refs {
            let charset_path = self.charsets_dir.join(format!("{charset_name}.cst"));
            let charset = charset_parser.parse_file(&charset_path)?;
            mode.add_charset(charset);
        }
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scans_and_loads_from_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("modes")).unwrap();
        fs::create_dir(dir.path().join("charsets")).unwrap();
        fs::write(
            dir.path().join("modes/tiny.glaem"),
            "\\language qya\n\\charset mini true\n\\processor\n\\rules main\nt --> TINCO\n\\end\n\\end\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("charsets/mini.cst"),
            "\\char E000 TINCO\n",
        )
        .unwrap();

        let library = ModeLibrary::scan(dir.path()).unwrap();
        assert_eq!(library.mode_names(), ["tiny"]);

        let mode = library.load("tiny").unwrap();
        assert_eq!(mode.language, "qya");
        assert_eq!(mode.default_charset().unwrap().name, "mini");
    }

    #[test]
    fn missing_mode_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("modes")).unwrap();
        fs::create_dir(dir.path().join("charsets")).unwrap();
        let library = ModeLibrary::scan(dir.path()).unwrap();
        assert!(library.load("absent").is_err());
    }
}
