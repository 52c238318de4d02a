//! Character dictionary loading and text encoding.

use crate::core::OCRError;
use crate::core::config::{CharacterType, RecognizerConfig};
use crate::core::constants::DEFAULT_EN_CHARACTERS;
use crate::core::traits::CharacterEncoder;
use std::collections::HashMap;
use std::path::Path;

/// Reads a character dictionary file and returns a vector of strings.
///
/// Each line in the file becomes one entry in the resulting vector.
/// Empty lines are preserved.
///
/// # Errors
///
/// Returns an `OCRError::InvalidInput` if the file cannot be read.
///
/// # Example
///
/// ```rust,no_run
/// use oar_textrec::utils::read_character_dict;
/// use std::path::Path;
///
/// let dict = read_character_dict(Path::new("path/to/dict.txt"))?;
/// # Ok::<(), oar_textrec::core::OCRError>(())
/// ```
pub fn read_character_dict(path: &Path) -> Result<Vec<String>, OCRError> {
    let content = std::fs::read_to_string(path).map_err(|e| OCRError::InvalidInput {
        message: format!(
            "Failed to read character dictionary from '{}': {}",
            path.display(),
            e
        ),
    })?;
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// The character set a recognition model was trained on.
///
/// Positions are 0-based; the model's vocabulary adds its own special
/// classes around them.
#[derive(Debug, Clone)]
pub struct CharacterDict {
    characters: Vec<String>,
    index: HashMap<char, usize>,
    lowercase: bool,
}

impl CharacterDict {
    /// Builds a dictionary from explicit entries.
    ///
    /// Only single-character entries can be looked up when encoding. When an
    /// entry repeats, its last position wins.
    pub fn new(characters: Vec<String>, lowercase: bool) -> Self {
        let index = characters
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let mut chars = entry.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, i)),
                    _ => None,
                }
            })
            .collect();
        Self {
            characters,
            index,
            lowercase,
        }
    }

    /// Builds the dictionary for a character type.
    ///
    /// `En` uses the built-in lower-case alphanumeric set and lower-cases
    /// text before encoding. `Ch` reads `dict_path`, one entry per line, and
    /// appends a space when `use_space_char` is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `Ch` is requested without a dictionary path,
    /// and `InvalidInput` when the file cannot be read.
    pub fn for_char_type(
        char_type: CharacterType,
        dict_path: Option<&Path>,
        use_space_char: bool,
    ) -> Result<Self, OCRError> {
        match char_type {
            CharacterType::En => {
                let characters = DEFAULT_EN_CHARACTERS
                    .chars()
                    .map(|c| c.to_string())
                    .collect();
                Ok(Self::new(characters, true))
            }
            CharacterType::Ch => {
                let path = dict_path.ok_or_else(|| {
                    OCRError::config_error_with_context(
                        "rec_char_dict_path",
                        "<unset>",
                        "a character dictionary is required for character type 'ch'",
                    )
                })?;
                let mut characters = read_character_dict(path)?;
                if use_space_char {
                    characters.push(" ".to_string());
                }
                Ok(Self::new(characters, false))
            }
        }
    }

    /// Builds the dictionary described by a recognizer configuration.
    pub fn from_config(config: &RecognizerConfig) -> Result<Self, OCRError> {
        Self::for_char_type(
            config.rec_char_type,
            config.rec_char_dict_path.as_deref(),
            config.use_space_char,
        )
    }

    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

impl CharacterEncoder for CharacterDict {
    fn encode(&self, text: &str) -> Vec<usize> {
        let lookup = |c: char| self.index.get(&c).copied();
        if self.lowercase {
            text.chars()
                .flat_map(char::to_lowercase)
                .filter_map(lookup)
                .collect()
        } else {
            text.chars().filter_map(lookup).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_character_dict() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "c").unwrap();

        let dict = read_character_dict(file.path()).unwrap();
        assert_eq!(dict, vec!["a", "", "c"]);
    }

    #[test]
    fn test_read_character_dict_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_character_dict(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { .. }));
    }

    #[test]
    fn test_en_dictionary_lowercases_and_skips_unknown() {
        let dict = CharacterDict::for_char_type(CharacterType::En, None, true).unwrap();
        assert_eq!(dict.len(), 36);
        assert_eq!(dict.encode("A1-z"), vec![10, 1, 35]);
    }

    #[test]
    fn test_ch_dictionary_appends_space() {
        let mut file = NamedTempFile::new().unwrap();
        for c in ["你", "好", "x"] {
            writeln!(file, "{}", c).unwrap();
        }

        let dict =
            CharacterDict::for_char_type(CharacterType::Ch, Some(file.path()), true).unwrap();
        assert_eq!(dict.len(), 4);
        assert_eq!(dict.encode("好 X你"), vec![1, 3, 0]);

        let no_space =
            CharacterDict::for_char_type(CharacterType::Ch, Some(file.path()), false).unwrap();
        assert_eq!(no_space.len(), 3);
    }

    #[test]
    fn test_ch_dictionary_requires_path() {
        let err = CharacterDict::for_char_type(CharacterType::Ch, None, true).unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
    }

    #[test]
    fn test_from_config() {
        let config = RecognizerConfig {
            rec_char_type: CharacterType::En,
            ..RecognizerConfig::default()
        };
        let dict = CharacterDict::from_config(&config).unwrap();
        assert_eq!(dict.characters()[0], "0");
    }
}
