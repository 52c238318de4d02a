//! Recognizer configuration: model geometry, algorithm selection and
//! character filtering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use crate::core::OCRError;
use crate::core::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_TEXT_LENGTH, DEFAULT_REC_ALGORITHM, DEFAULT_REC_IMAGE_SHAPE,
    DEFAULT_SRN_NUM_HEADS, SRN_FEATURE_STRIDE,
};

/// Fixed tensor geometry (channels, height, width) a recognition model expects.
///
/// Parsed from and serialized to the comma separated form used on the command
/// line, e.g. `"3, 32, 320"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Geometry {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Geometry {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Returns the geometry as `[channels, height, width]`.
    pub fn as_array(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// Length of the structure-aware encoder's positional sequence,
    /// `(height / 8) * (width / 8)` computed in floating point and truncated.
    pub fn feature_dim(&self) -> usize {
        let stride = SRN_FEATURE_STRIDE as f64;
        ((self.height as f64 / stride) * (self.width as f64 / stride)) as usize
    }
}

impl Default for Geometry {
    fn default() -> Self {
        let [channels, height, width] = DEFAULT_REC_IMAGE_SHAPE;
        Self::new(channels, height, width)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.channels, self.height, self.width)
    }
}

impl FromStr for Geometry {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims = s
            .split(',')
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    OCRError::invalid_input(format!(
                        "image shape '{}' has a non-integer dimension '{}'",
                        s,
                        part.trim()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let [channels, height, width] = dims[..] else {
            return Err(OCRError::invalid_input(format!(
                "image shape '{}' must have exactly 3 dimensions (channels, height, width)",
                s
            )));
        };

        if channels == 0 || height == 0 || width == 0 {
            return Err(OCRError::invalid_input(format!(
                "image shape '{}' has a zero dimension",
                s
            )));
        }

        Ok(Self::new(channels, height, width))
    }
}

impl TryFrom<String> for Geometry {
    type Error = OCRError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Geometry> for String {
    fn from(geometry: Geometry) -> Self {
        geometry.to_string()
    }
}

/// Recognition algorithm family.
///
/// Resolved once from the configured algorithm name when a recognizer is
/// built; it selects the normalizer, whether auxiliary inputs are produced,
/// and whether character masking applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecAlgorithm {
    /// CTC models (CRNN, Rosetta, STAR-Net).
    Standard,
    /// SRN: grayscale input plus positional and attention-bias tensors.
    StructureAware,
    /// Attention decoders (RARE).
    AttentionBased,
}

impl RecAlgorithm {
    /// Resolves an algorithm name. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, OCRError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CRNN" | "ROSETTA" | "STARNET" | "STAR-NET" => Ok(Self::Standard),
            "SRN" => Ok(Self::StructureAware),
            "RARE" => Ok(Self::AttentionBased),
            _ => Err(OCRError::unsupported_algorithm(name)),
        }
    }

    pub fn uses_auxiliary_inputs(&self) -> bool {
        matches!(self, Self::StructureAware)
    }

    /// Masking only applies to the standard and attention output paths.
    pub fn applies_character_mask(&self) -> bool {
        !matches!(self, Self::StructureAware)
    }

    /// Position of the score tensor in the predictor's output list.
    pub fn score_output_index(&self) -> usize {
        match self {
            Self::StructureAware => 3,
            Self::Standard | Self::AttentionBased => 0,
        }
    }
}

impl FromStr for RecAlgorithm {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for RecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::StructureAware => write!(f, "structure-aware"),
            Self::AttentionBased => write!(f, "attention"),
        }
    }
}

/// Script category of the character set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterType {
    /// Wide-character scripts. The padded width is derived from the group's
    /// widest crop instead of the configured width.
    #[default]
    Ch,
    /// Latin alphanumerics; the default dictionary is lower-case `0-9a-z`.
    En,
}

impl CharacterType {
    pub fn uses_group_width(&self) -> bool {
        matches!(self, Self::Ch)
    }
}

impl FromStr for CharacterType {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ch" => Ok(Self::Ch),
            "en" => Ok(Self::En),
            other => Err(OCRError::invalid_input(format!(
                "unknown character type '{}', expected 'ch' or 'en'",
                other
            ))),
        }
    }
}

/// Configuration of a text recognizer.
///
/// Read-only once a recognizer is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Algorithm name (CRNN, Rosetta, STARNet, RARE, SRN).
    pub rec_algorithm: String,
    /// Model input geometry.
    pub rec_image_shape: Geometry,
    /// Script category of the dictionary.
    pub rec_char_type: CharacterType,
    /// Number of crops per predictor call.
    pub rec_batch_num: usize,
    /// Maximum decoded sequence length (structure-aware decoder positions).
    pub max_text_length: usize,
    /// Attention head count of the structure-aware model.
    pub srn_num_heads: usize,
    /// Characters allowed in the output. Takes precedence over the deny-list.
    pub rec_whitelist: String,
    /// Characters removed from the output.
    pub rec_blacklist: String,
    /// Character dictionary, one entry per line.
    pub rec_char_dict_path: Option<PathBuf>,
    /// Appends a space to the dictionary.
    pub use_space_char: bool,
    /// Model name used in logs and errors.
    pub model_name: Option<String>,
    /// ONNX Runtime session settings.
    pub ort_session: Option<OrtSessionConfig>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            rec_algorithm: DEFAULT_REC_ALGORITHM.to_string(),
            rec_image_shape: Geometry::default(),
            rec_char_type: CharacterType::default(),
            rec_batch_num: DEFAULT_BATCH_SIZE,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            srn_num_heads: DEFAULT_SRN_NUM_HEADS,
            rec_whitelist: String::new(),
            rec_blacklist: String::new(),
            rec_char_dict_path: None,
            use_space_char: true,
            model_name: None,
            ort_session: None,
        }
    }
}

impl RecognizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, OCRError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// A malformed `rec_image_shape` string is reported as `InvalidInput`;
    /// any other problem is a `ConfigError`.
    pub fn from_json_str(json: &str) -> Result<Self, OCRError> {
        let parse_error = |e: serde_json::Error| {
            OCRError::config_error(format!("failed to parse recognizer config: {}", e))
        };

        let value: serde_json::Value = serde_json::from_str(json).map_err(parse_error)?;
        if let Some(shape) = value.get("rec_image_shape").and_then(serde_json::Value::as_str) {
            shape.parse::<Geometry>()?;
        }
        serde_json::from_value(value).map_err(parse_error)
    }

    /// Resolves the configured algorithm name.
    pub fn algorithm(&self) -> Result<RecAlgorithm, OCRError> {
        RecAlgorithm::from_name(&self.rec_algorithm)
    }

    /// Model name for logs, falling back to the algorithm name.
    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(&self.rec_algorithm)
    }
}

impl ConfigValidator for RecognizerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size(self.rec_batch_num)?;

        let geometry = self.rec_image_shape;
        if geometry.channels == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "image shape channels must be greater than 0".to_string(),
            });
        }
        self.validate_image_dimensions(geometry.width as u32, geometry.height as u32)?;

        if self.max_text_length == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "max_text_length must be greater than 0".to_string(),
            });
        }
        if self.srn_num_heads == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "srn_num_heads must be greater than 0".to_string(),
            });
        }

        if let Some(ort) = &self.ort_session {
            if let Some(threads) = ort.intra_threads {
                self.validate_thread_count(threads)?;
            }
            if let Some(threads) = ort.inter_threads {
                self.validate_thread_count(threads)?;
            }
        }

        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_parsing() {
        let geometry: Geometry = "3, 32, 100".parse().unwrap();
        assert_eq!(geometry, Geometry::new(3, 32, 100));
        assert_eq!(geometry.to_string(), "3, 32, 100");

        let compact: Geometry = "1,64,256".parse().unwrap();
        assert_eq!(compact.as_array(), [1, 64, 256]);
    }

    #[test]
    fn test_geometry_parsing_errors() {
        for bad in ["3, 32", "3, 32, 100, 1", "3, x, 100", "", "3, 0, 100"] {
            let err = bad.parse::<Geometry>().unwrap_err();
            assert!(
                matches!(err, OCRError::InvalidInput { .. }),
                "'{}' should be rejected as invalid input",
                bad
            );
        }
    }

    #[test]
    fn test_feature_dim_truncates() {
        assert_eq!(Geometry::new(1, 64, 256).feature_dim(), 256);
        assert_eq!(Geometry::new(1, 32, 100).feature_dim(), 50);
    }

    #[test]
    fn test_algorithm_resolution() {
        assert_eq!(RecAlgorithm::from_name("CRNN").unwrap(), RecAlgorithm::Standard);
        assert_eq!(RecAlgorithm::from_name("rosetta").unwrap(), RecAlgorithm::Standard);
        assert_eq!(RecAlgorithm::from_name("STAR-Net").unwrap(), RecAlgorithm::Standard);
        assert_eq!(RecAlgorithm::from_name("SRN").unwrap(), RecAlgorithm::StructureAware);
        assert_eq!(RecAlgorithm::from_name("RARE").unwrap(), RecAlgorithm::AttentionBased);
        assert!(matches!(
            RecAlgorithm::from_name("NRTR"),
            Err(OCRError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_algorithm_strategy_flags() {
        let srn = RecAlgorithm::StructureAware;
        assert!(srn.uses_auxiliary_inputs());
        assert!(!srn.applies_character_mask());
        assert_eq!(srn.score_output_index(), 3);

        for algorithm in [RecAlgorithm::Standard, RecAlgorithm::AttentionBased] {
            assert!(!algorithm.uses_auxiliary_inputs());
            assert!(algorithm.applies_character_mask());
            assert_eq!(algorithm.score_output_index(), 0);
        }
    }

    #[test]
    fn test_config_defaults_and_validate() {
        let config = RecognizerConfig::new();
        assert_eq!(config.rec_image_shape, Geometry::new(3, 32, 320));
        assert_eq!(config.rec_batch_num, 6);
        assert_eq!(config.max_text_length, 25);
        assert_eq!(config.srn_num_heads, 8);
        assert_eq!(config.rec_char_type, CharacterType::Ch);
        assert!(config.use_space_char);
        assert!(config.validate().is_ok());

        let config = RecognizerConfig {
            rec_batch_num: 0,
            ..RecognizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchSize)
        ));
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = RecognizerConfig::from_json_str(
            r#"{
                "rec_algorithm": "SRN",
                "rec_image_shape": "1, 64, 256",
                "rec_char_type": "en",
                "rec_whitelist": "0123456789"
            }"#,
        )
        .unwrap();

        assert_eq!(config.algorithm().unwrap(), RecAlgorithm::StructureAware);
        assert_eq!(config.rec_image_shape, Geometry::new(1, 64, 256));
        assert_eq!(config.rec_char_type, CharacterType::En);
        assert_eq!(config.rec_batch_num, 6);
        assert_eq!(config.model_name(), "SRN");

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"rec_image_shape\":\"1, 64, 256\""));
        assert_eq!(RecognizerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_config_from_json_rejects_bad_shape() {
        let err = RecognizerConfig::from_json_str(r#"{ "rec_image_shape": "3, 32" }"#).unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { .. }));

        let err = RecognizerConfig::from_json_str(r#"{ "rec_image_shape": "3, x, 320" }"#)
            .unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { .. }));

        let err = RecognizerConfig::from_json_str(r#"{ "rec_batch_num": "six" }"#).unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
    }

    #[test]
    fn test_character_type_parsing() {
        assert_eq!("EN".parse::<CharacterType>().unwrap(), CharacterType::En);
        assert!(CharacterType::Ch.uses_group_width());
        assert!(!CharacterType::En.uses_group_width());
        assert!("fr".parse::<CharacterType>().is_err());
    }
}
