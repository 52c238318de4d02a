//! Batched text-line recognition.
//!
//! [`TextRecognizer`] sorts crops by aspect ratio, normalizes each group with
//! the algorithm's normalizer, runs the predictor once per group, masks the
//! scores, decodes them and scatters the results back into input order.

use crate::core::config::{
    CharacterType, ConfigValidatorExt, Geometry, RecAlgorithm, RecognizerConfig,
};
use crate::core::traits::{CharacterEncoder, Decoder, Predictor, RecognitionInputs};
use crate::core::{BatchPlan, OCRError, OcrResult, TensorD, TensorOutput};
use crate::core::inference::OrtInfer;
use crate::processors::{
    AttnLabelDecode, CTCLabelDecode, CharacterMask, OCRResize, SRNLabelDecode,
    SrnAuxiliaryInputs, SrnResize,
};
use crate::utils::CharacterDict;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Recognized text for one crop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

/// Results of one [`TextRecognizer::recognize`] call.
#[derive(Debug, Clone, Default)]
pub struct RecognitionOutput {
    /// One entry per input crop, in input order.
    pub results: Vec<RecognitionResult>,
    /// Wall-clock time spent inside the predictor, summed over groups.
    pub elapsed: Duration,
}

#[derive(Debug)]
enum Normalizer {
    Standard(OCRResize),
    StructureAware {
        resize: SrnResize,
        auxiliary: SrnAuxiliaryInputs,
    },
}

impl Normalizer {
    fn new(algorithm: RecAlgorithm, config: &RecognizerConfig) -> Self {
        match algorithm {
            RecAlgorithm::StructureAware => Normalizer::StructureAware {
                resize: SrnResize::new(config.rec_image_shape),
                auxiliary: SrnAuxiliaryInputs::build(
                    &config.rec_image_shape,
                    config.srn_num_heads,
                    config.max_text_length,
                ),
            },
            RecAlgorithm::Standard | RecAlgorithm::AttentionBased => Normalizer::Standard(
                OCRResize::new(config.rec_image_shape, config.rec_char_type),
            ),
        }
    }

    fn normalize(&self, crops: &[&RgbImage], max_wh_ratio: f32) -> OcrResult<RecognitionInputs> {
        match self {
            Normalizer::Standard(resize) => {
                Ok(RecognitionInputs::new(resize.apply(crops, max_wh_ratio)?))
            }
            Normalizer::StructureAware { resize, auxiliary } => {
                let image = resize.apply(crops)?;
                Ok(RecognitionInputs::new(image).with_auxiliary(auxiliary.replicate(crops.len())?))
            }
        }
    }
}

/// Recognizes text in cropped text-line images.
///
/// Configuration is fixed at construction. Character masks are built inside
/// each call, so one recognizer can serve calls from several threads.
#[derive(Debug)]
pub struct TextRecognizer {
    config: RecognizerConfig,
    algorithm: RecAlgorithm,
    normalizer: Normalizer,
    predictor: Arc<dyn Predictor>,
    decoder: Arc<dyn Decoder>,
    encoder: Option<Arc<dyn CharacterEncoder>>,
}

impl TextRecognizer {
    pub fn builder() -> TextRecognizerBuilder {
        TextRecognizerBuilder::new()
    }

    /// Builds a recognizer backed by an ONNX model, with the label decoder
    /// matching the configured algorithm and the configured dictionary.
    pub fn from_onnx(config: RecognizerConfig, model_path: &Path) -> OcrResult<Self> {
        let algorithm = config.algorithm()?;
        let config = config.validate_and_wrap_ocr_error()?;
        let dict = Arc::new(CharacterDict::from_config(&config)?);

        let decoder: Arc<dyn Decoder> = match algorithm {
            RecAlgorithm::Standard => Arc::new(CTCLabelDecode::new(dict.characters())),
            RecAlgorithm::AttentionBased => Arc::new(AttnLabelDecode::new(dict.characters())),
            RecAlgorithm::StructureAware => Arc::new(SRNLabelDecode::new(
                dict.characters(),
                config.max_text_length,
            )),
        };
        let predictor = Arc::new(OrtInfer::from_config(
            model_path,
            config.model_name.as_deref(),
            config.ort_session.as_ref(),
        )?);

        TextRecognizerBuilder::new()
            .config(config)
            .predictor(predictor)
            .decoder(decoder)
            .encoder(dict)
            .build()
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn algorithm(&self) -> RecAlgorithm {
        self.algorithm
    }

    /// Recognizes every crop, returning results in input order.
    ///
    /// Crops are grouped by ascending aspect ratio into batches of
    /// `rec_batch_num`; the predictor is called once per group.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` for a crop with zero width or height, or a geometry
    ///   the normalizer cannot produce.
    /// * `Inference` when the predictor fails, returns too few outputs, or the
    ///   decoder returns a different number of rows than the group holds.
    pub fn recognize(&self, images: &[RgbImage]) -> OcrResult<RecognitionOutput> {
        if images.is_empty() {
            return Ok(RecognitionOutput::default());
        }

        let plan = BatchPlan::from_dimensions(
            images.iter().map(|img| img.dimensions()),
            self.config.rec_batch_num,
        )?;

        let mut results = vec![RecognitionResult::default(); images.len()];
        let mut elapsed = Duration::ZERO;
        let mut mask_cache: Option<(usize, Option<CharacterMask>)> = None;
        let mut group_count = 0;

        for (group_index, group) in plan.groups().enumerate() {
            let members = plan.members(&group);
            let crops: Vec<&RgbImage> = members.iter().map(|&i| &images[i]).collect();

            let inputs = self.normalizer.normalize(&crops, group.max_ratio)?;
            debug!(
                group = group_index,
                size = members.len(),
                max_ratio = group.max_ratio,
                padded_width = inputs.image.shape()[3],
                "recognizing group"
            );

            let start = Instant::now();
            let outputs = self.predictor.predict(&inputs)?;
            elapsed += start.elapsed();

            let mut scores = self.select_scores(outputs)?;

            if self.algorithm.applies_character_mask() {
                let vocab_size = scores.shape().last().copied().unwrap_or(0);
                let cached = match mask_cache.take() {
                    Some((size, mask)) if size == vocab_size => mask,
                    _ => self.build_mask(vocab_size),
                };
                if let Some(mask) = &cached {
                    mask.apply(&mut scores)?;
                }
                mask_cache = Some((vocab_size, cached));
            }

            let decoded = self.decoder.decode(&scores, members.len())?;
            if decoded.len() != members.len() {
                return Err(OCRError::inference_mismatch(
                    self.predictor.model_name(),
                    format!(
                        "decoder returned {} results for a group of {} images",
                        decoded.len(),
                        members.len()
                    ),
                ));
            }

            for (&index, (text, confidence)) in members.iter().zip(decoded) {
                results[index] = RecognitionResult { text, confidence };
            }
            group_count += 1;
        }

        debug!(
            images = images.len(),
            groups = group_count,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "recognition finished"
        );

        Ok(RecognitionOutput { results, elapsed })
    }

    fn select_scores(&self, outputs: Vec<(String, TensorOutput)>) -> OcrResult<TensorD> {
        let index = self.algorithm.score_output_index();
        let count = outputs.len();
        let model = self.predictor.model_name();
        let (name, tensor) = outputs.into_iter().nth(index).ok_or_else(|| {
            OCRError::inference_mismatch(
                model,
                format!(
                    "{} recognizer reads output {} but the model returned {} outputs",
                    self.algorithm, index, count
                ),
            )
        })?;
        tensor.try_into_array_f32().map_err(|e| {
            OCRError::inference_error(model, format!("output '{}' is not a score tensor", name), e)
        })
    }

    fn build_mask(&self, vocab_size: usize) -> Option<CharacterMask> {
        let encoder = self.encoder.as_deref()?;
        CharacterMask::build(
            vocab_size,
            &self.config.rec_whitelist,
            &self.config.rec_blacklist,
            encoder,
        )
    }
}

/// Builder for [`TextRecognizer`].
#[derive(Debug, Default)]
pub struct TextRecognizerBuilder {
    config: RecognizerConfig,
    predictor: Option<Arc<dyn Predictor>>,
    decoder: Option<Arc<dyn Decoder>>,
    encoder: Option<Arc<dyn CharacterEncoder>>,
}

impl TextRecognizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rec_algorithm(mut self, name: impl Into<String>) -> Self {
        self.config.rec_algorithm = name.into();
        self
    }

    pub fn rec_image_shape(mut self, geometry: Geometry) -> Self {
        self.config.rec_image_shape = geometry;
        self
    }

    pub fn rec_char_type(mut self, char_type: CharacterType) -> Self {
        self.config.rec_char_type = char_type;
        self
    }

    pub fn rec_batch_num(mut self, batch_size: usize) -> Self {
        self.config.rec_batch_num = batch_size;
        self
    }

    pub fn max_text_length(mut self, length: usize) -> Self {
        self.config.max_text_length = length;
        self
    }

    pub fn srn_num_heads(mut self, heads: usize) -> Self {
        self.config.srn_num_heads = heads;
        self
    }

    pub fn rec_whitelist(mut self, chars: impl Into<String>) -> Self {
        self.config.rec_whitelist = chars.into();
        self
    }

    pub fn rec_blacklist(mut self, chars: impl Into<String>) -> Self {
        self.config.rec_blacklist = chars.into();
        self
    }

    pub fn predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Encoder used to turn the allow/deny lists into vocabulary indices.
    ///
    /// When unset and a list is configured, the dictionary described by the
    /// configuration is loaded.
    pub fn encoder(mut self, encoder: Arc<dyn CharacterEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn build(self) -> OcrResult<TextRecognizer> {
        let algorithm = self.config.algorithm()?;
        let config = self.config.validate_and_wrap_ocr_error()?;

        let predictor = self
            .predictor
            .ok_or_else(|| OCRError::config_error("a predictor is required"))?;
        let decoder = self
            .decoder
            .ok_or_else(|| OCRError::config_error("a decoder is required"))?;

        let wants_mask = algorithm.applies_character_mask()
            && !(config.rec_whitelist.is_empty() && config.rec_blacklist.is_empty());
        let encoder = match self.encoder {
            Some(encoder) => Some(encoder),
            None if wants_mask => {
                Some(Arc::new(CharacterDict::from_config(&config)?) as Arc<dyn CharacterEncoder>)
            }
            None => None,
        };

        let normalizer = Normalizer::new(algorithm, &config);
        debug!(
            algorithm = %algorithm,
            geometry = %config.rec_image_shape,
            batch_size = config.rec_batch_num,
            "text recognizer ready"
        );

        Ok(TextRecognizer {
            config,
            algorithm,
            normalizer,
            predictor,
            decoder,
            encoder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::{Axis, Ix3};
    use std::sync::Mutex;

    const VOCAB: usize = 5;

    /// Emits (B, 2, VOCAB) scores: step 0 carries the first pixel of each
    /// image at class 0, step 1 is all ones so masking is observable.
    #[derive(Debug, Default)]
    struct RecordingPredictor {
        shapes: Mutex<Vec<Vec<usize>>>,
        auxiliary_batches: Mutex<Vec<Option<usize>>>,
        leading_outputs: usize,
        trailing_outputs: usize,
    }

    impl RecordingPredictor {
        fn with_leading_outputs(leading_outputs: usize) -> Self {
            Self {
                leading_outputs,
                ..Self::default()
            }
        }

        fn with_trailing_outputs(trailing_outputs: usize) -> Self {
            Self {
                trailing_outputs,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.shapes.lock().unwrap().len()
        }
    }

    impl Predictor for RecordingPredictor {
        fn predict(
            &self,
            inputs: &RecognitionInputs,
        ) -> Result<Vec<(String, TensorOutput)>, OCRError> {
            self.shapes
                .lock()
                .unwrap()
                .push(inputs.image.shape().to_vec());
            self.auxiliary_batches
                .lock()
                .unwrap()
                .push(inputs.auxiliary.as_ref().map(|a| a.batch_size()));

            let batch = inputs.batch_size();
            let mut data = Vec::with_capacity(batch * 2 * VOCAB);
            for b in 0..batch {
                let marker = inputs.image[[b, 0, 0, 0]];
                data.push(marker);
                data.extend(std::iter::repeat_n(0.0, VOCAB - 1));
                data.extend(std::iter::repeat_n(1.0, VOCAB));
            }

            let index_output = |i: usize| {
                (
                    format!("aux_{}", i),
                    TensorOutput::I64 {
                        shape: vec![1],
                        data: vec![0],
                    },
                )
            };
            let mut outputs: Vec<(String, TensorOutput)> =
                (0..self.leading_outputs).map(index_output).collect();
            outputs.push((
                "scores".to_string(),
                TensorOutput::F32 {
                    shape: vec![batch as i64, 2, VOCAB as i64],
                    data,
                },
            ));
            outputs.extend((0..self.trailing_outputs).map(index_output));
            Ok(outputs)
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    /// Recovers the pixel value from the marker and counts classes that
    /// survived masking.
    #[derive(Debug)]
    struct MarkerDecoder {
        raw: bool,
        drop_last: bool,
    }

    impl Decoder for MarkerDecoder {
        fn decode(
            &self,
            scores: &TensorD,
            _batch_size: usize,
        ) -> Result<Vec<(String, f32)>, OCRError> {
            let scores = scores.view().into_dimensionality::<Ix3>().unwrap();
            let mut out: Vec<(String, f32)> = scores
                .axis_iter(Axis(0))
                .map(|row| {
                    let marker = row[[0, 0]];
                    let pixel = if self.raw {
                        marker
                    } else {
                        (marker + 1.0) * 127.5
                    };
                    let kept = row.index_axis(Axis(0), 1).sum();
                    (format!("{}", pixel.round() as i32), kept)
                })
                .collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    fn decoder() -> Arc<MarkerDecoder> {
        Arc::new(MarkerDecoder {
            raw: false,
            drop_last: false,
        })
    }

    fn crop(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    fn en_dict() -> Arc<CharacterDict> {
        Arc::new(CharacterDict::for_char_type(CharacterType::En, None, false).unwrap())
    }

    fn builder(predictor: Arc<RecordingPredictor>) -> TextRecognizerBuilder {
        TextRecognizer::builder()
            .rec_image_shape(Geometry::new(3, 32, 100))
            .rec_char_type(CharacterType::En)
            .predictor(predictor)
            .decoder(decoder())
    }

    #[test]
    fn test_results_scatter_back_to_input_order() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor.clone()).rec_batch_num(2).build().unwrap();

        // ratios 3.0, 0.5, 1.5 -> sorted order [1, 2, 0]
        let images = vec![crop(96, 32, 10), crop(16, 32, 20), crop(48, 32, 30)];
        let output = recognizer.recognize(&images).unwrap();

        let texts: Vec<_> = output.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["10", "20", "30"]);

        let shapes = predictor.shapes.lock().unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0], vec![2, 3, 32, 100]);
        assert_eq!(shapes[1], vec![1, 3, 32, 100]);
    }

    #[test]
    fn test_one_call_per_group() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor.clone()).rec_batch_num(6).build().unwrap();

        let images: Vec<_> = (0..13).map(|i| crop(20 + i, 16, i as u8)).collect();
        let output = recognizer.recognize(&images).unwrap();

        assert_eq!(output.results.len(), 13);
        assert_eq!(predictor.calls(), 3);
        for (i, result) in output.results.iter().enumerate() {
            assert_eq!(result.text, i.to_string());
        }
    }

    #[test]
    fn test_empty_input_skips_predictor() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor.clone()).build().unwrap();

        let output = recognizer.recognize(&[]).unwrap();
        assert!(output.results.is_empty());
        assert_eq!(output.elapsed, Duration::ZERO);
        assert_eq!(predictor.calls(), 0);
    }

    #[test]
    fn test_zero_height_crop_is_rejected() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor.clone()).build().unwrap();

        let images = vec![crop(10, 10, 1), RgbImage::new(10, 0)];
        let err = recognizer.recognize(&images).unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { ref message } if message.contains("image 1")));
        assert_eq!(predictor.calls(), 0);
    }

    #[test]
    fn test_wide_script_group_width() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor.clone())
            .rec_char_type(CharacterType::Ch)
            .rec_batch_num(2)
            .encoder(en_dict())
            .build()
            .unwrap();

        let images = vec![crop(64, 32, 1), crop(96, 32, 2), crop(320, 32, 3)];
        recognizer.recognize(&images).unwrap();

        let shapes = predictor.shapes.lock().unwrap();
        assert_eq!(shapes[0], vec![2, 3, 32, 96]);
        assert_eq!(shapes[1], vec![1, 3, 32, 320]);
    }

    #[test]
    fn test_allow_list_masks_scores() {
        let predictor = Arc::new(RecordingPredictor::default());
        // '1' is dictionary position 1 -> vocabulary index 2; index 0 always kept
        let recognizer = builder(predictor)
            .rec_whitelist("1")
            .rec_blacklist("2")
            .encoder(en_dict())
            .build()
            .unwrap();

        let output = recognizer.recognize(&[crop(32, 32, 50)]).unwrap();
        assert_eq!(output.results[0].confidence, 2.0);
        assert_eq!(output.results[0].text, "50");
    }

    #[test]
    fn test_attention_based_masks_first_output() {
        let predictor = Arc::new(RecordingPredictor::with_trailing_outputs(2));
        let recognizer = builder(predictor.clone())
            .rec_algorithm("RARE")
            .rec_whitelist("1")
            .encoder(en_dict())
            .build()
            .unwrap();
        assert_eq!(recognizer.algorithm(), RecAlgorithm::AttentionBased);

        let output = recognizer
            .recognize(&[crop(64, 32, 80), crop(32, 32, 15)])
            .unwrap();
        assert_eq!(output.results[0].text, "80");
        assert_eq!(output.results[1].text, "15");
        assert!(output.results.iter().all(|r| r.confidence == 2.0));

        let shapes = predictor.shapes.lock().unwrap();
        assert_eq!(shapes[0], vec![2, 3, 32, 100]);
        assert_eq!(*predictor.auxiliary_batches.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_deny_list_masks_scores() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor)
            .rec_blacklist("0")
            .encoder(en_dict())
            .build()
            .unwrap();

        let output = recognizer.recognize(&[crop(32, 32, 50)]).unwrap();
        assert_eq!(output.results[0].confidence, 4.0);
    }

    #[test]
    fn test_no_lists_leave_scores_untouched() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor).build().unwrap();
        let output = recognizer.recognize(&[crop(32, 32, 50)]).unwrap();
        assert_eq!(output.results[0].confidence, VOCAB as f32);
    }

    #[test]
    fn test_structure_aware_skips_mask_and_reads_fourth_output() {
        let predictor = Arc::new(RecordingPredictor::with_leading_outputs(3));
        let recognizer = TextRecognizer::builder()
            .rec_algorithm("SRN")
            .rec_image_shape(Geometry::new(1, 32, 96))
            .rec_batch_num(2)
            .rec_whitelist("1")
            .predictor(predictor.clone())
            .decoder(Arc::new(MarkerDecoder {
                raw: true,
                drop_last: false,
            }))
            .build()
            .unwrap();
        assert_eq!(recognizer.algorithm(), RecAlgorithm::StructureAware);

        let images = vec![crop(100, 32, 40), crop(30, 32, 70), crop(50, 32, 90)];
        let output = recognizer.recognize(&images).unwrap();

        let texts: Vec<_> = output.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["40", "70", "90"]);
        assert!(output.results.iter().all(|r| r.confidence == VOCAB as f32));

        let shapes = predictor.shapes.lock().unwrap();
        assert_eq!(shapes[0], vec![2, 1, 32, 96]);
        let aux = predictor.auxiliary_batches.lock().unwrap();
        assert_eq!(*aux, vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_missing_score_output_is_an_inference_error() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = TextRecognizer::builder()
            .rec_algorithm("SRN")
            .rec_image_shape(Geometry::new(1, 32, 96))
            .predictor(predictor)
            .decoder(decoder())
            .build()
            .unwrap();

        let err = recognizer.recognize(&[crop(32, 32, 1)]).unwrap_err();
        assert!(matches!(err, OCRError::Inference { .. }));
    }

    #[test]
    fn test_decoder_row_mismatch_is_an_inference_error() {
        let predictor = Arc::new(RecordingPredictor::default());
        let recognizer = builder(predictor)
            .decoder(Arc::new(MarkerDecoder {
                raw: false,
                drop_last: true,
            }))
            .build()
            .unwrap();

        let err = recognizer
            .recognize(&[crop(32, 32, 1), crop(40, 32, 2)])
            .unwrap_err();
        assert!(matches!(err, OCRError::Inference { ref model_name, .. } if model_name == "recording"));
    }

    #[test]
    fn test_builder_validation() {
        let predictor = Arc::new(RecordingPredictor::default());

        let err = builder(predictor.clone())
            .rec_algorithm("NRTR")
            .build()
            .unwrap_err();
        assert!(matches!(err, OCRError::UnsupportedAlgorithm { .. }));

        let err = builder(predictor.clone()).rec_batch_num(0).build().unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));

        let err = TextRecognizer::builder()
            .decoder(decoder())
            .build()
            .unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));

        // a deny-list with no encoder falls back to the configured dictionary
        let recognizer = builder(predictor).rec_blacklist("a").build().unwrap();
        assert!(recognizer.encoder.is_some());
    }
}
