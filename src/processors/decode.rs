//! Greedy label decoders for recognition models.
//!
//! This module turns score tensors into text with confidence scores. Three
//! label layouts are supported: CTC (blank at index 0), attention (start
//! token first, end token last) and SRN (start and end tokens appended after
//! the dictionary, fixed decode length). All three pick the arg-max class at
//! every step.

use crate::core::traits::Decoder;
use crate::core::{OCRError, ProcessingStage, TensorD};
use ndarray::{ArrayView2, Axis, Ix3};

const START_TOKEN: &str = "sos";
const END_TOKEN: &str = "eos";

/// Maps class indices onto dictionary entries and assembles text.
#[derive(Debug, Clone)]
pub struct BaseRecLabelDecode {
    character: Vec<String>,
}

impl BaseRecLabelDecode {
    pub fn new(character: Vec<String>) -> Self {
        Self { character }
    }

    /// Number of classes, including special tokens.
    pub fn character_count(&self) -> usize {
        self.character.len()
    }

    /// Decodes one index sequence.
    ///
    /// `ignored` indices are skipped, decoding stops at `end`, and with
    /// `remove_duplicate` consecutive repeats collapse to one. The confidence
    /// is the mean probability of the kept steps, or 0 when nothing is kept.
    pub fn decode(
        &self,
        indices: &[usize],
        probs: &[f32],
        remove_duplicate: bool,
        ignored: &[usize],
        end: Option<usize>,
    ) -> (String, f32) {
        let mut text = String::new();
        let mut conf_sum = 0.0f32;
        let mut kept = 0usize;

        for (step, (&idx, &prob)) in indices.iter().zip(probs).enumerate() {
            if end == Some(idx) {
                break;
            }
            if remove_duplicate && step > 0 && indices[step - 1] == idx {
                continue;
            }
            if ignored.contains(&idx) {
                continue;
            }
            if let Some(ch) = self.character.get(idx) {
                text.push_str(ch);
                conf_sum += prob;
                kept += 1;
            }
        }

        let conf = if kept == 0 { 0.0 } else { conf_sum / kept as f32 };
        (text, conf)
    }
}

/// Arg-max class and its score at every step of a (T, V) score matrix.
///
/// Ties resolve to the lowest index.
fn greedy_path(scores: ArrayView2<f32>) -> (Vec<usize>, Vec<f32>) {
    scores
        .outer_iter()
        .map(|row| {
            let mut best: Option<(usize, f32)> = None;
            for (idx, &prob) in row.iter().enumerate() {
                if best.is_none_or(|(_, top)| prob > top) {
                    best = Some((idx, prob));
                }
            }
            best.unwrap_or((0, 0.0))
        })
        .unzip()
}

fn as_batch_sequence<'a>(
    scores: &'a TensorD,
    batch_size: usize,
    decoder: &str,
) -> Result<ndarray::ArrayView3<'a, f32>, OCRError> {
    let view = scores.view().into_dimensionality::<Ix3>().map_err(|_| {
        OCRError::invalid_input(format!(
            "{} decoder expects a (batch, steps, classes) tensor, got shape {:?}",
            decoder,
            scores.shape()
        ))
    })?;
    if view.len_of(Axis(0)) != batch_size {
        tracing::warn!(
            rows = view.len_of(Axis(0)),
            batch_size,
            "{} decoder received a score tensor whose batch axis differs from the group size",
            decoder
        );
    }
    Ok(view)
}

/// A decoder for CTC (Connectionist Temporal Classification) recognition models.
#[derive(Debug, Clone)]
pub struct CTCLabelDecode {
    base: BaseRecLabelDecode,
    blank_index: usize,
}

impl CTCLabelDecode {
    /// Creates a CTC decoder for a dictionary; the blank class is prepended.
    pub fn new(dictionary: &[String]) -> Self {
        let mut character = Vec::with_capacity(dictionary.len() + 1);
        // Use null char for blank to distinguish from actual space
        character.push("\0".to_string());
        character.extend_from_slice(dictionary);
        Self {
            base: BaseRecLabelDecode::new(character),
            blank_index: 0,
        }
    }

    pub fn character_count(&self) -> usize {
        self.base.character_count()
    }

    /// Decodes a (B, T, V) tensor.
    pub fn apply(&self, pred: ndarray::ArrayView3<f32>) -> Vec<(String, f32)> {
        let results: Vec<(String, f32)> = pred
            .outer_iter()
            .map(|seq| {
                let (indices, probs) = greedy_path(seq);
                self.base
                    .decode(&indices, &probs, true, &[self.blank_index], None)
            })
            .collect();

        let with_text = results.iter().filter(|(t, _)| !t.is_empty()).count();
        tracing::debug!(
            "CTC decode summary: batch_size={}, batches_with_text={}, empty_batches={}",
            results.len(),
            with_text,
            results.len() - with_text
        );

        results
    }
}

impl Decoder for CTCLabelDecode {
    fn decode(&self, scores: &TensorD, batch_size: usize) -> Result<Vec<(String, f32)>, OCRError> {
        Ok(self.apply(as_batch_sequence(scores, batch_size, "CTC")?))
    }
}

/// A decoder for attention recognizers with a start token at index 0 and an
/// end token at the last index.
#[derive(Debug, Clone)]
pub struct AttnLabelDecode {
    base: BaseRecLabelDecode,
}

impl AttnLabelDecode {
    pub fn new(dictionary: &[String]) -> Self {
        let mut character = Vec::with_capacity(dictionary.len() + 2);
        character.push(START_TOKEN.to_string());
        character.extend_from_slice(dictionary);
        character.push(END_TOKEN.to_string());
        Self {
            base: BaseRecLabelDecode::new(character),
        }
    }

    pub fn character_count(&self) -> usize {
        self.base.character_count()
    }

    fn end_index(&self) -> usize {
        self.base.character_count() - 1
    }

    /// Decodes a (B, T, V) tensor.
    pub fn apply(&self, pred: ndarray::ArrayView3<f32>) -> Vec<(String, f32)> {
        pred.outer_iter()
            .map(|seq| {
                let (indices, probs) = greedy_path(seq);
                self.base
                    .decode(&indices, &probs, false, &[0], Some(self.end_index()))
            })
            .collect()
    }
}

impl Decoder for AttnLabelDecode {
    fn decode(&self, scores: &TensorD, batch_size: usize) -> Result<Vec<(String, f32)>, OCRError> {
        Ok(self.apply(as_batch_sequence(scores, batch_size, "attention")?))
    }
}

/// A decoder for SRN models, whose prediction output is a flat
/// (B * max_text_length, V) matrix. Start and end tokens follow the dictionary.
#[derive(Debug, Clone)]
pub struct SRNLabelDecode {
    base: BaseRecLabelDecode,
    max_text_length: usize,
}

impl SRNLabelDecode {
    pub fn new(dictionary: &[String], max_text_length: usize) -> Self {
        let mut character = Vec::with_capacity(dictionary.len() + 2);
        character.extend_from_slice(dictionary);
        character.push(START_TOKEN.to_string());
        character.push(END_TOKEN.to_string());
        Self {
            base: BaseRecLabelDecode::new(character),
            max_text_length,
        }
    }

    pub fn character_count(&self) -> usize {
        self.base.character_count()
    }
}

impl Decoder for SRNLabelDecode {
    fn decode(&self, scores: &TensorD, batch_size: usize) -> Result<Vec<(String, f32)>, OCRError> {
        let classes = self.base.character_count();
        let steps = self.max_text_length;
        if scores.len() != batch_size * steps * classes {
            return Err(OCRError::invalid_input(format!(
                "SRN decoder expects {} x {} x {} scores, got shape {:?}",
                batch_size,
                steps,
                classes,
                scores.shape()
            )));
        }

        let flat = scores.as_standard_layout();
        let pred = flat
            .view()
            .into_shape_with_order((batch_size, steps, classes))
            .map_err(|e| {
                OCRError::processing_error(ProcessingStage::PostProcessing, "reshaping SRN scores", e)
            })?;

        let start = classes - 2;
        let end = classes - 1;
        Ok(pred
            .outer_iter()
            .map(|seq| {
                let (indices, probs) = greedy_path(seq);
                self.base.decode(&indices, &probs, false, &[start], Some(end))
            })
            .collect())
    }
}
