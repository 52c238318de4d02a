//! Allow/deny-list masking of recognition scores.
//!
//! A mask zeroes the scores of disallowed vocabulary classes before
//! decoding, so they can never win the arg-max. Scores are not
//! renormalized.

use crate::core::traits::CharacterEncoder;
use crate::core::{OCRError, TensorD};
use ndarray::{ArrayView1, Axis};
use tracing::warn;

/// Boolean mask over the model vocabulary. `true` keeps a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMask {
    keep: Vec<bool>,
}

impl CharacterMask {
    /// Builds a mask for a vocabulary of `vocab_size` classes.
    ///
    /// A non-empty `allow` list wins: only its characters and the reserved
    /// class 0 are kept, and `deny` is ignored. Otherwise a non-empty `deny`
    /// list removes its characters. With both empty there is no mask.
    ///
    /// Encoded positions are shifted by one to skip the reserved class.
    /// Indices that fall outside the vocabulary are dropped.
    pub fn build(
        vocab_size: usize,
        allow: &str,
        deny: &str,
        encoder: &dyn CharacterEncoder,
    ) -> Option<Self> {
        if !allow.is_empty() {
            let mut keep = vec![false; vocab_size];
            if let Some(reserved) = keep.first_mut() {
                *reserved = true;
            }
            for index in Self::vocab_indices(vocab_size, allow, encoder) {
                keep[index] = true;
            }
            Some(Self { keep })
        } else if !deny.is_empty() {
            let mut keep = vec![true; vocab_size];
            for index in Self::vocab_indices(vocab_size, deny, encoder) {
                keep[index] = false;
            }
            Some(Self { keep })
        } else {
            None
        }
    }

    fn vocab_indices(
        vocab_size: usize,
        text: &str,
        encoder: &dyn CharacterEncoder,
    ) -> impl Iterator<Item = usize> {
        encoder
            .encode(text)
            .into_iter()
            .map(|position| position + 1)
            .filter(move |&index| {
                let in_range = index < vocab_size;
                if !in_range {
                    warn!(
                        index,
                        vocab_size, "character list maps outside the model vocabulary; ignored"
                    );
                }
                in_range
            })
    }

    pub fn vocab_size(&self) -> usize {
        self.keep.len()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.keep
    }

    pub fn is_kept(&self, index: usize) -> bool {
        self.keep.get(index).copied().unwrap_or(false)
    }

    /// Zeroes disallowed classes along the last axis of `scores`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the last axis does not match the vocabulary size.
    pub fn apply(&self, scores: &mut TensorD) -> Result<(), OCRError> {
        let Some(last) = scores.ndim().checked_sub(1) else {
            return Err(OCRError::invalid_input("cannot mask a 0-dimensional score tensor"));
        };
        let classes = scores.len_of(Axis(last));
        if classes != self.keep.len() {
            return Err(OCRError::invalid_input(format!(
                "score tensor has {} classes but the mask covers {}",
                classes,
                self.keep.len()
            )));
        }

        let weights: Vec<f32> = self.keep.iter().map(|&k| if k { 1.0 } else { 0.0 }).collect();
        let weights = ArrayView1::from(weights.as_slice());
        for mut lane in scores.lanes_mut(Axis(last)) {
            lane *= &weights;
        }
        Ok(())
    }
}
