//! Trait definitions for the recognition pipeline.
//!
//! The batch scheduler only talks to its collaborators through these traits:
//! a [`Predictor`] that runs the model on a normalized batch, a [`Decoder`]
//! that turns the score tensor into text, and a [`CharacterEncoder`] that maps
//! allow/deny-list characters onto vocabulary indices.

pub mod recognition;

pub use recognition::{CharacterEncoder, Decoder, Predictor, RecognitionInputs};
