//! Text-line recognizer.
//!
//! [`TextRecognizer`] drives a recognition model over many crops: it groups
//! them by aspect ratio, normalizes each group, calls the predictor, masks
//! and decodes the scores, and returns results in input order.

pub mod text_recognizer;

pub use text_recognizer::{
    RecognitionOutput, RecognitionResult, TextRecognizer, TextRecognizerBuilder,
};
