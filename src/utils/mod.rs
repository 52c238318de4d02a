//! Utility functions for the recognition pipeline.
//!
//! This module provides image loading and discovery, character dictionary
//! handling, and logging setup.

pub mod dict;
pub mod image;

pub use self::dict::{CharacterDict, read_character_dict};
pub use self::image::{
    dynamic_to_rgb, get_image_file_list, has_image_extension, load_image,
    load_images_batch_with_threshold,
};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
