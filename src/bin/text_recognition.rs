//! Text Recognition
//!
//! Recognizes text in cropped text-line images with an ONNX recognition model
//! and logs one line per image plus the total predict time.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin text_recognition -- [OPTIONS] --model-path <MODEL> <IMAGE_DIR_OR_FILE>
//! ```
//!
//! # Example
//!
//! ```bash
//! cargo run --bin text_recognition -- -m rec.onnx -d ppocr_keys.txt --device cuda crops/
//! cargo run --bin text_recognition -- -m srn.onnx --rec-algorithm SRN --rec-image-shape "1, 64, 256" --rec-char-type en crops/
//! ```

use clap::Parser;
use oar_textrec::core::config::{
    CharacterType, Geometry, OrtExecutionProvider, OrtSessionConfig, RecognizerConfig,
};
use oar_textrec::predictor::TextRecognizer;
use oar_textrec::utils::{get_image_file_list, init_tracing, load_images_batch_with_threshold};
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for text recognition
#[derive(Parser)]
#[command(name = "text_recognition")]
#[command(about = "Recognizes text in cropped text-line images")]
struct Args {
    /// Image file or directory of images
    image_dir: PathBuf,

    /// Path to the text recognition model file
    #[arg(short, long)]
    model_path: PathBuf,

    /// JSON recognizer configuration; replaces the recognition flags below
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
    #[arg(long, default_value = "cpu")]
    device: String,

    /// Recognition algorithm (CRNN, Rosetta, STARNet, RARE, SRN)
    #[arg(long, default_value = "CRNN")]
    rec_algorithm: String,

    /// Model input geometry as "channels, height, width"
    #[arg(long, default_value = "3, 32, 320")]
    rec_image_shape: Geometry,

    /// Character type: ch (dictionary file, grouped width) or en (built-in set)
    #[arg(long, default_value = "ch")]
    rec_char_type: CharacterType,

    /// Number of images per predictor call
    #[arg(long, default_value_t = 6)]
    rec_batch_num: usize,

    /// Path to the character dictionary file
    #[arg(short = 'd', long)]
    rec_char_dict_path: Option<PathBuf>,

    /// Append a space to the dictionary
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    use_space_char: bool,

    /// Maximum decoded sequence length
    #[arg(long, default_value_t = 25)]
    max_text_length: usize,

    /// Only these characters may be recognized
    #[arg(long, default_value = "")]
    rec_whitelist: String,

    /// These characters are never recognized
    #[arg(long, default_value = "")]
    rec_blacklist: String,
}

impl Args {
    fn recognizer_config(&self) -> Result<RecognizerConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => RecognizerConfig::from_json_file(path)?,
            None => RecognizerConfig {
                rec_algorithm: self.rec_algorithm.clone(),
                rec_image_shape: self.rec_image_shape,
                rec_char_type: self.rec_char_type,
                rec_batch_num: self.rec_batch_num,
                max_text_length: self.max_text_length,
                rec_whitelist: self.rec_whitelist.clone(),
                rec_blacklist: self.rec_blacklist.clone(),
                rec_char_dict_path: self.rec_char_dict_path.clone(),
                use_space_char: self.use_space_char,
                ..RecognizerConfig::default()
            },
        };

        if config.ort_session.is_none() {
            let providers = OrtExecutionProvider::from_device(&self.device)?;
            info!("Using device: {} with providers: {:?}", self.device, providers);
            config.ort_session = Some(OrtSessionConfig::new().with_execution_providers(providers));
        }
        Ok(config)
    }
}

fn log_error_chain(err: &dyn Error) {
    error!("{}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        error!("  caused by: {}", cause);
        source = cause.source();
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = args.recognizer_config()?;
    let recognizer = TextRecognizer::from_onnx(config, &args.model_path)?;

    let image_files = get_image_file_list(&args.image_dir)?;
    info!("Processing {} images...", image_files.len());

    let mut images = Vec::with_capacity(image_files.len());
    let mut image_paths = Vec::with_capacity(image_files.len());
    for (path, loaded) in image_files
        .iter()
        .zip(load_images_batch_with_threshold(&image_files, None))
    {
        match loaded {
            Ok(img) => {
                images.push(img);
                image_paths.push(path.as_path());
            }
            Err(e) => error!("Failed to load image {}: {}", path.display(), e),
        }
    }

    if images.is_empty() {
        return Err("no images could be loaded".into());
    }

    let output = recognizer.recognize(&images).inspect_err(|_| {
        error!(
            "Recognition failed. If the model was exported with a fixed input shape, \
             make sure --rec-image-shape and --rec-char-type match it (use 'en' to keep the \
             configured width)."
        );
    })?;

    for (path, result) in image_paths.iter().zip(&output.results) {
        info!(
            "Predicts of {}: ('{}', {:.4})",
            path.display(),
            result.text,
            result.confidence
        );
    }
    info!(
        "Total predict time for {} images, cost: {:.3}s",
        images.len(),
        output.elapsed.as_secs_f64()
    );
    Ok(())
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log_error_chain(e.as_ref());
        std::process::exit(1);
    }
}
