use anyhow::Result;
use image::{DynamicImage, GrayImage, Luma};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::ExtractError;
use crate::models::Digit;

/// Digits a Sudoku cell can hold. 0 is left out on purpose.
pub const SUDOKU_DIGITS: &str = "123456789";

/// Environment variable that overrides where the OCR models are read from
pub const MODEL_DIR_ENV: &str = "OCRS_MODEL_DIR";

/// Reads one character from a digit window.
pub trait DigitRecognizer: Send + Sync {
    /// Acquire whatever the recognizer needs before the first cell.
    /// Failures here abort extraction, unlike failures on a single cell.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// `window` is a binary mask with ink as non-zero pixels.
    /// Returns the engine's best guess, possibly empty.
    fn recognize(&self, window: &GrayImage) -> Result<String>;
}

/// Map recognizer output to a cell value.
/// Only a lone integer in 1..=9 counts; everything else reads as empty.
pub fn parse_digit(text: &str) -> Digit {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Digit::Empty;
    }
    match text.parse::<u8>() {
        Ok(value) => Digit::from_value(value),
        Err(_) => Digit::Empty,
    }
}

/// Model directory from `OCRS_MODEL_DIR`, else the `ocrs-cli` cache
pub fn default_model_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot locate OCR models: neither {} nor HOME is set", MODEL_DIR_ENV))?;

    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Load the detection and recognition models and build an engine restricted
/// to `allowed_chars`
pub fn init_ocr_engine(model_dir: &Path, allowed_chars: &str) -> Result<OcrEngine> {
    let detection_model_path = model_dir.join("text-detection.rten");
    let recognition_model_path = model_dir.join("text-recognition.rten");

    if !detection_model_path.exists() || !recognition_model_path.exists() {
        return Err(ExtractError::OcrModelsMissing {
            detection: detection_model_path,
            recognition: recognition_model_path,
        }
        .into());
    }

    let detection_model = Model::load_file(&detection_model_path)?;
    let recognition_model = Model::load_file(&recognition_model_path)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        allowed_chars: Some(allowed_chars.to_string()),
        ..Default::default()
    })?;

    Ok(engine)
}

/// Turn a digit mask into a single dark glyph on white, cropped to the ink
/// with a small border and scaled to fit a `target_size` square canvas
pub fn prepare_glyph(window: &GrayImage, target_size: u32) -> GrayImage {
    let (width, height) = window.dimensions();

    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut has_content = false;

    for (x, y, pixel) in window.enumerate_pixels() {
        if pixel[0] != 0 {
            has_content = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !has_content {
        return GrayImage::from_pixel(target_size, target_size, Luma([255u8]));
    }

    // Ink goes black, background white, with a uniform border around the glyph
    let border = 5u32;
    let glyph_w = max_x - min_x + 1;
    let glyph_h = max_y - min_y + 1;
    let mut glyph = GrayImage::from_pixel(glyph_w + 2 * border, glyph_h + 2 * border, Luma([255u8]));
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if window.get_pixel(x, y)[0] != 0 {
                glyph.put_pixel(x - min_x + border, y - min_y + border, Luma([0u8]));
            }
        }
    }

    // Scale to fit the canvas while keeping the aspect ratio
    let (glyph_w, glyph_h) = glyph.dimensions();
    let scale = (target_size as f32 / glyph_w as f32).min(target_size as f32 / glyph_h as f32);
    let scaled_w = ((glyph_w as f32 * scale) as u32).clamp(1, target_size);
    let scaled_h = ((glyph_h as f32 * scale) as u32).clamp(1, target_size);
    let scaled = image::imageops::resize(&glyph, scaled_w, scaled_h, image::imageops::FilterType::CatmullRom);

    let mut canvas = GrayImage::from_pixel(target_size, target_size, Luma([255u8]));
    let offset_x = (target_size - scaled_w) / 2;
    let offset_y = (target_size - scaled_h) / 2;
    image::imageops::overlay(&mut canvas, &scaled, offset_x.into(), offset_y.into());

    canvas
}

/// Single-character recognition backed by `ocrs`.
///
/// The engine is loaded on first use, so grids without any inked cell never
/// touch the model files.
pub struct OcrsRecognizer {
    model_dir: Option<PathBuf>,
    allowed_chars: String,
    glyph_size: u32,
    engine: Mutex<Option<Arc<OcrEngine>>>,
}

impl OcrsRecognizer {
    /// Models from `default_model_dir()`, resolved when first needed
    pub fn new(allowed_chars: impl Into<String>) -> Self {
        Self {
            model_dir: None,
            allowed_chars: allowed_chars.into(),
            glyph_size: 100,
            engine: Mutex::new(None),
        }
    }

    pub fn with_model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    fn engine(&self) -> Result<Arc<OcrEngine>> {
        let mut engine_guard = self.engine
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR engine lock poisoned"))?;

        if let Some(engine) = engine_guard.as_ref() {
            return Ok(engine.clone());
        }

        let model_dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => default_model_dir()?,
        };
        debug!(dir = %model_dir.display(), "initializing OCR engine");
        let engine = Arc::new(init_ocr_engine(&model_dir, &self.allowed_chars)?);
        *engine_guard = Some(engine.clone());

        Ok(engine)
    }
}

impl Default for OcrsRecognizer {
    fn default() -> Self {
        Self::new(SUDOKU_DIGITS)
    }
}

impl DigitRecognizer for OcrsRecognizer {
    fn prepare(&self) -> Result<()> {
        self.engine().map(|_| ())
    }

    fn recognize(&self, window: &GrayImage) -> Result<String> {
        let engine = self.engine()?;

        let glyph = prepare_glyph(window, self.glyph_size);
        let img = DynamicImage::ImageLuma8(glyph).to_rgb8();

        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| anyhow::anyhow!("Invalid OCR input image: {:?}", e))?;
        let ocr_input = engine.prepare_input(img_source)?;
        let text = engine.get_text(&ocr_input)?;

        Ok(text.trim().to_string())
    }
}
