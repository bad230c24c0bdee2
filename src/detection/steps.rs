use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::detection::{cells, contours, ocr, preprocessing, quad, warp};
use crate::error::ExtractError;
use crate::models::Digit;
use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Metadata key for the located grid corners
pub const GRID_CORNERS: &str = "grid_corners";
pub const GRID_AREA: &str = "grid_area";
pub const CELL_ROW: &str = "row";
pub const CELL_COL: &str = "col";
pub const INK_PIXELS: &str = "ink_pixels";
pub const OCR_TEXT: &str = "ocr_text";
pub const DIGIT: &str = "digit";

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Gaussian blur with a square kernel
pub struct BlurStep {
    pub kernel_size: u32,
}

impl PipelineStep for BlurStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let blurred = preprocessing::apply_blur(&item.image.to_luma8(), self.kernel_size);
                item.with_image(DynamicImage::ImageLuma8(blurred))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Inverted adaptive mean threshold: ink becomes white foreground
pub struct AdaptiveThresholdStep {
    pub block_size: u32,
    pub offset: i32,
}

impl PipelineStep for AdaptiveThresholdStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let mask = preprocessing::adaptive_threshold_inv(
                    &item.image.to_luma8(),
                    self.block_size,
                    self.offset,
                );
                item.with_image(DynamicImage::ImageLuma8(mask))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Adaptive Threshold"
    }
}

/// Find the puzzle border: the largest contour, simplified to four corners
pub struct GridLocationStep {
    /// Contours must enclose strictly more than this many square pixels
    pub min_area: f64,
    /// Polygon tolerance as a fraction of the contour perimeter
    pub epsilon_ratio: f64,
}

impl PipelineStep for GridLocationStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let mask = item.image.to_luma8();
            let (contour, area) = contours::find_largest_contour(&mask, self.min_area)
                .ok_or(ExtractError::GridNotFound)?;
            debug!(area, points = contour.len(), "largest contour");

            let corners = quad::approximate_quad(&contour, self.epsilon_ratio)?;
            info!(
                top_left = ?corners.top_left,
                top_right = ?corners.top_right,
                bottom_right = ?corners.bottom_right,
                bottom_left = ?corners.bottom_left,
                "grid located"
            );

            result.push(
                item.with_metadata(GRID_CORNERS, MetadataValue::Quad(corners))
                    .with_metadata(GRID_AREA, MetadataValue::Float(area as f32)),
            );
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Grid Location"
    }
}

/// Warp the original image so the located grid fills a square
pub struct PerspectiveWarpStep {
    pub size: u32,
}

impl PipelineStep for PerspectiveWarpStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let corners = item.get_quad(GRID_CORNERS)
                .ok_or_else(|| anyhow::anyhow!("Missing {}", GRID_CORNERS))?;

            let warped = warp::warp_to_square(&item.original, &corners, self.size)?;

            // The rectified grid is the reference image from here on
            let mut new_item = PipelineData::from_image(warped);
            new_item.metadata = item.metadata;
            result.push(new_item);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Perspective Warp"
    }
}

/// Split a square mask into cells - one item per digit window
pub struct CellSplitStep {
    pub cells_per_side: u32,
    /// Fraction of the cell size trimmed from each side
    pub margin_ratio: f32,
}

impl PipelineStep for CellSplitStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let mask = item.image.to_luma8();
            let side = mask.width().min(mask.height());

            for tile in cells::tiles(side, self.cells_per_side) {
                let window = cells::digit_window(&tile.bounds, self.margin_ratio);
                let cropped = image::imageops::crop_imm(
                    &mask,
                    window.x,
                    window.y,
                    window.width,
                    window.height,
                ).to_image();

                let cell = item
                    .with_image(DynamicImage::ImageLuma8(cropped))
                    .with_metadata(CELL_ROW, MetadataValue::Int(tile.row as i32))
                    .with_metadata(CELL_COL, MetadataValue::Int(tile.col as i32));

                result.push(cell);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Cell Split"
    }
}

/// Keep only cells with more than `min_ink_pixels` foreground pixels
pub struct InkFilterStep {
    pub min_ink_pixels: u32,
}

impl PipelineStep for InkFilterStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let ink = preprocessing::count_nonzero(&item.image.to_luma8());
            if ink > self.min_ink_pixels {
                result.push(item.with_metadata(INK_PIXELS, MetadataValue::Int(ink as i32)));
            }
        }

        debug!(cells = result.len(), "cells with ink");
        Ok(result)
    }

    fn name(&self) -> &str {
        "Ink Filter"
    }
}

/// Read the digit in each remaining cell.
/// Cells whose text is not a digit 1-9 are dropped and stay empty in the grid.
pub struct DigitRecognitionStep {
    pub recognizer: Arc<dyn ocr::DigitRecognizer>,
}

impl DigitRecognitionStep {
    pub fn new(recognizer: Arc<dyn ocr::DigitRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl PipelineStep for DigitRecognitionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        if data.is_empty() {
            return Ok(data);
        }
        self.recognizer.prepare()?;

        let mut result = Vec::new();

        for item in data {
            let row = item.get_int(CELL_ROW).unwrap_or(-1);
            let col = item.get_int(CELL_COL).unwrap_or(-1);

            let text = match self.recognizer.recognize(&item.image.to_luma8()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(row, col, error = %e, "recognition failed, leaving cell empty");
                    continue;
                }
            };

            match ocr::parse_digit(&text) {
                Digit::Value(value) => {
                    debug!(row, col, value, "digit recognized");
                    result.push(
                        item.with_metadata(OCR_TEXT, MetadataValue::String(text))
                            .with_metadata(DIGIT, MetadataValue::Int(value as i32)),
                    );
                }
                Digit::Empty => {
                    debug!(row, col, text = %text, "no digit in recognizer output");
                }
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Digit Recognition"
    }
}
