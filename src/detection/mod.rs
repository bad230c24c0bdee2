pub mod preprocessing;
pub mod contours;
pub mod quad;
pub mod warp;
pub mod cells;
pub mod ocr;
pub mod steps;

use anyhow::Result;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::ExtractError;
use crate::models::{Digit, Quad, SudokuGrid};
use crate::pipeline::{Pipeline, PipelineData, PipelineStep};
use ocr::{DigitRecognizer, OcrsRecognizer};
use steps::*;

/// Tunable thresholds of the extraction pipeline.
///
/// The defaults are calibrated for a 450px rectified grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Gaussian kernel width (odd)
    pub blur_kernel: u32,
    /// Neighbourhood width of the adaptive threshold (odd)
    pub threshold_block_size: u32,
    /// How far below the local mean a pixel must be to count as ink
    pub threshold_offset: i32,
    /// Smallest area (px²) a contour must exceed to be the grid
    pub min_grid_area: f64,
    /// Polygon tolerance as a fraction of the grid contour's perimeter
    pub polygon_epsilon_ratio: f64,
    /// Side of the rectified square
    pub warp_size: u32,
    pub cells_per_side: u32,
    /// Fraction of the cell trimmed from each side to hide grid lines
    pub cell_margin_ratio: f32,
    /// Cells with this many ink pixels or fewer are empty
    pub min_ink_pixels: u32,
    /// Characters the recognizer may return
    pub allowed_digits: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 11,
            threshold_block_size: 15,
            threshold_offset: 5,
            min_grid_area: 50.0,
            polygon_epsilon_ratio: 0.01,
            warp_size: 450,
            cells_per_side: SudokuGrid::SIZE as u32,
            cell_margin_ratio: 0.15,
            min_ink_pixels: 50,
            allowed_digits: ocr::SUDOKU_DIGITS.to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Reject settings that would leave the pipeline without cells to read
    pub fn validate(&self) -> Result<(), ExtractError> {
        let invalid = |msg: String| Err(ExtractError::InvalidConfig(msg));

        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return invalid(format!(
                "threshold_block_size must be odd and at least 3, got {}",
                self.threshold_block_size
            ));
        }
        if !self.min_grid_area.is_finite() || self.min_grid_area < 0.0 {
            return invalid(format!("min_grid_area must be non-negative, got {}", self.min_grid_area));
        }
        if !self.polygon_epsilon_ratio.is_finite() || self.polygon_epsilon_ratio <= 0.0 {
            return invalid(format!(
                "polygon_epsilon_ratio must be positive, got {}",
                self.polygon_epsilon_ratio
            ));
        }
        if self.cells_per_side == 0 {
            return invalid("cells_per_side must be at least 1".to_string());
        }
        if !(0.0..0.5).contains(&self.cell_margin_ratio) {
            return invalid(format!(
                "cell_margin_ratio must be in [0, 0.5), got {}",
                self.cell_margin_ratio
            ));
        }

        let cell = cells::cell_size(self.warp_size, self.cells_per_side);
        let tile = cells::BoundingBox { x: 0, y: 0, width: cell, height: cell };
        let window = cells::digit_window(&tile, self.cell_margin_ratio);
        if window.width == 0 || window.height == 0 {
            return invalid(format!(
                "warp_size {} leaves no digit window for {} cells per side",
                self.warp_size, self.cells_per_side
            ));
        }

        Ok(())
    }
}

/// Read an image file, guessing the format from its contents
pub fn load_image(path: &Path) -> Result<DynamicImage, ExtractError> {
    let load_error = |source| ExtractError::ImageLoad { path: path.to_path_buf(), source };

    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| load_error(image::ImageError::IoError(e)))?
        .decode()
        .map_err(load_error)
}

/// Photo in, 9x9 grid out
pub struct SudokuExtractor {
    pub config: ExtractorConfig,
    recognizer: Arc<dyn DigitRecognizer>,
    debug_dir: Option<PathBuf>,
}

impl SudokuExtractor {
    /// Extractor using the `ocrs` models from their default location
    pub fn new(config: ExtractorConfig) -> Self {
        let recognizer = Arc::new(OcrsRecognizer::new(config.allowed_digits.clone()));
        Self {
            config,
            recognizer,
            debug_dir: None,
        }
    }

    /// Replace the character recognizer
    pub fn with_recognizer(mut self, recognizer: Arc<dyn DigitRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    /// Dump every step's images into `dir` (must be empty or absent)
    pub fn with_debug(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    fn binarize_steps(&self) -> Vec<Arc<dyn PipelineStep>> {
        vec![
            Arc::new(GrayscaleStep),
            Arc::new(BlurStep { kernel_size: self.config.blur_kernel }),
            Arc::new(AdaptiveThresholdStep {
                block_size: self.config.threshold_block_size,
                offset: self.config.threshold_offset,
            }),
        ]
    }

    /// Binarize the photo and find the grid corners
    pub fn localization_steps(&self) -> Vec<Arc<dyn PipelineStep>> {
        let mut steps = self.binarize_steps();
        steps.push(Arc::new(GridLocationStep {
            min_area: self.config.min_grid_area,
            epsilon_ratio: self.config.polygon_epsilon_ratio,
        }));
        steps
    }

    pub fn normalization_steps(&self) -> Vec<Arc<dyn PipelineStep>> {
        vec![Arc::new(PerspectiveWarpStep { size: self.config.warp_size })]
    }

    /// Re-binarize the rectified grid, cut it into cells and read them
    pub fn recognition_steps(&self) -> Vec<Arc<dyn PipelineStep>> {
        let mut steps = self.binarize_steps();
        steps.push(Arc::new(CellSplitStep {
            cells_per_side: self.config.cells_per_side,
            margin_ratio: self.config.cell_margin_ratio,
        }));
        steps.push(Arc::new(InkFilterStep { min_ink_pixels: self.config.min_ink_pixels }));
        steps.push(Arc::new(DigitRecognitionStep::new(self.recognizer.clone())));
        steps
    }

    fn pipeline(&self, steps: Vec<Arc<dyn PipelineStep>>) -> Result<Pipeline> {
        self.config.validate()?;
        let pipeline = Pipeline::new().add_steps(steps);
        match &self.debug_dir {
            Some(dir) => pipeline.with_debug(dir.clone()),
            None => Ok(pipeline),
        }
    }

    /// Run the whole pipeline on a loaded photo
    pub fn extract(&self, image: &DynamicImage) -> Result<SudokuGrid> {
        info!(width = image.width(), height = image.height(), "extracting grid");

        let mut steps = self.localization_steps();
        steps.extend(self.normalization_steps());
        steps.extend(self.recognition_steps());

        let cells = self.pipeline(steps)?.run(image.clone())?;
        let grid = assemble_grid(&cells);

        info!(filled = grid.filled(), "grid extracted");
        Ok(grid)
    }

    /// Load `path` and extract its grid
    pub fn extract_file(&self, path: &Path) -> Result<SudokuGrid> {
        let image = load_image(path)?;
        self.extract(&image)
    }

    /// Corners of the puzzle border in `image`
    pub fn locate_grid(&self, image: &DynamicImage) -> Result<Quad> {
        let located = self.pipeline(self.localization_steps())?.run(image.clone())?;
        located
            .first()
            .and_then(|item| item.get_quad(GRID_CORNERS))
            .ok_or_else(|| ExtractError::GridNotFound.into())
    }

    /// Head-on square view of the grid bounded by `corners`
    pub fn normalize(&self, image: &DynamicImage, corners: &Quad) -> Result<DynamicImage> {
        self.config.validate()?;
        Ok(warp::warp_to_square(image, corners, self.config.warp_size)?)
    }

    /// Read the cells of an already rectified grid image
    pub fn read_cells(&self, normalized: &DynamicImage) -> Result<SudokuGrid> {
        let cells = self.pipeline(self.recognition_steps())?.run(normalized.clone())?;
        Ok(assemble_grid(&cells))
    }
}

impl Default for SudokuExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Fold recognized cell items into a grid; cells without a digit stay 0
pub fn assemble_grid(cells: &[PipelineData]) -> SudokuGrid {
    let mut grid = SudokuGrid::empty();

    for cell in cells {
        let (Some(row), Some(col), Some(value)) =
            (cell.get_int(CELL_ROW), cell.get_int(CELL_COL), cell.get_int(DIGIT))
        else {
            continue;
        };

        let size = SudokuGrid::SIZE as i32;
        if (0..size).contains(&row) && (0..size).contains(&col) {
            grid.set(row as usize, col as usize, Digit::from_value(value.clamp(0, 9) as u8));
        }
    }

    grid
}
