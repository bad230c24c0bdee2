use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop grid extraction.
///
/// Pipeline steps return `anyhow::Result`; these travel inside it and can be
/// recovered with `err.downcast_ref::<ExtractError>()`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Could not load image {}", path.display())]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("No Sudoku grid found")]
    GridNotFound,

    /// The largest contour did not simplify to four corners.
    #[error("Grid boundary is not a quadrilateral (approximated to {vertices} vertices)")]
    NotQuadrilateral { vertices: usize },

    #[error("Grid corners are degenerate, no perspective transform exists")]
    DegenerateQuadrilateral,

    #[error("Invalid extractor configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
         Expected locations:\n  - {}\n  - {}",
        detection.display(),
        recognition.display()
    )]
    OcrModelsMissing {
        detection: PathBuf,
        recognition: PathBuf,
    },
}
