pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod solver;

pub use models::{Digit, Quad, SudokuGrid, GridParseError};
pub use error::ExtractError;
pub use detection::{ExtractorConfig, SudokuExtractor, load_image};
pub use detection::ocr::{DigitRecognizer, OcrsRecognizer};
pub use detection::cells::BoundingBox;
pub use pipeline::{
    Pipeline, PipelineData, PipelineStep, PipelineContext,
    MetadataValue, DebugConfig
};
