#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types for tests
pub use sudoku_extract::{
    DigitRecognizer, ExtractError, ExtractorConfig, Pipeline, Quad, SudokuExtractor, SudokuGrid,
};
