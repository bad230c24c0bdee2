use imageproc::point::Point;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Four grid corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: Point<f32>,
    pub top_right: Point<f32>,
    pub bottom_right: Point<f32>,
    pub bottom_left: Point<f32>,
}

impl Quad {
    /// Corners as `(x, y)` pairs, clockwise from top-left
    pub fn control_points(&self) -> [(f32, f32); 4] {
        [
            (self.top_left.x, self.top_left.y),
            (self.top_right.x, self.top_right.y),
            (self.bottom_right.x, self.bottom_right.y),
            (self.bottom_left.x, self.bottom_left.y),
        ]
    }

    pub fn corners(&self) -> [Point<f32>; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// False when one point was picked for two corners
    pub fn has_distinct_corners(&self) -> bool {
        let corners = self.corners();
        (0..4).all(|i| (i + 1..4).all(|j| corners[i] != corners[j]))
    }
}

/// What a single cell holds after recognition.
///
/// Uncertain or failed recognition is `Empty`, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Digit {
    #[default]
    Empty,
    Value(u8),
}

impl Digit {
    /// `Value` for 1..=9, `Empty` for everything else
    pub fn from_value(value: u8) -> Self {
        if (1..=9).contains(&value) {
            Digit::Value(value)
        } else {
            Digit::Empty
        }
    }

    /// Grid encoding: 0 for empty
    pub fn value(self) -> u8 {
        match self {
            Digit::Empty => 0,
            Digit::Value(v) => v,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Digit::Empty
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridParseError {
    #[error("expected 81 cells, found only {0}")]
    WrongCellCount(usize),

    #[error("invalid cell value '{0}' (expected an integer 0-9)")]
    InvalidCell(String),
}

/// A 9x9 Sudoku grid; 0 marks a cell without a digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SudokuGrid {
    cells: [[u8; 9]; 9],
}

impl SudokuGrid {
    pub const SIZE: usize = 9;

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a grid from rows, clearing anything outside 0..=9
    pub fn from_rows(rows: [[u8; 9]; 9]) -> Self {
        let mut grid = Self::empty();
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                grid.set(r, c, Digit::from_value(value));
            }
        }
        grid
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    pub fn digit(&self, row: usize, col: usize) -> Digit {
        Digit::from_value(self.cells[row][col])
    }

    pub fn set(&mut self, row: usize, col: usize, digit: Digit) {
        self.cells[row][col] = digit.value();
    }

    pub fn rows(&self) -> &[[u8; 9]; 9] {
        &self.cells
    }

    /// Number of cells holding a digit
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v != 0).count()
    }
}

impl fmt::Display for SudokuGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl FromStr for SudokuGrid {
    type Err = GridParseError;

    /// Parse the first 81 whitespace-separated integers, row by row.
    /// Anything after them is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().take(81).collect();
        if tokens.len() < 81 {
            return Err(GridParseError::WrongCellCount(tokens.len()));
        }

        let mut grid = Self::empty();
        for (i, token) in tokens.iter().enumerate() {
            let value: u8 = token
                .parse()
                .ok()
                .filter(|v| *v <= 9)
                .ok_or_else(|| GridParseError::InvalidCell(token.to_string()))?;
            grid.cells[i / 9][i % 9] = value;
        }
        Ok(grid)
    }
}
