use anyhow::Context;
use std::io::Read;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sudoku_extract::SudokuGrid;
use sudoku_extract::solver;

/// Reads a 9x9 grid (0 = empty) from stdin and prints its solution
fn run() -> anyhow::Result<Option<SudokuGrid>> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read grid from stdin")?;

    let puzzle: SudokuGrid = input.parse().context("Invalid grid")?;
    tracing::debug!(clues = puzzle.filled(), "solving");

    Ok(solver::solve(&puzzle))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run() {
        Ok(Some(solved)) => {
            print!("{}", solved);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("No solution");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
