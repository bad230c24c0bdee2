use clap::Parser;
use clap::error::ErrorKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sudoku_extract::{SudokuExtractor, SudokuGrid};

#[derive(Parser)]
#[command(name = "sudoku-extract")]
#[command(about = "Read the digits of a Sudoku grid from a photo")]
#[command(version)]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,
}

fn run(args: &Cli) -> anyhow::Result<SudokuGrid> {
    let extractor = SudokuExtractor::default();
    extractor.extract_file(&args.image_path)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            println!("Error: invalid arguments (usage: sudoku-extract <IMAGE>)");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(grid) => {
            print!("{}", grid);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
