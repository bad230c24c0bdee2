mod common;

use common::*;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;

fn extractor_with(recognizer: Arc<StubRecognizer>) -> SudokuExtractor {
    SudokuExtractor::new(ExtractorConfig::default()).with_recognizer(recognizer)
}

fn assert_near(actual: (f32, f32), expected: (f32, f32), tolerance: f32) {
    assert!(
        (actual.0 - expected.0).abs() <= tolerance && (actual.1 - expected.1).abs() <= tolerance,
        "corner {:?} not within {} of {:?}",
        actual,
        tolerance,
        expected
    );
}

fn extract_error(result: anyhow::Result<SudokuGrid>) -> anyhow::Error {
    match result {
        Ok(grid) => panic!("expected an error, got grid:\n{}", grid),
        Err(e) => e,
    }
}

#[test]
fn empty_ruled_grid_reads_as_all_zeros() -> anyhow::Result<()> {
    let recognizer = Arc::new(StubRecognizer::new("5"));
    let extractor = extractor_with(recognizer.clone());

    let grid = extractor.extract(&sudoku_image(&[]))?;

    assert_eq!(grid, SudokuGrid::empty());
    assert_eq!(recognizer.calls(), 0);
    Ok(())
}

#[test]
fn marked_cells_get_recognized_digit() -> anyhow::Result<()> {
    let marks = [(0, 0), (4, 4), (8, 2), (2, 7)];
    let recognizer = Arc::new(StubRecognizer::new("7"));
    let extractor = extractor_with(recognizer.clone());

    let grid = extractor.extract(&sudoku_image(&marks))?;

    for row in 0..9 {
        for col in 0..9 {
            let expected = if marks.contains(&(row as u32, col as u32)) { 7 } else { 0 };
            assert_eq!(grid.get(row, col), expected, "cell ({}, {})", row, col);
        }
    }
    assert_eq!(recognizer.calls(), marks.len());
    Ok(())
}

#[test]
fn unusable_recognizer_output_leaves_cells_empty() -> anyhow::Result<()> {
    for answer in ["", "12", "0", "x"] {
        let recognizer = Arc::new(StubRecognizer::new(answer));
        let extractor = extractor_with(recognizer.clone());

        let grid = extractor.extract(&sudoku_image(&[(1, 1), (6, 3)]))?;

        assert_eq!(grid, SudokuGrid::empty(), "answer {:?}", answer);
        assert_eq!(recognizer.calls(), 2);
    }
    Ok(())
}

#[test]
fn recognizer_errors_degrade_to_empty_cells() -> anyhow::Result<()> {
    let extractor = SudokuExtractor::default().with_recognizer(Arc::new(BrokenRecognizer));
    let grid = extractor.extract(&sudoku_image(&[(3, 3)]))?;
    assert_eq!(grid, SudokuGrid::empty());
    Ok(())
}

#[test]
fn locates_head_on_grid_corners() -> anyhow::Result<()> {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));
    let corners = extractor.locate_grid(&sudoku_image(&[]))?;

    let near = GRID_ORIGIN as f32;
    let far = (GRID_ORIGIN + GRID_SIDE - 1) as f32;
    let [tl, tr, br, bl] = corners.corners();
    assert_near((tl.x, tl.y), (near, near), 4.0);
    assert_near((tr.x, tr.y), (far, near), 4.0);
    assert_near((br.x, br.y), (far, far), 4.0);
    assert_near((bl.x, bl.y), (near, far), 4.0);
    Ok(())
}

#[test]
fn locates_grid_in_tilted_photo() -> anyhow::Result<()> {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));
    let corners = extractor.locate_grid(&tilted_sudoku_image(&[]))?;

    let tilt = camera_tilt();
    let near = GRID_ORIGIN as f32;
    let far = (GRID_ORIGIN + GRID_SIDE - 1) as f32;
    let expected = [(near, near), (far, near), (far, far), (near, far)].map(|p| tilt * p);

    for (corner, expected) in corners.corners().into_iter().zip(expected) {
        assert_near((corner.x, corner.y), expected, 6.0);
    }
    Ok(())
}

#[test]
fn tilted_photo_yields_valid_grid() -> anyhow::Result<()> {
    let recognizer = Arc::new(StubRecognizer::new("4"));
    let extractor = extractor_with(recognizer);

    let grid = extractor.extract(&tilted_sudoku_image(&[(2, 5), (7, 1)]))?;

    assert!(grid.rows().iter().flatten().all(|&v| v <= 9));
    assert_eq!(grid.get(2, 5), 4);
    assert_eq!(grid.get(7, 1), 4);
    Ok(())
}

#[test]
fn normalized_grid_is_square() -> anyhow::Result<()> {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));
    let image = sudoku_image(&[]);

    let corners = extractor.locate_grid(&image)?;
    let normalized = extractor.normalize(&image, &corners)?;

    assert_eq!((normalized.width(), normalized.height()), (450, 450));
    Ok(())
}

#[test]
fn all_black_normalized_image_reads_as_zeros() -> anyhow::Result<()> {
    let recognizer = Arc::new(StubRecognizer::new("9"));
    let extractor = extractor_with(recognizer.clone());

    let black = DynamicImage::ImageRgb8(RgbImage::new(450, 450));
    let grid = extractor.read_cells(&black)?;

    assert_eq!(grid, SudokuGrid::empty());
    assert_eq!(recognizer.calls(), 0);
    Ok(())
}

#[test]
fn blank_page_has_no_grid() {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));
    let page = DynamicImage::ImageRgb8(blank_page(300, 300));

    let err = extract_error(extractor.extract(&page));

    assert!(matches!(err.downcast_ref::<ExtractError>(), Some(ExtractError::GridNotFound)));
    assert_eq!(err.to_string(), "No Sudoku grid found");
}

#[test]
fn speck_below_area_floor_is_not_a_grid() {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));
    let mut page = blank_page(300, 300);
    for y in 150..152 {
        for x in 150..152 {
            page.put_pixel(x, y, INK);
        }
    }

    let err = extract_error(extractor.extract(&DynamicImage::ImageRgb8(page)));
    assert!(matches!(err.downcast_ref::<ExtractError>(), Some(ExtractError::GridNotFound)));
}

#[test]
fn round_border_is_not_a_quadrilateral() {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));

    let err = extract_error(extractor.extract(&ring_image()));

    match err.downcast_ref::<ExtractError>() {
        Some(ExtractError::NotQuadrilateral { vertices }) => assert_ne!(*vertices, 4),
        other => panic!("expected NotQuadrilateral, got {:?}", other),
    }
}

#[test]
fn missing_file_is_a_load_error() {
    let extractor = extractor_with(Arc::new(StubRecognizer::new("1")));
    let err = extract_error(extractor.extract_file(std::path::Path::new("/definitely/not/here.png")));
    assert!(matches!(err.downcast_ref::<ExtractError>(), Some(ExtractError::ImageLoad { .. })));
}

#[test]
fn extract_file_reads_saved_image() -> anyhow::Result<()> {
    let recognizer = Arc::new(StubRecognizer::new("3"));
    let extractor = extractor_with(recognizer);
    let file = save_png(&sudoku_image(&[(5, 5)]));

    let grid = extractor.extract_file(file.path())?;

    assert_eq!(grid.get(5, 5), 3);
    assert_eq!(grid.filled(), 1);
    Ok(())
}

#[test]
fn stricter_ink_threshold_skips_marks() -> anyhow::Result<()> {
    let recognizer = Arc::new(StubRecognizer::new("6"));
    let config = ExtractorConfig {
        min_ink_pixels: 36 * 36,
        ..ExtractorConfig::default()
    };
    let extractor = SudokuExtractor::new(config).with_recognizer(recognizer.clone());

    let grid = extractor.extract(&sudoku_image(&[(0, 0), (8, 8)]))?;

    assert_eq!(grid, SudokuGrid::empty());
    assert_eq!(recognizer.calls(), 0);
    Ok(())
}

#[test]
fn debug_mode_dumps_every_step() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let extractor = extractor_with(Arc::new(StubRecognizer::new("2")))
        .with_debug(&debug_dir);

    extractor.extract(&sudoku_image(&[(4, 4)]))?;

    assert!(debug_dir.join("00_input/01.png").exists());
    assert!(debug_dir.join("04_grid_location/01.png").exists());
    assert!(debug_dir.join("05_perspective_warp/01.png").exists());
    let cells = std::fs::read_dir(debug_dir.join("09_cell_split"))?.count();
    assert_eq!(cells, 81);
    let recognized = std::fs::read_dir(debug_dir.join("11_digit_recognition"))?.count();
    assert_eq!(recognized, 1);
    Ok(())
}

#[test]
fn debug_mode_refuses_non_empty_directory() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;
    let extractor = extractor_with(Arc::new(StubRecognizer::new("2")))
        .with_debug(dir.path());

    assert!(extractor.extract(&sudoku_image(&[])).is_err());
    Ok(())
}

#[test]
fn pipeline_items_carry_step_metadata() -> anyhow::Result<()> {
    use sudoku_extract::detection::steps::{CELL_COL, CELL_ROW, GRID_AREA, INK_PIXELS, OCR_TEXT};

    let extractor = extractor_with(Arc::new(StubRecognizer::new("8")));
    let image = sudoku_image(&[(6, 2)]);

    let mut pipeline = Pipeline::new();
    for step in extractor.localization_steps() {
        pipeline = pipeline.add_step(step);
    }
    assert_eq!(pipeline.len(), 4);
    let located = pipeline.run(image.clone())?;
    let area = located[0].get_float(GRID_AREA).expect("grid area");
    assert!(area > 800.0 * 800.0, "area {}", area);

    let mut steps = extractor.localization_steps();
    steps.extend(extractor.normalization_steps());
    steps.extend(extractor.recognition_steps());
    let pipeline = Pipeline::new().add_steps(steps);

    let split = pipeline.run_partial(image.clone(), 9)?;
    assert_eq!(split.len(), 81);

    let cells = pipeline.run(image)?;
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].get_int(CELL_ROW), Some(6));
    assert_eq!(cells[0].get_int(CELL_COL), Some(2));
    assert_eq!(cells[0].get_string(OCR_TEXT), Some("8"));
    assert!(cells[0].get_int(INK_PIXELS).is_some_and(|ink| ink > 50));
    Ok(())
}

#[test]
fn unusable_config_is_rejected_before_running() {
    let broken = [
        ExtractorConfig { cells_per_side: 0, ..ExtractorConfig::default() },
        ExtractorConfig { warp_size: 0, ..ExtractorConfig::default() },
        ExtractorConfig { cell_margin_ratio: 0.5, ..ExtractorConfig::default() },
        ExtractorConfig { threshold_block_size: 4, ..ExtractorConfig::default() },
    ];

    for config in broken {
        let recognizer = Arc::new(StubRecognizer::new("1"));
        let extractor = SudokuExtractor::new(config.clone()).with_recognizer(recognizer.clone());

        let err = extract_error(extractor.extract(&sudoku_image(&[(0, 0)])));
        assert!(
            matches!(err.downcast_ref::<ExtractError>(), Some(ExtractError::InvalidConfig(_))),
            "config {:?} gave {}",
            config,
            err
        );
        assert_eq!(recognizer.calls(), 0);
    }
}

#[test]
fn zero_margin_reads_whole_cells() -> anyhow::Result<()> {
    let config = ExtractorConfig { cell_margin_ratio: 0.0, ..ExtractorConfig::default() };
    assert!(config.validate().is_ok());

    let extractor = SudokuExtractor::new(config).with_recognizer(Arc::new(StubRecognizer::new("2")));
    let black = DynamicImage::ImageRgb8(RgbImage::new(450, 450));
    assert_eq!(extractor.read_cells(&black)?, SudokuGrid::empty());
    Ok(())
}
