use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::geometric_transformations::{Interpolation, Projection, warp};
use imageproc::rect::Rect;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

use sudoku_extract::DigitRecognizer;

pub const IMAGE_SIZE: u32 = 1000;
/// Top-left corner of the drawn grid
pub const GRID_ORIGIN: u32 = 50;
pub const GRID_SIDE: u32 = 900;
pub const BORDER: u32 = 6;
pub const LINE: u32 = 2;

pub const INK: Rgb<u8> = Rgb([20, 20, 20]);
pub const PAPER: Rgb<u8> = Rgb([245, 245, 245]);

pub fn blank_page(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, PAPER)
}

/// Thick outer border plus the eight inner rules each way
pub fn draw_sudoku_frame(img: &mut RgbImage, origin: u32, side: u32) {
    let o = origin as i32;
    let far = (origin + side - BORDER) as i32;

    draw_filled_rect_mut(img, Rect::at(o, o).of_size(side, BORDER), INK);
    draw_filled_rect_mut(img, Rect::at(o, far).of_size(side, BORDER), INK);
    draw_filled_rect_mut(img, Rect::at(o, o).of_size(BORDER, side), INK);
    draw_filled_rect_mut(img, Rect::at(far, o).of_size(BORDER, side), INK);

    let cell = side / 9;
    for i in 1..9 {
        let pos = (origin + i * cell - LINE / 2) as i32;
        draw_filled_rect_mut(img, Rect::at(pos, o).of_size(LINE, side), INK);
        draw_filled_rect_mut(img, Rect::at(o, pos).of_size(side, LINE), INK);
    }
}

/// A "7"-like stroke pair centred in cell (`row`, `col`)
pub fn draw_digit_mark(img: &mut RgbImage, origin: u32, side: u32, row: u32, col: u32) {
    let cell = side / 9;
    let cx = (origin + col * cell + cell / 2) as i32;
    let cy = (origin + row * cell + cell / 2) as i32;

    draw_filled_rect_mut(img, Rect::at(cx - 20, cy - 25).of_size(40, 8), INK);
    draw_filled_rect_mut(img, Rect::at(cx + 12, cy - 25).of_size(8, 50), INK);
}

/// Head-on puzzle photo with marks in the given cells
pub fn sudoku_image(marks: &[(u32, u32)]) -> DynamicImage {
    let mut img = blank_page(IMAGE_SIZE, IMAGE_SIZE);
    draw_sudoku_frame(&mut img, GRID_ORIGIN, GRID_SIDE);
    for &(row, col) in marks {
        draw_digit_mark(&mut img, GRID_ORIGIN, GRID_SIDE, row, col);
    }
    DynamicImage::ImageRgb8(img)
}

/// Projection used to fake a photo taken at an angle
pub fn camera_tilt() -> Projection {
    let size = IMAGE_SIZE as f32;
    Projection::from_control_points(
        [(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)],
        [(40.0, 20.0), (975.0, 55.0), (950.0, 985.0), (15.0, 960.0)],
    )
    .expect("valid projection")
}

/// `sudoku_image` seen through `camera_tilt`
pub fn tilted_sudoku_image(marks: &[(u32, u32)]) -> DynamicImage {
    let flat = sudoku_image(marks).to_rgb8();
    DynamicImage::ImageRgb8(warp(&flat, &camera_tilt(), Interpolation::Bilinear, PAPER))
}

/// A thick ring: big enough to be picked as the grid, but round
pub fn ring_image() -> DynamicImage {
    let mut img = blank_page(500, 500);
    draw_filled_circle_mut(&mut img, (250, 250), 200, INK);
    draw_filled_circle_mut(&mut img, (250, 250), 190, PAPER);
    DynamicImage::ImageRgb8(img)
}

/// Writes the image to a temporary PNG that lives as long as the handle
pub fn save_png(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Recognizer that always answers the same text and counts its calls
pub struct StubRecognizer {
    answer: String,
    calls: AtomicUsize,
}

impl StubRecognizer {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DigitRecognizer for StubRecognizer {
    fn recognize(&self, _window: &image::GrayImage) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// Recognizer that fails on every cell
pub struct BrokenRecognizer;

impl DigitRecognizer for BrokenRecognizer {
    fn recognize(&self, _window: &image::GrayImage) -> anyhow::Result<String> {
        anyhow::bail!("engine exploded")
    }
}
