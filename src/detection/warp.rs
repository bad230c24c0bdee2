use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

use crate::error::ExtractError;
use crate::models::Quad;

/// Corners of a `side` x `side` square, clockwise from top-left
pub fn square_corners(side: u32) -> [(f32, f32); 4] {
    let far = side.saturating_sub(1) as f32;
    [(0.0, 0.0), (far, 0.0), (far, far), (0.0, far)]
}

fn quad_area(quad: &Quad) -> f32 {
    let c = quad.control_points();
    let twice: f32 = (0..4)
        .map(|i| {
            let (x0, y0) = c[i];
            let (x1, y1) = c[(i + 1) % 4];
            x0 * y1 - x1 * y0
        })
        .sum();
    twice.abs() / 2.0
}

/// Homography taking the grid corners onto the square's corners
pub fn grid_projection(quad: &Quad, side: u32) -> Result<Projection, ExtractError> {
    if quad_area(quad) < 1.0 {
        return Err(ExtractError::DegenerateQuadrilateral);
    }
    Projection::from_control_points(quad.control_points(), square_corners(side))
        .ok_or(ExtractError::DegenerateQuadrilateral)
}

/// Resample `image` so the quadrilateral fills a `side` x `side` square.
/// Points that fall outside the source come out black.
pub fn warp_to_square(image: &DynamicImage, quad: &Quad, side: u32) -> Result<DynamicImage, ExtractError> {
    let projection = grid_projection(quad, side)?;

    let rgb = image.to_rgb8();
    let mut output = RgbImage::new(side, side);
    warp_into(&rgb, &projection, Interpolation::Bilinear, Rgb([0u8, 0, 0]), &mut output);

    Ok(DynamicImage::ImageRgb8(output))
}
