use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Gaussian sigma OpenCV picks for a `kernel_size` kernel when none is given
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur sized by kernel width; kernels of 1 or less are a no-op
pub fn apply_blur(img: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma_for_kernel(kernel_size))
}

/// Inverted adaptive mean threshold.
///
/// A pixel becomes foreground (255) when `pixel <= mean - offset`, with `mean`
/// the rounded average of the `block_size` x `block_size` neighbourhood clipped
/// to the image. Dark ink on light paper comes out white.
pub fn adaptive_threshold_inv(img: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = img.dimensions();
    let radius = block_size / 2;
    let integral = integral_table(img);
    let stride = (width + 1) as usize;

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        let top = y.saturating_sub(radius) as usize;
        let bottom = (y + radius + 1).min(height) as usize;
        for x in 0..width {
            let left = x.saturating_sub(radius) as usize;
            let right = (x + radius + 1).min(width) as usize;

            let sum = integral[bottom * stride + right] + integral[top * stride + left]
                - integral[top * stride + right]
                - integral[bottom * stride + left];
            let count = ((bottom - top) * (right - left)) as u64;
            let mean = ((sum + count / 2) / count) as i32;

            let value = img.get_pixel(x, y)[0] as i32;
            if value <= mean - offset {
                output.put_pixel(x, y, Luma([255u8]));
            }
        }
    }

    output
}

/// Summed-area table with a zero row and column in front:
/// `table[y * (w + 1) + x]` is the sum over `[0, x) x [0, y)`.
fn integral_table(img: &GrayImage) -> Vec<u64> {
    let (width, height) = img.dimensions();
    let stride = (width + 1) as usize;
    let mut table = vec![0u64; stride * (height + 1) as usize];

    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += img.get_pixel(x, y)[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[idx - stride];
        }
    }

    table
}

/// Number of non-zero pixels
pub fn count_nonzero(img: &GrayImage) -> u32 {
    img.pixels().filter(|p| p[0] != 0).count() as u32
}
