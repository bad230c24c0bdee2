use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use crate::error::ExtractError;
use crate::models::Quad;

/// Douglas-Peucker simplification of a closed contour.
///
/// The curve is split at its first point and the point farthest from it, and
/// each half is simplified on its own so both split points survive as vertices.
pub fn approximate_closed_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if contour.len() < 3 || epsilon <= 0.0 {
        return contour.to_vec();
    }

    let start = contour[0];
    let dist2 = |p: &Point<i32>| {
        let dx = (p.x - start.x) as i64;
        let dy = (p.y - start.y) as i64;
        dx * dx + dy * dy
    };
    let far = contour
        .iter()
        .enumerate()
        .fold((0, 0), |(best_i, best_d), (i, p)| {
            let d = dist2(p);
            if d > best_d { (i, d) } else { (best_i, best_d) }
        })
        .0;
    if far == 0 {
        return vec![start];
    }

    let first_half = approximate_polygon_dp(&contour[..=far], epsilon, false);
    let mut second: Vec<Point<i32>> = contour[far..].to_vec();
    second.push(start);
    let second_half = approximate_polygon_dp(&second, epsilon, false);

    let mut polygon = first_half;
    polygon.extend_from_slice(&second_half[1..second_half.len() - 1]);
    polygon.dedup();
    polygon
}

/// Index of the first strictly smallest key
fn argmin(keys: &[f32; 4]) -> usize {
    (1..4).fold(0, |best, i| if keys[i] < keys[best] { i } else { best })
}

/// Index of the first strictly largest key
fn argmax(keys: &[f32; 4]) -> usize {
    (1..4).fold(0, |best, i| if keys[i] > keys[best] { i } else { best })
}

/// Put four corners in top-left, top-right, bottom-right, bottom-left order.
///
/// Top-left has the smallest `x + y`, bottom-right the largest. Top-right has
/// the smallest `y - x`, bottom-left the largest.
pub fn order_corners(points: [Point<f32>; 4]) -> Quad {
    let sums = points.map(|p| p.x + p.y);
    let diffs = points.map(|p| p.y - p.x);

    Quad {
        top_left: points[argmin(&sums)],
        top_right: points[argmin(&diffs)],
        bottom_right: points[argmax(&sums)],
        bottom_left: points[argmax(&diffs)],
    }
}

/// Simplify the grid contour and return its ordered corners.
///
/// `epsilon_ratio` is the simplification tolerance as a fraction of the
/// contour's perimeter. A quadrilateral turned about 45 degrees can have one
/// vertex win two corner slots; that is reported as degenerate.
pub fn approximate_quad(contour: &[Point<i32>], epsilon_ratio: f64) -> Result<Quad, ExtractError> {
    let perimeter = arc_length(contour, true);
    let polygon = approximate_closed_polygon(contour, epsilon_ratio * perimeter);

    let corners: [Point<i32>; 4] = polygon
        .as_slice()
        .try_into()
        .map_err(|_| ExtractError::NotQuadrilateral { vertices: polygon.len() })?;

    let quad = order_corners(corners.map(|p| Point::new(p.x as f32, p.y as f32)));
    if !quad.has_distinct_corners() {
        return Err(ExtractError::DegenerateQuadrilateral);
    }
    Ok(quad)
}
