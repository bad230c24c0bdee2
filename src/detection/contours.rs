use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::point::Point;

/// Outer and hole borders of every foreground region, each compressed to the
/// end points of its straight runs
pub fn find_all_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(mask)
        .into_iter()
        .map(|contour| compress_chain(&contour.points))
        .collect()
}

/// Collapse runs of points moving in the same direction to their end points
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

/// Area enclosed by a closed polygon (shoelace formula)
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let twice_area: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
        })
        .sum();

    twice_area.abs() / 2.0
}

/// The contour enclosing the largest area, if any encloses more than `min_area`.
/// Ties keep the contour found first.
pub fn find_largest_contour(mask: &GrayImage, min_area: f64) -> Option<(Vec<Point<i32>>, f64)> {
    let mut best: Option<(Vec<Point<i32>>, f64)> = None;

    for contour in find_all_contours(mask) {
        let area = polygon_area(&contour);
        let best_area = best.as_ref().map_or(0.0, |(_, a)| *a);
        if area > min_area && area > best_area {
            best = Some((contour, area));
        }
    }

    best
}
