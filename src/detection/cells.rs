/// Axis-aligned pixel rectangle inside the rectified grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One tile of the cell grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellTile {
    pub row: usize,
    pub col: usize,
    pub bounds: BoundingBox,
}

/// Edge length of a cell. Remainder pixels of a side that does not divide
/// evenly are left out of every tile (they sit past the last row/column).
/// Zero cells per side gives a zero size.
pub fn cell_size(side: u32, cells_per_side: u32) -> u32 {
    side.checked_div(cells_per_side).unwrap_or(0)
}

/// Row-major tiling of a `side` x `side` square
pub fn tiles(side: u32, cells_per_side: u32) -> Vec<CellTile> {
    let size = cell_size(side, cells_per_side);
    if size == 0 {
        return Vec::new();
    }
    let n = cells_per_side as usize;

    (0..n * n)
        .map(|i| {
            let (row, col) = (i / n, i % n);
            CellTile {
                row,
                col,
                bounds: BoundingBox {
                    x: col as u32 * size,
                    y: row as u32 * size,
                    width: size,
                    height: size,
                },
            }
        })
        .collect()
}

/// Inner part of a tile with `floor(size * margin_ratio)` cut from each side
pub fn digit_window(tile: &BoundingBox, margin_ratio: f32) -> BoundingBox {
    let margin_x = (tile.width as f32 * margin_ratio) as u32;
    let margin_y = (tile.height as f32 * margin_ratio) as u32;

    BoundingBox {
        x: tile.x + margin_x,
        y: tile.y + margin_y,
        width: tile.width.saturating_sub(2 * margin_x),
        height: tile.height.saturating_sub(2 * margin_y),
    }
}
