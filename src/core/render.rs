// Printable marker images.
use image::{GrayImage, Luma};

use crate::core::code::{self, CODE_GRID_WIDTH, MARKER_COUNT};
use crate::core::code_grid::{CODE_OFFSET, GRID_WIDTH};
use crate::core::error::{Error, ErrorKind};

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

/// Largest rendered side length, in pixels.
pub const MAX_SIDE: u32 = 16384;

/// Renders marker `marker` with `cell_px` pixels per cell, surrounded by a
/// white margin `margin_cells` cells wide.
pub fn render_marker(marker: u8, cell_px: u32, margin_cells: u32) -> Result<GrayImage, Error> {
    let grid = code::encode(marker).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("no marker number {marker}"))
            .with_hint(format!("Marker numbers run from 0 to {}.", MARKER_COUNT - 1))
    })?;
    if cell_px == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("cell size must be at least 1 pixel"));
    }

    let side = margin_cells
        .checked_mul(2)
        .and_then(|m| m.checked_add(GRID_WIDTH as u32))
        .and_then(|cells| cells.checked_mul(cell_px))
        .filter(|&side| side <= MAX_SIDE)
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("marker image would be too large")
                .with_hint(format!("Rendered markers are at most {MAX_SIDE} pixels across."))
        })?;

    let code_range = CODE_OFFSET..CODE_OFFSET + CODE_GRID_WIDTH;
    Ok(GrayImage::from_fn(side, side, |x, y| {
        let col = (x / cell_px) as i64 - margin_cells as i64;
        let row = (y / cell_px) as i64 - margin_cells as i64;
        if !(0..GRID_WIDTH as i64).contains(&col) || !(0..GRID_WIDTH as i64).contains(&row) {
            return WHITE;
        }
        let (row, col) = (row as usize, col as usize);
        if !code_range.contains(&row) || !code_range.contains(&col) {
            return BLACK;
        }
        if grid[row - CODE_OFFSET][col - CODE_OFFSET] { BLACK } else { WHITE }
    }))
}
