// Cell grid read from an unwarped marker image.
use std::fmt;

use image::GrayImage;

use crate::core::code::{CODE_GRID_WIDTH, CodeGrid};
use crate::core::error::{Error, ErrorKind};

/// Cells across a whole marker, border included.
pub const GRID_WIDTH: usize = 10;
/// Cells between the marker edge and the code area.
pub const CODE_OFFSET: usize = 2;

const BORDER_RING_CELLS: usize = 4 * (GRID_WIDTH - 1);
const MIN_DARK_BORDER_CELLS: usize = 32;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Cell {
    pub sum: u32,
    pub num_pixels: u32,
    pub white: bool,
}

impl Cell {
    pub fn average(&self) -> u32 {
        if self.num_pixels == 0 {
            return 0;
        }
        self.sum / self.num_pixels
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grid {
    cells: [[Cell; GRID_WIDTH]; GRID_WIDTH],
}

impl Grid {
    /// Averages the central half of each cell of a square unwarped image and
    /// marks cells brighter than `threshold` as white.
    pub fn from_image(unwarped: &GrayImage, threshold: u8) -> Result<Self, Error> {
        let (w, h) = unwarped.dimensions();
        if w != h || w == 0 || w as usize % GRID_WIDTH != 0 {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "code grid needs a square image divisible into {GRID_WIDTH} cells, got {w}x{h}"
            )));
        }

        let cell_px = w / GRID_WIDTH as u32;
        let inset = cell_px / 4;
        let span = (cell_px - 2 * inset).max(1);

        let mut cells = [[Cell::default(); GRID_WIDTH]; GRID_WIDTH];
        for (row, line) in cells.iter_mut().enumerate() {
            for (col, cell) in line.iter_mut().enumerate() {
                let x0 = col as u32 * cell_px + inset;
                let y0 = row as u32 * cell_px + inset;
                for y in y0..y0 + span {
                    for x in x0..x0 + span {
                        cell.sum += unwarped.get_pixel(x, y).0[0] as u32;
                        cell.num_pixels += 1;
                    }
                }
                cell.white = cell.average() > threshold as u32;
            }
        }
        Ok(Self { cells })
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row)?.get(col)
    }

    /// The inner code area; `true` is a black cell.
    pub fn code_cells(&self) -> CodeGrid {
        let mut out = [[false; CODE_GRID_WIDTH]; CODE_GRID_WIDTH];
        for (row, line) in out.iter_mut().enumerate() {
            for (col, bit) in line.iter_mut().enumerate() {
                *bit = !self.cells[row + CODE_OFFSET][col + CODE_OFFSET].white;
            }
        }
        out
    }

    /// Whether the outermost ring of cells is (almost entirely) black.
    pub fn border_dark(&self) -> bool {
        let last = GRID_WIDTH - 1;
        let mut dark = 0;
        for row in 0..GRID_WIDTH {
            for col in 0..GRID_WIDTH {
                let on_ring = row == 0 || col == 0 || row == last || col == last;
                if on_ring && !self.cells[row][col].white {
                    dark += 1;
                }
            }
        }
        debug_assert!(dark <= BORDER_RING_CELLS);
        dark >= MIN_DARK_BORDER_CELLS
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.cells {
            let row: Vec<&str> = line
                .iter()
                .map(|cell| if cell.white { " " } else { "#" })
                .collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GRID_WIDTH, Grid};
    use crate::core::error::ErrorKind;
    use image::{GrayImage, Luma};

    /// 100x100 marker-like image: black border two cells wide, white centre,
    /// one black code cell at code position (1, 3).
    fn sample() -> GrayImage {
        GrayImage::from_fn(100, 100, |x, y| {
            let (col, row) = ((x / 10) as usize, (y / 10) as usize);
            let border = !(2..8).contains(&row) || !(2..8).contains(&col);
            let code_cell = row == 3 && col == 5;
            if border || code_cell { Luma([10]) } else { Luma([240]) }
        })
    }

    #[test]
    fn reads_cells_and_code_area() {
        let grid = Grid::from_image(&sample(), 128).expect("grid");
        assert!(grid.border_dark());
        let code = grid.code_cells();
        for (row, line) in code.iter().enumerate() {
            for (col, &black) in line.iter().enumerate() {
                assert_eq!(black, row == 1 && col == 3, "cell ({row}, {col})");
            }
        }
        let corner = grid.cell(0, 0).expect("cell");
        assert_eq!(corner.num_pixels, 36);
        assert_eq!(corner.average(), 10);
        assert!(grid.cell(GRID_WIDTH, 0).is_none());
    }

    #[test]
    fn white_image_has_no_border() {
        let img = GrayImage::from_pixel(50, 50, Luma([255]));
        let grid = Grid::from_image(&img, 128).expect("grid");
        assert!(!grid.border_dark());
    }

    #[test]
    fn display_draws_black_cells() {
        let grid = Grid::from_image(&sample(), 128).expect("grid");
        let text = grid.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), GRID_WIDTH);
        assert_eq!(lines[0], "# # # # # # # # # #");
        assert_eq!(lines[3], "# #       #     # #");
    }

    #[test]
    fn rejects_non_square_images() {
        let img = GrayImage::new(100, 90);
        let err = Grid::from_image(&img, 128).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
