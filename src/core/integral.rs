// Summed-area table over a greyscale frame.
use image::GrayImage;

/// A rectangle of pixels: top-left corner plus extent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Integral image: `pixel(x, y)` is the sum of every source pixel at or
/// above-left of `(x, y)`.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    data: Vec<u64>,
}

impl IntegralImage {
    pub fn new(src: &GrayImage) -> Self {
        let (width, height) = src.dimensions();
        let mut data = vec![0u64; width as usize * height as usize];
        let mut column_sums = vec![0u64; width as usize];

        for y in 0..height {
            let mut row_total = 0u64;
            for x in 0..width {
                column_sums[x as usize] += src.get_pixel(x, y).0[0] as u64;
                row_total += column_sums[x as usize];
                data[(y * width + x) as usize] = row_total;
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> u64 {
        self.data[(y * self.width + x) as usize]
    }

    /// Sum of the pixels inside `region`; an empty or out-of-range region sums to 0.
    pub fn sum(&self, region: Rect) -> u64 {
        if region.width == 0
            || region.height == 0
            || region.x + region.width > self.width
            || region.y + region.height > self.height
        {
            return 0;
        }
        let se_x = region.x + region.width - 1;
        let se_y = region.y + region.height - 1;

        let mut total = self.pixel(se_x, se_y);
        if region.x > 0 && region.y > 0 {
            total += self.pixel(region.x - 1, region.y - 1);
        }
        if region.x > 0 {
            total -= self.pixel(region.x - 1, se_y);
        }
        if region.y > 0 {
            total -= self.pixel(se_x, region.y - 1);
        }
        total
    }

    /// Mean over a `window`×`window` box centred on `(x, y)`, clipped to the frame.
    pub fn window_mean(&self, x: u32, y: u32, window: u32) -> f64 {
        let half = window / 2;
        let x0 = x.saturating_sub(half);
        let y0 = y.saturating_sub(half);
        let x1 = (x + half).min(self.width - 1);
        let y1 = (y + half).min(self.height - 1);
        let rect = Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1);
        self.sum(rect) as f64 / rect.area() as f64
    }
}
