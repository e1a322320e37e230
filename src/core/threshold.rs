// Global, automatic and adaptive thresholding of greyscale frames.
use image::{GrayImage, Luma};

use crate::core::integral::IntegralImage;

const AUTO_LOWER_BOUND: u16 = 60;
const AUTO_UPPER_BOUND: u16 = 160;
const AUTO_INCREMENT: u16 = 1;

pub const DEFAULT_WINDOW: u32 = 11;
pub const DEFAULT_MARGIN: i16 = 5;

/// Binary image: pixels strictly above `threshold` become white (255).
pub fn threshold_frame(frame: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        if frame.get_pixel(x, y).0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Averages of the pixels classed white (`>= threshold`) and black.
///
/// An empty class reports 255 (white) or 0 (black).
fn classify_and_average(frame: &GrayImage, threshold: u16) -> (u16, u16) {
    let mut sum_white = 0u64;
    let mut sum_black = 0u64;
    let mut num_white = 0u64;
    let mut num_black = 0u64;

    for pixel in frame.pixels() {
        let v = pixel.0[0] as u16;
        if v >= threshold {
            sum_white += v as u64;
            num_white += 1;
        } else {
            sum_black += v as u64;
            num_black += 1;
        }
    }

    let avg_white = if num_white == 0 { 255 } else { (sum_white / num_white) as u16 };
    let avg_black = if num_black == 0 { 0 } else { (sum_black / num_black) as u16 };
    (avg_white, avg_black)
}

/// Linear search for the threshold sitting midway between the mean of the
/// pixels it classes white and the mean of those it classes black.
///
/// The sweep runs upwards from 60 and stops at the first threshold with
/// `threshold >= (avg_white + avg_black) / 2`, or at 160.
pub fn threshold_auto(frame: &GrayImage) -> u8 {
    let mut avg_white = 256u16;
    let mut avg_black = 256u16;
    let mut threshold = AUTO_LOWER_BOUND - AUTO_INCREMENT;

    while threshold < (avg_black + avg_white) / 2 && threshold < AUTO_UPPER_BOUND {
        threshold += AUTO_INCREMENT;
        (avg_white, avg_black) = classify_and_average(frame, threshold);
    }

    threshold as u8
}

/// Dark-pixel predicate for adaptive thresholding against the local mean.
pub struct AdaptiveThreshold {
    integral: IntegralImage,
    window: u32,
    margin: i16,
}

impl AdaptiveThreshold {
    pub fn new(frame: &GrayImage, window: u32, margin: i16) -> Self {
        Self {
            integral: IntegralImage::new(frame),
            window: window.max(1),
            margin,
        }
    }

    pub fn is_dark(&self, x: u32, y: u32, value: u8) -> bool {
        let mean = self.integral.window_mean(x, y, self.window);
        (value as f64) < mean - self.margin as f64
    }
}

/// Binary image from adaptive thresholding: dark pixels become 0.
pub fn threshold_adaptive(frame: &GrayImage, window: u32, margin: i16) -> GrayImage {
    let adaptive = AdaptiveThreshold::new(frame, window, margin);
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        if adaptive.is_dark(x, y, frame.get_pixel(x, y).0[0]) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}
