// Perspective unwarping of a marker quad into a square image.
use image::{GrayImage, Luma};

use crate::core::error::{Error, ErrorKind};
use crate::core::linalg;
use crate::core::points::Point2Df;

/// Projective transform `(u, v) -> (x, y)` as a row-major 3x3 matrix with h22 = 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography([f64; 9]);

impl Homography {
    /// Transform taking each `src[i]` to `dst[i]`; `None` for degenerate input.
    pub fn from_points(src: &[Point2Df; 4], dst: &[Point2Df; 4]) -> Option<Self> {
        let mut a = [[0.0; 8]; 8];
        let mut b = [0.0; 8];
        for i in 0..4 {
            let (u, v) = (src[i].x, src[i].y);
            let (x, y) = (dst[i].x, dst[i].y);
            a[2 * i] = [u, v, 1.0, 0.0, 0.0, 0.0, -u * x, -v * x];
            b[2 * i] = x;
            a[2 * i + 1] = [0.0, 0.0, 0.0, u, v, 1.0, -u * y, -v * y];
            b[2 * i + 1] = y;
        }
        let h = linalg::solve(a, b)?;
        Some(Self([h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0]))
    }

    pub fn apply(&self, p: Point2Df) -> Point2Df {
        let h = &self.0;
        let w = h[6] * p.x + h[7] * p.y + h[8];
        Point2Df::new(
            (h[0] * p.x + h[1] * p.y + h[2]) / w,
            (h[3] * p.x + h[4] * p.y + h[5]) / w,
        )
    }
}

fn sample_bilinear(frame: &GrayImage, p: Point2Df) -> u8 {
    let (w, h) = frame.dimensions();
    if p.x < 0.0 || p.y < 0.0 || p.x > (w - 1) as f64 || p.y > (h - 1) as f64 {
        return 0;
    }
    let x0 = p.x.floor() as u32;
    let y0 = p.y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = p.x - x0 as f64;
    let fy = p.y - y0 as f64;

    let px = |x: u32, y: u32| frame.get_pixel(x, y).0[0] as f64;
    let top = px(x0, y0) * (1.0 - fx) + px(x1, y0) * fx;
    let bottom = px(x0, y1) * (1.0 - fx) + px(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

/// Warps the quad `vertices` (clockwise, vertex 0 at the top-left of the
/// result) into a `size`×`size` image. Samples falling outside `frame` are black.
pub fn unwarp(frame: &GrayImage, vertices: &[Point2Df; 4], size: u32) -> Result<GrayImage, Error> {
    if size == 0 || size % 10 != 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unwarp size must be a positive multiple of 10, got {size}")));
    }
    if frame.width() == 0 || frame.height() == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("cannot unwarp an empty frame"));
    }

    let s = size as f64;
    let square = [
        Point2Df::new(0.0, 0.0),
        Point2Df::new(s, 0.0),
        Point2Df::new(s, s),
        Point2Df::new(0.0, s),
    ];
    let to_frame = Homography::from_points(&square, vertices).ok_or_else(|| {
        Error::new(ErrorKind::Internal).with_message("degenerate quad cannot be unwarped")
    })?;

    Ok(GrayImage::from_fn(size, size, |u, v| {
        let p = to_frame.apply(Point2Df::new(u as f64 + 0.5, v as f64 + 0.5));
        Luma([sample_bilinear(frame, p)])
    }))
}

#[cfg(test)]
mod tests {
    use super::{Homography, unwarp};
    use crate::core::error::ErrorKind;
    use crate::core::points::Point2Df;
    use image::{GrayImage, Luma};

    #[test]
    fn homography_maps_its_control_points() {
        let src = [
            Point2Df::new(0.0, 0.0),
            Point2Df::new(10.0, 0.0),
            Point2Df::new(10.0, 10.0),
            Point2Df::new(0.0, 10.0),
        ];
        let dst = [
            Point2Df::new(3.0, 2.0),
            Point2Df::new(20.0, 5.0),
            Point2Df::new(18.0, 22.0),
            Point2Df::new(1.0, 15.0),
        ];
        let h = Homography::from_points(&src, &dst).expect("homography");
        for (s, d) in src.iter().zip(dst.iter()) {
            assert!(h.apply(*s).distance(*d) < 1e-6);
        }
    }

    #[test]
    fn axis_aligned_unwarp_recovers_the_pattern() {
        // Left half black, right half white, inside a 20..80 square.
        let frame = GrayImage::from_fn(100, 100, |x, _| if x < 50 { Luma([0]) } else { Luma([255]) });
        let vertices = [
            Point2Df::new(20.0, 20.0),
            Point2Df::new(80.0, 20.0),
            Point2Df::new(80.0, 80.0),
            Point2Df::new(20.0, 80.0),
        ];
        let out = unwarp(&frame, &vertices, 30).expect("unwarp");
        assert_eq!(out.dimensions(), (30, 30));
        assert_eq!(out.get_pixel(5, 15).0[0], 0);
        assert_eq!(out.get_pixel(25, 15).0[0], 255);
    }

    #[test]
    fn outside_samples_are_black() {
        let frame = GrayImage::from_pixel(10, 10, Luma([200]));
        let vertices = [
            Point2Df::new(-50.0, -50.0),
            Point2Df::new(-40.0, -50.0),
            Point2Df::new(-40.0, -40.0),
            Point2Df::new(-50.0, -40.0),
        ];
        let out = unwarp(&frame, &vertices, 10).expect("unwarp");
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn size_must_be_a_multiple_of_ten() {
        let frame = GrayImage::from_pixel(10, 10, Luma([200]));
        let vertices = [Point2Df::default(); 4];
        let err = unwarp(&frame, &vertices, 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
