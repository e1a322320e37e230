// Principal component analysis of 2D point sets (used for edge line fits).
use crate::core::points::{Point2Df, Point2Di};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pca {
    /// Unit eigenvectors, largest eigenvalue first.
    pub eigen_vectors: [Point2Df; 2],
    pub eigen_values: [f64; 2],
    pub mean: Point2Df,
}

/// PCA over `points` using the population covariance matrix.
///
/// Returns `None` for fewer than two points.
pub fn perform(points: &[Point2Di]) -> Option<Pca> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let mean = Point2Df::new(sx / n, sy / n);

    let (mut cxx, mut cxy, mut cyy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x as f64 - mean.x;
        let dy = p.y as f64 - mean.y;
        cxx += dx * dx;
        cxy += dx * dy;
        cyy += dy * dy;
    }
    cxx /= n;
    cxy /= n;
    cyy /= n;

    // Closed form for the symmetric 2x2 case.
    let half_trace = (cxx + cyy) / 2.0;
    let spread = (((cxx - cyy) / 2.0).powi(2) + cxy * cxy).sqrt();
    let l1 = half_trace + spread;
    let l2 = half_trace - spread;

    let v1 = if cxy.abs() > f64::EPSILON {
        let v = Point2Df::new(l1 - cyy, cxy);
        let len = v.x.hypot(v.y);
        Point2Df::new(v.x / len, v.y / len)
    } else if cxx >= cyy {
        Point2Df::new(1.0, 0.0)
    } else {
        Point2Df::new(0.0, 1.0)
    };
    let v2 = Point2Df::new(-v1.y, v1.x);

    Some(Pca {
        eigen_vectors: [v1, v2],
        eigen_values: [l1, l2],
        mean,
    })
}

#[cfg(test)]
mod tests {
    use super::perform;
    use crate::core::points::Point2Di;

    #[test]
    fn horizontal_points_have_x_as_principal_axis() {
        let points: Vec<Point2Di> = (0..10).map(|x| Point2Di::new(x, 4)).collect();
        let pca = perform(&points).expect("pca");
        assert!((pca.eigen_vectors[0].x.abs() - 1.0).abs() < 1e-9);
        assert!(pca.eigen_vectors[0].y.abs() < 1e-9);
        assert!(pca.eigen_values[1].abs() < 1e-9);
        assert!((pca.mean.x - 4.5).abs() < 1e-9);
        assert!((pca.mean.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn diagonal_points_follow_the_diagonal() {
        let points: Vec<Point2Di> = (0..8).map(|i| Point2Di::new(i, i)).collect();
        let pca = perform(&points).expect("pca");
        let v = pca.eigen_vectors[0];
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert!((v.x.abs() - s).abs() < 1e-9 && (v.y.abs() - s).abs() < 1e-9);
        assert!(v.x * v.y > 0.0);
        assert!(pca.eigen_values[0] > pca.eigen_values[1]);
    }

    #[test]
    fn single_point_is_rejected() {
        assert!(perform(&[Point2Di::new(1, 1)]).is_none());
    }
}
