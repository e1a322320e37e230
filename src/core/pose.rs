// Planar ranging of a square of known size (Hung, Yeh & Harwood, 1985).
use crate::core::camera::CameraParams;
use crate::core::linalg;
use crate::core::marker::Marker;
use crate::core::points::{Point2Df, Point3Df};

/// World positions of four clockwise square corners seen at `img`.
///
/// `img` is relative to the principal point with y pointing up. Each world
/// point lies on the ray through its image point `(x, y, f)`; the scale
/// factors come from the parallelogram constraint `P0 - P1 + P2 = P3`,
/// normalised so that side `P0P3` is `marker_width` long.
pub fn estimate_arrays(
    img: &[Point2Df; 4],
    marker_width: f64,
    focal_length: f64,
) -> Option<[Point3Df; 4]> {
    let f = focal_length;
    let a = [
        [-img[0].x, img[1].x, img[2].x],
        [-img[0].y, img[1].y, img[2].y],
        [-f, f, f],
    ];
    let b = [img[3].x, img[3].y, f];
    let k_out = linalg::solve(a, b)?;

    let k0_over_k3 = k_out[0];
    let side = Point3Df::new(
        -k0_over_k3 * img[0].x - img[3].x,
        -k0_over_k3 * img[0].y - img[3].y,
        -k0_over_k3 * f - f,
    )
    .norm();
    if side == 0.0 || !side.is_finite() {
        return None;
    }

    let k3 = (marker_width / side).abs();
    let k = [
        k_out[0].abs() * k3,
        k_out[1].abs() * k3,
        k_out[2].abs() * k3,
        k3,
    ];

    let mut world = [Point3Df::default(); 4];
    for i in 0..4 {
        world[i] = Point3Df::new(img[i].x * k[i], img[i].y * k[i], f * k[i]);
    }
    Some(world)
}

/// Fills in the world vertices, world centre and distance of `marker`.
/// Returns `false` (leaving the marker untouched) for degenerate geometry.
pub fn estimate(marker: &mut Marker, marker_width: f64, params: &CameraParams) -> bool {
    let img = marker.vertices.map(|v| {
        Point2Df::new(
            v.image.x - params.principal_point.x,
            params.principal_point.y - v.image.y,
        )
    });
    let Some(world) = estimate_arrays(&img, marker_width, params.mean_focal_length()) else {
        return false;
    };

    for (vertex, point) in marker.vertices.iter_mut().zip(world) {
        vertex.world = point;
    }
    marker.centre.world = Point3Df::mean(&world);
    marker.distance = marker.centre.world.norm();
    true
}
