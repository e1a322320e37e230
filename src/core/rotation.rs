// Marker orientation about its own centre.
use crate::core::linalg;
use crate::core::marker::{Marker, Rotation};
use crate::core::points::Point3Df;

fn wrap(angle: f64) -> f64 {
    let angle = angle % 360.0;
    if angle > 180.0 {
        angle - 360.0
    } else if angle <= -180.0 {
        angle + 360.0
    } else {
        angle
    }
}

/// Rotation of four planar points centred on the origin.
///
/// x and y come from the plane normal `p0 × p1`: positive rotations turn
/// anti-clockwise looking from the positive end of the axis towards the
/// origin. z is the angle of the top edge (`p0` to `p1`) in the x/y plane.
/// Angles are in degrees, in `(-180, 180]`.
pub fn estimate_array(points: &[Point3Df; 4]) -> Rotation {
    let n = linalg::cross(points[0], points[1]);
    let scale = n.norm();
    let n = if scale > 0.0 {
        Point3Df::new(n.x / scale, n.y / scale, n.z / scale)
    } else {
        n
    };

    let x = wrap(180.0 - n.y.atan2(n.z).to_degrees());
    let y = wrap(n.x.atan2(n.z).to_degrees() - 180.0);

    let edge = points[1].sub(points[0]);
    let z = wrap(edge.y.atan2(edge.x).to_degrees());

    Rotation { x, y, z }
}

/// Stores the rotation of `marker`'s world vertices about its world centre.
pub fn estimate(marker: &mut Marker) {
    let centre = marker.centre.world;
    let points = marker.world_vertices().map(|p| p.sub(centre));
    marker.rotation = estimate_array(&points);
}

#[cfg(test)]
mod tests {
    use super::{estimate_array, wrap};
    use crate::core::points::Point3Df;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn square(turn: impl Fn(Point3Df) -> Point3Df) -> [Point3Df; 4] {
        [
            Point3Df::new(-1.0, 1.0, 0.0),
            Point3Df::new(1.0, 1.0, 0.0),
            Point3Df::new(1.0, -1.0, 0.0),
            Point3Df::new(-1.0, -1.0, 0.0),
        ]
        .map(turn)
    }

    #[test]
    fn facing_square_has_no_rotation() {
        let r = estimate_array(&square(|p| p));
        assert!(close(r.x, 0.0) && close(r.y, 0.0) && close(r.z, 0.0), "{r:?}");
    }

    #[test]
    fn tilt_about_each_axis_is_reported_on_that_axis() {
        let t = 30f64.to_radians();
        let (s, c) = t.sin_cos();

        let about_x = estimate_array(&square(|p| Point3Df::new(p.x, p.y * c, p.y * s)));
        assert!(close(about_x.x, 30.0) && close(about_x.y, 0.0), "{about_x:?}");

        let about_y = estimate_array(&square(|p| Point3Df::new(p.x * c, p.y, -p.x * s)));
        assert!(close(about_y.x, 0.0) && close(about_y.y, 30.0), "{about_y:?}");

        let about_z = estimate_array(&square(|p| Point3Df::new(p.x * c - p.y * s, p.x * s + p.y * c, 0.0)));
        assert!(close(about_z.z, 30.0), "{about_z:?}");
    }

    #[test]
    fn wrapped_angles_stay_in_the_half_open_range() {
        assert_eq!(wrap(180.0), 180.0);
        assert_eq!(wrap(-180.0), 180.0);
        assert_eq!(wrap(190.0), -170.0);
        assert_eq!(wrap(-190.0), 170.0);
        assert_eq!(wrap(0.0), 0.0);
    }

    #[test]
    fn mirrored_square_reports_half_turns_as_positive() {
        let r = estimate_array(&square(|p| Point3Df::new(-p.x, p.y, 0.0)));
        assert!(close(r.x, 180.0) && close(r.y, 180.0) && close(r.z, 180.0), "{r:?}");
    }
}
