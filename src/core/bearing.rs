// Direction from the camera to a marker.
use crate::core::marker::{Bearing, Marker};
use crate::core::points::Point3Df;

/// Bearing to `point` from the camera axis, in radians.
///
/// Positive x means the point is above the principal point; positive y means
/// it is to the right. z is always 0.
pub fn estimate_point(point: Point3Df) -> Bearing {
    let r = point.norm();
    let x = if r > 0.0 { (point.y / r).asin() } else { 0.0 };
    Bearing {
        x,
        y: point.x.atan2(point.z),
        z: 0.0,
    }
}

/// Stores the bearing to `marker`'s world centre, in degrees.
pub fn estimate(marker: &mut Marker) {
    let b = estimate_point(marker.centre.world);
    marker.bearing = Bearing {
        x: b.x.to_degrees(),
        y: b.y.to_degrees(),
        z: b.z.to_degrees(),
    };
}

#[cfg(test)]
mod tests {
    use super::{estimate, estimate_point};
    use crate::core::marker::Marker;
    use crate::core::points::Point3Df;

    #[test]
    fn straight_ahead_is_zero() {
        let b = estimate_point(Point3Df::new(0.0, 0.0, 2.0));
        assert_eq!((b.x, b.y, b.z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn offsets_map_to_degrees() {
        let mut marker = Marker::default();
        marker.centre.world = Point3Df::new(1.0, 0.0, 1.0);
        estimate(&mut marker);
        assert!((marker.bearing.y - 45.0).abs() < 1e-9);
        assert!(marker.bearing.x.abs() < 1e-9);

        marker.centre.world = Point3Df::new(0.0, 1.0, 1.0);
        estimate(&mut marker);
        assert!((marker.bearing.x - 45.0).abs() < 1e-9);
    }

    #[test]
    fn origin_has_no_bearing() {
        let b = estimate_point(Point3Df::default());
        assert_eq!(b.x, 0.0);
    }
}
