// End-to-end detection on synthetic frames built from rendered markers.
use image::{GrayImage, Luma, imageops};
use koki::api::{CameraParams, Detector, DetectorOptions, Point2Df, render_marker};
use koki::core::unwarp::Homography;

const CELL_PX: u32 = 10;
const CANVAS: u32 = 300;

/// Places `marker` (optionally turned clockwise) in the middle of a grey frame.
fn frame_with(marker: &GrayImage) -> GrayImage {
    let mut frame = GrayImage::from_pixel(CANVAS, CANVAS, Luma([220]));
    let x = (CANVAS - marker.width()) / 2;
    let y = (CANVAS - marker.height()) / 2;
    imageops::overlay(&mut frame, marker, x as i64, y as i64);
    frame
}

/// Projects `marker` onto a trapezoid in the middle of a grey frame: the top
/// and bottom edges are `top` and `bottom` times the marker's width.
fn keystoned(marker: &GrayImage, top: f64, bottom: f64) -> GrayImage {
    let side = marker.width() as f64;
    let (cx, cy) = (CANVAS as f64 / 2.0, CANVAS as f64 / 2.0);
    let (top, bottom) = (side * top / 2.0, side * bottom / 2.0);
    let quad = [
        Point2Df::new(cx - top, cy - side / 2.0),
        Point2Df::new(cx + top, cy - side / 2.0),
        Point2Df::new(cx + bottom, cy + side / 2.0),
        Point2Df::new(cx - bottom, cy + side / 2.0),
    ];
    let square = [
        Point2Df::new(0.0, 0.0),
        Point2Df::new(side, 0.0),
        Point2Df::new(side, side),
        Point2Df::new(0.0, side),
    ];
    let to_marker = Homography::from_points(&quad, &square).expect("homography");

    GrayImage::from_fn(CANVAS, CANVAS, |x, y| {
        let p = to_marker.apply(Point2Df::new(x as f64 + 0.5, y as f64 + 0.5));
        if p.x < 0.0 || p.y < 0.0 || p.x >= side || p.y >= side {
            return Luma([220]);
        }
        *marker.get_pixel(p.x as u32, p.y as u32)
    })
}

fn detect(frame: &GrayImage) -> Vec<koki::api::Marker> {
    let params = CameraParams::for_frame(frame.width(), frame.height());
    Detector::new(DetectorOptions::default())
        .find_markers(frame, &params)
        .expect("detect")
}

#[test]
fn every_quarter_turn_reads_the_same_code() {
    for code in [0u8, 7, 228] {
        let upright = render_marker(code, CELL_PX, 1).expect("render");
        let turns = [
            (upright.clone(), 0.0),
            (imageops::rotate90(&upright), 270.0),
            (imageops::rotate180(&upright), 180.0),
            (imageops::rotate270(&upright), 90.0),
        ];
        for (image, offset) in turns {
            let markers = detect(&frame_with(&image));
            assert_eq!(markers.len(), 1, "code {code} offset {offset}");
            assert_eq!(markers[0].code, code);
            assert_eq!(markers[0].rotation_offset, offset, "code {code}");
        }
    }
}

#[test]
fn vertex_zero_is_the_printed_top_left_corner() {
    let upright = render_marker(42, CELL_PX, 1).expect("render");
    let frame = frame_with(&imageops::rotate90(&upright));
    let markers = detect(&frame);
    assert_eq!(markers.len(), 1);

    // Turned clockwise, the printed top-left sits at the frame's top-right.
    let v0 = markers[0].vertices[0].image;
    let centre = markers[0].centre.image;
    assert!(v0.x > centre.x && v0.y < centre.y, "{v0:?} vs {centre:?}");
}

#[test]
fn frontal_marker_pose() {
    let upright = render_marker(100, CELL_PX, 1).expect("render");
    let markers = detect(&frame_with(&upright));
    assert_eq!(markers.len(), 1);
    let marker = &markers[0];

    // 100 px marker body seen through a 571 px focal length.
    let expected = 571.0 * 0.11 / 100.0;
    assert!((marker.distance - expected).abs() < 0.02, "distance {}", marker.distance);
    assert!(marker.bearing.x.abs() < 1.0 && marker.bearing.y.abs() < 1.0);
    assert!(marker.rotation.x.abs() < 5.0, "rotation {:?}", marker.rotation);
    assert!(marker.rotation.y.abs() < 5.0, "rotation {:?}", marker.rotation);
    assert!(marker.rotation.z.abs() < 1.0, "rotation {:?}", marker.rotation);

    let world_side = marker.vertices[0].world.sub(marker.vertices[3].world).norm();
    assert!((world_side - 0.11).abs() < 1e-6);
}

#[test]
fn two_markers_in_one_frame() {
    let mut frame = GrayImage::from_pixel(400, 200, Luma([210]));
    let a = render_marker(12, 8, 1).expect("render");
    let b = render_marker(34, 8, 1).expect("render");
    imageops::overlay(&mut frame, &a, 20, 40);
    imageops::overlay(&mut frame, &b, 220, 40);

    let mut codes: Vec<u8> = detect(&frame).iter().map(|m| m.code).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec![12, 34]);

    // Left marker sits left of the principal point.
    let markers = detect(&frame);
    let left = markers.iter().find(|m| m.code == 12).expect("left marker");
    assert!(left.centre.world.x < 0.0);
    assert!(left.bearing.y < 0.0);
}

#[test]
fn keystoned_marker_is_read_and_tilted_about_x() {
    let upright = render_marker(99, CELL_PX, 1).expect("render");

    // Narrow top edge: the top of the marker leans away from the camera.
    let markers = detect(&keystoned(&upright, 0.8, 1.0));
    assert_eq!(markers.len(), 1);
    let away = &markers[0];
    assert_eq!(away.code, 99);
    assert_eq!(away.rotation_offset, 0.0);
    assert!(away.rotation.x > 10.0, "rotation {:?}", away.rotation);
    assert!(away.rotation.y.abs() < away.rotation.x, "rotation {:?}", away.rotation);
    let (v0, v3) = (away.vertices[0].world, away.vertices[3].world);
    assert!(v0.z > v3.z, "top {v0:?} bottom {v3:?}");

    // Narrow bottom edge tilts the other way.
    let markers = detect(&keystoned(&upright, 1.0, 0.8));
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].code, 99);
    assert!(markers[0].rotation.x < -10.0, "rotation {:?}", markers[0].rotation);
}
