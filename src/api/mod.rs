//! Purpose: Define the stable public Rust API boundary for koki.
//! Exports: Detection entry points, marker types, camera parameters, and errors.
//! Role: Public, additive-only surface used by the CLI and the Node binding.
//! Invariants: Image bytes are decoded here; core stages only see greyscale frames.
//! Invariants: Errors are always `Error` values with a stable `ErrorKind`.
use image::GrayImage;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::camera::{CameraFile, CameraParams, DEFAULT_FOCAL_LENGTH};
pub use crate::core::code::MARKER_COUNT;
pub use crate::core::detector::{
    DEFAULT_MARKER_WIDTH, DEFAULT_UNWARP_SIZE, Detector, DetectorOptions, DirLog, FrameLog,
    NullLog, ThresholdMode,
};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::marker::{Bearing, Marker, MarkerVertex, Rotation};
pub use crate::core::points::{Point2Df, Point3Df};
pub use crate::core::render::render_marker;
pub use crate::core::threshold::{DEFAULT_MARGIN, DEFAULT_WINDOW};

pub type ApiResult<T> = Result<T, Error>;

/// Decodes JPEG or PNG bytes into an 8-bit greyscale frame.
pub fn decode_image(bytes: &[u8]) -> ApiResult<GrayImage> {
    let image = image::load_from_memory(bytes).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("failed to decode image")
            .with_hint("Supported formats are JPEG and PNG.")
            .with_source(err)
    })?;
    Ok(image.into_luma8())
}

/// Decodes `bytes` and finds markers using uncalibrated camera parameters
/// for the decoded frame size.
pub fn find_markers_in_bytes(bytes: &[u8], options: DetectorOptions) -> ApiResult<Vec<Marker>> {
    let frame = decode_image(bytes)?;
    let params = CameraParams::for_frame(frame.width(), frame.height());
    Detector::new(options).find_markers(&frame, &params)
}

#[cfg(test)]
mod tests {
    use super::{DetectorOptions, ErrorKind, decode_image, find_markers_in_bytes, render_marker};
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_bytes(image: &image::GrayImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).expect("encode png");
        out.into_inner()
    }

    #[test]
    fn garbage_bytes_are_decode_errors() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn finds_markers_in_png_bytes() {
        let marker = render_marker(42, 10, 3).expect("render");
        let markers = find_markers_in_bytes(&png_bytes(&marker), DetectorOptions::default())
            .expect("detect");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].code, 42);
    }

    #[test]
    fn detector_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<super::Detector>();
    }
}
