// Marker detection over one greyscale frame.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::GrayImage;
use tracing::{debug, info, trace};

use crate::core::camera::CameraParams;
use crate::core::code;
use crate::core::code_grid::Grid;
use crate::core::contour;
use crate::core::error::{Error, ErrorKind};
use crate::core::labelling::{self, LabelledImage};
use crate::core::marker::Marker;
use crate::core::quad;
use crate::core::threshold::{self, DEFAULT_MARGIN, DEFAULT_WINDOW};
use crate::core::unwarp;
use crate::core::{bearing, pose, rotation};

/// Marker width, in metres, used when none is given.
pub const DEFAULT_MARKER_WIDTH: f64 = 0.11;
/// Side, in pixels, of the square each candidate is unwarped into.
pub const DEFAULT_UNWARP_SIZE: u32 = 100;

/// How dark regions are separated from the background.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThresholdMode {
    /// Dark when `margin` below the mean of the surrounding `window`.
    Adaptive { window: u32, margin: i16 },
    /// Dark at or below a fixed level.
    Global(u8),
    /// Global, with the level picked from the frame histogram.
    Auto,
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::Adaptive {
            window: DEFAULT_WINDOW,
            margin: DEFAULT_MARGIN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    pub threshold: ThresholdMode,
    pub marker_width: f64,
    pub unwarp_size: u32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            threshold: ThresholdMode::default(),
            marker_width: DEFAULT_MARKER_WIDTH,
            unwarp_size: DEFAULT_UNWARP_SIZE,
        }
    }
}

/// Sink for intermediate images produced while detecting.
pub trait FrameLog {
    fn log_image(&self, label: &str, image: &GrayImage) -> Result<(), Error>;
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLog;

impl FrameLog for NullLog {
    fn log_image(&self, _label: &str, _image: &GrayImage) -> Result<(), Error> {
        Ok(())
    }
}

/// Writes each image as `<seq>-<label>.png` in a directory.
#[derive(Debug)]
pub struct DirLog {
    dir: PathBuf,
    next: AtomicUsize,
}

impl DirLog {
    /// Creates `dir` (and its parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| Error::from_io(err, &dir))?;
        Ok(Self {
            dir,
            next: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameLog for DirLog {
    fn log_image(&self, label: &str, image: &GrayImage) -> Result<(), Error> {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("{seq:06}-{label}.png"));
        image.save(&path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write debug image")
                .with_path(&path)
                .with_source(err)
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Detector {
    options: DetectorOptions,
}

impl Detector {
    pub fn new(options: DetectorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Finds every marker in `frame`, all assumed to be the configured width.
    pub fn find_markers(&self, frame: &GrayImage, params: &CameraParams) -> Result<Vec<Marker>, Error> {
        let width = self.options.marker_width;
        self.find_markers_with(frame, params, |_| width, &NullLog)
    }

    /// Finds every marker in `frame`. `marker_width` gives the printed width,
    /// in metres, of the marker with a given number.
    pub fn find_markers_with<W>(
        &self,
        frame: &GrayImage,
        params: &CameraParams,
        marker_width: W,
        log: &dyn FrameLog,
    ) -> Result<Vec<Marker>, Error>
    where
        W: Fn(u8) -> f64,
    {
        let size = self.options.unwarp_size;
        if size == 0 || size % 10 != 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unwarp size must be a positive multiple of 10, got {size}")));
        }

        let labelled = self.label(frame);
        log.log_image("labels", &labelled.to_image())?;

        let mut markers = Vec::new();
        let mut candidates = 0usize;
        for region in labelled.useable_regions() {
            candidates += 1;
            if let Some(marker) = self.examine(frame, params, &labelled, region, &marker_width, log)? {
                markers.push(marker);
            }
        }

        info!(
            width = frame.width(),
            height = frame.height(),
            regions = labelled.region_count(),
            candidates,
            markers = markers.len(),
            "frame processed"
        );
        Ok(markers)
    }

    fn label(&self, frame: &GrayImage) -> LabelledImage {
        match self.options.threshold {
            ThresholdMode::Adaptive { window, margin } => labelling::label_adaptive(frame, window, margin),
            ThresholdMode::Global(level) => labelling::label_image(frame, level),
            ThresholdMode::Auto => {
                let level = threshold::threshold_auto(frame);
                debug!(level, "auto threshold");
                labelling::label_image(frame, level)
            }
        }
    }

    /// Runs one labelled region through the quad, code and pose stages.
    fn examine<W>(
        &self,
        frame: &GrayImage,
        params: &CameraParams,
        labelled: &LabelledImage,
        region: usize,
        marker_width: &W,
        log: &dyn FrameLog,
    ) -> Result<Option<Marker>, Error>
    where
        W: Fn(u8) -> f64,
    {
        let Some(outline) = contour::find(labelled, region) else {
            debug!(region, "no contour");
            return Ok(None);
        };
        let Some(raw) = quad::find_vertices(&outline) else {
            debug!(region, points = outline.len(), "not a quadrilateral");
            return Ok(None);
        };
        let refined = quad::refine_vertices(&raw, &outline);
        let mut marker = Marker::from_quad(&refined);

        let unwarped = match unwarp::unwarp(frame, &marker.image_vertices(), self.options.unwarp_size) {
            Ok(image) => image,
            Err(err) => {
                debug!(region, error = %err, "unwarp failed");
                return Ok(None);
            }
        };
        let level = threshold::threshold_auto(&unwarped);
        let grid = Grid::from_image(&unwarped, level)?;
        trace!(region, level, "code grid\n{grid}");

        if !grid.border_dark() {
            debug!(region, "border not dark");
            return Ok(None);
        }
        let Some((number, turns)) = code::recover(&grid.code_cells()) else {
            debug!(region, "code rejected");
            return Ok(None);
        };
        marker.code = number;
        marker.reorient(turns);
        log.log_image(&format!("marker-{number}"), &unwarped)?;

        if !pose::estimate(&mut marker, marker_width(number), params) {
            debug!(region, code = number, "degenerate pose");
            return Ok(None);
        }
        rotation::estimate(&mut marker);
        bearing::estimate(&mut marker);

        debug!(
            code = number,
            distance = marker.distance,
            rotation_offset = marker.rotation_offset,
            "marker found"
        );
        Ok(Some(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::{Detector, DetectorOptions, DirLog, FrameLog, ThresholdMode};
    use crate::core::camera::CameraParams;
    use crate::core::error::ErrorKind;
    use crate::core::render::render_marker;
    use image::{GrayImage, Luma, imageops};
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// A rendered marker pasted onto a light grey canvas.
    fn scene(marker: u8, canvas: u32, at: (i64, i64)) -> GrayImage {
        let mut frame = GrayImage::from_pixel(canvas, canvas, Luma([230]));
        let img = render_marker(marker, 12, 1).expect("render");
        imageops::overlay(&mut frame, &img, at.0, at.1);
        frame
    }

    struct Labels(RefCell<Vec<String>>);

    impl FrameLog for Labels {
        fn log_image(&self, label: &str, _image: &GrayImage) -> Result<(), crate::core::error::Error> {
            self.0.borrow_mut().push(label.to_string());
            Ok(())
        }
    }

    #[test]
    fn finds_a_single_frontal_marker() {
        let frame = scene(5, 320, (88, 88));
        let params = CameraParams::for_frame(320, 320);
        let markers = Detector::default().find_markers(&frame, &params).expect("detect");
        assert_eq!(markers.len(), 1);
        let marker = &markers[0];
        assert_eq!(marker.code, 5);
        assert_eq!(marker.rotation_offset, 0.0);
        // Marker body spans 120 px, centred on the principal point.
        assert!((marker.centre.image.x - 160.0).abs() < 1.5, "{:?}", marker.centre);
        assert!((marker.distance - 571.0 * 0.11 / 120.0).abs() < 0.02, "{}", marker.distance);
        assert!(marker.bearing.x.abs() < 1.0 && marker.bearing.y.abs() < 1.0);
    }

    #[test]
    fn each_threshold_mode_finds_the_marker() {
        let frame = scene(200, 300, (60, 80));
        let params = CameraParams::for_frame(300, 300);
        for threshold in [ThresholdMode::default(), ThresholdMode::Global(100), ThresholdMode::Auto] {
            let detector = Detector::new(DetectorOptions {
                threshold,
                ..DetectorOptions::default()
            });
            let markers = detector.find_markers(&frame, &params).expect("detect");
            let codes: Vec<u8> = markers.iter().map(|m| m.code).collect();
            assert_eq!(codes, vec![200], "{threshold:?}");
        }
    }

    #[test]
    fn per_code_width_scales_distance() {
        let frame = scene(3, 320, (88, 88));
        let params = CameraParams::for_frame(320, 320);
        let detector = Detector::default();
        let narrow = detector
            .find_markers_with(&frame, &params, |_| 0.1, &super::NullLog)
            .expect("detect");
        let wide = detector
            .find_markers_with(&frame, &params, |_| 0.2, &super::NullLog)
            .expect("detect");
        assert!((wide[0].distance / narrow[0].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn blank_frame_has_no_markers() {
        let frame = GrayImage::from_pixel(64, 64, Luma([200]));
        let params = CameraParams::for_frame(64, 64);
        let labels = Labels(RefCell::new(Vec::new()));
        let markers = Detector::default()
            .find_markers_with(&frame, &params, |_| 0.11, &labels)
            .expect("detect");
        assert!(markers.is_empty());
        assert_eq!(labels.0.into_inner(), vec!["labels".to_string()]);
    }

    #[test]
    fn dir_log_writes_numbered_pngs() {
        let dir = tempdir().expect("tempdir");
        let log = DirLog::create(dir.path().join("debug")).expect("dir log");
        let frame = scene(9, 320, (88, 88));
        let params = CameraParams::for_frame(320, 320);
        let markers = Detector::default()
            .find_markers_with(&frame, &params, |_| 0.11, &log)
            .expect("detect");
        assert_eq!(markers.len(), 1);
        assert!(log.dir().join("000000-labels.png").exists());
        assert!(log.dir().join("000001-marker-9.png").exists());
    }

    #[test]
    fn bad_unwarp_size_is_a_usage_error() {
        let detector = Detector::new(DetectorOptions {
            unwarp_size: 55,
            ..DetectorOptions::default()
        });
        let frame = GrayImage::new(10, 10);
        let err = detector
            .find_markers(&frame, &CameraParams::for_frame(10, 10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
