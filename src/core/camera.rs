// Pinhole camera parameters and their on-disk form.
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::points::Point2Df;

/// Focal length, in pixels, assumed when no calibration is supplied.
pub const DEFAULT_FOCAL_LENGTH: f64 = 571.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub principal_point: Point2Df,
    pub focal_length: Point2Df,
    /// Frame size the parameters were calibrated for.
    pub size: (u32, u32),
}

impl CameraParams {
    /// Uncalibrated parameters for a `width`x`height` frame.
    pub fn for_frame(width: u32, height: u32) -> Self {
        Self {
            principal_point: Point2Df::new(width as f64 / 2.0, height as f64 / 2.0),
            focal_length: Point2Df::new(DEFAULT_FOCAL_LENGTH, DEFAULT_FOCAL_LENGTH),
            size: (width, height),
        }
    }

    pub fn with_focal_length(mut self, focal_length: f64) -> Self {
        self.focal_length = Point2Df::new(focal_length, focal_length);
        self
    }

    /// Mean of the two focal lengths.
    pub fn mean_focal_length(&self) -> f64 {
        (self.focal_length.x + self.focal_length.y) / 2.0
    }

    /// Applies a camera file over `base`. `.yaml`/`.yml` files are read as
    /// YAML, anything else as JSON.
    pub fn from_path(path: &Path, base: CameraParams) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::from_io(err, path))?;
        let yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        let file = if yaml {
            CameraFile::from_yaml(&text)
        } else {
            CameraFile::from_json(&text)
        }
        .map_err(|err| err.with_path(path))?;
        Ok(file.apply(base))
    }
}

/// Recognised keys of a camera file; anything else is ignored.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraFile {
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub focal_length_x: Option<f64>,
    pub focal_length_y: Option<f64>,
    pub principal_point_x: Option<f64>,
    pub principal_point_y: Option<f64>,
}

impl CameraFile {
    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Config)
                .with_message("invalid camera file")
                .with_source(err)
        })
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Config)
                .with_message("invalid camera file")
                .with_hint("Expected an object with keys like focalLengthX and principalPointX.")
                .with_source(err)
        })
    }

    pub fn apply(&self, mut base: CameraParams) -> CameraParams {
        if let Some(width) = self.frame_width {
            base.size.0 = width;
        }
        if let Some(height) = self.frame_height {
            base.size.1 = height;
        }
        if let Some(fx) = self.focal_length_x {
            base.focal_length.x = fx;
        }
        if let Some(fy) = self.focal_length_y {
            base.focal_length.y = fy;
        }
        if let Some(px) = self.principal_point_x {
            base.principal_point.x = px;
        }
        if let Some(py) = self.principal_point_y {
            base.principal_point.y = py;
        }
        base
    }
}
