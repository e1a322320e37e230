/*
Purpose: Provide a Node N-API binding over the koki marker finder.
Key Exports: findMarkers, findMarkersAsync, ErrorKind, Marker objects.
Role: Official Node binding that mirrors the `koki::api` detection contract.
Invariants: Image bytes in, plain marker objects out; no state kept between calls.
Invariants: Errors include stable kinds and context in message text.
Notes: findMarkersAsync copies the buffer and runs on the libuv thread pool.
*/

use koki::api::{
    self, CameraParams, DEFAULT_MARGIN, DEFAULT_MARKER_WIDTH, DEFAULT_WINDOW, Detector,
    DetectorOptions, Marker, MarkerVertex, ThresholdMode,
};
use napi::bindgen_prelude::{AsyncTask, Buffer, Status};
use napi::{Env, Error, Result, Task};
use napi_derive::napi;

#[napi]
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Internal = 1,
    Usage = 2,
    NotFound = 3,
    Permission = 4,
    Decode = 5,
    Config = 6,
    Io = 7,
}

#[napi(object)]
pub struct FindOptions {
    /// Printed marker width in metres (default 0.11).
    pub marker_width: Option<f64>,
    /// Focal length in pixels (default 571).
    pub focal_length: Option<f64>,
    /// "adaptive" (default), "auto", or a fixed level "0".."255".
    pub threshold: Option<String>,
    pub window: Option<u32>,
    pub margin: Option<i32>,
}

#[napi(object)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

#[napi(object)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[napi(object)]
pub struct Vertex {
    pub image: Point2,
    pub world: Point3,
}

#[napi(object)]
pub struct JsMarker {
    pub code: u32,
    pub centre: Vertex,
    pub vertices: Vec<Vertex>,
    pub rotation: Point3,
    pub bearing: Point3,
    pub distance: f64,
    #[napi(js_name = "rotationOffset")]
    pub rotation_offset: f64,
}

fn vertex(v: &MarkerVertex) -> Vertex {
    Vertex {
        image: Point2 {
            x: v.image.x,
            y: v.image.y,
        },
        world: Point3 {
            x: v.world.x,
            y: v.world.y,
            z: v.world.z,
        },
    }
}

impl From<&Marker> for JsMarker {
    fn from(marker: &Marker) -> Self {
        Self {
            code: marker.code as u32,
            centre: vertex(&marker.centre),
            vertices: marker.vertices.iter().map(vertex).collect(),
            rotation: Point3 {
                x: marker.rotation.x,
                y: marker.rotation.y,
                z: marker.rotation.z,
            },
            bearing: Point3 {
                x: marker.bearing.x,
                y: marker.bearing.y,
                z: marker.bearing.z,
            },
            distance: marker.distance,
            rotation_offset: marker.rotation_offset,
        }
    }
}

/// Options resolved once on the JS thread.
#[derive(Clone, Copy, Debug)]
struct Resolved {
    detector: DetectorOptions,
    focal_length: Option<f64>,
}

fn resolve_options(options: Option<FindOptions>) -> Result<Resolved> {
    let Some(options) = options else {
        return Ok(Resolved {
            detector: DetectorOptions::default(),
            focal_length: None,
        });
    };

    let marker_width = options.marker_width.unwrap_or(DEFAULT_MARKER_WIDTH);
    if !(marker_width.is_finite() && marker_width > 0.0) {
        return Err(Error::new(Status::InvalidArg, "markerWidth must be a positive number"));
    }
    if let Some(f) = options.focal_length {
        if !(f.is_finite() && f > 0.0) {
            return Err(Error::new(Status::InvalidArg, "focalLength must be a positive number"));
        }
    }
    let window = options.window.unwrap_or(DEFAULT_WINDOW);
    if window == 0 {
        return Err(Error::new(Status::InvalidArg, "window must be at least 1"));
    }
    let margin = match options.margin {
        Some(margin) => i16::try_from(margin)
            .map_err(|_| Error::new(Status::InvalidArg, "margin is out of range"))?,
        None => DEFAULT_MARGIN,
    };
    let threshold = match options.threshold.as_deref().map(str::trim) {
        None | Some("adaptive") => ThresholdMode::Adaptive { window, margin },
        Some("auto") => ThresholdMode::Auto,
        Some(level) => level.parse::<u8>().map(ThresholdMode::Global).map_err(|_| {
            Error::new(
                Status::InvalidArg,
                format!("threshold must be adaptive, auto, or 0-255, got `{level}`"),
            )
        })?,
    };

    Ok(Resolved {
        detector: DetectorOptions {
            threshold,
            marker_width,
            ..DetectorOptions::default()
        },
        focal_length: options.focal_length,
    })
}

fn find(bytes: &[u8], options: Resolved) -> Result<Vec<Marker>> {
    let run = || -> std::result::Result<Vec<Marker>, api::Error> {
        let frame = api::decode_image(bytes)?;
        let mut params = CameraParams::for_frame(frame.width(), frame.height());
        if let Some(f) = options.focal_length {
            params = params.with_focal_length(f);
        }
        Detector::new(options.detector).find_markers(&frame, &params)
    };
    run().map_err(to_napi_error)
}

fn to_napi_error(err: api::Error) -> Error {
    let kind = format!("{:?}", err.kind());
    let mut details = vec![format!("kind={kind}")];
    details.push(format!(
        "message={}",
        err.message().unwrap_or_else(|| default_error_message(&kind))
    ));
    if let Some(path) = err.path() {
        details.push(format!("path={}", path.display()));
    }
    let status = match err.kind() {
        api::ErrorKind::Usage | api::ErrorKind::Decode => Status::InvalidArg,
        _ => Status::GenericFailure,
    };
    Error::new(status, format!("koki error: {}", details.join("; ")))
}

fn default_error_message(kind: &str) -> &'static str {
    match kind {
        "Internal" => "internal error",
        "Usage" => "usage error",
        "NotFound" => "not found",
        "Permission" => "permission denied",
        "Decode" => "could not decode image",
        "Config" => "invalid configuration",
        "Io" => "io error",
        _ => "error",
    }
}

/// Finds markers in JPEG or PNG bytes.
#[napi]
pub fn find_markers(image: Buffer, options: Option<FindOptions>) -> Result<Vec<JsMarker>> {
    let options = resolve_options(options)?;
    let markers = find(&image, options)?;
    Ok(markers.iter().map(JsMarker::from).collect())
}

pub struct FindMarkersTask {
    bytes: Vec<u8>,
    options: Resolved,
}

impl Task for FindMarkersTask {
    type Output = Vec<Marker>;
    type JsValue = Vec<JsMarker>;

    fn compute(&mut self) -> Result<Self::Output> {
        find(&self.bytes, self.options)
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
        Ok(output.iter().map(JsMarker::from).collect())
    }
}

/// Like `findMarkers`, but decodes and detects off the JS thread.
#[napi]
pub fn find_markers_async(
    image: Buffer,
    options: Option<FindOptions>,
) -> Result<AsyncTask<FindMarkersTask>> {
    let options = resolve_options(options)?;
    Ok(AsyncTask::new(FindMarkersTask {
        bytes: image.to_vec(),
        options,
    }))
}
