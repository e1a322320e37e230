//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `frame_size_mismatch`.
//! Role: Shared contract helper for CLI diagnostics (non-error events).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub path: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("path".to_string(), json!(notice.path));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Camera parameters were calibrated for a different frame size than the image.
pub fn frame_size_mismatch(
    time: String,
    path: &str,
    camera: (u32, u32),
    frame: (u32, u32),
) -> Notice {
    let mut details = Map::new();
    details.insert("camera_width".to_string(), json!(camera.0));
    details.insert("camera_height".to_string(), json!(camera.1));
    details.insert("frame_width".to_string(), json!(frame.0));
    details.insert("frame_height".to_string(), json!(frame.1));
    Notice {
        kind: "frame_size_mismatch".to_string(),
        time,
        cmd: "koki".to_string(),
        path: path.to_string(),
        message: format!(
            "camera parameters are for {}x{} but the image is {}x{}",
            camera.0, camera.1, frame.0, frame.1
        ),
        details,
    }
}
