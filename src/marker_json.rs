//! Purpose: JSON and text renderings of detected markers for the CLI.
//! Exports: `marker_json`, `markers_document`, `marker_text`.
//! Role: Keep the marker payload shape consistent across output formats.
//! Invariants: Stable key names for v0 marker payloads; fields are additive-only.
//! Invariants: Angles are degrees, world co-ordinates metres, image co-ordinates pixels.

use std::fmt::Write as _;

use koki::api::{Marker, MarkerVertex};
use serde_json::{Map, Value, json};

fn vertex_json(vertex: &MarkerVertex) -> Value {
    json!({
        "image": {"x": vertex.image.x, "y": vertex.image.y},
        "world": {"x": vertex.world.x, "y": vertex.world.y, "z": vertex.world.z},
    })
}

pub(crate) fn marker_json(marker: &Marker) -> Value {
    let mut map = Map::new();
    map.insert("code".to_string(), json!(marker.code));
    map.insert("centre".to_string(), vertex_json(&marker.centre));
    map.insert(
        "vertices".to_string(),
        Value::Array(marker.vertices.iter().map(vertex_json).collect()),
    );
    map.insert(
        "rotation".to_string(),
        json!({"x": marker.rotation.x, "y": marker.rotation.y, "z": marker.rotation.z}),
    );
    map.insert(
        "bearing".to_string(),
        json!({"x": marker.bearing.x, "y": marker.bearing.y, "z": marker.bearing.z}),
    );
    map.insert("distance".to_string(), json!(marker.distance));
    map.insert("rotation_offset".to_string(), json!(marker.rotation_offset));
    Value::Object(map)
}

pub(crate) fn markers_document(path: &str, markers: &[Marker]) -> Value {
    json!({
        "path": path,
        "markers": markers.iter().map(marker_json).collect::<Vec<_>>(),
    })
}

/// Human-readable block for marker `index` of a frame.
pub(crate) fn marker_text(index: usize, marker: &Marker) -> String {
    let mut out = String::new();
    let c = &marker.centre;
    let r = &marker.rotation;
    let b = &marker.bearing;
    let _ = writeln!(out, "\n({index}) Marker #{}:", marker.code);
    let _ = writeln!(
        out,
        "\n\tCentre position (image, in pixels):\n\t\t({:.6},\t{:.6})",
        c.image.x, c.image.y
    );
    let _ = writeln!(
        out,
        "\n\tCentre position (world, in metres):\n\t\t({:.6},\t{:.6},\t{:.6})",
        c.world.x, c.world.y, c.world.z
    );
    let _ = writeln!(
        out,
        "\n\tRotation about axes (world, in degrees):\n\t\t({:.6},\t{:.6},\t{:.6})",
        r.x, r.y, r.z
    );
    let _ = writeln!(
        out,
        "\n\tRelative bearing (world, in degrees):\n\t\t({:.6},\t{:.6},\t{:.6})",
        b.x, b.y, b.z
    );
    let _ = writeln!(out, "\n\tDistance (world, in metres):\n\t\t{:.6}", marker.distance);
    let _ = writeln!(out, "\n\tVertex location (image, in pixels):");
    for v in &marker.vertices {
        let _ = writeln!(out, "\t\t({:.6},\t{:.6})", v.image.x, v.image.y);
    }
    let _ = writeln!(out, "\n\tVertex location (world, in metres):");
    for v in &marker.vertices {
        let _ = writeln!(out, "\t\t({:.6},\t{:.6},\t{:.6})", v.world.x, v.world.y, v.world.z);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{marker_json, marker_text, markers_document};
    use koki::api::Marker;

    fn sample() -> Marker {
        let mut marker = Marker {
            code: 12,
            distance: 0.5,
            rotation_offset: 90.0,
            ..Marker::default()
        };
        marker.centre.image.x = 160.0;
        marker.vertices[2].world.z = 0.75;
        marker
    }

    #[test]
    fn marker_json_has_stable_keys() {
        let value = marker_json(&sample());
        assert_eq!(value["code"], 12);
        assert_eq!(value["distance"], 0.5);
        assert_eq!(value["rotation_offset"], 90.0);
        assert_eq!(value["centre"]["image"]["x"], 160.0);
        assert_eq!(value["vertices"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["vertices"][2]["world"]["z"], 0.75);
        assert!(value["rotation"].get("z").is_some());
        assert!(value["bearing"].get("y").is_some());
    }

    #[test]
    fn document_wraps_path_and_markers() {
        let value = markers_document("frame.png", &[sample(), sample()]);
        assert_eq!(value["path"], "frame.png");
        assert_eq!(value["markers"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn text_block_names_the_marker() {
        let text = marker_text(0, &sample());
        assert!(text.starts_with("\n(0) Marker #12:\n"));
        assert!(text.contains("Centre position (image, in pixels):\n\t\t(160.000000,\t0.000000)"));
        assert_eq!(text.matches("\t\t(").count(), 4 + 8);
    }
}
