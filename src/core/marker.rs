// Detected marker record and its canonical vertex ordering.
use crate::core::points::{Point2Df, Point3Df};
use crate::core::quad::Quad;

/// One marker corner (or its centre) in image and world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarkerVertex {
    /// Pixels; `(0, 0)` is the top-left of the frame.
    pub image: Point2Df,
    /// Metres in camera space; filled in by pose estimation.
    pub world: Point3Df,
}

/// Rotation of the marker about its own centre, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Direction from the camera to the marker centre, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bearing {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Marker {
    pub code: u8,
    pub centre: MarkerVertex,
    /// Clockwise from the top-left corner of the printed marker.
    pub vertices: [MarkerVertex; 4],
    pub rotation: Rotation,
    pub bearing: Bearing,
    /// Metres from the camera to the marker centre.
    pub distance: f64,
    /// Degrees the code grid was turned clockwise to read upright.
    pub rotation_offset: f64,
}

impl Marker {
    /// A marker with the quad's image vertices; the centre is their mean.
    pub fn from_quad(quad: &Quad) -> Self {
        let vertices = quad.vertices.map(|image| MarkerVertex {
            image,
            world: Point3Df::default(),
        });
        let (sx, sy) = quad
            .vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Self {
            vertices,
            centre: MarkerVertex {
                image: Point2Df::new(sx / 4.0, sy / 4.0),
                world: Point3Df::default(),
            },
            ..Self::default()
        }
    }

    /// Renumbers the vertices after the code grid needed `turns` clockwise
    /// quarter turns to read upright.
    pub fn reorient(&mut self, turns: u8) {
        let r = (turns % 4) as usize;
        let old = self.vertices;
        for m in 0..4 {
            self.vertices[m] = old[(m + 4 - r) % 4];
        }
        self.rotation_offset = 90.0 * r as f64;
    }

    pub fn image_vertices(&self) -> [Point2Df; 4] {
        self.vertices.map(|v| v.image)
    }

    pub fn world_vertices(&self) -> [Point3Df; 4] {
        self.vertices.map(|v| v.world)
    }
}
