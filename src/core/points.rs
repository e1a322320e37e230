// Point types shared by the image-space and world-space stages.

/// Integer pixel co-ordinate; `(0, 0)` is the top-left pixel.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Point2Di {
    pub x: u32,
    pub y: u32,
}

impl Point2Di {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Point2Di) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx * dx + dy * dy
    }

    pub fn to_f(self) -> Point2Df {
        Point2Df::new(self.x as f64, self.y as f64)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2Df {
    pub x: f64,
    pub y: f64,
}

impl Point2Df {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2Df) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3Df {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3Df {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Point3Df) -> Point3Df {
        Point3Df::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Arithmetic mean of a non-empty set of points.
    pub fn mean(points: &[Point3Df]) -> Point3Df {
        let n = points.len().max(1) as f64;
        let (x, y, z) = points
            .iter()
            .fold((0.0, 0.0, 0.0), |(x, y, z), p| (x + p.x, y + p.y, z + p.z));
        Point3Df::new(x / n, y / n, z / n)
    }
}
