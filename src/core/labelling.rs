// Connected-component labelling of dark regions with per-region clip boxes.
use image::{GrayImage, Luma};

use crate::core::points::Point2Di;
use crate::core::threshold::AdaptiveThreshold;

pub type Label = u32;

const MIN_REGION_SIZE: u32 = 8;
const MIN_REGION_MASS: u32 = 32;
const MAX_ASPECT_RATIO: u32 = 4;

/// Compass directions in clockwise order; `N` is towards row 0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    const CLOCKWISE: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
        }
    }

    pub fn clockwise(self) -> Direction {
        Self::CLOCKWISE[(self as usize + 1) % 8]
    }

    pub fn opposite(self) -> Direction {
        Self::CLOCKWISE[(self as usize + 4) % 8]
    }
}

/// Bounding box and pixel count of one labelled region.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClipRegion {
    pub min: Point2Di,
    pub max: Point2Di,
    pub mass: u32,
}

impl ClipRegion {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min: Point2Di::new(x, y),
            max: Point2Di::new(x, y),
            mass: 0,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min.x = self.min.x.min(x);
        self.min.y = self.min.y.min(y);
        self.max.x = self.max.x.max(x);
        self.max.y = self.max.y.max(y);
        self.mass += 1;
    }

    fn merge(&mut self, other: &ClipRegion) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.mass += other.mass;
    }

    pub fn width(&self) -> u32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> u32 {
        self.max.y - self.min.y + 1
    }
}

/// Labels for every pixel of a frame: 0 is background, dark pixels carry
/// labels from 1 upward.
///
/// Label data is stored with a one-pixel zero border so neighbour lookups
/// never leave the array. When two regions meet, the larger label is
/// aliased to the smaller; after labelling `aliases[label - 1]` is always
/// the root label and `clips[root - 1]` covers the whole region. Regions
/// are addressed by `region = root - 1`.
#[derive(Clone, Debug)]
pub struct LabelledImage {
    width: u32,
    height: u32,
    data: Vec<Label>,
    clips: Vec<ClipRegion>,
    aliases: Vec<Label>,
}

impl LabelledImage {
    fn new(width: u32, height: u32) -> Self {
        let padded = (width as usize + 2) * (height as usize + 2);
        Self {
            width,
            height,
            data: vec![0; padded],
            clips: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn stride(&self) -> usize {
        self.width as usize + 2
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize + 1) * self.stride() + x as usize + 1
    }

    fn find(&self, mut label: Label) -> Label {
        while self.aliases[label as usize - 1] != label {
            label = self.aliases[label as usize - 1];
        }
        label
    }

    /// Number of labels allocated, including those merged into another region.
    pub fn region_count(&self) -> usize {
        self.clips.len()
    }

    pub fn clip(&self, region: usize) -> Option<&ClipRegion> {
        self.clips.get(region)
    }

    /// Root label that `region` was merged into.
    pub fn root(&self, region: usize) -> Option<Label> {
        self.aliases.get(region).copied()
    }

    /// Raw label stored at `(x, y)`, before alias resolution.
    pub fn label_at(&self, x: u32, y: u32) -> Label {
        self.data[self.index(x, y)]
    }

    /// Root label at `(x, y)`, or 0 for background.
    pub fn root_at(&self, x: u32, y: u32) -> Label {
        match self.label_at(x, y) {
            0 => 0,
            label => self.aliases[label as usize - 1],
        }
    }

    /// Root label of the neighbour of `(x, y)` in `direction`; 0 for
    /// background and for positions outside the frame.
    pub fn connected_label(&self, x: u32, y: u32, direction: Direction) -> Label {
        let (dx, dy) = direction.offset();
        let nx = x as i64 + dx + 1;
        let ny = y as i64 + dy + 1;
        if nx < 0 || ny < 0 || nx > self.width as i64 + 1 || ny > self.height as i64 + 1 {
            return 0;
        }
        match self.data[ny as usize * self.stride() + nx as usize] {
            0 => 0,
            label => self.aliases[label as usize - 1],
        }
    }

    /// Whether `region` is worth tracing as a marker candidate.
    pub fn useable(&self, region: usize) -> bool {
        let Some(clip) = self.clips.get(region) else {
            return false;
        };
        if self.aliases[region] as usize != region + 1 {
            return false;
        }

        let w = clip.width();
        let h = clip.height();
        if w < MIN_REGION_SIZE || h < MIN_REGION_SIZE || clip.mass < MIN_REGION_MASS {
            return false;
        }
        if w > h * MAX_ASPECT_RATIO || h > w * MAX_ASPECT_RATIO {
            return false;
        }

        // Regions cut off by the frame edge cannot be complete markers.
        clip.min.x > 0
            && clip.min.y > 0
            && clip.max.x + 1 < self.width
            && clip.max.y + 1 < self.height
    }

    /// Regions that pass `useable`, as region indices.
    pub fn useable_regions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.clips.len()).filter(|&region| self.useable(region))
    }

    /// Visualisation: white background, each region a grey shade.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| match self.root_at(x, y) {
            0 => Luma([255]),
            root => Luma([(20 + (root * 47) % 180) as u8]),
        })
    }
}

/// Labels the pixels for which `is_dark(x, y, value)` holds, using
/// 8-connectivity.
pub fn label_with<F>(frame: &GrayImage, mut is_dark: F) -> LabelledImage
where
    F: FnMut(u32, u32, u8) -> bool,
{
    let (width, height) = frame.dimensions();
    let mut limg = LabelledImage::new(width, height);
    let stride = limg.stride();

    for y in 0..height {
        for x in 0..width {
            if !is_dark(x, y, frame.get_pixel(x, y).0[0]) {
                continue;
            }

            let idx = limg.index(x, y);
            // W, NW, N and NE have already been visited.
            let neighbours = [
                limg.data[idx - 1],
                limg.data[idx - stride - 1],
                limg.data[idx - stride],
                limg.data[idx - stride + 1],
            ];

            let mut root: Label = 0;
            for &label in neighbours.iter().filter(|&&l| l != 0) {
                let r = limg.find(label);
                root = if root == 0 { r } else { root.min(r) };
            }

            if root == 0 {
                root = limg.aliases.len() as Label + 1;
                limg.aliases.push(root);
                limg.clips.push(ClipRegion::at(x, y));
            } else {
                for &label in neighbours.iter().filter(|&&l| l != 0) {
                    let r = limg.find(label);
                    if r != root {
                        limg.aliases[r as usize - 1] = root;
                    }
                }
            }

            limg.data[idx] = root;
            limg.clips[root as usize - 1].include(x, y);
        }
    }

    let roots: Vec<Label> = (1..=limg.aliases.len() as Label)
        .map(|label| limg.find(label))
        .collect();
    for (i, &root) in roots.iter().enumerate() {
        if root as usize != i + 1 {
            let clip = limg.clips[i];
            limg.clips[root as usize - 1].merge(&clip);
        }
    }
    limg.aliases = roots;

    limg
}

/// Labels pixels at or below a global `threshold`.
pub fn label_image(frame: &GrayImage, threshold: u8) -> LabelledImage {
    label_with(frame, |_, _, value| value <= threshold)
}

/// Labels pixels darker than their local mean by more than `margin`.
pub fn label_adaptive(frame: &GrayImage, window: u32, margin: i16) -> LabelledImage {
    let adaptive = AdaptiveThreshold::new(frame, window, margin);
    label_with(frame, |x, y, value| adaptive.is_dark(x, y, value))
}
