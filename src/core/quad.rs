// Quadrilateral detection on contours, with PCA-based vertex refinement.
use crate::core::contour::Contour;
use crate::core::pca;
use crate::core::points::{Point2Df, Point2Di};

const MIN_CONTOUR_LEN: usize = 16;
const MIN_SIDE_LEN: f64 = 8.0;
const MIN_DIAGONAL_OFFSET: f64 = 0.1;
const SIDE_TOLERANCE_PX: f64 = 2.5;
const SIDE_TOLERANCE_FRACTION: f64 = 0.08;
const REFINE_TRIM: f64 = 0.15;
const REFINE_MAX_SHIFT: f64 = 4.0;

/// Four clockwise vertices and the contour indices they came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub vertices: [Point2Df; 4],
    pub links: [usize; 4],
}

/// Indices walking forward from `from` to `to` (both inclusive), wrapping.
fn chain(len: usize, from: usize, to: usize) -> impl Iterator<Item = usize> {
    let steps = (to + len - from) % len;
    (0..=steps).map(move |k| (from + k) % len)
}

fn furthest_from_point(contour: &[Point2Di], origin: Point2Di) -> usize {
    let mut best = 0;
    let mut best_dist = -1;
    for (i, p) in contour.iter().enumerate() {
        let dist = p.distance_squared(origin);
        if dist > best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

fn line_distance(p: Point2Df, a: Point2Df, b: Point2Df) -> f64 {
    let len = a.distance(b);
    if len == 0.0 {
        return p.distance(a);
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / len
}

fn furthest_from_line(
    contour: &[Point2Di],
    indices: impl Iterator<Item = usize>,
    a: Point2Df,
    b: Point2Df,
) -> (usize, f64) {
    let mut best = (0, -1.0);
    for i in indices {
        let dist = line_distance(contour[i].to_f(), a, b);
        if dist > best.1 {
            best = (i, dist);
        }
    }
    best
}

fn turn(a: Point2Df, b: Point2Df, c: Point2Df) -> f64 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

/// Finds the four corners of a quadrilateral contour.
///
/// The first corner is the contour point furthest from the contour start,
/// the opposite corner the point furthest from that; the remaining two are
/// the points furthest from the diagonal on either side. The result is
/// rejected unless every side is long enough and straight enough and the
/// shape is convex. Vertices are returned in contour order, starting with
/// the one nearest the contour start.
pub fn find_vertices(contour: &Contour) -> Option<Quad> {
    let n = contour.len();
    if n < MIN_CONTOUR_LEN {
        return None;
    }

    let a = furthest_from_point(contour, contour[0]);
    let b = furthest_from_point(contour, contour[a]);
    if a == b {
        return None;
    }
    let pa = contour[a].to_f();
    let pb = contour[b].to_f();
    let diagonal = pa.distance(pb);

    let (c, dist_c) = furthest_from_line(contour, chain(n, a, b), pa, pb);
    let (d, dist_d) = furthest_from_line(contour, chain(n, b, a), pa, pb);
    if dist_c < diagonal * MIN_DIAGONAL_OFFSET || dist_d < diagonal * MIN_DIAGONAL_OFFSET {
        return None;
    }

    let mut links = [a, c, b, d];
    links.sort_unstable();
    let vertices = links.map(|i| contour[i].to_f());

    for i in 0..4 {
        let from = vertices[i];
        let to = vertices[(i + 1) % 4];
        let side = from.distance(to);
        if side < MIN_SIDE_LEN {
            return None;
        }
        let tolerance = SIDE_TOLERANCE_PX.max(side * SIDE_TOLERANCE_FRACTION);
        let (_, deviation) = furthest_from_line(contour, chain(n, links[i], links[(i + 1) % 4]), from, to);
        if deviation > tolerance {
            return None;
        }
    }

    let turns = (0..4).map(|i| turn(vertices[i], vertices[(i + 1) % 4], vertices[(i + 2) % 4]));
    let (mut positive, mut negative) = (0, 0);
    for t in turns {
        if t > 0.0 {
            positive += 1;
        } else if t < 0.0 {
            negative += 1;
        }
    }
    if positive != 4 && negative != 4 {
        return None;
    }

    Some(Quad { vertices, links })
}

/// A fitted edge: a point on the line and its unit direction.
type Line = (Point2Df, Point2Df);

fn fit_side(contour: &Contour, from: usize, to: usize) -> Option<Line> {
    let points: Vec<Point2Di> = chain(contour.len(), from, to).map(|i| contour[i]).collect();
    let trim = ((points.len() as f64 * REFINE_TRIM).ceil() as usize).max(1);
    if points.len() <= 2 * trim + 2 {
        return None;
    }
    let fit = pca::perform(&points[trim..points.len() - trim])?;
    Some((fit.mean, fit.eigen_vectors[0]))
}

fn intersect(l1: Line, l2: Line) -> Option<Point2Df> {
    let ((m1, d1), (m2, d2)) = (l1, l2);
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = ((m2.x - m1.x) * d2.y - (m2.y - m1.y) * d2.x) / denom;
    Some(Point2Df::new(m1.x + t * d1.x, m1.y + t * d1.y))
}

/// Moves each vertex to the intersection of straight lines fitted to its two
/// adjoining sides. A vertex keeps its contour position when either fit is
/// unavailable or the intersection lands more than a few pixels away.
pub fn refine_vertices(quad: &Quad, contour: &Contour) -> Quad {
    let lines: Vec<Option<Line>> = (0..4)
        .map(|i| fit_side(contour, quad.links[i], quad.links[(i + 1) % 4]))
        .collect();

    let mut refined = *quad;
    for i in 0..4 {
        let (Some(prev), Some(next)) = (lines[(i + 3) % 4], lines[i]) else {
            continue;
        };
        if let Some(p) = intersect(prev, next) {
            if p.distance(quad.vertices[i]) <= REFINE_MAX_SHIFT {
                refined.vertices[i] = p;
            }
        }
    }
    refined
}

#[cfg(test)]
mod tests {
    use super::{find_vertices, refine_vertices};
    use crate::core::contour;
    use crate::core::labelling::label_image;
    use crate::core::points::Point2Df;
    use image::{GrayImage, Luma};

    fn shape(size: u32, dark: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| if dark(x, y) { Luma([0]) } else { Luma([255]) })
    }

    fn first_contour(img: &GrayImage) -> contour::Contour {
        let limg = label_image(img, 128);
        let region = limg.useable_regions().next().expect("region");
        contour::find(&limg, region).expect("contour")
    }

    fn close(a: Point2Df, x: f64, y: f64) -> bool {
        (a.x - x).abs() < 0.5 && (a.y - y).abs() < 0.5
    }

    #[test]
    fn square_corners_are_found_clockwise_from_top_left() {
        let img = shape(40, |x, y| (10..30).contains(&x) && (10..30).contains(&y));
        let contour = first_contour(&img);
        let quad = find_vertices(&contour).expect("quad");
        let v = quad.vertices;
        assert!(close(v[0], 10.0, 10.0), "{v:?}");
        assert!(close(v[1], 29.0, 10.0), "{v:?}");
        assert!(close(v[2], 29.0, 29.0), "{v:?}");
        assert!(close(v[3], 10.0, 29.0), "{v:?}");

        let refined = refine_vertices(&quad, &contour);
        for (raw, fit) in quad.vertices.iter().zip(refined.vertices.iter()) {
            assert!(raw.distance(*fit) < 0.5, "{raw:?} vs {fit:?}");
        }
    }

    #[test]
    fn triangle_is_not_a_quad() {
        let img = shape(50, |x, y| (10..40).contains(&y) && x >= 10 && x <= y);
        let contour = first_contour(&img);
        assert!(find_vertices(&contour).is_none());
    }

    #[test]
    fn disc_is_not_a_quad() {
        let img = shape(50, |x, y| {
            let dx = x as f64 - 25.0;
            let dy = y as f64 - 25.0;
            dx * dx + dy * dy <= 15.0 * 15.0
        });
        let contour = first_contour(&img);
        assert!(find_vertices(&contour).is_none());
    }

    #[test]
    fn short_contours_are_rejected() {
        let img = shape(12, |x, y| (4..7).contains(&x) && (4..7).contains(&y));
        let limg = label_image(&img, 128);
        let contour = contour::find(&limg, 0).expect("contour");
        assert!(find_vertices(&contour).is_none());
    }
}
