// Outer-boundary tracing of labelled regions.
use crate::core::labelling::{Direction, Label, LabelledImage};
use crate::core::points::Point2Di;

/// Boundary pixels of a region in clockwise order, starting at the first
/// region pixel on the top row of its clip box.
pub type Contour = Vec<Point2Di>;

fn first_labelled_on_top_row(limg: &LabelledImage, region: usize) -> Option<Point2Di> {
    let clip = limg.clip(region)?;
    let root = region as Label + 1;
    (clip.min.x..=clip.max.x)
        .find(|&x| limg.root_at(x, clip.min.y) == root)
        .map(|x| Point2Di::new(x, clip.min.y))
}

fn step(p: Point2Di, direction: Direction) -> Point2Di {
    let (dx, dy) = direction.offset();
    Point2Di::new((p.x as i64 + dx) as u32, (p.y as i64 + dy) as u32)
}

/// Traces the outer boundary of `region` with Moore-neighbour tracing.
///
/// The search at each pixel sweeps clockwise, starting one step clockwise
/// of the direction back to the previous pixel. Tracing stops when the
/// start pixel is about to be left towards the same second pixel again.
/// Returns `None` when the region has no pixel on its top row (i.e. it is
/// not a root region).
pub fn find(limg: &LabelledImage, region: usize) -> Option<Contour> {
    let start = first_labelled_on_top_row(limg, region)?;
    let mass = limg.clip(region).map(|clip| clip.mass).unwrap_or(1) as usize;
    // Each pixel is entered at most four times by the trace.
    let max_steps = 4 * mass + 8;

    let mut contour = vec![start];
    let mut current = start;
    let mut direction = Direction::N;
    let mut second: Option<Point2Di> = None;

    for _ in 0..max_steps {
        let mut next = None;
        for _ in 0..8 {
            if limg.connected_label(current.x, current.y, direction) != 0 {
                next = Some(step(current, direction));
                break;
            }
            direction = direction.clockwise();
        }

        // An isolated pixel has no neighbours to walk to.
        let Some(next) = next else {
            return Some(contour);
        };

        if current == start {
            match second {
                None => second = Some(next),
                Some(first_move) if first_move == next => break,
                Some(_) => {}
            }
        }

        contour.push(next);
        current = next;
        direction = direction.opposite().clockwise();
    }

    if contour.len() > 1 && contour.last() == Some(&start) {
        contour.pop();
    }
    Some(contour)
}
