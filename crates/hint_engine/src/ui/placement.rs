//! Collision-avoiding placement of floating elements
//!
//! Breadth-first search over a grid of candidate positions around the
//! target. The first candidate whose padded box overlaps nothing wins, so
//! the result is among the closest in step count. A position chosen on an
//! earlier pass is kept while it stays free.

use std::collections::{HashSet, VecDeque};

use super::elements::{Boundary, Margin, OverflowStrategy};
use crate::foundation::math::{Point2, Rect};

/// Upper bound on candidates examined in one search
pub const MAX_CANDIDATES: usize = 50_000;

/// Everything the search needs to know about one floating element
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest {
    /// Preferred bottom-centre position
    pub target: Point2,
    /// Measured block width
    pub width: f32,
    /// Measured block height
    pub height: f32,
    /// Region candidates must stay within
    pub boundary: Boundary,
    /// Padding of the collision box
    pub margin: Margin,
    /// Fallback when the region is exhausted
    pub overflow: OverflowStrategy,
    /// Position chosen for this element on the previous pass
    pub previous: Option<Point2>,
}

impl PlacementRequest {
    /// Padded collision box with the bottom centre at `position`
    pub fn footprint(&self, position: Point2) -> Rect {
        Rect::centered_bottom(position.x, position.y, self.width, self.height).expand(
            self.margin.left,
            self.margin.right,
            self.margin.top,
            self.margin.bottom,
        )
    }

    fn is_free(&self, position: Point2, obstacles: &[Rect]) -> bool {
        let footprint = self.footprint(position);
        !obstacles.iter().any(|obstacle| footprint.intersects(obstacle))
    }
}

/// Find a free position for `request` among `obstacles`
///
/// Returns `None` only when the search is exhausted and the element asked to
/// be hidden on overflow.
pub fn find_position(request: &PlacementRequest, obstacles: &[Rect], step: f32) -> Option<Point2> {
    if let Some(previous) = request.previous {
        if request.boundary.contains(previous.x, previous.y) && request.is_free(previous, obstacles) {
            return Some(previous);
        }
    }

    if let Some(position) = search(request, obstacles, step) {
        return Some(position);
    }

    match request.overflow {
        OverflowStrategy::Hide => None,
        OverflowStrategy::StayInPosition => Some(request.target),
    }
}

fn search(request: &PlacementRequest, obstacles: &[Rect], step: f32) -> Option<Point2> {
    let target = request.target;
    if request.is_free(target, obstacles) {
        return Some(target);
    }
    if !(step > 0.0) {
        return None;
    }

    let candidate = |(i, j): (i32, i32)| Point2::new(target.x + i as f32 * step, target.y + j as f32 * step);

    let mut visited: HashSet<(i32, i32)> = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert((0, 0));
    queue.push_back((0, 0));

    while let Some((i, j)) = queue.pop_front() {
        for cell in [(i + 1, j), (i - 1, j), (i, j + 1), (i, j - 1)] {
            if visited.len() >= MAX_CANDIDATES {
                log::debug!("Placement search gave up after {} candidates", MAX_CANDIDATES);
                return None;
            }
            if !visited.insert(cell) {
                continue;
            }

            let position = candidate(cell);
            if !request.boundary.contains(position.x, position.y) {
                continue;
            }
            if request.is_free(position, obstacles) {
                return Some(position);
            }
            queue.push_back(cell);
        }
    }

    None
}
