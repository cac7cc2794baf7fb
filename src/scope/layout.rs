//! Automatic datablock layout (spec.md §4.I.4): eight-octant self-only
//! placement, then a three-pass lock/place/relax algorithm bounded at 20
//! iterations with a 32 px step cap so overlapping blocks are nudged apart
//! without unbounded drift. Per spec.md §9, global convergence isn't
//! required — only a non-overlapping result within the cap.

use crate::geometry::Point2D;

const MAX_RELAXATION_ITERATIONS: usize = 20;
const MAX_STEP_PX: f32 = 32.0;
/// Extra margin added to each block's bounds before overlap is tested.
const OVERLAP_PADDING_PX: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size2D {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct DataBlockPlacement {
    pub track: Point2D,
    pub size: Size2D,
    pub manual_offset: Option<Point2D>,
    /// The ideal self-only offset computed from the octant heuristic,
    /// recomputed each frame from the track's heading.
    pub ideal_offset: Point2D,
    /// Current automatic offset, mutated by [`resolve_layout`].
    pub auto_offset: Point2D,
}

impl DataBlockPlacement {
    fn effective_offset(&self) -> Point2D {
        self.manual_offset.unwrap_or(self.auto_offset)
    }

    pub fn bounds(&self) -> Bounds2D {
        let origin = Point2D::new(
            self.track.x + self.effective_offset().x,
            self.track.y + self.effective_offset().y,
        );
        Bounds2D {
            x1: origin.x - OVERLAP_PADDING_PX,
            y1: origin.y - OVERLAP_PADDING_PX,
            x2: origin.x + self.size.width + OVERLAP_PADDING_PX,
            y2: origin.y + self.size.height + OVERLAP_PADDING_PX,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bounds2D {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Bounds2D {
    pub fn overlaps(&self, other: &Bounds2D) -> bool {
        self.x1 < other.x2 && self.x2 > other.x1 && self.y1 < other.y2 && self.y2 > other.y1
    }

    fn center(&self) -> Point2D {
        Point2D::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Chooses the connection offset (a corner or edge midpoint from one of
/// eight octants) that keeps the block on the track's downwind side, with
/// a 15° bias per spec.md §4.I.4.
pub fn self_only_offset(heading_deg: f32, size: Size2D) -> Point2D {
    let h = crate::geometry::normalize_heading(heading_deg + 15.0);
    let octant = ((h / 45.0).floor() as usize) % 8;
    let (dx, dy) = match octant {
        0 => (0.5, -1.0),
        1 => (1.0, -1.0),
        2 => (1.0, 0.5),
        3 => (1.0, 1.0),
        4 => (0.5, 1.0),
        5 => (-1.0, 1.0),
        6 => (-1.0, 0.5),
        _ => (-1.0, -1.0),
    };
    Point2D::new(dx * size.width, dy * size.height)
}

/// Three-pass layout: lock manually-placed blocks, settle any ideal
/// placement that doesn't overlap a locked block, then relax the rest.
pub fn resolve_layout(placements: &mut [DataBlockPlacement]) {
    let n = placements.len();
    if n == 0 {
        return;
    }

    // Pass 1: manually-placed blocks are already locked (their
    // `effective_offset` always returns the manual value); nothing to do.

    // Pass 2: settle non-overlapping ideal placements.
    let mut locked = vec![false; n];
    for i in 0..n {
        if placements[i].manual_offset.is_some() {
            locked[i] = true;
        }
    }
    for i in 0..n {
        if locked[i] {
            continue;
        }
        placements[i].auto_offset = placements[i].ideal_offset;
        let candidate = placements[i].bounds();
        let collides = (0..n).any(|j| j != i && locked[j] && candidate.overlaps(&placements[j].bounds()));
        if !collides {
            locked[i] = true;
        }
    }

    // Pass 3: Fruchterman-Reingold-style relaxation for the rest.
    for _ in 0..MAX_RELAXATION_ITERATIONS {
        let mut moved = false;
        let bounds: Vec<Bounds2D> = placements.iter().map(|p| p.bounds()).collect();

        for i in 0..n {
            if locked[i] {
                continue;
            }
            let mut push = Point2D::new(0.0, 0.0);
            for j in 0..n {
                if i == j || !bounds[i].overlaps(&bounds[j]) {
                    continue;
                }
                let ci = bounds[i].center();
                let cj = bounds[j].center();
                let mut dx = ci.x - cj.x;
                let mut dy = ci.y - cj.y;
                let dist = (dx * dx + dy * dy).sqrt().max(0.01);
                dx /= dist;
                dy /= dist;
                push.x += dx * 4.0;
                push.y += dy * 4.0;
            }

            if push.x != 0.0 || push.y != 0.0 {
                let len = (push.x * push.x + push.y * push.y).sqrt();
                let step = len.min(MAX_STEP_PX);
                placements[i].auto_offset.x += push.x / len * step;
                placements[i].auto_offset.y += push.y / len * step;
                moved = true;
            } else {
                // No overlap left; attract back toward the ideal offset.
                let back = Point2D::new(
                    placements[i].ideal_offset.x - placements[i].auto_offset.x,
                    placements[i].ideal_offset.y - placements[i].auto_offset.y,
                );
                let len = (back.x * back.x + back.y * back.y).sqrt();
                if len > 0.5 {
                    let step = len.min(MAX_STEP_PX);
                    placements[i].auto_offset.x += back.x / len * step;
                    placements[i].auto_offset.y += back.y / len * step;
                    moved = true;
                }
            }
        }

        if !moved {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(x: f32, y: f32, ideal: Point2D) -> DataBlockPlacement {
        DataBlockPlacement {
            track: Point2D::new(x, y),
            size: Size2D { width: 60.0, height: 20.0 },
            manual_offset: None,
            ideal_offset: ideal,
            auto_offset: ideal,
        }
    }

    #[test]
    fn non_overlapping_ideal_placements_are_locked_immediately() {
        let mut placements = vec![
            placement(0.0, 0.0, Point2D::new(10.0, -20.0)),
            placement(500.0, 500.0, Point2D::new(10.0, -20.0)),
        ];
        resolve_layout(&mut placements);
        assert!(!placements[0].bounds().overlaps(&placements[1].bounds()));
    }

    #[test]
    fn overlapping_blocks_are_separated_within_iteration_cap() {
        let mut placements = vec![
            placement(0.0, 0.0, Point2D::new(5.0, -5.0)),
            placement(5.0, 5.0, Point2D::new(5.0, -5.0)),
        ];
        resolve_layout(&mut placements);
        assert!(!placements[0].bounds().overlaps(&placements[1].bounds()));
    }

    #[test]
    fn manual_offset_is_never_moved() {
        let mut placements = vec![
            DataBlockPlacement {
                track: Point2D::new(0.0, 0.0),
                size: Size2D { width: 60.0, height: 20.0 },
                manual_offset: Some(Point2D::new(100.0, 100.0)),
                ideal_offset: Point2D::new(5.0, -5.0),
                auto_offset: Point2D::new(5.0, -5.0),
            },
            placement(10.0, 10.0, Point2D::new(5.0, -5.0)),
        ];
        resolve_layout(&mut placements);
        assert_eq!(placements[0].manual_offset, Some(Point2D::new(100.0, 100.0)));
    }

    #[test]
    fn self_only_offset_picks_downwind_octant() {
        let size = Size2D { width: 60.0, height: 20.0 };
        let north = self_only_offset(0.0, size);
        assert!(north.y < 0.0);
    }
}
