//! Search neighbourhoods: which points take part in one grid node
//!
//! A node sees the points inside a (possibly rotated) search ellipse. Count
//! caps then keep the closest candidates, globally and per quadrant. With a
//! [`QuadTree`] the candidates come from range queries that start at the
//! typical point spacing and double until the caps are provably satisfied or
//! the whole search region has been scanned.

use std::cmp::Ordering;

use super::{PointSet, QuadTree};

/// Prepared search ellipse.
///
/// `radius1` is the semi-axis along X and `radius2` along Y before rotation
/// by `angle` degrees counter-clockwise. With both radii 0 every point is
/// inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchEllipse {
    radius1: f64,
    radius2: f64,
    r1_sq: f64,
    r2_sq: f64,
    r12: f64,
    rotation: Option<(f64, f64)>,
}

impl SearchEllipse {
    pub fn new(radius1: f64, radius2: f64, angle: f64) -> Self {
        let r1_sq = radius1 * radius1;
        let r2_sq = radius2 * radius2;
        let theta = angle.to_radians();
        Self {
            radius1,
            radius2,
            r1_sq,
            r2_sq,
            r12: r1_sq * r2_sq,
            rotation: (theta != 0.0).then(|| (theta.cos(), theta.sin())),
        }
    }

    pub fn circle(radius: f64) -> Self {
        Self::new(radius, radius, 0.0)
    }

    /// True when the ellipse places no limit on distance
    pub fn is_unbounded(&self) -> bool {
        self.r1_sq == 0.0 && self.r2_sq == 0.0
    }

    /// Half side of a square that encloses the ellipse at any rotation
    pub fn reach(&self) -> f64 {
        self.radius1.abs().max(self.radius2.abs())
    }

    /// Is the offset (`dx`, `dy`) from the node inside the ellipse?
    #[inline]
    pub fn contains(&self, dx: f64, dy: f64) -> bool {
        let (rx, ry) = match self.rotation {
            Some((cos, sin)) => (dx * cos + dy * sin, dy * cos - dx * sin),
            None => (dx, dy),
        };
        self.r2_sq * rx * rx + self.r1_sq * ry * ry <= self.r12
    }
}

/// Count caps on the points used for one node. A value of 0 disables a cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborLimits {
    pub min_points: usize,
    pub max_points: usize,
    pub min_points_per_quadrant: usize,
    pub max_points_per_quadrant: usize,
}

impl NeighborLimits {
    pub fn uses_quadrants(&self) -> bool {
        self.min_points_per_quadrant > 0 || self.max_points_per_quadrant > 0
    }

    fn has_any_cap(&self) -> bool {
        self.max_points > 0 || self.uses_quadrants()
    }
}

/// A point selected for a node with its squared distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub dist_sq: f64,
}

fn by_distance(a: &Candidate, b: &Candidate) -> Ordering {
    a.dist_sq
        .total_cmp(&b.dist_sq)
        .then_with(|| a.index.cmp(&b.index))
}

/// Quadrant of an offset: 0 = NE, 1 = NW, 2 = SW, 3 = SE. Zero offsets count
/// as east / north.
#[inline]
fn quadrant(dx: f64, dy: f64) -> usize {
    match (dx >= 0.0, dy >= 0.0) {
        (true, true) => 0,
        (false, true) => 1,
        (false, false) => 2,
        (true, false) => 3,
    }
}

/// Below this `dist_sq + smoothing_sq` a point coincides with the node
pub const EXACT_HIT_THRESHOLD: f64 = 1e-13;

/// Outcome of selecting a node's neighbourhood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Candidates were gathered and capped
    Complete,
    /// Candidates were gathered and capped, but some quadrant held fewer
    /// than `min_points_per_quadrant` points
    QuadrantShortfall,
    /// The point with this index coincides with the node
    ExactHit(usize),
}

/// Per-thread buffers reused across nodes
#[derive(Debug, Default)]
pub struct SearchScratch {
    indices: Vec<usize>,
    quadrants: [Vec<Candidate>; 4],
    pub candidates: Vec<Candidate>,
}

/// Everything needed to pick the points of a node
#[derive(Debug, Clone, Copy)]
pub struct Neighborhood<'a> {
    pub points: &'a PointSet,
    pub index: Option<&'a QuadTree>,
    pub ellipse: SearchEllipse,
    pub limits: NeighborLimits,
    /// First radius of expanding searches
    pub initial_radius: f64,
}

impl<'a> Neighborhood<'a> {
    /// Fill `scratch.candidates` with the points used for node (qx, qy),
    /// sorted by distance then index whenever a cap applies.
    ///
    /// With `exact_hit = Some(smoothing_sq)` a point whose
    /// `dist_sq + smoothing_sq` falls below [`EXACT_HIT_THRESHOLD`] ends the
    /// search early and is returned as [`Selection::ExactHit`] (lowest index
    /// among several).
    pub fn select(
        &self,
        qx: f64,
        qy: f64,
        exact_hit: Option<f64>,
        scratch: &mut SearchScratch,
    ) -> Selection {
        self.gather(qx, qy, scratch);

        if let Some(smoothing_sq) = exact_hit {
            let hit = scratch
                .candidates
                .iter()
                .filter(|c| c.dist_sq + smoothing_sq < EXACT_HIT_THRESHOLD)
                .map(|c| c.index)
                .min();
            if let Some(index) = hit {
                return Selection::ExactHit(index);
            }
        }

        let mut short = false;
        if self.limits.uses_quadrants() {
            for q in scratch.quadrants.iter_mut() {
                q.clear();
            }
            for c in scratch.candidates.drain(..) {
                let dx = self.points.x(c.index) - qx;
                let dy = self.points.y(c.index) - qy;
                scratch.quadrants[quadrant(dx, dy)].push(c);
            }
            for q in scratch.quadrants.iter_mut() {
                q.sort_unstable_by(by_distance);
                if self.limits.max_points_per_quadrant > 0 {
                    q.truncate(self.limits.max_points_per_quadrant);
                }
                short |= q.len() < self.limits.min_points_per_quadrant;
            }
            for q in scratch.quadrants.iter() {
                scratch.candidates.extend_from_slice(q);
            }
        }

        if self.limits.has_any_cap() {
            scratch.candidates.sort_unstable_by(by_distance);
            if self.limits.max_points > 0 {
                scratch.candidates.truncate(self.limits.max_points);
            }
        }

        if short {
            Selection::QuadrantShortfall
        } else {
            Selection::Complete
        }
    }

    /// Collect every point inside the ellipse, or enough of the closest
    /// ones to satisfy the caps exactly.
    fn gather(&self, qx: f64, qy: f64, scratch: &mut SearchScratch) {
        scratch.candidates.clear();
        let tree = match self.index {
            Some(tree) => tree,
            None => {
                self.scan(0..self.points.len(), qx, qy, &mut scratch.candidates);
                return;
            }
        };

        let limit = (!self.ellipse.is_unbounded()).then(|| self.ellipse.reach());
        let early_stop = self.limits.max_points_per_quadrant > 0 || self.limits.max_points > 0;

        let mut radius = match limit {
            Some(reach) if !early_stop => reach,
            Some(reach) => self.initial_radius.min(reach),
            None => self.initial_radius,
        };

        loop {
            scratch.indices.clear();
            tree.query_into(qx - radius, qy - radius, qx + radius, qy + radius, &mut scratch.indices);
            scratch.candidates.clear();
            self.scan(scratch.indices.iter().copied(), qx, qy, &mut scratch.candidates);

            let exhausted = match limit {
                Some(reach) => radius >= reach,
                None => covers(tree, qx, qy, radius),
            };
            if exhausted || (early_stop && self.caps_met_within(qx, qy, radius, &scratch.candidates)) {
                return;
            }
            radius = match limit {
                Some(reach) => (radius * 2.0).min(reach),
                None => radius * 2.0,
            };
        }
    }

    fn scan<I>(&self, indices: I, qx: f64, qy: f64, out: &mut Vec<Candidate>)
    where
        I: IntoIterator<Item = usize>,
    {
        for i in indices {
            let dx = self.points.x(i) - qx;
            let dy = self.points.y(i) - qy;
            if self.ellipse.contains(dx, dy) {
                out.push(Candidate {
                    index: i,
                    dist_sq: dx * dx + dy * dy,
                });
            }
        }
    }

    /// Whether the caps are already filled by candidates no farther than
    /// `radius`. Anything outside the scanned square lies farther than that.
    fn caps_met_within(&self, qx: f64, qy: f64, radius: f64, found: &[Candidate]) -> bool {
        let r_sq = radius * radius;
        let mut counts = [0usize; 4];
        let mut total = 0;
        for c in found.iter().filter(|c| c.dist_sq <= r_sq) {
            total += 1;
            let dx = self.points.x(c.index) - qx;
            let dy = self.points.y(c.index) - qy;
            counts[quadrant(dx, dy)] += 1;
        }
        if self.limits.max_points_per_quadrant > 0 {
            counts
                .iter()
                .all(|&n| n >= self.limits.max_points_per_quadrant)
        } else {
            // A quadrant short here may still fill up farther out.
            total >= self.limits.max_points
                && counts
                    .iter()
                    .all(|&n| n >= self.limits.min_points_per_quadrant)
        }
    }

    /// Closest point inside the ellipse as (index, squared distance); ties
    /// go to the lowest index.
    pub fn nearest(&self, qx: f64, qy: f64, scratch: &mut SearchScratch) -> Option<Candidate> {
        let tree = match self.index {
            Some(tree) => tree,
            None => {
                scratch.candidates.clear();
                self.scan(0..self.points.len(), qx, qy, &mut scratch.candidates);
                return scratch.candidates.iter().copied().min_by(by_distance);
            }
        };

        if !self.ellipse.is_unbounded() {
            let reach = self.ellipse.reach();
            scratch.indices.clear();
            tree.query_into(qx - reach, qy - reach, qx + reach, qy + reach, &mut scratch.indices);
            scratch.candidates.clear();
            self.scan(scratch.indices.iter().copied(), qx, qy, &mut scratch.candidates);
            return scratch.candidates.iter().copied().min_by(by_distance);
        }

        let mut radius = self.initial_radius;
        loop {
            scratch.indices.clear();
            tree.query_into(qx - radius, qy - radius, qx + radius, qy + radius, &mut scratch.indices);
            let best = scratch
                .indices
                .iter()
                .map(|&i| Candidate {
                    index: i,
                    dist_sq: self.points.dist_sq(i, qx, qy),
                })
                .min_by(by_distance);

            match best {
                Some(best) if best.dist_sq <= radius * radius => return Some(best),
                Some(best) => {
                    // A closer point may sit just outside the square.
                    let d = best.dist_sq.sqrt();
                    scratch.indices.clear();
                    tree.query_into(qx - d, qy - d, qx + d, qy + d, &mut scratch.indices);
                    let closer = scratch
                        .indices
                        .iter()
                        .map(|&i| Candidate {
                            index: i,
                            dist_sq: self.points.dist_sq(i, qx, qy),
                        })
                        .min_by(by_distance);
                    return Some(match closer {
                        Some(c) if by_distance(&c, &best) == Ordering::Less => c,
                        _ => best,
                    });
                }
                None if covers(tree, qx, qy, radius) => return None,
                None => radius *= 2.0,
            }
        }
    }
}

/// Does the square of half side `radius` around (qx, qy) cover the tree?
fn covers(tree: &QuadTree, qx: f64, qy: f64, radius: f64) -> bool {
    match tree.bounds() {
        Some(b) => {
            qx - radius <= b.min().x
                && qx + radius >= b.max().x
                && qy - radius <= b.min().y
                && qy + radius >= b.max().y
        }
        None => true,
    }
}

/// Typical point spacing used to seed expanding searches
pub fn initial_search_radius(points: &PointSet) -> f64 {
    let n = points.len().max(1) as f64;
    let (w, h) = points
        .bounds()
        .map_or((0.0, 0.0), |b| (b.width(), b.height()));
    let spacing = (w * h / n).sqrt();
    if spacing > 0.0 && spacing.is_finite() {
        spacing
    } else if w.max(h) > 0.0 {
        w.max(h) / n
    } else {
        1.0
    }
}
