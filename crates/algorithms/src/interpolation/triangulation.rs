//! Delaunay triangulation for linear interpolation
//!
//! Incremental Bowyer-Watson over the distinct sample coordinates. Points are
//! inserted in ascending X so triangles whose circumcircle lies entirely to
//! the left of the sweep can be retired early (Bourke, 1989). A uniform
//! bucket grid over the triangles answers point location.

use std::collections::HashMap;

use tracing::debug;

use super::PointSet;

/// Barycentric tolerance for a node lying on a triangle edge
const EDGE_TOLERANCE: f64 = -1e-10;

/// Circumcircle of a triangle
#[derive(Debug, Clone, Copy)]
struct Circumcircle {
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    circle: Option<Circumcircle>,
}

/// Compute the circumcircle of three points
fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Circumcircle> {
    let (ax, ay) = a;
    let (bx, by) = b;
    let (cx, cy) = c;

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-12 {
        return None;
    }

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;

    let dx = ax - ux;
    let dy = ay - uy;
    Some(Circumcircle {
        cx: ux,
        cy: uy,
        radius_sq: dx * dx + dy * dy,
    })
}

/// Barycentric coordinates of (px, py) in triangle (p0, p1, p2).
///
/// Returns (u, v, w) where the interpolated value is u*z0 + v*z1 + w*z2.
fn barycentric(px: f64, py: f64, p0: (f64, f64), p1: (f64, f64), p2: (f64, f64)) -> (f64, f64, f64) {
    let v0x = p1.0 - p0.0;
    let v0y = p1.1 - p0.1;
    let v1x = p2.0 - p0.0;
    let v1y = p2.1 - p0.1;
    let v2x = px - p0.0;
    let v2y = py - p0.1;

    let dot00 = v0x * v0x + v0y * v0y;
    let dot01 = v0x * v1x + v0y * v1y;
    let dot02 = v0x * v2x + v0y * v2y;
    let dot11 = v1x * v1x + v1y * v1y;
    let dot12 = v1x * v2x + v1y * v2y;

    let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
    let v = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let w = (dot00 * dot12 - dot01 * dot02) * inv_denom;
    (1.0 - v - w, v, w)
}

/// Indices of the distinct finite coordinates, sorted by (x, y). Among
/// duplicates the lowest index is kept.
fn distinct_sorted(points: &PointSet) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len())
        .filter(|&i| points.x(i).is_finite() && points.y(i).is_finite())
        .collect();
    order.sort_unstable_by(|&a, &b| {
        points
            .x(a)
            .total_cmp(&points.x(b))
            .then_with(|| points.y(a).total_cmp(&points.y(b)))
            .then_with(|| a.cmp(&b))
    });
    order.dedup_by(|b, a| points.x(*a) == points.x(*b) && points.y(*a) == points.y(*b));
    order
}

/// Bowyer-Watson over `order` (indices into `points`, sorted by X).
/// Returned triangles reference `points` indices.
fn delaunay(points: &PointSet, order: &[usize]) -> Vec<[usize; 3]> {
    if order.len() < 3 {
        return Vec::new();
    }

    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for &i in order {
        min_x = min_x.min(points.x(i));
        min_y = min_y.min(points.y(i));
        max_x = max_x.max(points.x(i));
        max_y = max_y.max(points.y(i));
    }
    let delta = (max_x - min_x).max(max_y - min_y).max(1.0);
    let mid_x = 0.5 * (min_x + max_x);
    let mid_y = 0.5 * (min_y + max_y);

    // Vertex k < 3 is the super-triangle; vertex k >= 3 is order[k - 3].
    let mut coords: Vec<(f64, f64)> = vec![
        (mid_x - 20.0 * delta, mid_y - delta),
        (mid_x, mid_y + 20.0 * delta),
        (mid_x + 20.0 * delta, mid_y - delta),
    ];
    coords.extend(order.iter().map(|&i| (points.x(i), points.y(i))));

    let make = |coords: &[(f64, f64)], v: [usize; 3]| Triangle {
        v,
        circle: circumcircle(coords[v[0]], coords[v[1]], coords[v[2]]),
    };

    let mut active = vec![make(&coords, [0, 1, 2])];
    let mut done: Vec<Triangle> = Vec::new();
    let mut edges: HashMap<(usize, usize), u32> = HashMap::new();
    let mut boundary: Vec<(usize, usize)> = Vec::new();

    for vi in 3..coords.len() {
        let (px, py) = coords[vi];

        let mut bad: Vec<Triangle> = Vec::new();
        let mut k = 0;
        while k < active.len() {
            let tri = active[k];
            if let Some(cc) = tri.circle {
                let dx = px - cc.cx;
                let dy = py - cc.cy;
                if dx > 0.0 && dx * dx > cc.radius_sq {
                    // No later point can fall inside this circle.
                    done.push(active.swap_remove(k));
                    continue;
                }
                if dx * dx + dy * dy <= cc.radius_sq {
                    bad.push(active.swap_remove(k));
                    continue;
                }
            }
            k += 1;
        }

        // Edges of the cavity: those not shared by two bad triangles.
        edges.clear();
        for tri in &bad {
            for e in 0..3 {
                let (a, b) = (tri.v[e], tri.v[(e + 1) % 3]);
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        boundary.clear();
        for tri in &bad {
            for e in 0..3 {
                let (a, b) = (tri.v[e], tri.v[(e + 1) % 3]);
                if edges.get(&(a.min(b), a.max(b))) == Some(&1) {
                    boundary.push((a, b));
                }
            }
        }

        for &(a, b) in &boundary {
            active.push(make(&coords, [a, b, vi]));
        }
    }

    done.extend(active);

    let scale = delta * delta;
    done.into_iter()
        .filter(|t| t.v.iter().all(|&k| k >= 3))
        .filter(|t| {
            let (a, b, c) = (coords[t.v[0]], coords[t.v[1]], coords[t.v[2]]);
            let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
            cross.abs() > 1e-12 * scale
        })
        .map(|t| [order[t.v[0] - 3], order[t.v[1] - 3], order[t.v[2] - 3]])
        .collect()
}

fn min_max(v: [f64; 3]) -> (f64, f64) {
    (v[0].min(v[1]).min(v[2]), v[0].max(v[1]).max(v[2]))
}

/// Triangles over a [`PointSet`] with a bucket grid for point location
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    triangles: Vec<[usize; 3]>,
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
    nx: usize,
    ny: usize,
    buckets: Vec<Vec<u32>>,
}

impl Triangulation {
    /// Triangulate the distinct coordinates of `points`. Fewer than three
    /// distinct points, or all of them on one line, give an empty
    /// triangulation.
    pub fn build(points: &PointSet) -> Self {
        let order = distinct_sorted(points);
        let triangles = delaunay(points, &order);
        debug!(
            points = points.len(),
            distinct = order.len(),
            triangles = triangles.len(),
            "Built Delaunay triangulation"
        );
        if triangles.is_empty() {
            return Self::default();
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for &i in &order {
            min_x = min_x.min(points.x(i));
            min_y = min_y.min(points.y(i));
            max_x = max_x.max(points.x(i));
            max_y = max_y.max(points.y(i));
        }

        let side = ((triangles.len() as f64).sqrt().ceil() as usize).max(1);
        let (nx, ny) = (side, side);
        let cell_w = (max_x - min_x) / nx as f64;
        let cell_h = (max_y - min_y) / ny as f64;

        let mut tri = Self {
            triangles,
            min_x,
            min_y,
            cell_w,
            cell_h,
            nx,
            ny,
            buckets: vec![Vec::new(); nx * ny],
        };

        for t in 0..tri.triangles.len() {
            let [a, b, c] = tri.triangles[t];
            let (lo_x, hi_x) = min_max([points.x(a), points.x(b), points.x(c)]);
            let (lo_y, hi_y) = min_max([points.y(a), points.y(b), points.y(c)]);
            let (c0, r0) = tri.cell_of(lo_x, lo_y);
            let (c1, r1) = tri.cell_of(hi_x, hi_y);
            for r in r0..=r1 {
                for col in c0..=c1 {
                    tri.buckets[r * nx + col].push(t as u32);
                }
            }
        }
        tri
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Vertex indices of every triangle
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp = |v: f64, n: usize| {
            if v.is_finite() && v > 0.0 {
                (v as usize).min(n - 1)
            } else {
                0
            }
        };
        (
            clamp((x - self.min_x) / self.cell_w, self.nx),
            clamp((y - self.min_y) / self.cell_h, self.ny),
        )
    }

    /// Linearly interpolated value at (qx, qy), or `None` outside every
    /// triangle. The first enclosing triangle in build order wins on shared
    /// edges.
    pub fn interpolate(&self, points: &PointSet, qx: f64, qy: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let (c, r) = self.cell_of(qx, qy);
        for &t in &self.buckets[r * self.nx + c] {
            let [i0, i1, i2] = self.triangles[t as usize];
            let p0 = (points.x(i0), points.y(i0));
            let p1 = (points.x(i1), points.y(i1));
            let p2 = (points.x(i2), points.y(i2));
            let (u, v, w) = barycentric(qx, qy, p0, p1, p2);
            if u >= EDGE_TOLERANCE && v >= EDGE_TOLERANCE && w >= EDGE_TOLERANCE {
                return Some(u * points.value(i0) + v * points.value(i1) + w * points.value(i2));
            }
        }
        None
    }
}
