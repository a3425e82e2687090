//! Point quadtree for range and neighbourhood queries
//!
//! Every internal node splits its rectangle at the midpoint of both axes and
//! owns exactly four children (SW, SE, NW, NE). A point goes west when
//! `x <= mid_x` and south when `y <= mid_y`. Splitting stops when a node
//! holds at most [`LEAF_CAPACITY`] points, when its rectangle has collapsed
//! to a single coordinate, or at [`MAX_DEPTH`].

use std::sync::Arc;

use geo_types::{coord, Rect};

use super::PointSet;

/// Largest point count kept in a leaf without splitting
pub const LEAF_CAPACITY: usize = 16;

/// Depth at which nodes stop splitting regardless of their count
pub const MAX_DEPTH: usize = 24;

#[derive(Debug)]
enum QuadNode {
    Leaf {
        rect: Rect<f64>,
        indices: Vec<usize>,
    },
    Branch {
        rect: Rect<f64>,
        children: Box<[QuadNode; 4]>,
    },
}

impl QuadNode {
    fn rect(&self) -> &Rect<f64> {
        match self {
            QuadNode::Leaf { rect, .. } | QuadNode::Branch { rect, .. } => rect,
        }
    }
}

/// Quadtree over the coordinates of a shared [`PointSet`]
#[derive(Debug)]
pub struct QuadTree {
    points: Arc<PointSet>,
    root: Option<QuadNode>,
}

impl QuadTree {
    /// Build the tree over all points.
    pub fn build(points: Arc<PointSet>) -> Self {
        let root = points.bounds().map(|rect| {
            let indices: Vec<usize> = (0..points.len()).collect();
            build_node(&points, rect, indices, 0)
        });
        Self { points, root }
    }

    pub fn points(&self) -> &Arc<PointSet> {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Root rectangle (the bounding box of all points)
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.root.as_ref().map(|n| *n.rect())
    }

    /// Indices of all points inside `[min_x, max_x] x [min_y, max_y]`
    /// (boundaries included), appended to `out` in tree order.
    pub fn query_into(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64, out: &mut Vec<usize>) {
        if let Some(root) = &self.root {
            let window = Window {
                min_x,
                min_y,
                max_x,
                max_y,
            };
            query_node(&self.points, root, &window, out);
        }
    }

    /// Indices of all points inside `rect`, boundaries included
    pub fn query(&self, rect: &Rect<f64>) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_into(rect.min().x, rect.min().y, rect.max().x, rect.max().y, &mut out);
        out
    }

    /// Maximum depth of the built tree (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn depth_of(node: &QuadNode) -> usize {
            match node {
                QuadNode::Leaf { .. } => 0,
                QuadNode::Branch { children, .. } => {
                    1 + children.iter().map(depth_of).max().unwrap_or(0)
                }
            }
        }
        self.root.as_ref().map_or(0, depth_of)
    }
}

struct Window {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Window {
    fn intersects(&self, rect: &Rect<f64>) -> bool {
        rect.min().x <= self.max_x
            && rect.max().x >= self.min_x
            && rect.min().y <= self.max_y
            && rect.max().y >= self.min_y
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

fn build_node(points: &PointSet, rect: Rect<f64>, indices: Vec<usize>, depth: usize) -> QuadNode {
    let collapsed = rect.width() == 0.0 && rect.height() == 0.0;
    if indices.len() <= LEAF_CAPACITY || depth >= MAX_DEPTH || collapsed {
        return QuadNode::Leaf { rect, indices };
    }

    // A zero-extent axis keeps mid == min, so every point lands on the
    // low side and only the other axis is effectively split.
    let (min, max) = (rect.min(), rect.max());
    let mid_x = min.x + (max.x - min.x) * 0.5;
    let mid_y = min.y + (max.y - min.y) * 0.5;

    let mut buckets: [Vec<usize>; 4] = Default::default();
    for i in indices {
        let east = points.x(i) > mid_x;
        let north = points.y(i) > mid_y;
        buckets[usize::from(east) + 2 * usize::from(north)].push(i);
    }

    let rects = [
        Rect::new(min, coord! { x: mid_x, y: mid_y }),
        Rect::new(coord! { x: mid_x, y: min.y }, coord! { x: max.x, y: mid_y }),
        Rect::new(coord! { x: min.x, y: mid_y }, coord! { x: mid_x, y: max.y }),
        Rect::new(coord! { x: mid_x, y: mid_y }, max),
    ];

    let [sw, se, nw, ne] = buckets;
    let children = Box::new([
        build_node(points, rects[0], sw, depth + 1),
        build_node(points, rects[1], se, depth + 1),
        build_node(points, rects[2], nw, depth + 1),
        build_node(points, rects[3], ne, depth + 1),
    ]);
    QuadNode::Branch { rect, children }
}

fn query_node(points: &PointSet, node: &QuadNode, window: &Window, out: &mut Vec<usize>) {
    if !window.intersects(node.rect()) {
        return;
    }
    match node {
        QuadNode::Leaf { indices, .. } => out.extend(
            indices
                .iter()
                .copied()
                .filter(|&i| window.contains(points.x(i), points.y(i))),
        ),
        QuadNode::Branch { children, .. } => {
            for child in children.iter() {
                query_node(points, child, window, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_of(coords: &[(f64, f64)]) -> QuadTree {
        let x = coords.iter().map(|c| c.0).collect();
        let y = coords.iter().map(|c| c.1).collect();
        let z = vec![0.0; coords.len()];
        QuadTree::build(Arc::new(PointSet::new(x, y, z).unwrap()))
    }

    fn brute_force(coords: &[(f64, f64)], r: &Rect<f64>) -> Vec<usize> {
        coords
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.0 >= r.min().x && c.0 <= r.max().x && c.1 >= r.min().y && c.1 <= r.max().y
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn test_empty_tree() {
        let tree = tree_of(&[]);
        assert!(tree.is_empty());
        assert!(tree.bounds().is_none());
        assert!(tree.query(&Rect::new((0.0, 0.0), (1.0, 1.0))).is_empty());
    }

    #[test]
    fn test_small_set_is_single_leaf() {
        let tree = tree_of(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.5)]);
        assert_eq!(tree.depth(), 0);
        assert_eq!(sorted(tree.query(&Rect::new((0.5, 0.0), (2.0, 1.0)))), vec![1, 2]);
    }

    #[test]
    fn test_grid_queries_match_brute_force() {
        let coords: Vec<(f64, f64)> = (0..40)
            .flat_map(|i| (0..25).map(move |j| (i as f64 * 0.5, j as f64 * 0.75)))
            .collect();
        let tree = tree_of(&coords);
        assert!(tree.depth() > 1);

        for r in [
            Rect::new((0.0, 0.0), (19.5, 18.0)),
            Rect::new((2.5, 3.0), (7.5, 9.0)),
            Rect::new((-5.0, -5.0), (0.0, 0.0)),
            Rect::new((10.0, 4.5), (10.0, 4.5)),
            Rect::new((100.0, 100.0), (101.0, 101.0)),
        ] {
            assert_eq!(sorted(tree.query(&r)), brute_force(&coords, &r));
        }
    }

    #[test]
    fn test_collinear_points() {
        let coords: Vec<(f64, f64)> = (0..200).map(|i| (3.0, i as f64)).collect();
        let tree = tree_of(&coords);
        let r = Rect::new((2.0, 10.0), (3.0, 57.5));
        assert_eq!(sorted(tree.query(&r)), brute_force(&coords, &r));
        assert!(tree.query(&Rect::new((3.1, 0.0), (4.0, 300.0))).is_empty());
    }

    #[test]
    fn test_identical_points() {
        let coords = vec![(1.5, -2.0); 500];
        let tree = tree_of(&coords);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.query(&Rect::new((1.5, -2.0), (1.5, -2.0))).len(), 500);
        assert!(tree.query(&Rect::new((0.0, 0.0), (1.0, 1.0))).is_empty());
    }

    #[test]
    fn test_every_point_in_exactly_one_leaf() {
        let coords: Vec<(f64, f64)> = (0..300)
            .map(|i| {
                let t = i as f64 * 0.37;
                ((t * 7.3).sin() * 50.0, (t * 3.1).cos() * 20.0)
            })
            .collect();
        let tree = tree_of(&coords);
        let all = tree.query(&tree.bounds().unwrap());
        assert_eq!(sorted(all), (0..300).collect::<Vec<_>>());
    }
}
