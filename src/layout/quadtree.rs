//! A Barnes–Hut quadtree approximating the pairwise repulsion in `O(n log n)`.
//!
//! Cells far enough from a vertex (their side over the distance to their centre of charge is
//! below `theta`) are treated as a single charge carrying the count of vertices they hold. A cell
//! holding the vertex itself is always opened, so a vertex never repels itself.

use nalgebra::{Point2, Vector2};
use rand::rngs::StdRng;

use super::forces::{jiggle, Repulsion};

/// Past this depth vertices share a leaf rather than splitting further, which also bounds the
/// recursion when vertices sit on top of each other.
const MAX_DEPTH: usize = 24;

#[derive(Clone, Debug)]
enum Kind {
    Leaf(Vec<usize>),
    Internal([Option<usize>; 4]),
}

#[derive(Clone, Debug)]
struct Cell {
    /// Lower corner of the square cell.
    origin: Point2<f64>,
    /// Side length of the square cell.
    size: f64,
    /// Number of vertices in the cell.
    count: usize,
    /// Centre of charge, the mean position of the vertices in the cell.
    center: Point2<f64>,
    kind: Kind,
}

/// An arena of cells, the root is the first one.
#[derive(Clone, Debug)]
pub(crate) struct QuadTree {
    cells: Vec<Cell>,
}

impl QuadTree {
    pub fn new(positions: &[Point2<f64>]) -> Self {
        let mut tree = Self { cells: Vec::new() };
        if positions.is_empty() {
            return tree;
        }

        let (mut min, mut max) = (positions[0], positions[0]);
        for p in positions {
            min = min.inf(p);
            max = max.sup(p);
        }
        let size = (max - min).max().max(1.0);

        let all: Vec<usize> = (0..positions.len()).collect();
        tree.build(positions, all, min, size, 0);

        tree
    }

    /// Adds the repulsion of every other vertex on vertex `i` to `force`.
    pub fn accumulate(
        &self,
        i: usize,
        positions: &[Point2<f64>],
        repulsion: &Repulsion,
        rng: &mut StdRng,
        force: &mut Vector2<f64>,
    ) {
        if !self.cells.is_empty() {
            self.visit(0, i, positions, repulsion, rng, force);
        }
    }

    fn visit(
        &self,
        cell: usize,
        i: usize,
        positions: &[Point2<f64>],
        repulsion: &Repulsion,
        rng: &mut StdRng,
        force: &mut Vector2<f64>,
    ) {
        let Cell {
            origin,
            size,
            count,
            center,
            kind,
        } = &self.cells[cell];

        match kind {
            Kind::Leaf(points) => {
                for &j in points.iter().filter(|&&j| j != i) {
                    let mut delta = positions[j] - positions[i];
                    if delta == Vector2::zeros() {
                        delta = jiggle(rng);
                    }
                    *force += repulsion.between(delta, 1.0);
                }
            }
            Kind::Internal(children) => {
                let delta = *center - positions[i];
                let distance2 = delta.norm_squared();

                let far = distance2 > 0.0 && *size * *size < repulsion.theta2 * distance2;

                if far && !covers(*origin, *size, positions[i]) {
                    *force += repulsion.between(delta, *count as f64);
                    return;
                }

                for &child in children.iter().flatten() {
                    self.visit(child, i, positions, repulsion, rng, force);
                }
            }
        }
    }

    fn build(
        &mut self,
        positions: &[Point2<f64>],
        points: Vec<usize>,
        origin: Point2<f64>,
        size: f64,
        depth: usize,
    ) -> usize {
        let count = points.len();
        let center = Point2::from(
            points
                .iter()
                .fold(Vector2::zeros(), |sum, &j| sum + positions[j].coords)
                / count as f64,
        );

        let id = self.cells.len();
        self.cells.push(Cell {
            origin,
            size,
            count,
            center,
            kind: Kind::Leaf(Vec::new()),
        });

        if count <= 1 || depth >= MAX_DEPTH {
            self.cells[id].kind = Kind::Leaf(points);
            return id;
        }

        let half = size / 2.0;
        let mid = origin + Vector2::new(half, half);
        let mut quadrants: [Vec<usize>; 4] = Default::default();
        for j in points {
            let p = positions[j];
            let quadrant = usize::from(p.x >= mid.x) | usize::from(p.y >= mid.y) << 1;
            quadrants[quadrant].push(j);
        }

        let mut children = [None; 4];
        for (quadrant, points) in quadrants.into_iter().enumerate() {
            if points.is_empty() {
                continue;
            }

            let offset = Vector2::new(
                if quadrant & 1 == 1 { half } else { 0.0 },
                if quadrant & 2 == 2 { half } else { 0.0 },
            );
            let child = self.build(positions, points, origin + offset, half, depth + 1);
            children[quadrant] = Some(child);
        }

        self.cells[id].kind = Kind::Internal(children);
        id
    }
}

/// Whether `p` lies in the closed square at `origin`. Closed, so a vertex on a shared side makes
/// both neighbouring cells open.
fn covers(origin: Point2<f64>, size: f64, p: Point2<f64>) -> bool {
    p.x >= origin.x && p.x <= origin.x + size && p.y >= origin.y && p.y <= origin.y + size
}
