//! Force laws of the layout simulation.
//!
//! Every function here adds to a force buffer computed from a snapshot of the positions, it never
//! moves a vertex.

use nalgebra::{Point2, Vector2};
use rand::{rngs::StdRng, Rng};

use super::{quadtree::QuadTree, LayoutConfig};
use crate::graph::Graph;

/// Magnitude of the random nudge separating vertices that sit on top of each other.
const JIGGLE: f64 = 1e-6;

/// A tiny random displacement, drawn from the simulation's seeded generator.
pub(crate) fn jiggle(rng: &mut StdRng) -> Vector2<f64> {
    Vector2::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5) * JIGGLE
}

/// The many-body repulsion law: a vertex is pushed along the displacement to another charge by
/// `strength * charge / distance²`. A negative strength repels.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Repulsion {
    strength: f64,
    min_distance2: f64,
    /// The Barnes–Hut opening criterion, squared.
    pub theta2: f64,
}

impl Repulsion {
    pub fn new(strength: f64, min_distance: f64, theta: f64) -> Self {
        Self {
            strength,
            min_distance2: min_distance * min_distance,
            theta2: theta * theta,
        }
    }

    /// The force on a vertex from a charge at `delta` (from the vertex to the charge).
    pub fn between(&self, delta: Vector2<f64>, charge: f64) -> Vector2<f64> {
        let distance2 = delta.norm_squared().max(self.min_distance2);
        delta * (self.strength * charge / distance2)
    }
}

/// A spring per edge, precomputed from the graph.
#[derive(Clone, Debug)]
pub(crate) struct Link {
    source: usize,
    target: usize,
    strength: f64,
    /// Share of the correction taken by the target, the rest goes to the source.
    bias: f64,
}

/// Builds the springs of the graph. Self-loops don't pull on anything and are skipped.
///
/// The degrees used are the graph's, so denser vertices get weaker springs (when scaled) and take
/// a smaller share of each correction.
pub(crate) fn links(graph: &Graph, config: &LayoutConfig) -> Vec<Link> {
    graph
        .edges()
        .iter()
        .filter(|edge| !edge.is_loop())
        .filter_map(|edge| {
            let source = graph.index_of(edge.source())?;
            let target = graph.index_of(edge.target())?;

            let source_degree = graph.nodes()[source].degree() as f64;
            let target_degree = graph.nodes()[target].degree() as f64;

            let strength = if config.degree_scaled_links {
                config.link_strength / source_degree.min(target_degree)
            } else {
                config.link_strength
            };

            Some(Link {
                source,
                target,
                strength,
                bias: source_degree / (source_degree + target_degree),
            })
        })
        .collect()
}

/// Pulls (or pushes) the ends of each link towards `distance`.
pub(crate) fn apply_links(
    links: &[Link],
    distance: f64,
    positions: &[Point2<f64>],
    rng: &mut StdRng,
    forces: &mut [Vector2<f64>],
) {
    for link in links {
        let mut delta = positions[link.target] - positions[link.source];
        if delta == Vector2::zeros() {
            delta = jiggle(rng);
        }

        let length = delta.norm();
        let correction = delta * ((length - distance) / length * link.strength);

        forces[link.target] -= correction * link.bias;
        forces[link.source] += correction * (1.0 - link.bias);
    }
}

/// Exact pairwise repulsion, `O(n²)`.
pub(crate) fn apply_repulsion_exact(
    repulsion: &Repulsion,
    positions: &[Point2<f64>],
    rng: &mut StdRng,
    forces: &mut [Vector2<f64>],
) {
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            let mut delta = positions[j] - positions[i];
            if delta == Vector2::zeros() {
                delta = jiggle(rng);
            }

            let force = repulsion.between(delta, 1.0);
            forces[i] += force;
            forces[j] -= force;
        }
    }
}

/// Barnes–Hut approximated repulsion, `O(n log n)`.
pub(crate) fn apply_repulsion_approximate(
    repulsion: &Repulsion,
    positions: &[Point2<f64>],
    rng: &mut StdRng,
    forces: &mut [Vector2<f64>],
) {
    let tree = QuadTree::new(positions);

    for (i, force) in forces.iter_mut().enumerate() {
        tree.accumulate(i, positions, repulsion, rng, force);
    }
}

/// Translates every position so the centroid moves `strength` of the way to `center`.
pub(crate) fn apply_centering(center: Point2<f64>, strength: f64, positions: &mut [Point2<f64>]) {
    if positions.is_empty() {
        return;
    }

    let centroid = positions
        .iter()
        .fold(Vector2::zeros(), |sum, p| sum + p.coords)
        / positions.len() as f64;
    let shift = (centroid - center.coords) * strength;

    for p in positions {
        *p -= shift;
    }
}
