//! Traversal primitives shared by the path metrics and the centrality measures.
//!
//! Every distance reported by the analytics goes through [`CostIndex::shortest_paths`], so the
//! diameter, the average path length, betweenness and closeness all agree on what "shortest"
//! means.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

use crate::graph::Graph;

/// Relative tolerance under which two path lengths are considered equal.
const EPSILON: f64 = 1e-9;

/// The traversal cost of each vertex's neighbours.
///
/// Costs are the magnitude of the edge weights, since co-expression weights can be negative
/// correlations. Parallel edges collapse to their cheapest member and self-loops are dropped as
/// they can never be part of a shortest path. Neighbours keep the order they were first listed in
/// the graph's adjacency index.
#[derive(Clone, Debug)]
pub(crate) struct CostIndex {
    neighbours: Vec<Vec<(usize, f64)>>,
}

/// The result of a single-source shortest path search.
#[derive(Clone, Debug)]
pub(crate) struct ShortestPaths {
    pub source: usize,
    /// Distance from the source, `f64::INFINITY` when unreachable.
    pub distance: Vec<f64>,
    /// Number of distinct shortest paths from the source.
    pub sigma: Vec<f64>,
    /// Predecessors on shortest paths, in discovery order.
    pub predecessors: Vec<Vec<usize>>,
    /// Reachable vertices in the order they were settled (non-decreasing distance).
    pub order: Vec<usize>,
}

impl ShortestPaths {
    /// Iterates over the distances to every reachable vertex other than the source.
    pub fn reachable(&self) -> impl Iterator<Item = f64> + '_ {
        self.order
            .iter()
            .filter(move |&&v| v != self.source)
            .map(move |&v| self.distance[v])
    }
}

impl CostIndex {
    pub fn new(graph: &Graph) -> Self {
        let neighbours = graph
            .adjacency()
            .iter()
            .enumerate()
            .map(|(v, adjacent)| {
                let mut costs: Vec<(usize, f64)> = Vec::with_capacity(adjacent.len());

                for &(w, weight) in adjacent {
                    if w == v {
                        continue;
                    }

                    let cost = weight.abs();
                    match costs.iter_mut().find(|(u, _)| *u == w) {
                        Some((_, existing)) => *existing = existing.min(cost),
                        None => costs.push((w, cost)),
                    }
                }

                costs
            })
            .collect();

        Self { neighbours }
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    /// Dijkstra's algorithm from `source`, counting shortest paths and recording predecessors
    /// along the way (the first phase of Brandes' algorithm).
    ///
    /// Vertices at equal distance are settled in the order they were discovered.
    pub fn shortest_paths(&self, source: usize) -> ShortestPaths {
        let n = self.len();

        let mut distance = vec![f64::INFINITY; n];
        let mut sigma = vec![0.0; n];
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut settled = vec![false; n];
        let mut order = Vec::with_capacity(n);

        // The sequence number keeps the heap stable between entries at the same distance.
        let mut seq = 0usize;
        let mut heap = BinaryHeap::new();

        distance[source] = 0.0;
        sigma[source] = 1.0;
        heap.push(Candidate {
            distance: 0.0,
            seq,
            vertex: source,
        });

        while let Some(Candidate {
            distance: d,
            vertex: v,
            ..
        }) = heap.pop()
        {
            if settled[v] {
                continue;
            }
            settled[v] = true;
            order.push(v);

            for &(w, cost) in &self.neighbours[v] {
                if settled[w] {
                    continue;
                }

                // Saturate so a reachable vertex never looks unreachable.
                let candidate = (d + cost).min(f64::MAX);
                let tie = approx_eq(candidate, distance[w]);

                if distance[w].is_infinite() || candidate < distance[w] && !tie {
                    distance[w] = candidate;
                    sigma[w] = sigma[v];
                    predecessors[w].clear();
                    predecessors[w].push(v);

                    seq += 1;
                    heap.push(Candidate {
                        distance: candidate,
                        seq,
                        vertex: w,
                    });
                } else if tie {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        ShortestPaths {
            source,
            distance,
            sigma,
            predecessors,
            order,
        }
    }

    /// Breadth-first search ignoring costs, returns which vertices are reachable from `source`.
    pub fn reachable_from(&self, source: usize) -> Vec<bool> {
        let mut visited = vec![false; self.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();

        visited[source] = true;
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            for &(next, _) in &self.neighbours[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        visited
    }
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// A heap entry, ordered so the `BinaryHeap` pops the closest, earliest discovered vertex first.
#[derive(Debug)]
struct Candidate {
    distance: f64,
    seq: usize,
    vertex: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: the max-heap must yield the smallest distance, then the smallest sequence.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
