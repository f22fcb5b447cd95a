//! PageRank by power iteration over the weighted adjacency lists.

use nalgebra::DVector;

/// The outcome of the power iteration.
#[derive(Clone, Debug)]
pub(crate) struct PageRank {
    /// Ranks in vertex order, summing to 1.
    pub ranks: DVector<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Iterates `x = d (Mᵀx + s/n) + (1 - d)/n` where `M` is the row-normalised matrix of weight
/// magnitudes and `s` the rank held by dangling vertices (vertices without weighted edges), which
/// is spread uniformly.
///
/// `adjacency` lists the `(neighbour, weight)` pairs of each vertex, so memory stays linear in the
/// size of the graph. Stops once the L1 change drops below `n * tolerance` or after
/// `max_iterations`.
pub(crate) fn page_rank(
    adjacency: &[Vec<(usize, f64)>],
    damping: f64,
    tolerance: f64,
    max_iterations: usize,
) -> PageRank {
    let n = adjacency.len();
    if n == 0 {
        return PageRank {
            ranks: DVector::zeros(0),
            iterations: 0,
            converged: true,
        };
    }

    let size = n as f64;

    // Rows are scaled by their largest weight before summing so huge weights can't overflow.
    let scale: Vec<f64> = adjacency
        .iter()
        .map(|adjacent| adjacent.iter().map(|(_, w)| w.abs()).fold(0.0, f64::max))
        .collect();
    let out_weight: Vec<f64> = adjacency
        .iter()
        .zip(&scale)
        .map(|(adjacent, &scale)| {
            if scale > 0.0 {
                adjacent.iter().map(|(_, w)| w.abs() / scale).sum()
            } else {
                0.0
            }
        })
        .collect();

    let teleport = (1.0 - damping) / size;
    let mut ranks = DVector::from_element(n, 1.0 / size);

    for iteration in 1..=max_iterations {
        let dangling: f64 = ranks
            .iter()
            .zip(&out_weight)
            .filter(|(_, weight)| **weight <= 0.0)
            .map(|(rank, _)| rank)
            .sum();

        let mut next = DVector::from_element(n, dangling / size);
        for (v, adjacent) in adjacency.iter().enumerate() {
            if out_weight[v] <= 0.0 {
                continue;
            }

            let share = ranks[v] / out_weight[v];
            for &(w, weight) in adjacent {
                next[w] += share * (weight.abs() / scale[v]);
            }
        }
        next *= damping;
        next.add_scalar_mut(teleport);

        let error = (&next - &ranks).abs().sum();
        ranks = next;

        if error < size * tolerance {
            return PageRank {
                ranks,
                iterations: iteration,
                converged: true,
            };
        }
    }

    PageRank {
        ranks,
        iterations: max_iterations,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    const DAMPING: f64 = 0.85;
    const TOLERANCE: f64 = 1e-6;

    fn ranks(text: &str, tolerance: f64, max_iterations: usize) -> PageRank {
        let graph = Graph::parse(text).unwrap();
        page_rank(graph.adjacency(), DAMPING, tolerance, max_iterations)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn empty() {
        let result = page_rank(&[], DAMPING, TOLERANCE, 100);

        assert!(result.ranks.is_empty());
        assert!(result.converged);
    }

    #[test]
    fn symmetric_graph_is_uniform() {
        let result = ranks("a b\nb c\nc a\n", TOLERANCE, 100);

        assert!(result.converged);
        for rank in result.ranks.iter() {
            assert_close(*rank, 1.0 / 3.0);
        }
    }

    #[test]
    fn hub_ranks_highest() {
        // Star centered on vertex 0.
        let result = ranks("x a\nx b\nx c\n", TOLERANCE, 100);

        assert_close(result.ranks.sum(), 1.0);
        for leaf in 1..4 {
            assert!(result.ranks[0] > result.ranks[leaf]);
        }
    }

    #[test]
    fn dangling_vertices_keep_the_floor() {
        // Vertex 2 only has a zero-weight edge, so it holds no outgoing weight.
        let result = ranks("a b\nc c 0\n", TOLERANCE, 100);

        assert_close(result.ranks.sum(), 1.0);
        assert!(result.ranks[2] >= (1.0 - DAMPING) / 3.0);
        assert!(result.ranks[0] > result.ranks[2]);
    }

    #[test]
    fn negative_weights_count_by_magnitude() {
        let positive = ranks("a b 0.5\nb c 2\n", TOLERANCE, 100);
        let negative = ranks("a b -0.5\nb c -2\n", TOLERANCE, 100);

        for (p, n) in positive.ranks.iter().zip(negative.ranks.iter()) {
            assert_close(*p, *n);
        }
        // c takes most of b's rank.
        assert!(positive.ranks[2] > positive.ranks[0]);
    }

    #[test]
    fn matches_the_dense_formulation() {
        let graph = Graph::parse("a b 0.3\nb c 1\nc a 2\nc d 0.7\nd d 1\n").unwrap();
        let dense = graph.adjacency_matrix();
        let result = page_rank(graph.adjacency(), DAMPING, TOLERANCE, 100);

        // One step of the dense iteration from the result must leave it (almost) unchanged.
        let n = dense.nrows() as f64;
        let mut transition = dense.clone();
        for mut row in transition.row_iter_mut() {
            let sum = row.sum();
            row /= sum;
        }
        let mut next = transition.transpose() * &result.ranks;
        next *= DAMPING;
        next.add_scalar_mut((1.0 - DAMPING) / n);

        for (a, b) in next.iter().zip(result.ranks.iter()) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn large_sparse_ring() {
        let n = 20_000;
        let adjacency: Vec<Vec<(usize, f64)>> = (0..n)
            .map(|i| vec![((i + n - 1) % n, 1.0), ((i + 1) % n, 1.0)])
            .collect();
        let result = page_rank(&adjacency, DAMPING, TOLERANCE, 100);

        assert!(result.converged);
        assert_close(result.ranks.sum(), 1.0);
        assert!(result.ranks.iter().all(|rank| (rank - 1.0 / n as f64).abs() < 1e-9));
    }

    #[test]
    fn huge_weights_do_not_overflow() {
        let result = ranks("a b 1e308\nb c 1e308\nc a 1e308\n", TOLERANCE, 100);

        assert!(result.converged);
        assert_close(result.ranks.sum(), 1.0);
        for rank in result.ranks.iter() {
            assert_close(*rank, 1.0 / 3.0);
        }
    }

    #[test]
    fn iteration_cap() {
        let result = ranks("a b\nb c 3\n", 0.0, 5);

        assert!(!result.converged);
        assert_eq!(result.iterations, 5);
        assert_close(result.ranks.sum(), 1.0);
    }
}
