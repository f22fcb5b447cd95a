//! A module for accumulating betweenness centrality one source at a time.

use crate::traversal::ShortestPaths;

/// This is an implementation of Ulrik Brandes's
/// A Faster Algorithm for Betweenness Centrality
/// http://snap.stanford.edu/class/cs224w-readings/brandes01centrality.pdf
/// the dependency accumulation of "Algorithm 1", fed by the weighted single-source searches of
/// the traversal module rather than a breadth-first search.
#[derive(Clone, Debug)]
pub(crate) struct Betweenness {
    counts: Vec<f64>,
    delta: Vec<f64>,
}

impl Betweenness {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            counts: vec![0.0; num_nodes],
            delta: vec![0.0; num_nodes],
        }
    }

    /// Back-propagates the dependencies of `paths.source` on every other vertex.
    pub fn accumulate(&mut self, paths: &ShortestPaths) {
        let ShortestPaths {
            source,
            sigma,
            predecessors,
            order,
            ..
        } = paths;

        for &v in order {
            self.delta[v] = 0.0;
        }

        // Vertices in order of non-increasing distance from the source.
        for &w in order.iter().rev() {
            for &v in &predecessors[w] {
                self.delta[v] += sigma[v] / sigma[w] * (1.0 + self.delta[w]);
            }
            if w != *source {
                self.counts[w] += self.delta[w];
            }
        }
    }

    /// Returns the centralities, in vertex order.
    ///
    /// Every pair is visited from both of its ends, normalised values are divided by
    /// `(n - 1)(n - 2)` and raw values by two. Graphs with two vertices or fewer have no
    /// intermediaries, their centralities are all zero.
    pub fn finish(self, normalize: bool) -> Vec<f64> {
        let num_nodes = self.counts.len();
        if num_nodes <= 2 {
            return vec![0.0; num_nodes];
        }

        let divisor: f64 = if normalize {
            ((num_nodes - 1) * (num_nodes - 2)) as f64
        } else {
            // non-normalized: everything is counted twice, so we must divide by two
            2.0
        };

        self.counts.into_iter().map(|b| b / divisor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::Graph, traversal::CostIndex};

    fn betweenness(text: &str, normalize: bool) -> Vec<f64> {
        let index = CostIndex::new(&Graph::parse(text).unwrap());
        let mut betweenness = Betweenness::new(index.len());

        for source in 0..index.len() {
            betweenness.accumulate(&index.shortest_paths(source));
        }

        betweenness.finish(normalize)
    }

    #[test]
    fn path() {
        let text = "a b\nb c\nc d\n";

        assert_eq!(betweenness(text, false), vec![0.0, 2.0, 2.0, 0.0]);
        assert_eq!(betweenness(text, true), vec![0.0, 2.0 / 3.0, 2.0 / 3.0, 0.0]);
    }

    #[test]
    fn star() {
        let b = betweenness("x a\nx b\nx c\nx d\n", true);

        assert_eq!(b, vec![1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn split_paths_share_credit() {
        // a-b-c and a-d-c are both shortest, b and d each carry half of the a-c pair.
        let b = betweenness("a b\nb c\na d\nd c\n", false);

        assert_eq!(b, vec![0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn weighted_detour() {
        // The a-c edge is expensive, so the a-c pair routes through b.
        let b = betweenness("a c 10\na b 1\nb c 1\n", false);

        assert_eq!(b, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn two_nodes() {
        assert_eq!(betweenness("a b\n", true), vec![0.0, 0.0]);
    }

    #[test]
    fn disconnected() {
        let b = betweenness("a b\nb c\nd e\n", false);

        assert_eq!(b, vec![0.0, 1.0, 0.0, 0.0, 0.0]);
    }
}
