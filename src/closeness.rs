//! A module for per-source distance statistics: closeness centrality and eccentricity.

use crate::traversal::ShortestPaths;

/// Distance statistics of one source over the vertices it can reach.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Reach {
    /// Reachable vertices, the source excluded.
    pub count: usize,
    /// Sum of the distances to the reachable vertices, saturating at `f64::MAX`.
    pub total: f64,
    /// Largest distance to a reachable vertex.
    pub eccentricity: f64,
}

impl Reach {
    pub fn new(paths: &ShortestPaths) -> Self {
        paths.reachable().fold(Self::default(), |reach, d| Self {
            count: reach.count + 1,
            total: (reach.total + d).min(f64::MAX),
            eccentricity: reach.eccentricity.max(d),
        })
    }

    /// `(r - 1) / sum(d)` where `r` counts the source and the vertices it reaches.
    ///
    /// Isolated sources, or sources only reachable over zero-cost edges, score 0.
    pub fn closeness(&self) -> f64 {
        if self.count == 0 || self.total <= 0.0 {
            return 0.0;
        }

        self.count as f64 / self.total
    }
}
