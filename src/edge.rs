//! A module for working with weighted edges.

use serde::Serialize;

use crate::error::{Error, Result};

/// The weight given to edges whose row omits it or carries something that isn't a finite number.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A weighted pair of vertices. Edges don't have a direction, despite the `source`-`target`
/// nomenclature used.
#[derive(Clone, Debug, Serialize)]
pub struct Edge {
    source: String,
    target: String,
    weight: f64,
}

impl Edge {
    /// Creates a new edge from two vertices and a weight.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::edge::Edge;
    ///
    /// let edge = Edge::new("a", "b", 0.5);
    /// assert_eq!(edge, Edge::new("b", "a", 0.5));
    /// ```
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }

    /// Parses a `(source, target[, weight])` token row.
    ///
    /// A missing, non-numeric or non-finite weight falls back to [`DEFAULT_WEIGHT`]. Tokens past
    /// the third are ignored. `row` is only used to locate the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::edge::Edge;
    ///
    /// let edge = Edge::from_tokens(1, &["TP53", "MDM2", "0.82"]).unwrap();
    /// assert_eq!(edge.weight(), 0.82);
    ///
    /// let edge = Edge::from_tokens(2, &["TP53", "MDM2", "n/a"]).unwrap();
    /// assert_eq!(edge.weight(), 1.0);
    ///
    /// assert!(Edge::from_tokens(3, &["TP53"]).is_err());
    /// ```
    pub fn from_tokens<S: AsRef<str>>(row: usize, tokens: &[S]) -> Result<Self> {
        let (source, target) = match tokens {
            [source, target, ..] => (source.as_ref(), target.as_ref()),
            _ => {
                return Err(Error::Parse {
                    row,
                    tokens: tokens.len(),
                })
            }
        };

        let weight = tokens
            .get(2)
            .and_then(|token| token.as_ref().parse::<f64>().ok())
            .filter(|weight| weight.is_finite())
            .unwrap_or(DEFAULT_WEIGHT);

        Ok(Self::new(source, target, weight))
    }

    /// Returns the first vertex forming the edge.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the second vertex forming the edge.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the weight of the edge.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns whether the edge contains the given vertex.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::edge::Edge;
    ///
    /// let edge = Edge::new("a", "b", 1.0);
    ///
    /// assert_eq!(edge.contains("a"), true);
    /// assert_eq!(edge.contains("b"), true);
    /// assert_eq!(edge.contains("c"), false);
    /// ```
    pub fn contains(&self, vertex: &str) -> bool {
        self.source == vertex || self.target == vertex
    }

    /// Returns whether both ends of the edge are the same vertex.
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    /// Returns whether the two edges join the same pair of vertices, regardless of weight or
    /// orientation.
    pub fn same_pair(&self, other: &Edge) -> bool {
        self.key() == other.key()
    }

    /// An orientation-independent key for the vertex pair.
    pub(crate) fn key(&self) -> (&str, &str) {
        // This ensures the key is the same for (a, b) as it is for (b, a).
        if self.source <= self.target {
            (&self.source, &self.target)
        } else {
            (&self.target, &self.source)
        }
    }

    /// Adds to the weight, saturating at the largest finite values.
    pub(crate) fn add_weight(&mut self, weight: f64) {
        self.weight = (self.weight + weight).clamp(f64::MIN, f64::MAX);
    }
}

//
// Trait implementations
//

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.same_pair(other) && self.weight == other.weight
    }
}
