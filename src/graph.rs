//! A module for working with graphs.

use std::{
    collections::{hash_map::Entry, HashMap},
    io::BufRead,
};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{edge::Edge, error::Result};

/// What to do with several rows joining the same pair of vertices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateEdges {
    /// Every row becomes its own edge and counts towards the degree of its endpoints.
    #[default]
    Keep,
    /// Rows for the same pair collapse into one edge carrying the sum of their weights. The
    /// merged edge keeps the position of the first row.
    Merge,
}

/// A vertex of the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Node {
    id: String,
    degree: usize,
}

impl Node {
    /// The identifier the vertex was declared with.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The number of edge ends incident to the vertex, a self-loop counts twice.
    pub fn degree(&self) -> usize {
        self.degree
    }
}

/// An immutable, undirected, weighted graph made up of edges.
///
/// Vertices are kept in the order they were first seen, the edges in the order they were
/// supplied. The adjacency index is built once on construction.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// A mapping of vertex identifiers to their position in `nodes`.
    index: HashMap<String, usize>,
    /// `(neighbour, weight)` pairs for each vertex, by index. A self-loop appears once.
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl Graph {
    /// Builds a graph from `(source, target[, weight])` token rows, keeping duplicate rows as
    /// separate edges.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::graph::Graph;
    ///
    /// let graph = Graph::build([["a", "b", "0.5"], ["b", "c", "x"]]).unwrap();
    ///
    /// assert_eq!(graph.node_count(), 3);
    /// assert_eq!(graph.edge_count(), 2);
    /// assert_eq!(graph.neighbors("b"), vec![("a", 0.5), ("c", 1.0)]);
    /// ```
    pub fn build<I, R, S>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        Ok(GraphBuilder::new().rows(rows)?.build())
    }

    /// Returns a builder for finer control over construction.
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    /// Parses a whitespace delimited edge list, one `<source> <target> [weight]` row per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Any other line with fewer than two
    /// tokens fails with [`Error::Parse`](crate::error::Error::Parse) carrying its 1-based line number.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::graph::Graph;
    ///
    /// let graph = Graph::parse("# genes\nTP53 MDM2 0.9\n\nMDM2 CDKN1A 0.7\n").unwrap();
    /// assert_eq!(graph.edge_count(), 2);
    ///
    /// assert!(Graph::parse("TP53 MDM2\nCDKN1A\n").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        Ok(GraphBuilder::new().parse(text)?.build())
    }

    /// Reads an edge list in the same format as [`Graph::parse`].
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Ok(GraphBuilder::new().read(reader)?.build())
    }

    /// Returns the vertices in first-seen order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the edges in input order (after duplicate handling).
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the `(neighbour, weight)` pairs of a vertex, empty if the vertex isn't in the
    /// graph.
    pub fn neighbors(&self, id: &str) -> Vec<(&str, f64)> {
        self.index_of(id)
            .map(|i| {
                self.adjacency[i]
                    .iter()
                    .map(|&(j, weight)| (self.nodes[j].id(), weight))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the degree of a vertex.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::graph::Graph;
    ///
    /// let graph = Graph::build([["a", "b"], ["a", "c"]]).unwrap();
    ///
    /// assert_eq!(graph.degree("a"), Some(2));
    /// assert_eq!(graph.degree("z"), None);
    /// ```
    pub fn degree(&self, id: &str) -> Option<usize> {
        self.index_of(id).map(|i| self.nodes[i].degree)
    }

    /// Returns the vertex count of the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the edge count of the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns whether the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks if the graph contains a vertex.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Computes the density of the graph, the ratio of edges with respect to the maximum possible
    /// edges. Graphs with fewer than two vertices have a density of 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use coexnet::graph::Graph;
    ///
    /// let graph = Graph::build([["a", "b"]]).unwrap();
    /// assert_eq!(graph.density(), 1.0);
    ///
    /// let graph = Graph::build([["a", "b"], ["a", "c"]]).unwrap();
    /// assert_eq!(graph.density(), 2.0 / 3.0);
    /// ```
    pub fn density(&self) -> f64 {
        let vc = self.node_count() as f64;
        let ec = self.edge_count() as f64;

        if vc < 2.0 {
            return 0.0;
        }

        // Calculate the total number of possible edges given a vertex count.
        let pec = vc * (vc - 1.0) / 2.0;
        // Actual edges divided by the possible edges gives the density.
        ec / pec
    }

    /// Constructs the weighted adjacency matrix for this graph, rows and columns follow the
    /// vertex order.
    ///
    /// Each edge adds the magnitude of its weight to both of its cells, a self-loop adds it to its
    /// diagonal cell once.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use coexnet::graph::Graph;
    ///
    /// let graph = Graph::build([["a", "b", "-0.5"]]).unwrap();
    /// assert_eq!(
    ///     graph.adjacency_matrix(),
    ///     dmatrix![0.0, 0.5;
    ///              0.5, 0.0]
    /// );
    /// ```
    pub fn adjacency_matrix(&self) -> DMatrix<f64> {
        let n = self.node_count();
        let mut matrix = DMatrix::<f64>::zeros(n, n);

        for (i, neighbours) in self.adjacency.iter().enumerate() {
            for &(j, weight) in neighbours {
                // The adjacency index already lists both directions of each edge.
                matrix[(i, j)] += weight.abs();
            }
        }

        matrix
    }

    //
    // Crate
    //

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn adjacency(&self) -> &[Vec<(usize, f64)>] {
        &self.adjacency
    }

    //
    // Private
    //

    fn intern(&mut self, id: &str) -> usize {
        if let Some(i) = self.index_of(id) {
            return i;
        }

        let i = self.nodes.len();
        self.nodes.push(Node {
            id: id.to_owned(),
            degree: 0,
        });
        self.index.insert(id.to_owned(), i);
        self.adjacency.push(Vec::new());

        i
    }

    fn insert(&mut self, edge: Edge) {
        let i = self.intern(edge.source());
        let j = self.intern(edge.target());
        let weight = edge.weight();

        self.adjacency[i].push((j, weight));
        self.nodes[i].degree += 1;

        // Both ends of a self-loop are the same vertex, list it once but count both ends.
        if i == j {
            self.nodes[i].degree += 1;
        } else {
            self.adjacency[j].push((i, weight));
            self.nodes[j].degree += 1;
        }

        self.edges.push(edge);
    }
}

/// Collects vertices and edges before freezing them into a [`Graph`].
///
/// # Examples
///
/// ```
/// use coexnet::graph::{DuplicateEdges, Graph};
///
/// let graph = Graph::builder()
///     .duplicates(DuplicateEdges::Merge)
///     .node("BRCA1")
///     .rows([["TP53", "MDM2", "0.25"], ["MDM2", "TP53", "0.5"]])
///     .unwrap()
///     .build();
///
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.edges()[0].weight(), 0.75);
/// ```
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    duplicates: DuplicateEdges,
    nodes: Vec<String>,
    edges: Vec<Edge>,
    rows: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duplicate edge policy, [`DuplicateEdges::Keep`] by default.
    pub fn duplicates(mut self, policy: DuplicateEdges) -> Self {
        self.duplicates = policy;
        self
    }

    /// Declares a vertex, which may end up without edges. Declaring an existing vertex is a no-op.
    pub fn node(mut self, id: impl Into<String>) -> Self {
        self.nodes.push(id.into());
        self
    }

    /// Adds an edge.
    pub fn edge(mut self, edge: Edge) -> Self {
        self.rows += 1;
        self.edges.push(edge);
        self
    }

    /// Adds token rows, see [`Edge::from_tokens`].
    pub fn rows<I, R, S>(mut self, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        for row in rows {
            self.rows += 1;
            self.edges.push(Edge::from_tokens(self.rows, row.as_ref())?);
        }

        Ok(self)
    }

    /// Adds the rows of an edge-list text, see [`Graph::parse`].
    pub fn parse(mut self, text: &str) -> Result<Self> {
        for (n, line) in text.lines().enumerate() {
            self.line(n + 1, line)?;
        }

        Ok(self)
    }

    /// Adds the rows read from an edge-list source, see [`Graph::parse`].
    pub fn read<R: BufRead>(mut self, reader: R) -> Result<Self> {
        for (n, line) in reader.lines().enumerate() {
            self.line(n + 1, &line?)?;
        }

        Ok(self)
    }

    /// Freezes the collected vertices and edges into a graph.
    pub fn build(self) -> Graph {
        let edges = match self.duplicates {
            DuplicateEdges::Keep => self.edges,
            DuplicateEdges::Merge => merge_duplicates(self.edges),
        };

        let mut graph = Graph::default();

        for id in &self.nodes {
            graph.intern(id);
        }

        for edge in edges {
            graph.insert(edge);
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            rows = self.rows,
            "built graph"
        );

        graph
    }

    fn line(&mut self, row: usize, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        self.rows += 1;
        self.edges.push(Edge::from_tokens(row, &tokens)?);

        Ok(())
    }
}

//
// Helpers
//

/// Collapses edges joining the same pair of vertices, summing their weights.
fn merge_duplicates(edges: Vec<Edge>) -> Vec<Edge> {
    let mut merged: Vec<Edge> = Vec::with_capacity(edges.len());
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for edge in edges {
        let (a, b) = edge.key();
        match positions.entry((a.to_owned(), b.to_owned())) {
            Entry::Occupied(entry) => merged[*entry.get()].add_weight(edge.weight()),
            Entry::Vacant(entry) => {
                entry.insert(merged.len());
                merged.push(edge);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use nalgebra::dmatrix;

    use super::*;
    use crate::error::Error;

    macro_rules! graph {
          ($($path:expr),*) => {{
              let mut builder = Graph::builder();

              $(
                  let mut iter = $path.into_iter().peekable();
                  while let (Some(a), Some(b)) = (iter.next(), iter.peek()) {
                      builder = builder.edge(Edge::new(a, *b, 1.0));
                  }

              )*

              builder.build()
          }}
      }

    #[test]
    fn build() {
        let graph = Graph::build([vec!["a", "b", "2"], vec!["b", "c"]]).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges()[0], Edge::new("a", "b", 2.0));
        assert_eq!(graph.edges()[1], Edge::new("b", "c", 1.0));
    }

    #[test]
    fn build_rejects_short_rows() {
        let err = Graph::build([vec!["a", "b"], vec!["c"]]).unwrap_err();

        assert!(matches!(err, Error::Parse { row: 2, tokens: 1 }));
    }

    #[test]
    fn build_empty() {
        let rows: Vec<Vec<&str>> = vec![];
        let graph = Graph::build(rows).unwrap();

        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn nodes_in_first_seen_order() {
        let graph = graph!(["c", "a", "b"], ["b", "d"]);
        let ids: Vec<&str> = graph.nodes().iter().map(Node::id).collect();

        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn redeclared_node_is_noop() {
        let graph = Graph::builder()
            .node("a")
            .node("a")
            .edge(Edge::new("a", "b", 1.0))
            .build();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.degree("a"), Some(1));
    }

    #[test]
    fn isolated_node() {
        let graph = Graph::builder().node("x").build();

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.degree("x"), Some(0));
        assert!(graph.neighbors("x").is_empty());
    }

    #[test]
    fn neighbors() {
        let graph = Graph::build([["a", "b", "0.5"], ["c", "a", "2"]]).unwrap();

        assert_eq!(graph.neighbors("a"), vec![("b", 0.5), ("c", 2.0)]);
        assert_eq!(graph.neighbors("b"), vec![("a", 0.5)]);
        assert!(graph.neighbors("z").is_empty());
    }

    #[test]
    fn degree() {
        let graph = graph!(["a", "b", "c"], ["b", "d"]);

        assert_eq!(graph.degree("a"), Some(1));
        assert_eq!(graph.degree("b"), Some(3));
        assert_eq!(graph.degree("c"), Some(1));
        assert_eq!(graph.degree("e"), None);
    }

    #[test]
    fn self_loop() {
        let graph = Graph::build([["a", "a"], ["a", "b"]]).unwrap();

        assert_eq!(graph.degree("a"), Some(3));
        assert_eq!(graph.neighbors("a"), vec![("a", 1.0), ("b", 1.0)]);
    }

    #[test]
    fn duplicates_kept() {
        let graph = Graph::build([["a", "b", "1"], ["b", "a", "2"]]).unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.degree("a"), Some(2));
        assert_eq!(graph.degree("b"), Some(2));
        assert_eq!(graph.density(), 2.0);
    }

    #[test]
    fn duplicates_merged() {
        let graph = Graph::builder()
            .duplicates(DuplicateEdges::Merge)
            .rows([["a", "b", "1"], ["b", "c", "1"], ["b", "a", "2"]])
            .unwrap()
            .build();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges()[0], Edge::new("a", "b", 3.0));
        assert_eq!(graph.degree("a"), Some(1));
        assert_eq!(graph.degree("b"), Some(2));
        assert_eq!(graph.density(), 2.0 / 3.0);
    }

    #[test]
    fn merged_weights_stay_finite() {
        let graph = Graph::builder()
            .duplicates(DuplicateEdges::Merge)
            .parse("a b 1e308\nb a 1e308\n")
            .unwrap()
            .build();

        assert_eq!(graph.edges()[0].weight(), f64::MAX);
    }

    #[test]
    fn parse() {
        let text = "# header\nA B 0.5\n   \nB\tC\nC A -0.25 trailing\n";
        let graph = Graph::parse(text).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edges()[2].weight(), -0.25);
    }

    #[test]
    fn parse_reports_line_numbers() {
        let err = Graph::parse("# header\nA B\n\nC\n").unwrap_err();

        assert!(matches!(err, Error::Parse { row: 4, tokens: 1 }));
    }

    #[test]
    fn from_reader() {
        let graph = Graph::from_reader("A B\nB C 2\n".as_bytes()).unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.neighbors("C"), vec![("B", 2.0)]);
    }

    #[test]
    fn node_count() {
        let graph = Graph::default();
        assert_eq!(graph.node_count(), 0);

        // Verify only one new vertex is added when one of them already exists in the graph.
        let graph = graph!(["a", "b"], ["a", "c"]);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn density() {
        assert_eq!(Graph::default().density(), 0.0);
        assert_eq!(Graph::builder().node("a").build().density(), 0.0);

        assert_eq!(graph!(["a", "b"]).density(), 1.0);
        assert_eq!(graph!(["a", "b", "c"]).density(), 2.0 / 3.0);
    }

    #[test]
    fn adjacency_matrix() {
        assert_eq!(Graph::default().adjacency_matrix(), dmatrix![]);

        let graph = Graph::build([["a", "b", "2"], ["a", "c", "-1"], ["c", "c", "3"]]).unwrap();
        assert_eq!(
            graph.adjacency_matrix(),
            dmatrix![0.0, 2.0, 1.0;
                     2.0, 0.0, 0.0;
                     1.0, 0.0, 3.0]
        );
    }
}
