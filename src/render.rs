//! Render frames: the positioned nodes and edge segments a drawing surface consumes.

use nalgebra::Point2;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    graph::Graph,
    layout::Simulation,
};

/// A positioned vertex.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodePoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// A positioned edge, from `(x1, y1)` at the source to `(x2, y2)` at the target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeSegment {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Everything needed to draw one state of a layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Frame {
    pub nodes: Vec<NodePoint>,
    pub edges: Vec<EdgeSegment>,
}

impl Frame {
    /// Pairs the graph with positions given in vertex order.
    ///
    /// Fails with [`Error::PositionCount`] if there isn't exactly one position per vertex.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::Point2;
    ///
    /// use coexnet::graph::Graph;
    /// use coexnet::render::Frame;
    ///
    /// let graph = Graph::parse("A B 0.4\n").unwrap();
    /// let frame = Frame::new(&graph, &[Point2::new(0.0, 0.0), Point2::new(3.0, 4.0)]).unwrap();
    ///
    /// assert_eq!(frame.nodes[1].id, "B");
    /// assert_eq!((frame.edges[0].x2, frame.edges[0].y2), (3.0, 4.0));
    /// ```
    pub fn new(graph: &Graph, positions: &[Point2<f64>]) -> Result<Self> {
        if positions.len() != graph.node_count() {
            return Err(Error::PositionCount {
                expected: graph.node_count(),
                actual: positions.len(),
            });
        }

        let nodes = graph
            .nodes()
            .iter()
            .zip(positions)
            .map(|(node, p)| NodePoint {
                id: node.id().to_owned(),
                x: p.x,
                y: p.y,
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .filter_map(|edge| {
                let from = positions[graph.index_of(edge.source())?];
                let to = positions[graph.index_of(edge.target())?];

                Some(EdgeSegment {
                    source: edge.source().to_owned(),
                    target: edge.target().to_owned(),
                    weight: edge.weight(),
                    x1: from.x,
                    y1: from.y,
                    x2: to.x,
                    y2: to.y,
                })
            })
            .collect();

        Ok(Self { nodes, edges })
    }

    /// Captures the current positions of a simulation.
    pub fn capture(simulation: &Simulation) -> Self {
        Self::new(simulation.graph(), simulation.positions())
            .unwrap_or_else(|_| unreachable!("a simulation holds one position per vertex"))
    }
}
