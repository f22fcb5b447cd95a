//! Coexnet is a small toolkit for laying out and analysing gene co-expression networks, though it
//! can also apply more generally to undirected weighted graphs.
//!
//! # Basic usage
//!
//! The library is centered around the [`Graph`](graph::Graph) structure which is constructed once
//! from an edge list. A graph can then be laid out by a force-directed
//! [`Simulation`](layout::Simulation), and summarised by the
//! [`analytics`] engine.
//!
//! ```rust
//! use coexnet::analytics::{self, AnalyticsConfig};
//! use coexnet::graph::Graph;
//! use coexnet::layout::{self, LayoutConfig, Seeding, SimulationStatus};
//! use coexnet::render::Frame;
//!
//! // One `<source> <target> [weight]` row per line, weights are co-expression correlations.
//! let graph = Graph::parse(
//!     "TP53 MDM2 0.91\n\
//!      TP53 CDKN1A 0.84\n\
//!      MDM2 CDKN1A -0.32\n\
//!      BRCA1 BARD1\n",
//! )
//! .unwrap();
//!
//! // Compute the metrics report...
//! let analysis = analytics::compute(&graph, &AnalyticsConfig::default()).unwrap();
//! assert_eq!(analysis.metrics.num_nodes, 5);
//! assert!(!analysis.metrics.connected);
//! // ...path metrics are undefined on a disconnected graph.
//! assert_eq!(analysis.metrics.graph_diameter, None);
//!
//! // Lay the graph out and export a frame for drawing.
//! let result = layout::layout(&graph, LayoutConfig::default(), Seeding::Random(7)).unwrap();
//! assert_eq!(result.status, SimulationStatus::Converged);
//!
//! let frame = Frame::new(&graph, &result.positions).unwrap();
//! assert_eq!(frame.edges.len(), 4);
//! ```

pub mod analytics;
mod betweenness;
mod closeness;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod layout;
mod pagerank;
pub mod render;
mod traversal;

pub use error::{Error, Result};
