//! The analytics engine: a fixed-schema report of structural, path and centrality metrics.
//!
//! # Basic usage
//!
//! ```rust
//! use coexnet::analytics::{self, AnalyticsConfig};
//! use coexnet::graph::Graph;
//!
//! let graph = Graph::parse("A B\nB C\nC A\n").unwrap();
//! let analysis = analytics::compute(&graph, &AnalyticsConfig::default()).unwrap();
//!
//! assert_eq!(analysis.metrics.density, 1.0);
//! assert_eq!(analysis.metrics.clustering_coefficient, 1.0);
//! assert_eq!(analysis.metrics.graph_diameter, Some(1.0));
//! assert!(analysis.warnings.is_empty());
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    betweenness::Betweenness,
    closeness::Reach,
    error::{Error, Result},
    graph::Graph,
    pagerank::page_rank,
    traversal::CostIndex,
};

/// Tunables of the analytics engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Probability of following an edge rather than teleporting.
    pub page_rank_damping: f64,
    /// Per-vertex L1 tolerance of the power iteration.
    pub page_rank_tolerance: f64,
    pub page_rank_max_iterations: usize,
    /// Divide betweenness by the number of pairs not involving the vertex.
    pub normalize_betweenness: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            page_rank_damping: 0.85,
            page_rank_tolerance: 1e-6,
            page_rank_max_iterations: 100,
            normalize_betweenness: true,
        }
    }
}

/// The metrics report. Maps are keyed by vertex identifier.
///
/// The path metrics are only defined on connected graphs and are `None` (`null` once serialised)
/// otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub degree_distribution: BTreeMap<String, usize>,
    pub avg_degree: f64,
    pub density: f64,
    pub clustering_coefficient: f64,
    pub connected: bool,
    pub graph_diameter: Option<f64>,
    pub graph_radius: Option<f64>,
    pub avg_path_length: Option<f64>,
    pub page_rank: BTreeMap<String, f64>,
    pub betweenness_centrality: BTreeMap<String, f64>,
    pub closeness_centrality: BTreeMap<String, f64>,
}

/// Non-fatal conditions met while computing the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsWarning {
    /// A path metric was left undefined because the graph is disconnected.
    UndefinedMetric { metric: &'static str },
    /// The power iteration hit its cap before reaching the tolerance.
    PageRankNotConverged { iterations: usize },
}

/// The report along with the warnings raised while computing it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub metrics: Metrics,
    pub warnings: Vec<AnalyticsWarning>,
}

/// Computes the metrics report of a graph.
///
/// Fails with [`Error::EmptyGraph`] if the graph has no vertices, every other degenerate case is
/// expressed in the report itself.
pub fn compute(graph: &Graph, config: &AnalyticsConfig) -> Result<Analysis> {
    let never = AtomicBool::new(false);

    match analyse(graph, config, &never)? {
        Some(analysis) => Ok(analysis),
        // The flag is local and never raised.
        None => unreachable!("uncancellable analysis was cancelled"),
    }
}

/// Analytics running on a background thread.
///
/// The computation checks for cancellation between algorithms and between the sources of the
/// all-pairs searches; a cancelled task yields no result at all. Dropping the task cancels it, so
/// replacing the task when a new graph is loaded discards the stale computation.
///
/// ```rust
/// use std::sync::Arc;
///
/// use coexnet::analytics::{AnalyticsConfig, AnalyticsTask};
/// use coexnet::graph::Graph;
///
/// let graph = Arc::new(Graph::parse("A B\nB C\n").unwrap());
/// let task = AnalyticsTask::spawn(graph, AnalyticsConfig::default());
///
/// let analysis = task.join().unwrap().expect("not cancelled");
/// assert!(analysis.metrics.connected);
/// ```
#[derive(Debug)]
pub struct AnalyticsTask {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<Option<Analysis>>>>,
}

impl AnalyticsTask {
    /// Starts computing the report of `graph` on a new thread.
    pub fn spawn(graph: Arc<Graph>, config: AnalyticsConfig) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let handle = thread::spawn(move || analyse(&graph, &config, &flag));

        Self {
            cancelled,
            handle: Some(handle),
        }
    }

    /// Asks the computation to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns whether the thread is done, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the computation, returns `None` if the task was cancelled.
    pub fn join(mut self) -> Result<Option<Analysis>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };

        let analysis = match handle.join() {
            Ok(analysis) => analysis?,
            Err(payload) => panic::resume_unwind(payload),
        };

        // A result that raced a cancellation is discarded too.
        if self.is_cancelled() {
            return Ok(None);
        }

        Ok(analysis)
    }
}

impl Drop for AnalyticsTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
        }
    }
}

//
// Private
//

fn analyse(
    graph: &Graph,
    config: &AnalyticsConfig,
    cancelled: &AtomicBool,
) -> Result<Option<Analysis>> {
    macro_rules! checkpoint {
        () => {
            if cancelled.load(Ordering::Relaxed) {
                debug!("analytics cancelled");
                return Ok(None);
            }
        };
    }

    if graph.is_empty() {
        return Err(Error::EmptyGraph);
    }

    let num_nodes = graph.node_count();
    let num_edges = graph.edge_count();
    debug!(num_nodes, num_edges, "computing analytics");

    let ids: Vec<&str> = graph.nodes().iter().map(|node| node.id()).collect();
    let by_id = |values: &[f64]| -> BTreeMap<String, f64> {
        ids.iter()
            .zip(values)
            .map(|(id, value)| (id.to_string(), *value))
            .collect()
    };
    let mut warnings = Vec::new();

    let degree_distribution: BTreeMap<String, usize> = graph
        .nodes()
        .iter()
        .map(|node| (node.id().to_owned(), node.degree()))
        .collect();
    let degree_sum: usize = graph.nodes().iter().map(|node| node.degree()).sum();
    let avg_degree = degree_sum as f64 / num_nodes as f64;
    let density = graph.density();
    let clustering_coefficient = average_clustering(graph);

    checkpoint!();

    let index = CostIndex::new(graph);
    let connected = index.reachable_from(0).into_iter().all(|reached| reached);

    // One weighted search per source feeds every path-based measure.
    let mut betweenness = Betweenness::new(num_nodes);
    let mut reach = Vec::with_capacity(num_nodes);
    for source in 0..num_nodes {
        checkpoint!();

        let paths = index.shortest_paths(source);
        betweenness.accumulate(&paths);
        reach.push(Reach::new(&paths));
    }

    let (graph_diameter, graph_radius, avg_path_length) = if connected {
        let diameter = reach.iter().map(|r| r.eccentricity).fold(0.0, f64::max);
        let radius = reach
            .iter()
            .map(|r| r.eccentricity)
            .fold(f64::INFINITY, f64::min);
        let avg_path_length = if num_nodes > 1 {
            let total = reach
                .iter()
                .fold(0.0, |sum, r| (sum + r.total).min(f64::MAX));
            total / (num_nodes * (num_nodes - 1)) as f64
        } else {
            0.0
        };

        (Some(diameter), Some(radius), Some(avg_path_length))
    } else {
        for metric in ["graph_diameter", "graph_radius", "avg_path_length"] {
            warnings.push(AnalyticsWarning::UndefinedMetric { metric });
        }

        (None, None, None)
    };

    let closeness: Vec<f64> = reach.iter().map(Reach::closeness).collect();
    let betweenness = betweenness.finish(config.normalize_betweenness);

    checkpoint!();

    let page_rank = page_rank(
        graph.adjacency(),
        config.page_rank_damping,
        config.page_rank_tolerance,
        config.page_rank_max_iterations,
    );
    if !page_rank.converged {
        warnings.push(AnalyticsWarning::PageRankNotConverged {
            iterations: page_rank.iterations,
        });
    }

    for warning in &warnings {
        warn!(?warning, "analytics warning");
    }

    let metrics = Metrics {
        num_nodes,
        num_edges,
        degree_distribution,
        avg_degree,
        density,
        clustering_coefficient,
        connected,
        graph_diameter,
        graph_radius,
        avg_path_length,
        page_rank: by_id(page_rank.ranks.as_slice()),
        betweenness_centrality: by_id(&betweenness),
        closeness_centrality: by_id(&closeness),
    };

    debug!(
        connected,
        page_rank_iterations = page_rank.iterations,
        "computed analytics"
    );

    Ok(Some(Analysis { metrics, warnings }))
}

/// The mean over all vertices of the fraction of neighbour pairs that are themselves adjacent.
///
/// Neighbours are counted once however many parallel edges lead to them, self-loops are ignored.
/// Vertices with fewer than two distinct neighbours contribute 0.
fn average_clustering(graph: &Graph) -> f64 {
    let neighbours: Vec<HashSet<usize>> = graph
        .adjacency()
        .iter()
        .enumerate()
        .map(|(v, adjacent)| {
            adjacent
                .iter()
                .map(|&(w, _)| w)
                .filter(|&w| w != v)
                .collect()
        })
        .collect();

    let total: f64 = neighbours
        .iter()
        .map(|adjacent| {
            let k = adjacent.len();
            if k < 2 {
                return 0.0;
            }

            let triangles = adjacent
                .iter()
                .tuple_combinations()
                .filter(|(u, w)| neighbours[**u].contains(*w))
                .count();

            2.0 * triangles as f64 / (k * (k - 1)) as f64
        })
        .sum();

    total / neighbours.len() as f64
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn analysis(text: &str) -> Analysis {
        compute(&Graph::parse(text).unwrap(), &AnalyticsConfig::default()).unwrap()
    }

    /// A ring with one weighted chord per vertex.
    fn ring_with_chords(n: usize) -> Graph {
        let text: String = (0..n)
            .map(|i| format!("g{i} g{} 1\ng{i} g{} 2\n", (i + 1) % n, (i * 7 + 3) % n))
            .collect();

        Graph::parse(&text).unwrap()
    }

    #[test]
    fn empty_graph() {
        let err = compute(&Graph::default(), &AnalyticsConfig::default()).unwrap_err();

        assert!(matches!(err, Error::EmptyGraph));
    }

    #[test]
    fn triangle() {
        let Analysis { metrics, warnings } = analysis("A B\nB C\nC A\n");

        assert_eq!(metrics.num_nodes, 3);
        assert_eq!(metrics.num_edges, 3);
        assert_eq!(metrics.avg_degree, 2.0);
        assert_eq!(metrics.density, 1.0);
        assert_eq!(metrics.clustering_coefficient, 1.0);
        assert!(metrics.connected);
        assert_eq!(metrics.graph_diameter, Some(1.0));
        assert_eq!(metrics.graph_radius, Some(1.0));
        assert_eq!(metrics.avg_path_length, Some(1.0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn disjoint_edges() {
        let Analysis { metrics, warnings } = analysis("A B\nC D\n");

        assert!(!metrics.connected);
        assert_eq!(metrics.graph_diameter, None);
        assert_eq!(metrics.graph_radius, None);
        assert_eq!(metrics.avg_path_length, None);
        assert_eq!(
            warnings,
            vec![
                AnalyticsWarning::UndefinedMetric {
                    metric: "graph_diameter"
                },
                AnalyticsWarning::UndefinedMetric {
                    metric: "graph_radius"
                },
                AnalyticsWarning::UndefinedMetric {
                    metric: "avg_path_length"
                },
            ]
        );

        // Closeness is still computed within each component.
        assert_eq!(metrics.closeness_centrality["A"], 1.0);
        assert_eq!(metrics.closeness_centrality["D"], 1.0);
    }

    #[test]
    fn weighted_path_metrics() {
        let Analysis { metrics, .. } = analysis("A B 2\nB C 3\n");

        assert_eq!(metrics.graph_diameter, Some(5.0));
        assert_eq!(metrics.graph_radius, Some(3.0));
        // (2 + 5 + 2 + 3 + 5 + 3) / 6
        assert_eq!(metrics.avg_path_length, Some(20.0 / 6.0));
    }

    #[test]
    fn single_node() {
        let graph = Graph::builder().node("X").build();
        let Analysis { metrics, warnings } = compute(&graph, &AnalyticsConfig::default()).unwrap();

        assert_eq!(metrics.num_nodes, 1);
        assert_eq!(metrics.avg_degree, 0.0);
        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.clustering_coefficient, 0.0);
        assert!(metrics.connected);
        assert_eq!(metrics.graph_diameter, Some(0.0));
        assert_eq!(metrics.graph_radius, Some(0.0));
        assert_eq!(metrics.avg_path_length, Some(0.0));
        assert!((metrics.page_rank["X"] - 1.0).abs() < 1e-12);
        assert_eq!(metrics.betweenness_centrality["X"], 0.0);
        assert_eq!(metrics.closeness_centrality["X"], 0.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn clustering() {
        // A closes one of the three pairs of its neighbours, B and C have complete neighbourhoods
        // and D is a leaf: (1/3 + 1 + 1 + 0) / 4.
        let Analysis { metrics, .. } = analysis("A B\nA C\nA D\nB C\n");

        assert!((metrics.clustering_coefficient - (1.0 / 3.0 + 2.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn clustering_ignores_loops_and_parallel_edges() {
        let Analysis { metrics, .. } = analysis("A B\nA B\nA A\n");

        assert_eq!(metrics.clustering_coefficient, 0.0);
        assert_eq!(metrics.degree_distribution["A"], 4);
    }

    #[test]
    fn degree_distribution() {
        let Analysis { metrics, .. } = analysis("A B\nA C\n");

        assert_eq!(
            metrics.degree_distribution,
            BTreeMap::from([("A".into(), 2), ("B".into(), 1), ("C".into(), 1)])
        );
    }

    #[test]
    fn page_rank_warning() {
        let graph = Graph::parse("A B\nB C 3\n").unwrap();
        let config = AnalyticsConfig {
            page_rank_tolerance: 0.0,
            page_rank_max_iterations: 3,
            ..Default::default()
        };
        let Analysis { warnings, .. } = compute(&graph, &config).unwrap();

        assert_eq!(
            warnings,
            vec![AnalyticsWarning::PageRankNotConverged { iterations: 3 }]
        );
    }

    #[test]
    fn serialises_undefined_metrics_as_null() {
        let Analysis { metrics, .. } = analysis("A B\nC D\n");
        let json = serde_json::to_value(&metrics).unwrap();

        assert!(json["graph_diameter"].is_null());
        assert!(json["graph_radius"].is_null());
        assert!(json["avg_path_length"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 13);
    }

    #[test]
    fn background_task() {
        let graph = Arc::new(Graph::parse("A B\nB C\nC D\n").unwrap());
        let task = AnalyticsTask::spawn(Arc::clone(&graph), AnalyticsConfig::default());
        let background = task.join().unwrap().unwrap();

        assert_eq!(background, compute(&graph, &AnalyticsConfig::default()).unwrap());
    }

    #[test]
    fn cancelled_task_yields_nothing() {
        let graph = Arc::new(Graph::parse("A B\nB C\nC D\n").unwrap());
        let task = AnalyticsTask::spawn(graph, AnalyticsConfig::default());
        task.cancel();

        assert!(task.is_cancelled());
        assert_eq!(task.join().unwrap(), None);
    }

    #[test]
    fn raised_flag_stops_before_the_report_is_built() {
        let graph = Graph::parse("A B\nB C\nC D\n").unwrap();
        let cancelled = AtomicBool::new(true);

        assert_eq!(
            analyse(&graph, &AnalyticsConfig::default(), &cancelled).unwrap(),
            None
        );
    }

    #[test]
    fn cancellation_interrupts_the_searches() {
        let graph = Arc::new(ring_with_chords(1500));

        let started = Instant::now();
        compute(&graph, &AnalyticsConfig::default()).unwrap();
        let full = started.elapsed();

        let task = AnalyticsTask::spawn(Arc::clone(&graph), AnalyticsConfig::default());
        thread::sleep(full / 10);

        let cancelled_at = Instant::now();
        task.cancel();
        assert_eq!(task.join().unwrap(), None);
        let stopped = cancelled_at.elapsed();

        assert!(
            stopped < full / 4,
            "took {stopped:?} to stop, a full run takes {full:?}"
        );
    }

    #[test]
    fn huge_weights_keep_path_metrics_defined() {
        let Analysis { metrics, warnings } = analysis("A B 1e308\nB C 1e308\n");

        assert!(metrics.connected);
        assert_eq!(metrics.graph_diameter, Some(f64::MAX));
        assert_eq!(metrics.graph_radius, Some(1e308));
        assert!(metrics.avg_path_length.unwrap().is_finite());
        assert!(warnings.is_empty());

        let json = serde_json::to_value(&metrics).unwrap();
        assert!(json["graph_diameter"].is_number());
        assert!(json["avg_path_length"].is_number());
    }

    #[test]
    fn background_task_reports_errors() {
        let task = AnalyticsTask::spawn(Arc::new(Graph::default()), AnalyticsConfig::default());

        assert!(matches!(task.join(), Err(Error::EmptyGraph)));
    }
}
