//! The layout engine: a force-directed simulation assigning 2D coordinates to the vertices of a
//! graph.
//!
//! Linked vertices are pulled towards a target separation, every pair of vertices repels and the
//! whole layout is kept centred. A temperature, `alpha`, scales the forces and decays each tick
//! until it drops below `alpha_min`.
//!
//! The simulation is driven by its caller, one [`Simulation::step`] per tick, so it can be paced
//! by any scheduler (an animation frame, a task queue, a test loop) and read between ticks.
//!
//! # Basic usage
//!
//! ```rust
//! use coexnet::graph::Graph;
//! use coexnet::layout::{LayoutConfig, Seeding, Simulation, SimulationStatus};
//!
//! let graph = Graph::parse("A B\nB C\nC A\n").unwrap();
//! let mut simulation = Simulation::new(&graph, LayoutConfig::default(), Seeding::Random(42)).unwrap();
//!
//! while simulation.step() == SimulationStatus::Running {
//!     // Draw `simulation.positions()`...
//! }
//!
//! assert_eq!(simulation.status(), SimulationStatus::Converged);
//! ```

mod forces;
mod quadtree;

use std::f64::consts::PI;

use nalgebra::{Point2, Vector2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    graph::Graph,
};

use self::forces::{Link, Repulsion};

/// Tunables of the layout simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Target separation of linked vertices.
    pub link_distance: f64,
    pub link_strength: f64,
    /// Divide each link's strength by the smaller degree of its two ends.
    pub degree_scaled_links: bool,
    /// Strength of the pairwise force, negative values repel.
    pub charge_strength: f64,
    /// Distances below this are clamped when computing the pairwise force.
    pub min_distance: f64,
    /// Barnes–Hut opening criterion.
    pub theta: f64,
    /// Vertex count from which the pairwise force is approximated with a quadtree.
    pub barnes_hut_threshold: usize,
    /// Point the centroid of the layout is pulled to, by default the middle of a 600×400 canvas.
    pub center: [f64; 2],
    pub center_strength: f64,
    /// Fraction of the velocity kept from one tick to the next.
    pub damping: f64,
    /// Factor applied to `alpha` after each tick.
    pub alpha_decay: f64,
    /// The simulation converges once `alpha` drops below this.
    pub alpha_min: f64,
    /// Hard cap on the number of ticks of a run.
    pub max_ticks: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 50.0,
            link_strength: 1.0,
            degree_scaled_links: true,
            charge_strength: -300.0,
            min_distance: 1.0,
            theta: 0.9,
            barnes_hut_threshold: 64,
            center: [300.0, 200.0],
            center_strength: 1.0,
            damping: 0.9,
            alpha_decay: 0.99,
            alpha_min: 0.001,
            max_ticks: 1000,
        }
    }
}

/// Initial positions of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Seeding {
    /// Spread the vertices on a spiral around the center, jittered by a generator seeded with the
    /// value.
    Random(u64),
    /// Start from the given positions, one per vertex in graph order.
    Fixed(Vec<(f64, f64)>),
}

/// Where a simulation is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    /// Not started, or reset after a run.
    Idle,
    Running,
    /// `alpha` dropped below its minimum, or the tick cap was reached (see [`LayoutWarning`]).
    Converged,
    /// Reset while running, the positions of the last tick are kept.
    Cancelled,
}

/// Non-fatal conditions met during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutWarning {
    /// The run stopped on `max_ticks` with `alpha` still above `alpha_min`.
    TickCapReached { ticks: usize },
}

/// A snapshot of a finished (or cancelled) run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutResult {
    pub status: SimulationStatus,
    pub ticks: usize,
    pub alpha: f64,
    pub positions: Vec<Point2<f64>>,
    pub warning: Option<LayoutWarning>,
}

/// Lays a graph out in one go, see [`Simulation::run`].
pub fn layout(graph: &Graph, config: LayoutConfig, seeding: Seeding) -> Result<LayoutResult> {
    Ok(Simulation::new(graph, config, seeding)?.run())
}

/// The state of a force simulation over a graph.
///
/// Positions are only ever written by [`Simulation::step`], which updates them all at once; a
/// reader between two steps always sees a completed tick.
#[derive(Clone, Debug)]
pub struct Simulation<'g> {
    graph: &'g Graph,
    config: LayoutConfig,
    links: Vec<Link>,
    repulsion: Repulsion,
    rng: StdRng,
    positions: Vec<Point2<f64>>,
    velocities: Vec<Vector2<f64>>,
    /// Scratch buffer for the forces of a tick.
    forces: Vec<Vector2<f64>>,
    alpha: f64,
    ticks: usize,
    status: SimulationStatus,
    warning: Option<LayoutWarning>,
}

impl<'g> Simulation<'g> {
    /// Creates an idle simulation.
    ///
    /// Fails with [`Error::EmptyGraph`] if the graph has no vertices, or with
    /// [`Error::PositionCount`] if fixed positions don't match the vertex count.
    pub fn new(graph: &'g Graph, config: LayoutConfig, seeding: Seeding) -> Result<Self> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::EmptyGraph);
        }

        let (positions, rng) = match seeding {
            Seeding::Random(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                (scatter(n, &config, &mut rng), rng)
            }
            Seeding::Fixed(positions) => {
                if positions.len() != n {
                    return Err(Error::PositionCount {
                        expected: n,
                        actual: positions.len(),
                    });
                }

                let positions = positions.into_iter().map(|(x, y)| Point2::new(x, y)).collect();
                (positions, StdRng::seed_from_u64(0))
            }
        };

        let links = forces::links(graph, &config);
        let repulsion = Repulsion::new(config.charge_strength, config.min_distance, config.theta);

        debug!(
            nodes = n,
            links = links.len(),
            approximate = n >= config.barnes_hut_threshold,
            "created layout simulation"
        );

        Ok(Self {
            graph,
            config,
            links,
            repulsion,
            rng,
            positions,
            velocities: vec![Vector2::zeros(); n],
            forces: vec![Vector2::zeros(); n],
            alpha: 1.0,
            ticks: 0,
            status: SimulationStatus::Idle,
            warning: None,
        })
    }

    /// Advances the simulation by one tick and returns the resulting status.
    ///
    /// There is no time step: each call is exactly one tick, however much time passed since the
    /// previous one, so a caller pacing the simulation by frames just calls it once per frame.
    ///
    /// An idle simulation starts running. Converged and cancelled simulations don't move, call
    /// [`Simulation::reset`] to run them again.
    pub fn step(&mut self) -> SimulationStatus {
        match self.status {
            SimulationStatus::Idle => self.status = SimulationStatus::Running,
            SimulationStatus::Running => {}
            SimulationStatus::Converged | SimulationStatus::Cancelled => return self.status,
        }

        self.tick();
        self.status
    }

    /// Advances the simulation by up to `ticks` ticks, stopping early once it stops running.
    pub fn advance(&mut self, ticks: usize) -> SimulationStatus {
        for _ in 0..ticks {
            if self.step() != SimulationStatus::Running {
                break;
            }
        }

        self.status
    }

    /// Steps until the simulation converges.
    pub fn run(mut self) -> LayoutResult {
        while self.step() == SimulationStatus::Running {}
        self.result()
    }

    /// Resets the simulation.
    ///
    /// A running simulation is cancelled and keeps its positions. A converged or cancelled
    /// simulation goes back to idle with `alpha` restored, its velocities zeroed and its positions
    /// kept, ready to be reheated.
    pub fn reset(&mut self) -> SimulationStatus {
        match self.status {
            SimulationStatus::Running => {
                debug!(ticks = self.ticks, alpha = self.alpha, "layout cancelled");
                self.status = SimulationStatus::Cancelled;
            }
            SimulationStatus::Converged | SimulationStatus::Cancelled => {
                self.alpha = 1.0;
                self.ticks = 0;
                self.warning = None;
                self.velocities.fill(Vector2::zeros());
                self.status = SimulationStatus::Idle;
            }
            SimulationStatus::Idle => {}
        }

        self.status
    }

    /// Returns a snapshot of the current state.
    pub fn result(&self) -> LayoutResult {
        LayoutResult {
            status: self.status,
            ticks: self.ticks,
            alpha: self.alpha,
            positions: self.positions.clone(),
            warning: self.warning,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Positions in vertex order.
    pub fn positions(&self) -> &[Point2<f64>] {
        &self.positions
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn warning(&self) -> Option<LayoutWarning> {
        self.warning
    }

    //
    // Private
    //

    fn tick(&mut self) {
        self.ticks += 1;

        // A lone vertex has nothing to interact with.
        if self.positions.len() == 1 {
            self.status = SimulationStatus::Converged;
            return;
        }

        self.forces.fill(Vector2::zeros());

        forces::apply_links(
            &self.links,
            self.config.link_distance,
            &self.positions,
            &mut self.rng,
            &mut self.forces,
        );

        if self.positions.len() >= self.config.barnes_hut_threshold {
            forces::apply_repulsion_approximate(
                &self.repulsion,
                &self.positions,
                &mut self.rng,
                &mut self.forces,
            );
        } else {
            forces::apply_repulsion_exact(
                &self.repulsion,
                &self.positions,
                &mut self.rng,
                &mut self.forces,
            );
        }

        for ((position, velocity), force) in self
            .positions
            .iter_mut()
            .zip(&mut self.velocities)
            .zip(&self.forces)
        {
            *velocity = (*velocity + force * self.alpha) * self.config.damping;
            *position += *velocity;
        }

        let [x, y] = self.config.center;
        forces::apply_centering(
            Point2::new(x, y),
            self.config.center_strength,
            &mut self.positions,
        );

        self.alpha *= self.config.alpha_decay;
        trace!(tick = self.ticks, alpha = self.alpha, "layout tick");

        if self.alpha < self.config.alpha_min {
            debug!(ticks = self.ticks, "layout converged");
            self.status = SimulationStatus::Converged;
        } else if self.ticks >= self.config.max_ticks {
            warn!(
                ticks = self.ticks,
                alpha = self.alpha,
                "layout reached its tick cap before cooling down"
            );
            self.warning = Some(LayoutWarning::TickCapReached { ticks: self.ticks });
            self.status = SimulationStatus::Converged;
        }
    }
}

/// Spacing of the initial spiral.
const INITIAL_RADIUS: f64 = 10.0;

/// Places `n` vertices on a phyllotaxis spiral around the center, each nudged by up to half the
/// spiral spacing so different seeds give different layouts.
fn scatter(n: usize, config: &LayoutConfig, rng: &mut StdRng) -> Vec<Point2<f64>> {
    let angle = PI * (3.0 - 5f64.sqrt());
    let [cx, cy] = config.center;
    let half = INITIAL_RADIUS / 2.0;

    (0..n)
        .map(|i| {
            let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
            let theta = i as f64 * angle;

            Point2::new(
                cx + radius * theta.cos() + rng.gen_range(-half..=half),
                cy + radius * theta.sin() + rng.gen_range(-half..=half),
            )
        })
        .collect()
}
