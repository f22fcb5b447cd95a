//! Error types shared by the graph model, the layout simulation and the analytics engine.

use std::io;

use thiserror::Error;

/// Hard failures surfaced to callers.
///
/// Degenerate but valid inputs (disconnected graphs, a layout hitting its tick cap, ...) are not
/// errors, they are reported as warnings alongside the result.
#[derive(Debug, Error)]
pub enum Error {
    /// An edge-list row had fewer than two tokens.
    #[error("row {row}: expected `<source> <target> [weight]`, found {tokens} token(s)")]
    Parse {
        /// 1-based row (or line) number.
        row: usize,
        /// Number of tokens found on the row.
        tokens: usize,
    },

    /// Layout or analytics was asked to run on a graph without nodes.
    #[error("the graph has no nodes")]
    EmptyGraph,

    /// Caller-supplied positions don't cover every node exactly once.
    #[error("expected one position per node ({expected}), found {actual}")]
    PositionCount { expected: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
