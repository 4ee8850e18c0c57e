//! Error types for the ACO TSP solver core.
//!
//! Mirrors the error-kind breakdown of the solver's API contract:
//! parsing, graph validity, parameter validity, and the controller's
//! initialization/internal-consistency checks.

use std::fmt;

/// All failure modes the solver core can surface to a caller.
///
/// `Cancelled` is deliberately not a variant here: cancellation is
/// delivered as a flag on the result of `Colony::solve`, not through
/// this error channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Malformed TSPLIB input: bad header, missing section, unsupported
    /// `EDGE_WEIGHT_TYPE`, non-numeric field, wrong coordinate count.
    ParseError(String),
    /// The graph itself violates an invariant (fewer than 2 cities,
    /// non-finite coordinates).
    InvalidGraph(String),
    /// A colony construction or setter argument is out of range.
    InvalidParameter(String),
    /// `solve` was called before `initialize`.
    NotInitialized,
    /// An invariant that should be impossible under normal operation was
    /// violated (e.g. a corrupted pheromone state producing a
    /// non-finite construction weight, or an ant producing an invalid
    /// tour).
    InternalError(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::ParseError(msg) => write!(f, "parse error: {msg}"),
            SolverError::InvalidGraph(msg) => write!(f, "invalid graph: {msg}"),
            SolverError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            SolverError::NotInitialized => {
                write!(f, "solve() called before initialize()")
            }
            SolverError::InternalError(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for SolverError {}
