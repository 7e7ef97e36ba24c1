//! Error taxonomy for the solver core (spec §7).

use thiserror::Error;

/// All errors the solver core can produce.
///
/// Variants mirror the six kinds of §7. `InternalInvariantViolation` is
/// fatal: callers should not retry on it, only report it.
#[derive(Error, Debug)]
pub enum ShopSchedError {
    /// Malformed file, out-of-range index, non-positive processing time, …
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown algorithm/solver name, or an unsupported combination of
    /// algorithm and instance flags (e.g. positional MILP on an open shop).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The solver backend proved the instance has no feasible solution.
    #[error("instance proven unsatisfiable by {backend}")]
    UnsatisfiableInstance {
        /// Identity of the backend that produced the proof.
        backend: String,
    },

    /// Cooperative cancellation via the timer or an external signal.
    #[error("interrupted after {elapsed_secs:.3}s")]
    Interrupted {
        /// Wall-clock seconds elapsed before cancellation.
        elapsed_secs: f64,
    },

    /// A tableau/solution/position invariant disagreed with a freshly
    /// recomputed value. Indicates a bug; always fatal.
    #[error("internal invariant violated: {context}")]
    InternalInvariantViolation {
        /// Enough detail (positions, sizes, computed vs. expected values)
        /// for post-mortem diagnosis.
        context: String,
    },

    /// An opaque error surfaced by the MILP backend.
    #[error("solver backend {backend} error: {message}")]
    SolverBackendError {
        /// Identity of the backend (e.g. "good_lp/highs").
        backend: String,
        /// Backend-provided message.
        message: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShopSchedError>;

impl ShopSchedError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ShopSchedError::InvalidInput(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        ShopSchedError::InvalidConfig(msg.into())
    }

    pub fn internal(context: impl Into<String>) -> Self {
        ShopSchedError::InternalInvariantViolation {
            context: context.into(),
        }
    }
}
