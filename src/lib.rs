//! Shop-scheduling solver core: data model, algorithm framework, PFSS
//! tableau/iterated-local-search/beam-search, and disjunctive/positional MILP
//! model builders behind a solver-agnostic backend interface.
//!
//! The binary (`src/main.rs`) wires this library to a concrete file format,
//! `clap` argument parsing, and a `good_lp`-backed [`milp::MilpBackend`].

pub mod error;
pub mod framework;
pub mod generator;
pub mod instance;
pub mod milp;
pub mod pfss;
pub mod solution;

pub use error::{Result, ShopSchedError};
pub use instance::{Instance, InstanceBuilder, Objective};
pub use solution::{Solution, SolutionBuilder};
