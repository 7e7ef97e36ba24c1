//! MILP model builders (C7, C8) and the solver-agnostic backend interface
//! they fill (spec §4.7, §4.8, §6).

pub mod backend;
pub mod disjunctive;
pub mod good_lp_backend;
pub mod positional;

pub use backend::{MilpBackend, MilpModel};
pub use good_lp_backend::GoodLpBackend;
