//! Immutable problem description (spec §3, §4.1).
//!
//! An [`Instance`] is built once by [`InstanceBuilder`] (see `builder.rs`)
//! and never mutated afterwards; every algorithm and every [`crate::solution`]
//! holds it by shared reference.

pub mod builder;
pub mod readers;

pub use builder::InstanceBuilder;

use std::fmt;

/// The objective a solver minimizes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Objective {
    Makespan,
    TotalFlowTime,
    Throughput,
    TotalTardiness,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Objective::Makespan => "makespan",
            Objective::TotalFlowTime => "total-flow-time",
            Objective::Throughput => "throughput",
            Objective::TotalTardiness => "total-tardiness",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "makespan" => Ok(Objective::Makespan),
            "total-flow-time" | "tft" => Ok(Objective::TotalFlowTime),
            "throughput" => Ok(Objective::Throughput),
            "total-tardiness" | "tt" => Ok(Objective::TotalTardiness),
            _ => Err(format!("unrecognized objective: '{s}'")),
        }
    }
}

/// One (machine, processing_time) choice for an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Alternative {
    pub machine_id: usize,
    pub processing_time: i64,
}

/// An operation of a job: a non-empty set of alternatives.
#[derive(Clone, Debug, Default)]
pub struct Operation {
    pub alternatives: Vec<Alternative>,
}

impl Operation {
    /// `true` iff this operation has more than one alternative.
    pub fn is_flexible(&self) -> bool {
        self.alternatives.len() > 1
    }

    pub fn min_processing_time(&self) -> i64 {
        self.alternatives
            .iter()
            .map(|a| a.processing_time)
            .min()
            .unwrap_or(0)
    }
}

/// A job: release date, (optional) due date, weight, ordered operations.
#[derive(Clone, Debug)]
pub struct Job {
    pub release_date: i64,
    /// `None` represents "no due date" (the `-1` sentinel of spec §3/§6).
    pub due_date: Option<i64>,
    pub weight: i64,
    pub operations: Vec<Operation>,
    /// Derived: mean processing time over all alternatives of all operations.
    pub(crate) mean_processing_time: f64,
}

impl Job {
    pub fn number_of_operations(&self) -> usize {
        self.operations.len()
    }

    pub fn mean_processing_time(&self) -> f64 {
        self.mean_processing_time
    }
}

/// A machine: whether it must run contiguously once started.
#[derive(Copy, Clone, Debug, Default)]
pub struct Machine {
    pub no_idle: bool,
}

/// A single (job, operation, alternative) landing on a machine — one entry
/// of a machine's reverse index, built by [`InstanceBuilder::build`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MachineOperationRef {
    pub job_id: usize,
    pub operation_id: usize,
    pub alternative_id: usize,
}

/// Immutable, validated shop-scheduling instance (spec §3).
#[derive(Clone, Debug)]
pub struct Instance {
    pub(crate) objective: Objective,
    pub(crate) machines: Vec<Machine>,
    pub(crate) jobs: Vec<Job>,

    pub(crate) operations_arbitrary_order: bool,
    pub(crate) no_wait: bool,
    pub(crate) blocking: bool,
    pub(crate) permutation: bool,

    // Derived at build time.
    pub(crate) number_of_operations: usize,
    pub(crate) machine_operations: Vec<Vec<MachineOperationRef>>,
    pub(crate) flow_shop: bool,
    pub(crate) flexible: bool,
    pub(crate) no_idle: bool,
    pub(crate) mixed_no_idle: bool,
}

impl Instance {
    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn number_of_machines(&self) -> usize {
        self.machines.len()
    }

    pub fn machine(&self, machine_id: usize) -> &Machine {
        &self.machines[machine_id]
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn number_of_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn job(&self, job_id: usize) -> &Job {
        &self.jobs[job_id]
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn number_of_operations(&self) -> usize {
        self.number_of_operations
    }

    /// Every (job, operation, alternative) landing on `machine_id`.
    pub fn machine_operations(&self, machine_id: usize) -> &[MachineOperationRef] {
        &self.machine_operations[machine_id]
    }

    pub fn operations_arbitrary_order(&self) -> bool {
        self.operations_arbitrary_order
    }

    pub fn no_wait(&self) -> bool {
        self.no_wait
    }

    pub fn blocking(&self) -> bool {
        self.blocking
    }

    pub fn permutation(&self) -> bool {
        self.permutation
    }

    pub fn flow_shop(&self) -> bool {
        self.flow_shop
    }

    pub fn flexible(&self) -> bool {
        self.flexible
    }

    /// `true` iff every machine has `no_idle` set.
    pub fn no_idle(&self) -> bool {
        self.no_idle
    }

    /// `true` iff at least one (but not necessarily all) machine has
    /// `no_idle` set.
    pub fn mixed_no_idle(&self) -> bool {
        self.mixed_no_idle
    }

    /// `true` iff this instance can be handled by the PFSS algorithms
    /// (permutation flow shop with a single alternative per operation).
    pub fn is_pfss(&self) -> bool {
        self.permutation && self.flow_shop && !self.flexible
    }

    /// The single alternative of operation `op` of job `job_id`, for
    /// permutation-flow-shop instances where `flexible` is false.
    pub fn pfss_processing_time(&self, job_id: usize, machine_id: usize) -> i64 {
        self.jobs[job_id].operations[machine_id].alternatives[0].processing_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_from_str_accepts_variants() {
        assert_eq!("makespan".parse::<Objective>().unwrap(), Objective::Makespan);
        assert_eq!("TFT".parse::<Objective>().unwrap(), Objective::TotalFlowTime);
        assert_eq!(
            "total flow time".parse::<Objective>().unwrap(),
            Objective::TotalFlowTime
        );
        assert_eq!("tt".parse::<Objective>().unwrap(), Objective::TotalTardiness);
        assert!("bogus".parse::<Objective>().is_err());
    }
}
