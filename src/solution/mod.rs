//! Schedule representation, invariant checks, metric computation (spec §3, §4.2).

pub mod builder;
pub mod json;

pub use builder::SolutionBuilder;

use crate::instance::{Instance, Objective};

/// One operation placed on a machine at a start time.
#[derive(Copy, Clone, Debug)]
pub struct ScheduledOperation {
    pub machine_id: usize,
    pub job_id: usize,
    pub operation_id: usize,
    pub alternative_id: usize,
    pub start: i64,
    pub processing_time: i64,
    /// Rank among operations scheduled on the same machine.
    pub machine_position: usize,
    /// Rank among operations scheduled within the same job.
    pub job_position: usize,
}

impl ScheduledOperation {
    pub fn end(&self) -> i64 {
        self.start + self.processing_time
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct JobMetrics {
    pub start: i64,
    pub end: i64,
    pub processing_time_sum: i64,
}

/// A complete or partial schedule over an [`Instance`], with all metrics and
/// violation counters derived at [`SolutionBuilder::build`] time.
#[derive(Clone, Debug)]
pub struct Solution<'a> {
    pub(crate) instance: &'a Instance,
    pub(crate) operations: Vec<ScheduledOperation>,
    /// Per-machine operation indices (into `operations`), ordered by `machine_position`.
    pub(crate) machine_sequences: Vec<Vec<usize>>,
    /// Per-job operation indices (into `operations`), ordered by `job_position`.
    pub(crate) job_sequences: Vec<Vec<usize>>,
    pub(crate) job_metrics: Vec<JobMetrics>,

    pub(crate) number_of_release_date_violations: usize,
    pub(crate) number_of_job_overlaps: usize,
    pub(crate) number_of_machine_overlaps: usize,
    pub(crate) number_of_precedence_violations: usize,

    pub(crate) no_wait_ok: bool,
    pub(crate) no_idle_ok: bool,
    pub(crate) blocking_ok: bool,
    pub(crate) permutation_ok: bool,

    pub(crate) makespan: i64,
    pub(crate) total_flow_time: i64,
    pub(crate) throughput: i64,
    pub(crate) total_tardiness: i64,
}

impl<'a> Solution<'a> {
    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn operations(&self) -> &[ScheduledOperation] {
        &self.operations
    }

    pub fn machine_sequence(&self, machine_id: usize) -> impl Iterator<Item = &ScheduledOperation> {
        self.machine_sequences[machine_id]
            .iter()
            .map(move |&idx| &self.operations[idx])
    }

    pub fn job_sequence(&self, job_id: usize) -> impl Iterator<Item = &ScheduledOperation> {
        self.job_sequences[job_id]
            .iter()
            .map(move |&idx| &self.operations[idx])
    }

    pub fn number_of_scheduled_operations(&self) -> usize {
        self.operations.len()
    }

    pub fn job_start(&self, job_id: usize) -> i64 {
        self.job_metrics[job_id].start
    }

    pub fn job_end(&self, job_id: usize) -> i64 {
        self.job_metrics[job_id].end
    }

    pub fn job_processing_time_sum(&self, job_id: usize) -> i64 {
        self.job_metrics[job_id].processing_time_sum
    }

    pub fn number_of_release_date_violations(&self) -> usize {
        self.number_of_release_date_violations
    }

    pub fn number_of_job_overlaps(&self) -> usize {
        self.number_of_job_overlaps
    }

    pub fn number_of_machine_overlaps(&self) -> usize {
        self.number_of_machine_overlaps
    }

    pub fn number_of_precedence_violations(&self) -> usize {
        self.number_of_precedence_violations
    }

    pub fn no_wait_ok(&self) -> bool {
        self.no_wait_ok
    }

    pub fn no_idle_ok(&self) -> bool {
        self.no_idle_ok
    }

    pub fn blocking_ok(&self) -> bool {
        self.blocking_ok
    }

    pub fn permutation_ok(&self) -> bool {
        self.permutation_ok
    }

    pub fn makespan(&self) -> i64 {
        self.makespan
    }

    pub fn total_flow_time(&self) -> i64 {
        self.total_flow_time
    }

    pub fn throughput(&self) -> i64 {
        self.throughput
    }

    pub fn total_tardiness(&self) -> i64 {
        self.total_tardiness
    }

    /// All violation counters are zero, every constraint the instance
    /// requires holds, and every operation of the instance is scheduled.
    pub fn feasible(&self) -> bool {
        self.number_of_release_date_violations == 0
            && self.number_of_job_overlaps == 0
            && self.number_of_machine_overlaps == 0
            && self.number_of_precedence_violations == 0
            && (!self.instance.no_wait() || self.no_wait_ok)
            && (!self.instance.no_idle() && !self.instance.mixed_no_idle() || self.no_idle_ok)
            && (!self.instance.blocking() || self.blocking_ok)
            && (!self.instance.permutation() || self.permutation_ok)
            && self.operations.len() == self.instance.number_of_operations()
    }

    fn objective_metric(&self) -> i64 {
        match self.instance.objective() {
            Objective::Makespan => self.makespan,
            Objective::TotalFlowTime => self.total_flow_time,
            Objective::TotalTardiness => self.total_tardiness,
            // Throughput counts completed jobs: more is better, so the
            // minimized surrogate is its negation (see DESIGN.md).
            Objective::Throughput => -self.throughput,
        }
    }

    /// Dispatches on the instance's objective; an infeasible solution always
    /// loses to a feasible one, otherwise strict `<` on the objective metric.
    pub fn strictly_better(&self, other: &Solution<'_>) -> bool {
        let (self_feasible, other_feasible) = (self.feasible(), other.feasible());
        if self_feasible != other_feasible {
            return self_feasible;
        }
        self.objective_metric() < other.objective_metric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceBuilder;

    fn two_job_two_machine() -> Instance {
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(2).unwrap();
        b.set_permutation(true);
        for p in [[3, 2], [1, 4]] {
            let j = b.add_job();
            for (m, &t) in p.iter().enumerate() {
                let op = b.add_operation(j).unwrap();
                b.add_alternative(j, op, m, t).unwrap();
            }
        }
        b.build().unwrap()
    }

    #[test]
    fn strictly_better_prefers_feasible() {
        let inst = two_job_two_machine();
        let mut feasible = builder::SolutionBuilder::new(&inst);
        feasible.from_permutation(&[0, 1]).unwrap();
        let feasible = feasible.build().unwrap();

        let infeasible = builder::SolutionBuilder::new(&inst).build().unwrap();

        assert!(feasible.strictly_better(&infeasible));
        assert!(!infeasible.strictly_better(&feasible));
    }
}
