//! `SolutionBuilder`: append-then-sort-then-build construction of [`super::Solution`]
//! (spec §4.2).

use super::{JobMetrics, ScheduledOperation, Solution};
use crate::error::{Result, ShopSchedError};
use crate::instance::Instance;

/// Builds a [`Solution`] by appending scheduled operations in any order,
/// reordering per-machine/per-job sequences by start time, then computing all
/// derived metrics in a single pass at [`SolutionBuilder::build`].
pub struct SolutionBuilder<'a> {
    instance: &'a Instance,
    operations: Vec<ScheduledOperation>,
    machine_sequences: Vec<Vec<usize>>,
    job_sequences: Vec<Vec<usize>>,
}

impl<'a> SolutionBuilder<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        SolutionBuilder {
            instance,
            operations: Vec::new(),
            machine_sequences: vec![Vec::new(); instance.number_of_machines()],
            job_sequences: vec![Vec::new(); instance.number_of_jobs()],
        }
    }

    /// Appends a scheduled operation; `machine_position`/`job_position` are
    /// assigned as the current push-back index of each sequence.
    pub fn append_operation(
        &mut self,
        job_id: usize,
        operation_id: usize,
        alternative_id: usize,
        start: i64,
    ) -> Result<usize> {
        if job_id >= self.instance.number_of_jobs() {
            return Err(ShopSchedError::invalid_input(format!(
                "job_id {job_id} out of range"
            )));
        }
        let job = self.instance.job(job_id);
        let operation = job.operations.get(operation_id).ok_or_else(|| {
            ShopSchedError::invalid_input(format!(
                "operation_id {operation_id} out of range for job {job_id}"
            ))
        })?;
        let alternative = operation.alternatives.get(alternative_id).ok_or_else(|| {
            ShopSchedError::invalid_input(format!(
                "alternative_id {alternative_id} out of range for operation {operation_id} of job {job_id}"
            ))
        })?;
        if start < 0 {
            return Err(ShopSchedError::invalid_input("start must be >= 0"));
        }

        let machine_id = alternative.machine_id;
        let machine_position = self.machine_sequences[machine_id].len();
        let job_position = self.job_sequences[job_id].len();
        let idx = self.operations.len();

        self.operations.push(ScheduledOperation {
            machine_id,
            job_id,
            operation_id,
            alternative_id,
            start,
            processing_time: alternative.processing_time,
            machine_position,
            job_position,
        });
        self.machine_sequences[machine_id].push(idx);
        self.job_sequences[job_id].push(idx);
        Ok(idx)
    }

    /// Reorders every per-machine sequence by `start` and renumbers
    /// `machine_position` accordingly.
    pub fn sort_machines(&mut self) -> &mut Self {
        for seq in &mut self.machine_sequences {
            seq.sort_by_key(|&idx| self.operations[idx].start);
        }
        for seq in &self.machine_sequences {
            for (position, &idx) in seq.iter().enumerate() {
                self.operations[idx].machine_position = position;
            }
        }
        self
    }

    /// Reorders every per-job sequence by `start` and renumbers `job_position`
    /// accordingly.
    pub fn sort_jobs(&mut self) -> &mut Self {
        for seq in &mut self.job_sequences {
            seq.sort_by_key(|&idx| self.operations[idx].start);
        }
        for seq in &self.job_sequences {
            for (position, &idx) in seq.iter().enumerate() {
                self.operations[idx].job_position = position;
            }
        }
        self
    }

    /// PFSS-only construction from a job permutation: job op0 lands on
    /// machine 0 at the running machine-0 end time, then each subsequent
    /// machine starts at `max(prev-machine end on this job, running machine
    /// end)`, with alternative 0 selected throughout.
    pub fn from_permutation(&mut self, job_ids: &[usize]) -> Result<&mut Self> {
        if !self.instance.is_pfss() {
            return Err(ShopSchedError::invalid_config(
                "from_permutation requires a non-flexible permutation flow shop",
            ));
        }
        if job_ids.len() != self.instance.number_of_jobs() {
            return Err(ShopSchedError::invalid_input(
                "from_permutation requires a permutation of every job",
            ));
        }

        let number_of_machines = self.instance.number_of_machines();
        let mut machine_end = vec![0i64; number_of_machines];

        for &job_id in job_ids {
            let mut prev_machine_end = 0i64;
            for machine_id in 0..number_of_machines {
                let start = prev_machine_end.max(machine_end[machine_id]);
                let p = self.instance.pfss_processing_time(job_id, machine_id);
                self.append_operation(job_id, machine_id, 0, start)?;
                let end = start + p;
                machine_end[machine_id] = end;
                prev_machine_end = end;
            }
        }

        self.sort_machines();
        self.sort_jobs();
        Ok(self)
    }

    /// Computes all derived metrics and violation counters in a single pass:
    /// first over jobs, then over machines.
    pub fn build(self) -> Result<Solution<'a>> {
        let instance = self.instance;
        let operations = self.operations;
        let machine_sequences = self.machine_sequences;
        let job_sequences = self.job_sequences;

        let mut job_metrics = vec![JobMetrics::default(); instance.number_of_jobs()];
        let mut number_of_release_date_violations = 0usize;
        let mut number_of_job_overlaps = 0usize;
        let mut number_of_precedence_violations = 0usize;
        let mut no_wait_ok = true;

        for (job_id, seq) in job_sequences.iter().enumerate() {
            if seq.is_empty() {
                continue;
            }
            let job = instance.job(job_id);
            let first = &operations[seq[0]];
            let mut start = first.start;
            let mut end = first.end();
            let mut processing_time_sum = first.processing_time;

            if first.start < job.release_date {
                number_of_release_date_violations += 1;
            }
            if !instance.operations_arbitrary_order() && first.operation_id != 0 {
                number_of_precedence_violations += 1;
            }

            for window in seq.windows(2) {
                let prev = &operations[window[0]];
                let curr = &operations[window[1]];

                start = start.min(curr.start);
                end = end.max(curr.end());
                processing_time_sum += curr.processing_time;

                if curr.start < prev.end() {
                    number_of_job_overlaps += 1;
                }
                if curr.start > prev.end() {
                    no_wait_ok = false;
                }
                if !instance.operations_arbitrary_order()
                    && curr.operation_id != prev.operation_id + 1
                {
                    number_of_precedence_violations += 1;
                }
            }

            job_metrics[job_id] = JobMetrics {
                start,
                end,
                processing_time_sum,
            };
        }

        let mut number_of_machine_overlaps = 0usize;
        let mut no_idle_ok = true;
        let mut blocking_ok = true;
        let mut permutation_ok = true;
        let reference_order: Option<Vec<usize>> = machine_sequences
            .first()
            .map(|seq| seq.iter().map(|&idx| operations[idx].job_id).collect());

        for (machine_id, seq) in machine_sequences.iter().enumerate() {
            if machine_id > 0 {
                if let Some(reference) = &reference_order {
                    let order: Vec<usize> = seq.iter().map(|&idx| operations[idx].job_id).collect();
                    if &order != reference {
                        permutation_ok = false;
                    }
                }
            }

            for window in seq.windows(2) {
                let prev = &operations[window[0]];
                let curr = &operations[window[1]];

                if curr.start < prev.end() {
                    number_of_machine_overlaps += 1;
                }
                if curr.start > prev.end() {
                    no_idle_ok = false;
                }
                // Blocking is broken when the predecessor's job's next
                // operation starts after this handoff, i.e. the predecessor
                // is still occupying the machine at the moment `curr` starts.
                let predecessor_job_next_start = job_sequences[prev.job_id]
                    .iter()
                    .map(|&idx| &operations[idx])
                    .find(|op| op.job_position == prev.job_position + 1)
                    .map(|op| op.start);
                if let Some(next_start) = predecessor_job_next_start {
                    if next_start > curr.start {
                        blocking_ok = false;
                    }
                }
            }
        }

        let makespan = job_metrics.iter().map(|m| m.end).max().unwrap_or(0);

        let mut total_flow_time = 0i64;
        let mut throughput = 0i64;
        let mut total_tardiness = 0i64;
        for (job_id, metrics) in job_metrics.iter().enumerate() {
            if job_sequences[job_id].is_empty() {
                continue;
            }
            let job = instance.job(job_id);
            total_flow_time += job.weight * (metrics.end - job.release_date);
            throughput += job.weight;
            if let Some(due_date) = job.due_date {
                total_tardiness += job.weight * (metrics.end - due_date).max(0);
            }
        }

        Ok(Solution {
            instance,
            operations,
            machine_sequences,
            job_sequences,
            job_metrics,
            number_of_release_date_violations,
            number_of_job_overlaps,
            number_of_machine_overlaps,
            number_of_precedence_violations,
            no_wait_ok,
            no_idle_ok,
            blocking_ok,
            permutation_ok,
            makespan,
            total_flow_time,
            throughput,
            total_tardiness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{InstanceBuilder, Objective};

    fn scenario_one() -> Instance {
        // spec §8 scenario 1: 3 jobs x 2 machines, optimal makespan 8.
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(2).unwrap();
        b.set_permutation(true);
        for p in [[3, 2], [1, 4], [2, 1]] {
            let j = b.add_job();
            for (m, &t) in p.iter().enumerate() {
                let op = b.add_operation(j).unwrap();
                b.add_alternative(j, op, m, t).unwrap();
            }
        }
        b.build().unwrap()
    }

    #[test]
    fn from_permutation_reaches_optimal_makespan() {
        let inst = scenario_one();
        // Optimal sequence for this instance is (1, 0, 2): makespan 8.
        let mut b = SolutionBuilder::new(&inst);
        b.from_permutation(&[1, 0, 2]).unwrap();
        let sol = b.build().unwrap();
        assert_eq!(sol.makespan(), 8);
        assert!(sol.feasible());
    }

    #[test]
    fn append_operation_rejects_out_of_range_job() {
        let inst = scenario_one();
        let mut b = SolutionBuilder::new(&inst);
        assert!(b.append_operation(99, 0, 0, 0).is_err());
    }

    #[test]
    fn sort_machines_renumbers_positions_by_start() {
        let inst = scenario_one();
        let mut b = SolutionBuilder::new(&inst);
        // Append out of start-time order, then sort.
        b.append_operation(1, 0, 0, 0).unwrap();
        b.append_operation(0, 0, 0, 1).unwrap();
        b.sort_machines();
        let sol = b.build().unwrap();
        let machine0: Vec<_> = sol.machine_sequence(0).map(|op| op.job_id).collect();
        assert_eq!(machine0, vec![1, 0]);
    }
}
