//! `InstanceBuilder`: validating constructor for [`super::Instance`] (spec §4.1).

use super::{Alternative, Instance, Job, Machine, MachineOperationRef, Objective, Operation};
use crate::error::{Result, ShopSchedError};

/// Builds an [`Instance`] incrementally, validating every setter and
/// computing the derived aggregates (`flow_shop`, `flexible`, `no_idle`,
/// `mixed_no_idle`, per-machine reverse index, per-job mean processing time)
/// in a single pass at [`InstanceBuilder::build`].
#[derive(Clone, Debug, Default)]
pub struct InstanceBuilder {
    objective: Objective,
    machines: Vec<Machine>,
    jobs: Vec<Job>,
    operations_arbitrary_order: bool,
    no_wait: bool,
    blocking: bool,
    permutation: bool,
}

impl Default for Objective {
    fn default() -> Self {
        Objective::Makespan
    }
}

impl InstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_objective(&mut self, objective: Objective) -> &mut Self {
        self.objective = objective;
        self
    }

    /// Replaces the machines and clears all jobs, per spec §4.1.
    pub fn set_number_of_machines(&mut self, number_of_machines: usize) -> Result<&mut Self> {
        if number_of_machines == 0 {
            return Err(ShopSchedError::invalid_input(
                "number_of_machines must be > 0",
            ));
        }
        self.machines = vec![Machine::default(); number_of_machines];
        self.jobs.clear();
        Ok(self)
    }

    pub fn add_job(&mut self) -> usize {
        let job_id = self.jobs.len();
        self.jobs.push(Job {
            release_date: 0,
            due_date: None,
            weight: 1,
            operations: Vec::new(),
            mean_processing_time: 0.0,
        });
        job_id
    }

    pub fn add_jobs(&mut self, number_of_jobs: usize) -> Vec<usize> {
        (0..number_of_jobs).map(|_| self.add_job()).collect()
    }

    pub fn add_operation(&mut self, job_id: usize) -> Result<usize> {
        let job = self.job_mut(job_id)?;
        let operation_id = job.operations.len();
        job.operations.push(Operation::default());
        Ok(operation_id)
    }

    pub fn add_alternative(
        &mut self,
        job_id: usize,
        operation_id: usize,
        machine_id: usize,
        processing_time: i64,
    ) -> Result<&mut Self> {
        if processing_time <= 0 {
            return Err(ShopSchedError::invalid_input(format!(
                "processing_time must be > 0, got {processing_time}"
            )));
        }
        let number_of_machines = self.machines.len();
        if machine_id >= number_of_machines {
            return Err(ShopSchedError::invalid_input(format!(
                "machine_id {machine_id} out of range [0, {number_of_machines})"
            )));
        }
        let job = self.job_mut(job_id)?;
        let operation = job.operations.get_mut(operation_id).ok_or_else(|| {
            ShopSchedError::invalid_input(format!(
                "operation_id {operation_id} out of range for job {job_id}"
            ))
        })?;
        operation.alternatives.push(Alternative {
            machine_id,
            processing_time,
        });
        Ok(self)
    }

    pub fn set_job_release_date(&mut self, job_id: usize, release_date: i64) -> Result<&mut Self> {
        if release_date < 0 {
            return Err(ShopSchedError::invalid_input(
                "release_date must be >= 0",
            ));
        }
        self.job_mut(job_id)?.release_date = release_date;
        Ok(self)
    }

    /// `due_date = -1` means "no due date".
    pub fn set_job_due_date(&mut self, job_id: usize, due_date: i64) -> Result<&mut Self> {
        if due_date < -1 {
            return Err(ShopSchedError::invalid_input("due_date must be >= -1"));
        }
        self.job_mut(job_id)?.due_date = if due_date == -1 { None } else { Some(due_date) };
        Ok(self)
    }

    pub fn set_job_weight(&mut self, job_id: usize, weight: i64) -> Result<&mut Self> {
        if weight < 0 {
            return Err(ShopSchedError::invalid_input("weight must be >= 0"));
        }
        self.job_mut(job_id)?.weight = weight;
        Ok(self)
    }

    pub fn set_operations_arbitrary_order(&mut self, value: bool) -> &mut Self {
        self.operations_arbitrary_order = value;
        self
    }

    pub fn set_no_wait(&mut self, value: bool) -> &mut Self {
        self.no_wait = value;
        self
    }

    pub fn set_blocking(&mut self, value: bool) -> &mut Self {
        self.blocking = value;
        self
    }

    pub fn set_permutation(&mut self, value: bool) -> &mut Self {
        self.permutation = value;
        self
    }

    pub fn set_machine_no_idle(&mut self, machine_id: usize, value: bool) -> Result<&mut Self> {
        let number_of_machines = self.machines.len();
        let machine = self.machines.get_mut(machine_id).ok_or_else(|| {
            ShopSchedError::invalid_input(format!(
                "machine_id {machine_id} out of range [0, {number_of_machines})"
            ))
        })?;
        machine.no_idle = value;
        Ok(self)
    }

    pub fn set_no_idle(&mut self, value: bool) -> &mut Self {
        for machine in &mut self.machines {
            machine.no_idle = value;
        }
        self
    }

    fn job_mut(&mut self, job_id: usize) -> Result<&mut Job> {
        let number_of_jobs = self.jobs.len();
        self.jobs.get_mut(job_id).ok_or_else(|| {
            ShopSchedError::invalid_input(format!(
                "job_id {job_id} out of range [0, {number_of_jobs})"
            ))
        })
    }

    /// Validates the built instance and computes all derived aggregates.
    pub fn build(mut self) -> Result<Instance> {
        if self.machines.is_empty() {
            return Err(ShopSchedError::invalid_input(
                "instance has no machines; call set_number_of_machines first",
            ));
        }

        let number_of_machines = self.machines.len();
        let mut number_of_operations = 0usize;
        let mut machine_operations: Vec<Vec<MachineOperationRef>> =
            vec![Vec::new(); number_of_machines];

        for (job_id, job) in self.jobs.iter_mut().enumerate() {
            if job.operations.is_empty() {
                return Err(ShopSchedError::invalid_input(format!(
                    "job {job_id} has no operations"
                )));
            }
            let mut time_sum = 0.0;
            let mut alt_count = 0usize;
            for (operation_id, operation) in job.operations.iter().enumerate() {
                if operation.alternatives.is_empty() {
                    return Err(ShopSchedError::invalid_input(format!(
                        "operation {operation_id} of job {job_id} has no alternatives"
                    )));
                }
                for (alt_id, alt) in operation.alternatives.iter().enumerate() {
                    machine_operations[alt.machine_id].push(MachineOperationRef {
                        job_id,
                        operation_id,
                        alternative_id: alt_id,
                    });
                    time_sum += alt.processing_time as f64;
                    alt_count += 1;
                }
                number_of_operations += 1;
            }
            job.mean_processing_time = if alt_count > 0 {
                time_sum / alt_count as f64
            } else {
                0.0
            };
        }

        let flexible = self
            .jobs
            .iter()
            .any(|j| j.operations.iter().any(Operation::is_flexible));

        // operations_arbitrary_order (open shop) never qualifies as a flow shop.
        let flow_shop = !self.operations_arbitrary_order
            && self.jobs.iter().all(|job| {
                job.operations.len() == number_of_machines
                    && job
                        .operations
                        .iter()
                        .enumerate()
                        .all(|(i, op)| op.alternatives.iter().all(|a| a.machine_id == i))
            });

        let no_idle = self.machines.iter().all(|m| m.no_idle);
        let mixed_no_idle = self.machines.iter().any(|m| m.no_idle);

        Ok(Instance {
            objective: self.objective,
            machines: self.machines,
            jobs: self.jobs,
            operations_arbitrary_order: self.operations_arbitrary_order,
            no_wait: self.no_wait,
            blocking: self.blocking,
            permutation: self.permutation,
            number_of_operations,
            machine_operations,
            flow_shop,
            flexible,
            no_idle,
            mixed_no_idle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_flow_shop() -> Instance {
        // 3 jobs x 2 machines, p = [[3,2],[1,4],[2,1]] (scenario 1 of spec §8).
        let times = [[3, 2], [1, 4], [2, 1]];
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(2).unwrap();
        b.set_permutation(true);
        for row in times {
            let job_id = b.add_job();
            for (m, &p) in row.iter().enumerate() {
                let op_id = b.add_operation(job_id).unwrap();
                b.add_alternative(job_id, op_id, m, p).unwrap();
            }
        }
        b.build().unwrap()
    }

    #[test]
    fn build_computes_flow_shop_and_counts() {
        let inst = small_flow_shop();
        assert!(inst.flow_shop());
        assert!(!inst.flexible());
        assert_eq!(inst.number_of_jobs(), 3);
        assert_eq!(inst.number_of_machines(), 2);
        assert_eq!(inst.number_of_operations(), 6);
        assert_eq!(inst.machine_operations(0).len(), 3);
    }

    #[test]
    fn rejects_non_positive_processing_time() {
        let mut b = InstanceBuilder::new();
        b.set_number_of_machines(1).unwrap();
        let j = b.add_job();
        let op = b.add_operation(j).unwrap();
        assert!(b.add_alternative(j, op, 0, 0).is_err());
    }

    #[test]
    fn rejects_machine_out_of_range() {
        let mut b = InstanceBuilder::new();
        b.set_number_of_machines(1).unwrap();
        let j = b.add_job();
        let op = b.add_operation(j).unwrap();
        assert!(b.add_alternative(j, op, 5, 1).is_err());
    }

    #[test]
    fn flexible_flag_set_when_operation_has_multiple_alternatives() {
        let mut b = InstanceBuilder::new();
        b.set_number_of_machines(2).unwrap();
        let j = b.add_job();
        let op = b.add_operation(j).unwrap();
        b.add_alternative(j, op, 0, 3).unwrap();
        b.add_alternative(j, op, 1, 5).unwrap();
        let inst = b.build().unwrap();
        assert!(inst.flexible());
    }

    #[test]
    fn set_number_of_machines_clears_jobs() {
        let mut b = InstanceBuilder::new();
        b.set_number_of_machines(2).unwrap();
        b.add_job();
        b.set_number_of_machines(3).unwrap();
        assert_eq!(b.jobs.len(), 0);
    }
}
