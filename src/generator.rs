//! Random instance generation, grounded on `original_source/generator.hpp` /
//! `generator.cpp` and the teacher's own `rand`-driven `generate.rs`.

use rand::Rng;

use crate::instance::{Instance, InstanceBuilder, Objective};

/// Shape parameters for [`generate`].
///
/// Machines are organized into `number_of_machine_groups` groups of
/// `number_of_machines_per_group` alternatives each, mirroring the original
/// generator's flexible-job-shop shape; a group size of 1 degenerates to a
/// plain job shop.
#[derive(Clone, Debug)]
pub struct GenerateInput {
    pub objective: Objective,
    pub operations_arbitrary_order: bool,
    pub blocking: bool,
    pub no_wait: bool,
    pub no_idle: bool,
    pub permutation: bool,
    pub number_of_machine_groups: usize,
    pub number_of_machines_per_group: usize,
    pub number_of_jobs: usize,
    pub number_of_operations_per_job: usize,
    pub processing_times_range: i64,
    pub weights_range: i64,
    pub due_date_tightness_factor: f64,
}

impl Default for GenerateInput {
    fn default() -> Self {
        GenerateInput {
            objective: Objective::Makespan,
            operations_arbitrary_order: false,
            blocking: false,
            no_wait: false,
            no_idle: false,
            permutation: false,
            number_of_machine_groups: 3,
            number_of_machines_per_group: 1,
            number_of_jobs: 5,
            number_of_operations_per_job: 3,
            processing_times_range: 100,
            weights_range: 1,
            due_date_tightness_factor: 3.0,
        }
    }
}

/// Generates a random instance with `input`'s shape, using `rng`.
///
/// Each job's operations are assigned to `number_of_operations_per_job`
/// distinct machine groups (sampled without replacement), each group
/// contributing `number_of_machines_per_group` alternatives. Due dates are
/// set at `due_date_tightness_factor` times the job's mean processing time
/// sum, as in the original generator.
pub fn generate(input: &GenerateInput, rng: &mut impl Rng) -> Instance {
    let mut builder = InstanceBuilder::new();
    builder.set_objective(input.objective);
    builder.set_operations_arbitrary_order(input.operations_arbitrary_order);
    builder.set_blocking(input.blocking);
    builder.set_no_wait(input.no_wait);
    builder.set_no_idle(input.no_idle);
    builder.set_permutation(input.permutation);

    let number_of_machines = input.number_of_machine_groups * input.number_of_machines_per_group;
    builder
        .set_number_of_machines(number_of_machines)
        .expect("generator always requests at least one machine group");
    let job_ids = builder.add_jobs(input.number_of_jobs);

    for job_id in job_ids {
        let weight = rng.random_range(1..=input.weights_range.max(1));
        builder
            .set_job_weight(job_id, weight)
            .expect("job_id came from add_jobs and is always valid");

        let machine_groups = sample_distinct_groups(
            input.number_of_operations_per_job,
            input.number_of_machine_groups,
            rng,
        );

        let mut processing_time_sum: i64 = 0;
        for group in machine_groups {
            let operation_id = builder
                .add_operation(job_id)
                .expect("job_id came from add_jobs and is always valid");
            let mut group_sum: i64 = 0;
            for alternative in 0..input.number_of_machines_per_group {
                let machine_id = group * input.number_of_machines_per_group + alternative;
                let processing_time = rng.random_range(1..=input.processing_times_range.max(1));
                builder
                    .add_alternative(job_id, operation_id, machine_id, processing_time)
                    .expect("machine_id is within the generated machine count");
                group_sum += processing_time;
            }
            processing_time_sum += group_sum / input.number_of_machine_groups as i64;
        }

        let due_date = (input.due_date_tightness_factor * processing_time_sum as f64) as i64;
        builder
            .set_job_due_date(job_id, due_date)
            .expect("job_id came from add_jobs and is always valid");
    }

    builder.build().expect("generated instance is always well-formed")
}

/// Samples `count` machine group indices out of `0..number_of_groups`
/// without replacement, repeating the cycle if `count` exceeds
/// `number_of_groups` (an operation-per-job count larger than the group
/// count is legal; later operations simply revisit earlier groups).
fn sample_distinct_groups(count: usize, number_of_groups: usize, rng: &mut impl Rng) -> Vec<usize> {
    use rand::seq::SliceRandom;

    let mut result = Vec::with_capacity(count);
    while result.len() < count {
        let mut groups: Vec<usize> = (0..number_of_groups).collect();
        groups.shuffle(rng);
        let take = (count - result.len()).min(number_of_groups);
        result.extend_from_slice(&groups[..take]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generate_produces_requested_shape() {
        let input = GenerateInput {
            number_of_jobs: 4,
            number_of_operations_per_job: 3,
            number_of_machine_groups: 3,
            number_of_machines_per_group: 1,
            ..GenerateInput::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        let instance = generate(&input, &mut rng);

        assert_eq!(instance.number_of_jobs(), 4);
        assert_eq!(instance.number_of_machines(), 3);
        for job in instance.jobs() {
            assert_eq!(job.number_of_operations(), 3);
            assert!(job.due_date.is_some());
        }
    }

    #[test]
    fn generate_with_flexible_groups_creates_multiple_alternatives() {
        let input = GenerateInput {
            number_of_jobs: 3,
            number_of_operations_per_job: 2,
            number_of_machine_groups: 2,
            number_of_machines_per_group: 2,
            ..GenerateInput::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let instance = generate(&input, &mut rng);

        assert_eq!(instance.number_of_machines(), 4);
        assert!(instance.flexible());
        for job in instance.jobs() {
            for operation in &job.operations {
                assert_eq!(operation.alternatives.len(), 2);
            }
        }
    }

    #[test]
    fn sample_distinct_groups_cycles_when_count_exceeds_group_total() {
        let mut rng = StdRng::seed_from_u64(1);
        let groups = sample_distinct_groups(5, 2, &mut rng);
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|&g| g < 2));
    }
}
