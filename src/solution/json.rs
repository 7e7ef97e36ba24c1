//! Solution JSON schema (spec §6): a flat operations list plus the three
//! scale counters, round-tripped through [`SolutionBuilder`] so the wire
//! format and the in-memory invariants evolve independently.

use serde::{Deserialize, Serialize};

use super::{Solution, SolutionBuilder};
use crate::error::{Result, ShopSchedError};
use crate::instance::Instance;

#[derive(Serialize, Deserialize)]
struct JsonScheduledOperation {
    job_id: usize,
    job_position: usize,
    operation_id: usize,
    alternative_id: usize,
    machine_id: usize,
    machine_position: usize,
    start: i64,
    processing_time: i64,
    end: i64,
}

#[derive(Serialize, Deserialize)]
struct JsonSolution {
    number_of_machines: usize,
    number_of_jobs: usize,
    number_of_operations: usize,
    operations: Vec<JsonScheduledOperation>,
}

pub fn write_json(solution: &Solution<'_>) -> Result<String> {
    let json = JsonSolution {
        number_of_machines: solution.instance().number_of_machines(),
        number_of_jobs: solution.instance().number_of_jobs(),
        number_of_operations: solution.instance().number_of_operations(),
        operations: solution
            .operations()
            .iter()
            .map(|op| JsonScheduledOperation {
                job_id: op.job_id,
                job_position: op.job_position,
                operation_id: op.operation_id,
                alternative_id: op.alternative_id,
                machine_id: op.machine_id,
                machine_position: op.machine_position,
                start: op.start,
                processing_time: op.processing_time,
                end: op.end(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&json)
        .map_err(|e| ShopSchedError::internal(format!("failed to serialize solution: {e}")))
}

/// Rebuilds a `Solution` from its JSON form against `instance`. The operation
/// order in the JSON does not need to match machine/job position; `build`
/// recomputes every derived metric from `(job_id, operation_id, alternative_id,
/// start)` alone, ignoring the serialized positions.
pub fn read_json<'a>(input: &str, instance: &'a Instance) -> Result<Solution<'a>> {
    let parsed: JsonSolution = serde_json::from_str(input)
        .map_err(|e| ShopSchedError::invalid_input(format!("malformed solution JSON: {e}")))?;

    let mut builder = SolutionBuilder::new(instance);
    for op in &parsed.operations {
        builder.append_operation(op.job_id, op.operation_id, op.alternative_id, op.start)?;
    }
    builder.sort_machines();
    builder.sort_jobs();
    builder.build()
}
