//! File-format readers and writers for [`super::Instance`] (spec §4.1).
//!
//! Every format is whitespace/newline-tokenized the same way, following the
//! scheduling-benchmark convention the five contracts describe (Taillard-style
//! flow-shop, Vallada et al. 2008, standard job-shop, flexible-job-shop). JSON
//! uses a separate `serde`-backed path; see [`read_json`]/[`write_json`].

use std::fmt::Write as _;
use std::io::Read;

use serde::{Deserialize, Serialize};

use super::{Instance, InstanceBuilder, Objective};
use crate::error::{Result, ShopSchedError};

/// Splits a whole input on ASCII whitespace, ignoring newlines — the
/// tokenization all four line-oriented formats share.
struct Tokens<'a> {
    it: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Tokens {
            it: input.split_ascii_whitespace(),
        }
    }

    fn next_str(&mut self) -> Result<&'a str> {
        self.it
            .next()
            .ok_or_else(|| ShopSchedError::invalid_input("unexpected end of input"))
    }

    fn next_usize(&mut self) -> Result<usize> {
        let tok = self.next_str()?;
        tok.parse::<usize>()
            .map_err(|_| ShopSchedError::invalid_input(format!("expected integer, got '{tok}'")))
    }

    fn next_i64(&mut self) -> Result<i64> {
        let tok = self.next_str()?;
        tok.parse::<i64>()
            .map_err(|_| ShopSchedError::invalid_input(format!("expected integer, got '{tok}'")))
    }
}

fn read_to_string_checked(mut reader: impl Read) -> Result<String> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .map_err(|e| ShopSchedError::invalid_input(format!("failed to read input: {e}")))?;
    Ok(buf)
}

/// `first line "nJ nM"`, then one row of nJ processing times per machine.
pub fn read_flow_shop(reader: impl Read) -> Result<Instance> {
    let input = read_to_string_checked(reader)?;
    let mut tok = Tokens::new(&input);
    let number_of_jobs = tok.next_usize()?;
    let number_of_machines = tok.next_usize()?;

    let mut builder = InstanceBuilder::new();
    builder.set_objective(Objective::Makespan);
    builder.set_number_of_machines(number_of_machines)?;
    builder.set_permutation(true);
    let job_ids = builder.add_jobs(number_of_jobs);
    for job_id in &job_ids {
        builder.add_operation(*job_id)?;
    }

    for machine_id in 0..number_of_machines {
        for job_id in &job_ids {
            let p = tok.next_i64()?;
            builder.add_alternative(*job_id, 0, machine_id, p)?;
        }
    }
    builder.build()
}

/// `nJ nM`, then per job `(machine_id, processing_time)` pairs for every
/// machine, then a trailing block of `nJ` due dates.
pub fn read_vallada2008_flow_shop(reader: impl Read) -> Result<Instance> {
    let input = read_to_string_checked(reader)?;
    let mut tok = Tokens::new(&input);
    let number_of_jobs = tok.next_usize()?;
    let number_of_machines = tok.next_usize()?;

    let mut builder = InstanceBuilder::new();
    builder.set_objective(Objective::TotalTardiness);
    builder.set_number_of_machines(number_of_machines)?;
    builder.set_permutation(true);
    let job_ids = builder.add_jobs(number_of_jobs);

    for job_id in &job_ids {
        for _ in 0..number_of_machines {
            let machine_id = tok.next_usize()?;
            let p = tok.next_i64()?;
            let op_id = builder.add_operation(*job_id)?;
            builder.add_alternative(*job_id, op_id, machine_id, p)?;
        }
    }

    for job_id in &job_ids {
        let due_date = tok.next_i64()?;
        builder.set_job_due_date(*job_id, due_date)?;
    }

    builder.build()
}

/// `nJ nM`, then per job `nM` `(machine_id, processing_time)` pairs.
pub fn read_job_shop(reader: impl Read) -> Result<Instance> {
    let input = read_to_string_checked(reader)?;
    let mut tok = Tokens::new(&input);
    let number_of_jobs = tok.next_usize()?;
    let number_of_machines = tok.next_usize()?;

    let mut builder = InstanceBuilder::new();
    builder.set_objective(Objective::Makespan);
    builder.set_number_of_machines(number_of_machines)?;
    let job_ids = builder.add_jobs(number_of_jobs);

    for job_id in &job_ids {
        for _ in 0..number_of_machines {
            let machine_id = tok.next_usize()?;
            let p = tok.next_i64()?;
            let op_id = builder.add_operation(*job_id)?;
            builder.add_alternative(*job_id, op_id, machine_id, p)?;
        }
    }

    builder.build()
}

/// `nJ nM _`, then per job `k` followed by `k` blocks, each an alternative
/// count and that many `(machine_id, processing_time)` pairs. Machine ids in
/// this format are conventionally 1-indexed in the source files; converted to
/// 0-indexed on read.
pub fn read_flexible_job_shop(reader: impl Read) -> Result<Instance> {
    let input = read_to_string_checked(reader)?;
    let mut tok = Tokens::new(&input);
    let number_of_jobs = tok.next_usize()?;
    let number_of_machines = tok.next_usize()?;
    let _average_machines_per_operation = tok.next_str()?; // ignored third header field

    let mut builder = InstanceBuilder::new();
    builder.set_objective(Objective::Makespan);
    builder.set_number_of_machines(number_of_machines)?;
    let job_ids = builder.add_jobs(number_of_jobs);

    for job_id in &job_ids {
        let number_of_operations = tok.next_usize()?;
        for _ in 0..number_of_operations {
            let number_of_alternatives = tok.next_usize()?;
            let op_id = builder.add_operation(*job_id)?;
            for _ in 0..number_of_alternatives {
                let machine_id_one_indexed = tok.next_usize()?;
                let p = tok.next_i64()?;
                if machine_id_one_indexed == 0 {
                    return Err(ShopSchedError::invalid_input(
                        "flexible-job-shop machine ids are 1-indexed, got 0",
                    ));
                }
                builder.add_alternative(*job_id, op_id, machine_id_one_indexed - 1, p)?;
            }
        }
    }

    builder.build()
}

// ---------------------------------------------------------------------
// JSON (spec §6)
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct JsonAlternative {
    machine_id: usize,
    processing_time: i64,
}

#[derive(Serialize, Deserialize)]
struct JsonOperation {
    alternatives: Vec<JsonAlternative>,
}

#[derive(Serialize, Deserialize)]
struct JsonJob {
    #[serde(default)]
    release_date: i64,
    #[serde(default = "default_due_date")]
    due_date: i64,
    #[serde(default = "default_weight")]
    weight: i64,
    operations: Vec<JsonOperation>,
}

fn default_due_date() -> i64 {
    -1
}

fn default_weight() -> i64 {
    1
}

#[derive(Serialize, Deserialize)]
struct JsonMachine {
    #[serde(default)]
    no_idle: bool,
}

#[derive(Serialize, Deserialize)]
struct JsonInstance {
    objective: String,
    machines: Vec<JsonMachine>,
    jobs: Vec<JsonJob>,
    #[serde(default)]
    operations_arbitrary_order: bool,
    #[serde(default)]
    no_wait: bool,
    #[serde(default)]
    blocking: bool,
    #[serde(default)]
    permutation: bool,
}

/// Declarative JSON mirroring the data model (spec §4.1/§6).
pub fn read_json(reader: impl Read) -> Result<Instance> {
    let input = read_to_string_checked(reader)?;
    let parsed: JsonInstance = serde_json::from_str(&input)
        .map_err(|e| ShopSchedError::invalid_input(format!("malformed instance JSON: {e}")))?;

    let objective: Objective = parsed
        .objective
        .parse()
        .map_err(ShopSchedError::invalid_input)?;

    let mut builder = InstanceBuilder::new();
    builder.set_objective(objective);
    builder.set_number_of_machines(parsed.machines.len())?;
    builder.set_operations_arbitrary_order(parsed.operations_arbitrary_order);
    builder.set_no_wait(parsed.no_wait);
    builder.set_blocking(parsed.blocking);
    builder.set_permutation(parsed.permutation);

    for (machine_id, machine) in parsed.machines.iter().enumerate() {
        builder.set_machine_no_idle(machine_id, machine.no_idle)?;
    }

    for job in &parsed.jobs {
        let job_id = builder.add_job();
        builder.set_job_release_date(job_id, job.release_date)?;
        builder.set_job_due_date(job_id, job.due_date)?;
        builder.set_job_weight(job_id, job.weight)?;
        for operation in &job.operations {
            let op_id = builder.add_operation(job_id)?;
            for alt in &operation.alternatives {
                builder.add_alternative(job_id, op_id, alt.machine_id, alt.processing_time)?;
            }
        }
    }

    builder.build()
}

pub fn write_json(instance: &Instance) -> Result<String> {
    let json = JsonInstance {
        objective: instance.objective().to_string(),
        machines: instance
            .machines()
            .iter()
            .map(|m| JsonMachine { no_idle: m.no_idle })
            .collect(),
        jobs: instance
            .jobs()
            .iter()
            .map(|job| JsonJob {
                release_date: job.release_date,
                due_date: job.due_date.unwrap_or(-1),
                weight: job.weight,
                operations: job
                    .operations
                    .iter()
                    .map(|op| JsonOperation {
                        alternatives: op
                            .alternatives
                            .iter()
                            .map(|a| JsonAlternative {
                                machine_id: a.machine_id,
                                processing_time: a.processing_time,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
        operations_arbitrary_order: instance.operations_arbitrary_order(),
        no_wait: instance.no_wait(),
        blocking: instance.blocking(),
        permutation: instance.permutation(),
    };
    serde_json::to_string_pretty(&json)
        .map_err(|e| ShopSchedError::internal(format!("failed to serialize instance: {e}")))
}

// ---------------------------------------------------------------------
// Writers for the line-oriented formats (supplemental, symmetric with the
// readers above).
// ---------------------------------------------------------------------

/// Writes the flow-shop format read by [`read_flow_shop`]. Only valid for
/// permutation flow-shop instances with a single alternative per operation.
pub fn write_flow_shop(instance: &Instance) -> Result<String> {
    if !instance.is_pfss() {
        return Err(ShopSchedError::invalid_config(
            "flow-shop format requires a non-flexible permutation flow shop",
        ));
    }
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", instance.number_of_jobs(), instance.number_of_machines());
    for machine_id in 0..instance.number_of_machines() {
        let row: Vec<String> = (0..instance.number_of_jobs())
            .map(|job_id| instance.pfss_processing_time(job_id, machine_id).to_string())
            .collect();
        let _ = writeln!(out, "{}", row.join(" "));
    }
    Ok(out)
}

/// Writes the job-shop format read by [`read_job_shop`].
pub fn write_job_shop(instance: &Instance) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", instance.number_of_jobs(), instance.number_of_machines());
    for job in instance.jobs() {
        let mut fields = Vec::with_capacity(job.operations.len() * 2);
        for operation in &job.operations {
            let alt = operation.alternatives.first().ok_or_else(|| {
                ShopSchedError::invalid_config("job-shop format requires one alternative per operation")
            })?;
            fields.push(alt.machine_id.to_string());
            fields.push(alt.processing_time.to_string());
        }
        let _ = writeln!(out, "{}", fields.join(" "));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_flow_shop_scenario_one() {
        // Scenario 1 of spec §8: 3 jobs x 2 machines, optimal makespan 8.
        let input = "3 2\n3 1 2\n2 4 1\n";
        let inst = read_flow_shop(input.as_bytes()).unwrap();
        assert_eq!(inst.number_of_jobs(), 3);
        assert_eq!(inst.number_of_machines(), 2);
        assert_eq!(inst.objective(), Objective::Makespan);
        assert!(inst.is_pfss());
        assert_eq!(inst.pfss_processing_time(0, 0), 3);
        assert_eq!(inst.pfss_processing_time(2, 1), 1);
    }

    #[test]
    fn reads_vallada2008_with_due_dates() {
        let input = "2 2\n0 3 1 2\n0 1 1 4\n10 12\n";
        let inst = read_vallada2008_flow_shop(input.as_bytes()).unwrap();
        assert_eq!(inst.objective(), Objective::TotalTardiness);
        assert_eq!(inst.job(0).due_date, Some(10));
        assert_eq!(inst.job(1).due_date, Some(12));
    }

    #[test]
    fn reads_job_shop() {
        let input = "2 2\n0 3 1 2\n1 1 0 4\n";
        let inst = read_job_shop(input.as_bytes()).unwrap();
        assert!(!inst.permutation());
        assert_eq!(inst.number_of_operations(), 4);
    }

    #[test]
    fn reads_flexible_job_shop_one_indexed_machines() {
        let input = "1 2 1\n1 2 1 3 2 5\n";
        let inst = read_flexible_job_shop(input.as_bytes()).unwrap();
        assert!(inst.flexible());
        let op = &inst.job(0).operations[0];
        assert_eq!(op.alternatives[0].machine_id, 0);
        assert_eq!(op.alternatives[1].machine_id, 1);
    }

    #[test]
    fn json_round_trips() {
        let input = "3 2\n3 1 2\n2 4 1\n";
        let inst = read_flow_shop(input.as_bytes()).unwrap();
        let json = write_json(&inst).unwrap();
        let back = read_json(json.as_bytes()).unwrap();
        assert_eq!(back.number_of_jobs(), inst.number_of_jobs());
        assert_eq!(back.number_of_machines(), inst.number_of_machines());
        assert_eq!(back.pfss_processing_time(1, 1), inst.pfss_processing_time(1, 1));
    }

    #[test]
    fn flow_shop_writer_round_trips_through_reader() {
        let input = "3 2\n3 1 2\n2 4 1\n";
        let inst = read_flow_shop(input.as_bytes()).unwrap();
        let text = write_flow_shop(&inst).unwrap();
        let back = read_flow_shop(text.as_bytes()).unwrap();
        assert_eq!(back.pfss_processing_time(0, 0), 3);
        assert_eq!(back.pfss_processing_time(2, 1), 1);
    }
}
