//! Positional MILP builder (spec §4.8): a position-indexed model for PFSS
//! variants only, grounded on `original_source/milp_positional.hpp` (citing
//! Ta et al. 2018).

use crate::error::{Result, ShopSchedError};
use crate::instance::{Instance, Objective};
use crate::milp::backend::{ConstraintSense, MilpModel, VariableKind};

/// Builds the positional MILP model for `instance`, which must be a
/// non-flexible permutation flow shop (§4.8's "for PFSS only").
pub fn build(instance: &Instance) -> Result<MilpModel> {
    if !instance.is_pfss() {
        return Err(ShopSchedError::invalid_config(
            "positional MILP requires a non-flexible permutation flow shop",
        ));
    }

    let n = instance.number_of_jobs();
    let mmach = instance.number_of_machines();
    let big_m: f64 = (0..n)
        .flat_map(|j| (0..mmach).map(move |i| (j, i)))
        .map(|(j, i)| instance.pfss_processing_time(j, i))
        .sum::<i64>() as f64;

    let mut model = MilpModel::new();

    // x[j,k]: job j at position k.
    let mut x = vec![vec![0usize; n]; n];
    for job_id in 0..n {
        for position in 0..n {
            x[job_id][position] = model.add_variable(
                format!("x_{job_id}_{position}"),
                VariableKind::Binary,
            );
        }
    }
    for job_id in 0..n {
        model.add_row(
            format!("assign_job_{job_id}"),
            (0..n).map(|k| (x[job_id][k], 1.0)).collect(),
            ConstraintSense::Equal,
            1.0,
        );
    }
    for position in 0..n {
        model.add_row(
            format!("assign_position_{position}"),
            (0..n).map(|j| (x[j][position], 1.0)).collect(),
            ConstraintSense::Equal,
            1.0,
        );
    }

    // p[i,k]: processing time of the position-k operation on machine i.
    let mut p = vec![vec![0usize; n]; mmach];
    for machine_id in 0..mmach {
        for position in 0..n {
            p[machine_id][position] = model.add_variable(
                format!("p_{machine_id}_{position}"),
                VariableKind::Integer { lower_bound: 0.0, upper_bound: big_m },
            );
            let terms: Vec<(usize, f64)> = (0..n)
                .map(|job_id| {
                    (
                        x[job_id][position],
                        instance.pfss_processing_time(job_id, machine_id) as f64,
                    )
                })
                .collect();
            let mut row_terms = terms;
            row_terms.push((p[machine_id][position], -1.0));
            let sense = if instance.blocking() {
                ConstraintSense::GreaterOrEqual
            } else {
                ConstraintSense::Equal
            };
            model.add_row(format!("p_def_{machine_id}_{position}"), row_terms, sense, 0.0);
        }
    }

    // d[k]: due date of the position-k job (TotalTardiness only).
    let mut d = Vec::new();
    if instance.objective() == Objective::TotalTardiness {
        for position in 0..n {
            let var = model.add_variable(
                format!("d_{position}"),
                VariableKind::Continuous { lower_bound: -big_m, upper_bound: big_m },
            );
            let terms: Vec<(usize, f64)> = (0..n)
                .map(|job_id| {
                    (
                        x[job_id][position],
                        instance.job(job_id).due_date.unwrap_or(-1) as f64,
                    )
                })
                .collect();
            let mut row_terms = terms;
            row_terms.push((var, -1.0));
            model.add_row(format!("d_def_{position}"), row_terms, ConstraintSense::Equal, 0.0);
            d.push(var);
        }
    }

    // co[i,k]: completion time of the position-k operation on machine i.
    let mut co = vec![vec![0usize; n]; mmach];
    for machine_id in 0..mmach {
        for position in 0..n {
            co[machine_id][position] = model.add_variable(
                format!("co_{machine_id}_{position}"),
                VariableKind::Integer { lower_bound: 0.0, upper_bound: big_m },
            );
        }
    }

    // Intra-job precedence: co[i,k] >= co[i-1,k] + p[i,k], equality under
    // no_wait or blocking.
    let job_sense = if instance.no_wait() || instance.blocking() {
        ConstraintSense::Equal
    } else {
        ConstraintSense::GreaterOrEqual
    };
    for position in 0..n {
        for machine_id in 1..mmach {
            model.add_row(
                format!("job_prec_{machine_id}_{position}"),
                vec![
                    (co[machine_id][position], 1.0),
                    (co[machine_id - 1][position], -1.0),
                    (p[machine_id][position], -1.0),
                ],
                job_sense,
                0.0,
            );
        }
    }

    // Intra-machine precedence: co[i,k] >= co[i,k-1] + p[i,k], equality when
    // machine no_idle.
    for machine_id in 0..mmach {
        let machine_sense = if instance.machine(machine_id).no_idle {
            ConstraintSense::Equal
        } else {
            ConstraintSense::GreaterOrEqual
        };
        for position in 1..n {
            model.add_row(
                format!("machine_prec_{machine_id}_{position}"),
                vec![
                    (co[machine_id][position], 1.0),
                    (co[machine_id][position - 1], -1.0),
                    (p[machine_id][position], -1.0),
                ],
                machine_sense,
                0.0,
            );
        }
        // position 0 simply starts at its own processing time.
        model.add_row(
            format!("machine_prec_{machine_id}_0"),
            vec![(co[machine_id][0], 1.0), (p[machine_id][0], -1.0)],
            ConstraintSense::Equal,
            0.0,
        );
    }

    let cmax = if instance.objective() == Objective::Makespan {
        let var = model.add_variable("cmax", VariableKind::Integer { lower_bound: 0.0, upper_bound: big_m });
        model.add_row(
            "cmax_def",
            vec![(var, 1.0), (co[mmach - 1][n - 1], -1.0)],
            ConstraintSense::Equal,
            0.0,
        );
        Some(var)
    } else {
        None
    };

    let mut tardiness_vars = Vec::new();
    if instance.objective() == Objective::TotalTardiness {
        for position in 0..n {
            let var = model.add_variable(
                format!("t_{position}"),
                VariableKind::Integer { lower_bound: 0.0, upper_bound: big_m },
            );
            model.add_row(
                format!("t_def_{position}"),
                vec![(var, 1.0), (co[mmach - 1][position], -1.0), (d[position], 1.0)],
                ConstraintSense::GreaterOrEqual,
                0.0,
            );
            tardiness_vars.push(var);
        }
    }

    let objective_terms = match instance.objective() {
        Objective::Makespan => vec![(cmax.expect("cmax variable created for Makespan objective"), 1.0)],
        // §4.8 defines `t[k]` per position without a weight variable; the
        // positional model therefore minimizes unweighted total tardiness.
        Objective::TotalTardiness => tardiness_vars.iter().map(|&var| (var, 1.0)).collect(),
        Objective::TotalFlowTime => (0..n)
            .map(|position| (co[mmach - 1][position], 1.0))
            .collect(),
        Objective::Throughput => Vec::new(),
    };
    model.set_objective(crate::milp::backend::ObjectiveSense::Minimize, objective_terms);

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceBuilder;

    #[test]
    fn build_rejects_non_pfss_instance() {
        let mut b = InstanceBuilder::new();
        b.set_number_of_machines(2).unwrap();
        let j = b.add_job();
        let op = b.add_operation(j).unwrap();
        b.add_alternative(j, op, 0, 3).unwrap();
        b.add_alternative(j, op, 1, 5).unwrap();
        let inst = b.build().unwrap();
        assert!(build(&inst).is_err());
    }

    #[test]
    fn build_succeeds_for_pfss_instance() {
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(2).unwrap();
        b.set_permutation(true);
        for p in [[3, 2], [1, 4]] {
            let j = b.add_job();
            for (mid, &t) in p.iter().enumerate() {
                let op = b.add_operation(j).unwrap();
                b.add_alternative(j, op, mid, t).unwrap();
            }
        }
        let inst = b.build().unwrap();
        let model = build(&inst).unwrap();
        assert!(model.number_of_variables() > 0);
    }
}
