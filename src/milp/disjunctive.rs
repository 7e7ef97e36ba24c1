//! Disjunctive MILP builder (spec §4.7): fills a solver-agnostic [`MilpModel`]
//! for the general shop with optional no-wait / no-idle / blocking / flexible
//! constraints. Grounded on `original_source/milp_disjunctive.hpp`'s citations
//! (Naderi & Zandieh 2014 model 3 for no-wait, Roshanaei et al. 2013 model 5
//! for flexible shops).

use crate::instance::{Instance, Objective};
use crate::milp::backend::{ConstraintSense, MilpModel, ObjectiveSense, VariableKind};

/// `Σⱼ Σ_o max_alt p(j,o,alt)`: a valid big-M for every disjunctive pairing.
fn big_m(instance: &Instance) -> f64 {
    instance
        .jobs()
        .iter()
        .flat_map(|job| job.operations.iter())
        .map(|op| op.alternatives.iter().map(|a| a.processing_time).max().unwrap_or(0))
        .sum::<i64>() as f64
}

/// Lower bound for `co[j,o]`: the cumulative min-processing-time prefix for
/// non-open shops (operations are ordered), or just this operation's own
/// minimum for an open shop (no prefix ordering to lower-bound against).
fn completion_lower_bound(instance: &Instance, job_id: usize, operation_id: usize, open_shop: bool) -> f64 {
    let job = instance.job(job_id);
    if open_shop {
        job.operations[operation_id].min_processing_time() as f64
    } else {
        job.operations[..=operation_id]
            .iter()
            .map(|op| op.min_processing_time())
            .sum::<i64>() as f64
    }
}

fn job_processing_time_sum_const(instance: &Instance, job_id: usize) -> f64 {
    instance
        .job(job_id)
        .operations
        .iter()
        .map(|op| op.min_processing_time())
        .sum::<i64>() as f64
}

/// A processing-time term: either a `p[j,o]` decision variable (flexible or
/// blocking) or a fixed constant (single-alternative, non-blocking).
enum PTerm {
    Var(usize),
    Const(f64),
}

/// Indices of the `co[j,o]` variables, laid out job-major.
struct CompletionIndex {
    offsets: Vec<usize>,
}

impl CompletionIndex {
    fn new(instance: &Instance) -> Self {
        let mut offsets = Vec::with_capacity(instance.number_of_jobs() + 1);
        let mut running = 0usize;
        offsets.push(0);
        for job in instance.jobs() {
            running += job.operations.len();
            offsets.push(running);
        }
        CompletionIndex { offsets }
    }

    fn of(&self, job_id: usize, operation_id: usize) -> usize {
        self.offsets[job_id] + operation_id
    }
}

/// Builds the disjunctive MILP model for `instance`.
pub fn build(instance: &Instance) -> MilpModel {
    let mut model = MilpModel::new();
    let m = big_m(instance);
    let open_shop = instance.operations_arbitrary_order();
    let flexible = instance.flexible();
    let blocking = instance.blocking();
    let has_p_vars = flexible || blocking;

    let completion = CompletionIndex::new(instance);
    let mut co = vec![0usize; completion.offsets[instance.number_of_jobs()]];
    for (job_id, job) in instance.jobs().iter().enumerate() {
        for operation_id in 0..job.operations.len() {
            let lb = completion_lower_bound(instance, job_id, operation_id, open_shop);
            let idx = model.add_variable(
                format!("co_{job_id}_{operation_id}"),
                VariableKind::Integer {
                    lower_bound: lb,
                    upper_bound: m,
                },
            );
            co[completion.of(job_id, operation_id)] = idx;
        }
    }

    // x[j,o,a]: alternative selection (flexible only).
    let mut x: Vec<Vec<Vec<usize>>> = Vec::new();
    if flexible {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            let mut job_x = Vec::new();
            for (operation_id, operation) in job.operations.iter().enumerate() {
                let mut op_x = Vec::new();
                for alt_id in 0..operation.alternatives.len() {
                    op_x.push(model.add_variable(
                        format!("x_{job_id}_{operation_id}_{alt_id}"),
                        VariableKind::Binary,
                    ));
                }
                model.add_row(
                    format!("alt_select_{job_id}_{operation_id}"),
                    op_x.iter().map(|&v| (v, 1.0)).collect(),
                    ConstraintSense::Equal,
                    1.0,
                );
                job_x.push(op_x);
            }
            x.push(job_x);
        }
    }

    // p[j,o]: actual processing time, needed whenever an operation's
    // duration isn't pinned to a single known constant (flexible: depends on
    // which alternative is chosen) or can run longer than nominal (blocking).
    let mut p: Vec<Vec<usize>> = Vec::new();
    if has_p_vars {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            let mut job_p = Vec::new();
            for (operation_id, operation) in job.operations.iter().enumerate() {
                let pmin = operation.min_processing_time() as f64;
                let p_var = model.add_variable(
                    format!("p_{job_id}_{operation_id}"),
                    VariableKind::Integer { lower_bound: pmin, upper_bound: m },
                );
                job_p.push(p_var);
            }
            p.push(job_p);
        }
    }

    let p_term = |job_id: usize, operation_id: usize| -> PTerm {
        if has_p_vars {
            PTerm::Var(p[job_id][operation_id])
        } else {
            PTerm::Const(instance.job(job_id).operations[operation_id].min_processing_time() as f64)
        }
    };

    // ck[j,o,a]: per-alternative completion time (0 if not selected),
    // flexible only.
    let mut ck: Vec<Vec<Vec<usize>>> = Vec::new();
    if flexible {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            let mut job_ck = Vec::new();
            for (operation_id, operation) in job.operations.iter().enumerate() {
                let mut op_ck = Vec::new();
                for alt_id in 0..operation.alternatives.len() {
                    op_ck.push(model.add_variable(
                        format!("ck_{job_id}_{operation_id}_{alt_id}"),
                        VariableKind::Integer { lower_bound: 0.0, upper_bound: m },
                    ));
                }
                job_ck.push(op_ck);
            }
            ck.push(job_ck);
        }
    }

    // Alternative-selection constraints tying x, ck, p and co together.
    if flexible {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            for (operation_id, operation) in job.operations.iter().enumerate() {
                let p_var = p[job_id][operation_id];
                let co_var = co[completion.of(job_id, operation_id)];

                // p[j,o] = Σ_a p(j,o,a)·x[j,o,a], equality unless blocking
                // (blocking can stretch the effective occupancy beyond the
                // nominal processing time, so only a lower bound applies).
                let mut terms: Vec<(usize, f64)> = vec![(p_var, 1.0)];
                for (alt_id, alt) in operation.alternatives.iter().enumerate() {
                    terms.push((x[job_id][operation_id][alt_id], -(alt.processing_time as f64)));
                }
                model.add_row(
                    format!("p_select_{job_id}_{operation_id}"),
                    terms,
                    if blocking { ConstraintSense::GreaterOrEqual } else { ConstraintSense::Equal },
                    0.0,
                );

                let mut co_sum_terms: Vec<(usize, f64)> = vec![(co_var, 1.0)];
                for alt_id in 0..operation.alternatives.len() {
                    let ck_var = ck[job_id][operation_id][alt_id];
                    // ck[j,o,a] <= M * x[j,o,a]
                    model.add_row(
                        format!("ck_bound_{job_id}_{operation_id}_{alt_id}"),
                        vec![(ck_var, 1.0), (x[job_id][operation_id][alt_id], -m)],
                        ConstraintSense::LessOrEqual,
                        0.0,
                    );
                    co_sum_terms.push((ck_var, -1.0));
                }
                // co[j,o] = Σ_a ck[j,o,a]
                model.add_row(
                    format!("co_from_ck_{job_id}_{operation_id}"),
                    co_sum_terms,
                    ConstraintSense::Equal,
                    0.0,
                );
                // co[j,o] >= p[j,o]
                model.add_row(
                    format!("co_ge_p_{job_id}_{operation_id}"),
                    vec![(co_var, 1.0), (p_var, -1.0)],
                    ConstraintSense::GreaterOrEqual,
                    0.0,
                );
            }
        }
    } else if blocking {
        // Non-flexible, blocking-only: p[j,o] is pinned to the single
        // alternative's processing time.
        for (job_id, job) in instance.jobs().iter().enumerate() {
            for (operation_id, operation) in job.operations.iter().enumerate() {
                let p_var = p[job_id][operation_id];
                let pinned = operation.alternatives[0].processing_time as f64;
                model.add_row(
                    format!("p_fixed_{job_id}_{operation_id}"),
                    vec![(p_var, 1.0)],
                    ConstraintSense::Equal,
                    pinned,
                );
            }
        }
    }

    // y[i,p,p']: pairwise machine-order binaries, over every pair of
    // (job,operation) landing on the same machine.
    let mut y: Vec<Vec<Vec<usize>>> = vec![Vec::new(); instance.number_of_machines()];
    for machine_id in 0..instance.number_of_machines() {
        let refs = instance.machine_operations(machine_id);
        let mut rows = vec![Vec::new(); refs.len()];
        for p_idx in 0..refs.len() {
            for p_prime_idx in 0..p_idx {
                let var = model.add_variable(
                    format!("y_{machine_id}_{p_idx}_{p_prime_idx}"),
                    VariableKind::Binary,
                );
                rows[p_idx].push(var);
            }
        }
        y[machine_id] = rows;
    }

    // z[j,o1,o2]: job disjunction, open shop only. A job is a single
    // resource too: two of its own operations can't run concurrently even
    // though open-shop operations carry no inherent precedence.
    let mut z: Vec<Vec<Vec<Option<usize>>>> = Vec::new();
    if open_shop {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            let n_ops = job.operations.len();
            let mut rows = vec![vec![None; n_ops]; n_ops];
            for o1 in 0..n_ops {
                for o2 in (o1 + 1)..n_ops {
                    let var = model.add_variable(format!("z_{job_id}_{o1}_{o2}"), VariableKind::Binary);
                    rows[o1][o2] = Some(var);
                }
            }
            z.push(rows);
        }
    }

    let cmax = match instance.objective() {
        Objective::Makespan => Some(model.add_variable("cmax", VariableKind::Integer { lower_bound: 0.0, upper_bound: m })),
        _ => None,
    };

    let mut cj = Vec::new();
    if open_shop && instance.objective() == Objective::TotalFlowTime {
        for job_id in 0..instance.number_of_jobs() {
            cj.push(model.add_variable(format!("cj_{job_id}"), VariableKind::Integer { lower_bound: 0.0, upper_bound: m }));
        }
    }

    let mut t = Vec::new();
    if instance.objective() == Objective::TotalTardiness {
        for job_id in 0..instance.number_of_jobs() {
            t.push(model.add_variable(format!("t_{job_id}"), VariableKind::Integer { lower_bound: 0.0, upper_bound: m }));
        }
    }

    // psum[j]: total processing time of job j, needed for the blocking
    // window whenever that total isn't a fixed constant.
    let mut psum: Vec<Option<usize>> = vec![None; instance.number_of_jobs()];
    if open_shop && has_p_vars {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            let psum_var = model.add_variable(format!("psum_{job_id}"), VariableKind::Integer { lower_bound: 0.0, upper_bound: m });
            let mut terms: Vec<(usize, f64)> = vec![(psum_var, 1.0)];
            for operation_id in 0..job.operations.len() {
                terms.push((p[job_id][operation_id], -1.0));
            }
            model.add_row(format!("psum_def_{job_id}"), terms, ConstraintSense::Equal, 0.0);
            psum[job_id] = Some(psum_var);
        }
    }

    // s[j]: job start time, open shop with no_wait or blocking.
    let mut s: Vec<Option<usize>> = vec![None; instance.number_of_jobs()];
    if open_shop && (instance.no_wait() || blocking) {
        for job_id in 0..instance.number_of_jobs() {
            let s_var = model.add_variable(format!("s_{job_id}"), VariableKind::Integer { lower_bound: 0.0, upper_bound: m });
            s[job_id] = Some(s_var);
        }
    }

    // sm[i] / pmsum[i]: no-idle window per machine.
    let mut sm: Vec<Option<usize>> = vec![None; instance.number_of_machines()];
    let mut pmsum: Vec<Option<usize>> = vec![None; instance.number_of_machines()];
    for machine_id in 0..instance.number_of_machines() {
        if !instance.machine(machine_id).no_idle {
            continue;
        }
        sm[machine_id] = Some(model.add_variable(format!("sm_{machine_id}"), VariableKind::Integer { lower_bound: 0.0, upper_bound: m }));
        if flexible {
            let pmsum_var = model.add_variable(format!("pmsum_{machine_id}"), VariableKind::Integer { lower_bound: 0.0, upper_bound: m });
            let mut terms: Vec<(usize, f64)> = vec![(pmsum_var, 1.0)];
            for r in instance.machine_operations(machine_id) {
                terms.push((x[r.job_id][r.operation_id][r.alternative_id], -(alt_processing_time(instance, r))));
            }
            model.add_row(format!("pmsum_def_{machine_id}"), terms, ConstraintSense::Equal, 0.0);
            pmsum[machine_id] = Some(pmsum_var);
        }
    }

    // Makespan definition.
    if let Some(cmax) = cmax {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            let operation_ids: Vec<usize> = if open_shop {
                (0..job.operations.len()).collect()
            } else {
                vec![job.operations.len() - 1]
            };
            for operation_id in operation_ids {
                model.add_row(
                    format!("cmax_def_{job_id}_{operation_id}"),
                    vec![(cmax, 1.0), (co[completion.of(job_id, operation_id)], -1.0)],
                    ConstraintSense::GreaterOrEqual,
                    0.0,
                );
            }
        }
    }

    // Flow time per job (open shop).
    for (job_id, &cj_var) in cj.iter().enumerate() {
        for operation_id in 0..instance.job(job_id).operations.len() {
            model.add_row(
                format!("cj_def_{job_id}_{operation_id}"),
                vec![(cj_var, 1.0), (co[completion.of(job_id, operation_id)], -1.0)],
                ConstraintSense::GreaterOrEqual,
                0.0,
            );
        }
    }

    // Tardiness.
    for (job_id, &t_var) in t.iter().enumerate() {
        let job = instance.job(job_id);
        let Some(due_date) = job.due_date else { continue };
        let operation_ids: Vec<usize> = if open_shop {
            (0..job.operations.len()).collect()
        } else {
            vec![job.operations.len() - 1]
        };
        for operation_id in operation_ids {
            model.add_row(
                format!("tardiness_{job_id}_{operation_id}"),
                vec![(t_var, 1.0), (co[completion.of(job_id, operation_id)], -1.0)],
                ConstraintSense::GreaterOrEqual,
                -(due_date as f64),
            );
        }
    }

    // Job precedence (non-open shop): co[j,o+1] - co[j,o] >= p(j,o+1), or
    // equality under no_wait/blocking.
    if !open_shop {
        let sense = if instance.no_wait() || blocking {
            ConstraintSense::Equal
        } else {
            ConstraintSense::GreaterOrEqual
        };
        for (job_id, job) in instance.jobs().iter().enumerate() {
            for operation_id in 1..job.operations.len() {
                let mut terms = vec![
                    (co[completion.of(job_id, operation_id)], 1.0),
                    (co[completion.of(job_id, operation_id - 1)], -1.0),
                ];
                let rhs = match p_term(job_id, operation_id) {
                    PTerm::Const(c) => c,
                    PTerm::Var(v) => {
                        terms.push((v, -1.0));
                        0.0
                    }
                };
                model.add_row(format!("precedence_{job_id}_{operation_id}"), terms, sense, rhs);
            }
        }
    }

    // Job disjunction (open shop): z[j,o1,o2] orders a job's own operations
    // against each other, since a job can't be in two places at once.
    if open_shop {
        for (job_id, job) in instance.jobs().iter().enumerate() {
            for o1 in 0..job.operations.len() {
                for o2 in (o1 + 1)..job.operations.len() {
                    let z_var = z[job_id][o1][o2].expect("created above for every o1<o2 pair");
                    let co1 = co[completion.of(job_id, o1)];
                    let co2 = co[completion.of(job_id, o2)];

                    let mut fwd_terms = vec![(co1, 1.0), (co2, -1.0), (z_var, m)];
                    let fwd_rhs = match p_term(job_id, o2) {
                        PTerm::Const(c) => c,
                        PTerm::Var(v) => {
                            fwd_terms.push((v, -1.0));
                            0.0
                        }
                    };
                    model.add_row(format!("job_disj_{job_id}_{o1}_{o2}_fwd"), fwd_terms, ConstraintSense::GreaterOrEqual, fwd_rhs);

                    let mut bwd_terms = vec![(co2, 1.0), (co1, -1.0), (z_var, -m)];
                    let bwd_rhs = match p_term(job_id, o1) {
                        PTerm::Const(c) => c - m,
                        PTerm::Var(v) => {
                            bwd_terms.push((v, -1.0));
                            -m
                        }
                    };
                    model.add_row(format!("job_disj_{job_id}_{o1}_{o2}_bwd"), bwd_terms, ConstraintSense::GreaterOrEqual, bwd_rhs);
                }
            }
        }
    }

    // Job start / blocking window (open shop with no_wait or blocking).
    if open_shop {
        for job_id in 0..instance.number_of_jobs() {
            let Some(s_var) = s[job_id] else { continue };
            let job = instance.job(job_id);
            for operation_id in 0..job.operations.len() {
                let co_var = co[completion.of(job_id, operation_id)];

                // s[j] <= co[j,o] - p[j,o]
                let mut lower_terms = vec![(s_var, 1.0), (co_var, -1.0)];
                let lower_rhs = match p_term(job_id, operation_id) {
                    PTerm::Const(c) => -c,
                    PTerm::Var(v) => {
                        lower_terms.push((v, 1.0));
                        0.0
                    }
                };
                model.add_row(format!("s_lower_{job_id}_{operation_id}"), lower_terms, ConstraintSense::LessOrEqual, lower_rhs);

                // co[j,o] - s[j] <= psum[j] (or the constant job total).
                let mut upper_terms = vec![(co_var, 1.0), (s_var, -1.0)];
                let upper_rhs = match psum[job_id] {
                    Some(psum_var) => {
                        upper_terms.push((psum_var, -1.0));
                        0.0
                    }
                    None => job_processing_time_sum_const(instance, job_id),
                };
                model.add_row(format!("s_upper_{job_id}_{operation_id}"), upper_terms, ConstraintSense::LessOrEqual, upper_rhs);
            }
        }
    }

    // Machine disjunction (big-M), one pair of rows per (i, p, p').
    for machine_id in 0..instance.number_of_machines() {
        let refs = instance.machine_operations(machine_id).to_vec();
        for (p_idx, &p_ref) in refs.iter().enumerate() {
            for p_prime_idx in 0..p_idx {
                let p_prime_ref = refs[p_prime_idx];
                let y_var = y[machine_id][p_idx][p_prime_idx];
                let co_p = co[completion.of(p_ref.job_id, p_ref.operation_id)];
                let co_p_prime = co[completion.of(p_prime_ref.job_id, p_prime_ref.operation_id)];
                let p_p = alt_processing_time(instance, &p_ref);
                let p_p_prime = alt_processing_time(instance, &p_prime_ref);

                let x1 = flexible.then(|| x[p_ref.job_id][p_ref.operation_id][p_ref.alternative_id]);
                let x2 = flexible.then(|| x[p_prime_ref.job_id][p_prime_ref.operation_id][p_prime_ref.alternative_id]);
                let p1_var = blocking.then(|| p[p_ref.job_id][p_ref.operation_id]);
                let p2_var = blocking.then(|| p[p_prime_ref.job_id][p_prime_ref.operation_id]);

                // p precedes p': co_p - co_p' + M*y >= p_p_prime
                //   - 2M(1 - x1 - x2) when flexible (relaxed unless both
                //     alternatives p and p' land on are actually selected)
                //   - p[j1,o1] when blocking
                let mut fwd_terms = vec![(co_p, 1.0), (co_p_prime, -1.0), (y_var, m)];
                let mut fwd_rhs = p_p_prime;
                if let (Some(x1), Some(x2)) = (x1, x2) {
                    fwd_terms.push((x1, -2.0 * m));
                    fwd_terms.push((x2, -2.0 * m));
                    fwd_rhs -= 2.0 * m;
                }
                if let Some(p1_var) = p1_var {
                    fwd_terms.push((p1_var, 1.0));
                }
                model.add_row(format!("disj_{machine_id}_{p_idx}_{p_prime_idx}_fwd"), fwd_terms, ConstraintSense::GreaterOrEqual, fwd_rhs);

                // p' precedes p: co_p' - co_p + M*(1-y) >= p_p
                //   same relaxation/blocking shape, roles swapped.
                let mut bwd_terms = vec![(co_p_prime, 1.0), (co_p, -1.0), (y_var, -m)];
                let mut bwd_rhs = p_p - m;
                if let (Some(x1), Some(x2)) = (x1, x2) {
                    bwd_terms.push((x1, -2.0 * m));
                    bwd_terms.push((x2, -2.0 * m));
                    bwd_rhs -= 2.0 * m;
                }
                if let Some(p2_var) = p2_var {
                    bwd_terms.push((p2_var, 1.0));
                }
                model.add_row(format!("disj_{machine_id}_{p_idx}_{p_prime_idx}_bwd"), bwd_terms, ConstraintSense::GreaterOrEqual, bwd_rhs);
            }
        }
    }

    // No-idle: sm[i] pins the machine's single contiguous start so that
    // every operation's completion falls within [sm[i], sm[i] + pmsum[i]].
    for machine_id in 0..instance.number_of_machines() {
        let Some(sm_var) = sm[machine_id] else { continue };
        let pmsum_var = pmsum[machine_id];
        let pmsum_const = if pmsum_var.is_none() {
            instance
                .machine_operations(machine_id)
                .iter()
                .map(|r| alt_processing_time(instance, r))
                .sum::<f64>()
        } else {
            0.0
        };

        for r in instance.machine_operations(machine_id).to_vec() {
            let co_var = co[completion.of(r.job_id, r.operation_id)];
            let p_val = alt_processing_time(instance, &r);

            if flexible {
                let x_var = x[r.job_id][r.operation_id][r.alternative_id];
                let ck_var = ck[r.job_id][r.operation_id][r.alternative_id];

                // sm[i] <= ck[j,o,a] - p(j,o,a)*x[j,o,a] + M*(1-x[j,o,a])
                model.add_row(
                    format!("noidle_lower_{machine_id}_{}_{}_{}", r.job_id, r.operation_id, r.alternative_id),
                    vec![(sm_var, 1.0), (ck_var, -1.0), (x_var, p_val + m)],
                    ConstraintSense::LessOrEqual,
                    m,
                );
                // sm[i] >= co[j,o] - pmsum[i] - M*(1 - x[j,o,a])
                let pmsum_var = pmsum_var.expect("pmsum[i] is created whenever flexible");
                model.add_row(
                    format!("noidle_upper_{machine_id}_{}_{}_{}", r.job_id, r.operation_id, r.alternative_id),
                    vec![(sm_var, 1.0), (co_var, -1.0), (pmsum_var, 1.0), (x_var, -m)],
                    ConstraintSense::GreaterOrEqual,
                    -m,
                );
            } else {
                // sm[i] <= co[j,o] - p(j,o)
                model.add_row(
                    format!("noidle_lower_{machine_id}_{}_{}", r.job_id, r.operation_id),
                    vec![(sm_var, 1.0), (co_var, -1.0)],
                    ConstraintSense::LessOrEqual,
                    -p_val,
                );
                // sm[i] >= co[j,o] - pmsum[i]  (pmsum[i] constant here)
                model.add_row(
                    format!("noidle_upper_{machine_id}_{}_{}", r.job_id, r.operation_id),
                    vec![(sm_var, 1.0), (co_var, -1.0)],
                    ConstraintSense::GreaterOrEqual,
                    -pmsum_const,
                );
            }
        }
    }

    // Objective (spec §4.7): minimize cmax, or Σ wⱼ·co[j,o_last] (flow time,
    // flow shop), or Σ wⱼ·cj[j] (flow time, open shop), or Σ wⱼ·t[j].
    match instance.objective() {
        Objective::Makespan => {
            if let Some(cmax) = cmax {
                model.set_objective(ObjectiveSense::Minimize, vec![(cmax, 1.0)]);
            }
        }
        Objective::TotalFlowTime => {
            let terms = if open_shop {
                cj.iter()
                    .enumerate()
                    .map(|(job_id, &v)| (v, instance.job(job_id).weight as f64))
                    .collect()
            } else {
                instance
                    .jobs()
                    .iter()
                    .enumerate()
                    .map(|(job_id, job)| {
                        let last_op = job.operations.len() - 1;
                        (co[completion.of(job_id, last_op)], job.weight as f64)
                    })
                    .collect()
            };
            model.set_objective(ObjectiveSense::Minimize, terms);
        }
        Objective::TotalTardiness => {
            let terms = t
                .iter()
                .enumerate()
                .map(|(job_id, &v)| (v, instance.job(job_id).weight as f64))
                .collect();
            model.set_objective(ObjectiveSense::Minimize, terms);
        }
        Objective::Throughput => {}
    }

    model
}

fn alt_processing_time(instance: &Instance, r: &crate::instance::MachineOperationRef) -> f64 {
    instance.job(r.job_id).operations[r.operation_id].alternatives[r.alternative_id].processing_time as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceBuilder;

    #[test]
    fn build_creates_cmax_and_completion_variables_for_makespan() {
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

        let model = build(&inst);
        // 4 co variables + 1 cmax + pairwise y on each machine (1 pair per
        // machine with 2 jobs) = 4 + 1 + 2 = 7.
        assert_eq!(model.number_of_variables(), 7);
        assert!(model.number_of_constraints() > 0);
    }

    #[test]
    fn build_gates_flexible_disjunction_on_alternative_selection() {
        // Two jobs, one operation each, both with a choice of two machines:
        // the machine-disjunction rows between them must reference both
        // jobs' x variables so an unselected alternative can't force an
        // infeasible ordering.
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(2).unwrap();
        for _ in 0..2 {
            let j = b.add_job();
            let op = b.add_operation(j).unwrap();
            b.add_alternative(j, op, 0, 3).unwrap();
            b.add_alternative(j, op, 1, 5).unwrap();
        }
        let inst = b.build().unwrap();
        assert!(inst.flexible());

        let model = build(&inst);
        // Both machines see both jobs as candidates, so each machine gets
        // one y-pair, and the per-job x/ck/p variable families exist.
        let has_x = model.variable_names.iter().any(|n| n.starts_with("x_"));
        let has_ck = model.variable_names.iter().any(|n| n.starts_with("ck_"));
        let has_p = model.variable_names.iter().any(|n| n.starts_with("p_"));
        assert!(has_x && has_ck && has_p);
        // The disjunction rows must mention the gating x variables, not just
        // co and y.
        let disj_row = model
            .rows
            .iter()
            .find(|r| r.name.starts_with("disj_0_1_0_fwd"))
            .expect("machine 0 has both jobs as candidates at positions 1 and 0");
        let mentions_x = disj_row
            .terms
            .iter()
            .any(|&(var, _)| model.variable_names[var].starts_with("x_"));
        assert!(mentions_x);
    }

    #[test]
    fn build_creates_job_disjunction_for_open_shop() {
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(2).unwrap();
        b.set_operations_arbitrary_order(true);
        let j = b.add_job();
        for m in 0..2 {
            let op = b.add_operation(j).unwrap();
            b.add_alternative(j, op, m, 2).unwrap();
        }
        let inst = b.build().unwrap();

        let model = build(&inst);
        assert!(model.variable_names.iter().any(|n| n.starts_with("z_")));
        assert!(model.rows.iter().any(|r| r.name.starts_with("job_disj_")));
    }

    #[test]
    fn build_creates_no_idle_window_variables() {
        let mut b = InstanceBuilder::new();
        b.set_objective(Objective::Makespan);
        b.set_number_of_machines(1).unwrap();
        b.set_permutation(true);
        b.set_no_idle(true);
        for p in [[3], [2]] {
            let j = b.add_job();
            let op = b.add_operation(j).unwrap();
            b.add_alternative(j, op, 0, p[0]).unwrap();
        }
        let inst = b.build().unwrap();

        let model = build(&inst);
        assert!(model.variable_names.iter().any(|n| n == "sm_0"));
        assert!(model.rows.iter().any(|r| r.name.starts_with("noidle_")));
    }
}
