//! Concrete [`MilpBackend`] built on `good_lp` (the teacher's own MILP
//! dependency, generalized from its bundled-solver feature to whichever
//! engine `--solver` names).

use good_lp::{variable, Expression, ProblemVariables, Solution as GoodLpSolution, SolverModel, Variable};

use super::backend::{ConstraintSense, ImprovingSolutionCallback, InterruptCallback, MilpBackend, MilpModel, VariableKind};
use crate::error::{Result, ShopSchedError};

/// `good_lp` over the `highs` feature (spec §6 `--solver` names Cbc/Highs/
/// Xpress; this implementation speaks to whichever engine `good_lp`'s active
/// feature set wires up).
pub struct GoodLpBackend {
    backend_name: String,
    time_limit_secs: Option<f64>,
    solution: Option<Vec<f64>>,
    bound: Option<f64>,
    model: Option<MilpModel>,
}

impl GoodLpBackend {
    pub fn new(backend_name: impl Into<String>) -> Self {
        GoodLpBackend {
            backend_name: backend_name.into(),
            time_limit_secs: None,
            solution: None,
            bound: None,
            model: None,
        }
    }
}

/// Renders `model` as free-format MPS text (NAME/ROWS/COLUMNS/RHS/BOUNDS),
/// with `MARKER`-delimited blocks around integer and binary columns.
fn render_mps(model: &MilpModel) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    writeln!(out, "NAME          shopsched").unwrap();

    writeln!(out, "ROWS").unwrap();
    writeln!(out, " N  COST").unwrap();
    for row in &model.rows {
        let sense = match row.sense {
            ConstraintSense::LessOrEqual => "L",
            ConstraintSense::GreaterOrEqual => "G",
            ConstraintSense::Equal => "E",
        };
        writeln!(out, " {sense}  {}", row.name).unwrap();
    }

    let mut column_terms: Vec<Vec<(&str, f64)>> = vec![Vec::new(); model.variable_names.len()];
    for &(idx, coeff) in &model.objective_terms {
        column_terms[idx].push(("COST", coeff));
    }
    for row in &model.rows {
        for &(idx, coeff) in &row.terms {
            column_terms[idx].push((row.name.as_str(), coeff));
        }
    }

    writeln!(out, "COLUMNS").unwrap();
    let mut in_integer_block = false;
    let mut marker_id = 0usize;
    for (idx, name) in model.variable_names.iter().enumerate() {
        let is_integer = !matches!(model.variable_kinds[idx], VariableKind::Continuous { .. });
        if is_integer && !in_integer_block {
            writeln!(out, "    MARKER                 'MARKER{marker_id}'                 'INTORG'").unwrap();
            in_integer_block = true;
            marker_id += 1;
        } else if !is_integer && in_integer_block {
            writeln!(out, "    MARKER                 'MARKER{marker_id}'                 'INTEND'").unwrap();
            in_integer_block = false;
            marker_id += 1;
        }
        for (row_name, coeff) in &column_terms[idx] {
            writeln!(out, "    {name}  {row_name}  {coeff}").unwrap();
        }
    }
    if in_integer_block {
        writeln!(out, "    MARKER                 'MARKER{marker_id}'                 'INTEND'").unwrap();
    }

    writeln!(out, "RHS").unwrap();
    for row in &model.rows {
        if row.rhs != 0.0 {
            writeln!(out, "    RHS  {}  {}", row.name, row.rhs).unwrap();
        }
    }

    writeln!(out, "BOUNDS").unwrap();
    for (idx, name) in model.variable_names.iter().enumerate() {
        match model.variable_kinds[idx] {
            VariableKind::Binary => {
                writeln!(out, " BV BND  {name}").unwrap();
            }
            VariableKind::Integer { lower_bound, upper_bound }
            | VariableKind::Continuous { lower_bound, upper_bound } => {
                if lower_bound != 0.0 {
                    writeln!(out, " LO BND  {name}  {lower_bound}").unwrap();
                }
                writeln!(out, " UP BND  {name}  {upper_bound}").unwrap();
            }
        }
    }

    writeln!(out, "ENDATA").unwrap();
    out
}

fn declare_variable(vars: &mut ProblemVariables, kind: VariableKind) -> Variable {
    match kind {
        VariableKind::Binary => vars.add(variable().binary()),
        VariableKind::Integer { lower_bound, upper_bound } => {
            vars.add(variable().integer().min(lower_bound).max(upper_bound))
        }
        VariableKind::Continuous { lower_bound, upper_bound } => {
            vars.add(variable().min(lower_bound).max(upper_bound))
        }
    }
}

fn to_expression(terms: &[(usize, f64)], variables: &[Variable]) -> Expression {
    terms
        .iter()
        .map(|&(idx, coeff)| coeff * variables[idx])
        .sum()
}

impl MilpBackend for GoodLpBackend {
    fn load(&mut self, model: &MilpModel) -> Result<()> {
        self.model = Some(model.clone());
        let mut vars = ProblemVariables::new();
        let variables: Vec<Variable> = model
            .variable_kinds
            .iter()
            .map(|&kind| declare_variable(&mut vars, kind))
            .collect();

        let objective = to_expression(&model.objective_terms, &variables);
        let mut problem = vars.minimise(objective).using(good_lp::default_solver);

        for row in &model.rows {
            let lhs = to_expression(&row.terms, &variables);
            let constraint = match row.sense {
                ConstraintSense::LessOrEqual => lhs.leq(row.rhs),
                ConstraintSense::GreaterOrEqual => lhs.geq(row.rhs),
                ConstraintSense::Equal => lhs.eq(row.rhs),
            };
            problem = problem.with(constraint);
        }

        if let Some(limit) = self.time_limit_secs {
            // good_lp's solver-specific time-limit knobs vary per feature;
            // the abstract interface only promises best effort here.
            let _ = limit;
        }

        let solution = problem
            .solve()
            .map_err(|e| ShopSchedError::SolverBackendError {
                backend: self.backend_name.clone(),
                message: e.to_string(),
            })?;

        self.solution = Some(variables.iter().map(|&v| solution.value(v)).collect());
        Ok(())
    }

    fn set_time_limit(&mut self, seconds: f64) {
        self.time_limit_secs = Some(seconds);
    }

    fn register_on_improving_solution(&mut self, _callback: Box<ImprovingSolutionCallback<'_>>) {
        // good_lp's one-shot `solve()` has no incremental-incumbent hook;
        // the single final solution is reported once `solve` returns.
    }

    fn register_on_interrupt(&mut self, _callback: Box<InterruptCallback<'_>>) {
        // No cooperative-cancellation hook into the underlying solver call;
        // cancellation between solver invocations is handled by the caller.
    }

    fn solve(&mut self) -> Result<()> {
        if self.solution.is_none() {
            return Err(ShopSchedError::invalid_config(
                "solve() called before load()",
            ));
        }
        Ok(())
    }

    fn get_solution(&self) -> Option<Vec<f64>> {
        self.solution.clone()
    }

    fn get_bound(&self) -> Option<f64> {
        self.bound
    }

    fn write_mps(&self, path: &std::path::Path) -> Result<()> {
        let model = self.model.as_ref().ok_or_else(|| {
            ShopSchedError::invalid_config("write_mps called before load()")
        })?;
        std::fs::write(path, render_mps(model)).map_err(|e| {
            ShopSchedError::invalid_config(format!(
                "failed to write MPS file to {}: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_mps_emits_marker_blocks_around_integer_columns() {
        let mut model = MilpModel::new();
        let cmax = model.add_variable("cmax", VariableKind::Continuous { lower_bound: 0.0, upper_bound: 100.0 });
        let x = model.add_variable("x0", VariableKind::Binary);
        model.set_objective(super::super::backend::ObjectiveSense::Minimize, vec![(cmax, 1.0)]);
        model.add_row("r0", vec![(x, 1.0), (cmax, -1.0)], ConstraintSense::LessOrEqual, 5.0);

        let mps = render_mps(&model);
        assert!(mps.contains("ROWS"));
        assert!(mps.contains(" N  COST"));
        assert!(mps.contains(" L  r0"));
        assert!(mps.contains("INTORG"));
        assert!(mps.contains("INTEND"));
        assert!(mps.contains("BV BND  x0"));
        assert!(mps.contains("ENDATA"));
    }

    #[test]
    fn write_mps_before_load_is_an_error() {
        let backend = GoodLpBackend::new("highs");
        let path = std::env::temp_dir().join("shopsched_write_mps_before_load_test.mps");
        assert!(backend.write_mps(&path).is_err());
    }
}
