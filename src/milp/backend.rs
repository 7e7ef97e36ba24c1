//! Abstract MILP model and the backend interface the core consumes (spec §6,
//! §9 "MILP backend selection"). Builders in [`super::disjunctive`] and
//! [`super::positional`] only ever produce a [`MilpModel`]; no builder touches
//! a concrete solver.

use crate::error::Result;

/// Domain of a MILP variable.
#[derive(Copy, Clone, Debug)]
pub enum VariableKind {
    Binary,
    Integer { lower_bound: f64, upper_bound: f64 },
    Continuous { lower_bound: f64, upper_bound: f64 },
}

/// Sense of a constraint row: `coefficients · x <op> rhs`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConstraintSense {
    LessOrEqual,
    GreaterOrEqual,
    Equal,
}

/// One row of the constraint matrix, as sparse (variable index, coefficient)
/// pairs.
#[derive(Clone, Debug)]
pub struct ConstraintRow {
    pub name: String,
    pub terms: Vec<(usize, f64)>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ObjectiveSense {
    Minimize,
}

/// A solver-agnostic MILP model: a variable table plus a sparse row set and
/// an objective, as the disjunctive/positional builders fill it (spec §4.7,
/// §4.8's "constraints are added as rows into a single sparse matrix").
#[derive(Clone, Debug, Default)]
pub struct MilpModel {
    pub variable_names: Vec<String>,
    pub variable_kinds: Vec<VariableKind>,
    pub objective_sense: Option<ObjectiveSense>,
    pub objective_terms: Vec<(usize, f64)>,
    pub rows: Vec<ConstraintRow>,
}

impl MilpModel {
    pub fn new() -> Self {
        MilpModel::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, kind: VariableKind) -> usize {
        let idx = self.variable_names.len();
        self.variable_names.push(name.into());
        self.variable_kinds.push(kind);
        idx
    }

    pub fn set_objective(&mut self, sense: ObjectiveSense, terms: Vec<(usize, f64)>) {
        self.objective_sense = Some(sense);
        self.objective_terms = terms;
    }

    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(usize, f64)>,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.rows.push(ConstraintRow {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
    }

    pub fn number_of_variables(&self) -> usize {
        self.variable_names.len()
    }

    pub fn number_of_constraints(&self) -> usize {
        self.rows.len()
    }
}

/// Fired whenever the backend reports a new incumbent.
pub type ImprovingSolutionCallback<'a> = dyn FnMut(f64, Option<f64>, &[f64], u64) + 'a;

/// Polled by the backend; returning `true` requests cancellation.
pub type InterruptCallback<'a> = dyn FnMut() -> bool + 'a;

/// The MILP solver engine interface the core consumes (spec §6): `load`,
/// `set_time_limit`, improving-solution/interrupt callbacks, `solve`, and
/// result extraction. No method here is specific to any one solver.
pub trait MilpBackend {
    fn load(&mut self, model: &MilpModel) -> Result<()>;
    fn set_time_limit(&mut self, seconds: f64);
    fn register_on_improving_solution(&mut self, callback: Box<ImprovingSolutionCallback<'_>>);
    fn register_on_interrupt(&mut self, callback: Box<InterruptCallback<'_>>);
    fn solve(&mut self) -> Result<()>;
    fn get_solution(&self) -> Option<Vec<f64>>;
    fn get_bound(&self) -> Option<f64>;
    fn write_mps(&self, path: &std::path::Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tracks_variable_and_row_counts() {
        let mut model = MilpModel::new();
        let x = model.add_variable("x0", VariableKind::Binary);
        let y = model.add_variable("y0", VariableKind::Integer { lower_bound: 0.0, upper_bound: 10.0 });
        model.add_row("r0", vec![(x, 1.0), (y, -1.0)], ConstraintSense::LessOrEqual, 0.0);
        assert_eq!(model.number_of_variables(), 2);
        assert_eq!(model.number_of_constraints(), 1);
    }
}
