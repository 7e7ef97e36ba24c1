//! The contract every algorithm (C4-C8) runs against: timing, verbosity,
//! improving-solution/bound callbacks, output shaping (spec §4.3, §6, §9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use crate::solution::Solution;

/// Cooperative cancellation clock, polled at every suspension point (spec
/// §5): after each outer ILS iteration, between beam-search depths/widths,
/// and on every MILP improving-solution callback.
#[derive(Clone)]
pub struct Timer {
    start: Instant,
    time_limit: Option<Duration>,
    interrupted: Arc<AtomicBool>,
}

impl Timer {
    pub fn new(time_limit: Option<Duration>) -> Self {
        Timer {
            start: Instant::now(),
            time_limit,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn unlimited() -> Self {
        Timer::new(None)
    }

    /// A clonable handle an external signal handler can flip to request
    /// cancellation without a direct reference to the running algorithm.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn elapsed_time(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.time_limit.map(|limit| limit.saturating_sub(self.elapsed_time()))
    }

    pub fn needs_to_end(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
            || self
                .time_limit
                .is_some_and(|limit| self.elapsed_time() >= limit)
    }
}

/// Verbosity level for progress lines, typed rather than a bare integer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Run parameters echoed back in the `Output` JSON's `Parameters` field.
#[derive(Clone, Debug, Serialize)]
pub struct Parameters {
    pub algorithm: String,
    pub time_limit_secs: Option<f64>,
    pub seed: Option<u64>,
}

/// One entry of `IntermediaryOutputs`: a timestamped improving solution or
/// bound update.
#[derive(Clone, Debug, Serialize)]
pub struct IntermediaryOutput {
    pub label: String,
    pub elapsed_secs: f64,
    pub objective_value: Option<i64>,
    pub bound: Option<i64>,
}

/// Current best-known state of a run: the best solution found so far (if
/// any), elapsed time, and the objective-specific lower bound.
pub struct Output<'a> {
    pub solution: Option<Solution<'a>>,
    pub elapsed: Duration,
    pub bound: Option<i64>,
}

impl<'a> Output<'a> {
    fn empty() -> Self {
        Output {
            solution: None,
            elapsed: Duration::ZERO,
            bound: None,
        }
    }
}

/// Receives each new `Output` as the run progresses.
pub type NewSolutionCallback<'a, 'cb> = dyn FnMut(&Output<'a>) + 'cb;

/// Owns the running `Output`, mediates updates, and prints progress lines at
/// the configured verbosity (modeled on `algorithm_formatter.hpp`).
pub struct AlgorithmFormatter<'a, 'cb> {
    timer: Timer,
    verbosity: Verbosity,
    parameters: Parameters,
    output: Output<'a>,
    intermediary_outputs: Vec<IntermediaryOutput>,
    callback: Option<Box<NewSolutionCallback<'a, 'cb>>>,
}

impl<'a, 'cb> AlgorithmFormatter<'a, 'cb> {
    pub fn new(timer: Timer, verbosity: Verbosity, parameters: Parameters) -> Self {
        AlgorithmFormatter {
            timer,
            verbosity,
            parameters,
            output: Output::empty(),
            intermediary_outputs: Vec::new(),
            callback: None,
        }
    }

    pub fn set_callback(&mut self, callback: Box<NewSolutionCallback<'a, 'cb>>) {
        self.callback = Some(callback);
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn output(&self) -> &Output<'a> {
        &self.output
    }

    pub fn start(&self) {
        if self.verbosity >= Verbosity::Normal {
            info!(
                "starting {} (time_limit={:?})",
                self.parameters.algorithm, self.parameters.time_limit_secs
            );
        }
    }

    fn objective_value_of(solution: &Solution<'a>) -> i64 {
        use crate::instance::Objective;
        match solution.instance().objective() {
            Objective::Makespan => solution.makespan(),
            Objective::TotalFlowTime => solution.total_flow_time(),
            Objective::TotalTardiness => solution.total_tardiness(),
            Objective::Throughput => solution.throughput(),
        }
    }

    /// Atomically replaces the best known solution if `solution.strictly_better`
    /// than the current one, then fires the callback.
    pub fn update_solution(&mut self, solution: Solution<'a>, label: &str) -> bool {
        let improved = match &self.output.solution {
            Some(current) => solution.strictly_better(current),
            None => true,
        };
        if !improved {
            return false;
        }

        let elapsed = self.timer.elapsed_time();
        let objective_value = Self::objective_value_of(&solution);
        if self.verbosity >= Verbosity::Normal {
            info!(
                "{label}: new best {objective_value} at {:.3}s",
                elapsed.as_secs_f64()
            );
        }
        self.intermediary_outputs.push(IntermediaryOutput {
            label: label.to_string(),
            elapsed_secs: elapsed.as_secs_f64(),
            objective_value: Some(objective_value),
            bound: self.output.bound,
        });

        self.output.solution = Some(solution);
        self.output.elapsed = elapsed;
        if let Some(cb) = &mut self.callback {
            cb(&self.output);
        }
        true
    }

    /// Monotonically tightens the objective-specific lower bound; `better`
    /// decides the tightening direction generically (minimization raises the
    /// bound toward the objective).
    pub fn update_bound(&mut self, value: i64, label: &str, better: impl Fn(i64, i64) -> bool) -> bool {
        let improved = match self.output.bound {
            Some(current) => better(value, current),
            None => true,
        };
        if !improved {
            return false;
        }
        let elapsed = self.timer.elapsed_time();
        if self.verbosity >= Verbosity::Verbose {
            debug!("{label}: new bound {value} at {:.3}s", elapsed.as_secs_f64());
        }
        self.intermediary_outputs.push(IntermediaryOutput {
            label: label.to_string(),
            elapsed_secs: elapsed.as_secs_f64(),
            objective_value: None,
            bound: Some(value),
        });
        self.output.bound = Some(value);
        true
    }

    pub fn end(&self) -> &[IntermediaryOutput] {
        if self.verbosity >= Verbosity::Normal {
            info!(
                "done after {:.3}s, {} intermediary outputs",
                self.timer.elapsed_time().as_secs_f64(),
                self.intermediary_outputs.len()
            );
        }
        &self.intermediary_outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{InstanceBuilder, Objective};
    use crate::solution::SolutionBuilder;

    #[test]
    fn timer_needs_to_end_after_time_limit() {
        let timer = Timer::new(Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.needs_to_end());
    }

    #[test]
    fn timer_interrupt_handle_triggers_needs_to_end() {
        let timer = Timer::unlimited();
        let handle = timer.interrupt_handle();
        assert!(!timer.needs_to_end());
        handle.store(true, Ordering::Relaxed);
        assert!(timer.needs_to_end());
    }

    #[test]
    fn update_solution_only_accepts_strict_improvements() {
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
        let inst = b.build().unwrap();

        let mut sol_a = SolutionBuilder::new(&inst);
        sol_a.from_permutation(&[0, 1]).unwrap();
        let sol_a = sol_a.build().unwrap();

        let mut sol_b = SolutionBuilder::new(&inst);
        sol_b.from_permutation(&[1, 0]).unwrap();
        let sol_b = sol_b.build().unwrap();

        let params = Parameters {
            algorithm: "test".to_string(),
            time_limit_secs: None,
            seed: None,
        };
        let b_better = sol_b.strictly_better(&sol_a);
        let mut formatter = AlgorithmFormatter::new(Timer::unlimited(), Verbosity::Quiet, params);
        assert!(formatter.update_solution(sol_a, "first"));
        let accepted_second = formatter.update_solution(sol_b, "second");
        assert_eq!(accepted_second, b_better);
    }
}
