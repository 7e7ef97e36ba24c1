//! Incrementally-maintained forward/backward completion-time tableau for
//! permutation flow shops (spec §4.4) — the classic Taillard acceleration:
//! evaluating where to insert a job (or a small block of jobs) costs O(m)
//! given the stored forward and backward rows, instead of O(n·m) per
//! candidate position.

use crate::instance::Instance;

/// `forward[pos][i]` = completion time on machine `i` after scheduling the
/// first `pos` jobs of the permutation. `backward[q][i]` = completion time on
/// machine `i` of the suffix starting at position `q`, computed right to
/// left. Both are `(n+1) x m`.
#[derive(Clone, Debug)]
pub struct Tableau<'a> {
    instance: &'a Instance,
    permutation: Vec<usize>,
    forward: Vec<Vec<i64>>,
    backward: Vec<Vec<i64>>,
}

impl<'a> Tableau<'a> {
    /// Builds both tableaus from scratch for `permutation`, O(n·m).
    pub fn new(instance: &'a Instance, permutation: Vec<usize>) -> Self {
        let m = instance.number_of_machines();
        let n = permutation.len();
        let mut tableau = Tableau {
            instance,
            permutation,
            forward: vec![vec![0; m]; n + 1],
            backward: vec![vec![0; m]; n + 1],
        };
        tableau.recompute_forward_from(0);
        tableau.recompute_backward_from(n);
        tableau
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn number_of_machines(&self) -> usize {
        self.instance.number_of_machines()
    }

    pub fn number_of_jobs(&self) -> usize {
        self.permutation.len()
    }

    pub fn forward_row(&self, pos: usize) -> &[i64] {
        &self.forward[pos]
    }

    pub fn backward_row(&self, q: usize) -> &[i64] {
        &self.backward[q]
    }

    /// `F[n][m-1]`: the makespan of the full permutation.
    pub fn makespan(&self) -> i64 {
        let m = self.number_of_machines();
        self.forward[self.permutation.len()][m - 1]
    }

    fn processing_time(&self, job_id: usize, machine_id: usize) -> i64 {
        self.instance.pfss_processing_time(job_id, machine_id)
    }

    /// Recomputes `forward[pos..]` from the stored permutation, O((n-pos)·m).
    pub fn recompute_forward_from(&mut self, pos: usize) {
        let m = self.number_of_machines();
        for p in pos.max(1)..=self.permutation.len() {
            let job_id = self.permutation[p - 1];
            self.forward[p][0] = self.forward[p - 1][0] + self.processing_time(job_id, 0);
            for i in 1..m {
                self.forward[p][i] =
                    self.forward[p - 1][i].max(self.forward[p][i - 1]) + self.processing_time(job_id, i);
            }
        }
    }

    /// Recomputes `backward[..=q]` from the stored permutation, O(q·m).
    pub fn recompute_backward_from(&mut self, q: usize) {
        let m = self.number_of_machines();
        let n = self.permutation.len();
        if q == n {
            self.backward[n] = vec![0; m];
        }
        for p in (0..q.min(n)).rev() {
            let job_id = self.permutation[p];
            self.backward[p][m - 1] = self.backward[p + 1][m - 1] + self.processing_time(job_id, m - 1);
            for i in (0..m - 1).rev() {
                self.backward[p][i] =
                    self.backward[p + 1][i].max(self.backward[p][i + 1]) + self.processing_time(job_id, i);
            }
        }
    }

    /// Replaces the permutation and rebuilds both tableaus from scratch.
    pub fn rebuild(&mut self, permutation: Vec<usize>) {
        let m = self.number_of_machines();
        let n = permutation.len();
        self.permutation = permutation;
        self.forward = vec![vec![0; m]; n + 1];
        self.backward = vec![vec![0; m]; n + 1];
        self.recompute_forward_from(0);
        self.recompute_backward_from(n);
    }

    /// O(m·|block|): the makespan if `block` (an ordered sequence of job ids,
    /// all absent from this tableau's own permutation) were inserted starting
    /// at position `pos`, using this tableau's forward row at `pos` and
    /// backward row at `pos` for the suffix.
    pub fn evaluate_insertion(&self, block: &[usize], pos: usize) -> i64 {
        let m = self.number_of_machines();
        let mut row = self.forward[pos].clone();
        for &job_id in block {
            row[0] += self.processing_time(job_id, 0);
            for i in 1..m {
                row[i] = row[i - 1].max(row[i]) + self.processing_time(job_id, i);
            }
        }
        let suffix = &self.backward[pos];
        (0..m).map(|i| row[i] + suffix[i]).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{InstanceBuilder, Objective};

    fn scenario_one() -> Instance {
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
    fn makespan_matches_from_permutation() {
        use crate::solution::SolutionBuilder;
        let inst = scenario_one();
        let permutation = vec![1, 0, 2];
        let tableau = Tableau::new(&inst, permutation.clone());

        let mut sb = SolutionBuilder::new(&inst);
        sb.from_permutation(&permutation).unwrap();
        let sol = sb.build().unwrap();

        assert_eq!(tableau.makespan(), sol.makespan());
        assert_eq!(tableau.makespan(), 8);
    }

    #[test]
    fn evaluate_insertion_matches_full_rebuild() {
        let inst = scenario_one();
        // Tableau over jobs [1, 2] (job 0 removed).
        let removed = vec![1, 2];
        let tableau = Tableau::new(&inst, removed);

        for pos in 0..=2 {
            let candidate = tableau.evaluate_insertion(&[0], pos);

            let mut full = vec![1usize, 2];
            full.insert(pos, 0);
            let full_tableau = Tableau::new(&inst, full);
            assert_eq!(candidate, full_tableau.makespan());
        }
    }

    #[test]
    fn recompute_forward_from_matches_full_rebuild() {
        let inst = scenario_one();
        let mut tableau = Tableau::new(&inst, vec![0, 1, 2]);
        tableau.permutation[1] = 2;
        tableau.permutation[2] = 1;
        tableau.recompute_forward_from(1);
        // Positions 1 and 2 both changed, so the backward side must be
        // rebuilt from the (always-zero) suffix base at n, not from inside
        // the changed range.
        tableau.recompute_backward_from(3);

        let fresh = Tableau::new(&inst, vec![0, 2, 1]);
        assert_eq!(tableau.makespan(), fresh.makespan());
    }
}
