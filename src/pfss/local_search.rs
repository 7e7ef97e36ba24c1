//! PFSS iterated local search (spec §4.5): block-move neighborhood search,
//! destruction/reconstruction, and a diversity-maintained population.

use log::debug;
use rand::prelude::SliceRandom;
use rand::Rng;

use super::tableau::Tableau;
use crate::framework::{AlgorithmFormatter, Timer};
use crate::instance::Instance;
use crate::solution::SolutionBuilder;

const BLOCK_SIZES: [usize; 4] = [1, 2, 3, 4];

/// Population and termination knobs (grounded on `original_source`'s
/// `LocalSearchParameters`).
#[derive(Clone, Debug)]
pub struct IlsParameters {
    pub min_size: usize,
    pub max_size: usize,
    pub elite: usize,
    pub closest_neighbors: usize,
    pub maximum_number_of_iterations: Option<u64>,
    pub maximum_number_of_iterations_without_improvement: Option<u64>,
}

impl Default for IlsParameters {
    fn default() -> Self {
        IlsParameters {
            min_size: 20,
            max_size: 40,
            elite: 10,
            closest_neighbors: 3,
            maximum_number_of_iterations: None,
            maximum_number_of_iterations_without_improvement: None,
        }
    }
}

/// Runs the neighborhood search to a local optimum: smallest block size
/// first, applying the best strictly-improving move found at a size and
/// restarting from size 1, until no block size yields an improvement.
pub fn local_search(tableau: &mut Tableau<'_>, rng: &mut impl Rng) {
    loop {
        let mut improved = false;
        for &s in &BLOCK_SIZES {
            if let Some((pos_old, pos_new, block)) = best_move_at_block_size(tableau, s, rng) {
                apply_move(tableau, pos_old, pos_new, &block);
                improved = true;
                break;
            }
        }
        if !improved {
            break;
        }
    }
}

fn best_move_at_block_size(
    tableau: &Tableau<'_>,
    s: usize,
    rng: &mut impl Rng,
) -> Option<(usize, usize, Vec<usize>)> {
    let n = tableau.number_of_jobs();
    if s > n {
        return None;
    }
    let current_makespan = tableau.makespan();

    let mut source_positions: Vec<usize> = (0..=(n - s)).collect();
    source_positions.shuffle(rng);

    let mut best: Option<(usize, usize, i64, Vec<usize>)> = None;
    for pos_old in source_positions {
        let block: Vec<usize> = tableau.permutation()[pos_old..pos_old + s].to_vec();
        let mut removed = tableau.permutation().to_vec();
        removed.drain(pos_old..pos_old + s);
        let removed_tableau = Tableau::new(tableau.instance(), removed);

        let mut target_positions: Vec<usize> = (0..=(n - s)).collect();
        target_positions.shuffle(rng);

        for pos_new in target_positions {
            if pos_new == pos_old {
                continue; // reinserting where it came from is a no-op
            }
            let candidate = removed_tableau.evaluate_insertion(&block, pos_new);
            if candidate < current_makespan
                && best.as_ref().map_or(true, |(_, _, bm, _)| candidate < *bm)
            {
                best = Some((pos_old, pos_new, candidate, block.clone()));
            }
        }
    }

    best.map(|(pos_old, pos_new, _, block)| (pos_old, pos_new, block))
}

fn apply_move(tableau: &mut Tableau<'_>, pos_old: usize, pos_new: usize, block: &[usize]) {
    let mut permutation = tableau.permutation().to_vec();
    permutation.drain(pos_old..pos_old + block.len());
    for (k, &job_id) in block.iter().enumerate() {
        permutation.insert(pos_new + k, job_id);
    }
    tableau.rebuild(permutation);
}

/// Sorts jobs by decreasing mean processing time, inserting each one at its
/// best position (via the tableau identity), running local search after
/// every insertion.
pub fn initial_construction(instance: &Instance, rng: &mut impl Rng) -> Vec<usize> {
    let mut jobs: Vec<usize> = (0..instance.number_of_jobs()).collect();
    jobs.sort_by(|&a, &b| {
        instance
            .job(b)
            .mean_processing_time()
            .partial_cmp(&instance.job(a).mean_processing_time())
            .unwrap()
    });

    let mut permutation: Vec<usize> = Vec::new();
    for job_id in jobs {
        let tableau = Tableau::new(instance, permutation.clone());
        let best_pos = (0..=permutation.len())
            .min_by_key(|&pos| tableau.evaluate_insertion(&[job_id], pos))
            .unwrap_or(0);
        permutation.insert(best_pos, job_id);

        let mut working = Tableau::new(instance, permutation.clone());
        local_search(&mut working, rng);
        permutation = working.permutation().to_vec();
    }
    permutation
}

/// Neighbour-mismatch distance between two permutations: for each job, count
/// whether its left and right neighbours differ (start/end sentinels are
/// distinct from any job id).
fn distance(a: &[usize], b: &[usize]) -> usize {
    const SENTINEL: i64 = -1;
    let neighbors = |perm: &[usize], job_id: usize| -> (i64, i64) {
        let pos = perm.iter().position(|&j| j == job_id).unwrap();
        let left = if pos == 0 { SENTINEL } else { perm[pos - 1] as i64 };
        let right = if pos + 1 == perm.len() {
            SENTINEL
        } else {
            perm[pos + 1] as i64
        };
        (left, right)
    };
    a.iter()
        .map(|&job_id| {
            let (la, ra) = neighbors(a, job_id);
            let (lb, rb) = neighbors(b, job_id);
            usize::from(la != lb) + usize::from(ra != rb)
        })
        .sum()
}

struct Member {
    permutation: Vec<usize>,
    makespan: i64,
}

/// Diversity-maintained pool of permutations, bounded between `min_size` and
/// `max_size`, with binary-tournament parent selection on makespan.
struct Population {
    members: Vec<Member>,
    parameters: IlsParameters,
}

impl Population {
    fn new(parameters: IlsParameters) -> Self {
        Population {
            members: Vec::new(),
            parameters,
        }
    }

    fn select_parent(&self, rng: &mut impl Rng) -> Vec<usize> {
        let i = rng.random_range(0..self.members.len());
        let j = rng.random_range(0..self.members.len());
        let winner = if self.members[i].makespan <= self.members[j].makespan {
            i
        } else {
            j
        };
        self.members[winner].permutation.clone()
    }

    /// Inserts `permutation`; if the pool now exceeds `max_size`, removes the
    /// member most similar to another elite of equal-or-better fitness.
    fn add(&mut self, permutation: Vec<usize>, makespan: i64) {
        self.members.push(Member { permutation, makespan });
        if self.members.len() <= self.parameters.max_size {
            return;
        }

        self.members.sort_by_key(|m| m.makespan);
        let elite_cutoff = self.parameters.elite.min(self.members.len().saturating_sub(1));
        let k = self.parameters.closest_neighbors;

        let mut worst_idx = self.members.len() - 1;
        let mut worst_similarity = i64::MIN;
        for idx in elite_cutoff..self.members.len() {
            let mut distances: Vec<usize> = self
                .members
                .iter()
                .enumerate()
                .filter(|&(other, m)| other != idx && m.makespan <= self.members[idx].makespan)
                .map(|(_, m)| distance(&self.members[idx].permutation, &m.permutation))
                .collect();
            distances.sort_unstable();
            let closest_sum: usize = distances.iter().take(k).sum();
            // Smaller total distance to its closest equal-or-better peers
            // means more redundant: more similar, i.e. a stronger removal
            // candidate, so we minimize closest_sum (invert for max-tracking).
            let similarity = -(closest_sum as i64);
            if similarity > worst_similarity {
                worst_similarity = similarity;
                worst_idx = idx;
            }
        }
        self.members.remove(worst_idx);
    }

    fn best(&self) -> Option<&Member> {
        self.members.iter().min_by_key(|m| m.makespan)
    }
}

/// Runs the iterated local search to completion (time limit, iteration caps,
/// or the optional known lower bound), returning the best permutation found.
pub fn solve(
    instance: &Instance,
    timer: &Timer,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    parameters: &IlsParameters,
    known_lower_bound: Option<i64>,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let mut population = Population::new(parameters.clone());

    while population.members.len() < parameters.min_size && !timer.needs_to_end() {
        let permutation = initial_construction(instance, rng);
        let tableau = Tableau::new(instance, permutation.clone());
        population.add(permutation, tableau.makespan());
    }

    let mut best_permutation = population
        .best()
        .map(|m| m.permutation.clone())
        .unwrap_or_else(|| (0..instance.number_of_jobs()).collect());
    let mut best_makespan = Tableau::new(instance, best_permutation.clone()).makespan();
    record_solution(instance, formatter, &best_permutation, "ils:initial");

    let mut iterations: u64 = 0;
    let mut iterations_without_improvement: u64 = 0;

    loop {
        if timer.needs_to_end() {
            break;
        }
        if let Some(limit) = parameters.maximum_number_of_iterations {
            if iterations >= limit {
                break;
            }
        }
        if let Some(limit) = parameters.maximum_number_of_iterations_without_improvement {
            if iterations_without_improvement >= limit {
                break;
            }
        }
        if let Some(lb) = known_lower_bound {
            if best_makespan <= lb {
                break;
            }
        }

        // select_parent -> load_parent -> remove_block -> local_search ->
        // reinsert_block -> local_search -> update_population
        let parent = population.select_parent(rng);
        let block_size = rng.random_range(1..=4usize.min(parent.len().max(1)));
        let pos = rng.random_range(0..=(parent.len().saturating_sub(block_size)));
        let mut block: Vec<usize> = parent[pos..pos + block_size].to_vec();
        block.shuffle(rng);
        let mut removed = parent.clone();
        removed.drain(pos..pos + block_size);

        let mut working = Tableau::new(instance, removed);
        local_search(&mut working, rng);

        let removed_tableau = Tableau::new(instance, working.permutation().to_vec());
        let best_pos = (0..=removed_tableau.number_of_jobs())
            .min_by_key(|&p| removed_tableau.evaluate_insertion(&block, p))
            .unwrap_or(0);
        let mut reconstructed = removed_tableau.permutation().to_vec();
        for (k, &job_id) in block.iter().enumerate() {
            reconstructed.insert(best_pos + k, job_id);
        }

        let mut working = Tableau::new(instance, reconstructed);
        local_search(&mut working, rng);

        let candidate_makespan = working.makespan();
        population.add(working.permutation().to_vec(), candidate_makespan);

        if candidate_makespan < best_makespan {
            best_makespan = candidate_makespan;
            best_permutation = working.permutation().to_vec();
            record_solution(instance, formatter, &best_permutation, "ils:improved");
            iterations_without_improvement = 0;
        } else {
            iterations_without_improvement += 1;
        }
        iterations += 1;
        debug!("ils iteration {iterations}: best makespan {best_makespan}");
    }

    best_permutation
}

fn record_solution(
    instance: &Instance,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    permutation: &[usize],
    label: &str,
) {
    let mut builder = SolutionBuilder::new(instance);
    if builder.from_permutation(permutation).is_ok() {
        if let Ok(solution) = builder.build() {
            formatter.update_solution(solution, label);
        }
    }
}
