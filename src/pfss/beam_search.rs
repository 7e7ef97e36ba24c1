//! Bidirectional iterative-deepening beam search for PFSS (spec §4.6).

use rand::Rng;

use crate::framework::{AlgorithmFormatter, Timer};
use crate::instance::{Instance, Objective};
use crate::solution::SolutionBuilder;

/// Which end of the permutation a node extends.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Selects which of the five guide functions ranks beam candidates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Guide {
    Bound,
    IdleTime,
    BoundIdleBlend,
    BoundWeightedIdleBlend,
    Adaptive,
}

impl Guide {
    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            0 => Some(Guide::Bound),
            1 => Some(Guide::IdleTime),
            2 => Some(Guide::BoundIdleBlend),
            3 => Some(Guide::BoundWeightedIdleBlend),
            4 => Some(Guide::Adaptive),
            _ => None,
        }
    }
}

impl Default for Guide {
    fn default() -> Self {
        Guide::BoundWeightedIdleBlend
    }
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<usize>,
    id: u64,
    available: Vec<bool>,
    last_added_job: Option<usize>,
    number_of_jobs_scheduled: usize,
    direction: Direction,
    time_forward: Vec<i64>,
    time_backward: Vec<i64>,
    remaining_processing_time: Vec<i64>,
    idle_time_forward: Vec<i64>,
    idle_time_backward: Vec<i64>,
    bound: i64,
}

struct Arena {
    nodes: Vec<Node>,
    next_id: u64,
}

impl Arena {
    fn new() -> Self {
        Arena {
            nodes: Vec::new(),
            next_id: 0,
        }
    }

    fn push(&mut self, mut node: Node) -> usize {
        node.id = self.next_id;
        self.next_id += 1;
        let idx = self.nodes.len();
        self.nodes.push(node);
        idx
    }
}

fn root(instance: &Instance) -> Node {
    let n = instance.number_of_jobs();
    let m = instance.number_of_machines();
    let mut remaining_processing_time = vec![0i64; m];
    for job_id in 0..n {
        for machine_id in 0..m {
            remaining_processing_time[machine_id] += instance.pfss_processing_time(job_id, machine_id);
        }
    }
    let bound = remaining_processing_time
        .last()
        .copied()
        .unwrap_or(0)
        .max((0..n).map(|j| instance.pfss_processing_time(j, m - 1)).sum());
    Node {
        parent: None,
        id: 0,
        available: vec![true; n],
        last_added_job: None,
        number_of_jobs_scheduled: 0,
        direction: Direction::Forward,
        time_forward: vec![0; m],
        time_backward: vec![0; m],
        remaining_processing_time,
        idle_time_forward: vec![0; m],
        idle_time_backward: vec![0; m],
        bound,
    }
}

fn extend_row(row: &[i64], job_id: usize, instance: &Instance, m: usize) -> (Vec<i64>, Vec<i64>) {
    let mut new_row = row.to_vec();
    let mut idle = vec![0i64; m];
    new_row[0] += instance.pfss_processing_time(job_id, 0);
    for i in 1..m {
        let candidate = new_row[i - 1];
        let prev = new_row[i];
        if candidate > prev {
            idle[i] = candidate - prev;
        }
        new_row[i] = candidate.max(prev) + instance.pfss_processing_time(job_id, i);
    }
    (new_row, idle)
}

fn child(arena: &Arena, parent_idx: usize, job_id: usize, direction: Direction, instance: &Instance) -> Node {
    let m = instance.number_of_machines();
    let parent = &arena.nodes[parent_idx];

    let mut available = parent.available.clone();
    available[job_id] = false;

    let mut remaining_processing_time = parent.remaining_processing_time.clone();
    for machine_id in 0..m {
        remaining_processing_time[machine_id] -= instance.pfss_processing_time(job_id, machine_id);
    }

    let (time_forward, time_backward, idle_time_forward, idle_time_backward) = match direction {
        Direction::Forward => {
            let (row, idle) = extend_row(&parent.time_forward, job_id, instance, m);
            let mut idle_forward = parent.idle_time_forward.clone();
            for i in 0..m {
                idle_forward[i] += idle[i];
            }
            (row, parent.time_backward.clone(), idle_forward, parent.idle_time_backward.clone())
        }
        Direction::Backward => {
            // Backward extension runs the same recurrence over the reversed
            // machine order, matching the tableau's R recurrence.
            let mut reversed_row: Vec<i64> = parent.time_backward.iter().rev().copied().collect();
            let mut idle = vec![0i64; m];
            reversed_row[0] += instance.pfss_processing_time(job_id, m - 1);
            for i in 1..m {
                let candidate = reversed_row[i - 1];
                let prev = reversed_row[i];
                if candidate > prev {
                    idle[i] = candidate - prev;
                }
                reversed_row[i] = candidate.max(prev) + instance.pfss_processing_time(job_id, m - 1 - i);
            }
            let row: Vec<i64> = reversed_row.into_iter().rev().collect();
            let idle: Vec<i64> = idle.into_iter().rev().collect();
            let mut idle_backward = parent.idle_time_backward.clone();
            for i in 0..m {
                idle_backward[i] += idle[i];
            }
            (parent.time_forward.clone(), row, parent.idle_time_forward.clone(), idle_backward)
        }
    };

    let bound = (0..m)
        .map(|i| time_forward[i] + remaining_processing_time[i] + time_backward[i])
        .max()
        .unwrap_or(0);

    Node {
        parent: Some(parent_idx),
        id: 0,
        available,
        last_added_job: Some(job_id),
        number_of_jobs_scheduled: parent.number_of_jobs_scheduled + 1,
        direction,
        time_forward,
        time_backward,
        remaining_processing_time,
        idle_time_forward,
        idle_time_backward,
        bound,
    }
}

/// Picks the direction a node's children extend in. Depths 0 and 1 are
/// fixed (forward, then backward); every interior node instead builds both
/// a forward and a backward child for each candidate job, counts how many
/// of those children are still viable against `best_makespan`, and takes
/// whichever direction leaves fewer viable candidates (a tighter beam).
/// Ties go to the direction with the larger bound sum (more pruning
/// pressure), and a remaining tie alternates the parent's direction.
fn choose_direction(
    arena: &Arena,
    node_idx: usize,
    instance: &Instance,
    candidates: &[usize],
    best_makespan: Option<i64>,
    bidirectional: bool,
) -> Direction {
    let node = &arena.nodes[node_idx];
    if !bidirectional {
        return Direction::Forward;
    }
    if node.number_of_jobs_scheduled == 0 {
        return Direction::Forward;
    }
    if node.number_of_jobs_scheduled == 1 {
        return Direction::Backward;
    }

    let is_viable = |bound: i64| match best_makespan {
        Some(best) => bound < best,
        None => true,
    };

    let mut forward_viable = 0usize;
    let mut backward_viable = 0usize;
    let mut forward_sum = 0i64;
    let mut backward_sum = 0i64;
    for &job_id in candidates {
        let forward_bound = child(arena, node_idx, job_id, Direction::Forward, instance).bound;
        let backward_bound = child(arena, node_idx, job_id, Direction::Backward, instance).bound;
        forward_sum += forward_bound;
        backward_sum += backward_bound;
        if is_viable(forward_bound) {
            forward_viable += 1;
        }
        if is_viable(backward_bound) {
            backward_viable += 1;
        }
    }

    if forward_viable != backward_viable {
        if forward_viable < backward_viable {
            Direction::Forward
        } else {
            Direction::Backward
        }
    } else if forward_sum != backward_sum {
        if forward_sum > backward_sum {
            Direction::Forward
        } else {
            Direction::Backward
        }
    } else {
        match node.direction {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

fn guide_value(guide: Guide, node: &Node, depth: usize, n: usize, m: usize, best_bound: Option<i64>) -> f64 {
    let alpha = depth as f64 / n.max(1) as f64;
    let idle: i64 = (0..m)
        .map(|i| node.idle_time_forward[i] + node.idle_time_backward[i])
        .sum();
    match guide {
        Guide::Bound => node.bound as f64,
        Guide::IdleTime => idle as f64,
        Guide::BoundIdleBlend => alpha * node.bound as f64 + (1.0 - alpha) * idle as f64 * n as f64 / m as f64,
        Guide::BoundWeightedIdleBlend => {
            alpha * node.bound as f64 + (1.0 - alpha) * (idle as f64) * (node.bound as f64)
        }
        Guide::Adaptive => {
            let reference = best_bound.unwrap_or(node.bound) as f64;
            alpha * node.bound as f64 + (1.0 - alpha) * idle as f64 * reference
        }
    }
}

fn leaf_permutation(arena: &Arena, leaf_idx: usize) -> Vec<usize> {
    let mut forward = Vec::new();
    let mut backward = Vec::new();
    let mut cur = Some(leaf_idx);
    while let Some(idx) = cur {
        let node = &arena.nodes[idx];
        if let Some(job_id) = node.last_added_job {
            match node.direction {
                Direction::Forward => forward.push(job_id),
                Direction::Backward => backward.push(job_id),
            }
        }
        cur = node.parent;
    }
    forward.reverse();
    // `backward` was collected root-to-leaf (i.e. last-appended first); as
    // stored it is already in the order closest-to-the-end first, so
    // reversing it yields append order away from the end.
    forward.into_iter().chain(backward.into_iter()).collect()
}

/// Parameters controlling the iterative-deepening beam search.
#[derive(Clone, Debug)]
pub struct BeamSearchParameters {
    pub initial_width: usize,
    pub guide: Guide,
    pub bidirectional: bool,
}

impl Default for BeamSearchParameters {
    fn default() -> Self {
        BeamSearchParameters {
            initial_width: 10,
            guide: Guide::default(),
            bidirectional: true,
        }
    }
}

/// Runs the makespan/total-flow-time beam search, streaming improving
/// solutions through `formatter`, until the timer fires, a width exhausts
/// with no surviving node (optimality), or a practical width cap is hit.
pub fn solve(
    instance: &Instance,
    timer: &Timer,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    parameters: &BeamSearchParameters,
    _rng: &mut impl Rng,
) -> Option<Vec<usize>> {
    let n = instance.number_of_jobs();
    let m = instance.number_of_machines();
    let bidirectional = parameters.bidirectional && instance.objective() == Objective::Makespan;

    let mut width = parameters.initial_width.max(1);
    let mut best_makespan: Option<i64> = None;
    let mut best_permutation: Option<Vec<usize>> = None;

    const MAX_WIDTH: usize = 1 << 16;
    while width <= MAX_WIDTH {
        if timer.needs_to_end() {
            break;
        }
        let mut arena = Arena::new();
        let root_idx = arena.push(root(instance));

        let mut frontier = vec![root_idx];
        let mut any_leaf_this_width = false;
        let mut frontier_nonempty_at_end = false;

        for depth in 0..n {
            if frontier.is_empty() {
                frontier_nonempty_at_end = false;
                break;
            }
            if timer.needs_to_end() {
                break;
            }
            let mut children_idx: Vec<usize> = Vec::new();
            for &node_idx in &frontier {
                let candidates: Vec<usize> = (0..n).filter(|&j| arena.nodes[node_idx].available[j]).collect();
                let direction = choose_direction(&arena, node_idx, instance, &candidates, best_makespan, bidirectional);
                for job_id in candidates {
                    let new_node = child(&arena, node_idx, job_id, direction, instance);
                    if let Some(best) = best_makespan {
                        if new_node.bound >= best {
                            continue; // pruned: dominated by current best
                        }
                    }
                    let idx = arena.push(new_node);
                    if arena.nodes[idx].number_of_jobs_scheduled == n {
                        let permutation = leaf_permutation(&arena, idx);
                        if let Some(makespan) = evaluate_and_record(instance, formatter, &permutation) {
                            if best_makespan.is_none_or_greater(makespan) {
                                best_makespan = Some(makespan);
                                best_permutation = Some(permutation);
                                any_leaf_this_width = true;
                            }
                        }
                    } else {
                        children_idx.push(idx);
                    }
                }
            }

            children_idx.sort_by(|&a, &b| {
                let na = &arena.nodes[a];
                let nb = &arena.nodes[b];
                let ga = guide_value(parameters.guide, na, depth, n, m, best_makespan);
                let gb = guide_value(parameters.guide, nb, depth, n, m, best_makespan);
                ga.partial_cmp(&gb)
                    .unwrap()
                    .then(na.id.cmp(&nb.id))
            });
            children_idx.truncate(width);
            frontier_nonempty_at_end = !children_idx.is_empty();
            frontier = children_idx;
        }

        if !frontier_nonempty_at_end && !any_leaf_this_width && best_permutation.is_some() {
            // The beam exhausted with no node surviving at this width: the
            // search space at this width is proven complete.
            break;
        }
        width *= 2;
    }

    best_permutation
}

/// Total-flow-time single-direction scheme: the bound updates by an
/// amortized formula rather than the bidirectional recurrence above.
pub fn solve_total_flow_time(
    instance: &Instance,
    timer: &Timer,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    width: usize,
) -> Option<Vec<usize>> {
    let n = instance.number_of_jobs();
    let m = instance.number_of_machines();

    let mut arena = Arena::new();
    let root_idx = arena.push(root(instance));
    let mut frontier = vec![root_idx];
    let mut best_tft: Option<i64> = None;
    let mut best_permutation: Option<Vec<usize>> = None;

    for depth in 0..n {
        if timer.needs_to_end() || frontier.is_empty() {
            break;
        }
        let mut children_idx: Vec<usize> = Vec::new();
        for &node_idx in &frontier {
            let parent_time_last = arena.nodes[node_idx].time_forward[m - 1];
            let parent_bound = arena.nodes[node_idx].bound;
            let candidates: Vec<usize> = (0..n).filter(|&j| arena.nodes[node_idx].available[j]).collect();
            for job_id in candidates {
                let mut new_node = child(&arena, node_idx, job_id, Direction::Forward, instance);
                let t = new_node.time_forward[m - 1];
                new_node.bound = parent_bound
                    + (n as i64 - depth as i64) * (t - parent_time_last)
                    - instance.pfss_processing_time(job_id, m - 1);
                let idx = arena.push(new_node);
                if arena.nodes[idx].number_of_jobs_scheduled == n {
                    let permutation = leaf_permutation(&arena, idx);
                    if let Some(tft) = evaluate_tft_and_record(instance, formatter, &permutation) {
                        if best_tft.is_none_or_greater(tft) {
                            best_tft = Some(tft);
                            best_permutation = Some(permutation);
                        }
                    }
                } else {
                    children_idx.push(idx);
                }
            }
        }
        children_idx.sort_by_key(|&idx| arena.nodes[idx].bound);
        children_idx.truncate(width);
        frontier = children_idx;
    }

    best_permutation
}

fn evaluate_and_record(
    instance: &Instance,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    permutation: &[usize],
) -> Option<i64> {
    let mut builder = SolutionBuilder::new(instance);
    builder.from_permutation(permutation).ok()?;
    let solution = builder.build().ok()?;
    let makespan = solution.makespan();
    formatter.update_solution(solution, "beam-search");
    Some(makespan)
}

fn evaluate_tft_and_record(
    instance: &Instance,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    permutation: &[usize],
) -> Option<i64> {
    let mut builder = SolutionBuilder::new(instance);
    builder.from_permutation(permutation).ok()?;
    let solution = builder.build().ok()?;
    let tft = solution.total_flow_time();
    formatter.update_solution(solution, "beam-search-tft");
    Some(tft)
}

trait IsNoneOrGreater {
    fn is_none_or_greater(&self, value: i64) -> bool;
}

impl IsNoneOrGreater for Option<i64> {
    fn is_none_or_greater(&self, value: i64) -> bool {
        match self {
            None => true,
            Some(current) => value < *current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{Parameters, Verbosity};
    use crate::instance::InstanceBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

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
    fn finds_known_optimal_makespan() {
        let inst = scenario_one();
        let timer = Timer::new(Some(std::time::Duration::from_millis(500)));
        let params_out = Parameters {
            algorithm: "tree-search-pfss-makespan".to_string(),
            time_limit_secs: Some(0.5),
            seed: None,
        };
        let mut formatter = AlgorithmFormatter::new(timer.clone(), Verbosity::Quiet, params_out);
        let mut rng = StdRng::seed_from_u64(1);
        let params = BeamSearchParameters::default();
        let permutation = solve(&inst, &timer, &mut formatter, &params, &mut rng).unwrap();

        let mut builder = SolutionBuilder::new(&inst);
        builder.from_permutation(&permutation).unwrap();
        let solution = builder.build().unwrap();
        assert_eq!(solution.makespan(), 8);
    }

    #[test]
    fn guide_from_index_covers_zero_to_four() {
        for i in 0..5 {
            assert!(Guide::from_index(i).is_some());
        }
        assert!(Guide::from_index(5).is_none());
    }

    #[test]
    fn choose_direction_fixes_depth_zero_and_one() {
        let inst = scenario_one();
        let mut arena = Arena::new();
        let root_idx = arena.push(root(&inst));
        let candidates = vec![0, 1, 2];
        assert_eq!(
            choose_direction(&arena, root_idx, &inst, &candidates, None, true),
            Direction::Forward
        );

        let depth_one = arena.push(child(&arena, root_idx, 0, Direction::Forward, &inst));
        let remaining = vec![1, 2];
        assert_eq!(
            choose_direction(&arena, depth_one, &inst, &remaining, None, true),
            Direction::Backward
        );
    }

    #[test]
    fn choose_direction_picks_fewer_viable_candidates_at_interior_nodes() {
        let inst = scenario_one();
        let mut arena = Arena::new();
        let root_idx = arena.push(root(&inst));
        let depth_one = arena.push(child(&arena, root_idx, 0, Direction::Forward, &inst));
        let depth_two = arena.push(child(&arena, depth_one, 1, Direction::Backward, &inst));
        // Only one candidate remains, so both directions tie on viable count
        // and bound sum; the result must still be a valid direction.
        let remaining = vec![2];
        let direction = choose_direction(&arena, depth_two, &inst, &remaining, Some(100), true);
        assert!(direction == Direction::Forward || direction == Direction::Backward);
    }

    #[test]
    fn choose_direction_is_forward_only_when_not_bidirectional() {
        let inst = scenario_one();
        let mut arena = Arena::new();
        let root_idx = arena.push(root(&inst));
        let depth_one = arena.push(child(&arena, root_idx, 0, Direction::Forward, &inst));
        let remaining = vec![1, 2];
        assert_eq!(
            choose_direction(&arena, depth_one, &inst, &remaining, None, false),
            Direction::Forward
        );
    }
}
