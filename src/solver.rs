use crate::{
    canonical_fsm::{CanonicalFSM, CanonicalFSMState},
    coord::DOMINO_MOVES,
    cube::{CubeState, InvalidState},
    moves::{Move, MoveSequence},
    pruning::{PruningTables, next_phase1_distance},
    start, success,
    symmetry::Direction,
    working,
};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;

/// The longest solution the solver looks for, whatever `max_length` asks.
pub const LENGTH_LIMIT: usize = 50;

/// Longest phase two tried after a non-empty phase one. Short phase twos
/// after longer phase ones are found sooner than long ones.
const PHASE2_MAX_LENGTH: usize = 10;

/// Every domino cube is solved in this many subgroup moves.
const PHASE2_DIAMETER: usize = 18;

/// Search branches: a direction and the first phase one move in it.
const BRANCHES: usize = Direction::COUNT * Move::COUNT;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Cannot solve an impossible cube: {0}")]
    InvalidState(#[from] InvalidState),
    #[error("No solution of at most {max_length} moves was found in {elapsed:?}")]
    Unsolvable { max_length: usize, elapsed: Duration },
}

/// Search limits. Every field has a default, so a config file only needs
/// the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Longest solution the search may return. Values above
    /// [`LENGTH_LIMIT`] mean [`LENGTH_LIMIT`].
    pub max_length: usize,
    /// Stop at the first solution this short. Without a target the search
    /// keeps looking for shorter solutions until phase one alone is as long
    /// as the best one, or a budget runs out.
    pub target_length: Option<usize>,
    /// Wall clock limit in milliseconds.
    pub time_budget_ms: Option<u64>,
    /// Limit on visited search nodes. Unlike the time budget, a node budget
    /// gives the same answer on every run.
    pub node_budget: Option<u64>,
    pub threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_length: 20,
            target_length: None,
            time_budget_ms: Some(1000),
            node_budget: None,
            threads: 1,
        }
    }
}

impl SolverConfig {
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    #[must_use]
    pub fn with_target_length(mut self, target_length: usize) -> Self {
        self.target_length = Some(target_length);
        self
    }

    #[must_use]
    pub fn with_time_budget(mut self, time_budget: Option<Duration>) -> Self {
        self.time_budget_ms = time_budget.map(|budget| u64::try_from(budget.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_node_budget(mut self, node_budget: Option<u64>) -> Self {
        self.node_budget = node_budget;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    /// `max_length`, clamped to [`LENGTH_LIMIT`].
    #[must_use]
    pub fn effective_max_length(&self) -> usize {
        self.max_length.min(LENGTH_LIMIT)
    }
}

/// A sequence of moves that solves a cube, with some statistics about the
/// search that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub moves: MoveSequence,
    /// How many of the moves phase one found.
    pub phase1_length: usize,
    /// The direction the winning search looked at the cube from.
    pub direction: Direction,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl Solution {
    #[must_use]
    pub fn is_already_solved(&self) -> bool {
        self.moves.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// The moves phase one found. They come last when the search ran on the
    /// inverse cube.
    #[must_use]
    pub fn phase1(&self) -> &[Move] {
        if self.direction.is_inverted() {
            &self.moves[self.len() - self.phase1_length..]
        } else {
            &self.moves[..self.phase1_length]
        }
    }

    #[must_use]
    pub fn phase2(&self) -> &[Move] {
        if self.direction.is_inverted() {
            &self.moves[..self.len() - self.phase1_length]
        } else {
            &self.moves[self.phase1_length..]
        }
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.moves)
    }
}

pub struct TwoPhaseSolver<'t> {
    tables: &'t PruningTables,
    canonical_fsm: CanonicalFSM,
    config: SolverConfig,
}

/// Candidate solutions are ranked by length, then by branch. Both fit in one
/// integer so workers can share the bound through a single atomic. Of two
/// solutions of the same length the search finds, the one with the lower
/// branch index wins, even when it is found second.
fn rank(length: usize, branch: usize) -> usize {
    length * BRANCHES + branch
}

/// The branch of a search path: its direction, then its first phase one
/// move. An empty phase one counts as the first branch of its direction.
fn branch(direction: Direction, phase1: &[Move]) -> usize {
    direction.index() * Move::COUNT + phase1.first().map_or(0, |move_| move_.index())
}

/// The cube as seen from one direction, with its phase one coordinates.
struct SearchStart {
    direction: Direction,
    state: CubeState,
    coords: (usize, usize, usize),
    distance: usize,
}

struct Found {
    moves: Vec<Move>,
    phase1_length: usize,
    direction: Direction,
}

/// Search state every worker reads and occasionally writes.
struct SharedSearch {
    best_rank: AtomicUsize,
    best: Mutex<Option<Found>>,
    cancelled: AtomicBool,
    nodes: AtomicU64,
    start: Instant,
}

/// The part of the search one worker owns. Each worker only tries its share
/// of the first moves, in every direction.
struct Worker {
    first_moves: Vec<Move>,
    searches_domino_start: bool,
    path: Vec<Move>,
    nodes: u64,
    flushed_nodes: u64,
}

impl<'t> TwoPhaseSolver<'t> {
    #[must_use]
    pub fn new(tables: &'t PruningTables, config: SolverConfig) -> Self {
        TwoPhaseSolver {
            tables,
            canonical_fsm: CanonicalFSM::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Length of the best solution so far, or one more than the longest
    /// allowed solution.
    fn best_length(shared: &SharedSearch) -> usize {
        shared.best_rank.load(Ordering::Relaxed) / BRANCHES
    }

    /// Longest total length a solution in `branch` may have to beat the best
    /// one so far, or `None` if it cannot beat it at all.
    fn length_bound(&self, shared: &SharedSearch, branch: usize) -> Option<usize> {
        let best_rank = shared.best_rank.load(Ordering::Relaxed);
        let bound = best_rank.checked_sub(branch + 1)? / BRANCHES;
        Some(bound.min(self.config.effective_max_length()))
    }

    /// Publish the node count and check the budgets. Called once per IDA*
    /// depth and per phase two search, so the check costs nothing per node.
    fn out_of_budget(&self, shared: &SharedSearch, worker: &mut Worker) -> bool {
        let new_nodes = worker.nodes - worker.flushed_nodes;
        worker.flushed_nodes = worker.nodes;
        let total_nodes = shared.nodes.fetch_add(new_nodes, Ordering::Relaxed) + new_nodes;

        if shared.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        let out_of_nodes = self.config.node_budget.is_some_and(|budget| total_nodes >= budget);
        let out_of_time = self
            .config
            .time_budget()
            .is_some_and(|budget| shared.start.elapsed() >= budget);
        if out_of_nodes || out_of_time {
            debug!("Search budget exhausted after {total_nodes} nodes");
            shared.cancelled.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn submit(&self, shared: &SharedSearch, worker: &Worker, start: &SearchStart, phase1_length: usize) {
        let length = worker.path.len();
        let new_rank = rank(length, branch(start.direction, &worker.path[..phase1_length]));
        debug_assert!(
            self.canonical_fsm
                .walk(worker.path.iter().map(|move_| move_.face))
                .is_some()
        );

        let mut best = shared.best.lock().unwrap_or_else(PoisonError::into_inner);
        if new_rank < shared.best_rank.load(Ordering::Relaxed) {
            shared.best_rank.store(new_rank, Ordering::Relaxed);
            debug!(
                working!("Found a {} move solution ({} + {}), {}"),
                length,
                phase1_length,
                length - phase1_length,
                start.direction
            );
            *best = Some(Found {
                moves: start.direction.restore(&worker.path),
                phase1_length,
                direction: start.direction,
            });
        }
        if self.config.target_length.is_some_and(|target| length <= target) {
            shared.cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// IDA* over the domino subgroup. Returns whether `worker.path` now ends
    /// in a solution.
    fn search_phase2(
        &self,
        worker: &mut Worker,
        coords: (usize, usize, usize),
        fsm_state: CanonicalFSMState,
        permitted_cost: usize,
    ) -> bool {
        worker.nodes += 1;
        let (corner_perm, ud_edge_perm, slice_perm) = coords;
        if permitted_cost == 0 {
            return corner_perm == 0 && ud_edge_perm == 0 && slice_perm == 0;
        }

        let moves = &self.tables.moves;
        for (domino_index, &move_) in DOMINO_MOVES.iter().enumerate() {
            let Some(next_fsm_state) = self.canonical_fsm.next_state(fsm_state, move_.face) else {
                continue;
            };
            let next_coords = (
                usize::from(moves.corner_perm[corner_perm][domino_index]),
                usize::from(moves.ud_edge_perm[ud_edge_perm][domino_index]),
                usize::from(moves.slice_perm[slice_perm][domino_index]),
            );
            let heuristic = self
                .tables
                .phase2_heuristic(next_coords.0, next_coords.1, next_coords.2);
            if usize::from(heuristic) >= permitted_cost {
                continue;
            }

            worker.path.push(move_);
            if self.search_phase2(worker, next_coords, next_fsm_state, permitted_cost - 1) {
                return true;
            }
            worker.path.pop();
        }
        false
    }

    /// Called with `worker.path` holding a phase one solution. Finds the
    /// shortest phase two continuation that beats the best solution so far.
    fn solve_phase2(
        &self,
        shared: &SharedSearch,
        worker: &mut Worker,
        start: &SearchStart,
        fsm_state: CanonicalFSMState,
    ) {
        if self.out_of_budget(shared, worker) {
            return;
        }
        let phase1_length = worker.path.len();
        let Some(bound) = self.length_bound(shared, branch(start.direction, &worker.path)) else {
            return;
        };
        let Some(remaining) = bound.checked_sub(phase1_length) else {
            return;
        };
        let remaining = remaining.min(if phase1_length == 0 {
            PHASE2_DIAMETER
        } else {
            PHASE2_MAX_LENGTH
        });

        let state = start.state.apply_sequence(&worker.path);
        let coords = (state.corner_perm(), state.ud_edge_perm(), state.slice_perm());
        let heuristic = usize::from(self.tables.phase2_heuristic(coords.0, coords.1, coords.2));
        trace!("Phase one solution {} needs at least {heuristic} more moves", MoveSequence::new(worker.path.clone()));

        for depth in heuristic..=remaining {
            if depth > heuristic && self.out_of_budget(shared, worker) {
                break;
            }
            if self.search_phase2(worker, coords, fsm_state, depth) {
                self.submit(shared, worker, start, phase1_length);
                break;
            }
        }
        worker.path.truncate(phase1_length);
    }

    /// IDA* into the domino subgroup. Every phase one solution of exactly
    /// `permitted_cost` more moves is handed to phase two. `distance` is the
    /// exact phase one distance of `coords`.
    #[allow(clippy::too_many_arguments)]
    fn search_phase1(
        &self,
        shared: &SharedSearch,
        worker: &mut Worker,
        start: &SearchStart,
        coords: (usize, usize, usize),
        distance: usize,
        fsm_state: CanonicalFSMState,
        permitted_cost: usize,
    ) {
        worker.nodes += 1;
        if shared.cancelled.load(Ordering::Relaxed) {
            return;
        }
        if permitted_cost == 0 {
            if coords != (0, 0, 0) {
                return;
            }
            match worker.path.last() {
                // Dropping the last move would leave a shorter phase one
                // solution, which an earlier depth already tried
                Some(last) if last.preserves_domino() => {}
                None if !worker.searches_domino_start => {}
                _ => self.solve_phase2(shared, worker, start, fsm_state),
            }
            return;
        }

        let is_root = worker.path.is_empty();
        let candidate_count = if is_root {
            worker.first_moves.len()
        } else {
            Move::COUNT
        };
        for i in 0..candidate_count {
            let move_ = if is_root {
                worker.first_moves[i]
            } else {
                Move::ALL[i]
            };
            let Some(next_fsm_state) = self.canonical_fsm.next_state(fsm_state, move_.face) else {
                continue;
            };
            let next_coords = self.tables.moves.phase1_move(coords, move_.index());
            let next_distance = next_phase1_distance(distance, self.tables.phase1_residue(next_coords));
            if next_distance >= permitted_cost {
                continue;
            }

            worker.path.push(move_);
            self.search_phase1(
                shared,
                worker,
                start,
                next_coords,
                next_distance,
                next_fsm_state,
                permitted_cost - 1,
            );
            worker.path.pop();

            if shared.cancelled.load(Ordering::Relaxed) {
                return;
            }
        }
    }

    /// Deepen phase one in every direction at once, so a direction with a
    /// short phase one is not starved by one with a long phase one.
    fn run_worker(&self, shared: &SharedSearch, starts: &[SearchStart], mut worker: Worker) {
        let mut depth = starts.iter().map(|start| start.distance).min().unwrap_or(0);

        'deepen: loop {
            // A phase one as long as the best solution can at most tie it
            if depth >= Self::best_length(shared) {
                break;
            }

            debug!(working!("Searching phase one depth {}..."), depth);
            let depth_start = Instant::now();
            let nodes_before = worker.nodes;
            for start in starts.iter().filter(|start| start.distance <= depth) {
                if self.out_of_budget(shared, &mut worker) {
                    break 'deepen;
                }
                self.search_phase1(
                    shared,
                    &mut worker,
                    start,
                    start.coords,
                    start.distance,
                    CanonicalFSMState::default(),
                    depth,
                );
            }
            debug!(
                working!("Traversed {} nodes in {:.3}s"),
                worker.nodes - nodes_before,
                depth_start.elapsed().as_secs_f64()
            );
            depth += 1;
        }
        self.out_of_budget(shared, &mut worker);
    }

    /// Find a solution to `state` within the configured limits.
    ///
    /// # Errors
    ///
    /// If `state` is not reachable from the solved cube, or no solution of
    /// at most `max_length` moves was found before the budget ran out. See
    /// [`SolveError`].
    pub fn solve(&self, state: &CubeState) -> Result<Solution, SolveError> {
        state.validate()?;
        let start = Instant::now();
        if state.is_solved() {
            return Ok(Solution {
                moves: MoveSequence::default(),
                phase1_length: 0,
                direction: Direction::default(),
                nodes: 0,
                elapsed: start.elapsed(),
            });
        }

        let max_length = self.config.effective_max_length();
        let threads = self.config.threads.clamp(1, Move::COUNT);
        info!(
            start!("Searching for a solution of at most {} moves on {} thread(s)"),
            max_length, threads
        );
        let starts = Direction::ALL.map(|direction| {
            let state = direction.transform(state);
            let coords = (state.twist(), state.flip(), state.slice());
            SearchStart {
                direction,
                state,
                coords,
                distance: self.tables.phase1_distance_of(coords),
            }
        });
        debug!(
            "Phase one distances: {:?}",
            starts.each_ref().map(|start| start.distance)
        );
        let shared = SharedSearch {
            best_rank: AtomicUsize::new(rank(max_length + 1, 0)),
            best: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            start,
        };
        let mut workers: Vec<Worker> = (0..threads)
            .map(|worker_index| Worker {
                first_moves: vec![],
                searches_domino_start: worker_index == 0,
                path: Vec::with_capacity(max_length + PHASE2_DIAMETER),
                nodes: 0,
                flushed_nodes: 0,
            })
            .collect();
        for (i, move_) in Move::ALL.into_iter().enumerate() {
            workers[i % threads].first_moves.push(move_);
        }

        if threads == 1 {
            for worker in workers {
                self.run_worker(&shared, &starts, worker);
            }
        } else {
            thread::scope(|scope| {
                for worker in workers {
                    let (shared, starts) = (&shared, &starts);
                    scope.spawn(move || self.run_worker(shared, starts, worker));
                }
            });
        }

        let elapsed = start.elapsed();
        let nodes = shared.nodes.load(Ordering::Relaxed);
        let best = shared.best.into_inner().unwrap_or_else(PoisonError::into_inner);
        let Some(found) = best else {
            return Err(SolveError::Unsolvable { max_length, elapsed });
        };
        info!(
            success!("Found a {} move solution in {:.3}s after {} nodes"),
            found.moves.len(),
            elapsed.as_secs_f64(),
            nodes
        );
        Ok(Solution {
            moves: MoveSequence::new(found.moves),
            phase1_length: found.phase1_length,
            direction: found.direction,
            nodes,
            elapsed,
        })
    }
}

impl TwoPhaseSolver<'static> {
    /// A solver over the process wide tables.
    #[must_use]
    pub fn global(config: SolverConfig) -> Self {
        TwoPhaseSolver::new(PruningTables::global(), config)
    }
}

/// Solve `state` in at most `max_moves` moves using the process wide tables.
///
/// # Errors
///
/// See [`TwoPhaseSolver::solve`].
pub fn solve(state: &CubeState, max_moves: usize, time_budget: Duration) -> Result<Solution, SolveError> {
    let config = SolverConfig::default()
        .with_max_length(max_moves)
        .with_time_budget(Some(time_budget));
    TwoPhaseSolver::global(config).solve(state)
}
