#![warn(clippy::pedantic)]
#![allow(clippy::similar_names, clippy::too_many_lines, clippy::module_name_repetitions)]

//! A 3x3x3 cube state engine and a Kociemba style two-phase solver.
//!
//! ```no_run
//! use twophase::solve_scramble;
//!
//! let solution = solve_scramble("R U R' U'").unwrap();
//! println!("{solution}");
//! ```

pub(crate) mod canonical_fsm;
pub mod config;
pub(crate) mod coord;
pub mod cube;
pub mod facelet;
pub mod moves;
pub mod pruning;
pub mod solver;
pub(crate) mod symmetry;

pub use cube::{CubeState, InvalidState};
pub use facelet::{FaceletCube, FaceletError};
pub use moves::{Face, Move, MoveSequence, ParseMoveError, Turn};
pub use solver::{LENGTH_LIMIT, Solution, SolveError, SolverConfig, TwoPhaseSolver, solve};
pub use symmetry::Direction;

use thiserror::Error;

#[macro_export]
macro_rules! start {
    ($msg:expr) => {
        concat!("⏳ ", $msg)
    };
}

#[macro_export]
macro_rules! working {
    ($msg:expr) => {
        concat!("🛠  ", $msg)
    };
}

#[macro_export]
macro_rules! success {
    ($msg:expr) => {
        concat!("✅ ", $msg)
    };
}

/// A precomputed factorial table for 0! to 12!, where index[i] is i!. Twelve
/// is the largest orbit on the cube.
pub(crate) const FACT_UNTIL_12: [u32; 13] = {
    let mut arr = [0; 13];
    arr[0] = 1;
    let mut i = 1;
    while i < arr.len() {
        arr[i] = arr[i - 1] * i as u32;
        i += 1;
    }
    arr
};

/// Everything that can go wrong between a line of input and a solution.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidMoveToken(#[from] ParseMoveError),
    #[error(transparent)]
    InvalidFacelets(#[from] FaceletError),
    #[error(transparent)]
    InvalidState(#[from] InvalidState),
    #[error(transparent)]
    Unsolvable(SolveError),
}

impl From<SolveError> for Error {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::InvalidState(invalid) => Error::InvalidState(invalid),
            unsolvable @ SolveError::Unsolvable { .. } => Error::Unsolvable(unsolvable),
        }
    }
}

/// Apply `scramble` to the solved cube and solve the result with the default
/// configuration and the process-wide tables.
///
/// # Errors
///
/// If the scramble contains an invalid token or the search runs out of
/// budget. See [`Error`].
pub fn solve_scramble(scramble: &str) -> Result<Solution, Error> {
    let scramble: MoveSequence = scramble.parse()?;
    let state = CubeState::solved().apply_sequence(&scramble);
    Ok(TwoPhaseSolver::global(SolverConfig::default()).solve(&state)?)
}

/// Solve a cube described by a 54 character facelet string in U R F D L B
/// face order.
///
/// # Errors
///
/// If the facelet string does not describe a reachable cube or the search
/// runs out of budget. See [`Error`].
pub fn solve_facelets(facelets: &str) -> Result<Solution, Error> {
    let facelets: FaceletCube = facelets.parse()?;
    let state = CubeState::try_from(&facelets)?;
    Ok(TwoPhaseSolver::global(SolverConfig::default()).solve(&state)?)
}
