//! The cubie level model of a 3x3x3 cube.
//!
//! A [`CubeState`] is a flat permutation plus orientation for each of the two
//! orbits (8 corners, 12 edges) in the "replaced by" convention: `cp[i]` is
//! the corner cubie that currently sits in corner position `i`, and `co[i]`
//! is how far it is twisted. Composing two states is then a pair of array
//! gathers, and a move is nothing but a precomputed state.

use crate::moves::{Move, MoveSequence};
use std::sync::LazyLock;
use thiserror::Error;

/// Corner positions and cubies, named by the faces they touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Corner {
    URF,
    UFL,
    ULB,
    UBR,
    DFR,
    DLF,
    DBL,
    DRB,
}

/// Edge positions and cubies. The last four make up the UD slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Edge {
    UR,
    UF,
    UL,
    UB,
    DR,
    DF,
    DL,
    DB,
    FR,
    FL,
    BL,
    BR,
}

impl Corner {
    pub const ALL: [Corner; 8] = [
        Corner::URF,
        Corner::UFL,
        Corner::ULB,
        Corner::UBR,
        Corner::DFR,
        Corner::DLF,
        Corner::DBL,
        Corner::DRB,
    ];
}

impl Edge {
    pub const ALL: [Edge; 12] = [
        Edge::UR,
        Edge::UF,
        Edge::UL,
        Edge::UB,
        Edge::DR,
        Edge::DF,
        Edge::DL,
        Edge::DB,
        Edge::FR,
        Edge::FL,
        Edge::BL,
        Edge::BR,
    ];

    /// Whether the edge belongs between the U and D layers.
    #[must_use]
    pub fn is_slice(self) -> bool {
        self >= Edge::FR
    }
}

/// The complete configuration of a cube. See the module documentation for
/// the convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeState {
    pub cp: [Corner; 8],
    pub co: [u8; 8],
    pub ep: [Edge; 12],
    pub eo: [u8; 12],
}

/// A state that no sequence of face turns can produce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidState {
    #[error("Corner {0:?} appears more than once")]
    DuplicateCorner(Corner),
    #[error("Edge {0:?} appears more than once")]
    DuplicateEdge(Edge),
    #[error("Corner orientation {0} at position {1:?} is out of range")]
    CornerOrientationOutOfRange(u8, Corner),
    #[error("Edge orientation {0} at position {1:?} is out of range")]
    EdgeOrientationOutOfRange(u8, Edge),
    #[error("A corner is twisted, the corner orientations sum to {0} mod 3")]
    TwistedCorner(u8),
    #[error("An edge is flipped, the edge orientations sum to {0} mod 2")]
    FlippedEdge(u8),
    #[error("Two pieces are swapped, the corner and edge permutations have different parity")]
    Parity,
}

const fn basic(cp: [Corner; 8], co: [u8; 8], ep: [Edge; 12], eo: [u8; 12]) -> CubeState {
    CubeState { cp, co, ep, eo }
}

/// Clockwise quarter turns of U R F D L B.
#[rustfmt::skip]
const BASIC_TURNS: [CubeState; 6] = {
    use Corner::*;
    use Edge::*;
    [
        basic(
            [UBR, URF, UFL, ULB, DFR, DLF, DBL, DRB], [0; 8],
            [UB, UR, UF, UL, DR, DF, DL, DB, FR, FL, BL, BR], [0; 12],
        ),
        basic(
            [DFR, UFL, ULB, URF, DRB, DLF, DBL, UBR], [2, 0, 0, 1, 1, 0, 0, 2],
            [FR, UF, UL, UB, BR, DF, DL, DB, DR, FL, BL, UR], [0; 12],
        ),
        basic(
            [UFL, DLF, ULB, UBR, URF, DFR, DBL, DRB], [1, 2, 0, 0, 2, 1, 0, 0],
            [UR, FL, UL, UB, DR, FR, DL, DB, UF, DF, BL, BR], [0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0],
        ),
        basic(
            [URF, UFL, ULB, UBR, DLF, DBL, DRB, DFR], [0; 8],
            [UR, UF, UL, UB, DF, DL, DB, DR, FR, FL, BL, BR], [0; 12],
        ),
        basic(
            [URF, ULB, DBL, UBR, DFR, UFL, DLF, DRB], [0, 1, 2, 0, 0, 2, 1, 0],
            [UR, UF, BL, UB, DR, DF, FL, DB, FR, UL, DL, BR], [0; 12],
        ),
        basic(
            [URF, UFL, UBR, DRB, DFR, DLF, ULB, DBL], [0, 0, 1, 2, 0, 0, 2, 1],
            [UR, UF, UL, BR, DR, DF, DL, BL, FR, FL, UB, DB], [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 1],
        ),
    ]
};

/// All 18 moves as states, indexed by [`Move::index`].
static MOVE_STATES: LazyLock<[CubeState; Move::COUNT]> = LazyLock::new(|| {
    std::array::from_fn(|index| {
        let move_ = Move::from_index(index);
        let quarter = &BASIC_TURNS[move_.face.index()];
        let mut state = *quarter;
        for _ in 1..move_.turn.quarter_turns() {
            state = state.multiply(quarter);
        }
        state
    })
});

impl Default for CubeState {
    fn default() -> Self {
        CubeState::solved()
    }
}

impl CubeState {
    /// The solved cube: identity permutations, zero orientations.
    #[must_use]
    pub const fn solved() -> CubeState {
        CubeState {
            cp: Corner::ALL,
            co: [0; 8],
            ep: Edge::ALL,
            eo: [0; 12],
        }
    }

    /// The state reached by applying `other` after `self`.
    #[must_use]
    pub fn multiply(&self, other: &CubeState) -> CubeState {
        let mut result = CubeState::solved();
        for i in 0..8 {
            let from = other.cp[i] as usize;
            result.cp[i] = self.cp[from];
            result.co[i] = (self.co[from] + other.co[i]) % 3;
        }
        for i in 0..12 {
            let from = other.ep[i] as usize;
            result.ep[i] = self.ep[from];
            result.eo[i] = (self.eo[from] + other.eo[i]) % 2;
        }
        result
    }

    /// The state that undoes `self`, so that `self.multiply(&self.inverse())`
    /// is solved.
    #[must_use]
    pub fn inverse(&self) -> CubeState {
        let mut result = CubeState::solved();
        for (position, corner) in self.cp.iter().enumerate() {
            result.cp[*corner as usize] = Corner::ALL[position];
        }
        for (position, edge) in self.ep.iter().enumerate() {
            result.ep[*edge as usize] = Edge::ALL[position];
        }
        for i in 0..8 {
            result.co[i] = (3 - self.co[result.cp[i] as usize]) % 3;
        }
        for i in 0..12 {
            result.eo[i] = self.eo[result.ep[i] as usize];
        }
        result
    }

    /// The state reached by turning `move_`. Does not modify `self`.
    #[must_use]
    pub fn apply(&self, move_: Move) -> CubeState {
        self.multiply(&MOVE_STATES[move_.index()])
    }

    #[must_use]
    pub fn apply_sequence(&self, moves: &[Move]) -> CubeState {
        moves.iter().fold(*self, |state, move_| state.apply(*move_))
    }

    #[must_use]
    pub fn is_solved(&self) -> bool {
        *self == CubeState::solved()
    }

    /// Check the laws every reachable state obeys.
    ///
    /// # Errors
    ///
    /// Returns the first law the state breaks. See [`InvalidState`].
    pub fn validate(&self) -> Result<(), InvalidState> {
        let mut seen_corners = [false; 8];
        for corner in self.cp {
            if std::mem::replace(&mut seen_corners[corner as usize], true) {
                return Err(InvalidState::DuplicateCorner(corner));
            }
        }
        let mut seen_edges = [false; 12];
        for edge in self.ep {
            if std::mem::replace(&mut seen_edges[edge as usize], true) {
                return Err(InvalidState::DuplicateEdge(edge));
            }
        }

        if let Some((position, &twist)) = self.co.iter().enumerate().find(|(_, co)| **co >= 3) {
            return Err(InvalidState::CornerOrientationOutOfRange(
                twist,
                Corner::ALL[position],
            ));
        }
        if let Some((position, &flip)) = self.eo.iter().enumerate().find(|(_, eo)| **eo >= 2) {
            return Err(InvalidState::EdgeOrientationOutOfRange(flip, Edge::ALL[position]));
        }

        let twist = self.co.iter().sum::<u8>() % 3;
        if twist != 0 {
            return Err(InvalidState::TwistedCorner(twist));
        }
        let flip = self.eo.iter().sum::<u8>() % 2;
        if flip != 0 {
            return Err(InvalidState::FlippedEdge(flip));
        }

        if permutation_parity(&self.cp) != permutation_parity(&self.ep) {
            return Err(InvalidState::Parity);
        }
        Ok(())
    }

    /// A uniformly random reachable state.
    #[must_use]
    pub fn random(rng: &mut fastrand::Rng) -> CubeState {
        let mut state = CubeState::solved();
        rng.shuffle(&mut state.cp);
        rng.shuffle(&mut state.ep);
        if permutation_parity(&state.cp) != permutation_parity(&state.ep) {
            state.ep.swap(0, 1);
        }

        for i in 0..7 {
            state.co[i] = rng.u8(..3);
        }
        state.co[7] = (3 - state.co[..7].iter().sum::<u8>() % 3) % 3;
        for i in 0..11 {
            state.eo[i] = rng.u8(..2);
        }
        state.eo[11] = state.eo[..11].iter().sum::<u8>() % 2;
        state
    }
}

/// Whether the permutation is odd, by counting inversions.
fn permutation_parity<T: PartialOrd>(perm: &[T]) -> bool {
    let mut inversions = 0_usize;
    for (i, a) in perm.iter().enumerate() {
        inversions += perm[i + 1..].iter().filter(|b| *b < a).count();
    }
    inversions % 2 == 1
}

impl From<&MoveSequence> for CubeState {
    fn from(moves: &MoveSequence) -> Self {
        CubeState::solved().apply_sequence(moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::{Face, Turn};

    fn state_of(scramble: &str) -> CubeState {
        CubeState::from(&scramble.parse::<MoveSequence>().unwrap())
    }

    #[test]
    fn solved_is_solved_and_valid() {
        assert!(CubeState::solved().is_solved());
        assert_eq!(CubeState::solved().validate(), Ok(()));
        assert_eq!(CubeState::default(), CubeState::solved());
    }

    #[test]
    fn every_move_round_trips_with_its_inverse() {
        let mut rng = fastrand::Rng::with_seed(7);
        let states = [CubeState::solved(), CubeState::random(&mut rng), state_of("R U F")];
        for state in states {
            for move_ in Move::ALL {
                let there_and_back = state.apply(move_).apply(move_.inverse());
                assert_eq!(there_and_back, state, "{move_}");
                assert_ne!(state.apply(move_), state, "{move_}");
            }
        }
    }

    #[test]
    fn quarter_turns_have_order_four() {
        for face in Face::ALL {
            let quarter = Move::new(face, Turn::Clockwise);
            let state = CubeState::solved().apply_sequence(&[quarter; 4]);
            assert!(state.is_solved(), "{face}");

            let half = Move::new(face, Turn::Half);
            assert_eq!(
                CubeState::solved().apply_sequence(&[quarter, quarter]),
                CubeState::solved().apply(half)
            );
        }
    }

    #[test]
    fn sexy_move_has_order_six() {
        let sexy: MoveSequence = "R U R' U'".parse().unwrap();
        let mut state = CubeState::solved();
        for i in 1..=6 {
            state = state.apply_sequence(&sexy);
            assert_eq!(state.is_solved(), i == 6);
        }
    }

    #[test]
    fn opposite_faces_commute() {
        for face in Face::ALL {
            let a = Move::new(face, Turn::Clockwise);
            let b = Move::new(face.opposite(), Turn::Half);
            assert_eq!(
                CubeState::solved().apply_sequence(&[a, b]),
                CubeState::solved().apply_sequence(&[b, a])
            );
        }
    }

    #[test]
    fn random_sequence_then_reverse_is_solved() {
        let mut rng = fastrand::Rng::with_seed(42);
        for length in [1, 5, 20, 100] {
            let sequence = MoveSequence::random(&mut rng, length);
            let state = CubeState::from(&sequence).apply_sequence(&sequence.inverse());
            assert!(state.is_solved());
        }
    }

    #[test]
    fn inverse_matches_inverse_sequence() {
        let mut rng = fastrand::Rng::with_seed(3);
        let sequence = MoveSequence::random(&mut rng, 30);
        let state = CubeState::from(&sequence);
        assert_eq!(state.inverse(), CubeState::from(&sequence.inverse()));
        assert!(state.multiply(&state.inverse()).is_solved());
        assert!(state.inverse().multiply(&state).is_solved());
    }

    #[test]
    fn scrambles_are_valid() {
        assert_eq!(state_of("R U R' U'").validate(), Ok(()));
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..100 {
            assert_eq!(CubeState::random(&mut rng).validate(), Ok(()));
        }
    }

    #[test]
    fn validate_rejects_impossible_states() {
        let mut twisted = CubeState::solved();
        twisted.co[0] = 1;
        assert_eq!(twisted.validate(), Err(InvalidState::TwistedCorner(1)));

        let mut flipped = state_of("F");
        flipped.eo[3] ^= 1;
        assert_eq!(flipped.validate(), Err(InvalidState::FlippedEdge(1)));

        let mut swapped = CubeState::solved();
        swapped.ep.swap(0, 1);
        assert_eq!(swapped.validate(), Err(InvalidState::Parity));

        let mut duplicated = CubeState::solved();
        duplicated.cp[1] = Corner::URF;
        assert_eq!(
            duplicated.validate(),
            Err(InvalidState::DuplicateCorner(Corner::URF))
        );

        let mut out_of_range = CubeState::solved();
        out_of_range.eo[4] = 2;
        assert_eq!(
            out_of_range.validate(),
            Err(InvalidState::EdgeOrientationOutOfRange(2, Edge::DR))
        );
    }

    #[test]
    fn apply_does_not_mutate_input() {
        let state = state_of("L D B");
        let copy = state;
        let _ = state.apply(Move::new(Face::F, Turn::Half));
        assert_eq!(state, copy);
    }
}
