//! Symmetries of the cube.
//!
//! The sixteen symmetries that fix the UD axis (quarter turns about it, the
//! half turn about the FB axis, and the left-right mirror) commute with the
//! domino subgroup, so two cubes conjugate under one of them are the same
//! distance from it. The phase one table only stores one representative of
//! each class of flip and slice coordinates, which shrinks it sixteenfold.
//!
//! The 120 degree rotation about the URF-DBL diagonal does not fix the UD
//! axis. Instead the solver uses it, together with inversion, to search the
//! same cube from six [`Direction`]s and keep the best answer.

use crate::{
    coord::{N_FLIP, N_SLICE, N_SLICE_PERM, N_TWIST},
    cube::{Corner, CubeState, Edge},
    moves::{Face, Move},
};
use std::{fmt, sync::LazyLock};

pub(crate) const N_SYM: usize = 16;
pub(crate) const N_FLIPSLICE: usize = N_FLIP * N_SLICE;
pub(crate) const N_FLIPSLICE_CLASS: usize = 64430;

const UNASSIGNED: u16 = u16::MAX;

/// Half turn about the FB axis.
#[rustfmt::skip]
const S_F2: CubeState = {
    use Corner::*;
    use Edge::*;
    CubeState {
        cp: [DLF, DFR, DRB, DBL, UFL, URF, UBR, ULB], co: [0; 8],
        ep: [DL, DF, DR, DB, UL, UF, UR, UB, FL, FR, BR, BL], eo: [0; 12],
    }
};

/// Quarter turn of the whole cube about the UD axis.
#[rustfmt::skip]
const S_U4: CubeState = {
    use Corner::*;
    use Edge::*;
    CubeState {
        cp: [UBR, URF, UFL, ULB, DRB, DFR, DLF, DBL], co: [0; 8],
        ep: [UB, UR, UF, UL, DB, DR, DF, DL, BR, FR, FL, BL], eo: [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1],
    }
};

/// Reflection through the plane between the L and R faces. Corner
/// orientations of 3 and up mark a mirrored corner.
#[rustfmt::skip]
const S_LR2: CubeState = {
    use Corner::*;
    use Edge::*;
    CubeState {
        cp: [UFL, URF, UBR, ULB, DLF, DFR, DRB, DBL], co: [3; 8],
        ep: [UL, UF, UR, UB, DL, DF, DR, DB, FL, FR, BR, BL], eo: [0; 12],
    }
};

/// 120 degree turn of the whole cube about the URF-DBL diagonal.
#[rustfmt::skip]
const S_URF3: CubeState = {
    use Corner::*;
    use Edge::*;
    CubeState {
        cp: [URF, DFR, DLF, UFL, UBR, DRB, DBL, ULB], co: [1, 2, 1, 2, 2, 1, 2, 1],
        ep: [UF, FR, DF, FL, UB, BR, DB, BL, UR, DR, DL, UL], eo: [1, 0, 1, 0, 1, 0, 1, 0, 1, 1, 1, 1],
    }
};

/// Like [`CubeState::multiply`], but also composes mirrored corners.
fn compose(a: &CubeState, b: &CubeState) -> CubeState {
    let mut result = CubeState::solved();
    for i in 0..8 {
        let from = b.cp[i] as usize;
        result.cp[i] = a.cp[from];
        let (ori_a, ori_b) = (a.co[from], b.co[i]);
        result.co[i] = match (ori_a < 3, ori_b < 3) {
            (true, true) => (ori_a + ori_b) % 3,
            (true, false) => {
                let ori = ori_a + ori_b;
                if ori >= 6 { ori - 3 } else { ori }
            }
            (false, true) => {
                let ori = ori_a - ori_b;
                if ori < 3 { ori + 3 } else { ori }
            }
            (false, false) => (ori_a + 3 - ori_b) % 3,
        };
    }
    for i in 0..12 {
        let from = b.ep[i] as usize;
        result.ep[i] = a.ep[from];
        result.eo[i] = (a.eo[from] + b.eo[i]) % 2;
    }
    result
}

/// The sixteen UD symmetries and their inverses. Symmetry `s` is
/// `F2^(s / 8) U4^(s / 2 % 4) LR2^(s % 2)`.
struct Symmetries {
    cubes: [CubeState; N_SYM],
    inverses: [CubeState; N_SYM],
}

static SYMMETRIES: LazyLock<Symmetries> = LazyLock::new(|| {
    let mut cubes = [CubeState::solved(); N_SYM];
    let mut current = CubeState::solved();
    let mut index = 0;
    for _ in 0..2 {
        for _ in 0..4 {
            for _ in 0..2 {
                cubes[index] = current;
                index += 1;
                current = compose(&current, &S_LR2);
            }
            current = compose(&current, &S_U4);
        }
        current = compose(&current, &S_F2);
    }
    // Every one of them has an order dividing four
    let inverses = cubes.map(|cube| compose(&compose(&cube, &cube), &cube));
    Symmetries { cubes, inverses }
});

impl Symmetries {
    /// `S state S^-1` for symmetry `S`.
    fn conjugate(&self, sym: usize, state: &CubeState) -> CubeState {
        compose(&compose(&self.cubes[sym], state), &self.inverses[sym])
    }

    /// `S^-1 state S` for symmetry `S`.
    fn conjugate_inverse(&self, sym: usize, state: &CubeState) -> CubeState {
        compose(&compose(&self.inverses[sym], state), &self.cubes[sym])
    }
}

/// The flip and slice coordinates reduced by symmetry, and the twist
/// coordinate transformed by each symmetry. Cheap enough to rebuild on every
/// start, so never saved.
#[derive(Debug)]
pub(crate) struct SymmetryTables {
    /// `twist_conj[twist][s]` is the twist of `S twist S^-1`.
    twist_conj: Box<[[u16; N_SYM]]>,
    /// Indexed by `slice * N_FLIP + flip`.
    flipslice_class: Box<[u16]>,
    /// The symmetry `s` with `S flipslice S^-1` equal to the representative
    /// of the class.
    flipslice_sym: Box<[u8]>,
    class_rep: Box<[u32]>,
    /// Bit `s` is set when symmetry `s` maps the representative to itself.
    class_stabilizer: Box<[u16]>,
}

#[allow(clippy::cast_possible_truncation)]
impl SymmetryTables {
    pub(crate) fn generate() -> SymmetryTables {
        let symmetries = &*SYMMETRIES;

        let mut twist_conj = vec![[0; N_SYM]; N_TWIST].into_boxed_slice();
        let mut state = CubeState::solved();
        for (twist, row) in twist_conj.iter_mut().enumerate() {
            state.set_twist(twist);
            for (sym, entry) in row.iter_mut().enumerate() {
                *entry = symmetries.conjugate(sym, &state).twist() as u16;
            }
        }

        let mut flipslice_class = vec![UNASSIGNED; N_FLIPSLICE].into_boxed_slice();
        let mut flipslice_sym = vec![0; N_FLIPSLICE].into_boxed_slice();
        let mut class_rep = Vec::with_capacity(N_FLIPSLICE_CLASS);
        let mut state = CubeState::solved();
        for slice in 0..N_SLICE {
            state.set_slice_sorted(slice * N_SLICE_PERM);
            for flip in 0..N_FLIP {
                let flipslice = slice * N_FLIP + flip;
                if flipslice_class[flipslice] != UNASSIGNED {
                    continue;
                }
                state.set_flip(flip);
                let class = class_rep.len() as u16;
                class_rep.push(flipslice as u32);
                flipslice_class[flipslice] = class;
                for sym in 1..N_SYM {
                    let image = symmetries.conjugate_inverse(sym, &state);
                    let other = image.slice() * N_FLIP + image.flip();
                    if flipslice_class[other] == UNASSIGNED {
                        flipslice_class[other] = class;
                        flipslice_sym[other] = sym as u8;
                    }
                }
            }
        }
        debug_assert_eq!(class_rep.len(), N_FLIPSLICE_CLASS);

        let class_stabilizer = class_rep
            .iter()
            .map(|&rep| {
                let (flip, slice) = (rep as usize % N_FLIP, rep as usize / N_FLIP);
                let mut state = CubeState::solved();
                state.set_slice_sorted(slice * N_SLICE_PERM);
                state.set_flip(flip);
                (0..N_SYM)
                    .filter(|&sym| {
                        let image = symmetries.conjugate(sym, &state);
                        image.flip() == flip && image.slice() == slice
                    })
                    .fold(0, |mask, sym| mask | 1_u16 << sym)
            })
            .collect();

        SymmetryTables {
            twist_conj,
            flipslice_class,
            flipslice_sym,
            class_rep: class_rep.into_boxed_slice(),
            class_stabilizer,
        }
    }

    /// The class of a flip and slice pair, and the symmetry that takes the
    /// pair to the class representative.
    pub(crate) fn flipslice_class(&self, flip: usize, slice: usize) -> (usize, usize) {
        let flipslice = slice * N_FLIP + flip;
        (
            usize::from(self.flipslice_class[flipslice]),
            usize::from(self.flipslice_sym[flipslice]),
        )
    }

    pub(crate) fn twist_conj(&self, twist: usize, sym: usize) -> usize {
        usize::from(self.twist_conj[twist][sym])
    }

    /// The flip and slice of the representative of `class`.
    pub(crate) fn class_rep(&self, class: usize) -> (usize, usize) {
        let rep = self.class_rep[class] as usize;
        (rep % N_FLIP, rep / N_FLIP)
    }

    pub(crate) fn class_stabilizer(&self, class: usize) -> u16 {
        self.class_stabilizer[class]
    }
}

/// A turn of face `f` on a cube rotated `r` times about the URF-DBL diagonal
/// is a turn of face `ROTATED_FACES[r][f]` on the cube before the rotation.
const ROTATED_FACES: [[Face; 6]; 3] = {
    use Face::*;
    [[U, R, F, D, L, B], [F, U, R, B, D, L], [R, F, U, L, B, D]]
};

/// One of the six ways the solver looks at a cube: as given or rotated
/// about the URF-DBL diagonal, and optionally inverted. A solution of the
/// transformed cube turns into a solution of the original one through
/// [`Direction::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Direction {
    rotation: usize,
    inverted: bool,
}

impl Direction {
    pub const COUNT: usize = 6;

    /// In search order. The untransformed cube comes first.
    pub const ALL: [Direction; Direction::COUNT] = [
        Direction { rotation: 0, inverted: false },
        Direction { rotation: 1, inverted: false },
        Direction { rotation: 2, inverted: false },
        Direction { rotation: 0, inverted: true },
        Direction { rotation: 1, inverted: true },
        Direction { rotation: 2, inverted: true },
    ];

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.inverted) * 3 + self.rotation
    }

    /// Rotations about the URF-DBL diagonal, from 0 to 2.
    #[must_use]
    pub fn rotation(self) -> usize {
        self.rotation
    }

    #[must_use]
    pub fn is_inverted(self) -> bool {
        self.inverted
    }

    /// The cube the solver searches in this direction.
    pub(crate) fn transform(self, state: &CubeState) -> CubeState {
        let urf3_inverse = compose(&S_URF3, &S_URF3);
        let rotated = match self.rotation {
            0 => *state,
            1 => compose(&compose(&urf3_inverse, state), &S_URF3),
            _ => compose(&compose(&S_URF3, state), &urf3_inverse),
        };
        if self.inverted {
            rotated.inverse()
        } else {
            rotated
        }
    }

    /// Turn moves that solve [`Direction::transform`] of a cube into moves
    /// that solve the cube itself.
    #[must_use]
    pub fn restore(self, moves: &[Move]) -> Vec<Move> {
        let faces = &ROTATED_FACES[self.rotation];
        let rotate = |move_: Move| Move::new(faces[move_.face.index()], move_.turn);
        if self.inverted {
            moves.iter().rev().map(|move_| rotate(move_.inverse())).collect()
        } else {
            moves.iter().map(|move_| rotate(*move_)).collect()
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rotation = ["as given", "rotated once", "rotated twice"][self.rotation];
        if self.inverted {
            write!(f, "{rotation}, inverted")
        } else {
            write!(f, "{rotation}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveSequence;
    use std::collections::HashSet;

    fn move_state(move_: Move) -> CubeState {
        CubeState::solved().apply(move_)
    }

    fn power(sym: &CubeState, exponent: usize) -> CubeState {
        (0..exponent).fold(CubeState::solved(), |acc, _| compose(&acc, sym))
    }

    #[test]
    fn s_u4_has_order_four() {
        assert!(!power(&S_U4, 2).is_solved());
        assert!(power(&S_U4, 4).is_solved());
    }

    #[test]
    fn s_urf3_has_order_three() {
        assert!(!S_URF3.is_solved());
        assert!(power(&S_URF3, 3).is_solved());
        assert!(power(&S_F2, 2).is_solved());
        assert!(power(&S_LR2, 2).is_solved());
    }

    #[test]
    fn symmetries_are_distinct_and_invertible() {
        let symmetries = &*SYMMETRIES;
        let distinct: HashSet<_> = symmetries.cubes.iter().collect();
        assert_eq!(distinct.len(), N_SYM);
        assert!(symmetries.cubes[0].is_solved());
        for (cube, inverse) in symmetries.cubes.iter().zip(&symmetries.inverses) {
            assert!(compose(cube, inverse).is_solved());
            assert!(compose(inverse, cube).is_solved());
        }
    }

    #[test]
    fn symmetries_map_moves_to_moves() {
        let move_states = Move::ALL.map(move_state);
        for sym in 0..N_SYM {
            for move_ in Move::ALL {
                let image = SYMMETRIES.conjugate(sym, &move_state(move_));
                assert!(move_states.contains(&image), "symmetry {sym} on {move_}");
            }
        }
        for move_ in Move::ALL {
            let image = compose(&compose(&S_URF3, &move_state(move_)), &power(&S_URF3, 2));
            assert!(move_states.contains(&image), "{move_}");
        }
    }

    #[test]
    fn symmetries_keep_the_domino_subgroup() {
        let domino = CubeState::from(&"U R2 F2 D' L2 B2".parse::<MoveSequence>().unwrap());
        for sym in 0..N_SYM {
            let image = SYMMETRIES.conjugate(sym, &domino);
            assert_eq!((image.twist(), image.flip(), image.slice()), (0, 0, 0));
        }
    }

    #[test]
    fn flipslice_classes() {
        let tables = SymmetryTables::generate();
        assert_eq!(tables.class_rep.len(), N_FLIPSLICE_CLASS);
        assert_eq!(tables.flipslice_class(0, 0), (0, 0));
        assert_eq!(tables.class_rep(0), (0, 0));
        // The solved pair is fixed by every symmetry
        assert_eq!(tables.class_stabilizer(0), u16::MAX);

        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..200 {
            let state = CubeState::random(&mut rng);
            let (class, sym) = tables.flipslice_class(state.flip(), state.slice());
            let image = SYMMETRIES.conjugate(sym, &state);
            assert_eq!((image.flip(), image.slice()), tables.class_rep(class));
            assert_eq!(tables.twist_conj(state.twist(), sym), image.twist());
            assert_eq!(tables.class_stabilizer(class) & 1, 1);
        }
    }

    #[test]
    fn restored_faces_match_conjugation() {
        let urf3_inverse = power(&S_URF3, 2);
        for move_ in Move::ALL {
            let once = Direction::ALL[1].restore(&[move_]);
            let twice = Direction::ALL[2].restore(&[move_]);
            assert_eq!(
                move_state(once[0]),
                compose(&compose(&S_URF3, &move_state(move_)), &urf3_inverse)
            );
            assert_eq!(
                move_state(twice[0]),
                compose(&compose(&urf3_inverse, &move_state(move_)), &S_URF3)
            );
        }
    }

    #[test]
    fn every_direction_restores_solutions() {
        let mut rng = fastrand::Rng::with_seed(5);
        for direction in Direction::ALL {
            let path = MoveSequence::random(&mut rng, 12);
            let scrambled = CubeState::from(&path);
            let before_rotation = if direction.inverted {
                scrambled
            } else {
                scrambled.inverse()
            };
            let undo_rotation = Direction {
                rotation: (3 - direction.rotation) % 3,
                inverted: false,
            };
            let state = undo_rotation.transform(&before_rotation);

            assert!(direction.transform(&state).apply_sequence(&path).is_solved(), "{direction}");
            assert!(state.apply_sequence(&direction.restore(&path)).is_solved(), "{direction}");
        }
    }

    #[test]
    fn directions_are_indexed_in_search_order() {
        for (index, direction) in Direction::ALL.into_iter().enumerate() {
            assert_eq!(direction.index(), index);
        }
        assert_eq!(Direction::default(), Direction::ALL[0]);
        assert_eq!(Direction::ALL[4].to_string(), "rotated once, inverted");
    }
}
