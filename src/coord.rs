//! Coordinates: small integers that each capture one aspect of a cube, plus
//! the move tables that turn a coordinate without building a cube.
//!
//! Phase one works on corner twist, edge flip and the unordered position of
//! the four UD slice edges. All three are zero exactly when the cube is in
//! the domino subgroup `<U, D, R2, L2, F2, B2>`. Phase two works on the
//! corner permutation, the permutation of the eight U and D layer edges, and
//! the permutation of the slice edges inside the slice.

use crate::{
    FACT_UNTIL_12,
    cube::{Corner, CubeState, Edge},
    moves::Move,
};

pub const N_TWIST: usize = 2187;
pub const N_FLIP: usize = 2048;
pub const N_SLICE: usize = 495;
pub const N_SLICE_SORTED: usize = 11880;
pub const N_CORNER_PERM: usize = 40320;
pub const N_UD_EDGE_PERM: usize = 40320;
pub const N_SLICE_PERM: usize = 24;
pub const N_DOMINO_MOVES: usize = 10;

/// The moves of the domino subgroup, in move priority order.
pub const DOMINO_MOVES: [Move; N_DOMINO_MOVES] = {
    let indices = [0, 1, 2, 4, 7, 9, 10, 11, 13, 16];
    let mut moves = [Move::ALL[0]; N_DOMINO_MOVES];
    let mut i = 0;
    while i < indices.len() {
        moves[i] = Move::ALL[indices[i]];
        i += 1;
    }
    moves
};

/// n choose k, zero when k > n.
fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// Lexicographic rank of a permutation of `0..N` via its Lehmer code.
pub(crate) fn rank_permutation<const N: usize>(perm: &[u8; N]) -> usize {
    let mut rank = 0;
    for i in 0..N {
        let smaller_after = perm[i + 1..].iter().filter(|x| **x < perm[i]).count();
        rank += smaller_after * FACT_UNTIL_12[N - 1 - i] as usize;
    }
    rank
}

pub(crate) fn unrank_permutation<const N: usize>(mut rank: usize) -> [u8; N] {
    let mut available: Vec<u8> = (0..N as u8).collect();
    let mut perm = [0; N];
    for (i, slot) in perm.iter_mut().enumerate() {
        let fact = FACT_UNTIL_12[N - 1 - i] as usize;
        *slot = available.remove(rank / fact);
        rank %= fact;
    }
    perm
}

impl CubeState {
    /// Corner orientations of the first seven corners, base 3. The last
    /// corner's twist follows from the others.
    pub(crate) fn twist(&self) -> usize {
        self.co[..7]
            .iter()
            .fold(0, |acc, co| acc * 3 + usize::from(*co))
    }

    pub(crate) fn set_twist(&mut self, mut twist: usize) {
        let mut sum = 0;
        for co in self.co[..7].iter_mut().rev() {
            *co = (twist % 3) as u8;
            sum += *co;
            twist /= 3;
        }
        self.co[7] = (3 - sum % 3) % 3;
    }

    /// Edge orientations of the first eleven edges, base 2.
    pub(crate) fn flip(&self) -> usize {
        self.eo[..11]
            .iter()
            .fold(0, |acc, eo| acc * 2 + usize::from(*eo))
    }

    pub(crate) fn set_flip(&mut self, mut flip: usize) {
        let mut sum = 0;
        for eo in self.eo[..11].iter_mut().rev() {
            *eo = (flip % 2) as u8;
            sum += *eo;
            flip /= 2;
        }
        self.eo[11] = sum % 2;
    }

    /// Which positions hold the slice edges (a combination rank below 495)
    /// times 24, plus the order the slice edges appear in. Zero when the
    /// slice edges are home.
    pub(crate) fn slice_sorted(&self) -> usize {
        let mut combination = 0;
        let mut found = 0;
        let mut slice_edges = [0; 4];
        for position in (0..12).rev() {
            let edge = self.ep[position];
            if edge.is_slice() {
                combination += binomial(11 - position, found + 1);
                slice_edges[3 - found] = edge as u8 - Edge::FR as u8;
                found += 1;
            }
        }
        combination * N_SLICE_PERM + rank_permutation(&slice_edges)
    }

    pub(crate) fn set_slice_sorted(&mut self, slice_sorted: usize) {
        debug_assert!(slice_sorted < N_SLICE_SORTED);
        let slice_edges = unrank_permutation::<4>(slice_sorted % N_SLICE_PERM);
        let mut combination = slice_sorted / N_SLICE_PERM;
        let mut other_edges = Edge::ALL.into_iter().filter(|edge| !edge.is_slice());
        let mut remaining = 4;
        for position in 0..12 {
            let needed = binomial(11 - position, remaining);
            if remaining > 0 && combination >= needed {
                let edge = Edge::FR as usize + usize::from(slice_edges[4 - remaining]);
                self.ep[position] = Edge::ALL[edge];
                combination -= needed;
                remaining -= 1;
            } else if let Some(edge) = other_edges.next() {
                self.ep[position] = edge;
            }
        }
    }

    /// The unordered slice edge positions only.
    pub(crate) fn slice(&self) -> usize {
        self.slice_sorted() / N_SLICE_PERM
    }

    pub(crate) fn corner_perm(&self) -> usize {
        rank_permutation(&self.cp.map(|corner| corner as u8))
    }

    pub(crate) fn set_corner_perm(&mut self, corner_perm: usize) {
        self.cp = unrank_permutation::<8>(corner_perm).map(|corner| Corner::ALL[corner as usize]);
    }

    /// The permutation of the U and D layer edges. Only meaningful in the
    /// domino subgroup, where those edges stay in the first eight positions.
    pub(crate) fn ud_edge_perm(&self) -> usize {
        let mut ud_edges = [0; 8];
        for (slot, edge) in ud_edges.iter_mut().zip(self.ep) {
            *slot = edge as u8;
        }
        rank_permutation(&ud_edges)
    }

    pub(crate) fn set_ud_edge_perm(&mut self, ud_edge_perm: usize) {
        for (slot, edge) in self.ep.iter_mut().zip(unrank_permutation::<8>(ud_edge_perm)) {
            *slot = Edge::ALL[edge as usize];
        }
    }

    /// The order of the slice edges inside the slice. Only meaningful in the
    /// domino subgroup, where it equals [`CubeState::slice_sorted`].
    pub(crate) fn slice_perm(&self) -> usize {
        self.slice_sorted()
    }
}

/// `coordinate x move -> coordinate` lookups.
#[derive(Debug)]
pub struct MoveTables {
    pub twist: Box<[[u16; Move::COUNT]]>,
    pub flip: Box<[[u16; Move::COUNT]]>,
    pub slice: Box<[[u16; Move::COUNT]]>,
    pub corner_perm: Box<[[u16; N_DOMINO_MOVES]]>,
    pub ud_edge_perm: Box<[[u16; N_DOMINO_MOVES]]>,
    pub slice_perm: Box<[[u16; N_DOMINO_MOVES]]>,
}

/// Fill a move table. Every coordinate has fewer than 2^16 values, so the
/// casts are lossless.
#[allow(clippy::cast_possible_truncation)]
fn generate<const MOVES: usize>(
    count: usize,
    moves: &[Move; MOVES],
    set: impl Fn(&mut CubeState, usize),
    get: impl Fn(&CubeState) -> usize,
) -> Box<[[u16; MOVES]]> {
    debug_assert!(count <= 1 << 16);
    let mut table = vec![[0; MOVES]; count].into_boxed_slice();
    let mut state = CubeState::solved();
    for (coord, row) in table.iter_mut().enumerate() {
        set(&mut state, coord);
        for (entry, move_) in row.iter_mut().zip(moves) {
            let next = get(&state.apply(*move_));
            debug_assert!(next < count);
            *entry = next as u16;
        }
    }
    table
}

impl MoveTables {
    pub fn generate() -> MoveTables {
        let slice_sorted_to_slice = |state: &mut CubeState, slice: usize| {
            state.set_slice_sorted(slice * N_SLICE_PERM);
        };
        MoveTables {
            twist: generate(N_TWIST, &Move::ALL, CubeState::set_twist, CubeState::twist),
            flip: generate(N_FLIP, &Move::ALL, CubeState::set_flip, CubeState::flip),
            slice: generate(N_SLICE, &Move::ALL, slice_sorted_to_slice, CubeState::slice),
            corner_perm: generate(
                N_CORNER_PERM,
                &DOMINO_MOVES,
                CubeState::set_corner_perm,
                CubeState::corner_perm,
            ),
            ud_edge_perm: generate(
                N_UD_EDGE_PERM,
                &DOMINO_MOVES,
                CubeState::set_ud_edge_perm,
                CubeState::ud_edge_perm,
            ),
            slice_perm: generate(
                N_SLICE_PERM,
                &DOMINO_MOVES,
                CubeState::set_slice_sorted,
                CubeState::slice_perm,
            ),
        }
    }

    /// The phase one coordinates `(twist, flip, slice)` after the move with
    /// index `move_index`.
    pub(crate) fn phase1_move(
        &self,
        (twist, flip, slice): (usize, usize, usize),
        move_index: usize,
    ) -> (usize, usize, usize) {
        (
            usize::from(self.twist[twist][move_index]),
            usize::from(self.flip[flip][move_index]),
            usize::from(self.slice[slice][move_index]),
        )
    }
}
