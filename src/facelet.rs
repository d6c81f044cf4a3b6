//! Conversion between cubie states and 54 character facelet strings.
//!
//! A facelet string lists the stickers of the U, R, F, D, L and B faces in
//! that order, nine per face, read row by row as if looking straight at the
//! face with U on top (or B on top, for the U face; F on top for the D face).
//! Stickers are named after the face whose center they match, so the solved
//! cube is `UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB`.

use crate::{
    cube::{Corner, CubeState, Edge},
    moves::Face,
};
use std::{fmt, str::FromStr};
use thiserror::Error;

use Face::{B, D, F, L, R, U};

/// The facelets a corner position covers, clockwise starting from its U or D
/// facelet.
const CORNER_FACELETS: [[usize; 3]; 8] = [
    [8, 9, 20],
    [6, 18, 38],
    [0, 36, 47],
    [2, 45, 11],
    [29, 26, 15],
    [27, 44, 24],
    [33, 53, 42],
    [35, 17, 51],
];

/// The facelets an edge position covers, starting from its reference facelet.
const EDGE_FACELETS: [[usize; 2]; 12] = [
    [5, 10],
    [7, 19],
    [3, 37],
    [1, 46],
    [32, 16],
    [28, 25],
    [30, 43],
    [34, 52],
    [23, 12],
    [21, 41],
    [50, 39],
    [48, 14],
];

const CORNER_COLORS: [[Face; 3]; 8] = [
    [U, R, F],
    [U, F, L],
    [U, L, B],
    [U, B, R],
    [D, F, R],
    [D, L, F],
    [D, B, L],
    [D, R, B],
];

const EDGE_COLORS: [[Face; 2]; 12] = [
    [U, R],
    [U, F],
    [U, L],
    [U, B],
    [D, R],
    [D, F],
    [D, L],
    [D, B],
    [F, R],
    [F, L],
    [B, L],
    [B, R],
];

/// A sticker level picture of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceletCube([Face; 54]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaceletError {
    #[error("Expected 54 facelets but got {0}")]
    WrongLength(usize),
    #[error("Invalid facelet `{0}`, expected one of U R F D L B")]
    InvalidFacelet(char),
    #[error("Expected 9 facelets of {face} but got {count}")]
    WrongColorCount { face: Face, count: usize },
    #[error("The center of the {actual} face is {found}")]
    MisplacedCenter { actual: Face, found: Face },
    #[error("No corner has the colors at corner position {0:?}")]
    UnknownCorner(Corner),
    #[error("No edge has the colors at edge position {0:?}")]
    UnknownEdge(Edge),
}

impl FaceletCube {
    #[must_use]
    pub fn facelets(&self) -> &[Face; 54] {
        &self.0
    }
}

impl FromStr for FaceletCube {
    type Err = FaceletError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let length = text.chars().count();
        if length != 54 {
            return Err(FaceletError::WrongLength(length));
        }

        let mut facelets = [U; 54];
        for (facelet, letter) in facelets.iter_mut().zip(text.chars()) {
            *facelet = Face::from_letter(letter).ok_or(FaceletError::InvalidFacelet(letter))?;
        }

        for face in Face::ALL {
            let count = facelets.iter().filter(|facelet| **facelet == face).count();
            if count != 9 {
                return Err(FaceletError::WrongColorCount { face, count });
            }
            let center = facelets[face.index() * 9 + 4];
            if center != face {
                return Err(FaceletError::MisplacedCenter {
                    actual: face,
                    found: center,
                });
            }
        }
        Ok(FaceletCube(facelets))
    }
}

impl fmt::Display for FaceletCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for facelet in self.0 {
            write!(f, "{facelet}")?;
        }
        Ok(())
    }
}

impl From<&CubeState> for FaceletCube {
    fn from(state: &CubeState) -> Self {
        let mut facelets = [U; 54];
        for face in Face::ALL {
            facelets[face.index() * 9 + 4] = face;
        }
        for (position, facelet_indices) in CORNER_FACELETS.iter().enumerate() {
            let corner = state.cp[position] as usize;
            let twist = usize::from(state.co[position]);
            for (n, color) in CORNER_COLORS[corner].iter().enumerate() {
                facelets[facelet_indices[(n + twist) % 3]] = *color;
            }
        }
        for (position, facelet_indices) in EDGE_FACELETS.iter().enumerate() {
            let edge = state.ep[position] as usize;
            let flip = usize::from(state.eo[position]);
            for (n, color) in EDGE_COLORS[edge].iter().enumerate() {
                facelets[facelet_indices[(n + flip) % 2]] = *color;
            }
        }
        FaceletCube(facelets)
    }
}

impl TryFrom<&FaceletCube> for CubeState {
    type Error = FaceletError;

    /// Identify the cubie at every position. The result is not validated; a
    /// picture can show real cubies arranged in an unreachable way.
    fn try_from(facelet_cube: &FaceletCube) -> Result<Self, Self::Error> {
        let facelets = &facelet_cube.0;
        let mut state = CubeState::solved();

        for (position, facelet_indices) in CORNER_FACELETS.iter().enumerate() {
            let unknown = FaceletError::UnknownCorner(Corner::ALL[position]);
            let twist = (0..3_u8)
                .find(|&twist| matches!(facelets[facelet_indices[usize::from(twist)]], U | D))
                .ok_or(unknown.clone())?;
            let clockwise = facelets[facelet_indices[usize::from(twist + 1) % 3]];
            let anticlockwise = facelets[facelet_indices[usize::from(twist + 2) % 3]];
            let corner = CORNER_COLORS
                .iter()
                .position(|colors| colors[1] == clockwise && colors[2] == anticlockwise)
                .ok_or(unknown)?;
            state.cp[position] = Corner::ALL[corner];
            state.co[position] = twist;
        }

        for (position, [a, b]) in EDGE_FACELETS.iter().enumerate() {
            let colors = [facelets[*a], facelets[*b]];
            let (edge, flip) = EDGE_COLORS
                .iter()
                .enumerate()
                .find_map(|(edge, edge_colors)| {
                    if *edge_colors == colors {
                        Some((edge, 0))
                    } else if [edge_colors[1], edge_colors[0]] == colors {
                        Some((edge, 1))
                    } else {
                        None
                    }
                })
                .ok_or(FaceletError::UnknownEdge(Edge::ALL[position]))?;
            state.ep[position] = Edge::ALL[edge];
            state.eo[position] = flip;
        }

        Ok(state)
    }
}

impl CubeState {
    /// The facelet string of the state.
    #[must_use]
    pub fn to_facelets(&self) -> FaceletCube {
        FaceletCube::from(self)
    }
}

impl fmt::Display for CubeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_facelets())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cube::InvalidState, moves::MoveSequence};

    // Scrambles and the facelet strings they produce, checked against an
    // independent twophase implementation.
    static TESTS: [[&str; 2]; 8] = [
        ["", "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"],
        [
            "U",
            "UUUUUUUUUBBBRRRRRRRRRFFFFFFDDDDDDDDDFFFLLLLLLLLLBBBBBB",
        ],
        [
            "U2 R2 L D2 L F2 B2 U' D' F U R' L2 U2 D L F' B2 D R2",
            "FLLLULFRFRUURRRBBBLDDFFUBRUDFRDDUFLDUFUFLDLBRBDRBBULBD",
        ],
        [
            "L U' R2 F B2 R2 L U' D2 R2 F B' U R' U2 R2 D2 F2 U2 L'",
            "BLBLUFFFFDULURFRRULDLBFRDBUFDFBDDDBRDUUFLULRRUDRLBRBLB",
        ],
        [
            "R L2 U2 D2 R2 U2 R' D2 R' F' R L2 B R2 L' F' B2 U' D' F B2 U R' L2",
            "DUULUFBDDRRFURDBFLRBBUFBLBLULURDLLBDFUUFLRBDFRFRLBDFRD",
        ],
        [
            "R2 D' B2 U' D' R2 U' L2 U' L2 B' R' F D F' B U2 L'",
            "BUDFUDRFDBRFURBFDRDULRFBUBURDLFDLRDDULFULBBRFLRLLBLBFU",
        ],
        [
            "L D2 R' L' D2 F' R' L' F B2 U' D F B' R' U2 L",
            "FRFDUDULRUBDFRBFFRLDBLFRDULRRDLDUBLULFBBLFDBBRDURBUFUL",
        ],
        [
            "U2 D2 L2 F' B L2 B2 U2 F' R L2 F' B2 U2 D F' U' D2 R U2 D F2",
            "LBDLULDDURDRRRFRURBFFRFBFRDLDBDDBDFBBULRLFFBUFLUUBUULL",
        ],
    ];

    #[test]
    fn scrambles_produce_known_facelets() {
        for [scramble, facelets] in TESTS {
            let state = CubeState::from(&scramble.parse::<MoveSequence>().unwrap());
            assert_eq!(state.to_facelets().to_string(), facelets, "{scramble}");
        }
    }

    #[test]
    fn facelets_round_trip_to_states() {
        for [scramble, facelets] in TESTS {
            let state = CubeState::from(&scramble.parse::<MoveSequence>().unwrap());
            let parsed: FaceletCube = facelets.parse().unwrap();
            assert_eq!(CubeState::try_from(&parsed), Ok(state), "{scramble}");
        }

        let mut rng = fastrand::Rng::with_seed(5);
        for _ in 0..50 {
            let state = CubeState::random(&mut rng);
            assert_eq!(CubeState::try_from(&state.to_facelets()), Ok(state));
        }
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert_eq!(
            "UUU".parse::<FaceletCube>(),
            Err(FaceletError::WrongLength(3))
        );
        assert_eq!(
            "XUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB".parse::<FaceletCube>(),
            Err(FaceletError::InvalidFacelet('X'))
        );
        assert_eq!(
            "RUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB".parse::<FaceletCube>(),
            Err(FaceletError::WrongColorCount { face: U, count: 8 })
        );
        assert_eq!(
            "UUUURUUUURRRRURRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB".parse::<FaceletCube>(),
            Err(FaceletError::MisplacedCenter {
                actual: U,
                found: R
            })
        );
    }

    #[test]
    fn impossible_pictures_are_caught() {
        // No corner has two U stickers
        let mut facelets = *CubeState::solved().to_facelets().facelets();
        facelets[9] = U;
        assert_eq!(
            CubeState::try_from(&FaceletCube(facelets)),
            Err(FaceletError::UnknownCorner(Corner::URF))
        );

        // A single flipped edge identifies fine but is unreachable
        let mut facelets = *CubeState::solved().to_facelets().facelets();
        facelets.swap(5, 10);
        let state = CubeState::try_from(&FaceletCube(facelets)).unwrap();
        assert_eq!(state.validate(), Err(InvalidState::FlippedEdge(1)));

        // A single twisted corner
        let mut facelets = *CubeState::solved().to_facelets().facelets();
        facelets[8] = R;
        facelets[9] = F;
        facelets[20] = U;
        let state = CubeState::try_from(&FaceletCube(facelets)).unwrap();
        assert_eq!(state.validate(), Err(InvalidState::TwistedCorner(2)));
    }
}
