//! Face turn notation.

use itertools::Itertools;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The six faces in the U R F D L B order used by facelet strings. A face's
/// opposite is three places away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Face {
    U,
    R,
    F,
    D,
    L,
    B,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::U, Face::R, Face::F, Face::D, Face::L, Face::B];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn opposite(self) -> Face {
        Face::ALL[(self.index() + 3) % 6]
    }

    /// Whether turns of `self` and `other` commute, which for distinct faces
    /// only happens on a shared axis.
    #[must_use]
    pub fn commutes_with(self, other: Face) -> bool {
        self == other || self.opposite() == other
    }

    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Face::U => 'U',
            Face::R => 'R',
            Face::F => 'F',
            Face::D => 'D',
            Face::L => 'L',
            Face::B => 'B',
        }
    }

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Face> {
        Face::ALL.into_iter().find(|face| face.letter() == letter)
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// How far a face is turned, looking at the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Turn {
    Clockwise,
    Half,
    CounterClockwise,
}

impl Turn {
    pub const ALL: [Turn; 3] = [Turn::Clockwise, Turn::Half, Turn::CounterClockwise];

    /// The number of clockwise quarter turns.
    #[must_use]
    pub fn quarter_turns(self) -> usize {
        self as usize + 1
    }

    #[must_use]
    pub fn inverse(self) -> Turn {
        match self {
            Turn::Clockwise => Turn::CounterClockwise,
            Turn::Half => Turn::Half,
            Turn::CounterClockwise => Turn::Clockwise,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Turn::Clockwise => "",
            Turn::Half => "2",
            Turn::CounterClockwise => "'",
        }
    }
}

/// One of the 18 face turns of the cube.
///
/// Moves are totally ordered by [`Move::index`] (U U2 U' R R2 R' ...). The
/// solver relies on this order to break ties between equally short
/// solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub face: Face,
    pub turn: Turn,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseMoveError {
    #[error("Invalid move token `{0}`, expected a face letter (U D L R F B) optionally followed by ' or 2")]
    InvalidMoveToken(String),
}

impl Move {
    pub const COUNT: usize = 18;

    pub const ALL: [Move; Move::COUNT] = {
        let mut moves = [Move::new(Face::U, Turn::Clockwise); Move::COUNT];
        let mut i = 0;
        while i < Move::COUNT {
            moves[i] = Move::new(Face::ALL[i / 3], Turn::ALL[i % 3]);
            i += 1;
        }
        moves
    };

    #[must_use]
    pub const fn new(face: Face, turn: Turn) -> Move {
        Move { face, turn }
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.face.index() * 3 + self.turn as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Move {
        Move::ALL[index]
    }

    #[must_use]
    pub fn inverse(self) -> Move {
        Move::new(self.face, self.turn.inverse())
    }

    /// Whether the move keeps a cube inside the subgroup generated by
    /// U, D, R2, L2, F2 and B2.
    #[must_use]
    pub fn preserves_domino(self) -> bool {
        matches!(self.face, Face::U | Face::D) || self.turn == Turn::Half
    }
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMoveError::InvalidMoveToken(token.to_owned());

        let mut chars = token.chars();
        let face = chars.next().and_then(Face::from_letter).ok_or_else(invalid)?;
        let turn = match chars.as_str() {
            "" => Turn::Clockwise,
            "2" => Turn::Half,
            // Some solvers print counter-clockwise turns as a triple turn
            "'" | "3" => Turn::CounterClockwise,
            _ => return Err(invalid()),
        };
        Ok(Move::new(face, turn))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face, self.turn.suffix())
    }
}

/// An ordered list of moves, written as space separated tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MoveSequence(pub Vec<Move>);

impl MoveSequence {
    #[must_use]
    pub fn new(moves: Vec<Move>) -> MoveSequence {
        MoveSequence(moves)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sequence that undoes this one: reversed, with every move inverted.
    #[must_use]
    pub fn inverse(&self) -> MoveSequence {
        MoveSequence(self.0.iter().rev().map(|move_| move_.inverse()).collect())
    }

    /// `length` uniformly random moves. Consecutive moves may cancel; this is
    /// a stress generator, not a competition scramble.
    #[must_use]
    pub fn random(rng: &mut fastrand::Rng, length: usize) -> MoveSequence {
        MoveSequence(
            (0..length)
                .map(|_| Move::from_index(rng.usize(..Move::COUNT)))
                .collect(),
        )
    }
}

impl std::ops::Deref for MoveSequence {
    type Target = [Move];

    fn deref(&self) -> &[Move] {
        &self.0
    }
}

impl FromStr for MoveSequence {
    type Err = ParseMoveError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(MoveSequence)
    }
}

impl fmt::Display for MoveSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}
