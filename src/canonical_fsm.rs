//! Canonical move sequence automaton, derived primarily from Lucas Garron's
//! implementation in twsearch:
//! https://github.com/cubing/twsearch/blob/main/src/rs/_internal/canonical_fsm/canonical_fsm.rs
//!
//! The move classes of the 3x3 are its six faces. Turning the same face twice
//! in a row is never canonical, and of two commuting faces (U and D, say) only
//! the order with the lower face index first is.

use crate::moves::Face;
use std::collections::HashMap;

const NUM_MOVE_CLASSES: usize = Face::ALL.len();

// Bit N is indexed by a face index of N.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
struct MoveClassMask(u8);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanonicalFSMState(usize);

#[derive(Debug)]
pub struct CanonicalFSM {
    next_state_lookup: Vec<[CanonicalFSMState; NUM_MOVE_CLASSES]>,
}

const ILLEGAL: CanonicalFSMState = CanonicalFSMState(usize::MAX);

impl CanonicalFSM {
    pub fn new() -> Self {
        let mut commutes = [MoveClassMask((1 << NUM_MOVE_CLASSES) - 1); NUM_MOVE_CLASSES];
        for face_1 in Face::ALL {
            for face_2 in Face::ALL {
                if !face_1.commutes_with(face_2) {
                    commutes[face_1.index()].0 &= !(1 << face_2.index());
                }
            }
        }

        let mut next_state_lookup = vec![];

        let mut mask_to_state = HashMap::new();
        mask_to_state.insert(MoveClassMask(0), CanonicalFSMState(0));
        // Indexed by state ordinal, holds the set of move classes in the
        // sequence so far that no later move failed to commute with
        let mut state_to_mask = vec![MoveClassMask(0)];

        let mut queue_index = 0;
        while queue_index < state_to_mask.len() {
            let mut next_state = [ILLEGAL; NUM_MOVE_CLASSES];
            let dequeue_mask = state_to_mask[queue_index];
            queue_index += 1;

            for move_class_index in 0..NUM_MOVE_CLASSES {
                // Skip if this face is already pending, or if a greater face
                // that commutes with it is
                let pending_commuting = dequeue_mask.0 & commutes[move_class_index].0;
                if (pending_commuting >> move_class_index) != 0 {
                    continue;
                }

                let next_mask = MoveClassMask(pending_commuting | (1 << move_class_index));
                next_state[move_class_index] = *mask_to_state.entry(next_mask).or_insert_with(|| {
                    state_to_mask.push(next_mask);
                    CanonicalFSMState(state_to_mask.len() - 1)
                });
            }
            next_state_lookup.push(next_state);
        }

        Self { next_state_lookup }
    }

    /// The state after turning `face`, or `None` if turning it here would make
    /// the sequence non-canonical.
    pub fn next_state(
        &self,
        current_fsm_state: CanonicalFSMState,
        face: Face,
    ) -> Option<CanonicalFSMState> {
        match self.next_state_lookup[current_fsm_state.0][face.index()] {
            ILLEGAL => None,
            state => Some(state),
        }
    }

    /// The state after a whole sequence of faces, or `None` if it is not
    /// canonical.
    pub fn walk(&self, faces: impl IntoIterator<Item = Face>) -> Option<CanonicalFSMState> {
        faces
            .into_iter()
            .try_fold(CanonicalFSMState::default(), |state, face| {
                self.next_state(state, face)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_fsm_initially_all_legal() {
        let canonical_fsm = CanonicalFSM::new();

        for face in Face::ALL {
            assert!(
                canonical_fsm
                    .next_state(CanonicalFSMState::default(), face)
                    .is_some()
            );
        }
    }

    #[test]
    fn test_canonical_fsm_prevents_self() {
        let canonical_fsm = CanonicalFSM::new();

        for face in Face::ALL {
            assert!(canonical_fsm.walk([face, face]).is_none());
        }
    }

    #[test]
    fn test_canonical_fsm_orders_opposite_faces() {
        let canonical_fsm = CanonicalFSM::new();

        for face_1 in Face::ALL {
            for face_2 in Face::ALL {
                let allows_1_then_2 = canonical_fsm.walk([face_1, face_2]).is_some();
                let allows_2_then_1 = canonical_fsm.walk([face_2, face_1]).is_some();
                if face_1 == face_2 {
                    assert!(!allows_1_then_2);
                } else if face_1.commutes_with(face_2) {
                    // We expect a total ordering of commutative move classes.
                    // Xor gives me that truth table.
                    assert!(allows_1_then_2 ^ allows_2_then_1);
                    assert_eq!(allows_1_then_2, face_1 < face_2);
                } else {
                    assert!(allows_1_then_2 && allows_2_then_1);
                }
            }
        }
    }

    #[test]
    fn test_canonical_fsm_remembers_axis() {
        let canonical_fsm = CanonicalFSM::new();

        // U D U can be rewritten as U2 D
        assert!(canonical_fsm.walk([Face::U, Face::D]).is_some());
        assert!(canonical_fsm.walk([Face::U, Face::D, Face::U]).is_none());
        assert!(canonical_fsm.walk([Face::U, Face::D, Face::R, Face::U]).is_some());
    }

    #[test]
    fn test_canonical_fsm_state_count() {
        // Start, then one state per face, with U D, R L and F B sharing a
        // state with their second face
        let canonical_fsm = CanonicalFSM::new();
        assert_eq!(canonical_fsm.next_state_lookup.len(), 10);
    }
}
