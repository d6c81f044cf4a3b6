//! Pruning tables: how many moves each search phase still needs at least.
//!
//! Phase one reads a single table indexed by the symmetry class of the flip
//! and slice coordinates and the matching transform of the twist. Every
//! entry holds the exact distance to the domino subgroup modulo 3 in two
//! bits. That is enough to recover the exact distance, because neighbouring
//! entries differ by at most one move: walk to a neighbour one step closer
//! until the goal is reached. During the search the distance of a child
//! follows from its parent's without any walk.
//!
//! Phase two takes the larger of two byte-per-entry tables, each the exact
//! distance of a pair of phase two coordinates.
//!
//! Tables are generated by a breadth first search outward from the goal, or
//! loaded from a file written by a previous run. Once built they are never
//! written to again.

use crate::{
    coord::{MoveTables, N_CORNER_PERM, N_DOMINO_MOVES, N_SLICE_PERM, N_TWIST, N_UD_EDGE_PERM},
    cube::CubeState,
    moves::Move,
    start, success,
    symmetry::{N_FLIPSLICE_CLASS, N_SYM, SymmetryTables},
    working,
};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Instant,
};
use thiserror::Error;

const UNVISITED: u8 = u8::MAX;
/// A phase one entry that has no distance yet.
const EMPTY: u8 = 3;
const N_PHASE1: usize = N_FLIPSLICE_CLASS * N_TWIST;
/// Every cube reaches the domino subgroup in this many moves.
const PHASE1_DIAMETER: usize = 12;
/// Every domino cube is solved in this many moves.
const PHASE2_DIAMETER: u8 = 18;
/// From this depth on most of the phase one table is filled, and it is
/// faster to look for empty entries next to the frontier than to expand it.
const BACKWARD_SEARCH_DEPTH: u8 = 9;

const MAGIC: &[u8; 8] = b"TWOPHASE";
const FORMAT_VERSION: u32 = 2;
pub const TABLE_FILE_NAME: &str = "pruning-tables.bin";

static GLOBAL_TABLES: LazyLock<PruningTables> =
    LazyLock::new(|| match PruningTables::default_cache_dir() {
        Some(dir) => PruningTables::load_or_generate(&dir),
        None => PruningTables::generate(),
    });

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Could not access the pruning table file: {0}")]
    Io(#[from] std::io::Error),
    #[error("The pruning table file is not a table file of this version")]
    BadHeader,
    #[error("The {name} table has {actual} entries, expected {expected}")]
    SizeMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("The pruning table file is damaged, its checksum does not match")]
    ChecksumMismatch,
    #[error("The {name} table is corrupt: {problem}")]
    Corrupt {
        name: &'static str,
        problem: &'static str,
    },
}

/// The move tables, symmetry tables and pruning tables of the solver.
#[derive(Debug)]
pub struct PruningTables {
    pub(crate) moves: MoveTables,
    symmetry: SymmetryTables,
    /// Four entries per byte, see [`get_packed`].
    phase1: Box<[u8]>,
    corner_slice: Box<[u8]>,
    edge_slice: Box<[u8]>,
}

fn get_packed(table: &[u8], index: usize) -> u8 {
    (table[index / 4] >> (2 * (index % 4))) & 3
}

fn set_packed(table: &mut [u8], index: usize, value: u8) {
    let shift = 2 * (index % 4);
    let byte = &mut table[index / 4];
    *byte = (*byte & !(3 << shift)) | (value << shift);
}

/// The distance of a child in the phase one search, given its parent's
/// distance and the child's entry.
pub(crate) fn next_phase1_distance(parent: usize, residue: u8) -> usize {
    match (usize::from(residue) + 3 - parent % 3) % 3 {
        0 => parent,
        1 => parent + 1,
        _ => parent.saturating_sub(1),
    }
}

fn phase1_index(symmetry: &SymmetryTables, (twist, flip, slice): (usize, usize, usize)) -> usize {
    let (class, sym) = symmetry.flipslice_class(flip, slice);
    class * N_TWIST + symmetry.twist_conj(twist, sym)
}

fn generate_phase1(moves: &MoveTables, symmetry: &SymmetryTables) -> Box<[u8]> {
    let start = Instant::now();
    let mut table = vec![u8::MAX; N_PHASE1.div_ceil(4)].into_boxed_slice();
    set_packed(&mut table, 0, 0);
    let mut filled = 1;
    let mut depth = 0;
    while filled < N_PHASE1 {
        let backward = depth >= BACKWARD_SEARCH_DEPTH;
        let residue = depth % 3;
        let next_residue = (depth + 1) % 3;
        let wanted = if backward { EMPTY } else { residue };
        let mut discovered = 0;

        let mut index = 0;
        while index < N_PHASE1 {
            if !backward && index % 4 == 0 && table[index / 4] == u8::MAX {
                index += 4;
                continue;
            }
            if get_packed(&table, index) != wanted {
                index += 1;
                continue;
            }

            let (class, twist) = (index / N_TWIST, index % N_TWIST);
            let (flip, slice) = symmetry.class_rep(class);
            for move_index in 0..Move::COUNT {
                let next = moves.phase1_move((twist, flip, slice), move_index);
                let next_index = phase1_index(symmetry, next);
                if backward {
                    if get_packed(&table, next_index) == residue {
                        set_packed(&mut table, index, next_residue);
                        discovered += 1;
                        break;
                    }
                    continue;
                }
                if get_packed(&table, next_index) != EMPTY {
                    continue;
                }
                set_packed(&mut table, next_index, next_residue);
                discovered += 1;

                // Symmetries that fix the representative give the other
                // entries of the same cube
                let next_class = next_index / N_TWIST;
                let next_twist = next_index % N_TWIST;
                let stabilizer = symmetry.class_stabilizer(next_class);
                for sym in (1..N_SYM).filter(|sym| (stabilizer >> sym) & 1 == 1) {
                    let twin = next_class * N_TWIST + symmetry.twist_conj(next_twist, sym);
                    if get_packed(&table, twin) == EMPTY {
                        set_packed(&mut table, twin, next_residue);
                        discovered += 1;
                    }
                }
            }
            index += 1;
        }

        filled += discovered;
        depth += 1;
        debug!(
            working!("phase one table depth {}: {} of {} entries filled"),
            depth, filled, N_PHASE1
        );
        if discovered == 0 {
            warn!("phase one table has {} unreachable entries", N_PHASE1 - filled);
            break;
        }
    }
    debug!(
        working!("Generated the phase one table in {:.3}s"),
        start.elapsed().as_secs_f64()
    );
    table
}

/// Breadth first search over the product of two phase two coordinates.
/// `next` maps `(a, b, move)` to the coordinates after the move.
fn generate_phase2(
    name: &str,
    size_a: usize,
    size_b: usize,
    next: impl Fn(usize, usize, usize) -> (usize, usize),
) -> Box<[u8]> {
    let start = Instant::now();
    let total = size_a * size_b;
    let mut table = vec![UNVISITED; total].into_boxed_slice();
    table[0] = 0;
    let mut filled = 1;
    let mut depth = 0;
    while filled < total {
        let mut discovered = 0;
        for index in 0..total {
            if table[index] != depth {
                continue;
            }
            let (a, b) = (index / size_b, index % size_b);
            for move_index in 0..N_DOMINO_MOVES {
                let (next_a, next_b) = next(a, b, move_index);
                let entry = &mut table[next_a * size_b + next_b];
                if *entry == UNVISITED {
                    *entry = depth + 1;
                    discovered += 1;
                }
            }
        }
        filled += discovered;
        depth += 1;
        debug!(
            working!("{} table depth {}: {} of {} entries filled"),
            name, depth, filled, total
        );
        if discovered == 0 {
            warn!("{name} table has {} unreachable entries", total - filled);
            break;
        }
    }
    debug!(
        working!("Generated the {} table in {:.3}s"),
        name,
        start.elapsed().as_secs_f64()
    );
    table
}

impl PruningTables {
    /// The process wide tables, loaded from the default cache directory or
    /// generated on first use.
    pub fn global() -> &'static PruningTables {
        &GLOBAL_TABLES
    }

    /// Generate every table from scratch.
    #[must_use]
    pub fn generate() -> PruningTables {
        info!(start!("Generating pruning tables"));
        let start = Instant::now();
        let moves = MoveTables::generate();
        let symmetry = SymmetryTables::generate();
        let phase1 = generate_phase1(&moves, &symmetry);
        let corner_slice = generate_phase2(
            "corner x slice",
            N_CORNER_PERM,
            N_SLICE_PERM,
            |corner_perm, slice_perm, m| {
                (
                    usize::from(moves.corner_perm[corner_perm][m]),
                    usize::from(moves.slice_perm[slice_perm][m]),
                )
            },
        );
        let edge_slice = generate_phase2(
            "edge x slice",
            N_UD_EDGE_PERM,
            N_SLICE_PERM,
            |ud_edge_perm, slice_perm, m| {
                (
                    usize::from(moves.ud_edge_perm[ud_edge_perm][m]),
                    usize::from(moves.slice_perm[slice_perm][m]),
                )
            },
        );
        info!(
            success!("Pruning tables generated in {:.3}s"),
            start.elapsed().as_secs_f64()
        );
        PruningTables {
            moves,
            symmetry,
            phase1,
            corner_slice,
            edge_slice,
        }
    }

    /// Load the tables from `dir`, or generate them and try to save them
    /// there for next time. A broken or unwritable cache only costs time.
    #[must_use]
    pub fn load_or_generate(dir: &Path) -> PruningTables {
        let path = dir.join(TABLE_FILE_NAME);
        if path.exists() {
            match Self::load(&path) {
                Ok(tables) => return tables,
                Err(e) => warn!("Ignoring pruning table cache at {}: {e}", path.display()),
            }
        }

        let tables = Self::generate();
        if let Err(e) = fs::create_dir_all(dir).map_err(TableError::from).and_then(|()| tables.save(&path)) {
            warn!("Could not save pruning tables to {}: {e}", path.display());
        }
        tables
    }

    /// The default cache directory, inside the user's cache folder.
    #[must_use]
    pub fn default_cache_dir() -> Option<PathBuf> {
        let mut cache = dirs::cache_dir()?;
        cache.push("twophase-tables");
        Some(cache)
    }

    /// Write the pruning tables to `path`, followed by a SHA-256 digest of
    /// everything after the header. Move and symmetry tables are cheap to
    /// regenerate and are not saved.
    ///
    /// The file is written next to `path` and renamed into place, so a
    /// reader never sees half of it.
    ///
    /// # Errors
    ///
    /// If the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        info!(start!("Saving pruning tables to {}"), path.display());
        let partial_path = path.with_extension(format!("{}.partial", std::process::id()));
        let mut writer = BufWriter::new(File::create(&partial_path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        let mut sha256 = Sha256::new();
        for (_, table) in self.named_tables() {
            let len = (table.len() as u64).to_le_bytes();
            writer.write_all(&len)?;
            writer.write_all(table)?;
            sha256.update(len);
            sha256.update(table);
        }
        writer.write_all(&sha256.finalize())?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&partial_path, path)?;
        Ok(())
    }

    /// Read pruning tables written by [`PruningTables::save`].
    ///
    /// # Errors
    ///
    /// If the file cannot be read, was written by another version, has
    /// tables of the wrong size, fails its checksum, or holds tables that
    /// cannot be right. See [`TableError`].
    pub fn load(path: &Path) -> Result<PruningTables, TableError> {
        info!(start!("Loading pruning tables from {}"), path.display());
        let start = Instant::now();
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0; 8];
        let mut version = [0; 4];
        reader.read_exact(&mut magic)?;
        reader.read_exact(&mut version)?;
        if &magic != MAGIC || u32::from_le_bytes(version) != FORMAT_VERSION {
            return Err(TableError::BadHeader);
        }

        let mut sha256 = Sha256::new();
        let mut read_table = |name: &'static str, expected: usize| -> Result<Box<[u8]>, TableError> {
            let mut len = [0; 8];
            reader.read_exact(&mut len)?;
            let actual = usize::try_from(u64::from_le_bytes(len)).unwrap_or(usize::MAX);
            if actual != expected {
                return Err(TableError::SizeMismatch {
                    name,
                    expected,
                    actual,
                });
            }
            let mut table = vec![0; expected].into_boxed_slice();
            reader.read_exact(&mut table)?;
            sha256.update(len);
            sha256.update(&table);
            Ok(table)
        };
        let phase1 = read_table("phase one", N_PHASE1.div_ceil(4))?;
        let corner_slice = read_table("corner x slice", N_CORNER_PERM * N_SLICE_PERM)?;
        let edge_slice = read_table("edge x slice", N_UD_EDGE_PERM * N_SLICE_PERM)?;

        let mut digest = [0; 32];
        reader.read_exact(&mut digest)?;
        if sha256.finalize()[..] != digest[..] {
            return Err(TableError::ChecksumMismatch);
        }

        let tables = PruningTables {
            moves: MoveTables::generate(),
            symmetry: SymmetryTables::generate(),
            phase1,
            corner_slice,
            edge_slice,
        };
        tables.check()?;
        info!(
            success!("Pruning tables loaded in {:.3}s"),
            start.elapsed().as_secs_f64()
        );
        Ok(tables)
    }

    /// Reject tables that no search could have produced: the goal must be
    /// the only entry at distance zero of a phase two table, every entry must
    /// be filled, and no distance may exceed the diameter of its phase.
    fn check(&self) -> Result<(), TableError> {
        let corrupt = |name, problem| Err(TableError::Corrupt { name, problem });

        if get_packed(&self.phase1, 0) != 0 {
            return corrupt("phase one", "the goal is not at distance zero");
        }
        let full_bytes = N_PHASE1 / 4;
        // A byte holds an empty entry when both bits of some entry are set
        let has_empty = self.phase1[..full_bytes]
            .iter()
            .any(|byte| byte & (byte >> 1) & 0x55 != 0)
            || (full_bytes * 4..N_PHASE1).any(|index| get_packed(&self.phase1, index) == EMPTY);
        if has_empty {
            return corrupt("phase one", "an entry was never filled");
        }

        for (name, table) in [
            ("corner x slice", &self.corner_slice),
            ("edge x slice", &self.edge_slice),
        ] {
            if table[0] != 0 {
                return corrupt(name, "the goal is not at distance zero");
            }
            if table[1..].contains(&0) {
                return corrupt(name, "an entry other than the goal is at distance zero");
            }
            if table.iter().any(|distance| *distance > PHASE2_DIAMETER) {
                return corrupt(name, "an entry is farther than any domino cube can be");
            }
        }
        Ok(())
    }

    fn named_tables(&self) -> [(&'static str, &[u8]); 3] {
        [
            ("phase one", &self.phase1[..]),
            ("corner x slice", &self.corner_slice[..]),
            ("edge x slice", &self.edge_slice[..]),
        ]
    }

    /// The phase one distance modulo 3.
    pub(crate) fn phase1_residue(&self, coords: (usize, usize, usize)) -> u8 {
        get_packed(&self.phase1, phase1_index(&self.symmetry, coords))
    }

    /// The exact number of moves needed to reach the domino subgroup from
    /// the phase one coordinates `(twist, flip, slice)`.
    pub(crate) fn phase1_distance_of(&self, mut coords: (usize, usize, usize)) -> usize {
        let mut residue = self.phase1_residue(coords);
        let mut distance = 0;
        while coords != (0, 0, 0) && distance < PHASE1_DIAMETER {
            let closer = (residue + 2) % 3;
            let Some(next) = (0..Move::COUNT)
                .map(|move_index| self.moves.phase1_move(coords, move_index))
                .find(|next| self.phase1_residue(*next) == closer)
            else {
                break;
            };
            coords = next;
            residue = closer;
            distance += 1;
        }
        distance
    }

    /// Lower bound on the moves needed to solve a cube in the domino subgroup.
    pub(crate) fn phase2_heuristic(
        &self,
        corner_perm: usize,
        ud_edge_perm: usize,
        slice_perm: usize,
    ) -> u8 {
        self.corner_slice[corner_perm * N_SLICE_PERM + slice_perm]
            .max(self.edge_slice[ud_edge_perm * N_SLICE_PERM + slice_perm])
    }

    /// The exact number of moves needed to bring `state` into the domino
    /// subgroup.
    #[must_use]
    pub fn phase1_distance(&self, state: &CubeState) -> usize {
        self.phase1_distance_of((state.twist(), state.flip(), state.slice()))
    }
}

/// Tables for unit tests, generated once per test binary without touching
/// the user's cache directory.
#[cfg(test)]
pub(crate) fn test_tables() -> &'static PruningTables {
    static TEST_TABLES: LazyLock<PruningTables> = LazyLock::new(PruningTables::generate);
    &TEST_TABLES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        moves::MoveSequence,
        solver::{SolverConfig, TwoPhaseSolver},
    };

    /// Shortest phase one solution by plain iterative deepening.
    fn brute_force_phase1_distance(moves: &MoveTables, coords: (usize, usize, usize)) -> usize {
        fn reaches_goal(moves: &MoveTables, coords: (usize, usize, usize), depth: usize) -> bool {
            if depth == 0 {
                return coords == (0, 0, 0);
            }
            (0..Move::COUNT).any(|m| reaches_goal(moves, moves.phase1_move(coords, m), depth - 1))
        }
        (0..).find(|depth| reaches_goal(moves, coords, *depth)).unwrap()
    }

    fn payload_offset() -> usize {
        MAGIC.len() + 4 + 8
    }

    #[test_log::test]
    fn only_the_goal_has_distance_zero() {
        let tables = test_tables();
        tables.check().unwrap();
        for (name, table) in [("corner x slice", &tables.corner_slice), ("edge x slice", &tables.edge_slice)] {
            assert_eq!(table[0], 0, "{name}");
            assert!(table[1..].iter().all(|entry| *entry != 0), "{name}");
            assert!(table.iter().all(|entry| *entry <= PHASE2_DIAMETER), "{name}");
        }
    }

    #[test_log::test]
    fn phase1_distance_is_exact() {
        let tables = test_tables();
        let mut rng = fastrand::Rng::with_seed(21);
        for length in 0..=4 {
            for _ in 0..5 {
                let scramble = MoveSequence::random(&mut rng, length);
                let state = CubeState::from(&scramble);
                let coords = (state.twist(), state.flip(), state.slice());
                assert_eq!(
                    tables.phase1_distance(&state),
                    brute_force_phase1_distance(&tables.moves, coords),
                    "{scramble}"
                );
            }
        }
        assert_eq!(tables.phase1_distance(&CubeState::from(&"R".parse::<MoveSequence>().unwrap())), 1);
    }

    #[test_log::test]
    fn neighbours_differ_by_at_most_one_move() {
        let tables = test_tables();
        let mut rng = fastrand::Rng::with_seed(8);
        for _ in 0..300 {
            let state = CubeState::random(&mut rng);
            let coords = (state.twist(), state.flip(), state.slice());
            let distance = tables.phase1_distance_of(coords);
            assert!((1..=PHASE1_DIAMETER).contains(&distance));

            let mut has_closer = false;
            for move_index in 0..Move::COUNT {
                let next = tables.moves.phase1_move(coords, move_index);
                let next_distance = tables.phase1_distance_of(next);
                assert!(next_distance.abs_diff(distance) <= 1);
                assert_eq!(next_phase1_distance(distance, tables.phase1_residue(next)), next_distance);
                has_closer |= next_distance + 1 == distance;
            }
            assert!(has_closer);
        }
    }

    #[test_log::test]
    fn phase2_heuristic_is_a_lower_bound() {
        let tables = test_tables();
        let domino: MoveSequence = "U R2 F2 D".parse().unwrap();
        let state = CubeState::from(&domino);
        assert_eq!(tables.phase1_distance(&state), 0);
        let bound = tables.phase2_heuristic(state.corner_perm(), state.ud_edge_perm(), state.slice_perm());
        assert!((1..=4).contains(&bound));
    }

    #[test_log::test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TABLE_FILE_NAME);
        let tables = test_tables();
        tables.save(&path).unwrap();

        let loaded = PruningTables::load(&path).unwrap();
        for ((name, original), (_, loaded)) in tables.named_tables().into_iter().zip(loaded.named_tables()) {
            assert!(original == loaded, "{name}");
        }

        let cached = PruningTables::load_or_generate(dir.path());
        assert!(cached.phase1 == tables.phase1);
    }

    #[test_log::test]
    fn load_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TABLE_FILE_NAME);
        fs::write(&path, b"definitely not a table").unwrap();
        assert!(matches!(PruningTables::load(&path), Err(TableError::BadHeader)));

        let mut truncated = MAGIC.to_vec();
        truncated.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        truncated.extend_from_slice(&7_u64.to_le_bytes());
        fs::write(&path, truncated).unwrap();
        assert!(matches!(
            PruningTables::load(&path),
            Err(TableError::SizeMismatch { actual: 7, .. })
        ));

        assert!(matches!(
            PruningTables::load(&dir.path().join("missing")),
            Err(TableError::Io(_))
        ));
    }

    #[test_log::test]
    fn damaged_cache_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TABLE_FILE_NAME);
        let tables = test_tables();
        tables.save(&path).unwrap();

        // Same size, different content
        let mut bytes = fs::read(&path).unwrap();
        let damaged = payload_offset() + N_PHASE1 / 8;
        bytes[damaged] ^= 0b0101_0101;
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(PruningTables::load(&path), Err(TableError::ChecksumMismatch)));

        let regenerated = PruningTables::load_or_generate(dir.path());
        assert!(regenerated.phase1 == tables.phase1);
        assert!(PruningTables::load(&path).is_ok());

        let state = CubeState::from(&"R U".parse::<MoveSequence>().unwrap());
        let solution = TwoPhaseSolver::new(&regenerated, SolverConfig::default())
            .solve(&state)
            .unwrap();
        assert_eq!(solution.moves.to_string(), "U' R'");
    }

    #[test_log::test]
    fn impossible_tables_are_rejected_despite_a_valid_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TABLE_FILE_NAME);
        let tables = test_tables();
        let mut corner_slice = tables.corner_slice.clone();
        corner_slice[100] = 0;
        let broken = PruningTables {
            moves: MoveTables::generate(),
            symmetry: SymmetryTables::generate(),
            phase1: tables.phase1.clone(),
            corner_slice,
            edge_slice: tables.edge_slice.clone(),
        };
        broken.save(&path).unwrap();
        assert!(matches!(
            PruningTables::load(&path),
            Err(TableError::Corrupt { name: "corner x slice", .. })
        ));

        let mut phase1 = tables.phase1.clone();
        set_packed(&mut phase1, 12345, EMPTY);
        let broken = PruningTables {
            phase1,
            corner_slice: tables.corner_slice.clone(),
            ..broken
        };
        broken.save(&path).unwrap();
        assert!(matches!(
            PruningTables::load(&path),
            Err(TableError::Corrupt { name: "phase one", .. })
        ));
    }
}
