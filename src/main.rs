#![warn(clippy::pedantic)]

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::{eyre::WrapErr, owo_colors::OwoColorize};
use env_logger::TimestampPrecision;
use log::LevelFilter;
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use twophase::{
    CubeState, FaceletCube, MoveSequence, Solution, TwoPhaseSolver,
    config::Config,
    pruning::{PruningTables, TABLE_FILE_NAME},
};

/// Solves 3x3x3 cubes with Kociemba's two-phase algorithm
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The configuration file to use, in TOML format.
    #[arg(long, short = 'c', value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (can be repeated)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Longest solution to accept
    #[arg(long, global = true)]
    max_length: Option<usize>,

    /// Stop searching at the first solution this short
    #[arg(long, global = true)]
    target_length: Option<usize>,

    /// Give up after this many milliseconds
    #[arg(long, global = true)]
    time_budget_ms: Option<u64>,

    /// Give up after visiting this many search nodes. Gives the same answer on
    /// every run
    #[arg(long, global = true)]
    node_budget: Option<u64>,

    /// Number of search threads
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Do not read or write the pruning table cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a scramble to a solved cube and solve it
    Solve {
        /// The scramble, e.g. "R U' F2". An empty scramble is already solved.
        scramble: String,
    },
    /// Solve a cube given as 54 facelets in U R F D L B order
    Facelets {
        /// The facelets, e.g. "UUUUUUUUURRRRRRRRRFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB"
        facelets: String,
    },
    /// Print a random scramble
    Scramble {
        /// Print this many random moves instead of a random state scramble
        #[arg(long, short)]
        length: Option<usize>,
        /// Seed for the random number generator
        #[arg(long, short)]
        seed: Option<u64>,
    },
    /// Generate the pruning tables and save them to the cache
    Tables,
    /// Read scrambles from stdin and solve each one, until "exit"
    Repl,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(max_length) = cli.max_length {
        config.solver.max_length = max_length;
    }
    if let Some(target_length) = cli.target_length {
        config.solver.target_length = Some(target_length);
    }
    if let Some(time_budget_ms) = cli.time_budget_ms {
        config.solver.time_budget_ms = Some(time_budget_ms);
    }
    if let Some(node_budget) = cli.node_budget {
        config.solver.node_budget = Some(node_budget);
    }
    if let Some(threads) = cli.threads {
        config.solver.threads = threads;
    }
    config.tables.no_cache |= cli.no_cache;

    match cli.command {
        Commands::Solve { scramble } => {
            let scramble: MoveSequence = scramble.parse()?;
            let tables = config.tables.load_tables();
            let solver = TwoPhaseSolver::new(&tables, config.solver);
            let solution = solver.solve(&CubeState::solved().apply_sequence(&scramble))?;
            print_solution(&solution);
        }
        Commands::Facelets { facelets } => {
            let facelets: FaceletCube = facelets.parse()?;
            let state = CubeState::try_from(&facelets)?;
            let tables = config.tables.load_tables();
            let solver = TwoPhaseSolver::new(&tables, config.solver);
            print_solution(&solver.solve(&state)?);
        }
        Commands::Scramble { length, seed } => {
            let mut rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
            let scramble = match length {
                Some(length) => MoveSequence::random(&mut rng, length),
                None => {
                    let state = CubeState::random(&mut rng);
                    let tables = config.tables.load_tables();
                    let solver = TwoPhaseSolver::new(&tables, config.solver);
                    solver.solve(&state)?.moves.inverse()
                }
            };
            println!("{scramble}");
            println!("{}", CubeState::solved().apply_sequence(&scramble));
        }
        Commands::Tables => match config.tables.cache_dir() {
            Some(dir) => {
                let tables = PruningTables::generate();
                std::fs::create_dir_all(&dir)
                    .wrap_err_with(|| format!("Could not create {}", dir.display()))?;
                let path = dir.join(TABLE_FILE_NAME);
                tables.save(&path)?;
                println!("Saved pruning tables to {}", path.display());
            }
            None => {
                let _tables = PruningTables::generate();
                println!("Generated pruning tables without saving them");
            }
        },
        Commands::Repl => {
            let tables = config.tables.load_tables();
            let solver = TwoPhaseSolver::new(&tables, config.solver);
            run_repl(&solver)?;
        }
    }
    Ok(())
}

fn print_solution(solution: &Solution) {
    if solution.is_already_solved() {
        println!("Cube is already solved!");
    } else {
        println!("{solution}");
        eprintln!(
            "{} moves ({} + {}, {}) in {:.3}s",
            solution.len(),
            solution.phase1().len(),
            solution.phase2().len(),
            solution.direction,
            solution.elapsed.as_secs_f64()
        );
    }
}

fn run_repl(solver: &TwoPhaseSolver<'_>) -> color_eyre::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();
        if line == "exit" {
            break;
        }

        let scramble: MoveSequence = match line.parse() {
            Ok(scramble) => scramble,
            Err(e) => {
                eprintln!("{}", e.red());
                continue;
            }
        };
        match solver.solve(&CubeState::solved().apply_sequence(&scramble)) {
            Ok(solution) => print_solution(&solution),
            Err(e) => eprintln!("{}", e.red()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "twophase",
            "solve",
            "R U",
            "-vv",
            "-c",
            "twophase.toml",
            "--node-budget",
            "5000",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("twophase.toml")));
        assert_eq!(cli.node_budget, Some(5000));
        assert!(matches!(cli.command, Commands::Solve { scramble } if scramble == "R U"));
    }
}
