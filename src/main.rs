use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use crossterm::style::{style, Color};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use connect4_solver::{
    config::DEFAULT_TABLE_LOG_SIZE, BitBoard, SequenceError, Solver, SolverConfig,
};

mod render;

#[derive(Parser, Debug)]
#[command(name = "connect4")]
#[command(about = "Computes the exact score of Connect 4 positions")]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug), RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve every position of a file, one move sequence per line
    Bench(BenchArgs),
    /// Solve a single position
    Solve {
        /// Sequence of 1-based columns played from the empty board
        moves: String,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Draw a position
    Show {
        /// Sequence of 1-based columns played from the empty board
        moves: String,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Only compute win, draw or loss
    #[arg(long, default_value_t = false)]
    weak: bool,

    /// Search without a transposition table
    #[arg(long, default_value_t = false)]
    no_table: bool,

    /// log2 of the number of transposition table entries
    #[arg(long, default_value_t = DEFAULT_TABLE_LOG_SIZE)]
    table_log_size: u32,
}

impl SearchArgs {
    fn config(&self) -> SolverConfig {
        let config = SolverConfig::default().with_table_log_size(self.table_log_size);
        if self.no_table {
            config.without_table()
        } else {
            config
        }
    }
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// File of move sequences, anything after the first field is ignored except
    /// for an optional expected score
    file: PathBuf,

    #[command(flatten)]
    search: SearchArgs,

    /// Number of positions solved side by side, each with its own solver
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Show a progress bar
    #[arg(long, default_value_t = false)]
    progress: bool,
}

/// One line of a benchmark file
struct TestLine {
    number: usize,
    moves: String,
    expected: Option<i32>,
}

enum LineResult {
    Invalid(SequenceError),
    Solved {
        score: i32,
        nodes: u64,
        time: Duration,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Command::Bench(args) => bench(&args),
        Command::Solve { moves, search } => solve(&moves, &search),
        Command::Show { moves } => {
            let board = BitBoard::from_moves(&moves)?;
            render::display(&board)?;
            Ok(())
        }
    }
}

fn read_lines(path: &Path) -> Result<Vec<TestLine>> {
    let file = BufReader::new(
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    );

    let mut lines = vec![];
    for (index, line) in file.lines().enumerate() {
        let buf = line.with_context(|| format!("failed to read line {}", index + 1))?;
        let mut fields = buf.split_whitespace();
        let moves = match fields.next() {
            Some(moves) => moves.to_owned(),
            // blank lines still count in the numbering
            None => continue,
        };
        let expected = fields.next().and_then(|score| score.parse::<i32>().ok());
        lines.push(TestLine {
            number: index + 1,
            moves,
            expected,
        });
    }
    Ok(lines)
}

fn solve_line(solver: &mut Solver, line: &TestLine, weak: bool) -> LineResult {
    let board = match BitBoard::from_moves(&line.moves) {
        Ok(board) => board,
        Err(err) => return LineResult::Invalid(err),
    };
    solver.reset();
    let start_time = Instant::now();
    let score = solver.solve(&board, weak);
    LineResult::Solved {
        score,
        nodes: solver.node_count(),
        time: start_time.elapsed(),
    }
}

fn bench(args: &BenchArgs) -> Result<()> {
    let lines = read_lines(&args.file)?;
    let config = args.search.config();
    let weak = args.search.weak;
    info!(
        "solving {} positions from {} with {} job(s), {:?}",
        lines.len(),
        args.file.display(),
        args.jobs,
        config
    );

    let progress = if args.progress {
        let bar = ProgressBar::new(lines.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} positions ({eta})"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.max(1))
        .build()?;
    let results: Vec<LineResult> = pool.install(|| {
        lines
            .par_iter()
            .map_init(
                || Solver::with_config(config),
                |solver, line| {
                    let result = solve_line(solver, line, weak);
                    progress.inc(1);
                    result
                },
            )
            .collect()
    });
    progress.finish_and_clear();

    let mut total_time = Duration::default();
    let mut total_nodes = 0u64;
    let mut solved = 0usize;
    let mut mismatches = 0usize;

    for (line, result) in lines.iter().zip(results.iter()) {
        match result {
            LineResult::Invalid(err) => {
                warn!(
                    "Line {}: Invalid move {} \"{}\": {}",
                    line.number,
                    err.moves_applied() + 1,
                    line.moves,
                    err
                );
            }
            LineResult::Solved { score, nodes, time } => {
                solved += 1;
                total_time += *time;
                total_nodes += nodes;

                let expected = line
                    .expected
                    .map(|expected| if weak { expected.signum() } else { expected });
                match expected {
                    Some(expected) if expected != *score => {
                        mismatches += 1;
                        println!(
                            "{} {} {} {} {}",
                            line.moves,
                            score,
                            nodes,
                            time.as_micros(),
                            style(format!("expected {}", expected)).with(Color::Red)
                        );
                    }
                    _ => println!("{} {} {} {}", line.moves, score, nodes, time.as_micros()),
                }
            }
        }
    }

    if solved > 0 {
        let seconds = total_time.as_secs_f64();
        println!(
            "Mean time: {:.6}ms, Mean no. of positions: {}, kpos/s: {:.1}",
            seconds * 1000.0 / solved as f64,
            total_nodes as f64 / solved as f64,
            total_nodes as f64 / (1000.0 * seconds.max(1e-9))
        );
    }

    if mismatches > 0 {
        bail!(
            "{} of {} positions scored differently than expected",
            mismatches,
            solved
        );
    }
    Ok(())
}

fn solve(moves: &str, args: &SearchArgs) -> Result<()> {
    let board = BitBoard::from_moves(moves)?;
    let mut solver = Solver::with_config(args.config());

    let start_time = Instant::now();
    let score = solver.solve(&board, args.weak);
    let time = start_time.elapsed();

    println!("{}", board);
    println!(
        "Score: {}, positions: {}, time: {:.6}s",
        score,
        solver.node_count(),
        time.as_secs_f64()
    );

    let (mover, opponent) = if board.num_moves() % 2 == 0 {
        (1, 2)
    } else {
        (2, 1)
    };
    if args.weak {
        match score.cmp(&0) {
            Ordering::Greater => println!("Player {} can force a win.", mover),
            Ordering::Less => println!("Player {} can force a win.", opponent),
            Ordering::Equal => println!("Player {} can at best force a draw.", mover),
        }
        return Ok(());
    }

    let win_distance = Solver::score_to_win_distance(&board, score);
    let move_string = if win_distance == 1 { "move" } else { "moves" };
    match score.cmp(&0) {
        Ordering::Greater => println!(
            "Player {} can force a win in at most {} {}.",
            mover, win_distance, move_string
        ),
        Ordering::Less => println!(
            "Player {} can force a win in at most {} {}.",
            opponent, win_distance, move_string
        ),
        Ordering::Equal => println!(
            "Player {} can at best force a draw, {} {} remaining",
            mover, win_distance, move_string
        ),
    }
    Ok(())
}
