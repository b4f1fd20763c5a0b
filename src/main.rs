use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use duotape::machine::{Machine, StepResult};
use duotape::puzzle;
use duotape::tape::DataTape;

#[derive(Parser)]
#[command(name = "duotape", about = "Two-tape hex puzzle machine")]
struct Cli {
    /// Program file: one instruction per line, `<I|O> <MNEMONIC> [<hexdigit>]`.
    program: Option<PathBuf>,

    /// Which built-in puzzle to run against.
    #[arg(long, default_value_t = 0)]
    puzzle: usize,

    /// Milliseconds between steps.
    #[arg(long, default_value_t = 100)]
    interval: u64,

    /// Step with no delay.
    #[arg(long)]
    fast: bool,

    /// Maximum steps before giving up.
    #[arg(long, default_value_t = 100_000)]
    step_limit: usize,

    /// Tape cells shown either side of the head.
    #[arg(long, default_value_t = 28)]
    window: i64,

    /// Only print the final state and verdict, not every step.
    #[arg(long)]
    quiet: bool,

    /// List the built-in puzzles and exit.
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.list {
        for (i, p) in puzzle::builtin().iter().enumerate() {
            println!("{i}: {} ({} -> {})", p.description(), p.input(), p.output());
        }
        return;
    }

    let Some(path) = cli.program else {
        eprintln!("No program file given (--list shows the puzzles)");
        std::process::exit(1);
    };

    let puzzles = puzzle::builtin();
    let Some(selected) = puzzles.get(cli.puzzle) else {
        eprintln!("No puzzle {} (there are {})", cli.puzzle, puzzles.len());
        std::process::exit(1);
    };

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    println!("PUZZLE: {}", selected.description().to_uppercase());

    let mut machine = Machine::new(selected.clone());
    if let Err(e) = machine.begin_running(&text) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let interval = if cli.fast {
        Duration::ZERO
    } else {
        Duration::from_millis(cli.interval)
    };

    for _ in 0..cli.step_limit {
        match machine.step() {
            Ok(StepResult::Continued) => {
                if !cli.quiet {
                    render(&machine, cli.window);
                }
                if !interval.is_zero() {
                    thread::sleep(interval);
                }
            }
            Ok(StepResult::Halted { passed }) => {
                render(&machine, cli.window);
                if passed {
                    println!("PASSED");
                    return;
                }
                println!("FAILED");
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    eprintln!("No halt within {} steps", cli.step_limit);
    std::process::exit(1);
}

/// Print the grid with the current cell marked, between the tape windows.
fn render(machine: &Machine, half_width: i64) {
    println!();
    render_tape("input", machine.input(), half_width);

    let grid = machine.program();
    for row in 0..grid.height() {
        let mut line = String::new();
        for col in 0..grid.width() {
            let index = col * grid.height() + row;
            let text = match grid.cell_at(index) {
                Ok(cell) => cell.to_string(),
                Err(_) => "??".to_string(),
            };
            let marker = if index == grid.cursor() { '>' } else { ' ' };
            line.push_str(&format!("{marker}{text:<8}"));
        }
        println!("  {}", line.trim_end());
    }

    render_tape("output", machine.output(), half_width);
    render_tape("reference", machine.reference(), half_width);
}

/// One tape as a row of hex digits: head cell bracketed, untouched cells
/// shown as `.`.
fn render_tape(label: &str, tape: &DataTape, half_width: i64) {
    let mut line = String::new();
    for cell in tape.window(half_width) {
        let digit = if cell.written {
            char::from_digit(u32::from(cell.value), 16)
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or('?')
        } else {
            '.'
        };
        if cell.index == tape.cursor() {
            line.push('[');
            line.push(digit);
            line.push(']');
        } else {
            line.push(digit);
        }
    }
    println!("{label:>9}  {line}");
}
